// src/matching/mod.rs
//! Course matching, ranking, and semester sequencing.

pub mod path;
pub mod rank;

pub use path::{sequence, CreditBand, LearningPath, Semester};
pub use rank::{rank, Priority, ScoredCourse};
