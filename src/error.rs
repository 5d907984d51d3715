// src/error.rs
use thiserror::Error;

/// Failure during live posting acquisition.
///
/// Always absorbed at the cache/fallback boundary; callers of the pipeline
/// receive a fallback signal instead of this error.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("scraping is disabled by configuration")]
    Disabled,

    #[error("browser setup failed: {0}")]
    Browser(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("bot detection suspected: redirected to {url}")]
    Detection { url: String },

    #[error("authentication failed: {reason}")]
    AuthFailed { reason: String },

    #[error("timed out after {seconds}s during {step}")]
    Timeout { step: &'static str, seconds: u64 },

    #[error("search returned no postings")]
    EmptyResults,
}

/// Defect in the course catalog data.
///
/// The only error class the full pipeline surfaces to callers: a broken
/// catalog is an operator configuration problem, not a transient condition.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("cyclic prerequisites involving courses {courses:?}")]
    CyclicPrerequisites { courses: Vec<String> },

    #[error("course catalog is empty")]
    Empty,
}
