// src/matching/path.rs
//! Prerequisite-aware semester sequencing.

use super::rank::ScoredCourse;
use crate::error::CatalogError;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, warn};

/// Credit-hour band per semester.
#[derive(Debug, Clone, Copy)]
pub struct CreditBand {
    pub min: u32,
    pub max: u32,
}

impl Default for CreditBand {
    fn default() -> Self {
        Self { min: 12, max: 18 }
    }
}

impl CreditBand {
    pub fn new(min: u32, max: u32) -> Self {
        Self {
            min: min.min(max),
            max: max.max(min),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Semester {
    pub number: u32,
    pub courses: Vec<ScoredCourse>,
    pub credit_hours: u32,
}

/// Semester buckets where every course appears strictly after all of its
/// in-catalog prerequisites.
#[derive(Debug, Clone, Serialize)]
pub struct LearningPath {
    pub semesters: Vec<Semester>,
    pub total_credit_hours: u32,
}

/// Sequence scored courses into semesters.
///
/// Prerequisite edges exist only between courses present in the input;
/// prerequisites outside it are treated as already completed. Buckets fill
/// greedily in rank order up to the band ceiling. A cyclic prerequisite
/// graph is a catalog defect and fails the request.
pub fn sequence(
    scored: Vec<ScoredCourse>,
    band: CreditBand,
) -> Result<LearningPath, CatalogError> {
    if scored.is_empty() {
        return Ok(LearningPath {
            semesters: Vec::new(),
            total_credit_hours: 0,
        });
    }

    let in_set: HashSet<String> = scored.iter().map(|s| s.course.code.clone()).collect();
    let mut remaining: Vec<Option<ScoredCourse>> = scored.into_iter().map(Some).collect();
    let mut completed: HashSet<String> = HashSet::new();
    let mut semesters: Vec<Semester> = Vec::new();
    let mut left = remaining.len();

    while left > 0 {
        let mut courses: Vec<ScoredCourse> = Vec::new();
        let mut credits = 0u32;

        // One pass in rank order; a course is eligible once every
        // in-catalog prerequisite sits in an earlier semester.
        for slot in remaining.iter_mut() {
            let Some(candidate) = slot.as_ref() else {
                continue;
            };
            let blocked = candidate
                .course
                .prerequisites
                .iter()
                .any(|p| in_set.contains(p) && !completed.contains(p));
            if blocked {
                continue;
            }

            let hours = candidate.course.credit_hours;
            if credits + hours > band.max {
                if courses.is_empty() && hours > band.max {
                    // A single course larger than the band still has to be
                    // scheduled somewhere; give it its own term.
                    warn!(
                        "Course {} ({} credits) exceeds the {}-credit ceiling",
                        candidate.course.code, hours, band.max
                    );
                } else {
                    continue;
                }
            }

            let Some(course) = slot.take() else {
                continue;
            };
            credits += course.course.credit_hours;
            courses.push(course);
            if credits >= band.max {
                break;
            }
        }

        if courses.is_empty() {
            // Nothing was placeable: every remaining course waits on another
            // remaining course, which is a prerequisite cycle.
            let stuck: Vec<String> = remaining
                .iter()
                .flatten()
                .map(|s| s.course.code.clone())
                .collect();
            return Err(CatalogError::CyclicPrerequisites { courses: stuck });
        }

        left -= courses.len();
        for course in &courses {
            completed.insert(course.course.code.clone());
        }
        if credits < band.min && left > 0 {
            debug!(
                "Semester {} holds {} credits, below the {}-credit floor",
                semesters.len() + 1,
                credits,
                band.min
            );
        }
        semesters.push(Semester {
            number: semesters.len() as u32 + 1,
            courses,
            credit_hours: credits,
        });
    }

    let total_credit_hours = semesters.iter().map(|s| s.credit_hours).sum();
    Ok(LearningPath {
        semesters,
        total_credit_hours,
    })
}
