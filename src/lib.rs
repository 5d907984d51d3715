// src/lib.rs
//! Career guidance core: job-market intelligence plus course matching.
//!
//! The pipeline always answers. Live scraping feeds a cached market signal
//! when it works; a deterministic fallback profile takes over when it does
//! not, and only a defective course catalog can fail a request.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::info;

pub mod catalog;
pub mod config;
pub mod error;
pub mod market;
pub mod matching;

pub use catalog::CourseRecord;
pub use config::AdvisorConfig;
pub use error::{AcquisitionError, CatalogError};
pub use market::{MarketIntelligence, MarketSignal, Provenance};
pub use matching::{CreditBand, LearningPath, Priority, ScoredCourse};

/// Everything a guidance request produces.
#[derive(Debug, Clone, Serialize)]
pub struct Guidance {
    pub signal: MarketSignal,
    pub courses: Vec<ScoredCourse>,
    pub path: LearningPath,
}

/// Facade over the whole pipeline: one instance per process, catalog
/// loaded once and shared read-only.
pub struct Advisor {
    catalog: Vec<CourseRecord>,
    market: MarketIntelligence,
    band: CreditBand,
}

impl Advisor {
    /// Build an advisor, loading the catalog from the configured path.
    pub fn new(config: AdvisorConfig) -> Result<Self> {
        let catalog = catalog::load_catalog(&config.environment.catalog_path)
            .context("Advisor requires a readable course catalog")?;
        Self::with_catalog(config, catalog)
    }

    /// Build an advisor around an already-loaded catalog.
    pub fn with_catalog(config: AdvisorConfig, catalog: Vec<CourseRecord>) -> Result<Self> {
        if catalog.is_empty() {
            return Err(CatalogError::Empty.into());
        }

        let band = CreditBand::new(config.min_credits_per_term, config.max_credits_per_term);
        let market = MarketIntelligence::new(&config);
        info!(
            "Advisor ready with {} catalog courses, scraping {}",
            catalog.len(),
            if config.scrape.enabled { "enabled" } else { "disabled" }
        );

        Ok(Self {
            catalog,
            market,
            band,
        })
    }

    pub fn market(&self) -> &MarketIntelligence {
        &self.market
    }

    /// Produce guidance for a career goal.
    ///
    /// Always returns a signal and a path; the only failure mode is a
    /// catalog integrity defect.
    pub async fn advise(&self, role: &str, location: &str) -> Result<Guidance> {
        let signal = self.market.market_signal(role, location).await;
        let courses = matching::rank(&self.catalog, &signal);

        let path = matching::sequence(recommended(&courses), self.band)?;

        Ok(Guidance {
            signal,
            courses,
            path,
        })
    }
}

/// The subset worth scheduling: every non-low course, or the top handful
/// when nothing cleared the medium bar, closed over in-catalog
/// prerequisites so a picked course never outruns a prerequisite that
/// scored poorly on its own.
fn recommended(courses: &[ScoredCourse]) -> Vec<ScoredCourse> {
    let mut picked: Vec<ScoredCourse> = courses
        .iter()
        .filter(|c| c.tier != Priority::Low)
        .cloned()
        .collect();
    if picked.is_empty() {
        picked = courses.iter().take(6).cloned().collect();
    }

    let by_code: HashMap<&str, &ScoredCourse> = courses
        .iter()
        .map(|c| (c.course.code.as_str(), c))
        .collect();
    let mut included: HashSet<String> =
        picked.iter().map(|c| c.course.code.clone()).collect();
    let mut pending: Vec<String> = picked
        .iter()
        .flat_map(|c| c.course.prerequisites.clone())
        .collect();

    while let Some(code) = pending.pop() {
        if included.contains(&code) {
            continue;
        }
        // Prerequisites outside the catalog stay external; sequencing
        // treats them as already completed.
        let Some(prerequisite) = by_code.get(code.as_str()) else {
            continue;
        };
        included.insert(code);
        pending.extend(prerequisite.course.prerequisites.iter().cloned());
        picked.push((*prerequisite).clone());
    }

    picked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(code: &str, skills: &[&str]) -> CourseRecord {
        course_with_prereqs(code, skills, &[])
    }

    fn course_with_prereqs(code: &str, skills: &[&str], prereqs: &[&str]) -> CourseRecord {
        CourseRecord {
            code: code.to_string(),
            title: format!("Course {code}"),
            description: String::new(),
            credit_hours: 3,
            department: "CS".to_string(),
            prerequisites: prereqs.iter().map(|s| s.to_string()).collect(),
            skills: skills.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn empty_catalog_is_rejected() {
        let config = AdvisorConfig::default().with_scraping_enabled(false);
        let err = Advisor::with_catalog(config, vec![]).err().unwrap();
        assert!(err.to_string().contains("catalog is empty"));
    }

    #[test]
    fn recommended_pulls_in_low_tier_prerequisites() {
        let catalog = vec![
            course_with_prereqs("ADV", &["Python", "SQL", "Machine Learning"], &["BASE"]),
            course_with_prereqs("BASE", &["Writing"], &["INTRO"]),
            course_with_prereqs("INTRO", &["Reading"], &[]),
        ];
        let signal =
            market::FallbackGenerator::new().generate("Data Scientist", "Dallas, TX");

        let scored = matching::rank(&catalog, &signal);
        let picked = recommended(&scored);
        let codes: Vec<&str> = picked.iter().map(|c| c.course.code.as_str()).collect();
        // The closure is transitive: BASE because ADV needs it, INTRO
        // because BASE does.
        assert!(codes.contains(&"ADV"));
        assert!(codes.contains(&"BASE"));
        assert!(codes.contains(&"INTRO"));

        let path = matching::sequence(picked, CreditBand::default()).unwrap();
        let semester_of = |code: &str| {
            path.semesters
                .iter()
                .find(|s| s.courses.iter().any(|c| c.course.code == code))
                .map(|s| s.number)
                .unwrap()
        };
        assert!(semester_of("INTRO") < semester_of("BASE"));
        assert!(semester_of("BASE") < semester_of("ADV"));
    }

    #[test]
    fn recommended_falls_back_to_top_courses() {
        let scored = matching::rank(
            &[course("A", &["Writing"]), course("B", &["History"])],
            &market::FallbackGenerator::new().generate("Financial Analyst", "Dallas, TX"),
        );
        // Nothing overlaps the archetype, so everything is low tier; the
        // path should still schedule something.
        assert!(scored.iter().all(|c| c.tier == Priority::Low));
        assert_eq!(recommended(&scored).len(), 2);
    }
}
