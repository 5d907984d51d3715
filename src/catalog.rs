// src/catalog.rs
//! Course catalog boundary: records are produced by the external catalog
//! scraper and loaded here once per process, read-only afterwards.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// One catalog entry. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRecord {
    #[serde(alias = "course_code")]
    pub code: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_credit_hours", alias = "credits")]
    pub credit_hours: u32,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    #[serde(default)]
    pub skills: Vec<String>,
}

fn default_credit_hours() -> u32 {
    3
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    courses: Vec<CourseRecord>,
}

/// Load the catalog JSON produced by the course-catalog collaborator.
pub fn load_catalog(path: &Path) -> Result<Vec<CourseRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read course catalog: {}", path.display()))?;

    let file: CatalogFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse course catalog: {}", path.display()))?;

    info!("Loaded {} courses from {}", file.courses.len(), path.display());
    Ok(file.courses)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_catalog_with_aliases_and_defaults() {
        let json = r#"{
            "courses": [
                {
                    "course_code": "CS 6313",
                    "title": "Statistical Methods for Data Science",
                    "description": "Probability and statistics for data analysis.",
                    "credits": 3,
                    "department": "Computer Science",
                    "prerequisites": ["CS 5343"],
                    "skills": ["Statistics", "Data Analysis", "Python"]
                },
                {
                    "code": "CS 5343",
                    "title": "Algorithm Analysis and Data Structures"
                }
            ]
        }"#;

        let file: CatalogFile = serde_json::from_str(json).unwrap();
        assert_eq!(file.courses.len(), 2);
        assert_eq!(file.courses[0].code, "CS 6313");
        assert_eq!(file.courses[0].credit_hours, 3);
        assert_eq!(file.courses[1].credit_hours, 3);
        assert!(file.courses[1].prerequisites.is_empty());
        assert!(file.courses[1].skills.is_empty());
    }

    #[test]
    fn load_catalog_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("courses.json");
        std::fs::write(
            &path,
            r#"{"courses": [{"code": "CS 1337", "title": "Computer Science I"}]}"#,
        )
        .unwrap();

        let courses = load_catalog(&path).unwrap();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].code, "CS 1337");
    }

    #[test]
    fn missing_file_is_an_error_with_context() {
        let err = load_catalog(Path::new("/nonexistent/courses.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read course catalog"));
    }
}
