// src/market/types.rs
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// One scraped job advertisement. Ephemeral: lives only between fetch and
/// extraction, never persisted beyond the cache's structured summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Posting {
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posted: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seniority: Option<String>,
    pub url: String,
}

/// Whether a signal came from live scraping or the synthetic fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Live,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillCount {
    pub name: String,
    pub count: u32,
}

impl SkillCount {
    pub fn new(name: impl Into<String>, count: u32) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }
}

/// Salary distribution over the postings that carried a parseable figure.
/// Absent entirely when nothing parsed; never zeroed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalarySummary {
    pub min: f64,
    pub max: f64,
    pub average: f64,
    pub sample_count: u32,
}

/// Structured market summary for one (role, location) query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSignal {
    pub role: String,
    pub location: String,
    /// Ordered by frequency, descending; ties keep first-seen order.
    pub skills: Vec<SkillCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub salary: Option<SalarySummary>,
    pub insights: Vec<String>,
    pub provenance: Provenance,
    pub generated_at: DateTime<Utc>,
    pub posting_count: u32,
}

impl MarketSignal {
    pub fn has_skills(&self) -> bool {
        !self.skills.is_empty()
    }

    pub fn skill_names(&self) -> impl Iterator<Item = &str> {
        self.skills.iter().map(|s| s.name.as_str())
    }
}

/// Normalized cache key for a (role, location) query.
pub fn cache_key(role: &str, location: &str) -> String {
    format!(
        "{}|{}",
        role.trim().to_lowercase(),
        location.trim().to_lowercase()
    )
}

/// A cached signal with its expiry. Expired entries read as absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub signal: MarketSignal,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(key: String, signal: MarketSignal, ttl: Duration) -> Self {
        let created_at = Utc::now();
        Self {
            key,
            signal,
            created_at,
            expires_at: created_at + ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}
