// src/config.rs
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;

/// File-system locations the pipeline reads and writes.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentConfig {
    pub catalog_path: PathBuf,
    pub cache_dir: PathBuf,
    pub session_path: PathBuf,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from("data/utd_courses.json"),
            cache_dir: PathBuf::from("data/job_cache"),
            session_path: PathBuf::from("data/linkedin_session.json"),
        }
    }
}

/// Knobs for the stealth fetcher. Delays are a range, never a fixed
/// interval; a constant cadence is itself a detection signal.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    pub enabled: bool,
    pub max_postings: usize,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub step_timeout_secs: u64,
    pub search_url: String,
    pub login_url: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_postings: 2,
            min_delay_ms: 1_200,
            max_delay_ms: 4_500,
            step_timeout_secs: 30,
            search_url: "https://www.linkedin.com/jobs/search/".to_string(),
            login_url: "https://www.linkedin.com/login".to_string(),
        }
    }
}

impl ScrapeConfig {
    /// Login credentials from the environment, if configured.
    pub fn credentials(&self) -> Option<(String, String)> {
        let email = std::env::var("LINKEDIN_EMAIL").ok().filter(|s| !s.is_empty())?;
        let password = std::env::var("LINKEDIN_PASSWORD")
            .ok()
            .filter(|s| !s.is_empty())?;
        Some((email, password))
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    local: EnvironmentConfig,
    production: EnvironmentConfig,
    #[serde(default)]
    scraping: ScrapeConfig,
}

/// Top-level configuration for the advisor pipeline.
#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    pub environment: EnvironmentConfig,
    pub scrape: ScrapeConfig,
    pub cache_ttl_hours: i64,
    pub min_credits_per_term: u32,
    pub max_credits_per_term: u32,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            environment: EnvironmentConfig::default(),
            scrape: ScrapeConfig::default(),
            cache_ttl_hours: 24,
            min_credits_per_term: 12,
            max_credits_per_term: 18,
        }
    }
}

impl AdvisorConfig {
    /// Load configuration for the current environment. Falls back to
    /// defaults when no `config.yaml` is present so the library stays
    /// usable without one.
    pub fn load() -> Result<Self> {
        let config_path = PathBuf::from("config.yaml");
        if !config_path.exists() {
            info!("No config.yaml found, using default configuration");
            return Ok(Self::default());
        }

        let environment = Self::environment_name();
        info!("Loading configuration for environment: {}", environment);

        let content =
            std::fs::read_to_string(&config_path).context("Failed to read config.yaml")?;
        let file: ConfigFile =
            serde_yaml::from_str(&content).context("Failed to parse config.yaml")?;

        let environment = match environment.as_str() {
            "production" => file.production,
            _ => file.local,
        };

        Ok(Self {
            environment,
            scrape: file.scraping,
            ..Self::default()
        })
    }

    fn environment_name() -> String {
        std::env::var("SKILLBRIDGE_ENV")
            .or_else(|_| std::env::var("ENVIRONMENT"))
            .unwrap_or_else(|_| "local".to_string())
    }

    pub fn with_catalog_path(mut self, path: PathBuf) -> Self {
        self.environment.catalog_path = path;
        self
    }

    pub fn with_cache_dir(mut self, dir: PathBuf) -> Self {
        self.environment.cache_dir = dir;
        self
    }

    pub fn with_session_path(mut self, path: PathBuf) -> Self {
        self.environment.session_path = path;
        self
    }

    pub fn with_scraping_enabled(mut self, enabled: bool) -> Self {
        self.scrape.enabled = enabled;
        self
    }

    pub fn with_max_credits_per_term(mut self, max: u32) -> Self {
        self.max_credits_per_term = max.max(self.min_credits_per_term);
        self
    }
}
