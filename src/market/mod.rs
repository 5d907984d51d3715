// src/market/mod.rs
//! Job-market intelligence: acquisition, extraction, caching, fallback.

use crate::config::AdvisorConfig;
use crate::error::AcquisitionError;
use std::sync::Arc;
use tracing::{info, warn};

pub mod cache;
pub mod extractor;
pub mod fallback;
pub mod fetcher;
pub mod session;
pub mod types;

pub use cache::MarketCache;
pub use extractor::SkillExtractor;
pub use fallback::FallbackGenerator;
pub use fetcher::{DelayPolicy, HumanPacing, NoDelay, StealthFetcher};
pub use session::{SessionStatus, SessionStore, StoredSession};
pub use types::{CacheEntry, MarketSignal, Posting, Provenance, SalarySummary, SkillCount};

/// The full acquisition pipeline behind one call: cache, then live fetch
/// and extraction, then deterministic fallback.
///
/// `market_signal` always produces a signal; acquisition failure is
/// absorbed here and reflected only in the provenance flag.
pub struct MarketIntelligence {
    cache: MarketCache,
    fetcher: StealthFetcher,
    extractor: SkillExtractor,
    fallback: FallbackGenerator,
    max_postings: usize,
}

impl MarketIntelligence {
    pub fn new(config: &AdvisorConfig) -> Self {
        let sessions = SessionStore::new(config.environment.session_path.clone());
        let cache =
            MarketCache::new(config.cache_ttl_hours).with_dir(config.environment.cache_dir.clone());

        Self {
            cache,
            fetcher: StealthFetcher::new(config.scrape.clone(), sessions),
            extractor: SkillExtractor::new(),
            fallback: FallbackGenerator::new(),
            max_postings: config.scrape.max_postings,
        }
    }

    /// Substitute the pacing policy, for tests.
    pub fn with_delay_policy(mut self, delay: Arc<dyn DelayPolicy>) -> Self {
        self.fetcher = self.fetcher.with_delay_policy(delay);
        self
    }

    /// The market signal for one (role, location) query, cached with
    /// single-flight semantics.
    pub async fn market_signal(&self, role: &str, location: &str) -> MarketSignal {
        self.cache
            .get_or_acquire(role, location, || self.acquire(role, location))
            .await
    }

    /// Two-stage pipeline: try live, else fallback. Never errors.
    async fn acquire(&self, role: &str, location: &str) -> MarketSignal {
        match self.fetcher.search(role, location, self.max_postings).await {
            Ok(postings) => {
                let signal = self.extractor.extract(role, location, &postings);
                if !signal.has_skills() && self.fallback.has_archetype(role) {
                    // A well-understood role should not degrade to "no
                    // data" just because the postings parsed empty.
                    info!(
                        "Live extraction for '{}' was empty, using archetype fallback",
                        role
                    );
                    self.fallback.generate(role, location)
                } else {
                    signal
                }
            }
            Err(AcquisitionError::Disabled) => {
                info!("Scraping disabled, generating fallback signal for '{}'", role);
                self.fallback.generate(role, location)
            }
            Err(e) => {
                warn!("Acquisition failed for '{}' ({}), falling back", role, e);
                self.fallback.generate(role, location)
            }
        }
    }
}
