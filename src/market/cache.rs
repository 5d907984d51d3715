// src/market/cache.rs
//! Keyed, time-boxed store of extracted market signal with single-flight
//! acquisition per key.

use super::types::{cache_key, CacheEntry, MarketSignal};
use chrono::Duration;
use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

type Slot = Arc<Mutex<Option<CacheEntry>>>;

/// In-memory cache with optional JSON persistence per key.
///
/// The slot map is the only shared mutable state in the pipeline; every
/// mutation goes through `get_or_acquire`.
pub struct MarketCache {
    ttl: Duration,
    dir: Option<PathBuf>,
    slots: Mutex<HashMap<String, Slot>>,
}

impl MarketCache {
    pub fn new(ttl_hours: i64) -> Self {
        Self {
            ttl: Duration::hours(ttl_hours),
            dir: None,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Persist entries under `dir`, one file per key. Malformed files on
    /// disk read as misses, never as errors.
    pub fn with_dir(mut self, dir: PathBuf) -> Self {
        self.dir = Some(dir);
        self
    }

    /// Return the cached signal for (role, location), or run `acquire` to
    /// produce it.
    ///
    /// Single-flight: concurrent callers for the same key block on the
    /// key's slot and receive the first caller's result; callers for
    /// different keys proceed in parallel. Expired entries are treated as
    /// absent (lazy expiry on read).
    pub async fn get_or_acquire<F, Fut>(
        &self,
        role: &str,
        location: &str,
        acquire: F,
    ) -> MarketSignal
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = MarketSignal>,
    {
        let key = cache_key(role, location);

        let slot = {
            let mut slots = self.slots.lock().await;
            slots.entry(key.clone()).or_default().clone()
        };

        // Holding the slot lock across acquisition is what serializes
        // concurrent callers for this key.
        let mut guard = slot.lock().await;

        if let Some(entry) = guard.as_ref() {
            if !entry.is_expired() {
                debug!("Cache hit for '{}'", key);
                return entry.signal.clone();
            }
            debug!("Cache entry for '{}' expired", key);
        } else if let Some(entry) = self.load_persisted(&key) {
            if !entry.is_expired() {
                debug!("Loaded persisted cache entry for '{}'", key);
                let signal = entry.signal.clone();
                *guard = Some(entry);
                return signal;
            }
        }

        let signal = acquire().await;
        let entry = CacheEntry::new(key, signal.clone(), self.ttl);
        self.persist(&entry);
        *guard = Some(entry);

        signal
    }

    fn entry_path(&self, key: &str) -> Option<PathBuf> {
        let dir = self.dir.as_ref()?;
        let name: String = key
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect();
        Some(dir.join(format!("{name}.json")))
    }

    fn load_persisted(&self, key: &str) -> Option<CacheEntry> {
        let path = self.entry_path(key)?;
        let content = std::fs::read_to_string(&path).ok()?;

        match serde_json::from_str::<CacheEntry>(&content) {
            Ok(entry) if entry.key == key => Some(entry),
            Ok(entry) => {
                warn!(
                    "Cache file {} holds key '{}', expected '{}'; treating as miss",
                    path.display(),
                    entry.key,
                    key
                );
                None
            }
            Err(e) => {
                warn!(
                    "Malformed cache file {}; treating as miss: {}",
                    path.display(),
                    e
                );
                None
            }
        }
    }

    /// Best-effort: persistence failures never affect the returned signal.
    fn persist(&self, entry: &CacheEntry) {
        let Some(path) = self.entry_path(&entry.key) else {
            return;
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!("Failed to create cache dir {}: {}", parent.display(), e);
                return;
            }
        }

        match serde_json::to_string_pretty(entry) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    warn!("Failed to write cache file {}: {}", path.display(), e);
                }
            }
            Err(e) => warn!("Failed to serialize cache entry: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::types::Provenance;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn signal_for(role: &str) -> MarketSignal {
        MarketSignal {
            role: role.to_string(),
            location: "Dallas, TX".to_string(),
            skills: vec![],
            salary: None,
            insights: vec![],
            provenance: Provenance::Fallback,
            generated_at: Utc::now(),
            posting_count: 0,
        }
    }

    #[tokio::test]
    async fn concurrent_callers_trigger_one_acquisition() {
        let cache = Arc::new(MarketCache::new(24));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_acquire("Data Scientist", "Dallas, TX", || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        signal_for("Data Scientist")
                    })
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_acquire_independently() {
        let cache = MarketCache::new(24);
        let calls = AtomicUsize::new(0);

        cache
            .get_or_acquire("Data Scientist", "Dallas, TX", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                signal_for("Data Scientist")
            })
            .await;
        cache
            .get_or_acquire("Financial Analyst", "Dallas, TX", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                signal_for("Financial Analyst")
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn key_normalization_shares_entries() {
        let cache = MarketCache::new(24);
        let calls = AtomicUsize::new(0);

        for role in ["Data Scientist", "  data scientist "] {
            cache
                .get_or_acquire(role, "Dallas, TX", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    signal_for(role)
                })
                .await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_entries_are_reacquired() {
        let cache = MarketCache::new(0);
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            cache
                .get_or_acquire("Data Scientist", "Dallas, TX", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    signal_for("Data Scientist")
                })
                .await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn persisted_entry_survives_a_new_cache_instance() {
        let dir = TempDir::new().unwrap();

        let first = MarketCache::new(24).with_dir(dir.path().to_path_buf());
        let original = first
            .get_or_acquire("Data Scientist", "Dallas, TX", || async {
                signal_for("Data Scientist")
            })
            .await;

        // Fresh instance, same dir: must serve from disk without acquiring.
        let second = MarketCache::new(24).with_dir(dir.path().to_path_buf());
        let reloaded = second
            .get_or_acquire("Data Scientist", "Dallas, TX", || async {
                panic!("should not re-acquire a persisted entry")
            })
            .await;

        assert_eq!(reloaded.role, original.role);
        assert_eq!(reloaded.provenance, original.provenance);
        assert_eq!(reloaded.generated_at, original.generated_at);
    }

    #[tokio::test]
    async fn corrupt_persisted_entry_is_a_miss() {
        let dir = TempDir::new().unwrap();
        let cache = MarketCache::new(24).with_dir(dir.path().to_path_buf());

        let path = cache.entry_path("data scientist|dallas, tx").unwrap();
        std::fs::create_dir_all(dir.path()).unwrap();
        std::fs::write(&path, "{broken json").unwrap();

        let calls = AtomicUsize::new(0);
        cache
            .get_or_acquire("Data Scientist", "Dallas, TX", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                signal_for("Data Scientist")
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
