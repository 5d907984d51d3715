// src/market/session.rs
//! Durable scraping-session record so re-authentication survives restarts.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

const SESSION_TTL_HOURS: i64 = 24;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    pub cookies: Vec<SessionCookie>,
    pub authenticated_at: DateTime<Utc>,
}

impl StoredSession {
    pub fn new(cookies: Vec<SessionCookie>) -> Self {
        Self {
            cookies,
            authenticated_at: Utc::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        Utc::now() - self.authenticated_at > ttl
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Expired,
    Absent,
}

/// Persists the authenticated scraping session across process restarts.
///
/// A missing, corrupt, or expired record always loads as `None`; the fetcher
/// treats that as "must re-authenticate or operate unauthenticated".
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            ttl: Duration::hours(SESSION_TTL_HOURS),
        }
    }

    pub fn load(&self) -> Option<StoredSession> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return None,
        };

        let session: StoredSession = match serde_json::from_str(&content) {
            Ok(session) => session,
            Err(e) => {
                warn!(
                    "Discarding corrupt session record at {}: {}",
                    self.path.display(),
                    e
                );
                return None;
            }
        };

        if session.is_expired(self.ttl) {
            info!("Stored scraping session has expired");
            return None;
        }

        Some(session)
    }

    pub fn save(&self, session: &StoredSession) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create session directory: {}", parent.display())
            })?;
        }

        let json = serde_json::to_string_pretty(session)
            .context("Failed to serialize session record")?;
        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write session file: {}", self.path.display()))?;

        info!("Scraping session saved to {}", self.path.display());
        Ok(())
    }

    pub fn invalidate(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).with_context(|| {
                format!("Failed to remove session file: {}", self.path.display())
            })?;
            info!("Scraping session cleared");
        }
        Ok(())
    }

    pub fn status(&self) -> SessionStatus {
        if !self.path.exists() {
            return SessionStatus::Absent;
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return SessionStatus::Absent,
        };

        match serde_json::from_str::<StoredSession>(&content) {
            Ok(session) if session.is_expired(self.ttl) => SessionStatus::Expired,
            Ok(_) => SessionStatus::Active,
            Err(_) => SessionStatus::Absent,
        }
    }
}
