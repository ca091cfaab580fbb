//! Short-lived credential cache shared by every source adapter.
//!
//! Keyed by source id. Tokens expire after the configured TTL (or their own
//! expiry, for OAuth tokens). When a cache file is configured the live tokens
//! are written to it on every change and read back on construction, so a
//! restarted process can reuse a still-valid handshake. Writes are serialized
//! and land through a rename, so readers never see a torn file.
//!
//! Two requests racing on an expired token both refresh it; the last write
//! wins. That costs one extra handshake and nothing else.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl SessionToken {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

pub struct SessionCache {
    tokens: DashMap<String, SessionToken>,
    ttl: ChronoDuration,
    file: Option<PathBuf>,
    write_lock: Mutex<()>,
}

impl SessionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            tokens: DashMap::new(),
            ttl: ChronoDuration::from_std(ttl).unwrap_or_else(|_| ChronoDuration::minutes(5)),
            file: None,
            write_lock: Mutex::new(()),
        }
    }

    /// A cache persisted to `path`. Live tokens already in the file are loaded;
    /// an unreadable file is treated as empty.
    pub fn with_file(ttl: Duration, path: &Path) -> Self {
        let mut cache = Self::new(ttl);
        cache.file = Some(path.to_path_buf());
        match load_file(path) {
            Ok(tokens) => {
                let now = Utc::now();
                for (source, token) in tokens.into_iter().filter(|(_, t)| t.is_live(now)) {
                    cache.tokens.insert(source, token);
                }
                tracing::debug!(path = %path.display(), tokens = cache.tokens.len(), "session cache loaded");
            }
            Err(e) => tracing::debug!(path = %path.display(), error = %e, "no usable session cache file"),
        }
        cache
    }

    pub fn get(&self, source: &str) -> Option<String> {
        let now = Utc::now();
        let live = self.tokens.get(source).filter(|t| t.is_live(now)).map(|t| t.token.clone());
        if live.is_none() && self.tokens.remove(source).is_some() {
            tracing::debug!(source, "session token expired");
        }
        live
    }

    /// Store a token valid for the cache TTL.
    pub fn put(&self, source: &str, token: &str) {
        self.put_until(source, token, Utc::now() + self.ttl);
    }

    /// Store a token with its own expiry.
    pub fn put_until(&self, source: &str, token: &str, expires_at: DateTime<Utc>) {
        self.tokens.insert(
            source.to_string(),
            SessionToken {
                token: token.to_string(),
                expires_at,
            },
        );
        self.persist();
    }

    pub fn invalidate(&self, source: &str) {
        if self.tokens.remove(source).is_some() {
            tracing::debug!(source, "session token invalidated");
            self.persist();
        }
    }

    fn persist(&self) {
        let Some(path) = &self.file else {
            return;
        };
        // Snapshot under the lock so the last writer persists the newest state.
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        let now = Utc::now();
        let snapshot: BTreeMap<String, SessionToken> = self
            .tokens
            .iter()
            .filter(|e| e.value().is_live(now))
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        let written = serde_json::to_string_pretty(&snapshot)
            .map_err(|e| e.to_string())
            .and_then(|json| write_atomic(path, &json));
        if let Err(e) = written {
            tracing::warn!(path = %path.display(), error = %e, "failed to persist session cache");
        }
    }
}

fn write_atomic(path: &Path, contents: &str) -> Result<(), String> {
    let tmp = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4().simple()));
    std::fs::write(&tmp, contents).map_err(|e| e.to_string())?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        e.to_string()
    })
}

fn load_file(path: &Path) -> Result<BTreeMap<String, SessionToken>, String> {
    let text = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    serde_json::from_str(&text).map_err(|e| e.to_string())
}
