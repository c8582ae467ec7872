//! # Persistent Cache
//!
//! Last-known-good API responses with a time-to-live, kept in durable storage
//! under the `cache:` namespace.
//!
//! ## Behaviour
//!
//! - **Lazy expiry**: an entry older than its TTL reads as a miss but stays in
//!   storage until overwritten or invalidated. [`PersistentCache::get_stale`]
//!   can still return it when the network is unavailable.
//! - **Never fails reads**: a missing key, a corrupt blob or a storage error
//!   all read as a miss.
//! - **Prefix invalidation**: `invalidate_prefix("vitals:s-1")` drops every
//!   matching entry in one storage call.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use vitalsync::client::cache::PersistentCache;
//! use vitalsync::client::storage::MemoryStore;
//!
//! # async fn example() -> vitalsync::shared::SyncResult<()> {
//! let cache = PersistentCache::new(Arc::new(MemoryStore::new()));
//! cache.set("studentProfile:42", &serde_json::json!({"name": "Ada"}), Duration::from_secs(300)).await?;
//! let hit: Option<serde_json::Value> = cache.get("studentProfile:42").await;
//! # Ok(())
//! # }
//! ```

use crate::client::clock::{Clock, SystemClock};
use crate::client::storage::keys::CACHE_PREFIX;
use crate::client::storage::KeyValueStore;
use crate::shared::error::SyncResult;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Stored form of a cache entry
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedEntry {
    pub value: serde_json::Value,
    pub stored_at: DateTime<Utc>,
    pub ttl_seconds: u64,
}

impl CachedEntry {
    /// `now - stored_at <= ttl`
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.stored_at);
        age <= chrono::Duration::seconds(self.ttl_seconds.min(i64::MAX as u64) as i64)
    }
}

/// TTL cache over a [`KeyValueStore`]
pub struct PersistentCache {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl PersistentCache {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Fresh value for `key`, or `None` on miss, expiry or corruption
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.read_entry(key).await?;
        if !entry.is_fresh(self.clock.now()) {
            tracing::debug!("Cache entry {} expired", key);
            return None;
        }
        decode_value(key, entry.value)
    }

    /// Value for `key` regardless of age
    ///
    /// Used as the offline fallback on read paths.
    pub async fn get_stale<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.read_entry(key).await?;
        decode_value(key, entry.value)
    }

    /// Store `value` under `key` for `ttl`
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> SyncResult<()> {
        let entry = CachedEntry {
            value: serde_json::to_value(value)?,
            stored_at: self.clock.now(),
            ttl_seconds: ttl.as_secs(),
        };
        let blob = serde_json::to_string(&entry)?;
        self.store.set(&storage_key(key), &blob).await
    }

    /// Remove one entry
    pub async fn invalidate(&self, key: &str) -> SyncResult<()> {
        self.store.remove(&storage_key(key)).await
    }

    /// Remove every entry whose key starts with `prefix`
    pub async fn invalidate_prefix(&self, prefix: &str) -> SyncResult<()> {
        let full_prefix = storage_key(prefix);
        let doomed: Vec<String> = self
            .store
            .keys()
            .await?
            .into_iter()
            .filter(|key| key.starts_with(&full_prefix))
            .collect();
        if doomed.is_empty() {
            return Ok(());
        }
        tracing::debug!("Invalidating {} cache entries under {}", doomed.len(), prefix);
        self.store.remove_many(&doomed).await
    }

    /// Remove every cache entry
    pub async fn clear(&self) -> SyncResult<()> {
        self.invalidate_prefix("").await
    }

    async fn read_entry(&self, key: &str) -> Option<CachedEntry> {
        let raw = match self.store.get(&storage_key(key)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Cache read for {} failed, treating as miss: {}", key, e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!("Corrupt cache entry {}, treating as miss: {}", key, e);
                None
            }
        }
    }
}

fn storage_key(key: &str) -> String {
    format!("{}{}", CACHE_PREFIX, key)
}

fn decode_value<T: DeserializeOwned>(key: &str, value: serde_json::Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Cache entry {} has unexpected shape, treating as miss: {}", key, e);
            None
        }
    }
}
