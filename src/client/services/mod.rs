//! # Domain Services
//!
//! Cache-then-network reads and queue-on-failure writes for the screens.
//!
//! ## Read path
//!
//! 1. Fresh cache hit, unless the caller forces a refresh
//! 2. Live request; success refreshes the cache entry
//! 3. Transient failure falls back to the cached entry regardless of age
//! 4. No entry at all: the live error surfaces
//!
//! ## Key Components
//!
//! - `student.rs`: profiles and the admin student list
//! - `vitals.rs`: latest reading, history, uploads and the queue replayer

pub mod student;
pub mod vitals;

pub use student::StudentService;
pub use vitals::{UploadOutcome, UploadReplayer, VitalsService};

use crate::client::cache::PersistentCache;
use crate::shared::error::SyncResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::time::Duration;

/// Read through the cache with a stale fallback on transient failures
pub(crate) async fn cached_fetch<T, F, Fut>(
    cache: &PersistentCache,
    key: &str,
    ttl: Duration,
    force_refresh: bool,
    fetch: F,
) -> SyncResult<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = SyncResult<T>>,
{
    if !force_refresh {
        if let Some(hit) = cache.get(key).await {
            tracing::debug!("Cache hit for {}", key);
            return Ok(hit);
        }
    }

    match fetch().await {
        Ok(value) => {
            if let Err(e) = cache.set(key, &value, ttl).await {
                tracing::warn!("Failed to cache {}: {}", key, e);
            }
            Ok(value)
        }
        Err(e) if e.is_transient() => match cache.get_stale(key).await {
            Some(stale) => {
                tracing::info!("Serving cached {} while offline: {}", key, e);
                Ok(stale)
            }
            None => Err(e),
        },
        Err(e) => Err(e),
    }
}
