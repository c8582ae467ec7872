//! # Durable Storage
//!
//! Key-value persistence shared by the cache, the offline queue and the token
//! store. Values are JSON text.
//!
//! ## Atomicity
//!
//! Each operation on a single key is atomic. There is no cross-key
//! transaction: callers that update two keys must tolerate observing one
//! write without the other.
//!
//! ## Key Components
//!
//! - `KeyValueStore`: async storage trait
//! - `sqlite.rs`: SQLite-backed store used on devices
//! - `memory.rs`: in-process store for tests and ephemeral sessions
//! - `keys.rs`: well-known storage keys

pub mod keys;
pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::shared::error::SyncResult;
use async_trait::async_trait;

/// Async key-value storage
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value; `Ok(None)` when the key is absent
    async fn get(&self, key: &str) -> SyncResult<Option<String>>;

    /// Insert or overwrite a value
    async fn set(&self, key: &str, value: &str) -> SyncResult<()>;

    /// Delete a key; deleting an absent key is not an error
    async fn remove(&self, key: &str) -> SyncResult<()>;

    /// Delete several keys in one logical operation
    async fn remove_many(&self, keys: &[String]) -> SyncResult<()>;

    /// List every stored key
    async fn keys(&self) -> SyncResult<Vec<String>>;
}
