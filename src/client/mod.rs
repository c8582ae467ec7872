//! Client Module
//!
//! Runtime components of the sync core. Everything here is async and expects
//! to run inside a tokio runtime.
//!
//! # Layers
//!
//! - **Storage**: `storage` (durable key-value store), `cache` (TTL cache on top)
//! - **Connectivity**: `sync` (network monitor), `offline` (mutation queue)
//! - **Remote**: `api` (REST with token refresh), `realtime` (WebSocket push)
//! - **Domain**: `auth`, `services`
//! - **Wiring**: `context`, `config`, `logging`

pub mod api;
pub mod auth;
pub mod cache;
pub mod clock;
pub mod config;
pub mod context;
pub mod logging;
pub mod offline;
pub mod realtime;
pub mod registry;
pub mod services;
pub mod storage;
pub mod sync;

pub use api::{ApiClient, TokenPair, TokenStore};
pub use auth::{AuthService, AuthState, UserInfo, UserRole};
pub use cache::PersistentCache;
pub use config::Config;
pub use context::SyncContext;
pub use offline::{FlushOutcome, FlushReport, MutationKind, OfflineQueue, QueueItem, QueueReplayer};
pub use realtime::{ConnectionState, RealtimeChannel};
pub use registry::{CallbackRegistry, ListenerId, Subscription};
pub use services::{StudentService, UploadOutcome, VitalsService};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore};
pub use sync::{NetworkMonitor, NetworkState};
