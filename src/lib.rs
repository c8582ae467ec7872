//! VitalSync - Offline-Tolerant Sync Core
//!
//! VitalSync is the data layer of the school health-monitoring client. It
//! keeps vital-sign readings, student profiles and alerts available while the
//! device drifts in and out of coverage.
//!
//! # Overview
//!
//! - Persistent TTL cache with a stale fallback for reads made offline
//! - Durable offline queue for uploads, replayed when connectivity returns
//! - Network monitor fanning connectivity changes out to listeners
//! - REST client with transparent one-shot token refresh
//! - WebSocket channel for live `vitalSigns:update` and `alert:new` pushes
//!
//! # Module Structure
//!
//! - **`shared`** - Wire payloads, realtime events, errors and configuration
//!
//! - **`client`** - Runtime components
//!   - Storage, cache and offline queue
//!   - Network monitor and realtime channel
//!   - API client, auth and domain services
//!   - `SyncContext` wiring everything together
//!
//! # Usage
//!
//! ```rust,no_run
//! use vitalsync::client::{Config, SyncContext};
//!
//! # async fn example() -> vitalsync::shared::SyncResult<()> {
//! vitalsync::client::logging::init("vitalsync=info");
//!
//! let context = SyncContext::new(Config::new()).await?;
//! context.start().await;
//!
//! let user = context.auth().login("nurse@school.test", "secret").await?;
//! let _alerts = context.realtime().on_alert(|alert| {
//!     println!("{:?} alert: {}", alert.severity, alert.message);
//! });
//! let latest = context.vitals().latest("42", false).await?;
//! println!("{} sees heart rate {:?}", user.email, latest.heart_rate);
//!
//! context.shutdown();
//! # Ok(())
//! # }
//! ```
//!
//! # Error Handling
//!
//! Every fallible operation returns [`shared::SyncResult`]. Transient network
//! failures are distinguishable through [`shared::SyncError::is_transient`];
//! an expired session surfaces as `SyncError::RefreshFailed` after stored
//! credentials have been cleared.
//!
//! # Thread Safety
//!
//! All components are `Send + Sync` and shared through `Arc`. Callbacks run on
//! whichever task emits the event and must not block.

/// Shared types and data structures
pub mod shared;

/// Runtime sync components
pub mod client;
