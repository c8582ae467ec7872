//! # Connectivity Tracking
//!
//! Detects online/offline transitions and drives offline queue replay.
//!
//! ## Architecture
//!
//! - **Connectivity Source**: platform events plus an active HTTP probe
//! - **Network Monitor**: state, listener fan-out, reconnect flush
//! - **Network State**: read-only handle shared with services
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use vitalsync::client::sync::{NetworkMonitor, ReachabilityProbe};
//!
//! # async fn example() {
//! let probe = Arc::new(ReachabilityProbe::new("http://127.0.0.1:3000/api", Duration::from_secs(3)));
//! let monitor = Arc::new(NetworkMonitor::new(probe.clone()));
//! monitor.init();
//!
//! let _sub = monitor.add_listener(|online| println!("online: {}", online));
//! probe.notify(false);
//! # }
//! ```

pub mod connectivity;
pub mod network_monitor;

pub use connectivity::{ConnectivitySource, ReachabilityProbe};
pub use network_monitor::{NetworkMonitor, NetworkState, ReconnectHook};
