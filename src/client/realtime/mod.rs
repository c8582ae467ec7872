//! # Realtime Push
//!
//! WebSocket channel delivering live vital-sign updates and alerts.
//!
//! ## Key Components
//!
//! - `channel.rs`: `RealtimeChannel` connection state machine and per-event
//!   callback registries

pub mod channel;

pub use channel::{ConnectionState, RealtimeChannel};
