//! # Offline Mutations
//!
//! Mutations that fail for lack of connectivity are parked in a durable queue
//! and replayed by the network monitor when the device comes back online.
//!
//! ## Key Components
//!
//! - `queue.rs`: `OfflineQueue`, `QueueItem`, and the `QueueReplayer` seam the
//!   API layer implements

pub mod queue;

// Re-export main types
pub use queue::{FlushOutcome, FlushReport, MutationKind, OfflineQueue, QueueItem, QueueReplayer};
