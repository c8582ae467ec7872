//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - Store and configuration fixtures
//! - wiremock response helpers
//! - An in-process WebSocket server
//! - Custom assertion macros

pub mod assertions;
pub mod fixtures;

// Re-export commonly used utilities
pub use fixtures::*;
pub use mock_server::*;
pub use socket_server::*;
