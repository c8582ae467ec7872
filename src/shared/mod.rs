//! Shared Module
//!
//! Types shared by every client component: wire payloads, realtime events,
//! errors and configuration. Nothing here performs I/O.

/// Vital-sign, student and alert payloads
pub mod vitals;

/// Realtime push events
pub mod event;

/// Error taxonomy
pub mod error;

/// Application configuration
pub mod config;

/// Re-export commonly used types for convenience
pub use vitals::{Alert, AlertSeverity, BloodPressure, StudentProfile, StudentProfileUpdate, VitalSigns, VitalUpload};
pub use event::{EventType, RealtimeEvent, VitalSignsUpdate};
pub use error::{SyncError, SyncResult};
pub use config::{AppConfig, AppConfigBuilder, ConfigError};
