//! Store, configuration and payload fixtures

use chrono::{TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use vitalsync::client::{KeyValueStore, MemoryStore, TokenPair, TokenStore};
use vitalsync::shared::{AppConfig, VitalSigns, VitalUpload};

/// Nothing listens on the discard port, so connections are refused at once
pub const UNREACHABLE_HTTP: &str = "http://127.0.0.1:9";
pub const UNREACHABLE_SOCKET: &str = "ws://127.0.0.1:9/socket";

pub fn memory_store() -> Arc<dyn KeyValueStore> {
    Arc::new(MemoryStore::new())
}

/// Config pointing at `server_url` with a socket that never answers
pub fn test_config(server_url: &str) -> AppConfig {
    AppConfig::builder()
        .server_url(server_url)
        .socket_url(UNREACHABLE_SOCKET)
        .reconnect(0, Duration::from_millis(10))
        .build()
        .expect("test config is valid")
}

pub async fn sign_in(tokens: &TokenStore, access: &str, refresh: &str) {
    tokens
        .save(&TokenPair {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
        })
        .await
        .expect("tokens saved");
}

pub fn sample_upload(student_id: &str) -> VitalUpload {
    VitalUpload {
        student_id: student_id.to_string(),
        device_id: Some("band-1".to_string()),
        vitals: VitalSigns {
            heart_rate: Some(92),
            temperature: Some(37.1),
            spo2: Some(97),
            blood_pressure: None,
            recorded_at: Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap(),
        },
    }
}
