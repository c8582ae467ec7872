//! Realtime channel against an in-process WebSocket server

use crate::common::*;
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use vitalsync::client::{ConnectionState, RealtimeChannel, TokenStore};
use vitalsync::shared::{Alert, AlertSeverity, AppConfig, VitalSignsUpdate};

async fn wait_for(changes: &mut watch::Receiver<ConnectionState>, state: ConnectionState) {
    tokio::time::timeout(Duration::from_secs(5), changes.wait_for(|current| *current == state))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {:?}", state))
        .expect("channel dropped");
}

async fn signed_in_channel(socket_url: &str, attempts: u32, delay: Duration) -> RealtimeChannel {
    let config = AppConfig::builder()
        .socket_url(socket_url)
        .reconnect(attempts, delay)
        .build()
        .unwrap();
    let tokens = TokenStore::new(memory_store());
    sign_in(&tokens, "socket-token", "r1").await;
    RealtimeChannel::new(&config, tokens)
}

#[tokio::test]
async fn test_handshake_carries_token_and_events_fan_out() {
    let server = SocketServer::start().await;
    let channel = signed_in_channel(&server.url, 1, Duration::from_millis(20)).await;

    let updates: Arc<Mutex<Vec<VitalSignsUpdate>>> = Arc::default();
    let alerts: Arc<Mutex<Vec<Alert>>> = Arc::default();
    let _updates_sub = {
        let updates = Arc::clone(&updates);
        channel.on_vital_signs_update(move |update| updates.lock().unwrap().push(update.clone()))
    };
    let _alerts_sub = {
        let alerts = Arc::clone(&alerts);
        channel.on_alert(move |alert| alerts.lock().unwrap().push(alert.clone()))
    };

    let mut changes = channel.state_changes();
    channel.connect().await;
    wait_for(&mut changes, ConnectionState::Connected).await;
    assert_eq!(server.handshakes(), vec!["/socket?token=socket-token".to_string()]);

    server.send(
        json!({
            "event": "vitalSigns:update",
            "data": {
                "studentId": "s1",
                "data": {"heartRate": 121, "temperature": 38.4, "recordedAt": "2026-03-02T10:00:00Z"},
                "timestamp": "2026-03-02T10:00:01Z"
            }
        })
        .to_string(),
    );
    server.send(r#"{"event":"typing","data":{}}"#);
    server.send(
        json!({
            "event": "alert:new",
            "data": {
                "id": "a1",
                "studentId": "s1",
                "severity": "critical",
                "message": "Heart rate above threshold",
                "createdAt": "2026-03-02T10:00:02Z",
                "vitalSignId": "v9"
            }
        })
        .to_string(),
    );

    crate::assert_eventually!(alerts.lock().unwrap().len() == 1);
    let updates = updates.lock().unwrap().clone();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].student_id, "s1");
    assert_eq!(updates[0].data.heart_rate, Some(121));

    let alert = alerts.lock().unwrap()[0].clone();
    assert_eq!(alert.severity, AlertSeverity::Critical);
    assert_eq!(alert.extra.get("vitalSignId"), Some(&json!("v9")));

    channel.disconnect();
}

#[tokio::test]
async fn test_connect_is_idempotent() {
    let server = SocketServer::start().await;
    let channel = signed_in_channel(&server.url, 1, Duration::from_millis(20)).await;
    let mut changes = channel.state_changes();

    channel.connect().await;
    channel.connect().await;
    wait_for(&mut changes, ConnectionState::Connected).await;
    channel.connect().await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(server.handshakes().len(), 1);
    assert_eq!(server.open_connections(), 1);
    channel.disconnect();
}

#[tokio::test]
async fn test_server_close_triggers_reconnect() {
    let server = SocketServer::start().await;
    let channel = signed_in_channel(&server.url, 3, Duration::from_millis(20)).await;
    let mut changes = channel.state_changes();

    channel.connect().await;
    wait_for(&mut changes, ConnectionState::Connected).await;

    server.close_all();
    crate::assert_eventually!(server.handshakes().len() == 2);
    wait_for(&mut changes, ConnectionState::Connected).await;
    assert_eq!(server.open_connections(), 1);

    channel.disconnect();
}

#[tokio::test]
async fn test_gives_up_after_bounded_attempts() {
    let server = SocketServer::start().await;
    let channel = signed_in_channel(&server.url, 2, Duration::from_millis(20)).await;
    let mut changes = channel.state_changes();

    channel.connect().await;
    wait_for(&mut changes, ConnectionState::Connected).await;

    server.shutdown();
    wait_for(&mut changes, ConnectionState::Disconnected).await;

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(channel.state(), ConnectionState::Disconnected);
    assert_eq!(server.handshakes().len(), 1);
}

#[tokio::test]
async fn test_disconnect_wins_over_live_connection() {
    let server = SocketServer::start().await;
    let channel = signed_in_channel(&server.url, 5, Duration::from_millis(10)).await;
    let mut changes = channel.state_changes();

    channel.connect().await;
    wait_for(&mut changes, ConnectionState::Connected).await;

    channel.disconnect();
    assert_eq!(channel.state(), ConnectionState::NoSocket);

    crate::assert_eventually!(server.open_connections() == 0);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(channel.state(), ConnectionState::NoSocket);
    assert_eq!(server.handshakes().len(), 1);
}

#[tokio::test]
async fn test_explicit_connect_after_giving_up() {
    let channel = signed_in_channel(UNREACHABLE_SOCKET, 0, Duration::from_millis(10)).await;
    let mut changes = channel.state_changes();

    channel.connect().await;
    wait_for(&mut changes, ConnectionState::Disconnected).await;

    channel.connect().await;
    assert_eq!(channel.state(), ConnectionState::Connecting);
    wait_for(&mut changes, ConnectionState::Disconnected).await;
    channel.disconnect();
}
