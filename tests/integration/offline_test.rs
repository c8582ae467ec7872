//! Offline upload, reconnect and replay through a fully wired context

use crate::assert_eventually;
use crate::common::*;
use assert_matches::assert_matches;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use vitalsync::client::services::UploadReplayer;
use vitalsync::client::{
    ApiClient, Config, FlushOutcome, FlushReport, MutationKind, OfflineQueue, PersistentCache, SyncContext,
    TokenStore, UploadOutcome,
};
use vitalsync::shared::AppConfig;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn started_context(server: &MockServer) -> SyncContext {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200))
        .mount(server)
        .await;
    let config = Config::with_builder(
        AppConfig::builder()
            .server_url(server.uri())
            .socket_url(UNREACHABLE_SOCKET),
    )
    .unwrap();
    let context = SyncContext::with_store(config, memory_store()).unwrap();
    context.start().await;
    context
}

#[tokio::test]
async fn test_upload_while_offline_replays_on_reconnect() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vitals"))
        .and(body_partial_json(json!({"studentId": "s1", "heartRate": 92})))
        .respond_with(envelope(json!({"id": "v1"})))
        .expect(1)
        .mount(&server)
        .await;
    let context = started_context(&server).await;

    let transitions = Arc::new(AtomicUsize::new(0));
    let _listener = {
        let transitions = Arc::clone(&transitions);
        context.monitor().add_listener(move |_| {
            transitions.fetch_add(1, Ordering::SeqCst);
        })
    };

    context.probe().notify(false);
    assert_eventually!(!context.monitor().is_connected());

    let outcome = context.vitals().upload(&sample_upload("s1")).await.unwrap();
    assert_matches!(outcome, UploadOutcome::Queued(_));
    assert_eq!(context.queue().get_queue_size().await, 1);

    context.probe().notify(true);
    assert_eventually!(context.queue().get_queue_size().await == 0);
    // Immediate call on registration, then offline, then online
    assert_eq!(transitions.load(Ordering::SeqCst), 3);

    context.shutdown();
}

#[tokio::test]
async fn test_repeated_online_events_do_not_reflush() {
    let server = MockServer::start().await;
    let posts = Arc::new(AtomicUsize::new(0));
    {
        let posts = Arc::clone(&posts);
        Mock::given(method("POST"))
            .and(path("/vitals"))
            .respond_with(move |_: &wiremock::Request| {
                posts.fetch_add(1, Ordering::SeqCst);
                ResponseTemplate::new(503)
            })
            .mount(&server)
            .await;
    }
    let context = started_context(&server).await;

    context.probe().notify(false);
    assert_eventually!(!context.monitor().is_connected());
    context.vitals().upload(&sample_upload("s1")).await.unwrap();

    context.probe().notify(true);
    assert_eventually!(posts.load(Ordering::SeqCst) == 1);
    assert_eventually!(!context.queue().is_flushing());

    // Already online: no transition, no flush
    context.probe().notify(true);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(posts.load(Ordering::SeqCst), 1);

    let pending = context.queue().pending_items().await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].retry_count, 1);

    context.shutdown();
}

#[tokio::test]
async fn test_item_dropped_after_max_retries() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/vitals"))
        .respond_with(error_body(503, "Maintenance"))
        .expect(3)
        .mount(&server)
        .await;

    let store = memory_store();
    let config = test_config(&server.uri());
    let api = Arc::new(ApiClient::new(&config, TokenStore::new(store.clone())).unwrap());
    let cache = Arc::new(PersistentCache::new(store.clone()));
    let replayer = Arc::new(UploadReplayer::new(api, cache));
    let queue = OfflineQueue::new(store, replayer, 3);

    queue
        .enqueue(
            MutationKind::VitalUpload,
            serde_json::to_value(sample_upload("s9")).unwrap(),
        )
        .await
        .unwrap();

    for expected_retries in 1..=2 {
        let outcome = queue.flush().await.unwrap();
        assert_eq!(
            outcome,
            FlushOutcome::Completed(FlushReport { attempted: 1, succeeded: 0, retained: 1, dropped: 0 })
        );
        assert_eq!(queue.pending_items().await[0].retry_count, expected_retries);
    }

    let outcome = queue.flush().await.unwrap();
    assert_eq!(
        outcome,
        FlushOutcome::Completed(FlushReport { attempted: 1, succeeded: 0, retained: 0, dropped: 1 })
    );
    assert_eq!(queue.get_queue_size().await, 0);
}

#[tokio::test]
async fn test_offline_read_serves_stale_profile() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/student/42"))
        .respond_with(envelope(json!({"id": "42", "name": "Ada"})))
        .expect(1)
        .mount(&server)
        .await;

    let store = memory_store();
    let online_config = Config::with_builder(
        AppConfig::builder()
            .server_url(server.uri())
            .profile_ttl(Duration::ZERO),
    )
    .unwrap();
    let online = SyncContext::with_store(online_config, store.clone()).unwrap();
    let fresh = online.students().profile("42", false).await.unwrap();
    drop(online);

    // Same store, backend gone
    let offline_config = Config::with_builder(AppConfig::builder().server_url(UNREACHABLE_HTTP)).unwrap();
    let offline = SyncContext::with_store(offline_config, store).unwrap();
    let stale = offline.students().profile("42", true).await.unwrap();
    assert_eq!(stale, fresh);
}
