//! # Offline Queue
//!
//! Durable FIFO of mutations that could not reach the backend, replayed when
//! connectivity returns.
//!
//! ## Flush
//!
//! - Only one flush runs at a time. A concurrent call returns
//!   [`FlushOutcome::Skipped`] immediately.
//! - Every item of the snapshot is replayed concurrently, payload verbatim.
//! - A failed item has `retry_count` incremented; once it reaches
//!   `max_retries` it is dropped with an error log. Nothing is surfaced to the
//!   user.
//! - The surviving queue is persisted in a single write. Items enqueued while
//!   the flush was in flight are kept; items removed by `clear_queue()` in
//!   the meantime stay removed.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vitalsync::client::offline::{MutationKind, OfflineQueue};
//! # use vitalsync::client::offline::QueueReplayer;
//! # async fn example(store: Arc<dyn vitalsync::client::storage::KeyValueStore>, replayer: Arc<dyn QueueReplayer>) -> vitalsync::shared::SyncResult<()> {
//! let queue = OfflineQueue::new(store, replayer, 3);
//! queue.enqueue(MutationKind::VitalUpload, serde_json::json!({"studentId": "s-1"})).await?;
//! queue.flush().await?;
//! # Ok(())
//! # }
//! ```

use crate::client::clock::{Clock, SystemClock};
use crate::client::storage::keys::OFFLINE_QUEUE;
use crate::client::storage::KeyValueStore;
use crate::shared::error::{SyncError, SyncResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Kind of queued mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MutationKind {
    /// `POST /vitals`
    VitalUpload,
}

/// One pending mutation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    /// `<unix millis>-<random suffix>`
    pub id: String,
    #[serde(rename = "type")]
    pub kind: MutationKind,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub retry_count: u32,
}

/// Replays one queued mutation against the backend
#[async_trait]
pub trait QueueReplayer: Send + Sync {
    async fn replay(&self, item: &QueueItem) -> SyncResult<()>;
}

/// Result of one flush pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    /// Items replayed in this pass
    pub attempted: usize,
    pub succeeded: usize,
    /// Failed items kept for another attempt
    pub retained: usize,
    /// Failed items that reached the retry bound
    pub dropped: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Another flush was already running
    Skipped,
    Completed(FlushReport),
}

/// Durable queue of offline mutations
pub struct OfflineQueue {
    store: Arc<dyn KeyValueStore>,
    replayer: Arc<dyn QueueReplayer>,
    clock: Arc<dyn Clock>,
    max_retries: u32,
    flushing: AtomicBool,
    /// Serializes read-modify-write of the persisted queue
    write_lock: Mutex<()>,
}

/// Clears the flushing flag however the flush exits
struct FlushGuard<'a>(&'a AtomicBool);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl OfflineQueue {
    pub fn new(store: Arc<dyn KeyValueStore>, replayer: Arc<dyn QueueReplayer>, max_retries: u32) -> Self {
        Self::with_clock(store, replayer, max_retries, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn KeyValueStore>,
        replayer: Arc<dyn QueueReplayer>,
        max_retries: u32,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            replayer,
            clock,
            max_retries,
            flushing: AtomicBool::new(false),
            write_lock: Mutex::new(()),
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Append a mutation and persist the queue before returning
    pub async fn enqueue(&self, kind: MutationKind, payload: serde_json::Value) -> SyncResult<QueueItem> {
        let now = self.clock.now();
        let item = QueueItem {
            id: generate_id(now),
            kind,
            payload,
            created_at: now,
            retry_count: 0,
        };

        let _guard = self.write_lock.lock().await;
        let mut items = self.load().await;
        items.push(item.clone());
        self.persist(&items).await?;

        tracing::info!("Queued {:?} mutation {} ({} pending)", item.kind, item.id, items.len());
        Ok(item)
    }

    /// Replay every queued mutation once
    pub async fn flush(&self) -> SyncResult<FlushOutcome> {
        if self
            .flushing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Flush already in progress, skipping");
            return Ok(FlushOutcome::Skipped);
        }
        let _flushing = FlushGuard(&self.flushing);

        let snapshot = self.load().await;
        if snapshot.is_empty() {
            return Ok(FlushOutcome::Completed(FlushReport::default()));
        }
        tracing::info!("Flushing {} queued mutations", snapshot.len());

        let results = join_all(snapshot.iter().map(|item| self.replayer.replay(item))).await;

        let mut report = FlushReport {
            attempted: snapshot.len(),
            ..FlushReport::default()
        };
        let mut survivors = Vec::new();
        for (mut item, result) in snapshot.iter().cloned().zip(results) {
            match result {
                Ok(()) => {
                    report.succeeded += 1;
                    tracing::debug!("Replayed queued mutation {}", item.id);
                }
                Err(e) => {
                    item.retry_count += 1;
                    if item.retry_count >= self.max_retries {
                        report.dropped += 1;
                        tracing::error!(
                            "Dropping queued mutation {} after {} failed attempts: {}",
                            item.id,
                            item.retry_count,
                            e
                        );
                    } else {
                        report.retained += 1;
                        tracing::warn!(
                            "Queued mutation {} failed (attempt {}/{}): {}",
                            item.id,
                            item.retry_count,
                            self.max_retries,
                            e
                        );
                        survivors.push(item);
                    }
                }
            }
        }

        let _guard = self.write_lock.lock().await;
        let current = self.load().await;
        // A clear_queue() during the replay removed the snapshot items too
        let still_queued: HashSet<&str> = current.iter().map(|item| item.id.as_str()).collect();
        survivors.retain(|item| still_queued.contains(item.id.as_str()));
        let flushed: HashSet<&str> = snapshot.iter().map(|item| item.id.as_str()).collect();
        let arrived_during_flush = current
            .iter()
            .filter(|item| !flushed.contains(item.id.as_str()))
            .cloned();
        survivors.extend(arrived_during_flush);
        self.persist(&survivors).await?;

        tracing::info!(
            "Flush complete: {} sent, {} retained, {} dropped",
            report.succeeded,
            report.retained,
            report.dropped
        );
        Ok(FlushOutcome::Completed(report))
    }

    /// Whether a flush is running right now
    pub fn is_flushing(&self) -> bool {
        self.flushing.load(Ordering::Acquire)
    }

    pub async fn get_queue_size(&self) -> usize {
        self.load().await.len()
    }

    /// Snapshot of the persisted queue
    pub async fn pending_items(&self) -> Vec<QueueItem> {
        self.load().await
    }

    /// Drop every queued mutation
    pub async fn clear_queue(&self) -> SyncResult<()> {
        let _guard = self.write_lock.lock().await;
        self.store.remove(OFFLINE_QUEUE).await
    }

    async fn load(&self) -> Vec<QueueItem> {
        let raw = match self.store.get(OFFLINE_QUEUE).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read offline queue, treating as empty: {}", e);
                return Vec::new();
            }
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!("Corrupt offline queue, treating as empty: {}", e);
            Vec::new()
        })
    }

    async fn persist(&self, items: &[QueueItem]) -> SyncResult<()> {
        let blob = serde_json::to_string(items).map_err(SyncError::from)?;
        self.store.set(OFFLINE_QUEUE, &blob).await
    }
}

fn generate_id(now: DateTime<Utc>) -> String {
    use rand::distributions::Alphanumeric;
    use rand::Rng;

    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(char::from)
        .collect();
    format!("{}-{}", now.timestamp_millis(), suffix.to_lowercase())
}
