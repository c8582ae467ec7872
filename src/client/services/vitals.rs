//! Vital-sign readings: cached reads, offline-tolerant uploads.

use super::cached_fetch;
use crate::client::api::ApiClient;
use crate::client::cache::PersistentCache;
use crate::client::offline::{MutationKind, OfflineQueue, QueueItem, QueueReplayer};
use crate::client::sync::NetworkState;
use crate::shared::error::SyncResult;
use crate::shared::vitals::{VitalSigns, VitalUpload};
use async_trait::async_trait;
use reqwest::Method;
use std::sync::Arc;
use std::time::Duration;

const VITALS_PATH: &str = "/vitals";

/// Cache prefix covering every vitals entry of one student
fn student_prefix(student_id: &str) -> String {
    format!("vitals:{}:", student_id)
}

/// Result of [`VitalsService::upload`]
#[derive(Debug, Clone, PartialEq)]
pub enum UploadOutcome {
    /// Accepted by the server
    Sent,
    /// Parked in the offline queue for replay
    Queued(QueueItem),
}

/// Sends vital uploads, live or from the offline queue
#[derive(Clone)]
pub struct UploadReplayer {
    api: Arc<ApiClient>,
    cache: Arc<PersistentCache>,
}

impl UploadReplayer {
    pub fn new(api: Arc<ApiClient>, cache: Arc<PersistentCache>) -> Self {
        Self { api, cache }
    }

    async fn send(&self, payload: &serde_json::Value) -> SyncResult<()> {
        self.api.send(Method::POST, VITALS_PATH, Some(payload)).await?;

        if let Some(student_id) = payload.get("studentId").and_then(|id| id.as_str()) {
            if let Err(e) = self.cache.invalidate_prefix(&student_prefix(student_id)).await {
                tracing::warn!("Failed to invalidate vitals cache for {}: {}", student_id, e);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl QueueReplayer for UploadReplayer {
    async fn replay(&self, item: &QueueItem) -> SyncResult<()> {
        match item.kind {
            MutationKind::VitalUpload => self.send(&item.payload).await,
        }
    }
}

pub struct VitalsService {
    api: Arc<ApiClient>,
    cache: Arc<PersistentCache>,
    queue: Arc<OfflineQueue>,
    network: NetworkState,
    uploader: UploadReplayer,
    ttl: Duration,
}

impl VitalsService {
    pub fn new(
        uploader: UploadReplayer,
        queue: Arc<OfflineQueue>,
        network: NetworkState,
        ttl: Duration,
    ) -> Self {
        Self {
            api: Arc::clone(&uploader.api),
            cache: Arc::clone(&uploader.cache),
            queue,
            network,
            uploader,
            ttl,
        }
    }

    /// Most recent reading for a student
    pub async fn latest(&self, student_id: &str, force_refresh: bool) -> SyncResult<VitalSigns> {
        let key = format!("{}latest", student_prefix(student_id));
        let path = format!("{}/{}/latest", VITALS_PATH, student_id);
        cached_fetch(&self.cache, &key, self.ttl, force_refresh, || self.api.get(&path)).await
    }

    /// Up to `limit` readings, newest first
    pub async fn history(&self, student_id: &str, limit: u32, force_refresh: bool) -> SyncResult<Vec<VitalSigns>> {
        let key = format!("{}history:{}", student_prefix(student_id), limit);
        let path = format!("{}/{}/history?limit={}", VITALS_PATH, student_id, limit);
        cached_fetch(&self.cache, &key, self.ttl, force_refresh, || self.api.get(&path)).await
    }

    /// Upload a reading, queueing it when the server cannot be reached
    pub async fn upload(&self, upload: &VitalUpload) -> SyncResult<UploadOutcome> {
        let payload = serde_json::to_value(upload)?;

        if !self.network.is_online() {
            tracing::debug!("Offline, queueing vitals for {}", upload.student_id);
            let item = self.queue.enqueue(MutationKind::VitalUpload, payload).await?;
            return Ok(UploadOutcome::Queued(item));
        }

        match self.uploader.send(&payload).await {
            Ok(()) => Ok(UploadOutcome::Sent),
            Err(e) if e.is_transient() => {
                tracing::info!("Upload for {} failed, queueing: {}", upload.student_id, e);
                let item = self.queue.enqueue(MutationKind::VitalUpload, payload).await?;
                Ok(UploadOutcome::Queued(item))
            }
            Err(e) => Err(e),
        }
    }

    /// Mutations still waiting for connectivity
    pub async fn pending_uploads(&self) -> usize {
        self.queue.get_queue_size().await
    }
}
