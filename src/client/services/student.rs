//! Student profiles.

use super::cached_fetch;
use crate::client::api::ApiClient;
use crate::client::cache::PersistentCache;
use crate::client::storage::keys::resource_key;
use crate::shared::error::SyncResult;
use crate::shared::vitals::{StudentProfile, StudentProfileUpdate};
use std::sync::Arc;
use std::time::Duration;

const PROFILE_RESOURCE: &str = "studentProfile";
const STUDENT_LIST_KEY: &str = "studentList:all";

pub struct StudentService {
    api: Arc<ApiClient>,
    cache: Arc<PersistentCache>,
    ttl: Duration,
}

impl StudentService {
    pub fn new(api: Arc<ApiClient>, cache: Arc<PersistentCache>, ttl: Duration) -> Self {
        Self { api, cache, ttl }
    }

    /// Profile for `student_id`, served from cache when fresh
    pub async fn profile(&self, student_id: &str, force_refresh: bool) -> SyncResult<StudentProfile> {
        let key = resource_key(PROFILE_RESOURCE, student_id);
        let path = format!("/student/{}", student_id);
        cached_fetch(&self.cache, &key, self.ttl, force_refresh, || self.api.get(&path)).await
    }

    /// Every student (admin accounts only)
    pub async fn list(&self, force_refresh: bool) -> SyncResult<Vec<StudentProfile>> {
        cached_fetch(&self.cache, STUDENT_LIST_KEY, self.ttl, force_refresh, || {
            self.api.get("/admin/students")
        })
        .await
    }

    /// Apply a partial update; cached copies of the profile are dropped
    pub async fn update_profile(&self, student_id: &str, update: &StudentProfileUpdate) -> SyncResult<StudentProfile> {
        let path = format!("/student/{}", student_id);
        let updated: StudentProfile = self.api.put(&path, update).await?;

        self.cache.invalidate(&resource_key(PROFILE_RESOURCE, student_id)).await?;
        self.cache.invalidate(STUDENT_LIST_KEY).await?;
        Ok(updated)
    }
}
