//! Stored credentials.
//!
//! Access token, refresh token and the signed-in user's profile live in
//! durable storage so a restarted app resumes its session. A failed read is
//! treated as "no credential": the request goes out unauthenticated and the
//! server decides.

use crate::client::storage::keys::{ACCESS_TOKEN, AUTH_KEYS, REFRESH_TOKEN, USER_PROFILE};
use crate::client::storage::KeyValueStore;
use crate::shared::error::SyncResult;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Access + refresh token pair as issued by `/auth/login` and `/auth/refresh`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn access_token(&self) -> Option<String> {
        self.read(ACCESS_TOKEN).await
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN).await
    }

    /// Persist both tokens
    pub async fn save(&self, tokens: &TokenPair) -> SyncResult<()> {
        self.store.set(ACCESS_TOKEN, &tokens.access_token).await?;
        self.store.set(REFRESH_TOKEN, &tokens.refresh_token).await
    }

    pub async fn save_user<T: Serialize>(&self, user: &T) -> SyncResult<()> {
        let blob = serde_json::to_string(user)?;
        self.store.set(USER_PROFILE, &blob).await
    }

    /// Stored user profile; `None` when absent or unreadable
    pub async fn user<T: DeserializeOwned>(&self) -> Option<T> {
        let raw = self.read(USER_PROFILE).await?;
        match serde_json::from_str(&raw) {
            Ok(user) => Some(user),
            Err(e) => {
                tracing::warn!("Stored user profile is corrupt: {}", e);
                None
            }
        }
    }

    /// Remove tokens and user profile
    pub async fn clear(&self) -> SyncResult<()> {
        let keys: Vec<String> = AUTH_KEYS.iter().map(|key| key.to_string()).collect();
        self.store.remove_many(&keys).await
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.store.get(key).await {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                tracing::warn!("Failed to read {} from storage: {}", key, e);
                None
            }
        }
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenStore").finish_non_exhaustive()
    }
}
