/**
 * Authentication Module
 *
 * Session bookkeeping on top of the token store: login, logout and the
 * signed-in user's profile.
 */

use crate::client::api::{ApiClient, TokenPair};
use crate::client::cache::PersistentCache;
use crate::client::realtime::RealtimeChannel;
use crate::shared::error::SyncResult;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const LOGIN_PATH: &str = "/auth/login";
const LOGOUT_PATH: &str = "/auth/logout";

/// Account role as reported by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Student,
    Parent,
    Nurse,
    Admin,
    #[serde(other)]
    Other,
}

/// Signed-in user profile, stored under the `user` key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub role: UserRole,
    /// Linked student record for student and parent accounts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student_id: Option<String>,
}

impl UserInfo {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    access_token: String,
    refresh_token: String,
    user: UserInfo,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LogoutRequest {
    refresh_token: Option<String>,
}

/// Authentication state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub authenticated: bool,
    pub user: Option<UserInfo>,
    pub error: Option<String>,
}

impl AuthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signed_in(user: UserInfo) -> Self {
        Self {
            authenticated: true,
            user: Some(user),
            error: None,
        }
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn set_error(&mut self, error: String) {
        self.error = Some(error);
    }
}

/// Login, logout and current-user lookups
pub struct AuthService {
    api: Arc<ApiClient>,
    cache: Arc<PersistentCache>,
    realtime: Arc<RealtimeChannel>,
}

impl AuthService {
    pub fn new(api: Arc<ApiClient>, cache: Arc<PersistentCache>, realtime: Arc<RealtimeChannel>) -> Self {
        Self { api, cache, realtime }
    }

    /// Exchange credentials for tokens, persist them and open the realtime channel
    pub async fn login(&self, email: &str, password: &str) -> SyncResult<UserInfo> {
        let response: LoginResponse = self
            .api
            .post_public(LOGIN_PATH, &LoginRequest { email, password })
            .await?;

        let tokens = self.api.tokens();
        tokens
            .save(&TokenPair {
                access_token: response.access_token,
                refresh_token: response.refresh_token,
            })
            .await?;
        tokens.save_user(&response.user).await?;
        tracing::info!("Signed in as {}", response.user.email);

        self.realtime.connect().await;
        Ok(response.user)
    }

    /// End the session locally; the server is notified on a best-effort basis
    pub async fn logout(&self) -> SyncResult<()> {
        let tokens = self.api.tokens();
        let request = LogoutRequest {
            refresh_token: tokens.refresh_token().await,
        };
        if let Err(e) = self
            .api
            .post_public::<_, serde_json::Value>(LOGOUT_PATH, &request)
            .await
        {
            tracing::debug!("Server logout failed, continuing locally: {}", e);
        }

        self.realtime.disconnect();
        tokens.clear().await?;
        self.cache.clear().await?;
        tracing::info!("Signed out");
        Ok(())
    }

    /// Stored profile of the signed-in user
    pub async fn current_user(&self) -> Option<UserInfo> {
        self.api.tokens().user().await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.api.tokens().access_token().await.is_some()
    }

    /// Snapshot for the UI
    pub async fn state(&self) -> AuthState {
        if !self.is_authenticated().await {
            return AuthState::new();
        }
        match self.current_user().await {
            Some(user) => AuthState::signed_in(user),
            None => AuthState {
                authenticated: true,
                user: None,
                error: None,
            },
        }
    }
}
