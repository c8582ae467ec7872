/**
 * REST API Client
 *
 * Wraps every call to the health backend. Requests carry the stored bearer
 * token when one exists. A 401 triggers one token refresh and one replay of
 * the original request; a second 401 is returned to the caller as is.
 *
 * Refresh outcomes:
 * - no refresh token stored: auth state cleared, original 401 returned
 * - refresh rejected by the server: auth state cleared, `RefreshFailed`
 *   wrapping the refresh error returned
 * - refresh unreachable: auth state kept, transient network error returned
 *
 * Refreshes are serialized. A request whose 401 raced with a refresh that
 * already rotated the tokens replays with the new access token instead of
 * spending the rotated-out refresh token again.
 */

use super::tokens::{TokenPair, TokenStore};
use crate::client::registry::{CallbackRegistry, Subscription};
use crate::shared::config::AppConfig;
use crate::shared::error::{SyncError, SyncResult};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

const REFRESH_PATH: &str = "/auth/refresh";

/// Success envelope: `{"data": <payload>}`
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

/// Token refresh responses are accepted with or without the envelope
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MaybeEnveloped<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> MaybeEnveloped<T> {
    fn into_inner(self) -> T {
        match self {
            MaybeEnveloped::Wrapped { data } => data,
            MaybeEnveloped::Bare(inner) => inner,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// HTTP client with transparent token refresh
pub struct ApiClient {
    http: Client,
    base_url: String,
    tokens: TokenStore,
    session_expired: CallbackRegistry<()>,
    refresh_lock: Mutex<()>,
}

impl ApiClient {
    pub fn new(config: &AppConfig, tokens: TokenStore) -> SyncResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SyncError::network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            base_url: config.server_url.trim_end_matches('/').to_string(),
            tokens,
            session_expired: CallbackRegistry::new(),
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    /// Full URL for an endpoint path
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Called after auth state is cleared because the session cannot be renewed
    pub fn on_session_expired<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.session_expired.register(move |_| callback())
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> SyncResult<T> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> SyncResult<T> {
        let body = serde_json::to_value(body)?;
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> SyncResult<T> {
        let body = serde_json::to_value(body)?;
        self.request(Method::PUT, path, Some(body)).await
    }

    /// DELETE; the response body is ignored
    pub async fn delete(&self, path: &str) -> SyncResult<()> {
        self.send(Method::DELETE, path, None).await?;
        Ok(())
    }

    /// POST without credentials or refresh handling (login, logout)
    pub async fn post_public<B: Serialize + ?Sized, T: DeserializeOwned>(&self, path: &str, body: &B) -> SyncResult<T> {
        let body = serde_json::to_value(body)?;
        let response = self.dispatch(&Method::POST, path, Some(&body), None).await?;
        let response = ensure_success(response).await?;
        decode_envelope(response).await
    }

    /// Send a request and unwrap the `data` envelope
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> SyncResult<T> {
        let response = self.send(method, path, body.as_ref()).await?;
        decode_envelope(response).await
    }

    /// Send a request, refreshing credentials once on 401
    pub async fn send(&self, method: Method, path: &str, body: Option<&serde_json::Value>) -> SyncResult<Response> {
        let mut retried = false;
        loop {
            let token = self.tokens.access_token().await;
            let response = self.dispatch(&method, path, body, token.as_deref()).await?;

            if response.status() == StatusCode::UNAUTHORIZED && !retried {
                retried = true;
                let original = error_from_response(response).await;
                tracing::debug!("{} {} returned 401, refreshing session", method, path);
                self.refresh_session(token.as_deref(), original).await?;
                continue;
            }

            return ensure_success(response).await;
        }
    }

    async fn dispatch(
        &self,
        method: &Method,
        path: &str,
        body: Option<&serde_json::Value>,
        token: Option<&str>,
    ) -> SyncResult<Response> {
        let mut request = self.http.request(method.clone(), self.url(path));
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        request.send().await.map_err(SyncError::from)
    }

    /// `rejected` is the access token the server answered 401 to
    async fn refresh_session(&self, rejected: Option<&str>, original: SyncError) -> SyncResult<()> {
        let _refreshing = self.refresh_lock.lock().await;
        match (self.tokens.access_token().await.as_deref(), rejected) {
            (Some(current), _) if Some(current) != rejected => {
                tracing::debug!("Session already refreshed by a concurrent request");
                return Ok(());
            }
            (None, Some(_)) => {
                tracing::debug!("Session expired by a concurrent request");
                return Err(original);
            }
            _ => {}
        }

        let Some(refresh_token) = self.tokens.refresh_token().await else {
            tracing::warn!("Access token rejected and no refresh token stored");
            self.expire_session().await;
            return Err(original);
        };

        match self.exchange_refresh_token(&refresh_token).await {
            Ok(tokens) => {
                self.tokens.save(&tokens).await?;
                tracing::info!("Access token refreshed");
                Ok(())
            }
            Err(e) if e.is_transient() => {
                tracing::warn!("Token refresh unreachable, keeping session: {}", e);
                Err(e)
            }
            Err(e) => {
                tracing::warn!("Token refresh rejected, signing out: {}", e);
                self.expire_session().await;
                Err(SyncError::RefreshFailed(Box::new(e)))
            }
        }
    }

    async fn exchange_refresh_token(&self, refresh_token: &str) -> SyncResult<TokenPair> {
        let response = self
            .http
            .post(self.url(REFRESH_PATH))
            .json(&RefreshRequest { refresh_token })
            .send()
            .await?;
        let response = ensure_success(response).await?;
        let pair: MaybeEnveloped<TokenPair> = response.json().await?;
        Ok(pair.into_inner())
    }

    async fn expire_session(&self) {
        if let Err(e) = self.tokens.clear().await {
            tracing::error!("Failed to clear auth state: {}", e);
        }
        self.session_expired.emit(&());
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient").field("base_url", &self.base_url).finish_non_exhaustive()
    }
}

async fn ensure_success(response: Response) -> SyncResult<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(error_from_response(response).await)
    }
}

/// Build an `Http` error from the body's `message` field
async fn error_from_response(response: Response) -> SyncError {
    let status = response.status();
    let fallback = status.canonical_reason().unwrap_or("Request failed").to_string();
    let message = match response.text().await {
        Ok(text) => serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.message)
            .unwrap_or(fallback),
        Err(_) => fallback,
    };
    SyncError::http(status.as_u16(), message)
}

async fn decode_envelope<T: DeserializeOwned>(response: Response) -> SyncResult<T> {
    let bytes = response.bytes().await?;
    let envelope: Envelope<T> = serde_json::from_slice(&bytes)?;
    Ok(envelope.data)
}
