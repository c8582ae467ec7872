//! # Realtime Channel
//!
//! One WebSocket connection per process delivering `vitalSigns:update` and
//! `alert:new` pushes to registered callbacks.
//!
//! ## State Machine
//!
//! ```text
//! NoSocket --connect() + token--> Connecting --handshake--> Connected
//!     ^                              |  ^                       |
//!     |                              v  | retry (fixed delay)   v
//!     +------- disconnect() ------ Disconnected <----------- transport closed
//! ```
//!
//! - `connect()` is a no-op while `Connecting` or `Connected`.
//! - Without a stored access token the attempt is abandoned and the channel
//!   stays in `NoSocket`.
//! - After a drop the channel retries up to `reconnect_attempts` times with a
//!   fixed delay, then rests in `Disconnected` until `connect()` is called.
//! - `disconnect()` always ends in `NoSocket`.
//!
//! Each connection task carries a generation number; once `disconnect()` or a
//! new `connect()` bumps it, the old task can no longer publish state.

use crate::client::api::TokenStore;
use crate::client::registry::{CallbackRegistry, Subscription};
use crate::shared::config::AppConfig;
use crate::shared::error::{SyncError, SyncResult};
use crate::shared::event::{RealtimeEvent, VitalSignsUpdate};
use crate::shared::vitals::Alert;
use futures_util::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    NoSocket,
    Connecting,
    Connected,
    Disconnected,
}

#[derive(Debug, Clone)]
struct ChannelSettings {
    url: String,
    reconnect_attempts: u32,
    reconnect_delay: Duration,
}

/// State shared with the connection task
struct Shared {
    state: watch::Sender<ConnectionState>,
    generation: AtomicU64,
    vital_updates: CallbackRegistry<VitalSignsUpdate>,
    alerts: CallbackRegistry<Alert>,
}

impl Shared {
    /// Publish `next` unless generation `gen` has been superseded
    fn transition(&self, gen: u64, next: ConnectionState) -> bool {
        let mut current = true;
        self.state.send_if_modified(|state| {
            if self.generation.load(Ordering::Acquire) != gen {
                current = false;
                return false;
            }
            if *state == next {
                return false;
            }
            *state = next;
            true
        });
        current
    }

    fn dispatch(&self, text: &str) {
        match RealtimeEvent::from_frame(text) {
            Ok(Some(event)) => {
                tracing::debug!("Realtime {} received", event.event_type().wire_name());
                match event {
                    RealtimeEvent::VitalSignsUpdate(update) => {
                        self.vital_updates.emit(&update);
                    }
                    RealtimeEvent::AlertNew(alert) => {
                        tracing::info!("Alert {} for student {}", alert.id, alert.student_id);
                        self.alerts.emit(&alert);
                    }
                }
            }
            Ok(None) => tracing::debug!("Ignoring unhandled realtime event"),
            Err(e) => tracing::warn!("Malformed realtime frame: {}", e),
        }
    }
}

/// Push channel for live vitals and alerts
pub struct RealtimeChannel {
    settings: ChannelSettings,
    tokens: TokenStore,
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl RealtimeChannel {
    pub fn new(config: &AppConfig, tokens: TokenStore) -> Self {
        let (state, _) = watch::channel(ConnectionState::NoSocket);
        Self {
            settings: ChannelSettings {
                url: config.socket_url(),
                reconnect_attempts: config.reconnect_attempts,
                reconnect_delay: config.reconnect_delay(),
            },
            tokens,
            shared: Arc::new(Shared {
                state,
                generation: AtomicU64::new(0),
                vital_updates: CallbackRegistry::new(),
                alerts: CallbackRegistry::new(),
            }),
            task: Mutex::new(None),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Receiver that observes every state transition
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Open the connection if none is active or pending
    pub async fn connect(&self) {
        let mut gen = 0;
        let claimed = self.shared.state.send_if_modified(|state| match state {
            ConnectionState::Connecting | ConnectionState::Connected => false,
            _ => {
                gen = self.shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
                *state = ConnectionState::Connecting;
                true
            }
        });
        if !claimed {
            tracing::debug!("Realtime connect ignored: already {:?}", self.state());
            return;
        }

        if self.tokens.access_token().await.is_none() {
            tracing::debug!("No access token; realtime connection deferred");
            self.shared.transition(gen, ConnectionState::NoSocket);
            return;
        }

        // disconnect() bumps the generation while holding the task lock
        let mut task = self.lock_task();
        if self.shared.generation.load(Ordering::Acquire) != gen {
            tracing::debug!("Realtime connect superseded while reading the token");
            return;
        }
        let handle = tokio::spawn(run_connection(
            Arc::clone(&self.shared),
            self.settings.clone(),
            self.tokens.clone(),
            gen,
        ));
        if let Some(previous) = task.replace(handle) {
            previous.abort();
        }
    }

    /// Close the connection unconditionally
    pub fn disconnect(&self) {
        let mut task = self.lock_task();
        self.shared.state.send_modify(|state| {
            self.shared.generation.fetch_add(1, Ordering::AcqRel);
            *state = ConnectionState::NoSocket;
        });
        if let Some(handle) = task.take() {
            handle.abort();
        }
        drop(task);
        tracing::info!("Realtime channel disconnected");
    }

    /// Subscribe to `vitalSigns:update`
    pub fn on_vital_signs_update<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&VitalSignsUpdate) + Send + Sync + 'static,
    {
        self.shared.vital_updates.register(callback)
    }

    /// Subscribe to `alert:new`
    pub fn on_alert<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&Alert) + Send + Sync + 'static,
    {
        self.shared.alerts.register(callback)
    }

    fn lock_task(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.task.lock().unwrap_or_else(|p| p.into_inner())
    }
}

impl Drop for RealtimeChannel {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().unwrap_or_else(|p| p.into_inner()).take() {
            task.abort();
        }
    }
}

impl std::fmt::Debug for RealtimeChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeChannel")
            .field("url", &self.settings.url)
            .field("state", &self.state())
            .finish()
    }
}

/// Handshake URL carrying the access token
fn authenticated_url(base: &str, token: &str) -> SyncResult<String> {
    let mut url = Url::parse(base).map_err(|e| SyncError::socket(format!("{}: {}", base, e)))?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url.to_string())
}

async fn run_connection(shared: Arc<Shared>, settings: ChannelSettings, tokens: TokenStore, gen: u64) {
    let mut attempts: u32 = 0;
    loop {
        // Re-read each attempt so a refreshed token is picked up
        let Some(token) = tokens.access_token().await else {
            tracing::info!("Access token gone; abandoning realtime connection");
            shared.transition(gen, ConnectionState::NoSocket);
            return;
        };

        match open_and_read(&shared, &settings.url, &token, gen).await {
            Ok(()) => attempts = 0,
            Err(e) => tracing::warn!("Realtime connection failed: {}", e),
        }
        if !shared.transition(gen, ConnectionState::Disconnected) {
            return;
        }

        if attempts >= settings.reconnect_attempts {
            tracing::warn!(
                "Realtime channel giving up after {} reconnection attempts",
                settings.reconnect_attempts
            );
            return;
        }
        attempts += 1;
        tokio::time::sleep(settings.reconnect_delay).await;
        tracing::debug!("Realtime reconnection attempt {}/{}", attempts, settings.reconnect_attempts);
        if !shared.transition(gen, ConnectionState::Connecting) {
            return;
        }
    }
}

/// Connect and pump frames until the transport closes.
///
/// `Ok` means a connection was established, however it ended.
async fn open_and_read(shared: &Shared, base_url: &str, token: &str, gen: u64) -> SyncResult<()> {
    let url = authenticated_url(base_url, token)?;
    let (stream, _) = connect_async(url).await?;
    if !shared.transition(gen, ConnectionState::Connected) {
        return Ok(());
    }
    tracing::info!("Realtime channel connected to {}", base_url);

    let (_write, mut read) = stream.split();
    while let Some(message) = read.next().await {
        match message {
            Ok(Message::Text(text)) => shared.dispatch(text.as_str()),
            Ok(Message::Close(frame)) => {
                tracing::info!("Realtime channel closed by server: {:?}", frame);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Realtime read error: {}", e);
                break;
            }
        }
    }
    Ok(())
}
