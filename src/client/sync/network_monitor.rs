//! # Network Monitor
//!
//! Tracks connectivity, notifies listeners, and flushes the offline queue when
//! the device comes back online.
//!
//! ## Features
//!
//! - **Single subscription**: `init()` subscribes to the connectivity source
//!   once; repeated calls are ignored until `cleanup()`.
//! - **Late subscribers**: `add_listener` invokes the new callback with the
//!   current state before returning.
//! - **Reconnect flush**: only a disconnected → connected transition triggers
//!   the reconnect hook. The hook runs on its own task; its errors are logged
//!   and never reach the event loop.
//! - **Shared state**: [`NetworkState`] handles let any component read the
//!   current connectivity without owning the monitor.

use super::connectivity::ConnectivitySource;
use crate::client::offline::OfflineQueue;
use crate::client::registry::{CallbackRegistry, ListenerId, Subscription};
use crate::shared::error::SyncResult;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Work to run when connectivity is restored
#[async_trait]
pub trait ReconnectHook: Send + Sync {
    async fn on_reconnect(&self) -> SyncResult<()>;
}

#[async_trait]
impl ReconnectHook for OfflineQueue {
    async fn on_reconnect(&self) -> SyncResult<()> {
        self.flush().await.map(|_| ())
    }
}

/// Read-only view of the process-wide connectivity flag
#[derive(Debug, Clone)]
pub struct NetworkState {
    rx: watch::Receiver<bool>,
}

impl NetworkState {
    pub fn is_online(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the device is online
    pub async fn wait_for_online(&mut self) {
        // The sender lives as long as the monitor; if it is gone, stop waiting
        let _ = self.rx.wait_for(|online| *online).await;
    }

    /// A state that never changes, for components running without a monitor
    pub fn fixed(online: bool) -> Self {
        let (tx, rx) = watch::channel(online);
        // Keep the receiver valid after the sender is dropped
        drop(tx);
        Self { rx }
    }
}

/// Connectivity tracker
pub struct NetworkMonitor {
    source: Arc<dyn ConnectivitySource>,
    state: watch::Sender<bool>,
    listeners: CallbackRegistry<bool>,
    reconnect_hook: Option<Arc<dyn ReconnectHook>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl NetworkMonitor {
    /// Create a monitor that assumes the device starts online
    pub fn new(source: Arc<dyn ConnectivitySource>) -> Self {
        let (state, _) = watch::channel(true);
        Self {
            source,
            state,
            listeners: CallbackRegistry::new(),
            reconnect_hook: None,
            task: Mutex::new(None),
        }
    }

    pub fn with_initial_state(self, connected: bool) -> Self {
        self.state.send_replace(connected);
        self
    }

    /// Run `hook` on every disconnected → connected transition
    pub fn with_reconnect_hook(mut self, hook: Arc<dyn ReconnectHook>) -> Self {
        self.reconnect_hook = Some(hook);
        self
    }

    /// Subscribe to the connectivity source. Idempotent.
    pub fn init(self: &Arc<Self>) {
        let mut task = self.task.lock().unwrap_or_else(|p| p.into_inner());
        if task.is_some() {
            tracing::debug!("Network monitor already initialised");
            return;
        }

        let mut events = self.source.subscribe();
        let monitor: Weak<Self> = Arc::downgrade(self);
        *task = Some(tokio::spawn(async move {
            loop {
                let connected = match events.recv().await {
                    Ok(connected) => connected,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Network monitor missed {} connectivity events", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                match monitor.upgrade() {
                    Some(monitor) => monitor.handle_change(connected),
                    None => break,
                }
            }
            tracing::debug!("Connectivity event loop stopped");
        }));
        tracing::info!("Network monitor initialised");
    }

    /// Unsubscribe from the source and drop every listener
    pub fn cleanup(&self) {
        if let Some(task) = self.task.lock().unwrap_or_else(|p| p.into_inner()).take() {
            task.abort();
        }
        self.listeners.clear();
        tracing::info!("Network monitor cleaned up");
    }

    pub fn is_initialized(&self) -> bool {
        self.task.lock().unwrap_or_else(|p| p.into_inner()).is_some()
    }

    /// Register a listener; it is invoked immediately with the current state
    pub fn add_listener<F>(&self, callback: F) -> Subscription
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let callback = Arc::new(callback);
        let registered = Arc::clone(&callback);
        let subscription = self.listeners.register(move |connected: &bool| registered(*connected));
        callback(self.is_connected());
        subscription
    }

    /// Remove a listener by id
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Last known connectivity
    pub fn is_connected(&self) -> bool {
        *self.state.borrow()
    }

    /// Handle for components that only read connectivity
    pub fn state(&self) -> NetworkState {
        NetworkState {
            rx: self.state.subscribe(),
        }
    }

    /// Probe actively and record the result
    pub async fn check_connection(&self) -> bool {
        let connected = self.source.probe().await;
        self.handle_change(connected);
        connected
    }

    /// Apply a connectivity event
    pub fn handle_change(&self, connected: bool) {
        let was_connected = self.state.send_replace(connected);
        if was_connected != connected {
            tracing::info!("Network {}", if connected { "online" } else { "offline" });
        }

        self.listeners.emit(&connected);

        if !was_connected && connected {
            self.trigger_reconnect();
        }
    }

    fn trigger_reconnect(&self) {
        let Some(hook) = self.reconnect_hook.clone() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime available; skipping reconnect flush");
            return;
        };
        runtime.spawn(async move {
            if let Err(e) = hook.on_reconnect().await {
                tracing::error!("Reconnect flush failed: {}", e);
            }
        });
    }
}

impl Drop for NetworkMonitor {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().unwrap_or_else(|p| p.into_inner()).take() {
            task.abort();
        }
    }
}
