//! # Connectivity Sources
//!
//! Where the network monitor gets its connectivity signal from.
//!
//! The platform layer (mobile shell, desktop host) forwards OS reachability
//! changes through [`ReachabilityProbe::notify`]. Hosts without such events
//! can call [`ReachabilityProbe::spawn_polling`] instead, which emits the
//! result of an active probe on a fixed interval.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const EVENT_BUFFER: usize = 32;

/// Source of connectivity events plus an active check
#[async_trait]
pub trait ConnectivitySource: Send + Sync {
    /// Stream of connectivity changes (`true` = connected)
    fn subscribe(&self) -> broadcast::Receiver<bool>;

    /// Actively test reachability
    async fn probe(&self) -> bool;
}

/// HTTP reachability check against a known endpoint
#[derive(Debug)]
pub struct ReachabilityProbe {
    client: reqwest::Client,
    url: String,
    events: broadcast::Sender<bool>,
}

impl ReachabilityProbe {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!("Falling back to default HTTP client for probing: {}", e);
                reqwest::Client::new()
            });
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            client,
            url: url.into(),
            events,
        }
    }

    /// Forward a platform connectivity event
    pub fn notify(&self, connected: bool) {
        // No receivers just means the monitor is not initialised yet
        let _ = self.events.send(connected);
    }

    /// Probe every `interval` and forward the result as an event
    pub fn spawn_polling(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let connected = self.probe().await;
                self.notify(connected);
            }
        })
    }
}

#[async_trait]
impl ConnectivitySource for ReachabilityProbe {
    fn subscribe(&self) -> broadcast::Receiver<bool> {
        self.events.subscribe()
    }

    async fn probe(&self) -> bool {
        // Any HTTP answer, even an error status, proves the server is reachable
        match self.client.get(&self.url).send().await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("Reachability probe to {} failed: {}", self.url, e);
                false
            }
        }
    }
}
