//! # Sync Context
//!
//! Builds every sync component once and wires them together. Screens hold a
//! `SyncContext` (or clones of the `Arc`s it hands out) instead of reaching
//! for globals.
//!
//! ## Wiring
//!
//! ```text
//! store -> cache, tokens -> api -> upload replayer -> queue
//!       -> network monitor (reconnect hook = queue) -> services
//!       -> realtime channel, auth
//! ```
//!
//! The queue is built before the vitals service so the service can enqueue
//! into it while the replayer it was built with sends the same uploads.

use crate::client::api::{ApiClient, TokenStore};
use crate::client::auth::AuthService;
use crate::client::cache::PersistentCache;
use crate::client::config::Config;
use crate::client::offline::OfflineQueue;
use crate::client::realtime::{ConnectionState, RealtimeChannel};
use crate::client::registry::Subscription;
use crate::client::services::{StudentService, UploadReplayer, VitalsService};
use crate::client::storage::{KeyValueStore, SqliteStore};
use crate::client::sync::{NetworkMonitor, ReachabilityProbe};
use crate::shared::error::SyncResult;
use std::sync::{Arc, Weak};

pub struct SyncContext {
    config: Config,
    store: Arc<dyn KeyValueStore>,
    cache: Arc<PersistentCache>,
    api: Arc<ApiClient>,
    queue: Arc<OfflineQueue>,
    probe: Arc<ReachabilityProbe>,
    monitor: Arc<NetworkMonitor>,
    realtime: Arc<RealtimeChannel>,
    auth: AuthService,
    students: StudentService,
    vitals: VitalsService,
    _session_expired: Subscription,
}

impl SyncContext {
    /// Open the SQLite store at the configured path and build the context
    pub async fn new(config: Config) -> SyncResult<Self> {
        let store = SqliteStore::open(config.storage_path()).await?;
        Self::with_store(config, Arc::new(store))
    }

    /// Build the context over an existing store
    pub fn with_store(config: Config, store: Arc<dyn KeyValueStore>) -> SyncResult<Self> {
        let app = config.app().clone();

        let cache = Arc::new(PersistentCache::new(Arc::clone(&store)));
        let tokens = TokenStore::new(Arc::clone(&store));
        let api = Arc::new(ApiClient::new(&app, tokens.clone())?);

        let uploader = UploadReplayer::new(Arc::clone(&api), Arc::clone(&cache));
        let queue = Arc::new(OfflineQueue::new(
            Arc::clone(&store),
            Arc::new(uploader.clone()),
            app.max_retries,
        ));

        let probe = Arc::new(ReachabilityProbe::new(app.probe_url(), app.request_timeout()));
        let monitor = Arc::new(NetworkMonitor::new(probe.clone()).with_reconnect_hook(queue.clone()));

        let students = StudentService::new(Arc::clone(&api), Arc::clone(&cache), app.profile_ttl());
        let vitals = VitalsService::new(uploader, Arc::clone(&queue), monitor.state(), app.vitals_ttl());

        let realtime = Arc::new(RealtimeChannel::new(&app, tokens));
        let auth = AuthService::new(Arc::clone(&api), Arc::clone(&cache), Arc::clone(&realtime));

        let expired_channel = Arc::downgrade(&realtime);
        let session_expired = api.on_session_expired(move || {
            if let Some(channel) = expired_channel.upgrade() {
                channel.disconnect();
            }
        });

        Ok(Self {
            config,
            store,
            cache,
            api,
            queue,
            probe,
            monitor,
            realtime,
            auth,
            students,
            vitals,
            _session_expired: session_expired,
        })
    }

    /// Begin monitoring connectivity and open the realtime channel
    pub async fn start(&self) {
        let already_started = self.monitor.is_initialized();
        self.monitor.init();

        if !already_started {
            let channel: Weak<RealtimeChannel> = Arc::downgrade(&self.realtime);
            // Lives until cleanup() clears the monitor's listeners
            let _ = self.monitor.add_listener(move |online| {
                let Some(channel) = channel.upgrade() else {
                    return;
                };
                if online && channel.state() == ConnectionState::Disconnected {
                    tokio::spawn(async move { channel.connect().await });
                }
            });
        }

        let online = self.monitor.check_connection().await;
        if online && self.queue.get_queue_size().await > 0 {
            let queue = Arc::clone(&self.queue);
            tokio::spawn(async move {
                if let Err(e) = queue.flush().await {
                    tracing::error!("Startup flush failed: {}", e);
                }
            });
        }

        self.realtime.connect().await;
        tracing::info!("Sync context started (online: {})", online);
    }

    /// Stop monitoring and close the realtime channel
    pub fn shutdown(&self) {
        self.monitor.cleanup();
        self.realtime.disconnect();
        tracing::info!("Sync context shut down");
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<PersistentCache> {
        &self.cache
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    pub fn queue(&self) -> &Arc<OfflineQueue> {
        &self.queue
    }

    /// Platform glue forwards OS connectivity events here
    pub fn probe(&self) -> &Arc<ReachabilityProbe> {
        &self.probe
    }

    pub fn monitor(&self) -> &Arc<NetworkMonitor> {
        &self.monitor
    }

    pub fn realtime(&self) -> &Arc<RealtimeChannel> {
        &self.realtime
    }

    pub fn auth(&self) -> &AuthService {
        &self.auth
    }

    pub fn students(&self) -> &StudentService {
        &self.students
    }

    pub fn vitals(&self) -> &VitalsService {
        &self.vitals
    }
}

impl Drop for SyncContext {
    fn drop(&mut self) {
        self.monitor.cleanup();
        self.realtime.disconnect();
    }
}
