//! PolyStatus - monitor heartbeat and status engine
//!
//! Probes active targets, accepts heartbeats from passive ones, flags silent
//! monitors, and notifies owners through QQ and Bark when a monitor goes down
//! or recovers.

pub mod bark;
pub mod channel;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod io;
pub mod monitor;
pub mod notifier;
pub mod prober;
pub mod push;
pub mod qq;
pub mod recorder;
pub mod scheduler;
pub mod server;
pub mod store;
pub mod timeout;

pub use config::{load_config, Config};
pub use error::{PolyStatusError, Result};

use std::net::SocketAddr;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::dispatcher::NotificationDispatcher;
use crate::io::{HttpClient, ReqwestHttpClient};
use crate::prober::Prober;
use crate::recorder::HeartbeatRecorder;
use crate::scheduler::Scheduler;
use crate::server::AppState;
use crate::store::{MemoryStore, Store};

/// The wired engine: store, dispatcher, recorder and scheduler sharing one HTTP client
pub struct PolyStatus {
    store: Arc<dyn Store>,
    dispatcher: Arc<NotificationDispatcher>,
    recorder: Arc<HeartbeatRecorder>,
    scheduler: Scheduler,
}

impl std::fmt::Debug for PolyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolyStatus")
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl PolyStatus {
    pub fn new(config: &Config, store: Arc<dyn Store>, http: Arc<dyn HttpClient>) -> Self {
        let dispatcher = Arc::new(NotificationDispatcher::new(
            Arc::clone(&store),
            Arc::clone(&http),
            config.notifications.clone(),
        ));
        let recorder = Arc::new(HeartbeatRecorder::new(
            Arc::clone(&store),
            Arc::clone(&dispatcher),
        ));
        let scheduler = Scheduler::new(
            Arc::clone(&store),
            Arc::new(Prober::new(http)),
            Arc::clone(&recorder),
            config.scheduler.tick_interval(),
        );

        Self {
            store,
            dispatcher,
            recorder,
            scheduler,
        }
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn dispatcher(&self) -> &Arc<NotificationDispatcher> {
        &self.dispatcher
    }

    pub fn recorder(&self) -> &Arc<HeartbeatRecorder> {
        &self.recorder
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            store: Arc::clone(&self.store),
            recorder: Arc::clone(&self.recorder),
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }

    /// Stop ticking, then wait for probes and notices already underway
    pub async fn shutdown(&self) {
        self.scheduler.stop().await;
        self.scheduler.wait_for_probes().await;
        self.recorder.flush().await;
    }
}

/// Build a store holding the configured monitors and channels
pub async fn seed_store(config: &Config) -> Result<Arc<MemoryStore>> {
    let store = Arc::new(MemoryStore::new());
    for seed in &config.monitors {
        let monitor = store.insert_monitor(seed.to_monitor()?).await?;
        tracing::debug!("Seeded monitor '{}' ({})", monitor.name, monitor.id);
        // keys are never served by the API
        if let Some(key) = monitor.passive_key() {
            tracing::info!("Monitor '{}' accepts pushes at /api/v1/push/{}", monitor.name, key);
        }
    }
    for channel in &config.channels {
        store.insert_channel(channel.clone()).await?;
        tracing::debug!("Seeded {} channel '{}'", channel.kind(), channel.name);
    }
    Ok(store)
}

/// Run the polystatus service with the given configuration
pub async fn run(mut config: Config) -> Result<()> {
    config.apply_env();
    config.validate()?;

    let store = seed_store(&config).await?;
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());
    let engine = PolyStatus::new(&config, store, http);
    let cancel = CancellationToken::new();

    // Setup shutdown handler
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        cancel_for_signal.cancel();
    });

    let server = if config.server.enabled {
        let port = config.server.port;
        let bind_address = config.server.bind_address;
        let router = server::build_router(engine.app_state());
        let cancel_for_server = cancel.clone();

        Some(tokio::spawn(async move {
            let addr = SocketAddr::new(bind_address, port);
            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(l) => l,
                Err(e) => {
                    tracing::error!(
                        "Failed to bind API server to port {}: {}. Continuing without it.",
                        port,
                        e
                    );
                    return;
                }
            };
            tracing::info!("API listening on http://{}", addr);

            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    cancel_for_server.cancelled().await;
                })
                .await
            {
                tracing::error!("API server failed: {}", e);
            }
            tracing::debug!("API server stopped");
        }))
    } else {
        None
    };

    engine.scheduler().start().await;
    tracing::info!("PolyStatus engine started");

    cancel.cancelled().await;

    engine.shutdown().await;
    if let Some(server) = server {
        if let Err(e) = server.await {
            tracing::warn!("API server task ended abnormally: {}", e);
        }
    }
    tracing::info!("PolyStatus engine stopped");

    Ok(())
}
