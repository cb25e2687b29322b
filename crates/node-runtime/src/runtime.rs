//! # Indexer Runtime
//!
//! Wires the JSON-RPC provider, the JSON file store and the system clock
//! into the subsystems, and owns the poller task's lifecycle.

use std::sync::Arc;
use std::time::Duration;

use mc_01_event_indexing::adapters::{JsonCheckpointStore, JsonFileBackend, SystemTimeSource};
use mc_01_event_indexing::{
    AuditStore, EventDecoder, IndexerStats, LogPoller, PollerDependencies, StoreError,
};
use mc_02_consent_evaluation::ConsentEvaluator;
use shared_types::ProviderError;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::RuntimeConfig;
use crate::rpc::JsonRpcClient;

/// Time the poller gets to finish its current tick after shutdown.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(15);

pub type RuntimeStore = AuditStore<JsonFileBackend>;

pub type RuntimePoller =
    LogPoller<JsonRpcClient, JsonFileBackend, JsonCheckpointStore, SystemTimeSource>;

pub type RuntimeEvaluator = ConsentEvaluator<JsonRpcClient, RuntimeStore, SystemTimeSource>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Provider setup failed: {0}")]
    Provider(#[from] ProviderError),
    #[error("Audit store unavailable: {0}")]
    Store(#[from] StoreError),
}

/// Open the audit document named by the config. A corrupted file is an error.
pub fn open_store(config: &RuntimeConfig) -> Result<Arc<RuntimeStore>, RuntimeError> {
    let backend = JsonFileBackend::new(&config.indexer.store_path);
    Ok(Arc::new(AuditStore::open(backend)?))
}

pub fn build_poller(
    config: &RuntimeConfig,
    store: Arc<RuntimeStore>,
) -> Result<RuntimePoller, RuntimeError> {
    let provider = JsonRpcClient::new(
        config.rpc_url.clone(),
        config.consent_manager.address,
        config.indexer.provider_timeout,
    )?;
    let deps = PollerDependencies {
        provider,
        store,
        checkpoint: JsonCheckpointStore::new(config.indexer.checkpoint_path()),
        time_source: SystemTimeSource,
    };
    let decoder = EventDecoder::new(config.contracts());
    Ok(LogPoller::new(config.indexer.clone(), decoder, deps)?)
}

pub fn build_evaluator(
    config: &RuntimeConfig,
    store: Arc<RuntimeStore>,
) -> Result<RuntimeEvaluator, RuntimeError> {
    let ledger = JsonRpcClient::new(
        config.rpc_url.clone(),
        config.consent_manager.address,
        config.indexer.provider_timeout,
    )?;
    Ok(ConsentEvaluator::new(ledger, store, SystemTimeSource)
        .with_call_timeout(config.indexer.provider_timeout))
}

/// The long-running indexer process.
pub struct IndexerRuntime {
    store: Arc<RuntimeStore>,
    poller: Option<RuntimePoller>,
    task: Option<JoinHandle<IndexerStats>>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl IndexerRuntime {
    pub fn new(config: &RuntimeConfig) -> Result<Self, RuntimeError> {
        info!(
            rpc = %config.rpc_endpoint(),
            consent_manager = ?config.consent_manager.address,
            audit_logger = ?config.audit_logger.address,
            store = %config.indexer.store_path.display(),
            "Creating MedChain indexer runtime"
        );
        let store = open_store(config)?;
        info!(entries = store.len(), "[mc-01] Audit document loaded");
        let poller = build_poller(config, Arc::clone(&store))?;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Ok(Self {
            store,
            poller: Some(poller),
            task: None,
            shutdown_tx,
            shutdown_rx,
        })
    }

    pub fn store(&self) -> &Arc<RuntimeStore> {
        &self.store
    }

    /// Spawn the poller. Calling it twice is a no-op.
    pub fn start(&mut self) {
        if let Some(poller) = self.poller.take() {
            let shutdown = self.shutdown_rx.clone();
            self.task = Some(tokio::spawn(poller.run(shutdown)));
        }
    }

    /// Signal the poller, wait for its current tick to finish, and return
    /// its counters.
    pub async fn shutdown(mut self) -> Option<IndexerStats> {
        info!("Initiating graceful shutdown...");
        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        let task = self.task.take()?;
        match tokio::time::timeout(SHUTDOWN_GRACE, task).await {
            Ok(Ok(stats)) => Some(stats),
            Ok(Err(e)) => {
                error!("[mc-01] Poller task failed: {}", e);
                None
            }
            Err(_) => {
                warn!("[mc-01] Poller did not stop within {:?}", SHUTDOWN_GRACE);
                None
            }
        }
    }
}
