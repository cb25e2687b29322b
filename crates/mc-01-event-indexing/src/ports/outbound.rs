//! # Outbound Ports (Driven Ports)
//!
//! SPIs required by the Event Indexing subsystem.

use crate::domain::{AuditDocument, ScanWindow, StoreError};
use shared_types::{Address, BlockNumber, LogBatch, ProviderError};

/// The ledger the indexer scans.
///
/// Implementations classify their failures: anything the poller may retry
/// on a later tick must come back as [`ProviderError::Transient`].
#[async_trait::async_trait]
pub trait LedgerProvider: Send + Sync {
    /// Current chain height.
    async fn chain_height(&self) -> Result<BlockNumber, ProviderError>;

    /// Every log emitted by `addresses` within the inclusive `window`.
    ///
    /// An entry that cannot be read goes into [`LogBatch::rejected`]; `Err`
    /// is reserved for a response that is unusable as a whole.
    async fn get_logs(
        &self,
        addresses: &[Address],
        window: ScanWindow,
    ) -> Result<LogBatch, ProviderError>;
}

/// Durable home of the audit document.
///
/// `persist` must be all-or-nothing: after an `Err`, a later `load` returns
/// the previously persisted document.
pub trait DocumentBackend: Send + Sync {
    /// `Ok(None)` when nothing has been persisted yet.
    fn load(&self) -> Result<Option<AuditDocument>, StoreError>;

    fn persist(&mut self, document: &AuditDocument) -> Result<(), StoreError>;
}

/// Last fully-processed block, kept across restarts.
pub trait CheckpointStore: Send + Sync {
    fn load(&self) -> Result<Option<BlockNumber>, StoreError>;

    fn save(&mut self, last_processed: BlockNumber) -> Result<(), StoreError>;
}

/// Abstract interface for time operations (for testability).
pub trait TimeSource: Send + Sync {
    /// Current timestamp in seconds since epoch.
    fn now(&self) -> u64;

    /// Current timestamp in milliseconds since epoch.
    fn now_millis(&self) -> u64 {
        self.now().saturating_mul(1000)
    }
}
