//! In-memory ledger provider with fault injection.
//!
//! Serves logs from a local list and can be told to fail the next calls,
//! reject ranges above a width, or stall past a caller's timeout.

use crate::domain::ScanWindow;
use crate::ports::outbound::LedgerProvider;
use parking_lot::Mutex;
use shared_types::{
    Address, BlockNumber, LogBatch, ProviderError, RawLog, RejectedLog, TransientKind,
};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct LedgerState {
    height: BlockNumber,
    logs: Vec<RawLog>,
    rejected: Vec<RejectedLog>,
    height_failures: VecDeque<ProviderError>,
    log_failures: VecDeque<ProviderError>,
    max_range: Option<u64>,
    stall: Option<Duration>,
    requested: Vec<ScanWindow>,
}

/// Clones share the same ledger.
#[derive(Clone, Default)]
pub struct InMemoryLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_height(&self, height: BlockNumber) {
        self.state.lock().height = height;
    }

    /// Add a log and raise the height to cover it.
    pub fn push_log(&self, log: RawLog) {
        let mut state = self.state.lock();
        state.height = state.height.max(log.block_number);
        state.logs.push(log);
    }

    /// Add an entry the provider cannot read. It is served with any window
    /// covering its block, or with every window when the block is unknown.
    pub fn push_rejected(&self, rejected: RejectedLog) {
        let mut state = self.state.lock();
        if let Some(block) = rejected.block_number {
            state.height = state.height.max(block);
        }
        state.rejected.push(rejected);
    }

    pub fn fail_next_height(&self, error: ProviderError) {
        self.state.lock().height_failures.push_back(error);
    }

    pub fn fail_next_logs(&self, error: ProviderError) {
        self.state.lock().log_failures.push_back(error);
    }

    /// Reject `get_logs` windows wider than `width` as `RangeTooLarge`.
    pub fn limit_range(&self, width: u64) {
        self.state.lock().max_range = Some(width);
    }

    /// Delay every call by `delay`.
    pub fn stall(&self, delay: Option<Duration>) {
        self.state.lock().stall = delay;
    }

    /// Windows passed to `get_logs`, in call order.
    pub fn requested_windows(&self) -> Vec<ScanWindow> {
        self.state.lock().requested.clone()
    }

    async fn maybe_stall(&self) {
        let stall = self.state.lock().stall;
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait::async_trait]
impl LedgerProvider for InMemoryLedger {
    async fn chain_height(&self) -> Result<BlockNumber, ProviderError> {
        self.maybe_stall().await;
        let mut state = self.state.lock();
        match state.height_failures.pop_front() {
            Some(error) => Err(error),
            None => Ok(state.height),
        }
    }

    async fn get_logs(
        &self,
        addresses: &[Address],
        window: ScanWindow,
    ) -> Result<LogBatch, ProviderError> {
        self.maybe_stall().await;
        let mut state = self.state.lock();
        state.requested.push(window);

        if let Some(error) = state.log_failures.pop_front() {
            return Err(error);
        }
        if let Some(max) = state.max_range {
            if window.width() > max {
                return Err(ProviderError::transient(
                    TransientKind::RangeTooLarge,
                    format!("invalid block range: {} exceeds {}", window, max),
                ));
            }
        }

        let logs = state
            .logs
            .iter()
            .filter(|log| addresses.contains(&log.address))
            .filter(|log| log.block_number >= window.from && log.block_number <= window.to)
            .cloned()
            .collect();
        let rejected = state
            .rejected
            .iter()
            .filter(|r| {
                r.block_number
                    .map_or(true, |block| block >= window.from && block <= window.to)
            })
            .cloned()
            .collect();
        Ok(LogBatch { logs, rejected })
    }
}
