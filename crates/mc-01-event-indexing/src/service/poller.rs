//! # Log Poller
//!
//! Drives one scan at a time: chain height, window, logs, decode, append,
//! advance. The cursor only moves after the store has durably accepted the
//! window's batch, and nothing a single tick does escalates past that tick.

use crate::domain::{
    DecodeError, DecodedLog, EventDecoder, IndexerConfig, IndexerStats, LogDecodeFailure,
    PollError, RangeCursor, ScanWindow, StoreError, TickReport,
};
use crate::ports::outbound::{CheckpointStore, DocumentBackend, LedgerProvider, TimeSource};
use crate::service::store::AuditStore;
use shared_types::{ProviderError, RawLog, RejectedLog};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Collaborators of a [`LogPoller`].
pub struct PollerDependencies<P, B, C, T>
where
    B: DocumentBackend,
{
    pub provider: P,
    pub store: Arc<AuditStore<B>>,
    pub checkpoint: C,
    pub time_source: T,
}

pub struct LogPoller<P, B, C, T>
where
    P: LedgerProvider,
    B: DocumentBackend,
    C: CheckpointStore,
    T: TimeSource,
{
    provider: P,
    store: Arc<AuditStore<B>>,
    checkpoint: C,
    time_source: T,
    decoder: EventDecoder,
    cursor: RangeCursor,
    config: IndexerConfig,
    stats: IndexerStats,
}

impl<P, B, C, T> LogPoller<P, B, C, T>
where
    P: LedgerProvider,
    B: DocumentBackend + 'static,
    C: CheckpointStore,
    T: TimeSource,
{
    /// Build a poller, resuming from the checkpoint when one exists.
    pub fn new(
        config: IndexerConfig,
        decoder: EventDecoder,
        deps: PollerDependencies<P, B, C, T>,
    ) -> Result<Self, StoreError> {
        let resume = deps.checkpoint.load()?;
        match resume {
            Some(block) => info!("[mc-01] Resuming after block {}", block),
            None => info!(
                "[mc-01] No checkpoint, first window seeds {} blocks behind head",
                config.seed_backlog
            ),
        }

        let cursor = RangeCursor::new(config.seed_backlog, config.max_window, config.min_window)
            .resume_from(resume);

        Ok(Self {
            provider: deps.provider,
            store: deps.store,
            checkpoint: deps.checkpoint,
            time_source: deps.time_source,
            decoder,
            cursor,
            config,
            stats: IndexerStats::default(),
        })
    }

    pub fn stats(&self) -> IndexerStats {
        self.stats
    }

    pub fn cursor(&self) -> &RangeCursor {
        &self.cursor
    }

    pub fn store(&self) -> &Arc<AuditStore<B>> {
        &self.store
    }

    /// Run one tick to completion. The store append runs on the blocking
    /// pool, so the tick yields while the document is persisted.
    pub async fn tick(&mut self) -> Result<TickReport, PollError> {
        let result = self.scan().await;
        match &result {
            Ok(report) => self.stats.record(report),
            Err(_) => self.stats.record_failure(),
        }
        result
    }

    async fn scan(&mut self) -> Result<TickReport, PollError> {
        let timeout = self.config.provider_timeout;

        let latest = bounded(timeout, "eth_blockNumber", self.provider.chain_height()).await?;
        let Some(window) = self.cursor.next_window(latest) else {
            debug!("[mc-01] No new blocks (head {})", latest);
            return Ok(TickReport::idle());
        };
        debug!(from = window.from, to = window.to, "[mc-01] Scanning window");

        let addresses = self.decoder.watched_addresses();
        let fetched =
            bounded(timeout, "eth_getLogs", self.provider.get_logs(&addresses, window)).await;
        let fetched = match fetched {
            Ok(fetched) => fetched,
            Err(e) => {
                if e.is_range_too_large() {
                    let span = self.cursor.narrow();
                    self.stats.range_narrowings += 1;
                    warn!(
                        from = window.from,
                        to = window.to,
                        span,
                        "[mc-01] Provider rejected range, narrowing window"
                    );
                }
                return Err(e.into());
            }
        };

        let mut report = TickReport {
            window: Some(window),
            fetched: fetched.len(),
            ..TickReport::default()
        };

        record_rejected(fetched.rejected, &mut report);
        let batch = self.decode_window(window, fetched.logs, &mut report);

        // The append writes and syncs a file; keep it off the async workers.
        // Abandon the tick before the cursor moves; the window is re-fetched.
        let store = Arc::clone(&self.store);
        let outcome = tokio::task::spawn_blocking(move || store.append(batch))
            .await
            .map_err(|e| StoreError::io(format!("append task failed: {}", e)))??;
        report.appended = outcome.appended;
        report.duplicates = outcome.duplicates;

        self.cursor.advance(window);
        if let Err(e) = self.checkpoint.save(window.to) {
            warn!(
                block = window.to,
                error = %e,
                "[mc-01] Failed to persist cursor checkpoint"
            );
        }
        self.cursor.relax();

        if report.appended > 0
            || !report.decode_failures.is_empty()
            || report.unidentified_rejects > 0
        {
            info!(
                from = window.from,
                to = window.to,
                events = report.appended,
                duplicates = report.duplicates,
                skipped = report.skipped_unknown,
                failures = report.decode_failures.len(),
                unidentified = report.unidentified_rejects,
                "[mc-01] Indexed window"
            );
        }

        Ok(report)
    }

    /// Filter, order and decode the logs of one window.
    fn decode_window(
        &self,
        window: ScanWindow,
        mut logs: Vec<RawLog>,
        report: &mut TickReport,
    ) -> Vec<DecodedLog> {
        logs.retain(|log| {
            if log.removed {
                debug!(tx = ?log.transaction_hash, "[mc-01] Dropping removed log");
                return false;
            }
            if !self.decoder.watches(&log.address) {
                warn!(
                    address = ?log.address,
                    "[mc-01] Provider returned a log from an unwatched contract"
                );
                return false;
            }
            if log.block_number < window.from || log.block_number > window.to {
                warn!(
                    block = log.block_number,
                    "[mc-01] Provider returned a log outside the requested window"
                );
                return false;
            }
            true
        });
        logs.sort_by_key(RawLog::position);

        let ingested_at = self.time_source.now_millis();
        let mut batch = Vec::with_capacity(logs.len());
        for log in &logs {
            match self.decoder.decode(log, ingested_at) {
                Ok(Some(decoded)) => batch.push(decoded),
                Ok(None) => report.skipped_unknown += 1,
                Err(error) => {
                    warn!(
                        tx = ?log.transaction_hash,
                        log_index = log.log_index,
                        error = %error,
                        "[mc-01] Failed to decode log"
                    );
                    report.decode_failures.push(LogDecodeFailure {
                        tx_hash: log.transaction_hash,
                        block_number: log.block_number,
                        log_index: log.log_index,
                        error,
                    });
                }
            }
        }
        batch
    }

    /// Tick immediately, then on every interval until `shutdown` flips to
    /// `true`. An in-flight tick always runs to completion.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> IndexerStats {
        let mut interval = tokio::time::interval(self.config.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(
            interval_ms = self.config.poll_interval.as_millis() as u64,
            max_window = self.config.max_window,
            "[mc-01] Log poller started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            tokio::select! {
                _ = interval.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            match self.tick().await {
                Ok(_) => {}
                Err(e) if e.is_transient() => {
                    warn!(error = %e, "[mc-01] Transient provider error, retrying next tick");
                }
                Err(e) => {
                    error!(error = %e, "[mc-01] Tick abandoned");
                }
            }
        }

        let stats = self.stats;
        info!(
            ticks = stats.ticks,
            events = stats.events_appended,
            "[mc-01] Log poller stopped"
        );
        stats
    }
}

/// Unreadable provider entries become per-log failures when they can be
/// identified and are counted otherwise.
fn record_rejected(rejected: Vec<RejectedLog>, report: &mut TickReport) {
    for entry in rejected {
        warn!(
            tx = ?entry.transaction_hash,
            log_index = ?entry.log_index,
            reason = %entry.reason,
            "[mc-01] Provider returned an unreadable log"
        );
        match (entry.transaction_hash, entry.block_number, entry.log_index) {
            (Some(tx_hash), Some(block_number), Some(log_index)) => {
                report.decode_failures.push(LogDecodeFailure {
                    tx_hash,
                    block_number,
                    log_index,
                    error: DecodeError::Unreadable {
                        reason: entry.reason,
                    },
                });
            }
            _ => report.unidentified_rejects += 1,
        }
    }
}

/// Bound a provider call by `limit`; running out of time is transient.
async fn bounded<F, R>(limit: Duration, operation: &'static str, call: F) -> Result<R, ProviderError>
where
    F: Future<Output = Result<R, ProviderError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .unwrap_or_else(|_| Err(ProviderError::timeout(operation)))
}
