//! # Value Objects
//!
//! Configuration of the indexer and the per-tick / cumulative counters it
//! reports.

use crate::domain::cursor::ScanWindow;
use crate::domain::errors::{ConfigError, LogDecodeFailure};
use std::path::PathBuf;
use std::time::Duration;

/// Blocks re-scanned behind the head on a first run with no checkpoint.
pub const DEFAULT_SEED_BACKLOG: u64 = 50;

/// Largest block span requested from the provider in one call.
pub const DEFAULT_MAX_WINDOW: u64 = 2000;

/// Configuration for the event indexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexerConfig {
    /// Delay between poll ticks (default: 4s).
    pub poll_interval: Duration,
    /// First-run look-back (default: 50 blocks).
    pub seed_backlog: u64,
    /// Maximum window span (default: 2000 blocks).
    pub max_window: u64,
    /// Floor for the adaptive span after range rejections (default: 1 block).
    pub min_window: u64,
    /// Bound on each provider round-trip (default: 10s).
    pub provider_timeout: Duration,
    /// The audit document (default: `audit_db.json`).
    pub store_path: PathBuf,
    /// Cursor checkpoint; `None` derives `<store>.cursor.json`.
    pub checkpoint_path: Option<PathBuf>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(4),
            seed_backlog: DEFAULT_SEED_BACKLOG,
            max_window: DEFAULT_MAX_WINDOW,
            min_window: 1,
            provider_timeout: Duration::from_secs(10),
            store_path: PathBuf::from("audit_db.json"),
            checkpoint_path: None,
        }
    }
}

impl IndexerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError::invalid("poll_interval", "must be non-zero"));
        }
        if self.provider_timeout.is_zero() {
            return Err(ConfigError::invalid("provider_timeout", "must be non-zero"));
        }
        if self.max_window == 0 {
            return Err(ConfigError::invalid("max_window", "must be at least 1"));
        }
        if self.min_window == 0 || self.min_window > self.max_window {
            return Err(ConfigError::invalid(
                "min_window",
                format!("must be within 1..={}", self.max_window),
            ));
        }
        if self.store_path.as_os_str().is_empty() {
            return Err(ConfigError::invalid("store_path", "must not be empty"));
        }
        Ok(())
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        match &self.checkpoint_path {
            Some(path) => path.clone(),
            None => self.store_path.with_extension("cursor.json"),
        }
    }
}

/// What one poll tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// `None` when the chain had no new blocks.
    pub window: Option<ScanWindow>,
    pub fetched: usize,
    pub appended: usize,
    pub duplicates: usize,
    pub skipped_unknown: usize,
    pub decode_failures: Vec<LogDecodeFailure>,
    /// Unreadable provider entries with no usable `(tx_hash, log_index)`.
    pub unidentified_rejects: usize,
}

impl TickReport {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.window.is_none()
    }
}

/// Cumulative counters across ticks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexerStats {
    pub ticks: u64,
    pub idle_ticks: u64,
    pub failed_ticks: u64,
    pub logs_fetched: u64,
    pub events_appended: u64,
    pub duplicates_dropped: u64,
    pub unknown_skipped: u64,
    pub decode_failures: u64,
    pub unidentified_rejects: u64,
    pub range_narrowings: u64,
}

impl IndexerStats {
    pub fn record(&mut self, report: &TickReport) {
        self.ticks += 1;
        if report.is_idle() {
            self.idle_ticks += 1;
        }
        self.logs_fetched += report.fetched as u64;
        self.events_appended += report.appended as u64;
        self.duplicates_dropped += report.duplicates as u64;
        self.unknown_skipped += report.skipped_unknown as u64;
        self.decode_failures += report.decode_failures.len() as u64;
        self.unidentified_rejects += report.unidentified_rejects as u64;
    }

    pub fn record_failure(&mut self) {
        self.ticks += 1;
        self.failed_ticks += 1;
    }
}
