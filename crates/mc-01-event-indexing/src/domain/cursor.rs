//! # Range Cursor
//!
//! Tracks the highest fully-processed block and hands out bounded scan
//! windows. The cursor only moves forward, and only through
//! [`RangeCursor::advance`], which the poller calls after the window's batch
//! is durably appended. A crash before that point leaves the cursor where it
//! was, so the same window is fetched again.

use shared_types::BlockNumber;
use std::fmt;

/// Inclusive block range `[from, to]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanWindow {
    pub from: BlockNumber,
    pub to: BlockNumber,
}

impl ScanWindow {
    /// `to - from`; the value bounded by the cursor's span.
    pub fn width(&self) -> u64 {
        self.to - self.from
    }
}

impl fmt::Display for ScanWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..={}]", self.from, self.to)
    }
}

/// Window bookkeeping for the log poller.
#[derive(Debug, Clone)]
pub struct RangeCursor {
    last_processed: Option<BlockNumber>,
    seed_backlog: u64,
    max_span: u64,
    min_span: u64,
    /// Current effective span; shrinks when the provider rejects ranges.
    span: u64,
}

impl RangeCursor {
    pub fn new(seed_backlog: u64, max_span: u64, min_span: u64) -> Self {
        let min_span = min_span.max(1).min(max_span.max(1));
        let max_span = max_span.max(min_span);
        Self {
            last_processed: None,
            seed_backlog,
            max_span,
            min_span,
            span: max_span,
        }
    }

    /// Resume from a checkpointed height instead of seeding.
    pub fn resume_from(mut self, last_processed: Option<BlockNumber>) -> Self {
        self.last_processed = last_processed;
        self
    }

    pub fn last_processed(&self) -> Option<BlockNumber> {
        self.last_processed
    }

    pub fn span(&self) -> u64 {
        self.span
    }

    /// Next window to scan given the chain head, or `None` when there is no
    /// new block.
    pub fn next_window(&self, latest: BlockNumber) -> Option<ScanWindow> {
        let from = match self.last_processed {
            None => latest.saturating_sub(self.seed_backlog),
            Some(last) => last.checked_add(1)?,
        };
        if latest < from {
            return None;
        }
        let to = latest.min(from.saturating_add(self.span));
        Some(ScanWindow { from, to })
    }

    /// Mark `window` as durably processed. Returns `false` (and changes
    /// nothing) if that would move the cursor backwards.
    pub fn advance(&mut self, window: ScanWindow) -> bool {
        match self.last_processed {
            Some(last) if window.to < last => false,
            _ => {
                self.last_processed = Some(window.to);
                true
            }
        }
    }

    /// Halve the span after the provider rejected a range.
    pub fn narrow(&mut self) -> u64 {
        self.span = (self.span / 2).max(self.min_span);
        self.span
    }

    /// Grow the span back toward the configured maximum after a good tick.
    pub fn relax(&mut self) -> u64 {
        self.span = self.span.saturating_mul(2).min(self.max_span);
        self.span
    }
}
