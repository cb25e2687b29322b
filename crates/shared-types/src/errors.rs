//! # Error Types
//!
//! Errors shared by every component that talks to the ledger provider.

use thiserror::Error;

/// Retryable provider conditions the indexer knows how to react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientKind {
    /// The provider rejected the block range as too wide.
    RangeTooLarge,
    /// A server-side filter expired between calls.
    FilterNotFound,
    /// The provider throttled the caller.
    RateLimited,
    /// The call did not complete within the configured bound.
    Timeout,
}

/// Errors raised by a ledger provider.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Retry next tick (possibly with a narrower window); never fatal.
    #[error("Transient provider error ({kind:?}): {message}")]
    Transient { kind: TransientKind, message: String },

    /// Unclassified failure; the tick is abandoned without advancing.
    #[error("Provider error: {0}")]
    Fatal(String),

    /// The provider answered with something that does not parse.
    #[error("Malformed provider response: {0}")]
    Malformed(String),
}

impl ProviderError {
    pub fn transient(kind: TransientKind, message: impl Into<String>) -> Self {
        Self::Transient {
            kind,
            message: message.into(),
        }
    }

    pub fn timeout(operation: &str) -> Self {
        Self::transient(TransientKind::Timeout, format!("{} timed out", operation))
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }

    pub fn is_range_too_large(&self) -> bool {
        matches!(
            self,
            Self::Transient {
                kind: TransientKind::RangeTooLarge,
                ..
            }
        )
    }
}
