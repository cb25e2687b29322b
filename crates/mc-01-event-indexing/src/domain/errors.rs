//! # Domain Errors
//!
//! Error types for the Event Indexing subsystem, one per failure scope:
//!
//! - [`DecodeError`]: one log; recorded and skipped, the batch continues.
//! - [`StoreError`]: one append; the tick is abandoned before the cursor moves.
//! - [`PollError`]: one tick; never escalates past the tick.
//! - [`ConfigError`]: startup only; the process must not run partially configured.
//! - [`AbiError`]: a contract schema could not be built.

use shared_types::{Address, ProviderError, TxHash};
use thiserror::Error;

/// A single log could not be turned into a domain event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Filtered upstream; seeing this means the poller's address filter is broken.
    #[error("Log from unwatched contract {address:?}")]
    UnwatchedContract { address: Address },

    #[error("{event}: missing topic {index}")]
    MissingTopic { event: String, index: usize },

    #[error("{event}: data too short (need {needed} bytes, have {available})")]
    DataTooShort {
        event: String,
        needed: usize,
        available: usize,
    },

    #[error("{event}: invalid offset for parameter `{param}`")]
    InvalidOffset { event: String, param: String },

    #[error("{event}: parameter `{param}` is not valid UTF-8")]
    InvalidUtf8 { event: String, param: String },

    #[error("{event}: schema has no parameter `{param}`")]
    MissingArgument { event: String, param: String },

    #[error("{event}: parameter `{param}` is not of type {expected}")]
    ArgumentType {
        event: String,
        param: String,
        expected: &'static str,
    },

    /// The provider's entry itself could not be read.
    #[error("Unreadable provider log: {reason}")]
    Unreadable { reason: String },
}

/// A decode failure together with the log it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogDecodeFailure {
    pub tx_hash: TxHash,
    pub block_number: u64,
    pub log_index: u64,
    pub error: DecodeError,
}

/// A contract ABI could not be turned into an event schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AbiError {
    #[error("Unsupported ABI type: {0}")]
    UnsupportedType(String),

    #[error("Malformed ABI: {0}")]
    Malformed(String),
}

/// Persistence failures of the audit document or the cursor checkpoint.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("I/O error: {message}")]
    Io { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// The persisted document exists but cannot be read back.
    #[error("Corrupted store at {path}: {message}")]
    Corrupted { path: String, message: String },
}

impl StoreError {
    pub fn io(err: impl std::fmt::Display) -> Self {
        Self::Io {
            message: err.to_string(),
        }
    }

    pub fn serialization(err: impl std::fmt::Display) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}

/// Why a poll tick was abandoned.
#[derive(Debug, Clone, Error)]
pub enum PollError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Audit store append failed: {0}")]
    Store(#[from] StoreError),
}

impl PollError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Provider(e) if e.is_transient())
    }
}

/// Missing or invalid configuration; fatal at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Missing required configuration: {key}")]
    Missing { key: String },

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

impl ConfigError {
    pub fn missing(key: impl Into<String>) -> Self {
        Self::Missing { key: key.into() }
    }

    pub fn invalid(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            reason: reason.into(),
        }
    }
}
