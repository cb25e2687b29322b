//! # Core Ledger Entities
//!
//! ## Clusters
//!
//! - **Identity**: `Address`, `TxHash`, `Topic`
//! - **Ordering**: `LogPosition`, `LogId`
//! - **Raw input**: `RawLog`, `ContractRole`

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;

// Re-export the wide primitives so downstream crates do not pin their own copy.
pub use primitive_types::{H160, H256, U256};

/// A 20-byte Ethereum-style account or contract address.
pub type Address = H160;

/// A 32-byte transaction hash.
pub type TxHash = H256;

/// A 32-byte log topic (event signature hash or indexed argument).
pub type Topic = H256;

/// Block height.
pub type BlockNumber = u64;

/// Keccak-256 of arbitrary bytes.
///
/// Note: this is the pre-standard Keccak used throughout Ethereum, not SHA3-256.
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Topic hash of a canonical event signature such as
/// `AccessRevoked(address,address,string)`.
pub fn event_topic(signature: &str) -> Topic {
    H256::from(keccak256(signature.as_bytes()))
}

/// 4-byte function selector of a canonical function signature.
pub fn function_selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Natural ordering key of an on-chain log: `(block_number, log_index)`.
///
/// `log_index` is the position of the log within its block, so this pair is
/// a total order over every log the ledger ever emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LogPosition {
    pub block_number: BlockNumber,
    pub log_index: u64,
}

impl LogPosition {
    pub fn new(block_number: BlockNumber, log_index: u64) -> Self {
        Self {
            block_number,
            log_index,
        }
    }
}

impl fmt::Display for LogPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}:{}", self.block_number, self.log_index)
    }
}

/// Deduplication identity of a delivered log: `(tx_hash, log_index)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogId {
    pub tx_hash: TxHash,
    pub log_index: u64,
}

/// Which watched contract emitted a log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContractRole {
    /// The consent registry (grants, revokes, emergency access).
    ConsentManager,
    /// The independent on-chain audit logger.
    AuditLogger,
}

impl ContractRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConsentManager => "ConsentManager",
            Self::AuditLogger => "AuditLogger",
        }
    }
}

impl fmt::Display for ContractRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A log record exactly as the ledger provider returned it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLog {
    /// Emitting contract.
    pub address: Address,
    /// `topics[0]` is the event signature hash for non-anonymous events.
    pub topics: Vec<Topic>,
    /// ABI-encoded non-indexed arguments.
    pub data: Vec<u8>,
    pub block_number: BlockNumber,
    pub transaction_hash: TxHash,
    pub log_index: u64,
    /// Set by providers when the log was dropped by a reorg.
    pub removed: bool,
}

impl RawLog {
    pub fn position(&self) -> LogPosition {
        LogPosition::new(self.block_number, self.log_index)
    }

    /// Event signature topic, if any.
    pub fn signature(&self) -> Option<&Topic> {
        self.topics.first()
    }
}

/// A provider log entry that could not be read as a [`RawLog`]. Identity
/// fields are kept when they were readable on their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedLog {
    pub transaction_hash: Option<TxHash>,
    pub block_number: Option<BlockNumber>,
    pub log_index: Option<u64>,
    pub reason: String,
}

/// Everything the provider returned for one window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogBatch {
    pub logs: Vec<RawLog>,
    /// Dropped one entry at a time; the rest of the window still counts.
    pub rejected: Vec<RejectedLog>,
}

impl LogBatch {
    /// Entries received, readable or not.
    pub fn len(&self) -> usize {
        self.logs.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.is_empty() && self.rejected.is_empty()
    }
}

impl From<Vec<RawLog>> for LogBatch {
    fn from(logs: Vec<RawLog>) -> Self {
        Self {
            logs,
            rejected: Vec::new(),
        }
    }
}

/// Lowercase `0x`-prefixed hex rendering used in logs and error messages.
pub fn to_hex_prefixed(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}
