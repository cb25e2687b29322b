//! # Event Indexing Subsystem (mc-01)
//!
//! Scans the ledger for consent and audit events, decodes them into typed
//! domain facts and folds them into a durable, replay-safe audit trail with
//! a materialized "current grant" view.
//!
//! ## Data Flow
//!
//! ```text
//! LedgerProvider ──height──→ RangeCursor ──window──→ LedgerProvider::get_logs
//!                                                          │
//!                                                          ↓
//!                                                   [EventDecoder]
//!                                                          │
//!                                            DomainEvent (normalized)
//!                                                          ↓
//!                                                   AuditStore::append
//!                                                          │ durable
//!                                                          ↓
//!                                          RangeCursor::advance + checkpoint
//! ```
//!
//! ## Domain Invariants
//!
//! | Invariant | Enforcement | Location |
//! |-----------|-------------|----------|
//! | Append before advance | cursor moves only after `append` returns `Ok` | `service/poller.rs` |
//! | Atomic batches | snapshot swapped only after a durable write | `service/store.rs` |
//! | At-most-once per log | `(tx_hash, log_index)` dedup set | `domain/document.rs` |
//! | No stale transitions | grant updates ordered by `(block, log_index)`; latest revoke kept per key | `domain/document.rs` |
//! | Per-log failures | unreadable or undecodable logs never fail the window | `service/poller.rs` |
//! | Bounded windows | span clamped, halved on provider rejection | `domain/cursor.rs` |
//! | Storage-safe integers | values above 2^53-1 kept as decimal strings | `domain/normalize.rs` |
//!
//! ## Hexagonal Architecture
//!
//! - **Domain Layer** (`domain/`): decoding, normalization, cursor, document fold
//! - **Ports Layer** (`ports/`): audit query API, provider / backend / clock SPIs
//! - **Adapters Layer** (`adapters/`): JSON files, in-memory backends, clocks
//! - **Service Layer** (`service/`): audit store and log poller

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{
    AbiError, AuditDocument, AuditEntry, ConfigError, ContractSchema, DecodeError, DecodedLog,
    DomainEvent, EventDecoder, EventKind, GrantKey, GrantRecord, IndexerConfig, IndexerStats,
    LedgerUint, LogDecodeFailure, Normalize, PollError, Provenance, RangeCursor, ScanWindow,
    StoreError, TickReport,
};
pub use ports::{
    AuditFilter, AuditQueryApi, CheckpointStore, DocumentBackend, LedgerProvider, TimeSource,
};
pub use service::{AuditStore, LogPoller, PollerDependencies};
