//! # Shared Types Crate
//!
//! Ledger primitives used by every MedChain subsystem.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: the raw log record and its ordering key are
//!   defined once here, so the indexer and the evaluator agree on what
//!   "the same on-chain log" means.
//! - **Ledger-native widths**: addresses are 20 bytes, hashes and topics are
//!   32 bytes, integers are `U256` until the Numeric Normalizer turns them
//!   into a storage-safe representation.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
