//! # Domain Layer
//!
//! Pure logic of the Event Indexing subsystem: ABI decoding, numeric
//! normalization, window bookkeeping and the audit document fold.
//!
//! This module contains NO I/O. Providers, persistence and clocks are
//! reached through the traits in [`crate::ports`].

pub mod abi;
pub mod cursor;
pub mod decoder;
pub mod document;
pub mod errors;
pub mod events;
pub mod normalize;
pub mod value_objects;

pub use abi::{AbiType, AbiValue, ContractSchema, EventSchema, ParamSpec};
pub use cursor::{RangeCursor, ScanWindow};
pub use decoder::EventDecoder;
pub use document::{AuditDocument, BatchOutcome};
pub use errors::*;
pub use events::*;
pub use normalize::{LedgerUint, Normalize, MAX_EXACT_INTEGER};
pub use value_objects::*;
