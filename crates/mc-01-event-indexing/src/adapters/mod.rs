//! # Adapters Layer
//!
//! Implementations of the outbound ports that do not need a network:
//! JSON-file persistence, in-memory backends, an in-memory ledger and
//! clocks. The JSON-RPC ledger provider lives in the node runtime.

pub mod json_file;
pub mod ledger;
pub mod memory;
pub mod time;

pub use json_file::{JsonCheckpointStore, JsonFileBackend};
pub use ledger::InMemoryLedger;
pub use memory::{InMemoryBackend, InMemoryCheckpoint};
pub use time::{FixedTimeSource, SystemTimeSource};
