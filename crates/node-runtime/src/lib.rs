//! # MedChain Node Runtime
//!
//! Process-level glue for the consent indexer: environment configuration,
//! logging, the ledger JSON-RPC adapter, and the poller lifecycle.
//!
//! ## Binaries
//!
//! - `medchain-indexer`: tails `ConsentManager` and `AuditLogger` logs into
//!   the audit document until Ctrl-C.
//! - `consent-check`: prints the consent status for one `(fileCid, grantee)`.
//!
//! ## Startup Sequence
//!
//! 1. Load [`config::RuntimeConfig`] from the environment (fatal on error)
//! 2. Initialize logging
//! 3. Open the audit document (fatal if corrupted)
//! 4. Resume the cursor from the checkpoint, or seed from `height - backlog`
//! 5. Spawn the poller; stop it on Ctrl-C

pub mod config;
pub mod deployments;
pub mod rpc;
pub mod runtime;
pub mod telemetry;

pub use config::{LogConfig, RuntimeConfig};
pub use runtime::{build_evaluator, build_poller, open_store, IndexerRuntime, RuntimeError};
