//! Ledger JSON-RPC adapter.

pub mod client;
pub mod types;

pub use client::{classify_rpc_error, decode_consent_tuple, get_consent_calldata, JsonRpcClient};
