//! # Ports Layer
//!
//! - **Driving Ports (Inbound)**: the audit query API.
//! - **Driven Ports (Outbound)**: ledger provider, document backend,
//!   checkpoint store, clock.

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
