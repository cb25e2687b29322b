//! # Ports Layer
//!
//! - **Inbound**: [`ConsentEvaluationApi`].
//! - **Outbound**: [`ConsentLedger`] for authoritative reads. Derived reads
//!   go through the audit store's `AuditQueryApi`.

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
