//! # Domain Layer
//!
//! Pure consent logic: status types, the derived-mode fold and the
//! emergency history view. No I/O.

pub mod errors;
pub mod fold;
pub mod status;

pub use errors::EvaluationError;
pub use fold::{emergency_records, fold_consent};
pub use status::{ConsentStatus, ConsentTuple, EmergencyRecord, EvaluationMode};
