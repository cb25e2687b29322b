//! # Consent Evaluation Subsystem (mc-02)
//!
//! Answers "may `grantee` read `file_cid` right now?" in one of two modes:
//!
//! | Mode | Source | Consistency | Use |
//! |------|--------|-------------|-----|
//! | Authoritative | `getConsent` on the ledger | current | gating access |
//! | Derived | fold of the audit trail | lags by up to one poll interval | history, audit views |
//!
//! Authoritative: `active = stored_active && expires_at > now`.
//!
//! Derived: the latest `AccessGranted` for the key in `(block, log_index)`
//! order, inactive if a later `AccessRevoked` exists or `expires_at <= now`.
//! Emergency access never changes either answer; it only shows up in
//! [`ConsentEvaluationApi::emergency_history`].
//!
//! An absent consent is `Ok(None)`; a ledger failure is an
//! [`EvaluationError`].

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use domain::{
    emergency_records, fold_consent, ConsentStatus, ConsentTuple, EmergencyRecord,
    EvaluationError, EvaluationMode,
};
pub use ports::{ConsentEvaluationApi, ConsentLedger};
pub use service::{ConsentEvaluator, DEFAULT_CALL_TIMEOUT};
