use shared_types::ProviderError;
use thiserror::Error;

/// Why an evaluation produced no answer.
///
/// "No consent" is not an error: it is `Ok(None)`.
#[derive(Debug, Clone, Error)]
pub enum EvaluationError {
    #[error("Ledger read failed: {0}")]
    Ledger(#[from] ProviderError),

    #[error("Invalid consent key: {reason}")]
    InvalidKey { reason: String },
}

impl EvaluationError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Ledger(e) if e.is_transient())
    }
}
