use crate::domain::{ConsentStatus, EmergencyRecord, EvaluationError, EvaluationMode};
use mc_01_event_indexing::{AuditEntry, GrantKey};

/// Consent queries exposed to the query layer and the CLI.
#[async_trait::async_trait]
pub trait ConsentEvaluationApi: Send + Sync {
    /// Current decision for `key`. `Ok(None)` means no consent was ever
    /// granted; failures to reach the ledger are errors.
    async fn evaluate(
        &self,
        key: &GrantKey,
        mode: EvaluationMode,
    ) -> Result<Option<ConsentStatus>, EvaluationError>;

    /// Grant and revoke history of `key` in ledger order.
    fn history(&self, key: &GrantKey) -> Vec<AuditEntry>;

    /// Emergency overrides on a file in ledger order.
    fn emergency_history(&self, file_cid: &str) -> Vec<EmergencyRecord>;
}
