//! # Consent Evaluator Service

use crate::domain::{
    emergency_records, fold_consent, ConsentStatus, EmergencyRecord, EvaluationError,
    EvaluationMode,
};
use crate::ports::inbound::ConsentEvaluationApi;
use crate::ports::outbound::ConsentLedger;
use mc_01_event_indexing::{AuditEntry, AuditFilter, AuditQueryApi, EventKind, GrantKey, TimeSource};
use shared_types::ProviderError;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Default bound on one authoritative ledger read.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ConsentEvaluator<L, Q, T>
where
    L: ConsentLedger,
    Q: AuditQueryApi + ?Sized,
    T: TimeSource,
{
    ledger: L,
    audit: Arc<Q>,
    time_source: T,
    call_timeout: Duration,
}

impl<L, Q, T> ConsentEvaluator<L, Q, T>
where
    L: ConsentLedger,
    Q: AuditQueryApi + ?Sized,
    T: TimeSource,
{
    pub fn new(ledger: L, audit: Arc<Q>, time_source: T) -> Self {
        Self {
            ledger,
            audit,
            time_source,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Ledger read, bounded by the call timeout.
    pub async fn evaluate_authoritative(
        &self,
        key: &GrantKey,
    ) -> Result<Option<ConsentStatus>, EvaluationError> {
        validate(key)?;
        let tuple = tokio::time::timeout(
            self.call_timeout,
            self.ledger.get_consent(&key.file_cid, key.grantee),
        )
        .await
        .unwrap_or_else(|_| Err(ProviderError::timeout("getConsent")))?;

        let status = ConsentStatus::from_tuple(key, tuple, self.time_source.now());
        debug!(
            key = %key,
            found = status.is_some(),
            active = status.as_ref().map_or(false, |s| s.active),
            "[mc-02] Authoritative consent read"
        );
        Ok(status)
    }

    /// Fold of the local audit trail. Eventually consistent; never use it
    /// to gate access.
    pub fn evaluate_derived(&self, key: &GrantKey) -> Result<Option<ConsentStatus>, EvaluationError> {
        validate(key)?;
        let entries = self.audit.read_filtered(&AuditFilter::Key(key.clone()));
        let status = fold_consent(&entries, key, self.time_source.now());
        debug!(
            key = %key,
            entries = entries.len(),
            found = status.is_some(),
            "[mc-02] Derived consent fold"
        );
        Ok(status)
    }
}

fn validate(key: &GrantKey) -> Result<(), EvaluationError> {
    if key.file_cid.trim().is_empty() {
        return Err(EvaluationError::InvalidKey {
            reason: "file CID is empty".into(),
        });
    }
    if key.grantee.is_zero() {
        return Err(EvaluationError::InvalidKey {
            reason: "grantee is the zero address".into(),
        });
    }
    Ok(())
}

#[async_trait::async_trait]
impl<L, Q, T> ConsentEvaluationApi for ConsentEvaluator<L, Q, T>
where
    L: ConsentLedger,
    Q: AuditQueryApi + ?Sized,
    T: TimeSource,
{
    async fn evaluate(
        &self,
        key: &GrantKey,
        mode: EvaluationMode,
    ) -> Result<Option<ConsentStatus>, EvaluationError> {
        match mode {
            EvaluationMode::Authoritative => self.evaluate_authoritative(key).await,
            EvaluationMode::Derived => self.evaluate_derived(key),
        }
    }

    fn history(&self, key: &GrantKey) -> Vec<AuditEntry> {
        let mut entries = self.audit.read_filtered(&AuditFilter::Key(key.clone()));
        entries.sort_by_key(AuditEntry::position);
        entries
    }

    fn emergency_history(&self, file_cid: &str) -> Vec<EmergencyRecord> {
        let entries = self
            .audit
            .read_filtered(&AuditFilter::Kind(EventKind::EmergencyAccess));
        emergency_records(&entries, file_cid)
    }
}
