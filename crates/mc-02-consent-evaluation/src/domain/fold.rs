//! Derived consent: fold a key's audit history into a status.

use crate::domain::status::{ConsentStatus, EmergencyRecord, EvaluationMode};
use mc_01_event_indexing::{AuditEntry, DomainEvent, GrantKey};

/// Fold `entries` for `key` in ledger order `(block_number, log_index)`.
///
/// - No `AccessGranted` for the key: `None`.
/// - Otherwise the fields of the latest grant, with `active = false` when a
///   revoke for the key follows it or when `expires_at <= now`.
///
/// Entries for other keys are ignored, so callers may pass the whole trail.
pub fn fold_consent(entries: &[AuditEntry], key: &GrantKey, now: u64) -> Option<ConsentStatus> {
    let mut relevant: Vec<&AuditEntry> = entries
        .iter()
        .filter(|e| e.event.grant_key().as_ref() == Some(key))
        .collect();
    relevant.sort_by_key(|e| e.position());

    let mut state: Option<(ConsentStatus, bool)> = None;
    for entry in relevant {
        match &entry.event {
            DomainEvent::AccessGranted {
                patient,
                grantee,
                file_cid,
                expires_at,
                enc_key_cid,
            } => {
                let status = ConsentStatus {
                    patient: *patient,
                    grantee: *grantee,
                    file_cid: file_cid.clone(),
                    expires_at: expires_at.clone(),
                    enc_key_cid: enc_key_cid.clone(),
                    active: true,
                    mode: EvaluationMode::Derived,
                };
                state = Some((status, false));
            }
            DomainEvent::AccessRevoked { .. } => {
                if let Some((_, revoked)) = state.as_mut() {
                    *revoked = true;
                }
            }
            DomainEvent::EmergencyAccess { .. } | DomainEvent::AuditLogged { .. } => {}
        }
    }

    state.map(|(mut status, revoked)| {
        status.active = !revoked && status.expires_at.is_after(now);
        status
    })
}

/// Emergency overrides on `file_cid`, in ledger order.
pub fn emergency_records(entries: &[AuditEntry], file_cid: &str) -> Vec<EmergencyRecord> {
    let mut matching: Vec<&AuditEntry> = entries
        .iter()
        .filter(|e| matches!(&e.event, DomainEvent::EmergencyAccess { file_cid: cid, .. } if cid == file_cid))
        .collect();
    matching.sort_by_key(|e| e.position());

    matching
        .into_iter()
        .filter_map(|entry| match &entry.event {
            DomainEvent::EmergencyAccess {
                requester,
                file_cid,
                timestamp,
            } => Some(EmergencyRecord {
                requester: *requester,
                file_cid: file_cid.clone(),
                timestamp: timestamp.clone(),
                tx_hash: entry.provenance.tx_hash,
                block_number: entry.provenance.block_number,
            }),
            _ => None,
        })
        .collect()
}
