//! # Audit Document
//!
//! The persisted state of the audit store: the append-only entry sequence
//! and the derived grant index, as a single document. All mutation goes
//! through [`AuditDocument::apply_batch`], which
//!
//! - drops logs already present at the same `(tx_hash, log_index)`,
//! - assigns arrival sequence numbers,
//! - upserts or flags the [`GrantRecord`] of the affected key, ignoring
//!   transitions older than the record's last applied position,
//! - remembers the latest revoke per key, so a grant delivered after a newer
//!   revoke lands already revoked.

use crate::domain::events::{
    AuditEntry, DecodedLog, DomainEvent, GrantKey, GrantRecord, Provenance,
};
use crate::domain::normalize::Normalize;
use serde::{Deserialize, Serialize};
use shared_types::LogId;
use std::collections::{HashMap, HashSet};

/// Result of applying one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub appended: usize,
    pub duplicates: usize,
    pub grants_changed: usize,
}

/// `{ audit: [...], grants: [...] }`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditDocument {
    #[serde(default)]
    audit: Vec<AuditEntry>,
    #[serde(default)]
    grants: Vec<GrantRecord>,
    #[serde(skip)]
    seen: HashSet<LogId>,
    #[serde(skip)]
    grant_index: HashMap<GrantKey, usize>,
    /// Latest `AccessRevoked` per key, whether or not a record exists.
    #[serde(skip)]
    revocations: HashMap<GrantKey, Provenance>,
}

impl AuditDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild lookup indexes after deserialization and canonicalise every
    /// ledger integer in the loaded data.
    pub fn reindexed(self) -> Self {
        let audit = self.audit.normalize();
        let grants = self.grants.normalize();
        let seen = audit.iter().map(|e| e.provenance.log_id()).collect();
        let grant_index = grants
            .iter()
            .enumerate()
            .map(|(i, g)| (g.key(), i))
            .collect();
        let mut revocations = HashMap::new();
        for entry in &audit {
            if let DomainEvent::AccessRevoked {
                grantee, file_cid, ..
            } = &entry.event
            {
                note_revocation(
                    &mut revocations,
                    GrantKey::new(file_cid.clone(), *grantee),
                    &entry.provenance,
                );
            }
        }
        Self {
            audit,
            grants,
            seen,
            grant_index,
            revocations,
        }
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.audit
    }

    pub fn grants(&self) -> &[GrantRecord] {
        &self.grants
    }

    pub fn grant(&self, key: &GrantKey) -> Option<&GrantRecord> {
        self.grant_index.get(key).map(|&i| &self.grants[i])
    }

    pub fn contains(&self, id: &LogId) -> bool {
        self.seen.contains(id)
    }

    pub fn len(&self) -> usize {
        self.audit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.audit.is_empty()
    }

    /// Apply an ordered batch of decoded logs.
    pub fn apply_batch(&mut self, batch: Vec<DecodedLog>) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for decoded in batch {
            let id = decoded.provenance.log_id();
            if !self.seen.insert(id) {
                outcome.duplicates += 1;
                continue;
            }

            if self.apply_grant_transition(&decoded) {
                outcome.grants_changed += 1;
            }

            self.audit.push(AuditEntry {
                sequence: self.audit.len() as u64,
                event: decoded.event.normalize(),
                provenance: decoded.provenance,
            });
            outcome.appended += 1;
        }

        outcome
    }

    fn apply_grant_transition(&mut self, decoded: &DecodedLog) -> bool {
        let position = decoded.provenance.position();
        match &decoded.event {
            DomainEvent::AccessGranted {
                patient,
                grantee,
                file_cid,
                expires_at,
                enc_key_cid,
            } => {
                let key = GrantKey::new(file_cid.clone(), *grantee);
                let later_revoke = self
                    .revocations
                    .get(&key)
                    .filter(|revoke| revoke.position() > position);
                // A known later revoke wins and becomes the record's last transition.
                let last = later_revoke.unwrap_or(&decoded.provenance);
                let record = GrantRecord {
                    patient: *patient,
                    grantee: *grantee,
                    file_cid: file_cid.clone(),
                    enc_key_cid: enc_key_cid.clone(),
                    expires_at: expires_at.clone().normalize(),
                    last_tx_hash: last.tx_hash,
                    last_block_number: last.block_number,
                    last_log_index: last.log_index,
                    revoked: later_revoke.is_some(),
                };
                match self.grant_index.get(&key) {
                    Some(&i) if self.grants[i].position() > position => false,
                    Some(&i) => {
                        self.grants[i] = record;
                        true
                    }
                    None => {
                        self.grant_index.insert(key, self.grants.len());
                        self.grants.push(record);
                        true
                    }
                }
            }
            DomainEvent::AccessRevoked {
                grantee, file_cid, ..
            } => {
                let key = GrantKey::new(file_cid.clone(), *grantee);
                note_revocation(&mut self.revocations, key.clone(), &decoded.provenance);
                match self.grant_index.get(&key) {
                    Some(&i) if self.grants[i].position() <= position => {
                        let record = &mut self.grants[i];
                        record.revoked = true;
                        record.last_tx_hash = decoded.provenance.tx_hash;
                        record.last_block_number = decoded.provenance.block_number;
                        record.last_log_index = decoded.provenance.log_index;
                        true
                    }
                    // Revoke without a known grant, or older than the record.
                    _ => false,
                }
            }
            DomainEvent::EmergencyAccess { .. } | DomainEvent::AuditLogged { .. } => false,
        }
    }
}

fn note_revocation(
    revocations: &mut HashMap<GrantKey, Provenance>,
    key: GrantKey,
    provenance: &Provenance,
) {
    match revocations.get(&key) {
        Some(known) if known.position() >= provenance.position() => {}
        _ => {
            revocations.insert(key, provenance.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::events::Provenance;
    use crate::domain::normalize::LedgerUint;
    use shared_types::{Address, ContractRole, H256};

    fn provenance(block: u64, index: u64, tx: u8) -> Provenance {
        Provenance {
            contract: ContractRole::ConsentManager,
            contract_address: Address::repeat_byte(0xC0),
            tx_hash: H256::repeat_byte(tx),
            block_number: block,
            log_index: index,
            ingested_at: 0,
        }
    }

    fn grant(block: u64, index: u64, tx: u8, expires: u64, key: &str) -> DecodedLog {
        DecodedLog {
            event: DomainEvent::AccessGranted {
                patient: Address::repeat_byte(0xAA),
                grantee: Address::repeat_byte(0xBB),
                file_cid: "Qm1".into(),
                expires_at: expires.into(),
                enc_key_cid: key.into(),
            },
            provenance: provenance(block, index, tx),
        }
    }

    fn revoke(block: u64, index: u64, tx: u8) -> DecodedLog {
        DecodedLog {
            event: DomainEvent::AccessRevoked {
                patient: Address::repeat_byte(0xAA),
                grantee: Address::repeat_byte(0xBB),
                file_cid: "Qm1".into(),
            },
            provenance: provenance(block, index, tx),
        }
    }

    fn key() -> GrantKey {
        GrantKey::new("Qm1", Address::repeat_byte(0xBB))
    }

    #[test]
    fn test_grant_then_revoke() {
        let mut doc = AuditDocument::new();
        let out = doc.apply_batch(vec![grant(10, 0, 1, 1000, "K1")]);
        assert_eq!(out.appended, 1);
        assert_eq!(out.grants_changed, 1);
        let record = doc.grant(&key()).unwrap();
        assert_eq!(record.expires_at, LedgerUint::Native(1000));
        assert!(!record.revoked);

        doc.apply_batch(vec![revoke(11, 0, 2)]);
        let record = doc.grant(&key()).unwrap();
        assert!(record.revoked);
        assert_eq!(record.last_block_number, 11);
        assert_eq!(doc.len(), 2);
        assert_eq!(doc.grants().len(), 1);
    }

    #[test]
    fn test_newer_grant_overwrites() {
        let mut doc = AuditDocument::new();
        doc.apply_batch(vec![grant(10, 0, 1, 1000, "K1"), grant(12, 0, 3, 2000, "K2")]);
        let record = doc.grant(&key()).unwrap();
        assert_eq!(record.enc_key_cid, "K2");
        assert_eq!(record.expires_at, LedgerUint::Native(2000));
        assert_eq!(doc.grants().len(), 1);
    }

    #[test]
    fn test_replayed_batch_is_ignored() {
        let mut doc = AuditDocument::new();
        let batch = vec![grant(10, 0, 1, 1000, "K1"), revoke(11, 0, 2)];
        doc.apply_batch(batch.clone());
        let out = doc.apply_batch(batch);
        assert_eq!(out.appended, 0);
        assert_eq!(out.duplicates, 2);
        assert_eq!(out.grants_changed, 0);
        assert_eq!(doc.len(), 2);
        assert!(doc.grant(&key()).unwrap().revoked);
    }

    #[test]
    fn test_duplicate_within_one_batch() {
        let mut doc = AuditDocument::new();
        let out = doc.apply_batch(vec![grant(10, 0, 1, 1000, "K1"), grant(10, 0, 1, 1000, "K1")]);
        assert_eq!(out.appended, 1);
        assert_eq!(out.duplicates, 1);
    }

    #[test]
    fn test_stale_grant_does_not_override_newer_record() {
        let mut doc = AuditDocument::new();
        doc.apply_batch(vec![grant(20, 0, 1, 5000, "NEW")]);
        doc.apply_batch(vec![grant(15, 0, 2, 100, "OLD")]);
        assert_eq!(doc.grant(&key()).unwrap().enc_key_cid, "NEW");
        // History still records both facts.
        assert_eq!(doc.len(), 2);
    }

    #[test]
    fn test_revoke_without_grant_only_lands_in_history() {
        let mut doc = AuditDocument::new();
        let out = doc.apply_batch(vec![revoke(5, 0, 1)]);
        assert_eq!(out.appended, 1);
        assert_eq!(out.grants_changed, 0);
        assert!(doc.grant(&key()).is_none());
    }

    #[test]
    fn test_grant_delivered_after_newer_revoke_stays_revoked() {
        let mut doc = AuditDocument::new();
        doc.apply_batch(vec![revoke(11, 0, 2)]);
        let out = doc.apply_batch(vec![grant(10, 0, 1, 1000, "K1")]);
        assert_eq!(out.grants_changed, 1);

        let record = doc.grant(&key()).unwrap();
        assert!(record.revoked);
        assert_eq!(record.enc_key_cid, "K1");
        assert_eq!(record.last_block_number, 11);
        assert_eq!(record.last_tx_hash, H256::repeat_byte(2));

        // A grant after the revoke reactivates.
        doc.apply_batch(vec![grant(12, 0, 3, 2000, "K2")]);
        let record = doc.grant(&key()).unwrap();
        assert!(!record.revoked);
        assert_eq!(record.enc_key_cid, "K2");
    }

    #[test]
    fn test_reindex_restores_known_revokes() {
        let mut doc = AuditDocument::new();
        doc.apply_batch(vec![revoke(11, 0, 2)]);
        let json = serde_json::to_string(&doc).unwrap();
        let mut loaded = serde_json::from_str::<AuditDocument>(&json).unwrap().reindexed();

        loaded.apply_batch(vec![grant(10, 0, 1, 1000, "K1")]);
        assert!(loaded.grant(&key()).unwrap().revoked);
    }

    #[test]
    fn test_sequences_follow_arrival() {
        let mut doc = AuditDocument::new();
        doc.apply_batch(vec![grant(10, 0, 1, 1000, "K1")]);
        doc.apply_batch(vec![revoke(11, 0, 2)]);
        let seqs: Vec<u64> = doc.entries().iter().map(|e| e.sequence).collect();
        assert_eq!(seqs, vec![0, 1]);
    }

    #[test]
    fn test_reindex_after_json_round_trip() {
        let mut doc = AuditDocument::new();
        doc.apply_batch(vec![grant(10, 0, 1, 1000, "K1")]);
        let json = serde_json::to_string(&doc).unwrap();
        let loaded: AuditDocument = serde_json::from_str::<AuditDocument>(&json).unwrap().reindexed();
        assert!(loaded.grant(&key()).is_some());
        assert!(loaded.contains(&provenance(10, 0, 1).log_id()));

        let mut loaded = loaded;
        let out = loaded.apply_batch(vec![grant(10, 0, 1, 1000, "K1")]);
        assert_eq!(out.duplicates, 1);
    }
}
