//! # Audit Store
//!
//! Single writer over the audit document. Readers work on immutable
//! snapshots: an append builds the next document off to the side, persists
//! it, and only then swaps it in. A failed persist leaves the previous
//! snapshot in place, so no reader ever sees part of a batch.

use crate::domain::{
    AuditDocument, AuditEntry, BatchOutcome, DecodedLog, GrantKey, GrantRecord, StoreError,
};
use crate::ports::inbound::{AuditFilter, AuditQueryApi};
use crate::ports::outbound::DocumentBackend;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

pub struct AuditStore<B: DocumentBackend> {
    /// Held for the whole read-modify-write of an append.
    backend: Mutex<B>,
    current: RwLock<Arc<AuditDocument>>,
}

impl<B: DocumentBackend> AuditStore<B> {
    /// Load the persisted document, or start empty.
    ///
    /// A document that exists but cannot be parsed is an error: starting
    /// empty would silently drop the audit trail on the next write.
    pub fn open(backend: B) -> Result<Self, StoreError> {
        let document = backend
            .load()?
            .map(AuditDocument::reindexed)
            .unwrap_or_default();

        tracing::info!(
            "[mc-01] Audit store opened: {} entries, {} grants",
            document.len(),
            document.grants().len()
        );

        Ok(Self {
            backend: Mutex::new(backend),
            current: RwLock::new(Arc::new(document)),
        })
    }

    /// Append an ordered batch atomically.
    ///
    /// Entries already stored at the same `(tx_hash, log_index)` are dropped.
    /// Nothing is written when the batch contributes no new entry.
    pub fn append(&self, batch: Vec<DecodedLog>) -> Result<BatchOutcome, StoreError> {
        let mut backend = self.backend.lock();

        let mut next = AuditDocument::clone(&self.snapshot());
        let outcome = next.apply_batch(batch);
        if outcome.appended == 0 {
            return Ok(outcome);
        }

        backend.persist(&next)?;
        *self.current.write() = Arc::new(next);
        Ok(outcome)
    }

    /// The current committed document.
    pub fn snapshot(&self) -> Arc<AuditDocument> {
        Arc::clone(&self.current.read())
    }

    pub fn len(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().is_empty()
    }
}

impl<B: DocumentBackend> AuditQueryApi for AuditStore<B> {
    fn read_all(&self) -> Vec<AuditEntry> {
        self.snapshot().entries().to_vec()
    }

    fn read_filtered(&self, filter: &AuditFilter) -> Vec<AuditEntry> {
        self.snapshot()
            .entries()
            .iter()
            .filter(|entry| filter.matches(entry))
            .cloned()
            .collect()
    }

    fn grant(&self, key: &GrantKey) -> Option<GrantRecord> {
        self.snapshot().grant(key).cloned()
    }

    fn list_grants(&self) -> Vec<GrantRecord> {
        self.snapshot().grants().to_vec()
    }
}
