//! In-memory backends for tests and dry runs.
//!
//! Clones share state, so a test can keep one handle after moving the other
//! into the store and flip write failures on mid-run.

use crate::domain::{AuditDocument, StoreError};
use crate::ports::outbound::{CheckpointStore, DocumentBackend};
use parking_lot::Mutex;
use shared_types::BlockNumber;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Default)]
pub struct InMemoryBackend {
    document: Arc<Mutex<Option<AuditDocument>>>,
    fail_writes: Arc<AtomicBool>,
    writes: Arc<AtomicUsize>,
    write_delay: Arc<Mutex<Option<Duration>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `persist` fail with an I/O error.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Block the calling thread for `delay` on every `persist`, like a slow
    /// disk sync.
    pub fn slow_writes(&self, delay: Option<Duration>) {
        *self.write_delay.lock() = delay;
    }

    /// Successful persists so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Number of entries in the last persisted document.
    pub fn persisted_len(&self) -> usize {
        self.document.lock().as_ref().map_or(0, AuditDocument::len)
    }
}

impl DocumentBackend for InMemoryBackend {
    fn load(&self) -> Result<Option<AuditDocument>, StoreError> {
        Ok(self.document.lock().clone())
    }

    fn persist(&mut self, document: &AuditDocument) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::io("injected write failure"));
        }
        let delay = *self.write_delay.lock();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        *self.document.lock() = Some(document.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct InMemoryCheckpoint {
    last: Arc<Mutex<Option<BlockNumber>>>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryCheckpoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(last_processed: BlockNumber) -> Self {
        let checkpoint = Self::default();
        *checkpoint.last.lock() = Some(last_processed);
        checkpoint
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn current(&self) -> Option<BlockNumber> {
        *self.last.lock()
    }
}

impl CheckpointStore for InMemoryCheckpoint {
    fn load(&self) -> Result<Option<BlockNumber>, StoreError> {
        Ok(*self.last.lock())
    }

    fn save(&mut self, last_processed: BlockNumber) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::io("injected write failure"));
        }
        *self.last.lock() = Some(last_processed);
        Ok(())
    }
}
