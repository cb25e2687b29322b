//! Consent contract state held in memory, for tests and dry runs.

use crate::domain::ConsentTuple;
use crate::ports::outbound::ConsentLedger;
use mc_01_event_indexing::GrantKey;
use parking_lot::Mutex;
use primitive_types::U256;
use shared_types::{Address, ProviderError};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

#[derive(Default)]
struct State {
    consents: HashMap<GrantKey, ConsentTuple>,
    failures: VecDeque<ProviderError>,
    reads: usize,
}

/// Clones share state.
#[derive(Clone, Default)]
pub struct InMemoryConsentLedger {
    state: Arc<Mutex<State>>,
}

impl InMemoryConsentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grant(
        &self,
        patient: Address,
        grantee: Address,
        file_cid: &str,
        expires_at: u64,
        enc_key_cid: &str,
    ) {
        self.state.lock().consents.insert(
            GrantKey::new(file_cid, grantee),
            ConsentTuple {
                patient,
                grantee,
                expires_at: U256::from(expires_at),
                enc_key_cid: enc_key_cid.to_string(),
                active: true,
            },
        );
    }

    /// Keeps the record, clears the active flag.
    pub fn revoke(&self, file_cid: &str, grantee: Address) {
        if let Some(tuple) = self
            .state
            .lock()
            .consents
            .get_mut(&GrantKey::new(file_cid, grantee))
        {
            tuple.active = false;
        }
    }

    pub fn fail_next(&self, error: ProviderError) {
        self.state.lock().failures.push_back(error);
    }

    pub fn reads(&self) -> usize {
        self.state.lock().reads
    }
}

#[async_trait::async_trait]
impl ConsentLedger for InMemoryConsentLedger {
    async fn get_consent(
        &self,
        file_cid: &str,
        grantee: Address,
    ) -> Result<ConsentTuple, ProviderError> {
        let mut state = self.state.lock();
        state.reads += 1;
        if let Some(error) = state.failures.pop_front() {
            return Err(error);
        }
        Ok(state
            .consents
            .get(&GrantKey::new(file_cid, grantee))
            .cloned()
            .unwrap_or_default())
    }
}
