//! Simulated MedChain deployment.
//!
//! [`MedChainSim`] plays both contracts: every call updates the consent
//! state (what `getConsent` returns) and emits the logs the indexer would
//! see, the way the deployed contracts and backend do.

use mc_01_event_indexing::adapters::{
    FixedTimeSource, InMemoryBackend, InMemoryCheckpoint, InMemoryLedger,
};
use mc_01_event_indexing::domain::abi::encode::{address_topic, encode_tokens, Token};
use mc_01_event_indexing::{
    AuditStore, ContractSchema, EventDecoder, IndexerConfig, LogPoller, PollerDependencies,
};
use mc_02_consent_evaluation::adapters::InMemoryConsentLedger;
use mc_02_consent_evaluation::ConsentEvaluator;
use parking_lot::Mutex;
use primitive_types::U256;
use shared_types::{event_topic, Address, BlockNumber, RawLog, H256};
use std::collections::HashMap;
use std::sync::Arc;

pub const CONSENT_MANAGER: u8 = 0xC0;
pub const AUDIT_LOGGER: u8 = 0xA0;
pub const GENESIS_TIME: u64 = 1_700_000_000;

pub type SimPoller =
    LogPoller<InMemoryLedger, InMemoryBackend, InMemoryCheckpoint, FixedTimeSource>;

pub type SimEvaluator =
    ConsentEvaluator<InMemoryConsentLedger, AuditStore<InMemoryBackend>, FixedTimeSource>;

pub fn consent_manager() -> Address {
    Address::repeat_byte(CONSENT_MANAGER)
}

pub fn audit_logger() -> Address {
    Address::repeat_byte(AUDIT_LOGGER)
}

pub fn decoder() -> EventDecoder {
    EventDecoder::new(vec![
        ContractSchema::consent_manager(consent_manager()),
        ContractSchema::audit_logger(audit_logger()),
    ])
}

#[derive(Default)]
struct Counters {
    next_tx: u64,
    next_entry: u64,
    log_index: HashMap<BlockNumber, u64>,
}

/// Both views of one simulated chain, plus the indexer wired to it.
pub struct MedChainSim {
    pub ledger: InMemoryLedger,
    pub consent: InMemoryConsentLedger,
    pub backend: InMemoryBackend,
    pub checkpoint: InMemoryCheckpoint,
    pub clock: FixedTimeSource,
    pub store: Arc<AuditStore<InMemoryBackend>>,
    counters: Mutex<Counters>,
}

impl Default for MedChainSim {
    fn default() -> Self {
        Self::new()
    }
}

impl MedChainSim {
    pub fn new() -> Self {
        let backend = InMemoryBackend::new();
        let store = match AuditStore::open(backend.clone()) {
            Ok(store) => Arc::new(store),
            Err(e) => panic!("empty in-memory store failed to open: {}", e),
        };
        Self {
            ledger: InMemoryLedger::new(),
            consent: InMemoryConsentLedger::new(),
            backend,
            checkpoint: InMemoryCheckpoint::new(),
            clock: FixedTimeSource::new(GENESIS_TIME),
            store,
            counters: Mutex::new(Counters::default()),
        }
    }

    pub fn poller(&self, config: IndexerConfig) -> SimPoller {
        let deps = PollerDependencies {
            provider: self.ledger.clone(),
            store: Arc::clone(&self.store),
            checkpoint: self.checkpoint.clone(),
            time_source: self.clock.clone(),
        };
        match LogPoller::new(config, decoder(), deps) {
            Ok(poller) => poller,
            Err(e) => panic!("poller failed to start: {}", e),
        }
    }

    pub fn evaluator(&self) -> SimEvaluator {
        ConsentEvaluator::new(
            self.consent.clone(),
            Arc::clone(&self.store),
            self.clock.clone(),
        )
    }

    /// `grantAccess` by `patient`, followed by the backend's audit entry.
    pub fn grant_access(
        &self,
        block: BlockNumber,
        patient: Address,
        grantee: Address,
        file_cid: &str,
        expires_at: u64,
        enc_key_cid: &str,
    ) {
        self.consent
            .grant(patient, grantee, file_cid, expires_at, enc_key_cid);
        self.emit(
            block,
            consent_manager(),
            vec![
                event_topic("AccessGranted(address,address,string,uint256,string)"),
                address_topic(&patient),
                address_topic(&grantee),
            ],
            encode_tokens(&[
                Token::Str(file_cid),
                Token::Uint(U256::from(expires_at)),
                Token::Str(enc_key_cid),
            ]),
        );
        self.audit(block, patient, "grant", file_cid, enc_key_cid);
    }

    /// `revokeAccess` by `patient`, followed by the backend's audit entry.
    pub fn revoke_access(&self, block: BlockNumber, patient: Address, grantee: Address, file_cid: &str) {
        self.consent.revoke(file_cid, grantee);
        self.emit(
            block,
            consent_manager(),
            vec![
                event_topic("AccessRevoked(address,address,string)"),
                address_topic(&patient),
                address_topic(&grantee),
            ],
            encode_tokens(&[Token::Str(file_cid)]),
        );
        self.audit(block, patient, "revoke", file_cid, "");
    }

    /// `emergencyAccess`; touches no consent state.
    pub fn emergency_access(&self, block: BlockNumber, requester: Address, file_cid: &str) {
        let now = U256::from(self.now());
        self.emit(
            block,
            consent_manager(),
            vec![
                event_topic("EmergencyAccess(address,string,uint256)"),
                address_topic(&requester),
            ],
            encode_tokens(&[Token::Str(file_cid), Token::Uint(now)]),
        );
    }

    /// Blocks mined with no MedChain activity.
    pub fn mine_empty(&self, height: BlockNumber) {
        self.ledger.set_height(height);
    }

    fn now(&self) -> u64 {
        use mc_01_event_indexing::TimeSource;
        self.clock.now()
    }

    fn audit(&self, block: BlockNumber, actor: Address, action: &str, file_cid: &str, meta: &str) {
        let entry_id = {
            let mut counters = self.counters.lock();
            counters.next_entry += 1;
            counters.next_entry
        };
        self.emit(
            block,
            audit_logger(),
            vec![
                event_topic("AuditLogged(uint256,address,string,string,string,uint256)"),
                H256::from_low_u64_be(entry_id),
                address_topic(&actor),
            ],
            encode_tokens(&[
                Token::Str(action),
                Token::Str(file_cid),
                Token::Str(meta),
                Token::Uint(U256::from(self.now())),
            ]),
        );
    }

    fn emit(&self, block: BlockNumber, address: Address, topics: Vec<H256>, data: Vec<u8>) {
        let (tx, log_index) = {
            let mut counters = self.counters.lock();
            counters.next_tx += 1;
            let index = counters.log_index.entry(block).or_insert(0);
            let log_index = *index;
            *index += 1;
            (counters.next_tx, log_index)
        };
        self.ledger.push_log(RawLog {
            address,
            topics,
            data,
            block_number: block,
            transaction_hash: H256::from_low_u64_be(tx),
            log_index,
            removed: false,
        });
    }
}
