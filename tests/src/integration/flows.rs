//! # Integration Test Flows
//!
//! The indexer (mc-01) and the evaluator (mc-02) against one simulated
//! chain.
//!
//! ## Flows Tested:
//!
//! 1. **Grant → index → evaluate**: both modes agree once the indexer catches up
//! 2. **Revoke lag**: the ledger answers immediately, the audit trail one tick later
//! 3. **Expiry**: time alone deactivates a consent in both modes
//! 4. **Emergency access**: recorded, never changes a consent
//! 5. **Restart / replay**: resuming never duplicates entries or changes answers
//! 6. **Late delivery**: a grant arriving after its newer revoke stays revoked

#[cfg(test)]
mod tests {
    use crate::fixtures::{MedChainSim, GENESIS_TIME};
    use mc_01_event_indexing::adapters::{InMemoryCheckpoint, JsonCheckpointStore, JsonFileBackend};
    use mc_01_event_indexing::{
        AuditFilter, AuditQueryApi, AuditStore, DecodedLog, DomainEvent, EventKind, GrantKey,
        IndexerConfig, LedgerUint, LogPoller, PollerDependencies, Provenance,
    };
    use mc_02_consent_evaluation::{fold_consent, ConsentEvaluationApi, EvaluationMode};
    use shared_types::{Address, ContractRole, H256};
    use std::sync::Arc;

    const FILE: &str = "QmRecordCid";

    fn patient() -> Address {
        Address::repeat_byte(0xAA)
    }

    fn doctor() -> Address {
        Address::repeat_byte(0xBB)
    }

    fn key() -> GrantKey {
        GrantKey::new(FILE, doctor())
    }

    async fn active(sim: &MedChainSim, mode: EvaluationMode) -> Option<bool> {
        sim.evaluator()
            .evaluate(&key(), mode)
            .await
            .unwrap()
            .map(|status| status.active)
    }

    // =============================================================================
    // GRANT / REVOKE
    // =============================================================================

    #[tokio::test]
    async fn test_grant_is_visible_in_both_modes_after_indexing() {
        let sim = MedChainSim::new();
        let mut poller = sim.poller(IndexerConfig::default());
        let expires = GENESIS_TIME + 3600;

        sim.grant_access(10, patient(), doctor(), FILE, expires, "QmEncKey");

        // Ledger is current; the audit trail has not been scanned yet.
        assert_eq!(active(&sim, EvaluationMode::Authoritative).await, Some(true));
        assert_eq!(active(&sim, EvaluationMode::Derived).await, None);

        let report = poller.tick().await.unwrap();
        assert_eq!(report.appended, 2);

        let evaluator = sim.evaluator();
        let authoritative = evaluator.evaluate_authoritative(&key()).await.unwrap().unwrap();
        let derived = evaluator.evaluate_derived(&key()).unwrap().unwrap();
        assert!(authoritative.active && derived.active);
        assert_eq!(authoritative.patient, derived.patient);
        assert_eq!(authoritative.enc_key_cid, derived.enc_key_cid);
        assert_eq!(derived.expires_at, LedgerUint::from(expires));
    }

    #[tokio::test]
    async fn test_revoke_lags_in_derived_mode() {
        let sim = MedChainSim::new();
        let mut poller = sim.poller(IndexerConfig::default());

        sim.grant_access(10, patient(), doctor(), FILE, GENESIS_TIME + 3600, "K1");
        poller.tick().await.unwrap();

        sim.revoke_access(11, patient(), doctor(), FILE);
        assert_eq!(active(&sim, EvaluationMode::Authoritative).await, Some(false));
        assert_eq!(active(&sim, EvaluationMode::Derived).await, Some(true));

        let report = poller.tick().await.unwrap();
        assert_eq!(report.window.map(|w| (w.from, w.to)), Some((11, 11)));
        assert_eq!(active(&sim, EvaluationMode::Derived).await, Some(false));

        let history = sim.evaluator().history(&key());
        let kinds: Vec<_> = history.iter().map(|e| e.kind()).collect();
        assert_eq!(kinds, vec![EventKind::AccessGranted, EventKind::AccessRevoked]);
        assert!(sim.store.grant(&key()).unwrap().revoked);
    }

    #[tokio::test]
    async fn test_grant_and_revoke_in_one_window_end_revoked() {
        let sim = MedChainSim::new();
        let mut poller = sim.poller(IndexerConfig::default());

        sim.grant_access(20, patient(), doctor(), FILE, GENESIS_TIME + 3600, "K1");
        sim.revoke_access(20, patient(), doctor(), FILE);
        poller.tick().await.unwrap();

        assert_eq!(active(&sim, EvaluationMode::Derived).await, Some(false));
        assert_eq!(active(&sim, EvaluationMode::Authoritative).await, Some(false));
    }

    #[tokio::test]
    async fn test_regrant_after_revoke_reactivates() {
        let sim = MedChainSim::new();
        let mut poller = sim.poller(IndexerConfig::default());

        sim.grant_access(10, patient(), doctor(), FILE, GENESIS_TIME + 60, "K1");
        sim.revoke_access(11, patient(), doctor(), FILE);
        sim.grant_access(12, patient(), doctor(), FILE, GENESIS_TIME + 7200, "K2");
        poller.tick().await.unwrap();

        let derived = sim.evaluator().evaluate_derived(&key()).unwrap().unwrap();
        assert!(derived.active);
        assert_eq!(derived.enc_key_cid, "K2");
        assert_eq!(derived.expires_at, LedgerUint::from(GENESIS_TIME + 7200));
        assert_eq!(active(&sim, EvaluationMode::Authoritative).await, Some(true));
    }

    // =============================================================================
    // EXPIRY
    // =============================================================================

    #[tokio::test]
    async fn test_expiry_deactivates_without_new_events() {
        let sim = MedChainSim::new();
        let mut poller = sim.poller(IndexerConfig::default());

        sim.grant_access(10, patient(), doctor(), FILE, GENESIS_TIME + 100, "K1");
        poller.tick().await.unwrap();
        assert_eq!(active(&sim, EvaluationMode::Derived).await, Some(true));

        // `expires_at > now` is strict.
        sim.clock.set(GENESIS_TIME + 100);
        assert_eq!(active(&sim, EvaluationMode::Authoritative).await, Some(false));
        assert_eq!(active(&sim, EvaluationMode::Derived).await, Some(false));

        // The stored grant itself is untouched.
        assert!(!sim.store.grant(&key()).unwrap().revoked);
    }

    // =============================================================================
    // EMERGENCY ACCESS
    // =============================================================================

    #[tokio::test]
    async fn test_emergency_access_is_audit_only() {
        let sim = MedChainSim::new();
        let mut poller = sim.poller(IndexerConfig::default());
        let responder = Address::repeat_byte(0xEE);

        sim.emergency_access(5, responder, FILE);
        poller.tick().await.unwrap();

        assert_eq!(active(&sim, EvaluationMode::Authoritative).await, None);
        assert_eq!(active(&sim, EvaluationMode::Derived).await, None);
        assert!(sim.store.list_grants().is_empty());

        let records = sim.evaluator().emergency_history(FILE);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].requester, responder);
        assert_eq!(records[0].block_number, 5);
        assert_eq!(
            sim.store
                .read_filtered(&AuditFilter::EmergencyForFile(FILE.to_string()))
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_audit_trail_filters() {
        let sim = MedChainSim::new();
        let mut poller = sim.poller(IndexerConfig::default());

        sim.grant_access(10, patient(), doctor(), FILE, GENESIS_TIME + 3600, "K1");
        sim.grant_access(10, patient(), doctor(), "QmOther", GENESIS_TIME + 3600, "K2");
        sim.emergency_access(11, Address::repeat_byte(0xEE), FILE);
        sim.revoke_access(12, patient(), doctor(), FILE);
        poller.tick().await.unwrap();

        assert_eq!(sim.store.read_all().len(), 7);
        assert_eq!(
            sim.store
                .read_filtered(&AuditFilter::from_query_tag(Some("audit")))
                .len(),
            3
        );
        // grant, its audit entry, emergency, revoke, its audit entry
        assert_eq!(
            sim.store.read_filtered(&AuditFilter::File(FILE.to_string())).len(),
            5
        );
        assert_eq!(sim.store.list_grants().len(), 2);

        let actions: Vec<String> = sim
            .store
            .read_filtered(&AuditFilter::Kind(EventKind::AuditLogged))
            .into_iter()
            .filter_map(|entry| match entry.event {
                DomainEvent::AuditLogged { action, .. } => Some(action),
                _ => None,
            })
            .collect();
        assert_eq!(actions, vec!["grant", "grant", "revoke"]);
    }

    // =============================================================================
    // LATE DELIVERY
    // =============================================================================

    fn delivered(block: u64, tx: u64, event: DomainEvent) -> DecodedLog {
        DecodedLog {
            event,
            provenance: Provenance {
                contract: ContractRole::ConsentManager,
                contract_address: crate::fixtures::consent_manager(),
                tx_hash: H256::from_low_u64_be(tx),
                block_number: block,
                log_index: 0,
                ingested_at: 0,
            },
        }
    }

    #[tokio::test]
    async fn test_store_view_matches_fold_when_grant_arrives_after_revoke() {
        let sim = MedChainSim::new();
        sim.store
            .append(vec![delivered(
                11,
                2,
                DomainEvent::AccessRevoked {
                    patient: patient(),
                    grantee: doctor(),
                    file_cid: FILE.into(),
                },
            )])
            .unwrap();
        sim.store
            .append(vec![delivered(
                10,
                1,
                DomainEvent::AccessGranted {
                    patient: patient(),
                    grantee: doctor(),
                    file_cid: FILE.into(),
                    expires_at: (GENESIS_TIME + 3600).into(),
                    enc_key_cid: "K1".into(),
                },
            )])
            .unwrap();

        let record = sim.store.grant(&key()).unwrap();
        assert!(record.revoked);
        let folded = fold_consent(&sim.store.read_all(), &key(), GENESIS_TIME).unwrap();
        assert!(!folded.active);
        assert_eq!(active(&sim, EvaluationMode::Derived).await, Some(false));
    }

    // =============================================================================
    // RESTART / REPLAY
    // =============================================================================

    #[tokio::test]
    async fn test_replay_without_checkpoint_changes_nothing() {
        let sim = MedChainSim::new();
        let mut poller = sim.poller(IndexerConfig::default());
        sim.grant_access(10, patient(), doctor(), FILE, GENESIS_TIME + 3600, "K1");
        sim.revoke_access(11, patient(), doctor(), FILE);
        poller.tick().await.unwrap();
        let before = sim.store.read_all();
        let writes = sim.backend.write_count();

        // Same store, forgotten cursor: rescans from height - backlog.
        let mut replay = LogPoller::new(
            IndexerConfig::default(),
            crate::fixtures::decoder(),
            PollerDependencies {
                provider: sim.ledger.clone(),
                store: Arc::clone(&sim.store),
                checkpoint: InMemoryCheckpoint::new(),
                time_source: sim.clock.clone(),
            },
        )
        .unwrap();
        let report = replay.tick().await.unwrap();

        assert_eq!(report.appended, 0);
        assert_eq!(report.duplicates, before.len());
        assert_eq!(sim.store.read_all(), before);
        assert_eq!(sim.backend.write_count(), writes);
        assert_eq!(active(&sim, EvaluationMode::Derived).await, Some(false));
    }

    #[tokio::test]
    async fn test_restart_from_disk_resumes_after_checkpoint() {
        let dir = tempfile::tempdir().unwrap();
        let config = IndexerConfig {
            store_path: dir.path().join("audit_db.json"),
            ..IndexerConfig::default()
        };
        let sim = MedChainSim::new();
        let open = || {
            let store =
                Arc::new(AuditStore::open(JsonFileBackend::new(&config.store_path)).unwrap());
            let poller = LogPoller::new(
                config.clone(),
                crate::fixtures::decoder(),
                PollerDependencies {
                    provider: sim.ledger.clone(),
                    store: Arc::clone(&store),
                    checkpoint: JsonCheckpointStore::new(config.checkpoint_path()),
                    time_source: sim.clock.clone(),
                },
            )
            .unwrap();
            (store, poller)
        };

        sim.grant_access(10, patient(), doctor(), FILE, GENESIS_TIME + 3600, "K1");
        {
            let (store, mut poller) = open();
            poller.tick().await.unwrap();
            assert_eq!(store.len(), 2);
        }

        sim.revoke_access(11, patient(), doctor(), FILE);
        let (store, mut poller) = open();
        assert_eq!(store.len(), 2);
        assert_eq!(poller.cursor().last_processed(), Some(10));

        let report = poller.tick().await.unwrap();
        assert_eq!(report.window.map(|w| (w.from, w.to)), Some((11, 11)));
        assert_eq!(report.duplicates, 0);
        assert_eq!(store.len(), 4);
        assert!(store.grant(&key()).unwrap().revoked);
    }
}
