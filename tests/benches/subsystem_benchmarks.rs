//! # MedChain Subsystem Benchmarks
//!
//! | Subsystem | Operation | Target |
//! |-----------|-----------|--------|
//! | mc-01 Event Decoder | decode one `AccessGranted` log | < 10µs |
//! | mc-01 Audit Document | apply a 2000-log window | < 10ms |
//! | mc-02 Consent Evaluation | derived fold over 1000 entries | < 1ms |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mc_01_event_indexing::domain::abi::encode::{address_topic, encode_tokens, Token};
use mc_01_event_indexing::{
    AuditDocument, ContractSchema, DecodedLog, EventDecoder, GrantKey,
};
use mc_02_consent_evaluation::fold_consent;
use primitive_types::U256;
use shared_types::{event_topic, Address, RawLog, H256};
use std::time::Duration;

fn consent_manager() -> Address {
    Address::repeat_byte(0xC0)
}

fn grant_log(block: u64, index: u64, grantee: Address) -> RawLog {
    RawLog {
        address: consent_manager(),
        topics: vec![
            event_topic("AccessGranted(address,address,string,uint256,string)"),
            address_topic(&Address::repeat_byte(0xAA)),
            address_topic(&grantee),
        ],
        data: encode_tokens(&[
            Token::Str("QmBenchFileCid"),
            Token::Uint(U256::from(1_700_003_600u64)),
            Token::Str("QmBenchKeyCid"),
        ]),
        block_number: block,
        transaction_hash: H256::from_low_u64_be(block * 1_000 + index),
        log_index: index,
        removed: false,
    }
}

fn decoded_window(decoder: &EventDecoder, size: u64) -> Vec<DecodedLog> {
    (0..size)
        .filter_map(|i| {
            let grantee = Address::from_low_u64_be(i % 50 + 1);
            decoder.decode(&grant_log(i / 10, i % 10, grantee), 0).ok().flatten()
        })
        .collect()
}

// ============================================================================
// MC-01: Event Decoder
// ============================================================================

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("mc-01-event-decoder");
    let decoder = EventDecoder::new(vec![ContractSchema::consent_manager(consent_manager())]);
    let log = grant_log(10, 0, Address::repeat_byte(0xBB));

    group.bench_function("decode_access_granted", |b| {
        b.iter(|| black_box(decoder.decode(black_box(&log), 0)))
    });
    group.finish();
}

// ============================================================================
// MC-01: Audit Document
// ============================================================================

fn bench_apply_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("mc-01-audit-document");
    group.measurement_time(Duration::from_secs(10));
    let decoder = EventDecoder::new(vec![ContractSchema::consent_manager(consent_manager())]);

    for size in [100u64, 500, 2000] {
        let batch = decoded_window(&decoder, size);
        group.throughput(Throughput::Elements(size));
        group.bench_with_input(BenchmarkId::new("apply_batch", size), &batch, |b, batch| {
            b.iter(|| {
                let mut document = AuditDocument::new();
                black_box(document.apply_batch(batch.clone()))
            })
        });
    }
    group.finish();
}

// ============================================================================
// MC-02: Derived Consent Fold
// ============================================================================

fn bench_fold(c: &mut Criterion) {
    let mut group = c.benchmark_group("mc-02-consent-evaluation");
    let decoder = EventDecoder::new(vec![ContractSchema::consent_manager(consent_manager())]);
    let mut document = AuditDocument::new();
    document.apply_batch(decoded_window(&decoder, 1000));
    let entries = document.entries().to_vec();
    let key = GrantKey::new("QmBenchFileCid", Address::from_low_u64_be(7));

    group.bench_function("fold_consent_1000", |b| {
        b.iter(|| black_box(fold_consent(black_box(&entries), &key, 1_700_000_000)))
    });
    group.finish();
}

criterion_group!(benches, bench_decode, bench_apply_batch, bench_fold);
criterion_main!(benches);
