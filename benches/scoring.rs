//! Benchmarks for the scoring pipeline.
//!
//! Run with: `cargo bench --bench scoring`

use chrono::DateTime;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

use fraudscan_core::features::feature_row;
use fraudscan_core::scoring::{FraudScore, RiskLabel, ScoringRules};
use fraudscan_core::types::Transaction;

/// Generate a synthetic transaction with plausible Polygon magnitudes.
fn generate_transaction(rng: &mut StdRng, index: usize) -> Transaction {
    Transaction {
        hash: format!("0x{index:064x}"),
        nonce: rng.gen_range(0..5_000),
        block_hash: format!("0x{:064x}", index * 7),
        block_number: 45_000_000 + index as u64,
        transaction_index: rng.gen_range(0..200),
        from_address: format!("0x{:040x}", rng.gen_range(0..2_000u64)),
        to_address: format!("0x{:040x}", rng.gen_range(0..2_000u64)),
        value: rng.gen_range(0..4_000_000_000_000_000_000_000u128),
        gas: rng.gen_range(21_000..2_000_000),
        gas_price: rng.gen_range(25_000_000_000..900_000_000_000),
        is_error: rng.gen_bool(0.02),
        receipt_status: Some(rng.gen_bool(0.97)),
        input: "0x".to_string(),
        contract_address: String::new(),
        cumulative_gas_used: rng.gen_range(21_000..100_000_000),
        gas_used: rng.gen_range(21_000..2_500_000),
        confirmations: rng.gen_range(1..1_000_000),
        timestamp: DateTime::from_timestamp(1_700_000_000 + index as i64, 0).unwrap(),
    }
}

/// Blacklist overlapping the generated address space, so some senders hit.
fn generate_blacklist(size: usize) -> HashSet<String> {
    (0..size).map(|i| format!("0x{i:040x}")).collect()
}

/// Benchmark single-transaction scoring under both rule profiles.
fn bench_score_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_evaluation");

    let mut rng = StdRng::seed_from_u64(42);
    let tx = generate_transaction(&mut rng, 0);
    let blacklist = generate_blacklist(1_000);

    for (name, rules) in [
        ("calibrated", ScoringRules::CALIBRATED),
        ("legacy", ScoringRules::LEGACY),
    ] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("evaluate", name), &rules, |b, rules| {
            b.iter(|| black_box(FraudScore::evaluate(black_box(&tx), rules, &blacklist)))
        });
    }

    group.finish();
}

/// Benchmark scoring whole batches, the shape of a scan run.
fn bench_batch_scoring(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_scoring");

    let blacklist = generate_blacklist(1_000);

    for size in [100usize, 1_000, 10_000] {
        let mut rng = StdRng::seed_from_u64(42);
        let batch: Vec<Transaction> = (0..size)
            .map(|i| generate_transaction(&mut rng, i))
            .collect();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("evaluate_all", size), &batch, |b, batch| {
            b.iter(|| {
                for tx in batch {
                    black_box(FraudScore::evaluate(
                        tx,
                        &ScoringRules::CALIBRATED,
                        &blacklist,
                    ));
                }
            })
        });
    }

    group.finish();
}

/// Benchmark feature extraction for the classifier.
fn bench_feature_extraction(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let tx = generate_transaction(&mut rng, 0);
    let blacklist = generate_blacklist(1_000);

    c.bench_function("feature_row", |b| {
        b.iter(|| black_box(feature_row(black_box(&tx), &blacklist)))
    });
}

/// Benchmark score bucketing across the whole [0, 1] range.
fn bench_label_mapping(c: &mut Criterion) {
    let scores: Vec<f64> = (0..=100).map(|i| i as f64 / 100.0).collect();

    c.bench_function("label_from_score", |b| {
        b.iter(|| {
            for score in &scores {
                black_box(RiskLabel::from_score(black_box(*score)));
            }
        })
    });
}

/// Benchmark score serialization (JSON encode/decode).
fn bench_score_serialization(c: &mut Criterion) {
    let mut group = c.benchmark_group("score_serialization");

    let mut rng = StdRng::seed_from_u64(42);
    let mut tx = generate_transaction(&mut rng, 0);
    // Fire enough checks that the signal list is non-trivial to encode.
    tx.gas_used = 2_500_000;
    tx.confirmations = 50;
    tx.nonce = 4_000;
    let score = FraudScore::evaluate(&tx, &ScoringRules::CALIBRATED, &HashSet::new());

    group.throughput(Throughput::Elements(1));
    group.bench_function("score_to_json", |b| {
        b.iter(|| black_box(serde_json::to_string(black_box(&score))))
    });

    let json = serde_json::to_string(&score).unwrap();
    group.bench_function("json_to_score", |b| {
        b.iter(|| black_box(serde_json::from_str::<FraudScore>(black_box(&json))))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_score_evaluation,
    bench_batch_scoring,
    bench_feature_extraction,
    bench_label_mapping,
    bench_score_serialization,
);

criterion_main!(benches);
