//! Commitment and stealth-derivation benchmarks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::OsRng;

use sip_core::commitment::{commit, commit_random, verify_opening};
use sip_core::curve::{Curve, Scalar};
use sip_core::stealth::StealthKeys;
use sip_core::types::ChainTag;

fn bench_commit(c: &mut Criterion) {
    for curve in [Curve::Secp256k1, Curve::Ed25519] {
        let blinding = Scalar::random(curve, &mut OsRng);
        c.bench_function(&format!("commit/{}", curve), |b| {
            b.iter(|| commit(curve, black_box(1_000_000), &blinding).unwrap())
        });

        let (commitment, blinding) = commit_random(curve, 1_000_000, &mut OsRng).unwrap();
        c.bench_function(&format!("verify_opening/{}", curve), |b| {
            b.iter(|| verify_opening(black_box(&commitment), 1_000_000, &blinding).unwrap())
        });
    }
}

fn bench_homomorphic_add(c: &mut Criterion) {
    let curve = Curve::Secp256k1;
    let (c1, _) = commit_random(curve, 100, &mut OsRng).unwrap();
    let (c2, _) = commit_random(curve, 250, &mut OsRng).unwrap();
    c.bench_function("add_commitments", |b| {
        b.iter(|| black_box(&c1).add(black_box(&c2)).unwrap())
    });
}

fn bench_stealth_scan(c: &mut Criterion) {
    let keys = StealthKeys::generate(ChainTag::Ethereum, &mut OsRng);
    let meta = keys.meta_address().unwrap();
    let scanner = sip_core::StealthScanner::new(&keys).unwrap();

    let announcement =
        (&sip_core::generate_stealth_address(&meta, &mut OsRng).unwrap()).into();
    c.bench_function("scan_matching_announcement", |b| {
        b.iter(|| scanner.matches(black_box(&announcement)).unwrap())
    });

    let other = StealthKeys::generate(ChainTag::Ethereum, &mut OsRng)
        .meta_address()
        .unwrap();
    let foreign = (&sip_core::generate_stealth_address(&other, &mut OsRng).unwrap()).into();
    c.bench_function("scan_foreign_announcement", |b| {
        b.iter(|| scanner.matches(black_box(&foreign)).unwrap())
    });
}

criterion_group!(benches, bench_commit, bench_homomorphic_add, bench_stealth_scan);
criterion_main!(benches);
