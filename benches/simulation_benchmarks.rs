//! Simulation benchmarks with 95% confidence intervals.
//!
//! - Integration: one scenario over growing horizons
//! - KS: two-sample test on chaotic columns of growing length
//! - Entropy: exact-value entropy on the same columns
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pendular::analysis::{ks_2samp, shannon_entropy};
use pendular::prelude::*;

fn pair(samples: usize) -> RunOutcome {
    let config = SimConfig::builder().samples(samples).build();
    match SimEngine::new(config).and_then(|engine| engine.run()) {
        Ok(outcome) => outcome,
        Err(e) => panic!("benchmark setup failed: {e}"),
    }
}

/// RK45 integration plus dense output for the baseline scenario.
fn bench_integration(c: &mut Criterion) {
    let mut group = c.benchmark_group("RK45_integration");
    group.sample_size(20);
    group.confidence_level(0.95);

    for end in [1.0, 5.0, 10.0] {
        let config = SimConfig::builder().duration(end).samples(1000).build();
        let Ok(engine) = SimEngine::new(config) else {
            continue;
        };
        let (baseline, _) = engine.scenarios();
        group.bench_with_input(BenchmarkId::new("horizon_s", end), &end, |b, _| {
            b.iter(|| black_box(engine.run_scenario(&baseline)));
        });
    }

    group.finish();
}

/// Two-sample KS on theta1.
fn bench_ks(c: &mut Criterion) {
    let mut group = c.benchmark_group("KS_2samp");
    group.sample_size(100);
    group.confidence_level(0.95);

    for n in [1_000, 10_000] {
        let outcome = pair(n);
        let a = outcome.baseline.trajectory.column(Variable::Theta1);
        let b = outcome.perturbed.trajectory.column(Variable::Theta1);
        group.bench_with_input(BenchmarkId::new("theta1", n), &n, |bench, _| {
            bench.iter(|| black_box(ks_2samp(&a, &b)));
        });
    }

    group.finish();
}

/// Exact-value Shannon entropy on theta1.
fn bench_entropy(c: &mut Criterion) {
    let mut group = c.benchmark_group("Shannon_entropy");
    group.sample_size(100);
    group.confidence_level(0.95);

    for n in [1_000, 10_000] {
        let outcome = pair(n);
        let values = outcome.baseline.trajectory.column(Variable::Theta1);
        group.bench_with_input(BenchmarkId::new("theta1", n), &n, |b, _| {
            b.iter(|| black_box(shannon_entropy(&values)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_integration, bench_ks, bench_entropy);
criterion_main!(benches);
