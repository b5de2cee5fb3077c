//! Benchmarks for harness execution.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use faultline::prelude::*;
use std::sync::Arc;

fn harness_benchmark(c: &mut Criterion) {
    let harness = FailureCapturingHarness::new(HarnessConfig::default())
        .with_transactions(Arc::new(InMemoryTransactionManager::new()));

    c.bench_function("passing_unit", |b| {
        b.iter(|| {
            let unit = UnitOfWork::without_setup("bench", || Ok(serde_json::json!(42)));
            black_box(harness.run(unit))
        })
    });

    c.bench_function("setup_failure", |b| {
        b.iter(|| {
            let unit = UnitOfWork::new(
                "bench",
                || -> anyhow::Result<()> { anyhow::bail!("no bean") },
                |()| Ok(serde_json::Value::Null),
            )
            .transactional(TransactionMode::Rollback);
            black_box(harness.run(unit))
        })
    });
}

criterion_group!(benches, harness_benchmark);
criterion_main!(benches);
