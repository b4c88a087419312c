use std::hint::black_box;

use chrono::{DateTime, Utc};
use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use salesflow::{
    InMemoryLoadSink, MemoryRejectSink, MemorySource, Pipeline, RawRecord, SchemaValidator,
    ValidateConfig, partition, transform_at,
};

const BATCH: usize = 10_000;

fn demo_batch() -> Vec<RawRecord> {
    (0..BATCH)
        .map(|i| {
            let email = if i % 10 == 0 {
                "invalid_email".to_string()
            } else {
                format!("Customer{i}@Shop.COM")
            };
            RawRecord::new()
                .with_field("order_id", format!("ORD-{i:06}"))
                .with_field("customer_email", email)
                .with_field("product_name", "  notebook dell inspiron ")
                .with_field("quantity", (i % 7) as i64 + 1)
                .with_field("unit_price", 19.99 + (i % 100) as f64)
                .with_field("order_date", format!("2024-{:02}-{:02}", i % 12 + 1, i % 28 + 1))
        })
        .collect()
}

fn validate_bench(c: &mut Criterion) {
    let sequential = SchemaValidator::new(&ValidateConfig::default()).expect("validator");
    let parallel = SchemaValidator::new(&ValidateConfig {
        use_parallel: true,
        ..Default::default()
    })
    .expect("validator");

    c.bench_function("partition_10k_sequential", |b| {
        b.iter_batched(
            demo_batch,
            |rows| black_box(partition(rows, &sequential)),
            BatchSize::LargeInput,
        );
    });
    c.bench_function("partition_10k_parallel", |b| {
        b.iter_batched(
            demo_batch,
            |rows| black_box(partition(rows, &parallel)),
            BatchSize::LargeInput,
        );
    });
}

fn transform_bench(c: &mut Criterion) {
    let validator = SchemaValidator::new(&ValidateConfig::default()).expect("validator");
    let processed_at = DateTime::<Utc>::UNIX_EPOCH;

    c.bench_function("transform_9k_valid", |b| {
        b.iter_batched(
            || partition(demo_batch(), &validator).valid,
            |records| black_box(transform_at(records, processed_at)),
            BatchSize::LargeInput,
        );
    });
}

fn pipeline_bench(c: &mut Criterion) {
    // Fresh sinks per iteration so appended rows don't pile up.
    let fresh_pipeline = || {
        Pipeline::new(
            SchemaValidator::new(&ValidateConfig::default()).expect("validator"),
            Box::new(MemorySource::new().with_batch("bench", demo_batch())),
            Box::new(MemoryRejectSink::new()),
            Box::new(InMemoryLoadSink::new()),
        )
    };

    c.bench_function("pipeline_run_10k_in_memory", |b| {
        b.iter_batched(
            fresh_pipeline,
            |pipeline| black_box(pipeline.run("bench").expect("bench run")),
            BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, validate_bench, transform_bench, pipeline_bench);
criterion_main!(benches);
