//! Benchmarks for the request hot path that runs before any store lookup
//!
//! Run with: cargo bench -p complyscan-core

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use complyscan_core::{fingerprint, normalize, KnowledgeBase};

fn benchmark_normalize(c: &mut Criterion) {
    let test_cases = vec![
        ("short_cjk", "公司财务报表存在虚列收入的情况".to_string()),
        ("mixed", "2023年Q4，公司通过 shell company 转移资金约500万元。".to_string()),
        ("long_cjk", "税".repeat(2_000)),
        ("no_cjk", "The quick brown fox jumps over the lazy dog.".repeat(20)),
    ];

    let mut group = c.benchmark_group("Normalize");
    group.sample_size(100);

    for (name, text) in &test_cases {
        group.bench_with_input(BenchmarkId::new("normalize", name), text, |b, text| {
            b.iter(|| normalize(black_box(text)));
        });
        group.bench_with_input(BenchmarkId::new("fingerprint", name), text, |b, text| {
            b.iter(|| fingerprint(black_box(text)));
        });
    }

    group.finish();
}

fn benchmark_knowledge_lookup(c: &mut Criterion) {
    let kb = KnowledgeBase::builtin();
    let labels = kb.labels();

    c.bench_function("knowledge_lookup_all", |b| {
        b.iter(|| {
            for label in &labels {
                black_box(kb.lookup(black_box(label)).flattened_regulations());
            }
        });
    });
}

criterion_group!(benches, benchmark_normalize, benchmark_knowledge_lookup);
criterion_main!(benches);
