//! Criterion benchmarks for result fusion and query preparation.

use std::hint::black_box;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};

use braid::hybrid::backend::{RawKeywordResult, RawSearchResult};
use braid::hybrid::config::FusionAlgorithm;
use braid::hybrid::search::merger::FusionEngine;
use braid::hybrid::search::query::prepare_keyword_query;
use braid::hybrid::search::scorer::FusionParams;

/// Generate overlapping vector and keyword result lists.
fn generate_results(count: usize) -> (Vec<RawSearchResult>, Vec<RawKeywordResult>) {
    let vector = (0..count)
        .map(|i| {
            let similarity = 1.0 - i as f32 / count as f32;
            RawSearchResult::new(format!("doc-{i}"), format!("vector content {i}"), similarity)
        })
        .collect();

    // Every other keyword hit overlaps with the vector list.
    let keyword = (0..count)
        .map(|i| {
            let id = if i % 2 == 0 { i } else { count + i };
            let score = ((i * 7) % 13) as f32 / 4.0;
            RawKeywordResult::new(format!("doc-{id}"), format!("keyword content {id}"), score, i + 1)
        })
        .collect();

    (vector, keyword)
}

fn bench_fusion(c: &mut Criterion) {
    let mut group = c.benchmark_group("fusion");

    for count in [20, 100] {
        let (vector, keyword) = generate_results(count);
        group.throughput(Throughput::Elements((count * 2) as u64));

        for algorithm in [
            FusionAlgorithm::Rrf,
            FusionAlgorithm::Weighted,
            FusionAlgorithm::Adaptive,
        ] {
            let engine = FusionEngine::new(FusionParams {
                algorithm,
                ..FusionParams::default()
            });

            group.bench_function(format!("{algorithm}_{count}"), |b| {
                b.iter(|| engine.fuse(black_box(&vector), black_box(&keyword), black_box(10)))
            });
        }
    }

    group.finish();
}

fn bench_query_preparation(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_preparation");

    let short = "opening hours";
    let long = "Do you have any gluten free pizza options available for delivery on Sunday evenings?";

    group.bench_function("prepare_short", |b| {
        b.iter(|| prepare_keyword_query(black_box(short)))
    });
    group.bench_function("prepare_long", |b| {
        b.iter(|| prepare_keyword_query(black_box(long)))
    });

    group.finish();
}

criterion_group!(benches, bench_fusion, bench_query_preparation);
criterion_main!(benches);
