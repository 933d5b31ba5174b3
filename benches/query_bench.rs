use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use tagdex::{InvertedIndex, QueryOperation};

/// Build an index where tag 0 holds every doc, tag 1 every 2nd, tag 2
/// every 3rd and so on: overlapping bitmaps of decreasing density.
fn build_index(doc_count: u32, tag_count: u32) -> InvertedIndex {
    let mut index = InvertedIndex::new();
    for tag in 0..tag_count {
        let step = tag + 1;
        let mut doc = 0;
        while doc < doc_count {
            index.add(doc, tag);
            doc += step;
        }
    }
    index.optimize();
    index.shrink_to_fit();
    index
}

fn bench_set_operations(c: &mut Criterion) {
    let counts = [10_000u32, 100_000, 1_000_000];
    let envs: Vec<(u32, InvertedIndex)> = counts
        .iter()
        .map(|&count| (count, build_index(count, 8)))
        .collect();

    for op in [
        QueryOperation::And,
        QueryOperation::Or,
        QueryOperation::Xor,
        QueryOperation::AndNot,
    ] {
        let mut group = c.benchmark_group(format!("{op:?}"));
        for (count, index) in envs.iter() {
            group.bench_with_input(BenchmarkId::from_parameter(count), index, |b, index| {
                b.iter(|| {
                    black_box(index.perform_operation(&[0, 1, 2, 3], op));
                });
            });
        }
        group.finish();
    }
}

fn bench_add(c: &mut Criterion) {
    c.bench_function("add_100k", |b| {
        b.iter(|| {
            let mut index = InvertedIndex::new();
            for doc in 0..100_000u32 {
                index.add(doc, doc % 16);
            }
            black_box(index.tag_count());
        });
    });
}

criterion_group!(benches, bench_set_operations, bench_add);
criterion_main!(benches);
