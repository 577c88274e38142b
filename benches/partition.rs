//! Benchmarks for the per-item work a worker does before touching git:
//! partitioning the listing and mapping items to mirror paths.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use repo_mirror::partition::WorkAssignment;
use repo_mirror::store::MirrorStore;

fn bench_partition(c: &mut Criterion) {
    let mut group = c.benchmark_group("partition");
    for divisor in [1usize, 4, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(divisor), &divisor, |b, &divisor| {
            let assignment = WorkAssignment::new(divisor, divisor - 1).unwrap();
            b.iter(|| assignment.partition(black_box(0..10_000usize)).count())
        });
    }
    group.finish();
}

fn bench_partition_results(c: &mut Criterion) {
    let items: Vec<Result<usize, String>> = (0..10_000).map(Ok).collect();
    let assignment = WorkAssignment::new(4, 1).unwrap();
    c.bench_function("partition_results", |b| {
        b.iter(|| {
            assignment
                .partition_results(black_box(items.iter().cloned()))
                .count()
        })
    });
}

fn bench_get_path(c: &mut Criterion) {
    let store = MirrorStore::new("/srv/mirrors".into());
    let names: Vec<String> = (0..1_000).map(|i| format!("repo-{}", i)).collect();
    c.bench_function("get_path", |b| {
        b.iter(|| {
            for name in &names {
                black_box(store.get_path(name, Some("alice")));
            }
        })
    });
}

criterion_group!(benches, bench_partition, bench_partition_results, bench_get_path);
criterion_main!(benches);
