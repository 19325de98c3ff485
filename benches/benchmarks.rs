use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

use tether::store::Store;
use tether::{use_local_storage, use_storage, Signal};

fn signal_write_benchmark(c: &mut Criterion) {
    let signal: Signal<i32> = Signal::new(0);

    c.bench_function("signal_write", |b| {
        let mut i = 0;
        b.iter(|| {
            signal.set(black_box(i));
            i += 1;
        });
    });
}

fn set_value_benchmark(c: &mut Criterion) {
    let store = Store::memory();
    let state = use_local_storage(&store.context(), "counter", 0u64);

    c.bench_function("persisted_set_value", |b| {
        let mut i = 0u64;
        b.iter(|| {
            state.set_value(black_box(i));
            i += 1;
        });
    });
}

fn write_through_benchmark(c: &mut Criterion) {
    let store = Store::memory();
    let list = use_storage(&store.context(), "list", vec![0u32; 64]);

    c.bench_function("auto_persisted_update", |b| {
        let mut i = 0u32;
        b.iter(|| {
            list.update(|items| items[0] = black_box(i));
            i = i.wrapping_add(1);
        });
    });
}

fn fan_out_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("external_change_fan_out");

    for context_count in [1usize, 10, 100].iter() {
        let store = Store::memory();
        let mirrors: Vec<_> = (0..*context_count)
            .map(|_| use_local_storage(&store.context(), "shared", 0u64))
            .collect();
        let writer = store.context();

        group.bench_with_input(
            BenchmarkId::from_parameter(context_count),
            context_count,
            |b, _| {
                let mut i = 0u64;
                b.iter(|| {
                    writer.set_item("shared", &black_box(i).to_string()).ok();
                    i += 1;
                });
            },
        );
        drop(mirrors);
    }
    group.finish();
}

criterion_group!(
    benches,
    signal_write_benchmark,
    set_value_benchmark,
    write_through_benchmark,
    fan_out_benchmark,
);
criterion_main!(benches);
