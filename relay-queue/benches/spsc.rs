//! Benchmarks for the SPSC queue.
//!
//! Compares relay-queue against rtrb and crossbeam-queue's ArrayQueue.

use std::hint::black_box;
use std::sync::Arc;
use std::thread;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use crossbeam_queue::ArrayQueue;
use relay_queue::spsc;

#[allow(unused)]
#[derive(Debug, Clone, Copy)]
struct Medium([u64; 16]); // 128 bytes

// ============================================================================
// Single-threaded push+pop
// ============================================================================

fn bench_single_thread_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("spsc_single_thread");

    group.bench_function("relay_spsc/u64", |b| {
        let (mut tx, mut rx) = spsc::channel::<u64>(1024).unwrap();
        b.iter(|| {
            tx.try_push(black_box(42)).unwrap();
            black_box(rx.try_pop().unwrap())
        });
    });

    group.bench_function("rtrb/u64", |b| {
        let (mut tx, mut rx) = rtrb::RingBuffer::<u64>::new(1024);
        b.iter(|| {
            tx.push(black_box(42)).unwrap();
            black_box(rx.pop().unwrap())
        });
    });

    group.bench_function("crossbeam_array/u64", |b| {
        let q = ArrayQueue::<u64>::new(1024);
        b.iter(|| {
            q.push(black_box(42)).unwrap();
            black_box(q.pop().unwrap())
        });
    });

    group.bench_function("relay_spsc/128b", |b| {
        let (mut tx, mut rx) = spsc::channel::<Medium>(1024).unwrap();
        let msg = Medium([0; 16]);
        b.iter(|| {
            tx.try_push(black_box(msg)).unwrap();
            black_box(rx.try_pop().unwrap())
        });
    });

    group.bench_function("rtrb/128b", |b| {
        let (mut tx, mut rx) = rtrb::RingBuffer::<Medium>::new(1024);
        let msg = Medium([0; 16]);
        b.iter(|| {
            tx.push(black_box(msg)).unwrap();
            black_box(rx.pop().unwrap())
        });
    });

    group.finish();
}

// ============================================================================
// Burst fill then drain, single pop vs batch pop
// ============================================================================

fn bench_burst_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("spsc_burst_drain");

    for n in [64usize, 1024] {
        group.throughput(Throughput::Elements(n as u64));

        group.bench_with_input(BenchmarkId::new("try_pop", n), &n, |b, &n| {
            let (mut tx, mut rx) = spsc::channel::<u64>(n.next_power_of_two()).unwrap();
            b.iter(|| {
                for i in 0..n {
                    tx.try_push(black_box(i as u64)).unwrap();
                }
                for _ in 0..n {
                    black_box(rx.try_pop().unwrap());
                }
            });
        });

        group.bench_with_input(BenchmarkId::new("pop_batch", n), &n, |b, &n| {
            let (mut tx, mut rx) = spsc::channel::<u64>(n.next_power_of_two()).unwrap();
            let mut out = Vec::with_capacity(n);
            b.iter(|| {
                for i in 0..n {
                    tx.try_push(black_box(i as u64)).unwrap();
                }
                out.clear();
                black_box(rx.pop_batch(&mut out, n));
            });
        });
    }

    group.finish();
}

// ============================================================================
// One producer, one consumer, both spinning
// ============================================================================

fn bench_cross_thread_throughput(c: &mut Criterion) {
    const COUNT: u64 = 100_000;

    let mut group = c.benchmark_group("spsc_1p1c");
    group.throughput(Throughput::Elements(COUNT));
    group.sample_size(20);

    group.bench_function("relay_spsc", |b| {
        b.iter(|| {
            let (mut tx, mut rx) = spsc::channel::<u64>(1024).unwrap();

            let producer = thread::spawn(move || {
                for i in 0..COUNT {
                    let mut v = i;
                    while let Err(full) = tx.try_push(v) {
                        v = full.into_inner();
                        std::hint::spin_loop();
                    }
                }
            });

            let mut received = 0;
            while received < COUNT {
                match rx.try_pop() {
                    Some(v) => {
                        black_box(v);
                        received += 1;
                    }
                    None => std::hint::spin_loop(),
                }
            }

            producer.join().unwrap();
        });
    });

    group.bench_function("rtrb", |b| {
        b.iter(|| {
            let (mut tx, mut rx) = rtrb::RingBuffer::<u64>::new(1024);

            let producer = thread::spawn(move || {
                for i in 0..COUNT {
                    while tx.push(i).is_err() {
                        std::hint::spin_loop();
                    }
                }
            });

            let mut received = 0;
            while received < COUNT {
                match rx.pop() {
                    Ok(v) => {
                        black_box(v);
                        received += 1;
                    }
                    Err(_) => std::hint::spin_loop(),
                }
            }

            producer.join().unwrap();
        });
    });

    group.bench_function("crossbeam_array", |b| {
        b.iter(|| {
            let q = Arc::new(ArrayQueue::<u64>::new(1024));
            let producer_q = Arc::clone(&q);

            let producer = thread::spawn(move || {
                for i in 0..COUNT {
                    while producer_q.push(i).is_err() {
                        std::hint::spin_loop();
                    }
                }
            });

            let mut received = 0;
            while received < COUNT {
                match q.pop() {
                    Some(v) => {
                        black_box(v);
                        received += 1;
                    }
                    None => std::hint::spin_loop(),
                }
            }

            producer.join().unwrap();
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_single_thread_latency,
    bench_burst_drain,
    bench_cross_thread_throughput
);
criterion_main!(benches);
