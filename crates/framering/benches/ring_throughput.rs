use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use framering::RingReader;
use std::thread;

/// Push then pop on one thread: cost of the slot write and counter publish
fn benchmark_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("ring_push_pop");

    for capacity in [4usize, 32, 256] {
        let mut reader = RingReader::with_capacity(capacity).unwrap();
        let mut writer = reader.writer().unwrap();
        let payload = vec![0u8; 640 * 480 * 3];

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("vga_frame", capacity),
            &capacity,
            |b, _| {
                let mut timestamp = 0u64;
                b.iter(|| {
                    writer.push(black_box(payload.clone()), timestamp).unwrap();
                    black_box(reader.pop().unwrap());
                    timestamp += 33_333;
                });
            },
        );
    }

    group.finish();
}

/// Producer and consumer on separate threads, spinning on full/empty
fn benchmark_cross_thread(c: &mut Criterion) {
    const ITEMS: u64 = 10_000;
    let mut group = c.benchmark_group("ring_cross_thread");
    group.throughput(Throughput::Elements(ITEMS));

    for capacity in [4usize, 32] {
        group.bench_with_input(BenchmarkId::new("u64", capacity), &capacity, |b, &capacity| {
            b.iter(|| {
                let mut reader = RingReader::with_capacity(capacity).unwrap();
                let mut writer = reader.writer().unwrap();

                let producer = thread::spawn(move || {
                    let mut next = 0u64;
                    while next < ITEMS {
                        if writer.push(next, next).is_ok() {
                            next += 1;
                        } else {
                            std::hint::spin_loop();
                        }
                    }
                });

                let mut received = 0u64;
                while received < ITEMS {
                    if let Some((value, _)) = reader.pop() {
                        black_box(value);
                        received += 1;
                    } else {
                        std::hint::spin_loop();
                    }
                }
                producer.join().unwrap();
            });
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_push_pop, benchmark_cross_thread);
criterion_main!(benches);
