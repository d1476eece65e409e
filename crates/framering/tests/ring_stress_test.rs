use framering::{RingError, RingReader};
use std::thread;
use std::time::{Duration, Instant};

/// Randomized producer/consumer pacing over several reset cycles
///
/// Tests:
/// - 0 <= head - tail <= capacity at every observation
/// - No item is skipped, duplicated or reordered
/// - The ring can be reset and reused once the writer is gone
#[test]
fn test_randomized_pacing_across_reset_cycles() {
    const CAPACITY: usize = 4;
    const ITEMS_PER_CYCLE: u32 = 300;

    let mut reader = RingReader::with_capacity(CAPACITY).unwrap();

    for cycle in 0..3u32 {
        let mut writer = reader.writer().expect("Writer must be free between cycles");
        let cursor = reader.cursor();
        let seed = 0x5eed + u64::from(cycle);

        let producer = thread::spawn(move || {
            let mut rng = fastrand::Rng::with_seed(seed);
            let mut next = 0u32;
            while next < ITEMS_PER_CYCLE {
                let item = (cycle, next);
                if writer.push(item, u64::from(next)).is_ok() {
                    next += 1;
                }
                if rng.u8(..) < 16 {
                    thread::sleep(Duration::from_micros(rng.u64(0..200)));
                }
            }
        });

        let mut rng = fastrand::Rng::with_seed(seed ^ 0xffff);
        let mut expected = 0u32;
        let start = Instant::now();
        while expected < ITEMS_PER_CYCLE {
            assert!(start.elapsed() < Duration::from_secs(10), "Cycle {} stalled", cycle);

            let head = cursor.head();
            let tail = cursor.tail();
            assert!(tail <= head, "Tail overtook head");

            match reader.pop() {
                Some(((item_cycle, value), timestamp)) => {
                    assert_eq!(item_cycle, cycle, "Stale item survived a reset");
                    assert_eq!(value, expected);
                    assert_eq!(timestamp, u64::from(expected));
                    expected += 1;
                }
                None => thread::yield_now(),
            }
            assert!(reader.len() <= CAPACITY);

            if rng.u8(..) < 16 {
                thread::sleep(Duration::from_micros(rng.u64(0..200)));
            }
        }

        producer.join().expect("Producer thread panicked");
        assert_eq!(reader.head(), u64::from(ITEMS_PER_CYCLE));

        reader.reset().unwrap();
        assert_eq!(reader.head(), 0);
        assert_eq!(reader.tail(), 0);
    }
}

#[test]
fn test_reset_waits_for_writer_to_be_dropped() {
    let mut reader = RingReader::<Vec<u8>>::with_capacity(2).unwrap();
    let mut writer = reader.writer().unwrap();
    writer.push(vec![1, 2, 3], 33).unwrap();

    assert_eq!(reader.reset(), Err(RingError::WriterActive));
    assert_eq!(reader.len(), 1, "Failed reset must leave contents alone");

    let handle = thread::spawn(move || drop(writer));
    handle.join().unwrap();

    reader.reset().unwrap();
    assert!(reader.is_empty());
}
