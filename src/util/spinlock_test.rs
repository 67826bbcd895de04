use std::{sync::Arc, thread};

use super::*;

#[test]
fn test_spinlock_single_thread() {
    let spin = Spinlock::new(0_u64);
    {
        let mut w = spin.write();
        *w += 1;
    }
    assert_eq!(*spin.read(), 1);

    let stats = spin.to_stats().unwrap();
    assert_eq!(stats.write_locks, 0); // debug-only counters, feature gated
}

#[test]
fn test_spinlock_concurrent_writers_serialize() {
    let spin = Arc::new(Spinlock::new(0_i64));
    let n_writers = 8;
    let n_incr = 2000;

    let handles: Vec<_> = (0..n_writers)
        .map(|_| {
            let spin = Arc::clone(&spin);
            thread::spawn(move || {
                for _ in 0..n_incr {
                    let mut w = spin.write();
                    *w += 1;
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(*spin.read(), n_writers * n_incr);
}

#[test]
fn test_spinlock_readers_see_consistent_snapshot() {
    let spin = Arc::new(Spinlock::new((0_i64, 0_i64))); // invariant: a == b

    let writer_spin = Arc::clone(&spin);
    let writer = thread::spawn(move || {
        for i in 0..5000_i64 {
            let mut w = writer_spin.write();
            w.0 = i;
            w.1 = i;
        }
    });

    let reader_spin = Arc::clone(&spin);
    let reader = thread::spawn(move || {
        for _ in 0..5000 {
            let r = reader_spin.read();
            assert_eq!(r.0, r.1);
        }
    });

    writer.join().unwrap();
    reader.join().unwrap();
}
