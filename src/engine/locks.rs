//! [TicketPool]: the bounded counting semaphore behind spec.md §5's read-
//! and write-ticket pools — the suspension point every operation blocks on
//! before it may enter a database's critical section.
//!
//! Grounded on `util::spinlock::Spinlock`'s latch-and-spin shape, adapted
//! from non-blocking spin to a blocking wait: a ticket pool is expected to
//! be contended under normal load (spec.md §5 "a process configured with
//! more concurrent operations than tickets available simply queues"), so a
//! `Condvar` park is the right primitive rather than a spin loop.

use std::sync::{Condvar, Mutex};

/// A pool of `capacity` tickets. `acquire` blocks until one is free and
/// returns a guard that releases it on drop.
pub struct TicketPool {
    name: &'static str,
    capacity: usize,
    available: Mutex<usize>,
    freed: Condvar,
}

impl TicketPool {
    pub fn new(name: &'static str, capacity: usize) -> TicketPool {
        TicketPool { name, capacity, available: Mutex::new(capacity), freed: Condvar::new() }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        *self.available.lock().unwrap()
    }

    /// Block until a ticket is free, then hold it until the returned guard
    /// drops (spec.md §5 "acquire a ticket... release it on completion").
    pub fn acquire(&self) -> TicketGuard<'_> {
        let mut available = self.available.lock().unwrap();
        while *available == 0 {
            available = self.freed.wait(available).unwrap();
        }
        *available -= 1;
        TicketGuard { pool: self }
    }

    pub fn to_name(&self) -> &'static str {
        self.name
    }
}

pub struct TicketGuard<'a> {
    pool: &'a TicketPool,
}

impl Drop for TicketGuard<'_> {
    fn drop(&mut self) {
        let mut available = self.pool.available.lock().unwrap();
        *available += 1;
        self.pool.freed.notify_one();
    }
}

#[cfg(test)]
mod locks_test {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn tickets_are_released_on_drop() {
        let pool = TicketPool::new("test", 1);
        {
            let _guard = pool.acquire();
            assert_eq!(pool.available(), 0);
        }
        assert_eq!(pool.available(), 1);
    }

    #[test]
    fn a_second_acquirer_blocks_until_the_first_releases() {
        let pool = Arc::new(TicketPool::new("test", 1));
        let guard = pool.acquire();

        let pool2 = Arc::clone(&pool);
        let handle = thread::spawn(move || {
            let _g = pool2.acquire();
        });

        thread::sleep(std::time::Duration::from_millis(20));
        assert_eq!(pool.available(), 0);
        drop(guard);
        handle.join().unwrap();
        assert_eq!(pool.available(), 1);
    }
}
