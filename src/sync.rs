//! A counting semaphore used by the bounded task queue.
//!
//! Plain mutual exclusion is just `std::sync::Mutex`; the one primitive
//! worth writing by hand is a counting semaphore, since `std` doesn't ship
//! one. Built from `Mutex` + `Condvar`.

use std::sync::{Condvar, Mutex};

/// A counting semaphore: `post` increments the count and wakes one waiter,
/// `wait` blocks until the count is positive, then decrements it.
pub struct Semaphore {
    count: Mutex<usize>,
    available: Condvar,
}

impl Semaphore {
    /// Create a semaphore with an initial count (normally zero: nothing is
    /// queued yet).
    pub fn new(initial: usize) -> Self {
        Self {
            count: Mutex::new(initial),
            available: Condvar::new(),
        }
    }

    /// The "V" operation: increment the count and wake one waiter.
    pub fn post(&self) {
        let mut count = self.count.lock().unwrap();
        *count += 1;
        self.available.notify_one();
    }

    /// The "P" operation: block until the count is positive, then
    /// decrement it.
    pub fn wait(&self) {
        let mut count = self.count.lock().unwrap();
        while *count == 0 {
            count = self.available.wait(count).unwrap();
        }
        *count -= 1;
    }
}
