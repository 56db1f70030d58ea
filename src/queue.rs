//! The bounded task queue handing ready connections from the reactor to the
//! worker pool: a FIFO guarded by one mutex, paired with a counting
//! semaphore equal to the number of enqueued items.

use crate::sync::Semaphore;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A FIFO of work items bounded to `capacity` entries.
///
/// `append` fails rather than blocking when the queue is full (producer
/// never blocks); `take` blocks until an item is available.
pub struct TaskQueue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
    ready: Semaphore,
}

impl<T> TaskQueue<T> {
    /// Create an empty queue bounded to `capacity` items.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            capacity,
            ready: Semaphore::new(0),
        }
    }

    /// Push `item` onto the back of the queue.
    ///
    /// Returns `Err(item)` if the queue is already at capacity rather than
    /// blocking the caller.
    pub fn append(&self, item: T) -> Result<(), T> {
        let mut items = self.items.lock().unwrap();
        if items.len() >= self.capacity {
            return Err(item);
        }
        items.push_back(item);
        drop(items);
        self.ready.post();
        Ok(())
    }

    /// Block until an item is available, then pop and return it.
    pub fn take(&self) -> T {
        loop {
            self.ready.wait();
            let mut items = self.items.lock().unwrap();
            if let Some(item) = items.pop_front() {
                return item;
            }
            // Spurious wakeup with nothing to take: loop and wait again.
        }
    }

    /// Number of items currently queued.
    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    /// Whether the queue currently holds no items.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
