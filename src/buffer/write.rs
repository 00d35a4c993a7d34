//! Bounded MPSC write buffer backed by a lock-free `ArrayQueue`.
//!
//! Write operations are enqueued here so the hot write path never blocks on
//! the policy mutex.  A maintenance pass drains the queue and applies all
//! pending operations under a single lock acquisition.
//!
//! If the queue is full when a push is attempted, the operation is returned
//! to the caller as `Err(op)` so it can be applied synchronously.  Write
//! operations must never be lost because they drive capacity accounting.

use crossbeam_queue::ArrayQueue;

/// Bounded capacity of the write queue.
const WRITE_BUFFER_CAPACITY: usize = 128;

/// Operations deferred for policy maintenance.
#[derive(Debug, PartialEq, Eq)]
pub enum WriteOp<K> {
    Add { key: K, weight: u64 },
    Update { key: K, old_weight: u64, new_weight: u64 },
    Remove { key: K },
}

pub struct WriteBuffer<K> {
    queue: ArrayQueue<WriteOp<K>>,
}

impl<K> WriteBuffer<K> {
    pub fn new() -> Self {
        WriteBuffer {
            queue: ArrayQueue::new(WRITE_BUFFER_CAPACITY),
        }
    }

    /// Enqueues `op`, or hands it back when the queue is full.  The caller
    /// **must not drop** a returned `Err`.
    #[inline]
    pub fn push(&self, op: WriteOp<K>) -> Result<(), WriteOp<K>> {
        self.queue.push(op)
    }

    /// Drains all pending operations into `out`, oldest first.
    pub fn drain(&self, out: &mut Vec<WriteOp<K>>) {
        while let Some(op) = self.queue.pop() {
            out.push(op);
        }
    }
}

impl<K> Default for WriteBuffer<K> {
    fn default() -> Self {
        Self::new()
    }
}
