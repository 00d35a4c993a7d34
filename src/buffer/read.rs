//! Striped, lossy buffer of read hits awaiting policy bookkeeping.
//!
//! A cache hit pushes its key into one stripe of this buffer instead of
//! locking the policy.  The maintenance pass drains every stripe and replays
//! the keys into [`Policy::on_access`](crate::policy::Policy::on_access).
//!
//! Each thread is pinned to one stripe through a thread-local index, so
//! threads rarely contend on the same queue.  A full stripe rejects the
//! offer; the caller then runs maintenance and offers again.  Under
//! contention (maintenance already running elsewhere) the second offer may
//! also fail and the hit is dropped: recency and frequency are approximate,
//! capacity accounting is not affected.

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam_queue::ArrayQueue;

/// Number of independent stripes.  Must be a power of two.
const NUM_STRIPES: usize = 4;
const STRIPE_MASK: usize = NUM_STRIPES - 1;

/// Capacity of each stripe.
const STRIPE_CAPACITY: usize = 16;

static STRIPE_COUNTER: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static THREAD_STRIPE: usize =
        STRIPE_COUNTER.fetch_add(1, Ordering::Relaxed) & STRIPE_MASK;
}

pub struct StripedReadBuffer<K> {
    stripes: Box<[ArrayQueue<K>]>,
}

impl<K> StripedReadBuffer<K> {
    pub fn new() -> Self {
        StripedReadBuffer {
            stripes: (0..NUM_STRIPES)
                .map(|_| ArrayQueue::new(STRIPE_CAPACITY))
                .collect(),
        }
    }

    /// Records a hit on `key`.  Returns the key back if the calling thread's
    /// stripe is full.
    #[inline]
    pub fn offer(&self, key: K) -> Result<(), K> {
        let stripe = THREAD_STRIPE.with(|s| *s);
        self.stripes[stripe].push(key)
    }

    /// Moves every buffered key into `out`, stripe by stripe.
    pub fn drain(&self, out: &mut Vec<K>) {
        for stripe in self.stripes.iter() {
            while let Some(key) = stripe.pop() {
                out.push(key);
            }
        }
    }
}

impl<K> Default for StripedReadBuffer<K> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
