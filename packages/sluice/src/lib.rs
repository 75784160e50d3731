//! Blocking FIFO queues for handing values between threads.
//!
//! Two synchronization policies share one contract (push, blocking pop, timed pop):
//!
//! - [`CoarseGrainedQueue`]: one mutex and one condvar around a [`FifoContainer`].
//! - [`FineGrainedQueue`]: a linked chain with separate head and tail locks, so producers and
//!   consumers don't contend on a single lock.
//!
//! Both implement the sealed [`BlockingQueue`] trait. [`AnyQueue`] picks one of them at runtime
//! from a [`SyncPolicy`].
//!
//! ```
//! use sluice::{BlockingQueue, FineGrainedQueue};
//! use std::{thread, time::Duration};
//!
//! let queue = FineGrainedQueue::new();
//! thread::scope(|s| {
//!     s.spawn(|| queue.push(1998));
//!     assert_eq!(queue.pop(), 1998);
//! });
//! assert_eq!(queue.pop_timeout(Duration::from_millis(10)), None);
//! ```

#[macro_use]
extern crate tracing;

mod queue;
mod policy;

pub use crate::{
    queue::{
        BlockingQueue,
        coarse::CoarseGrainedQueue,
        fine::FineGrainedQueue,
        container::FifoContainer,
        seg_queue::SegQueue,
    },
    policy::{SyncPolicy, ParsePolicyError, AnyQueue},
};
