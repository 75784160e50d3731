// single-lock queue.

use super::{
    wait::{Timeout, wait_until},
    container::FifoContainer,
    sealed::Sealed,
    BlockingQueue,
};
use crate::policy::SyncPolicy;
use std::{
    collections::VecDeque,
    fmt::{self, Debug, Formatter},
    marker::PhantomData,
    sync::{Condvar, Mutex},
    time::{Duration, Instant},
};


/// Blocking FIFO queue guarded by a single lock
///
/// Every push and every pop takes the same mutex, so producers and consumers all contend with each
/// other. The storage is any [`FifoContainer`], [`VecDeque`] by default.
pub struct CoarseGrainedQueue<T, C = VecDeque<T>> {
    // the container is never touched without holding this lock.
    elems: Mutex<C>,
    // notified once per push. waiters wait for elems to be non-empty.
    pushed: Condvar,
    _elem: PhantomData<fn(T) -> T>,
}

impl<T, C: FifoContainer<T> + Default> CoarseGrainedQueue<T, C> {
    /// Construct empty
    pub fn new() -> Self {
        Self::with_container(C::default())
    }
}

impl<T, C: FifoContainer<T>> CoarseGrainedQueue<T, C> {
    /// Construct around an existing container
    ///
    /// Any elements already in the container are popped first, in the container's order.
    pub fn with_container(container: C) -> Self {
        CoarseGrainedQueue {
            elems: Mutex::new(container),
            pushed: Condvar::new(),
            _elem: PhantomData,
        }
    }

    /// Push to back and wake up one blocked consumer
    ///
    /// Never blocks other than to take the lock.
    pub fn push(&self, elem: T) {
        self.elems.lock().unwrap().push_back(elem);
        self.pushed.notify_one();
    }

    /// Pop from front, blocking until an element is available
    pub fn pop(&self) -> T {
        self.pop_inner(Timeout::Never).expect("wait timed out with Timeout::Never")
    }

    /// Pop from front, blocking until an element is available or the timeout elapses
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        self.pop_inner(Timeout::after(timeout))
    }

    /// Pop from front, blocking until an element is available or the deadline is reached
    pub fn pop_deadline(&self, deadline: Instant) -> Option<T> {
        self.pop_inner(Timeout::At(deadline))
    }

    /// Pop from front if an element is available, without blocking other than to take the lock
    pub fn try_pop(&self) -> Option<T> {
        self.pop_inner(Timeout::NonBlocking)
    }

    /// Number of elements currently queued
    pub fn len(&self) -> usize {
        self.elems.lock().unwrap().len()
    }

    /// Whether no elements are currently queued
    pub fn is_empty(&self) -> bool {
        self.elems.lock().unwrap().is_empty()
    }

    /// Take the container back out
    pub fn into_inner(self) -> C {
        self.elems.into_inner().unwrap()
    }

    fn pop_inner(&self, timeout: Timeout) -> Option<T> {
        let lock = self.elems.lock().unwrap();
        let (mut lock, pushed) = wait_until(&self.pushed, lock, timeout, |elems| !elems.is_empty());
        if !pushed {
            trace!(?timeout, "coarse-grained pop gave up on empty queue");
            return None;
        }
        lock.pop_front()
    }
}

impl<T, C: FifoContainer<T> + Default> Default for CoarseGrainedQueue<T, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, C> Debug for CoarseGrainedQueue<T, C> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("CoarseGrainedQueue").finish_non_exhaustive()
    }
}

impl<T, C> Sealed for CoarseGrainedQueue<T, C> {}

impl<T, C: FifoContainer<T>> BlockingQueue<T> for CoarseGrainedQueue<T, C> {
    const POLICY: SyncPolicy = SyncPolicy::CoarseGrained;

    fn push(&self, elem: T) {
        CoarseGrainedQueue::push(self, elem)
    }

    fn pop(&self) -> T {
        CoarseGrainedQueue::pop(self)
    }

    fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        CoarseGrainedQueue::pop_timeout(self, timeout)
    }

    fn pop_deadline(&self, deadline: Instant) -> Option<T> {
        CoarseGrainedQueue::pop_deadline(self, deadline)
    }

    fn try_pop(&self) -> Option<T> {
        CoarseGrainedQueue::try_pop(self)
    }

    fn is_empty(&self) -> bool {
        CoarseGrainedQueue::is_empty(self)
    }
}
