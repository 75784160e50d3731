// two-lock linked queue.
//
// the chain always contains at least one node. the last node, which `tail` points to, is an empty
// placeholder. every node from `head` up to but excluding `tail` holds a pushed value which has not
// yet been popped, so `head == tail` exactly when the queue is empty:
//
//      head                       tail
//       v                          v
//     [ 1998 ] -> [ 2003 ] -> [ placeholder ]
//
// a push fills the current placeholder in and links a fresh placeholder after it, touching nothing
// but the tail side. a pop unlinks and frees the head node, touching nothing but the head side.
//
// locking protocol:
//
// - `tail` (both the pointer and the node it points to) is only accessed with the tail lock held.
// - `head` (the pointer, and every node from head up to but excluding tail) is only accessed with
//   the head lock held.
// - a pop takes the head lock for its whole duration, and the tail lock only to compare head with
//   tail, or to wait on the condvar for them to differ. it never holds the tail lock while reading
//   the value out. lock order is always head then tail, and push never takes the head lock.
//
// a node's value and next link are written under the tail lock, before tail advances past it. a
// pop only reads a node after observing, under the tail lock, that tail has advanced past it. so
// the tail lock's release/acquire orders the push's writes before the pop's reads.

use super::{
    wait::{Timeout, wait_until},
    sealed::Sealed,
    BlockingQueue,
};
use crate::policy::SyncPolicy;
use std::{
    fmt::{self, Debug, Formatter},
    marker::PhantomData,
    ptr::NonNull,
    sync::{
        atomic::{AtomicUsize, Ordering::Relaxed},
        Condvar,
        Mutex,
        MutexGuard,
        PoisonError,
        TryLockError,
    },
    time::{Duration, Instant},
};


// heap allocated link in the chain.
struct Node<T> {
    // none iff this node is the placeholder at the tail.
    value: Option<T>,
    // next node towards tail. none iff this node is the placeholder at the tail.
    next: Option<NonNull<Node<T>>>,
}

impl<T> Node<T> {
    // allocate an empty placeholder. ownership is passed to the caller as a raw pointer.
    fn placeholder() -> NonNull<Self> {
        NonNull::from(Box::leak(Box::new(Node { value: None, next: None })))
    }
}


/// Blocking FIFO queue with separate locks for its head and tail
///
/// Producers only contend with each other on the tail lock, and consumers only contend with each
/// other on the head lock. A consumer only briefly touches the tail lock, to see whether the queue
/// is empty or wait for it not to be. The queue is not lock-free.
///
/// Consumers hold the head lock for their whole pop, so a timed pop's deadline bounds its wait for
/// a value, but not its wait for another consumer's pop to finish. [`try_pop`](Self::try_pop),
/// [`len`](Self::len) and [`is_empty`](Self::is_empty) never wait on other consumers.
pub struct FineGrainedQueue<T> {
    // owns every node in the chain.
    head: Mutex<NonNull<Node<T>>>,
    // points to the placeholder at the end of the chain, without owning it.
    tail: Mutex<NonNull<Node<T>>>,
    // associated with the tail lock. notified once per push. waiters wait for head != tail.
    pushed: Condvar,
    // number of filled nodes. incremented under the tail lock before it's released, decremented
    // under the head lock after the pop that observed that release, so it never underflows.
    len: AtomicUsize,
    _owns: PhantomData<Box<Node<T>>>,
}

impl<T> FineGrainedQueue<T> {
    /// Construct empty
    pub fn new() -> Self {
        let placeholder = Node::placeholder();
        FineGrainedQueue {
            head: Mutex::new(placeholder),
            tail: Mutex::new(placeholder),
            pushed: Condvar::new(),
            len: AtomicUsize::new(0),
            _owns: PhantomData,
        }
    }

    /// Push to back and wake up one blocked consumer
    ///
    /// Never blocks other than to take the tail lock.
    pub fn push(&self, elem: T) {
        // allocate outside of the lock
        let new_placeholder = Node::placeholder();

        let mut tail = self.tail.lock().unwrap();
        let mut node = *tail;
        // safety: we hold the tail lock, and the node tail points to is only ever accessed with it
        //         held.
        let node = unsafe { node.as_mut() };
        debug_assert!(node.value.is_none());
        debug_assert!(node.next.is_none());
        node.value = Some(elem);
        node.next = Some(new_placeholder);
        // from here on, the filled node belongs to the head side
        *tail = new_placeholder;
        self.len.fetch_add(1, Relaxed);
        drop(tail);

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

    /// Pop from front if an element is available, without waiting for one
    ///
    /// Returns `None` without waiting if another consumer is in the middle of a pop, since that
    /// consumer may be blocked until the next push, which it would then be first in line for.
    pub fn try_pop(&self) -> Option<T> {
        let head = match self.head.try_lock() {
            Ok(head) => head,
            Err(TryLockError::WouldBlock) => {
                trace!("fine-grained try_pop found another consumer mid-pop");
                return None;
            }
            Err(TryLockError::Poisoned(e)) => panic!("{}", e),
        };
        self.pop_locked(head, Timeout::NonBlocking)
    }

    /// Number of elements currently queued
    ///
    /// Takes neither lock, so it's only a snapshot.
    pub fn len(&self) -> usize {
        self.len.load(Relaxed)
    }

    /// Whether no elements are currently queued
    ///
    /// Takes neither lock, so it's only a snapshot.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn pop_inner(&self, timeout: Timeout) -> Option<T> {
        // serializes consumers for the whole pop
        let head = self.head.lock().unwrap();
        self.pop_locked(head, timeout)
    }

    fn pop_locked(&self, mut head: MutexGuard<NonNull<Node<T>>>, timeout: Timeout) -> Option<T> {
        if !self.wait_pushed(*head, timeout) {
            trace!(?timeout, "fine-grained pop gave up on empty queue");
            return None;
        }

        // safety: we hold the head lock, and observed under the tail lock that tail is past head.
        //         so head was filled by a push which has since released the tail lock, and no push
        //         will ever access it again. the head side owns it, and we take it.
        let old_head = unsafe { Box::from_raw(head.as_ptr()) };
        let Node { value, next } = *old_head;
        match (value, next) {
            (Some(value), Some(next)) => {
                *head = next;
                self.len.fetch_sub(1, Relaxed);
                Some(value)
            }
            _ => unreachable!("node behind the tail was not filled"),
        }
    }

    // wait for tail to advance past the given head, taking the tail lock only for as long as it
    // takes to check or wait. returns whether it did.
    fn wait_pushed(&self, head: NonNull<Node<T>>, timeout: Timeout) -> bool {
        let tail = self.tail.lock().unwrap();
        let (_tail, pushed) = wait_until(&self.pushed, tail, timeout, |tail| *tail != head);
        pushed
    }

    // number of nodes in the chain, placeholder included.
    #[cfg(test)]
    fn chain_len(&self) -> usize {
        let head = self.head.lock().unwrap();
        let _tail = self.tail.lock().unwrap();
        let mut n = 0;
        let mut next = Some(*head);
        while let Some(curr) = next {
            n += 1;
            next = unsafe { curr.as_ref().next };
        }
        n
    }
}

impl<T> Default for FineGrainedQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for FineGrainedQueue<T> {
    fn drop(&mut self) {
        let mut next = Some(*self.head.get_mut().unwrap_or_else(PoisonError::into_inner));
        let mut discarded = 0usize;
        while let Some(curr) = next {
            // safety: we have exclusive access, and every node in the chain is owned by the chain
            //         and reachable exactly once from head.
            let node = unsafe { Box::from_raw(curr.as_ptr()) };
            if node.value.is_some() {
                discarded += 1;
            }
            next = node.next;
        }
        if discarded > 0 {
            trace!(discarded, "dropped fine-grained queue with values still queued");
        }
    }
}

impl<T> Debug for FineGrainedQueue<T> {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("FineGrainedQueue").finish_non_exhaustive()
    }
}

// values only ever move through the queue, they're never shared, so the queue can be shared
// whenever values can be sent. same reasoning as for `Mutex<T>`.
unsafe impl<T: Send> Send for FineGrainedQueue<T> {}
unsafe impl<T: Send> Sync for FineGrainedQueue<T> {}

impl<T> Sealed for FineGrainedQueue<T> {}

impl<T> BlockingQueue<T> for FineGrainedQueue<T> {
    const POLICY: SyncPolicy = SyncPolicy::FineGrained;

    fn push(&self, elem: T) {
        FineGrainedQueue::push(self, elem)
    }

    fn pop(&self) -> T {
        FineGrainedQueue::pop(self)
    }

    fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        FineGrainedQueue::pop_timeout(self, timeout)
    }

    fn pop_deadline(&self, deadline: Instant) -> Option<T> {
        FineGrainedQueue::pop_deadline(self, deadline)
    }

    fn try_pop(&self) -> Option<T> {
        FineGrainedQueue::try_pop(self)
    }

    fn is_empty(&self) -> bool {
        FineGrainedQueue::is_empty(self)
    }
}
