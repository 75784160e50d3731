// fifo storage behind a coarse-grained queue.

use std::collections::{VecDeque, LinkedList};


/// Single-threaded FIFO storage a [`CoarseGrainedQueue`](crate::CoarseGrainedQueue) can guard
///
/// Implementations need not be concurrent in any way; the queue only ever touches its container
/// while holding its mutex.
pub trait FifoContainer<T> {
    /// Append to the back
    fn push_back(&mut self, elem: T);

    /// Remove from the front, if not empty
    fn pop_front(&mut self) -> Option<T>;

    /// Number of elements stored
    fn len(&self) -> usize;

    /// Whether no elements are stored
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> FifoContainer<T> for VecDeque<T> {
    fn push_back(&mut self, elem: T) {
        VecDeque::push_back(self, elem);
    }

    fn pop_front(&mut self) -> Option<T> {
        VecDeque::pop_front(self)
    }

    fn len(&self) -> usize {
        VecDeque::len(self)
    }

    fn is_empty(&self) -> bool {
        VecDeque::is_empty(self)
    }
}

impl<T> FifoContainer<T> for LinkedList<T> {
    fn push_back(&mut self, elem: T) {
        LinkedList::push_back(self, elem);
    }

    fn pop_front(&mut self) -> Option<T> {
        LinkedList::pop_front(self)
    }

    fn len(&self) -> usize {
        LinkedList::len(self)
    }

    fn is_empty(&self) -> bool {
        LinkedList::is_empty(self)
    }
}
