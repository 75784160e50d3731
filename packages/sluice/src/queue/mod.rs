// implementation of the blocking queues.
//
// there are two, which share a contract but nothing else:
//
//      coarse: Mutex<container> + Condvar. the container is any FifoContainer, which is a plain
//              single-threaded FIFO such as VecDeque, LinkedList, or our own SegQueue.
//
//      fine:   a linked chain of nodes which always ends in an empty placeholder, with one mutex
//              for the head pointer, one for the tail pointer, and a Condvar paired with the tail
//              mutex. see the top of fine.rs for the locking protocol.
//
// the organization of these modules is as such:
//
//      container<---coarse-------\
//          ^          |           \
//      seg_queue      v            >---BlockingQueue (below): the sealed trait both implement.
//                   wait           /
//                     ^           /
//                     \---fine---/
//
// wait contains the one suspension primitive both use: wait on a condvar for a predicate, with an
// optional deadline, re-checking the predicate after every wakeup.

pub(crate) mod container;
pub(crate) mod seg_queue;
pub(crate) mod coarse;
pub(crate) mod fine;

mod wait;

use crate::policy::SyncPolicy;
use std::time::{Duration, Instant};


pub(crate) mod sealed {
    pub trait Sealed {}
}

/// A blocking FIFO queue safe to share between any number of producer and consumer threads
///
/// Implemented by exactly [`CoarseGrainedQueue`](crate::CoarseGrainedQueue) and
/// [`FineGrainedQueue`](crate::FineGrainedQueue). Both guarantee:
///
/// - Values pushed by one thread are popped in the order they were pushed. Pushes racing on
///   different threads are ordered by when they complete.
/// - Every pushed value is popped at most once, by exactly one caller.
/// - Push never blocks other than to take a lock, as queues are unbounded.
/// - Only pops ever block, and a timed pop that gives up has no effect on the queue.
///
/// Queues are not `Clone`. To share one, share a reference to it, such as with an `Arc` or
/// [`std::thread::scope`].
pub trait BlockingQueue<T>: sealed::Sealed {
    /// Which synchronization policy this queue uses
    const POLICY: SyncPolicy;

    /// Push to back and wake up one blocked consumer
    fn push(&self, elem: T);

    /// Pop from front, blocking until an element is available
    ///
    /// Blocks forever if nothing is ever pushed.
    fn pop(&self) -> T;

    /// Pop from front, blocking until an element is available or the timeout elapses
    ///
    /// Returns `None` on timeout, without having consumed anything. Returns immediately if an
    /// element is already available, even with a zero timeout.
    fn pop_timeout(&self, timeout: Duration) -> Option<T>;

    /// Pop from front, blocking until an element is available or the deadline is reached
    fn pop_deadline(&self, deadline: Instant) -> Option<T>;

    /// Pop from front if an element is available, without waiting for one
    fn try_pop(&self) -> Option<T>;

    /// Whether no elements are queued
    ///
    /// Another thread may push or pop right after this returns.
    fn is_empty(&self) -> bool;
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CoarseGrainedQueue, FineGrainedQueue, SegQueue};
    use std::{
        collections::{LinkedList, HashSet},
        sync::Arc,
        thread,
    };

    fn history_scenario<Q: BlockingQueue<u32> + Default>() {
        let queue = Q::default();
        queue.push(1998);
        queue.push(2003);
        assert_eq!(queue.pop(), 1998);
        assert_eq!(queue.pop(), 2003);
        queue.push(2011);
        queue.push(2014);
        assert_eq!(queue.pop(), 2011);
        queue.push(2017);
        queue.push(2020);
        assert_eq!(queue.pop(), 2014);
        assert_eq!(queue.pop(), 2017);
        assert_eq!(queue.pop(), 2020);
        assert!(queue.is_empty());
    }

    fn single_producer_fifo<Q: BlockingQueue<u32> + Default + Sync>() {
        let queue = Q::default();
        thread::scope(|s| {
            s.spawn(|| {
                for i in 0..10_000 {
                    queue.push(i);
                }
            });
            for i in 0..10_000 {
                assert_eq!(queue.pop(), i);
            }
        });
        assert_eq!(queue.try_pop(), None);
    }

    fn no_loss_no_duplication<Q: BlockingQueue<u32> + Default + Sync>() {
        const PRODUCERS: u32 = 4;
        const CONSUMERS: u32 = 4;
        const PER_PRODUCER: u32 = 2_500;

        let queue = Q::default();
        let mut popped = thread::scope(|s| {
            for p in 0..PRODUCERS {
                let queue = &queue;
                s.spawn(move || {
                    for i in 0..PER_PRODUCER {
                        queue.push(p * PER_PRODUCER + i);
                    }
                });
            }
            let queue = &queue;
            let consumers = (0..CONSUMERS)
                .map(|_| s.spawn(move || {
                    let mut got = Vec::new();
                    let mut last_per_producer = [None; PRODUCERS as usize];
                    for _ in 0..PRODUCERS * PER_PRODUCER / CONSUMERS {
                        let n = queue.pop();
                        // each producer's values arrive in the order it pushed them
                        let p = (n / PER_PRODUCER) as usize;
                        assert!(last_per_producer[p].is_none_or(|last| last < n));
                        last_per_producer[p] = Some(n);
                        got.push(n);
                    }
                    got
                }))
                .collect::<Vec<_>>();
            consumers.into_iter().flat_map(|c| c.join().unwrap()).collect::<Vec<_>>()
        });
        popped.sort_unstable();
        assert_eq!(popped, (0..PRODUCERS * PER_PRODUCER).collect::<Vec<_>>());
        assert!(queue.is_empty());
    }

    fn pop_blocks_until_push<Q: BlockingQueue<u32> + Default + Sync>() {
        let queue = Q::default();
        thread::scope(|s| {
            let consumer = s.spawn(|| queue.pop());
            thread::sleep(Duration::from_millis(50));
            assert!(!consumer.is_finished());
            queue.push(7);
            assert_eq!(consumer.join().unwrap(), 7);
        });
    }

    fn timeout_expires<Q: BlockingQueue<u32> + Default + Sync>() {
        let queue = Q::default();
        let start = Instant::now();
        thread::scope(|s| {
            let consumer = s.spawn(|| {
                let popped = queue.pop_timeout(Duration::from_millis(100));
                (popped, start.elapsed())
            });
            thread::sleep(Duration::from_millis(200));
            queue.push(9);
            let (popped, elapsed) = consumer.join().unwrap();
            assert_eq!(popped, None);
            assert!(elapsed >= Duration::from_millis(100));
            assert!(elapsed < Duration::from_millis(190), "timed out late: {:?}", elapsed);
        });
        // the later push was not consumed by the timed out pop
        assert_eq!(queue.try_pop(), Some(9));
    }

    fn queries_dont_wait_on_blocked_consumer<Q: BlockingQueue<u32> + Default + Sync>() {
        let queue = Q::default();
        thread::scope(|s| {
            let consumer = s.spawn(|| queue.pop_timeout(Duration::from_millis(1500)));
            thread::sleep(Duration::from_millis(50));

            let start = Instant::now();
            assert!(queue.is_empty());
            assert_eq!(queue.try_pop(), None);
            assert!(start.elapsed() < Duration::from_millis(500), "waited {:?}", start.elapsed());

            queue.push(2011);
            assert_eq!(consumer.join().unwrap(), Some(2011));
        });
        assert!(queue.is_empty());
    }

    fn push_beats_timeout<Q: BlockingQueue<u32> + Default + Sync>() {
        let queue = Q::default();
        thread::scope(|s| {
            let consumer = s.spawn(|| queue.pop_timeout(Duration::from_millis(500)));
            thread::sleep(Duration::from_millis(50));
            queue.push(2014);
            assert_eq!(consumer.join().unwrap(), Some(2014));
        });
    }

    fn ready_value_needs_no_wait<Q: BlockingQueue<u32> + Default>() {
        let queue = Q::default();
        queue.push(1);
        queue.push(2);
        queue.push(3);
        assert_eq!(queue.pop_timeout(Duration::ZERO), Some(1));
        assert_eq!(queue.pop_deadline(Instant::now()), Some(2));
        assert_eq!(queue.try_pop(), Some(3));
        assert_eq!(queue.pop_timeout(Duration::ZERO), None);
        assert_eq!(queue.try_pop(), None);
    }

    fn concurrent_producers_single_consumer<Q: BlockingQueue<u32> + Default + Send + Sync + 'static>() {
        let queue = Arc::new(Q::default());
        let producers = [2014, 2020, 2023]
            .into_iter()
            .map(|n| {
                let queue = Arc::clone(&queue);
                thread::spawn(move || queue.push(n))
            })
            .collect::<Vec<_>>();
        let popped = (0..3).map(|_| queue.pop()).collect::<HashSet<_>>();
        for producer in producers {
            producer.join().unwrap();
        }
        assert_eq!(popped, HashSet::from([2014, 2020, 2023]));
        assert_eq!(queue.try_pop(), None);
    }

    fn consumers_each_get_one<Q: BlockingQueue<u32> + Default + Sync>() {
        let queue = Q::default();
        thread::scope(|s| {
            let queue = &queue;
            let consumers = (0..8)
                .map(|_| s.spawn(move || queue.pop_timeout(Duration::from_secs(5))))
                .collect::<Vec<_>>();
            thread::sleep(Duration::from_millis(20));
            for i in 0..8 {
                queue.push(i);
            }
            let mut popped = consumers
                .into_iter()
                .map(|c| c.join().unwrap().unwrap())
                .collect::<Vec<_>>();
            popped.sort_unstable();
            assert_eq!(popped, (0..8).collect::<Vec<_>>());
        });
    }

    macro_rules! queue_property_tests {
        ($($m:ident $t:ty,)*)=>{$(
            mod $m {
                use super::*;

                #[test]
                fn history_scenario() {
                    super::history_scenario::<$t>();
                }

                #[test]
                fn single_producer_fifo() {
                    super::single_producer_fifo::<$t>();
                }

                #[test]
                fn no_loss_no_duplication() {
                    super::no_loss_no_duplication::<$t>();
                }

                #[test]
                fn pop_blocks_until_push() {
                    super::pop_blocks_until_push::<$t>();
                }

                #[test]
                fn timeout_expires() {
                    super::timeout_expires::<$t>();
                }

                #[test]
                fn queries_dont_wait_on_blocked_consumer() {
                    super::queries_dont_wait_on_blocked_consumer::<$t>();
                }

                #[test]
                fn push_beats_timeout() {
                    super::push_beats_timeout::<$t>();
                }

                #[test]
                fn ready_value_needs_no_wait() {
                    super::ready_value_needs_no_wait::<$t>();
                }

                #[test]
                fn concurrent_producers_single_consumer() {
                    super::concurrent_producers_single_consumer::<$t>();
                }

                #[test]
                fn consumers_each_get_one() {
                    super::consumers_each_get_one::<$t>();
                }
            }
        )*};
    }

    queue_property_tests!(
        coarse_vec_deque CoarseGrainedQueue<u32>,
        coarse_linked_list CoarseGrainedQueue<u32, LinkedList<u32>>,
        coarse_seg_queue CoarseGrainedQueue<u32, SegQueue<u32>>,
        fine FineGrainedQueue<u32>,
    );

    #[test]
    fn policies() {
        assert_eq!(<CoarseGrainedQueue<u32> as BlockingQueue<u32>>::POLICY, SyncPolicy::CoarseGrained);
        assert_eq!(<FineGrainedQueue<u32> as BlockingQueue<u32>>::POLICY, SyncPolicy::FineGrained);
    }
}
