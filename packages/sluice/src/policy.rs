// choosing a synchronization policy at runtime.

use crate::{
    queue::BlockingQueue,
    CoarseGrainedQueue,
    FineGrainedQueue,
};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
    time::{Duration, Instant},
};
use thiserror::Error;


/// Synchronization policy of a queue
///
/// Parses from `"coarse-grained"` or `"fine-grained"` (also accepting `_` in place of `-`, the
/// shorthands `"coarse"` and `"fine"`, and any ASCII case), so it can be carried in application
/// configuration.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Default)]
pub enum SyncPolicy {
    /// One lock around the whole queue, see [`CoarseGrainedQueue`]
    #[default]
    CoarseGrained,
    /// Separate locks for head and tail, see [`FineGrainedQueue`]
    FineGrained,
}

impl Display for SyncPolicy {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(match self {
            SyncPolicy::CoarseGrained => "coarse-grained",
            SyncPolicy::FineGrained => "fine-grained",
        })
    }
}

impl FromStr for SyncPolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "coarse" | "coarse-grained" => Ok(SyncPolicy::CoarseGrained),
            "fine" | "fine-grained" => Ok(SyncPolicy::FineGrained),
            _ => Err(ParsePolicyError(s.to_owned())),
        }
    }
}

/// Error for parsing a [`SyncPolicy`] from an unrecognized name
#[derive(Error, Debug, Clone, Eq, PartialEq)]
#[error("unknown synchronization policy {0:?}, expected \"coarse-grained\" or \"fine-grained\"")]
pub struct ParsePolicyError(pub String);


/// Blocking queue with its synchronization policy chosen at construction
///
/// The policy can't change for the lifetime of the queue. Values are stored in a
/// [`VecDeque`](std::collections::VecDeque) under the coarse-grained policy.
#[derive(Debug)]
pub enum AnyQueue<T> {
    /// Coarse-grained queue
    CoarseGrained(CoarseGrainedQueue<T>),
    /// Fine-grained queue
    FineGrained(FineGrainedQueue<T>),
}

// forward a method call to whichever queue is inside.
macro_rules! dispatch {
    ($self:ident.$method:ident($($arg:expr),*))=>{
        match $self {
            AnyQueue::CoarseGrained(queue) => BlockingQueue::$method(queue, $($arg),*),
            AnyQueue::FineGrained(queue) => BlockingQueue::$method(queue, $($arg),*),
        }
    };
}

impl<T> AnyQueue<T> {
    /// Construct empty with the given policy
    pub fn new(policy: SyncPolicy) -> Self {
        debug!(%policy, "constructing queue");
        match policy {
            SyncPolicy::CoarseGrained => AnyQueue::CoarseGrained(CoarseGrainedQueue::new()),
            SyncPolicy::FineGrained => AnyQueue::FineGrained(FineGrainedQueue::new()),
        }
    }

    /// The policy this queue was constructed with
    pub fn policy(&self) -> SyncPolicy {
        match self {
            AnyQueue::CoarseGrained(_) => SyncPolicy::CoarseGrained,
            AnyQueue::FineGrained(_) => SyncPolicy::FineGrained,
        }
    }

    /// See [`BlockingQueue::push`]
    pub fn push(&self, elem: T) {
        dispatch!(self.push(elem))
    }

    /// See [`BlockingQueue::pop`]
    pub fn pop(&self) -> T {
        dispatch!(self.pop())
    }

    /// See [`BlockingQueue::pop_timeout`]
    pub fn pop_timeout(&self, timeout: Duration) -> Option<T> {
        dispatch!(self.pop_timeout(timeout))
    }

    /// See [`BlockingQueue::pop_deadline`]
    pub fn pop_deadline(&self, deadline: Instant) -> Option<T> {
        dispatch!(self.pop_deadline(deadline))
    }

    /// See [`BlockingQueue::try_pop`]
    pub fn try_pop(&self) -> Option<T> {
        dispatch!(self.try_pop())
    }

    /// See [`BlockingQueue::is_empty`]
    pub fn is_empty(&self) -> bool {
        dispatch!(self.is_empty())
    }
}

impl<T> Default for AnyQueue<T> {
    fn default() -> Self {
        Self::new(SyncPolicy::default())
    }
}

impl<T> From<CoarseGrainedQueue<T>> for AnyQueue<T> {
    fn from(queue: CoarseGrainedQueue<T>) -> Self {
        AnyQueue::CoarseGrained(queue)
    }
}

impl<T> From<FineGrainedQueue<T>> for AnyQueue<T> {
    fn from(queue: FineGrainedQueue<T>) -> Self {
        AnyQueue::FineGrained(queue)
    }
}
