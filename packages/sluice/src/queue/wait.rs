// condvar waiting with an optional deadline.

use std::{
    sync::{Condvar, MutexGuard},
    time::{Duration, Instant},
};


// timeout for blocking on a predicate.
#[derive(Debug, Copy, Clone)]
pub(crate) enum Timeout {
    // never time out.
    Never,
    // time out at the given deadline.
    At(Instant),
    // time out if the predicate doesn't already hold.
    NonBlocking,
}

impl Timeout {
    // time out once the duration has elapsed from now.
    //
    // a duration too large to represent as an instant is treated as never timing out.
    pub(crate) fn after(duration: Duration) -> Self {
        Instant::now()
            .checked_add(duration)
            .map(Timeout::At)
            .unwrap_or(Timeout::Never)
    }
}

// block on `cond` until `pred` holds or the timeout is reached. returns the re-acquired guard along
// with whether `pred` held.
//
// `pred` is evaluated with the lock held, before the first wait and again after every wakeup, so
// spurious wakeups never leak through. the lock is released for as long as the thread is blocked.
pub(crate) fn wait_until<'a, S, P>(
    cond: &Condvar,
    mut guard: MutexGuard<'a, S>,
    timeout: Timeout,
    mut pred: P,
) -> (MutexGuard<'a, S>, bool)
where
    P: FnMut(&mut S) -> bool,
{
    loop {
        if pred(&mut *guard) {
            return (guard, true);
        }

        match timeout {
            // block on condvar indefinitely
            Timeout::Never => {
                guard = cond.wait(guard).unwrap();
            }

            // block on condvar until deadline, at which point give up
            Timeout::At(deadline) => {
                let Some(duration) = deadline
                    .checked_duration_since(Instant::now())
                    .filter(|duration| !duration.is_zero())
                    else { return (guard, false) };
                // whether this timed out doesn't matter, the predicate gets one last look either way
                guard = cond.wait_timeout(guard, duration).unwrap().0;
            }

            // dont block on condvar, give up instead
            Timeout::NonBlocking => return (guard, false),
        }
    }
}
