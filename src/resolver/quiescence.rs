//! Outstanding-work tracking with generation-stamped quiescence detection.
//!
//! A resolution run cannot know up front how many parses it will start:
//! every parse may discover includes that start more parses. Waiting on a
//! snapshot of the current work is therefore racy. [`WorkTracker`] instead
//! stamps every change to the outstanding set (a unit of work beginning or
//! finishing) with a new [`Generation`]. A waiter records the generation it
//! observed when the set became empty, yields once so that any scheduled
//! continuation can run, and only fires if the generation is still the same.
//! A stale wait quietly loops; a later wait is the one that matches.
//!
//! Completion fires at most once per tracker, no matter how many callers
//! wait on [`WorkTracker::quiesced`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::Notify;

/// Monotonic change counter for the outstanding-work set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

/// Outstanding work and the generation at which it was last changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Snapshot {
    pub outstanding: usize,
    pub generation: Generation,
}

#[derive(Debug, Default)]
struct Inner {
    state: Mutex<Snapshot>,
    notify: Notify,
    fired: AtomicBool,
}

impl Inner {
    fn update(&self, change: impl FnOnce(&mut usize)) {
        {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            change(&mut state.outstanding);
            state.generation = Generation(state.generation.0 + 1);
        }
        self.notify.notify_waiters();
    }

    fn snapshot(&self) -> Snapshot {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Shared counter of outstanding parse work.
#[derive(Debug, Clone, Default)]
pub struct WorkTracker {
    inner: Arc<Inner>,
}

impl WorkTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one unit of outstanding work. Dropping the guard finishes it.
    #[must_use = "work is finished as soon as the guard is dropped"]
    pub fn begin(&self) -> WorkGuard {
        self.inner.update(|outstanding| *outstanding += 1);
        WorkGuard {
            inner: Arc::clone(&self.inner),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.inner.snapshot()
    }

    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.snapshot().outstanding
    }

    /// Whether completion has already fired.
    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.inner.fired.load(Ordering::Acquire)
    }

    /// Wait until no work is outstanding and none was added during the wait.
    ///
    /// Returns the generation at which the tracker became quiescent to
    /// exactly one caller; every other caller (and every later call) gets
    /// `None`.
    pub async fn quiesced(&self) -> Option<Generation> {
        loop {
            if self.has_fired() {
                return None;
            }

            // Register interest before reading the state so a change between
            // the read and the await is not missed
            let notified = self.inner.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let scheduled = self.snapshot();
            if scheduled.outstanding > 0 {
                notified.await;
                continue;
            }

            tokio::task::yield_now().await;

            let current = self.snapshot();
            if current.generation != scheduled.generation {
                tracing::trace!(
                    "Quiescence check at generation {} is stale (now {})",
                    scheduled.generation.value(),
                    current.generation.value()
                );
                continue;
            }

            if self.inner.fired.swap(true, Ordering::AcqRel) {
                return None;
            }
            tracing::debug!("Quiescent at generation {}", scheduled.generation.value());
            return Some(scheduled.generation);
        }
    }
}

/// One unit of outstanding work; finished on drop.
#[derive(Debug)]
pub struct WorkGuard {
    inner: Arc<Inner>,
}

impl Drop for WorkGuard {
    fn drop(&mut self) {
        self.inner.update(|outstanding| *outstanding = outstanding.saturating_sub(1));
    }
}
