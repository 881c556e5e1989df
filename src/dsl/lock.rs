//! Owner-tracking lock used to serialize evaluation and helper loading.
//!
//! A plain [`std::sync::Mutex`] cannot tell whether the caller already holds
//! it, so re-entering it from the same thread deadlocks. [`OwnedLock`]
//! records the owning thread and a hold depth, which gives two acquisition
//! modes:
//!
//! - [`OwnedLock::acquire`] is reentrant: the owning thread may acquire again
//!   and only the outermost guard releases the lock. `use` relies on this so
//!   a helper can `use` another helper.
//! - [`OwnedLock::acquire_exclusive`] refuses re-entry from the owning thread
//!   with [`MamiyaError::ReentrantEvaluation`] instead of deadlocking.
//!
//! Other threads always block until the lock is fully released.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::ThreadId;
use tracing::trace;

use crate::core::MamiyaError;

/// Identifier of the thread holding a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId {
    thread_id: ThreadId,
}

impl OwnerId {
    /// The calling thread.
    pub fn current() -> Self {
        Self {
            thread_id: std::thread::current().id(),
        }
    }
}

#[derive(Debug, Default)]
struct LockState {
    owner: Option<OwnerId>,
    depth: usize,
}

/// Mutual-exclusion lock that knows which thread holds it.
#[derive(Debug)]
pub struct OwnedLock {
    name: &'static str,
    state: Mutex<LockState>,
    released: Condvar,
}

/// Holds one level of an [`OwnedLock`]; releasing happens on drop.
#[derive(Debug)]
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct OwnedLockGuard<'a> {
    lock: &'a OwnedLock,
}

impl OwnedLock {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(LockState::default()),
            released: Condvar::new(),
        }
    }

    /// Whether the calling thread currently holds this lock.
    pub fn is_held_by_current_thread(&self) -> bool {
        self.state().owner == Some(OwnerId::current())
    }

    /// Acquire, blocking while another thread holds the lock. Re-entry from
    /// the owning thread succeeds immediately.
    pub fn acquire(&self) -> OwnedLockGuard<'_> {
        let me = OwnerId::current();
        let mut state = self.state();

        if state.owner == Some(me) {
            state.depth += 1;
            trace!(lock = self.name, depth = state.depth, "re-entered lock");
            return OwnedLockGuard {
                lock: self,
            };
        }

        state = self.wait_until_free(state);
        state.owner = Some(me);
        state.depth = 1;
        trace!(lock = self.name, "acquired lock");
        OwnedLockGuard {
            lock: self,
        }
    }

    /// Acquire, blocking while another thread holds the lock, but fail if
    /// the calling thread already holds it.
    pub fn acquire_exclusive(&self) -> Result<OwnedLockGuard<'_>, MamiyaError> {
        let me = OwnerId::current();
        let mut state = self.state();

        if state.owner == Some(me) {
            return Err(MamiyaError::ReentrantEvaluation);
        }

        state = self.wait_until_free(state);
        state.owner = Some(me);
        state.depth = 1;
        trace!(lock = self.name, "acquired lock exclusively");
        Ok(OwnedLockGuard {
            lock: self,
        })
    }

    fn wait_until_free<'a>(&'a self, mut state: MutexGuard<'a, LockState>) -> MutexGuard<'a, LockState> {
        while state.owner.is_some() {
            state = self.released.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
        state
    }

    fn release(&self) {
        let mut state = self.state();
        state.depth = state.depth.saturating_sub(1);
        if state.depth == 0 {
            state.owner = None;
            trace!(lock = self.name, "released lock");
            self.released.notify_one();
        }
    }

    // The state is a plain counter, so a panic while it was held cannot leave
    // it half-updated.
    fn state(&self) -> MutexGuard<'_, LockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for OwnedLockGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}
