//! Exactly-once execution barrier with blocking waiters and poisoning.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use thiserror::Error;
use tracing::{trace, warn};

use crate::panic_message;

/// The barrier's action failed; every caller, present and future, sees the
/// same failure instead of a silently skipped action.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("once-guarded action failed: {message}")]
pub struct BarrierPoisoned {
    message: Arc<str>,
}

impl BarrierPoisoned {
    pub fn message(&self) -> &str {
        &self.message
    }
}

enum BarrierState<T> {
    /// Nobody has claimed the action yet.
    Pending,
    /// One caller is executing the action; everyone else waits.
    Running,
    Complete(Arc<T>),
    Poisoned(Arc<str>),
}

/// Runs a registered action exactly once across concurrent callers.
///
/// The first caller to arrive executes the action; concurrent callers block
/// until it finishes and then receive the same result. Later calls return the
/// cached result without re-running anything. A panic inside the action
/// poisons the barrier: the triggering caller, all blocked callers, and all
/// future callers receive the same [`BarrierPoisoned`] error.
pub struct OnceBarrier<T> {
    state: Mutex<BarrierState<T>>,
    cond: Condvar,
}

impl<T> Default for OnceBarrier<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> OnceBarrier<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BarrierState::Pending),
            cond: Condvar::new(),
        }
    }

    /// Execute `action` if no caller has yet, otherwise wait for / return the
    /// cached result.
    pub fn run_once<F>(&self, action: F) -> Result<Arc<T>, BarrierPoisoned>
    where
        F: FnOnce() -> T,
    {
        {
            let mut state = self.state.lock();
            loop {
                match &*state {
                    BarrierState::Pending => {
                        *state = BarrierState::Running;
                        break;
                    }
                    BarrierState::Running => self.cond.wait(&mut state),
                    BarrierState::Complete(value) => return Ok(Arc::clone(value)),
                    BarrierState::Poisoned(message) => {
                        return Err(BarrierPoisoned {
                            message: Arc::clone(message),
                        });
                    }
                }
            }
        }

        // This caller won the race; run the action without holding the lock
        // so waiters only block on the action itself.
        trace!("once barrier action running");
        let outcome = panic::catch_unwind(AssertUnwindSafe(action));

        let mut state = self.state.lock();
        let result = match outcome {
            Ok(value) => {
                let value = Arc::new(value);
                *state = BarrierState::Complete(Arc::clone(&value));
                Ok(value)
            }
            Err(payload) => {
                let message: Arc<str> = panic_message(payload.as_ref()).into();
                warn!(%message, "once barrier poisoned");
                *state = BarrierState::Poisoned(Arc::clone(&message));
                Err(BarrierPoisoned { message })
            }
        };
        drop(state);
        self.cond.notify_all();
        result
    }

    /// Non-blocking peek at the settled result, if any.
    pub fn get(&self) -> Option<Result<Arc<T>, BarrierPoisoned>> {
        match &*self.state.lock() {
            BarrierState::Pending | BarrierState::Running => None,
            BarrierState::Complete(value) => Some(Ok(Arc::clone(value))),
            BarrierState::Poisoned(message) => Some(Err(BarrierPoisoned {
                message: Arc::clone(message),
            })),
        }
    }

    /// Block until the in-flight action settles, then return its result.
    /// Returns `None` if nobody has claimed the action yet.
    pub fn wait(&self) -> Option<Result<Arc<T>, BarrierPoisoned>> {
        let mut state = self.state.lock();
        loop {
            match &*state {
                BarrierState::Pending => return None,
                BarrierState::Running => self.cond.wait(&mut state),
                BarrierState::Complete(value) => return Some(Ok(Arc::clone(value))),
                BarrierState::Poisoned(message) => {
                    return Some(Err(BarrierPoisoned {
                        message: Arc::clone(message),
                    }));
                }
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        matches!(&*self.state.lock(), BarrierState::Complete(_))
    }

    pub fn is_poisoned(&self) -> bool {
        matches!(&*self.state.lock(), BarrierState::Poisoned(_))
    }
}
