//! Decrement-to-zero latch identifying the last completer in a fixed-size set.

use std::sync::atomic::{AtomicUsize, Ordering};

use thiserror::Error;
use tracing::trace;

/// The latch was completed more times than its declared count.
///
/// This is a contract violation: the declared size disagrees with the number
/// of completions actually observed.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("countdown latch completed more times than its declared count")]
pub struct LatchOverrun;

/// A latch initialized with a known completion count.
///
/// Each completion decrements the remaining count; exactly the caller whose
/// decrement reaches zero is told so, no matter how completions interleave.
/// The counter is a single atomic, so no caller can observe a torn state.
pub struct CountdownLatch {
    remaining: AtomicUsize,
}

impl CountdownLatch {
    pub fn new(count: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(count),
        }
    }

    /// Record one completion.
    ///
    /// Returns `Ok(true)` to exactly one caller, the one whose decrement
    /// observed the count reach zero. Completing an already-elapsed latch is
    /// an error, never silently ignored.
    pub fn complete_one(&self) -> Result<bool, LatchOverrun> {
        match self
            .remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        {
            Ok(1) => {
                trace!("countdown latch reached zero");
                Ok(true)
            }
            Ok(_) => Ok(false),
            Err(_) => Err(LatchOverrun),
        }
    }

    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::SeqCst)
    }

    /// Whether every declared completion has been recorded.
    pub fn is_elapsed(&self) -> bool {
        self.remaining() == 0
    }
}
