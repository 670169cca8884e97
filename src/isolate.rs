//! Failure boundary around user-provided hooks and test bodies.
//!
//! A panic inside the guarded closure is captured and tagged with the phase
//! it occurred in, so teardown can still run before the failure becomes
//! visible in the test's outcome. The boundary is only installed where a
//! later phase depends on it; bodies with no teardown in scope run unguarded.

use std::panic::{self, AssertUnwindSafe};

use latchwork_sync::panic_message;

use crate::outcome::{Failure, Phase};

/// Run `f` inside a failure boundary, converting a panic into a phase-tagged
/// [`Failure`] instead of letting it unwind past this frame.
pub(crate) fn run_isolated<T, F>(phase: Phase, f: F) -> Result<T, Failure>
where
    F: FnOnce() -> T,
{
    panic::catch_unwind(AssertUnwindSafe(f)).map_err(|payload| Failure {
        phase,
        message: panic_message(payload.as_ref()),
    })
}
