//! Synchronization primitives for exactly-once setup and last-one-out teardown.

pub mod countdown;
pub mod once_barrier;

pub use countdown::{CountdownLatch, LatchOverrun};
pub use once_barrier::{BarrierPoisoned, OnceBarrier};

use std::any::Any;

/// Extract a human-readable message from a panic payload.
///
/// Panics raised through `panic!` carry either a `&str` or a `String`;
/// anything else gets a generic label.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panicked with a non-string payload".to_string()
    }
}
