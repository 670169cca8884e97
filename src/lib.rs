//! A test-hook orchestration engine with three stackable lifecycle layers.
//!
//! | Layer | Runs once per… | Runs per test |
//! |-------|----------------|---------------|
//! | **Suite** | engine (`before`) | test (`before_each` / `after_each`) |
//! | **Group** | group (`before` / `after`) | test (`before_each` / `after_each`) |
//! | **Test** | (none) | the test body |
//!
//! # Hook Execution Order
//!
//! For each test in a group that opts into suite hooks:
//!
//! ```text
//! suite::before          (barrier: first test in the engine triggers it)
//!   group::before        (barrier: first test in the group triggers it)
//!     suite::before_each
//!       group::before_each
//!         TEST
//!       group::after_each
//!     suite::after_each
//!   group::after         (countdown: last test in the group triggers it)
//! ```
//!
//! Groups without suite opt-in skip the suite layer entirely. Tests may run
//! on any number of parallel workers; the barriers and the countdown latch
//! keep the once-per-scope hooks exactly-once no matter how executions
//! interleave.
//!
//! # Quick Start
//!
//! ```
//! use latchwork::{Engine, GroupHooks, GroupSpec, TestCase};
//!
//! let engine = Engine::new();
//! let hooks = GroupHooks::new()
//!     .before(|| vec!["fixture".to_string()])
//!     .unwrap();
//! let group = engine
//!     .register_group(GroupSpec {
//!         name: "arithmetic".to_string(),
//!         test_count: 1,
//!         hooks,
//!         suite_opt_in: false,
//!     })
//!     .unwrap();
//!
//! let report = engine
//!     .run_test(
//!         group,
//!         TestCase::new("adds", |cx| {
//!             let fixture: &Vec<String> = cx.shared().unwrap();
//!             assert_eq!(fixture.len(), 1);
//!             assert_eq!(2 + 2, 4);
//!         }),
//!     )
//!     .unwrap();
//! assert!(report.outcome.is_passed());
//! ```
//!
//! # Context Flow
//!
//! `before` publishes a shared value once per scope; every downstream hook
//! and body borrows it as `&T` for the scope's lifetime. `before_each`
//! produces a fresh owned value per test; the body borrows it and the
//! matching `after_each` consumes it by move, so nothing can touch the value
//! after teardown took it.
//!
//! # Failure Semantics
//!
//! A panicking body is isolated whenever a teardown hook is in scope: the
//! after-hooks still run with whatever context was already materialized, and
//! the original failure is re-surfaced in the test's [`Outcome`]. A failing
//! `before` poisons its barrier, and every dependent test reports a setup
//! failure rather than being silently skipped.

pub mod context;
pub mod coordinator;
pub mod error;
pub mod hooks;
mod isolate;
pub mod logging;
pub mod outcome;
pub mod registry;

pub use context::{ContextRequirements, HookContext, Owned};
pub use coordinator::TestCase;
pub use error::{ConfigError, ContextError, ContextSlot, EngineError};
pub use hooks::{GroupHooks, HookKind, SuiteHooks};
pub use latchwork_sync::{BarrierPoisoned, CountdownLatch, LatchOverrun, OnceBarrier};
pub use logging::init_logging;
pub use outcome::{Failure, FailureKind, Outcome, Phase, RunSummary, TestReport};
pub use registry::{Engine, GroupId, GroupSpec};
