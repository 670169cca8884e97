//! Drives one test execution through the layered hook state machine.
//!
//! Phase order per test:
//!
//! ```text
//! suite:before → group:before → suite:before_each → group:before_each
//!   → body → group:after_each → suite:after_each → group:after? → done
//! ```
//!
//! Before-hooks acquire from the outside in; after-hooks release from the
//! inside out. A setup failure skips the remaining inner setup and the body,
//! and only the layers whose setup completed get their mirrored teardown.
//! The group latch counts every admitted execution, passed or failed, so the
//! `after` hook cannot starve on an engine-observed failure.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, warn};

use crate::context::{ContextRequirements, ContextStore, HookContext, Owned, Published};
use crate::isolate;
use crate::outcome::{Failure, Outcome, Phase, TestReport};
use crate::registry::{GroupScope, SuiteScope};

/// One named unit of work, handed to [`Engine::run_test`](crate::Engine::run_test).
pub struct TestCase {
    name: String,
    pub(crate) requirements: ContextRequirements,
    body: Box<dyn FnOnce(&HookContext<'_>) + Send>,
}

impl TestCase {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: FnOnce(&HookContext<'_>) + Send + 'static,
    {
        Self {
            name: name.into(),
            requirements: ContextRequirements::default(),
            body: Box::new(body),
        }
    }

    /// Declare the context types this test consumes, so type agreement is
    /// checked before any phase runs.
    pub fn requiring(mut self, requirements: ContextRequirements) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

fn view<'a>(
    suite_shared: Option<&'a Published>,
    group_shared: Option<&'a Published>,
    suite_owned: Option<&'a Owned>,
    group_owned: Option<&'a Owned>,
) -> HookContext<'a> {
    HookContext {
        suite_shared,
        group_shared,
        suite_owned,
        group_owned,
    }
}

/// Fetch a scope's published context for the `after` hook. A poisoned scope
/// has no usable value; the setup failure already failed its dependent tests,
/// so here it is logged and the hook runs without that context.
fn recover_shared(store: &ContextStore, scope: &'static str) -> Option<Arc<Published>> {
    match store.get_shared() {
        Some(Ok(published)) => Some(published),
        Some(Err(poisoned)) => {
            warn!(scope, error = %poisoned, "shared context unavailable for after hook");
            None
        }
        None => None,
    }
}

/// The body only pays for a failure boundary when a later phase depends on
/// running after it.
fn needs_isolation(suite: Option<&SuiteScope>, group: &GroupScope) -> bool {
    group.any_teardown() || suite.is_some_and(|s| s.after_each.is_some())
}

pub(crate) fn run_case(
    suite: Option<&SuiteScope>,
    group: &GroupScope,
    test: TestCase,
) -> TestReport {
    let start = Instant::now();
    let mut failures: Vec<Failure> = Vec::new();

    let mut suite_shared: Option<Arc<Published>> = None;
    let mut group_shared: Option<Arc<Published>> = None;
    let mut suite_owned: Option<Owned> = None;
    let mut group_owned: Option<Owned> = None;

    // High-water marks: which each-layers completed setup.
    let mut reached_suite_each = false;
    let mut reached_group_each = false;
    let mut setup_ok = true;

    // SUITE_BEFORE
    if let Some(suite) = suite {
        if let Some(producer) = &suite.before {
            match suite.store.set_once(producer) {
                Ok(published) => suite_shared = Some(published),
                Err(poisoned) => {
                    failures.push(Failure {
                        phase: Phase::SuiteBefore,
                        message: poisoned.message().to_string(),
                    });
                    setup_ok = false;
                }
            }
        }
    }

    // GROUP_BEFORE
    if setup_ok {
        if let Some(producer) = &group.before {
            match group.store.set_once(producer) {
                Ok(published) => group_shared = Some(published),
                Err(poisoned) => {
                    failures.push(Failure {
                        phase: Phase::GroupBefore,
                        message: poisoned.message().to_string(),
                    });
                    setup_ok = false;
                }
            }
        }
    }

    // SUITE_BEFORE_EACH
    if setup_ok {
        if let Some(producer) = suite.and_then(|s| s.before_each.as_ref()) {
            let cx = view(suite_shared.as_deref(), group_shared.as_deref(), None, None);
            match isolate::run_isolated(Phase::SuiteBeforeEach, || Owned {
                value: (producer.run)(&cx),
                type_name: producer.type_name,
            }) {
                Ok(owned) => suite_owned = Some(owned),
                Err(failure) => {
                    failures.push(failure);
                    setup_ok = false;
                }
            }
        }
        reached_suite_each = setup_ok;
    }

    // GROUP_BEFORE_EACH
    if setup_ok {
        if let Some(producer) = &group.before_each {
            let cx = view(
                suite_shared.as_deref(),
                group_shared.as_deref(),
                suite_owned.as_ref(),
                None,
            );
            match isolate::run_isolated(Phase::GroupBeforeEach, || Owned {
                value: (producer.run)(&cx),
                type_name: producer.type_name,
            }) {
                Ok(owned) => group_owned = Some(owned),
                Err(failure) => {
                    failures.push(failure);
                    setup_ok = false;
                }
            }
        }
        reached_group_each = setup_ok;
    }

    // BODY
    let body = test.body;
    if setup_ok {
        let cx = view(
            suite_shared.as_deref(),
            group_shared.as_deref(),
            suite_owned.as_ref(),
            group_owned.as_ref(),
        );
        if needs_isolation(suite, group) {
            if let Err(failure) = isolate::run_isolated(Phase::Body, || body(&cx)) {
                failures.push(failure);
            }
        } else {
            // Zero-overhead path: nothing depends on running after the body.
            body(&cx);
        }
    }

    // GROUP_AFTER_EACH mirrors group:before_each, innermost teardown first.
    if reached_group_each {
        if let Some(consumer) = &group.after_each {
            let owned = group_owned.take().unwrap_or_else(Owned::unit);
            let cx = view(
                suite_shared.as_deref(),
                group_shared.as_deref(),
                suite_owned.as_ref(),
                None,
            );
            if let Err(failure) = isolate::run_isolated(Phase::GroupAfterEach, || {
                consumer(&cx, owned);
            }) {
                warn!(test = %test.name, phase = %failure.phase, "teardown hook failed");
                failures.push(failure);
            }
        }
    }

    // SUITE_AFTER_EACH
    if reached_suite_each {
        if let Some(consumer) = suite.and_then(|s| s.after_each.as_ref()) {
            let owned = suite_owned.take().unwrap_or_else(Owned::unit);
            let cx = view(suite_shared.as_deref(), group_shared.as_deref(), None, None);
            if let Err(failure) = isolate::run_isolated(Phase::SuiteAfterEach, || {
                consumer(&cx, owned);
            }) {
                warn!(test = %test.name, phase = %failure.phase, "teardown hook failed");
                failures.push(failure);
            }
        }
    }

    // GROUP_AFTER: only the invocation whose decrement reaches zero runs it,
    // strictly after that test's own after_each chain, and regardless of this
    // test's own pass/fail.
    if let Some(latch) = &group.after_latch {
        match latch.complete_one() {
            Ok(true) => {
                debug!(group = %group.name, "last test completed, running after hook");
                // This execution may never have reached group:before; pick up
                // whatever another test published.
                if group_shared.is_none() {
                    group_shared = recover_shared(&group.store, "group");
                }
                if suite_shared.is_none() {
                    if let Some(suite) = suite {
                        suite_shared = recover_shared(&suite.store, "suite");
                    }
                }
                if let Some(consumer) = &group.after {
                    let cx = view(suite_shared.as_deref(), group_shared.as_deref(), None, None);
                    if let Err(failure) = isolate::run_isolated(Phase::GroupAfter, || consumer(&cx))
                    {
                        warn!(group = %group.name, "group after hook failed");
                        failures.push(failure);
                    }
                }
            }
            Ok(false) => {}
            Err(overrun) => {
                // Admission bounds executions to the declared count; if the
                // latch still overruns, the contract violation must be loud.
                failures.push(Failure {
                    phase: Phase::GroupAfter,
                    message: overrun.to_string(),
                });
            }
        }
    }

    let outcome = if failures.is_empty() {
        Outcome::Passed
    } else {
        Outcome::Failed(failures)
    };

    TestReport {
        name: test.name,
        group: group.name.clone(),
        outcome,
        duration: start.elapsed(),
    }
}
