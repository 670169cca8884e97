//! Engine registration: the suite scope, group scopes, and admission checks.

use std::any::TypeId;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use latchwork_sync::CountdownLatch;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use tracing::debug;

use crate::context::{ContextStore, HookContext, Requirement};
use crate::coordinator::{self, TestCase};
use crate::error::{ConfigError, ContextSlot, EngineError};
use crate::hooks::{GroupHooks, OwnedConsumer, OwnedProducer, SharedConsumer, SharedProducer, SuiteHooks};
use crate::isolate;
use crate::outcome::{Phase, TestReport};

/// Handle to a registered group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupId(usize);

/// Everything a group declares up front. The test count is immutable after
/// registration: it seeds the teardown latch, so it cannot change once the
/// first test runs.
pub struct GroupSpec {
    pub name: String,
    pub test_count: usize,
    pub hooks: GroupHooks,
    pub suite_opt_in: bool,
}

pub(crate) struct SuiteScope {
    pub(crate) store: ContextStore,
    pub(crate) before: Option<SharedProducer>,
    pub(crate) before_each: Option<OwnedProducer>,
    pub(crate) after_each: Option<OwnedConsumer>,
}

pub(crate) struct GroupScope {
    pub(crate) name: String,
    pub(crate) declared_count: usize,
    pub(crate) suite_opt_in: bool,
    pub(crate) store: ContextStore,
    pub(crate) before: Option<SharedProducer>,
    pub(crate) after: Option<SharedConsumer>,
    pub(crate) before_each: Option<OwnedProducer>,
    pub(crate) after_each: Option<OwnedConsumer>,
    /// Admission counter; bounds `run_test` invocations to `declared_count`.
    pub(crate) started: AtomicUsize,
    /// Present only when an `after` hook guards the group.
    pub(crate) after_latch: Option<CountdownLatch>,
}

impl GroupScope {
    pub(crate) fn any_teardown(&self) -> bool {
        self.after.is_some() || self.after_each.is_some()
    }
}

/// The orchestration engine: owns one optional suite scope and any number of
/// group scopes, each with its own barrier and latch. No process-wide
/// statics; every instance is independent and fully concurrent.
#[derive(Default)]
pub struct Engine {
    suite: OnceCell<SuiteScope>,
    groups: RwLock<Vec<Arc<GroupScope>>>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the process-wide suite hooks. At most one suite per engine;
    /// a second registration is a configuration error.
    pub fn register_suite(&self, hooks: SuiteHooks) -> Result<(), EngineError> {
        let scope = SuiteScope {
            store: ContextStore::new(hooks.before.is_some()),
            before: hooks.before,
            before_each: hooks.before_each,
            after_each: hooks.after_each,
        };
        self.suite
            .set(scope)
            .map_err(|_| ConfigError::DuplicateSuite)?;
        debug!("suite hooks registered");
        Ok(())
    }

    /// Register a group with a fixed test count.
    ///
    /// A group declared with zero tests has an already-elapsed latch, so its
    /// `after` hook runs immediately and synchronously, before this call
    /// returns.
    pub fn register_group(&self, spec: GroupSpec) -> Result<GroupId, EngineError> {
        let GroupSpec {
            name,
            test_count,
            hooks,
            suite_opt_in,
        } = spec;

        let mut groups = self.groups.write();
        if groups.iter().any(|g| g.name == name) {
            return Err(ConfigError::DuplicateGroup(name).into());
        }

        if test_count == 0 {
            if let Some(after) = &hooks.after {
                debug!(group = %name, "zero-test group, running after hook at registration");
                isolate::run_isolated(Phase::GroupAfter, || after(&HookContext::EMPTY)).map_err(
                    |failure| EngineError::RegistrationTeardown {
                        group: name.clone(),
                        message: failure.message,
                    },
                )?;
            }
        }

        let scope = GroupScope {
            store: ContextStore::new(hooks.before.is_some()),
            after_latch: (test_count > 0 && hooks.after.is_some())
                .then(|| CountdownLatch::new(test_count)),
            before: hooks.before,
            after: hooks.after,
            before_each: hooks.before_each,
            after_each: hooks.after_each,
            declared_count: test_count,
            suite_opt_in,
            started: AtomicUsize::new(0),
            name,
        };
        debug!(group = %scope.name, tests = test_count, "group registered");
        groups.push(Arc::new(scope));
        Ok(GroupId(groups.len() - 1))
    }

    /// Execute one test of a group through the full layered hook sequence.
    ///
    /// Invoking this more times than the group's declared `test_count` is a
    /// latch overrun: the call is rejected before any phase runs. A caller
    /// that admits a test but abandons it mid-flight starves the group's
    /// `after` hook; driving every admitted test to completion is the
    /// caller's obligation.
    ///
    /// When no teardown hook is in scope the body runs without a failure
    /// boundary, so a panicking body unwinds straight out of this call.
    pub fn run_test(&self, group: GroupId, test: TestCase) -> Result<TestReport, EngineError> {
        let scope = self
            .groups
            .read()
            .get(group.0)
            .cloned()
            .ok_or(ConfigError::UnknownGroup)?;

        let suite = if scope.suite_opt_in {
            Some(self.suite.get().ok_or(ConfigError::SuiteNotRegistered)?)
        } else {
            None
        };

        validate_requirements(suite, &scope, &test)?;

        scope
            .started
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| {
                (n < scope.declared_count).then_some(n + 1)
            })
            .map_err(|_| EngineError::LatchOverrun {
                group: scope.name.clone(),
                declared: scope.declared_count,
            })?;

        Ok(coordinator::run_case(suite, &scope, test))
    }
}

/// Check a test's declared context requirements against the producer types
/// recorded at registration, before any phase runs.
fn validate_requirements(
    suite: Option<&SuiteScope>,
    group: &GroupScope,
    test: &TestCase,
) -> Result<(), ConfigError> {
    let shared_producers = [
        group.before.as_ref().map(|p| (p.type_id, p.type_name)),
        suite
            .and_then(|s| s.before.as_ref())
            .map(|p| (p.type_id, p.type_name)),
    ];
    for req in &test.requirements.shared {
        check_requirement(req, shared_producers, ContextSlot::Shared, test.name())?;
    }

    let owned_producers = [
        group.before_each.as_ref().map(|p| (p.type_id, p.type_name)),
        suite
            .and_then(|s| s.before_each.as_ref())
            .map(|p| (p.type_id, p.type_name)),
    ];
    for req in &test.requirements.owned {
        check_requirement(req, owned_producers, ContextSlot::Owned, test.name())?;
    }

    Ok(())
}

fn check_requirement(
    req: &Requirement,
    producers: [Option<(TypeId, &'static str)>; 2],
    slot: ContextSlot,
    test: &str,
) -> Result<(), ConfigError> {
    let mut available = Vec::new();
    for (type_id, type_name) in producers.into_iter().flatten() {
        if type_id == req.type_id {
            return Ok(());
        }
        available.push(type_name);
    }
    if available.is_empty() {
        Err(ConfigError::MissingProducer {
            test: test.to_string(),
            slot,
            type_name: req.type_name,
        })
    } else {
        Err(ConfigError::RequirementMismatch {
            test: test.to_string(),
            slot,
            expected: req.type_name,
            available: available.join(", "),
        })
    }
}
