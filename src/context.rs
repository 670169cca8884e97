//! Typed context plumbing: write-once shared slots and per-test owned values.
//!
//! Shared context (from `before`) is published exactly once per scope through
//! the scope's [`OnceBarrier`] and handed out as `&T` for the scope's
//! lifetime. Owned context (from `before_each`) is produced fresh per test,
//! borrowed by the body, and consumed by `after_each`.

use std::any::{Any, TypeId, type_name};
use std::sync::Arc;

use latchwork_sync::{BarrierPoisoned, OnceBarrier};

use crate::error::ContextError;
use crate::hooks::SharedProducer;

pub(crate) type SharedValue = Arc<dyn Any + Send + Sync>;
pub(crate) type OwnedValue = Box<dyn Any + Send>;

/// A shared value after publication, with its producer's type name kept for
/// diagnostics.
pub(crate) struct Published {
    pub(crate) value: SharedValue,
    pub(crate) type_name: &'static str,
}

/// Owned per-test context in transit to its consumer.
///
/// Once `after_each` has received this wrapper, the value is gone from the
/// execution: nothing else can observe it. A test that needs the value past
/// teardown must make its own copy before handing this over.
pub struct Owned {
    pub(crate) value: OwnedValue,
    pub(crate) type_name: &'static str,
}

impl Owned {
    pub(crate) fn unit() -> Self {
        Self {
            value: Box::new(()),
            type_name: "()",
        }
    }

    /// Take the value out by exact type.
    pub fn take<T: Any>(self) -> Result<T, ContextError> {
        match self.value.downcast::<T>() {
            Ok(boxed) => Ok(*boxed),
            Err(_) => Err(ContextError::TypeMismatch {
                expected: type_name::<T>(),
                actual: self.type_name,
            }),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

/// Write-once store for one scope's shared context.
///
/// The slot is backed by the scope's `before` barrier, so a reader that
/// arrives while the publisher is still running blocks until publication
/// completes instead of observing partial state. Scopes without a `before`
/// hook allocate no barrier at all.
pub(crate) struct ContextStore {
    shared: Option<OnceBarrier<Published>>,
}

impl ContextStore {
    pub(crate) fn new(has_before: bool) -> Self {
        Self {
            shared: has_before.then(OnceBarrier::new),
        }
    }

    /// Publish the shared value through the barrier; the first caller runs
    /// the producer, everyone else gets the cached publication. Repeat calls
    /// never re-run the producer.
    pub(crate) fn set_once(
        &self,
        producer: &SharedProducer,
    ) -> Result<Arc<Published>, BarrierPoisoned> {
        let barrier = self
            .shared
            .as_ref()
            .unwrap_or_else(|| unreachable!("set_once called on a scope without a before hook"));
        barrier.run_once(|| Published {
            value: (producer.run)(),
            type_name: producer.type_name,
        })
    }

    /// Blocking read of the shared slot; `None` when the scope has no
    /// `before` hook or nobody has triggered publication yet.
    pub(crate) fn get_shared(&self) -> Option<Result<Arc<Published>, BarrierPoisoned>> {
        self.shared.as_ref().and_then(OnceBarrier::wait)
    }

    pub(crate) fn has_barrier(&self) -> bool {
        self.shared.is_some()
    }
}

/// Read-only view of the context available to one hook or test body.
///
/// Lookup resolves the innermost scope first: group context shadows suite
/// context of the same type.
pub struct HookContext<'a> {
    pub(crate) suite_shared: Option<&'a Published>,
    pub(crate) group_shared: Option<&'a Published>,
    pub(crate) suite_owned: Option<&'a Owned>,
    pub(crate) group_owned: Option<&'a Owned>,
}

impl HookContext<'_> {
    pub(crate) const EMPTY: HookContext<'static> = HookContext {
        suite_shared: None,
        group_shared: None,
        suite_owned: None,
        group_owned: None,
    };

    /// Borrow shared context published by a `before` hook in scope.
    pub fn shared<T: Any + Send + Sync>(&self) -> Result<&T, ContextError> {
        for published in [self.group_shared, self.suite_shared].into_iter().flatten() {
            if let Some(value) = published.value.downcast_ref::<T>() {
                return Ok(value);
            }
        }
        match self.group_shared.or(self.suite_shared) {
            Some(published) => Err(ContextError::TypeMismatch {
                expected: type_name::<T>(),
                actual: published.type_name,
            }),
            None => Err(ContextError::MissingShared(type_name::<T>())),
        }
    }

    /// Borrow the owned per-test context produced by a `before_each` hook.
    pub fn owned_ref<T: Any>(&self) -> Result<&T, ContextError> {
        for owned in [self.group_owned, self.suite_owned].into_iter().flatten() {
            if let Some(value) = owned.value.downcast_ref::<T>() {
                return Ok(value);
            }
        }
        match self.group_owned.or(self.suite_owned) {
            Some(owned) => Err(ContextError::TypeMismatch {
                expected: type_name::<T>(),
                actual: owned.type_name,
            }),
            None => Err(ContextError::MissingOwned(type_name::<T>())),
        }
    }
}

/// Context types a test declares ahead of execution.
///
/// Validated against the recorded producer types before any phase runs, so
/// type disagreements the front-end could know about are rejected at
/// admission rather than mid-execution.
#[derive(Default)]
pub struct ContextRequirements {
    pub(crate) shared: Vec<Requirement>,
    pub(crate) owned: Vec<Requirement>,
}

pub(crate) struct Requirement {
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
}

impl ContextRequirements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared<T: Any + Send + Sync>(mut self) -> Self {
        self.shared.push(Requirement {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        });
        self
    }

    pub fn owned<T: Any + Send>(mut self) -> Self {
        self.owned.push(Requirement {
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        });
        self
    }
}
