//! Hook registration: one optional hook of each kind per scope.

use std::any::{Any, TypeId, type_name};
use std::fmt;
use std::sync::Arc;

use crate::context::{HookContext, Owned, OwnedValue, SharedValue};
use crate::error::ConfigError;

/// The four lifecycle hook kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    Before,
    After,
    BeforeEach,
    AfterEach,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Before => "before",
            Self::After => "after",
            Self::BeforeEach => "before_each",
            Self::AfterEach => "after_each",
        };
        write!(f, "{label}")
    }
}

/// A `before` hook: produces the scope's shared context exactly once.
pub(crate) struct SharedProducer {
    pub(crate) run: Box<dyn Fn() -> SharedValue + Send + Sync>,
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
}

/// A `before_each` hook: produces a fresh owned value per test.
pub(crate) struct OwnedProducer {
    pub(crate) run: Box<dyn Fn(&HookContext<'_>) -> OwnedValue + Send + Sync>,
    pub(crate) type_id: TypeId,
    pub(crate) type_name: &'static str,
}

/// An `after` hook: tears down the scope once the last test completed.
pub(crate) type SharedConsumer = Box<dyn Fn(&HookContext<'_>) + Send + Sync>;

/// An `after_each` hook: consumes the owned per-test value for teardown.
pub(crate) type OwnedConsumer = Box<dyn Fn(&HookContext<'_>, Owned) + Send + Sync>;

fn shared_producer<T, F>(f: F) -> SharedProducer
where
    T: Any + Send + Sync,
    F: Fn() -> T + Send + Sync + 'static,
{
    SharedProducer {
        run: Box::new(move || Arc::new(f()) as SharedValue),
        type_id: TypeId::of::<T>(),
        type_name: type_name::<T>(),
    }
}

fn owned_producer<T, F>(f: F) -> OwnedProducer
where
    T: Any + Send,
    F: Fn(&HookContext<'_>) -> T + Send + Sync + 'static,
{
    OwnedProducer {
        run: Box::new(move |cx| Box::new(f(cx)) as OwnedValue),
        type_id: TypeId::of::<T>(),
        type_name: type_name::<T>(),
    }
}

/// Hooks shared by every group that opts into the suite layer.
///
/// A suite has no `after`: without opt-in tracking across groups there is no
/// well-defined "last test in the suite" to trigger it.
#[derive(Default)]
pub struct SuiteHooks {
    pub(crate) before: Option<SharedProducer>,
    pub(crate) before_each: Option<OwnedProducer>,
    pub(crate) after_each: Option<OwnedConsumer>,
}

impl fmt::Debug for SuiteHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteHooks")
            .field("before", &self.before.is_some())
            .field("before_each", &self.before_each.is_some())
            .field("after_each", &self.after_each.is_some())
            .finish()
    }
}

impl SuiteHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run once per engine; the returned value becomes suite-wide shared
    /// context.
    pub fn before<T, F>(mut self, f: F) -> Result<Self, ConfigError>
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        if self.before.is_some() {
            return Err(ConfigError::DuplicateHook(HookKind::Before));
        }
        self.before = Some(shared_producer(f));
        Ok(self)
    }

    /// Run before every opted-in test; the returned value is that test's
    /// suite-level owned context.
    pub fn before_each<T, F>(mut self, f: F) -> Result<Self, ConfigError>
    where
        T: Any + Send,
        F: Fn(&HookContext<'_>) -> T + Send + Sync + 'static,
    {
        if self.before_each.is_some() {
            return Err(ConfigError::DuplicateHook(HookKind::BeforeEach));
        }
        self.before_each = Some(owned_producer(f));
        Ok(self)
    }

    /// Run after every opted-in test; consumes the suite-level owned context.
    pub fn after_each<F>(mut self, f: F) -> Result<Self, ConfigError>
    where
        F: Fn(&HookContext<'_>, Owned) + Send + Sync + 'static,
    {
        if self.after_each.is_some() {
            return Err(ConfigError::DuplicateHook(HookKind::AfterEach));
        }
        self.after_each = Some(Box::new(f));
        Ok(self)
    }
}

/// Hooks for one group of tests.
#[derive(Default)]
pub struct GroupHooks {
    pub(crate) before: Option<SharedProducer>,
    pub(crate) after: Option<SharedConsumer>,
    pub(crate) before_each: Option<OwnedProducer>,
    pub(crate) after_each: Option<OwnedConsumer>,
}

impl fmt::Debug for GroupHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupHooks")
            .field("before", &self.before.is_some())
            .field("after", &self.after.is_some())
            .field("before_each", &self.before_each.is_some())
            .field("after_each", &self.after_each.is_some())
            .finish()
    }
}

impl GroupHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run once per group, triggered by whichever test arrives first; the
    /// returned value becomes the group's shared context.
    pub fn before<T, F>(mut self, f: F) -> Result<Self, ConfigError>
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        if self.before.is_some() {
            return Err(ConfigError::DuplicateHook(HookKind::Before));
        }
        self.before = Some(shared_producer(f));
        Ok(self)
    }

    /// Run exactly once, after the last test in the group completed its own
    /// teardown.
    pub fn after<F>(mut self, f: F) -> Result<Self, ConfigError>
    where
        F: Fn(&HookContext<'_>) + Send + Sync + 'static,
    {
        if self.after.is_some() {
            return Err(ConfigError::DuplicateHook(HookKind::After));
        }
        self.after = Some(Box::new(f));
        Ok(self)
    }

    /// Run before every test in the group; the returned value is that test's
    /// owned context.
    pub fn before_each<T, F>(mut self, f: F) -> Result<Self, ConfigError>
    where
        T: Any + Send,
        F: Fn(&HookContext<'_>) -> T + Send + Sync + 'static,
    {
        if self.before_each.is_some() {
            return Err(ConfigError::DuplicateHook(HookKind::BeforeEach));
        }
        self.before_each = Some(owned_producer(f));
        Ok(self)
    }

    /// Run after every test in the group, even when the body failed;
    /// consumes the test's owned context.
    pub fn after_each<F>(mut self, f: F) -> Result<Self, ConfigError>
    where
        F: Fn(&HookContext<'_>, Owned) + Send + Sync + 'static,
    {
        if self.after_each.is_some() {
            return Err(ConfigError::DuplicateHook(HookKind::AfterEach));
        }
        self.after_each = Some(Box::new(f));
        Ok(self)
    }
}
