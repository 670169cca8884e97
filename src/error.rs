//! Structured error taxonomy for registration and execution.

use thiserror::Error;

use crate::hooks::HookKind;

/// Errors surfaced by the engine's public API.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// `run_test` was invoked more times than the group's declared count.
    /// The offending invocation is rejected before any phase runs.
    #[error("group `{group}` declared {declared} tests but run_test was invoked again")]
    LatchOverrun { group: String, declared: usize },

    /// A zero-test group's `after` hook, run synchronously at registration,
    /// failed.
    #[error("group `{group}` teardown failed at registration: {message}")]
    RegistrationTeardown { group: String, message: String },
}

/// Configuration errors: fatal at registration or admission time, reported
/// immediately, never silently dropped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("suite hooks are already registered for this engine")]
    DuplicateSuite,

    #[error("group `{0}` is already registered")]
    DuplicateGroup(String),

    #[error("duplicate `{0}` hook in one scope")]
    DuplicateHook(HookKind),

    #[error("no group registered under this id")]
    UnknownGroup,

    #[error("group opted into suite hooks but no suite is registered")]
    SuiteNotRegistered,

    /// A declared context requirement has no producer at all in scope.
    #[error("test `{test}`: no {slot} context producer for required type `{type_name}`")]
    MissingProducer {
        test: String,
        slot: ContextSlot,
        type_name: &'static str,
    },

    /// Producers exist in scope but none of them yields the required type.
    #[error(
        "test `{test}`: required {slot} context `{expected}` but producers in scope yield {available}"
    )]
    RequirementMismatch {
        test: String,
        slot: ContextSlot,
        expected: &'static str,
        available: String,
    },
}

/// Which kind of context slot a requirement refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextSlot {
    Shared,
    Owned,
}

impl std::fmt::Display for ContextSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shared => write!(f, "shared"),
            Self::Owned => write!(f, "owned"),
        }
    }
}

/// Typed context access failed inside a hook or test body.
///
/// This is the runtime flavor of a type-agreement violation, for
/// collaborators that cannot pre-declare their types; it is a distinct error
/// kind, never a silent default value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    #[error("no shared context of type `{0}` in scope")]
    MissingShared(&'static str),

    #[error("no owned context of type `{0}` for this test")]
    MissingOwned(&'static str),

    #[error("context type mismatch: consumer expected `{expected}`, producer stored `{actual}`")]
    TypeMismatch {
        expected: &'static str,
        actual: &'static str,
    },
}
