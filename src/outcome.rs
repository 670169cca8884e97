//! Per-test outcomes and the report types handed to reporting collaborators.

use std::fmt;
use std::time::Duration;

use serde::Serialize;

/// Lifecycle phase of one test execution, in the order phases run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Phase {
    SuiteBefore,
    GroupBefore,
    SuiteBeforeEach,
    GroupBeforeEach,
    Body,
    GroupAfterEach,
    SuiteAfterEach,
    GroupAfter,
}

impl Phase {
    /// Coarse classification used by reporters to distinguish setup, body,
    /// and teardown failures.
    pub fn kind(self) -> FailureKind {
        match self {
            Self::SuiteBefore | Self::GroupBefore | Self::SuiteBeforeEach | Self::GroupBeforeEach => {
                FailureKind::Setup
            }
            Self::Body => FailureKind::Body,
            Self::GroupAfterEach | Self::SuiteAfterEach | Self::GroupAfter => FailureKind::Teardown,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::SuiteBefore => "suite:before",
            Self::GroupBefore => "group:before",
            Self::SuiteBeforeEach => "suite:before_each",
            Self::GroupBeforeEach => "group:before_each",
            Self::Body => "body",
            Self::GroupAfterEach => "group:after_each",
            Self::SuiteAfterEach => "suite:after_each",
            Self::GroupAfter => "group:after",
        };
        write!(f, "{label}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    Setup,
    Body,
    Teardown,
}

/// One captured failure: which phase it happened in and the panic message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub phase: Phase,
    pub message: String,
}

impl Failure {
    pub fn kind(&self) -> FailureKind {
        self.phase.kind()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.phase, self.message)
    }
}

/// Terminal result of one test execution, produced only after all applicable
/// teardown has run.
///
/// When both the body and a teardown hook fail, every failure is kept in the
/// order it occurred; the later one never overwrites the earlier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Passed,
    Failed(Vec<Failure>),
}

impl Outcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    pub fn failures(&self) -> &[Failure] {
        match self {
            Self::Passed => &[],
            Self::Failed(failures) => failures,
        }
    }
}

/// The signal emitted per test for the reporting collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct TestReport {
    pub name: String,
    pub group: String,
    pub outcome: Outcome,
    pub duration: Duration,
}

impl TestReport {
    /// First phase that failed, if any.
    pub fn failed_phase(&self) -> Option<Phase> {
        self.outcome.failures().first().map(|f| f.phase)
    }
}

/// Aggregate the reporting collaborator can fold per-test reports into.
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub reports: Vec<TestReport>,
    pub total_duration: Duration,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, report: TestReport) {
        self.total_duration += report.duration;
        self.reports.push(report);
    }

    pub fn passed(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| r.outcome.is_passed())
            .count()
    }

    pub fn failed(&self) -> usize {
        self.reports
            .iter()
            .filter(|r| !r.outcome.is_passed())
            .count()
    }

    pub fn all_passed(&self) -> bool {
        self.reports.iter().all(|r| r.outcome.is_passed())
    }
}
