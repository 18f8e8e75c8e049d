//! Core types for sequencer results

use std::fmt;

/// What happened to a single step
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// Precondition already held, nothing was done
    Skipped,
    /// Action ran and verification passed
    Applied,
    /// Dry run: the precondition did not hold and the action was not run
    Planned,
    /// Action or verification failed; the run stopped here
    Failed { error: String },
}

impl StepOutcome {
    /// Check if the outcome represents success (no failure)
    pub fn is_success(&self) -> bool {
        !matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skipped => write!(f, "skipped"),
            Self::Applied => write!(f, "applied"),
            Self::Planned => write!(f, "planned"),
            Self::Failed { error } => write!(f, "failed: {error}"),
        }
    }
}

/// The recorded outcome of one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepResult {
    pub name: String,
    pub outcome: StepOutcome,
}

/// Ordered results of a sequencer run
///
/// Only steps that were reached appear here; after a failure the
/// remaining steps are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub results: Vec<StepResult>,
}

impl RunReport {
    pub fn push(&mut self, name: &str, outcome: StepOutcome) {
        self.results.push(StepResult {
            name: name.to_string(),
            outcome,
        });
    }

    /// Check if the run was fully successful (no failures)
    pub fn is_success(&self) -> bool {
        self.results.iter().all(|r| r.outcome.is_success())
    }

    /// The step that stopped the run, if any
    pub fn failure(&self) -> Option<&StepResult> {
        self.results.iter().find(|r| !r.outcome.is_success())
    }

    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Applied))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Skipped))
    }

    pub fn planned(&self) -> usize {
        self.count(|o| matches!(o, StepOutcome::Planned))
    }

    /// Names of the steps that were reached, in execution order
    pub fn names(&self) -> Vec<&str> {
        self.results.iter().map(|r| r.name.as_str()).collect()
    }

    fn count(&self, pred: impl Fn(&StepOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }
}
