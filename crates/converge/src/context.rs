//! Step context, privilege elevation, and progress callbacks
//!
//! The elevation strategy is picked once by the caller and injected here,
//! so individual steps only say *whether* a command is privileged, never
//! *how* privilege is obtained.

use crate::command::{CommandError, CommandOutput, CommandRunner, CommandSpec, OutputMode};
use crate::types::{RunReport, StepOutcome};

/// How privileged commands are executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elevation {
    /// The current principal already has the required privilege
    Direct,
    /// Prefix privileged commands with `sudo`
    Sudo,
}

impl Elevation {
    /// Pick the strategy from whether the process already runs as root
    pub fn for_principal(is_root: bool) -> Self {
        if is_root { Self::Direct } else { Self::Sudo }
    }

    /// Rewrite a command so it runs with elevated privileges
    ///
    /// `sudo` resets the environment, so variables are forwarded through
    /// `env`. Stdin is carried over untouched.
    pub fn wrap(&self, spec: CommandSpec) -> CommandSpec {
        match self {
            Self::Direct => spec,
            Self::Sudo => {
                let mut args = Vec::with_capacity(spec.args.len() + spec.env.len() + 2);
                if !spec.env.is_empty() {
                    args.push("env".to_string());
                    args.extend(spec.env.iter().map(|(k, v)| format!("{k}={v}")));
                }
                args.push(spec.program);
                args.extend(spec.args);
                CommandSpec {
                    program: "sudo".to_string(),
                    args,
                    env: Vec::new(),
                    stdin: spec.stdin,
                }
            }
        }
    }
}

/// Progress callback for sequencer runs
///
/// Implement this trait to receive progress updates during a run.
pub trait ProgressCallback {
    /// Called once before the first step
    fn on_run_start(&mut self, total: usize, dry_run: bool);

    /// Called before a step's precondition is evaluated
    fn on_step_start(&mut self, index: usize, total: usize, name: &str, description: &str);

    /// Called when a step has an outcome
    fn on_step_complete(&mut self, name: &str, outcome: &StepOutcome);

    /// Called once after the run stops, successfully or not
    fn on_run_complete(&mut self, report: &RunReport);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_run_start(&mut self, _total: usize, _dry_run: bool) {}
    fn on_step_start(&mut self, _index: usize, _total: usize, _name: &str, _description: &str) {}
    fn on_step_complete(&mut self, _name: &str, _outcome: &StepOutcome) {}
    fn on_run_complete(&mut self, _report: &RunReport) {}
}

/// Context passed to every step check and action
pub struct StepContext<'a> {
    runner: &'a dyn CommandRunner,
    /// Strategy applied to privileged commands
    pub elevation: Elevation,
    /// Whether this is a dry run (no actions are executed)
    pub dry_run: bool,
}

impl<'a> StepContext<'a> {
    /// Create a new step context
    pub fn new(runner: &'a dyn CommandRunner, elevation: Elevation) -> Self {
        Self {
            runner,
            elevation,
            dry_run: false,
        }
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Run a check as the current user; any failure reads as `false`
    pub fn check(&self, spec: CommandSpec) -> bool {
        self.probe(spec).is_some_and(|o| o.success)
    }

    /// Run a check with elevated privileges; any failure reads as `false`
    pub fn check_root(&self, spec: CommandSpec) -> bool {
        self.probe(self.elevation.wrap(spec)).is_some_and(|o| o.success)
    }

    /// Capture stdout of a query, `None` if it did not succeed
    pub fn capture(&self, spec: CommandSpec) -> Option<String> {
        self.probe(spec).filter(|o| o.success).map(|o| o.stdout_str())
    }

    /// Capture stdout of a privileged query, `None` if it did not succeed
    pub fn capture_root(&self, spec: CommandSpec) -> Option<String> {
        self.probe(self.elevation.wrap(spec))
            .filter(|o| o.success)
            .map(|o| o.stdout_str())
    }

    /// Run an action as the current user
    pub fn exec(&self, spec: CommandSpec) -> Result<(), CommandError> {
        self.execute(spec)
    }

    /// Run an action with elevated privileges
    pub fn exec_root(&self, spec: CommandSpec) -> Result<(), CommandError> {
        self.execute(self.elevation.wrap(spec))
    }

    fn probe(&self, spec: CommandSpec) -> Option<CommandOutput> {
        log::debug!("check: {spec}");
        match self.runner.run(&spec, OutputMode::Capture) {
            Ok(output) => {
                if !output.success {
                    let stderr = output.stderr_str();
                    let stderr = stderr.trim();
                    if !stderr.is_empty() {
                        log::debug!("check stderr: {stderr}");
                    }
                }
                Some(output)
            }
            Err(e) => {
                log::debug!("check could not run: {e}");
                None
            }
        }
    }

    fn execute(&self, spec: CommandSpec) -> Result<(), CommandError> {
        log::info!("run: {spec}");
        let output = self.runner.run(&spec, OutputMode::Inherit)?;
        if output.success {
            Ok(())
        } else {
            Err(CommandError::Failed {
                command: spec.to_string(),
                code: output.code,
            })
        }
    }
}
