//! # Converge
//!
//! Ordered, idempotent provisioning steps.
//!
//! This crate provides the core abstractions for converging a host to a
//! desired state one step at a time, tolerating re-runs.
//!
//! ## Core Concepts
//!
//! - **Step**: a named unit of work with a precondition, an action, and a
//!   verification
//! - **CommandSpec**: a description of an external command; secrets travel
//!   on stdin only
//! - **Elevation**: how privileged commands are run, chosen once per process
//! - **Sequencer**: runs steps in declared order and stops at the first failure
//!
//! ## Example
//!
//! ```ignore
//! use converge::{Elevation, StepContext, sequencer};
//!
//! let ctx = StepContext::new(&runner, Elevation::for_principal(is_root));
//! let report = sequencer::run_simple(&steps, &ctx);
//! if !report.is_success() {
//!     anyhow::bail!("provisioning stopped");
//! }
//! ```
//!
//! ## Provider Traits
//!
//! - [`CommandRunner`]: executes commands on the target host
//! - [`ProgressCallback`]: receives progress updates
//!
//! Both are injected, so steps can be exercised against a scripted host
//! without touching the real machine.

pub mod command;
pub mod context;
pub mod sequencer;
pub mod step;
pub mod types;

// Re-export main types at crate root
pub use command::{CommandError, CommandOutput, CommandRunner, CommandSpec, OutputMode};
pub use context::{Elevation, NoProgress, ProgressCallback, StepContext};
pub use sequencer::{run, run_simple};
pub use step::{BoxedStep, Step};
pub use types::{RunReport, StepOutcome, StepResult};
