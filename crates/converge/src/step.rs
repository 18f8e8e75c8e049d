//! Step trait for idempotent provisioning
//!
//! A Step is one named unit of work: a precondition that says whether the
//! desired state already holds, an action that converges the host, and a
//! verification that the action had the intended effect.

use crate::context::StepContext;
use anyhow::Result;
use std::fmt;

/// Core trait for provisioning steps
///
/// # Example
///
/// ```ignore
/// use converge::{CommandSpec, Step, StepContext};
///
/// #[derive(Debug)]
/// struct ServiceEnabled { unit: &'static str }
///
/// impl Step for ServiceEnabled {
///     fn name(&self) -> &str { self.unit }
///
///     fn description(&self) -> String {
///         format!("Enable and start {}", self.unit)
///     }
///
///     fn is_satisfied(&self, ctx: &StepContext) -> bool {
///         ctx.check_root(CommandSpec::new("systemctl").args(["is-active", self.unit]))
///     }
///
///     fn apply(&self, ctx: &StepContext) -> anyhow::Result<()> {
///         ctx.exec_root(CommandSpec::new("systemctl").args(["enable", "--now", self.unit]))?;
///         Ok(())
///     }
/// }
/// ```
pub trait Step: fmt::Debug {
    /// Short stable identifier, e.g. "packages" or "certificate"
    fn name(&self) -> &str;

    /// Human-readable description of the desired state
    fn description(&self) -> String;

    /// Whether the desired state already holds
    ///
    /// Must not change the host. Anything that prevents the check from
    /// running counts as "not satisfied".
    fn is_satisfied(&self, ctx: &StepContext) -> bool;

    /// Converge the host towards the desired state
    fn apply(&self, ctx: &StepContext) -> Result<()>;

    /// Whether the action had its intended effect
    fn verify(&self, ctx: &StepContext) -> bool {
        self.is_satisfied(ctx)
    }
}

/// A boxed step for type-erased catalogs
pub type BoxedStep = Box<dyn Step>;
