//! Service step - enable and start a systemd unit

use anyhow::{Context, Result};
use converge::{CommandSpec, Step, StepContext};

/// A systemd unit that must be enabled and running
#[derive(Debug, Clone)]
pub struct SystemdService {
    /// Step name shown to the operator
    pub label: &'static str,
    pub unit: &'static str,
}

impl SystemdService {
    pub fn new(label: &'static str, unit: &'static str) -> Self {
        Self { label, unit }
    }

    fn systemctl(&self, verb: &str) -> CommandSpec {
        CommandSpec::new("systemctl").args([verb, "--quiet", self.unit])
    }
}

impl Step for SystemdService {
    fn name(&self) -> &str {
        self.label
    }

    fn description(&self) -> String {
        format!("Enable and start {}", self.unit)
    }

    fn is_satisfied(&self, ctx: &StepContext) -> bool {
        ctx.check_root(self.systemctl("is-active")) && ctx.check_root(self.systemctl("is-enabled"))
    }

    fn apply(&self, ctx: &StepContext) -> Result<()> {
        ctx.exec_root(CommandSpec::new("systemctl").args(["enable", "--now", self.unit]))
            .with_context(|| format!("Failed to start {}", self.unit))?;
        Ok(())
    }
}
