//! apt package step

use anyhow::{Context, Result};
use converge::{CommandSpec, Step, StepContext};

/// Packages the web stack depends on
pub const STACK_PACKAGES: &[&str] = &[
    "apache2",
    "mysql-server",
    "certbot",
    "python3-certbot-apache",
    "python3-pip",
    "python3-venv",
    "pipx",
    "iptables-persistent",
];

/// A set of apt packages installed together
#[derive(Debug, Clone)]
pub struct AptPackages {
    pub packages: Vec<String>,
}

impl AptPackages {
    pub fn new(packages: &[&str]) -> Self {
        Self {
            packages: packages.iter().map(|p| (*p).to_string()).collect(),
        }
    }

    /// Check if a single package is fully installed
    fn is_installed(ctx: &StepContext, name: &str) -> bool {
        ctx.capture(CommandSpec::new("dpkg-query").args(["-W", "-f=${Status}", name]))
            .is_some_and(|status| status.trim() == "install ok installed")
    }

    /// Packages that still need installing
    fn missing(&self, ctx: &StepContext) -> Vec<String> {
        self.packages
            .iter()
            .filter(|p| !Self::is_installed(ctx, p))
            .cloned()
            .collect()
    }
}

fn apt_get() -> CommandSpec {
    CommandSpec::new("apt-get").env("DEBIAN_FRONTEND", "noninteractive")
}

impl Step for AptPackages {
    fn name(&self) -> &str {
        "packages"
    }

    fn description(&self) -> String {
        format!("Install apt packages: {}", self.packages.join(", "))
    }

    fn is_satisfied(&self, ctx: &StepContext) -> bool {
        self.missing(ctx).is_empty()
    }

    fn apply(&self, ctx: &StepContext) -> Result<()> {
        let missing = self.missing(ctx);
        log::info!("installing {}", missing.join(" "));

        ctx.exec_root(apt_get().arg("update"))
            .context("Failed to refresh package lists")?;
        ctx.exec_root(apt_get().args(["install", "-y"]).args(missing))
            .context("Failed to install packages")?;
        Ok(())
    }
}
