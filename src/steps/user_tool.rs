//! User-level tool installs (OCI CLI, pipx-managed tools)
//!
//! These run as the invoking user, never elevated, and are considered
//! present when their executable exists under the user's home.

use anyhow::{Context, Result};
use converge::{CommandSpec, Step, StepContext};
use std::path::{Path, PathBuf};

pub const OCI_INSTALLER_URL: &str =
    "https://raw.githubusercontent.com/oracle/oci-cli/master/scripts/install/install.sh";

/// How a tool gets installed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Installer {
    /// Pipe a remote shell installer into bash with extra arguments
    Script { url: String, args: Vec<String> },
    /// `pipx install <package>`
    Pipx { package: String },
}

#[derive(Debug, Clone)]
pub struct UserTool {
    pub label: &'static str,
    pub executable: PathBuf,
    pub installer: Installer,
}

impl UserTool {
    /// The Oracle Cloud CLI, installed to `~/bin/oci`
    pub fn oci_cli(home: &Path) -> Self {
        Self {
            label: "oci-cli",
            executable: home.join("bin").join("oci"),
            installer: Installer::Script {
                url: OCI_INSTALLER_URL.to_string(),
                args: vec!["--accept-all-defaults".to_string()],
            },
        }
    }

    /// Poetry in its own pipx environment, linked into `~/.local/bin`
    pub fn poetry(home: &Path) -> Self {
        Self {
            label: "poetry",
            executable: home.join(".local").join("bin").join("poetry"),
            installer: Installer::Pipx {
                package: "poetry".to_string(),
            },
        }
    }

    fn install_command(&self) -> CommandSpec {
        match &self.installer {
            Installer::Script { url, args } => CommandSpec::new("bash").args([
                "-c".to_string(),
                // A failed download must fail the pipeline, not feed bash nothing
                format!(
                    "set -o pipefail; curl -fsSL {url} | bash -s -- {}",
                    args.join(" ")
                ),
            ]),
            Installer::Pipx { package } => {
                CommandSpec::new("pipx").args(["install", package.as_str()])
            }
        }
    }
}

impl Step for UserTool {
    fn name(&self) -> &str {
        self.label
    }

    fn description(&self) -> String {
        format!("Install {} at {}", self.label, self.executable.display())
    }

    fn is_satisfied(&self, ctx: &StepContext) -> bool {
        ctx.check(
            CommandSpec::new("test")
                .arg("-x")
                .arg(self.executable.to_string_lossy()),
        )
    }

    fn apply(&self, ctx: &StepContext) -> Result<()> {
        ctx.exec(self.install_command())
            .with_context(|| format!("Failed to install {}", self.label))?;
        Ok(())
    }
}
