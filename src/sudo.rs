//! Privilege detection
//!
//! The elevation strategy is decided once per process: root runs commands
//! directly, anyone else goes through `sudo`. When `sudo` is needed its
//! credentials are validated up front so the password prompt appears before
//! any step output, and the cached timestamp is dropped when the run ends.

use anyhow::{Context, Result, bail};
use converge::Elevation;
use std::process::Command;

/// Whether the effective user is root
pub fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}

/// The strategy for this process
pub fn detect() -> Elevation {
    Elevation::for_principal(is_root())
}

/// Scoped sudo session - invalidates cached credentials on drop
pub struct SudoSession {
    active: bool,
}

impl SudoSession {
    /// Validate sudo credentials if the strategy needs them
    pub fn acquire(elevation: Elevation, reason: &str) -> Result<Self> {
        if elevation == Elevation::Direct {
            return Ok(Self { active: false });
        }

        if !Self::is_valid() {
            eprintln!();
            eprintln!("  Sudo required: {reason}");
            eprintln!();
        }

        let status = Command::new("sudo")
            .args(["-v"])
            .status()
            .context("Failed to execute sudo")?;

        if !status.success() {
            bail!("Failed to acquire sudo privileges");
        }

        Ok(Self { active: true })
    }

    /// Check if sudo is currently valid (without prompting)
    pub fn is_valid() -> bool {
        Command::new("sudo")
            .args(["-n", "true"])
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }
}

impl Drop for SudoSession {
    fn drop(&mut self) {
        if self.active {
            let _ = Command::new("sudo").args(["-k"]).status();
        }
    }
}
