//! Shell profile step - make user-level tools reachable on PATH

use anyhow::{Context, Result};
use converge::{Step, StepContext};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Export line added to the profile
pub const PATH_EXPORT: &str = r#"export PATH="$HOME/bin:$HOME/.local/bin:$PATH""#;

#[derive(Debug, Clone)]
pub struct ShellProfile {
    pub path: PathBuf,
    pub line: String,
}

impl ShellProfile {
    /// `~/.bashrc` with the PATH export
    pub fn bashrc(home: &Path) -> Self {
        Self {
            path: home.join(".bashrc"),
            line: PATH_EXPORT.to_string(),
        }
    }

    /// Raw profile bytes; a missing file reads as empty
    ///
    /// Profiles are not required to be UTF-8, so lines are compared as bytes.
    fn contents(&self) -> io::Result<Vec<u8>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    fn has_line(&self, contents: &[u8]) -> bool {
        let wanted = self.line.as_bytes();
        contents
            .split(|&b| b == b'\n')
            .any(|line| line.trim_ascii() == wanted)
    }
}

impl Step for ShellProfile {
    fn name(&self) -> &str {
        "shell-profile"
    }

    fn description(&self) -> String {
        format!("Add user tool directories to PATH in {}", self.path.display())
    }

    fn is_satisfied(&self, _ctx: &StepContext) -> bool {
        match self.contents() {
            Ok(contents) => self.has_line(&contents),
            Err(e) => {
                log::debug!("could not read {}: {e}", self.path.display());
                false
            }
        }
    }

    fn apply(&self, _ctx: &StepContext) -> Result<()> {
        let contents = self
            .contents()
            .with_context(|| format!("Could not read {}", self.path.display()))?;
        if self.has_line(&contents) {
            return Ok(());
        }
        let needs_newline = contents.last().is_some_and(|&b| b != b'\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Could not open {}", self.path.display()))?;

        if needs_newline {
            writeln!(file)?;
        }
        writeln!(file, "{}", self.line)
            .with_context(|| format!("Could not write {}", self.path.display()))?;
        Ok(())
    }
}
