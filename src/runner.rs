use converge::{CommandError, CommandOutput, CommandRunner, CommandSpec, OutputMode};
use std::io::Write;
use std::process::{Command, Stdio};

use crate::config;

/// Variables never passed on to child processes
pub const SCRUBBED_ENV: &[&str] = &[config::DB_PASS];

/// Runs commands on the local machine
pub struct SystemRunner;

impl SystemRunner {
    fn command(spec: &CommandSpec, mode: OutputMode) -> Command {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args);
        for key in SCRUBBED_ENV {
            cmd.env_remove(key);
        }
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        cmd.stdin(if spec.stdin.is_some() {
            Stdio::piped()
        } else if mode == OutputMode::Capture {
            Stdio::null()
        } else {
            Stdio::inherit()
        });

        match mode {
            OutputMode::Capture => {
                cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
            }
            OutputMode::Inherit => {
                cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            }
        }
        cmd
    }
}

impl CommandRunner for SystemRunner {
    fn run(&self, spec: &CommandSpec, mode: OutputMode) -> Result<CommandOutput, CommandError> {
        let mut child = Self::command(spec, mode)
            .spawn()
            .map_err(|source| CommandError::Spawn {
                command: spec.to_string(),
                source,
            })?;

        // Dropping the pipe closes it so the child sees EOF.
        let written = match (&spec.stdin, child.stdin.take()) {
            (Some(input), Some(mut pipe)) => pipe.write_all(input.as_bytes()),
            _ => Ok(()),
        };

        let output = child.wait_with_output().map_err(|source| CommandError::Wait {
            command: spec.to_string(),
            source,
        })?;

        // A child that exits early closes its stdin; its exit status is the
        // real outcome then.
        match written {
            Err(source) if output.status.success() => Err(CommandError::Stdin {
                command: spec.to_string(),
                source,
            }),
            _ => Ok(output.into()),
        }
    }
}

/// Check if a command exists on PATH
pub fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
