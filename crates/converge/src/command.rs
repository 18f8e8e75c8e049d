//! External command description, output, and the runner seam
//!
//! Steps never spawn processes themselves. They describe a command with
//! [`CommandSpec`] and hand it to a [`CommandRunner`], which lets tests
//! substitute a scripted host for the real machine.

use std::fmt;
use std::process::Output;
use thiserror::Error;

/// Errors produced while running an external command
#[derive(Debug, Error)]
pub enum CommandError {
    /// The process could not be started at all
    #[error("failed to execute `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// Input could not be delivered to a process that then exited successfully
    #[error("could not write stdin of `{command}`: {source}")]
    Stdin {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The process was started but could not be waited on
    #[error("lost track of `{command}`: {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran and exited unsuccessfully
    #[error("`{command}` exited with {}", describe_code(.code))]
    Failed { command: String, code: Option<i32> },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(c) => format!("status {c}"),
        None => "a signal".to_string(),
    }
}

/// How a runner treats the child's stdout/stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Collect output for inspection (checks and queries)
    Capture,
    /// Stream output to the operator's terminal (long-running actions)
    Inherit,
}

/// A command to run on the target host
#[derive(Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    /// Data written to the child's stdin. This is the only channel for
    /// secrets, so it is never logged or displayed.
    pub stdin: Option<String>,
}

impl CommandSpec {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: Vec::new(),
            env: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Whether any argument equals or contains `needle`
    pub fn mentions(&self, needle: &str) -> bool {
        self.program.contains(needle) || self.args.iter().any(|a| a.contains(needle))
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (key, value) in &self.env {
            write!(f, "{key}={value} ")?;
        }
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("env", &self.env)
            .field("stdin", &self.stdin.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Output from a finished command
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub success: bool,
    pub code: Option<i32>,
}

impl From<Output> for CommandOutput {
    fn from(output: Output) -> Self {
        Self {
            stdout: output.stdout,
            stderr: output.stderr,
            success: output.status.success(),
            code: output.status.code(),
        }
    }
}

impl CommandOutput {
    /// A successful output with the given stdout
    pub fn ok(stdout: &str) -> Self {
        Self {
            stdout: stdout.as_bytes().to_vec(),
            stderr: Vec::new(),
            success: true,
            code: Some(0),
        }
    }

    /// A failed output with the given exit code
    pub fn failed(code: i32) -> Self {
        Self {
            stdout: Vec::new(),
            stderr: Vec::new(),
            success: false,
            code: Some(code),
        }
    }

    /// Get stdout as a string
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Get stderr as a string
    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }
}

/// Runs commands against the target host
///
/// Returning `Ok` with `success == false` is normal for a non-zero exit;
/// `Err` is reserved for commands that could not be started.
pub trait CommandRunner {
    fn run(&self, spec: &CommandSpec, mode: OutputMode) -> Result<CommandOutput, CommandError>;
}
