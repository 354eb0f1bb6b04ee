//! External command execution.
//!
//! Commands are argument vectors handed straight to [`std::process::Command`];
//! no local shell ever sees them. Callers inspect [`ExecOutput::exit_code`];
//! the executor itself never fails.

use std::ffi::OsString;
use std::fmt;
use std::io::Write;
use std::process::{Command, ExitStatus, Stdio};

/// Exit code reported when the process could not be started at all.
pub const SPAWN_FAILED: i32 = -1;

/// A structured command line, optionally fed data on stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: OsString,
    pub args: Vec<OsString>,
    pub stdin: Option<Vec<u8>>,
}

impl CommandSpec {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            stdin: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn stdin(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(data.into());
        self
    }

    /// Program path as text, for logs and test matching.
    pub fn program_lossy(&self) -> String {
        self.program.to_string_lossy().into_owned()
    }

    /// Arguments as text, for logs and test matching.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.to_string_lossy())?;
        for arg in &self.args {
            write!(f, " {}", arg.to_string_lossy())?;
        }
        Ok(())
    }
}

/// Captured result of one command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

impl ExecOutput {
    /// A successful run that printed `stdout`.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: String::new(),
            exit_code: 0,
        }
    }

    /// A failed run with the given exit code and stderr.
    pub fn failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            stdout: String::new(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// The most useful one-line explanation of a failure.
    pub fn summary(&self) -> String {
        let stderr = self.stderr.trim();
        if !stderr.is_empty() {
            return stderr.to_owned();
        }
        let stdout = self.stdout.trim();
        if !stdout.is_empty() {
            return stdout.to_owned();
        }
        format!("exit status {}", self.exit_code)
    }
}

/// Runs commands. A trait so callers can be exercised without real processes.
pub trait Executor {
    fn execute(&self, command: &CommandSpec) -> ExecOutput;
}

/// Executor backed by real child processes. Blocks until the child exits.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessExecutor;

impl Executor for ProcessExecutor {
    fn execute(&self, command: &CommandSpec) -> ExecOutput {
        tracing::debug!(command = %command, "executing");
        match spawn_and_wait(command) {
            Ok(output) => output,
            Err(err) => {
                tracing::debug!(program = %command.program_lossy(), error = %err, "spawn failed");
                ExecOutput {
                    stdout: String::new(),
                    stderr: format!("failed to run {}: {err}", command.program_lossy()),
                    exit_code: SPAWN_FAILED,
                }
            }
        }
    }
}

fn spawn_and_wait(command: &CommandSpec) -> std::io::Result<ExecOutput> {
    let mut child = Command::new(&command.program)
        .args(&command.args)
        .stdin(if command.stdin.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    if let (Some(data), Some(mut pipe)) = (command.stdin.as_deref(), child.stdin.take()) {
        // A child that exits without reading its input surfaces through its
        // exit status; a broken pipe here is not the interesting error.
        if let Err(err) = pipe.write_all(data) {
            if err.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(err);
            }
        }
    }

    let output = child.wait_with_output()?;
    Ok(ExecOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: exit_code(output.status),
    })
}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|sig| 128 + sig))
        .unwrap_or(SPAWN_FAILED)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(SPAWN_FAILED)
}
