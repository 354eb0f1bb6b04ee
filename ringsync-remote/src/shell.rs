//! Remote commands over ssh.
//!
//! ssh joins everything after the destination into one string for the remote
//! login shell, so every remote argument is single-quoted before it leaves
//! this module. Host names are validated [`ClientId`]s and never start with
//! `-`, so they cannot be parsed as ssh options.

use std::ffi::OsString;
use std::path::PathBuf;

use ringsync_core::ClientId;

use crate::error::TransportError;
use crate::exec::{CommandSpec, ExecOutput, Executor};

/// Quote `s` for a POSIX shell.
pub fn sh_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Join already-split arguments into one remote command string.
pub fn remote_command_line(args: &[&str]) -> String {
    args.iter()
        .map(|a| sh_quote(a))
        .collect::<Vec<_>>()
        .join(" ")
}

/// How to reach clients: ssh program plus options placed before the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTransport {
    pub program: PathBuf,
    pub options: Vec<String>,
}

impl Default for SshTransport {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ssh"),
            options: Vec::new(),
        }
    }
}

impl SshTransport {
    pub fn new(program: impl Into<PathBuf>, options: Vec<String>) -> Self {
        Self {
            program: program.into(),
            options,
        }
    }

    /// `true` when rsync's built-in default (`ssh` with no options) is enough.
    pub fn is_default(&self) -> bool {
        *self == Self::default()
    }

    /// Remote-shell string for rsync's `--rsh`. rsync splits it on spaces,
    /// so the program and options are joined with single spaces.
    pub fn rsync_rsh(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.options.iter().cloned());
        parts.join(" ")
    }

    /// Build `ssh [options] <client> '<arg>' '<arg>' …`.
    pub fn command(&self, client: &ClientId, remote_args: &[&str]) -> CommandSpec {
        CommandSpec::new(self.program.as_os_str())
            .args(self.options.iter().map(OsString::from))
            .arg(client.as_str())
            .arg(remote_command_line(remote_args))
    }
}

/// A client reachable over ssh.
pub struct RemoteShell<'a> {
    executor: &'a dyn Executor,
    transport: &'a SshTransport,
    client: &'a ClientId,
}

impl<'a> RemoteShell<'a> {
    pub fn new(
        executor: &'a dyn Executor,
        transport: &'a SshTransport,
        client: &'a ClientId,
    ) -> Self {
        Self {
            executor,
            transport,
            client,
        }
    }

    pub fn client(&self) -> &ClientId {
        self.client
    }

    /// Run a remote command and return its raw output.
    pub fn run(&self, remote_args: &[&str]) -> ExecOutput {
        let command = self.transport.command(self.client, remote_args);
        self.executor.execute(&command)
    }

    /// Run a remote command, feeding `input` on stdin.
    pub fn run_with_input(&self, remote_args: &[&str], input: &str) -> ExecOutput {
        let command = self.transport.command(self.client, remote_args).stdin(input);
        self.executor.execute(&command)
    }

    /// Run a remote command, turning a non-zero exit into a [`TransportError`].
    pub fn checked(&self, remote_args: &[&str]) -> Result<String, TransportError> {
        let output = self.run(remote_args);
        self.check(remote_args, output)
    }

    /// `test -f <path>` on the client.
    pub fn require_file(&self, path: &str) -> Result<(), TransportError> {
        self.checked(&["test", "-f", path]).map(|_| ())
    }

    /// Contents of a remote file, verbatim.
    pub fn read_file(&self, path: &str) -> Result<String, TransportError> {
        self.checked(&["cat", path])
    }

    /// The client's own rendering of today's date (`date +%x`).
    pub fn local_date(&self) -> Result<String, TransportError> {
        self.checked(&["date", "+%x"]).map(|out| out.trim().to_owned())
    }

    /// Append `data` to a remote file.
    ///
    /// The redirection must be interpreted by the remote shell, so the
    /// command is `sh -c 'cat >> "$1"' sh <path>` with the path passed as a
    /// positional argument rather than spliced into the script.
    pub fn append(&self, path: &str, data: &str) -> Result<(), TransportError> {
        let args = ["sh", "-c", "cat >> \"$1\"", "sh", path];
        let output = self.run_with_input(&args, data);
        self.check(&args, output).map(|_| ())
    }

    fn check(&self, remote_args: &[&str], output: ExecOutput) -> Result<String, TransportError> {
        if output.success() {
            return Ok(output.stdout);
        }
        Err(TransportError {
            client: self.client.clone(),
            command: remote_args.join(" "),
            exit_code: output.exit_code,
            detail: output.summary(),
        })
    }
}
