//! rsync invocation into slot 0 of a client's ring.

use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

use ringsync_core::{ClientConfig, ClientId, RunOutcome};
use ringsync_remote::{CommandSpec, Executor, SshTransport};
use ringsync_ring::{RotationStep, VersionRing};

use crate::error::SyncError;

/// Flags passed on every run: archive mode, hard links, one file system,
/// mirror deletions, numeric ownership and the statistics block the
/// reporter parses. `--protect-args` keeps the remote login shell from
/// word-splitting or globbing the domain paths.
pub const RSYNC_FLAGS: &[&str] = &[
    "-a",
    "-H",
    "-x",
    "--delete",
    "--numeric-ids",
    "--protect-args",
    "--stats",
];

/// Drives rsync through an [`Executor`].
pub struct SyncRunner<'a> {
    executor: &'a dyn Executor,
    rsync: PathBuf,
    transport: &'a SshTransport,
}

impl<'a> SyncRunner<'a> {
    pub fn new(
        executor: &'a dyn Executor,
        rsync: impl Into<PathBuf>,
        transport: &'a SshTransport,
    ) -> Self {
        Self {
            executor,
            rsync: rsync.into(),
            transport,
        }
    }

    /// `rsync <flags> [--rsh=…] [--link-dest=<slot 1>] client:domain… --exclude d… <slot 0>/`
    pub fn build_command(
        &self,
        client: &ClientId,
        config: &ClientConfig,
        ring: &VersionRing,
    ) -> CommandSpec {
        let mut cmd = CommandSpec::new(self.rsync.as_os_str()).args(RSYNC_FLAGS.iter().copied());

        if !self.transport.is_default() {
            cmd = cmd.arg(format!("--rsh={}", self.transport.rsync_rsh()));
        }
        if let Some(previous) = link_dest(ring) {
            let mut flag = OsString::from("--link-dest=");
            flag.push(previous.as_os_str());
            cmd = cmd.arg(flag);
        }

        cmd = cmd.args(config.domains.iter().map(|d| format!("{client}:{d}")));
        for dir in &config.exclude_dirs {
            cmd = cmd.arg("--exclude").arg(dir.as_str());
        }

        // Trailing slash: copy into slot 0, not into a subdirectory of it.
        let mut target = ring.slot_path(0).into_os_string();
        target.push("/");
        cmd.arg(target)
    }

    /// Run the transfer and classify it. Never fails: a broken transfer is a
    /// `Failed` outcome.
    pub fn sync(&self, client: &ClientId, config: &ClientConfig, ring: &VersionRing) -> RunOutcome {
        let command = self.build_command(client, config, ring);
        tracing::info!(client = %client, command = %command, "starting transfer");

        let output = self.executor.execute(&command);
        let raw_stats = format!("{}{}", output.stdout, output.stderr);

        if !output.success() {
            let err = SyncError {
                client: client.clone(),
                command: command.to_string(),
                detail: output.summary(),
            };
            tracing::warn!(
                client = %client,
                exit_code = output.exit_code,
                error = %err,
                "transfer failed"
            );
            return RunOutcome::failed(raw_stats, err.detail);
        }

        if let Err(err) = ring.mark_current() {
            tracing::warn!(client = %client, error = %err, "could not stamp slot 0");
        }
        tracing::info!(client = %client, "transfer completed");
        RunOutcome::succeeded(raw_stats)
    }
}

/// Absolute path of slot 1, when there is one to hard-link against.
fn link_dest(ring: &VersionRing) -> Option<PathBuf> {
    match ring.probe(1, RotationStep::Scan) {
        Ok(true) => {}
        Ok(false) => return None,
        Err(err) => {
            tracing::debug!(error = %err, "slot 1 not usable as link-dest");
            return None;
        }
    }
    // rsync resolves a relative --link-dest against the destination.
    let slot1 = ring.slot_path(1);
    match fs::canonicalize(&slot1) {
        Ok(path) => Some(path),
        Err(err) => {
            tracing::debug!(
                path = %slot1.display(),
                error = %err,
                "slot 1 not usable as link-dest"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use ringsync_core::RunStatus;
    use ringsync_remote::scripted::ScriptedExecutor;
    use ringsync_remote::ExecOutput;
    use tempfile::TempDir;

    use super::*;

    fn client() -> ClientId {
        ClientId::parse("server1.org").unwrap()
    }

    fn config() -> ClientConfig {
        ClientConfig {
            domains: vec!["/".into(), "/home".into()],
            exclude_dirs: BTreeSet::from(["proc".to_owned(), "var/tmp".to_owned()]),
            remote_log_path: None,
        }
    }

    fn is_rsync(c: &CommandSpec) -> bool {
        c.program_lossy().ends_with("rsync")
    }

    #[test]
    fn command_for_first_run_has_no_link_dest() {
        let tmp = TempDir::new().unwrap();
        let ring = VersionRing::new(tmp.path(), client());
        let executor = ScriptedExecutor::new();
        let transport = SshTransport::default();
        let runner = SyncRunner::new(&executor, "rsync", &transport);

        let cmd = runner.build_command(&client(), &config(), &ring);
        let slot0 = format!("{}/", ring.slot_path(0).display());
        assert_eq!(cmd.program_lossy(), "rsync");
        assert_eq!(
            cmd.args_lossy(),
            vec![
                "-a", "-H", "-x", "--delete", "--numeric-ids", "--protect-args", "--stats",
                "server1.org:/", "server1.org:/home",
                "--exclude", "proc", "--exclude", "var/tmp",
                slot0.as_str(),
            ]
        );
    }

    #[test]
    fn command_links_against_slot_one_and_custom_ssh() {
        let tmp = TempDir::new().unwrap();
        let ring = VersionRing::new(tmp.path(), client());
        fs::create_dir_all(ring.slot_path(1)).unwrap();
        let executor = ScriptedExecutor::new();
        let transport = SshTransport::new("ssh", vec!["-p".into(), "2222".into()]);
        let runner = SyncRunner::new(&executor, "/usr/bin/rsync", &transport);

        let args = runner.build_command(&client(), &config(), &ring).args_lossy();
        let slot1 = fs::canonicalize(ring.slot_path(1)).unwrap();
        assert_eq!(args[7], "--rsh=ssh -p 2222");
        assert_eq!(args[8], format!("--link-dest={}", slot1.display()));
    }

    #[test]
    fn failed_transfer_keeps_stderr_as_detail() {
        let tmp = TempDir::new().unwrap();
        let ring = VersionRing::new(tmp.path(), client());
        let executor = ScriptedExecutor::new().on(
            is_rsync,
            ExecOutput {
                stdout: "Number of files: 3\n".into(),
                stderr: "rsync: connection unexpectedly closed\n".into(),
                exit_code: 12,
            },
        );
        let transport = SshTransport::default();
        let runner = SyncRunner::new(&executor, "rsync", &transport);

        let outcome = runner.sync(&client(), &config(), &ring);
        assert_eq!(outcome.status, RunStatus::Failed);
        assert_eq!(outcome.error_detail.as_deref(), Some("rsync: connection unexpectedly closed"));
        assert!(outcome.raw_stats.starts_with("Number of files: 3\n"));
        assert!(outcome.raw_stats.ends_with("closed\n"));
    }

    #[test]
    fn partial_transfer_counts_as_failure() {
        let tmp = TempDir::new().unwrap();
        let ring = VersionRing::new(tmp.path(), client());
        let executor = ScriptedExecutor::new().on(
            is_rsync,
            ExecOutput::failed(24, "file has vanished: \"/tmp/x\""),
        );
        let transport = SshTransport::default();
        let runner = SyncRunner::new(&executor, "rsync", &transport);

        assert!(!runner.sync(&client(), &config(), &ring).is_success());
    }

    #[test]
    fn successful_transfer_is_classified_succeeded() {
        let tmp = TempDir::new().unwrap();
        let ring = VersionRing::new(tmp.path(), client());
        ring.prepare_slot_zero().unwrap();
        let executor =
            ScriptedExecutor::new().on(is_rsync, ExecOutput::ok("Number of files: 12\n"));
        let transport = SshTransport::default();
        let runner = SyncRunner::new(&executor, "rsync", &transport);

        let outcome = runner.sync(&client(), &config(), &ring);
        assert!(outcome.is_success());
        assert_eq!(outcome.raw_stats, "Number of files: 12\n");
        assert_eq!(executor.calls().len(), 1);
    }
}
