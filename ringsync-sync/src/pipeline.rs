//! Per-client pipeline: resolve → rotate → sync → report.
//!
//! A client whose configuration cannot be resolved, or whose ring cannot be
//! rotated, is aborted before any data moves; the next client still runs.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use ringsync_core::{ClientConfig, ClientEntry, ClientId, RetentionPolicy, RunOutcome};
use ringsync_remote::{notify_failure, resolve, Executor, Notifier, RemoteShell, SshTransport};
use ringsync_ring::VersionRing;

use crate::error::{destination_err, RunError, SyncError};
use crate::report::{map_stats, LogDestination, Reporter};
use crate::runner::SyncRunner;

/// Everything a run needs besides the client list itself.
pub struct RunContext<'a> {
    pub executor: &'a dyn Executor,
    pub transport: SshTransport,
    pub rsync: PathBuf,
    pub policy: RetentionPolicy,
    pub schedule_id: String,
    pub destinations: Vec<LogDestination>,
    pub notifier: Option<&'a dyn Notifier>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientRunStatus {
    /// Transfer completed.
    Succeeded,
    /// Transfer ran and failed.
    Failed,
    /// Stopped before the transfer (destination, config or rotation).
    Aborted,
}

/// Result of one client's run, as shown to the operator.
#[derive(Debug, Clone, Serialize)]
pub struct ClientRunReport {
    pub client: ClientId,
    pub destination: PathBuf,
    pub status: ClientRunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Mapped transfer statistics.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stats: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub logs_written: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub log_errors: Vec<String>,
    pub finished_at: DateTime<Utc>,
}

impl ClientRunReport {
    pub fn is_success(&self) -> bool {
        self.status == ClientRunStatus::Succeeded
    }

    fn aborted(entry: &ClientEntry, err: &RunError) -> Self {
        Self {
            client: entry.client.clone(),
            destination: entry.dest_dir.clone(),
            status: ClientRunStatus::Aborted,
            error: Some(err.to_string()),
            stats: Vec::new(),
            logs_written: Vec::new(),
            log_errors: Vec::new(),
            finished_at: Utc::now(),
        }
    }
}

/// Back up every entry, one after another.
pub fn run_all(ctx: &RunContext<'_>, entries: &[ClientEntry]) -> Vec<ClientRunReport> {
    entries.iter().map(|entry| run_client(ctx, entry)).collect()
}

/// Back up one client. Never fails: every problem ends up in the report and
/// in the operator notification.
pub fn run_client(ctx: &RunContext<'_>, entry: &ClientEntry) -> ClientRunReport {
    let client = &entry.client;
    tracing::info!(client = %client, dest = %entry.dest_dir.display(), "backup started");

    let shell = RemoteShell::new(ctx.executor, &ctx.transport, client);
    let (config, ring) = match prepare(ctx, &shell, entry) {
        Ok(prepared) => prepared,
        Err(err) => {
            notify_failure(ctx.notifier, &format!("Backup failed on {client}"), &err.to_string());
            return ClientRunReport::aborted(entry, &err);
        }
    };

    let runner = SyncRunner::new(ctx.executor, &ctx.rsync, &ctx.transport);
    let outcome = runner.sync(client, &config, &ring);
    let error = failure_detail(ctx, &runner, &config, &ring, client, &outcome);

    let reporter = Reporter::new(&shell, &ctx.schedule_id, ctx.notifier);
    let mut logs_written = Vec::new();
    let mut log_errors = Vec::new();
    for result in reporter.report(&config, &outcome, &ctx.destinations) {
        match result {
            Ok(path) => logs_written.push(path),
            Err(err) => log_errors.push(err.to_string()),
        }
    }

    let status = if outcome.is_success() {
        ClientRunStatus::Succeeded
    } else {
        ClientRunStatus::Failed
    };
    tracing::info!(client = %client, status = ?status, "backup finished");

    ClientRunReport {
        client: client.clone(),
        destination: entry.dest_dir.clone(),
        status,
        error,
        stats: map_stats(&outcome.raw_stats),
        logs_written,
        log_errors,
        finished_at: outcome.finished_at,
    }
}

fn prepare(
    ctx: &RunContext<'_>,
    shell: &RemoteShell<'_>,
    entry: &ClientEntry,
) -> Result<(ClientConfig, VersionRing), RunError> {
    check_destination(&entry.dest_dir)?;

    let config = resolve(shell, &entry.config_path)?;
    let ring = VersionRing::new(&entry.dest_dir, entry.client.clone());
    ring.rotate(ctx.policy)?;
    ring.prepare_slot_zero()?;
    Ok((config, ring))
}

fn check_destination(path: &Path) -> Result<(), RunError> {
    let meta = fs::metadata(path).map_err(|e| destination_err(path, e))?;
    if !meta.is_dir() {
        return Err(destination_err(path, std::io::Error::other("not a directory")));
    }
    Ok(())
}

/// Notify about a failed transfer and return its detail for the report.
fn failure_detail(
    ctx: &RunContext<'_>,
    runner: &SyncRunner<'_>,
    config: &ClientConfig,
    ring: &VersionRing,
    client: &ClientId,
    outcome: &RunOutcome,
) -> Option<String> {
    let detail = outcome.error_detail.clone()?;
    let err = SyncError {
        client: client.clone(),
        command: runner.build_command(client, config, ring).to_string(),
        detail,
    };
    notify_failure(ctx.notifier, &format!("Backup problem on {client}"), &err.to_string());
    Some(err.detail)
}
