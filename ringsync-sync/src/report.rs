//! SCHEDULEREC records appended to the client's scheduler log.
//!
//! ```text
//! 10/18/26   02:00:04 Command will be executed in 0 minutes
//! 10/18/26   02:00:04 --- SCHEDULEREC OBJECT BEGIN RINGSYNC-01
//! 10/18/26   02:00:04 --- SCHEDULEREC STATUS BEGIN
//! 10/18/26   02:00:04 Total number of objects inspected:       12,345 (reg: 11,000, dir: 1,345)
//! …
//! 10/18/26   02:00:04 Total number of objects failed:          0
//! 10/18/26   02:00:04 --- SCHEDULEREC STATUS END
//! 10/18/26   02:00:04 --- SCHEDULEREC OBJECT END
//! 10/18/26   02:00:04 --- Scheduled event RINGSYNC-01 completed successfully
//! ```

use chrono::Local;

use ringsync_core::{ClientConfig, RunOutcome, RunStatus};
use ringsync_remote::{notify_failure, Notifier, RemoteShell};

use crate::error::LogWriteError;

/// rsync `--stats` prefixes and the scheduler labels they are reported under,
/// in output order.
pub static STAT_LABELS: &[(&str, &str)] = &[
    ("Number of files:", "Total number of objects inspected:"),
    ("Number of regular files transferred:", "Total number of objects backed up:"),
    ("Number of deleted files:", "Total number of objects deleted:"),
    ("Total file size:", "Total number of bytes inspected:"),
    ("Total bytes sent:", "Total number of bytes transferred:"),
    ("File list transfer time:", "Data transfer time:"),
];

pub const FAILED_LABEL: &str = "Total number of objects failed:";

pub const LABEL_WIDTH: usize = 40;

const RSYNC_ERROR_PREFIX: &str = "rsync error:";

/// Where a record goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDestination {
    /// The file named by the client's `SCHEDLOGNAME`.
    ClientLog,
    /// An operator-chosen path on the client.
    Path(String),
}

/// Remote path written to, or why nothing was.
pub type LogWriteResult = Result<String, LogWriteError>;

/// Translate rsync statistics into labelled lines, failed count last.
pub fn map_stats(raw_stats: &str) -> Vec<String> {
    let mut buckets: Vec<Vec<String>> = vec![Vec::new(); STAT_LABELS.len()];
    let mut failed = "0";

    for line in raw_stats.lines() {
        if line.starts_with(RSYNC_ERROR_PREFIX) {
            failed = ">0";
            continue;
        }
        let hit = STAT_LABELS.iter().enumerate().find_map(|(i, (prefix, label))| {
            line.strip_prefix(prefix).map(|rest| (i, label, rest))
        });
        if let Some((i, label, rest)) = hit {
            buckets[i].push(labelled(label, rest.trim()));
        }
    }

    let mut lines: Vec<String> = buckets.into_iter().flatten().collect();
    lines.push(labelled(FAILED_LABEL, failed));
    lines
}

fn labelled(label: &str, value: &str) -> String {
    format!("{label:<LABEL_WIDTH$} {value}")
}

/// The full record, one entry per line, each prefixed with
/// `"{client_date}   {local_time} "`.
pub fn format_record(
    schedule_id: &str,
    status: RunStatus,
    raw_stats: &str,
    client_date: &str,
    local_time: &str,
) -> Vec<String> {
    let prefix = format!("{client_date}   {local_time} ");

    let mut body = vec![
        "Command will be executed in 0 minutes".to_owned(),
        format!("--- SCHEDULEREC OBJECT BEGIN {schedule_id}"),
        "--- SCHEDULEREC STATUS BEGIN".to_owned(),
    ];
    body.extend(map_stats(raw_stats));
    body.push("--- SCHEDULEREC STATUS END".to_owned());
    body.push("--- SCHEDULEREC OBJECT END".to_owned());
    body.push(format!("--- Scheduled event {schedule_id} {}", status.event_phrase()));

    body.into_iter().map(|line| format!("{prefix}{line}")).collect()
}

/// Writes records to a client's remote logs.
pub struct Reporter<'a> {
    shell: &'a RemoteShell<'a>,
    schedule_id: &'a str,
    notifier: Option<&'a dyn Notifier>,
}

impl<'a> Reporter<'a> {
    pub fn new(
        shell: &'a RemoteShell<'a>,
        schedule_id: &'a str,
        notifier: Option<&'a dyn Notifier>,
    ) -> Self {
        Self {
            shell,
            schedule_id,
            notifier,
        }
    }

    /// Append the outcome's record to every destination, in order. Failures
    /// are reported (log + mail) and returned, never raised.
    pub fn report(
        &self,
        config: &ClientConfig,
        outcome: &RunOutcome,
        destinations: &[LogDestination],
    ) -> Vec<LogWriteResult> {
        if destinations.is_empty() {
            return Vec::new();
        }

        let record = self.render(outcome);
        destinations
            .iter()
            .map(|destination| {
                let result = self.write(config, destination, &record);
                if let Err(err) = &result {
                    notify_failure(
                        self.notifier,
                        &format!("Could not write backup logfile on {}", self.shell.client()),
                        &err.to_string(),
                    );
                }
                result
            })
            .collect()
    }

    fn render(&self, outcome: &RunOutcome) -> String {
        let client_date = match self.shell.local_date() {
            Ok(date) => date,
            Err(err) => {
                tracing::warn!(
                    client = %self.shell.client(),
                    error = %err,
                    "could not read the client's date format, writing record without date"
                );
                String::new()
            }
        };
        let local_time = Local::now().format("%X").to_string();

        let mut record = format_record(
            self.schedule_id,
            outcome.status,
            &outcome.raw_stats,
            &client_date,
            &local_time,
        )
        .join("\n");
        record.push('\n');
        record
    }

    fn write(
        &self,
        config: &ClientConfig,
        destination: &LogDestination,
        record: &str,
    ) -> LogWriteResult {
        let client = self.shell.client();
        let path = match destination {
            LogDestination::ClientLog => config
                .remote_log_path
                .clone()
                .ok_or_else(|| LogWriteError::NoLogPath { client: client.clone() })?,
            LogDestination::Path(path) => path.clone(),
        };

        self.shell.require_file(&path).map_err(|source| LogWriteError::Missing {
            client: client.clone(),
            path: path.clone(),
            source,
        })?;
        self.shell.append(&path, record).map_err(|source| LogWriteError::Append {
            client: client.clone(),
            path: path.clone(),
            source,
        })?;

        tracing::info!(client = %client, path = %path, "wrote schedule record");
        Ok(path)
    }
}
