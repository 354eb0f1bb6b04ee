//! `ringsync backup`: rotate, transfer and report for one or more clients.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Args};
use colored::Colorize;

use ringsync_core::{load_client_list, ClientEntry, ClientId};
use ringsync_remote::{Notifier, ProcessExecutor, SendmailNotifier};
use ringsync_sync::{run_all, ClientRunReport, ClientRunStatus, LogDestination, RunContext};

use super::{load_settings, transport};

/// Arguments for `ringsync backup`.
#[derive(Args, Debug)]
#[command(group(ArgGroup::new("target").required(true).args(["client", "client_file"])))]
pub struct BackupArgs {
    /// FQDN or IP of the client to back up.
    #[arg(short = 'c', long, requires_all = ["config_path", "dest"])]
    pub client: Option<String>,

    /// Path of the scheduler option file (dsm.sys) on the client.
    #[arg(short = 'C', long)]
    pub config_path: Option<String>,

    /// Directory holding the version ring.
    #[arg(short = 'd', long)]
    pub dest: Option<PathBuf>,

    /// File with one `FQDN DESTDIR CONFIGPATH` line per client.
    #[arg(short = 'f', long, conflicts_with_all = ["client", "config_path", "dest"])]
    pub client_file: Option<PathBuf>,

    /// Append a SCHEDULEREC record to the client's SCHEDLOGNAME file.
    #[arg(short = 'l', long)]
    pub log: bool,

    /// Append the record to this file on the client.
    #[arg(short = 'L', long)]
    pub log_file: Option<String>,

    /// Mail failures to this address.
    #[arg(short = 'm', long)]
    pub mail: Option<String>,

    /// Generations to keep, overriding the settings file.
    #[arg(long)]
    pub versions: Option<u32>,

    /// Settings file to use instead of ~/.ringsync/settings.yaml.
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl BackupArgs {
    pub fn run(self) -> Result<()> {
        let settings = load_settings(self.settings.as_ref())?;
        let policy = settings
            .retention(self.versions)
            .context("invalid retention")?;
        let entries = self.entries()?;

        let executor = ProcessExecutor;
        let mail_to = self.mail.clone().or_else(|| settings.mail_to.clone());
        let mailer = mail_to.map(|to| {
            SendmailNotifier::new(&executor, &settings.sendmail, settings.mail_from.clone(), to)
        });

        let ctx = RunContext {
            executor: &executor,
            transport: transport(&settings),
            rsync: settings.rsync.clone(),
            policy,
            schedule_id: settings.schedule_id.clone(),
            destinations: self.destinations(),
            notifier: mailer.as_ref().map(|m| m as &dyn Notifier),
        };

        if let Some(mailer) = &mailer {
            tracing::info!(to = mailer.recipient(), "failures will be mailed");
        }
        let reports = run_all(&ctx, &entries);
        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&reports).context("failed to serialize backup JSON")?
            );
        } else {
            print_reports(&reports);
        }

        let failed = reports.iter().filter(|r| !r.is_success()).count();
        if failed > 0 {
            bail!("{failed} of {} client(s) did not complete", reports.len());
        }
        Ok(())
    }

    fn entries(&self) -> Result<Vec<ClientEntry>> {
        if let Some(list_path) = &self.client_file {
            let list = load_client_list(list_path)
                .with_context(|| format!("failed to read client list {}", list_path.display()))?;
            for skipped in &list.skipped {
                tracing::warn!(
                    file = %list_path.display(),
                    line = skipped.line,
                    "skipping client list entry: {}",
                    skipped.reason
                );
            }
            return Ok(list.entries);
        }

        let (Some(client), Some(config_path), Some(dest)) =
            (&self.client, &self.config_path, &self.dest)
        else {
            bail!("provide --client with --config-path and --dest, or --client-file");
        };
        if !dest.is_dir() {
            bail!("destination directory {} not found", dest.display());
        }
        Ok(vec![ClientEntry {
            client: ClientId::parse(client)?,
            dest_dir: dest.clone(),
            config_path: config_path.clone(),
        }])
    }

    fn destinations(&self) -> Vec<LogDestination> {
        let mut destinations = Vec::new();
        if self.log {
            destinations.push(LogDestination::ClientLog);
        }
        if let Some(path) = &self.log_file {
            destinations.push(LogDestination::Path(path.clone()));
        }
        destinations
    }
}

fn print_reports(reports: &[ClientRunReport]) {
    if reports.is_empty() {
        println!("No clients to back up.");
        return;
    }

    for r in reports {
        let (mark, label) = match r.status {
            ClientRunStatus::Succeeded => ("✓".green().bold(), "completed".normal()),
            ClientRunStatus::Failed => ("✗".red().bold(), "failed".red()),
            ClientRunStatus::Aborted => ("✗".red().bold(), "aborted".red()),
        };
        println!(
            "{mark} {} {label} → {}",
            r.client,
            r.destination.join(format!("version-0/{}", r.client)).display()
        );
        if let Some(error) = &r.error {
            println!("    {error}");
        }
        for path in &r.logs_written {
            println!("    log  {path}");
        }
        for error in &r.log_errors {
            println!("    {} {error}", "log".yellow());
        }
    }

    let ok = reports.iter().filter(|r| r.is_success()).count();
    println!("{ok}/{} client(s) backed up", reports.len());
}
