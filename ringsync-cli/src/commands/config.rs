//! `ringsync config`: show what a client's option file resolves to.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use ringsync_core::ClientId;
use ringsync_remote::{resolve, ProcessExecutor, RemoteShell};

use super::{load_settings, transport};

/// Arguments for `ringsync config`.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// FQDN or IP of the client.
    #[arg(short = 'c', long)]
    pub client: String,

    /// Path of the scheduler option file (dsm.sys) on the client.
    #[arg(short = 'C', long)]
    pub config_path: String,

    /// Settings file to use instead of ~/.ringsync/settings.yaml.
    #[arg(long)]
    pub settings: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl ConfigArgs {
    pub fn run(self) -> Result<()> {
        let settings = load_settings(self.settings.as_ref())?;
        let client = ClientId::parse(&self.client)?;
        let transport = transport(&settings);
        let executor = ProcessExecutor;
        let shell = RemoteShell::new(&executor, &transport, &client);

        let config = resolve(&shell, &self.config_path)
            .with_context(|| format!("failed to resolve configuration of {client}"))?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&config).context("failed to serialize config JSON")?
            );
            return Ok(());
        }

        println!("{} ({})", client.as_str().bold(), self.config_path);
        for domain in &config.domains {
            println!("  domain   {domain}");
        }
        for dir in &config.exclude_dirs {
            println!("  exclude  {dir}");
        }
        match &config.remote_log_path {
            Some(path) => println!("  log      {path}"),
            None => println!("  log      {}", "(none)".bright_black()),
        }
        Ok(())
    }
}
