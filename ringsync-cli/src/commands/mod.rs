pub mod backup;
pub mod config;
pub mod versions;

use std::path::PathBuf;

use anyhow::{Context, Result};

use ringsync_core::{settings, Settings};
use ringsync_remote::SshTransport;

/// Settings from `--settings`, or `~/.ringsync/settings.yaml`.
pub(crate) fn load_settings(path: Option<&PathBuf>) -> Result<Settings> {
    match path {
        Some(path) => settings::load_from(path)
            .with_context(|| format!("failed to load settings from {}", path.display())),
        None => settings::load().context("failed to load ~/.ringsync/settings.yaml"),
    }
}

pub(crate) fn transport(settings: &Settings) -> SshTransport {
    SshTransport::new(&settings.ssh, settings.ssh_options.clone())
}
