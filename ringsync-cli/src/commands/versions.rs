//! `ringsync versions`: list the generations in a client's ring.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Local, Utc};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use ringsync_core::ClientId;
use ringsync_ring::{SlotInfo, VersionRing};

/// Arguments for `ringsync versions`.
#[derive(Args, Debug)]
pub struct VersionsArgs {
    /// Directory holding the version ring.
    #[arg(short = 'd', long)]
    pub dest: PathBuf,

    /// Client whose generations to list.
    #[arg(short = 'c', long)]
    pub client: String,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct SlotJson {
    slot: u32,
    path: String,
    modified: DateTime<Utc>,
    age: String,
}

#[derive(Tabled)]
struct SlotRow {
    #[tabled(rename = "slot")]
    slot: u32,
    #[tabled(rename = "modified")]
    modified: String,
    #[tabled(rename = "age")]
    age: String,
    #[tabled(rename = "path")]
    path: String,
}

impl VersionsArgs {
    pub fn run(self) -> Result<()> {
        if !self.dest.is_dir() {
            bail!("destination directory {} not found", self.dest.display());
        }
        let client = ClientId::parse(&self.client)?;
        let ring = VersionRing::new(&self.dest, client);
        let slots = ring
            .slots()
            .with_context(|| format!("failed to scan {}", self.dest.display()))?;

        if self.json {
            let payload: Vec<SlotJson> = slots
                .iter()
                .map(|s| SlotJson {
                    slot: s.index,
                    path: s.path.display().to_string(),
                    modified: DateTime::<Utc>::from(s.modified),
                    age: format_age(s),
                })
                .collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("failed to serialize versions JSON")?
            );
            return Ok(());
        }

        println!(
            "{} in {}",
            ring.client().as_str().bold(),
            self.dest.display()
        );
        if slots.is_empty() {
            println!("No backups yet.");
            return Ok(());
        }

        let rows: Vec<SlotRow> = slots
            .iter()
            .map(|s| SlotRow {
                slot: s.index,
                modified: DateTime::<Local>::from(s.modified)
                    .format("%Y-%m-%d %H:%M")
                    .to_string(),
                age: format_age(s),
                path: s.path.display().to_string(),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        Ok(())
    }
}

fn format_age(slot: &SlotInfo) -> String {
    let seconds = std::time::SystemTime::now()
        .duration_since(slot.modified)
        .unwrap_or_default()
        .as_secs();
    format_seconds(seconds)
}

fn format_seconds(seconds: u64) -> String {
    if seconds < 60 {
        return format!("{seconds}s");
    }
    if seconds < 60 * 60 {
        return format!("{}m", seconds / 60);
    }
    if seconds < 60 * 60 * 24 {
        return format!("{}h", seconds / (60 * 60));
    }
    format!("{}d", seconds / (60 * 60 * 24))
}
