//! ringsync: versioned rsync backups of remote hosts.
//!
//! # Usage
//!
//! ```text
//! ringsync backup --client <fqdn> --config-path <dsm.sys> --dest <dir> [options]
//! ringsync backup --client-file <file> [options]
//!     options: --log  --log-file <path>  --mail <addr>  --versions <n>
//! ringsync versions --dest <dir> --client <fqdn> [--json]
//! ringsync config --client <fqdn> --config-path <dsm.sys> [--json]
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{backup::BackupArgs, config::ConfigArgs, versions::VersionsArgs};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "ringsync",
    version,
    about = "Versioned rsync backups of remote hosts into a hardlinked ring",
    long_about = None,
)]
struct Cli {
    /// Log debug output to stderr (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rotate the version ring and back up one client or a client list.
    Backup(BackupArgs),

    /// List a client's backup generations with their age.
    Versions(VersionsArgs),

    /// Fetch and show a client's backup configuration.
    Config(ConfigArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Backup(args) => args.run(),
        Commands::Versions(args) => args.run(),
        Commands::Config(args) => args.run(),
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
