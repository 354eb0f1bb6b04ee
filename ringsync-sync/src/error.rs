//! Error types for ringsync-sync.

use std::path::PathBuf;

use thiserror::Error;

use ringsync_core::ClientId;
use ringsync_remote::{ConfigError, TransportError};
use ringsync_ring::RotationError;

/// Anything that stops a client's run before the transfer starts.
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("version rotation failed: {0}")]
    Rotation(#[from] RotationError),

    #[error("destination directory {path} is not usable: {source}")]
    Destination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// rsync exited non-zero.
#[derive(Debug, Clone, Error)]
#[error("command \"{command}\" failed for {client}: {detail}")]
pub struct SyncError {
    pub client: ClientId,
    pub command: String,
    pub detail: String,
}

/// A SCHEDULEREC record could not be appended to a remote log.
#[derive(Debug, Error)]
pub enum LogWriteError {
    #[error("no log file configured for {client} (SCHEDLOGNAME is missing)")]
    NoLogPath { client: ClientId },

    #[error("log file {path} not found on {client}: {source}")]
    Missing {
        client: ClientId,
        path: String,
        #[source]
        source: TransportError,
    },

    #[error("could not write to {path} on {client}: {source}")]
    Append {
        client: ClientId,
        path: String,
        #[source]
        source: TransportError,
    },
}

/// Convenience constructor for [`RunError::Destination`].
pub(crate) fn destination_err(path: impl Into<PathBuf>, source: std::io::Error) -> RunError {
    RunError::Destination {
        path: path.into(),
        source,
    }
}
