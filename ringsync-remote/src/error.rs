//! Error types for ringsync-remote.

use thiserror::Error;

use ringsync_core::ClientId;

/// A remote command over ssh exited non-zero (or ssh itself failed).
#[derive(Debug, Clone, Error)]
#[error("`{command}` on {client} failed with exit code {exit_code}: {detail}")]
pub struct TransportError {
    pub client: ClientId,
    /// Remote command line, before quoting.
    pub command: String,
    pub exit_code: i32,
    /// Trimmed stderr (or stdout when stderr was empty).
    pub detail: String,
}

/// The client's option file could not be fetched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {path} not found on {client}: {source}")]
    NotFound {
        client: ClientId,
        path: String,
        #[source]
        source: TransportError,
    },

    #[error("could not read config file {path} on {client}: {source}")]
    Unreadable {
        client: ClientId,
        path: String,
        #[source]
        source: TransportError,
    },
}

/// A notification could not be delivered. Callers log and drop it.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("sendmail failed with exit code {exit_code}: {detail}")]
    Sendmail { exit_code: i32, detail: String },
}
