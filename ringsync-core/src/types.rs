//! Domain types shared by every ringsync crate.
//!
//! All path fields use `PathBuf`; remote paths stay `String` because they are
//! interpreted by the client host, never by the local filesystem.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// A validated client host name, FQDN or IP literal.
///
/// The same value is used as the ssh destination and as the per-client
/// directory name inside every ring slot, so it must be a single safe path
/// component that ssh cannot mistake for an option.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClientId(String);

impl ClientId {
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        let invalid = |reason: &'static str| CoreError::InvalidClientId {
            value: value.to_owned(),
            reason,
        };
        if value.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if value.starts_with('-') {
            return Err(invalid("must not start with '-'"));
        }
        if value == "." || value == ".." {
            return Err(invalid("must not be a relative path component"));
        }
        if value.contains('/') || value.contains('\0') {
            return Err(invalid("must not contain path separators"));
        }
        if value.chars().any(char::is_whitespace) {
            return Err(invalid("must not contain whitespace"));
        }
        Ok(Self(value.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for ClientId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ClientId {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ClientId> for String {
    fn from(id: ClientId) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// Retention
// ---------------------------------------------------------------------------

/// How many generations of a client are kept on disk. Always at least one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RetentionPolicy {
    versions_to_keep: u32,
}

impl RetentionPolicy {
    pub fn new(versions_to_keep: u32) -> Result<Self, CoreError> {
        if versions_to_keep == 0 {
            return Err(CoreError::InvalidRetention {
                value: versions_to_keep,
            });
        }
        Ok(Self { versions_to_keep })
    }

    pub fn versions_to_keep(&self) -> u32 {
        self.versions_to_keep
    }

    /// Index of the oldest retained slot.
    pub fn oldest_slot(&self) -> u32 {
        self.versions_to_keep - 1
    }
}

// ---------------------------------------------------------------------------
// Client configuration
// ---------------------------------------------------------------------------

/// What to back up for one client, as declared in its remote config file.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ClientConfig {
    /// Remote roots, in declaration order. `ALL-LOCAL` is already `/`.
    pub domains: Vec<String>,
    /// Relative paths handed to rsync as `--exclude` patterns.
    pub exclude_dirs: BTreeSet<String>,
    /// Scheduler log on the client; `None` disables client-log reporting.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_log_path: Option<String>,
}

// ---------------------------------------------------------------------------
// Client list
// ---------------------------------------------------------------------------

/// One `FQDN DESTDIR CONFIGPATH` line of a client list file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientEntry {
    pub client: ClientId,
    /// Ring root for this client.
    pub dest_dir: PathBuf,
    /// Path of the scheduler config file on the client.
    pub config_path: String,
}

// ---------------------------------------------------------------------------
// Run outcome
// ---------------------------------------------------------------------------

/// Final classification of a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Succeeded,
    Failed,
}

impl RunStatus {
    /// Wording used in the `Scheduled event` trailer of the client log.
    pub fn event_phrase(&self) -> &'static str {
        match self {
            RunStatus::Succeeded => "completed successfully",
            RunStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Succeeded => write!(f, "succeeded"),
            RunStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Result of one transfer, consumed by the reporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub status: RunStatus,
    /// Everything the transfer tool printed, stats included.
    pub raw_stats: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl RunOutcome {
    pub fn succeeded(raw_stats: String) -> Self {
        Self {
            status: RunStatus::Succeeded,
            raw_stats,
            error_detail: None,
            finished_at: Utc::now(),
        }
    }

    pub fn failed(raw_stats: String, error_detail: String) -> Self {
        Self {
            status: RunStatus::Failed,
            raw_stats,
            error_detail: Some(error_detail),
            finished_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
