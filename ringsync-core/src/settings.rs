//! Operator settings file.
//!
//! # Storage layout
//!
//! ```text
//! ~/.ringsync/
//!   settings.yaml      (optional: every key has a default)
//! ```
//!
//! # API pattern
//!
//! - `fn_at(home: &Path, …)`: explicit home; used in tests with `TempDir`
//! - `fn(…)`: derives home from `dirs::home_dir()`, delegates to `_at`

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{io_err, CoreError};
use crate::types::RetentionPolicy;

pub const DEFAULT_VERSIONS_TO_KEEP: u32 = 7;
pub const DEFAULT_SCHEDULE_ID: &str = "RINGSYNC-01";

/// Everything the operator can tune without touching the command line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub versions_to_keep: u32,
    /// Where failure notifications go; `None` disables mail.
    pub mail_to: Option<String>,
    /// Sender address; defaults to `root@<local hostname>` when unset.
    pub mail_from: Option<String>,
    pub sendmail: PathBuf,
    pub ssh: PathBuf,
    /// Extra arguments placed before the host on every ssh invocation.
    pub ssh_options: Vec<String>,
    pub rsync: PathBuf,
    /// Event identifier written into `SCHEDULEREC` records.
    pub schedule_id: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            versions_to_keep: DEFAULT_VERSIONS_TO_KEEP,
            mail_to: None,
            mail_from: None,
            sendmail: PathBuf::from("/usr/sbin/sendmail"),
            ssh: PathBuf::from("ssh"),
            ssh_options: Vec::new(),
            rsync: PathBuf::from("rsync"),
            schedule_id: DEFAULT_SCHEDULE_ID.to_owned(),
        }
    }
}

impl Settings {
    /// Retention for this run: a command-line `override_keep` wins over
    /// `versions_to_keep`.
    pub fn retention(&self, override_keep: Option<u32>) -> Result<RetentionPolicy, CoreError> {
        RetentionPolicy::new(override_keep.unwrap_or(self.versions_to_keep))
    }
}

/// `<home>/.ringsync/settings.yaml`: pure, no I/O.
pub fn settings_path_at(home: &Path) -> PathBuf {
    home.join(".ringsync").join("settings.yaml")
}

/// Load settings from `path`; a missing file yields [`Settings::default`].
pub fn load_from(path: &Path) -> Result<Settings, CoreError> {
    if !path.exists() {
        return Ok(Settings::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    if contents.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(&contents).map_err(|source| CoreError::SettingsParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load `<home>/.ringsync/settings.yaml`.
pub fn load_at(home: &Path) -> Result<Settings, CoreError> {
    load_from(&settings_path_at(home))
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Settings, CoreError> {
    load_at(&home()?)
}

fn home() -> Result<PathBuf, CoreError> {
    dirs::home_dir().ok_or(CoreError::HomeNotFound)
}
