//! On-disk layout of a client's version ring.
//!
//! ```text
//! <ring root>/
//!   version-0/<client>/...   most recent generation, the transfer target
//!   version-1/<client>/...
//!   ...
//!   version-<N-1>/<client>/  oldest retained generation
//! ```
//!
//! Several clients may share one ring root; each only ever touches its own
//! `<client>` subtree. Runs against the same client must not overlap: nothing
//! here locks, the caller's scheduling guarantees it.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use filetime::FileTime;

use ringsync_core::ClientId;

use crate::error::{step_err, RotationError, RotationStep};

pub const SLOT_PREFIX: &str = "version-";

pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// One existing generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotInfo {
    pub index: u32,
    pub path: PathBuf,
    pub modified: SystemTime,
}

/// A client's generations under one ring root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRing {
    root: PathBuf,
    client: ClientId,
}

impl VersionRing {
    pub fn new(root: impl Into<PathBuf>, client: ClientId) -> Self {
        Self {
            root: root.into(),
            client,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn client(&self) -> &ClientId {
        &self.client
    }

    /// `<root>/version-<index>`: shared by every client in this root.
    pub fn slot_dir(&self, index: u32) -> PathBuf {
        self.root.join(format!("{SLOT_PREFIX}{index}"))
    }

    /// `<root>/version-<index>/<client>`: pure, no I/O.
    pub fn slot_path(&self, index: u32) -> PathBuf {
        self.slot_dir(index).join(self.client.as_str())
    }

    /// Where a seed copy is assembled before it is renamed into slot 1.
    pub fn partial_seed_path(&self) -> PathBuf {
        self.slot_dir(1).join(format!(".{}.partial", self.client))
    }

    /// Whether slot `index` holds a generation. Errors other than "not found"
    /// are reported against `step`.
    pub fn probe(&self, index: u32, step: RotationStep) -> Result<bool, RotationError> {
        let path = self.slot_path(index);
        match fs::symlink_metadata(&path) {
            Ok(meta) => Ok(meta.is_dir()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(step_err(step, path, err)),
        }
    }

    /// Indices of every slot that holds this client's generation, ascending.
    ///
    /// Includes indices beyond the current retention depth, which can be left
    /// behind when retention is lowered.
    pub fn existing_slots(&self) -> Result<Vec<u32>, RotationError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(err) => return Err(step_err(RotationStep::Scan, &self.root, err)),
        };

        let mut indices = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| step_err(RotationStep::Scan, &self.root, e))?;
            let name = entry.file_name();
            let Some(index) = name.to_str().and_then(parse_slot_name) else {
                continue;
            };
            if self.probe(index, RotationStep::Scan)? {
                indices.push(index);
            }
        }
        indices.sort_unstable();
        Ok(indices)
    }

    /// Existing generations with their modification times, newest slot first.
    pub fn slots(&self) -> Result<Vec<SlotInfo>, RotationError> {
        self.existing_slots()?
            .into_iter()
            .map(|index| {
                let path = self.slot_path(index);
                let modified = fs::metadata(&path)
                    .and_then(|m| m.modified())
                    .map_err(|e| step_err(RotationStep::Scan, &path, e))?;
                Ok(SlotInfo {
                    index,
                    path,
                    modified,
                })
            })
            .collect()
    }

    /// Make sure slot 0 exists so the transfer has a target.
    pub fn prepare_slot_zero(&self) -> Result<PathBuf, RotationError> {
        let path = self.slot_path(0);
        fs::create_dir_all(&path).map_err(|e| step_err(RotationStep::Prepare, &path, e))?;
        Ok(path)
    }

    /// Stamp slot 0 with the current time: it is now the complete, current
    /// generation.
    pub fn mark_current(&self) -> Result<(), RotationError> {
        stamp(&self.slot_path(0), SystemTime::now(), RotationStep::Stamp)
    }
}

/// `"version-12"` → `Some(12)`. Only plain decimal digits are accepted.
pub fn parse_slot_name(name: &str) -> Option<u32> {
    let digits = name.strip_prefix(SLOT_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// `now` minus `days` whole days, clamped at the epoch.
pub fn days_before(now: SystemTime, days: u32) -> SystemTime {
    now.checked_sub(DAY * days).unwrap_or(SystemTime::UNIX_EPOCH)
}

pub(crate) fn stamp(
    path: &Path,
    when: SystemTime,
    step: RotationStep,
) -> Result<(), RotationError> {
    filetime::set_file_mtime(path, FileTime::from_system_time(when))
        .map_err(|e| step_err(step, path, e))
}
