//! Version ring rotation.
//!
//! Rotation sequence for `versions_to_keep = N` (each step completes before
//! the next starts; the first failure aborts the whole rotation):
//!
//! 1. **Evict**: delete slot `N-1` and anything beyond it, plus a stale
//!    `.partial` seed left by an interrupted run.
//! 2. **Shift**: slot `i` → slot `i+1` for `i = N-2 … 1`; missing slots are
//!    skipped. Each moved slot's mtime becomes `now - (i+1) days`.
//! 3. **Seed**: slot 0 is hardlink-copied into slot 1 (via a `.partial`
//!    directory renamed into place) and stamped `now - 1 day`.
//!
//! Slot 0 itself stays where it is: it keeps the previous generation's files,
//! shared by inode with slot 1, and the transfer reconciles it in place.
//! Unchanged files therefore cost nothing in slot 1.
//!
//! `N = 1` retains no history and rotation does nothing.
//!
//! # Slot ages
//!
//! A slot's mtime is its index in whole days before the rotation, so slot 2
//! reads as two days old right after the run that moved it there. The
//! stamps assume one run per day: they are not the time the generation was
//! taken, and the ages `ringsync versions` prints are approximations.

use std::fs;
use std::io;
use std::path::Path;
use std::time::SystemTime;

use walkdir::WalkDir;

use ringsync_core::RetentionPolicy;

use crate::error::{step_err, RotationError, RotationStep};
use crate::link_copy::{link_tree, LinkStats};
use crate::ring::{days_before, stamp, VersionRing};

/// What one rotation did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RotationReport {
    /// Slot indices deleted during eviction.
    pub evicted: Vec<u32>,
    /// `(from, to)` renames, in the order performed.
    pub shifted: Vec<(u32, u32)>,
    /// Set when slot 0 was copied into slot 1.
    pub seeded: Option<LinkStats>,
}

impl VersionRing {
    /// Rotate the ring using the current time for timestamp corrections.
    pub fn rotate(&self, policy: RetentionPolicy) -> Result<RotationReport, RotationError> {
        self.rotate_at(policy, SystemTime::now())
    }

    /// Rotate the ring as if the current time were `now`.
    pub fn rotate_at(
        &self,
        policy: RetentionPolicy,
        now: SystemTime,
    ) -> Result<RotationReport, RotationError> {
        let mut report = RotationReport::default();
        if policy.versions_to_keep() <= 1 {
            tracing::debug!(client = %self.client(), "retention is 1, nothing to rotate");
            return Ok(report);
        }

        self.evict(policy, &mut report)?;
        self.shift(policy, now, &mut report)?;
        self.seed(now, &mut report)?;

        tracing::info!(
            client = %self.client(),
            root = %self.root().display(),
            evicted = ?report.evicted,
            shifted = ?report.shifted,
            seeded = report.seeded.is_some(),
            "version ring rotated"
        );
        Ok(report)
    }

    fn evict(
        &self,
        policy: RetentionPolicy,
        report: &mut RotationReport,
    ) -> Result<(), RotationError> {
        let oldest = policy.oldest_slot();

        for index in self.existing_slots()?.into_iter().filter(|i| *i >= oldest) {
            let path = self.slot_path(index);
            remove_tree(&path).map_err(|e| step_err(RotationStep::Evict, &path, e))?;
            if index > oldest {
                // Beyond retention: drop the shared `version-N` directory too
                // once no other client uses it.
                remove_unused_slot_dir(&self.slot_dir(index));
            }
            tracing::debug!(client = %self.client(), slot = index, "evicted");
            report.evicted.push(index);
        }

        let partial = self.partial_seed_path();
        match fs::symlink_metadata(&partial) {
            Ok(_) => {
                tracing::warn!(
                    path = %partial.display(),
                    "removing incomplete seed from an earlier run"
                );
                remove_tree(&partial).map_err(|e| step_err(RotationStep::Evict, &partial, e))?;
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => return Err(step_err(RotationStep::Evict, &partial, err)),
        }
        Ok(())
    }

    fn shift(
        &self,
        policy: RetentionPolicy,
        now: SystemTime,
        report: &mut RotationReport,
    ) -> Result<(), RotationError> {
        for index in (1..policy.oldest_slot()).rev() {
            if !self.probe(index, RotationStep::Shift)? {
                tracing::trace!(client = %self.client(), slot = index, "slot absent, not shifted");
                continue;
            }
            let to = index + 1;
            let src = self.slot_path(index);
            let dst = self.slot_path(to);
            if is_present(&dst, RotationStep::Shift)? {
                return Err(occupied(RotationStep::Shift, &dst));
            }

            let dst_dir = self.slot_dir(to);
            fs::create_dir_all(&dst_dir).map_err(|e| step_err(RotationStep::Shift, &dst_dir, e))?;
            fs::rename(&src, &dst).map_err(|e| step_err(RotationStep::Shift, &src, e))?;
            stamp(&dst, days_before(now, to), RotationStep::Shift)?;

            report.shifted.push((index, to));
        }
        Ok(())
    }

    fn seed(&self, now: SystemTime, report: &mut RotationReport) -> Result<(), RotationError> {
        if !self.probe(0, RotationStep::Seed)? {
            tracing::debug!(client = %self.client(), "no slot 0 yet, nothing to seed");
            return Ok(());
        }
        let slot1 = self.slot_path(1);
        if is_present(&slot1, RotationStep::Seed)? {
            return Err(occupied(RotationStep::Seed, &slot1));
        }

        let slot1_dir = self.slot_dir(1);
        fs::create_dir_all(&slot1_dir).map_err(|e| step_err(RotationStep::Seed, &slot1_dir, e))?;

        let partial = self.partial_seed_path();
        let stats = link_tree(&self.slot_path(0), &partial)?;
        fs::rename(&partial, &slot1).map_err(|e| step_err(RotationStep::Seed, &partial, e))?;
        stamp(&slot1, days_before(now, 1), RotationStep::Seed)?;

        report.seeded = Some(stats);
        Ok(())
    }
}

/// Anything at `path`, directory or not, blocks a rename onto it.
fn is_present(path: &Path, step: RotationStep) -> Result<bool, RotationError> {
    match fs::symlink_metadata(path) {
        Ok(_) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(step_err(step, path, err)),
    }
}

fn occupied(step: RotationStep, path: &Path) -> RotationError {
    step_err(
        step,
        path,
        io::Error::new(io::ErrorKind::AlreadyExists, "destination slot is still occupied"),
    )
}

/// `rmdir` that tolerates other clients still living in `dir`.
fn remove_unused_slot_dir(dir: &Path) {
    match fs::remove_dir(dir) {
        Ok(()) => tracing::debug!(path = %dir.display(), "removed empty version directory"),
        Err(err)
            if matches!(
                err.kind(),
                io::ErrorKind::DirectoryNotEmpty | io::ErrorKind::NotFound
            ) => {}
        Err(err) => {
            tracing::warn!(
                path = %dir.display(),
                error = %err,
                "could not remove version directory"
            );
        }
    }
}

/// `rm -rf`, also for trees containing read-only directories.
fn remove_tree(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(err) if err.kind() == io::ErrorKind::PermissionDenied => {
            make_dirs_writable(path)?;
            fs::remove_dir_all(path)
        }
        other => other,
    }
}

#[cfg(unix)]
fn make_dirs_writable(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_dir() {
            continue;
        }
        let mut perms = entry.metadata().map_err(io::Error::from)?.permissions();
        if perms.mode() & 0o700 != 0o700 {
            perms.set_mode(perms.mode() | 0o700);
            fs::set_permissions(entry.path(), perms)?;
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn make_dirs_writable(path: &Path) -> io::Result<()> {
    for entry in WalkDir::new(path).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        let mut perms = entry.metadata().map_err(io::Error::from)?.permissions();
        if perms.readonly() {
            perms.set_readonly(false);
            fs::set_permissions(entry.path(), perms)?;
        }
    }
    Ok(())
}
