//! Hardlinked tree copies (`cp -al`).
//!
//! Directories are recreated, symlinks are recreated with the same target,
//! and everything else is hard-linked so the copy shares inodes with the
//! source and costs no data blocks.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use filetime::FileTime;
use walkdir::WalkDir;

use crate::error::{step_err, RotationError, RotationStep};

/// What a [`link_tree`] call created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    pub directories: u64,
    pub files: u64,
    pub symlinks: u64,
}

/// Copy `src` to `dst` (which must not exist yet) using hard links.
///
/// Directory permissions, ownership (when permitted) and mtimes are applied
/// after their contents, deepest first, so read-only source directories can
/// still be populated and child creation does not disturb copied mtimes.
pub fn link_tree(src: &Path, dst: &Path) -> Result<LinkStats, RotationError> {
    let seed_err = |path: &Path, e: io::Error| step_err(RotationStep::Seed, path, e);

    let mut stats = LinkStats::default();
    let mut dirs: Vec<(PathBuf, fs::Metadata)> = Vec::new();

    for entry in WalkDir::new(src).follow_links(false) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            step_err(RotationStep::Seed, path, io::Error::from(e))
        })?;
        let rel = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dst.join(rel);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir(&target).map_err(|e| seed_err(&target, e))?;
            let meta = entry.metadata().map_err(|e| {
                step_err(RotationStep::Seed, entry.path(), io::Error::from(e))
            })?;
            dirs.push((target, meta));
            stats.directories += 1;
        } else if file_type.is_symlink() {
            let link = fs::read_link(entry.path()).map_err(|e| seed_err(entry.path(), e))?;
            make_symlink(&link, &target).map_err(|e| seed_err(&target, e))?;
            let meta = fs::symlink_metadata(entry.path()).map_err(|e| seed_err(entry.path(), e))?;
            copy_owner(&target, &meta);
            filetime::set_symlink_file_times(
                &target,
                FileTime::from_last_access_time(&meta),
                FileTime::from_last_modification_time(&meta),
            )
            .map_err(|e| seed_err(&target, e))?;
            stats.symlinks += 1;
        } else {
            fs::hard_link(entry.path(), &target).map_err(|e| seed_err(&target, e))?;
            stats.files += 1;
        }
    }

    for (path, meta) in dirs.iter().rev() {
        copy_owner(path, meta);
        fs::set_permissions(path, meta.permissions()).map_err(|e| seed_err(path, e))?;
        filetime::set_file_mtime(path, FileTime::from_last_modification_time(meta))
            .map_err(|e| seed_err(path, e))?;
    }

    tracing::debug!(
        src = %src.display(),
        dst = %dst.display(),
        directories = stats.directories,
        files = stats.files,
        symlinks = stats.symlinks,
        "hardlinked tree"
    );
    Ok(stats)
}

#[cfg(unix)]
fn make_symlink(link: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(link, target)
}

#[cfg(not(unix))]
fn make_symlink(_link: &Path, _target: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symlinks in backup trees are only supported on unix",
    ))
}

/// Ownership can only be changed by root; anyone else keeps their own.
#[cfg(unix)]
fn copy_owner(path: &Path, meta: &fs::Metadata) {
    use std::os::unix::fs::{lchown, MetadataExt};
    if let Err(err) = lchown(path, Some(meta.uid()), Some(meta.gid())) {
        tracing::trace!(path = %path.display(), error = %err, "ownership not preserved");
    }
}

#[cfg(not(unix))]
fn copy_owner(_path: &Path, _meta: &fs::Metadata) {}
