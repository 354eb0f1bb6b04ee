use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// The rotation step (or ring operation) that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationStep {
    /// Listing the ring root.
    Scan,
    /// Deleting the oldest slot(s).
    Evict,
    /// Renaming slot `i` to slot `i + 1`.
    Shift,
    /// Hardlink-copying slot 0 to slot 1.
    Seed,
    /// Creating slot 0 for the transfer.
    Prepare,
    /// Resetting a slot's modification time.
    Stamp,
}

impl fmt::Display for RotationStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RotationStep::Scan => "scan",
            RotationStep::Evict => "evict",
            RotationStep::Shift => "shift",
            RotationStep::Seed => "seed",
            RotationStep::Prepare => "prepare",
            RotationStep::Stamp => "stamp",
        };
        f.write_str(name)
    }
}

/// A ring operation failed. The ring is left as it was after the last
/// completed step.
#[derive(Debug, Error)]
#[error("{step} step failed at {path}: {source}")]
pub struct RotationError {
    pub step: RotationStep,
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

pub(crate) fn step_err(
    step: RotationStep,
    path: impl Into<PathBuf>,
    source: std::io::Error,
) -> RotationError {
    RotationError {
        step,
        path: path.into(),
        source,
    }
}
