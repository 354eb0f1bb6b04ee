//! # ringsync-ring
//!
//! Fixed-depth ring of hardlinked backup generations per client.
//!
//! Call [`VersionRing::rotate`] before each transfer and
//! [`VersionRing::prepare_slot_zero`] to obtain the transfer target.

pub mod error;
pub mod link_copy;
pub mod ring;
pub mod rotate;

pub use error::{RotationError, RotationStep};
pub use link_copy::{link_tree, LinkStats};
pub use ring::{days_before, parse_slot_name, SlotInfo, VersionRing, DAY, SLOT_PREFIX};
pub use rotate::RotationReport;
