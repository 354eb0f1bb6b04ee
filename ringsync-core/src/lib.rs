//! ringsync core library: domain types, option-file parsing, client lists,
//! settings, errors.
//!
//! - [`types`]: newtypes and domain structs
//! - [`directives`]: client option file (`DOMAIN`, `EXCLUDE.DIR`, `SCHEDLOGNAME`)
//! - [`client_list`]: `FQDN DESTDIR CONFIGPATH` files
//! - [`settings`]: `~/.ringsync/settings.yaml`
//! - [`error`]: [`CoreError`]

pub mod client_list;
pub mod directives;
pub mod error;
pub mod settings;
pub mod types;

pub use client_list::{load_client_list, parse_client_list, ClientList, SkippedLine};
pub use directives::parse_directives;
pub use error::CoreError;
pub use settings::Settings;
pub use types::{ClientConfig, ClientEntry, ClientId, RetentionPolicy, RunOutcome, RunStatus};
