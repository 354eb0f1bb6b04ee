//! # ringsync-remote
//!
//! Everything that talks to the outside world: running external commands,
//! reaching clients over ssh, fetching their option files and mailing the
//! operator.

pub mod error;
pub mod exec;
pub mod notify;
pub mod resolver;
pub mod scripted;
pub mod shell;

pub use error::{ConfigError, NotifyError, TransportError};
pub use exec::{CommandSpec, ExecOutput, Executor, ProcessExecutor, SPAWN_FAILED};
pub use notify::{notify_failure, Notifier, SendmailNotifier};
pub use resolver::resolve;
pub use shell::{sh_quote, RemoteShell, SshTransport};
