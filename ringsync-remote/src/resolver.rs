//! Fetch and parse a client's scheduler option file.

use ringsync_core::{parse_directives, ClientConfig};

use crate::error::ConfigError;
use crate::shell::RemoteShell;

/// Resolve the [`ClientConfig`] of the client behind `shell` from the option
/// file at `remote_config_path` on that client.
pub fn resolve(
    shell: &RemoteShell<'_>,
    remote_config_path: &str,
) -> Result<ClientConfig, ConfigError> {
    let client = shell.client();

    shell
        .require_file(remote_config_path)
        .map_err(|source| ConfigError::NotFound {
            client: client.clone(),
            path: remote_config_path.to_owned(),
            source,
        })?;

    let text = shell
        .read_file(remote_config_path)
        .map_err(|source| ConfigError::Unreadable {
            client: client.clone(),
            path: remote_config_path.to_owned(),
            source,
        })?;

    let config = parse_directives(&text);
    tracing::debug!(
        client = %client,
        domains = ?config.domains,
        excludes = config.exclude_dirs.len(),
        log = ?config.remote_log_path,
        "resolved client config"
    );
    Ok(config)
}
