//! Client list files.
//!
//! # Format
//!
//! ```text
//! # FQDN              DESTDIR   CONFIGPATH
//! server1.org         /tape2    /etc/adsm/dsm.sys
//! db.example.com      /tape1    /opt/tivoli/tsm/client/ba/bin/dsm.sys
//! ```
//!
//! Blank lines and lines starting with `#` are skipped. Lines with fewer than
//! three fields are skipped with a warning-worthy [`SkippedLine`] record so
//! the caller can decide how loudly to complain.

use std::path::{Path, PathBuf};

use crate::error::{io_err, CoreError};
use crate::types::{ClientEntry, ClientId};

/// A non-comment line that could not be turned into a [`ClientEntry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number.
    pub line: usize,
    pub reason: String,
}

/// Parsed client list: accepted entries plus the lines that were skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientList {
    pub entries: Vec<ClientEntry>,
    pub skipped: Vec<SkippedLine>,
}

/// Parse client list text.
pub fn parse_client_list(text: &str) -> ClientList {
    let mut list = ClientList::default();

    for (index, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 3 {
            list.skipped.push(SkippedLine {
                line: index + 1,
                reason: format!(
                    "expected `FQDN DESTDIR CONFIGPATH`, got {} field(s)",
                    fields.len()
                ),
            });
            continue;
        }
        match ClientId::parse(fields[0]) {
            Ok(client) => list.entries.push(ClientEntry {
                client,
                dest_dir: PathBuf::from(fields[1]),
                config_path: fields[2].to_owned(),
            }),
            Err(err) => list.skipped.push(SkippedLine {
                line: index + 1,
                reason: err.to_string(),
            }),
        }
    }
    list
}

/// Read and parse the client list at `path`.
pub fn load_client_list(path: &Path) -> Result<ClientList, CoreError> {
    let text = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    Ok(parse_client_list(&text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_entries_and_skips_comments() {
        let list = parse_client_list(
            "# clients\n\
             server1.org  /tape2  /etc/adsm/dsm.sys\n\
             \n\
             #old.example /tape1 /etc/dsm.sys\n\
             db.example.com /tape1 /opt/dsm.sys extra-field\n",
        );
        assert_eq!(list.entries.len(), 2);
        assert!(list.skipped.is_empty());
        assert_eq!(list.entries[0].client.as_str(), "server1.org");
        assert_eq!(list.entries[0].dest_dir, PathBuf::from("/tape2"));
        assert_eq!(list.entries[0].config_path, "/etc/adsm/dsm.sys");
        assert_eq!(list.entries[1].client.as_str(), "db.example.com");
    }

    #[test]
    fn short_lines_are_reported_with_line_numbers() {
        let list = parse_client_list("server1.org /tape2\nok.host /d /c\n");
        assert_eq!(list.entries.len(), 1);
        assert_eq!(list.skipped.len(), 1);
        assert_eq!(list.skipped[0].line, 1);
        assert!(list.skipped[0].reason.contains("2 field(s)"));
    }

    #[test]
    fn invalid_client_names_are_skipped() {
        let list = parse_client_list("-oProxyCommand=evil /d /c\n");
        assert!(list.entries.is_empty());
        assert_eq!(list.skipped.len(), 1);
        assert!(list.skipped[0].reason.contains("must not start with '-'"));
    }
}
