//! Parser for the scheduler's client option file (`dsm.sys` style).
//!
//! Only three keywords matter for a transfer:
//!
//! ```text
//! DOMAIN        "ALL-LOCAL"      * a remote root; ALL-LOCAL means "/"
//! EXCLUDE.DIR   "/var/tmp/"      * excluded relative path
//! SCHEDLOGNAME  "/var/log/dsmsched.log"
//! ```
//!
//! Everything else in the file is ignored.

use crate::types::ClientConfig;

pub const DOMAIN: &str = "DOMAIN";
pub const EXCLUDE_DIR: &str = "EXCLUDE.DIR";
pub const SCHEDLOGNAME: &str = "SCHEDLOGNAME";

/// Domain value meaning "every local filesystem".
pub const ALL_LOCAL: &str = "ALL-LOCAL";

/// Parse the option file text into a [`ClientConfig`].
///
/// Lines with fewer than two tokens and lines whose first token starts with
/// `*` are skipped. Keywords are case sensitive and only the first value token
/// is used. A file without any `DOMAIN` line backs up `ALL-LOCAL`.
pub fn parse_directives(text: &str) -> ClientConfig {
    let mut config = ClientConfig::default();

    for line in text.lines() {
        let mut tokens = line.split_whitespace();
        let (Some(keyword), Some(value)) = (tokens.next(), tokens.next()) else {
            continue;
        };
        if keyword.starts_with('*') {
            continue;
        }

        let value = strip_quotes(value);
        match keyword {
            DOMAIN => {
                let domain = normalize_domain(&value);
                if !config.domains.contains(&domain) {
                    config.domains.push(domain);
                }
            }
            EXCLUDE_DIR => {
                let dir = value.trim_matches('/');
                if !dir.is_empty() {
                    config.exclude_dirs.insert(dir.to_owned());
                }
            }
            SCHEDLOGNAME => {
                config.remote_log_path = Some(value).filter(|v| !v.is_empty());
            }
            _ => {}
        }
    }

    if config.domains.is_empty() {
        config.domains.push(normalize_domain(ALL_LOCAL));
    }
    config
}

fn strip_quotes(value: &str) -> String {
    value.replace('"', "")
}

fn normalize_domain(value: &str) -> String {
    if value == ALL_LOCAL {
        "/".to_owned()
    } else {
        value.to_owned()
    }
}
