//! Settings loading and client-list file integration tests.

use std::path::PathBuf;

use assert_fs::prelude::*;
use predicates::prelude::predicate;
use ringsync_core::{
    load_client_list,
    settings::{self, Settings, DEFAULT_SCHEDULE_ID, DEFAULT_VERSIONS_TO_KEEP},
    CoreError,
};

// ---------------------------------------------------------------------------
// 1. Settings
// ---------------------------------------------------------------------------

#[test]
fn missing_settings_file_yields_defaults() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let loaded = settings::load_at(home.path()).expect("load");
    assert_eq!(loaded, Settings::default());
    assert_eq!(loaded.versions_to_keep, DEFAULT_VERSIONS_TO_KEEP);
    assert_eq!(loaded.schedule_id, DEFAULT_SCHEDULE_ID);
    assert_eq!(loaded.rsync, PathBuf::from("rsync"));
}

#[test]
fn partial_settings_keep_defaults_for_unset_keys() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".ringsync/settings.yaml")
        .write_str(
            "versions_to_keep: 3\n\
             mail_to: ops@example.org\n\
             ssh_options: [\"-o\", \"BatchMode=yes\"]\n",
        )
        .expect("write");

    let loaded = settings::load_at(home.path()).expect("load");
    assert_eq!(loaded.versions_to_keep, 3);
    assert_eq!(loaded.mail_to.as_deref(), Some("ops@example.org"));
    assert_eq!(loaded.ssh_options, vec!["-o".to_string(), "BatchMode=yes".to_string()]);
    assert_eq!(loaded.ssh, PathBuf::from("ssh"));
    assert_eq!(loaded.retention(None).expect("retention").versions_to_keep(), 3);
}

#[test]
fn malformed_settings_report_path() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let file = home.child(".ringsync/settings.yaml");
    file.write_str("versions_to_keep: [not, a, number]\n").expect("write");

    let err = settings::load_at(home.path()).unwrap_err();
    assert!(matches!(err, CoreError::SettingsParse { .. }), "got: {err}");
    assert!(err.to_string().contains("settings.yaml"));
}

#[test]
fn unknown_settings_keys_are_rejected() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".ringsync/settings.yaml")
        .write_str("versions: 3\n")
        .expect("write");
    assert!(matches!(
        settings::load_at(home.path()),
        Err(CoreError::SettingsParse { .. })
    ));
}

#[test]
fn zero_retention_is_rejected_when_used() {
    let settings = Settings {
        versions_to_keep: 0,
        ..Settings::default()
    };
    assert!(matches!(
        settings.retention(None),
        Err(CoreError::InvalidRetention { value: 0 })
    ));
    assert!(matches!(
        Settings::default().retention(Some(0)),
        Err(CoreError::InvalidRetention { value: 0 })
    ));
}

#[test]
fn command_line_retention_overrides_settings() {
    let settings = Settings {
        versions_to_keep: 0,
        ..Settings::default()
    };
    let policy = settings.retention(Some(2)).expect("retention");
    assert_eq!(policy.versions_to_keep(), 2);
    assert_eq!(
        Settings::default().retention(None).expect("retention").versions_to_keep(),
        DEFAULT_VERSIONS_TO_KEEP
    );
}

// ---------------------------------------------------------------------------
// 2. Client list files
// ---------------------------------------------------------------------------

#[test]
fn client_list_file_is_loaded() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let list_file = dir.child("clients.txt");
    list_file
        .write_str("# nightly\nserver1.org  /tape2  /etc/adsm/dsm.sys\n")
        .expect("write");
    list_file.assert(predicate::path::is_file());

    let list = load_client_list(list_file.path()).expect("load");
    assert_eq!(list.entries.len(), 1);
    assert_eq!(list.entries[0].client.as_str(), "server1.org");
}

#[test]
fn missing_client_list_is_io_error_with_path() {
    let dir = assert_fs::TempDir::new().expect("tempdir");
    let err = load_client_list(&dir.path().join("nope.txt")).unwrap_err();
    assert!(matches!(err, CoreError::Io { .. }));
    assert!(err.to_string().contains("nope.txt"));
}
