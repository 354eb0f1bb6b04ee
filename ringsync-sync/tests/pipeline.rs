use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use filetime::FileTime;
use tempfile::TempDir;

use ringsync_core::{ClientEntry, ClientId, RetentionPolicy};
use ringsync_remote::scripted::{mentions, ScriptedExecutor};
use ringsync_remote::{CommandSpec, ExecOutput, Notifier, NotifyError, SshTransport};
use ringsync_sync::{run_all, run_client, ClientRunStatus, LogDestination, RunContext};

const DSM_SYS: &str = "\
* scheduler options
SERVERNAME  tsm1
DOMAIN      \"ALL-LOCAL\"
EXCLUDE.DIR \"/proc/\"
EXCLUDE.DIR /var/tmp
SCHEDLOGNAME /var/log/dsmsched.log
";

const STATS: &str = "\
Number of files: 2 (reg: 1, dir: 1)
Number of regular files transferred: 1
Total file size: 20 bytes
Total bytes sent: 120
";

#[derive(Default)]
struct RecordingNotifier {
    sent: RefCell<Vec<(String, String)>>,
}

impl RecordingNotifier {
    fn subjects(&self) -> Vec<String> {
        self.sent.borrow().iter().map(|(s, _)| s.clone()).collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        self.sent.borrow_mut().push((subject.to_owned(), body.to_owned()));
        Ok(())
    }
}

fn is_rsync(c: &CommandSpec) -> bool {
    c.program_lossy() == "rsync"
}

/// Stand-in for a transfer: drop a file into the target directory.
fn fake_transfer(c: &CommandSpec) -> ExecOutput {
    let target = c.args_lossy().pop().unwrap_or_default();
    fs::write(Path::new(&target).join("hosts"), "127.0.0.1 localhost\n").unwrap();
    ExecOutput::ok(STATS)
}

fn healthy_client() -> ScriptedExecutor {
    ScriptedExecutor::new()
        .on(mentions("'cat' '/etc/adsm/dsm.sys'"), ExecOutput::ok(DSM_SYS))
        .on(mentions("'date' '+%x'"), ExecOutput::ok("10/18/26\n"))
        .on_with(is_rsync, fake_transfer)
}

fn entry(dest: &Path) -> ClientEntry {
    ClientEntry {
        client: ClientId::parse("server1.org").unwrap(),
        dest_dir: dest.to_path_buf(),
        config_path: "/etc/adsm/dsm.sys".into(),
    }
}

fn context<'a>(
    executor: &'a ScriptedExecutor,
    notifier: &'a RecordingNotifier,
    destinations: Vec<LogDestination>,
) -> RunContext<'a> {
    RunContext {
        executor,
        transport: SshTransport::default(),
        rsync: PathBuf::from("rsync"),
        policy: RetentionPolicy::new(3).unwrap(),
        schedule_id: "RINGSYNC-01".into(),
        destinations,
        notifier: Some(notifier),
    }
}

fn appended_records(executor: &ScriptedExecutor) -> Vec<String> {
    executor
        .calls_mentioning("cat >>")
        .into_iter()
        .map(|c| String::from_utf8(c.stdin.unwrap_or_default()).unwrap())
        .collect()
}

#[test]
fn successful_run_fills_slot_zero_and_writes_client_log() {
    let dest = TempDir::new().unwrap();
    let executor = healthy_client();
    let notifier = RecordingNotifier::default();
    let ctx = context(&executor, &notifier, vec![LogDestination::ClientLog]);

    let report = run_client(&ctx, &entry(dest.path()));

    assert_eq!(report.status, ClientRunStatus::Succeeded, "{:?}", report.error);
    assert!(dest.path().join("version-0/server1.org/hosts").is_file());
    assert_eq!(report.logs_written, vec!["/var/log/dsmsched.log"]);
    assert!(report.log_errors.is_empty());
    assert!(notifier.subjects().is_empty());

    let rsync = &executor.calls_mentioning("--stats")[0];
    let args = rsync.args_lossy();
    assert!(args.contains(&"server1.org:/".to_owned()));
    assert!(args.windows(2).any(|w| w[0] == "--exclude" && w[1] == "var/tmp"));
    assert!(!args.iter().any(|a| a.starts_with("--link-dest")));

    let records = appended_records(&executor);
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert!(record.starts_with("10/18/26   "));
    assert!(record.contains("--- SCHEDULEREC OBJECT BEGIN RINGSYNC-01\n"));
    assert!(record.contains("Total number of objects backed up:       1\n"));
    assert!(record.ends_with("--- Scheduled event RINGSYNC-01 completed successfully\n"));
}

#[test]
fn second_run_links_against_the_previous_generation() {
    let dest = TempDir::new().unwrap();
    let executor = healthy_client();
    let notifier = RecordingNotifier::default();
    let ctx = context(&executor, &notifier, Vec::new());

    run_client(&ctx, &entry(dest.path()));
    let report = run_client(&ctx, &entry(dest.path()));

    assert!(report.is_success());
    assert!(dest.path().join("version-1/server1.org/hosts").is_file());
    let second = executor.calls_mentioning("--stats").pop().unwrap();
    assert!(second
        .args_lossy()
        .iter()
        .any(|a| a.starts_with("--link-dest=") && a.ends_with("version-1/server1.org")));
}

#[test]
fn successful_run_marks_slot_zero_as_current() {
    let dest = TempDir::new().unwrap();
    let slot0 = dest.path().join("version-0/server1.org");
    fs::create_dir_all(&slot0).unwrap();
    let week_ago = SystemTime::now() - Duration::from_secs(7 * 86_400);
    filetime::set_file_mtime(&slot0, FileTime::from_system_time(week_ago)).unwrap();

    let executor = healthy_client();
    let notifier = RecordingNotifier::default();
    let ctx = context(&executor, &notifier, Vec::new());
    let report = run_client(&ctx, &entry(dest.path()));

    assert!(report.is_success(), "{:?}", report.error);
    let modified = fs::metadata(&slot0).unwrap().modified().unwrap();
    let age = SystemTime::now().duration_since(modified).unwrap_or_default();
    assert!(age < Duration::from_secs(60), "slot 0 is {age:?} old");
}

#[test]
fn rotation_failure_aborts_before_transfer() {
    let dest = TempDir::new().unwrap();
    fs::create_dir_all(dest.path().join("version-0/server1.org")).unwrap();
    // Not a generation, so rotation cannot seed slot 1 over it.
    fs::create_dir_all(dest.path().join("version-1")).unwrap();
    fs::write(dest.path().join("version-1/server1.org"), "stray file").unwrap();

    let executor = healthy_client();
    let notifier = RecordingNotifier::default();
    let ctx = context(&executor, &notifier, vec![LogDestination::ClientLog]);
    let report = run_client(&ctx, &entry(dest.path()));

    assert_eq!(report.status, ClientRunStatus::Aborted);
    let error = report.error.as_deref().unwrap();
    assert!(error.contains("seed step failed"), "{error}");
    assert!(executor.calls_mentioning("--stats").is_empty());
    assert!(appended_records(&executor).is_empty());
    assert_eq!(notifier.subjects(), vec!["Backup failed on server1.org"]);
}

#[test]
fn missing_config_aborts_before_transfer() {
    let dest = TempDir::new().unwrap();
    let executor = ScriptedExecutor::new().on(
        mentions("'test' '-f' '/etc/adsm/dsm.sys'"),
        ExecOutput::failed(1, ""),
    );
    let notifier = RecordingNotifier::default();
    let ctx = context(&executor, &notifier, vec![LogDestination::ClientLog]);

    let report = run_client(&ctx, &entry(dest.path()));

    assert_eq!(report.status, ClientRunStatus::Aborted);
    assert!(report.error.as_deref().unwrap().contains("not found on server1.org"));
    assert!(executor.calls_mentioning("--stats").is_empty());
    assert!(!dest.path().join("version-0").exists());
    assert_eq!(notifier.subjects(), vec!["Backup failed on server1.org"]);
}

#[test]
fn failed_transfer_is_reported_and_logged() {
    let dest = TempDir::new().unwrap();
    let executor = ScriptedExecutor::new()
        .on(mentions("'cat' '/etc/adsm/dsm.sys'"), ExecOutput::ok(DSM_SYS))
        .on(mentions("'date' '+%x'"), ExecOutput::ok("10/18/26\n"))
        .on(
            is_rsync,
            ExecOutput {
                stdout: STATS.into(),
                stderr: "rsync error: some files/attrs were not transferred (code 23)\n".into(),
                exit_code: 23,
            },
        );
    let notifier = RecordingNotifier::default();
    let ctx = context(&executor, &notifier, vec![LogDestination::ClientLog]);

    let report = run_client(&ctx, &entry(dest.path()));

    assert_eq!(report.status, ClientRunStatus::Failed);
    assert_eq!(
        report.error.as_deref(),
        Some("rsync error: some files/attrs were not transferred (code 23)")
    );
    assert_eq!(notifier.subjects(), vec!["Backup problem on server1.org"]);

    let record = appended_records(&executor).pop().unwrap();
    assert!(record.contains("Total number of objects failed:          >0\n"));
    assert!(record.ends_with("--- Scheduled event RINGSYNC-01 failed\n"));
}

#[test]
fn missing_log_name_is_a_log_error_not_a_run_failure() {
    let dest = TempDir::new().unwrap();
    let executor = ScriptedExecutor::new()
        .on(mentions("'cat' '/etc/adsm/dsm.sys'"), ExecOutput::ok("DOMAIN /home\n"))
        .on_with(is_rsync, fake_transfer);
    let notifier = RecordingNotifier::default();
    let ctx = context(
        &executor,
        &notifier,
        vec![
            LogDestination::ClientLog,
            LogDestination::Path("/var/log/backup.log".into()),
        ],
    );

    let report = run_client(&ctx, &entry(dest.path()));

    assert!(report.is_success());
    assert_eq!(report.logs_written, vec!["/var/log/backup.log"]);
    assert_eq!(report.log_errors.len(), 1);
    assert!(report.log_errors[0].contains("no log file configured"));
    assert_eq!(
        notifier.subjects(),
        vec!["Could not write backup logfile on server1.org"]
    );
}

#[test]
fn unknown_client_date_still_writes_record() {
    let dest = TempDir::new().unwrap();
    let executor = ScriptedExecutor::new()
        .on(mentions("'cat' '/etc/adsm/dsm.sys'"), ExecOutput::ok(DSM_SYS))
        .on(mentions("'date' '+%x'"), ExecOutput::failed(127, "date: not found"))
        .on_with(is_rsync, fake_transfer);
    let notifier = RecordingNotifier::default();
    let ctx = context(&executor, &notifier, vec![LogDestination::ClientLog]);

    let report = run_client(&ctx, &entry(dest.path()));

    assert_eq!(report.logs_written.len(), 1);
    let record = appended_records(&executor).pop().unwrap();
    assert!(record.starts_with("   "), "record: {record:?}");
}

#[test]
fn run_all_moves_past_a_broken_destination() {
    let dest = TempDir::new().unwrap();
    let executor = healthy_client();
    let notifier = RecordingNotifier::default();
    let ctx = context(&executor, &notifier, Vec::new());

    let entries = vec![entry(&dest.path().join("missing")), entry(dest.path())];
    let reports = run_all(&ctx, &entries);

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].status, ClientRunStatus::Aborted);
    assert!(reports[0].error.as_deref().unwrap().contains("not usable"));
    assert!(reports[1].is_success());
    assert_eq!(notifier.subjects().len(), 1);

    let json = serde_json::to_value(&reports[1]).unwrap();
    assert_eq!(json["status"], "succeeded");
    assert_eq!(json["client"], "server1.org");
    assert!(json.get("error").is_none());
}
