//! Operator notifications.
//!
//! Every failure is printed locally; when a mail address is configured it is
//! also mailed through the local `sendmail`. Delivery problems are logged and
//! swallowed, never propagated.

use std::path::PathBuf;

use crate::error::NotifyError;
use crate::exec::{CommandSpec, Executor};

/// Something that can deliver a subject/body pair to an operator.
pub trait Notifier {
    fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError>;
}

/// Plain-text mail piped into `sendmail -i -- <to>`.
pub struct SendmailNotifier<'a> {
    executor: &'a dyn Executor,
    sendmail: PathBuf,
    from: String,
    to: String,
}

impl<'a> SendmailNotifier<'a> {
    pub fn new(
        executor: &'a dyn Executor,
        sendmail: impl Into<PathBuf>,
        from: Option<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            sendmail: sendmail.into(),
            from: from.unwrap_or_else(default_sender),
            to: to.into(),
        }
    }

    /// Where failure mail is delivered.
    pub fn recipient(&self) -> &str {
        &self.to
    }
}

impl Notifier for SendmailNotifier<'_> {
    fn notify(&self, subject: &str, body: &str) -> Result<(), NotifyError> {
        let message = compose_message(&self.from, &self.to, subject, body);
        let command = CommandSpec::new(self.sendmail.as_os_str())
            .args(["-i", "--", self.to.as_str()])
            .stdin(message);
        let output = self.executor.execute(&command);
        if output.success() {
            return Ok(());
        }
        Err(NotifyError::Sendmail {
            exit_code: output.exit_code,
            detail: output.summary(),
        })
    }
}

/// Build an RFC 5322 style plain-text message.
pub fn compose_message(from: &str, to: &str, subject: &str, body: &str) -> String {
    format!(
        "From: {from}\nTo: {to}\nSubject: {}\n\n{body}\n",
        single_line(subject)
    )
}

/// Report a failure: always logged locally, mailed when `notifier` is set.
/// Mail delivery errors are logged and dropped.
pub fn notify_failure(notifier: Option<&dyn Notifier>, subject: &str, body: &str) {
    tracing::error!(subject, "{body}");
    let Some(notifier) = notifier else {
        return;
    };
    if let Err(err) = notifier.notify(subject, body) {
        tracing::warn!(error = %err, subject, "unable to send notification mail");
    }
}

/// `root@<fqdn of this host>`.
pub fn default_sender() -> String {
    let host = hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "localhost".to_owned());
    format!("root@{host}")
}

fn single_line(s: &str) -> String {
    s.lines().collect::<Vec<_>>().join(" ")
}
