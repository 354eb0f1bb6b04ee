//! In-memory [`Executor`] for tests: canned responses keyed by predicates,
//! plus a log of every command it was asked to run.

use std::cell::RefCell;

use crate::exec::{CommandSpec, ExecOutput, Executor};

type Matcher = Box<dyn Fn(&CommandSpec) -> bool>;
type Responder = Box<dyn Fn(&CommandSpec) -> ExecOutput>;

/// Executor that answers from a rule list; unmatched commands succeed silently.
#[derive(Default)]
pub struct ScriptedExecutor {
    rules: Vec<(Matcher, Responder)>,
    calls: RefCell<Vec<CommandSpec>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer commands matching `matcher` with a fixed `output`.
    pub fn on(
        self,
        matcher: impl Fn(&CommandSpec) -> bool + 'static,
        output: ExecOutput,
    ) -> Self {
        self.on_with(matcher, move |_| output.clone())
    }

    /// Answer commands matching `matcher` by calling `responder`, which may
    /// also perform side effects (for example populating a directory the way
    /// a transfer would).
    pub fn on_with(
        mut self,
        matcher: impl Fn(&CommandSpec) -> bool + 'static,
        responder: impl Fn(&CommandSpec) -> ExecOutput + 'static,
    ) -> Self {
        self.rules.push((Box::new(matcher), Box::new(responder)));
        self
    }

    /// Every command executed so far, in order.
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }

    /// Commands whose program or arguments mention `needle`.
    pub fn calls_mentioning(&self, needle: &str) -> Vec<CommandSpec> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| command_text(c).contains(needle))
            .cloned()
            .collect()
    }
}

impl Executor for ScriptedExecutor {
    fn execute(&self, command: &CommandSpec) -> ExecOutput {
        self.calls.borrow_mut().push(command.clone());
        self.rules
            .iter()
            .find(|(matcher, _)| matcher(command))
            .map(|(_, responder)| responder(command))
            .unwrap_or_default()
    }
}

/// Program and arguments joined with spaces.
pub fn command_text(command: &CommandSpec) -> String {
    command.to_string()
}

/// Matcher: the command line contains `needle`.
pub fn mentions(needle: &'static str) -> impl Fn(&CommandSpec) -> bool {
    move |c| command_text(c).contains(needle)
}
