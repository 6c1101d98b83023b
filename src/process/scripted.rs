//! In-process stand-in for external tools.

use std::cell::RefCell;
use std::io;

use super::command::{CommandOutput, CommandRunner, CommandSpec};

type Responder = Box<dyn Fn(&CommandSpec) -> io::Result<CommandOutput>>;

/// A [`CommandRunner`] that answers from a closure and records every call
///
/// Useful for exercising simulator and test-run flows on machines without
/// Xcode:
///
/// ```rust
/// use marketing_screenshots::process::{CommandOutput, CommandRunner, CommandSpec, ScriptedRunner};
///
/// let runner = ScriptedRunner::new(|spec| Ok(CommandOutput::ok(format!("ran {}", spec.program))));
/// let output = runner.run(&CommandSpec::new("xcrun")).unwrap();
/// assert_eq!(output.stdout, "ran xcrun");
/// assert_eq!(runner.calls().len(), 1);
/// ```
pub struct ScriptedRunner {
    responder: Responder,
    calls: RefCell<Vec<CommandSpec>>,
}

impl ScriptedRunner {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&CommandSpec) -> io::Result<CommandOutput> + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// Runner for which every command succeeds with empty output
    pub fn succeeding() -> Self {
        Self::new(|_| Ok(CommandOutput::ok("")))
    }

    /// Every command run so far, in order
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls.borrow().clone()
    }

    /// Calls whose arguments start with `prefix`
    pub fn calls_with_args(&self, prefix: &[&str]) -> Vec<CommandSpec> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| {
                c.args.len() >= prefix.len() && c.args.iter().zip(prefix).all(|(a, p)| a == p)
            })
            .cloned()
            .collect()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, spec: &CommandSpec) -> io::Result<CommandOutput> {
        self.calls.borrow_mut().push(spec.clone());
        (self.responder)(spec)
    }
}
