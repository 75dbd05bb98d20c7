use crate::ast::CommandLine;
use crate::environment::EnvStore;
use crate::error::ExecError;

pub type ExecStatus = Result<ExecOutcome, ExecError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecOutcome {
    /// Record this as the new last status.
    Code(i32),
    /// Leave the last status as it was.
    Unchanged,
    /// Stop reading input.
    Exit,
}

/// Runs a command that no built-in handled.
pub trait Executor {
    fn exec(&mut self, cmd: &CommandLine<'_>, env: &dyn EnvStore) -> ExecStatus;
}
