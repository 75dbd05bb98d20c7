mod executor;
mod builtins;
mod fork_executor;
mod path_resolver;

pub use executor::{Executor, ExecOutcome, ExecStatus};
pub use builtins::{BuiltinCommand, BuiltinManager};
pub use fork_executor::ForkExecutor;
pub use path_resolver::PathResolver;
pub use crate::error::ExecError;
