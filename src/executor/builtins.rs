use std::borrow::Cow;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use nix::unistd;
use tracing::debug;

use crate::ast::Word;
use crate::config::Config;
use crate::environment::EnvStore;
use crate::executor::{ ExecStatus, ExecOutcome, ExecError };
use crate::io::Streams;

pub trait BuiltinCommand {
    fn name(&self) -> &'static str;
    /// `args` excludes the command name itself.
    fn run(&self, args: &[Word<'_>], env: &mut dyn EnvStore, io: &mut Streams<'_>) -> ExecStatus;
}

pub struct BuiltinManager {
    commands: HashMap<String, Box<dyn BuiltinCommand>>,
}

impl BuiltinManager {
    pub fn new(config: &Config) -> Self {
        let mut mgr = BuiltinManager {
            commands: HashMap::new(),
        };
        mgr.register(Box::new(ExitCommand { farewell: config.farewell.clone() }));
        mgr.register(Box::new(CdCommand));
        mgr.register(Box::new(PwdCommand));
        mgr.register(Box::new(EchoCommand));
        mgr.register(Box::new(ExportCommand));
        mgr
    }

    pub fn register(&mut self, cmd: Box<dyn BuiltinCommand>) {
        self.commands.insert(cmd.name().to_string(), cmd);
    }

    /// Runs `argv` in-process if it names a built-in or is a lone
    /// `NAME=VALUE` assignment. `None` means it is not ours to run.
    pub fn dispatch(
        &self,
        argv: &[Word<'_>],
        env: &mut dyn EnvStore,
        io: &mut Streams<'_>,
    ) -> Option<ExecStatus> {
        let (name, args) = argv.split_first()?;
        if let Some(cmd) = name.to_str().and_then(|n| self.commands.get(n)) {
            debug!(builtin = cmd.name(), "dispatch");
            return Some(cmd.run(args, env, io));
        }
        if args.is_empty() && is_assignment(name) {
            return Some(assign(name, env, io));
        }
        None
    }
}

fn is_assignment(word: &OsStr) -> bool {
    let bytes = word.as_bytes();
    bytes.contains(&b'=') && !bytes.starts_with(b"=")
}

/// Splits at the first `=`.
fn split_assignment(word: &OsStr) -> Option<(&OsStr, &OsStr)> {
    let bytes = word.as_bytes();
    let eq = bytes.iter().position(|&b| b == b'=')?;
    Some((OsStr::from_bytes(&bytes[..eq]), OsStr::from_bytes(&bytes[eq + 1..])))
}

/// Bare `NAME=VALUE`. Never touches the last status, not even on failure.
fn assign(word: &OsStr, env: &mut dyn EnvStore, io: &mut Streams<'_>) -> ExecStatus {
    if let Some((name, value)) = split_assignment(word) {
        if !value.is_empty() {
            if let Err(errno) = env.set(name, value) {
                io.report(&format_args!("variable assignment failed: {}", errno.desc()));
            }
        }
    }
    Ok(ExecOutcome::Unchanged)
}

pub struct ExitCommand {
    farewell: String,
}

impl BuiltinCommand for ExitCommand {
    fn name(&self) -> &'static str {
        "exit"
    }
    fn run(&self, _args: &[Word<'_>], _env: &mut dyn EnvStore, io: &mut Streams<'_>) -> ExecStatus {
        let _ = writeln!(io.out, "{}", self.farewell);
        Ok(ExecOutcome::Exit)
    }
}

pub struct CdCommand;

impl BuiltinCommand for CdCommand {
    fn name(&self) -> &'static str {
        "cd"
    }
    fn run(&self, args: &[Word<'_>], env: &mut dyn EnvStore, _io: &mut Streams<'_>) -> ExecStatus {
        let target: Cow<'_, OsStr> = match args.first() {
            Some(dir) => Cow::Borrowed(dir.as_ref()),
            None => Cow::Owned(env.get(OsStr::new("HOME")).ok_or(ExecError::HomeNotSet)?),
        };
        unistd::chdir(&*target).map_err(|errno| ExecError::ChangeDir {
            target: target.to_string_lossy().into_owned(),
            errno,
        })?;
        Ok(ExecOutcome::Code(0))
    }
}

pub struct PwdCommand;

impl BuiltinCommand for PwdCommand {
    fn name(&self) -> &'static str {
        "pwd"
    }
    fn run(&self, _args: &[Word<'_>], _env: &mut dyn EnvStore, io: &mut Streams<'_>) -> ExecStatus {
        let cwd = unistd::getcwd().map_err(ExecError::CurrentDir)?;
        io.out.write_all(cwd.as_os_str().as_bytes())?;
        io.out.write_all(b"\n")?;
        Ok(ExecOutcome::Code(0))
    }
}

pub struct EchoCommand;

impl BuiltinCommand for EchoCommand {
    fn name(&self) -> &'static str {
        "echo"
    }
    fn run(&self, args: &[Word<'_>], _env: &mut dyn EnvStore, io: &mut Streams<'_>) -> ExecStatus {
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                io.out.write_all(b" ")?;
            }
            io.out.write_all(arg.as_bytes())?;
        }
        io.out.write_all(b"\n")?;
        Ok(ExecOutcome::Code(0))
    }
}

pub struct ExportCommand;

impl BuiltinCommand for ExportCommand {
    fn name(&self) -> &'static str {
        "export"
    }
    fn run(&self, args: &[Word<'_>], env: &mut dyn EnvStore, _io: &mut Streams<'_>) -> ExecStatus {
        // Only the first argument is looked at.
        let (name, value) = args
            .first()
            .and_then(|arg| split_assignment(arg))
            .ok_or(ExecError::ExportMissing)?;
        if name.is_empty() || value.is_empty() {
            return Err(ExecError::ExportSyntax);
        }
        env.set(name, value).map_err(ExecError::Export)?;
        Ok(ExecOutcome::Code(0))
    }
}
