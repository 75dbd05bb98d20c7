use std::io::BufRead;
use tracing::debug;

use crate::config::Config;
use crate::environment::{EnvStore, ProcessEnv};
use crate::error::ExecError;
use crate::executor::{BuiltinManager, ExecOutcome, Executor, ForkExecutor};
use crate::expander::Expander;
use crate::io::{InputHandler, ReadOutcome, Streams};
use crate::parser;
use crate::tokenizer::tokenize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOutcome {
    Continue,
    Exit,
}

/// The read-eval loop and the state it carries between lines.
pub struct Shell<E, X> {
    config: Config,
    expander: Expander,
    builtins: BuiltinManager,
    env: E,
    executor: X,
    last_status: i32,
}

impl Shell<ProcessEnv, ForkExecutor> {
    /// A shell over the real process environment that forks real children.
    pub fn interactive(config: Config) -> Self {
        Shell::new(config, ProcessEnv, ForkExecutor::new())
    }
}

impl<E: EnvStore, X: Executor> Shell<E, X> {
    pub fn new(config: Config, env: E, executor: X) -> Self {
        Shell {
            expander: Expander::from_config(&config),
            builtins: BuiltinManager::new(&config),
            config,
            env,
            executor,
            last_status: 0,
        }
    }

    pub fn last_status(&self) -> i32 {
        self.last_status
    }

    pub fn env(&self) -> &E {
        &self.env
    }

    pub fn executor(&self) -> &X {
        &self.executor
    }

    /// Reads and runs lines until end of input or `exit`, returning the
    /// status the interpreter should terminate with.
    pub fn run<R: BufRead>(&mut self, input: R, io: &mut Streams<'_>) -> i32 {
        let mut input = InputHandler::new(input);
        let mut line = Vec::new();

        loop {
            match input.read_line(&self.config.prompt, &mut *io.out, &mut line) {
                Ok(ReadOutcome::Line) => {}
                Ok(ReadOutcome::Eof) => break,
                Err(e) => {
                    debug!(error = %e, "stdin closed");
                    break;
                }
            }
            if line.is_empty() {
                continue;
            }

            match self.run_line(&line, io) {
                Ok(LineOutcome::Continue) => {}
                Ok(LineOutcome::Exit) => break,
                Err(fatal) => {
                    io.report(&fatal);
                    return 1;
                }
            }
        }

        self.last_status
    }

    /// Runs one line. Only a fatal error comes back as `Err`; every other
    /// failure is reported here and folded into the last status.
    ///
    /// Tokens, expansions and redirection targets all live in locals of this
    /// call, so they are released on whichever path returns.
    pub fn run_line(&mut self, line: &[u8], io: &mut Streams<'_>) -> Result<LineOutcome, ExecError> {
        let tokens = tokenize(line, self.config.max_tokens);
        let cmd = match parser::parse(&tokens, &self.expander, &self.env) {
            Ok(cmd) => cmd,
            Err(e) => {
                io.report(&e);
                self.last_status = 1;
                return Ok(LineOutcome::Continue);
            }
        };
        if cmd.is_empty() {
            return Ok(LineOutcome::Continue);
        }
        debug!(argv = ?cmd.argv, redirections = cmd.redirections.len(), "run");

        // A redirection sends even a built-in name to the external path.
        let handled = if cmd.redirections.is_empty() {
            self.builtins.dispatch(&cmd.argv, &mut self.env, io)
        } else {
            None
        };
        let status = match handled {
            Some(status) => status,
            None => {
                let _ = io.out.flush();
                self.executor.exec(&cmd, &self.env)
            }
        };

        match status {
            Ok(ExecOutcome::Code(code)) => self.last_status = code,
            Ok(ExecOutcome::Unchanged) => {}
            Ok(ExecOutcome::Exit) => return Ok(LineOutcome::Exit),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                io.report(&e);
                self.last_status = 1;
            }
        }
        Ok(LineOutcome::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsStr;
    use std::io::Cursor;
    use std::os::unix::ffi::OsStrExt;
    use nix::errno::Errno;
    use crate::ast::{CommandLine, RedirectKind};
    use crate::environment::Environment;
    use crate::executor::ExecStatus;
    use crate::executor::tests::MockExecutor;

    struct Session {
        status: i32,
        out: String,
        err: String,
        shell: Shell<Environment, MockExecutor>,
    }

    fn session_in(config: Config, script: &[u8], executor: MockExecutor) -> Session {
        let env: Environment = [("HOME", "/root")].into_iter().collect();
        let mut shell = Shell::new(config, env, executor);
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let status = shell.run(Cursor::new(script), &mut Streams::new(&mut out, &mut err));
        Session {
            status,
            out: String::from_utf8(out).unwrap(),
            err: String::from_utf8(err).unwrap(),
            shell,
        }
    }

    fn session_with(script: &[u8], executor: MockExecutor) -> Session {
        session_in(Config::default(), script, executor)
    }

    fn session(script: &str) -> Session {
        session_with(script.as_bytes(), MockExecutor::new())
    }

    #[test]
    fn test_echo_and_exit() {
        let s = session("echo a b c\nexit\necho never\n");
        assert_eq!(s.status, 0);
        assert_eq!(
            s.out,
            "micro shell prompt > a b c\nmicro shell prompt > Good Bye\n"
        );
        assert!(s.err.is_empty());
    }

    #[test]
    fn test_exit_keeps_previous_status() {
        let s = session("export\nexit\n");
        assert_eq!(s.status, 1);
        assert_eq!(s.err, "export: missing or invalid argument\n");
    }

    #[test]
    fn test_eof_returns_last_status() {
        let s = session_with(b"false\n", MockExecutor::with_code(3));
        assert_eq!(s.status, 3);
        assert_eq!(s.shell.executor().last_argv(), Some(vec!["false".to_string()]));
    }

    #[test]
    fn test_redirection_routes_builtin_to_executor() {
        let s = session("pwd > out.txt\n");
        let calls = &s.shell.executor().calls;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, vec!["pwd"]);
        assert_eq!(calls[0].1[0].kind, RedirectKind::Out);
        assert_eq!(calls[0].1[0].target, "out.txt");
        assert_eq!(s.out, "micro shell prompt > micro shell prompt > ");
    }

    #[test]
    fn test_lone_operator_is_run_as_a_command() {
        let s = session(">\n");
        assert_eq!(s.shell.executor().last_argv(), Some(vec![">".to_string()]));
    }

    #[test]
    fn test_only_redirections_runs_nothing() {
        let s = session_with(b"> out.txt\n", MockExecutor::with_code(9));
        assert!(s.shell.executor().calls.is_empty());
        assert_eq!(s.status, 0);
    }

    #[test]
    fn test_bare_assignment_keeps_status() {
        let s = session("cd /nonexistent\nFOO=bar\necho $FOO\n");
        assert_eq!(s.shell.env().get(OsStr::new("FOO")).as_deref(), Some(OsStr::new("bar")));
        assert!(s.out.ends_with("bar\nmicro shell prompt > "));
        assert_eq!(s.status, 0);

        let s = session("cd /nonexistent\nFOO=bar\n");
        assert_eq!(s.status, 1);
        assert_eq!(s.err, "cd: /nonexistent: No such file or directory\n");
    }

    #[test]
    fn test_blank_lines_do_nothing() {
        let s = session_with(b"\n    \n", MockExecutor::with_code(5));
        assert!(s.shell.executor().calls.is_empty());
        assert_eq!(s.status, 0);
        assert!(s.err.is_empty());
    }

    #[test]
    fn test_expansion_reaches_executor() {
        let s = session("ls $HOME/x > $HOME/out\n");
        let (argv, redirections) = &s.shell.executor().calls[0];
        assert_eq!(argv, &vec!["ls", "/root/x"]);
        assert_eq!(redirections[0].target, "/root/out");
    }

    #[test]
    fn test_non_utf8_line_reaches_executor_unchanged() {
        let s = session_with(b"touch caf\xe9.txt\n", MockExecutor::new());
        assert_eq!(s.status, 0);
        assert!(s.err.is_empty());
        let (argv, _) = &s.shell.executor().calls[0];
        assert_eq!(argv[1].as_bytes(), b"caf\xe9.txt");
    }

    #[test]
    fn test_expansion_failure_skips_line_and_continues() {
        let config = Config { expand_capacity: usize::MAX, ..Config::default() };
        let s = session_in(config, b"ls\nls -l\n", MockExecutor::with_code(7));
        assert_eq!(s.err, "expansion failed\nexpansion failed\n");
        assert!(s.shell.executor().calls.is_empty());
        assert_eq!(s.status, 1);
    }

    struct ForkFails;

    impl Executor for ForkFails {
        fn exec(&mut self, _cmd: &CommandLine<'_>, _env: &dyn EnvStore) -> ExecStatus {
            Err(ExecError::Fork(Errno::EAGAIN))
        }
    }

    #[test]
    fn test_fork_failure_ends_session() {
        let mut shell = Shell::new(Config::default(), Environment::empty(), ForkFails);
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let script = Cursor::new("ls\necho after\n");
        let status = shell.run(script, &mut Streams::new(&mut out, &mut err));
        assert_eq!(status, 1);
        assert!(String::from_utf8(err).unwrap().starts_with("fork failed: "));
        assert!(!String::from_utf8(out).unwrap().contains("after"));
    }

    #[test]
    fn test_non_fatal_exec_error_continues() {
        let mut shell = Shell::new(Config::default(), Environment::empty(), ForkExecutor::new());
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let mut io = Streams::new(&mut out, &mut err);
        let outcome = shell.run_line(b"no-such-cmd > bad\0name", &mut io).unwrap();
        assert_eq!(outcome, LineOutcome::Continue);
        assert_eq!(shell.last_status(), 1);
    }
}
