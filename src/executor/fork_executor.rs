use std::ffi::{CStr, CString, OsStr};
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use nix::errno::Errno;
use nix::fcntl::{self, OFlag};
use nix::sys::stat::Mode;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{self, ForkResult, Pid};
use tracing::{debug, warn};

use crate::ast::{CommandLine, RedirectKind};
use crate::environment::EnvStore;
use crate::executor::{ Executor, ExecStatus, ExecOutcome, ExecError };
use super::path_resolver::PathResolver;

/// Exit code of a child whose program could not be run.
pub const EXIT_NOT_FOUND: i32 = 127;
/// Exit code of a child whose redirection could not be set up.
pub const EXIT_REDIRECT_FAILED: i32 = 1;

/// Interpreter for executables the kernel refuses with `ENOEXEC`.
const SCRIPT_SHELL: &CStr = c"/bin/sh";

/// Launches external commands with fork + execve and waits for them.
pub struct ForkExecutor {
    resolver: PathResolver,
}

impl ForkExecutor {
    pub fn new() -> Self {
        ForkExecutor { resolver: PathResolver }
    }
}

impl Default for ForkExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl Executor for ForkExecutor {
    fn exec(&mut self, cmd: &CommandLine<'_>, env: &dyn EnvStore) -> ExecStatus {
        if cmd.is_empty() {
            return Ok(ExecOutcome::Unchanged);
        }
        // Everything the child needs is allocated here, before the fork.
        let plan = LaunchPlan::prepare(cmd, env, &self.resolver)?;
        debug!(argv = ?cmd.argv, candidates = plan.programs.len(), redirections = plan.bindings.len(), "fork");

        // SAFETY: the shell is single-threaded, and the child only opens,
        // duplicates and closes descriptors, writes to fd 2, and execs or exits.
        match unsafe { unistd::fork() } {
            Ok(ForkResult::Parent { child }) => Ok(ExecOutcome::Code(wait_for(child))),
            Ok(ForkResult::Child) => plan.run_child(),
            Err(errno) => Err(ExecError::Fork(errno)),
        }
    }
}

fn wait_for(child: Pid) -> i32 {
    loop {
        match waitpid(child, None) {
            Ok(WaitStatus::Exited(_, code)) => return code,
            Ok(status) => {
                debug!(?status, "child did not exit normally");
                return 1;
            }
            Err(Errno::EINTR) => continue,
            Err(errno) => {
                warn!(%errno, %child, "waitpid failed");
                return 1;
            }
        }
    }
}

/// NUL-terminated pointer array over owned C strings, for `execve`.
struct CStringVec {
    strings: Vec<CString>,
    ptrs: Vec<*const libc::c_char>,
}

impl CStringVec {
    fn new(strings: Vec<CString>) -> Self {
        let mut ptrs: Vec<*const libc::c_char> = strings.iter().map(|s| s.as_ptr()).collect();
        ptrs.push(std::ptr::null());
        CStringVec { strings, ptrs }
    }

    fn as_ptr(&self) -> *const *const libc::c_char {
        self.ptrs.as_ptr()
    }

    fn first(&self) -> &CStr {
        match self.strings.first() {
            Some(s) => s.as_c_str(),
            None => c"",
        }
    }
}

fn c_string(text: &OsStr) -> Result<CString, ExecError> {
    CString::new(text.as_bytes()).map_err(|_| ExecError::InvalidArgument(text.to_string_lossy().into_owned()))
}

/// One descriptor binding applied in the child.
struct Binding {
    kind: RedirectKind,
    target: CString,
}

impl Binding {
    fn stream(&self) -> libc::c_int {
        match self.kind {
            RedirectKind::In => libc::STDIN_FILENO,
            RedirectKind::Out => libc::STDOUT_FILENO,
            RedirectKind::Err => libc::STDERR_FILENO,
        }
    }

    fn flags(&self) -> OFlag {
        match self.kind {
            RedirectKind::In => OFlag::O_RDONLY,
            RedirectKind::Out | RedirectKind::Err => OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
        }
    }

    /// Opens the target and binds it over the standard stream. Reports the
    /// failure on fd 2 itself.
    fn apply(&self) -> Result<(), Errno> {
        let mode = Mode::S_IRUSR | Mode::S_IWUSR | Mode::S_IRGRP | Mode::S_IROTH;
        let fd = fcntl::open(self.target.as_c_str(), self.flags(), mode).map_err(|errno| {
            self.report(errno, false);
            errno
        })?;
        let stream = self.stream();
        if let Err(errno) = unistd::dup2(fd, stream) {
            self.report(errno, true);
            let _ = unistd::close(fd);
            return Err(errno);
        }
        if fd != stream {
            let _ = unistd::close(fd);
        }
        Ok(())
    }

    fn report(&self, errno: Errno, binding: bool) {
        let target = self.target.as_bytes();
        let desc = errno.desc().as_bytes();
        match (self.kind, binding) {
            (RedirectKind::In, _) => write_stderr(&[b"cannot access ", target, b": ", desc, b"\n"]),
            (RedirectKind::Out, false) => write_stderr(&[target, b": ", desc, b"\n"]),
            (RedirectKind::Out, true) => write_stderr(&[b"dup2 failed for stdout: ", desc, b"\n"]),
            (RedirectKind::Err, _) => write_stderr(&[b"cannot create ", target, b": ", desc, b"\n"]),
        }
    }
}

/// Writes straight to fd 2 without allocating; usable between fork and exec.
fn write_stderr(parts: &[&[u8]]) {
    for part in parts {
        let mut rest = *part;
        while !rest.is_empty() {
            // SAFETY: `rest` is a valid, initialised byte slice.
            let n = unsafe { libc::write(libc::STDERR_FILENO, rest.as_ptr().cast(), rest.len()) };
            if n < 0 {
                if Errno::last() == Errno::EINTR {
                    continue;
                }
                return;
            }
            rest = &rest[n as usize..];
        }
    }
}

/// Ends the forked child without running the parent's exit handlers.
fn child_exit(code: i32) -> ! {
    // SAFETY: `_exit` is async-signal-safe and touches no shared state.
    unsafe { libc::_exit(code) }
}

struct LaunchPlan {
    programs: Vec<CString>,
    argv: CStringVec,
    /// `sh <program> args...`; slot 1 is filled in by the child.
    script_argv: Vec<*const libc::c_char>,
    envp: CStringVec,
    bindings: Vec<Binding>,
}

impl LaunchPlan {
    fn prepare(cmd: &CommandLine<'_>, env: &dyn EnvStore, resolver: &PathResolver) -> Result<Self, ExecError> {
        let argv = cmd
            .argv
            .iter()
            .map(|word| c_string(word))
            .collect::<Result<Vec<_>, _>>()?;
        let bindings = cmd
            .redirections
            .iter()
            .map(|r| c_string(&r.target).map(|target| Binding { kind: r.kind, target }))
            .collect::<Result<Vec<_>, _>>()?;
        let programs = cmd
            .name()
            .map(|name| resolver.candidates(name, env))
            .unwrap_or_default()
            .into_iter()
            .filter_map(|path| CString::new(path.into_os_string().into_vec()).ok())
            .collect();

        let argv = CStringVec::new(argv);
        let mut script_argv = Vec::with_capacity(argv.ptrs.len() + 1);
        script_argv.push(SCRIPT_SHELL.as_ptr());
        script_argv.push(std::ptr::null());
        script_argv.extend_from_slice(&argv.ptrs[1..]);

        Ok(LaunchPlan {
            programs,
            argv,
            script_argv,
            envp: CStringVec::new(env.snapshot()),
            bindings,
        })
    }

    /// Runs in the forked child. Later bindings of the same stream replace
    /// earlier ones because they are applied in order.
    ///
    /// Candidates are tried like `execvp` does: a missing or inaccessible one
    /// moves on to the next, and one the kernel cannot execute is handed to
    /// `/bin/sh` as a script.
    fn run_child(mut self) -> ! {
        for binding in &self.bindings {
            if binding.apply().is_err() {
                child_exit(EXIT_REDIRECT_FAILED);
            }
        }
        for program in &self.programs {
            // SAFETY: every pointer array is NUL-terminated and outlives the call.
            unsafe { libc::execve(program.as_ptr(), self.argv.as_ptr(), self.envp.as_ptr()) };
            match Errno::last() {
                Errno::ENOEXEC => {
                    self.script_argv[1] = program.as_ptr();
                    // SAFETY: as above; slot 1 now points at `program`.
                    unsafe { libc::execve(SCRIPT_SHELL.as_ptr(), self.script_argv.as_ptr(), self.envp.as_ptr()) };
                    break;
                }
                Errno::EACCES | Errno::ENOENT | Errno::ENOTDIR | Errno::ESTALE | Errno::ENODEV | Errno::ETIMEDOUT => {}
                _ => break,
            }
        }
        write_stderr(&[self.argv.first().to_bytes(), b": command not found\n"]);
        child_exit(EXIT_NOT_FOUND)
    }
}
