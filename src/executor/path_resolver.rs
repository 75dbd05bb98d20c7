use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

use crate::environment::EnvStore;

/// Search path used when `PATH` is unset, as glibc's `execvp` does.
pub const DEFAULT_PATH: &str = "/bin:/usr/bin";

/// Expands a program name into the paths `execvp` would try, in order, but
/// reads `PATH` from the shell's own environment store rather than the
/// process's. Whether a candidate can actually run is left to `execve`.
pub struct PathResolver;

impl PathResolver {
    pub fn candidates(&self, command: &OsStr, env: &dyn EnvStore) -> Vec<PathBuf> {
        if command.is_empty() {
            return Vec::new();
        }
        if command.as_bytes().contains(&b'/') {
            return vec![PathBuf::from(command)];
        }

        let paths = env
            .get(OsStr::new("PATH"))
            .unwrap_or_else(|| DEFAULT_PATH.into());
        std::env::split_paths(&paths)
            .map(|dir| {
                // An empty PATH entry means the current directory.
                if dir.as_os_str().is_empty() { PathBuf::from(".").join(command) } else { dir.join(command) }
            })
            .collect()
    }
}
