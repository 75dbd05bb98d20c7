use std::collections::HashMap;
use std::ffi::{CString, OsStr, OsString};
use std::os::unix::ffi::OsStrExt;
use nix::errno::Errno;

/// Key/value store consulted by expansion, `cd`, and the launcher, and
/// mutated by `export` and bare assignments. Names and values are raw bytes.
pub trait EnvStore {
    fn get(&self, key: &OsStr) -> Option<OsString>;

    /// Overwrites `key`. Rejects what `setenv(3)` would reject with `EINVAL`.
    fn set(&mut self, key: &OsStr, value: &OsStr) -> Result<(), Errno>;

    /// `NAME=VALUE` entries handed to a child at creation time.
    fn snapshot(&self) -> Vec<CString>;
}

fn valid_key(key: &OsStr) -> bool {
    let key = key.as_bytes();
    !key.is_empty() && !key.contains(&b'=') && !key.contains(&0)
}

fn validate(key: &OsStr, value: &OsStr) -> Result<(), Errno> {
    if !valid_key(key) || value.as_bytes().contains(&0) {
        return Err(Errno::EINVAL);
    }
    Ok(())
}

fn entry(key: &OsStr, value: &OsStr) -> Option<CString> {
    let mut bytes = Vec::with_capacity(key.len() + value.len() + 1);
    bytes.extend_from_slice(key.as_bytes());
    bytes.push(b'=');
    bytes.extend_from_slice(value.as_bytes());
    CString::new(bytes).ok()
}

/// The real process environment. There is one per running shell.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvStore for ProcessEnv {
    fn get(&self, key: &OsStr) -> Option<OsString> {
        if !valid_key(key) {
            return None;
        }
        std::env::var_os(key)
    }

    fn set(&mut self, key: &OsStr, value: &OsStr) -> Result<(), Errno> {
        validate(key, value)?;
        // SAFETY: the interpreter runs a single thread of control.
        unsafe { std::env::set_var(key, value) };
        Ok(())
    }

    fn snapshot(&self) -> Vec<CString> {
        std::env::vars_os()
            .filter_map(|(k, v)| entry(&k, &v))
            .collect()
    }
}

/// In-memory environment table.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Environment {
    vars: HashMap<OsString, OsString>,
}

impl Environment {
    pub fn empty() -> Self {
        Environment {
            vars: HashMap::new(),
        }
    }
}

impl<K: Into<OsString>, V: Into<OsString>> FromIterator<(K, V)> for Environment {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Environment {
            vars: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl EnvStore for Environment {
    fn get(&self, key: &OsStr) -> Option<OsString> {
        self.vars.get(key).cloned()
    }

    fn set(&mut self, key: &OsStr, value: &OsStr) -> Result<(), Errno> {
        validate(key, value)?;
        match self.vars.get_mut(key) {
            Some(existing) => {
                existing.clear();
                existing.push(value);
            }
            None => {
                self.vars.insert(key.to_owned(), value.to_owned());
            }
        }
        Ok(())
    }

    fn snapshot(&self) -> Vec<CString> {
        self.vars
            .iter()
            .filter_map(|(k, v)| entry(k, v))
            .collect()
    }
}
