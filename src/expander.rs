use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;

use crate::config::{Config, EXPAND_CAPACITY, VAR_NAME_MAX};
use crate::environment::EnvStore;
use crate::error::ExpandError;

/// Substitutes `$NAME` references against an [`EnvStore`].
///
/// The result never exceeds `capacity` bytes; whatever would land past that
/// bound is dropped without an error. Values are inserted as-is and are not
/// expanded again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Expander {
    capacity: usize,
    name_max: usize,
}

impl Default for Expander {
    fn default() -> Self {
        Expander::new(EXPAND_CAPACITY, VAR_NAME_MAX)
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

impl Expander {
    pub fn new(capacity: usize, name_max: usize) -> Self {
        Expander { capacity, name_max }
    }

    pub fn from_config(config: &Config) -> Self {
        Expander::new(config.expand_capacity, config.var_name_max)
    }

    pub fn expand(&self, text: &[u8], env: &dyn EnvStore) -> Result<Vec<u8>, ExpandError> {
        let mut out = Vec::new();
        out.try_reserve_exact(self.capacity)
            .map_err(|_| ExpandError::OutOfMemory)?;

        let mut pos = 0;
        while pos < text.len() && out.len() < self.capacity {
            if text[pos] == b'$' && text.get(pos + 1).copied().is_some_and(is_name_byte) {
                let start = pos + 1;
                let mut end = start;
                while end < text.len() && end - start < self.name_max && is_name_byte(text[end]) {
                    end += 1;
                }
                if let Some(value) = env.get(OsStr::from_bytes(&text[start..end])) {
                    self.push_bounded(&mut out, value.as_bytes());
                }
                pos = end;
            } else {
                out.push(text[pos]);
                pos += 1;
            }
        }
        // Only the bytes actually produced outlive the call.
        out.shrink_to_fit();
        Ok(out)
    }

    /// Appends as much of `s` as fits.
    fn push_bounded(&self, out: &mut Vec<u8>, s: &[u8]) {
        let room = self.capacity.saturating_sub(out.len());
        out.extend_from_slice(&s[..s.len().min(room)]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;

    fn env() -> Environment {
        [("HOME", "/root"), ("USER", "alice"), ("LOOP", "$HOME"), ("_X1", "y")]
            .into_iter()
            .collect()
    }

    fn expand_with(expander: Expander, text: &str, env: &Environment) -> String {
        String::from_utf8(expander.expand(text.as_bytes(), env).unwrap()).unwrap()
    }

    fn expand(text: &str) -> String {
        expand_with(Expander::default(), text, &env())
    }

    #[test]
    fn test_identity_without_dollar() {
        for text in ["", "ls", "-la /tmp", "a=b", "unicode é ß"] {
            assert_eq!(expand(text), text);
        }
    }

    #[test]
    fn test_home_prefix() {
        assert_eq!(expand("$HOME/x"), "/root/x");
    }

    #[test]
    fn test_unset_is_empty() {
        assert_eq!(expand("a$NOPE-b"), "a-b");
        assert_eq!(expand("$NOPE"), "");
    }

    #[test]
    fn test_name_is_maximal_run() {
        assert_eq!(expand("$USER_x"), "");
        assert_eq!(expand("$USER.x"), "alice.x");
        assert_eq!(expand("$HOME$USER"), "/rootalice");
        assert_eq!(expand("$_X1"), "y");
    }

    #[test]
    fn test_lone_dollar_is_literal() {
        assert_eq!(expand("$"), "$");
        assert_eq!(expand("cost: $ 5"), "cost: $ 5");
        assert_eq!(expand("$-x"), "$-x");
        assert_eq!(expand("$$"), "$$");
    }

    #[test]
    fn test_value_is_not_reexpanded() {
        assert_eq!(expand("$LOOP"), "$HOME");
    }

    #[test]
    fn test_output_is_truncated_at_capacity() {
        let expander = Expander::new(8, VAR_NAME_MAX);
        let env = env();
        assert_eq!(expand_with(expander, "0123456789", &env), "01234567");
        assert_eq!(expand_with(expander, "ab$HOME/tail", &env), "ab/root/");
        assert_eq!(expand_with(expander, "$USER$USER", &env), "aliceali");
    }

    #[test]
    fn test_non_utf8_bytes_are_kept() {
        let env: Environment = [("V", std::ffi::OsStr::from_bytes(b"\xe9t\xe9"))].into_iter().collect();
        let out = Expander::default().expand(b"caf\xe9-$V", &env).unwrap();
        assert_eq!(out, b"caf\xe9-\xe9t\xe9");
    }

    #[test]
    fn test_default_capacity_bound() {
        let long = "x".repeat(EXPAND_CAPACITY + 100);
        assert_eq!(expand(&long).len(), EXPAND_CAPACITY);
    }

    #[test]
    fn test_result_does_not_keep_the_reservation() {
        let out = Expander::default().expand(b"$HOME", &env()).unwrap();
        assert_eq!(out, b"/root");
        assert!(out.capacity() < EXPAND_CAPACITY);
    }

    #[test]
    fn test_unreservable_capacity_fails() {
        let expander = Expander::new(usize::MAX, VAR_NAME_MAX);
        assert_eq!(expander.expand(b"ls", &env()), Err(ExpandError::OutOfMemory));
    }

    #[test]
    fn test_name_length_is_bounded() {
        let expander = Expander::new(EXPAND_CAPACITY, 3);
        let env: Environment = [("ABC", "v")].into_iter().collect();
        assert_eq!(expand_with(expander, "$ABCD", &env), "vD");
    }
}
