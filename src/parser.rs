use std::borrow::Cow;
use std::ffi::{OsStr, OsString};
use std::os::unix::ffi::{OsStrExt, OsStringExt};
use tracing::trace;

use crate::ast::{CommandLine, RedirectKind, Redirection, Word};
use crate::environment::EnvStore;
use crate::error::ParseError;
use crate::expander::Expander;

/// Separates redirections from positional arguments, expanding both.
///
/// `<`, `>` and `2>` act as operators only when a token follows them; the
/// following token (expanded) becomes the target. A trailing operator stays
/// in the argument vector as a plain word.
pub fn parse<'a>(
    tokens: &[&'a [u8]],
    expander: &Expander,
    env: &dyn EnvStore,
) -> Result<CommandLine<'a>, ParseError> {
    let mut cmd = CommandLine::default();
    let mut iter = tokens.iter().copied().peekable();

    while let Some(token) = iter.next() {
        let kind = match RedirectKind::from_operator(token) {
            Some(kind) if iter.peek().is_some() => kind,
            _ => {
                cmd.argv.push(expand_word(token, expander, env)?);
                continue;
            }
        };
        let Some(file) = iter.next() else { break };
        let target = OsString::from_vec(expander.expand(file, env)?);
        trace!(?kind, file = ?target, "redirection");
        cmd.redirections.push(Redirection { kind, target });
    }

    Ok(cmd)
}

/// Borrows the token back when expansion did not change it.
fn expand_word<'a>(
    token: &'a [u8],
    expander: &Expander,
    env: &dyn EnvStore,
) -> Result<Word<'a>, ParseError> {
    let expanded = expander.expand(token, env)?;
    if expanded == token {
        Ok(Cow::Borrowed(OsStr::from_bytes(token)))
    } else {
        Ok(Cow::Owned(OsString::from_vec(expanded)))
    }
}
