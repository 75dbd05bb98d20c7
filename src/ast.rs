use std::borrow::Cow;
use std::ffi::{OsStr, OsString};

/// One argument-vector entry: a view into the input line, or an owned
/// expansion when substitution changed the token.
pub type Word<'a> = Cow<'a, OsStr>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectKind {
    In,  // <
    Out, // >
    Err, // 2>
}

impl RedirectKind {
    pub fn from_operator(token: &[u8]) -> Option<Self> {
        match token {
            b"<" => Some(RedirectKind::In),
            b">" => Some(RedirectKind::Out),
            b"2>" => Some(RedirectKind::Err),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirection {
    pub kind: RedirectKind,
    pub target: OsString,
}

/// Everything parsed out of one input line. Dropping it releases every
/// allocation the line made.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandLine<'a> {
    pub argv: Vec<Word<'a>>,
    pub redirections: Vec<Redirection>,
}

impl CommandLine<'_> {
    pub fn name(&self) -> Option<&OsStr> {
        self.argv.first().map(|w| w.as_ref())
    }

    pub fn is_empty(&self) -> bool {
        self.argv.is_empty()
    }
}
