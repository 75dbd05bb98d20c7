use std::fmt;
use std::io;
use nix::errno::Errno;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpandError {
    OutOfMemory,
}

impl fmt::Display for ExpandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpandError::OutOfMemory => write!(f, "expansion failed"),
        }
    }
}

impl std::error::Error for ExpandError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    Expansion(ExpandError),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::Expansion(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ParseError::Expansion(e) => Some(e),
        }
    }
}

impl From<ExpandError> for ParseError {
    fn from(e: ExpandError) -> Self {
        ParseError::Expansion(e)
    }
}

#[derive(Debug)]
pub enum ExecError {
    ChangeDir { target: String, errno: Errno },
    HomeNotSet,
    CurrentDir(Errno),
    ExportMissing,
    ExportSyntax,
    Export(Errno),
    InvalidArgument(String),
    Fork(Errno),
    Io(io::Error),
}

impl ExecError {
    /// Whether the error ends the whole session instead of the current line.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ExecError::Fork(_))
    }
}

impl fmt::Display for ExecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecError::ChangeDir { target, errno } => write!(f, "cd: {}: {}", target, errno.desc()),
            ExecError::HomeNotSet => write!(f, "cd: HOME not set"),
            ExecError::CurrentDir(errno) => write!(f, "pwd failed: {}", errno.desc()),
            ExecError::ExportMissing => write!(f, "export: missing or invalid argument"),
            ExecError::ExportSyntax => write!(f, "export: invalid syntax"),
            ExecError::Export(errno) => write!(f, "export failed: {}", errno.desc()),
            ExecError::InvalidArgument(arg) => write!(f, "invalid argument: {:?}", arg),
            ExecError::Fork(errno) => write!(f, "fork failed: {}", errno.desc()),
            ExecError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for ExecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ExecError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ExecError {
    fn from(e: io::Error) -> Self {
        ExecError::Io(e)
    }
}
