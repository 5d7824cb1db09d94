//! Error types for fstree-core

use std::fmt;
use std::num::ParseIntError;
use std::path::PathBuf;
use thiserror::Error;

/// Core error types for the fstree library
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Filesystem operation failed on a specific path
    #[error("IO error at {path:?}: {source}")]
    Fs {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Tree descriptor could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Invalid node path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// A diff root is missing or is not a directory
    #[error("Cannot use {path:?} as a diff root: {reason}")]
    RootAccess { path: PathBuf, reason: String },

    /// A diff was requested without any rank functions
    #[error("Rank chain must contain at least one rank")]
    EmptyRankChain,

    /// A rank name did not match any known rank
    #[error("Unknown rank: {0}")]
    UnknownRank(String),

    /// Configuration-related error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Directory enumeration failed
    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),
}

impl Error {
    /// Wraps an I/O error together with the path it occurred on
    pub fn fs(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Fs {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A descriptor line that failed to parse
#[derive(Error, Debug)]
#[error("line {line}: {kind} in {text:?}")]
pub struct ParseError {
    /// 1-based line number within the descriptor
    pub line: usize,
    /// The raw line as it appeared in the input
    pub text: String,
    /// What went wrong
    #[source]
    pub kind: ParseErrorKind,
}

/// Reasons a descriptor line can be rejected
#[derive(Error, Debug)]
pub enum ParseErrorKind {
    #[error("missing {0} field")]
    MissingField(&'static str),

    #[error("invalid timestamp")]
    Timestamp(#[source] chrono::ParseError),

    #[error("mode {0:?} is not an octal number")]
    NotOctal(String),

    #[error("invalid octal mode")]
    Mode(#[source] ParseIntError),

    #[error("mode {0:o} exceeds 7777")]
    ModeRange(u32),

    #[error("unterminated quote")]
    UnterminatedQuote,

    #[error("invalid escape {0}")]
    Escape(EscapeSeq),

    #[error("unexpected text after quoted {0}")]
    Trailing(&'static str),

    #[error("empty path")]
    EmptyPath,

    #[error("path is not valid UTF-8")]
    NonUtf8Path,
}

/// The offending escape sequence, kept for error messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscapeSeq(pub String);

impl fmt::Display for EscapeSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\\{}", self.0)
    }
}
