//! Error types for docmodel

use std::fmt;
use thiserror::Error;

/// Position in source text
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pos {
    pub offset: usize,
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl Pos {
    pub const fn new(offset: usize, line: u32, col: u32) -> Self {
        Self { offset, line, col }
    }
}

/// Span representing a range in source text
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Span {
    pub start: Pos,
    pub end: Pos,
}

impl Span {
    pub const fn new(start: Pos, end: Pos) -> Self {
        Self { start, end }
    }

    pub const fn point(pos: Pos) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub const fn empty() -> Self {
        Self {
            start: Pos::new(0, 0, 0),
            end: Pos::new(0, 0, 0),
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.start.line == 0 && self.end.line == 0
    }
}

/// Error kind for detailed categorization
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Input is not well-formed XML
    MalformedDocument,
    MaxDepthExceeded { max: usize },
    MaxSizeExceeded { max: usize },
    /// A path did not resolve to anything
    PathNotFound { path: String },
    /// A path resolved, but not to a list
    NotAList { path: String },
    /// A condition matched no element of the addressed list
    NoMatch { path: String },
    /// Caller passed an argument outside the accepted domain
    InvalidArgument,
}

impl ErrorKind {
    /// Parse family: the input text cannot become a tree
    pub const fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::MalformedDocument | Self::MaxDepthExceeded { .. } | Self::MaxSizeExceeded { .. }
        )
    }

    /// Path family: expected outcomes the caller may treat as a no-op
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::PathNotFound { .. } | Self::NotAList { .. } | Self::NoMatch { .. }
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MalformedDocument => write!(f, "malformed document"),
            Self::MaxDepthExceeded { max } => write!(f, "max depth exceeded: {max}"),
            Self::MaxSizeExceeded { max } => write!(f, "max size exceeded: {max}"),
            Self::PathNotFound { path } => write!(f, "path not found: {path}"),
            Self::NotAList { path } => write!(f, "path does not address a list: {path}"),
            Self::NoMatch { path } => write!(f, "no element matched under: {path}"),
            Self::InvalidArgument => write!(f, "invalid argument"),
        }
    }
}

/// Main error type for docmodel
#[derive(Error, Clone, Debug, PartialEq)]
pub struct Error {
    kind: ErrorKind,
    span: Span,
    message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, span: Span) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            span,
            message,
        }
    }

    pub fn with_message(kind: ErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }

    /// Malformed-document error at a source position
    pub fn malformed(pos: Pos, message: impl Into<String>) -> Self {
        Self::with_message(ErrorKind::MalformedDocument, Span::point(pos), message)
    }

    pub fn path_not_found(path: &str) -> Self {
        Self::new(
            ErrorKind::PathNotFound {
                path: path.to_string(),
            },
            Span::empty(),
        )
    }

    pub fn not_a_list(path: &str) -> Self {
        Self::new(
            ErrorKind::NotAList {
                path: path.to_string(),
            },
            Span::empty(),
        )
    }

    pub fn no_match(path: &str) -> Self {
        Self::new(
            ErrorKind::NoMatch {
                path: path.to_string(),
            },
            Span::empty(),
        )
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::with_message(ErrorKind::InvalidArgument, Span::empty(), message)
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.span.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "error at {}: {}", self.span.start, self.message)
        }
    }
}

/// Result type alias for docmodel
pub type Result<T> = std::result::Result<T, Error>;
