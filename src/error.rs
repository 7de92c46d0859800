use crate::token::{Kind, Span};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;
use thiserror::Error;

/// Failures that stop processing of a source unit altogether. Malformed
/// source text never ends up here; it is reported through [`SyntaxError`].
#[derive(Debug, Error)]
pub enum VjassError {
    #[error("FileNotFoundError: {0}")]
    FileNotFound(String),
    #[error("IOError: {0}")]
    IO(#[from] std::io::Error),
    #[error("EncodingError: {path}: {source}")]
    Encoding {
        path: PathBuf,
        #[source]
        source: std::str::Utf8Error,
    },
    #[error("ConfigError: {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind")]
pub enum ScanError {
    #[error("unrecognized character {found:?}")]
    UnrecognizedCharacter { found: char, span: Span },
    #[error("unterminated string literal")]
    UnterminatedString { span: Span },
    #[error("unterminated block comment")]
    UnterminatedBlockComment { span: Span },
    #[error("newline in string literal")]
    UnescapedNewline { span: Span },
}

impl ScanError {
    pub fn span(&self) -> Span {
        match self {
            ScanError::UnrecognizedCharacter { span, .. }
            | ScanError::UnterminatedString { span }
            | ScanError::UnterminatedBlockComment { span }
            | ScanError::UnescapedNewline { span } => *span,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ScanError::UnrecognizedCharacter { .. } => "E0001",
            ScanError::UnterminatedString { .. } => "E0002",
            ScanError::UnterminatedBlockComment { .. } => "E0003",
            ScanError::UnescapedNewline { .. } => "E0004",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseErrorKind {
    UnexpectedToken,
    MissingCloser,
    MissingField,
    /// Expressions or blocks nested past [`crate::parser::MAX_DEPTH`].
    NestingTooDeep,
}

#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{message}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    pub span: Span,
    pub expected: BTreeSet<Kind>,
    pub found: Kind,
}

impl ParseError {
    pub fn new(
        kind: ParseErrorKind,
        message: impl Into<String>,
        span: Span,
        expected: impl IntoIterator<Item = Kind>,
        found: Kind,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
            expected: expected.into_iter().collect(),
            found,
        }
    }

    pub fn code(&self) -> &'static str {
        match self.kind {
            ParseErrorKind::UnexpectedToken => "E0101",
            ParseErrorKind::MissingCloser => "E0102",
            ParseErrorKind::MissingField => "E0103",
            ParseErrorKind::NestingTooDeep => "E0104",
        }
    }
}

/// Either half of the syntax error taxonomy, in a form diagnostics can
/// render uniformly.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(untagged)]
pub enum SyntaxError {
    #[error("{0}")]
    Scan(ScanError),
    #[error("{0}")]
    Parse(ParseError),
}

impl SyntaxError {
    pub fn span(&self) -> Span {
        match self {
            SyntaxError::Scan(err) => err.span(),
            SyntaxError::Parse(err) => err.span,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            SyntaxError::Scan(err) => err.code(),
            SyntaxError::Parse(err) => err.code(),
        }
    }
}

impl From<ScanError> for SyntaxError {
    fn from(err: ScanError) -> Self {
        SyntaxError::Scan(err)
    }
}

impl From<ParseError> for SyntaxError {
    fn from(err: ParseError) -> Self {
        SyntaxError::Parse(err)
    }
}
