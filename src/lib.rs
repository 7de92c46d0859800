//! Error-tolerant parser for vJASS source.
//!
//! [`parse`] runs the [`lexer::Lexer`] and [`parser::Parser`] over one source
//! unit and always returns a [`syntax::SyntaxNode`] tree, along with whatever
//! scan and parse errors were found on the way.

pub mod analysis;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod syntax;
pub mod token;

use crate::error::{ParseError, ScanError, SyntaxError};
use crate::lexer::Lexer;
use crate::parser::Parser;
use crate::syntax::SyntaxNode;
use serde::Serialize;

/// Result of parsing one source unit.
#[derive(Debug, Clone, Serialize)]
pub struct Parse {
    pub tree: SyntaxNode,
    pub scan_errors: Vec<ScanError>,
    pub parse_errors: Vec<ParseError>,
}

impl Parse {
    pub fn has_errors(&self) -> bool {
        !self.scan_errors.is_empty() || !self.parse_errors.is_empty()
    }

    /// Scan and parse errors merged, ordered by source offset.
    pub fn errors(&self) -> Vec<SyntaxError> {
        let mut errors: Vec<SyntaxError> = self
            .scan_errors
            .iter()
            .cloned()
            .map(SyntaxError::from)
            .chain(self.parse_errors.iter().cloned().map(SyntaxError::from))
            .collect();
        errors.sort_by_key(|err| err.span().start.offset);
        errors
    }
}

pub fn parse(source: &str) -> Parse {
    let mut lexer = Lexer::new(source);
    let (tree, parse_errors) = Parser::new(lexer.by_ref()).parse();
    Parse {
        tree,
        scan_errors: lexer.into_errors(),
        parse_errors,
    }
}

/// Like [`parse`], for raw bytes. Text that is not UTF-8 is the one input
/// rejected outright.
pub fn parse_bytes(bytes: &[u8]) -> Result<Parse, std::str::Utf8Error> {
    std::str::from_utf8(bytes).map(parse)
}
