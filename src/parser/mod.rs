//! Error-tolerant recursive-descent parser.
//!
//! Statements and blocks live in [`statements`], the precedence-climbing
//! expression engine in [`expressions`]. Both share the token cursor and
//! the recovery helpers defined here.

mod expressions;
mod statements;

use crate::error::{ParseError, ParseErrorKind};
use crate::syntax::{Field, NodeBuilder, NodeKind, SyntaxElement, SyntaxNode};
use crate::token::{Kind, Position, Span, Token};
use expressions::is_prefix_operator;
use std::collections::VecDeque;

/// Deepest nesting of expressions and blocks the parser descends into.
/// Input nested further is kept as a flat `ERROR` node.
pub const MAX_DEPTH: usize = 100;

/// A significant token together with the comments that precede it.
struct Lookahead {
    trivia: Vec<SyntaxElement>,
    token: Token,
}

pub struct Parser<I: Iterator<Item = Token>> {
    tokens: I,
    lookahead: VecDeque<Lookahead>,
    /// Trivia of a token that was taken as a bare element and not yet
    /// attached to a node.
    pending_trivia: Vec<SyntaxElement>,
    errors: Vec<ParseError>,
    /// Closing keywords of every block currently open, innermost last.
    open_closers: Vec<Kind>,
    last_end: Position,
    eof: Option<Token>,
    /// Current nesting of `parse_binding` and `parse_body` calls.
    depth: usize,
}

impl<I: Iterator<Item = Token>> Parser<I> {
    pub fn new(tokens: I) -> Self {
        Self {
            tokens,
            lookahead: VecDeque::new(),
            pending_trivia: Vec::new(),
            errors: Vec::new(),
            open_closers: Vec::new(),
            last_end: Position::default(),
            eof: None,
            depth: 0,
        }
    }

    /// Parses the whole stream. Always yields a tree; problems are reported
    /// alongside it.
    pub fn parse(mut self) -> (SyntaxNode, Vec<ParseError>) {
        let program = self.parse_program();
        (program, self.errors)
    }

    fn next_raw(&mut self) -> Token {
        if let Some(eof) = &self.eof {
            return eof.clone();
        }
        match self.tokens.next() {
            Some(token) => {
                if token.kind == Kind::Eof {
                    self.eof = Some(token.clone());
                }
                token
            }
            None => {
                let eof = Token::new(Kind::Eof, "", Span::empty(self.last_end));
                self.eof = Some(eof.clone());
                eof
            }
        }
    }

    /// Pulls the next significant token, folding comments into trivia.
    fn pull(&mut self) -> Lookahead {
        let mut trivia = Vec::new();
        let mut raw = self.next_raw();
        loop {
            match raw.kind {
                Kind::LineComment => {
                    trivia.push(SyntaxElement::Token(raw));
                    raw = self.next_raw();
                }
                Kind::BlockCommentStart => {
                    let mut comment = NodeBuilder::new(NodeKind::BlockComment);
                    let start = raw.span.start;
                    comment.push_field(Field::Start, SyntaxElement::Token(raw));
                    raw = self.next_raw();
                    if raw.kind == Kind::BlockCommentContent {
                        comment.push_field(Field::Content, SyntaxElement::Token(raw));
                        raw = self.next_raw();
                    }
                    if raw.kind == Kind::BlockCommentEnd {
                        comment.push_field(Field::End, SyntaxElement::Token(raw));
                        raw = self.next_raw();
                    }
                    trivia.push(SyntaxElement::Node(comment.finish(start)));
                }
                Kind::BlockCommentContent | Kind::BlockCommentEnd => {
                    trivia.push(SyntaxElement::Token(raw));
                    raw = self.next_raw();
                }
                _ => return Lookahead { trivia, token: raw },
            }
        }
    }

    fn fill(&mut self, n: usize) {
        while self.lookahead.len() <= n {
            let next = self.pull();
            self.lookahead.push_back(next);
        }
    }

    pub(crate) fn nth(&mut self, n: usize) -> Kind {
        self.fill(n);
        self.lookahead[n].token.kind
    }

    pub(crate) fn at(&mut self) -> Kind {
        self.nth(0)
    }

    pub(crate) fn current(&mut self) -> &Token {
        self.fill(0);
        &self.lookahead[0].token
    }

    fn current_span(&mut self) -> Span {
        self.current().span
    }

    /// Removes the current token. `Eof` is never consumed.
    fn take(&mut self) -> Option<Lookahead> {
        if self.at() == Kind::Eof {
            return None;
        }
        let next = self.lookahead.pop_front()?;
        self.last_end = next.token.span.end;
        Some(next)
    }

    fn flush_trivia(&mut self, node: &mut NodeBuilder) {
        for trivia in self.pending_trivia.drain(..) {
            node.push(trivia);
        }
    }

    /// Attaches an already-built element, preceded by any trivia still
    /// waiting for a home.
    pub(crate) fn attach(&mut self, node: &mut NodeBuilder, field: Option<Field>, element: SyntaxElement) {
        self.flush_trivia(node);
        match field {
            Some(field) => node.push_field(field, element),
            None => node.push(element),
        }
    }

    pub(crate) fn bump(&mut self, node: &mut NodeBuilder) {
        self.bump_into(node, None);
    }

    pub(crate) fn bump_field(&mut self, node: &mut NodeBuilder, field: Field) {
        self.bump_into(node, Some(field));
    }

    fn bump_into(&mut self, node: &mut NodeBuilder, field: Option<Field>) {
        self.flush_trivia(node);
        if let Some(Lookahead { trivia, token }) = self.take() {
            for element in trivia {
                node.push(element);
            }
            match field {
                Some(field) => node.push_field(field, SyntaxElement::Token(token)),
                None => node.push(SyntaxElement::Token(token)),
            }
        }
    }

    /// Takes the current token as a standalone element. Its leading trivia
    /// is held back until the element is attached somewhere.
    pub(crate) fn bump_element(&mut self) -> SyntaxElement {
        match self.take() {
            Some(Lookahead { trivia, token }) => {
                self.pending_trivia.extend(trivia);
                SyntaxElement::Token(token)
            }
            None => self.missing(Kind::Eof),
        }
    }

    pub(crate) fn eat(&mut self, node: &mut NodeBuilder, kind: Kind) -> bool {
        if self.at() == kind {
            self.bump(node);
            true
        } else {
            false
        }
    }

    pub(crate) fn missing(&self, kind: Kind) -> SyntaxElement {
        SyntaxElement::Missing {
            kind,
            position: self.last_end,
        }
    }

    pub(crate) fn finish(&mut self, node: NodeBuilder) -> SyntaxNode {
        node.finish(self.last_end)
    }

    pub(crate) fn error(
        &mut self,
        kind: ParseErrorKind,
        message: impl Into<String>,
        span: Span,
        expected: impl IntoIterator<Item = Kind>,
    ) {
        let found = self.at();
        self.errors.push(ParseError::new(kind, message, span, expected, found));
    }

    /// Consumes `kind` or records an error. Stray punctuation sitting right in
    /// front of the expected token is skipped; otherwise a missing token is
    /// inserted and nothing is consumed.
    pub(crate) fn expect(&mut self, node: &mut NodeBuilder, kind: Kind, field: Option<Field>) -> bool {
        self.expect_as(node, kind, field, ParseErrorKind::UnexpectedToken)
    }

    /// Like [`Parser::expect`], for tokens that fill a required field.
    pub(crate) fn expect_field(&mut self, node: &mut NodeBuilder, kind: Kind, field: Field) -> bool {
        self.expect_as(node, kind, Some(field), ParseErrorKind::MissingField)
    }

    fn expect_as(
        &mut self,
        node: &mut NodeBuilder,
        kind: Kind,
        field: Option<Field>,
        error_kind: ParseErrorKind,
    ) -> bool {
        if self.at() == kind {
            self.bump_into(node, field);
            return true;
        }

        let found = self.at();
        let span = self.current_span();
        let message = match error_kind {
            ParseErrorKind::MissingField => format!(
                "missing {} for {}, found {}{}",
                field.map_or(kind.describe(), Field::name),
                node.kind().name(),
                if kind == Kind::Identifier && found.is_keyword() { "keyword " } else { "" },
                found
            ),
            _ => format!("expected {}, found {}", kind, found),
        };
        self.error(error_kind, message, span, [kind]);

        if is_stray(found) && self.nth(1) == kind {
            self.skip_as_error(node);
            self.bump_into(node, field);
            return true;
        }

        let missing = self.missing(kind);
        self.attach(node, field, missing);
        false
    }

    /// Wraps the current token in an `ERROR` node under `node`.
    pub(crate) fn skip_as_error(&mut self, node: &mut NodeBuilder) {
        let mut error = NodeBuilder::new(NodeKind::Error);
        self.bump(&mut error);
        let error = self.finish(error);
        self.attach(node, None, SyntaxElement::Node(error));
    }

    /// Enters one more level of nesting, or returns false at [`MAX_DEPTH`].
    pub(crate) fn descend(&mut self) -> bool {
        if self.depth >= MAX_DEPTH {
            return false;
        }
        self.depth += 1;
        true
    }

    pub(crate) fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Reports nesting past [`MAX_DEPTH`] and swallows the nested region into
    /// one `ERROR` node, balancing brackets and block keywords as it goes.
    ///
    /// With `operand` set it stops after a single operand; otherwise it runs
    /// up to one of `stop` or a closer of an open block. Returns `None` when
    /// nothing was consumed.
    pub(crate) fn skip_too_deep(&mut self, stop: &[Kind], operand: bool) -> Option<SyntaxNode> {
        let already_reported = self
            .errors
            .last()
            .is_some_and(|e| e.kind == ParseErrorKind::NestingTooDeep);
        if !already_reported {
            let span = self.current_span();
            self.error(
                ParseErrorKind::NestingTooDeep,
                format!("nesting deeper than {} levels", MAX_DEPTH),
                span,
                [],
            );
        }

        let mut error = NodeBuilder::new(NodeKind::Error);
        let mut balance = 0usize;
        loop {
            let kind = self.at();
            if kind == Kind::Eof {
                break;
            }
            if balance == 0 {
                let done = if operand {
                    !can_start_expression(kind)
                } else {
                    stop.contains(&kind) || self.closes_open_block(kind)
                };
                if done {
                    break;
                }
            }

            self.bump(&mut error);
            if opens_nesting(kind) {
                balance += 1;
            } else if closes_nesting(kind) {
                balance = balance.saturating_sub(1);
            }
            if operand && balance == 0 && !is_prefix_operator(kind) {
                break;
            }
        }

        if error.is_empty() {
            None
        } else {
            Some(self.finish(error))
        }
    }

    pub(crate) fn enter_block(&mut self, closers: &[Kind]) -> usize {
        let mark = self.open_closers.len();
        self.open_closers.extend_from_slice(closers);
        mark
    }

    pub(crate) fn leave_block(&mut self, mark: usize) {
        self.open_closers.truncate(mark);
    }

    pub(crate) fn closes_open_block(&self, kind: Kind) -> bool {
        self.open_closers.contains(&kind)
    }
}

fn opens_nesting(kind: Kind) -> bool {
    matches!(
        kind,
        Kind::LParen
            | Kind::LBracket
            | Kind::LBrace
            | Kind::If
            | Kind::Function
            | Kind::Struct
            | Kind::Globals
            | Kind::Loop
            | Kind::Repeat
            | Kind::Do
    )
}

fn closes_nesting(kind: Kind) -> bool {
    matches!(
        kind,
        Kind::RParen
            | Kind::RBracket
            | Kind::RBrace
            | Kind::End
            | Kind::EndStruct
            | Kind::EndGlobals
            | Kind::EndLoop
            | Kind::Until
    )
}

/// Punctuation and operators that cannot begin anything; skipping them is
/// always safe.
pub(crate) fn is_stray(kind: Kind) -> bool {
    matches!(
        kind,
        Kind::Star
            | Kind::Slash
            | Kind::Percent
            | Kind::Caret
            | Kind::DotDot
            | Kind::EqEq
            | Kind::TildeEq
            | Kind::BangEq
            | Kind::LtEq
            | Kind::GtEq
            | Kind::Lt
            | Kind::Gt
            | Kind::Equals
            | Kind::Dot
            | Kind::Error
            | Kind::RParen
            | Kind::RBracket
            | Kind::RBrace
    )
}

pub(crate) fn can_start_expression(kind: Kind) -> bool {
    matches!(
        kind,
        Kind::Identifier
            | Kind::Number
            | Kind::Float
            | Kind::StringStart
            | Kind::LParen
            | Kind::LBrace
            | Kind::Function
            | Kind::Not
            | Kind::Hash
            | Kind::Minus
            | Kind::Plus
            | Kind::Tilde
            | Kind::PlusPlus
            | Kind::MinusMinus
    )
}

pub(crate) fn can_start_statement(kind: Kind) -> bool {
    can_start_expression(kind)
        || matches!(
            kind,
            Kind::Local
                | Kind::Constant
                | Kind::Array
                | Kind::Globals
                | Kind::Struct
                | Kind::Loop
                | Kind::Do
                | Kind::While
                | Kind::Repeat
                | Kind::If
                | Kind::Return
                | Kind::Break
                | Kind::Semicolon
        )
}
