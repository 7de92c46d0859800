use crate::error::ScanError;
use crate::token::{Kind, Position, Span, Token};
use regex::Regex;
use std::sync::OnceLock;

const DIGITS: &str = r"[0-9]+(?:_[0-9]+)*";

fn integer_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!(
            r"^(?:0[xX][0-9a-fA-F]+(?:_[0-9a-fA-F]+)*|0[bB][01]+(?:_[01]+)*|{DIGITS})(?:[uU][lL]?|[lL])?"
        ))
        .expect("integer literal pattern is valid")
    })
}

fn float_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!(
            r"^(?:{DIGITS}[eE][+-]?[0-9]+[fF]?|(?:{DIGITS})?\.{DIGITS}(?:[eE][+-]?[0-9]+)?[fF]?|{DIGITS}[fF])"
        ))
        .expect("float literal pattern is valid")
    })
}

/// Scanner modes. `Normal` is the bottom of the stack and never popped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanMode {
    Normal,
    InBlockComment { start: Position },
    InString { quote: char, start: Position },
}

/// Pull-based scanner. Tokens are produced one at a time by [`Iterator::next`];
/// the stream always ends with a single [`Kind::Eof`] token.
pub struct Lexer<'a> {
    source: &'a str,
    offset: usize,
    line: usize,
    column: usize,
    modes: Vec<ScanMode>,
    errors: Vec<ScanError>,
    finished: bool,
    /// Kind of the last non-trivia token, used to read `a.5` as a member access.
    previous: Option<Kind>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            offset: 0,
            line: 0,
            column: 0,
            modes: vec![ScanMode::Normal],
            errors: Vec::new(),
            finished: false,
            previous: None,
        }
    }

    /// Drains the whole stream.
    pub fn tokenize(mut self) -> (Vec<Token>, Vec<ScanError>) {
        let tokens = self.by_ref().collect();
        (tokens, self.errors)
    }

    pub fn errors(&self) -> &[ScanError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ScanError> {
        self.errors
    }

    pub fn mode(&self) -> ScanMode {
        self.modes.last().copied().unwrap_or(ScanMode::Normal)
    }

    fn here(&self) -> Position {
        Position {
            offset: self.offset,
            line: self.line,
            column: self.column,
        }
    }

    fn rest(&self) -> &'a str {
        &self.source[self.offset..]
    }

    fn at(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.rest().chars();
        chars.next();
        chars.next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.at()?;
        self.offset += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 0;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    /// Advances over `len` bytes, which must end on a char boundary.
    fn advance_bytes(&mut self, len: usize) {
        let target = self.offset + len;
        while self.offset < target {
            if self.advance().is_none() {
                break;
            }
        }
    }

    fn token_from(&self, kind: Kind, start: Position) -> Token {
        let end = self.here();
        Token::new(kind, &self.source[start.offset..end.offset], Span::new(start, end))
    }

    /// True after a token that a `.` member access can follow.
    fn follows_operand(&self) -> bool {
        matches!(
            self.previous,
            Some(Kind::Identifier | Kind::RParen | Kind::RBracket | Kind::RBrace | Kind::StringEnd)
        )
    }

    fn push_mode(&mut self, mode: ScanMode) {
        self.modes.push(mode);
    }

    fn pop_mode(&mut self) {
        if self.modes.len() > 1 {
            self.modes.pop();
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.at() {
            if !ch.is_whitespace() {
                break;
            }
            self.advance();
        }
    }

    fn scan_normal(&mut self) -> Option<Token> {
        self.skip_whitespace();
        let start = self.here();

        let ch = match self.at() {
            Some(ch) => ch,
            None => {
                if self.finished {
                    return None;
                }
                self.finished = true;
                return Some(Token::new(Kind::Eof, "", Span::empty(start)));
            }
        };

        if self.rest().starts_with("//") {
            let len = self.rest().find(|c| c == '\n' || c == '\r').unwrap_or(self.rest().len());
            self.advance_bytes(len);
            return Some(self.token_from(Kind::LineComment, start));
        }

        if self.rest().starts_with("/*") {
            self.advance_bytes(2);
            self.push_mode(ScanMode::InBlockComment { start });
            return Some(self.token_from(Kind::BlockCommentStart, start));
        }

        if ch == '"' || ch == '\'' {
            self.advance();
            self.push_mode(ScanMode::InString { quote: ch, start });
            return Some(self.token_from(Kind::StringStart, start));
        }

        let leading_dot = ch == '.'
            && !self.follows_operand()
            && self.peek_second().is_some_and(|c| c.is_ascii_digit());
        if ch.is_ascii_digit() || leading_dot {
            if let Some(token) = self.scan_number(start) {
                return Some(token);
            }
        }

        if ch.is_ascii_alphabetic() || ch == '_' {
            let len = self
                .rest()
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(self.rest().len());
            self.advance_bytes(len);
            let word = &self.source[start.offset..self.offset];
            let kind = Kind::keyword(word).unwrap_or(Kind::Identifier);
            return Some(self.token_from(kind, start));
        }

        for (text, kind) in Kind::OPERATORS {
            if self.rest().starts_with(text) {
                self.advance_bytes(text.len());
                return Some(self.token_from(*kind, start));
            }
        }

        self.advance();
        let token = self.token_from(Kind::Error, start);
        self.errors.push(ScanError::UnrecognizedCharacter {
            found: ch,
            span: token.span,
        });
        Some(token)
    }

    /// Longest match between the float and integer rules; float wins ties.
    fn scan_number(&mut self, start: Position) -> Option<Token> {
        let rest = self.rest();
        let float_len = float_pattern().find(rest).map_or(0, |m| m.end());
        let int_len = integer_pattern().find(rest).map_or(0, |m| m.end());

        let (kind, len) = if float_len > 0 && float_len >= int_len {
            (Kind::Float, float_len)
        } else if int_len > 0 {
            (Kind::Number, int_len)
        } else {
            return None;
        };

        self.advance_bytes(len);
        Some(self.token_from(kind, start))
    }

    fn scan_block_comment(&mut self, comment_start: Position) -> Token {
        let start = self.here();

        if self.rest().starts_with("*/") {
            self.advance_bytes(2);
            self.pop_mode();
            return self.token_from(Kind::BlockCommentEnd, start);
        }

        if self.rest().is_empty() {
            self.errors.push(ScanError::UnterminatedBlockComment {
                span: Span::new(comment_start, start),
            });
            self.pop_mode();
            return Token::new(Kind::BlockCommentEnd, "", Span::empty(start));
        }

        let len = self.rest().find("*/").unwrap_or(self.rest().len());
        self.advance_bytes(len);
        self.token_from(Kind::BlockCommentContent, start)
    }

    fn scan_string(&mut self, quote: char, string_start: Position) -> Token {
        let start = self.here();

        match self.at() {
            None => {
                self.errors.push(ScanError::UnterminatedString {
                    span: Span::new(string_start, start),
                });
                self.pop_mode();
                return Token::new(Kind::StringEnd, "", Span::empty(start));
            }
            Some('\n') | Some('\r') => {
                let newline_len = if self.rest().starts_with("\r\n") { 2 } else { 1 };
                let newline_end = Position {
                    offset: start.offset + newline_len,
                    line: start.line + 1,
                    column: 0,
                };
                self.errors.push(ScanError::UnescapedNewline {
                    span: Span::new(start, newline_end),
                });
                self.pop_mode();
                return Token::new(Kind::StringEnd, "", Span::empty(start));
            }
            Some(ch) if ch == quote => {
                self.advance();
                self.pop_mode();
                return self.token_from(Kind::StringEnd, start);
            }
            Some(_) => {}
        }

        while let Some(ch) = self.at() {
            if ch == quote || ch == '\n' || ch == '\r' {
                break;
            }
            self.advance();
            if ch == '\\' {
                // The escaped character, whatever it is, belongs to the content.
                if self.rest().starts_with("\r\n") {
                    self.advance_bytes(2);
                } else {
                    self.advance();
                }
            }
        }

        self.token_from(Kind::StringContent, start)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let token = match self.mode() {
            ScanMode::Normal => self.scan_normal(),
            ScanMode::InBlockComment { start } => Some(self.scan_block_comment(start)),
            ScanMode::InString { quote, start } => Some(self.scan_string(quote, start)),
        }?;
        if !token.is_trivia() {
            self.previous = Some(token.kind);
        }
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Kind> {
        Lexer::new(source).map(|t| t.kind).collect()
    }

    fn values(source: &str) -> Vec<String> {
        Lexer::new(source)
            .filter(|t| t.kind != Kind::Eof)
            .map(|t| t.value)
            .collect()
    }

    #[test]
    fn keywords_win_over_identifiers() {
        assert_eq!(
            kinds("endloop endloopx end_ x"),
            vec![Kind::EndLoop, Kind::Identifier, Kind::Identifier, Kind::Identifier, Kind::Eof]
        );
    }

    #[test]
    fn operators_take_longest_match() {
        assert_eq!(
            kinds("a..b ~= c <= d == e ++ --"),
            vec![
                Kind::Identifier,
                Kind::DotDot,
                Kind::Identifier,
                Kind::TildeEq,
                Kind::Identifier,
                Kind::LtEq,
                Kind::Identifier,
                Kind::EqEq,
                Kind::Identifier,
                Kind::PlusPlus,
                Kind::MinusMinus,
                Kind::Eof,
            ]
        );
    }

    #[test]
    fn integer_literal_forms() {
        for source in ["42", "1_000_000", "0xFF_FF", "0b1010_0101", "10u", "10UL", "7l"] {
            let tokens: Vec<Token> = Lexer::new(source).collect();
            assert_eq!(tokens[0].kind, Kind::Number, "{source}");
            assert_eq!(tokens[0].value, source);
        }
    }

    #[test]
    fn float_literal_forms() {
        for source in ["1e10", "2E-3f", "3.14", ".5", "0.5e+2F", "12f", "1_000.25"] {
            let tokens: Vec<Token> = Lexer::new(source).collect();
            assert_eq!(tokens[0].kind, Kind::Float, "{source}");
            assert_eq!(tokens[0].value, source);
        }
    }

    #[test]
    fn trailing_dot_is_not_a_float() {
        assert_eq!(kinds("1."), vec![Kind::Number, Kind::Dot, Kind::Eof]);
        assert_eq!(kinds("1..2"), vec![Kind::Number, Kind::DotDot, Kind::Number, Kind::Eof]);
    }

    #[test]
    fn dot_after_operand_is_member_access() {
        assert_eq!(
            kinds("a.5"),
            vec![Kind::Identifier, Kind::Dot, Kind::Number, Kind::Eof]
        );
        assert_eq!(
            kinds("f() /* c */ .5"),
            vec![
                Kind::Identifier,
                Kind::LParen,
                Kind::RParen,
                Kind::BlockCommentStart,
                Kind::BlockCommentContent,
                Kind::BlockCommentEnd,
                Kind::Dot,
                Kind::Number,
                Kind::Eof
            ]
        );
        assert_eq!(kinds("x = .5"), vec![Kind::Identifier, Kind::Equals, Kind::Float, Kind::Eof]);
    }

    #[test]
    fn line_comment_stops_before_newline() {
        let tokens: Vec<Token> = Lexer::new("x // note\ny").collect();
        assert_eq!(tokens[1].kind, Kind::LineComment);
        assert_eq!(tokens[1].value, "// note");
        assert_eq!(tokens[2].kind, Kind::Identifier);
        assert_eq!(tokens[2].line(), 1);
        assert_eq!(tokens[2].column(), 0);
    }

    #[test]
    fn block_comment_is_three_tokens() {
        assert_eq!(
            kinds("/* a * b / c */x"),
            vec![
                Kind::BlockCommentStart,
                Kind::BlockCommentContent,
                Kind::BlockCommentEnd,
                Kind::Identifier,
                Kind::Eof,
            ]
        );
        assert_eq!(values("/* a */"), vec!["/*", " a ", "*/"]);
    }

    #[test]
    fn block_comments_do_not_nest() {
        assert_eq!(values("/* /* */ */"), vec!["/*", " /* ", "*/", "*", "/"]);
    }

    #[test]
    fn empty_block_comment_has_no_content() {
        assert_eq!(
            kinds("/**/"),
            vec![Kind::BlockCommentStart, Kind::BlockCommentEnd, Kind::Eof]
        );
    }

    #[test]
    fn unterminated_block_comment_reports_once() {
        let (tokens, errors) = Lexer::new("/* open").tokenize();
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![
                Kind::BlockCommentStart,
                Kind::BlockCommentContent,
                Kind::BlockCommentEnd,
                Kind::Eof,
            ]
        );
        assert_eq!(tokens[1].span.end.offset, 7);
        assert!(tokens[2].span.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ScanError::UnterminatedBlockComment { .. }));
    }

    #[test]
    fn string_escapes_do_not_terminate() {
        assert_eq!(values(r#""a\"b" x"#), vec!["\"", r#"a\"b"#, "\"", "x"]);
    }

    #[test]
    fn empty_string_has_no_content() {
        assert_eq!(kinds("''"), vec![Kind::StringStart, Kind::StringEnd, Kind::Eof]);
    }

    #[test]
    fn quotes_only_close_their_own_kind() {
        assert_eq!(values(r#""it's""#), vec!["\"", "it's", "\""]);
    }

    #[test]
    fn newline_ends_string_with_error() {
        let (tokens, errors) = Lexer::new("\"abc\nx").tokenize();
        let kinds: Vec<Kind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![Kind::StringStart, Kind::StringContent, Kind::StringEnd, Kind::Identifier, Kind::Eof]
        );
        assert!(tokens[2].span.is_empty());
        assert_eq!(tokens[3].line(), 1);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ScanError::UnescapedNewline { .. }));
    }

    #[test]
    fn escaped_newline_continues_string() {
        let (tokens, errors) = Lexer::new("\"a\\\nb\"").tokenize();
        assert!(errors.is_empty());
        assert_eq!(tokens[1].value, "a\\\nb");
        assert_eq!(tokens[2].kind, Kind::StringEnd);
        assert_eq!(tokens[2].line(), 1);
    }

    #[test]
    fn unterminated_string_at_end_of_input() {
        let (tokens, errors) = Lexer::new("\"abc").tokenize();
        assert_eq!(tokens[2].kind, Kind::StringEnd);
        assert!(tokens[2].span.is_empty());
        assert!(matches!(errors[..], [ScanError::UnterminatedString { .. }]));
    }

    #[test]
    fn unknown_characters_become_error_tokens() {
        let (tokens, errors) = Lexer::new("a @ b").tokenize();
        assert_eq!(
            tokens.iter().map(|t| t.kind).collect::<Vec<_>>(),
            vec![Kind::Identifier, Kind::Error, Kind::Identifier, Kind::Eof]
        );
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn columns_count_code_points() {
        let tokens: Vec<Token> = Lexer::new("'é' x").collect();
        let x = tokens.iter().find(|t| t.kind == Kind::Identifier).unwrap();
        assert_eq!(x.column(), 4);
        assert_eq!(x.span.start.offset, 5);
    }

    #[test]
    fn positions_track_every_mode() {
        let tokens: Vec<Token> = Lexer::new("a\n /* c */ \"s\"").collect();
        let starts: Vec<(Kind, usize, usize, usize)> = tokens
            .iter()
            .map(|t| (t.kind, t.span.start.offset, t.line(), t.column()))
            .collect();
        assert_eq!(
            starts,
            vec![
                (Kind::Identifier, 0, 0, 0),
                (Kind::BlockCommentStart, 3, 1, 1),
                (Kind::BlockCommentContent, 5, 1, 3),
                (Kind::BlockCommentEnd, 8, 1, 6),
                (Kind::StringStart, 11, 1, 9),
                (Kind::StringContent, 12, 1, 10),
                (Kind::StringEnd, 13, 1, 11),
                (Kind::Eof, 14, 1, 12),
            ]
        );
    }

    #[test]
    fn eof_is_emitted_once() {
        let mut lexer = Lexer::new("  ");
        assert_eq!(lexer.next().map(|t| t.kind), Some(Kind::Eof));
        assert_eq!(lexer.next(), None);
    }
}
