use serde::Serialize;
use std::fmt;

/// A location in source text. `line` and `column` are zero based, `column`
/// counts code points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

/// Half-open `[start, end)` range of source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn empty(at: Position) -> Self {
        Self { start: at, end: at }
    }

    pub fn is_empty(&self) -> bool {
        self.start.offset == self.end.offset
    }

    /// Smallest span covering both `self` and `other`.
    pub fn cover(self, other: Span) -> Span {
        Span {
            start: if other.start.offset < self.start.offset { other.start } else { self.start },
            end: if other.end.offset > self.end.offset { other.end } else { self.end },
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize)]
pub struct Token {
    pub kind: Kind,
    pub value: String,
    pub span: Span,
}

impl Token {
    pub fn new(kind: Kind, value: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            value: value.into(),
            span,
        }
    }

    pub fn line(&self) -> usize {
        self.span.start.line
    }

    pub fn column(&self) -> usize {
        self.span.start.column
    }

    /// Comments are trivia: kept in the tree, ignored by the grammar.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self.kind,
            Kind::LineComment
                | Kind::BlockCommentStart
                | Kind::BlockCommentContent
                | Kind::BlockCommentEnd
        )
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize)]
pub enum Kind {
    // Literals and names
    Identifier,
    Number,
    Float,

    // Externally scanned families
    StringStart,
    StringContent,
    StringEnd,
    BlockCommentStart,
    BlockCommentContent,
    BlockCommentEnd,
    LineComment,

    // Keywords
    Struct,
    EndStruct,
    Globals,
    EndGlobals,
    Loop,
    EndLoop,
    Function,
    End,
    If,
    Then,
    ElseIf,
    Else,
    While,
    Do,
    Repeat,
    Until,
    Return,
    Break,
    Local,
    Constant,
    Array,
    And,
    Or,
    Not,

    // Operators
    Plus,       // +
    Minus,      // -
    Star,       // *
    Slash,      // /
    Percent,    // %
    Caret,      // ^
    DotDot,     // ..
    EqEq,       // ==
    TildeEq,    // ~=
    BangEq,     // !=
    LtEq,       // <=
    GtEq,       // >=
    Lt,         // <
    Gt,         // >
    Equals,     // =
    Tilde,      // ~
    PlusPlus,   // ++
    MinusMinus, // --
    Hash,       // #

    // Brackets and delimiters
    LParen,    // (
    RParen,    // )
    LBracket,  // [
    RBracket,  // ]
    LBrace,    // {
    RBrace,    // }
    Comma,     // ,
    Semicolon, // ;
    Colon,     // :
    Dot,       // .

    Error,
    Eof,
}

impl Kind {
    pub fn keyword(ident: &str) -> Option<Kind> {
        let kind = match ident {
            "struct" => Kind::Struct,
            "endstruct" => Kind::EndStruct,
            "globals" => Kind::Globals,
            "endglobals" => Kind::EndGlobals,
            "loop" => Kind::Loop,
            "endloop" => Kind::EndLoop,
            "function" => Kind::Function,
            "end" => Kind::End,
            "if" => Kind::If,
            "then" => Kind::Then,
            "elseif" => Kind::ElseIf,
            "else" => Kind::Else,
            "while" => Kind::While,
            "do" => Kind::Do,
            "repeat" => Kind::Repeat,
            "until" => Kind::Until,
            "return" => Kind::Return,
            "break" => Kind::Break,
            "local" => Kind::Local,
            "constant" => Kind::Constant,
            "array" => Kind::Array,
            "and" => Kind::And,
            "or" => Kind::Or,
            "not" => Kind::Not,
            _ => return None,
        };
        Some(kind)
    }

    /// Fixed operator and punctuation spellings, longest first so a prefix
    /// scan picks the longest match.
    pub const OPERATORS: &'static [(&'static str, Kind)] = &[
        ("..", Kind::DotDot),
        ("==", Kind::EqEq),
        ("~=", Kind::TildeEq),
        ("!=", Kind::BangEq),
        ("<=", Kind::LtEq),
        (">=", Kind::GtEq),
        ("++", Kind::PlusPlus),
        ("--", Kind::MinusMinus),
        ("+", Kind::Plus),
        ("-", Kind::Minus),
        ("*", Kind::Star),
        ("/", Kind::Slash),
        ("%", Kind::Percent),
        ("^", Kind::Caret),
        ("<", Kind::Lt),
        (">", Kind::Gt),
        ("=", Kind::Equals),
        ("~", Kind::Tilde),
        ("#", Kind::Hash),
        ("(", Kind::LParen),
        (")", Kind::RParen),
        ("[", Kind::LBracket),
        ("]", Kind::RBracket),
        ("{", Kind::LBrace),
        ("}", Kind::RBrace),
        (",", Kind::Comma),
        (";", Kind::Semicolon),
        (":", Kind::Colon),
        (".", Kind::Dot),
    ];

    pub fn is_keyword(self) -> bool {
        (self as u8) >= (Kind::Struct as u8) && (self as u8) <= (Kind::Not as u8)
    }

    /// Human readable spelling used in diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            Kind::Identifier => "identifier",
            Kind::Number => "number",
            Kind::Float => "float",
            Kind::StringStart => "string",
            Kind::StringContent => "string content",
            Kind::StringEnd => "closing quote",
            Kind::BlockCommentStart => "`/*`",
            Kind::BlockCommentContent => "comment",
            Kind::BlockCommentEnd => "`*/`",
            Kind::LineComment => "comment",
            Kind::Struct => "`struct`",
            Kind::EndStruct => "`endstruct`",
            Kind::Globals => "`globals`",
            Kind::EndGlobals => "`endglobals`",
            Kind::Loop => "`loop`",
            Kind::EndLoop => "`endloop`",
            Kind::Function => "`function`",
            Kind::End => "`end`",
            Kind::If => "`if`",
            Kind::Then => "`then`",
            Kind::ElseIf => "`elseif`",
            Kind::Else => "`else`",
            Kind::While => "`while`",
            Kind::Do => "`do`",
            Kind::Repeat => "`repeat`",
            Kind::Until => "`until`",
            Kind::Return => "`return`",
            Kind::Break => "`break`",
            Kind::Local => "`local`",
            Kind::Constant => "`constant`",
            Kind::Array => "`array`",
            Kind::And => "`and`",
            Kind::Or => "`or`",
            Kind::Not => "`not`",
            Kind::Plus => "`+`",
            Kind::Minus => "`-`",
            Kind::Star => "`*`",
            Kind::Slash => "`/`",
            Kind::Percent => "`%`",
            Kind::Caret => "`^`",
            Kind::DotDot => "`..`",
            Kind::EqEq => "`==`",
            Kind::TildeEq => "`~=`",
            Kind::BangEq => "`!=`",
            Kind::LtEq => "`<=`",
            Kind::GtEq => "`>=`",
            Kind::Lt => "`<`",
            Kind::Gt => "`>`",
            Kind::Equals => "`=`",
            Kind::Tilde => "`~`",
            Kind::PlusPlus => "`++`",
            Kind::MinusMinus => "`--`",
            Kind::Hash => "`#`",
            Kind::LParen => "`(`",
            Kind::RParen => "`)`",
            Kind::LBracket => "`[`",
            Kind::RBracket => "`]`",
            Kind::LBrace => "`{`",
            Kind::RBrace => "`}`",
            Kind::Comma => "`,`",
            Kind::Semicolon => "`;`",
            Kind::Colon => "`:`",
            Kind::Dot => "`.`",
            Kind::Error => "invalid character",
            Kind::Eof => "end of input",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.describe())
    }
}
