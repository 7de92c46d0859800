//! Concrete syntax tree produced by the parser.
//!
//! Node-kind names ([`NodeKind::name`]) and field names ([`Field::name`]) are
//! what downstream tools match against, so they are kept stable.

use crate::token::{Kind, Position, Span, Token};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Program,
    Block,
    BlockComment,

    // Statements
    VariableDeclaration,
    Declarator,
    GlobalsBlock,
    StructDefinition,
    LoopStatement,
    DoStatement,
    WhileStatement,
    RepeatStatement,
    IfStatement,
    ElseifClause,
    ElseClause,
    FunctionDefinition,
    FunctionName,
    Parameters,
    Parameter,
    ReturnStatement,
    BreakStatement,
    EmptyStatement,
    ExpressionStatement,

    // Expressions
    BinaryExpression,
    UnaryExpression,
    UpdateExpression,
    AssignmentExpression,
    ExpressionList,
    ParenthesizedExpression,
    MemberExpression,
    IndexExpression,
    FunctionCall,
    Arguments,
    TableConstructor,
    Field,
    String,
    FunctionExpression,

    #[serde(rename = "ERROR")]
    Error,
}

impl NodeKind {
    pub fn name(self) -> &'static str {
        match self {
            NodeKind::Program => "program",
            NodeKind::Block => "block",
            NodeKind::BlockComment => "block_comment",
            NodeKind::VariableDeclaration => "variable_declaration",
            NodeKind::Declarator => "declarator",
            NodeKind::GlobalsBlock => "globals_block",
            NodeKind::StructDefinition => "struct_definition",
            NodeKind::LoopStatement => "loop_statement",
            NodeKind::DoStatement => "do_statement",
            NodeKind::WhileStatement => "while_statement",
            NodeKind::RepeatStatement => "repeat_statement",
            NodeKind::IfStatement => "if_statement",
            NodeKind::ElseifClause => "elseif_clause",
            NodeKind::ElseClause => "else_clause",
            NodeKind::FunctionDefinition => "function_definition",
            NodeKind::FunctionName => "function_name",
            NodeKind::Parameters => "parameters",
            NodeKind::Parameter => "parameter",
            NodeKind::ReturnStatement => "return_statement",
            NodeKind::BreakStatement => "break_statement",
            NodeKind::EmptyStatement => "empty_statement",
            NodeKind::ExpressionStatement => "expression_statement",
            NodeKind::BinaryExpression => "binary_expression",
            NodeKind::UnaryExpression => "unary_expression",
            NodeKind::UpdateExpression => "update_expression",
            NodeKind::AssignmentExpression => "assignment_expression",
            NodeKind::ExpressionList => "expression_list",
            NodeKind::ParenthesizedExpression => "parenthesized_expression",
            NodeKind::MemberExpression => "member_expression",
            NodeKind::IndexExpression => "index_expression",
            NodeKind::FunctionCall => "function_call",
            NodeKind::Arguments => "arguments",
            NodeKind::TableConstructor => "table_constructor",
            NodeKind::Field => "field",
            NodeKind::String => "string",
            NodeKind::FunctionExpression => "function_expression",
            NodeKind::Error => "ERROR",
        }
    }

    /// Keyword that must close a block of this kind.
    pub fn closer(self) -> Option<Kind> {
        match self {
            NodeKind::FunctionDefinition
            | NodeKind::FunctionExpression
            | NodeKind::IfStatement
            | NodeKind::WhileStatement
            | NodeKind::DoStatement => Some(Kind::End),
            NodeKind::StructDefinition => Some(Kind::EndStruct),
            NodeKind::GlobalsBlock => Some(Kind::EndGlobals),
            NodeKind::LoopStatement => Some(Kind::EndLoop),
            NodeKind::RepeatStatement => Some(Kind::Until),
            _ => None,
        }
    }

    /// The name the closing keyword carries inside a block of this kind;
    /// the same `end` lexeme reads as `if_end`, `while_end`, and so on.
    pub fn closer_alias(self) -> Option<&'static str> {
        let alias = match self {
            NodeKind::FunctionDefinition | NodeKind::FunctionExpression => "function_end",
            NodeKind::IfStatement => "if_end",
            NodeKind::WhileStatement => "while_end",
            NodeKind::DoStatement => "do_end",
            NodeKind::StructDefinition => "struct_end",
            NodeKind::GlobalsBlock => "globals_end",
            NodeKind::LoopStatement => "loop_end",
            NodeKind::RepeatStatement => "repeat_until",
            _ => return None,
        };
        Some(alias)
    }
}

/// Logical role of a child inside its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Type,
    Name,
    Args,
    Prefix,
    Key,
    Value,
    Start,
    Content,
    End,
    Left,
    Right,
    Operator,
    Operand,
    Condition,
    Body,
    Alternative,
    Parameters,
    Method,
    Index,
    Modifier,
    Declarator,
}

impl Field {
    pub fn name(self) -> &'static str {
        match self {
            Field::Type => "type",
            Field::Name => "name",
            Field::Args => "args",
            Field::Prefix => "prefix",
            Field::Key => "key",
            Field::Value => "value",
            Field::Start => "start",
            Field::Content => "content",
            Field::End => "end",
            Field::Left => "left",
            Field::Right => "right",
            Field::Operator => "operator",
            Field::Operand => "operand",
            Field::Condition => "condition",
            Field::Body => "body",
            Field::Alternative => "alternative",
            Field::Parameters => "parameters",
            Field::Method => "method",
            Field::Index => "index",
            Field::Modifier => "modifier",
            Field::Declarator => "declarator",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "element", rename_all = "snake_case")]
pub enum SyntaxElement {
    Node(SyntaxNode),
    Token(Token),
    /// Zero-width placeholder for a token the parser expected but did not find.
    Missing { kind: Kind, position: Position },
}

impl SyntaxElement {
    pub fn span(&self) -> Span {
        match self {
            SyntaxElement::Node(node) => node.span,
            SyntaxElement::Token(token) => token.span,
            SyntaxElement::Missing { position, .. } => Span::empty(*position),
        }
    }

    pub fn as_node(&self) -> Option<&SyntaxNode> {
        match self {
            SyntaxElement::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_token(&self) -> Option<&Token> {
        match self {
            SyntaxElement::Token(token) => Some(token),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, SyntaxElement::Missing { .. })
    }

    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        let span = self.span();
        &source[span.start.offset..span.end.offset]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyntaxNode {
    kind: NodeKind,
    span: Span,
    children: Vec<SyntaxElement>,
    fields: Vec<(Field, usize)>,
}

impl SyntaxNode {
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn children(&self) -> &[SyntaxElement] {
        &self.children
    }

    pub fn child_nodes(&self) -> impl Iterator<Item = &SyntaxNode> {
        self.children.iter().filter_map(SyntaxElement::as_node)
    }

    /// Field of the child at `index`, if it has one.
    pub fn field_of(&self, index: usize) -> Option<Field> {
        self.fields
            .iter()
            .find(|(_, i)| *i == index)
            .map(|(field, _)| *field)
    }

    /// First child carrying `field`.
    pub fn field(&self, field: Field) -> Option<&SyntaxElement> {
        self.fields(field).next()
    }

    /// Every child carrying `field`, in source order.
    pub fn fields(&self, field: Field) -> impl Iterator<Item = &SyntaxElement> {
        self.fields
            .iter()
            .filter(move |(f, _)| *f == field)
            .map(move |(_, i)| &self.children[*i])
    }

    pub fn field_node(&self, field: Field) -> Option<&SyntaxNode> {
        self.field(field).and_then(SyntaxElement::as_node)
    }

    pub fn field_token(&self, field: Field) -> Option<&Token> {
        self.field(field).and_then(SyntaxElement::as_token)
    }

    /// Closing keyword of a block node, possibly a [`SyntaxElement::Missing`].
    pub fn closer(&self) -> Option<&SyntaxElement> {
        self.kind.closer()?;
        self.field(Field::End)
    }

    /// First significant token, typically the opening keyword.
    pub fn first_token(&self) -> Option<&Token> {
        self.children.iter().find_map(|child| match child {
            SyntaxElement::Token(token) if !token.is_trivia() => Some(token),
            SyntaxElement::Node(node) if node.kind != NodeKind::BlockComment => node.first_token(),
            _ => None,
        })
    }

    pub fn text<'s>(&self, source: &'s str) -> &'s str {
        &source[self.span.start.offset..self.span.end.offset]
    }

    /// Pre-order walk over this node and every node below it.
    pub fn descendants(&self) -> Vec<&SyntaxNode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            for child in node.child_nodes().collect::<Vec<_>>().into_iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    pub fn find_all(&self, kind: NodeKind) -> Vec<&SyntaxNode> {
        self.descendants()
            .into_iter()
            .filter(|node| node.kind == kind)
            .collect()
    }

    /// See [`crate::printer::to_sexp`].
    pub fn to_sexp(&self) -> String {
        crate::printer::to_sexp(self)
    }

    /// True when this subtree contains an `ERROR` node or a missing token.
    pub fn has_errors(&self) -> bool {
        self.kind == NodeKind::Error
            || self.children.iter().any(|child| match child {
                SyntaxElement::Node(node) => node.has_errors(),
                SyntaxElement::Token(token) => token.kind == Kind::Error,
                SyntaxElement::Missing { .. } => true,
            })
    }

    pub(crate) fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }
}

/// Body that closes last in `children`: the trailing `block`, looking
/// through `elseif`/`else` clauses.
pub(crate) fn trailing_block(children: &[SyntaxElement]) -> Option<&SyntaxNode> {
    children.iter().rev().find_map(|child| match child {
        SyntaxElement::Node(node) if node.kind == NodeKind::Block => Some(node),
        SyntaxElement::Node(node)
            if matches!(node.kind, NodeKind::ElseifClause | NodeKind::ElseClause) =>
        {
            trailing_block(&node.children)
        }
        _ => None,
    })
}

/// Accumulates the children of a node while it is being parsed.
#[derive(Debug)]
pub(crate) struct NodeBuilder {
    kind: NodeKind,
    children: Vec<SyntaxElement>,
    fields: Vec<(Field, usize)>,
}

impl NodeBuilder {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub(crate) fn kind(&self) -> NodeKind {
        self.kind
    }

    pub(crate) fn children(&self) -> &[SyntaxElement] {
        &self.children
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub(crate) fn push(&mut self, element: SyntaxElement) {
        self.children.push(element);
    }

    pub(crate) fn push_field(&mut self, field: Field, element: SyntaxElement) {
        self.fields.push((field, self.children.len()));
        self.children.push(element);
    }

    /// Span runs from the first child to the last; a childless node sits at
    /// `fallback` with zero width.
    pub(crate) fn finish(self, fallback: Position) -> SyntaxNode {
        let span = match (self.children.first(), self.children.last()) {
            (Some(first), Some(last)) => first.span().cover(last.span()),
            _ => Span::empty(fallback),
        };
        SyntaxNode {
            kind: self.kind,
            span,
            children: self.children,
            fields: self.fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(offset: usize) -> Position {
        Position {
            offset,
            line: 0,
            column: offset,
        }
    }

    fn token(kind: Kind, value: &str, at: usize) -> SyntaxElement {
        SyntaxElement::Token(Token::new(
            kind,
            value,
            Span::new(pos(at), pos(at + value.len())),
        ))
    }

    #[test]
    fn builder_span_covers_children() {
        let mut builder = NodeBuilder::new(NodeKind::BinaryExpression);
        builder.push_field(Field::Left, token(Kind::Identifier, "a", 0));
        builder.push_field(Field::Operator, token(Kind::Plus, "+", 2));
        builder.push_field(Field::Right, token(Kind::Identifier, "bc", 4));
        let node = builder.finish(pos(0));

        assert_eq!(node.span().start.offset, 0);
        assert_eq!(node.span().end.offset, 6);
        assert_eq!(node.field_token(Field::Right).map(|t| t.value.as_str()), Some("bc"));
        assert_eq!(node.field_of(1), Some(Field::Operator));
        assert_eq!(node.text("a + bc"), "a + bc");
    }

    #[test]
    fn empty_builder_uses_fallback() {
        let node = NodeBuilder::new(NodeKind::Block).finish(pos(3));
        assert!(node.span().is_empty());
        assert_eq!(node.span().start.offset, 3);
    }

    #[test]
    fn repeated_fields_come_back_in_order() {
        let mut builder = NodeBuilder::new(NodeKind::VariableDeclaration);
        builder.push_field(Field::Modifier, token(Kind::Local, "local", 0));
        builder.push_field(Field::Modifier, token(Kind::Constant, "constant", 6));
        let node = builder.finish(pos(0));
        let modifiers: Vec<&str> = node
            .fields(Field::Modifier)
            .filter_map(|e| e.as_token())
            .map(|t| t.value.as_str())
            .collect();
        assert_eq!(modifiers, vec!["local", "constant"]);
    }

    #[test]
    fn missing_closer_marks_errors() {
        let mut builder = NodeBuilder::new(NodeKind::DoStatement);
        builder.push(token(Kind::Do, "do", 0));
        builder.push_field(
            Field::End,
            SyntaxElement::Missing {
                kind: Kind::End,
                position: pos(2),
            },
        );
        let node = builder.finish(pos(0));
        assert!(node.has_errors());
        assert!(node.closer().is_some_and(SyntaxElement::is_missing));
        assert_eq!(node.first_token().map(|t| t.kind), Some(Kind::Do));
    }

    #[test]
    fn closer_aliases_follow_the_construct() {
        assert_eq!(NodeKind::IfStatement.closer(), Some(Kind::End));
        assert_eq!(NodeKind::IfStatement.closer_alias(), Some("if_end"));
        assert_eq!(NodeKind::RepeatStatement.closer(), Some(Kind::Until));
        assert_eq!(NodeKind::BinaryExpression.closer_alias(), None);
    }
}
