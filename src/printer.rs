use crate::syntax::{Field, SyntaxElement, SyntaxNode};
use crate::token::{Kind, Span, Token};
use std::fmt::Write;

/// Name of a token when it appears as a named leaf. Keywords and
/// punctuation are anonymous and have none.
pub fn token_name(kind: Kind) -> Option<&'static str> {
    let name = match kind {
        Kind::Identifier => "identifier",
        Kind::Number => "number",
        Kind::Float => "float",
        Kind::StringContent => "string_content",
        Kind::BlockCommentContent => "comment_content",
        Kind::LineComment => "line_comment",
        Kind::Error => "ERROR",
        _ => return None,
    };
    Some(name)
}

/// S-expression of the named structure, tree-sitter style:
/// `(program (if_statement condition: (identifier) end: (if_end)))`.
pub fn to_sexp(node: &SyntaxNode) -> String {
    let mut out = String::new();
    write_node_sexp(&mut out, node);
    out
}

fn write_node_sexp(out: &mut String, node: &SyntaxNode) {
    out.push('(');
    out.push_str(node.kind().name());

    for (index, child) in node.children().iter().enumerate() {
        let field = node.field_of(index);
        let rendered = match child {
            SyntaxElement::Node(child) => {
                let mut text = String::new();
                write_node_sexp(&mut text, child);
                Some(text)
            }
            SyntaxElement::Token(token) => token_sexp(node, field == Some(Field::End), token),
            SyntaxElement::Missing { kind, .. } => Some(format!("(MISSING {})", kind.describe())),
        };
        if let Some(rendered) = rendered {
            out.push(' ');
            if let Some(field) = field {
                let _ = write!(out, "{}: ", field.name());
            }
            out.push_str(&rendered);
        }
    }

    out.push(')');
}

fn token_sexp(parent: &SyntaxNode, is_end_field: bool, token: &Token) -> Option<String> {
    if is_end_field {
        if let Some(alias) = parent.kind().closer_alias() {
            return Some(format!("({alias})"));
        }
    }
    token_name(token.kind).map(|name| format!("({name})"))
}

/// Indented dump of every element, one per line:
/// `kind (line L, column C): text`, positions one based.
pub fn render_tree(node: &SyntaxNode, source: &str) -> String {
    let mut out = String::new();
    write_tree(&mut out, node, None, source, 0);
    out
}

fn write_tree(out: &mut String, node: &SyntaxNode, label: Option<&str>, source: &str, depth: usize) {
    write_line(out, node.kind().name(), label, &node.span(), source, depth);

    for (index, child) in node.children().iter().enumerate() {
        let field = node.field_of(index).map(Field::name);
        match child {
            SyntaxElement::Node(child) => write_tree(out, child, field, source, depth + 1),
            SyntaxElement::Token(token) => {
                let kind = token_name(token.kind)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("{:?}", token.value));
                write_line(out, &kind, field, &child.span(), source, depth + 1);
            }
            SyntaxElement::Missing { kind, .. } => {
                let kind = format!("MISSING {}", kind.describe());
                write_line(out, &kind, field, &child.span(), source, depth + 1);
            }
        }
    }
}

fn write_line(out: &mut String, kind: &str, label: Option<&str>, span: &Span, source: &str, depth: usize) {
    let indent = "  ".repeat(depth);
    let label = label.map(|l| format!("{l}: ")).unwrap_or_default();
    let text = source[span.start.offset..span.end.offset].replace('\n', "\\n");
    let _ = writeln!(
        out,
        "{indent}{label}{kind} (line {}, column {}): {text}",
        span.start.line + 1,
        span.start.column + 1,
    );
}
