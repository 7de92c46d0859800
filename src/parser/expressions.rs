//! Precedence-climbing expression parser.
//!
//! Binding powers, loosest first:
//!
//! | power | operators                    | assoc  |
//! |-------|------------------------------|--------|
//! | 1     | `,`                          | left   |
//! | 2     | `=`                          | right  |
//! | 3     | `or`                         | left   |
//! | 4     | `and`                        | left   |
//! | 5     | `==` `~=` `!=`               | left   |
//! | 6     | `<` `>` `<=` `>=`            | left   |
//! | 7     | `..`                         | right  |
//! | 8     | `+` `-`                      | left   |
//! | 9     | `*` `/` `%`                  | left   |
//! | 10    | prefix `not # - + ~ ++ --`   | prefix |
//! | 11    | `^`                          | right  |
//! | 12    | `.` `[]` calls, postfix `++` `--` | postfix |

use super::{can_start_expression, is_stray, Parser};
use crate::error::ParseErrorKind;
use crate::syntax::{Field, NodeBuilder, NodeKind, SyntaxElement};
use crate::token::{Kind, Token};

const COMMA: u8 = 1;
const ASSIGNMENT: u8 = 2;
const UNARY: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Assoc {
    Left,
    Right,
}

fn infix_binding(kind: Kind) -> Option<(u8, Assoc)> {
    let binding = match kind {
        Kind::Comma => (COMMA, Assoc::Left),
        Kind::Equals => (ASSIGNMENT, Assoc::Right),
        Kind::Or => (3, Assoc::Left),
        Kind::And => (4, Assoc::Left),
        Kind::EqEq | Kind::TildeEq | Kind::BangEq => (5, Assoc::Left),
        Kind::Lt | Kind::Gt | Kind::LtEq | Kind::GtEq => (6, Assoc::Left),
        Kind::DotDot => (7, Assoc::Right),
        Kind::Plus | Kind::Minus => (8, Assoc::Left),
        Kind::Star | Kind::Slash | Kind::Percent => (9, Assoc::Left),
        Kind::Caret => (11, Assoc::Right),
        _ => return None,
    };
    Some(binding)
}

pub(super) fn is_prefix_operator(kind: Kind) -> bool {
    matches!(
        kind,
        Kind::Not | Kind::Hash | Kind::Minus | Kind::Plus | Kind::Tilde | Kind::PlusPlus | Kind::MinusMinus
    )
}

/// Tokens that begin call arguments: `(...)`, a string or a table.
fn starts_call_args(kind: Kind) -> bool {
    matches!(kind, Kind::LParen | Kind::StringStart | Kind::LBrace)
}

impl<I: Iterator<Item = Token>> Parser<I> {
    /// Full expression, including `,` lists.
    pub(crate) fn parse_expression_list(&mut self) -> SyntaxElement {
        self.parse_binding(COMMA)
    }

    /// A single expression: everything except the `,` operator.
    pub(crate) fn parse_expression(&mut self) -> SyntaxElement {
        self.parse_binding(ASSIGNMENT)
    }

    fn parse_binding(&mut self, min_power: u8) -> SyntaxElement {
        if !self.descend() {
            return match self.skip_too_deep(&[], true) {
                Some(error) => SyntaxElement::Node(error),
                None => self.missing(Kind::Identifier),
            };
        }
        let expr = self.parse_binary(min_power);
        self.ascend();
        expr
    }

    fn parse_binary(&mut self, min_power: u8) -> SyntaxElement {
        let mut lhs = self.parse_unary();

        loop {
            let kind = self.at();
            let Some((power, assoc)) = infix_binding(kind) else {
                break;
            };
            if power < min_power {
                break;
            }

            if kind == Kind::Comma {
                let mut list = NodeBuilder::new(NodeKind::ExpressionList);
                self.attach(&mut list, None, lhs);
                while self.eat(&mut list, Kind::Comma) {
                    let item = self.parse_binding(COMMA + 1);
                    self.attach(&mut list, None, item);
                }
                lhs = SyntaxElement::Node(self.finish(list));
                continue;
            }

            let node_kind = if kind == Kind::Equals {
                NodeKind::AssignmentExpression
            } else {
                NodeKind::BinaryExpression
            };
            let mut node = NodeBuilder::new(node_kind);
            self.attach(&mut node, Some(Field::Left), lhs);
            self.bump_field(&mut node, Field::Operator);

            let next_power = match assoc {
                Assoc::Left => power + 1,
                Assoc::Right => power,
            };
            let rhs = self.parse_binding(next_power);
            self.attach(&mut node, Some(Field::Right), rhs);
            lhs = SyntaxElement::Node(self.finish(node));
        }

        lhs
    }

    /// Prefix operators are only recognised here, at the start of an
    /// operand, so `a - b` stays binary while `- b` is unary.
    fn parse_unary(&mut self) -> SyntaxElement {
        if !is_prefix_operator(self.at()) {
            return self.parse_postfix();
        }

        let mut node = NodeBuilder::new(NodeKind::UnaryExpression);
        self.bump_field(&mut node, Field::Operator);
        let operand = self.parse_binding(UNARY);
        self.attach(&mut node, Some(Field::Operand), operand);
        SyntaxElement::Node(self.finish(node))
    }

    fn parse_postfix(&mut self) -> SyntaxElement {
        let (mut expr, mut is_prefix_exp) = self.parse_primary();

        loop {
            let kind = self.at();
            let node = match kind {
                Kind::Dot if is_prefix_exp => {
                    let mut node = NodeBuilder::new(NodeKind::MemberExpression);
                    self.attach(&mut node, Some(Field::Prefix), expr);
                    self.bump(&mut node);
                    self.expect_field(&mut node, Kind::Identifier, Field::Name);
                    node
                }
                Kind::LBracket if is_prefix_exp => {
                    let mut node = NodeBuilder::new(NodeKind::IndexExpression);
                    self.attach(&mut node, Some(Field::Prefix), expr);
                    self.bump(&mut node);
                    let index = self.parse_expression();
                    self.attach(&mut node, Some(Field::Index), index);
                    self.expect(&mut node, Kind::RBracket, None);
                    node
                }
                Kind::Colon if is_prefix_exp => {
                    let mut node = NodeBuilder::new(NodeKind::FunctionCall);
                    self.attach(&mut node, Some(Field::Prefix), expr);
                    self.bump(&mut node);
                    self.expect_field(&mut node, Kind::Identifier, Field::Method);
                    if starts_call_args(self.at()) {
                        let args = self.parse_call_args();
                        self.attach(&mut node, Some(Field::Args), args);
                    } else {
                        let span = self.current_span();
                        let found = self.at();
                        self.error(
                            ParseErrorKind::MissingField,
                            format!("missing args for method call, found {}", found),
                            span,
                            [Kind::LParen, Kind::StringStart, Kind::LBrace],
                        );
                        let missing = self.missing(Kind::LParen);
                        self.attach(&mut node, Some(Field::Args), missing);
                    }
                    node
                }
                _ if is_prefix_exp && starts_call_args(kind) => {
                    let mut node = NodeBuilder::new(NodeKind::FunctionCall);
                    self.attach(&mut node, Some(Field::Prefix), expr);
                    let args = self.parse_call_args();
                    self.attach(&mut node, Some(Field::Args), args);
                    node
                }
                Kind::PlusPlus | Kind::MinusMinus => {
                    let mut node = NodeBuilder::new(NodeKind::UpdateExpression);
                    self.attach(&mut node, Some(Field::Operand), expr);
                    self.bump_field(&mut node, Field::Operator);
                    expr = SyntaxElement::Node(self.finish(node));
                    is_prefix_exp = false;
                    continue;
                }
                _ => break,
            };
            expr = SyntaxElement::Node(self.finish(node));
            is_prefix_exp = true;
        }

        expr
    }

    /// `( args )`, a string literal, or a table constructor.
    fn parse_call_args(&mut self) -> SyntaxElement {
        match self.at() {
            Kind::StringStart => self.parse_string(),
            Kind::LBrace => self.parse_table(),
            _ => {
                let mut node = NodeBuilder::new(NodeKind::Arguments);
                self.bump(&mut node);
                if self.at() != Kind::RParen {
                    loop {
                        let arg = self.parse_expression();
                        self.attach(&mut node, None, arg);
                        if !self.eat(&mut node, Kind::Comma) {
                            break;
                        }
                    }
                }
                self.expect(&mut node, Kind::RParen, None);
                SyntaxElement::Node(self.finish(node))
            }
        }
    }

    /// Returns the expression and whether it may be followed by call,
    /// member or index suffixes.
    fn parse_primary(&mut self) -> (SyntaxElement, bool) {
        match self.at() {
            Kind::Identifier => (self.bump_element(), true),
            Kind::Number | Kind::Float => (self.bump_element(), false),
            Kind::StringStart => (self.parse_string(), false),
            Kind::LBrace => (self.parse_table(), false),
            Kind::LParen => {
                let mut node = NodeBuilder::new(NodeKind::ParenthesizedExpression);
                self.bump(&mut node);
                let inner = self.parse_expression_list();
                self.attach(&mut node, Some(Field::Value), inner);
                self.expect(&mut node, Kind::RParen, None);
                (SyntaxElement::Node(self.finish(node)), true)
            }
            Kind::Function => {
                let mut node = NodeBuilder::new(NodeKind::FunctionExpression);
                let opener = self.current_span();
                self.bump(&mut node);
                self.parse_function_body(&mut node, opener);
                (SyntaxElement::Node(self.finish(node)), false)
            }
            found => {
                let span = self.current_span();
                self.error(
                    ParseErrorKind::UnexpectedToken,
                    format!("expected expression, found {}", found),
                    span,
                    [Kind::Identifier, Kind::Number, Kind::Float, Kind::StringStart, Kind::LParen, Kind::LBrace],
                );

                let closing = matches!(found, Kind::RParen | Kind::RBracket | Kind::RBrace);
                if !is_stray(found) || closing {
                    return (self.missing(Kind::Identifier), false);
                }

                // Skip the stray token and retry once on what follows it.
                let mut error = NodeBuilder::new(NodeKind::Error);
                self.bump(&mut error);
                if can_start_expression(self.at()) {
                    let operand = self.parse_unary();
                    self.attach(&mut error, None, operand);
                }
                (SyntaxElement::Node(self.finish(error)), false)
            }
        }
    }

    /// `start [content] end`
    fn parse_string(&mut self) -> SyntaxElement {
        let mut node = NodeBuilder::new(NodeKind::String);
        self.bump_field(&mut node, Field::Start);
        if self.at() == Kind::StringContent {
            self.bump_field(&mut node, Field::Content);
        }
        self.expect(&mut node, Kind::StringEnd, Some(Field::End));
        SyntaxElement::Node(self.finish(node))
    }

    /// `{ field {sep field} [sep] }` where `sep` is `,` or `;`.
    fn parse_table(&mut self) -> SyntaxElement {
        let mut node = NodeBuilder::new(NodeKind::TableConstructor);
        self.bump(&mut node);

        loop {
            let kind = self.at();
            if matches!(kind, Kind::Comma | Kind::Semicolon) {
                let span = self.current_span();
                self.error(
                    ParseErrorKind::UnexpectedToken,
                    format!("expected table field, found {}", kind),
                    span,
                    [Kind::Identifier, Kind::LBracket, Kind::RBrace],
                );
                self.skip_as_error(&mut node);
                continue;
            }

            let mut field = NodeBuilder::new(NodeKind::Field);
            if kind == Kind::LBracket {
                self.bump(&mut field);
                let key = self.parse_expression();
                self.attach(&mut field, Some(Field::Key), key);
                self.expect(&mut field, Kind::RBracket, None);
                self.expect(&mut field, Kind::Equals, None);
            } else if kind == Kind::Identifier && self.nth(1) == Kind::Equals {
                self.bump_field(&mut field, Field::Key);
                self.bump(&mut field);
            } else if !can_start_expression(kind) {
                break;
            }
            let value = self.parse_expression_value();
            self.attach(&mut field, Some(Field::Value), value);
            let field = self.finish(field);
            self.attach(&mut node, None, SyntaxElement::Node(field));

            if !(self.eat(&mut node, Kind::Comma) || self.eat(&mut node, Kind::Semicolon)) {
                break;
            }
        }

        self.expect(&mut node, Kind::RBrace, None);
        SyntaxElement::Node(self.finish(node))
    }

    /// Table field values stop before `=` so `{ a = b = c }` does not nest
    /// assignments inside a field.
    fn parse_expression_value(&mut self) -> SyntaxElement {
        self.parse_binding(ASSIGNMENT + 1)
    }
}
