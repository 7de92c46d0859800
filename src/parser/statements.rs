use super::{can_start_expression, can_start_statement, Parser};
use crate::error::ParseErrorKind;
use crate::syntax::{trailing_block, Field, NodeBuilder, NodeKind, SyntaxElement, SyntaxNode};
use crate::token::{Kind, Position, Span, Token};

/// Keywords that only ever close something.
fn is_closing_keyword(kind: Kind) -> bool {
    matches!(
        kind,
        Kind::End
            | Kind::EndStruct
            | Kind::EndGlobals
            | Kind::EndLoop
            | Kind::Until
            | Kind::Else
            | Kind::ElseIf
    )
}

impl<I: Iterator<Item = Token>> Parser<I> {
    pub(crate) fn parse_program(&mut self) -> SyntaxNode {
        let mut program = NodeBuilder::new(NodeKind::Program);

        loop {
            let kind = self.at();
            if kind == Kind::Eof {
                break;
            }
            if can_start_statement(kind) {
                let statement = self.parse_statement();
                self.attach(&mut program, None, SyntaxElement::Node(statement));
            } else {
                let span = self.current_span();
                self.error(
                    ParseErrorKind::UnexpectedToken,
                    format!("unexpected {} at top level", kind),
                    span,
                    [],
                );
                self.skip_as_error(&mut program);
            }
        }

        // Comments after the last statement belong to the program.
        self.fill(0);
        let end = self.lookahead[0].token.span.end;
        let trailing: Vec<SyntaxElement> = self.lookahead[0].trivia.drain(..).collect();
        self.flush_trivia(&mut program);
        for trivia in trailing {
            program.push(trivia);
        }

        let end = if end.offset >= self.last_end.offset { end } else { self.last_end };
        self.finish(program)
            .with_span(Span::new(Position::default(), end))
    }

    pub(crate) fn parse_statement(&mut self) -> SyntaxNode {
        match self.at() {
            Kind::Local | Kind::Constant | Kind::Array => self.parse_variable_declaration(),
            Kind::Identifier if matches!(self.nth(1), Kind::Identifier | Kind::Array) => {
                self.parse_variable_declaration()
            }
            Kind::Globals => self.parse_globals(),
            Kind::Struct => self.parse_struct(),
            Kind::Loop => self.parse_simple_block(NodeKind::LoopStatement),
            Kind::Do => self.parse_simple_block(NodeKind::DoStatement),
            Kind::While => self.parse_while(),
            Kind::Repeat => self.parse_repeat(),
            Kind::If => self.parse_if(),
            Kind::Function if self.nth(1) == Kind::Identifier => self.parse_function_definition(),
            Kind::Return => self.parse_return(),
            Kind::Break => {
                let mut node = NodeBuilder::new(NodeKind::BreakStatement);
                self.bump(&mut node);
                self.finish(node)
            }
            Kind::Semicolon => {
                let mut node = NodeBuilder::new(NodeKind::EmptyStatement);
                self.bump(&mut node);
                self.finish(node)
            }
            _ => {
                let mut node = NodeBuilder::new(NodeKind::ExpressionStatement);
                let expression = self.parse_expression_list();
                self.attach(&mut node, None, expression);
                self.finish(node)
            }
        }
    }

    /// Parses statements up to one of `terminators`, a closer of an enclosing
    /// block, or end of input, and attaches them as the `body` of `parent`.
    fn parse_body(&mut self, parent: &mut NodeBuilder, terminators: &[Kind]) {
        if !self.descend() {
            if let Some(error) = self.skip_too_deep(terminators, false) {
                let mut block = NodeBuilder::new(NodeKind::Block);
                self.attach(&mut block, None, SyntaxElement::Node(error));
                let block = self.finish(block);
                self.attach(parent, Some(Field::Body), SyntaxElement::Node(block));
            }
            return;
        }
        self.parse_statements(parent, terminators);
        self.ascend();
    }

    fn parse_statements(&mut self, parent: &mut NodeBuilder, terminators: &[Kind]) {
        let mut block = NodeBuilder::new(NodeKind::Block);

        loop {
            let kind = self.at();
            if kind == Kind::Eof || terminators.contains(&kind) || self.closes_open_block(kind) {
                break;
            }
            if can_start_statement(kind) {
                let statement = self.parse_statement();
                self.attach(&mut block, None, SyntaxElement::Node(statement));
                continue;
            }

            let span = self.current_span();
            let message = if is_closing_keyword(kind) {
                format!("{} does not close any open block", kind)
            } else {
                format!("unexpected {} in {}", kind, parent.kind().name())
            };
            self.error(
                ParseErrorKind::UnexpectedToken,
                message,
                span,
                terminators.iter().copied(),
            );
            self.skip_as_error(&mut block);
        }

        if !block.is_empty() {
            let block = self.finish(block);
            self.attach(parent, Some(Field::Body), SyntaxElement::Node(block));
        }
    }

    /// Consumes the closing keyword of `node`, or reports it missing and
    /// inserts a placeholder so enclosing blocks still close.
    fn close_block(&mut self, node: &mut NodeBuilder, opener: Span) -> bool {
        let Some(closer) = node.kind().closer() else {
            return true;
        };
        if self.at() == closer {
            self.bump_field(node, Field::End);
            return true;
        }

        let found = self.at();
        let anchor = if found == Kind::Eof {
            blame_opener(node.children(), closer, opener)
        } else {
            opener
        };
        let construct = node.kind().closer_alias().unwrap_or("block");
        let message = if found == Kind::Eof {
            format!("expected {} ({}) before end of input", closer, construct)
        } else {
            format!("expected {} ({}), found {}", closer, construct, found)
        };
        self.error(ParseErrorKind::MissingCloser, message, anchor, [closer]);

        let missing = self.missing(closer);
        self.attach(node, Some(Field::End), missing);
        false
    }

    /// `opener body closer` blocks with nothing between the keyword and the body.
    fn parse_simple_block(&mut self, kind: NodeKind) -> SyntaxNode {
        let mut node = NodeBuilder::new(kind);
        let opener = self.current_span();
        self.bump(&mut node);
        self.parse_closed_body(&mut node, opener);
        self.finish(node)
    }

    fn parse_closed_body(&mut self, node: &mut NodeBuilder, opener: Span) {
        let closer = node.kind().closer().into_iter().collect::<Vec<_>>();
        let mark = self.enter_block(&closer);
        self.parse_body(node, &closer);
        self.leave_block(mark);
        self.close_block(node, opener);
    }

    fn parse_globals(&mut self) -> SyntaxNode {
        self.parse_simple_block(NodeKind::GlobalsBlock)
    }

    fn parse_struct(&mut self) -> SyntaxNode {
        let mut node = NodeBuilder::new(NodeKind::StructDefinition);
        let opener = self.current_span();
        self.bump(&mut node);
        self.expect_field(&mut node, Kind::Identifier, Field::Name);
        self.parse_closed_body(&mut node, opener);
        self.finish(node)
    }

    fn parse_while(&mut self) -> SyntaxNode {
        let mut node = NodeBuilder::new(NodeKind::WhileStatement);
        let opener = self.current_span();
        self.bump(&mut node);
        let condition = self.parse_expression();
        self.attach(&mut node, Some(Field::Condition), condition);
        self.expect(&mut node, Kind::Do, None);
        self.parse_closed_body(&mut node, opener);
        self.finish(node)
    }

    fn parse_repeat(&mut self) -> SyntaxNode {
        let mut node = NodeBuilder::new(NodeKind::RepeatStatement);
        let opener = self.current_span();
        self.bump(&mut node);
        let mark = self.enter_block(&[Kind::Until]);
        self.parse_body(&mut node, &[Kind::Until]);
        self.leave_block(mark);
        if self.close_block(&mut node, opener) {
            let condition = self.parse_expression();
            self.attach(&mut node, Some(Field::Condition), condition);
        }
        self.finish(node)
    }

    fn parse_if(&mut self) -> SyntaxNode {
        const BRANCH_ENDS: [Kind; 3] = [Kind::ElseIf, Kind::Else, Kind::End];

        let mut node = NodeBuilder::new(NodeKind::IfStatement);
        let opener = self.current_span();
        self.bump(&mut node);
        let condition = self.parse_expression();
        self.attach(&mut node, Some(Field::Condition), condition);
        self.expect(&mut node, Kind::Then, None);

        let mark = self.enter_block(&BRANCH_ENDS);
        self.parse_body(&mut node, &BRANCH_ENDS);

        while self.at() == Kind::ElseIf {
            let mut clause = NodeBuilder::new(NodeKind::ElseifClause);
            self.bump(&mut clause);
            let condition = self.parse_expression();
            self.attach(&mut clause, Some(Field::Condition), condition);
            self.expect(&mut clause, Kind::Then, None);
            self.parse_body(&mut clause, &BRANCH_ENDS);
            let clause = self.finish(clause);
            self.attach(&mut node, Some(Field::Alternative), SyntaxElement::Node(clause));
        }

        if self.at() == Kind::Else {
            let mut clause = NodeBuilder::new(NodeKind::ElseClause);
            self.bump(&mut clause);
            self.parse_body(&mut clause, &[Kind::End]);
            let clause = self.finish(clause);
            self.attach(&mut node, Some(Field::Alternative), SyntaxElement::Node(clause));
        }

        self.leave_block(mark);
        self.close_block(&mut node, opener);
        self.finish(node)
    }

    fn parse_function_definition(&mut self) -> SyntaxNode {
        let mut node = NodeBuilder::new(NodeKind::FunctionDefinition);
        let opener = self.current_span();
        self.bump(&mut node);
        self.parse_function_name(&mut node);
        self.parse_parameters(&mut node);
        self.parse_closed_body(&mut node, opener);
        self.finish(node)
    }

    /// `name`, `a.b.name` or `a.b:name`. Dotted names get their own node.
    fn parse_function_name(&mut self, parent: &mut NodeBuilder) {
        if !matches!(self.nth(1), Kind::Dot | Kind::Colon) {
            self.expect_field(parent, Kind::Identifier, Field::Name);
            return;
        }

        let mut name = NodeBuilder::new(NodeKind::FunctionName);
        self.bump_field(&mut name, Field::Prefix);
        while self.at() == Kind::Dot {
            self.bump(&mut name);
            self.expect_field(&mut name, Kind::Identifier, Field::Name);
        }
        if self.at() == Kind::Colon {
            self.bump(&mut name);
            self.expect_field(&mut name, Kind::Identifier, Field::Method);
        }
        let name = self.finish(name);
        self.attach(parent, Some(Field::Name), SyntaxElement::Node(name));
    }

    /// `( [type] name, ... )`
    pub(crate) fn parse_parameters(&mut self, parent: &mut NodeBuilder) {
        let mut params = NodeBuilder::new(NodeKind::Parameters);
        if !self.expect(&mut params, Kind::LParen, None) {
            let params = self.finish(params);
            self.attach(parent, Some(Field::Parameters), SyntaxElement::Node(params));
            return;
        }

        while self.at() == Kind::Identifier {
            let mut param = NodeBuilder::new(NodeKind::Parameter);
            if self.nth(1) == Kind::Identifier {
                self.bump_field(&mut param, Field::Type);
            }
            self.bump_field(&mut param, Field::Name);
            let param = self.finish(param);
            self.attach(&mut params, None, SyntaxElement::Node(param));
            if !self.eat(&mut params, Kind::Comma) {
                break;
            }
        }

        self.expect(&mut params, Kind::RParen, None);
        let params = self.finish(params);
        self.attach(parent, Some(Field::Parameters), SyntaxElement::Node(params));
    }

    /// `function` without a name, used as a value.
    pub(crate) fn parse_function_body(&mut self, node: &mut NodeBuilder, opener: Span) {
        self.parse_parameters(node);
        self.parse_closed_body(node, opener);
    }

    fn parse_return(&mut self) -> SyntaxNode {
        let mut node = NodeBuilder::new(NodeKind::ReturnStatement);
        self.bump(&mut node);
        if can_start_expression(self.at()) {
            loop {
                let value = self.parse_expression();
                self.attach(&mut node, Some(Field::Value), value);
                if !self.eat(&mut node, Kind::Comma) {
                    break;
                }
            }
        }
        self.finish(node)
    }

    /// `[modifiers] type name [= value] {, name [= value]}`
    fn parse_variable_declaration(&mut self) -> SyntaxNode {
        let mut node = NodeBuilder::new(NodeKind::VariableDeclaration);

        let mut modifiers = 0;
        while matches!(self.at(), Kind::Local | Kind::Constant | Kind::Array) {
            self.bump_field(&mut node, Field::Modifier);
            modifiers += 1;
        }

        let typed = self.at() == Kind::Identifier
            && matches!(self.nth(1), Kind::Identifier | Kind::Array);
        if typed {
            self.bump_field(&mut node, Field::Type);
            while self.at() == Kind::Array {
                self.bump_field(&mut node, Field::Modifier);
            }
        } else if modifiers == 0 || self.at() != Kind::Identifier {
            self.expect_field(&mut node, Kind::Identifier, Field::Type);
        }

        loop {
            let declarator = self.parse_declarator();
            self.attach(&mut node, Some(Field::Declarator), SyntaxElement::Node(declarator));
            if !self.eat(&mut node, Kind::Comma) {
                break;
            }
        }

        self.finish(node)
    }

    fn parse_declarator(&mut self) -> SyntaxNode {
        let mut node = NodeBuilder::new(NodeKind::Declarator);
        self.expect_field(&mut node, Kind::Identifier, Field::Name);
        if self.eat(&mut node, Kind::Equals) {
            let value = self.parse_expression();
            self.attach(&mut node, Some(Field::Value), value);
        }
        self.finish(node)
    }
}

/// Picks the opener to blame when a block runs into end of input. Closers
/// pair innermost first, so when the body ends in a nested block of the same
/// closer that did get closed, the unfinished opener is taken to be the
/// innermost one of that chain.
fn blame_opener(children: &[SyntaxElement], closer: Kind, opener: Span) -> Span {
    let mut anchor = opener;
    let mut body = trailing_block(children);

    while let Some(block) = body {
        let last = block
            .child_nodes()
            .filter(|node| node.kind() != NodeKind::BlockComment)
            .last();
        let Some(statement) = last else { break };
        let closed = statement
            .closer()
            .is_some_and(|end| !end.is_missing());
        if statement.kind().closer() != Some(closer) || !closed {
            break;
        }
        if let Some(token) = statement.first_token() {
            anchor = token.span;
        }
        body = trailing_block(statement.children());
    }

    anchor
}
