use vjass_parser::error::ParseErrorKind;
use vjass_parser::parse;
use vjass_parser::syntax::{Field, NodeKind, SyntaxElement, SyntaxNode};
use vjass_parser::token::Kind;

/// The single statement of a one-statement program.
fn only_statement(tree: &SyntaxNode) -> &SyntaxNode {
    let statements: Vec<&SyntaxNode> = tree.child_nodes().collect();
    assert_eq!(statements.len(), 1, "{tree:#?}");
    statements[0]
}

/// The expression inside a one-line expression statement.
fn expression(tree: &SyntaxNode) -> &SyntaxNode {
    let statement = only_statement(tree);
    assert_eq!(statement.kind(), NodeKind::ExpressionStatement);
    statement.child_nodes().next().expect("expression node")
}

fn token_text(node: &SyntaxNode, field: Field) -> Option<&str> {
    node.field_token(field).map(|t| t.value.as_str())
}

#[test]
fn balanced_nested_ifs_parse_cleanly() {
    let parsed = parse("if a then if b then end end");
    assert!(!parsed.has_errors(), "{:?}", parsed.errors());

    let outer = only_statement(&parsed.tree);
    assert_eq!(outer.kind(), NodeKind::IfStatement);
    let body = outer.field_node(Field::Body).expect("outer body");
    let inner = body.child_nodes().next().expect("inner if");
    assert_eq!(inner.kind(), NodeKind::IfStatement);
    assert!(inner.closer().is_some_and(|end| !end.is_missing()));
    assert!(outer.closer().is_some_and(|end| !end.is_missing()));
}

#[test]
fn missing_end_is_blamed_on_the_inner_if() {
    let parsed = parse("if a then if b then end");
    assert!(parsed.scan_errors.is_empty());
    assert_eq!(parsed.parse_errors.len(), 1);

    let error = &parsed.parse_errors[0];
    assert_eq!(error.kind, ParseErrorKind::MissingCloser);
    assert_eq!(error.span.start.offset, 10);
    assert_eq!(error.span.end.offset, 12);
    assert!(error.expected.contains(&Kind::End));

    let ifs = parsed.tree.find_all(NodeKind::IfStatement);
    assert_eq!(ifs.len(), 2);
    assert!(ifs[0].closer().is_some_and(SyntaxElement::is_missing));
    assert!(ifs[1].closer().is_some_and(|end| !end.is_missing()));
}

#[test]
fn unclosed_function_is_blamed_on_its_keyword() {
    let parsed = parse("function f()\n    x = 1\n");
    assert_eq!(parsed.parse_errors.len(), 1);
    let error = &parsed.parse_errors[0];
    assert_eq!(error.kind, ParseErrorKind::MissingCloser);
    assert_eq!((error.span.start.offset, error.span.end.offset), (0, 8));
    assert_eq!(error.found, Kind::Eof);
}

#[test]
fn call_sugar_matches_parenthesized_calls() {
    let cases = [
        ("foo(\"bar\")", NodeKind::Arguments),
        ("foo \"bar\"", NodeKind::String),
        ("foo { 1, 2 }", NodeKind::TableConstructor),
    ];
    for (source, args_kind) in cases {
        let parsed = parse(source);
        assert!(!parsed.has_errors(), "{source}: {:?}", parsed.errors());

        let call = expression(&parsed.tree);
        assert_eq!(call.kind(), NodeKind::FunctionCall, "{source}");
        assert_eq!(token_text(call, Field::Prefix), Some("foo"));
        let args = call.field_node(Field::Args).expect("args");
        assert_eq!(args.kind(), args_kind, "{source}");
    }
}

#[test]
fn method_calls_keep_the_method_name() {
    let parsed = parse("unit:kill(killer, 2)");
    let call = expression(&parsed.tree);
    assert_eq!(call.kind(), NodeKind::FunctionCall);
    assert_eq!(token_text(call, Field::Method), Some("kill"));
    let args = call.field_node(Field::Args).expect("args");
    assert_eq!(args.child_nodes().count(), 0);
    assert_eq!(args.children().iter().filter(|c| c.as_token().is_some()).count(), 5);
}

#[test]
fn method_call_without_args_is_a_missing_field() {
    let parsed = parse("unit:kill");
    assert_eq!(parsed.parse_errors.len(), 1);
    assert_eq!(parsed.parse_errors[0].kind, ParseErrorKind::MissingField);
    let call = expression(&parsed.tree);
    assert!(call.field(Field::Args).is_some_and(SyntaxElement::is_missing));
}

#[test]
fn typed_declaration_with_several_names() {
    let parsed = parse("local integer x = 1, y");
    assert!(!parsed.has_errors());

    let decl = only_statement(&parsed.tree);
    assert_eq!(decl.kind(), NodeKind::VariableDeclaration);
    assert_eq!(token_text(decl, Field::Modifier), Some("local"));
    assert_eq!(token_text(decl, Field::Type), Some("integer"));

    let declarators: Vec<&SyntaxNode> = decl
        .fields(Field::Declarator)
        .filter_map(SyntaxElement::as_node)
        .collect();
    assert_eq!(declarators.len(), 2);
    assert_eq!(token_text(declarators[0], Field::Name), Some("x"));
    assert_eq!(token_text(declarators[0], Field::Value), Some("1"));
    assert_eq!(token_text(declarators[1], Field::Name), Some("y"));
    assert!(declarators[1].field(Field::Value).is_none());
}

#[test]
fn array_and_constant_declarations() {
    let parsed = parse("integer array xs\nconstant real PI = 3.14");
    assert!(!parsed.has_errors());
    let decls: Vec<&SyntaxNode> = parsed.tree.child_nodes().collect();
    assert_eq!(decls.len(), 2);

    assert_eq!(token_text(decls[0], Field::Type), Some("integer"));
    assert_eq!(token_text(decls[0], Field::Modifier), Some("array"));

    let modifiers: Vec<&str> = decls[1]
        .fields(Field::Modifier)
        .filter_map(SyntaxElement::as_token)
        .map(|t| t.value.as_str())
        .collect();
    assert_eq!(modifiers, vec!["constant"]);
    assert_eq!(token_text(decls[1], Field::Type), Some("real"));
}

#[test]
fn untyped_local_declaration() {
    let parsed = parse("local count = 0");
    assert!(!parsed.has_errors());
    let decl = only_statement(&parsed.tree);
    assert_eq!(decl.kind(), NodeKind::VariableDeclaration);
    assert!(decl.field(Field::Type).is_none());
}

#[test]
fn function_definition_with_method_name() {
    let parsed = parse("function Unit:kill(integer id, by)\n    return id\nend");
    assert!(!parsed.has_errors(), "{:?}", parsed.errors());

    let function = only_statement(&parsed.tree);
    assert_eq!(function.kind(), NodeKind::FunctionDefinition);

    let name = function.field_node(Field::Name).expect("function name");
    assert_eq!(name.kind(), NodeKind::FunctionName);
    assert_eq!(token_text(name, Field::Prefix), Some("Unit"));
    assert_eq!(token_text(name, Field::Method), Some("kill"));

    let params: Vec<&SyntaxNode> = function
        .field_node(Field::Parameters)
        .expect("parameters")
        .child_nodes()
        .collect();
    assert_eq!(params.len(), 2);
    assert_eq!(token_text(params[0], Field::Type), Some("integer"));
    assert_eq!(token_text(params[0], Field::Name), Some("id"));
    assert_eq!(token_text(params[1], Field::Type), None);
    assert_eq!(token_text(params[1], Field::Name), Some("by"));

    let body = function.field_node(Field::Body).expect("body");
    assert_eq!(body.child_nodes().next().map(|s| s.kind()), Some(NodeKind::ReturnStatement));
}

#[test]
fn empty_blocks_have_no_body() {
    let parsed = parse("while x do end");
    let statement = only_statement(&parsed.tree);
    assert!(statement.field(Field::Body).is_none());
    assert_eq!(
        statement.field_token(Field::End).map(|t| t.kind),
        Some(Kind::End)
    );
}

#[test]
fn repeat_until_takes_a_condition() {
    let parsed = parse("repeat\n    i = i + 1\nuntil i >= 10");
    assert!(!parsed.has_errors());
    let repeat = only_statement(&parsed.tree);
    assert_eq!(repeat.kind(), NodeKind::RepeatStatement);
    assert_eq!(token_text(repeat, Field::End), Some("until"));
    let condition = repeat.field_node(Field::Condition).expect("condition");
    assert_eq!(token_text(condition, Field::Operator), Some(">="));
}

#[test]
fn if_chains_collect_alternatives() {
    let source = "if a then x() elseif b then y() elseif c then z() else w() end";
    let parsed = parse(source);
    assert!(!parsed.has_errors());
    let statement = only_statement(&parsed.tree);
    let kinds: Vec<NodeKind> = statement
        .fields(Field::Alternative)
        .filter_map(SyntaxElement::as_node)
        .map(|n| n.kind())
        .collect();
    assert_eq!(
        kinds,
        vec![NodeKind::ElseifClause, NodeKind::ElseifClause, NodeKind::ElseClause]
    );
}

#[test]
fn jass_blocks_use_their_own_closers() {
    let source = "globals\n    integer n\nendglobals\nstruct Hero\n    real hp\nendstruct\nloop\n    break\nendloop";
    let parsed = parse(source);
    assert!(!parsed.has_errors(), "{:?}", parsed.errors());
    let closers: Vec<&str> = parsed
        .tree
        .child_nodes()
        .filter_map(|n| n.field_token(Field::End))
        .map(|t| t.value.as_str())
        .collect();
    assert_eq!(closers, vec!["endglobals", "endstruct", "endloop"]);
}

#[test]
fn table_fields_of_every_shape() {
    let parsed = parse("t = { 1, x = 2, [k] = 3; }");
    assert!(!parsed.has_errors(), "{:?}", parsed.errors());

    let assignment = expression(&parsed.tree);
    let table = assignment.field_node(Field::Right).expect("table");
    assert_eq!(table.kind(), NodeKind::TableConstructor);

    let fields: Vec<&SyntaxNode> = table.child_nodes().collect();
    assert_eq!(fields.len(), 3);
    assert!(fields[0].field(Field::Key).is_none());
    assert_eq!(token_text(fields[0], Field::Value), Some("1"));
    assert_eq!(token_text(fields[1], Field::Key), Some("x"));
    assert_eq!(token_text(fields[2], Field::Key), Some("k"));
    assert_eq!(token_text(fields[2], Field::Value), Some("3"));
}

#[test]
fn comments_stay_in_the_tree() {
    let source = "x = 1 // one\n/* two */ y = 2";
    let parsed = parse(source);
    assert!(!parsed.has_errors());

    let comments = parsed.tree.find_all(NodeKind::BlockComment);
    assert_eq!(comments.len(), 1);
    assert_eq!(token_text(comments[0], Field::Content), Some(" two "));

    let line_comments = parsed
        .tree
        .descendants()
        .into_iter()
        .flat_map(|n| n.children())
        .filter_map(SyntaxElement::as_token)
        .filter(|t| t.kind == Kind::LineComment)
        .count();
    assert_eq!(line_comments, 1);
}

#[test]
fn missing_then_is_inserted() {
    let parsed = parse("if a print(a) end");
    assert_eq!(parsed.parse_errors.len(), 1);
    assert_eq!(parsed.parse_errors[0].kind, ParseErrorKind::UnexpectedToken);

    let statement = only_statement(&parsed.tree);
    assert!(statement
        .children()
        .iter()
        .any(|c| matches!(c, SyntaxElement::Missing { kind: Kind::Then, .. })));
    assert!(statement.field_node(Field::Body).is_some());
    assert!(statement.closer().is_some_and(|end| !end.is_missing()));
}

#[test]
fn stray_closer_at_top_level_becomes_error_node() {
    let parsed = parse("end\nx = 1");
    assert_eq!(parsed.parse_errors.len(), 1);

    let kinds: Vec<NodeKind> = parsed.tree.child_nodes().map(|n| n.kind()).collect();
    assert_eq!(kinds, vec![NodeKind::Error, NodeKind::ExpressionStatement]);
}

#[test]
fn stray_closer_inside_a_block_does_not_close_it() {
    let parsed = parse("while x do\n    endloop\nend");
    assert_eq!(parsed.parse_errors.len(), 1);
    assert!(parsed.parse_errors[0].message.contains("does not close any open block"));

    let statement = only_statement(&parsed.tree);
    assert!(statement.closer().is_some_and(|end| !end.is_missing()));
    assert!(statement.has_errors());
}

#[test]
fn missing_operand_is_reported_once() {
    let parsed = parse("x = (a + ) * 2");
    assert_eq!(parsed.parse_errors.len(), 1);
    assert!(parsed.parse_errors[0].message.starts_with("expected expression"));
    assert!(parsed.tree.has_errors());
}

#[test]
fn unrecognized_characters_do_not_stop_the_parse() {
    let parsed = parse("x = 1 @\ny = 2");
    assert_eq!(parsed.scan_errors.len(), 1);
    let statements: Vec<&SyntaxNode> = parsed
        .tree
        .child_nodes()
        .filter(|n| n.kind() == NodeKind::ExpressionStatement)
        .collect();
    assert_eq!(statements.len(), 2);
}

#[test]
fn anonymous_functions_are_values() {
    let parsed = parse("local f = function(a, b) return a .. b end");
    assert!(!parsed.has_errors(), "{:?}", parsed.errors());
    let functions = parsed.tree.find_all(NodeKind::FunctionExpression);
    assert_eq!(functions.len(), 1);
    assert_eq!(
        functions[0].field_token(Field::End).map(|t| t.kind),
        Some(Kind::End)
    );
}

#[test]
fn empty_table_fields_are_skipped() {
    let parsed = parse("t = {,}");
    assert_eq!(parsed.parse_errors.len(), 1, "{:?}", parsed.errors());
    assert_eq!(parsed.parse_errors[0].kind, ParseErrorKind::UnexpectedToken);
    assert_eq!(parsed.parse_errors[0].found, Kind::Comma);

    let table = parsed.tree.find_all(NodeKind::TableConstructor)[0];
    let last = table.children().last().expect("closing brace");
    assert!(matches!(last, SyntaxElement::Token(t) if t.kind == Kind::RBrace));
    assert_eq!(table.find_all(NodeKind::Error).len(), 1);

    let parsed = parse("t = { 1;; 2 }");
    assert_eq!(parsed.parse_errors.len(), 1, "{:?}", parsed.errors());
    let table = parsed.tree.find_all(NodeKind::TableConstructor)[0];
    assert_eq!(table.find_all(NodeKind::Field).len(), 2);
}

#[test]
fn number_after_dot_is_not_a_member_name() {
    let parsed = parse("x = a.5");
    assert!(parsed.scan_errors.is_empty());
    assert_eq!(parsed.parse_errors.len(), 1, "{:?}", parsed.errors());
    assert_eq!(parsed.parse_errors[0].kind, ParseErrorKind::MissingField);
    assert_eq!(parsed.parse_errors[0].found, Kind::Number);

    let member = parsed.tree.find_all(NodeKind::MemberExpression)[0];
    assert!(member.field(Field::Name).is_some_and(|name| name.is_missing()));
}

#[test]
fn keyword_as_member_name_is_named_in_the_message() {
    let parsed = parse("x = t.while");
    let error = &parsed.parse_errors[0];
    assert_eq!(error.kind, ParseErrorKind::MissingField);
    assert!(error.message.ends_with("found keyword `while`"), "{}", error.message);

    let parsed = parse("x = t.");
    assert!(!parsed.parse_errors[0].message.contains("keyword"));
}
