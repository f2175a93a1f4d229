//! Integration tests for the Ard parser.

use ard_parser::ast::*;
use ard_parser::parse;

// ── Helpers ────────────────────────────────────────────────────────────

/// Parse source and assert there are no errors.
fn parse_ok(source: &str) -> Program {
    let result = parse(source);
    assert!(
        result.errors.is_empty(),
        "unexpected parse errors for {source:?}: {:?}",
        result.errors
    );
    result.program
}

/// Parse a single statement.
fn single_stmt(source: &str) -> Stmt {
    let mut program = parse_ok(source);
    assert_eq!(program.statements.len(), 1, "expected one statement in {source:?}");
    program.statements.remove(0)
}

/// Parse a single expression statement.
fn single_expr(source: &str) -> Expr {
    match single_stmt(source) {
        Stmt::Expr(expr) => expr,
        other => panic!("expected expression statement, got {other:?}"),
    }
}

// ── Statements ─────────────────────────────────────────────────────────

#[test]
fn parses_immutable_let() {
    match single_stmt("let age: Int = 32") {
        Stmt::Let(l) => {
            assert!(!l.mutable);
            assert_eq!(l.name, "age");
            assert!(matches!(
                l.ty,
                Some(TypeExpr { kind: TypeExprKind::Named(ref n), .. }) if n == "Int"
            ));
            assert!(matches!(l.value.kind, ExprKind::Int(32)));
        }
        other => panic!("expected let, got {other:?}"),
    }
}

#[test]
fn parses_mut_without_annotation() {
    match single_stmt("mut count = 0") {
        Stmt::Let(l) => {
            assert!(l.mutable);
            assert!(l.ty.is_none());
        }
        other => panic!("expected let, got {other:?}"),
    }
}

#[test]
fn parses_reassignment() {
    match single_stmt("name = 0") {
        Stmt::Assign(a) => {
            assert!(matches!(a.target.kind, ExprKind::Ident(ref n) if n == "name"));
            assert!(matches!(a.value.kind, ExprKind::Int(0)));
        }
        other => panic!("expected assignment, got {other:?}"),
    }
}

#[test]
fn parses_property_assignment() {
    match single_stmt("p.x = 3") {
        Stmt::Assign(a) => {
            assert!(matches!(a.target.kind, ExprKind::Property { .. }));
        }
        other => panic!("expected assignment, got {other:?}"),
    }
}

#[test]
fn parses_fn_with_result_return() {
    match single_stmt("fn divide(a: Int, b: Int) Int!Str { a }") {
        Stmt::Fn(f) => {
            assert_eq!(f.name, "divide");
            assert_eq!(f.params.len(), 2);
            assert!(matches!(
                f.ret,
                Some(TypeExpr { kind: TypeExprKind::Result(..), .. })
            ));
        }
        other => panic!("expected fn, got {other:?}"),
    }
}

#[test]
fn parses_generic_fn() {
    match single_stmt("fn first<$T>(items: [$T]) $T? { items.at(0) }") {
        Stmt::Fn(f) => {
            assert_eq!(f.generics, vec!["$T"]);
            assert!(matches!(
                f.params[0].ty.kind,
                TypeExprKind::List(ref inner)
                    if matches!(inner.kind, TypeExprKind::Generic(ref g) if g == "$T")
            ));
            assert!(matches!(f.ret, Some(TypeExpr { kind: TypeExprKind::Maybe(_), .. })));
        }
        other => panic!("expected fn, got {other:?}"),
    }
}

#[test]
fn parses_enum_decl() {
    match single_stmt("enum Dir { up, down, left, right }") {
        Stmt::Enum(e) => {
            let names: Vec<&str> = e.variants.iter().map(|v| v.name.as_str()).collect();
            assert_eq!(names, vec!["up", "down", "left", "right"]);
        }
        other => panic!("expected enum, got {other:?}"),
    }
}

#[test]
fn parses_struct_decl_multiline() {
    let src = "struct Point {\n  x: Int\n  y: Int\n}";
    match single_stmt(src) {
        Stmt::Struct(s) => {
            assert_eq!(s.name, "Point");
            assert_eq!(s.fields.len(), 2);
        }
        other => panic!("expected struct, got {other:?}"),
    }
}

#[test]
fn parses_impl_block_with_mut_method() {
    let src = "impl Counter {\n  fn get() Int { @count }\n  fn mut bump() { }\n}";
    match single_stmt(src) {
        Stmt::Impl(i) => {
            assert_eq!(i.target, "Counter");
            assert!(!i.mutable);
            assert_eq!(i.methods.len(), 2);
            assert!(!i.methods[0].mutates);
            assert!(i.methods[1].mutates);
        }
        other => panic!("expected impl, got {other:?}"),
    }
}

#[test]
fn parses_mut_impl_block() {
    match single_stmt("impl mut Counter { fn bump() { } }") {
        Stmt::Impl(i) => assert!(i.mutable),
        other => panic!("expected impl, got {other:?}"),
    }
}

#[test]
fn parses_trait_decl() {
    let src = "trait ToString {\n  fn to_str() Str\n}";
    match single_stmt(src) {
        Stmt::Trait(t) => {
            assert_eq!(t.name, "ToString");
            assert_eq!(t.methods.len(), 1);
            assert_eq!(t.methods[0].name, "to_str");
        }
        other => panic!("expected trait, got {other:?}"),
    }
}

#[test]
fn parses_union_decl() {
    match single_stmt("union Shape = Circle | Rect | Int") {
        Stmt::Union(u) => {
            assert_eq!(u.name, "Shape");
            assert_eq!(u.members.len(), 3);
        }
        other => panic!("expected union, got {other:?}"),
    }
}

#[test]
fn parses_use_directives_in_order() {
    let program = parse_ok("use ard/io\nuse ard/json as j\nlet x = 1");
    assert_eq!(program.imports.len(), 2);
    assert_eq!(program.imports[0].path, "ard/io");
    assert_eq!(program.imports[0].binding_name(), "io");
    assert_eq!(program.imports[1].path, "ard/json");
    assert_eq!(program.imports[1].binding_name(), "j");
    assert_eq!(program.statements.len(), 1);
}

#[test]
fn parses_while_loop() {
    match single_stmt("while x < 10 { x }") {
        Stmt::While(w) => {
            assert!(matches!(w.cond.kind, ExprKind::Binary { op: BinaryOp::Lt, .. }));
        }
        other => panic!("expected while, got {other:?}"),
    }
}

#[test]
fn parses_for_in_range() {
    match single_stmt("for i in 0..10 { i }") {
        Stmt::ForIn(f) => {
            assert_eq!(f.binding, "i");
            assert!(f.second.is_none());
            assert!(matches!(f.iterable, ForIterable::Range(..)));
        }
        other => panic!("expected for-in, got {other:?}"),
    }
}

#[test]
fn parses_for_in_with_index() {
    match single_stmt("for item, i in items { item }") {
        Stmt::ForIn(f) => {
            assert_eq!(f.binding, "item");
            assert_eq!(f.second.as_ref().map(|(n, _)| n.as_str()), Some("i"));
            assert!(matches!(f.iterable, ForIterable::Expr(_)));
        }
        other => panic!("expected for-in, got {other:?}"),
    }
}

#[test]
fn parses_classical_for() {
    match single_stmt("for mut i = 0; i < 5; i = i + 1 { i }") {
        Stmt::ForClassic(f) => {
            assert!(matches!(*f.init, Stmt::Let(_)));
            assert!(matches!(*f.update, Stmt::Assign(_)));
        }
        other => panic!("expected classical for, got {other:?}"),
    }
}

// ── Expressions ────────────────────────────────────────────────────────

#[test]
fn binary_precedence() {
    match single_expr("1 + 2 * 3") {
        Expr { kind: ExprKind::Binary { op: BinaryOp::Add, rhs, .. }, .. } => {
            assert!(matches!(rhs.kind, ExprKind::Binary { op: BinaryOp::Mul, .. }));
        }
        other => panic!("expected binary, got {other:?}"),
    }
}

#[test]
fn and_binds_looser_than_equality() {
    match single_expr("a == 1 and b == 2") {
        Expr { kind: ExprKind::Binary { op: BinaryOp::And, lhs, rhs, .. }, .. } => {
            assert!(matches!(lhs.kind, ExprKind::Binary { op: BinaryOp::Eq, .. }));
            assert!(matches!(rhs.kind, ExprKind::Binary { op: BinaryOp::Eq, .. }));
        }
        other => panic!("expected and, got {other:?}"),
    }
}

#[test]
fn parses_static_access_and_call() {
    match single_expr("Result::ok(3)") {
        Expr { kind: ExprKind::Call { callee, args, .. }, .. } => {
            assert!(matches!(
                callee.kind,
                ExprKind::StaticAccess { ref base, ref member, .. }
                    if base == "Result" && member == "ok"
            ));
            assert_eq!(args.len(), 1);
        }
        other => panic!("expected call, got {other:?}"),
    }
}

#[test]
fn parses_method_chain() {
    match single_expr("name.size.to_str()") {
        Expr { kind: ExprKind::Call { callee, .. }, .. } => {
            assert!(matches!(callee.kind, ExprKind::Property { .. }));
        }
        other => panic!("expected call, got {other:?}"),
    }
}

#[test]
fn parses_explicit_type_args() {
    match single_expr("first<Int>(items)") {
        Expr { kind: ExprKind::Call { type_args, .. }, .. } => {
            assert_eq!(type_args.len(), 1);
        }
        other => panic!("expected call, got {other:?}"),
    }
}

#[test]
fn less_than_is_not_type_args() {
    match single_expr("a < b") {
        Expr { kind: ExprKind::Binary { op: BinaryOp::Lt, .. }, .. } => {}
        other => panic!("expected comparison, got {other:?}"),
    }
}

#[test]
fn parses_list_and_map_literals() {
    assert!(matches!(single_expr("[1, 2, 3]").kind, ExprKind::List(ref v) if v.len() == 3));
    assert!(matches!(single_expr("[]").kind, ExprKind::List(ref v) if v.is_empty()));
    assert!(matches!(single_expr("[:]").kind, ExprKind::Map(ref v) if v.is_empty()));
    assert!(
        matches!(single_expr("[\"a\": 1, \"b\": 2]").kind, ExprKind::Map(ref v) if v.len() == 2)
    );
}

#[test]
fn parses_interpolated_string() {
    match single_expr("\"hi {name}!\"") {
        Expr { kind: ExprKind::Str(parts), .. } => {
            assert_eq!(parts.len(), 3);
            assert!(matches!(parts[0], StrPart::Text(ref t) if t == "hi "));
            assert!(matches!(parts[1], StrPart::Expr(_)));
            assert!(matches!(parts[2], StrPart::Text(ref t) if t == "!"));
        }
        other => panic!("expected string, got {other:?}"),
    }
}

#[test]
fn interpolation_spans_point_into_source() {
    let src = "\"hi {name}!\"";
    match single_expr(src) {
        Expr { kind: ExprKind::Str(parts), .. } => match &parts[1] {
            StrPart::Expr(e) => assert_eq!(e.span.text(src), "name"),
            other => panic!("expected interpolation, got {other:?}"),
        },
        other => panic!("expected string, got {other:?}"),
    }
}

#[test]
fn parses_if_else_chain() {
    match single_expr("if a { 1 } else if b { 2 } else { 3 }") {
        Expr { kind: ExprKind::If(if_expr), .. } => {
            match if_expr.else_branch.as_deref() {
                Some(ElseBranch::If(nested)) => {
                    assert!(matches!(nested.kind, ExprKind::If(_)));
                }
                other => panic!("expected else-if, got {other:?}"),
            }
        }
        other => panic!("expected if, got {other:?}"),
    }
}

#[test]
fn parses_match_on_subject() {
    let src = "match d { Dir::up => \"n\", Dir::down => \"s\", _ => \"?\" }";
    match single_expr(src) {
        Expr { kind: ExprKind::Match(m), .. } => {
            assert!(m.subject.is_some());
            assert_eq!(m.arms.len(), 3);
            assert!(matches!(
                m.arms[0].pattern.kind,
                PatternKind::Path { ref base, ref member } if base == "Dir" && member == "up"
            ));
            assert!(matches!(m.arms[2].pattern.kind, PatternKind::Wildcard));
        }
        other => panic!("expected match, got {other:?}"),
    }
}

#[test]
fn parses_int_match_with_ranges() {
    let src = "match n {\n  0 => \"zero\"\n  1..10 => \"small\"\n  _ => \"big\"\n}";
    match single_expr(src) {
        Expr { kind: ExprKind::Match(m), .. } => {
            assert!(matches!(m.arms[0].pattern.kind, PatternKind::Int(0)));
            assert!(matches!(
                m.arms[1].pattern.kind,
                PatternKind::Range { start: 1, end: 10 }
            ));
        }
        other => panic!("expected match, got {other:?}"),
    }
}

#[test]
fn parses_result_match_ctor_patterns() {
    let src = "match r { ok(v) => v, err(e) => 0 }";
    match single_expr(src) {
        Expr { kind: ExprKind::Match(m), .. } => {
            assert!(matches!(
                m.arms[0].pattern.kind,
                PatternKind::Ctor { ref name, ref binding } if name == "ok" && binding == "v"
            ));
        }
        other => panic!("expected match, got {other:?}"),
    }
}

#[test]
fn parses_conditional_match() {
    let src = "match {\n  x > 10 => \"big\"\n  _ => \"small\"\n}";
    match single_expr(src) {
        Expr { kind: ExprKind::Match(m), .. } => {
            assert!(m.subject.is_none());
            assert!(matches!(m.arms[0].pattern.kind, PatternKind::Cond(_)));
            assert!(matches!(m.arms[1].pattern.kind, PatternKind::Wildcard));
        }
        other => panic!("expected match, got {other:?}"),
    }
}

#[test]
fn match_subject_is_not_struct_literal() {
    // `match d {` must treat `{` as the arm block, not a struct literal.
    let src = "match d { _ => 1 }";
    match single_expr(src) {
        Expr { kind: ExprKind::Match(m), .. } => {
            assert!(matches!(m.subject.as_deref(), Some(Expr { kind: ExprKind::Ident(_), .. })));
        }
        other => panic!("expected match, got {other:?}"),
    }
}

#[test]
fn parses_try_with_catch() {
    match single_expr("try io::read_file(path) -> e { \"\" }") {
        Expr { kind: ExprKind::Try { catch, .. }, .. } => {
            assert_eq!(catch.as_ref().map(|c| c.name.as_str()), Some("e"));
        }
        other => panic!("expected try, got {other:?}"),
    }
}

#[test]
fn parses_anonymous_fn() {
    match single_expr("fn() { 1 }") {
        Expr { kind: ExprKind::Func(f), .. } => {
            assert!(f.params.is_empty());
            assert!(f.ret.is_none());
        }
        other => panic!("expected fn expr, got {other:?}"),
    }
}

#[test]
fn parses_struct_literal() {
    match single_expr("Point { x: 1, y: 2 }") {
        Expr { kind: ExprKind::StructLit { name, fields, .. }, .. } => {
            assert_eq!(name, "Point");
            assert_eq!(fields.len(), 2);
        }
        other => panic!("expected struct literal, got {other:?}"),
    }
}

#[test]
fn parses_self_field() {
    match single_expr("@count") {
        Expr { kind: ExprKind::SelfField(name), .. } => assert_eq!(name, "count"),
        other => panic!("expected self field, got {other:?}"),
    }
}

// ── Types ──────────────────────────────────────────────────────────────

#[test]
fn parses_map_type() {
    match single_stmt("let scores: [Str:Int] = [:]") {
        Stmt::Let(l) => {
            assert!(matches!(l.ty, Some(TypeExpr { kind: TypeExprKind::Map(..), .. })));
        }
        other => panic!("expected let, got {other:?}"),
    }
}

#[test]
fn parses_maybe_of_list() {
    match single_stmt("fn f(x: Int) [Int]? { [] }") {
        Stmt::Fn(f) => match f.ret.unwrap().kind {
            TypeExprKind::Maybe(inner) => {
                assert!(matches!(inner.kind, TypeExprKind::List(_)));
            }
            other => panic!("expected maybe, got {other:?}"),
        },
        other => panic!("expected fn, got {other:?}"),
    }
}

#[test]
fn parses_fn_type_param() {
    match single_stmt("fn apply(cb: fn(Int) Str, x: Int) Str { cb(x) }") {
        Stmt::Fn(f) => {
            assert!(matches!(f.params[0].ty.kind, TypeExprKind::Func { .. }));
            assert_eq!(f.params[1].name, "x");
        }
        other => panic!("expected fn, got {other:?}"),
    }
}

// ── Spans and errors ───────────────────────────────────────────────────

#[test]
fn statement_spans_cover_source() {
    let src = "let x = 1";
    let program = parse_ok(src);
    assert_eq!(program.statements[0].span().text(src), src);
}

#[test]
fn reports_error_and_recovers() {
    let result = parse("let = 1\nlet y = 2");
    assert!(!result.errors.is_empty());
    // The second statement still parsed.
    assert!(result
        .program
        .statements
        .iter()
        .any(|s| matches!(s, Stmt::Let(l) if l.name == "y")));
}

#[test]
fn declaration_order_is_preserved() {
    let src = "enum A { a }\nstruct B { x: Int }\nfn c() { }";
    let program = parse_ok(src);
    assert!(matches!(program.statements[0], Stmt::Enum(_)));
    assert!(matches!(program.statements[1], Stmt::Struct(_)));
    assert!(matches!(program.statements[2], Stmt::Fn(_)));
}
