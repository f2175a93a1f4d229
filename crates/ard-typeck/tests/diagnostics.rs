//! Diagnostic tests for the Ard checker.
//!
//! Each test feeds source through the full parse-and-check pipeline and
//! asserts on the fixed diagnostic messages, their order, and their spans.

use ard_typeck::diagnostics::{render_diagnostic, DiagnosticOptions};
use ard_typeck::{CheckResult, Severity};

// ── Helpers ────────────────────────────────────────────────────────────

/// Parse Ard source and run the type checker. Panics on syntax errors; the
/// checker only runs against valid trees.
fn check_source(src: &str) -> CheckResult {
    let parse = ard_parser::parse(src);
    assert!(
        parse.errors.is_empty(),
        "unexpected parse errors for {src:?}: {:?}",
        parse.errors
    );
    ard_typeck::check(&parse)
}

/// Error and warning messages in emission order.
fn messages(src: &str) -> Vec<String> {
    check_source(src)
        .diagnostics
        .iter()
        .map(|d| d.message.clone())
        .collect()
}

/// Assert a program checks cleanly.
fn assert_clean(src: &str) {
    let result = check_source(src);
    assert!(
        result.diagnostics.is_empty(),
        "expected no diagnostics for {src:?}, got {:?}",
        result.diagnostics
    );
}

// ── Boundary scenarios ─────────────────────────────────────────────────

#[test]
fn int_annotation_rejects_string() {
    let msgs = messages("let age: Int = \"32\"");
    assert_eq!(msgs, vec!["Type mismatch: Expected Int, got Str"]);
}

#[test]
fn int_literal_does_not_widen_to_float() {
    let msgs = messages("let temp: Float = 98");
    assert_eq!(msgs, vec!["Type mismatch: Expected Float, got Int"]);
}

#[test]
fn immutable_reassignment_reports_both_problems() {
    let msgs = messages("let name = \"Bob\"\nname = 0");
    assert_eq!(
        msgs,
        vec![
            "Immutable variable: name",
            "Type mismatch: Expected Str, got Int",
        ]
    );
}

#[test]
fn incomplete_enum_match_reports_each_missing_variant() {
    let src = "enum Dir { up, down, left, right }\n\
               let d = Dir::up\n\
               match d { Dir::up => \"n\", Dir::down => \"s\" }";
    let msgs = messages(src);
    assert_eq!(
        msgs,
        vec![
            "Incomplete match: missing case for 'Dir::left'",
            "Incomplete match: missing case for 'Dir::right'",
        ]
    );
}

#[test]
fn fiber_body_cannot_see_mutable_outer_binding() {
    let src = "use ard/async\n\
               mut duration = 10\n\
               async::start(fn() { duration + 1 })";
    let msgs = messages(src);
    assert_eq!(msgs, vec!["Undefined variable: duration"]);
}

#[test]
fn divide_with_result_return_is_clean() {
    assert_clean(
        "fn divide(a: Int, b: Int) Int!Str {\n\
         \x20 match b == 0 {\n\
         \x20   true => Result::err(\"div0\")\n\
         \x20   false => Result::ok(a/b)\n\
         \x20 }\n\
         }",
    );
}

#[test]
fn unknown_property_reports_full_access_path() {
    let msgs = messages("\"foo\".length");
    assert_eq!(msgs, vec!["Undefined: \"foo\".length"]);
}

// ── Message fixtures ───────────────────────────────────────────────────

#[test]
fn undefined_variable() {
    assert_eq!(messages("x + 1"), vec!["Undefined variable: x"]);
}

#[test]
fn if_condition_must_be_boolean() {
    let msgs = messages("if 1 { 2 } else { 3 }");
    assert_eq!(msgs, vec!["If conditions must be boolean expressions"]);
}

#[test]
fn while_condition_must_be_boolean() {
    let msgs = messages("while \"yes\" { }");
    assert_eq!(msgs, vec!["While conditions must be boolean expressions"]);
}

#[test]
fn if_branches_must_agree() {
    let src = "let c = true\nlet x = if c { 1 } else { \"one\" }";
    let msgs = messages(src);
    assert_eq!(msgs, vec!["All branches must have the same result type"]);
}

#[test]
fn empty_list_needs_annotation() {
    assert_eq!(messages("let xs = []"), vec!["Empty list needs an explicit type"]);
    assert_clean("let xs: [Int] = []");
}

#[test]
fn empty_map_needs_annotation() {
    assert_eq!(messages("let m = [:]"), vec!["Empty map needs an explicit type"]);
    assert_clean("let m: [Str:Int] = [:]");
}

#[test]
fn list_elements_must_agree() {
    let msgs = messages("let xs = [1, 2, \"three\"]");
    assert_eq!(msgs, vec!["Type mismatch: Expected Int, got Str"]);
}

#[test]
fn arithmetic_requires_matching_numerics() {
    assert_eq!(
        messages("let x = 1 + 1.5"),
        vec!["Invalid operands for '+': Int and Float"]
    );
    assert_eq!(
        messages("let x = \"a\" - \"b\""),
        vec!["Invalid operands for '-': Str and Str"]
    );
    assert_clean("let x = \"a\" + \"b\"");
    assert_clean("let x = 1.5 * 2.0");
    assert_eq!(
        messages("let x = 1.5 % 2.0"),
        vec!["Invalid operands for '%': Float and Float"]
    );
}

#[test]
fn equality_is_restricted_to_comparable_types() {
    assert_clean("let eq = 1 == 2");
    assert_clean("let eq = \"a\" != \"b\"");
    let msgs = messages("let eq = [1] == [1]");
    assert_eq!(msgs, vec!["Cannot compare values of type [Int]"]);
}

#[test]
fn logical_operators_require_booleans() {
    assert_eq!(
        messages("let x = 1 and true"),
        vec!["Invalid operands for 'and': Int and Bool"]
    );
    assert_clean("let x = true or false");
    assert_eq!(messages("let x = not 3"), vec!["Invalid operand for 'not': Int"]);
    assert_clean("let x = -3\nlet y = -1.5");
    assert_eq!(messages("let x = -true"), vec!["Invalid operand for '-': Bool"]);
}

#[test]
fn duplicate_definitions_are_rejected() {
    assert_eq!(
        messages("let x = 1\nlet x = 2"),
        vec!["Duplicate definition: x"]
    );
}

#[test]
fn maybe_widening_is_one_way() {
    assert_clean("let x: Int? = 5");
    let msgs = messages("let y: Int = Maybe::some(5)");
    assert_eq!(msgs, vec!["Type mismatch: Expected Int, got Int?"]);
}

#[test]
fn maybe_or_returns_the_inner_type() {
    assert_clean("let x: Int? = 5\nlet y: Int = x.or(0)");
    let msgs = messages("let x: Int? = 5\nlet y: Int = x.or(\"zero\")");
    assert_eq!(msgs, vec!["Type mismatch: Expected Int, got Str"]);
}

#[test]
fn unresolved_generic_needs_annotation() {
    let msgs = messages("let x = Maybe::none()");
    assert_eq!(
        msgs,
        vec!["Cannot infer generic type $T; needs an explicit type"]
    );
    assert_clean("let x: Int? = Maybe::none()");
}

#[test]
fn calling_a_non_function() {
    let msgs = messages("let x = 42\nx(1)");
    assert_eq!(msgs, vec!["Not a function: x"]);
}

#[test]
fn call_arity_is_checked() {
    let src = "fn add(a: Int, b: Int) Int { a + b }\nadd(1)";
    assert_eq!(messages(src), vec!["Expected 2 arguments, got 1"]);
}

#[test]
fn return_type_mismatch_on_trailing_expression() {
    let src = "fn f() Int { \"nope\" }";
    assert_eq!(messages(src), vec!["Type mismatch: Expected Int, got Str"]);
}

#[test]
fn implicit_return_accepts_maybe_widening() {
    assert_clean("fn f(x: Int) Int? { x }");
}

#[test]
fn explicit_return_is_checked() {
    assert_clean("fn f(x: Int) Int { return x }");
    let msgs = messages("fn f(x: Int) Int { return \"x\" }");
    assert_eq!(msgs, vec!["Type mismatch: Expected Int, got Str"]);
}

#[test]
fn interpolation_accepts_primitives_and_maybe() {
    assert_clean("let n = 3\nlet m: Int? = 4\nlet s = \"n={n} m={m} f={1.5} b={true}\"");
}

#[test]
fn interpolation_rejects_unconvertible_values() {
    let msgs = messages("let xs = [1, 2]\nlet s = \"xs={xs}\"");
    assert_eq!(msgs, vec!["Cannot convert [Int] to Str"]);
}

// ── Ordering, determinism, idempotency ─────────────────────────────────

#[test]
fn diagnostics_follow_source_order() {
    let src = "let a: Int = \"one\"\nlet b: Str = 2\nlet c: Bool = 3";
    let msgs = messages(src);
    assert_eq!(
        msgs,
        vec![
            "Type mismatch: Expected Int, got Str",
            "Type mismatch: Expected Str, got Int",
            "Type mismatch: Expected Bool, got Int",
        ]
    );
}

#[test]
fn checking_is_deterministic() {
    let src = "enum Dir { up, down }\nlet d = Dir::up\nmatch d { Dir::up => 1 }\nlet x: Int = \"s\"";
    let first = check_source(src);
    let second = check_source(src);
    assert_eq!(first.diagnostics, second.diagnostics);
}

#[test]
fn check_is_idempotent() {
    let parse = ard_parser::parse("let x: Int = \"s\"");
    let mut checker = ard_typeck::Checker::new("main.ard", parse, None);
    checker.check();
    let first = checker.diagnostics().to_vec();
    checker.check();
    assert_eq!(checker.diagnostics(), first.as_slice());
}

#[test]
fn spans_point_at_the_offending_expression() {
    let src = "let age: Int = \"32\"";
    let result = check_source(src);
    let range = result.diagnostics[0].range;
    assert_eq!(&src[range.start as usize..range.end as usize], "\"32\"");
}

#[test]
fn warnings_do_not_count_as_errors() {
    let src = "use ard/io\nuse ard/io";
    let result = check_source(src);
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].kind, Severity::Warn);
    assert_eq!(result.diagnostics[0].message, "Duplicate import alias: io");
    assert!(!result.has_errors());
}

// ── Rendering ──────────────────────────────────────────────────────────

#[test]
fn rendered_report_includes_message() {
    let src = "let age: Int = \"32\"";
    let result = check_source(src);
    let out = render_diagnostic(
        &result.diagnostics[0],
        src,
        "main.ard",
        &DiagnosticOptions::colorless(),
    );
    assert!(out.contains("Type mismatch: Expected Int, got Str"), "{out}");
    assert!(out.contains("main.ard"), "{out}");
}

#[test]
fn json_rendering_round_trips() {
    let src = "let age: Int = \"32\"";
    let result = check_source(src);
    let out = render_diagnostic(
        &result.diagnostics[0],
        src,
        "main.ard",
        &DiagnosticOptions::json_mode(),
    );
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["severity"], "error");
    assert_eq!(value["message"], "Type mismatch: Expected Int, got Str");
}
