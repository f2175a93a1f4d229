//! Effect tracking: the `try` operator against Result-returning functions,
//! catch arms, and the isolation barrier around fiber bodies.

use ard_typeck::typed::{FiberTarget, TypedExprKind, TypedStmt};
use ard_typeck::{CheckResult, Type};

fn check_source(src: &str) -> CheckResult {
    let parse = ard_parser::parse(src);
    assert!(
        parse.errors.is_empty(),
        "unexpected parse errors for {src:?}: {:?}",
        parse.errors
    );
    ard_typeck::check(&parse)
}

fn messages(src: &str) -> Vec<String> {
    check_source(src)
        .diagnostics
        .iter()
        .map(|d| d.message.clone())
        .collect()
}

fn assert_clean(src: &str) {
    let result = check_source(src);
    assert!(
        result.diagnostics.is_empty(),
        "expected no diagnostics for {src:?}, got {:?}",
        result.diagnostics
    );
}

// ── The try operator ───────────────────────────────────────────────────

#[test]
fn try_unwraps_the_result_value() {
    assert_clean(
        "use ard/io\n\
         fn content_size(path: Str) Int!Str {\n\
         \x20 let content = try io::read_file(path)\n\
         \x20 Result::ok(content.size)\n\
         }",
    );
}

#[test]
fn try_requires_a_result_operand() {
    let src = "fn f() Int!Str {\n  let x = try 5\n  Result::ok(x)\n}";
    let msgs = messages(src);
    assert_eq!(msgs, vec!["'try' requires a Result value, got Int"]);
}

#[test]
fn try_requires_result_returning_function() {
    let src = "use ard/io\n\
               fn f(path: Str) Int {\n\
               \x20 let content = try io::read_file(path)\n\
               \x20 content.size\n\
               }";
    let msgs = messages(src);
    assert_eq!(
        msgs,
        vec!["'try' requires the enclosing function to return a Result, found Int"]
    );
}

#[test]
fn try_error_types_must_match() {
    let src = "use ard/io\n\
               fn f(path: Str) Int!Int {\n\
               \x20 let content = try io::read_file(path)\n\
               \x20 Result::ok(content.size)\n\
               }";
    let msgs = messages(src);
    assert_eq!(msgs, vec!["Type mismatch: Expected Int, got Str"]);
}

#[test]
fn try_outside_a_function_is_rejected() {
    let src = "use ard/io\nlet x = try io::read_file(\"a\")";
    let msgs = messages(src);
    assert_eq!(msgs, vec!["Cannot use 'try' outside of a function"]);
}

#[test]
fn try_catch_binds_the_error() {
    assert_clean(
        "use ard/io\n\
         fn read_or_reason(path: Str) Str {\n\
         \x20 try io::read_file(path) -> e { \"failed: \" + e }\n\
         }",
    );
}

#[test]
fn try_catch_lifts_the_result_requirement() {
    // With a catch arm the function may return a plain value; the catch
    // block produces that value on the error path.
    assert_clean(
        "use ard/io\n\
         fn size_or_zero(path: Str) Int {\n\
         \x20 let content = try io::read_file(path) -> e { 0 }\n\
         \x20 content.size\n\
         }",
    );
}

#[test]
fn try_catch_body_must_produce_the_return_type() {
    let src = "use ard/io\n\
               fn read_or(path: Str) Str {\n\
               \x20 try io::read_file(path) -> e { 5 }\n\
               }";
    let msgs = messages(src);
    assert_eq!(msgs, vec!["Type mismatch: Expected Str, got Int"]);
}

// ── Fibers and isolation ───────────────────────────────────────────────

#[test]
fn fiber_closure_reads_immutable_outer_state() {
    assert_clean(
        "use ard/async\n\
         let limit = 5\n\
         let f = async::start(fn() { let doubled = limit * 2 })",
    );
}

#[test]
fn fiber_closure_cannot_reach_mutable_outer_state() {
    let src = "use ard/async\n\
               mut counter = 0\n\
               async::start(fn() { counter + 1 })";
    assert_eq!(messages(src), vec!["Undefined variable: counter"]);
}

#[test]
fn fiber_closure_cannot_assign_mutable_outer_state() {
    let src = "use ard/async\n\
               mut counter = 0\n\
               async::start(fn() { counter = 1 })";
    assert_eq!(messages(src), vec!["Undefined variable: counter"]);
}

#[test]
fn fiber_from_module_function_records_the_target() {
    let src = "use ard/async\nuse ard/io\nlet f = async::start(io::read_line)";
    let result = check_source(src);
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    let program = result.module.program().unwrap();
    let TypedStmt::Let { value, ty, .. } = &program.statements[0] else {
        panic!("expected let");
    };
    assert_eq!(*ty, Type::fiber(Type::Str));
    match &value.kind {
        TypedExprKind::Fiber(FiberTarget::Named { module, function }) => {
            assert_eq!(module, "io");
            assert_eq!(function, "read_line");
        }
        other => panic!("expected a named fiber target, got {other:?}"),
    }
}

#[test]
fn fiber_closure_records_the_body() {
    let src = "use ard/async\nlet f = async::start(fn() { })";
    let result = check_source(src);
    assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
    let program = result.module.program().unwrap();
    let TypedStmt::Let { value, .. } = &program.statements[0] else {
        panic!("expected let");
    };
    assert!(matches!(
        value.kind,
        TypedExprKind::Fiber(FiberTarget::Closure(_))
    ));
}

#[test]
fn fiber_join_returns_the_wrapped_type() {
    assert_clean(
        "use ard/async\nuse ard/io\n\
         let f = async::start(io::read_line)\n\
         let line: Str = f.join()",
    );
}

#[test]
fn fiber_argument_must_be_callable_without_parameters() {
    let src = "use ard/async\nasync::start(fn(x: Int) { })";
    let msgs = messages(src);
    assert_eq!(
        msgs,
        vec!["async::start requires an anonymous function or a module function reference"]
    );
}

#[test]
fn fiber_argument_cannot_be_a_value() {
    let src = "use ard/async\nasync::start(5)";
    let msgs = messages(src);
    assert_eq!(
        msgs,
        vec!["async::start requires an anonymous function or a module function reference"]
    );
}

#[test]
fn fiber_body_may_call_module_functions() {
    assert_clean(
        "use ard/async\nuse ard/io\n\
         async::start(fn() { io::print(\"from fiber\") })",
    );
}
