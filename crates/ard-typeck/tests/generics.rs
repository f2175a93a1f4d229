//! Generic parameter binding: per-call-site instantiation, explicit type
//! arguments, and the standard library's predeclared generic signatures.

use ard_typeck::CheckResult;

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

const PICK: &str = "fn pick<$T>(a: $T, b: $T, first: Bool) $T {\n\
                    \x20 match first { true => a, false => b }\n\
                    }\n";

#[test]
fn generic_fn_instantiates_per_call_site() {
    assert_clean(&format!(
        "{PICK}let x: Int = pick(1, 2, true)\nlet s: Str = pick(\"a\", \"b\", false)"
    ));
}

#[test]
fn generic_binds_on_first_sight_and_sticks() {
    let msgs = messages(&format!("{PICK}let x = pick(1, \"two\", true)"));
    assert_eq!(msgs, vec!["Type mismatch: Expected Int, got Str"]);
}

#[test]
fn explicit_type_arguments_pre_bind() {
    assert_clean(&format!("{PICK}let s: Str = pick<Str>(\"a\", \"b\", true)"));
    let msgs = messages(&format!("{PICK}let s = pick<Str>(1, \"b\", true)"));
    assert_eq!(msgs, vec!["Type mismatch: Expected Str, got Int"]);
}

#[test]
fn explicit_type_argument_count_is_checked() {
    let msgs = messages(&format!("{PICK}let s = pick<Str, Int>(\"a\", \"b\", true)"));
    assert_eq!(msgs[0], "Expected 1 type arguments, got 2");
}

#[test]
fn generic_list_parameter_unifies_with_element() {
    assert_clean(
        "fn first_of<$T>(items: [$T], fallback: $T) $T {\n\
         \x20 items.at(0).or(fallback)\n\
         }\n\
         let x: Int = first_of([1, 2], 0)\n\
         let s: Str = first_of([\"a\"], \"z\")",
    );
}

#[test]
fn stdlib_maybe_constructors_are_generic() {
    assert_clean(
        "use ard/maybe\n\
         let x: Int? = maybe::some(3)\n\
         let y: Str? = maybe::none()",
    );
}

#[test]
fn stdlib_result_constructors_bind_from_context() {
    assert_clean(
        "fn parse_flag(text: Str) Bool!Str {\n\
         \x20 match text == \"on\" {\n\
         \x20   true => Result::ok(true)\n\
         \x20   false => Result::err(\"unknown flag\")\n\
         \x20 }\n\
         }",
    );
}

#[test]
fn json_decode_binds_from_annotation() {
    assert_clean(
        "use ard/json\n\
         struct Config {\n\
         \x20 port: Int\n\
         }\n\
         fn load(text: Str) Config!Str {\n\
         \x20 let config: Config = try json::decode(text)\n\
         \x20 Result::ok(config)\n\
         }",
    );
}

#[test]
fn generic_body_treats_parameters_abstractly() {
    // `$T` supports no arithmetic inside the definition.
    let msgs = messages("fn double<$T>(value: $T) $T { value + value }");
    assert_eq!(msgs, vec!["Invalid operands for '+': $T and $T"]);
}

#[test]
fn signature_variables_are_local_to_the_signature() {
    // Two generic functions may both call their parameter `$T`; the
    // instantiations never interfere.
    assert_clean(
        "fn id_a<$T>(value: $T) $T { value }\n\
         fn id_b<$T>(value: $T) $T { value }\n\
         let x: Int = id_a(1)\n\
         let s: Str = id_b(\"a\")\n\
         let y: Str = id_a(\"again\")",
    );
}

#[test]
fn unknown_generic_name_in_type_position() {
    let msgs = messages("fn f(value: $T) Int { 1 }");
    assert_eq!(msgs, vec!["Unknown type: $T"]);
}
