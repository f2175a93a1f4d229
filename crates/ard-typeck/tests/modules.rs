//! Module system tests: hard-coded standard library, embedded sources,
//! file-backed user modules, caching, and cycle detection.

use std::path::Path;
use std::rc::Rc;

use ard_typeck::{CheckResult, Checker, FileResolver, ModuleResolver, ResolveError};

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

/// Check a source file on disk with a file resolver rooted at its project.
fn check_file(dir: &Path, file: &str) -> Vec<String> {
    let path = dir.join(file);
    let source = std::fs::read_to_string(&path).unwrap();
    let parse = ard_parser::parse(&source);
    assert!(parse.errors.is_empty(), "{file} has syntax errors: {:?}", parse.errors);
    let resolver = FileResolver::from_dir(dir);
    let mut checker = Checker::new(&path, parse, Some(resolver as Rc<dyn ModuleResolver>));
    checker.check();
    checker.diagnostics().iter().map(|d| d.message.clone()).collect()
}

// ── Hard-coded standard library ────────────────────────────────────────

#[test]
fn io_module_functions_resolve() {
    assert_clean("use ard/io\nio::print(\"hello\")\nlet line: Str = io::read_line()");
}

#[test]
fn io_print_arguments_are_checked() {
    let msgs = messages("use ard/io\nio::print(42)");
    assert_eq!(msgs, vec!["Type mismatch: Expected Str, got Int"]);
}

#[test]
fn import_alias_renames_the_binding() {
    assert_clean("use ard/io as console\nconsole::print(\"hi\")");
}

#[test]
fn unknown_stdlib_module_reports_and_continues() {
    let msgs = messages("use ard/nonsense\nnonsense::anything()\nlet x: Int = 1");
    assert_eq!(
        msgs,
        vec![
            "Unknown module: ard/nonsense",
            "Undefined: nonsense::anything",
        ]
    );
}

#[test]
fn unknown_member_of_known_module() {
    let msgs = messages("use ard/io\nio::shout(\"hi\")");
    assert_eq!(msgs, vec!["Undefined: io::shout"]);
}

#[test]
fn http_structs_come_with_the_import() {
    assert_clean(
        "use ard/http\n\
         let request = Request { url: \"https://example.test\" }\n\
         let response = http::get(request)\n\
         let status: Int = match response {\n\
         \x20 r => r.status\n\
         \x20 none => 0\n\
         }",
    );
}

#[test]
fn sqlite_database_methods_travel_with_the_struct() {
    assert_clean(
        "use ard/sqlite\n\
         fn ping(path: Str) Void!Str {\n\
         \x20 let db = try sqlite::open(path)\n\
         \x20 try db.exec(\"select 1\")\n\
         \x20 Result::ok(db.close())\n\
         }",
    );
}

#[test]
fn math_module_is_plainly_typed() {
    assert_clean(
        "use ard/math\n\
         let a: Int = math::abs(0 - 3)\n\
         let b: Float = math::sqrt(2.0)",
    );
}

// ── Embedded standard library ──────────────────────────────────────────

#[test]
fn embedded_string_module_compiles_and_exports() {
    assert_clean(
        "use ard/string\n\
         let banner: Str = string::repeat(\"=\", 10)\n\
         let joined: Str = string::join([\"a\", \"b\"], \", \")",
    );
}

#[test]
fn embedded_list_module_compiles_and_exports() {
    assert_clean(
        "use ard/list\n\
         let total: Int = list::sum([1, 2, 3])\n\
         let csv: Str = list::join_ints([1, 2], \",\")",
    );
}

#[test]
fn embedded_module_arguments_are_checked() {
    let msgs = messages("use ard/string\nlet s = string::repeat(\"=\", \"10\")");
    assert_eq!(msgs, vec!["Type mismatch: Expected Int, got Str"]);
}

// ── Alias handling ─────────────────────────────────────────────────────

#[test]
fn duplicate_alias_warns_and_keeps_the_first() {
    let src = "use ard/io\nuse ard/json as io\nio::print(\"still io\")";
    let result = check_source(src);
    assert_eq!(result.diagnostics.len(), 1);
    assert_eq!(result.diagnostics[0].message, "Duplicate import alias: io");
    assert!(!result.has_errors());
}

// ── File-backed user modules ───────────────────────────────────────────

fn write(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, content).unwrap();
}

#[test]
fn user_module_resolves_through_the_manifest() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "ard.toml", "name = \"demo\"\n");
    write(dir.path(), "util.ard", "fn double(x: Int) Int { x * 2 }\n");
    write(
        dir.path(),
        "main.ard",
        "use demo/util\nlet x: Int = util::double(21)\n",
    );
    let msgs = check_file(dir.path(), "main.ard");
    assert!(msgs.is_empty(), "{msgs:?}");
}

#[test]
fn nested_module_paths_map_to_directories() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "ard.toml", "name = \"demo\"\n");
    write(
        dir.path(),
        "text/case.ard",
        "fn shout(s: Str) Str { s.to_upper() }\n",
    );
    write(
        dir.path(),
        "main.ard",
        "use demo/text/case\nlet s: Str = case::shout(\"hi\")\n",
    );
    let msgs = check_file(dir.path(), "main.ard");
    assert!(msgs.is_empty(), "{msgs:?}");
}

#[test]
fn imports_must_start_with_the_project_name() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "ard.toml", "name = \"demo\"\n");
    write(dir.path(), "util.ard", "fn id(x: Int) Int { x }\n");
    write(dir.path(), "main.ard", "use elsewhere/util\nlet x = 1\n");
    let msgs = check_file(dir.path(), "main.ard");
    assert_eq!(msgs, vec!["Unknown module: elsewhere/util"]);
}

#[test]
fn missing_module_file_reports_unknown() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "ard.toml", "name = \"demo\"\n");
    write(dir.path(), "main.ard", "use demo/ghost\nlet x = 1\n");
    let msgs = check_file(dir.path(), "main.ard");
    assert_eq!(msgs, vec!["Unknown module: demo/ghost"]);
}

#[test]
fn module_with_its_own_errors_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "ard.toml", "name = \"demo\"\n");
    write(dir.path(), "broken.ard", "let x: Int = \"oops\"\n");
    write(dir.path(), "main.ard", "use demo/broken\nlet x = 1\n");
    let msgs = check_file(dir.path(), "main.ard");
    assert_eq!(msgs, vec!["Module has errors: demo/broken (1)"]);
}

#[test]
fn private_symbols_do_not_cross_modules() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "ard.toml", "name = \"demo\"\n");
    write(
        dir.path(),
        "util.ard",
        "fn public_face() Int { _hidden() }\nfn _hidden() Int { 42 }\n",
    );
    write(
        dir.path(),
        "main.ard",
        "use demo/util\nlet x = util::_hidden()\n",
    );
    let msgs = check_file(dir.path(), "main.ard");
    assert_eq!(msgs, vec!["Undefined: util::_hidden"]);
}

#[test]
fn resolver_caches_by_canonical_path() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "ard.toml", "name = \"demo\"\n");
    write(dir.path(), "util.ard", "fn id(x: Int) Int { x }\n");
    let resolver = FileResolver::from_dir(dir.path());
    let first = resolver.resolve_import("demo/util").unwrap();
    let second = resolver.resolve_import("demo/util").unwrap();
    assert!(Rc::ptr_eq(&first, &second), "expected the cached module");
    assert!(first.get("id").is_some());
    assert!(first.program().is_some());
}

#[test]
fn import_cycles_error_instead_of_overflowing() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "ard.toml", "name = \"demo\"\n");
    write(dir.path(), "a.ard", "use demo/b\nfn fa() Int { 1 }\n");
    write(dir.path(), "b.ard", "use demo/a\nfn fb() Int { 2 }\n");
    let resolver = FileResolver::from_dir(dir.path());
    let err = resolver.resolve_import("demo/a").unwrap_err();
    assert!(
        matches!(err, ResolveError::Check { .. }),
        "cycle should surface as a failed module: {err:?}"
    );
}

#[test]
fn diamond_imports_are_not_cycles() {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "ard.toml", "name = \"demo\"\n");
    write(dir.path(), "shared.ard", "fn base() Int { 1 }\n");
    write(
        dir.path(),
        "left.ard",
        "use demo/shared\nfn l() Int { shared::base() + 1 }\n",
    );
    write(
        dir.path(),
        "right.ard",
        "use demo/shared\nfn r() Int { shared::base() + 2 }\n",
    );
    write(
        dir.path(),
        "main.ard",
        "use demo/left\nuse demo/right\nlet x: Int = left::l() + right::r()\n",
    );
    let msgs = check_file(dir.path(), "main.ard");
    assert!(msgs.is_empty(), "{msgs:?}");
}

// ── Module surface ─────────────────────────────────────────────────────

#[test]
fn checked_module_exposes_its_symbols() {
    let result = check_source(
        "fn helper() Int { 1 }\n\
         fn _private() Int { 2 }\n\
         struct Point {\n  x: Int\n}\n\
         enum Dir { up }",
    );
    assert!(result.diagnostics.is_empty());
    let module = &result.module;
    assert!(module.get("helper").is_some());
    assert!(module.get("_private").is_none(), "underscore names stay private");
    assert!(module.get("Point").is_some());
    assert!(module.get("Dir").is_some());
    assert!(module.program().is_some());
    assert!(module.registry().len() > 0);
}
