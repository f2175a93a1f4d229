//! The hard-coded standard library.
//!
//! Each `ard/<name>` package is a table of publicly-exported symbols with
//! predeclared signatures; there is no source to check. Generic signatures
//! carry `$`-named type variables that every call site instantiates fresh.
//!
//! `Result` and `Maybe` construction (`Result::ok`, `Maybe::some`, ...) is
//! additionally reachable without any import; see
//! [`builtin_static`].

use std::cell::RefCell;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::modules::Module;
use crate::registry::{Method, TypeRegistry};
use crate::scope::{Symbol, SymbolKind};
use crate::ty::{FunctionType, StructField, StructType, Type};

/// Look up a hard-coded package by its full `ard/...` path.
pub fn lookup(path: &str) -> Option<Rc<Module>> {
    let module = match path {
        "ard/io" => io_module(),
        "ard/maybe" => maybe_module(),
        "ard/result" => result_module(),
        "ard/json" => json_module(),
        "ard/http" => http_module(),
        "ard/sqlite" => sqlite_module(),
        "ard/async" => async_module(),
        "ard/math" => math_module(),
        _ => return None,
    };
    Some(Rc::new(module))
}

/// A static constructor on the always-in-scope `Result`/`Maybe` namespaces.
pub fn builtin_static(base: &str, member: &str) -> Option<Rc<FunctionType>> {
    let f = match (base, member) {
        ("Result", "ok") => generic_fn(
            &["$V", "$E"],
            vec![("value", var("$V"))],
            Type::result(var("$V"), var("$E")),
        ),
        ("Result", "err") => generic_fn(
            &["$V", "$E"],
            vec![("error", var("$E"))],
            Type::result(var("$V"), var("$E")),
        ),
        ("Maybe", "some") => {
            generic_fn(&["$T"], vec![("value", var("$T"))], Type::maybe(var("$T")))
        }
        ("Maybe", "none") => generic_fn(&["$T"], vec![], Type::maybe(var("$T"))),
        _ => return None,
    };
    Some(Rc::new(f))
}

// ── Construction helpers ───────────────────────────────────────────────

thread_local! {
    static NEXT_VAR_KEY: RefCell<u32> = const { RefCell::new(0) };
}

/// A display-named type variable with a key no unifier table will ever see;
/// instantiation remaps by name.
fn var(name: &str) -> Type {
    let key = NEXT_VAR_KEY.with(|k| {
        let mut k = k.borrow_mut();
        *k += 1;
        *k
    });
    Type::var(name, key)
}

fn simple_fn(params: Vec<(&str, Type)>, ret: Type) -> FunctionType {
    FunctionType::simple(params, ret)
}

fn generic_fn(type_params: &[&str], params: Vec<(&str, Type)>, ret: Type) -> FunctionType {
    FunctionType {
        type_params: type_params.iter().map(|s| s.to_string()).collect(),
        ..FunctionType::simple(params, ret)
    }
}

struct ModuleBuilder {
    path: String,
    symbols: FxHashMap<String, Symbol>,
    registry: TypeRegistry,
}

impl ModuleBuilder {
    fn new(path: &str) -> Self {
        ModuleBuilder {
            path: path.to_string(),
            symbols: FxHashMap::default(),
            registry: TypeRegistry::new(),
        }
    }

    fn function(&mut self, name: &str, f: FunctionType) -> &mut Self {
        self.symbols
            .insert(name.to_string(), Symbol::function(name, Type::function(f)));
        self
    }

    fn strukt(&mut self, ty: &Rc<StructType>) -> &mut Self {
        self.symbols.insert(
            ty.name.clone(),
            Symbol {
                name: ty.name.clone(),
                ty: Type::Struct(ty.clone()),
                kind: SymbolKind::Struct,
            },
        );
        self
    }

    fn method(&mut self, struct_name: &str, name: &str, f: FunctionType) -> &mut Self {
        self.registry
            .add_method(struct_name, Method { name: name.to_string(), signature: Rc::new(f) });
        self
    }

    fn build(self) -> Module {
        Module::new(self.path, None, self.symbols, self.registry)
    }
}

fn strukt(name: &str, fields: Vec<(&str, Type)>) -> Rc<StructType> {
    Rc::new(StructType {
        name: name.to_string(),
        public: true,
        fields: RefCell::new(
            fields
                .into_iter()
                .map(|(name, ty)| StructField { name: name.to_string(), ty })
                .collect(),
        ),
    })
}

// ── Packages ───────────────────────────────────────────────────────────

fn io_module() -> Module {
    let mut m = ModuleBuilder::new("ard/io");
    m.function("print", simple_fn(vec![("text", Type::Str)], Type::Void))
        .function("read_line", simple_fn(vec![], Type::Str))
        .function(
            "read_file",
            simple_fn(vec![("path", Type::Str)], Type::result(Type::Str, Type::Str)),
        )
        .function(
            "write_file",
            simple_fn(
                vec![("path", Type::Str), ("content", Type::Str)],
                Type::result(Type::Void, Type::Str),
            ),
        );
    m.build()
}

fn maybe_module() -> Module {
    let mut m = ModuleBuilder::new("ard/maybe");
    m.function(
        "some",
        generic_fn(&["$T"], vec![("value", var("$T"))], Type::maybe(var("$T"))),
    )
    .function("none", generic_fn(&["$T"], vec![], Type::maybe(var("$T"))));
    m.build()
}

fn result_module() -> Module {
    let mut m = ModuleBuilder::new("ard/result");
    m.function(
        "ok",
        generic_fn(
            &["$V", "$E"],
            vec![("value", var("$V"))],
            Type::result(var("$V"), var("$E")),
        ),
    )
    .function(
        "err",
        generic_fn(
            &["$V", "$E"],
            vec![("error", var("$E"))],
            Type::result(var("$V"), var("$E")),
        ),
    );
    m.build()
}

fn json_module() -> Module {
    let mut m = ModuleBuilder::new("ard/json");
    m.function(
        "decode",
        generic_fn(
            &["$Out"],
            vec![("text", Type::Str)],
            Type::result(var("$Out"), Type::Str),
        ),
    )
    .function("encode", generic_fn(&["$In"], vec![("value", var("$In"))], Type::Str));
    m.build()
}

fn http_module() -> Module {
    let request = strukt(
        "Request",
        vec![
            ("url", Type::Str),
            ("method", Type::maybe(Type::Str)),
            ("body", Type::maybe(Type::Str)),
            ("headers", Type::maybe(Type::map(Type::Str, Type::Str))),
        ],
    );
    let response = strukt(
        "Response",
        vec![("status", Type::Int), ("body", Type::Str)],
    );
    let mut m = ModuleBuilder::new("ard/http");
    m.strukt(&request)
        .strukt(&response)
        .function(
            "get",
            simple_fn(
                vec![("request", Type::Struct(request.clone()))],
                Type::maybe(Type::Struct(response.clone())),
            ),
        )
        .function(
            "post",
            simple_fn(
                vec![("request", Type::Struct(request))],
                Type::maybe(Type::Struct(response)),
            ),
        );
    m.build()
}

fn sqlite_module() -> Module {
    let database = strukt("Database", vec![]);
    let mut m = ModuleBuilder::new("ard/sqlite");
    m.strukt(&database)
        .function(
            "open",
            simple_fn(
                vec![("path", Type::Str)],
                Type::result(Type::Struct(database.clone()), Type::Str),
            ),
        )
        .method(
            "Database",
            "query",
            simple_fn(
                vec![("sql", Type::Str)],
                Type::result(Type::list(Type::Dynamic), Type::Str),
            ),
        )
        .method(
            "Database",
            "exec",
            simple_fn(vec![("sql", Type::Str)], Type::result(Type::Void, Type::Str)),
        )
        .method("Database", "close", simple_fn(vec![], Type::Void));
    m.build()
}

fn async_module() -> Module {
    let mut m = ModuleBuilder::new("ard/async");
    // `start` is declared for completeness; the checker handles its argument
    // specially (isolated closure scope, fiber target recording).
    m.function(
        "start",
        simple_fn(
            vec![("task", Type::function(simple_fn(vec![], Type::Void)))],
            Type::fiber(Type::Void),
        ),
    )
    .function("sleep", simple_fn(vec![("millis", Type::Int)], Type::Void));
    m.build()
}

fn math_module() -> Module {
    let mut m = ModuleBuilder::new("ard/math");
    m.function("abs", simple_fn(vec![("value", Type::Int)], Type::Int))
        .function(
            "min",
            simple_fn(vec![("a", Type::Int), ("b", Type::Int)], Type::Int),
        )
        .function(
            "max",
            simple_fn(vec![("a", Type::Int), ("b", Type::Int)], Type::Int),
        )
        .function("sqrt", simple_fn(vec![("value", Type::Float)], Type::Float))
        .function(
            "pow",
            simple_fn(vec![("base", Type::Float), ("exponent", Type::Float)], Type::Float),
        );
    m.build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_print_is_exported() {
        let io = lookup("ard/io").unwrap();
        let print = io.get("print").expect("print exported");
        match &print.ty {
            Type::Function(f) => {
                assert_eq!(f.params.len(), 1);
                assert_eq!(f.params[0].ty, Type::Str);
                assert_eq!(f.ret, Type::Void);
            }
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn unknown_package_is_none() {
        assert!(lookup("ard/nope").is_none());
        assert!(lookup("io").is_none());
    }

    #[test]
    fn result_ok_is_generic() {
        let f = builtin_static("Result", "ok").unwrap();
        assert_eq!(f.type_params, vec!["$V".to_string(), "$E".to_string()]);
        assert!(f.ret.contains_var());
    }

    #[test]
    fn sqlite_database_methods_travel_in_registry() {
        let sqlite = lookup("ard/sqlite").unwrap();
        assert!(sqlite.registry().method("Database", "query").is_some());
        assert!(sqlite.registry().method("Database", "missing").is_none());
    }

    #[test]
    fn hard_coded_packages_have_no_program() {
        let io = lookup("ard/io").unwrap();
        assert!(io.program().is_none());
        assert_eq!(io.path(), "ard/io");
    }
}
