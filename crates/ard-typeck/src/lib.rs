//! Semantic analyzer (type checker) for the Ard programming language.
//!
//! Given a parsed syntax tree and an optional module-resolution callback,
//! the checker produces a typed intermediate representation plus an ordered
//! list of human-readable diagnostics. It owns the type system, name
//! resolution across nested scopes and imported modules, exhaustiveness
//! analysis for `match`, mutability coherence, and effect tracking for the
//! `try` operator and isolated fiber closures.
//!
//! The checker never mutates its input tree, never aborts on a local error,
//! and is deterministic: checking the same program twice yields identical
//! diagnostics and identical typed IR.
//!
//! ```
//! let parse = ard_parser::parse("let age: Int = \"32\"");
//! let result = ard_typeck::check(&parse);
//! assert_eq!(result.diagnostics[0].message, "Type mismatch: Expected Int, got Str");
//! ```

pub mod check;
pub mod diagnostics;
pub mod embedded;
pub mod error;
pub mod modules;
mod patterns;
pub mod registry;
pub mod resolver;
pub mod scope;
pub mod stdlib;
pub mod ty;
pub mod typed;
pub mod unify;

pub use check::Checker;
pub use error::{Diagnostic, Severity};
pub use modules::{Module, ModuleResolver, ResolveError};
pub use registry::{TypeId, TypeRegistry};
pub use resolver::FileResolver;
pub use ty::Type;

use ard_parser::Parse;

/// The outcome of a convenience [`check`] run.
#[derive(Debug)]
pub struct CheckResult {
    /// Diagnostics in the order the checker encountered the offending
    /// nodes.
    pub diagnostics: Vec<Diagnostic>,
    /// The checked module: typed program, symbol table, type registry.
    pub module: Module,
}

impl CheckResult {
    /// Whether any error-severity diagnostic was recorded.
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.kind == Severity::Error)
    }

    /// Error messages only, in emission order. Test helper-grade sugar.
    pub fn messages(&self) -> Vec<&str> {
        self.diagnostics.iter().map(|d| d.message.as_str()).collect()
    }
}

/// Check a parsed program with no module resolver (imports outside the
/// standard library report `Unknown module`).
pub fn check(parse: &Parse) -> CheckResult {
    let mut checker = Checker::new("main.ard", parse.clone(), None);
    checker.check();
    CheckResult {
        diagnostics: checker.diagnostics().to_vec(),
        module: checker.into_module(),
    }
}
