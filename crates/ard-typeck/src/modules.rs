//! Modules and the resolver contract.
//!
//! A [`Module`] is the checked form of an import target: its public symbols,
//! its typed program (absent for the hard-coded standard-library packages),
//! and the registry its types live in. [`ModuleResolver`] is the callback
//! the checker uses for everything outside the standard library.

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::registry::TypeRegistry;
use crate::scope::Symbol;
use crate::typed::TypedProgram;

/// A resolved module.
#[derive(Debug)]
pub struct Module {
    path: String,
    program: Option<TypedProgram>,
    symbols: FxHashMap<String, Symbol>,
    registry: TypeRegistry,
}

impl Module {
    pub fn new(
        path: impl Into<String>,
        program: Option<TypedProgram>,
        symbols: FxHashMap<String, Symbol>,
        registry: TypeRegistry,
    ) -> Self {
        Module { path: path.into(), program, symbols, registry }
    }

    /// A module with no symbols, standing in for an import that failed to
    /// resolve. Checking continues against it; every member access reports
    /// undefined.
    pub fn empty(path: impl Into<String>) -> Self {
        Module {
            path: path.into(),
            program: None,
            symbols: FxHashMap::default(),
            registry: TypeRegistry::new(),
        }
    }

    /// The import path (stdlib) or file path (user modules) this module was
    /// resolved from.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The typed program. `None` for hard-coded standard-library packages
    /// and unresolved dummies.
    pub fn program(&self) -> Option<&TypedProgram> {
        self.program.as_ref()
    }

    /// Look up an exported symbol.
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    /// All exported symbols.
    pub fn symbols(&self) -> &FxHashMap<String, Symbol> {
        &self.symbols
    }

    /// The registry the module's types (and their methods) live in.
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }
}

/// Why an import could not be resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveError {
    /// No module exists for the path.
    NotFound { path: String },
    /// The import chain loops; the chain ends with the repeated path.
    Cycle { chain: Vec<String> },
    /// The module file exists but could not be read.
    Io { path: String, message: String },
    /// The module file exists but did not parse.
    Parse { path: String, errors: usize },
    /// The module parsed but its own checking produced errors (an import
    /// cycle detected inside it lands here too).
    Check { path: String, errors: usize },
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::NotFound { path } => write!(f, "module not found: {path}"),
            ResolveError::Cycle { chain } => write!(f, "import cycle: {}", chain.join(" -> ")),
            ResolveError::Io { path, message } => write!(f, "failed to read {path}: {message}"),
            ResolveError::Parse { path, errors } => {
                write!(f, "{path} has {errors} syntax errors")
            }
            ResolveError::Check { path, errors } => {
                write!(f, "{path} has {errors} errors")
            }
        }
    }
}

impl std::error::Error for ResolveError {}

/// The module-resolution callback.
///
/// Implementations must cache by canonical path, detect cycles (returning
/// [`ResolveError::Cycle`] rather than overflowing the stack), and may serve
/// both file-backed user modules and additional hard-coded ones.
pub trait ModuleResolver {
    fn resolve_import(&self, path: &str) -> Result<Rc<Module>, ResolveError>;
}
