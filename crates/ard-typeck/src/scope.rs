//! Lexical scopes and symbols.
//!
//! The checker keeps a stack of scopes: one for the module, one per function
//! body, one per block. A scope owns its bindings and, where relevant, the
//! enclosing function's expected return type, the isolation flag for fiber
//! bodies, and the generic context of the signature being checked. Scope
//! lifetime is bounded by the block whose entry created it.

use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::modules::Module;
use crate::ty::Type;

/// What a name in scope refers to.
#[derive(Clone, Debug)]
pub enum SymbolKind {
    Variable { mutable: bool },
    Function,
    Enum,
    Struct,
    Trait,
    Union,
    /// An imported module, carrying its resolved handle.
    Module(Rc<Module>),
}

/// A named binding.
#[derive(Clone, Debug)]
pub struct Symbol {
    pub name: String,
    pub ty: Type,
    pub kind: SymbolKind,
}

impl Symbol {
    pub fn variable(name: impl Into<String>, ty: Type, mutable: bool) -> Self {
        Symbol { name: name.into(), ty, kind: SymbolKind::Variable { mutable } }
    }

    pub fn function(name: impl Into<String>, ty: Type) -> Self {
        Symbol { name: name.into(), ty, kind: SymbolKind::Function }
    }

    /// Whether this symbol is a mutable variable binding.
    pub fn is_mutable(&self) -> bool {
        matches!(self.kind, SymbolKind::Variable { mutable: true })
    }
}

/// One lexical scope.
#[derive(Debug, Default)]
pub struct Scope {
    symbols: FxHashMap<String, Symbol>,
    /// `Some` on function-body scopes; the declared return type.
    expected_return: Option<Type>,
    /// Marks a function boundary (named fn, method, or closure body).
    is_function: bool,
    /// Set on fiber bodies: lookups through this scope hide mutable outer
    /// bindings, preserving the one-way data barrier.
    isolated: bool,
    /// Generic bindings of the signature being checked, name to type var.
    generics: Option<FxHashMap<String, Type>>,
}

/// The scope stack. The root scope is the module scope and lives as long as
/// the module.
#[derive(Debug)]
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack { scopes: vec![Scope::default()] }
    }

    /// Enter a plain block scope.
    pub fn enter_block(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Enter a function body scope.
    pub fn enter_function(
        &mut self,
        expected_return: Type,
        generics: FxHashMap<String, Type>,
        isolated: bool,
    ) {
        self.scopes.push(Scope {
            symbols: FxHashMap::default(),
            expected_return: Some(expected_return),
            is_function: true,
            isolated,
            generics: if generics.is_empty() { None } else { Some(generics) },
        });
    }

    /// Replace the innermost scope's expected return type. Used after the
    /// return annotation resolves, since resolving it needs the generic
    /// context the scope itself carries.
    pub fn set_expected_return(&mut self, ty: Type) {
        let scope = self.scopes.last_mut().expect("scope stack is never empty");
        scope.expected_return = Some(ty);
    }

    /// Leave the innermost scope.
    ///
    /// # Panics
    ///
    /// Panics if called on the root module scope; that is a checker bug.
    pub fn exit(&mut self) {
        assert!(self.scopes.len() > 1, "attempted to exit the module scope");
        self.scopes.pop();
    }

    /// Declare a symbol in the innermost scope. Fails if the name already
    /// exists there; shadowing an outer scope is fine.
    pub fn declare(&mut self, symbol: Symbol) -> Result<(), ()> {
        let scope = self.scopes.last_mut().expect("scope stack is never empty");
        if scope.symbols.contains_key(&symbol.name) {
            return Err(());
        }
        scope.symbols.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    /// Look up a name, walking outward.
    ///
    /// Once the walk crosses an isolated scope boundary, mutable variable
    /// bindings beyond it are invisible; the caller reports them as
    /// undefined.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        let mut crossed_isolation = false;
        for scope in self.scopes.iter().rev() {
            if let Some(symbol) = scope.symbols.get(name) {
                if crossed_isolation && symbol.is_mutable() {
                    return None;
                }
                return Some(symbol);
            }
            if scope.isolated {
                crossed_isolation = true;
            }
        }
        None
    }

    /// The expected return type of the innermost enclosing function, if the
    /// walk finds one.
    pub fn expected_return(&self) -> Option<&Type> {
        for scope in self.scopes.iter().rev() {
            if scope.is_function {
                return scope.expected_return.as_ref();
            }
        }
        None
    }

    /// Whether we are inside any function body.
    pub fn in_function(&self) -> bool {
        self.scopes.iter().any(|s| s.is_function)
    }

    /// Resolve a generic parameter name in the closest enclosing scope that
    /// owns a generic context.
    pub fn generic_binding(&self, name: &str) -> Option<&Type> {
        for scope in self.scopes.iter().rev() {
            if let Some(generics) = &scope.generics {
                if let Some(ty) = generics.get(name) {
                    return Some(ty);
                }
            }
        }
        None
    }

    /// The module scope's symbols, for export.
    pub fn module_symbols(&self) -> &FxHashMap<String, Symbol> {
        &self.scopes[0].symbols
    }

    /// Declare directly into the module scope regardless of nesting depth.
    pub fn declare_module(&mut self, symbol: Symbol) -> Result<(), ()> {
        let scope = &mut self.scopes[0];
        if scope.symbols.contains_key(&symbol.name) {
            return Err(());
        }
        scope.symbols.insert(symbol.name.clone(), symbol);
        Ok(())
    }

    /// Depth of the stack, for invariants in tests.
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}
