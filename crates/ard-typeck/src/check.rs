//! The expression and statement checker.
//!
//! A single visitor walks the parser's tree and produces the typed IR. On a
//! local failure it records a diagnostic, returns a sentinel node, and keeps
//! going, so one run surfaces as many errors as possible. The checker never
//! aborts and never mutates its input tree.
//!
//! Checking runs in three passes over the top level:
//! 1. hoist type names and struct stubs (silent),
//! 2. fill in fields, union members, trait methods, function signatures,
//!    and impl methods (declaration diagnostics, in source order),
//! 3. check bodies and plain statements (body diagnostics, in source order).
//!
//! The split lets declarations reference each other freely regardless of
//! order, including self-referential struct fields and mutually recursive
//! functions.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};

use ard_common::Span;
use ard_parser::ast::{self, ExprKind, Stmt, StrPart, TypeExprKind};
use ard_parser::Parse;

use crate::embedded;
use crate::error::{Diagnostic, TypeError};
use crate::modules::{Module, ModuleResolver, ResolveError};
use crate::registry::{Method, TypeRegistry};
use crate::scope::{ScopeStack, Symbol, SymbolKind};
use crate::stdlib;
use crate::ty::{EnumType, FnParam, FunctionType, StructField, StructType, TraitMethodSig, TraitType, Type, UnionType};
use crate::typed::{
    AssignTarget, FiberTarget, InterpPart, TypedBlock, TypedCatch, TypedExpr, TypedExprKind,
    TypedFn, TypedProgram, TypedStmt,
};
use crate::unify::Unifier;

/// The impl block currently being checked, if any.
pub(crate) struct ImplCtx {
    pub(crate) strukt: Rc<StructType>,
    /// Whether the receiver is mutable in the current method.
    pub(crate) mutates: bool,
}

/// How a found type fits an expected one.
enum Fit {
    Equal,
    /// Fits after wrapping into `Maybe`.
    Widened,
    No,
}

/// The Ard semantic analyzer for one source file.
pub struct Checker {
    pub(crate) file_path: PathBuf,
    pub(crate) source: String,
    program: ast::Program,
    pub(crate) resolver: Option<Rc<dyn ModuleResolver>>,
    pub(crate) errors: Vec<TypeError>,
    pub(crate) registry: TypeRegistry,
    pub(crate) scopes: ScopeStack,
    pub(crate) unifier: Unifier,
    pub(crate) impl_ctx: Option<ImplCtx>,
    module: Option<Module>,
    diagnostics: Vec<Diagnostic>,
    checked: bool,
    /// Top-level statement indices whose name collided during hoisting.
    hoist_dups: FxHashSet<usize>,
}

impl Checker {
    /// Create a checker for a parsed file. The resolver handles imports that
    /// are neither hard-coded nor embedded standard library.
    pub fn new(
        file_path: impl AsRef<Path>,
        parse: Parse,
        resolver: Option<Rc<dyn ModuleResolver>>,
    ) -> Self {
        Checker {
            file_path: file_path.as_ref().to_path_buf(),
            source: parse.source,
            program: parse.program,
            resolver,
            errors: Vec::new(),
            registry: TypeRegistry::new(),
            scopes: ScopeStack::new(),
            unifier: Unifier::new(),
            impl_ctx: None,
            module: None,
            diagnostics: Vec::new(),
            checked: false,
            hoist_dups: FxHashSet::default(),
        }
    }

    /// Run the checker. Idempotent: the second call is a no-op.
    pub fn check(&mut self) {
        if self.checked {
            return;
        }
        self.checked = true;

        self.resolve_imports();

        let statements = self.program.statements.clone();
        self.hoist_names(&statements);
        self.hoist_signatures(&statements);

        let mut typed = Vec::new();
        for stmt in &statements {
            if let Some(ts) = self.check_top_stmt(stmt) {
                typed.push(ts);
            }
        }

        self.diagnostics = self.errors.iter().map(TypeError::to_diagnostic).collect();

        let mut symbols = FxHashMap::default();
        for (name, symbol) in self.scopes.module_symbols() {
            if name.starts_with('_') {
                continue;
            }
            if matches!(symbol.kind, SymbolKind::Module(_)) {
                continue;
            }
            symbols.insert(name.clone(), symbol.clone());
        }
        let registry = std::mem::replace(&mut self.registry, TypeRegistry::new());
        self.module = Some(Module::new(
            self.file_path.to_string_lossy().into_owned(),
            Some(TypedProgram { statements: typed }),
            symbols,
            registry,
        ));
    }

    /// Diagnostics in the order the checker encountered the offending nodes.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Whether any error-severity diagnostic was recorded.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.kind == crate::error::Severity::Error)
    }

    /// The checked module: typed program, symbol table, type registry.
    ///
    /// # Panics
    ///
    /// Panics if called before [`Checker::check`].
    pub fn module(&self) -> &Module {
        self.module.as_ref().expect("module() called before check()")
    }

    /// Consume the checker, running it first if needed.
    pub fn into_module(mut self) -> Module {
        self.check();
        self.module.expect("check() populates the module")
    }

    pub(crate) fn error(&mut self, error: TypeError) {
        self.errors.push(error);
    }

    /// The source text a span covers.
    pub(crate) fn slice(&self, span: Span) -> String {
        let max = self.source.len() as u32;
        let start = span.start.min(max);
        let end = span.end.clamp(start, max);
        self.source[start as usize..end as usize].to_string()
    }

    /// Build a typed node, registering its type.
    pub(crate) fn typed(&mut self, kind: TypedExprKind, ty: Type, span: Span) -> TypedExpr {
        let type_id = self.registry.intern(&ty);
        TypedExpr { kind, ty, type_id, span }
    }

    /// The sentinel for an expression that failed to check. A diagnostic has
    /// already been recorded; the erased type keeps later checks quiet.
    pub(crate) fn poisoned(&mut self, span: Span) -> TypedExpr {
        self.typed(TypedExprKind::Error, Type::Dynamic, span)
    }

    // ── Imports ────────────────────────────────────────────────────────

    fn resolve_imports(&mut self) {
        let imports = self.program.imports.clone();
        let mut bound: FxHashSet<String> = FxHashSet::default();
        for import in &imports {
            let name = import.binding_name().to_string();
            if !bound.insert(name.clone()) {
                self.error(TypeError::DuplicateAlias { alias: name, span: import.span });
                continue;
            }
            let module = self.resolve_one_import(&import.path, import.span);
            self.registry.absorb(module.registry());
            // Exported type names become directly usable: `use ard/http`
            // puts `Request` in scope, not just `http`.
            for symbol in module.symbols().values() {
                if matches!(
                    symbol.kind,
                    SymbolKind::Struct | SymbolKind::Enum | SymbolKind::Union | SymbolKind::Trait
                ) {
                    let _ = self.scopes.declare_module(symbol.clone());
                }
            }
            let _ = self.scopes.declare_module(Symbol {
                name,
                ty: Type::Void,
                kind: SymbolKind::Module(module),
            });
        }
    }

    fn resolve_one_import(&mut self, path: &str, span: Span) -> Rc<Module> {
        if path.starts_with("ard/") {
            if let Some(module) = stdlib::lookup(path) {
                return module;
            }
            if let Some(module) = self.compile_embedded(path) {
                return module;
            }
            self.error(TypeError::UnknownModule { path: path.to_string(), span });
            return Rc::new(Module::empty(path));
        }
        let Some(resolver) = self.resolver.clone() else {
            self.error(TypeError::UnknownModule { path: path.to_string(), span });
            return Rc::new(Module::empty(path));
        };
        match resolver.resolve_import(path) {
            Ok(module) => module,
            Err(ResolveError::Cycle { chain }) => {
                self.error(TypeError::CircularImport { chain: chain.join(" -> "), span });
                Rc::new(Module::empty(path))
            }
            Err(ResolveError::Check { path: failed, errors }) => {
                self.error(TypeError::ModuleHasErrors { path: failed.clone(), errors, span });
                Rc::new(Module::empty(failed))
            }
            Err(_) => {
                self.error(TypeError::UnknownModule { path: path.to_string(), span });
                Rc::new(Module::empty(path))
            }
        }
    }

    /// Parse and check an embedded standard-library source with a fresh
    /// checker sharing this one's resolver.
    fn compile_embedded(&mut self, path: &str) -> Option<Rc<Module>> {
        let source = embedded::source(path)?;
        let parse = ard_parser::parse(source);
        debug_assert!(parse.errors.is_empty(), "embedded {path} must parse");
        let mut checker = Checker::new(PathBuf::from(path), parse, self.resolver.clone());
        checker.check();
        debug_assert!(!checker.has_errors(), "embedded {path} must check");
        Some(Rc::new(checker.into_module()))
    }

    // ── Hoisting ───────────────────────────────────────────────────────

    /// Pass 1: put every top-level type name in scope as a stub, so later
    /// passes can resolve references regardless of declaration order.
    fn hoist_names(&mut self, statements: &[Stmt]) {
        for (index, stmt) in statements.iter().enumerate() {
            let symbol = match stmt {
                Stmt::Enum(decl) => {
                    let mut variants = Vec::new();
                    for v in &decl.variants {
                        if !variants.contains(&v.name) {
                            variants.push(v.name.clone());
                        }
                    }
                    let ty = Rc::new(EnumType {
                        name: decl.name.clone(),
                        variants,
                        public: !decl.name.starts_with('_'),
                    });
                    Symbol {
                        name: decl.name.clone(),
                        ty: Type::Enum(ty),
                        kind: SymbolKind::Enum,
                    }
                }
                Stmt::Struct(decl) => {
                    let ty = Rc::new(StructType {
                        name: decl.name.clone(),
                        public: !decl.name.starts_with('_'),
                        fields: RefCell::new(Vec::new()),
                    });
                    Symbol {
                        name: decl.name.clone(),
                        ty: Type::Struct(ty),
                        kind: SymbolKind::Struct,
                    }
                }
                Stmt::Union(decl) => {
                    let ty = Rc::new(UnionType {
                        name: decl.name.clone(),
                        members: RefCell::new(Vec::new()),
                    });
                    Symbol {
                        name: decl.name.clone(),
                        ty: Type::Union(ty),
                        kind: SymbolKind::Union,
                    }
                }
                Stmt::Trait(decl) => {
                    let ty = Rc::new(TraitType {
                        name: decl.name.clone(),
                        methods: RefCell::new(Vec::new()),
                    });
                    Symbol {
                        name: decl.name.clone(),
                        ty: Type::Trait(ty),
                        kind: SymbolKind::Trait,
                    }
                }
                _ => continue,
            };
            if self.scopes.declare_module(symbol).is_err() {
                self.hoist_dups.insert(index);
            }
        }
    }

    /// Pass 2: resolve everything that hangs off the hoisted names, emitting
    /// declaration diagnostics in source order.
    fn hoist_signatures(&mut self, statements: &[Stmt]) {
        for (index, stmt) in statements.iter().enumerate() {
            if self.hoist_dups.contains(&index) {
                if let Some((name, span)) = decl_name(stmt) {
                    self.error(TypeError::DuplicateDefinition { name, span });
                }
                continue;
            }
            match stmt {
                Stmt::Enum(decl) => {
                    if decl.variants.is_empty() {
                        self.error(TypeError::EnumWithoutVariants { span: decl.span });
                    }
                    let mut seen = FxHashSet::default();
                    for v in &decl.variants {
                        if !seen.insert(v.name.clone()) {
                            self.error(TypeError::DuplicateVariant {
                                name: v.name.clone(),
                                span: v.span,
                            });
                        }
                    }
                }
                Stmt::Struct(decl) => {
                    let Some(strukt) = self.lookup_struct(&decl.name) else { continue };
                    let mut fields: Vec<StructField> = Vec::new();
                    for field in &decl.fields {
                        if fields.iter().any(|f| f.name == field.name) {
                            self.error(TypeError::DuplicateField {
                                field: field.name.clone(),
                                span: field.span,
                            });
                            continue;
                        }
                        let ty = self.resolve_type(&field.ty, true);
                        fields.push(StructField { name: field.name.clone(), ty });
                    }
                    *strukt.fields.borrow_mut() = fields;
                }
                Stmt::Union(decl) => {
                    let members: Vec<Type> = decl
                        .members
                        .iter()
                        .map(|te| self.resolve_type(te, true))
                        .collect();
                    if let Some(Symbol { ty: Type::Union(u), .. }) =
                        self.scopes.lookup(&decl.name).cloned()
                    {
                        *u.members.borrow_mut() = members;
                    }
                }
                Stmt::Trait(decl) => {
                    let mut methods = Vec::new();
                    for m in &decl.methods {
                        let params = self.resolve_params(&m.params, true);
                        let ret = m
                            .ret
                            .as_ref()
                            .map(|te| self.resolve_type(te, true))
                            .unwrap_or(Type::Void);
                        methods.push(TraitMethodSig {
                            name: m.name.clone(),
                            signature: Rc::new(FunctionType {
                                type_params: Vec::new(),
                                params,
                                ret,
                                mutates_receiver: false,
                            }),
                        });
                    }
                    if let Some(Symbol { ty: Type::Trait(t), .. }) =
                        self.scopes.lookup(&decl.name).cloned()
                    {
                        *t.methods.borrow_mut() = methods;
                    }
                }
                Stmt::Fn(decl) => {
                    // Resolved silently here; the body pass re-resolves with
                    // diagnostics, so signature errors are reported once.
                    let signature = self.resolve_fn_signature(
                        &decl.generics,
                        &decl.params,
                        decl.ret.as_ref(),
                        false,
                        false,
                    );
                    let symbol = Symbol::function(&decl.name, Type::function(signature));
                    if self.scopes.declare_module(symbol).is_err() {
                        self.error(TypeError::DuplicateDefinition {
                            name: decl.name.clone(),
                            span: decl.name_span,
                        });
                    }
                }
                Stmt::Impl(block) => {
                    let Some(strukt) = self.lookup_struct(&block.target) else {
                        self.error(TypeError::ImplTargetNotStruct {
                            name: block.target.clone(),
                            span: block.target_span,
                        });
                        continue;
                    };
                    for method in &block.methods {
                        let mutates = block.mutable || method.mutates;
                        let signature = self.resolve_fn_signature(
                            &method.generics,
                            &method.params,
                            method.ret.as_ref(),
                            mutates,
                            false,
                        );
                        let added = self.registry.add_method(
                            &strukt.name,
                            Method {
                                name: method.name.clone(),
                                signature: Rc::new(signature),
                            },
                        );
                        if !added {
                            self.error(TypeError::DuplicateDefinition {
                                name: method.name.clone(),
                                span: method.name_span,
                            });
                        }
                    }
                }
                _ => {}
            }
        }
    }

    fn lookup_struct(&self, name: &str) -> Option<Rc<StructType>> {
        match self.scopes.lookup(name) {
            Some(Symbol { ty: Type::Struct(s), .. }) => Some(s.clone()),
            _ => None,
        }
    }

    /// Resolve a signature under a temporary generic context.
    fn resolve_fn_signature(
        &mut self,
        generics: &[String],
        params: &[ast::Param],
        ret: Option<&ast::TypeExpr>,
        mutates: bool,
        emit: bool,
    ) -> FunctionType {
        let generic_map = self.fresh_generics(generics);
        self.scopes.enter_function(Type::Void, generic_map, false);
        let params = self.resolve_params(params, emit);
        let ret = ret.map(|te| self.resolve_type(te, emit)).unwrap_or(Type::Void);
        self.scopes.exit();
        FunctionType {
            type_params: generics.to_vec(),
            params,
            ret,
            mutates_receiver: mutates,
        }
    }

    fn fresh_generics(&mut self, generics: &[String]) -> FxHashMap<String, Type> {
        generics
            .iter()
            .map(|name| (name.clone(), self.unifier.fresh(name)))
            .collect()
    }

    fn resolve_params(&mut self, params: &[ast::Param], emit: bool) -> Vec<FnParam> {
        params
            .iter()
            .map(|p| FnParam {
                name: p.name.clone(),
                ty: self.resolve_type(&p.ty, emit),
                mutable: p.mutable,
            })
            .collect()
    }

    // ── Type resolution ────────────────────────────────────────────────

    /// Resolve a source type expression. Unknown names report (when `emit`)
    /// and fall back to the erased type so checking continues.
    pub(crate) fn resolve_type(&mut self, te: &ast::TypeExpr, emit: bool) -> Type {
        match &te.kind {
            TypeExprKind::Named(name) => match name.as_str() {
                "Str" => Type::Str,
                "Int" => Type::Int,
                "Float" => Type::Float,
                "Bool" => Type::Bool,
                "Void" => Type::Void,
                _ => match self.scopes.lookup(name) {
                    Some(Symbol { ty, kind, .. })
                        if matches!(
                            kind,
                            SymbolKind::Enum
                                | SymbolKind::Struct
                                | SymbolKind::Union
                                | SymbolKind::Trait
                        ) =>
                    {
                        ty.clone()
                    }
                    _ => {
                        if emit {
                            self.error(TypeError::UnknownType {
                                name: name.clone(),
                                span: te.span,
                            });
                        }
                        Type::Dynamic
                    }
                },
            },
            TypeExprKind::Generic(name) => match self.scopes.generic_binding(name) {
                Some(ty) => ty.clone(),
                None => {
                    if emit {
                        self.error(TypeError::UnknownType { name: name.clone(), span: te.span });
                    }
                    Type::Dynamic
                }
            },
            TypeExprKind::List(element) => Type::list(self.resolve_type(element, emit)),
            TypeExprKind::Map(key, value) => {
                let key = self.resolve_type(key, emit);
                let value = self.resolve_type(value, emit);
                Type::map(key, value)
            }
            TypeExprKind::Maybe(inner) => Type::maybe(self.resolve_type(inner, emit)),
            TypeExprKind::Result(value, error) => {
                let value = self.resolve_type(value, emit);
                let error = self.resolve_type(error, emit);
                Type::result(value, error)
            }
            TypeExprKind::Func { params, ret } => {
                let params = params
                    .iter()
                    .map(|p| FnParam {
                        name: String::new(),
                        ty: self.resolve_type(p, emit),
                        mutable: false,
                    })
                    .collect();
                let ret = ret
                    .as_ref()
                    .map(|te| self.resolve_type(te, emit))
                    .unwrap_or(Type::Void);
                Type::Function(Rc::new(FunctionType {
                    type_params: Vec::new(),
                    params,
                    ret,
                    mutates_receiver: false,
                }))
            }
        }
    }

    // ── Fit and coercion ───────────────────────────────────────────────

    /// How `found` fits into a position expecting `expected`: equal (after
    /// unification), widened into `Maybe`, conforming to an expected trait,
    /// or not at all.
    fn fit(&mut self, expected: &Type, found: &Type) -> Fit {
        if self.unifier.unify(expected, found).is_ok() {
            return Fit::Equal;
        }
        let resolved = self.unifier.resolve(expected);
        if let Type::Maybe(inner) = &resolved {
            if self.unifier.unify(inner, found).is_ok() {
                return Fit::Widened;
            }
        }
        if let Type::Trait(t) = &resolved {
            let found = self.unifier.resolve(found);
            if found.has_trait(t, &self.registry) {
                return Fit::Equal;
            }
        }
        Fit::No
    }

    /// Check `found` against `expected` at a coercion site (initializer,
    /// reassignment, return). Emits a mismatch and returns the value
    /// unchanged on failure; wraps into `IntoMaybe` on widening.
    fn coerce(&mut self, expected: &Type, value: TypedExpr, error_span: Span) -> TypedExpr {
        match self.fit(&expected.clone(), &value.ty.clone()) {
            Fit::Equal => value,
            Fit::Widened => {
                let ty = self.unifier.resolve(expected);
                let span = value.span;
                self.typed(TypedExprKind::IntoMaybe(Box::new(value)), ty, span)
            }
            Fit::No => {
                let expected = self.unifier.resolve(expected);
                let found = self.unifier.resolve(&value.ty);
                self.error(TypeError::Mismatch { expected, found, span: error_span });
                value
            }
        }
    }

    /// Plain unification at a non-coercion site; emits a mismatch on
    /// failure.
    pub(crate) fn expect_type(&mut self, expected: &Type, found: &Type, span: Span) {
        if self.unifier.unify(expected, found).is_err() {
            let expected = self.unifier.resolve(expected);
            let found = self.unifier.resolve(found);
            self.error(TypeError::Mismatch { expected, found, span });
        }
    }

    // ── Statements ─────────────────────────────────────────────────────

    fn check_top_stmt(&mut self, stmt: &Stmt) -> Option<TypedStmt> {
        match stmt {
            Stmt::Enum(decl) => {
                let Some(Symbol { ty: Type::Enum(e), .. }) = self.scopes.lookup(&decl.name).cloned()
                else {
                    return None;
                };
                Some(TypedStmt::EnumDef(e))
            }
            Stmt::Struct(decl) => {
                let strukt = self.lookup_struct(&decl.name)?;
                Some(TypedStmt::StructDef(strukt))
            }
            Stmt::Union(decl) => {
                match self.scopes.lookup(&decl.name).cloned() {
                    Some(Symbol { ty: Type::Union(u), .. }) => Some(TypedStmt::UnionDef(u)),
                    _ => None,
                }
            }
            Stmt::Trait(decl) => {
                match self.scopes.lookup(&decl.name).cloned() {
                    Some(Symbol { ty: Type::Trait(t), .. }) => Some(TypedStmt::TraitDef(t)),
                    _ => None,
                }
            }
            Stmt::Fn(decl) => self.check_fn_body(decl),
            Stmt::Impl(block) => self.check_impl(block),
            other => self.check_stmt(other, None),
        }
    }

    /// Check a statement inside a block (or a non-declaration at top level).
    /// `expected` applies only when the statement is a producing expression
    /// in result position.
    fn check_stmt(&mut self, stmt: &Stmt, expected: Option<&Type>) -> Option<TypedStmt> {
        match stmt {
            Stmt::Let(l) => self.check_let(l),
            Stmt::Assign(a) => self.check_assign(a),
            Stmt::While(w) => self.check_while(w),
            Stmt::ForIn(f) => self.check_for_in(f),
            Stmt::ForClassic(f) => self.check_for_classic(f),
            Stmt::Return(r) => self.check_return(r),
            Stmt::Expr(e) => Some(TypedStmt::Expr(self.check_expr(e, expected))),
            Stmt::Fn(decl) => {
                // A nested function: declare it here, then check its body.
                // The signature resolves silently; body checking reports.
                let signature = self.resolve_fn_signature(
                    &decl.generics,
                    &decl.params,
                    decl.ret.as_ref(),
                    false,
                    false,
                );
                let symbol = Symbol::function(&decl.name, Type::function(signature));
                if self.scopes.declare(symbol).is_err() {
                    self.error(TypeError::DuplicateDefinition {
                        name: decl.name.clone(),
                        span: decl.name_span,
                    });
                }
                self.check_fn_body(decl)
            }
            Stmt::Enum(d) => {
                self.top_level_only("Enum", d.span);
                None
            }
            Stmt::Struct(d) => {
                self.top_level_only("Struct", d.span);
                None
            }
            Stmt::Union(d) => {
                self.top_level_only("Union", d.span);
                None
            }
            Stmt::Trait(d) => {
                self.top_level_only("Trait", d.span);
                None
            }
            Stmt::Impl(d) => {
                self.top_level_only("Impl", d.span);
                None
            }
        }
    }

    fn top_level_only(&mut self, what: &'static str, span: Span) {
        self.error(TypeError::TopLevelOnly { what, span });
    }

    fn check_let(&mut self, l: &ast::LetStmt) -> Option<TypedStmt> {
        let declared = l.ty.as_ref().map(|te| self.resolve_type(te, true));
        let value = self.check_expr(&l.value, declared.as_ref());
        let (ty, value) = match declared {
            Some(decl) => {
                let value = self.coerce(&decl, value, l.value.span);
                (decl, value)
            }
            None => (self.unifier.resolve(&value.ty), value),
        };
        let symbol = Symbol::variable(&l.name, ty.clone(), l.mutable);
        if self.scopes.declare(symbol).is_err() {
            self.error(TypeError::DuplicateDefinition {
                name: l.name.clone(),
                span: l.name_span,
            });
        }
        Some(TypedStmt::Let { name: l.name.clone(), mutable: l.mutable, ty, value })
    }

    fn check_assign(&mut self, a: &ast::AssignStmt) -> Option<TypedStmt> {
        match &a.target.kind {
            ExprKind::Ident(name) => {
                let symbol = self.scopes.lookup(name).cloned();
                match symbol {
                    None => {
                        self.error(TypeError::UndefinedVariable {
                            name: name.clone(),
                            span: a.target.span,
                        });
                        let value = self.check_expr(&a.value, None);
                        Some(TypedStmt::Assign {
                            target: AssignTarget::Variable(name.clone()),
                            value,
                        })
                    }
                    Some(symbol) => {
                        if !symbol.is_mutable() {
                            self.error(TypeError::ImmutableVariable {
                                name: name.clone(),
                                span: a.target.span,
                            });
                        }
                        let value = self.check_expr(&a.value, Some(&symbol.ty));
                        let value = self.coerce(&symbol.ty, value, a.value.span);
                        Some(TypedStmt::Assign {
                            target: AssignTarget::Variable(name.clone()),
                            value,
                        })
                    }
                }
            }
            ExprKind::SelfField(field) => {
                let Some(ctx) = &self.impl_ctx else {
                    self.error(TypeError::SelfOutsideImpl { span: a.target.span });
                    let value = self.check_expr(&a.value, None);
                    return Some(TypedStmt::Assign {
                        target: AssignTarget::SelfField(field.clone()),
                        value,
                    });
                };
                let mutates = ctx.mutates;
                let field_ty = ctx.strukt.field(field).map(|f| f.ty);
                match field_ty {
                    None => {
                        self.error(TypeError::Undefined {
                            path: format!("@{field}"),
                            span: a.target.span,
                        });
                        let value = self.check_expr(&a.value, None);
                        Some(TypedStmt::Assign {
                            target: AssignTarget::SelfField(field.clone()),
                            value,
                        })
                    }
                    Some(field_ty) => {
                        if !mutates {
                            self.error(TypeError::ImmutableProperty {
                                path: format!("@{field}"),
                                span: a.target.span,
                            });
                        }
                        let value = self.check_expr(&a.value, Some(&field_ty));
                        let value = self.coerce(&field_ty, value, a.value.span);
                        Some(TypedStmt::Assign {
                            target: AssignTarget::SelfField(field.clone()),
                            value,
                        })
                    }
                }
            }
            ExprKind::Property { object, name, .. } => {
                let typed_object = self.check_expr(object, None);
                let object_ty = self.unifier.resolve(&typed_object.ty);
                if object_ty == Type::Dynamic {
                    let value = self.check_expr(&a.value, None);
                    return Some(TypedStmt::Assign {
                        target: AssignTarget::Property { object: typed_object, name: name.clone() },
                        value,
                    });
                }
                let field_ty = match &object_ty {
                    Type::Struct(s) => s.field(name).map(|f| f.ty),
                    _ => None,
                };
                let Some(field_ty) = field_ty else {
                    if object_ty.property(name, &self.registry).is_some() {
                        self.error(TypeError::InvalidAssignTarget { span: a.target.span });
                    } else {
                        self.error(TypeError::Undefined {
                            path: self.slice(a.target.span),
                            span: a.target.span,
                        });
                    }
                    let value = self.check_expr(&a.value, None);
                    return Some(TypedStmt::Assign {
                        target: AssignTarget::Property { object: typed_object, name: name.clone() },
                        value,
                    });
                };
                if !self.place_is_mutable(object) {
                    self.error(TypeError::ImmutableProperty {
                        path: self.slice(a.target.span),
                        span: a.target.span,
                    });
                }
                let value = self.check_expr(&a.value, Some(&field_ty));
                let value = self.coerce(&field_ty, value, a.value.span);
                Some(TypedStmt::Assign {
                    target: AssignTarget::Property { object: typed_object, name: name.clone() },
                    value,
                })
            }
            ExprKind::Call { callee, args, .. }
                if matches!(&callee.kind, ExprKind::Property { name, .. } if name == "at")
                    && args.len() == 1 =>
            {
                let ExprKind::Property { object, .. } = &callee.kind else { unreachable!() };
                let typed_list = self.check_expr(object, None);
                let list_ty = self.unifier.resolve(&typed_list.ty);
                let element = match &list_ty {
                    Type::List(e) => e.as_ref().clone(),
                    Type::Dynamic => Type::Dynamic,
                    _ => {
                        self.error(TypeError::InvalidAssignTarget { span: a.target.span });
                        Type::Dynamic
                    }
                };
                let index = self.check_expr(&args[0], Some(&Type::Int));
                self.expect_type(&Type::Int, &index.ty.clone(), args[0].span);
                if !self.place_is_mutable(object) {
                    self.error(TypeError::ImmutableProperty {
                        path: self.slice(a.target.span),
                        span: a.target.span,
                    });
                }
                let value = self.check_expr(&a.value, Some(&element));
                let value = self.coerce(&element, value, a.value.span);
                Some(TypedStmt::Assign {
                    target: AssignTarget::Element { list: typed_list, index },
                    value,
                })
            }
            _ => {
                self.error(TypeError::InvalidAssignTarget { span: a.target.span });
                let value = self.check_expr(&a.value, None);
                Some(TypedStmt::Expr(value))
            }
        }
    }

    /// Whether an assignment or mutating call reaches through a mutable
    /// binding. Temporaries count as mutable; only named immutable bindings
    /// are rejected.
    fn place_is_mutable(&self, expr: &ast::Expr) -> bool {
        match &expr.kind {
            ExprKind::Ident(name) => match self.scopes.lookup(name) {
                Some(symbol) => symbol.is_mutable(),
                None => true,
            },
            ExprKind::SelfField(_) => self.impl_ctx.as_ref().is_some_and(|c| c.mutates),
            ExprKind::Property { object, .. } => self.place_is_mutable(object),
            ExprKind::Call { callee, .. } => match &callee.kind {
                ExprKind::Property { object, name, .. } if name == "at" => {
                    self.place_is_mutable(object)
                }
                _ => true,
            },
            _ => true,
        }
    }

    fn check_while(&mut self, w: &ast::WhileLoop) -> Option<TypedStmt> {
        let cond = self.check_expr(&w.cond, Some(&Type::Bool));
        let cond_ty = self.unifier.resolve(&cond.ty);
        if cond_ty != Type::Bool && cond_ty != Type::Dynamic {
            self.error(TypeError::WhileCondition { span: w.cond.span });
        }
        let body = self.check_block(&w.body, None);
        Some(TypedStmt::While { cond, body })
    }

    fn check_for_in(&mut self, f: &ast::ForIn) -> Option<TypedStmt> {
        match &f.iterable {
            ast::ForIterable::Range(start, end) => {
                let start = self.check_expr(start, None);
                let end_typed = self.check_expr(end, None);
                let start_ty = self.unifier.resolve(&start.ty);
                if !matches!(start_ty, Type::Int | Type::Float | Type::Dynamic) {
                    self.error(TypeError::RangeBounds { found: start_ty.clone(), span: start.span });
                }
                self.expect_type(&start.ty.clone(), &end_typed.ty.clone(), end.span);
                if let Some((_, span)) = &f.second {
                    self.error(TypeError::ExtraLoopBinding { span: *span });
                }
                let binding_ty = match start_ty {
                    Type::Float => Type::Float,
                    _ => Type::Int,
                };
                let body = self.for_body(&f.body, &[(f.binding.clone(), binding_ty)]);
                Some(TypedStmt::ForRange {
                    binding: f.binding.clone(),
                    start,
                    end: end_typed,
                    body,
                })
            }
            ast::ForIterable::Expr(subject) => {
                let typed_subject = self.check_expr(subject, None);
                let subject_ty = self.unifier.resolve(&typed_subject.ty);
                match subject_ty {
                    Type::Int | Type::Dynamic => {
                        if let Some((_, span)) = &f.second {
                            self.error(TypeError::ExtraLoopBinding { span: *span });
                        }
                        let start = self.typed(TypedExprKind::Int(0), Type::Int, f.binding_span);
                        let body = self.for_body(&f.body, &[(f.binding.clone(), Type::Int)]);
                        Some(TypedStmt::ForRange {
                            binding: f.binding.clone(),
                            start,
                            end: typed_subject,
                            body,
                        })
                    }
                    Type::Str => {
                        if let Some((_, span)) = &f.second {
                            self.error(TypeError::ExtraLoopBinding { span: *span });
                        }
                        let body = self.for_body(&f.body, &[(f.binding.clone(), Type::Str)]);
                        Some(TypedStmt::ForStr {
                            binding: f.binding.clone(),
                            subject: typed_subject,
                            body,
                        })
                    }
                    Type::List(element) => {
                        let mut bindings =
                            vec![(f.binding.clone(), element.as_ref().clone())];
                        if let Some((index, _)) = &f.second {
                            bindings.push((index.clone(), Type::Int));
                        }
                        let body = self.for_body(&f.body, &bindings);
                        Some(TypedStmt::ForList {
                            binding: f.binding.clone(),
                            index: f.second.as_ref().map(|(n, _)| n.clone()),
                            subject: typed_subject,
                            body,
                        })
                    }
                    Type::Map(key, value) => {
                        let Some((value_name, _)) = &f.second else {
                            self.error(TypeError::MissingLoopBinding { span: f.binding_span });
                            return None;
                        };
                        let bindings = vec![
                            (f.binding.clone(), key.as_ref().clone()),
                            (value_name.clone(), value.as_ref().clone()),
                        ];
                        let body = self.for_body(&f.body, &bindings);
                        Some(TypedStmt::ForMap {
                            key: f.binding.clone(),
                            value: value_name.clone(),
                            subject: typed_subject,
                            body,
                        })
                    }
                    other => {
                        self.error(TypeError::NotIterable { found: other, span: subject.span });
                        None
                    }
                }
            }
        }
    }

    /// Check a loop body with the loop bindings in a fresh scope.
    fn for_body(&mut self, body: &ast::Block, bindings: &[(String, Type)]) -> TypedBlock {
        self.scopes.enter_block();
        for (name, ty) in bindings {
            let _ = self.scopes.declare(Symbol::variable(name, ty.clone(), false));
        }
        let typed = self.check_block(body, None);
        self.scopes.exit();
        typed
    }

    fn check_for_classic(&mut self, f: &ast::ForClassic) -> Option<TypedStmt> {
        self.scopes.enter_block();
        let init = self.check_stmt(&f.init, None);
        let cond = self.check_expr(&f.cond, Some(&Type::Bool));
        let cond_ty = self.unifier.resolve(&cond.ty);
        if cond_ty != Type::Bool && cond_ty != Type::Dynamic {
            self.error(TypeError::ForCondition { span: f.cond.span });
        }
        let update = self.check_stmt(&f.update, None);
        let body = self.check_block(&f.body, None);
        self.scopes.exit();
        let (init, update) = match (init, update) {
            (Some(i), Some(u)) => (i, u),
            _ => return None,
        };
        Some(TypedStmt::ForClassic {
            init: Box::new(init),
            cond,
            update: Box::new(update),
            body,
        })
    }

    fn check_return(&mut self, r: &ast::ReturnStmt) -> Option<TypedStmt> {
        if !self.scopes.in_function() {
            self.error(TypeError::ReturnOutsideFunction { span: r.span });
        }
        let expected = self.scopes.expected_return().cloned();
        match (&r.value, expected) {
            (None, Some(ret)) => {
                let resolved = self.unifier.resolve(&ret);
                if resolved != Type::Void {
                    self.error(TypeError::Mismatch {
                        expected: resolved,
                        found: Type::Void,
                        span: r.span,
                    });
                }
                Some(TypedStmt::Return(None))
            }
            (None, None) => Some(TypedStmt::Return(None)),
            (Some(value), expected) => {
                let typed = self.check_expr(value, expected.as_ref());
                let typed = match expected {
                    Some(ret) => self.coerce(&ret, typed, value.span),
                    None => typed,
                };
                Some(TypedStmt::Return(Some(typed)))
            }
        }
    }

    // ── Functions ──────────────────────────────────────────────────────

    fn check_fn_body(&mut self, decl: &ast::FnDecl) -> Option<TypedStmt> {
        let mutates = self.impl_ctx.as_ref().map(|c| c.mutates).unwrap_or(false);
        let typed = self.check_function(
            Some(decl.name.clone()),
            &decl.generics,
            &decl.params,
            decl.ret.as_ref(),
            &decl.body,
            mutates,
            false,
        );
        Some(TypedStmt::Fn(Rc::new(typed)))
    }

    /// Check a function body: named function, method, or closure.
    ///
    /// Pushes a function scope carrying the expected return type, the
    /// generic context, and (for fiber bodies) the isolation flag; declares
    /// the parameters; checks the body; and enforces the implicit-return
    /// rule on the body's trailing expression.
    pub(crate) fn check_function(
        &mut self,
        name: Option<String>,
        generics: &[String],
        params: &[ast::Param],
        ret: Option<&ast::TypeExpr>,
        body: &ast::Block,
        mutates: bool,
        isolated: bool,
    ) -> TypedFn {
        let generic_map = self.fresh_generics(generics);
        self.scopes.enter_function(Type::Void, generic_map, isolated);
        let params = self.resolve_params(params, true);
        let ret = ret.map(|te| self.resolve_type(te, true)).unwrap_or(Type::Void);
        self.scopes.set_expected_return(ret.clone());
        for param in &params {
            let symbol = Symbol::variable(&param.name, param.ty.clone(), param.mutable);
            if self.scopes.declare(symbol).is_err() {
                self.error(TypeError::DuplicateDefinition {
                    name: param.name.clone(),
                    span: body.span,
                });
            }
        }
        let mut typed_body = self.check_block(body, Some(&ret));
        if !typed_body.diverges {
            let found = self.unifier.resolve(&typed_body.ty);
            let error_span = body
                .statements
                .last()
                .map(|s| s.span())
                .unwrap_or(body.span);
            match self.fit(&ret.clone(), &found) {
                Fit::Equal => {}
                Fit::Widened => self.widen_block_result(&mut typed_body, &ret),
                Fit::No => {
                    let expected = self.unifier.resolve(&ret);
                    self.error(TypeError::Mismatch { expected, found, span: error_span });
                }
            }
        }
        self.scopes.exit();
        TypedFn { name, params, ret, body: typed_body, mutates_receiver: mutates }
    }

    /// Wrap a block's trailing expression into `IntoMaybe` after a widening
    /// implicit return.
    fn widen_block_result(&mut self, block: &mut TypedBlock, expected: &Type) {
        if let Some(TypedStmt::Expr(_)) = block.statements.last() {
            let Some(TypedStmt::Expr(last)) = block.statements.pop() else { unreachable!() };
            let ty = self.unifier.resolve(expected);
            let span = last.span;
            let wrapped = self.typed(TypedExprKind::IntoMaybe(Box::new(last)), ty.clone(), span);
            block.ty = ty;
            block.statements.push(TypedStmt::Expr(wrapped));
        }
    }

    fn check_impl(&mut self, block: &ast::ImplBlock) -> Option<TypedStmt> {
        let strukt = self.lookup_struct(&block.target)?;
        let mut methods = Vec::new();
        for method in &block.methods {
            let mutates = block.mutable || method.mutates;
            self.impl_ctx = Some(ImplCtx { strukt: strukt.clone(), mutates });
            let typed = self.check_function(
                Some(method.name.clone()),
                &method.generics,
                &method.params,
                method.ret.as_ref(),
                &method.body,
                mutates,
                false,
            );
            self.impl_ctx = None;
            methods.push(Rc::new(typed));
        }
        Some(TypedStmt::ImplDef { target: block.target.clone(), methods })
    }

    // ── Blocks ─────────────────────────────────────────────────────────

    /// Check a block in a fresh scope. The block's type is its last
    /// producing statement's type, or `Void`; `expected` threads into that
    /// trailing expression for inference.
    pub(crate) fn check_block(&mut self, block: &ast::Block, expected: Option<&Type>) -> TypedBlock {
        self.scopes.enter_block();
        let total = block.statements.len();
        let mut statements = Vec::new();
        for (index, stmt) in block.statements.iter().enumerate() {
            let stmt_expected = if index + 1 == total { expected } else { None };
            if let Some(typed) = self.check_stmt(stmt, stmt_expected) {
                statements.push(typed);
            }
        }
        self.scopes.exit();
        let (ty, diverges) = match statements.last() {
            Some(TypedStmt::Expr(e)) => (e.ty.clone(), false),
            Some(TypedStmt::Return(_)) => (Type::Void, true),
            _ => (Type::Void, false),
        };
        TypedBlock { statements, ty, diverges, span: block.span }
    }

    // ── Expressions ────────────────────────────────────────────────────

    /// Check an expression. Always returns a node; failures record a
    /// diagnostic and produce a sentinel whose erased type keeps later
    /// checks from cascading.
    pub(crate) fn check_expr(&mut self, expr: &ast::Expr, expected: Option<&Type>) -> TypedExpr {
        let span = expr.span;
        match &expr.kind {
            ExprKind::Int(value) => self.typed(TypedExprKind::Int(*value), Type::Int, span),
            ExprKind::Float(value) => self.typed(TypedExprKind::Float(*value), Type::Float, span),
            ExprKind::Bool(value) => self.typed(TypedExprKind::Bool(*value), Type::Bool, span),
            ExprKind::Str(parts) => self.check_str(parts, span),
            ExprKind::List(elements) => self.check_list(elements, expected, span),
            ExprKind::Map(entries) => self.check_map(entries, expected, span),
            ExprKind::Ident(name) => match self.scopes.lookup(name).cloned() {
                Some(symbol) => {
                    self.typed(TypedExprKind::Variable(name.clone()), symbol.ty, span)
                }
                None => {
                    self.error(TypeError::UndefinedVariable { name: name.clone(), span });
                    self.poisoned(span)
                }
            },
            ExprKind::SelfField(field) => self.check_self_field(field, span),
            ExprKind::StaticAccess { base, member, base_span, .. } => {
                self.check_static_access(base, member, *base_span, span)
            }
            ExprKind::Property { object, name, .. } => {
                let typed_object = self.check_expr(object, None);
                if matches!(typed_object.kind, TypedExprKind::Error) {
                    return self.poisoned(span);
                }
                let object_ty = self.unifier.resolve(&typed_object.ty);
                if object_ty == Type::Dynamic {
                    return self.typed(
                        TypedExprKind::Property {
                            object: Box::new(typed_object),
                            name: name.clone(),
                        },
                        Type::Dynamic,
                        span,
                    );
                }
                match object_ty.property(name, &self.registry) {
                    Some(ty) => self.typed(
                        TypedExprKind::Property {
                            object: Box::new(typed_object),
                            name: name.clone(),
                        },
                        ty,
                        span,
                    ),
                    None => {
                        self.error(TypeError::Undefined { path: self.slice(span), span });
                        self.poisoned(span)
                    }
                }
            }
            ExprKind::Call { callee, type_args, args } => {
                self.check_call(callee, type_args, args, expected, span)
            }
            ExprKind::Binary { op, op_span, lhs, rhs } => {
                self.check_binary(*op, *op_span, lhs, rhs, span)
            }
            ExprKind::Unary { op, operand } => self.check_unary(*op, operand, span),
            ExprKind::If(if_expr) => self.check_if(if_expr, expected, span),
            ExprKind::Match(match_expr) => self.check_match(match_expr, expected, span),
            ExprKind::Try { operand, catch } => {
                self.check_try(operand, catch.as_ref(), expected, span)
            }
            ExprKind::Func(fn_expr) => {
                let typed = self.check_function(
                    None,
                    &[],
                    &fn_expr.params,
                    fn_expr.ret.as_ref(),
                    &fn_expr.body,
                    false,
                    false,
                );
                let signature = FunctionType {
                    type_params: Vec::new(),
                    params: typed.params.clone(),
                    ret: typed.ret.clone(),
                    mutates_receiver: false,
                };
                self.typed(
                    TypedExprKind::Closure(Box::new(typed)),
                    Type::function(signature),
                    span,
                )
            }
            ExprKind::StructLit { name, name_span, fields } => {
                self.check_struct_lit(name, *name_span, fields, span)
            }
            ExprKind::Block(block) => {
                let typed = self.check_block(block, expected);
                let ty = typed.ty.clone();
                self.typed(TypedExprKind::Block(typed), ty, span)
            }
        }
    }

    fn check_str(&mut self, parts: &[StrPart], span: Span) -> TypedExpr {
        let is_plain = parts.iter().all(|p| matches!(p, StrPart::Text(_)));
        if is_plain {
            let text: String = parts
                .iter()
                .map(|p| match p {
                    StrPart::Text(t) => t.as_str(),
                    StrPart::Expr(_) => unreachable!(),
                })
                .collect();
            return self.typed(TypedExprKind::Str(text), Type::Str, span);
        }
        let mut typed_parts = Vec::new();
        for part in parts {
            match part {
                StrPart::Text(text) => typed_parts.push(InterpPart::Text(text.clone())),
                StrPart::Expr(inner) => {
                    let typed = self.check_expr(inner, None);
                    let ty = self.unifier.resolve(&typed.ty);
                    if !self.is_stringable(&ty) {
                        self.error(TypeError::NotStringable { found: ty, span: inner.span });
                    }
                    typed_parts.push(InterpPart::Expr(typed));
                }
            }
        }
        self.typed(TypedExprKind::Interp(typed_parts), Type::Str, span)
    }

    /// Whether a value of this type can appear inside string interpolation:
    /// primitives, `Maybe`, erased data, or anything with a `to_str` method
    /// matching the implicit `ToString` trait.
    fn is_stringable(&self, ty: &Type) -> bool {
        match ty {
            Type::Str | Type::Int | Type::Float | Type::Bool | Type::Dynamic => true,
            Type::Maybe(_) => true,
            other => matches!(
                other.property("to_str", &self.registry),
                Some(Type::Function(f)) if f.params.is_empty() && f.ret == Type::Str
            ),
        }
    }

    fn check_list(
        &mut self,
        elements: &[ast::Expr],
        expected: Option<&Type>,
        span: Span,
    ) -> TypedExpr {
        let expected_element = expected
            .map(|t| self.unifier.resolve(t))
            .and_then(|t| match t {
                Type::List(e) => Some(*e),
                _ => None,
            });
        if elements.is_empty() {
            return match expected_element {
                Some(element) => self.typed(TypedExprKind::List(Vec::new()), Type::list(element), span),
                None => {
                    self.error(TypeError::EmptyListNeedsType { span });
                    self.typed(TypedExprKind::List(Vec::new()), Type::list(Type::Dynamic), span)
                }
            };
        }
        let mut typed_elements = Vec::new();
        let first = self.check_expr(&elements[0], expected_element.as_ref());
        let element_ty = match expected_element {
            Some(e) => {
                self.expect_type(&e, &first.ty.clone(), elements[0].span);
                e
            }
            None => self.unifier.resolve(&first.ty),
        };
        typed_elements.push(first);
        for element in &elements[1..] {
            let typed = self.check_expr(element, Some(&element_ty));
            self.expect_type(&element_ty, &typed.ty.clone(), element.span);
            typed_elements.push(typed);
        }
        self.typed(TypedExprKind::List(typed_elements), Type::list(element_ty), span)
    }

    fn check_map(
        &mut self,
        entries: &[(ast::Expr, ast::Expr)],
        expected: Option<&Type>,
        span: Span,
    ) -> TypedExpr {
        let expected_pair = expected
            .map(|t| self.unifier.resolve(t))
            .and_then(|t| match t {
                Type::Map(k, v) => Some((*k, *v)),
                _ => None,
            });
        if entries.is_empty() {
            return match expected_pair {
                Some((k, v)) => self.typed(TypedExprKind::Map(Vec::new()), Type::map(k, v), span),
                None => {
                    self.error(TypeError::EmptyMapNeedsType { span });
                    self.typed(
                        TypedExprKind::Map(Vec::new()),
                        Type::map(Type::Dynamic, Type::Dynamic),
                        span,
                    )
                }
            };
        }
        let (first_key, first_value) = &entries[0];
        let (exp_k, exp_v) = match &expected_pair {
            Some((k, v)) => (Some(k.clone()), Some(v.clone())),
            None => (None, None),
        };
        let typed_key = self.check_expr(first_key, exp_k.as_ref());
        let typed_value = self.check_expr(first_value, exp_v.as_ref());
        let key_ty = match exp_k {
            Some(k) => {
                self.expect_type(&k, &typed_key.ty.clone(), first_key.span);
                k
            }
            None => self.unifier.resolve(&typed_key.ty),
        };
        let value_ty = match exp_v {
            Some(v) => {
                self.expect_type(&v, &typed_value.ty.clone(), first_value.span);
                v
            }
            None => self.unifier.resolve(&typed_value.ty),
        };
        let mut typed_entries = vec![(typed_key, typed_value)];
        for (key, value) in &entries[1..] {
            let tk = self.check_expr(key, Some(&key_ty));
            self.expect_type(&key_ty, &tk.ty.clone(), key.span);
            let tv = self.check_expr(value, Some(&value_ty));
            self.expect_type(&value_ty, &tv.ty.clone(), value.span);
            typed_entries.push((tk, tv));
        }
        self.typed(
            TypedExprKind::Map(typed_entries),
            Type::map(key_ty, value_ty),
            span,
        )
    }

    fn check_self_field(&mut self, field: &str, span: Span) -> TypedExpr {
        let Some(ctx) = &self.impl_ctx else {
            self.error(TypeError::SelfOutsideImpl { span });
            return self.poisoned(span);
        };
        let strukt = ctx.strukt.clone();
        if let Some(f) = strukt.field(field) {
            return self.typed(TypedExprKind::SelfField(field.to_string()), f.ty, span);
        }
        if let Some(method) = self.registry.method(&strukt.name, field) {
            let ty = Type::Function(method.signature);
            return self.typed(TypedExprKind::SelfField(field.to_string()), ty, span);
        }
        self.error(TypeError::Undefined { path: format!("@{field}"), span });
        self.poisoned(span)
    }

    fn check_static_access(
        &mut self,
        base: &str,
        member: &str,
        base_span: Span,
        span: Span,
    ) -> TypedExpr {
        if let Some(symbol) = self.scopes.lookup(base).cloned() {
            match &symbol.kind {
                SymbolKind::Module(module) => {
                    return match module.get(member) {
                        Some(found) => {
                            let ty = found.ty.clone();
                            self.typed(
                                TypedExprKind::ModuleMember {
                                    module: base.to_string(),
                                    member: member.to_string(),
                                },
                                ty,
                                span,
                            )
                        }
                        None => {
                            self.error(TypeError::Undefined { path: self.slice(span), span });
                            self.poisoned(span)
                        }
                    };
                }
                SymbolKind::Enum => {
                    if let Type::Enum(e) = &symbol.ty {
                        return match e.variant_index(member) {
                            Some(index) => {
                                let ty = symbol.ty.clone();
                                self.typed(
                                    TypedExprKind::EnumVariant {
                                        enum_name: base.to_string(),
                                        variant: member.to_string(),
                                        index,
                                    },
                                    ty,
                                    span,
                                )
                            }
                            None => {
                                self.error(TypeError::UnknownVariant {
                                    path: format!("{base}::{member}"),
                                    span,
                                });
                                self.poisoned(span)
                            }
                        };
                    }
                }
                SymbolKind::Struct => {
                    return match self.registry.static_fn(base, member) {
                        Some(signature) => {
                            let ty = Type::Function(signature);
                            self.typed(
                                TypedExprKind::ModuleMember {
                                    module: base.to_string(),
                                    member: member.to_string(),
                                },
                                ty,
                                span,
                            )
                        }
                        None => {
                            self.error(TypeError::Undefined { path: self.slice(span), span });
                            self.poisoned(span)
                        }
                    };
                }
                _ => {}
            }
            self.error(TypeError::Undefined { path: self.slice(span), span });
            return self.poisoned(span);
        }
        if let Some(signature) = stdlib::builtin_static(base, member) {
            let ty = Type::Function(signature);
            return self.typed(
                TypedExprKind::ModuleMember {
                    module: base.to_string(),
                    member: member.to_string(),
                },
                ty,
                span,
            );
        }
        if base == "Result" || base == "Maybe" {
            self.error(TypeError::Undefined { path: self.slice(span), span });
            return self.poisoned(span);
        }
        self.error(TypeError::UndefinedVariable { name: base.to_string(), span: base_span });
        self.poisoned(span)
    }

    // ── Calls ──────────────────────────────────────────────────────────

    fn check_call(
        &mut self,
        callee: &ast::Expr,
        type_args: &[ast::TypeExpr],
        args: &[ast::Expr],
        expected: Option<&Type>,
        span: Span,
    ) -> TypedExpr {
        // `async::start(...)` builds a fiber, not a plain call.
        if let ExprKind::StaticAccess { base, member, .. } = &callee.kind {
            if member == "start" && self.is_async_module(base) {
                return self.check_fiber(args, span);
            }
        }

        let typed_callee = self.check_expr(callee, None);
        if matches!(typed_callee.kind, TypedExprKind::Error) {
            for arg in args {
                self.check_expr(arg, None);
            }
            return self.poisoned(span);
        }
        let callee_ty = self.unifier.resolve(&typed_callee.ty);
        let signature = match &callee_ty {
            Type::Function(f) => f.clone(),
            Type::Dynamic => {
                for arg in args {
                    self.check_expr(arg, None);
                }
                return self.poisoned(span);
            }
            _ => {
                self.error(TypeError::NotAFunction {
                    name: self.slice(callee.span),
                    span: callee.span,
                });
                for arg in args {
                    self.check_expr(arg, None);
                }
                return self.poisoned(span);
            }
        };

        // A mutating method needs a mutable receiver.
        if signature.mutates_receiver {
            match &callee.kind {
                ExprKind::Property { object, name, .. } => {
                    if !self.place_is_mutable(object) {
                        self.error(TypeError::MutatingMethodOnImmutable {
                            method: name.clone(),
                            binding: self.slice(object.span),
                            span,
                        });
                    }
                }
                ExprKind::SelfField(name) => {
                    if !self.impl_ctx.as_ref().is_some_and(|c| c.mutates) {
                        self.error(TypeError::MutatingMethodOnImmutable {
                            method: name.clone(),
                            binding: "@".to_string(),
                            span,
                        });
                    }
                }
                _ => {}
            }
        }

        let (typed_args, ret) = self.check_invocation(&signature, type_args, args, expected, span);

        match &callee.kind {
            ExprKind::Property { object: _, name, .. } => {
                // Re-use the receiver already checked inside the callee node.
                let TypedExprKind::Property { object, .. } = typed_callee.kind else {
                    return self.typed(
                        TypedExprKind::Call { callee: Box::new(typed_callee), args: typed_args },
                        ret,
                        span,
                    );
                };
                self.typed(
                    TypedExprKind::MethodCall {
                        receiver: object,
                        method: name.clone(),
                        args: typed_args,
                        mutates: signature.mutates_receiver,
                    },
                    ret,
                    span,
                )
            }
            _ => self.typed(
                TypedExprKind::Call { callee: Box::new(typed_callee), args: typed_args },
                ret,
                span,
            ),
        }
    }

    /// Check arguments against an instantiated signature and compute the
    /// call's result type.
    fn check_invocation(
        &mut self,
        signature: &FunctionType,
        type_args: &[ast::TypeExpr],
        args: &[ast::Expr],
        expected: Option<&Type>,
        span: Span,
    ) -> (Vec<TypedExpr>, Type) {
        let mut pre_bound = FxHashMap::default();
        if !type_args.is_empty() {
            if type_args.len() != signature.type_params.len() {
                self.error(TypeError::TypeArityMismatch {
                    expected: signature.type_params.len(),
                    found: type_args.len(),
                    span,
                });
            }
            for (name, te) in signature.type_params.iter().zip(type_args) {
                let ty = self.resolve_type(te, true);
                pre_bound.insert(name.clone(), ty);
            }
        }
        let instance = self.unifier.instantiate(signature, &pre_bound);

        // Let the expected type pre-bind the return before arguments do.
        if let Some(exp) = expected {
            let _ = self.unifier.unify(&instance.ret, exp);
        }

        if args.len() != instance.params.len() {
            self.error(TypeError::ArityMismatch {
                expected: instance.params.len(),
                found: args.len(),
                span,
            });
        }
        let mut typed_args = Vec::new();
        for (index, arg) in args.iter().enumerate() {
            match instance.params.get(index) {
                Some(param) => {
                    let expected_ty = param.ty.clone();
                    let typed = self.check_expr(arg, Some(&expected_ty));
                    if !self.arg_fits(&expected_ty, &typed.ty.clone()) {
                        let expected = self.unifier.resolve(&expected_ty);
                        let found = self.unifier.resolve(&typed.ty);
                        self.error(TypeError::Mismatch { expected, found, span: arg.span });
                    }
                    if param.mutable && !self.arg_is_mutable_binding(arg) {
                        self.error(TypeError::MutParamNeedsMutable {
                            param: param.name.clone(),
                            span: arg.span,
                        });
                    }
                    typed_args.push(typed);
                }
                None => {
                    typed_args.push(self.check_expr(arg, None));
                }
            }
        }

        let mut ret = self.unifier.resolve(&instance.ret);
        if ret.contains_var() {
            let name = first_var_name(&ret).unwrap_or_else(|| "$T".to_string());
            self.error(TypeError::CannotInfer { name, span });
            ret = Type::Dynamic;
        }
        (typed_args, ret)
    }

    /// Whether an argument fits a parameter: unification, or structural
    /// trait conformance when the parameter is trait-typed. No `Maybe`
    /// widening here; that belongs to assignment and return sites only.
    fn arg_fits(&mut self, expected: &Type, found: &Type) -> bool {
        if self.unifier.unify(expected, found).is_ok() {
            return true;
        }
        if let Type::Trait(t) = self.unifier.resolve(expected) {
            return self.unifier.resolve(found).has_trait(&t, &self.registry);
        }
        false
    }

    fn arg_is_mutable_binding(&self, arg: &ast::Expr) -> bool {
        match &arg.kind {
            ExprKind::Ident(name) => self
                .scopes
                .lookup(name)
                .map(|s| s.is_mutable())
                .unwrap_or(true),
            _ => false,
        }
    }

    fn is_async_module(&self, base: &str) -> bool {
        matches!(
            self.scopes.lookup(base),
            Some(Symbol { kind: SymbolKind::Module(m), .. }) if m.path() == "ard/async"
        )
    }

    /// `async::start(arg)`: the argument is an anonymous function (checked
    /// in an isolated scope) or a module-function reference. The typed node
    /// records what the fiber will run.
    fn check_fiber(&mut self, args: &[ast::Expr], span: Span) -> TypedExpr {
        if args.len() != 1 {
            self.error(TypeError::ArityMismatch { expected: 1, found: args.len(), span });
            return self.typed(TypedExprKind::Error, Type::fiber(Type::Void), span);
        }
        match &args[0].kind {
            ExprKind::Func(fn_expr) => {
                if !fn_expr.params.is_empty() {
                    self.error(TypeError::FiberArgument { span: args[0].span });
                }
                let typed = self.check_function(
                    None,
                    &[],
                    &fn_expr.params,
                    fn_expr.ret.as_ref(),
                    &fn_expr.body,
                    false,
                    true,
                );
                let ret = typed.ret.clone();
                self.typed(
                    TypedExprKind::Fiber(FiberTarget::Closure(Box::new(typed))),
                    Type::fiber(ret),
                    span,
                )
            }
            ExprKind::StaticAccess { base, member, .. } => {
                let target = self.check_static_access(
                    base,
                    member,
                    args[0].span,
                    args[0].span,
                );
                match self.unifier.resolve(&target.ty) {
                    Type::Function(f) if f.params.is_empty() => {
                        let ret = f.ret.clone();
                        self.typed(
                            TypedExprKind::Fiber(FiberTarget::Named {
                                module: base.clone(),
                                function: member.clone(),
                            }),
                            Type::fiber(ret),
                            span,
                        )
                    }
                    Type::Dynamic => self.typed(
                        TypedExprKind::Error,
                        Type::fiber(Type::Void),
                        span,
                    ),
                    _ => {
                        self.error(TypeError::FiberArgument { span: args[0].span });
                        self.typed(TypedExprKind::Error, Type::fiber(Type::Void), span)
                    }
                }
            }
            _ => {
                self.check_expr(&args[0], None);
                self.error(TypeError::FiberArgument { span: args[0].span });
                self.typed(TypedExprKind::Error, Type::fiber(Type::Void), span)
            }
        }
    }

    // ── Operators ──────────────────────────────────────────────────────

    fn check_binary(
        &mut self,
        op: ast::BinaryOp,
        op_span: Span,
        lhs: &ast::Expr,
        rhs: &ast::Expr,
        span: Span,
    ) -> TypedExpr {
        use ast::BinaryOp::*;
        let typed_lhs = self.check_expr(lhs, None);
        let typed_rhs = self.check_expr(rhs, None);
        let lt = self.unifier.resolve(&typed_lhs.ty);
        let rt = self.unifier.resolve(&typed_rhs.ty);
        let dynamic = lt == Type::Dynamic || rt == Type::Dynamic;
        let ty = match op {
            Add | Sub | Mul | Div => {
                if dynamic {
                    Type::Dynamic
                } else if lt == Type::Int && rt == Type::Int {
                    Type::Int
                } else if lt == Type::Float && rt == Type::Float {
                    Type::Float
                } else if op == Add && lt == Type::Str && rt == Type::Str {
                    Type::Str
                } else {
                    self.error(TypeError::InvalidOperands {
                        op: op.symbol(),
                        lhs: lt.clone(),
                        rhs: rt,
                        span: op_span,
                    });
                    // Best guess: the left operand's type.
                    lt
                }
            }
            Rem => {
                if dynamic {
                    Type::Dynamic
                } else if lt == Type::Int && rt == Type::Int {
                    Type::Int
                } else {
                    self.error(TypeError::InvalidOperands {
                        op: "%",
                        lhs: lt,
                        rhs: rt,
                        span: op_span,
                    });
                    Type::Int
                }
            }
            Lt | LtEq | Gt | GtEq => {
                let ordered = (lt == Type::Int && rt == Type::Int)
                    || (lt == Type::Float && rt == Type::Float);
                if !ordered && !dynamic {
                    self.error(TypeError::InvalidOperands {
                        op: op.symbol(),
                        lhs: lt,
                        rhs: rt,
                        span: op_span,
                    });
                }
                Type::Bool
            }
            Eq | NotEq => {
                if !dynamic {
                    if self.unifier.unify(&lt, &rt).is_err() {
                        self.error(TypeError::InvalidOperands {
                            op: op.symbol(),
                            lhs: lt.clone(),
                            rhs: rt,
                            span: op_span,
                        });
                    } else if !is_comparable(&lt) {
                        self.error(TypeError::NotComparable { found: lt, span: op_span });
                    }
                }
                Type::Bool
            }
            And | Or => {
                if !dynamic && !(lt == Type::Bool && rt == Type::Bool) {
                    self.error(TypeError::InvalidOperands {
                        op: op.symbol(),
                        lhs: lt,
                        rhs: rt,
                        span: op_span,
                    });
                }
                Type::Bool
            }
        };
        self.typed(
            TypedExprKind::Binary { op, lhs: Box::new(typed_lhs), rhs: Box::new(typed_rhs) },
            ty,
            span,
        )
    }

    fn check_unary(&mut self, op: ast::UnaryOp, operand: &ast::Expr, span: Span) -> TypedExpr {
        let typed = self.check_expr(operand, None);
        let ty = self.unifier.resolve(&typed.ty);
        let result = match op {
            ast::UnaryOp::Neg => match ty {
                Type::Int | Type::Float | Type::Dynamic => ty,
                other => {
                    self.error(TypeError::InvalidOperand { op: "-", found: other, span });
                    Type::Int
                }
            },
            ast::UnaryOp::Not => {
                if ty != Type::Bool && ty != Type::Dynamic {
                    self.error(TypeError::InvalidOperand { op: "not", found: ty, span });
                }
                Type::Bool
            }
        };
        self.typed(TypedExprKind::Unary { op, operand: Box::new(typed) }, result, span)
    }

    // ── Control flow ───────────────────────────────────────────────────

    fn check_if(
        &mut self,
        if_expr: &ast::IfExpr,
        expected: Option<&Type>,
        span: Span,
    ) -> TypedExpr {
        let cond = self.check_expr(&if_expr.cond, Some(&Type::Bool));
        let cond_ty = self.unifier.resolve(&cond.ty);
        if cond_ty != Type::Bool && cond_ty != Type::Dynamic {
            self.error(TypeError::IfCondition { span: if_expr.cond.span });
        }

        let then_block = self.check_block(&if_expr.then_block, expected);
        let mut else_ifs = Vec::new();
        let mut else_block = None;

        // Flatten the else-if chain.
        let mut branch = if_expr.else_branch.as_deref();
        while let Some(b) = branch {
            match b {
                ast::ElseBranch::Block(block) => {
                    else_block = Some(self.check_block(block, expected));
                    branch = None;
                }
                ast::ElseBranch::If(nested) => {
                    let ExprKind::If(nested_if) = &nested.kind else { unreachable!() };
                    let nested_cond = self.check_expr(&nested_if.cond, Some(&Type::Bool));
                    let nested_cond_ty = self.unifier.resolve(&nested_cond.ty);
                    if nested_cond_ty != Type::Bool && nested_cond_ty != Type::Dynamic {
                        self.error(TypeError::IfCondition { span: nested_if.cond.span });
                    }
                    let block = self.check_block(&nested_if.then_block, expected);
                    else_ifs.push((nested_cond, block));
                    branch = nested_if.else_branch.as_deref();
                }
            }
        }

        let ty = if else_block.is_none() {
            Type::Void
        } else {
            let result = self.unifier.resolve(&then_block.ty);
            for (_, block) in &else_ifs {
                if self.unifier.unify(&result, &block.ty).is_err() {
                    self.error(TypeError::BranchMismatch { span: block.span });
                }
            }
            if let Some(block) = &else_block {
                if self.unifier.unify(&result, &block.ty).is_err() {
                    self.error(TypeError::BranchMismatch { span: block.span });
                }
            }
            result
        };

        self.typed(
            TypedExprKind::If {
                cond: Box::new(cond),
                then_block,
                else_ifs,
                else_block,
            },
            ty,
            span,
        )
    }

    fn check_try(
        &mut self,
        operand: &ast::Expr,
        catch: Option<&ast::CatchArm>,
        expected: Option<&Type>,
        span: Span,
    ) -> TypedExpr {
        if !self.scopes.in_function() {
            self.error(TypeError::TryOutsideFunction { span });
        }
        // Build an expected type for the operand so generic producers
        // (json::decode and friends) bind from context: the value side from
        // the surrounding expectation, the error side from the enclosing
        // function's Result return when the error will propagate.
        let propagated_err = if catch.is_none() {
            self.scopes
                .expected_return()
                .cloned()
                .and_then(|ret| match self.unifier.resolve(&ret) {
                    Type::Result(_, e) => Some(*e),
                    _ => None,
                })
        } else {
            None
        };
        let expected_operand = if expected.is_some() || propagated_err.is_some() {
            let value = expected
                .cloned()
                .unwrap_or_else(|| self.unifier.fresh("$V"));
            let error = propagated_err.unwrap_or_else(|| self.unifier.fresh("$E"));
            Some(Type::result(value, error))
        } else {
            None
        };
        let typed_operand = self.check_expr(operand, expected_operand.as_ref());
        let operand_ty = self.unifier.resolve(&typed_operand.ty);
        let (value_ty, error_ty) = match operand_ty {
            Type::Result(v, e) => (*v, *e),
            Type::Dynamic => (Type::Dynamic, Type::Dynamic),
            other => {
                self.error(TypeError::TryNotResult { found: other, span: operand.span });
                (Type::Dynamic, Type::Dynamic)
            }
        };

        let typed_catch = match catch {
            None => {
                if self.scopes.in_function() {
                    match self.scopes.expected_return().cloned() {
                        Some(ret) => match self.unifier.resolve(&ret) {
                            Type::Result(_, fn_err) => {
                                if error_ty != Type::Dynamic {
                                    self.expect_type(&fn_err, &error_ty, span);
                                }
                            }
                            other => {
                                self.error(TypeError::TryReturnNotResult { ret: other, span });
                            }
                        },
                        None => {}
                    }
                }
                None
            }
            Some(arm) => {
                let ret = self.scopes.expected_return().cloned();
                self.scopes.enter_block();
                let _ = self
                    .scopes
                    .declare(Symbol::variable(&arm.name, error_ty.clone(), false));
                let body = self.check_block(&arm.body, ret.as_ref());
                self.scopes.exit();
                if let Some(ret) = ret {
                    if !body.diverges {
                        let found = self.unifier.resolve(&body.ty);
                        if self.unifier.unify(&ret, &found).is_err() {
                            let expected = self.unifier.resolve(&ret);
                            self.error(TypeError::Mismatch {
                                expected,
                                found,
                                span: arm.body.span,
                            });
                        }
                    }
                }
                Some(TypedCatch { name: arm.name.clone(), body })
            }
        };

        self.typed(
            TypedExprKind::Try { operand: Box::new(typed_operand), catch: typed_catch },
            value_ty,
            span,
        )
    }

    fn check_struct_lit(
        &mut self,
        name: &str,
        name_span: Span,
        fields: &[ast::StructLitField],
        span: Span,
    ) -> TypedExpr {
        let strukt = match self.scopes.lookup(name).cloned() {
            Some(Symbol { ty: Type::Struct(s), .. }) => s,
            Some(_) => {
                self.error(TypeError::NotAStruct { name: name.to_string(), span: name_span });
                return self.poisoned(span);
            }
            None => {
                self.error(TypeError::UnknownType { name: name.to_string(), span: name_span });
                return self.poisoned(span);
            }
        };
        let declared = strukt.fields.borrow().clone();
        let mut typed_fields: Vec<(String, TypedExpr)> = Vec::new();
        let mut provided: FxHashSet<String> = FxHashSet::default();
        for field in fields {
            if !provided.insert(field.name.clone()) {
                self.error(TypeError::DuplicateField {
                    field: field.name.clone(),
                    span: field.name_span,
                });
                continue;
            }
            let Some(decl) = declared.iter().find(|f| f.name == field.name) else {
                self.error(TypeError::UnknownField {
                    struct_name: strukt.name.clone(),
                    field: field.name.clone(),
                    span: field.name_span,
                });
                self.check_expr(&field.value, None);
                continue;
            };
            let expected = decl.ty.clone();
            let typed = self.check_expr(&field.value, Some(&expected));
            let typed = self.coerce(&expected, typed, field.value.span);
            typed_fields.push((field.name.clone(), typed));
        }
        for decl in &declared {
            let optional = matches!(decl.ty, Type::Maybe(_));
            if !optional && !provided.contains(&decl.name) {
                self.error(TypeError::MissingField {
                    struct_name: strukt.name.clone(),
                    field: decl.name.clone(),
                    span,
                });
            }
        }
        self.typed(
            TypedExprKind::StructLit { name: name.to_string(), fields: typed_fields },
            Type::Struct(strukt),
            span,
        )
    }
}

/// Types equality is defined over.
fn is_comparable(ty: &Type) -> bool {
    matches!(
        ty,
        Type::Int
            | Type::Float
            | Type::Str
            | Type::Bool
            | Type::Maybe(_)
            | Type::Enum(_)
            | Type::Struct(_)
    )
}

/// The display name of the first unresolved variable in a type.
fn first_var_name(ty: &Type) -> Option<String> {
    match ty {
        Type::Var { name, .. } => Some(name.clone()),
        Type::List(t) | Type::Maybe(t) | Type::Fiber(t) => first_var_name(t),
        Type::Map(a, b) | Type::Result(a, b) => first_var_name(a).or_else(|| first_var_name(b)),
        Type::Function(f) => f
            .params
            .iter()
            .find_map(|p| first_var_name(&p.ty))
            .or_else(|| first_var_name(&f.ret)),
        _ => None,
    }
}

/// The declared name of a top-level declaration statement, for duplicate
/// reporting.
fn decl_name(stmt: &Stmt) -> Option<(String, Span)> {
    match stmt {
        Stmt::Enum(d) => Some((d.name.clone(), d.name_span)),
        Stmt::Struct(d) => Some((d.name.clone(), d.name_span)),
        Stmt::Union(d) => Some((d.name.clone(), d.name_span)),
        Stmt::Trait(d) => Some((d.name.clone(), d.name_span)),
        _ => None,
    }
}
