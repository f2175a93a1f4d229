use ard_common::Span;

use crate::ast::expr::Expr;
use crate::ast::ty::TypeExpr;

/// A statement. Expression statements are producing; everything else is not.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let(LetStmt),
    Assign(AssignStmt),
    Fn(FnDecl),
    Enum(EnumDecl),
    Struct(StructDecl),
    Impl(ImplBlock),
    Trait(TraitDecl),
    Union(UnionDecl),
    While(WhileLoop),
    ForIn(ForIn),
    ForClassic(ForClassic),
    Return(ReturnStmt),
    Expr(Expr),
}

impl Stmt {
    /// The span covering the whole statement.
    pub fn span(&self) -> Span {
        match self {
            Stmt::Let(s) => s.span,
            Stmt::Assign(s) => s.span,
            Stmt::Fn(s) => s.span,
            Stmt::Enum(s) => s.span,
            Stmt::Struct(s) => s.span,
            Stmt::Impl(s) => s.span,
            Stmt::Trait(s) => s.span,
            Stmt::Union(s) => s.span,
            Stmt::While(s) => s.span,
            Stmt::ForIn(s) => s.span,
            Stmt::ForClassic(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::Expr(e) => e.span,
        }
    }
}

/// `let name [: T] = expr` or `mut name [: T] = expr`.
#[derive(Debug, Clone, PartialEq)]
pub struct LetStmt {
    pub mutable: bool,
    pub name: String,
    pub name_span: Span,
    pub ty: Option<TypeExpr>,
    pub value: Expr,
    pub span: Span,
}

/// `target = expr` where target is a variable, property, or `list.at(i)`.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignStmt {
    pub target: Expr,
    pub value: Expr,
    pub span: Span,
}

/// A function parameter: `[mut] name: T`.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub mutable: bool,
    pub name: String,
    pub ty: TypeExpr,
    pub span: Span,
}

/// `fn name[<$T, ...>](params) [Ret] { body }`.
#[derive(Debug, Clone, PartialEq)]
pub struct FnDecl {
    pub name: String,
    pub name_span: Span,
    /// Generic parameter names, `$` included, in declaration order.
    pub generics: Vec<String>,
    pub params: Vec<Param>,
    pub ret: Option<TypeExpr>,
    pub body: Block,
    /// Whether the method mutates its receiver (`fn mut m(...)`).
    /// Only meaningful inside an impl block.
    pub mutates: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub name: String,
    pub name_span: Span,
    pub variants: Vec<VariantDecl>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariantDecl {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDecl {
    pub name: String,
    pub name_span: Span,
    pub fields: Vec<FieldDecl>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeExpr,
    pub span: Span,
}

/// `impl [mut] Name { methods }`. A `mut` header marks the receiver mutable
/// for every method in the block.
#[derive(Debug, Clone, PartialEq)]
pub struct ImplBlock {
    pub target: String,
    pub target_span: Span,
    pub mutable: bool,
    pub methods: Vec<FnDecl>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TraitDecl {
    pub name: String,
    pub name_span: Span,
    pub methods: Vec<TraitMethod>,
    pub span: Span,
}

/// A required method signature inside a trait declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct TraitMethod {
    pub name: String,
    pub params: Vec<Param>,
    pub ret: Option<TypeExpr>,
    pub span: Span,
}

/// `union Name = A | B | C`.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionDecl {
    pub name: String,
    pub name_span: Span,
    pub members: Vec<TypeExpr>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WhileLoop {
    pub cond: Expr,
    pub body: Block,
    pub span: Span,
}

/// `for name[, second] in iterable { body }`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForIn {
    pub binding: String,
    pub binding_span: Span,
    pub second: Option<(String, Span)>,
    pub iterable: ForIterable,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForIterable {
    /// `a..b`
    Range(Expr, Expr),
    /// A list, map, string, or bare count.
    Expr(Expr),
}

/// `for init; cond; update { body }`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForClassic {
    pub init: Box<Stmt>,
    pub cond: Expr,
    pub update: Box<Stmt>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

/// A braced sequence of statements. Evaluates to the type of its last
/// producing statement, or `Void`.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}
