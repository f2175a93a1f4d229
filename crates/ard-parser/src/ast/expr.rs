use ard_common::Span;

use crate::ast::stmt::{Block, Param};
use crate::ast::ty::TypeExpr;

/// An expression with its source span.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Int(i64),
    Float(f64),
    Bool(bool),
    /// A string literal, split into literal and interpolated parts.
    /// A plain string is a single `Text` part.
    Str(Vec<StrPart>),
    /// `[a, b, c]` -- empty for `[]`.
    List(Vec<Expr>),
    /// `[k: v, ...]` -- empty for `[:]`.
    Map(Vec<(Expr, Expr)>),
    /// A bare name.
    Ident(String),
    /// `@field` -- receiver field access inside an impl method.
    SelfField(String),
    /// `Base::member` -- enum variant, module member, or static function.
    StaticAccess {
        base: String,
        base_span: Span,
        member: String,
        member_span: Span,
    },
    /// `object.name`
    Property {
        object: Box<Expr>,
        name: String,
        name_span: Span,
    },
    /// `callee(args)`, optionally with explicit type arguments
    /// `callee<T1, T2>(args)`.
    Call {
        callee: Box<Expr>,
        type_args: Vec<TypeExpr>,
        args: Vec<Expr>,
    },
    Binary {
        op: BinaryOp,
        op_span: Span,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    If(IfExpr),
    Match(MatchExpr),
    /// `try operand` with an optional `-> name { ... }` catch arm.
    Try {
        operand: Box<Expr>,
        catch: Option<CatchArm>,
    },
    /// An anonymous function: `fn(p: T) R { ... }`.
    Func(FnExpr),
    /// `Name { field: expr, ... }`
    StructLit {
        name: String,
        name_span: Span,
        fields: Vec<StructLitField>,
    },
    /// A braced block in expression position (match arm bodies).
    Block(Block),
}

/// One piece of a string literal.
#[derive(Debug, Clone, PartialEq)]
pub enum StrPart {
    /// Literal text, escapes already processed.
    Text(String),
    /// An interpolated `{expr}`.
    Expr(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    /// The operator as written in source.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// `-x`
    Neg,
    /// `not x`
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfExpr {
    pub cond: Box<Expr>,
    pub then_block: Block,
    pub else_branch: Option<Box<ElseBranch>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ElseBranch {
    /// `else if ...` -- always an `ExprKind::If`.
    If(Expr),
    /// `else { ... }`
    Block(Block),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchExpr {
    /// `None` for a subject-less (conditional) match.
    pub subject: Option<Box<Expr>>,
    pub arms: Vec<MatchArm>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchArm {
    pub pattern: Pattern,
    pub body: Expr,
    pub span: Span,
}

/// A match-arm pattern. Which patterns are legal depends on the subject's
/// type; the checker decides that, the parser only records the shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub kind: PatternKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PatternKind {
    /// `_`
    Wildcard,
    Bool(bool),
    Int(i64),
    /// `start..end` -- half-open.
    Range { start: i64, end: i64 },
    /// `Dir::up`
    Path { base: String, member: String },
    /// A bare name: a binding (option match), `none`, or a type name
    /// (union match).
    Name(String),
    /// `ok(name)` / `err(name)`
    Ctor { name: String, binding: String },
    /// A boolean condition in a subject-less match.
    Cond(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatchArm {
    pub name: String,
    pub name_span: Span,
    pub body: Block,
}

/// An anonymous function expression.
#[derive(Debug, Clone, PartialEq)]
pub struct FnExpr {
    pub params: Vec<Param>,
    pub ret: Option<TypeExpr>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructLitField {
    pub name: String,
    pub name_span: Span,
    pub value: Expr,
}
