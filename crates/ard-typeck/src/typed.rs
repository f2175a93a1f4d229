//! The typed intermediate representation.
//!
//! A parallel tree produced by the checker: every expression node carries its
//! computed [`Type`] and its handle in the module's registry. Nodes are
//! immutable once produced and owned by the [`TypedProgram`]. Match
//! expressions lower into one tagged form per subject shape, so the
//! evaluator never re-derives what the analyzer already decided.

use std::rc::Rc;

use ard_common::Span;

use crate::registry::TypeId;
use crate::ty::{EnumType, FnParam, StructType, TraitType, Type, UnionType};

/// The typed result of checking one source file.
#[derive(Debug)]
pub struct TypedProgram {
    pub statements: Vec<TypedStmt>,
}

/// A typed expression.
#[derive(Debug)]
pub struct TypedExpr {
    pub kind: TypedExprKind,
    /// The computed type.
    pub ty: Type,
    /// The type's handle in the module's registry;
    /// `registry.lookup(type_id)` equals `ty`.
    pub type_id: TypeId,
    pub span: Span,
}

#[derive(Debug)]
pub enum TypedExprKind {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    /// An interpolated string; literal and expression parts in order.
    Interp(Vec<InterpPart>),
    List(Vec<TypedExpr>),
    Map(Vec<(TypedExpr, TypedExpr)>),
    Variable(String),
    /// `@field` inside an impl method.
    SelfField(String),
    /// A reference to `Enum::variant`, with the variant's ordered index.
    EnumVariant { enum_name: String, variant: String, index: usize },
    /// A reference to an imported module's member.
    ModuleMember { module: String, member: String },
    Property { object: Box<TypedExpr>, name: String },
    Call { callee: Box<TypedExpr>, args: Vec<TypedExpr> },
    MethodCall {
        receiver: Box<TypedExpr>,
        method: String,
        args: Vec<TypedExpr>,
        /// Whether the method mutates the receiver.
        mutates: bool,
    },
    Binary {
        op: ard_parser::ast::BinaryOp,
        lhs: Box<TypedExpr>,
        rhs: Box<TypedExpr>,
    },
    Unary {
        op: ard_parser::ast::UnaryOp,
        operand: Box<TypedExpr>,
    },
    If {
        cond: Box<TypedExpr>,
        then_block: TypedBlock,
        else_ifs: Vec<(TypedExpr, TypedBlock)>,
        else_block: Option<TypedBlock>,
    },
    Match(Box<MatchNode>),
    /// `try operand`; without a catch the error propagates to the enclosing
    /// function's Result return.
    Try {
        operand: Box<TypedExpr>,
        catch: Option<TypedCatch>,
    },
    /// `async::start(...)`.
    Fiber(FiberTarget),
    /// An anonymous function value.
    Closure(Box<TypedFn>),
    StructLit { name: String, fields: Vec<(String, TypedExpr)> },
    Block(TypedBlock),
    /// Widening of a bare `T` into `Maybe<T>` at an assignment or return
    /// position. Always explicit in the IR.
    IntoMaybe(Box<TypedExpr>),
    /// Sentinel for an expression that failed to check. A diagnostic has
    /// already been recorded.
    Error,
}

#[derive(Debug)]
pub enum InterpPart {
    Text(String),
    Expr(TypedExpr),
}

/// What a fiber will run.
#[derive(Debug)]
pub enum FiberTarget {
    /// An anonymous function checked in an isolated scope.
    Closure(Box<TypedFn>),
    /// A reference to a module function, recorded by module and name.
    Named { module: String, function: String },
}

#[derive(Debug)]
pub struct TypedCatch {
    pub name: String,
    pub body: TypedBlock,
}

/// A typed statement.
#[derive(Debug)]
pub enum TypedStmt {
    Expr(TypedExpr),
    Let {
        name: String,
        mutable: bool,
        ty: Type,
        value: TypedExpr,
    },
    Assign { target: AssignTarget, value: TypedExpr },
    While { cond: TypedExpr, body: TypedBlock },
    /// `for i in a..b` -- `for i in n` lowers here with a zero start.
    ForRange {
        binding: String,
        start: TypedExpr,
        end: TypedExpr,
        body: TypedBlock,
    },
    ForStr { binding: String, subject: TypedExpr, body: TypedBlock },
    ForList {
        binding: String,
        index: Option<String>,
        subject: TypedExpr,
        body: TypedBlock,
    },
    ForMap {
        key: String,
        value: String,
        subject: TypedExpr,
        body: TypedBlock,
    },
    ForClassic {
        init: Box<TypedStmt>,
        cond: TypedExpr,
        update: Box<TypedStmt>,
        body: TypedBlock,
    },
    Fn(Rc<TypedFn>),
    Return(Option<TypedExpr>),
    StructDef(Rc<StructType>),
    EnumDef(Rc<EnumType>),
    TraitDef(Rc<TraitType>),
    UnionDef(Rc<UnionType>),
    ImplDef { target: String, methods: Vec<Rc<TypedFn>> },
}

/// The target of a reassignment. Recorded as the resolved place, not the
/// original source string.
#[derive(Debug)]
pub enum AssignTarget {
    Variable(String),
    Property { object: TypedExpr, name: String },
    /// `list.at(index) = value`.
    Element { list: TypedExpr, index: TypedExpr },
    /// `@field = value` inside a `mut` impl block.
    SelfField(String),
}

/// A checked function: named, method, or closure.
#[derive(Debug)]
pub struct TypedFn {
    /// `None` for anonymous functions.
    pub name: Option<String>,
    pub params: Vec<FnParam>,
    pub ret: Type,
    pub body: TypedBlock,
    pub mutates_receiver: bool,
}

/// A checked block. Evaluates to its last producing statement's type, or
/// `Void`.
#[derive(Debug)]
pub struct TypedBlock {
    pub statements: Vec<TypedStmt>,
    pub ty: Type,
    /// Whether the block ends in a `return` (its value already checked
    /// against the enclosing function's return type).
    pub diverges: bool,
    pub span: Span,
}

// ── Match lowerings ────────────────────────────────────────────────────

/// A lowered match. One specialized form per subject shape.
#[derive(Debug)]
pub enum MatchNode {
    Enum(EnumMatch),
    Bool(BoolMatch),
    Int(IntMatch),
    Option(OptionMatch),
    Result(ResultMatch),
    Union(UnionMatch),
    Conditional(ConditionalMatch),
}

/// A match over an enum subject: one body per covered variant, in variant
/// order, plus an optional catch-all standing in for the rest.
#[derive(Debug)]
pub struct EnumMatch {
    pub subject: TypedExpr,
    /// `(variant index, arm body)` pairs.
    pub cases: Vec<(usize, TypedExpr)>,
    pub catchall: Option<Box<TypedExpr>>,
}

#[derive(Debug)]
pub struct BoolMatch {
    pub subject: TypedExpr,
    pub true_body: Box<TypedExpr>,
    pub false_body: Box<TypedExpr>,
}

/// A match over an integer subject: literal cases, half-open `[start..end)`
/// range cases, and the mandatory catch-all.
#[derive(Debug)]
pub struct IntMatch {
    pub subject: TypedExpr,
    pub cases: Vec<(i64, TypedExpr)>,
    pub ranges: Vec<(i64, i64, TypedExpr)>,
    pub catchall: Box<TypedExpr>,
}

/// A match over `T?`: the some arm binds the payload, the none arm does not.
#[derive(Debug)]
pub struct OptionMatch {
    pub subject: TypedExpr,
    pub binding: String,
    pub some_body: Box<TypedExpr>,
    pub none_body: Box<TypedExpr>,
}

#[derive(Debug)]
pub struct ResultMatch {
    pub subject: TypedExpr,
    pub ok_binding: String,
    pub ok_body: Box<TypedExpr>,
    pub err_binding: String,
    pub err_body: Box<TypedExpr>,
}

/// A match over a union subject: one body per covered member type.
#[derive(Debug)]
pub struct UnionMatch {
    pub subject: TypedExpr,
    pub cases: Vec<(Type, TypedExpr)>,
    pub catchall: Option<Box<TypedExpr>>,
}

/// A subject-less match: ordered boolean conditions plus the mandatory
/// catch-all.
#[derive(Debug)]
pub struct ConditionalMatch {
    pub cases: Vec<(TypedExpr, TypedExpr)>,
    pub catchall: Box<TypedExpr>,
}
