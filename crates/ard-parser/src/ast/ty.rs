use ard_common::Span;

/// A type as written in source, before the checker resolves it.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExprKind {
    /// `Int`, `Str`, `Point`, `Dir` -- any named type.
    Named(String),
    /// A generic parameter, e.g. `$T`. The name includes the `$`.
    Generic(String),
    /// `[T]`
    List(Box<TypeExpr>),
    /// `[K:V]`
    Map(Box<TypeExpr>, Box<TypeExpr>),
    /// `T?`
    Maybe(Box<TypeExpr>),
    /// `V!E`
    Result(Box<TypeExpr>, Box<TypeExpr>),
    /// `fn(T1, T2) R` -- a missing return type means `Void`.
    Func {
        params: Vec<TypeExpr>,
        ret: Option<Box<TypeExpr>>,
    },
}
