//! Checker diagnostics.
//!
//! [`TypeError`] enumerates everything the checker can complain about; its
//! `Display` impl produces the fixed, human-readable message strings tests
//! match against. [`Diagnostic`] is the flat public shape consumers see:
//! a severity, a message, and a source range.

use std::fmt;

use ard_common::Span;
use serde::Serialize;

use crate::ty::Type;

/// Diagnostic severity. Errors block downstream phases; warnings do not.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Severity {
    Error,
    Warn,
}

/// The flat diagnostic shape handed to consumers.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: Severity,
    pub message: String,
    pub range: Span,
}

/// A problem found during checking, with enough structure for targeted
/// rendering and tests.
#[derive(Clone, Debug)]
pub enum TypeError {
    /// Two types that should be equal are not.
    Mismatch { expected: Type, found: Type, span: Span },
    /// Reassignment of an immutable variable.
    ImmutableVariable { name: String, span: Span },
    /// Write through an immutable access path (`p.x`, `list.at(i)`, `@f`).
    ImmutableProperty { path: String, span: Span },
    /// A name that resolves to nothing in scope.
    UndefinedVariable { name: String, span: Span },
    /// An unknown member access; `path` is the full source access path.
    Undefined { path: String, span: Span },
    /// A type annotation naming an unknown type.
    UnknownType { name: String, span: Span },
    /// Calling something that is not a function.
    NotAFunction { name: String, span: Span },
    /// Wrong number of call arguments.
    ArityMismatch { expected: usize, found: usize, span: Span },
    /// Wrong number of explicit type arguments.
    TypeArityMismatch { expected: usize, found: usize, span: Span },
    /// Binary operator applied to unsupported operand types.
    InvalidOperands { op: &'static str, lhs: Type, rhs: Type, span: Span },
    /// Unary operator applied to an unsupported operand type.
    InvalidOperand { op: &'static str, found: Type, span: Span },
    /// Equality on a type outside the comparable set.
    NotComparable { found: Type, span: Span },
    /// Non-boolean `if` condition.
    IfCondition { span: Span },
    /// Non-boolean `while` condition.
    WhileCondition { span: Span },
    /// Non-boolean classical `for` condition.
    ForCondition { span: Span },
    /// Non-boolean condition in a subject-less match arm.
    MatchCondition { span: Span },
    /// Branch or arm result types disagree.
    BranchMismatch { span: Span },
    /// An empty list literal with no type to infer from.
    EmptyListNeedsType { span: Span },
    /// An empty map literal with no type to infer from.
    EmptyMapNeedsType { span: Span },
    /// A generic type that never received a binding.
    CannotInfer { name: String, span: Span },
    /// Redeclaration in the same scope.
    DuplicateDefinition { name: String, span: Span },
    /// An enum listing the same variant twice.
    DuplicateVariant { name: String, span: Span },
    /// An enum with no variants.
    EnumWithoutVariants { span: Span },
    /// The same match case twice.
    DuplicateCase { case: String, span: Span },
    /// A match missing a required case.
    IncompleteMatch { missing: String, span: Span },
    /// `_` in a boolean match.
    BoolCatchAll { span: Span },
    /// A match form that cannot be exhaustive without `_`.
    CatchAllRequired { subject: &'static str, span: Span },
    /// A pattern naming a variant the enum does not have.
    UnknownVariant { path: String, span: Span },
    /// A pattern that does not fit the subject's type.
    InvalidPattern { subject: Type, span: Span },
    /// A subject type no match form covers.
    CannotMatch { found: Type, span: Span },
    /// A struct literal missing a non-optional field.
    MissingField { struct_name: String, field: String, span: Span },
    /// A struct literal naming an unknown field.
    UnknownField { struct_name: String, field: String, span: Span },
    /// A struct literal setting a field twice.
    DuplicateField { field: String, span: Span },
    /// A struct literal for something that is not a struct.
    NotAStruct { name: String, span: Span },
    /// Calling a mutating method through an immutable binding.
    MutatingMethodOnImmutable { method: String, binding: String, span: Span },
    /// Passing an immutable value where the parameter is marked `mut`.
    MutParamNeedsMutable { param: String, span: Span },
    /// `@field` outside an impl block.
    SelfOutsideImpl { span: Span },
    /// `try` at top level.
    TryOutsideFunction { span: Span },
    /// `try` on a non-Result operand.
    TryNotResult { found: Type, span: Span },
    /// `try` without catch in a function that does not return a Result.
    TryReturnNotResult { ret: Type, span: Span },
    /// `return` at top level.
    ReturnOutsideFunction { span: Span },
    /// An import path nothing resolves.
    UnknownModule { path: String, span: Span },
    /// An imported module that has errors of its own.
    ModuleHasErrors { path: String, errors: usize, span: Span },
    /// An import chain that loops back on itself.
    CircularImport { chain: String, span: Span },
    /// Two imports binding the same name (warning).
    DuplicateAlias { alias: String, span: Span },
    /// A value that cannot be turned into a string for interpolation.
    NotStringable { found: Type, span: Span },
    /// A bad argument to `async::start`.
    FiberArgument { span: Span },
    /// Map iteration needs a key and a value binding.
    MissingLoopBinding { span: Span },
    /// A second loop binding where the iterable provides only one value.
    ExtraLoopBinding { span: Span },
    /// Range bounds outside the numeric types, or mixed.
    RangeBounds { found: Type, span: Span },
    /// A `for ... in` over a type that is not iterable.
    NotIterable { found: Type, span: Span },
    /// An `impl` block for something that is not a struct.
    ImplTargetNotStruct { name: String, span: Span },
    /// An assignment whose left side is not a place.
    InvalidAssignTarget { span: Span },
    /// A type declaration nested inside a block.
    TopLevelOnly { what: &'static str, span: Span },
}

impl TypeError {
    /// The source range the diagnostic points at.
    pub fn span(&self) -> Span {
        use TypeError::*;
        match self {
            Mismatch { span, .. }
            | ImmutableVariable { span, .. }
            | ImmutableProperty { span, .. }
            | UndefinedVariable { span, .. }
            | Undefined { span, .. }
            | UnknownType { span, .. }
            | NotAFunction { span, .. }
            | ArityMismatch { span, .. }
            | TypeArityMismatch { span, .. }
            | InvalidOperands { span, .. }
            | InvalidOperand { span, .. }
            | NotComparable { span, .. }
            | IfCondition { span }
            | WhileCondition { span }
            | ForCondition { span }
            | MatchCondition { span }
            | BranchMismatch { span }
            | EmptyListNeedsType { span }
            | EmptyMapNeedsType { span }
            | CannotInfer { span, .. }
            | DuplicateDefinition { span, .. }
            | DuplicateVariant { span, .. }
            | EnumWithoutVariants { span }
            | DuplicateCase { span, .. }
            | IncompleteMatch { span, .. }
            | BoolCatchAll { span }
            | CatchAllRequired { span, .. }
            | UnknownVariant { span, .. }
            | InvalidPattern { span, .. }
            | CannotMatch { span, .. }
            | MissingField { span, .. }
            | UnknownField { span, .. }
            | DuplicateField { span, .. }
            | NotAStruct { span, .. }
            | MutatingMethodOnImmutable { span, .. }
            | MutParamNeedsMutable { span, .. }
            | SelfOutsideImpl { span }
            | TryOutsideFunction { span }
            | TryNotResult { span, .. }
            | TryReturnNotResult { span, .. }
            | ReturnOutsideFunction { span }
            | UnknownModule { span, .. }
            | ModuleHasErrors { span, .. }
            | CircularImport { span, .. }
            | DuplicateAlias { span, .. }
            | NotStringable { span, .. }
            | FiberArgument { span }
            | MissingLoopBinding { span }
            | ExtraLoopBinding { span }
            | RangeBounds { span, .. }
            | NotIterable { span, .. }
            | ImplTargetNotStruct { span, .. }
            | InvalidAssignTarget { span }
            | TopLevelOnly { span, .. } => *span,
        }
    }

    /// Warnings are surfaced but non-blocking.
    pub fn severity(&self) -> Severity {
        match self {
            TypeError::DuplicateAlias { .. } => Severity::Warn,
            _ => Severity::Error,
        }
    }

    /// The flat diagnostic for this error.
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic {
            kind: self.severity(),
            message: self.to_string(),
            range: self.span(),
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TypeError::*;
        match self {
            Mismatch { expected, found, .. } => {
                write!(f, "Type mismatch: Expected {expected}, got {found}")
            }
            ImmutableVariable { name, .. } => write!(f, "Immutable variable: {name}"),
            ImmutableProperty { path, .. } => write!(f, "Immutable property: {path}"),
            UndefinedVariable { name, .. } => write!(f, "Undefined variable: {name}"),
            Undefined { path, .. } => write!(f, "Undefined: {path}"),
            UnknownType { name, .. } => write!(f, "Unknown type: {name}"),
            NotAFunction { name, .. } => write!(f, "Not a function: {name}"),
            ArityMismatch { expected, found, .. } => {
                write!(f, "Expected {expected} arguments, got {found}")
            }
            TypeArityMismatch { expected, found, .. } => {
                write!(f, "Expected {expected} type arguments, got {found}")
            }
            InvalidOperands { op, lhs, rhs, .. } => {
                write!(f, "Invalid operands for '{op}': {lhs} and {rhs}")
            }
            InvalidOperand { op, found, .. } => {
                write!(f, "Invalid operand for '{op}': {found}")
            }
            NotComparable { found, .. } => {
                write!(f, "Cannot compare values of type {found}")
            }
            IfCondition { .. } => write!(f, "If conditions must be boolean expressions"),
            WhileCondition { .. } => write!(f, "While conditions must be boolean expressions"),
            ForCondition { .. } => write!(f, "For conditions must be boolean expressions"),
            MatchCondition { .. } => write!(f, "Match conditions must be boolean expressions"),
            BranchMismatch { .. } => write!(f, "All branches must have the same result type"),
            EmptyListNeedsType { .. } => write!(f, "Empty list needs an explicit type"),
            EmptyMapNeedsType { .. } => write!(f, "Empty map needs an explicit type"),
            CannotInfer { name, .. } => {
                write!(f, "Cannot infer generic type {name}; needs an explicit type")
            }
            DuplicateDefinition { name, .. } => write!(f, "Duplicate definition: {name}"),
            DuplicateVariant { name, .. } => write!(f, "Duplicate variant: {name}"),
            EnumWithoutVariants { .. } => write!(f, "An enum must have at least one variant"),
            DuplicateCase { case, .. } => write!(f, "Duplicate case: {case}"),
            IncompleteMatch { missing, .. } => {
                write!(f, "Incomplete match: missing case for '{missing}'")
            }
            BoolCatchAll { .. } => {
                write!(f, "Catch-all case is not allowed for boolean matches")
            }
            CatchAllRequired { subject, .. } => {
                write!(f, "{subject} matches require a catch-all case")
            }
            UnknownVariant { path, .. } => write!(f, "Unknown variant: {path}"),
            InvalidPattern { subject, .. } => {
                write!(f, "Invalid pattern for a match on {subject}")
            }
            CannotMatch { found, .. } => write!(f, "Cannot match on a value of type {found}"),
            MissingField { struct_name, field, .. } => {
                write!(f, "Missing field: {struct_name}.{field}")
            }
            UnknownField { struct_name, field, .. } => {
                write!(f, "Unknown field: {struct_name}.{field}")
            }
            DuplicateField { field, .. } => write!(f, "Duplicate field: {field}"),
            NotAStruct { name, .. } => write!(f, "Not a struct: {name}"),
            MutatingMethodOnImmutable { method, binding, .. } => {
                write!(f, "Cannot call mutating method '{method}' on immutable binding: {binding}")
            }
            MutParamNeedsMutable { param, .. } => {
                write!(f, "Cannot pass an immutable value as mutable parameter: {param}")
            }
            SelfOutsideImpl { .. } => write!(f, "Cannot use '@' outside of an impl block"),
            TryOutsideFunction { .. } => write!(f, "Cannot use 'try' outside of a function"),
            TryNotResult { found, .. } => {
                write!(f, "'try' requires a Result value, got {found}")
            }
            TryReturnNotResult { ret, .. } => {
                write!(
                    f,
                    "'try' requires the enclosing function to return a Result, found {ret}"
                )
            }
            ReturnOutsideFunction { .. } => {
                write!(f, "Cannot use 'return' outside of a function")
            }
            UnknownModule { path, .. } => write!(f, "Unknown module: {path}"),
            ModuleHasErrors { path, errors, .. } => {
                write!(f, "Module has errors: {path} ({errors})")
            }
            CircularImport { chain, .. } => write!(f, "Circular import: {chain}"),
            DuplicateAlias { alias, .. } => write!(f, "Duplicate import alias: {alias}"),
            NotStringable { found, .. } => write!(f, "Cannot convert {found} to Str"),
            FiberArgument { .. } => {
                write!(
                    f,
                    "async::start requires an anonymous function or a module function reference"
                )
            }
            MissingLoopBinding { .. } => {
                write!(f, "Map iteration requires two loop bindings")
            }
            ExtraLoopBinding { .. } => write!(f, "Unexpected second loop binding"),
            RangeBounds { found, .. } => {
                write!(f, "Range bounds must be Int or Float, got {found}")
            }
            NotIterable { found, .. } => write!(f, "Cannot iterate over a value of type {found}"),
            ImplTargetNotStruct { name, .. } => {
                write!(f, "Impl blocks may only target structs: {name}")
            }
            InvalidAssignTarget { .. } => write!(f, "Invalid assignment target"),
            TopLevelOnly { what, .. } => {
                write!(f, "{what} definitions are only allowed at the top level")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatch_message_is_fixed() {
        let err = TypeError::Mismatch {
            expected: Type::Int,
            found: Type::Str,
            span: Span::new(0, 1),
        };
        assert_eq!(err.to_string(), "Type mismatch: Expected Int, got Str");
        assert_eq!(err.severity(), Severity::Error);
    }

    #[test]
    fn incomplete_match_quotes_the_case() {
        let err = TypeError::IncompleteMatch {
            missing: "Dir::left".into(),
            span: Span::new(0, 1),
        };
        assert_eq!(
            err.to_string(),
            "Incomplete match: missing case for 'Dir::left'"
        );
    }

    #[test]
    fn duplicate_alias_is_a_warning() {
        let err = TypeError::DuplicateAlias { alias: "io".into(), span: Span::new(0, 2) };
        assert_eq!(err.severity(), Severity::Warn);
        let diag = err.to_diagnostic();
        assert_eq!(diag.kind, Severity::Warn);
        assert_eq!(diag.message, "Duplicate import alias: io");
        assert_eq!(diag.range, Span::new(0, 2));
    }
}
