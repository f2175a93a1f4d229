//! Match analysis and lowering.
//!
//! For every `match` the analyzer picks a lowering from the subject's type,
//! checks the arms against that form (exhaustiveness, duplicates, pattern
//! shape), and emits one specialized [`MatchNode`] per subject shape. All
//! arms must produce the same result type; that type is the match
//! expression's type.

use ard_common::Span;
use ard_parser::ast::{self, PatternKind};
use rustc_hash::FxHashSet;

use crate::check::Checker;
use crate::error::TypeError;
use crate::scope::Symbol;
use crate::ty::Type;
use crate::typed::{
    BoolMatch, ConditionalMatch, EnumMatch, IntMatch, MatchNode, OptionMatch, ResultMatch,
    TypedExpr, TypedExprKind, UnionMatch,
};

impl Checker {
    pub(crate) fn check_match(
        &mut self,
        m: &ast::MatchExpr,
        expected: Option<&Type>,
        span: Span,
    ) -> TypedExpr {
        let mut result_ty: Option<Type> = None;
        let node = match &m.subject {
            None => self.conditional_match(m, expected, &mut result_ty, span),
            Some(subject) => {
                let typed_subject = self.check_expr(subject, None);
                let subject_ty = self.unifier.resolve(&typed_subject.ty);
                match subject_ty {
                    Type::Bool => {
                        self.bool_match(m, typed_subject, expected, &mut result_ty, span)
                    }
                    Type::Enum(_) => {
                        self.enum_match(m, typed_subject, expected, &mut result_ty, span)
                    }
                    Type::Int => self.int_match(m, typed_subject, expected, &mut result_ty, span),
                    Type::Maybe(inner) => {
                        self.option_match(m, typed_subject, &inner, expected, &mut result_ty, span)
                    }
                    Type::Result(value, error) => self.result_match(
                        m,
                        typed_subject,
                        &value,
                        &error,
                        expected,
                        &mut result_ty,
                        span,
                    ),
                    Type::Union(_) => {
                        self.union_match(m, typed_subject, expected, &mut result_ty, span)
                    }
                    Type::Dynamic => return self.poisoned(span),
                    other => {
                        self.error(TypeError::CannotMatch { found: other, span: subject.span });
                        return self.poisoned(span);
                    }
                }
            }
        };
        let ty = result_ty.unwrap_or(Type::Void);
        match node {
            Some(node) => self.typed(TypedExprKind::Match(Box::new(node)), ty, span),
            None => self.poisoned(span),
        }
    }

    /// Check one arm body in its own scope, with an optional payload
    /// binding, and fold its type into the match result type.
    fn arm_body(
        &mut self,
        body: &ast::Expr,
        binding: Option<(&str, &Type)>,
        expected: Option<&Type>,
        result_ty: &mut Option<Type>,
    ) -> TypedExpr {
        self.scopes.enter_block();
        if let Some((name, ty)) = binding {
            let _ = self.scopes.declare(Symbol::variable(name, ty.clone(), false));
        }
        let expected_owned: Option<Type> = expected.cloned().or_else(|| result_ty.clone());
        let typed = self.check_expr(body, expected_owned.as_ref());
        self.scopes.exit();
        match result_ty {
            Some(prev) => {
                let prev = prev.clone();
                if self.unifier.unify(&prev, &typed.ty).is_err() {
                    self.error(TypeError::BranchMismatch { span: body.span });
                }
            }
            None => *result_ty = Some(self.unifier.resolve(&typed.ty)),
        }
        typed
    }

    // ── Lowerings ──────────────────────────────────────────────────────

    fn bool_match(
        &mut self,
        m: &ast::MatchExpr,
        subject: TypedExpr,
        expected: Option<&Type>,
        result_ty: &mut Option<Type>,
        span: Span,
    ) -> Option<MatchNode> {
        let mut true_body: Option<TypedExpr> = None;
        let mut false_body: Option<TypedExpr> = None;
        for arm in &m.arms {
            match &arm.pattern.kind {
                PatternKind::Bool(value) => {
                    let slot = if *value { &mut true_body } else { &mut false_body };
                    if slot.is_some() {
                        self.error(TypeError::DuplicateCase {
                            case: value.to_string(),
                            span: arm.pattern.span,
                        });
                        continue;
                    }
                    *slot = Some(self.arm_body(&arm.body, None, expected, result_ty));
                }
                PatternKind::Wildcard => {
                    self.error(TypeError::BoolCatchAll { span: arm.pattern.span });
                    self.arm_body(&arm.body, None, expected, result_ty);
                }
                _ => {
                    self.error(TypeError::InvalidPattern {
                        subject: Type::Bool,
                        span: arm.pattern.span,
                    });
                }
            }
        }
        if true_body.is_none() {
            self.error(TypeError::IncompleteMatch { missing: "true".into(), span });
        }
        if false_body.is_none() {
            self.error(TypeError::IncompleteMatch { missing: "false".into(), span });
        }
        let true_body = true_body.unwrap_or_else(|| self.poisoned(span));
        let false_body = false_body.unwrap_or_else(|| self.poisoned(span));
        Some(MatchNode::Bool(BoolMatch {
            subject,
            true_body: Box::new(true_body),
            false_body: Box::new(false_body),
        }))
    }

    fn enum_match(
        &mut self,
        m: &ast::MatchExpr,
        subject: TypedExpr,
        expected: Option<&Type>,
        result_ty: &mut Option<Type>,
        span: Span,
    ) -> Option<MatchNode> {
        let Type::Enum(enum_ty) = self.unifier.resolve(&subject.ty) else {
            return None;
        };
        let mut cases: Vec<(usize, TypedExpr)> = Vec::new();
        let mut catchall: Option<TypedExpr> = None;
        for arm in &m.arms {
            match &arm.pattern.kind {
                PatternKind::Path { base, member } => {
                    if *base != enum_ty.name {
                        self.error(TypeError::InvalidPattern {
                            subject: Type::Enum(enum_ty.clone()),
                            span: arm.pattern.span,
                        });
                        continue;
                    }
                    let Some(index) = enum_ty.variant_index(member) else {
                        self.error(TypeError::UnknownVariant {
                            path: format!("{base}::{member}"),
                            span: arm.pattern.span,
                        });
                        continue;
                    };
                    if cases.iter().any(|(i, _)| *i == index) {
                        self.error(TypeError::DuplicateCase {
                            case: format!("{base}::{member}"),
                            span: arm.pattern.span,
                        });
                        continue;
                    }
                    let body = self.arm_body(&arm.body, None, expected, result_ty);
                    cases.push((index, body));
                }
                PatternKind::Wildcard => {
                    if catchall.is_some() {
                        self.error(TypeError::DuplicateCase {
                            case: "_".into(),
                            span: arm.pattern.span,
                        });
                        continue;
                    }
                    catchall = Some(self.arm_body(&arm.body, None, expected, result_ty));
                }
                _ => {
                    self.error(TypeError::InvalidPattern {
                        subject: Type::Enum(enum_ty.clone()),
                        span: arm.pattern.span,
                    });
                }
            }
        }
        if catchall.is_none() {
            for (index, variant) in enum_ty.variants.iter().enumerate() {
                if !cases.iter().any(|(i, _)| *i == index) {
                    self.error(TypeError::IncompleteMatch {
                        missing: format!("{}::{variant}", enum_ty.name),
                        span,
                    });
                }
            }
        }
        Some(MatchNode::Enum(EnumMatch {
            subject,
            cases,
            catchall: catchall.map(Box::new),
        }))
    }

    fn int_match(
        &mut self,
        m: &ast::MatchExpr,
        subject: TypedExpr,
        expected: Option<&Type>,
        result_ty: &mut Option<Type>,
        span: Span,
    ) -> Option<MatchNode> {
        let mut cases: Vec<(i64, TypedExpr)> = Vec::new();
        let mut ranges: Vec<(i64, i64, TypedExpr)> = Vec::new();
        let mut catchall: Option<TypedExpr> = None;
        for arm in &m.arms {
            match &arm.pattern.kind {
                PatternKind::Int(value) => {
                    if cases.iter().any(|(v, _)| v == value) {
                        self.error(TypeError::DuplicateCase {
                            case: value.to_string(),
                            span: arm.pattern.span,
                        });
                        continue;
                    }
                    let body = self.arm_body(&arm.body, None, expected, result_ty);
                    cases.push((*value, body));
                }
                PatternKind::Range { start, end } => {
                    let body = self.arm_body(&arm.body, None, expected, result_ty);
                    ranges.push((*start, *end, body));
                }
                PatternKind::Wildcard => {
                    if catchall.is_some() {
                        self.error(TypeError::DuplicateCase {
                            case: "_".into(),
                            span: arm.pattern.span,
                        });
                        continue;
                    }
                    catchall = Some(self.arm_body(&arm.body, None, expected, result_ty));
                }
                _ => {
                    self.error(TypeError::InvalidPattern {
                        subject: Type::Int,
                        span: arm.pattern.span,
                    });
                }
            }
        }
        let catchall = match catchall {
            Some(c) => c,
            None => {
                // Exhaustiveness over Int is impossible.
                self.error(TypeError::CatchAllRequired { subject: "Integer", span });
                self.poisoned(span)
            }
        };
        Some(MatchNode::Int(IntMatch {
            subject,
            cases,
            ranges,
            catchall: Box::new(catchall),
        }))
    }

    fn option_match(
        &mut self,
        m: &ast::MatchExpr,
        subject: TypedExpr,
        inner: &Type,
        expected: Option<&Type>,
        result_ty: &mut Option<Type>,
        span: Span,
    ) -> Option<MatchNode> {
        let mut some_arm: Option<(String, TypedExpr)> = None;
        let mut none_body: Option<TypedExpr> = None;
        for arm in &m.arms {
            match &arm.pattern.kind {
                PatternKind::Name(name) if name != "none" => {
                    if some_arm.is_some() {
                        self.error(TypeError::DuplicateCase {
                            case: "some".into(),
                            span: arm.pattern.span,
                        });
                        continue;
                    }
                    let body = self.arm_body(&arm.body, Some((name, inner)), expected, result_ty);
                    some_arm = Some((name.clone(), body));
                }
                PatternKind::Wildcard | PatternKind::Name(_) => {
                    if none_body.is_some() {
                        self.error(TypeError::DuplicateCase {
                            case: "none".into(),
                            span: arm.pattern.span,
                        });
                        continue;
                    }
                    none_body = Some(self.arm_body(&arm.body, None, expected, result_ty));
                }
                _ => {
                    self.error(TypeError::InvalidPattern {
                        subject: Type::maybe(inner.clone()),
                        span: arm.pattern.span,
                    });
                }
            }
        }
        if some_arm.is_none() {
            self.error(TypeError::IncompleteMatch { missing: "some".into(), span });
        }
        if none_body.is_none() {
            self.error(TypeError::IncompleteMatch { missing: "none".into(), span });
        }
        let (binding, some_body) =
            some_arm.unwrap_or_else(|| ("_".to_string(), self.poisoned(span)));
        let none_body = none_body.unwrap_or_else(|| self.poisoned(span));
        Some(MatchNode::Option(OptionMatch {
            subject,
            binding,
            some_body: Box::new(some_body),
            none_body: Box::new(none_body),
        }))
    }

    #[allow(clippy::too_many_arguments)]
    fn result_match(
        &mut self,
        m: &ast::MatchExpr,
        subject: TypedExpr,
        value: &Type,
        error: &Type,
        expected: Option<&Type>,
        result_ty: &mut Option<Type>,
        span: Span,
    ) -> Option<MatchNode> {
        let mut ok_arm: Option<(String, TypedExpr)> = None;
        let mut err_arm: Option<(String, TypedExpr)> = None;
        for arm in &m.arms {
            match &arm.pattern.kind {
                PatternKind::Ctor { name, binding } if name == "ok" => {
                    if ok_arm.is_some() {
                        self.error(TypeError::DuplicateCase {
                            case: "ok".into(),
                            span: arm.pattern.span,
                        });
                        continue;
                    }
                    let body =
                        self.arm_body(&arm.body, Some((binding, value)), expected, result_ty);
                    ok_arm = Some((binding.clone(), body));
                }
                PatternKind::Ctor { name, binding } if name == "err" => {
                    if err_arm.is_some() {
                        self.error(TypeError::DuplicateCase {
                            case: "err".into(),
                            span: arm.pattern.span,
                        });
                        continue;
                    }
                    let body =
                        self.arm_body(&arm.body, Some((binding, error)), expected, result_ty);
                    err_arm = Some((binding.clone(), body));
                }
                _ => {
                    self.error(TypeError::InvalidPattern {
                        subject: Type::result(value.clone(), error.clone()),
                        span: arm.pattern.span,
                    });
                }
            }
        }
        if ok_arm.is_none() {
            self.error(TypeError::IncompleteMatch { missing: "ok".into(), span });
        }
        if err_arm.is_none() {
            self.error(TypeError::IncompleteMatch { missing: "err".into(), span });
        }
        let (ok_binding, ok_body) =
            ok_arm.unwrap_or_else(|| ("_".to_string(), self.poisoned(span)));
        let (err_binding, err_body) =
            err_arm.unwrap_or_else(|| ("_".to_string(), self.poisoned(span)));
        Some(MatchNode::Result(ResultMatch {
            subject,
            ok_binding,
            ok_body: Box::new(ok_body),
            err_binding,
            err_body: Box::new(err_body),
        }))
    }

    fn union_match(
        &mut self,
        m: &ast::MatchExpr,
        subject: TypedExpr,
        expected: Option<&Type>,
        result_ty: &mut Option<Type>,
        span: Span,
    ) -> Option<MatchNode> {
        let Type::Union(union_ty) = self.unifier.resolve(&subject.ty) else {
            return None;
        };
        let members = union_ty.members.borrow().clone();
        let mut cases: Vec<(Type, TypedExpr)> = Vec::new();
        let mut covered: FxHashSet<String> = FxHashSet::default();
        let mut catchall: Option<TypedExpr> = None;
        for arm in &m.arms {
            match &arm.pattern.kind {
                PatternKind::Name(name) => {
                    let Some(member) = members.iter().find(|t| t.to_string() == *name) else {
                        self.error(TypeError::InvalidPattern {
                            subject: Type::Union(union_ty.clone()),
                            span: arm.pattern.span,
                        });
                        continue;
                    };
                    if !covered.insert(name.clone()) {
                        self.error(TypeError::DuplicateCase {
                            case: name.clone(),
                            span: arm.pattern.span,
                        });
                        continue;
                    }
                    let body = self.arm_body(&arm.body, None, expected, result_ty);
                    cases.push((member.clone(), body));
                }
                PatternKind::Wildcard => {
                    if catchall.is_some() {
                        self.error(TypeError::DuplicateCase {
                            case: "_".into(),
                            span: arm.pattern.span,
                        });
                        continue;
                    }
                    catchall = Some(self.arm_body(&arm.body, None, expected, result_ty));
                }
                _ => {
                    self.error(TypeError::InvalidPattern {
                        subject: Type::Union(union_ty.clone()),
                        span: arm.pattern.span,
                    });
                }
            }
        }
        if catchall.is_none() {
            for member in &members {
                if !covered.contains(&member.to_string()) {
                    self.error(TypeError::IncompleteMatch {
                        missing: member.to_string(),
                        span,
                    });
                }
            }
        }
        Some(MatchNode::Union(UnionMatch {
            subject,
            cases,
            catchall: catchall.map(Box::new),
        }))
    }

    fn conditional_match(
        &mut self,
        m: &ast::MatchExpr,
        expected: Option<&Type>,
        result_ty: &mut Option<Type>,
        span: Span,
    ) -> Option<MatchNode> {
        let mut cases: Vec<(TypedExpr, TypedExpr)> = Vec::new();
        let mut catchall: Option<TypedExpr> = None;
        for arm in &m.arms {
            match &arm.pattern.kind {
                PatternKind::Cond(cond) => {
                    let typed_cond = self.check_expr(cond, Some(&Type::Bool));
                    let cond_ty = self.unifier.resolve(&typed_cond.ty);
                    if cond_ty != Type::Bool && cond_ty != Type::Dynamic {
                        self.error(TypeError::MatchCondition { span: cond.span });
                    }
                    let body = self.arm_body(&arm.body, None, expected, result_ty);
                    cases.push((typed_cond, body));
                }
                PatternKind::Wildcard => {
                    if catchall.is_some() {
                        self.error(TypeError::DuplicateCase {
                            case: "_".into(),
                            span: arm.pattern.span,
                        });
                        continue;
                    }
                    catchall = Some(self.arm_body(&arm.body, None, expected, result_ty));
                }
                _ => {
                    self.error(TypeError::InvalidPattern {
                        subject: Type::Bool,
                        span: arm.pattern.span,
                    });
                }
            }
        }
        let catchall = match catchall {
            Some(c) => c,
            None => {
                self.error(TypeError::CatchAllRequired { subject: "Conditional", span });
                self.poisoned(span)
            }
        };
        Some(MatchNode::Conditional(ConditionalMatch {
            cases,
            catchall: Box::new(catchall),
        }))
    }
}
