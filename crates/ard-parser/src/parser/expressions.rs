//! Pratt expression parsing for Ard.

use ard_common::Span;
use ard_lexer::{Segment, Token, TokenKind};

use crate::ast::*;

use super::Parser;

/// Binding power for an infix operator token. Higher binds tighter.
fn infix_power(kind: TokenKind) -> Option<(BinaryOp, u8)> {
    let entry = match kind {
        TokenKind::Or => (BinaryOp::Or, 1),
        TokenKind::And => (BinaryOp::And, 2),
        TokenKind::EqEq => (BinaryOp::Eq, 3),
        TokenKind::NotEq => (BinaryOp::NotEq, 3),
        TokenKind::Lt => (BinaryOp::Lt, 4),
        TokenKind::LtEq => (BinaryOp::LtEq, 4),
        TokenKind::Gt => (BinaryOp::Gt, 4),
        TokenKind::GtEq => (BinaryOp::GtEq, 4),
        TokenKind::Plus => (BinaryOp::Add, 5),
        TokenKind::Minus => (BinaryOp::Sub, 5),
        TokenKind::Star => (BinaryOp::Mul, 6),
        TokenKind::Slash => (BinaryOp::Div, 6),
        TokenKind::Percent => (BinaryOp::Rem, 6),
        _ => return None,
    };
    Some(entry)
}

impl<'src> Parser<'src> {
    pub(crate) fn expr(&mut self) -> Option<Expr> {
        self.binary(0)
    }

    /// Parse an expression with struct literals disabled, for positions
    /// followed by a block (`if`/`while` conditions, `match` subjects,
    /// `for` iterables).
    pub(crate) fn expr_no_struct(&mut self) -> Option<Expr> {
        let saved = self.no_struct;
        self.no_struct = true;
        let result = self.binary(0);
        self.no_struct = saved;
        result
    }

    fn binary(&mut self, min_power: u8) -> Option<Expr> {
        let mut lhs = self.unary()?;
        while let Some((op, power)) = infix_power(self.kind()) {
            if power < min_power {
                break;
            }
            let op_span = self.bump().span;
            let rhs = self.binary(power + 1)?;
            let span = lhs.span.to(rhs.span);
            lhs = Expr::new(
                ExprKind::Binary {
                    op,
                    op_span,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            );
        }
        Some(lhs)
    }

    fn unary(&mut self) -> Option<Expr> {
        match self.kind() {
            TokenKind::Minus => {
                let start = self.bump().span;
                let operand = self.unary()?;
                let span = start.to(operand.span);
                Some(Expr::new(
                    ExprKind::Unary { op: UnaryOp::Neg, operand: Box::new(operand) },
                    span,
                ))
            }
            TokenKind::Not => {
                let start = self.bump().span;
                let operand = self.unary()?;
                let span = start.to(operand.span);
                Some(Expr::new(
                    ExprKind::Unary { op: UnaryOp::Not, operand: Box::new(operand) },
                    span,
                ))
            }
            TokenKind::Try => self.try_expr(),
            _ => self.postfix(),
        }
    }

    fn try_expr(&mut self) -> Option<Expr> {
        let start = self.bump().span; // try
        let operand = self.postfix()?;
        let mut span = start.to(operand.span);
        let catch = if self.eat(TokenKind::Arrow) {
            let (name, name_span) = self.ident()?;
            let body = self.block()?;
            span = span.to(body.span);
            Some(CatchArm { name, name_span, body })
        } else {
            None
        };
        Some(Expr::new(ExprKind::Try { operand: Box::new(operand), catch }, span))
    }

    fn postfix(&mut self) -> Option<Expr> {
        let mut expr = self.primary()?;
        loop {
            match self.kind() {
                TokenKind::Dot => {
                    self.bump();
                    let (name, name_span) = self.ident()?;
                    let span = expr.span.to(name_span);
                    expr = Expr::new(
                        ExprKind::Property { object: Box::new(expr), name, name_span },
                        span,
                    );
                }
                TokenKind::LParen => {
                    let (args, end) = self.call_args()?;
                    let span = expr.span.to(end);
                    expr = Expr::new(
                        ExprKind::Call {
                            callee: Box::new(expr),
                            type_args: Vec::new(),
                            args,
                        },
                        span,
                    );
                }
                TokenKind::Lt
                    if matches!(expr.kind, ExprKind::Ident(_) | ExprKind::StaticAccess { .. }) =>
                {
                    // Explicit type arguments: `name<T1, T2>(args)`. Only
                    // committed to when a full `<...>(` parses; otherwise this
                    // is a comparison and we back out.
                    match self.try_type_args() {
                        Some(type_args) => {
                            let (args, end) = self.call_args()?;
                            let span = expr.span.to(end);
                            expr = Expr::new(
                                ExprKind::Call { callee: Box::new(expr), type_args, args },
                                span,
                            );
                        }
                        None => break,
                    }
                }
                _ => break,
            }
        }
        Some(expr)
    }

    /// Attempt `<T1, T2>` immediately followed by `(`. Restores the cursor
    /// and reports nothing when the tokens do not fit.
    fn try_type_args(&mut self) -> Option<Vec<TypeExpr>> {
        let saved_pos = self.pos;
        let saved_errors = self.errors.len();
        self.bump(); // <
        let mut type_args = Vec::new();
        let ok = loop {
            match self.type_expr() {
                Some(ty) => type_args.push(ty),
                None => break false,
            }
            if self.eat(TokenKind::Comma) {
                continue;
            }
            break self.eat(TokenKind::Gt) && self.at(TokenKind::LParen);
        };
        if ok {
            Some(type_args)
        } else {
            self.pos = saved_pos;
            self.errors.truncate(saved_errors);
            None
        }
    }

    fn call_args(&mut self) -> Option<(Vec<Expr>, Span)> {
        self.expect(TokenKind::LParen)?;
        self.skip_newlines();
        let saved = self.no_struct;
        self.no_struct = false;
        let result = (|| {
            let mut args = Vec::new();
            while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
                args.push(self.expr()?);
                self.skip_newlines();
                if !self.eat(TokenKind::Comma) {
                    break;
                }
                self.skip_newlines();
            }
            let end = self.expect(TokenKind::RParen)?.span;
            Some((args, end))
        })();
        self.no_struct = saved;
        result
    }

    fn primary(&mut self) -> Option<Expr> {
        match self.kind() {
            TokenKind::Int => {
                let token = self.bump();
                let value = self.int_value(token)?;
                Some(Expr::new(ExprKind::Int(value), token.span))
            }
            TokenKind::Float => {
                let token = self.bump();
                let text = self.text(token);
                match text.parse::<f64>() {
                    Ok(value) => Some(Expr::new(ExprKind::Float(value), token.span)),
                    Err(_) => {
                        self.error(format!("invalid float literal: {text}"), token.span);
                        None
                    }
                }
            }
            TokenKind::True => {
                let span = self.bump().span;
                Some(Expr::new(ExprKind::Bool(true), span))
            }
            TokenKind::False => {
                let span = self.bump().span;
                Some(Expr::new(ExprKind::Bool(false), span))
            }
            TokenKind::Str => self.string(),
            TokenKind::Ident => self.name_or_struct_lit(),
            TokenKind::At => {
                let start = self.bump().span;
                let (name, name_span) = self.ident()?;
                Some(Expr::new(ExprKind::SelfField(name), start.to(name_span)))
            }
            TokenKind::LParen => {
                self.bump();
                self.skip_newlines();
                let saved = self.no_struct;
                self.no_struct = false;
                let inner = self.expr();
                self.no_struct = saved;
                let inner = inner?;
                self.skip_newlines();
                self.expect(TokenKind::RParen)?;
                Some(inner)
            }
            TokenKind::LBracket => self.list_or_map(),
            TokenKind::If => self.if_expr(),
            TokenKind::Match => self.match_expr(),
            TokenKind::Fn => self.fn_expr(),
            _ => {
                let found = self.current();
                self.error(
                    format!("expected an expression, found {}", found.kind),
                    found.span,
                );
                None
            }
        }
    }

    fn int_value(&mut self, token: Token) -> Option<i64> {
        let text = self.text(token);
        match text.parse::<i64>() {
            Ok(value) => Some(value),
            Err(_) => {
                self.error(format!("integer literal out of range: {text}"), token.span);
                None
            }
        }
    }

    fn name_or_struct_lit(&mut self) -> Option<Expr> {
        let token = self.bump();
        let name = self.text(token).to_string();
        if self.at(TokenKind::ColonColon) {
            self.bump();
            let (member, member_span) = self.ident()?;
            return Some(Expr::new(
                ExprKind::StaticAccess {
                    base: name,
                    base_span: token.span,
                    member,
                    member_span,
                },
                token.span.to(member_span),
            ));
        }
        if self.at(TokenKind::LBrace) && !self.no_struct && self.brace_is_struct_lit() {
            return self.struct_lit(name, token.span);
        }
        Some(Expr::new(ExprKind::Ident(name), token.span))
    }

    /// Whether the `{` at the cursor opens a struct literal: the next
    /// meaningful tokens are `field:` or an immediate `}`.
    fn brace_is_struct_lit(&self) -> bool {
        let mut n = 1;
        while self.nth_kind(n) == TokenKind::Newline {
            n += 1;
        }
        match self.nth_kind(n) {
            TokenKind::RBrace => true,
            TokenKind::Ident => self.nth_kind(n + 1) == TokenKind::Colon,
            _ => false,
        }
    }

    fn struct_lit(&mut self, name: String, name_span: Span) -> Option<Expr> {
        self.expect(TokenKind::LBrace)?;
        self.skip_newlines();
        let mut fields = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            let (field, field_span) = self.ident()?;
            self.expect(TokenKind::Colon)?;
            let saved = self.no_struct;
            self.no_struct = false;
            let value = self.expr();
            self.no_struct = saved;
            fields.push(StructLitField {
                name: field,
                name_span: field_span,
                value: value?,
            });
            self.eat(TokenKind::Comma);
            self.skip_newlines();
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        Some(Expr::new(
            ExprKind::StructLit { name, name_span, fields },
            name_span.to(end),
        ))
    }

    fn list_or_map(&mut self) -> Option<Expr> {
        let open = self.bump().span; // [
        self.skip_newlines();
        // `[:]` is the empty map.
        if self.at(TokenKind::Colon) {
            self.bump();
            let close = self.expect(TokenKind::RBracket)?.span;
            return Some(Expr::new(ExprKind::Map(Vec::new()), open.to(close)));
        }
        if self.at(TokenKind::RBracket) {
            let close = self.bump().span;
            return Some(Expr::new(ExprKind::List(Vec::new()), open.to(close)));
        }
        let saved = self.no_struct;
        self.no_struct = false;
        let result = self.list_or_map_body(open);
        self.no_struct = saved;
        result
    }

    fn list_or_map_body(&mut self, open: Span) -> Option<Expr> {
        let first = self.expr()?;
        if self.eat(TokenKind::Colon) {
            let value = self.expr()?;
            let mut entries = vec![(first, value)];
            self.skip_newlines();
            while self.eat(TokenKind::Comma) {
                self.skip_newlines();
                if self.at(TokenKind::RBracket) {
                    break;
                }
                let key = self.expr()?;
                self.expect(TokenKind::Colon)?;
                let value = self.expr()?;
                entries.push((key, value));
                self.skip_newlines();
            }
            let close = self.expect(TokenKind::RBracket)?.span;
            Some(Expr::new(ExprKind::Map(entries), open.to(close)))
        } else {
            let mut elements = vec![first];
            self.skip_newlines();
            while self.eat(TokenKind::Comma) {
                self.skip_newlines();
                if self.at(TokenKind::RBracket) {
                    break;
                }
                elements.push(self.expr()?);
                self.skip_newlines();
            }
            let close = self.expect(TokenKind::RBracket)?.span;
            Some(Expr::new(ExprKind::List(elements), open.to(close)))
        }
    }

    fn if_expr(&mut self) -> Option<Expr> {
        let start = self.bump().span; // if
        let cond = self.expr_no_struct()?;
        let then_block = self.block()?;
        let mut span = start.to(then_block.span);
        let else_branch = if self.eat(TokenKind::Else) {
            if self.at(TokenKind::If) {
                let nested = self.if_expr()?;
                span = span.to(nested.span);
                Some(Box::new(ElseBranch::If(nested)))
            } else {
                let block = self.block()?;
                span = span.to(block.span);
                Some(Box::new(ElseBranch::Block(block)))
            }
        } else {
            None
        };
        Some(Expr::new(
            ExprKind::If(IfExpr { cond: Box::new(cond), then_block, else_branch }),
            span,
        ))
    }

    fn match_expr(&mut self) -> Option<Expr> {
        let start = self.bump().span; // match
        let subject = if self.at(TokenKind::LBrace) {
            None
        } else {
            Some(Box::new(self.expr_no_struct()?))
        };
        self.expect(TokenKind::LBrace)?;
        self.skip_newlines();
        let mut arms = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            match self.match_arm(subject.is_none()) {
                Some(arm) => arms.push(arm),
                None => self.sync(),
            }
            self.eat(TokenKind::Comma);
            self.skip_newlines();
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        Some(Expr::new(
            ExprKind::Match(MatchExpr { subject, arms }),
            start.to(end),
        ))
    }

    fn match_arm(&mut self, conditional: bool) -> Option<MatchArm> {
        let pattern = self.pattern(conditional)?;
        self.expect(TokenKind::FatArrow)?;
        self.skip_newlines();
        let body = if self.at(TokenKind::LBrace) {
            let block = self.block()?;
            let span = block.span;
            Expr::new(ExprKind::Block(block), span)
        } else {
            self.expr()?
        };
        let span = pattern.span.to(body.span);
        Some(MatchArm { pattern, body, span })
    }

    fn pattern(&mut self, conditional: bool) -> Option<Pattern> {
        // `_` is the catch-all in both match forms.
        if self.at(TokenKind::Ident) && self.text(self.current()) == "_" {
            let span = self.bump().span;
            return Some(Pattern { kind: PatternKind::Wildcard, span });
        }
        if conditional {
            let cond = self.expr()?;
            let span = cond.span;
            return Some(Pattern { kind: PatternKind::Cond(Box::new(cond)), span });
        }
        match self.kind() {
            TokenKind::True => {
                let span = self.bump().span;
                Some(Pattern { kind: PatternKind::Bool(true), span })
            }
            TokenKind::False => {
                let span = self.bump().span;
                Some(Pattern { kind: PatternKind::Bool(false), span })
            }
            TokenKind::Int | TokenKind::Minus => {
                let (start_value, start_span) = self.pattern_int()?;
                if self.eat(TokenKind::DotDot) {
                    let (end_value, end_span) = self.pattern_int()?;
                    Some(Pattern {
                        kind: PatternKind::Range { start: start_value, end: end_value },
                        span: start_span.to(end_span),
                    })
                } else {
                    Some(Pattern { kind: PatternKind::Int(start_value), span: start_span })
                }
            }
            TokenKind::Ident => {
                let token = self.bump();
                let name = self.text(token).to_string();
                if self.eat(TokenKind::ColonColon) {
                    let (member, member_span) = self.ident()?;
                    return Some(Pattern {
                        kind: PatternKind::Path { base: name, member },
                        span: token.span.to(member_span),
                    });
                }
                if self.at(TokenKind::LParen) {
                    self.bump();
                    let (binding, _) = self.ident()?;
                    let close = self.expect(TokenKind::RParen)?.span;
                    return Some(Pattern {
                        kind: PatternKind::Ctor { name, binding },
                        span: token.span.to(close),
                    });
                }
                Some(Pattern { kind: PatternKind::Name(name), span: token.span })
            }
            _ => {
                let found = self.current();
                self.error(
                    format!("expected a match pattern, found {}", found.kind),
                    found.span,
                );
                None
            }
        }
    }

    fn pattern_int(&mut self) -> Option<(i64, Span)> {
        if self.at(TokenKind::Minus) {
            let start = self.bump().span;
            let token = self.expect(TokenKind::Int)?;
            let value = self.int_value(token)?;
            Some((-value, start.to(token.span)))
        } else {
            let token = self.expect(TokenKind::Int)?;
            let value = self.int_value(token)?;
            Some((value, token.span))
        }
    }

    fn fn_expr(&mut self) -> Option<Expr> {
        let start = self.bump().span; // fn
        let params = self.param_list()?;
        let ret = self.optional_return_type()?;
        let body = self.block()?;
        let span = start.to(body.span);
        Some(Expr::new(ExprKind::Func(FnExpr { params, ret, body }), span))
    }

    // ── String literals ────────────────────────────────────────────────

    fn string(&mut self) -> Option<Expr> {
        let token = self.bump();
        let raw = self.text(token);
        let mut parts = Vec::new();
        for segment in ard_lexer::string_segments(raw, token.span.start) {
            match segment {
                Segment::Text(text) => parts.push(StrPart::Text(text)),
                Segment::Interp(span) => {
                    if let Some(inner) = self.interpolated_expr(span) {
                        parts.push(StrPart::Expr(Box::new(inner)));
                    }
                }
            }
        }
        Some(Expr::new(ExprKind::Str(parts), token.span))
    }

    /// Parse the expression inside a `{...}` interpolation. The fragment is
    /// re-lexed and its token spans shifted so diagnostics point into the
    /// original string literal.
    fn interpolated_expr(&mut self, span: Span) -> Option<Expr> {
        let fragment = span.text(self.source);
        let (mut tokens, lex_errors) = ard_lexer::tokenize(fragment);
        for token in &mut tokens {
            token.span = Span::new(token.span.start + span.start, token.span.end + span.start);
        }
        for err in lex_errors {
            let at = err.span();
            let err_span = Span::new(at.start + span.start, at.end + span.start);
            self.error(err.to_string(), err_span);
        }
        let mut sub = Parser {
            source: self.source,
            tokens,
            pos: 0,
            errors: Vec::new(),
            no_struct: false,
        };
        let expr = sub.expr();
        if expr.is_some() && !sub.at(TokenKind::Eof) {
            sub.error("unexpected tokens after interpolated expression", sub.span());
        }
        self.errors.append(&mut sub.errors);
        expr
    }
}
