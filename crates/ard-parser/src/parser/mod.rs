//! Recursive-descent parser for Ard.
//!
//! Statements and declarations live here; expression parsing (a Pratt
//! climber) lives in [`expressions`]. The parser collects errors and keeps
//! going where it can; callers should not type-check a tree that parsed
//! with errors.

mod expressions;

use ard_common::Span;
use ard_lexer::{Token, TokenKind};

use crate::ast::*;
use crate::error::ParseError;

pub(crate) struct Parser<'src> {
    source: &'src str,
    tokens: Vec<Token>,
    pos: usize,
    pub(crate) errors: Vec<ParseError>,
    /// When set, an identifier followed by `{` is not a struct literal.
    /// Used for `if`/`while`/`for`/`match` headers, whose block would
    /// otherwise be swallowed.
    no_struct: bool,
}

/// Parse a full program out of a token stream.
pub(crate) fn parse_program(source: &str, tokens: Vec<Token>) -> (Program, Vec<ParseError>) {
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
        errors: Vec::new(),
        no_struct: false,
    };
    let program = parser.program();
    (program, parser.errors)
}

impl<'src> Parser<'src> {
    // ── Token plumbing ─────────────────────────────────────────────────

    fn current(&self) -> Token {
        self.tokens
            .get(self.pos)
            .copied()
            .unwrap_or_else(|| Token::new(TokenKind::Eof, Span::point(self.source.len() as u32)))
    }

    fn kind(&self) -> TokenKind {
        self.current().kind
    }

    fn nth_kind(&self, n: usize) -> TokenKind {
        self.tokens
            .get(self.pos + n)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::Eof)
    }

    fn span(&self) -> Span {
        self.current().span
    }

    fn bump(&mut self) -> Token {
        let token = self.current();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> Option<Token> {
        if self.at(kind) {
            Some(self.bump())
        } else {
            let found = self.current();
            self.error(format!("expected {kind}, found {}", found.kind), found.span);
            None
        }
    }

    fn error(&mut self, message: impl Into<String>, span: Span) {
        self.errors.push(ParseError::new(message, span));
    }

    fn text(&self, token: Token) -> &'src str {
        token.text(self.source)
    }

    fn skip_newlines(&mut self) {
        while self.at(TokenKind::Newline) {
            self.bump();
        }
    }

    /// Consume an identifier and return its text and span.
    fn ident(&mut self) -> Option<(String, Span)> {
        let token = self.expect(TokenKind::Ident)?;
        Some((self.text(token).to_string(), token.span))
    }

    /// Skip tokens until a likely statement boundary, for error recovery.
    fn sync(&mut self) {
        loop {
            match self.kind() {
                TokenKind::Newline | TokenKind::Eof | TokenKind::RBrace => break,
                _ => {
                    self.bump();
                }
            }
        }
    }

    // ── Program and statements ─────────────────────────────────────────

    fn program(&mut self) -> Program {
        let mut imports = Vec::new();
        let mut statements = Vec::new();
        self.skip_newlines();
        while !self.at(TokenKind::Eof) {
            if self.at(TokenKind::Use) {
                if let Some(import) = self.use_directive() {
                    imports.push(import);
                }
            } else {
                match self.stmt() {
                    Some(stmt) => statements.push(stmt),
                    None => {
                        // Recovery must always make progress, even when the
                        // offending token is itself a sync point.
                        let before = self.pos;
                        self.sync();
                        if self.pos == before {
                            self.bump();
                        }
                    }
                }
            }
            self.skip_newlines();
        }
        Program { imports, statements }
    }

    fn use_directive(&mut self) -> Option<Import> {
        let start = self.bump().span; // use
        let (first, mut end) = self.ident()?;
        let mut path = first;
        while self.eat(TokenKind::Slash) {
            let (segment, span) = self.ident()?;
            path.push('/');
            path.push_str(&segment);
            end = span;
        }
        let alias = if self.eat(TokenKind::As) {
            let (alias, span) = self.ident()?;
            end = span;
            Some(alias)
        } else {
            None
        };
        Some(Import { path, alias, span: start.to(end) })
    }

    pub(crate) fn stmt(&mut self) -> Option<Stmt> {
        match self.kind() {
            TokenKind::Let | TokenKind::Mut => self.let_stmt().map(Stmt::Let),
            TokenKind::Fn if self.nth_kind(1) == TokenKind::Ident => {
                self.fn_decl().map(Stmt::Fn)
            }
            TokenKind::Enum => self.enum_decl().map(Stmt::Enum),
            TokenKind::Struct => self.struct_decl().map(Stmt::Struct),
            TokenKind::Impl => self.impl_block().map(Stmt::Impl),
            TokenKind::Trait => self.trait_decl().map(Stmt::Trait),
            TokenKind::Union => self.union_decl().map(Stmt::Union),
            TokenKind::While => self.while_loop().map(Stmt::While),
            TokenKind::For => self.for_stmt(),
            TokenKind::Return => self.return_stmt().map(Stmt::Return),
            _ => self.expr_or_assign(),
        }
    }

    fn let_stmt(&mut self) -> Option<LetStmt> {
        let keyword = self.bump();
        let mutable = keyword.kind == TokenKind::Mut;
        let (name, name_span) = self.ident()?;
        let ty = if self.eat(TokenKind::Colon) {
            Some(self.type_expr()?)
        } else {
            None
        };
        self.expect(TokenKind::Eq)?;
        let value = self.expr()?;
        let span = keyword.span.to(value.span);
        Some(LetStmt { mutable, name, name_span, ty, value, span })
    }

    fn expr_or_assign(&mut self) -> Option<Stmt> {
        let target = self.expr()?;
        if self.at(TokenKind::Eq) {
            self.bump();
            let value = self.expr()?;
            let span = target.span.to(value.span);
            return Some(Stmt::Assign(AssignStmt { target, value, span }));
        }
        Some(Stmt::Expr(target))
    }

    fn fn_decl(&mut self) -> Option<FnDecl> {
        let start = self.bump().span; // fn
        let mutates = self.eat(TokenKind::Mut);
        let (name, name_span) = self.ident()?;
        let generics = self.generic_params()?;
        let params = self.param_list()?;
        let ret = self.optional_return_type()?;
        let body = self.block()?;
        let span = start.to(body.span);
        Some(FnDecl { name, name_span, generics, params, ret, body, mutates, span })
    }

    /// `<$T, $U>` after a function name, or nothing.
    fn generic_params(&mut self) -> Option<Vec<String>> {
        let mut generics = Vec::new();
        if self.eat(TokenKind::Lt) {
            loop {
                let token = self.expect(TokenKind::Generic)?;
                generics.push(self.text(token).to_string());
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::Gt)?;
        }
        Some(generics)
    }

    fn param_list(&mut self) -> Option<Vec<Param>> {
        self.expect(TokenKind::LParen)?;
        self.skip_newlines();
        let mut params = Vec::new();
        while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
            let mutable = self.eat(TokenKind::Mut);
            let (name, name_span) = self.ident()?;
            self.expect(TokenKind::Colon)?;
            let ty = self.type_expr()?;
            let span = name_span.to(ty.span);
            params.push(Param { mutable, name, ty, span });
            if !self.eat(TokenKind::Comma) {
                break;
            }
            self.skip_newlines();
        }
        self.expect(TokenKind::RParen)?;
        Some(params)
    }

    /// A return type annotation, present unless the body brace follows.
    fn optional_return_type(&mut self) -> Option<Option<TypeExpr>> {
        if self.at(TokenKind::LBrace) {
            Some(None)
        } else {
            Some(Some(self.type_expr()?))
        }
    }

    fn enum_decl(&mut self) -> Option<EnumDecl> {
        let start = self.bump().span; // enum
        let (name, name_span) = self.ident()?;
        self.expect(TokenKind::LBrace)?;
        self.skip_newlines();
        let mut variants = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            let (variant, span) = self.ident()?;
            variants.push(VariantDecl { name: variant, span });
            self.eat(TokenKind::Comma);
            self.skip_newlines();
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        Some(EnumDecl { name, name_span, variants, span: start.to(end) })
    }

    fn struct_decl(&mut self) -> Option<StructDecl> {
        let start = self.bump().span; // struct
        let (name, name_span) = self.ident()?;
        self.expect(TokenKind::LBrace)?;
        self.skip_newlines();
        let mut fields = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            let (field, field_span) = self.ident()?;
            self.expect(TokenKind::Colon)?;
            let ty = self.type_expr()?;
            let span = field_span.to(ty.span);
            fields.push(FieldDecl { name: field, ty, span });
            self.eat(TokenKind::Comma);
            self.skip_newlines();
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        Some(StructDecl { name, name_span, fields, span: start.to(end) })
    }

    fn impl_block(&mut self) -> Option<ImplBlock> {
        let start = self.bump().span; // impl
        let mutable = self.eat(TokenKind::Mut);
        let (target, target_span) = self.ident()?;
        self.expect(TokenKind::LBrace)?;
        self.skip_newlines();
        let mut methods = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            if !self.at(TokenKind::Fn) {
                let span = self.span();
                self.error("expected a method definition in impl block", span);
                self.sync();
                self.skip_newlines();
                continue;
            }
            if let Some(method) = self.fn_decl() {
                methods.push(method);
            } else {
                self.sync();
            }
            self.skip_newlines();
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        Some(ImplBlock { target, target_span, mutable, methods, span: start.to(end) })
    }

    fn trait_decl(&mut self) -> Option<TraitDecl> {
        let start = self.bump().span; // trait
        let (name, name_span) = self.ident()?;
        self.expect(TokenKind::LBrace)?;
        self.skip_newlines();
        let mut methods = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            let fn_span = self.expect(TokenKind::Fn)?.span;
            let (method, _) = self.ident()?;
            let params = self.param_list()?;
            let ret = if self.at(TokenKind::Newline) || self.at(TokenKind::RBrace) {
                None
            } else {
                Some(self.type_expr()?)
            };
            let end = ret.as_ref().map(|t| t.span).unwrap_or(fn_span);
            methods.push(TraitMethod { name: method, params, ret, span: fn_span.to(end) });
            self.skip_newlines();
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        Some(TraitDecl { name, name_span, methods, span: start.to(end) })
    }

    fn union_decl(&mut self) -> Option<UnionDecl> {
        let start = self.bump().span; // union
        let (name, name_span) = self.ident()?;
        self.expect(TokenKind::Eq)?;
        let mut members = vec![self.type_expr()?];
        while self.eat(TokenKind::Pipe) {
            members.push(self.type_expr()?);
        }
        let end = members.last().map(|t| t.span).unwrap_or(name_span);
        Some(UnionDecl { name, name_span, members, span: start.to(end) })
    }

    fn while_loop(&mut self) -> Option<WhileLoop> {
        let start = self.bump().span; // while
        let cond = self.expr_no_struct()?;
        let body = self.block()?;
        let span = start.to(body.span);
        Some(WhileLoop { cond, body, span })
    }

    fn for_stmt(&mut self) -> Option<Stmt> {
        // `for i in ...` and `for k, v in ...` are for-in; anything else is
        // the classical three-part loop.
        let is_for_in = self.nth_kind(1) == TokenKind::Ident
            && (self.nth_kind(2) == TokenKind::In
                || (self.nth_kind(2) == TokenKind::Comma
                    && self.nth_kind(3) == TokenKind::Ident
                    && self.nth_kind(4) == TokenKind::In));
        if is_for_in {
            self.for_in().map(Stmt::ForIn)
        } else {
            self.for_classic().map(Stmt::ForClassic)
        }
    }

    fn for_in(&mut self) -> Option<ForIn> {
        let start = self.bump().span; // for
        let (binding, binding_span) = self.ident()?;
        let second = if self.eat(TokenKind::Comma) {
            Some(self.ident()?)
        } else {
            None
        };
        self.expect(TokenKind::In)?;
        let first = self.expr_no_struct()?;
        let iterable = if self.eat(TokenKind::DotDot) {
            let end = self.expr_no_struct()?;
            ForIterable::Range(first, end)
        } else {
            ForIterable::Expr(first)
        };
        let body = self.block()?;
        let span = start.to(body.span);
        Some(ForIn { binding, binding_span, second, iterable, body, span })
    }

    fn for_classic(&mut self) -> Option<ForClassic> {
        let start = self.bump().span; // for
        let saved = self.no_struct;
        self.no_struct = true;
        let header = (|| {
            let init = match self.kind() {
                TokenKind::Let | TokenKind::Mut => Stmt::Let(self.let_stmt()?),
                _ => self.expr_or_assign()?,
            };
            self.expect(TokenKind::Semi)?;
            let cond = self.expr()?;
            self.expect(TokenKind::Semi)?;
            let update = self.expr_or_assign()?;
            Some((init, cond, update))
        })();
        self.no_struct = saved;
        let (init, cond, update) = header?;
        let body = self.block()?;
        let span = start.to(body.span);
        Some(ForClassic {
            init: Box::new(init),
            cond,
            update: Box::new(update),
            body,
            span,
        })
    }

    fn return_stmt(&mut self) -> Option<ReturnStmt> {
        let start = self.bump().span; // return
        let value = match self.kind() {
            TokenKind::Newline | TokenKind::RBrace | TokenKind::Eof => None,
            _ => Some(self.expr()?),
        };
        let span = value.as_ref().map(|v| start.to(v.span)).unwrap_or(start);
        Some(ReturnStmt { value, span })
    }

    pub(crate) fn block(&mut self) -> Option<Block> {
        let open = self.expect(TokenKind::LBrace)?.span;
        self.skip_newlines();
        let mut statements = Vec::new();
        while !self.at(TokenKind::RBrace) && !self.at(TokenKind::Eof) {
            match self.stmt() {
                Some(stmt) => statements.push(stmt),
                None => self.sync(),
            }
            self.skip_newlines();
        }
        let close = self.expect(TokenKind::RBrace)?.span;
        Some(Block { statements, span: open.to(close) })
    }

    // ── Types ──────────────────────────────────────────────────────────

    pub(crate) fn type_expr(&mut self) -> Option<TypeExpr> {
        let mut ty = self.type_primary()?;
        loop {
            match self.kind() {
                TokenKind::Question => {
                    let end = self.bump().span;
                    let span = ty.span.to(end);
                    ty = TypeExpr { kind: TypeExprKind::Maybe(Box::new(ty)), span };
                }
                TokenKind::Bang => {
                    self.bump();
                    let err = self.type_primary()?;
                    let span = ty.span.to(err.span);
                    ty = TypeExpr {
                        kind: TypeExprKind::Result(Box::new(ty), Box::new(err)),
                        span,
                    };
                }
                _ => break,
            }
        }
        Some(ty)
    }

    fn type_primary(&mut self) -> Option<TypeExpr> {
        match self.kind() {
            TokenKind::Ident => {
                let token = self.bump();
                Some(TypeExpr {
                    kind: TypeExprKind::Named(self.text(token).to_string()),
                    span: token.span,
                })
            }
            TokenKind::Generic => {
                let token = self.bump();
                Some(TypeExpr {
                    kind: TypeExprKind::Generic(self.text(token).to_string()),
                    span: token.span,
                })
            }
            TokenKind::LBracket => {
                let open = self.bump().span;
                let element = self.type_expr()?;
                if self.eat(TokenKind::Colon) {
                    let value = self.type_expr()?;
                    let close = self.expect(TokenKind::RBracket)?.span;
                    Some(TypeExpr {
                        kind: TypeExprKind::Map(Box::new(element), Box::new(value)),
                        span: open.to(close),
                    })
                } else {
                    let close = self.expect(TokenKind::RBracket)?.span;
                    Some(TypeExpr {
                        kind: TypeExprKind::List(Box::new(element)),
                        span: open.to(close),
                    })
                }
            }
            TokenKind::Fn => {
                let start = self.bump().span;
                self.expect(TokenKind::LParen)?;
                let mut params = Vec::new();
                while !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
                    params.push(self.type_expr()?);
                    if !self.eat(TokenKind::Comma) {
                        break;
                    }
                }
                let mut end = self.expect(TokenKind::RParen)?.span;
                let ret = if matches!(
                    self.kind(),
                    TokenKind::Ident | TokenKind::Generic | TokenKind::LBracket | TokenKind::Fn
                ) {
                    let ret = self.type_expr()?;
                    end = ret.span;
                    Some(Box::new(ret))
                } else {
                    None
                };
                Some(TypeExpr {
                    kind: TypeExprKind::Func { params, ret },
                    span: start.to(end),
                })
            }
            _ => {
                let found = self.current();
                self.error(format!("expected a type, found {}", found.kind), found.span);
                None
            }
        }
    }
}
