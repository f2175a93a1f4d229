//! Tokenizer for the Ard programming language.
//!
//! The lexer scans the unlexed tail of the source as a shrinking `&str`
//! slice, tracking the byte offset of that tail so every token gets an
//! absolute span. Errors are collected rather than thrown, so a single pass
//! reports every malformed token. String literals -- including their
//! `{...}` interpolations, nested braces and nested quotes -- lex as one
//! `Str` token; [`string_segments`] recovers the pieces when the parser
//! wants them.

pub mod error;
pub mod token;

pub use ard_common::Span;
pub use error::LexError;
pub use token::{Token, TokenKind};

/// Tokenize an entire source file.
///
/// The returned stream always ends with a single [`TokenKind::Eof`] token.
/// Consecutive line breaks collapse into one [`TokenKind::Newline`].
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<LexError>) {
    let mut lexer = Lexer {
        source,
        rest: source,
        offset: 0,
        tokens: Vec::new(),
        errors: Vec::new(),
    };
    lexer.run();
    (lexer.tokens, lexer.errors)
}

/// Two-character operators, matched before the single-character table.
const DOUBLES: [(&str, TokenKind); 8] = [
    ("::", TokenKind::ColonColon),
    ("..", TokenKind::DotDot),
    ("=>", TokenKind::FatArrow),
    ("->", TokenKind::Arrow),
    ("==", TokenKind::EqEq),
    ("!=", TokenKind::NotEq),
    ("<=", TokenKind::LtEq),
    (">=", TokenKind::GtEq),
];

struct Lexer<'src> {
    source: &'src str,
    /// The unlexed tail of `source`.
    rest: &'src str,
    /// Byte offset of `rest` within `source`.
    offset: u32,
    tokens: Vec<Token>,
    errors: Vec<LexError>,
}

impl<'src> Lexer<'src> {
    // ── Source window ──────────────────────────────────────────────────

    fn current(&self) -> Option<char> {
        self.rest.chars().next()
    }

    /// Drop `bytes` from the front of the tail. `bytes` must sit on a
    /// character boundary.
    fn skip(&mut self, bytes: usize) {
        self.rest = &self.rest[bytes..];
        self.offset += bytes as u32;
    }

    /// Consume and return the next character.
    fn next_char(&mut self) -> Option<char> {
        let c = self.current()?;
        self.skip(c.len_utf8());
        Some(c)
    }

    /// Consume the longest prefix whose characters all satisfy `keep` and
    /// return it as the lexeme.
    fn lexeme_while(&mut self, keep: impl Fn(char) -> bool) -> &'src str {
        let len = self.rest.find(|c| !keep(c)).unwrap_or(self.rest.len());
        let (lexeme, tail) = self.rest.split_at(len);
        self.rest = tail;
        self.offset += len as u32;
        lexeme
    }

    fn emit(&mut self, kind: TokenKind, start: u32) {
        self.tokens.push(Token::new(kind, Span::new(start, self.offset)));
    }

    // ── Scanning ───────────────────────────────────────────────────────

    fn run(&mut self) {
        while let Some(c) = self.current() {
            let start = self.offset;
            match c {
                ' ' | '\t' | '\r' => self.skip(1),
                '\n' => {
                    // A run of blank lines is one statement boundary.
                    self.lexeme_while(|c| matches!(c, '\n' | ' ' | '\t' | '\r'));
                    self.emit(TokenKind::Newline, start);
                }
                '/' if self.rest.starts_with("//") => {
                    self.lexeme_while(|c| c != '\n');
                }
                '"' => self.string_literal(),
                '$' => self.type_parameter(),
                '0'..='9' => self.number(),
                c if c.is_ascii_alphabetic() || c == '_' => self.word(),
                _ => self.punctuation(),
            }
        }
        self.tokens.push(Token::new(TokenKind::Eof, Span::point(self.offset)));
    }

    fn word(&mut self) {
        let start = self.offset;
        let lexeme = self.lexeme_while(|c| c.is_ascii_alphanumeric() || c == '_');
        let kind = TokenKind::keyword(lexeme).unwrap_or(TokenKind::Ident);
        self.emit(kind, start);
    }

    fn type_parameter(&mut self) {
        let start = self.offset;
        self.skip(1); // $
        match self.current() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                self.lexeme_while(|c| c.is_ascii_alphanumeric() || c == '_');
                self.emit(TokenKind::Generic, start);
            }
            _ => self.errors.push(LexError::StrayCharacter {
                found: '$',
                span: Span::new(start, self.offset),
            }),
        }
    }

    fn number(&mut self) {
        let start = self.offset;
        self.lexeme_while(|c| c.is_ascii_digit());
        // A dot starts a fraction only when a digit follows, so `1..3`
        // stays Int DotDot Int.
        let bytes = self.rest.as_bytes();
        let is_float = bytes.first() == Some(&b'.') && bytes.get(1).is_some_and(u8::is_ascii_digit);
        if is_float {
            self.skip(1);
            self.lexeme_while(|c| c.is_ascii_digit());
        }
        // Trailing alphabetic characters make the literal malformed (`1x`).
        if self.current().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.lexeme_while(|c| c.is_ascii_alphanumeric());
            let lexeme = self.source[start as usize..self.offset as usize].to_string();
            self.errors.push(LexError::MalformedNumber {
                lexeme,
                span: Span::new(start, self.offset),
            });
            return;
        }
        let kind = if is_float { TokenKind::Float } else { TokenKind::Int };
        self.emit(kind, start);
    }

    /// Scan a full string literal into one `Str` token.
    ///
    /// Interpolations are tracked here so the token covers the whole
    /// literal; the parser re-scans the lexeme with [`string_segments`]
    /// when it wants the pieces.
    fn string_literal(&mut self) {
        let start = self.offset;
        self.skip(1); // opening quote
        loop {
            match self.current() {
                None | Some('\n') => {
                    self.errors.push(LexError::UnclosedString {
                        span: Span::new(start, self.offset),
                    });
                    return;
                }
                Some('"') => {
                    self.skip(1);
                    self.emit(TokenKind::Str, start);
                    return;
                }
                Some('\\') => {
                    let escape_start = self.offset;
                    self.skip(1);
                    match self.next_char() {
                        Some('"' | '\\' | 'n' | 't' | '{' | '}') | None => {}
                        Some(other) => self.errors.push(LexError::BadEscape {
                            escape: other,
                            span: Span::new(escape_start, self.offset),
                        }),
                    }
                }
                Some('{') => {
                    if !self.interpolation() {
                        return;
                    }
                }
                Some(c) => self.skip(c.len_utf8()),
            }
        }
    }

    /// Skip a `{...}` interpolation, tracking brace depth and nested string
    /// literals. Returns false when the source ran out; the recorded error
    /// remembers how many braces were still open.
    fn interpolation(&mut self) -> bool {
        let open = self.offset;
        self.skip(1); // {
        let mut depth = 1u32;
        let mut in_nested_str = false;
        while depth > 0 {
            match self.next_char() {
                None => {
                    self.errors.push(LexError::UnclosedInterpolation {
                        span: Span::new(open, self.offset),
                        depth,
                    });
                    return false;
                }
                Some('\\') if in_nested_str => {
                    self.next_char();
                }
                Some('"') => in_nested_str = !in_nested_str,
                Some('{') if !in_nested_str => depth += 1,
                Some('}') if !in_nested_str => depth -= 1,
                Some(_) => {}
            }
        }
        true
    }

    fn punctuation(&mut self) {
        let start = self.offset;
        for (text, kind) in DOUBLES {
            if self.rest.starts_with(text) {
                self.skip(2);
                self.emit(kind, start);
                return;
            }
        }
        let c = self.next_char().expect("punctuation called at end of input");
        let kind = match c {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semi,
            ':' => TokenKind::Colon,
            '.' => TokenKind::Dot,
            '=' => TokenKind::Eq,
            '<' => TokenKind::Lt,
            '>' => TokenKind::Gt,
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '!' => TokenKind::Bang,
            '?' => TokenKind::Question,
            '@' => TokenKind::At,
            '|' => TokenKind::Pipe,
            other => {
                self.errors.push(LexError::StrayCharacter {
                    found: other,
                    span: Span::new(start, self.offset),
                });
                return;
            }
        };
        self.emit(kind, start);
    }
}

// ── String interpolation segments ──────────────────────────────────────

/// One piece of a string literal.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Literal text with escape sequences already processed.
    Text(String),
    /// The absolute span of an interpolated expression (brace contents).
    Interp(Span),
}

/// Split a `Str` token's lexeme into literal text and interpolation spans.
///
/// `raw` is the full lexeme including quotes; `offset` is the byte offset of
/// the lexeme's first character in the original source, so returned spans are
/// absolute. The lexeme is assumed well-formed (the lexer has already
/// reported malformed strings); stray trailing input is ignored.
pub fn string_segments(raw: &str, offset: u32) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let inner = raw.strip_prefix('"').unwrap_or(raw);
    let inner = inner.strip_suffix('"').unwrap_or(inner);
    let base = offset + 1;

    let mut chars = inner.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                if let Some((_, esc)) = chars.next() {
                    match esc {
                        'n' => text.push('\n'),
                        't' => text.push('\t'),
                        other => text.push(other),
                    }
                }
            }
            '{' => {
                if !text.is_empty() {
                    segments.push(Segment::Text(std::mem::take(&mut text)));
                }
                let expr_start = base + i as u32 + 1;
                let mut depth = 1u32;
                let mut expr_end = expr_start;
                let mut in_nested_str = false;
                for (j, c2) in chars.by_ref() {
                    expr_end = base + j as u32;
                    match c2 {
                        '"' => in_nested_str = !in_nested_str,
                        '{' if !in_nested_str => depth += 1,
                        '}' if !in_nested_str => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                }
                segments.push(Segment::Interp(Span::new(expr_start, expr_end)));
            }
            _ => text.push(c),
        }
    }
    if !text.is_empty() || segments.is_empty() {
        segments.push(Segment::Text(text));
    }
    segments
}
