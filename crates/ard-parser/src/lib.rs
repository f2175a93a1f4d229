//! Parser for the Ard programming language.
//!
//! Turns source text into the plain AST consumed by the checker. Every node
//! carries a byte-offset span; statements preserve declaration order. Parse
//! and lex errors are collected rather than aborting so one run reports as
//! much as possible.

pub mod ast;
pub mod error;
mod parser;

pub use ard_common::Span;
pub use error::ParseError;

use ast::Program;

/// The result of parsing one source file.
///
/// Owns the source text so downstream phases can slice lexemes out of spans
/// (the checker uses this for access-path diagnostics).
#[derive(Debug, Clone)]
pub struct Parse {
    pub program: Program,
    pub errors: Vec<ParseError>,
    pub source: String,
}

impl Parse {
    /// Whether any lex or parse error was recorded.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Parse a complete Ard source file.
pub fn parse(source: &str) -> Parse {
    let (tokens, lex_errors) = ard_lexer::tokenize(source);
    let (program, mut errors) = parser::parse_program(source, tokens);
    let mut all_errors: Vec<ParseError> = lex_errors
        .into_iter()
        .map(|e| ParseError::new(e.to_string(), e.span()))
        .collect();
    all_errors.append(&mut errors);
    Parse {
        program,
        errors: all_errors,
        source: source.to_string(),
    }
}
