//! Shared types for the Ard compiler.
//!
//! This crate holds the one type every phase agrees on: the byte-offset
//! [`Span`]. Nothing here depends on the lexer, parser, or checker.

pub mod span;

pub use span::Span;
