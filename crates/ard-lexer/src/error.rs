use std::fmt;

use ard_common::Span;

/// A malformed piece of source.
///
/// The lexer records an error and keeps scanning, so one pass reports every
/// problem in a file. Each variant carries the span of the offending text
/// and whatever the scanner knew when it gave up -- interpolation errors,
/// for example, remember how many braces were still open.
#[derive(Debug, Clone, PartialEq)]
pub enum LexError {
    /// A character no Ard token starts with.
    StrayCharacter { found: char, span: Span },
    /// A string literal still open at the end of its line.
    UnclosedString { span: Span },
    /// A `{...}` interpolation still open when the source ran out.
    UnclosedInterpolation { span: Span, depth: u32 },
    /// An escape sequence the language does not define.
    BadEscape { escape: char, span: Span },
    /// A number literal with trailing junk, e.g. `12abc`.
    MalformedNumber { lexeme: String, span: Span },
}

impl LexError {
    /// The source range the error points at.
    pub fn span(&self) -> Span {
        match self {
            LexError::StrayCharacter { span, .. }
            | LexError::UnclosedString { span }
            | LexError::UnclosedInterpolation { span, .. }
            | LexError::BadEscape { span, .. }
            | LexError::MalformedNumber { span, .. } => *span,
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexError::StrayCharacter { found, .. } => {
                write!(f, "stray character in input: {found:?}")
            }
            LexError::UnclosedString { .. } => {
                write!(f, "string literal is missing its closing quote")
            }
            LexError::UnclosedInterpolation { depth: 1, .. } => {
                write!(f, "string interpolation is never closed (1 open brace)")
            }
            LexError::UnclosedInterpolation { depth, .. } => {
                write!(f, "string interpolation is never closed ({depth} open braces)")
            }
            LexError::BadEscape { escape, .. } => {
                write!(f, "unsupported escape sequence: \\{escape}")
            }
            LexError::MalformedNumber { lexeme, .. } => {
                write!(f, "malformed number literal: {lexeme}")
            }
        }
    }
}

impl std::error::Error for LexError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_exposes_its_span() {
        let span = Span::new(4, 7);
        let errors = [
            LexError::StrayCharacter { found: '~', span },
            LexError::UnclosedString { span },
            LexError::UnclosedInterpolation { span, depth: 2 },
            LexError::BadEscape { escape: 'q', span },
            LexError::MalformedNumber { lexeme: "12abc".into(), span },
        ];
        for err in errors {
            assert_eq!(err.span(), span, "{err}");
        }
    }

    #[test]
    fn messages_name_the_problem() {
        let span = Span::new(0, 1);
        assert_eq!(
            LexError::StrayCharacter { found: '~', span }.to_string(),
            "stray character in input: '~'"
        );
        assert_eq!(
            LexError::BadEscape { escape: 'q', span }.to_string(),
            "unsupported escape sequence: \\q"
        );
        assert_eq!(
            LexError::MalformedNumber { lexeme: "1x".into(), span }.to_string(),
            "malformed number literal: 1x"
        );
    }

    #[test]
    fn interpolation_message_counts_open_braces() {
        let span = Span::new(0, 5);
        assert_eq!(
            LexError::UnclosedInterpolation { span, depth: 1 }.to_string(),
            "string interpolation is never closed (1 open brace)"
        );
        assert_eq!(
            LexError::UnclosedInterpolation { span, depth: 3 }.to_string(),
            "string interpolation is never closed (3 open braces)"
        );
    }
}
