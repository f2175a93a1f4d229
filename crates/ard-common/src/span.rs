use std::fmt;
use std::ops::Range;

use serde::Serialize;

/// A half-open byte range into a source file.
///
/// All positions are byte offsets into the original UTF-8 source text.
/// Spans never cross file boundaries; the file a span belongs to is carried
/// separately (diagnostics know their file path).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    /// Byte offset of the first character.
    pub start: u32,
    /// Byte offset one past the last character.
    pub end: u32,
}

impl Span {
    /// Create a new span. `start` must not exceed `end`.
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "span start {start} past end {end}");
        Self { start, end }
    }

    /// An empty span at a single position.
    pub fn point(pos: u32) -> Self {
        Self { start: pos, end: pos }
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    /// Whether the span covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// The smallest span covering both `self` and `other`.
    pub fn to(&self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// The span as a `usize` range, for slicing source text.
    pub fn range(&self) -> Range<usize> {
        self.start as usize..self.end as usize
    }

    /// Slice the covered text out of `source`.
    pub fn text<'src>(&self, source: &'src str) -> &'src str {
        &source[self.range()]
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_covers() {
        let a = Span::new(2, 5);
        let b = Span::new(4, 9);
        assert_eq!(a.to(b), Span::new(2, 9));
        assert_eq!(b.to(a), Span::new(2, 9));
    }

    #[test]
    fn span_slices_source() {
        let src = "let x = 1";
        let span = Span::new(4, 5);
        assert_eq!(span.text(src), "x");
        assert_eq!(span.len(), 1);
        assert!(!span.is_empty());
    }

    #[test]
    fn point_span_is_empty() {
        assert!(Span::point(3).is_empty());
    }
}
