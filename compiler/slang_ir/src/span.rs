//! Declaration spans.
//!
//! Byte offsets into the main file, attached to every declaration the front
//! end hands over. `slang_diagnostic::SourceMap` turns the start offset into
//! a line and column when a declaration is diagnosed.

use std::fmt;

/// Byte range `start..end` of a declaration in its source file.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    /// Span for declarations synthesized by the front end.
    pub const DUMMY: Span = Span { start: 0, end: 0 };

    #[inline]
    pub const fn new(start: u32, end: u32) -> Self {
        Span { start, end }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(target_pointer_width = "64")]
mod size_asserts {
    use super::Span;
    crate::static_assert_size!(Span, 8);
}
