//! Resolution of byte-offset spans to file/line/column locations.
//!
//! Diagnostics carry a resolved [`SourceLocation`] rather than a raw span so
//! the sink does not need access to the source text.

use std::fmt;

use slang_ir::Span;

/// A resolved, human-facing source position. Line and column are 1-based.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct SourceLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Source text of one file plus a pre-computed line start table.
///
/// Lookups binary-search the table, so resolving many spans costs
/// O(log L) each after the single O(n) scan in [`SourceMap::new`].
#[derive(Clone, Debug, Default)]
pub struct SourceMap {
    file: String,
    source: String,
    /// Byte offset of each line start; `line_starts[0] == 0`.
    line_starts: Vec<u32>,
}

impl SourceMap {
    /// Build a source map for `file` with contents `source`.
    pub fn new(file: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        let mut line_starts = vec![0u32];
        for (i, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(u32::try_from(i + 1).unwrap_or(u32::MAX));
            }
        }
        SourceMap {
            file: file.into(),
            source,
            line_starts,
        }
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// 1-based line containing `offset`.
    pub fn line_from_offset(&self, offset: u32) -> u32 {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert) => insert.saturating_sub(1),
        };
        u32::try_from(line_idx).unwrap_or(u32::MAX - 1) + 1
    }

    /// Resolve the start of `span`. The column counts characters, not bytes.
    pub fn location(&self, span: Span) -> SourceLocation {
        let line = self.line_from_offset(span.start);
        let line_start = self
            .line_starts
            .get((line - 1) as usize)
            .copied()
            .unwrap_or(0) as usize;
        let offset = (span.start as usize).min(self.source.len());

        let column = self
            .source
            .get(line_start..offset)
            .map_or(0, |prefix| prefix.chars().count());

        SourceLocation {
            file: self.file.clone(),
            line,
            column: u32::try_from(column).unwrap_or(u32::MAX - 1) + 1,
        }
    }
}
