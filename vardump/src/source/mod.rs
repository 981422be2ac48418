///
/// Source Location and Span Module
///
/// This module provides the types used to point into PHP source text.
/// Tokens carry a Span, and SourceFile converts between byte offsets and
/// the 1-based (line, column) positions that closure locations use.
///
/// Key types:
/// - Span: A byte range in source text
/// - SourceFile: Named source text with a precomputed line index
///
/// Design decisions:
/// - Offsets are byte-based, columns are character-based
/// - Spans are Copy for ergonomic use in the lexer and scanners
///

use std::fmt;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub const fn dummy() -> Self {
        Self { start: 0, end: 0 }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, offset: u32) -> bool {
        offset >= self.start && offset < self.end
    }

    pub fn range(&self) -> std::ops::Range<usize> {
        self.start as usize..self.end as usize
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub source: String,
    line_starts: Vec<u32>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        let mut line_starts = vec![0];
        line_starts.extend(
            memchr::memchr_iter(b'\n', source.as_bytes()).map(|i| i as u32 + 1),
        );
        Self {
            name: name.into(),
            source,
            line_starts,
        }
    }

    pub fn text(&self, span: Span) -> &str {
        &self.source[span.range()]
    }

    /// 1-based line and column (in characters) of a byte offset.
    pub fn line_col(&self, offset: u32) -> (u32, u32) {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(idx) => idx,
            Err(idx) => idx - 1,
        };
        let line_start = self.line_starts[line_idx] as usize;
        let column = self.source[line_start..offset as usize].chars().count();
        (line_idx as u32 + 1, column as u32 + 1)
    }

    /// Byte offset of a 1-based (line, column) position.
    ///
    /// Columns past the end of the line clamp to the line end; a line past
    /// the end of the file yields `None`.
    pub fn offset_of(&self, line: u32, column: u32) -> Option<u32> {
        if line == 0 {
            return None;
        }
        let line_start = *self.line_starts.get(line as usize - 1)? as usize;
        let line_end = self
            .line_starts
            .get(line as usize)
            .map(|&s| s as usize - 1)
            .unwrap_or(self.source.len());
        let line_text = &self.source[line_start..line_end];
        let skip = column.saturating_sub(1) as usize;
        let byte_in_line = line_text
            .char_indices()
            .nth(skip)
            .map(|(i, _)| i)
            .unwrap_or(line_text.len());
        Some((line_start + byte_in_line) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_merge() {
        let a = Span::new(10, 20);
        let b = Span::new(15, 30);
        let merged = a.merge(b);
        assert_eq!(merged.start, 10);
        assert_eq!(merged.end, 30);
    }

    #[test]
    fn test_span_contains() {
        let span = Span::new(10, 20);
        assert!(span.contains(10));
        assert!(span.contains(15));
        assert!(!span.contains(20));
        assert!(!span.contains(5));
    }

    #[test]
    fn test_line_col_round_trip() {
        let file = SourceFile::new("a.php", "<?php\n$a = 1;\n  $b = 'é';\n");
        let offset = file.offset_of(3, 3).unwrap();
        assert_eq!(&file.source[offset as usize..offset as usize + 2], "$b");
        assert_eq!(file.line_col(offset), (3, 3));
    }

    #[test]
    fn test_offset_of_counts_characters() {
        let file = SourceFile::new("a.php", "'é' + fn() => 1");
        let offset = file.offset_of(1, 7).unwrap();
        assert_eq!(&file.source[offset as usize..offset as usize + 2], "fn");
    }

    #[test]
    fn test_offset_of_out_of_range() {
        let file = SourceFile::new("a.php", "<?php\n");
        assert!(file.offset_of(0, 1).is_none());
        assert!(file.offset_of(3, 1).is_none());
        assert_eq!(file.offset_of(1, 99), Some(5));
    }
}
