use serde::Serialize;

/// A 1-based line and 0-based column position within a template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct LineCol {
    line: u32,
    column: u32,
}

impl LineCol {
    #[must_use]
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for LineCol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A byte range within normalized template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Span {
    start: u32,
    length: u32,
}

impl Span {
    #[must_use]
    pub fn new(start: u32, length: u32) -> Self {
        Self { start, length }
    }

    /// Construct a span from integer bounds expressed as byte offsets.
    #[must_use]
    pub fn from_bounds(start: usize, end: usize) -> Self {
        let start_u32 = u32::try_from(start).unwrap_or(u32::MAX);
        let length = end.saturating_sub(start);
        let length_u32 = u32::try_from(length).unwrap_or(u32::MAX.saturating_sub(start_u32));
        Span::new(start_u32, length_u32)
    }

    #[must_use]
    pub fn start_usize(self) -> usize {
        self.start as usize
    }

    #[must_use]
    pub fn end_usize(self) -> usize {
        self.start.saturating_add(self.length) as usize
    }
}

/// Byte offsets of every line start in a source text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineIndex(Vec<u32>);

impl LineIndex {
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let mut starts = Vec::with_capacity(text.len() / 40 + 1);
        starts.push(0);
        for (idx, byte) in text.bytes().enumerate() {
            if byte == b'\n' {
                starts.push(u32::try_from(idx + 1).unwrap_or(u32::MAX));
            }
        }
        Self(starts)
    }

    /// Line and column of the first byte of `span`.
    #[must_use]
    pub fn position(&self, span: Span) -> LineCol {
        let offset = span.start;
        let line = match self.0.binary_search(&offset) {
            Ok(exact_line) => exact_line,
            Err(0) => 0,
            Err(next_line) => next_line - 1,
        };
        let column = offset - self.0[line];
        LineCol::new(u32::try_from(line + 1).unwrap_or(u32::MAX), column)
    }
}
