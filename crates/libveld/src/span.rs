//! Source location tracking for the Veld language compiler.
//!
//! Every AST node and TIR instruction carries a [`Span`]: a byte range into a
//! [`SourceFile`]. Spans survive past the parser's lifetime, so they can be
//! stored on diagnostics and in generated code metadata.

use std::ops::Range;

use crate::file::SourceFile;

/// A region of source code together with the file it belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Span {
    /// The position range in the source file
    pub position: Range<usize>,
    /// The source file this span belongs to
    pub file: SourceFile,
}

impl Span {
    /// Creates a new span with the given position and file
    pub fn new(position: Range<usize>, file: SourceFile) -> Self {
        Self { position, file }
    }

    /// A zero-width span at the start of the file, used for synthesized nodes
    pub fn synthesized(file: SourceFile) -> Self {
        Self { position: 0..0, file }
    }

    /// The line number (starting at 1) this span begins on
    pub fn line(&self) -> usize {
        self.file.line_of(self.position.start)
    }

    /// The byte range of this span
    pub fn to_range(&self) -> Range<usize> {
        self.position.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_line() {
        let file = SourceFile::new(vec!["test".into()], "one\ntwo\nthree".to_string());
        assert_eq!(Span::new(0..3, file.clone()).line(), 1);
        assert_eq!(Span::new(4..7, file.clone()).line(), 2);
        assert_eq!(Span::new(8..13, file).line(), 3);
    }

    #[test]
    fn synthesized_span_is_empty() {
        let file = SourceFile::new(vec!["test".into()], "code".to_string());
        assert_eq!(Span::synthesized(file).to_range(), 0..0);
    }
}
