//! Source file representation and handling for the Veld language compiler.
//!
//! This module provides the `SourceFile` struct which represents a source file
//! with its path and contents, along with conversions to error reporting types.

use std::{path::PathBuf, sync::Arc};

use miette::{MietteError, MietteSpanContents, SourceSpan, SpanContents};

/// File extension for Veld language source files
pub static VELD_LANG_EXT: &str = "veld";

/// Source code payload attached to diagnostics
///
/// Every error struct carries one of these in its `#[source_code]` field so
/// that both miette and the codespan report generator can render snippets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceCode {
    /// Display name of the file the snippet comes from
    pub name: String,
    /// The full source text
    pub source: Arc<String>,
}

impl miette::SourceCode for SourceCode {
    fn read_span<'a>(
        &'a self,
        span: &SourceSpan,
        context_lines_before: usize,
        context_lines_after: usize,
    ) -> Result<Box<dyn SpanContents<'a> + 'a>, MietteError> {
        let contents =
            self.source
                .as_str()
                .read_span(span, context_lines_before, context_lines_after)?;

        Ok(Box::new(MietteSpanContents::new_named(
            self.name.clone(),
            contents.data(),
            *contents.span(),
            contents.line(),
            contents.column(),
            contents.line_count(),
        )))
    }
}

/// Represents a source file with its path and source code content
///
/// This structure is used throughout the compiler to track source files
/// and provide error reporting with proper file context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceFile {
    /// The file path as a vector of path components
    pub path: Arc<Vec<String>>,
    /// The source code content of the file
    pub code: Arc<String>,
}

impl From<SourceFile> for SourceCode {
    fn from(file: SourceFile) -> Self {
        SourceCode {
            name: file.display_path(),
            source: file.code,
        }
    }
}

impl From<&SourceFile> for SourceCode {
    fn from(file: &SourceFile) -> Self {
        SourceCode {
            name: file.display_path(),
            source: file.code.clone(),
        }
    }
}

impl std::fmt::Display for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SourceFile: {:?}", self.path)
    }
}

impl SourceFile {
    /// Creates a new source file with the given path and source code
    ///
    /// # Arguments
    /// * `path` - Vector of path components representing the file path
    /// * `code` - The source code content as a string
    pub fn new(path: Vec<String>, code: String) -> Self {
        Self {
            path: path.into(),
            code: code.into(),
        }
    }

    /// Returns a reference to the file path components
    pub fn path(&self) -> &Vec<String> {
        &self.path
    }

    /// Returns a reference to the source code content
    pub fn code(&self) -> &String {
        self.code.as_ref()
    }

    /// Returns the path joined with the platform separator, including the
    /// Veld source extension
    pub fn display_path(&self) -> String {
        let buffer = PathBuf::from_iter(self.path.iter());
        format!("{}.{}", buffer.to_string_lossy(), VELD_LANG_EXT)
    }

    /// Computes the line number (starting at 1) of a byte offset
    pub fn line_of(&self, offset: usize) -> usize {
        let clamped = offset.min(self.code.len());
        self.code[..clamped].bytes().filter(|byte| *byte == b'\n').count() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_path_uses_extension() {
        let file = SourceFile::new(vec!["std".into(), "string".into()], "".to_string());
        assert!(file.display_path().ends_with(&format!("string.{VELD_LANG_EXT}")));
    }

    #[test]
    fn line_of_counts_newlines() {
        let file = SourceFile::new(vec!["test".into()], "a\nb\nc".to_string());
        assert_eq!(file.line_of(0), 1);
        assert_eq!(file.line_of(2), 2);
        assert_eq!(file.line_of(4), 3);
        assert_eq!(file.line_of(100), 3);
    }
}
