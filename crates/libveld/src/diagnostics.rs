//! Diagnostic accumulation and reporting for the Veld language compiler.
//!
//! Passes never abort on the first mistake: every error and warning is pushed
//! onto a [`Diagnostics`] collector owned by the compiler state, and later
//! passes consult `has_errors` to decide whether lowering is still worth
//! running. Entries keep insertion order, which is the order they are
//! reported in.

use codespan_reporting::{
    diagnostic::{Diagnostic, Label},
    files::SimpleFiles,
    term::{self, termcolor::StandardStream},
};
use indexmap::IndexMap;
use miette::Diagnostic as MietteDiagnostic;
use simplelog::ColorChoice;

use crate::error::{CompileError, Severity};

/// Append-only collection of compile errors and warnings
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<CompileError>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a single diagnostic
    pub fn push(&mut self, error: CompileError) {
        self.entries.push(error);
    }

    /// Records a batch of diagnostics, keeping their order
    pub fn append(&mut self, mut errors: Vec<CompileError>) {
        self.entries.append(&mut errors);
    }

    /// True if any entry is an error (warnings do not count)
    pub fn has_errors(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.severity() == Severity::Error)
    }

    /// True if any entry is a warning
    pub fn has_warnings(&self) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.severity() == Severity::Warning)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CompileError> {
        self.entries.iter()
    }

    /// Iterates the error entries only
    pub fn errors(&self) -> impl Iterator<Item = &CompileError> {
        self.entries
            .iter()
            .filter(|entry| entry.severity() == Severity::Error)
    }

    /// Iterates the warning entries only
    pub fn warnings(&self) -> impl Iterator<Item = &CompileError> {
        self.entries
            .iter()
            .filter(|entry| entry.severity() == Severity::Warning)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Trait for rendering accumulated diagnostics to the user
pub trait ReportGenerator {
    /// Render every entry of the given collector
    fn generate(diagnostics: &Diagnostics);
}

/// Diagnostic renderer built on the `codespan-reporting` library
pub struct CodeSpanReportGenerator;

impl ReportGenerator for CodeSpanReportGenerator {
    fn generate(diagnostics: &Diagnostics) {
        let mut files = SimpleFiles::new();
        let mut file_ids: IndexMap<String, usize> = IndexMap::new();
        let mut rendered = Vec::new();

        for entry in diagnostics.iter() {
            let source = entry.source();
            let file_id = *file_ids.entry(source.name.clone()).or_insert_with(|| {
                files.add(source.name.clone(), source.source.to_string())
            });

            let mut diagnostic: Diagnostic<usize> = match entry.severity() {
                Severity::Error => Diagnostic::error(),
                Severity::Warning => Diagnostic::warning(),
            }
            .with_message(entry.to_string());

            if let Some(labels) = MietteDiagnostic::labels(entry) {
                let labels = labels
                    .map(|label| {
                        let start = label.offset();
                        let stop = start + label.len();
                        let primary = Label::primary(file_id, start..stop);

                        match label.label() {
                            Some(message) => primary.with_message(message),
                            None => primary,
                        }
                    })
                    .collect::<Vec<_>>();
                diagnostic = diagnostic.with_labels(labels);
            }

            if let Some(help) = MietteDiagnostic::help(entry) {
                diagnostic = diagnostic.with_notes(vec![help.to_string()]);
            }

            rendered.push(diagnostic);
        }

        let writer = StandardStream::stderr(ColorChoice::Auto);
        let config = codespan_reporting::term::Config::default();

        for diagnostic in rendered.into_iter() {
            term::emit(&mut writer.lock(), &config, &files, &diagnostic).unwrap();
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{file::SourceFile, span::Span};

    fn span() -> Span {
        Span::new(0..3, SourceFile::new(vec!["test".into()], "abc".to_string()))
    }

    #[test]
    fn diagnostics_start_empty() {
        let diagnostics = Diagnostics::new();
        assert!(diagnostics.is_empty());
        assert!(!diagnostics.has_errors());
        assert!(!diagnostics.has_warnings());
    }

    #[test]
    fn warnings_do_not_count_as_errors() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(CompileError::unused_local("x".into(), &span()));

        assert!(!diagnostics.has_errors());
        assert!(diagnostics.has_warnings());
        assert_eq!(diagnostics.warnings().count(), 1);
        assert_eq!(diagnostics.errors().count(), 0);
    }

    #[test]
    fn entries_keep_insertion_order() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.push(CompileError::undefined_local("a".into(), &span()));
        diagnostics.push(CompileError::unused_local("b".into(), &span()));
        diagnostics.append(vec![CompileError::undefined_local("c".into(), &span())]);

        let messages = diagnostics.iter().map(|entry| entry.to_string()).collect::<Vec<_>>();
        assert_eq!(
            messages,
            vec![
                "undefined local variable 'a'",
                "unused local variable 'b'",
                "undefined local variable 'c'",
            ]
        );
    }
}
