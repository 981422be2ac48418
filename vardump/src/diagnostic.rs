//!
//! Diagnostic Module - Rich Error Reporting
//!
//! Renders closure extraction failures and import scanning errors with
//! source context using miette: line numbers, column positions and the
//! offending snippet.
//!
//! Usage:
//!   let reporter = DiagnosticReporter::new(&source_file);
//!   reporter.report_closure_error(&err);
//!   reporter.report_parse_errors(&errors);
//!

use miette::{Diagnostic, LabeledSpan, NamedSource, Report, SourceSpan};
use thiserror::Error;

use crate::errors::ClosureError;
use crate::parser::ParseError;
use crate::source::{SourceFile, Span};

#[derive(Debug, Error)]
#[error("{message}")]
pub struct SourceDiagnostic {
    message: String,
    src: NamedSource<String>,
    span: SourceSpan,
    label: String,
    help_text: Option<String>,
}

impl Diagnostic for SourceDiagnostic {
    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&self.src)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        Some(Box::new(std::iter::once(LabeledSpan::new_primary_with_span(
            Some(self.label.clone()),
            self.span,
        ))))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        self.help_text
            .as_ref()
            .map(|h| Box::new(h.clone()) as Box<dyn std::fmt::Display>)
    }
}

fn source_span(span: Span) -> SourceSpan {
    (span.start as usize, span.len() as usize).into()
}

impl SourceDiagnostic {
    pub fn from_parse_error(err: &ParseError, source: &SourceFile) -> Self {
        let (line, col) = source.line_col(err.span.start);

        Self {
            message: format!("import scan stopped at {}:{}", line, col),
            src: NamedSource::new(&source.name, source.source.clone()),
            span: source_span(err.span),
            label: err.message.clone(),
            help_text: Some("imports after this point are ignored".to_string()),
        }
    }

    /// Only errors that point into the source have a diagnostic.
    pub fn from_closure_error(err: &ClosureError, source: &SourceFile) -> Option<Self> {
        let span = err.span()?;
        let (line, col) = source.line_col(span.start);
        let (label, help) = match err {
            ClosureError::NotFound { .. } => (
                "no `function` or `fn` literal here".to_string(),
                Some("point the column at or before the closure".to_string()),
            ),
            ClosureError::Unterminated { .. } => (
                "closure starts here".to_string(),
                Some("check for an unbalanced brace or parenthesis".to_string()),
            ),
            _ => (err.to_string(), None),
        };

        Some(Self {
            message: format!("{} ({}:{})", err, line, col),
            src: NamedSource::new(&source.name, source.source.clone()),
            span: source_span(span),
            label,
            help_text: help,
        })
    }
}

pub struct DiagnosticReporter<'a> {
    source: &'a SourceFile,
}

impl<'a> DiagnosticReporter<'a> {
    pub fn new(source: &'a SourceFile) -> Self {
        Self { source }
    }

    pub fn report_closure_error(&self, err: &ClosureError) {
        match SourceDiagnostic::from_closure_error(err, self.source) {
            Some(diag) => eprintln!("{:?}", Report::new(diag)),
            None => eprintln!("error: {}", err),
        }
    }

    pub fn report_parse_error(&self, err: &ParseError) {
        let diag = SourceDiagnostic::from_parse_error(err, self.source);
        eprintln!("{:?}", Report::new(diag));
    }

    pub fn report_parse_errors(&self, errors: &[ParseError]) {
        for err in errors {
            self.report_parse_error(err);
        }
    }
}
