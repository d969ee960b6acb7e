use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFile;
use codespan_reporting::term::termcolor::StandardStream;
use codespan_reporting::term::{emit_to_io_write, Config};

use crate::config::SemaSettings;
use crate::errors::{CompileError, CompileErrorKind, SemanticError, Span};

/// A non-fatal finding, reported as a warning or promoted to an error by the
/// lint settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Lint {
    pub name: &'static str,
    pub message: String,
    pub span: Span,
}

impl Lint {
    pub fn new(name: &'static str, message: impl Into<String>, span: Span) -> Self {
        Lint {
            name,
            message: message.into(),
            span,
        }
    }
}

/// Applies allow/deny/error/Wall/Werror to collected lints.
pub fn classify(lints: &[Lint], settings: &SemaSettings) -> Vec<CompileError> {
    lints
        .iter()
        .filter(|l| settings.lint_enabled(l.name))
        .map(|l| {
            let kind = if settings.lint_is_error(l.name) {
                CompileErrorKind::Semantic
            } else {
                CompileErrorKind::Warning
            };
            CompileError::new(kind, format!("{} [{}]", l.message, l.name), l.span.clone())
        })
        .collect()
}

pub fn emit(
    errors: &[CompileError],
    stderr: &mut StandardStream,
    file: Option<&SimpleFile<&str, &str>>,
) {
    for e in errors {
        let Some(file) = file else {
            eprintln!("{}", e);
            continue;
        };
        let diag = match e.kind {
            CompileErrorKind::Warning => Diagnostic::warning(),
            _ => Diagnostic::error(),
        };
        let diag = diag
            .with_message(&e.message)
            .with_labels(vec![Label::primary((), e.span.clone())]);
        let _ = emit_to_io_write(stderr, &Config::default(), file, &diag);
    }
}

pub fn emit_semantic_error(
    error: &SemanticError,
    stderr: &mut StandardStream,
    file: Option<&SimpleFile<&str, &str>>,
) {
    let mut e = CompileError::from(error.clone());
    e.message = format!("{:?}: {}", error.kind, error.message);
    emit(&[e], stderr, file);
}
