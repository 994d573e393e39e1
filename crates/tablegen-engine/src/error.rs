//! Engine error types with source-annotated diagnostics

use miette::{Diagnostic, NamedSource, SourceSpan};
use std::path::PathBuf;
use tablegen_core::TemplateRef;
use thiserror::Error;

use crate::renderer::RenderedFile;
use crate::suggestions::{
    extract_quoted_name, suggest_missing_lookup, suggest_undefined_variable,
    suggest_unknown_filter,
};

/// Prefix of the error raised when a missing `flat_get` lookup is written out
pub(crate) const MISSING_LOOKUP_PREFIX: &str = "undefined value '";

/// Error kind for categorizing template errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum TemplateErrorKind {
    UndefinedVariable,
    /// A `flat_get` lookup that found nothing reached the output
    MissingLookup,
    UnknownFilter,
    UnknownFunction,
    SyntaxError,
    TemplateNotFound,
    /// A filter rejected its input
    FilterError,
    TypeError,
    Other,
}

/// Template-specific error with source information
#[derive(Error, Debug, Diagnostic, Clone)]
#[error("{message}")]
#[diagnostic(code(tablegen::template::render))]
pub struct TemplateError {
    /// Error message
    pub message: String,

    /// Error kind for categorization
    pub kind: TemplateErrorKind,

    /// Template source code
    #[source_code]
    pub src: NamedSource<String>,

    /// Error location in source
    #[label("error occurred here")]
    pub span: Option<SourceSpan>,

    /// Suggestion for fixing the error
    #[help]
    pub suggestion: Option<String>,
}

impl TemplateError {
    /// Create a template error from a MiniJinja error
    ///
    /// `data_keys` are the top-level keys of the data document, used to
    /// suggest corrections for undefined variables.
    pub fn from_minijinja(
        err: minijinja::Error,
        template_name: &str,
        template_source: &str,
        data_keys: &[String],
    ) -> Self {
        let (kind, message) = categorize_minijinja_error(&err);

        // Errors raised inside an included template carry that template's line
        let same_template = err.name().is_none_or(|name| name == template_name);
        let span = err
            .line()
            .filter(|_| same_template)
            .and_then(|line_num| calculate_span(template_source, line_num));

        let suggestion = generate_suggestion(&err, kind, data_keys);

        Self {
            message,
            kind,
            src: NamedSource::new(template_name, template_source.to_string()),
            span,
            suggestion,
        }
    }

    /// Get the error kind
    pub fn kind(&self) -> TemplateErrorKind {
        self.kind
    }
}

/// Categorize a MiniJinja error into our error kinds
fn categorize_minijinja_error(err: &minijinja::Error) -> (TemplateErrorKind, String) {
    let detail = err.detail().map(str::to_string);
    let msg = detail.clone().unwrap_or_else(|| err.kind().to_string());

    let kind = match err.kind() {
        minijinja::ErrorKind::UndefinedError => TemplateErrorKind::UndefinedVariable,
        minijinja::ErrorKind::UnknownFilter => TemplateErrorKind::UnknownFilter,
        minijinja::ErrorKind::UnknownFunction => TemplateErrorKind::UnknownFunction,
        minijinja::ErrorKind::SyntaxError => TemplateErrorKind::SyntaxError,
        minijinja::ErrorKind::TemplateNotFound => TemplateErrorKind::TemplateNotFound,
        minijinja::ErrorKind::InvalidOperation if msg.starts_with(MISSING_LOOKUP_PREFIX) => {
            TemplateErrorKind::MissingLookup
        }
        minijinja::ErrorKind::InvalidOperation => TemplateErrorKind::FilterError,
        minijinja::ErrorKind::NonPrimitive
        | minijinja::ErrorKind::NonKey
        | minijinja::ErrorKind::MissingArgument
        | minijinja::ErrorKind::TooManyArguments => TemplateErrorKind::TypeError,
        _ => TemplateErrorKind::Other,
    };

    // MiniJinja's debug display points at the failing expression
    let message = match kind {
        TemplateErrorKind::UndefinedVariable => {
            match extract_expression_from_display(&format!("{:#}", err)) {
                Some(expr) => format!("undefined variable `{}`", expr),
                None => msg.replace("undefined value", "undefined variable"),
            }
        }
        TemplateErrorKind::UnknownFilter => {
            match extract_filter_from_display(&format!("{:#}", err)) {
                Some(filter) => format!("unknown filter `{}`", filter),
                None => msg,
            }
        }
        _ => msg,
    };

    (kind, message)
}

/// Extract the expression on the line MiniJinja marks with `>`
fn extract_expression_from_display(display: &str) -> Option<String> {
    // MiniJinja format:
    //    8 >   code = {{ countris.NL }}
    //      i            ^^^^^^^^ undefined value
    let line = error_line(display)?;
    let expr = expression_on_line(line)?;
    let expr = expr.split('|').next().unwrap_or(expr).trim();
    (!expr.is_empty()).then(|| expr.to_string())
}

/// Extract the last filter name on the line MiniJinja marks with `>`
fn extract_filter_from_display(display: &str) -> Option<String> {
    let line = error_line(display)?;
    let expr = expression_on_line(line)?;
    let (_, filter_part) = expr.rsplit_once('|')?;
    let name = filter_part.trim().split(|c: char| c == '(' || c.is_whitespace()).next()?;
    (!name.is_empty()).then(|| name.to_string())
}

fn error_line(display: &str) -> Option<&str> {
    display.lines().find(|line| {
        let trimmed = line.trim_start();
        trimmed.contains(" > ") || trimmed.starts_with("> ")
    })
}

fn expression_on_line(line: &str) -> Option<&str> {
    let start = line.find("{{")?;
    let end = line[start..].find("}}")?;
    Some(line[start + 2..start + end].trim())
}

/// Calculate the source span for a given line number
fn calculate_span(source: &str, line_num: usize) -> Option<SourceSpan> {
    let mut offset = 0;

    for (idx, line) in source.lines().enumerate() {
        if idx + 1 == line_num {
            return Some(SourceSpan::new(offset.into(), line.len()));
        }
        offset += line.len() + 1;
    }

    None
}

/// Generate suggestions based on error kind
fn generate_suggestion(
    err: &minijinja::Error,
    kind: TemplateErrorKind,
    data_keys: &[String],
) -> Option<String> {
    let detailed = format!("{:#}", err);

    match kind {
        TemplateErrorKind::UndefinedVariable => extract_expression_from_display(&detailed)
            .and_then(|var| suggest_undefined_variable(&var, data_keys))
            .or_else(|| {
                Some("Check spelling, or test the value with `is defined` first.".to_string())
            }),
        TemplateErrorKind::MissingLookup => Some(suggest_missing_lookup()),
        TemplateErrorKind::UnknownFilter => extract_filter_from_display(&detailed)
            .or_else(|| err.detail().and_then(extract_quoted_name))
            .and_then(|name| suggest_unknown_filter(&name)),
        TemplateErrorKind::SyntaxError => Some(
            "Check bracket matching: `{{ }}` for expressions, `{% %}` for statements, `{# #}` for comments"
                .to_string(),
        ),
        TemplateErrorKind::TemplateNotFound => Some(
            "Included templates are looked up by path relative to the template directory"
                .to_string(),
        ),
        _ => None,
    }
}

/// Rendering one template failed
#[derive(Error, Debug, Diagnostic)]
pub enum RenderError {
    #[error("Failed to render {template}")]
    #[diagnostic(code(tablegen::render::template))]
    Template {
        template: TemplateRef,
        #[source]
        #[diagnostic_source]
        source: TemplateError,
    },

    #[error("Failed to write {} for {template}", path.display())]
    #[diagnostic(code(tablegen::render::write))]
    Write {
        template: TemplateRef,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl RenderError {
    /// The template that failed
    pub fn template(&self) -> &TemplateRef {
        match self {
            Self::Template { template, .. } | Self::Write { template, .. } => template,
        }
    }

    /// The underlying template error, when rendering (not writing) failed
    pub fn template_error(&self) -> Option<&TemplateError> {
        match self {
            Self::Template { source, .. } => Some(source),
            Self::Write { .. } => None,
        }
    }
}

/// Outcome of rendering a template set
#[derive(Debug, Default)]
pub struct RenderReport {
    /// Files written, in discovery order
    pub rendered: Vec<RenderedFile>,

    /// Templates that failed, in discovery order
    pub failures: Vec<RenderError>,

    /// Templates never attempted because an earlier one failed
    pub skipped: Vec<TemplateRef>,
}

impl RenderReport {
    /// Create a new empty report
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_success(&mut self, file: RenderedFile) {
        self.rendered.push(file);
    }

    pub fn add_failure(&mut self, error: RenderError) {
        self.failures.push(error);
    }

    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn is_success(&self) -> bool {
        !self.has_errors()
    }

    /// Summary message: "2 templates failed, 5 rendered"
    pub fn summary(&self) -> String {
        let failed_word = if self.failures.len() == 1 {
            "template"
        } else {
            "templates"
        };
        let mut summary = format!(
            "{} {} failed, {} rendered",
            self.failures.len(),
            failed_word,
            self.rendered.len()
        );
        if !self.skipped.is_empty() {
            summary.push_str(&format!(", {} skipped", self.skipped.len()));
        }
        summary
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, TemplateError>;
