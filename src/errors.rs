//! Quill error handling - unified diagnostic API.
//!
//! Expected parse failure is a boolean `false` travelling through the
//! combinators; it never appears here. Everything in this module is fatal:
//! either the outermost parse converting a final failure into an error, or
//! an engine misconfiguration (bad call target, type mismatch, missing
//! dispatch key). All fatal errors carry a miette span into the input text.

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceSpan};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// SOURCE CONTEXT - Error reporting infrastructure
// ============================================================================

/// The input text an error points into, wrapped for miette rendering.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    /// Create a source context from the parse input.
    pub fn from_input(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Create a fallback when no input is available.
    /// Use only for errors raised outside a running parse.
    pub fn fallback(context: &str) -> Self {
        Self {
            name: "fallback".to_string(),
            content: format!("// {}", context),
        }
    }

    /// Convert to NamedSource for use with miette error reporting.
    pub fn to_named_source(&self) -> Arc<NamedSource<String>> {
        Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))
    }
}

impl Default for SourceContext {
    fn default() -> Self {
        Self::fallback("default context")
    }
}

/// The single error type - no wrapper, no nesting, just essential data.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct QuillError {
    /// What went wrong (kind-specific data).
    pub kind: ErrorKind,
    /// Where it happened in the input.
    pub source_info: SourceInfo,
    /// How to help (auto-populated based on context).
    pub diagnostic_info: DiagnosticInfo,
}

/// All failure modes of the engine as a clean enum.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    // Parse-level failures: the grammar did not accept the input.
    ParseFailed {
        rule: String,
    },
    IncompleteParse {
        consumed: usize,
        len: usize,
    },

    // Engine misconfiguration: the grammar or a combinator is malformed.
    BadCallTarget {
        found: String,
    },
    TypeMismatch {
        expected: String,
        actual: String,
    },
    MissingKey {
        var: String,
        key: String,
    },
    MissingChild {
        combinator: String,
    },
    UndefinedRule {
        name: String,
    },
}

/// Source information attached to every error.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub source: Arc<NamedSource<String>>,
    pub primary_span: SourceSpan,
    pub phase: String,
}

/// Diagnostic enhancement data.
#[derive(Debug, Clone)]
pub struct DiagnosticInfo {
    pub help: Option<String>,
    pub error_code: String,
}

/// Context-aware error creation - the parser knows where the cursor is and
/// what input it is looking at, so it builds the diagnostics.
pub trait ErrorReporting {
    /// Create an error with context-appropriate source information.
    fn report(&self, kind: ErrorKind, span: SourceSpan) -> QuillError;

    fn parse_failed(&self, rule: &str, span: SourceSpan) -> QuillError {
        self.report(ErrorKind::ParseFailed { rule: rule.into() }, span)
    }

    fn incomplete_parse(&self, consumed: usize, len: usize, span: SourceSpan) -> QuillError {
        self.report(ErrorKind::IncompleteParse { consumed, len }, span)
    }

    fn bad_call_target(&self, found: &str, span: SourceSpan) -> QuillError {
        self.report(ErrorKind::BadCallTarget { found: found.into() }, span)
    }

    fn type_mismatch(&self, expected: &str, actual: &str, span: SourceSpan) -> QuillError {
        self.report(
            ErrorKind::TypeMismatch {
                expected: expected.into(),
                actual: actual.into(),
            },
            span,
        )
    }

    fn missing_key(&self, var: &str, key: &str, span: SourceSpan) -> QuillError {
        self.report(
            ErrorKind::MissingKey {
                var: var.into(),
                key: key.into(),
            },
            span,
        )
    }

    fn missing_child(&self, combinator: &str, span: SourceSpan) -> QuillError {
        self.report(
            ErrorKind::MissingChild {
                combinator: combinator.into(),
            },
            span,
        )
    }

    fn undefined_rule(&self, name: &str, span: SourceSpan) -> QuillError {
        self.report(ErrorKind::UndefinedRule { name: name.into() }, span)
    }
}

impl ErrorKind {
    /// Get the error category for test assertions.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ParseFailed { .. } | Self::IncompleteParse { .. } => ErrorCategory::Parse,

            Self::BadCallTarget { .. }
            | Self::TypeMismatch { .. }
            | Self::MissingKey { .. }
            | Self::MissingChild { .. }
            | Self::UndefinedRule { .. } => ErrorCategory::Engine,
        }
    }

    /// Get error code suffix for diagnostic codes.
    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::ParseFailed { .. } => "parse_failed",
            Self::IncompleteParse { .. } => "incomplete_parse",
            Self::BadCallTarget { .. } => "bad_call_target",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::MissingKey { .. } => "missing_key",
            Self::MissingChild { .. } => "missing_child",
            Self::UndefinedRule { .. } => "undefined_rule",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Parse,
    Engine,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::ParseFailed { rule } => {
                write!(f, "Parser failed (rule '{}')", rule)
            }
            ErrorKind::IncompleteParse { consumed, len } => {
                write!(
                    f,
                    "Parser finished before end of input ({} of {} chars consumed)",
                    consumed, len
                )
            }
            ErrorKind::BadCallTarget { found } => {
                write!(f, "Engine error: cannot call a {}", found)
            }
            ErrorKind::TypeMismatch { expected, actual } => {
                write!(f, "Engine error: expected {}, got {}", expected, actual)
            }
            ErrorKind::MissingKey { var, key } => {
                write!(f, "Engine error: no dispatch entry for {} = '{}'", var, key)
            }
            ErrorKind::MissingChild { combinator } => {
                write!(f, "Engine error: missing child in {}", combinator)
            }
            ErrorKind::UndefinedRule { name } => {
                write!(f, "Engine error: undefined rule '{}'", name)
            }
        }
    }
}

impl Diagnostic for QuillError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(&self.diagnostic_info.error_code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diagnostic_info
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let labels = vec![LabeledSpan::new_with_span(
            Some(self.primary_label()),
            self.source_info.primary_span,
        )];
        Some(Box::new(labels.into_iter()))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&*self.source_info.source)
    }
}

impl QuillError {
    fn primary_label(&self) -> String {
        match &self.kind {
            ErrorKind::ParseFailed { .. } => "no rule matched here".into(),
            ErrorKind::IncompleteParse { .. } => "parse stopped here".into(),
            ErrorKind::BadCallTarget { .. } => "not callable".into(),
            ErrorKind::TypeMismatch { .. } => "wrong result type".into(),
            ErrorKind::MissingKey { .. } => "dispatched here".into(),
            ErrorKind::MissingChild { .. } => "incomplete combinator".into(),
            ErrorKind::UndefinedRule { .. } => "referenced here".into(),
        }
    }
}

/// Creates a placeholder span for errors not tied to a cursor position.
/// This makes the intent of using an empty span explicit and searchable.
pub fn unspanned() -> SourceSpan {
    SourceSpan::from(0..0)
}

/// General-purpose error creation context for callers that are not a live
/// parser (grammar construction, option validation).
pub struct ReportContext {
    pub source: SourceContext,
    pub phase: String,
}

impl ReportContext {
    pub fn new(source: SourceContext, phase: String) -> Self {
        Self { source, phase }
    }
}

impl ErrorReporting for ReportContext {
    fn report(&self, kind: ErrorKind, span: SourceSpan) -> QuillError {
        let error_code = format!("quill::{}::{}", self.phase, kind.code_suffix());

        QuillError {
            kind,
            source_info: SourceInfo {
                source: self.source.to_named_source(),
                primary_span: span,
                phase: self.phase.clone(),
            },
            diagnostic_info: DiagnosticInfo {
                help: None,
                error_code,
            },
        }
    }
}

// ============================================================================
// ERROR FORMATTING UTILITIES
// ============================================================================

/// Prints a QuillError with full miette diagnostics.
///
/// This provides rich error formatting with source spans and context.
/// Use this for user-facing error display.
pub fn print_error(error: QuillError) {
    use miette::Report;
    let report = Report::new(error);
    eprintln!("{report:?}");
}
