//! Ariadne-based diagnostic rendering for type errors.
//!
//! Every `TypeError` is first described as a code, a message, a list of
//! labeled spans and an optional help line. The description is then
//! rendered either as an ariadne report or as a single JSON object per
//! diagnostic for tooling.

use std::ops::Range;

use ariadne::{Color, Config, IndexType, Label, Report, ReportKind, Source};
use serde::Serialize;

use tarn_common::span::{LineIndex, Span};
use tarn_common::ty::Ty;

use crate::builtins::TYPE_NAMES;
use crate::error::{ConstraintOrigin, TypeError};

// ── Options ────────────────────────────────────────────────────────────

/// How diagnostics are rendered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiagnosticOptions {
    /// Colorize ariadne output.
    pub color: bool,
    /// Emit one JSON object per diagnostic instead of a report.
    pub json: bool,
}

impl DiagnosticOptions {
    /// Plain text without ANSI escapes, for logs and snapshots.
    pub fn colorless() -> Self {
        DiagnosticOptions {
            color: false,
            json: false,
        }
    }

    /// Machine-readable output.
    pub fn json_mode() -> Self {
        DiagnosticOptions {
            color: false,
            json: true,
        }
    }
}

impl Default for DiagnosticOptions {
    fn default() -> Self {
        DiagnosticOptions {
            color: true,
            json: false,
        }
    }
}

// ── Error Codes ────────────────────────────────────────────────────────

/// Stable code of each error kind.
pub fn error_code(err: &TypeError) -> &'static str {
    match err {
        TypeError::TypeMismatch { .. } => "E0001",
        TypeError::UndeclaredVariable { .. } => "E0002",
        TypeError::UndeclaredFunction { .. } => "E0003",
        TypeError::CouldNotInferType { .. } => "E0004",
        TypeError::IllegalRedefine { .. } => "E0005",
        TypeError::NotAssignable { .. } => "E0006",
        TypeError::UnknownType { .. } => "E0007",
        TypeError::InsufficientPreprocessing { .. } => "E0900",
    }
}

// ── Description ────────────────────────────────────────────────────────

struct DiagLabel {
    span: Span,
    message: String,
    primary: bool,
}

struct Description {
    code: &'static str,
    message: String,
    labels: Vec<DiagLabel>,
    help: Option<String>,
}

fn primary(span: Span, message: impl Into<String>) -> DiagLabel {
    DiagLabel {
        span,
        message: message.into(),
        primary: true,
    }
}

fn secondary(span: Span, message: impl Into<String>) -> DiagLabel {
    DiagLabel {
        span,
        message: message.into(),
        primary: false,
    }
}

fn numeric_hint(expected: &Ty, found: &Ty) -> Option<String> {
    let numeric = [Ty::int(), Ty::float()];
    if numeric.contains(expected) && numeric.contains(found) && expected != found {
        Some("Int and Float are distinct types and never convert implicitly".to_string())
    } else {
        None
    }
}

fn mismatch_labels(expected: &Ty, found: &Ty, origin: &ConstraintOrigin) -> (Vec<DiagLabel>, Option<String>) {
    let both = format!("expected {}, found {}", expected, found);
    match origin {
        ConstraintOrigin::Assignment { target, span } => (
            vec![primary(*span, format!("`{}` has type {}, found {}", target, expected, found))],
            numeric_hint(expected, found),
        ),
        ConstraintOrigin::Annotation {
            annotation_span,
            value_span,
            ..
        } => (
            vec![
                primary(*value_span, format!("found {}", found)),
                secondary(*annotation_span, format!("expected {} from annotation", expected)),
            ],
            numeric_hint(expected, found),
        ),
        ConstraintOrigin::Condition { span } => (
            vec![primary(*span, both)],
            Some("conditions must be Bool".to_string()),
        ),
        ConstraintOrigin::ForBound { span } => (
            vec![primary(*span, both)],
            Some("loop bounds must be Int".to_string()),
        ),
        ConstraintOrigin::Return { return_span, fn_span } => (
            vec![
                primary(*return_span, both),
                secondary(*fn_span, format!("this routine returns {}", expected)),
            ],
            numeric_hint(expected, found),
        ),
        ConstraintOrigin::MissingReturn { fn_span } => (
            vec![primary(*fn_span, format!("declared to return {} but never returns", expected))],
            Some("add a `return`, or drop the return type to make this a procedure".to_string()),
        ),
        ConstraintOrigin::StoredValue { span, .. } => (
            vec![primary(*span, format!("this call returns {}", found))],
            Some("call a procedure as a statement on its own".to_string()),
        ),
        ConstraintOrigin::Builtin => (vec![primary(Span::default(), both)], None),
    }
}

fn describe(error: &TypeError) -> Description {
    let code = error_code(error);
    let message = error.to_string();
    let (labels, help) = match error {
        TypeError::TypeMismatch {
            expected,
            found,
            origin,
        } => mismatch_labels(expected, found, origin),
        TypeError::UndeclaredVariable { name, span } => (
            vec![primary(*span, "not found in this scope")],
            Some(format!("declare it first with `{} := ...`", name)),
        ),
        TypeError::UndeclaredFunction { span, .. } => {
            (vec![primary(*span, "no overload matches these arguments")], None)
        }
        TypeError::CouldNotInferType { ty, span } => match ty {
            Ty::Variant(_) => (
                vec![primary(*span, format!("could be any of {}", ty))],
                Some("add a type annotation to pick one".to_string()),
            ),
            _ => (vec![primary(*span, "type cannot be determined")], None),
        },
        TypeError::IllegalRedefine {
            span, previous, ..
        } => (
            vec![
                primary(*span, "redefined here"),
                secondary(*previous, "first defined here"),
            ],
            None,
        ),
        TypeError::NotAssignable { span, .. } => (
            vec![primary(*span, "parameters and loop variables cannot be reassigned")],
            None,
        ),
        TypeError::UnknownType { span, .. } => (
            vec![primary(*span, "unknown type")],
            Some(format!("expected one of {}", TYPE_NAMES.join(", "))),
        ),
        TypeError::InsufficientPreprocessing { span, .. } => (
            vec![primary(*span, "here")],
            Some("this is a bug in the compiler".to_string()),
        ),
    };
    Description {
        code,
        message,
        labels,
        help,
    }
}

// ── Rendering ──────────────────────────────────────────────────────────

/// Render a type error as a diagnostic string.
pub fn render_diagnostic(
    error: &TypeError,
    source: &str,
    filename: &str,
    options: &DiagnosticOptions,
) -> String {
    let desc = describe(error);
    if options.json {
        render_json(&desc, source, filename)
    } else {
        render_report(&desc, source, options)
    }
}

fn render_report(desc: &Description, source: &str, options: &DiagnosticOptions) -> String {
    let config = Config::default()
        .with_color(options.color)
        .with_index_type(IndexType::Byte);
    let source_len = source.len();

    // Clamp a span into the source; ariadne needs at least one character.
    let clamp = |span: Span| -> Range<usize> {
        let s = (span.start as usize).min(source_len);
        let e = (span.end as usize).min(source_len).max(s);
        if s == e {
            s..e.saturating_add(1).min(source_len)
        } else {
            s..e
        }
    };

    let anchor = desc
        .labels
        .iter()
        .find(|l| l.primary)
        .map(|l| clamp(l.span))
        .unwrap_or(0..0);

    let mut builder = Report::build(ReportKind::Error, anchor)
        .with_code(desc.code)
        .with_message(&desc.message)
        .with_config(config);
    for label in &desc.labels {
        let color = if label.primary { Color::Red } else { Color::Blue };
        builder.add_label(
            Label::new(clamp(label.span))
                .with_message(&label.message)
                .with_color(color),
        );
    }
    if let Some(help) = &desc.help {
        builder.set_help(help);
    }

    let mut buf = Vec::new();
    if builder.finish().write(Source::from(source), &mut buf).is_err() {
        return format!("error[{}]: {}", desc.code, desc.message);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

#[derive(Serialize)]
struct JsonDiagnostic<'a> {
    code: &'a str,
    severity: &'a str,
    message: &'a str,
    file: &'a str,
    line: u32,
    column: u32,
    spans: Vec<JsonSpan<'a>>,
    help: Option<&'a str>,
}

#[derive(Serialize)]
struct JsonSpan<'a> {
    start: u32,
    end: u32,
    line: u32,
    column: u32,
    label: &'a str,
    primary: bool,
}

fn render_json(desc: &Description, source: &str, filename: &str) -> String {
    let index = LineIndex::new(source);
    let spans: Vec<JsonSpan<'_>> = desc
        .labels
        .iter()
        .map(|label| {
            let (line, column) = index.position(label.span);
            JsonSpan {
                start: label.span.start,
                end: label.span.end,
                line,
                column,
                label: &label.message,
                primary: label.primary,
            }
        })
        .collect();
    let (line, column) = spans
        .iter()
        .find(|s| s.primary)
        .map(|s| (s.line, s.column))
        .unwrap_or((1, 1));
    let diag = JsonDiagnostic {
        code: desc.code,
        severity: "error",
        message: &desc.message,
        file: filename,
        line,
        column,
        spans,
        help: desc.help.as_deref(),
    };
    serde_json::to_string(&diag).unwrap_or_else(|_| desc.message.clone())
}
