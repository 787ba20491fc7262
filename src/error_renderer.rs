//! Error rendering using ariadne
//!
//! Evaluation errors point at the node that failed. When the expression was
//! built with its source text, the error is rendered as an annotated snippet;
//! otherwise only the headline, help and cause are printed.

use crate::{Diagnostic, Error, Severity};
use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};
use std::io::Write;

const SOURCE_ID: &str = "<expression>";

/// Render an error with formatting to stderr
///
/// # Example
/// ```no_run
/// use quill::ast::builder::property;
/// use quill::{render_error, Error, Expression, StandardEvaluationContext};
///
/// let expr = Expression::new(property("missing").at(0, 7)).with_source("missing");
/// let context = StandardEvaluationContext::new();
/// if let Err(e) = expr.get_value(&context) {
///     render_error(&Error::from_eval(&expr, e));
/// }
/// ```
pub fn render_error(error: &Error) {
    render_error_to_writer(error, &mut std::io::stderr(), true).ok();
}

/// Render an error to a specific writer
pub fn render_error_to(error: &Error, writer: &mut dyn Write) -> std::io::Result<()> {
    render_error_to_writer(error, writer, true)
}

/// Render an error to a String (useful for logs, web UIs, etc.)
pub fn render_error_to_string(error: &Error) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, &mut buf, true).ok();
    String::from_utf8_lossy(&buf).to_string()
}

/// Render an error to a String without color codes (useful for tests)
pub fn render_error_to_string_no_color(error: &Error) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, &mut buf, false).ok();
    String::from_utf8_lossy(&buf).to_string()
}

fn render_error_to_writer(
    error: &Error,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    let diagnostic = error.to_diagnostic();
    let cause = error.error.cause().map(|cause| cause.to_string());
    if error.expression.is_empty() {
        return render_plain(&diagnostic, cause.as_deref(), writer);
    }
    render_diagnostic(
        &error.expression,
        &diagnostic,
        cause.as_deref(),
        writer,
        use_color,
    )
}

fn render_plain(
    diagnostic: &Diagnostic,
    cause: Option<&str>,
    writer: &mut dyn Write,
) -> std::io::Result<()> {
    writeln!(writer, "{diagnostic}")?;
    if let Some(help) = &diagnostic.help {
        writeln!(writer, "  help: {help}")?;
    }
    if let Some(cause) = cause {
        writeln!(writer, "  caused by: {cause}")?;
    }
    Ok(())
}

fn render_diagnostic(
    source: &str,
    diagnostic: &Diagnostic,
    cause: Option<&str>,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    let mut colors = ColorGenerator::new();
    colors.next(); // Skip the first color.

    let kind = match diagnostic.severity {
        Severity::Error => ReportKind::Error,
        Severity::Warning => ReportKind::Warning,
        Severity::Info => ReportKind::Advice,
    };

    // Spans of trees built by hand may run past the source.
    let end = diagnostic.span.end().min(source.len());
    let start = diagnostic.span.start().min(end);
    let span = start..end;

    let mut report = Report::build(kind, (SOURCE_ID, span.clone()))
        .with_message(&diagnostic.message)
        .with_config(ariadne::Config::default().with_color(use_color));

    if let Some(code) = &diagnostic.code {
        report = report.with_code(code);
    }

    report = report.with_label(
        Label::new((SOURCE_ID, span))
            .with_message(&diagnostic.message)
            .with_color(colors.next()),
    );

    if let Some(help) = &diagnostic.help {
        report = report.with_help(help);
    }
    if let Some(cause) = cause {
        report = report.with_note(format!("caused by: {cause}"));
    }

    report
        .finish()
        .write((SOURCE_ID, Source::from(source)), &mut *writer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::BinaryOp;
    use crate::ast::builder::{binary, chain, int, method, null, property};
    use crate::{EvalError, EvalErrorKind, Expression, StandardEvaluationContext};

    fn failure(expr: &Expression) -> Error {
        let context = StandardEvaluationContext::new();
        let error = expr.get_value(&context).unwrap_err();
        Error::from_eval(expr, error)
    }

    #[test]
    fn test_render_division_by_zero() {
        let expr = Expression::new(binary(BinaryOp::Div, int(7).at(0, 1), int(0).at(4, 5)).at(0, 5))
            .with_source("7 / 0");

        let output = render_error_to_string_no_color(&failure(&expr));

        assert!(output.contains("Error"));
        assert!(output.contains("E1021"));
        assert!(output.contains("7 / 0"));
    }

    #[test]
    fn test_render_null_navigation_includes_help() {
        let expr = Expression::new(
            chain(vec![null().at(0, 4), method("size", vec![]).at(5, 11)]).at(0, 11),
        )
        .with_source("null.size()");

        let output = render_error_to_string_no_color(&failure(&expr));

        assert!(output.contains("null.size()"));
        assert!(output.contains("?."));
    }

    #[test]
    fn test_render_without_source_prints_headline() {
        let expr = Expression::new(property("missing"));
        let error = failure(&expr);

        let output = render_error_to_string_no_color(&error);

        assert!(output.starts_with("error[E1003]"), "{output}");
        assert_eq!(output.lines().count(), 2);
    }

    #[test]
    fn test_render_clamps_span_past_source() {
        let error = Error::new(
            "x",
            EvalError::new(EvalErrorKind::DivisionByZero).at(&crate::Span::new(0, 40)),
        );

        let output = render_error_to_string_no_color(&error);

        assert!(output.lines().count() > 1);
    }

    #[test]
    fn test_render_to_string_captures_color() {
        let expr = Expression::new(binary(BinaryOp::Mod, int(1).at(0, 1), int(0).at(4, 5)).at(0, 5))
            .with_source("1 % 0");

        let colored = render_error_to_string(&failure(&expr));
        let plain = render_error_to_string_no_color(&failure(&expr));

        assert!(colored.contains('\u{1b}'));
        assert!(!plain.contains('\u{1b}'));
    }
}
