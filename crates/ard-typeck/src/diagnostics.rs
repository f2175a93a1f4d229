//! Diagnostic rendering.
//!
//! The checker's diagnostics are plain `{kind, message, range}` values;
//! rendering them for humans (ariadne reports with labeled spans) or
//! machines (one-line JSON) lives here and never changes the message
//! strings tests match against.

use ariadne::{Config, Label, Report, ReportKind, Source};

use crate::error::{Diagnostic, Severity};

/// Rendering options.
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticOptions {
    /// ANSI colors in terminal reports.
    pub color: bool,
    /// Emit one-line JSON instead of a terminal report.
    pub json: bool,
}

impl DiagnosticOptions {
    /// Colorless terminal output, for deterministic test assertions.
    pub fn colorless() -> Self {
        DiagnosticOptions { color: false, json: false }
    }

    /// One-line JSON output.
    pub fn json_mode() -> Self {
        DiagnosticOptions { color: false, json: true }
    }
}

impl Default for DiagnosticOptions {
    fn default() -> Self {
        DiagnosticOptions { color: true, json: false }
    }
}

/// Render a single diagnostic against its source file.
pub fn render_diagnostic(
    diag: &Diagnostic,
    source: &str,
    filename: &str,
    opts: &DiagnosticOptions,
) -> String {
    if opts.json {
        return serde_json::json!({
            "severity": match diag.kind {
                Severity::Error => "error",
                Severity::Warn => "warning",
            },
            "message": diag.message,
            "file": filename,
            "span": { "start": diag.range.start, "end": diag.range.end },
        })
        .to_string();
    }

    let kind = match diag.kind {
        Severity::Error => ReportKind::Error,
        Severity::Warn => ReportKind::Warning,
    };
    // Clamp the range so a diagnostic at end-of-input still renders.
    let max = source.len();
    let start = (diag.range.start as usize).min(max);
    let end = (diag.range.end as usize).clamp(start, max);

    let mut buffer = Vec::new();
    let report = Report::build(kind, (filename, start..end))
        .with_config(Config::default().with_color(opts.color))
        .with_message(&diag.message)
        .with_label(Label::new((filename, start..end)).with_message(&diag.message))
        .finish();
    report
        .write((filename, Source::from(source)), &mut buffer)
        .expect("writing a diagnostic to a Vec cannot fail");
    String::from_utf8(buffer).expect("ariadne produces UTF-8")
}

/// Render every diagnostic in order.
pub fn render_all(
    diags: &[Diagnostic],
    source: &str,
    filename: &str,
    opts: &DiagnosticOptions,
) -> Vec<String> {
    diags
        .iter()
        .map(|d| render_diagnostic(d, source, filename, opts))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ard_common::Span;

    fn mismatch() -> Diagnostic {
        Diagnostic {
            kind: Severity::Error,
            message: "Type mismatch: Expected Int, got Str".into(),
            range: Span::new(15, 19),
        }
    }

    #[test]
    fn terminal_report_contains_message_and_file() {
        let src = "let age: Int = \"32\"";
        let out = render_diagnostic(&mismatch(), src, "main.ard", &DiagnosticOptions::colorless());
        assert!(out.contains("Type mismatch: Expected Int, got Str"), "{out}");
        assert!(out.contains("main.ard"), "{out}");
    }

    #[test]
    fn warning_renders_as_warning() {
        let diag = Diagnostic {
            kind: Severity::Warn,
            message: "Duplicate import alias: io".into(),
            range: Span::new(0, 10),
        };
        let out = render_diagnostic(&diag, "use ard/io", "main.ard", &DiagnosticOptions::colorless());
        assert!(out.contains("Warning"), "{out}");
    }

    #[test]
    fn json_mode_is_one_line_and_parses() {
        let src = "let age: Int = \"32\"";
        let out = render_diagnostic(&mismatch(), src, "main.ard", &DiagnosticOptions::json_mode());
        assert!(!out.contains('\n'), "json should be one line: {out}");
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["severity"], "error");
        assert_eq!(parsed["span"]["start"], 15);
        assert_eq!(parsed["file"], "main.ard");
    }

    #[test]
    fn out_of_range_span_is_clamped() {
        let diag = Diagnostic {
            kind: Severity::Error,
            message: "Cannot use 'try' outside of a function".into(),
            range: Span::new(0, 999),
        };
        let out = render_diagnostic(&diag, "try f()", "main.ard", &DiagnosticOptions::colorless());
        assert!(out.contains("try"), "{out}");
    }
}
