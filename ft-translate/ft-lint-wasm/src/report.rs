use translate::{Diagnostic, TranslateError, render_diagnostic, translate};

const SOURCE_NAME: &str = "<input>";

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReportDiagnostic {
    pub line: usize,
    pub message: String,
    pub severity: Severity,
    pub rendered: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslateReport {
    /// `None` when a nesting error stopped the translation.
    pub output: Option<String>,
    pub diagnostics: Vec<ReportDiagnostic>,
}

impl TranslateReport {
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|diagnostic| diagnostic.severity == Severity::Error)
    }
}

pub fn translate_report(source: &str) -> TranslateReport {
    match translate(source) {
        Ok(translation) => TranslateReport {
            diagnostics: translation
                .diagnostics
                .iter()
                .map(|diagnostic| warning(source, diagnostic))
                .collect(),
            output: Some(translation.output),
        },
        Err(err) => TranslateReport {
            output: None,
            diagnostics: vec![error(&err)],
        },
    }
}

fn warning(source: &str, diagnostic: &Diagnostic) -> ReportDiagnostic {
    ReportDiagnostic {
        line: diagnostic.line,
        message: format!("{}: {}", diagnostic.kind.describe(), diagnostic.text),
        severity: Severity::Warning,
        rendered: render_diagnostic(SOURCE_NAME, source, diagnostic),
    }
}

fn error(err: &TranslateError) -> ReportDiagnostic {
    ReportDiagnostic {
        line: err.line(),
        message: err.to_string(),
        severity: Severity::Error,
        rendered: format!("error: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::{Severity, translate_report};

    #[test]
    fn clean_source_has_output_and_no_diagnostics() {
        let report = translate_report("x = 1\n");
        assert!(!report.has_errors());
        assert!(report.diagnostics.is_empty());
        assert!(
            report
                .output
                .as_deref()
                .is_some_and(|output| output.contains("  x = 1;"))
        );
    }

    #[test]
    fn pass_through_lines_are_warnings() {
        let report = translate_report("program p\n  select case (k)\nend program p\n");
        assert!(!report.has_errors());
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].line, 2);
        assert_eq!(report.diagnostics[0].severity, Severity::Warning);
        assert!(report.diagnostics[0].rendered.contains("<input>:2:3"));
    }

    #[test]
    fn nesting_errors_are_reported_without_output() {
        let report = translate_report("do i = 1, 3\n");
        assert!(report.has_errors());
        assert!(report.output.is_none());
        assert_eq!(report.diagnostics[0].line, 1);
        assert_eq!(report.diagnostics[0].severity.as_str(), "error");
    }
}
