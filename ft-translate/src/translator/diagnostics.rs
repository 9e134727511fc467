use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// No statement form matched; the line was copied through unchanged.
    PassThrough,
    /// A declaration item that could not be lowered was left out.
    DroppedDeclaration,
}

impl DiagnosticKind {
    pub fn describe(self) -> &'static str {
        match self {
            DiagnosticKind::PassThrough => "passed through unrecognized statement",
            DiagnosticKind::DroppedDeclaration => "dropped declaration item",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: usize,
    pub kind: DiagnosticKind,
    pub text: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}: {}: {}", self.line, self.kind.describe(), self.text)
    }
}

/// Renders a diagnostic with the offending source line underlined.
pub fn render_diagnostic(file_name: &str, source: &str, diagnostic: &Diagnostic) -> String {
    let Some(line_text) = diagnostic
        .line
        .checked_sub(1)
        .and_then(|idx| source.lines().nth(idx))
    else {
        return format!("warning: {diagnostic}");
    };
    let col = line_text.len() - line_text.trim_start().len() + 1;
    let width = line_text.trim().len().max(1);
    let pointer = format!("{}{}", " ".repeat(col - 1), "^".repeat(width));
    format!(
        "warning: {}\n --> {file_name}:{line}:{col}\n  |\n{line:>3} | {line_text}\n  | {pointer}",
        diagnostic.kind.describe(),
        line = diagnostic.line,
    )
}

#[cfg(test)]
mod tests {
    use super::{Diagnostic, DiagnosticKind, render_diagnostic};

    fn pass_through(line: usize, text: &str) -> Diagnostic {
        Diagnostic {
            line,
            kind: DiagnosticKind::PassThrough,
            text: text.to_string(),
        }
    }

    #[test]
    fn display_names_line_and_text() {
        assert_eq!(
            pass_through(4, "select case (k)").to_string(),
            "line 4: passed through unrecognized statement: select case (k)"
        );
    }

    #[test]
    fn render_underlines_the_statement() {
        let source = "x = 1\n  select case (k)\n";
        let rendered = render_diagnostic("demo.f90", source, &pass_through(2, "select case (k)"));
        assert_eq!(
            rendered,
            "warning: passed through unrecognized statement\n --> demo.f90:2:3\n  |\n  2 |   select case (k)\n  |   ^^^^^^^^^^^^^^^"
        );
    }

    #[test]
    fn render_falls_back_when_line_is_missing() {
        let rendered = render_diagnostic("demo.f90", "", &pass_through(9, "goto 10"));
        assert_eq!(
            rendered,
            "warning: line 9: passed through unrecognized statement: goto 10"
        );
    }
}
