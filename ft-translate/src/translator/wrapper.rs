use super::lowering::{EmittedLine, Placement};

/// Renders emitted lines, synthesizing `int main()` around loose top-level
/// statements when the source has no `program` block.
pub(super) fn wrap_entry_point(
    lines: Vec<EmittedLine>,
    entry_declared: bool,
    indent_width: usize,
) -> Vec<String> {
    let needs_entry = !entry_declared
        && lines
            .iter()
            .any(|line| line.placement == Placement::Loose && !line.trivia);
    if !needs_entry {
        return lines
            .iter()
            .map(|line| render(line, 0, indent_width))
            .collect();
    }

    let (unit, loose): (Vec<EmittedLine>, Vec<EmittedLine>) = lines
        .into_iter()
        .partition(|line| line.placement == Placement::Unit);

    let mut out: Vec<String> = unit
        .iter()
        .map(|line| render(line, 0, indent_width))
        .collect();
    if out.last().is_some_and(|last| !last.is_empty()) {
        out.push(String::new());
    }

    let start = loose.iter().position(|line| !is_blank(line)).unwrap_or(0);
    let end = loose
        .iter()
        .rposition(|line| !is_blank(line))
        .map_or(start, |idx| idx + 1);
    out.push("int main() {".to_string());
    out.extend(
        loose[start..end]
            .iter()
            .map(|line| render(line, 1, indent_width)),
    );
    out.push(format!("{}return 0;", " ".repeat(indent_width)));
    out.push("}".to_string());
    out
}

fn is_blank(line: &EmittedLine) -> bool {
    line.trivia && line.text.is_empty()
}

fn render(line: &EmittedLine, extra_depth: usize, indent_width: usize) -> String {
    if line.text.is_empty() {
        return String::new();
    }
    format!(
        "{}{}",
        " ".repeat((line.depth + extra_depth) * indent_width),
        line.text
    )
}
