#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScannedLine<'a> {
    /// Code before the comment marker, right-trimmed.
    pub code: &'a str,
    /// Text after the marker, verbatim (leading space included).
    pub comment: Option<&'a str>,
}

/// Byte offset of the first `!` outside a quoted span.
pub fn find_comment_start(line: &str) -> Option<usize> {
    let mut in_single = false;
    let mut in_double = false;

    for (idx, ch) in line.char_indices() {
        match ch {
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '!' if !in_single && !in_double => return Some(idx),
            _ => {}
        }
    }
    None
}

pub fn split_comment(line: &str) -> ScannedLine<'_> {
    match find_comment_start(line) {
        Some(idx) => ScannedLine {
            code: line[..idx].trim_end(),
            comment: Some(&line[idx + 1..]),
        },
        None => ScannedLine {
            code: line,
            comment: None,
        },
    }
}

/// Rewrites `!` comments as `//` comments. Whole-line comments keep their
/// indentation; lines without an unquoted marker come back unchanged.
pub fn normalize_comment(line: &str) -> String {
    let scanned = split_comment(line);
    match scanned.comment {
        None => line.to_string(),
        Some(comment) if scanned.code.trim().is_empty() => {
            let indent = &line[..line.len() - line.trim_start().len()];
            format!("{indent}{}", line_comment(comment))
        }
        Some(comment) => {
            let mut code = scanned.code.to_string();
            attach_comment(&mut code, comment);
            code
        }
    }
}

/// A whole-line C++ comment carrying `comment` verbatim.
pub(super) fn line_comment(comment: &str) -> String {
    format!("//{comment}")
}

/// Appends `comment` to emitted code as a trailing C++ comment.
pub(super) fn attach_comment(code: &mut String, comment: &str) {
    code.push(' ');
    code.push_str(&line_comment(comment));
}

#[cfg(test)]
mod tests {
    use super::{
        attach_comment, find_comment_start, line_comment, normalize_comment, split_comment,
    };

    #[test]
    fn trailing_comment_is_split_from_code() {
        let scanned = split_comment("x = 1 ! note");
        assert_eq!(scanned.code, "x = 1");
        assert_eq!(scanned.comment, Some(" note"));
    }

    #[test]
    fn markers_inside_quotes_are_ignored() {
        assert_eq!(find_comment_start("print *, 'hi!' ! done"), Some(15));
        assert_eq!(find_comment_start("print *, \"it's!\""), None);
        assert_eq!(find_comment_start("print *, 'say \"!\"'"), None);
    }

    #[test]
    fn whole_line_comment_keeps_indentation() {
        assert_eq!(normalize_comment("   ! loop body"), "   // loop body");
        assert_eq!(normalize_comment("!"), "//");
    }

    #[test]
    fn trailing_comment_is_rejoined_after_code() {
        assert_eq!(normalize_comment("x = 1   ! note"), "x = 1 // note");
    }

    #[test]
    fn line_without_marker_is_unchanged() {
        assert_eq!(normalize_comment("  y = 'a!b'"), "  y = 'a!b'");
    }

    #[test]
    fn trailing_comment_is_attached_after_a_space() {
        let mut code = "x = 1;".to_string();
        attach_comment(&mut code, " note");
        assert_eq!(code, "x = 1; // note");
        assert_eq!(line_comment(""), "//");
    }
}
