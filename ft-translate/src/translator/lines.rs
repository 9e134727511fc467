use super::comments::split_comment;

/// One logical statement line: continuation lines ending in `&` are joined.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct SourceLine {
    /// One-based number of the first physical line.
    pub(super) number: usize,
    /// Code with the comment removed, trimmed.
    pub(super) code: String,
    /// Comment text after `!`, verbatim.
    pub(super) comment: Option<String>,
}

pub(super) fn logical_lines(source: &str) -> Vec<SourceLine> {
    let mut out = Vec::new();
    let mut pending: Option<SourceLine> = None;

    for (idx, raw) in source.lines().enumerate() {
        let scanned = split_comment(raw);
        let mut code = scanned.code.trim();
        let comment = scanned.comment.map(str::to_string);

        if let Some(mut line) = pending.take() {
            code = code.strip_prefix('&').map_or(code, str::trim_start);
            let continues = code.ends_with('&');
            let code = code.trim_end_matches('&').trim_end();
            if !code.is_empty() {
                if !line.code.is_empty() {
                    line.code.push(' ');
                }
                line.code.push_str(code);
            }
            line.comment = join_comments(line.comment, comment);
            if continues {
                pending = Some(line);
            } else {
                out.push(line);
            }
            continue;
        }

        let continues = code.ends_with('&');
        let line = SourceLine {
            number: idx + 1,
            code: code.trim_end_matches('&').trim_end().to_string(),
            comment,
        };
        if continues {
            pending = Some(line);
        } else {
            out.push(line);
        }
    }

    out.extend(pending);
    out
}

fn join_comments(first: Option<String>, second: Option<String>) -> Option<String> {
    match (first, second) {
        (Some(mut first), Some(second)) => {
            first.push_str(&second);
            Some(first)
        }
        (first, second) => first.or(second),
    }
}

#[cfg(test)]
mod tests {
    use super::logical_lines;

    #[test]
    fn continuation_lines_are_joined() {
        let lines = logical_lines("x = a + &\n    & b + &\n  c ! sum\ny = 1\n");
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].number, 1);
        assert_eq!(lines[0].code, "x = a + b + c");
        assert_eq!(lines[0].comment.as_deref(), Some(" sum"));
        assert_eq!(lines[1].number, 4);
        assert_eq!(lines[1].code, "y = 1");
    }

    #[test]
    fn blank_and_comment_lines_keep_their_numbers() {
        let lines = logical_lines("\n! header\nx = 1");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].code, "");
        assert_eq!(lines[1].comment.as_deref(), Some(" header"));
        assert_eq!(lines[2].number, 3);
    }

    #[test]
    fn dangling_continuation_is_flushed() {
        let lines = logical_lines("x = 1 + &");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].code, "x = 1 +");
    }
}
