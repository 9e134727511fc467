#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Nesting {
    /// Only `[ ]` and the `(/ /)` constructor change depth. Used for
    /// `parameter` lists, where parentheses appear in array sizes.
    Brackets,
    /// `[`, `]`, `(` and `)` all change depth. Used for I/O lists, where
    /// call expressions such as `pow(i, 2)` must stay whole.
    BracketsAndParens,
}

impl Nesting {
    fn opens(self, ch: char, next: Option<char>) -> bool {
        match self {
            Nesting::Brackets => ch == '[' || (ch == '(' && next == Some('/')),
            Nesting::BracketsAndParens => matches!(ch, '[' | '('),
        }
    }

    fn closes(self, ch: char, next: Option<char>) -> bool {
        match self {
            Nesting::Brackets => ch == ']' || (ch == '/' && next == Some(')')),
            Nesting::BracketsAndParens => matches!(ch, ']' | ')'),
        }
    }
}

/// Splits `input` on commas at nesting depth zero and trims every item.
///
/// Depth is not checked for balance: every opener counts up and every closer
/// counts down, whatever their pairing. Unbalanced input never fails, it just
/// splits wherever the running depth happens to be zero.
pub fn split_top_level(input: &str, nesting: Nesting) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    let mut depth = 0i32;
    let mut quote: Option<char> = None;

    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        if let Some(open) = quote {
            current.push(ch);
            if ch == open {
                quote = None;
            }
            continue;
        }

        match ch {
            '\'' | '"' => {
                quote = Some(ch);
                current.push(ch);
            }
            ch if nesting.opens(ch, chars.peek().copied()) => {
                depth += 1;
                current.push(ch);
            }
            ch if nesting.closes(ch, chars.peek().copied()) => {
                depth -= 1;
                current.push(ch);
            }
            ',' if depth == 0 => {
                out.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if !current.trim().is_empty() {
        out.push(current.trim().to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{Nesting, split_top_level};

    #[test]
    fn brackets_keep_initializer_lists_whole() {
        let items = split_top_level("n = 3, vec(n) = [3, 5, 10]", Nesting::Brackets);
        assert_eq!(items, vec!["n = 3", "vec(n) = [3, 5, 10]"]);
    }

    #[test]
    fn brackets_keep_slash_constructors_whole() {
        let items = split_top_level("v(3) = (/ 1, 2, 3 /), w = 2", Nesting::Brackets);
        assert_eq!(items, vec!["v(3) = (/ 1, 2, 3 /)", "w = 2"]);

        let items = split_top_level("n = a/2, m = (b)/(c)", Nesting::Brackets);
        assert_eq!(items, vec!["n = a/2", "m = (b)/(c)"]);
    }

    #[test]
    fn brackets_only_still_split_inside_parens() {
        let items = split_top_level("f(a, b)", Nesting::Brackets);
        assert_eq!(items, vec!["f(a", "b)"]);
    }

    #[test]
    fn parens_keep_call_arguments_whole() {
        let items = split_top_level("vec(i), pow(i, 2), [1, 2]", Nesting::BracketsAndParens);
        assert_eq!(items, vec!["vec(i)", "pow(i, 2)", "[1, 2]"]);
    }

    #[test]
    fn quoted_commas_do_not_split() {
        let items = split_top_level("'a, b', x", Nesting::BracketsAndParens);
        assert_eq!(items, vec!["'a, b'", "x"]);
    }

    #[test]
    fn unbalanced_input_is_best_effort() {
        // depth drops below zero after `]` and never returns, so nothing splits
        let items = split_top_level("a], b, [c", Nesting::Brackets);
        assert_eq!(items, vec!["a], b, [c"]);

        let items = split_top_level("[a, b", Nesting::Brackets);
        assert_eq!(items, vec!["[a, b"]);
    }

    #[test]
    fn trailing_separator_is_dropped() {
        let items = split_top_level("a, b,", Nesting::BracketsAndParens);
        assert_eq!(items, vec!["a", "b"]);
    }
}
