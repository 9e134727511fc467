//! Tokenizer for expression text.
//!
//! Tokens keep their source spelling and whitespace is kept as its own token,
//! so a token list renders back to exactly the text it came from. Rewrites
//! operate on the grouped [`Node`] tree, which means they cannot fire inside
//! string literals or on a fragment of a longer identifier.

use super::{is_ident_continue, is_ident_start};

const DOTTED_OPERATORS: &[&str] = &[
    "and", "or", "not", "eqv", "neqv", "eq", "ne", "lt", "le", "gt", "ge", "true", "false",
];

const TWO_CHAR_OPERATORS: &[&str] = &["**", "==", "/=", "<=", ">=", "::", "=>"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) enum Token {
    Ident(String),
    Number(String),
    /// Raw literal, quotes included.
    Str(String),
    Op(String),
    Open(char),
    Close(char),
    Comma,
    Space(String),
}

impl Token {
    fn push_to(&self, out: &mut String) {
        match self {
            Token::Ident(text)
            | Token::Number(text)
            | Token::Str(text)
            | Token::Op(text)
            | Token::Space(text) => out.push_str(text),
            Token::Open(ch) | Token::Close(ch) => out.push(*ch),
            Token::Comma => out.push(','),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) enum Node {
    Token(Token),
    Group {
        open: char,
        close: char,
        children: Vec<Node>,
    },
}

impl Node {
    pub(super) fn ident(name: impl Into<String>) -> Self {
        Node::Token(Token::Ident(name.into()))
    }

    pub(super) fn op(op: impl Into<String>) -> Self {
        Node::Token(Token::Op(op.into()))
    }

    pub(super) fn number(text: impl Into<String>) -> Self {
        Node::Token(Token::Number(text.into()))
    }

    pub(super) fn parens(children: Vec<Node>) -> Self {
        Node::Group {
            open: '(',
            close: ')',
            children,
        }
    }

    pub(super) fn is_space(&self) -> bool {
        matches!(self, Node::Token(Token::Space(_)))
    }

    pub(super) fn is_paren_group(&self) -> bool {
        matches!(self, Node::Group { open: '(', .. })
    }

    pub(super) fn as_ident(&self) -> Option<&str> {
        match self {
            Node::Token(Token::Ident(name)) => Some(name),
            _ => None,
        }
    }
}

pub(super) fn tokenize(input: &str) -> Vec<Token> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0usize;

    while i < chars.len() {
        let ch = chars[i];

        if ch.is_whitespace() {
            let start = i;
            while i < chars.len() && chars[i].is_whitespace() {
                i += 1;
            }
            tokens.push(Token::Space(collect(&chars[start..i])));
            continue;
        }

        if is_ident_start(ch) {
            let start = i;
            while i < chars.len() && is_ident_continue(chars[i]) {
                i += 1;
            }
            tokens.push(Token::Ident(collect(&chars[start..i])));
            continue;
        }

        if ch == '.'
            && let Some(end) = dotted_operator_end(&chars, i)
        {
            tokens.push(Token::Op(collect(&chars[i..end])));
            i = end;
            continue;
        }

        if ch.is_ascii_digit() || (ch == '.' && chars.get(i + 1).is_some_and(char::is_ascii_digit))
        {
            let end = number_end(&chars, i);
            tokens.push(Token::Number(collect(&chars[i..end])));
            i = end;
            continue;
        }

        if ch == '\'' || ch == '"' {
            let end = string_end(&chars, i);
            tokens.push(Token::Str(collect(&chars[i..end])));
            i = end;
            continue;
        }

        match ch {
            '(' | '[' => tokens.push(Token::Open(ch)),
            ')' | ']' => tokens.push(Token::Close(ch)),
            ',' => tokens.push(Token::Comma),
            _ => {
                if let Some(next) = chars.get(i + 1) {
                    let pair: String = [ch, *next].iter().collect();
                    if TWO_CHAR_OPERATORS.contains(&pair.as_str()) {
                        tokens.push(Token::Op(pair));
                        i += 2;
                        continue;
                    }
                }
                tokens.push(Token::Op(ch.to_string()));
            }
        }
        i += 1;
    }

    tokens
}

/// Nests tokens into groups. A closer with no open group stays a plain
/// token; a group still open at the end is flattened back into its parent.
pub(super) fn group(tokens: Vec<Token>) -> Vec<Node> {
    let mut stack: Vec<(char, Vec<Node>)> = Vec::new();
    let mut current: Vec<Node> = Vec::new();

    for token in tokens {
        match token {
            Token::Open(open) => stack.push((open, std::mem::take(&mut current))),
            Token::Close(close) => match stack.pop() {
                Some((open, parent)) => {
                    let children = std::mem::replace(&mut current, parent);
                    current.push(Node::Group {
                        open,
                        close,
                        children,
                    });
                }
                None => current.push(Node::Token(Token::Close(close))),
            },
            other => current.push(Node::Token(other)),
        }
    }

    while let Some((open, mut parent)) = stack.pop() {
        parent.push(Node::Token(Token::Open(open)));
        parent.append(&mut current);
        current = parent;
    }
    current
}

pub(super) fn parse(input: &str) -> Vec<Node> {
    group(tokenize(input))
}

pub(super) fn render(nodes: &[Node]) -> String {
    let mut out = String::new();
    render_into(nodes, &mut out);
    out
}

fn render_into(nodes: &[Node], out: &mut String) {
    for node in nodes {
        match node {
            Node::Token(token) => token.push_to(out),
            Node::Group {
                open,
                close,
                children,
            } => {
                out.push(*open);
                render_into(children, out);
                out.push(*close);
            }
        }
    }
}

pub(super) fn trim_spaces(mut nodes: Vec<Node>) -> Vec<Node> {
    while nodes.last().is_some_and(Node::is_space) {
        nodes.pop();
    }
    let leading = nodes.iter().take_while(|node| node.is_space()).count();
    nodes.drain(..leading);
    nodes
}

fn collect(chars: &[char]) -> String {
    chars.iter().collect()
}

fn dotted_operator_end(chars: &[char], start: usize) -> Option<usize> {
    let mut end = start + 1;
    while end < chars.len() && chars[end].is_ascii_alphabetic() {
        end += 1;
    }
    if end == start + 1 || chars.get(end) != Some(&'.') {
        return None;
    }
    let word = collect(&chars[start + 1..end]).to_ascii_lowercase();
    DOTTED_OPERATORS
        .contains(&word.as_str())
        .then_some(end + 1)
}

fn number_end(chars: &[char], start: usize) -> usize {
    let mut i = start;
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    if chars.get(i) == Some(&'.') && dotted_operator_end(chars, i).is_none() {
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
    }
    if chars
        .get(i)
        .is_some_and(|letter| matches!(letter, 'e' | 'E' | 'd' | 'D'))
    {
        let mut j = i + 1;
        if matches!(chars.get(j), Some('+') | Some('-')) {
            j += 1;
        }
        if chars.get(j).is_some_and(char::is_ascii_digit) {
            while j < chars.len() && chars[j].is_ascii_digit() {
                j += 1;
            }
            i = j;
        }
    }
    if chars.get(i) == Some(&'_') && chars.get(i + 1).is_some_and(|ch| is_ident_continue(*ch)) {
        i += 1;
        while i < chars.len() && is_ident_continue(chars[i]) {
            i += 1;
        }
    }
    i
}

fn string_end(chars: &[char], start: usize) -> usize {
    let quote = chars[start];
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == quote {
            if chars.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    chars.len()
}

#[cfg(test)]
mod tests {
    use super::{Node, Token, parse, render, tokenize};

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input)
            .into_iter()
            .filter(|token| !matches!(token, Token::Space(_)))
            .collect()
    }

    #[test]
    fn numbers_take_exponents_and_kind_suffixes() {
        assert_eq!(
            kinds("2.1d0 + 1.5E-3 - 3_8 * .5"),
            vec![
                Token::Number("2.1d0".into()),
                Token::Op("+".into()),
                Token::Number("1.5E-3".into()),
                Token::Op("-".into()),
                Token::Number("3_8".into()),
                Token::Op("*".into()),
                Token::Number(".5".into()),
            ]
        );
    }

    #[test]
    fn dotted_operators_are_not_swallowed_by_numbers() {
        assert_eq!(
            kinds("1.eq.x .AND. .not.flag"),
            vec![
                Token::Number("1".into()),
                Token::Op(".eq.".into()),
                Token::Ident("x".into()),
                Token::Op(".AND.".into()),
                Token::Op(".not.".into()),
                Token::Ident("flag".into()),
            ]
        );
    }

    #[test]
    fn strings_keep_doubled_quotes() {
        assert_eq!(
            kinds("'it''s' // \"x\""),
            vec![
                Token::Str("'it''s'".into()),
                Token::Op("/".into()),
                Token::Op("/".into()),
                Token::Str("\"x\"".into()),
            ]
        );
    }

    #[test]
    fn two_char_operators() {
        assert_eq!(
            kinds("a**b /= c"),
            vec![
                Token::Ident("a".into()),
                Token::Op("**".into()),
                Token::Ident("b".into()),
                Token::Op("/=".into()),
                Token::Ident("c".into()),
            ]
        );
    }

    #[test]
    fn groups_nest_and_render_back() {
        let source = "f(vec(i), [1, 2]) + (a)";
        let nodes = parse(source);
        assert_eq!(render(&nodes), source);
        assert!(matches!(&nodes[1], Node::Group { open: '(', .. }));
    }

    #[test]
    fn unbalanced_groups_render_back() {
        for source in ["f(a, (b", "a) + b]", "[x"] {
            assert_eq!(render(&parse(source)), source);
        }
    }
}
