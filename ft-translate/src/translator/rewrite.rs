//! Expression rewrites, applied in order: cast rename, exponentiation,
//! literal normalization, operator spelling, sequence literals, sequence
//! intrinsics and finally array indexing.

use std::ops::Range;

use super::lexer::{Node, Token, parse, render, trim_spaces};
use super::splitter::{Nesting, split_top_level};
use super::symbols::{ScalarType, SymbolScopes};

pub(super) struct Rewriter<'a> {
    scopes: &'a SymbolScopes,
}

impl<'a> Rewriter<'a> {
    pub(super) fn new(scopes: &'a SymbolScopes) -> Self {
        Self { scopes }
    }

    pub(super) fn expression(&self, text: &str) -> String {
        let nodes = parse(text.trim());
        let nodes = rename_casts(nodes);
        let nodes = rewrite_power(nodes);
        let nodes = normalize_literals(nodes);
        let nodes = spell_operators(nodes);
        let nodes = self.sequence_literals(nodes);
        let nodes = self.sequence_intrinsics(nodes);
        let nodes = self.index_sequences(nodes);
        render(&nodes)
    }

    /// `[3, 5, 10]` or `(/ 3, 5, 10 /)` as a C++ brace initializer.
    pub(super) fn initializer_list(&self, text: &str) -> String {
        let text = text.trim();
        let inner = text
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .or_else(|| {
                text.strip_prefix("(/")
                    .and_then(|rest| rest.strip_suffix("/)"))
            })
            .unwrap_or(text);
        let values: Vec<String> = split_top_level(inner, Nesting::BracketsAndParens)
            .iter()
            .map(|value| self.expression(value))
            .collect();
        format!("{{{}}}", values.join(", "))
    }

    fn sequence_literals(&self, nodes: Vec<Node>) -> Vec<Node> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                Node::Group {
                    open: '[',
                    children,
                    ..
                } => {
                    let children = self.sequence_literals(children);
                    let element = self.element_type(&children);
                    out.push(Node::ident(format!("vector<{}>", element.cpp_name())));
                    out.push(Node::Group {
                        open: '{',
                        close: '}',
                        children,
                    });
                }
                Node::Group {
                    open,
                    close,
                    children,
                } => out.push(Node::Group {
                    open,
                    close,
                    children: self.sequence_literals(children),
                }),
                other => out.push(other),
            }
        }
        out
    }

    fn element_type(&self, nodes: &[Node]) -> ScalarType {
        if nodes.iter().any(|node| self.is_floating(node)) {
            ScalarType::Double
        } else {
            ScalarType::Int
        }
    }

    fn is_floating(&self, node: &Node) -> bool {
        match node {
            Node::Token(Token::Number(text)) => is_floating_literal(text),
            Node::Token(Token::Ident(name)) => self
                .scopes
                .lookup(name)
                .is_some_and(|symbol| symbol.ty == ScalarType::Double),
            Node::Group { children, .. } => children.iter().any(|child| self.is_floating(child)),
            Node::Token(_) => false,
        }
    }

    fn sequence_intrinsics(&self, nodes: Vec<Node>) -> Vec<Node> {
        let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
        let mut iter = nodes.into_iter().peekable();
        while let Some(node) = iter.next() {
            match node {
                Node::Token(Token::Ident(name))
                    if name.eq_ignore_ascii_case("size")
                        && iter.peek().is_some_and(|next| self.sizes_sequence(next)) =>
                {
                    let Some(Node::Group { children, .. }) = iter.next() else {
                        out.push(Node::ident(name));
                        continue;
                    };
                    let target = trim_spaces(children);
                    let fixed = target
                        .iter()
                        .find_map(Node::as_ident)
                        .is_some_and(|target_name| self.scopes.is_fixed_array(target_name));
                    let call = if fixed {
                        // C arrays have no member `size()`
                        vec![Node::ident("std::size"), Node::parens(target)]
                    } else {
                        let mut call = target;
                        call.push(Node::op("."));
                        call.push(Node::ident("size"));
                        call.push(Node::parens(Vec::new()));
                        call
                    };
                    out.push(Node::ident("static_cast<int>"));
                    out.push(Node::parens(call));
                }
                Node::Group {
                    open,
                    close,
                    children,
                } => out.push(Node::Group {
                    open,
                    close,
                    children: self.sequence_intrinsics(children),
                }),
                other => out.push(other),
            }
        }
        out
    }

    fn sizes_sequence(&self, node: &Node) -> bool {
        let Node::Group {
            open: '(',
            children,
            ..
        } = node
        else {
            return false;
        };
        let significant: Vec<&Node> = children.iter().filter(|child| !child.is_space()).collect();
        match significant.as_slice() {
            [only] => only
                .as_ident()
                .is_some_and(|name| self.scopes.is_sequence(name)),
            _ => false,
        }
    }

    fn index_sequences(&self, nodes: Vec<Node>) -> Vec<Node> {
        let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
        let mut iter = nodes.into_iter().peekable();
        while let Some(node) = iter.next() {
            match node {
                Node::Token(Token::Ident(name)) if self.scopes.is_sequence(&name) => {
                    let mut spaces = Vec::new();
                    while let Some(space) = iter.next_if(Node::is_space) {
                        spaces.push(space);
                    }
                    match iter.next_if(Node::is_paren_group) {
                        Some(Node::Group { children, .. }) => {
                            let index = self.index_sequences(children);
                            let index = if self.scopes.is_current_vector_parameter(&name) {
                                trim_spaces(index)
                            } else {
                                shift_to_zero_based(index)
                            };
                            out.push(Node::ident(name));
                            out.push(Node::Group {
                                open: '[',
                                close: ']',
                                children: index,
                            });
                        }
                        other => {
                            out.push(Node::ident(name));
                            out.extend(spaces);
                            out.extend(other);
                        }
                    }
                }
                Node::Group {
                    open,
                    close,
                    children,
                } => out.push(Node::Group {
                    open,
                    close,
                    children: self.index_sequences(children),
                }),
                other => out.push(other),
            }
        }
        out
    }
}

enum IndexShape {
    Literal(i64),
    Single,
    Compound,
}

/// `i` becomes `i-1`, `3` becomes `2`, anything else becomes `(expr)-1`.
fn shift_to_zero_based(index: Vec<Node>) -> Vec<Node> {
    let index = trim_spaces(index);
    let shape = match index.as_slice() {
        [Node::Token(Token::Number(text))] => match text.parse::<i64>() {
            Ok(value) => IndexShape::Literal(value),
            Err(_) => IndexShape::Compound,
        },
        [Node::Token(Token::Ident(_))] => IndexShape::Single,
        _ => IndexShape::Compound,
    };
    match shape {
        IndexShape::Literal(value) => vec![Node::number((value - 1).to_string())],
        IndexShape::Single => {
            let mut out = index;
            out.push(Node::op("-"));
            out.push(Node::number("1"));
            out
        }
        IndexShape::Compound => vec![Node::parens(index), Node::op("-"), Node::number("1")],
    }
}

fn cast_target(name: &str) -> Option<&'static str> {
    match name.to_ascii_lowercase().as_str() {
        "dble" | "real" | "float" | "dfloat" => Some("double"),
        "int" => Some("int"),
        _ => None,
    }
}

fn rename_casts(nodes: Vec<Node>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(nodes.len());
    let mut iter = nodes.into_iter().peekable();
    while let Some(node) = iter.next() {
        match node {
            Node::Token(Token::Ident(name)) => {
                let single_argument = matches!(
                    iter.peek(),
                    Some(Node::Group { open: '(', children, .. })
                        if !children.iter().any(|child| matches!(child, Node::Token(Token::Comma)))
                );
                match cast_target(&name) {
                    Some(target) if single_argument => {
                        out.push(Node::ident(format!("static_cast<{target}>")));
                    }
                    _ => out.push(Node::ident(name)),
                }
            }
            Node::Group {
                open,
                close,
                children,
            } => out.push(Node::Group {
                open,
                close,
                children: rename_casts(children),
            }),
            other => out.push(other),
        }
    }
    out
}

fn is_power_op(node: &Node) -> bool {
    matches!(node, Node::Token(Token::Op(op)) if op == "**")
}

/// Rewrites `a ** b` into `pow(a, b)`, starting from the rightmost operator so
/// that chains associate to the right.
fn rewrite_power(nodes: Vec<Node>) -> Vec<Node> {
    let mut nodes: Vec<Node> = nodes
        .into_iter()
        .map(|node| match node {
            Node::Group {
                open,
                close,
                children,
            } => Node::Group {
                open,
                close,
                children: rewrite_power(children),
            },
            other => other,
        })
        .collect();

    let mut limit = nodes.len();
    while let Some(op_idx) = nodes[..limit].iter().rposition(is_power_op) {
        let (Some(lhs), Some(rhs)) = (operand_before(&nodes, op_idx), operand_after(&nodes, op_idx))
        else {
            limit = op_idx;
            continue;
        };
        let mut children = nodes[lhs.clone()].to_vec();
        children.push(Node::Token(Token::Comma));
        children.push(Node::Token(Token::Space(" ".to_string())));
        children.extend_from_slice(&nodes[rhs.clone()]);

        let mut rebuilt = nodes[..lhs.start].to_vec();
        rebuilt.push(Node::ident("pow"));
        rebuilt.push(Node::parens(children));
        rebuilt.extend_from_slice(&nodes[rhs.end..]);
        nodes = rebuilt;
        limit = lhs.start;
    }
    nodes
}

fn operand_before(nodes: &[Node], op_idx: usize) -> Option<Range<usize>> {
    let mut end = op_idx;
    while end > 0 && nodes[end - 1].is_space() {
        end -= 1;
    }
    let last = end.checked_sub(1)?;
    match &nodes[last] {
        Node::Token(Token::Ident(_) | Token::Number(_)) => Some(last..end),
        Node::Group { open: '(', .. } => {
            if last > 0 && nodes[last - 1].as_ident().is_some() {
                Some(last - 1..end)
            } else {
                Some(last..end)
            }
        }
        _ => None,
    }
}

fn operand_after(nodes: &[Node], op_idx: usize) -> Option<Range<usize>> {
    let mut start = op_idx + 1;
    while start < nodes.len() && nodes[start].is_space() {
        start += 1;
    }
    let mut cursor = start;
    if matches!(nodes.get(cursor), Some(Node::Token(Token::Op(sign))) if sign == "-" || sign == "+")
    {
        cursor += 1;
    }
    match nodes.get(cursor)? {
        Node::Token(Token::Ident(_)) => {
            if nodes.get(cursor + 1).is_some_and(Node::is_paren_group) {
                Some(start..cursor + 2)
            } else {
                Some(start..cursor + 1)
            }
        }
        Node::Token(Token::Number(_)) => Some(start..cursor + 1),
        Node::Group { open: '(', .. } => Some(start..cursor + 1),
        _ => None,
    }
}

fn normalize_literals(nodes: Vec<Node>) -> Vec<Node> {
    nodes
        .into_iter()
        .map(|node| match node {
            Node::Token(Token::Number(text)) => Node::number(normalize_number(&text)),
            Node::Group {
                open,
                close,
                children,
            } => Node::Group {
                open,
                close,
                children: normalize_literals(children),
            },
            other => other,
        })
        .collect()
}

/// `2.1d0` -> `2.1e0`, `1.0_8` -> `1.0`.
pub(super) fn normalize_number(text: &str) -> String {
    let digits = text.split_once('_').map_or(text, |(head, _)| head);
    digits.replace(['d', 'D'], "e")
}

fn is_floating_literal(text: &str) -> bool {
    let digits = text.split_once('_').map_or(text, |(head, _)| head);
    digits.contains(['.', 'e', 'E', 'd', 'D'])
}

fn spell_operators(nodes: Vec<Node>) -> Vec<Node> {
    nodes
        .into_iter()
        .map(|node| match node {
            Node::Token(Token::Op(op)) => match cpp_operator(&op) {
                Some(spelled) => Node::op(spelled),
                None => Node::op(op),
            },
            Node::Token(Token::Str(raw)) => Node::Token(Token::Str(cpp_string(&raw))),
            Node::Group {
                open,
                close,
                children,
            } => Node::Group {
                open,
                close,
                children: spell_operators(children),
            },
            other => other,
        })
        .collect()
}

fn cpp_operator(op: &str) -> Option<&'static str> {
    let spelled = match op.to_ascii_lowercase().as_str() {
        ".and." => "&&",
        ".or." => "||",
        ".not." => "!",
        ".eq." | ".eqv." => "==",
        ".ne." | ".neqv." | "/=" => "!=",
        ".lt." => "<",
        ".le." => "<=",
        ".gt." => ">",
        ".ge." => ">=",
        ".true." => "true",
        ".false." => "false",
        _ => return None,
    };
    Some(spelled)
}

/// Re-quotes a Fortran string literal as a C++ string literal.
fn cpp_string(raw: &str) -> String {
    let mut chars = raw.chars();
    let Some(quote) = chars.next() else {
        return raw.to_string();
    };
    let body: String = chars.collect();
    let doubled = format!("{quote}{quote}");
    let inner = body.strip_suffix(quote).unwrap_or(&body);
    let inner = inner.replace(&doubled, &quote.to_string());

    let mut out = String::with_capacity(inner.len() + 2);
    out.push('"');
    for ch in inner.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::{Rewriter, normalize_number};
    use crate::translator::symbols::{ScalarType, ScopeKind, SymbolScopes};

    fn rewrite(scopes: &SymbolScopes, text: &str) -> String {
        Rewriter::new(scopes).expression(text)
    }

    #[test]
    fn exponent_becomes_pow_call() {
        let scopes = SymbolScopes::new();
        assert_eq!(rewrite(&scopes, "x = i**2"), "x = pow(i, 2)");
        assert_eq!(rewrite(&scopes, "y = a ** b ** c"), "y = pow(a, pow(b, c))");
        assert_eq!(rewrite(&scopes, "z = -f(x)**(n+1)"), "z = -pow(f(x), (n+1))");
        assert_eq!(rewrite(&scopes, "w = x**-1"), "w = pow(x, -1)");
    }

    #[test]
    fn exponent_without_operand_is_left_alone() {
        let scopes = SymbolScopes::new();
        assert_eq!(rewrite(&scopes, "x = **2"), "x = **2");
    }

    #[test]
    fn double_precision_exponent_letter_is_normalized() {
        let scopes = SymbolScopes::new();
        assert_eq!(rewrite(&scopes, "x = 2.1d0"), "x = 2.1e0");
        assert_eq!(rewrite(&scopes, "x = 1.0D-3 + 4.0_8"), "x = 1.0e-3 + 4.0");
        assert_eq!(normalize_number("6.02d+23"), "6.02e+23");
    }

    #[test]
    fn cast_functions_are_renamed() {
        let scopes = SymbolScopes::new();
        assert_eq!(
            rewrite(&scopes, "xfac = dble(fac)"),
            "xfac = static_cast<double>(fac)"
        );
        assert_eq!(rewrite(&scopes, "k = int(x)"), "k = static_cast<int>(x)");
        assert_eq!(rewrite(&scopes, "y = real(x, 8)"), "y = real(x, 8)");
    }

    #[test]
    fn top_level_arrays_shift_to_zero_based() {
        let mut scopes = SymbolScopes::new();
        scopes.declare_array("vec", ScalarType::Int);
        assert_eq!(rewrite(&scopes, "fac = factorial(vec(i))"), "fac = factorial(vec[i-1])");
        assert_eq!(rewrite(&scopes, "x = vec(3)"), "x = vec[2]");
        assert_eq!(rewrite(&scopes, "x = vec(i + 1)"), "x = vec[(i + 1)-1]");
        assert_eq!(rewrite(&scopes, "x = vec(vec(1))"), "x = vec[(vec[0])-1]");
    }

    #[test]
    fn vector_parameters_keep_their_index_inside_the_function() {
        let mut scopes = SymbolScopes::new();
        scopes.push(ScopeKind::Function, "total");
        scopes.declare_vector_parameter("x", ScalarType::Double);
        assert_eq!(rewrite(&scopes, "s = s + x(j)"), "s = s + x[j]");
        assert_eq!(rewrite(&scopes, "s = x(i)**2"), "s = pow(x[i], 2)");
    }

    #[test]
    fn vector_names_outside_a_function_still_shift() {
        let mut scopes = SymbolScopes::new();
        scopes.declare_vector_parameter("x", ScalarType::Double);
        assert_eq!(rewrite(&scopes, "y = x(j)"), "y = x[j-1]");
    }

    #[test]
    fn identifiers_are_matched_whole_and_never_inside_strings() {
        let mut scopes = SymbolScopes::new();
        scopes.declare_array("v", ScalarType::Int);
        assert_eq!(rewrite(&scopes, "vv(1) = v(1)"), "vv(1) = v[0]");
        assert_eq!(rewrite(&scopes, "s = 'v(1)'"), "s = \"v(1)\"");
    }

    #[test]
    fn size_of_a_sequence_becomes_member_call() {
        let mut scopes = SymbolScopes::new();
        scopes.declare_vector_parameter("x", ScalarType::Double);
        assert_eq!(rewrite(&scopes, "size(x)"), "static_cast<int>(x.size())");
        assert_eq!(rewrite(&scopes, "size(y)"), "size(y)");
    }

    #[test]
    fn size_of_a_fixed_array_uses_free_function() {
        let mut scopes = SymbolScopes::new();
        scopes.declare_fixed_array("vec", ScalarType::Int);
        assert_eq!(
            rewrite(&scopes, "m = size(vec)"),
            "m = static_cast<int>(std::size(vec))"
        );
        assert_eq!(rewrite(&scopes, "x = vec(2)"), "x = vec[1]");
    }

    #[test]
    fn logical_operators_are_spelled_for_cpp() {
        let scopes = SymbolScopes::new();
        assert_eq!(
            rewrite(&scopes, "ok = a .and. .not. b .or. c /= d"),
            "ok = a && ! b || c != d"
        );
        assert_eq!(rewrite(&scopes, "flag = .TRUE."), "flag = true");
    }

    #[test]
    fn strings_are_requoted() {
        let scopes = SymbolScopes::new();
        assert_eq!(rewrite(&scopes, "'it''s'"), "\"it's\"");
        assert_eq!(rewrite(&scopes, "'say \"hi\"'"), "\"say \\\"hi\\\"\"");
    }

    #[test]
    fn array_literals_become_typed_vectors() {
        let mut scopes = SymbolScopes::new();
        assert_eq!(rewrite(&scopes, "[1, 2, 3]"), "vector<int>{1, 2, 3}");
        assert_eq!(rewrite(&scopes, "[1, 2.5d0]"), "vector<double>{1, 2.5e0}");
        assert_eq!(rewrite(&scopes, "[]"), "vector<int>{}");

        scopes.declare_scalar("h", ScalarType::Double);
        assert_eq!(rewrite(&scopes, "[h, 2]"), "vector<double>{h, 2}");
    }

    #[test]
    fn initializer_lists_use_braces() {
        let scopes = SymbolScopes::new();
        let rewriter = Rewriter::new(&scopes);
        assert_eq!(rewriter.initializer_list("[3, 5, 10]"), "{3, 5, 10}");
        assert_eq!(rewriter.initializer_list("(/ 1.5d0, 2d0 /)"), "{1.5e0, 2e0}");
    }
}
