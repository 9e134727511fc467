//! Statement classification.
//!
//! `classify` looks at one comment-free, trimmed line and decides which
//! statement form it is. Forms are tried in a fixed priority order; anything
//! that matches none of them is `Unrecognized` and gets passed through.

use std::sync::LazyLock;

use regex::Regex;

use super::splitter::{Nesting, split_top_level};
use super::symbols::ScalarType;

macro_rules! pattern {
    ($name:ident, $re:literal) => {
        static $name: LazyLock<Regex> = LazyLock::new(|| {
            Regex::new(concat!("(?i)", $re)).expect("statement pattern should be valid")
        });
    };
}

pattern!(
    SKIP,
    r"^(?:implicit\s+none|contains|private|public)(?:\s*::.*)?$"
);
pattern!(MODULE, r"^module\s+(\w+)$");
pattern!(END_MODULE, r"^end\s*module(?:\s+\w+)?$");
pattern!(
    FUNCTION,
    r"^(?:(?:pure|elemental|recursive)\s+)*(?:(integer|logical|double\s+precision|real(?:\s*\(\s*(?:kind\s*=\s*)?\w+\s*\))?)\s+)?(?:(?:pure|elemental|recursive)\s+)*function\s+(\w+)\s*\(\s*(\w+)\s*\)(?:\s*result\s*\(\s*(\w+)\s*\))?$"
);
pattern!(END_FUNCTION, r"^end\s*function(?:\s+\w+)?$");
pattern!(PROGRAM, r"^program\s+(\w+)$");
pattern!(END_PROGRAM, r"^end\s*program(?:\s+\w+)?$");
pattern!(USE, r"^use\s+(\w+)\s*(?:,\s*only\s*:\s*(.*))?$");
pattern!(
    TYPE_SPEC,
    r"^(integer|logical|double\s+precision|real)(?:\s*\(\s*(?:kind\s*=\s*)?\w+\s*\)|\s*\*\s*\d+)?$"
);
pattern!(INTENT_IN, r"^intent\s*\(\s*in\s*\)$");
pattern!(DIMENSION, r"^dimension\s*\((.*)\)$");
pattern!(DO_WHILE, r"^do\s+while\s*\((.*)\)$");
pattern!(DO, r"^do\s+(\w+)\s*=\s*(.+)$");
pattern!(END_DO, r"^end\s*do(?:\s+\w+)?$");
pattern!(PRINT, r#"^print\s*(\*|'[^']*'|"[^"]*"|\d+)\s*(?:,(.*))?$"#);
pattern!(WRITE, r"^write\s*\(");
pattern!(READ_LIST, r"^read\s*(\*|\d+)\s*(?:,(.*))?$");
pattern!(READ, r"^read\s*\(");
pattern!(IF_JUMP, r"^if\s*\((.*)\)\s*(exit|cycle)$");
pattern!(JUMP, r"^(exit|cycle)$");
pattern!(ALLOCATE, r"^allocate\s*\(\s*(\w+)\s*\((.*)\)\s*\)$");
pattern!(DEALLOCATE, r"^deallocate\s*\(\s*(\w+)\s*\)$");
pattern!(END, r"^end$");

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct FunctionHead {
    pub(super) name: String,
    pub(super) param: String,
    pub(super) result: Option<String>,
    pub(super) prefix_type: Option<ScalarType>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct DeclItem {
    pub(super) name: String,
    /// Text inside `name(...)`, if any.
    pub(super) shape: Option<String>,
    pub(super) init: Option<String>,
}

impl DeclItem {
    /// Shape from the item itself, falling back to a `dimension(...)`
    /// attribute on the declaration.
    pub(super) fn effective_shape<'a>(&'a self, decl: &'a Declaration) -> Option<&'a str> {
        self.shape
            .as_deref()
            .or(decl.dimension.as_deref())
            .map(str::trim)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct Declaration {
    pub(super) ty: ScalarType,
    pub(super) parameter: bool,
    pub(super) intent_in: bool,
    pub(super) allocatable: bool,
    pub(super) dimension: Option<String>,
    pub(super) items: Vec<DeclItem>,
    /// Entity text that did not parse as `name[(shape)][= init]`.
    pub(super) rejected: Vec<String>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(super) enum Jump {
    Exit,
    Cycle,
}

impl Jump {
    fn parse(word: &str) -> Self {
        if word.eq_ignore_ascii_case("exit") {
            Jump::Exit
        } else {
            Jump::Cycle
        }
    }

    pub(super) fn cpp_keyword(self) -> &'static str {
        match self {
            Jump::Exit => "break",
            Jump::Cycle => "continue",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) enum Statement {
    Skip,
    ModuleOpen(String),
    ModuleEnd,
    FunctionOpen(FunctionHead),
    FunctionEnd,
    ProgramOpen(String),
    ProgramEnd,
    Use {
        module: String,
        only: Option<Vec<String>>,
    },
    Declaration(Declaration),
    DoLoop {
        var: String,
        start: String,
        end: String,
        step: Option<String>,
    },
    DoWhile(String),
    EndDo,
    Print(Vec<String>),
    Read(Vec<String>),
    IfJump {
        condition: String,
        jump: Jump,
    },
    Jump(Jump),
    Allocate {
        name: String,
        size: String,
    },
    Deallocate(String),
    End,
    Assignment,
    Unrecognized,
}

impl Statement {
    /// Short rule name for logging.
    pub(super) fn rule(&self) -> &'static str {
        match self {
            Statement::Skip => "skip",
            Statement::ModuleOpen(_) => "module",
            Statement::ModuleEnd => "end module",
            Statement::FunctionOpen(_) => "function",
            Statement::FunctionEnd => "end function",
            Statement::ProgramOpen(_) => "program",
            Statement::ProgramEnd => "end program",
            Statement::Use { .. } => "use",
            Statement::Declaration(decl) if decl.parameter => "parameter declaration",
            Statement::Declaration(_) => "declaration",
            Statement::DoLoop { .. } => "do",
            Statement::DoWhile(_) => "do while",
            Statement::EndDo => "end do",
            Statement::Print(_) => "print",
            Statement::Read(_) => "read",
            Statement::IfJump { .. } => "if jump",
            Statement::Jump(_) => "jump",
            Statement::Allocate { .. } => "allocate",
            Statement::Deallocate(_) => "deallocate",
            Statement::End => "end",
            Statement::Assignment => "assignment",
            Statement::Unrecognized => "pass-through",
        }
    }
}

pub(super) fn classify(code: &str) -> Statement {
    let code = code.trim();

    if SKIP.is_match(code) {
        return Statement::Skip;
    }
    if let Some(caps) = MODULE.captures(code) {
        return Statement::ModuleOpen(caps[1].to_string());
    }
    if END_MODULE.is_match(code) {
        return Statement::ModuleEnd;
    }
    if let Some(caps) = FUNCTION.captures(code) {
        return Statement::FunctionOpen(FunctionHead {
            prefix_type: caps.get(1).map(|ty| ScalarType::from_type_spec(ty.as_str())),
            name: caps[2].to_string(),
            param: caps[3].to_string(),
            result: caps.get(4).map(|result| result.as_str().to_string()),
        });
    }
    if END_FUNCTION.is_match(code) {
        return Statement::FunctionEnd;
    }
    if let Some(caps) = PROGRAM.captures(code) {
        return Statement::ProgramOpen(caps[1].to_string());
    }
    if END_PROGRAM.is_match(code) {
        return Statement::ProgramEnd;
    }
    if let Some(caps) = USE.captures(code) {
        let only = caps.get(2).map(|list| {
            split_top_level(list.as_str(), Nesting::BracketsAndParens)
                .into_iter()
                .filter(|name| !name.is_empty())
                .collect()
        });
        return Statement::Use {
            module: caps[1].to_string(),
            only,
        };
    }
    if let Some(decl) = parse_declaration(code) {
        return Statement::Declaration(decl);
    }
    if let Some(caps) = DO_WHILE.captures(code) {
        return Statement::DoWhile(caps[1].trim().to_string());
    }
    if let Some(caps) = DO.captures(code) {
        return parse_do(&caps[1], &caps[2]);
    }
    if END_DO.is_match(code) {
        return Statement::EndDo;
    }
    if let Some(caps) = PRINT.captures(code) {
        return Statement::Print(io_items(caps.get(2).map_or("", |items| items.as_str())));
    }
    if WRITE.is_match(code) {
        return parse_io_control(code, &["*", "6"], Statement::Print);
    }
    if let Some(caps) = READ_LIST.captures(code) {
        if &caps[1] != "*" && &caps[1] != "5" {
            return Statement::Unrecognized;
        }
        return Statement::Read(io_items(caps.get(2).map_or("", |items| items.as_str())));
    }
    if READ.is_match(code) {
        return parse_io_control(code, &["*", "5"], Statement::Read);
    }
    if let Some(caps) = IF_JUMP.captures(code) {
        return Statement::IfJump {
            condition: caps[1].trim().to_string(),
            jump: Jump::parse(&caps[2]),
        };
    }
    if let Some(caps) = JUMP.captures(code) {
        return Statement::Jump(Jump::parse(&caps[1]));
    }
    if let Some(caps) = ALLOCATE.captures(code) {
        return Statement::Allocate {
            name: caps[1].to_string(),
            size: caps[2].trim().to_string(),
        };
    }
    if let Some(caps) = DEALLOCATE.captures(code) {
        return Statement::Deallocate(caps[1].to_string());
    }
    if END.is_match(code) {
        return Statement::End;
    }
    if find_assignment_operator(code).is_some()
        && !code.contains("::")
        && !starts_with_keyword(code, "if")
        && !starts_with_keyword(code, "do")
    {
        return Statement::Assignment;
    }
    Statement::Unrecognized
}

fn parse_do(var: &str, bounds: &str) -> Statement {
    let parts = split_top_level(bounds, Nesting::BracketsAndParens);
    match parts.as_slice() {
        [start, end] => Statement::DoLoop {
            var: var.to_string(),
            start: start.clone(),
            end: end.clone(),
            step: None,
        },
        [start, end, step] => Statement::DoLoop {
            var: var.to_string(),
            start: start.clone(),
            end: end.clone(),
            step: Some(step.clone()),
        },
        _ => Statement::Unrecognized,
    }
}

fn io_items(text: &str) -> Vec<String> {
    split_top_level(text, Nesting::BracketsAndParens)
        .into_iter()
        .filter(|item| !item.is_empty())
        .collect()
}

/// `write(*, *) a, b` and `read(*, *) a`: the unit must be one of `units`;
/// the format selector is ignored.
fn parse_io_control(
    code: &str,
    units: &[&str],
    build: fn(Vec<String>) -> Statement,
) -> Statement {
    let Some(open) = code.find('(') else {
        return Statement::Unrecognized;
    };
    let Some(close) = matching_paren(code, open) else {
        return Statement::Unrecognized;
    };
    let control = split_top_level(&code[open + 1..close], Nesting::BracketsAndParens);
    let unit = control
        .first()
        .map(|unit| unit.trim_start_matches("unit").trim_start().trim_start_matches('=').trim());
    if !unit.is_some_and(|unit| units.contains(&unit)) {
        return Statement::Unrecognized;
    }
    let rest = code[close + 1..].trim();
    let rest = rest.strip_prefix(',').unwrap_or(rest);
    build(io_items(rest))
}

/// Byte offset of the `)` closing the `(` at `open`, skipping quoted text.
pub(super) fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (idx, ch) in text[open..].char_indices() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '(' => depth += 1,
            ')' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(open + idx);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_declaration(code: &str) -> Option<Declaration> {
    let (head, body) = code.split_once("::")?;
    let mut attrs = split_top_level(head, Nesting::BracketsAndParens).into_iter();
    let type_spec = attrs.next()?;
    if !TYPE_SPEC.is_match(&type_spec) {
        return None;
    }

    let mut decl = Declaration {
        ty: ScalarType::from_type_spec(&type_spec),
        parameter: false,
        intent_in: false,
        allocatable: false,
        dimension: None,
        items: Vec::new(),
        rejected: Vec::new(),
    };
    for attr in attrs {
        let lowered = attr.to_ascii_lowercase();
        if lowered == "parameter" {
            decl.parameter = true;
        } else if lowered == "allocatable" {
            decl.allocatable = true;
        } else if INTENT_IN.is_match(&attr) {
            decl.intent_in = true;
        } else if let Some(caps) = DIMENSION.captures(&attr) {
            decl.dimension = Some(caps[1].trim().to_string());
        }
    }

    let nesting = if decl.parameter {
        Nesting::Brackets
    } else {
        Nesting::BracketsAndParens
    };
    for entity in split_top_level(body, nesting) {
        match parse_item(&entity) {
            Some(item) => decl.items.push(item),
            None => decl.rejected.push(entity),
        }
    }
    if decl.items.is_empty() {
        return None;
    }
    Some(decl)
}

fn parse_item(item: &str) -> Option<DeclItem> {
    let item = item.trim();
    let name_end = item
        .char_indices()
        .find(|(_, ch)| !super::is_ident_continue(*ch))
        .map_or(item.len(), |(idx, _)| idx);
    let name = &item[..name_end];
    if !name.chars().next().is_some_and(super::is_ident_start) {
        return None;
    }

    let mut rest = item[name_end..].trim_start();
    let mut shape = None;
    if rest.starts_with('(') {
        let close = matching_paren(rest, 0)?;
        shape = Some(rest[1..close].trim().to_string());
        rest = rest[close + 1..].trim_start();
    }

    let init = match rest.strip_prefix('=') {
        Some(value) => Some(value.trim().to_string()),
        None if rest.is_empty() => None,
        None => return None,
    };
    Some(DeclItem {
        name: name.to_string(),
        shape,
        init,
    })
}

/// Byte offset of a lone `=`; comparison operators and `=>` do not count.
pub(super) fn find_assignment_operator(code: &str) -> Option<usize> {
    let bytes = code.as_bytes();
    let mut quote: Option<u8> = None;
    for (idx, &byte) in bytes.iter().enumerate() {
        if let Some(q) = quote {
            if byte == q {
                quote = None;
            }
            continue;
        }
        match byte {
            b'\'' | b'"' => quote = Some(byte),
            b'=' => {
                let prev = idx.checked_sub(1).map(|prev| bytes[prev]);
                let next = bytes.get(idx + 1).copied();
                let compound = matches!(prev, Some(b'=' | b'/' | b'<' | b'>'))
                    || matches!(next, Some(b'=' | b'>'));
                if !compound {
                    return Some(idx);
                }
            }
            _ => {}
        }
    }
    None
}

fn starts_with_keyword(code: &str, keyword: &str) -> bool {
    code.get(..keyword.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(keyword))
        && !code[keyword.len()..]
            .chars()
            .next()
            .is_some_and(super::is_ident_continue)
}
