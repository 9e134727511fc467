use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

mod comments;
mod diagnostics;
mod grammar;
mod lexer;
mod lines;
mod lowering;
mod rewrite;
mod signatures;
mod splitter;
mod symbols;
mod wrapper;

pub use comments::{ScannedLine, find_comment_start, normalize_comment, split_comment};
pub use diagnostics::{Diagnostic, DiagnosticKind, render_diagnostic};
pub use splitter::{Nesting, split_top_level};

/// Prelude every translation starts with.
pub const HEADER: &str = "#include <iostream>\n#include <cmath>\n#include <vector>\nusing namespace std;\n";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TranslateOptions {
    /// Spaces per nesting level.
    pub indent_width: usize,
    /// Emit [`HEADER`] and a blank line before the body.
    pub emit_header: bool,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self {
            indent_width: 2,
            emit_header: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Translation {
    pub output: String,
    /// Lines that were passed through or dropped, in source order.
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlockKind {
    Module,
    Function,
    Program,
    Loop,
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlockKind::Module => "module",
            BlockKind::Function => "function",
            BlockKind::Program => "program",
            BlockKind::Loop => "do loop",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TranslateError {
    /// A closing statement for a different block than the innermost one.
    MismatchedEnd {
        line: usize,
        expected: BlockKind,
        found: BlockKind,
    },
    /// A closing statement with no block open.
    UnexpectedEnd { line: usize, found: BlockKind },
    /// Input ended inside a block; `line` is where the block was opened.
    UnterminatedBlock { line: usize, kind: BlockKind },
    NestedFunction { line: usize },
}

impl TranslateError {
    pub fn line(&self) -> usize {
        match self {
            TranslateError::MismatchedEnd { line, .. }
            | TranslateError::UnexpectedEnd { line, .. }
            | TranslateError::UnterminatedBlock { line, .. }
            | TranslateError::NestedFunction { line } => *line,
        }
    }
}

impl fmt::Display for TranslateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranslateError::MismatchedEnd {
                line,
                expected,
                found,
            } => write!(f, "line {line}: end of {found} does not close the open {expected}"),
            TranslateError::UnexpectedEnd { line, found } => {
                write!(f, "line {line}: end of {found} with no open block")
            }
            TranslateError::UnterminatedBlock { line, kind } => {
                write!(f, "line {line}: {kind} is never closed")
            }
            TranslateError::NestedFunction { line } => {
                write!(f, "line {line}: function defined inside another function")
            }
        }
    }
}

impl std::error::Error for TranslateError {}

#[derive(Debug)]
pub enum SourcePathError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Translate(TranslateError),
}

impl fmt::Display for SourcePathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourcePathError::Io { path, source } => {
                write!(f, "cannot read '{}': {source}", path.display())
            }
            SourcePathError::Translate(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SourcePathError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SourcePathError::Io { source, .. } => Some(source),
            SourcePathError::Translate(err) => Some(err),
        }
    }
}

impl From<TranslateError> for SourcePathError {
    fn from(value: TranslateError) -> Self {
        SourcePathError::Translate(value)
    }
}

pub fn translate(source: &str) -> Result<Translation, TranslateError> {
    translate_with_options(source, &TranslateOptions::default())
}

pub fn translate_with_options(
    source: &str,
    options: &TranslateOptions,
) -> Result<Translation, TranslateError> {
    let lines = lines::logical_lines(source);
    let signatures = signatures::collect_signatures(&lines);
    debug!(
        "translating {} logical lines, {} functions",
        lines.len(),
        signatures.len()
    );
    let lowered = lowering::Lowering::new(signatures).run(&lines)?;
    let body = wrapper::wrap_entry_point(
        lowered.lines,
        lowered.entry_declared,
        options.indent_width,
    );

    let mut output = String::new();
    if options.emit_header {
        output.push_str(HEADER);
        output.push('\n');
    }
    for line in body {
        output.push_str(&line);
        output.push('\n');
    }
    Ok(Translation {
        output,
        diagnostics: lowered.diagnostics,
    })
}

/// Reads a source file, naming the path in the error.
pub fn read_source(path: impl AsRef<Path>) -> Result<String, SourcePathError> {
    let path = path.as_ref();
    std::fs::read_to_string(path).map_err(|source| SourcePathError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn translate_file(path: impl AsRef<Path>) -> Result<Translation, SourcePathError> {
    let source = read_source(path)?;
    Ok(translate(&source)?)
}

fn is_ident_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}
