//! Second pass: lowers each logical line to C++.
//!
//! Lowering keeps an explicit block stack and checks it on every closing
//! statement, so a stray `end do` or a missing `end function` becomes a
//! [`TranslateError`] instead of silently unbalanced braces.

use tracing::{debug, warn};

use super::comments::{attach_comment, line_comment};
use super::diagnostics::{Diagnostic, DiagnosticKind};
use super::grammar::{Declaration, FunctionHead, Statement, classify};
use super::lines::SourceLine;
use super::rewrite::Rewriter;
use super::signatures::{FunctionSignature, ParamShape};
use super::symbols::{ScopeKind, SymbolScopes};
use super::{BlockKind, TranslateError};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(super) enum Placement {
    /// Inside a module, a function or an explicit program.
    Unit,
    /// Top-level statement that needs a synthesized `main`.
    Loose,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) struct EmittedLine {
    pub(super) depth: usize,
    pub(super) text: String,
    pub(super) placement: Placement,
    /// Blank or comment-only.
    pub(super) trivia: bool,
}

#[derive(Debug)]
struct Block {
    kind: BlockKind,
    line: usize,
    name: String,
    placement: Placement,
}

pub(super) struct Lowered {
    pub(super) lines: Vec<EmittedLine>,
    pub(super) diagnostics: Vec<Diagnostic>,
    pub(super) entry_declared: bool,
}

pub(super) struct Lowering {
    signatures: Vec<FunctionSignature>,
    next_signature: usize,
    scopes: SymbolScopes,
    blocks: Vec<Block>,
    current_function: Option<FunctionSignature>,
    lines: Vec<EmittedLine>,
    diagnostics: Vec<Diagnostic>,
    entry_declared: bool,
}

impl Lowering {
    pub(super) fn new(signatures: Vec<FunctionSignature>) -> Self {
        Self {
            signatures,
            next_signature: 0,
            scopes: SymbolScopes::new(),
            blocks: Vec::new(),
            current_function: None,
            lines: Vec::new(),
            diagnostics: Vec::new(),
            entry_declared: false,
        }
    }

    pub(super) fn run(mut self, source: &[SourceLine]) -> Result<Lowered, TranslateError> {
        for line in source {
            self.lower_line(line)?;
        }
        if let Some(block) = self.blocks.last() {
            return Err(TranslateError::UnterminatedBlock {
                line: block.line,
                kind: block.kind,
            });
        }
        Ok(Lowered {
            lines: self.lines,
            diagnostics: self.diagnostics,
            entry_declared: self.entry_declared,
        })
    }

    fn lower_line(&mut self, line: &SourceLine) -> Result<(), TranslateError> {
        if line.code.is_empty() {
            let text = line
                .comment
                .as_deref()
                .map(line_comment)
                .unwrap_or_default();
            self.emit_trivia(text);
            return Ok(());
        }

        let statement = classify(&line.code);
        debug!("line {}: {}", line.number, statement.rule());
        let first = self.lines.len();
        self.lower_statement(statement, line)?;

        if let Some(comment) = &line.comment {
            match self.lines.get_mut(first) {
                Some(emitted) => attach_comment(&mut emitted.text, comment),
                None => self.emit_trivia(line_comment(comment)),
            }
        }
        Ok(())
    }

    fn lower_statement(
        &mut self,
        statement: Statement,
        line: &SourceLine,
    ) -> Result<(), TranslateError> {
        let number = line.number;
        match statement {
            Statement::Skip => {}
            Statement::ModuleOpen(name) => {
                self.emit(format!("namespace {name} {{"));
                self.open_block(BlockKind::Module, number, &name);
                self.scopes.push(ScopeKind::Module, &name);
            }
            Statement::ModuleEnd => self.close(BlockKind::Module, number)?,
            Statement::FunctionOpen(head) => self.open_function(&head, number)?,
            Statement::FunctionEnd => self.close(BlockKind::Function, number)?,
            Statement::ProgramOpen(name) => {
                self.emit("int main() {");
                self.open_block(BlockKind::Program, number, &name);
                self.scopes.push(ScopeKind::Program, &name);
                self.entry_declared = true;
            }
            Statement::ProgramEnd => self.close(BlockKind::Program, number)?,
            Statement::Use { module, only } => {
                match only {
                    None => self.emit(format!("using namespace {module};")),
                    Some(names) => {
                        for name in names {
                            self.emit(format!("using {module}::{name};"));
                        }
                    }
                }
                if !self.scopes.import_module(&module) {
                    debug!("module '{module}' is not defined in this unit");
                }
            }
            Statement::Declaration(decl) => self.lower_declaration(&decl, number),
            Statement::DoLoop {
                var,
                start,
                end,
                step,
            } => {
                let header = self.loop_header(&var, &start, &end, step.as_deref());
                self.emit(header);
                self.open_block(BlockKind::Loop, number, &var);
            }
            Statement::DoWhile(condition) => {
                let condition = self.expr(&condition);
                self.emit(format!("while ({condition}) {{"));
                self.open_block(BlockKind::Loop, number, "while");
            }
            Statement::EndDo => self.close(BlockKind::Loop, number)?,
            Statement::Print(items) => {
                let text = if items.is_empty() {
                    "cout << endl;".to_string()
                } else {
                    let values: Vec<String> = items.iter().map(|item| self.expr(item)).collect();
                    format!("cout << {} << endl;", values.join(" << \" \" << "))
                };
                self.emit(text);
            }
            Statement::Read(items) => {
                let targets: Vec<String> = items.iter().map(|item| self.expr(item)).collect();
                self.emit(format!("cin >> {};", targets.join(" >> ")));
            }
            Statement::IfJump { condition, jump } => {
                let condition = self.expr(&condition);
                self.emit(format!("if ({condition}) {};", jump.cpp_keyword()));
            }
            Statement::Jump(jump) => self.emit(format!("{};", jump.cpp_keyword())),
            Statement::Allocate { name, size } => {
                let size = self.expr(&size);
                self.emit(format!("{name}.resize({size});"));
            }
            Statement::Deallocate(name) => self.emit(format!("{name}.clear();")),
            Statement::End => match self.blocks.last() {
                Some(block) => {
                    let kind = block.kind;
                    self.close(kind, number)?;
                }
                None => debug!("line {number}: lone end with no open block"),
            },
            Statement::Assignment => {
                let mut text = self.expr(&line.code);
                if !text.ends_with(';') {
                    text.push(';');
                }
                self.emit(text);
            }
            Statement::Unrecognized => {
                warn!("line {number}: passing through '{}'", line.code);
                self.emit(line.code.trim());
                self.diagnostics.push(Diagnostic {
                    line: number,
                    kind: DiagnosticKind::PassThrough,
                    text: line.code.trim().to_string(),
                });
            }
        }
        Ok(())
    }

    fn open_function(&mut self, head: &FunctionHead, line: usize) -> Result<(), TranslateError> {
        if self.current_function.is_some() {
            return Err(TranslateError::NestedFunction { line });
        }
        let signature = match self.signatures.get(self.next_signature) {
            Some(signature) if signature.line == line => signature.clone(),
            _ => FunctionSignature::from_head(head, line),
        };
        self.next_signature += 1;

        self.emit(signature.header());
        self.open_block(BlockKind::Function, line, &signature.name);
        self.scopes.push(ScopeKind::Function, &signature.name);
        match signature.param_shape {
            ParamShape::Vector => self
                .scopes
                .declare_vector_parameter(&signature.param, signature.param_type),
            ParamShape::Scalar => self
                .scopes
                .declare_scalar(&signature.param, signature.param_type),
        }
        self.scopes
            .declare_scalar(&signature.result, signature.result_type);
        if !signature.result_declared {
            self.emit(format!(
                "{} {};",
                signature.result_type.cpp_name(),
                signature.result
            ));
        }
        self.current_function = Some(signature);
        Ok(())
    }

    /// Closes the innermost block, which must be of `kind`.
    fn close(&mut self, kind: BlockKind, line: usize) -> Result<(), TranslateError> {
        let inner_depth = self.blocks.len();
        let Some(block) = self.blocks.pop() else {
            return Err(TranslateError::UnexpectedEnd { line, found: kind });
        };
        if block.kind != kind {
            return Err(TranslateError::MismatchedEnd {
                line,
                expected: block.kind,
                found: kind,
            });
        }

        let outer_depth = self.blocks.len();
        match kind {
            BlockKind::Module => {
                self.scopes.pop();
                self.push_line(
                    outer_depth,
                    format!("}} // namespace {}", block.name),
                    block.placement,
                    false,
                );
            }
            BlockKind::Function => {
                let result = self
                    .current_function
                    .take()
                    .map_or_else(|| block.name.clone(), |signature| signature.result);
                self.scopes.pop();
                self.push_line(inner_depth, format!("return {result};"), block.placement, false);
                self.push_line(outer_depth, "}".to_string(), block.placement, false);
            }
            BlockKind::Program => {
                self.scopes.pop();
                self.push_line(inner_depth, "return 0;".to_string(), block.placement, false);
                self.push_line(outer_depth, "}".to_string(), block.placement, false);
            }
            BlockKind::Loop => {
                self.push_line(outer_depth, "}".to_string(), block.placement, false);
            }
        }
        Ok(())
    }

    fn open_block(&mut self, kind: BlockKind, line: usize, name: &str) {
        let placement = match self.blocks.first() {
            Some(outer) => outer.placement,
            None if kind == BlockKind::Loop => Placement::Loose,
            None => Placement::Unit,
        };
        self.blocks.push(Block {
            kind,
            line,
            name: name.to_string(),
            placement,
        });
    }

    fn loop_header(&self, var: &str, start: &str, end: &str, step: Option<&str>) -> String {
        let start = start.trim();
        let end_expr = self.expr(end);
        let zero_based = step.is_none()
            && start == "1"
            && self
                .current_function
                .as_ref()
                .is_some_and(|signature| signature.param_shape == ParamShape::Vector);
        if zero_based {
            return format!("for (int {var} = 0; {var} < {end_expr}; {var}++) {{");
        }

        let start_expr = self.expr(start);
        match step {
            None => format!("for (int {var} = {start_expr}; {var} <= {end_expr}; {var}++) {{"),
            Some(step) => {
                let step_expr = self.expr(step);
                let cmp = if step_expr.starts_with('-') { ">=" } else { "<=" };
                format!(
                    "for (int {var} = {start_expr}; {var} {cmp} {end_expr}; {var} += {step_expr}) {{"
                )
            }
        }
    }

    fn lower_declaration(&mut self, decl: &Declaration, line: usize) {
        for entity in &decl.rejected {
            self.drop_declaration(line, entity);
        }
        if decl.parameter {
            self.lower_parameters(decl, line);
            return;
        }
        let in_function = self.current_function.is_some();
        if in_function && decl.intent_in {
            for item in &decl.items {
                if item.effective_shape(decl) == Some(":") {
                    self.scopes.declare_vector_parameter(&item.name, decl.ty);
                }
            }
            return;
        }

        let ty = decl.ty.cpp_name();
        let mut out: Vec<String> = Vec::new();
        let mut scalars: Vec<String> = Vec::new();
        let mut scalar_slot: Option<usize> = None;

        for item in &decl.items {
            if self.is_current_param(&item.name) {
                continue;
            }
            match item.effective_shape(decl) {
                Some(":") if decl.allocatable => {
                    self.scopes.declare_array(&item.name, decl.ty);
                    out.push(format!("vector<{ty}> {};", item.name));
                }
                Some(":") => {
                    self.scopes.declare_vector_parameter(&item.name, decl.ty);
                }
                Some(size) => {
                    let text = match &item.init {
                        Some(init) => format!(
                            "vector<{ty}> {} = {};",
                            item.name,
                            self.initializer(init)
                        ),
                        None => format!("vector<{ty}> {}({});", item.name, self.expr(size)),
                    };
                    self.scopes.declare_array(&item.name, decl.ty);
                    out.push(text);
                }
                None => {
                    let part = match &item.init {
                        Some(init) => format!("{} = {}", item.name, self.expr(init)),
                        None => item.name.clone(),
                    };
                    self.scopes.declare_scalar(&item.name, decl.ty);
                    scalars.push(part);
                    if scalar_slot.is_none() {
                        scalar_slot = Some(out.len());
                        out.push(String::new());
                    }
                }
            }
        }

        if let Some(slot) = scalar_slot {
            out[slot] = format!("{ty} {};", scalars.join(", "));
        }
        if out.is_empty() {
            debug!("line {line}: declaration emits nothing");
        }
        for text in out {
            self.emit(text);
        }
    }

    fn lower_parameters(&mut self, decl: &Declaration, line: usize) {
        let ty = decl.ty.cpp_name();
        for item in &decl.items {
            let Some(init) = &item.init else {
                self.drop_declaration(line, &item.name);
                continue;
            };
            match item.effective_shape(decl) {
                Some(":") | Some("*") => self.drop_declaration(line, &item.name),
                Some(size) => {
                    let text = format!(
                        "{ty} {}[{}] = {};",
                        item.name,
                        self.expr(size),
                        self.initializer(init)
                    );
                    self.scopes.declare_fixed_array(&item.name, decl.ty);
                    self.emit(text);
                }
                None => {
                    let text = format!("const {ty} {} = {};", item.name, self.expr(init));
                    self.scopes.declare_constant(&item.name, decl.ty);
                    self.emit(text);
                }
            }
        }
    }

    fn drop_declaration(&mut self, line: usize, name: &str) {
        warn!("line {line}: cannot lower declaration item '{name}'");
        self.diagnostics.push(Diagnostic {
            line,
            kind: DiagnosticKind::DroppedDeclaration,
            text: name.to_string(),
        });
    }

    fn is_current_param(&self, name: &str) -> bool {
        self.current_function
            .as_ref()
            .is_some_and(|signature| signature.param.eq_ignore_ascii_case(name))
    }

    fn expr(&self, text: &str) -> String {
        Rewriter::new(&self.scopes).expression(text)
    }

    fn initializer(&self, text: &str) -> String {
        Rewriter::new(&self.scopes).initializer_list(text)
    }

    fn placement(&self) -> Placement {
        self.blocks
            .first()
            .map_or(Placement::Loose, |block| block.placement)
    }

    fn emit(&mut self, text: impl Into<String>) {
        let placement = self.placement();
        self.push_line(self.blocks.len(), text.into(), placement, false);
    }

    fn emit_trivia(&mut self, text: String) {
        let placement = self.placement();
        self.push_line(self.blocks.len(), text, placement, true);
    }

    fn push_line(&mut self, depth: usize, text: String, placement: Placement, trivia: bool) {
        self.lines.push(EmittedLine {
            depth,
            text,
            placement,
            trivia,
        });
    }
}
