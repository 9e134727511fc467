use std::collections::HashMap;

use tracing::debug;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(super) enum ScalarType {
    Int,
    Double,
    Bool,
}

impl ScalarType {
    pub(super) fn from_type_spec(spec: &str) -> Self {
        let lowered = spec.trim().to_ascii_lowercase();
        if lowered.starts_with("integer") {
            ScalarType::Int
        } else if lowered.starts_with("logical") {
            ScalarType::Bool
        } else {
            ScalarType::Double
        }
    }

    pub(super) fn cpp_name(self) -> &'static str {
        match self {
            ScalarType::Int => "int",
            ScalarType::Double => "double",
            ScalarType::Bool => "bool",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(super) enum SymbolKind {
    Scalar,
    Constant,
    /// Fixed or sized sequence, one-based in the source.
    Array,
    /// `parameter` array, emitted as a C array rather than a `vector`.
    FixedArray,
    /// Deferred-shape sequence, already zero-based once rewritten.
    VectorParameter,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(super) struct Symbol {
    pub(super) kind: SymbolKind,
    pub(super) ty: ScalarType,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(super) enum ScopeKind {
    Unit,
    Module,
    Function,
    Program,
}

#[derive(Debug)]
struct Scope {
    kind: ScopeKind,
    name: String,
    symbols: HashMap<String, Symbol>,
}

impl Scope {
    fn new(kind: ScopeKind, name: &str) -> Self {
        Self {
            kind,
            name: name.to_ascii_lowercase(),
            symbols: HashMap::new(),
        }
    }
}

/// Stack of symbol tables, innermost last. Names are case-insensitive.
///
/// Function scopes are popped at `end function`, so a vector parameter is only
/// visible inside the function that declared it. Module scopes are kept after
/// they close so that `use` can bring their names back.
#[derive(Debug)]
pub(super) struct SymbolScopes {
    stack: Vec<Scope>,
    modules: HashMap<String, HashMap<String, Symbol>>,
}

impl SymbolScopes {
    pub(super) fn new() -> Self {
        Self {
            stack: vec![Scope::new(ScopeKind::Unit, "")],
            modules: HashMap::new(),
        }
    }

    pub(super) fn push(&mut self, kind: ScopeKind, name: &str) {
        debug!("enter {kind:?} scope '{name}'");
        self.stack.push(Scope::new(kind, name));
    }

    /// Pops the innermost scope. The translation-unit scope is never popped.
    pub(super) fn pop(&mut self) -> Option<ScopeKind> {
        if self.stack.len() <= 1 {
            return None;
        }
        let scope = self.stack.pop()?;
        debug!("leave {:?} scope '{}'", scope.kind, scope.name);
        if scope.kind == ScopeKind::Module {
            self.modules.insert(scope.name, scope.symbols);
        }
        Some(scope.kind)
    }

    pub(super) fn declare_array(&mut self, name: &str, ty: ScalarType) {
        self.declare(name, SymbolKind::Array, ty);
    }

    pub(super) fn declare_fixed_array(&mut self, name: &str, ty: ScalarType) {
        self.declare(name, SymbolKind::FixedArray, ty);
    }

    pub(super) fn declare_vector_parameter(&mut self, name: &str, ty: ScalarType) {
        self.declare(name, SymbolKind::VectorParameter, ty);
    }

    pub(super) fn declare_scalar(&mut self, name: &str, ty: ScalarType) {
        self.declare(name, SymbolKind::Scalar, ty);
    }

    pub(super) fn declare_constant(&mut self, name: &str, ty: ScalarType) {
        self.declare(name, SymbolKind::Constant, ty);
    }

    fn declare(&mut self, name: &str, kind: SymbolKind, ty: ScalarType) {
        if let Some(scope) = self.stack.last_mut() {
            scope
                .symbols
                .insert(name.to_ascii_lowercase(), Symbol { kind, ty });
        }
    }

    pub(super) fn lookup(&self, name: &str) -> Option<Symbol> {
        let key = name.to_ascii_lowercase();
        self.stack
            .iter()
            .rev()
            .find_map(|scope| scope.symbols.get(&key).copied())
    }

    pub(super) fn is_array(&self, name: &str) -> bool {
        self.lookup(name).is_some_and(|symbol| {
            matches!(symbol.kind, SymbolKind::Array | SymbolKind::FixedArray)
        })
    }

    pub(super) fn is_fixed_array(&self, name: &str) -> bool {
        self.lookup(name)
            .is_some_and(|symbol| symbol.kind == SymbolKind::FixedArray)
    }

    pub(super) fn is_vector_parameter(&self, name: &str) -> bool {
        self.lookup(name)
            .is_some_and(|symbol| symbol.kind == SymbolKind::VectorParameter)
    }

    pub(super) fn is_sequence(&self, name: &str) -> bool {
        self.is_array(name) || self.is_vector_parameter(name)
    }

    /// True when `name` resolves to a vector parameter owned by the innermost
    /// enclosing function.
    pub(super) fn is_current_vector_parameter(&self, name: &str) -> bool {
        let key = name.to_ascii_lowercase();
        for scope in self.stack.iter().rev() {
            if let Some(symbol) = scope.symbols.get(&key) {
                return scope.kind == ScopeKind::Function
                    && symbol.kind == SymbolKind::VectorParameter;
            }
            if scope.kind == ScopeKind::Function {
                return false;
            }
        }
        false
    }

    /// Copies a closed module's names into the current scope.
    pub(super) fn import_module(&mut self, module: &str) -> bool {
        let Some(symbols) = self.modules.get(&module.to_ascii_lowercase()) else {
            return false;
        };
        let imported: Vec<(String, Symbol)> = symbols
            .iter()
            .map(|(name, symbol)| (name.clone(), *symbol))
            .collect();
        if let Some(scope) = self.stack.last_mut() {
            scope.symbols.extend(imported);
        }
        true
    }
}
