//! Name resolution during compilation.
//!
//! Each function body gets its own [`SymbolTable`], chained to the table of
//! the enclosing scope. Resolving a name that lives in an enclosing function
//! turns it into a free variable of the requesting function.

use rustc_hash::FxHashMap;

/// Where a symbol's value lives at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolScope {
    /// A global slot
    Global,
    /// A slot in the current frame
    Local,
    /// An entry of the builtin registry
    Builtin,
    /// A value captured by the current closure
    Free,
    /// The executing closure itself
    Function,
}

/// A resolved name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// The name as written
    pub name: String,
    /// Where the value lives
    pub scope: SymbolScope,
    /// Slot index within the scope
    pub index: usize,
}

impl Symbol {
    fn new(name: &str, scope: SymbolScope, index: usize) -> Self {
        Self {
            name: name.to_string(),
            scope,
            index,
        }
    }
}

/// The outcome of resolving a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Bound in this table, or a global or builtin reached through the chain
    Found(Symbol),
    /// Bound in an enclosing function and now captured as a free variable
    Captured(Symbol),
    /// Not bound anywhere in the chain
    NotFound,
}

impl Resolution {
    /// Returns the resolved symbol, if any.
    pub fn into_symbol(self) -> Option<Symbol> {
        match self {
            Resolution::Found(symbol) | Resolution::Captured(symbol) => Some(symbol),
            Resolution::NotFound => None,
        }
    }
}

/// A scope of name bindings.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    /// The enclosing table
    pub outer: Option<Box<SymbolTable>>,
    /// Symbols of enclosing scopes captured by this one, in capture order.
    ///
    /// Each entry is the symbol as seen from the enclosing scope.
    pub free_symbols: Vec<Symbol>,
    store: FxHashMap<String, Symbol>,
    num_definitions: usize,
}

impl SymbolTable {
    /// Creates the outermost (global) table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table nested inside `outer`.
    pub fn new_enclosed(outer: SymbolTable) -> Self {
        Self {
            outer: Some(Box::new(outer)),
            ..Self::default()
        }
    }

    /// Detaches and returns the enclosing table.
    pub fn take_outer(&mut self) -> Option<SymbolTable> {
        self.outer.take().map(|outer| *outer)
    }

    /// Number of global or local slots defined in this table.
    pub fn num_definitions(&self) -> usize {
        self.num_definitions
    }

    /// Defines `name` as a global (outermost table) or local.
    ///
    /// Redefining a name already bound with the same scope reuses its slot.
    pub fn define(&mut self, name: &str) -> Symbol {
        let scope = if self.outer.is_none() {
            SymbolScope::Global
        } else {
            SymbolScope::Local
        };

        if let Some(existing) = self.store.get(name) {
            if existing.scope == scope {
                return existing.clone();
            }
        }

        let symbol = Symbol::new(name, scope, self.num_definitions);
        self.num_definitions += 1;
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Registers a builtin under its registry index.
    pub fn define_builtin(&mut self, index: usize, name: &str) -> Symbol {
        let symbol = Symbol::new(name, SymbolScope::Builtin, index);
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    /// Registers the self-reference of a named function literal.
    pub fn define_function_name(&mut self, name: &str) -> Symbol {
        let symbol = Symbol::new(name, SymbolScope::Function, 0);
        self.store.insert(name.to_string(), symbol.clone());
        symbol
    }

    fn define_free(&mut self, original: Symbol) -> Symbol {
        let symbol = Symbol::new(&original.name, SymbolScope::Free, self.free_symbols.len());
        self.free_symbols.push(original);
        self.store.insert(symbol.name.clone(), symbol.clone());
        symbol
    }

    /// Resolves `name` through the chain of tables.
    pub fn resolve(&mut self, name: &str) -> Resolution {
        if let Some(symbol) = self.store.get(name) {
            return Resolution::Found(symbol.clone());
        }

        let Some(outer) = self.outer.as_mut() else {
            return Resolution::NotFound;
        };

        match outer.resolve(name).into_symbol() {
            None => Resolution::NotFound,
            Some(symbol) => match symbol.scope {
                SymbolScope::Global | SymbolScope::Builtin => Resolution::Found(symbol),
                SymbolScope::Local | SymbolScope::Free | SymbolScope::Function => {
                    Resolution::Captured(self.define_free(symbol))
                }
            },
        }
    }

    /// Resolves `name`, discarding how it was found.
    pub fn lookup(&mut self, name: &str) -> Option<Symbol> {
        self.resolve(name).into_symbol()
    }
}
