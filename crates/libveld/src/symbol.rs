//! Symbol tables and lexical name binding for the Veld language compiler.
//!
//! A [`SymbolTable`] is an ordered mapping from names to [`Symbol`]s with
//! stable indices, plus an optional parent pointer. Tables are chained for
//! lexical scoping: `lookup_with_parent` walks the parent links and reports
//! how many hops were needed, which is exactly the closure-capture depth the
//! TIR generator encodes into `GetParentLocal` / `SetParentLocal`
//! instructions.
//!
//! Each symbol carries a reference count. Name resolution bumps it through
//! [`Symbol::reference`]; at the end of a block, locals that were never
//! referenced (and whose name does not start with `_`) produce an
//! unused-local warning.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

use indexmap::IndexMap;

use crate::{error::CompileError, span::Span, types::TypeLocation};

/// A named binding of a value to a type
#[derive(Debug)]
pub struct Symbol {
    /// The symbol's name
    pub name: String,
    /// Index into the owning table; stable for the table's lifetime
    pub index: usize,
    /// The type of the bound value
    pub value_type: TypeLocation,
    /// Whether the binding may be reassigned
    pub mutable: bool,
    /// Number of times this symbol has been referenced
    references: Cell<usize>,
    /// Where the symbol was defined; `None` for compiler-defined symbols
    pub span: Option<Span>,
}

impl Symbol {
    /// Marks the symbol as referenced
    pub fn reference(&self) {
        self.references.set(self.references.get() + 1);
    }

    /// True if the symbol was never referenced
    pub fn unused(&self) -> bool {
        self.references.get() == 0
    }

    /// The number of recorded references
    pub fn references(&self) -> usize {
        self.references.get()
    }
}

/// Shared handle to a symbol table, used for parent chains
pub type SymbolTableRef = Rc<RefCell<SymbolTable>>;

/// Ordered mapping from names to symbols with an optional parent scope
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    symbols: IndexMap<String, Rc<Symbol>>,
    parent: Option<SymbolTableRef>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new shared table without a parent
    pub fn new_ref() -> SymbolTableRef {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Creates a new shared table chained to the given parent
    pub fn with_parent(parent: SymbolTableRef) -> SymbolTableRef {
        Rc::new(RefCell::new(Self {
            symbols: IndexMap::new(),
            parent: Some(parent),
        }))
    }

    /// Defines a new symbol in this table.
    ///
    /// Redefining an existing name in the same scope is an error; parent
    /// scopes are not consulted, so shadowing an outer name is allowed.
    pub fn define(
        &mut self,
        name: String,
        value_type: TypeLocation,
        mutable: bool,
        span: Option<Span>,
    ) -> Result<Rc<Symbol>, CompileError> {
        if let Some(existing) = self.symbols.get(&name) {
            let old_position = existing
                .span
                .as_ref()
                .map(|span| span.to_range())
                .unwrap_or(0..0);
            let new_span = span.unwrap_or_else(|| {
                existing
                    .span
                    .clone()
                    .expect("a redefinition of a compiler-defined symbol carries a span")
            });

            return Err(CompileError::already_defined(old_position, &new_span));
        }

        let symbol = Rc::new(Symbol {
            name: name.clone(),
            index: self.symbols.len(),
            value_type,
            mutable,
            references: Cell::new(0),
            span,
        });

        self.symbols.insert(name, symbol.clone());
        Ok(symbol)
    }

    /// Looks up a symbol in this table only
    pub fn lookup(&self, name: &str) -> Option<Rc<Symbol>> {
        self.symbols.get(name).cloned()
    }

    /// Looks up a symbol in this table or any parent.
    ///
    /// Returns the number of parent hops walked together with the symbol:
    /// depth 0 means the symbol lives in this table, depth greater than zero
    /// means it lives in an enclosing scope (a capture for closures). `None`
    /// is the explicit not-found marker.
    pub fn lookup_with_parent(&self, name: &str) -> Option<(usize, Rc<Symbol>)> {
        if let Some(symbol) = self.symbols.get(name) {
            return Some((0, symbol.clone()));
        }

        let mut depth = 1;
        let mut current = self.parent.clone();

        while let Some(table) = current {
            let table = table.borrow();

            if let Some(symbol) = table.symbols.get(name) {
                return Some((depth, symbol.clone()));
            }

            depth += 1;
            current = table.parent.clone();
        }

        None
    }

    /// True if this table (ignoring parents) defines the name
    pub fn defines(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    /// The symbols in definition order
    pub fn symbols(&self) -> impl Iterator<Item = &Rc<Symbol>> {
        self.symbols.values()
    }

    /// The names in definition order
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.symbols.keys()
    }

    pub fn get_index(&self, index: usize) -> Option<Rc<Symbol>> {
        self.symbols.get_index(index).map(|(_, symbol)| symbol.clone())
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Locals that were never referenced and do not opt out via a `_` prefix
    pub fn unused_symbols(&self) -> impl Iterator<Item = &Rc<Symbol>> {
        self.symbols
            .values()
            .filter(|symbol| symbol.unused() && !symbol.name.starts_with('_'))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::file::SourceFile;

    fn span(range: std::ops::Range<usize>) -> Span {
        Span::new(range, SourceFile::new(vec!["test".into()], "let a = 1\nlet a = 2".to_string()))
    }

    #[test]
    fn define_assigns_stable_indices() {
        let mut table = SymbolTable::new();
        let first = table.define("a".into(), TypeLocation(1), false, Some(span(4..5))).unwrap();
        let second = table.define("b".into(), TypeLocation(2), true, Some(span(14..15))).unwrap();

        assert_eq!(first.index, 0);
        assert_eq!(second.index, 1);
        assert!(second.mutable);
    }

    #[test]
    fn redefining_in_same_scope_is_an_error() {
        let mut table = SymbolTable::new();
        table.define("a".into(), TypeLocation(1), false, Some(span(4..5))).unwrap();

        let error = table
            .define("a".into(), TypeLocation(2), false, Some(span(14..15)))
            .unwrap_err();
        assert!(error.is_already_defined());
    }

    #[test]
    fn lookup_with_parent_reports_depth() {
        let grandparent = SymbolTable::new_ref();
        grandparent
            .borrow_mut()
            .define("a".into(), TypeLocation(1), false, None)
            .unwrap();

        let parent = SymbolTable::with_parent(grandparent);
        parent
            .borrow_mut()
            .define("b".into(), TypeLocation(2), false, None)
            .unwrap();

        let child = SymbolTable::with_parent(parent);
        child
            .borrow_mut()
            .define("c".into(), TypeLocation(3), false, None)
            .unwrap();

        let child = child.borrow();
        let (depth, symbol) = child.lookup_with_parent("c").unwrap();
        assert_eq!((depth, symbol.name.as_str()), (0, "c"));

        let (depth, symbol) = child.lookup_with_parent("b").unwrap();
        assert_eq!((depth, symbol.name.as_str()), (1, "b"));

        let (depth, symbol) = child.lookup_with_parent("a").unwrap();
        assert_eq!((depth, symbol.name.as_str()), (2, "a"));

        assert!(child.lookup_with_parent("missing").is_none());
    }

    #[test]
    fn shadowing_an_outer_name_is_allowed() {
        let parent = SymbolTable::new_ref();
        parent
            .borrow_mut()
            .define("a".into(), TypeLocation(1), false, None)
            .unwrap();

        let child = SymbolTable::with_parent(parent);
        child
            .borrow_mut()
            .define("a".into(), TypeLocation(2), false, None)
            .unwrap();

        let child = child.borrow();
        let (depth, symbol) = child.lookup_with_parent("a").unwrap();
        assert_eq!(depth, 0);
        assert_eq!(symbol.value_type, TypeLocation(2));
    }

    #[test]
    fn unused_symbols_skip_underscore_names() {
        let mut table = SymbolTable::new();
        table.define("used".into(), TypeLocation(1), false, None).unwrap();
        table.define("unused".into(), TypeLocation(1), false, None).unwrap();
        table.define("_ignored".into(), TypeLocation(1), false, None).unwrap();

        table.lookup("used").unwrap().reference();

        let unused = table.unused_symbols().map(|symbol| symbol.name.clone()).collect::<Vec<_>>();
        assert_eq!(unused, vec!["unused".to_string()]);
    }
}
