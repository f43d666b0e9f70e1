//! Process-wide compiler state.
//!
//! [`State`] is created once per compilation session, mutated as modules are
//! parsed and typed, and owned by the top-level driver. It bundles the
//! configuration, the type database, the diagnostics accumulator and the
//! module registry, plus the side tables the semantic passes decorate AST
//! nodes with. Decorations are keyed by [`AstIndex`] so the tree itself
//! stays frozen once desugaring is done.

use std::rc::Rc;

use indexmap::{IndexMap, IndexSet};

use crate::{
    ast::{AstIds, AstIndex},
    config::Config,
    diagnostics::Diagnostics,
    error::CompileError,
    module::{Module, QualifiedName},
    symbol::{Symbol, SymbolTableRef},
    types::{TypeDb, TypeLocation},
};

/// What an identifier resolved to
#[derive(Debug, Clone)]
pub enum IdentifierTarget {
    /// A local in this or an enclosing scope; depth counts parent hops
    Local { depth: usize, symbol: Rc<Symbol> },
    /// A method of the enclosing self type, called implicitly
    SelfMethod { method: TypeLocation },
    /// A module method stored as a global, called implicitly
    ModuleMethod { symbol: Rc<Symbol> },
    /// A plain module global
    Global { symbol: Rc<Symbol> },
}

/// What a constant reference resolved to
#[derive(Debug, Clone)]
pub enum ConstantTarget {
    /// An attribute of the enclosing self type
    SelfAttribute { name: String },
    /// A module global
    Global { symbol: Rc<Symbol> },
}

/// What a definition or reassignment writes to
#[derive(Debug, Clone)]
pub enum VariableTarget {
    /// A local at the given depth (0 for definitions)
    Local { depth: usize, symbol: Rc<Symbol> },
    /// An attribute of `self`
    Attribute { name: String },
    /// A constant: an attribute of `self`, plus a module global when
    /// defined at module scope
    Constant {
        name: String,
        global: Option<Rc<Symbol>>,
    },
}

/// Process-wide, mutable cross-module compilation context
#[derive(Debug)]
pub struct State {
    /// Session configuration
    pub config: Config,
    /// The type database
    pub types: TypeDb,
    /// The diagnostics accumulator
    pub diagnostics: Diagnostics,
    /// Compiled and in-progress modules, keyed by dotted qualified name
    pub modules: IndexMap<String, Module>,
    /// The AST node id allocator shared with the parser
    pub ast_ids: AstIds,

    /// Resolved type of every expression node
    ast_types: IndexMap<AstIndex, TypeLocation>,
    /// Block type of methods, closures, lambdas and try-else handlers
    block_types: IndexMap<AstIndex, TypeLocation>,
    /// Receiver type of sends
    receiver_types: IndexMap<AstIndex, TypeLocation>,
    /// Resolved throw type of sends and implicit calls
    throw_types: IndexMap<AstIndex, TypeLocation>,
    /// Identifier resolutions
    identifier_targets: IndexMap<AstIndex, IdentifierTarget>,
    /// Constant resolutions
    constant_targets: IndexMap<AstIndex, ConstantTarget>,
    /// Definition and reassignment targets
    variable_targets: IndexMap<AstIndex, VariableTarget>,
    /// Locals tables allocated per body-producing node
    body_locals: IndexMap<AstIndex, SymbolTableRef>,
    /// Sends that may find no method at runtime and need guarded dispatch
    possibly_undefined_sends: IndexSet<AstIndex>,
    /// Resolved `(object, trait)` pair of each trait implementation node
    implementation_targets: IndexMap<AstIndex, (TypeLocation, TypeLocation)>,
    /// Resolved method of each send, used by keyword-argument optimization
    send_methods: IndexMap<AstIndex, TypeLocation>,
}

impl State {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            types: TypeDb::new(),
            diagnostics: Diagnostics::new(),
            modules: IndexMap::new(),
            ast_ids: AstIds::new(),
            ast_types: IndexMap::new(),
            block_types: IndexMap::new(),
            receiver_types: IndexMap::new(),
            throw_types: IndexMap::new(),
            identifier_targets: IndexMap::new(),
            constant_targets: IndexMap::new(),
            variable_targets: IndexMap::new(),
            body_locals: IndexMap::new(),
            possibly_undefined_sends: IndexSet::new(),
            implementation_targets: IndexMap::new(),
            send_methods: IndexMap::new(),
        }
    }

    /// Creates a state sharing the given node id allocator, so externally
    /// built ASTs cannot collide with synthesized nodes
    pub fn with_ast_ids(config: Config, ast_ids: AstIds) -> Self {
        let mut state = Self::new(config);
        state.ast_ids = ast_ids;
        state
    }

    pub fn record(&mut self, error: CompileError) {
        self.diagnostics.push(error);
    }

    /// True once any error (not warning) has been recorded
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    pub fn module(&self, name: &QualifiedName) -> Option<&Module> {
        self.modules.get(&name.to_dotted())
    }

    pub fn module_mut(&mut self, name: &QualifiedName) -> Option<&mut Module> {
        self.modules.get_mut(&name.to_dotted())
    }

    /// True if a module with this name has been registered
    pub fn module_exists(&self, name: &QualifiedName) -> bool {
        self.modules.contains_key(&name.to_dotted())
    }

    pub fn add_module(&mut self, module: Module) {
        self.modules.insert(module.name.to_dotted(), module);
    }

    /// The names of all user-defined types, for error suggestions
    pub fn known_type_names(&self) -> Vec<String> {
        let mut names = Vec::new();

        for module in self.modules.values() {
            let globals = module.globals.borrow();

            for symbol in globals.symbols() {
                if self.types.block(symbol.value_type).is_none() {
                    names.push(format!("{}.{}", module.name, symbol.name));
                }
            }
        }

        names
    }

    pub fn set_node_type(&mut self, index: AstIndex, location: TypeLocation) {
        self.ast_types.insert(index, location);
    }

    /// The resolved type of a node; the `Error` sentinel when absent
    pub fn node_type(&self, index: AstIndex) -> TypeLocation {
        self.ast_types
            .get(&index)
            .copied()
            .unwrap_or(self.types.builtins().error)
    }

    /// The resolved type of a node, if one was recorded
    pub fn try_node_type(&self, index: AstIndex) -> Option<TypeLocation> {
        self.ast_types.get(&index).copied()
    }

    pub fn set_block_type(&mut self, index: AstIndex, location: TypeLocation) {
        self.block_types.insert(index, location);
    }

    pub fn block_type(&self, index: AstIndex) -> Option<TypeLocation> {
        self.block_types.get(&index).copied()
    }

    pub fn set_receiver_type(&mut self, index: AstIndex, location: TypeLocation) {
        self.receiver_types.insert(index, location);
    }

    pub fn receiver_type(&self, index: AstIndex) -> Option<TypeLocation> {
        self.receiver_types.get(&index).copied()
    }

    pub fn set_throw_type(&mut self, index: AstIndex, location: TypeLocation) {
        self.throw_types.insert(index, location);
    }

    pub fn throw_type(&self, index: AstIndex) -> Option<TypeLocation> {
        self.throw_types.get(&index).copied()
    }

    pub fn set_identifier_target(&mut self, index: AstIndex, target: IdentifierTarget) {
        self.identifier_targets.insert(index, target);
    }

    pub fn identifier_target(&self, index: AstIndex) -> Option<&IdentifierTarget> {
        self.identifier_targets.get(&index)
    }

    pub fn set_constant_target(&mut self, index: AstIndex, target: ConstantTarget) {
        self.constant_targets.insert(index, target);
    }

    pub fn constant_target(&self, index: AstIndex) -> Option<&ConstantTarget> {
        self.constant_targets.get(&index)
    }

    pub fn set_variable_target(&mut self, index: AstIndex, target: VariableTarget) {
        self.variable_targets.insert(index, target);
    }

    pub fn variable_target(&self, index: AstIndex) -> Option<&VariableTarget> {
        self.variable_targets.get(&index)
    }

    pub fn set_body_locals(&mut self, index: AstIndex, locals: SymbolTableRef) {
        self.body_locals.insert(index, locals);
    }

    pub fn body_locals(&self, index: AstIndex) -> Option<SymbolTableRef> {
        self.body_locals.get(&index).cloned()
    }

    pub fn mark_possibly_undefined(&mut self, index: AstIndex) {
        self.possibly_undefined_sends.insert(index);
    }

    pub fn possibly_undefined(&self, index: AstIndex) -> bool {
        self.possibly_undefined_sends.contains(&index)
    }

    pub fn set_implementation_target(
        &mut self,
        index: AstIndex,
        object: TypeLocation,
        trait_type: TypeLocation,
    ) {
        self.implementation_targets.insert(index, (object, trait_type));
    }

    pub fn implementation_target(&self, index: AstIndex) -> Option<(TypeLocation, TypeLocation)> {
        self.implementation_targets.get(&index).copied()
    }

    pub fn set_send_method(&mut self, index: AstIndex, method: TypeLocation) {
        self.send_methods.insert(index, method);
    }

    pub fn send_method(&self, index: AstIndex) -> Option<TypeLocation> {
        self.send_methods.get(&index).copied()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::file::SourceFile;

    #[test]
    fn node_types_default_to_the_error_sentinel() {
        let state = State::new(Config::default());
        let error = state.types.builtins().error;

        assert_eq!(state.node_type(AstIndex(42)), error);
        assert_eq!(state.try_node_type(AstIndex(42)), None);
    }

    #[test]
    fn modules_register_by_dotted_name() {
        let mut state = State::new(Config::default());
        let name = QualifiedName::from_dotted("std.string");

        assert!(!state.module_exists(&name));

        state.add_module(Module::new(
            name.clone(),
            SourceFile::new(vec!["std".into(), "string".into()], "".to_string()),
        ));

        assert!(state.module_exists(&name));
        assert_eq!(state.module(&name).unwrap().name, name);
    }
}
