//! Per-scope semantic context used during type checking and TIR generation.
//!
//! One [`TypeScope`] exists per code-producing construct: the module body,
//! each method, closure, lambda, object/trait/impl body and try-else body.
//! Scopes are chained through `Rc` parents; the locals table is chained
//! separately so that `lookup_with_parent` depths line up with runtime
//! scope frames.

use std::rc::Rc;

use crate::{symbol::SymbolTableRef, types::TypeLocation};

/// The semantic context of one lexical scope
#[derive(Debug)]
pub struct TypeScope {
    /// The dotted name of the module owning this scope
    pub module: String,
    /// The type `self` resolves to in this scope
    pub self_type: TypeLocation,
    /// The block type of the code object this scope produces
    pub block_type: TypeLocation,
    /// The locals of this scope
    pub locals: SymbolTableRef,
    /// The enclosing scope, if any
    pub parent: Option<Rc<TypeScope>>,
    /// The nearest enclosing method's block type, if any
    pub enclosing_method: Option<TypeLocation>,
}

impl TypeScope {
    /// Creates the root scope of a module body
    pub fn module_scope(
        module: String,
        self_type: TypeLocation,
        block_type: TypeLocation,
        locals: SymbolTableRef,
    ) -> Rc<Self> {
        Rc::new(Self {
            module,
            self_type,
            block_type,
            locals,
            parent: None,
            enclosing_method: None,
        })
    }

    /// Creates a method scope: `self` is the method's receiver type and the
    /// method becomes the enclosing method of nested scopes
    pub fn method_scope(
        parent: &Rc<TypeScope>,
        self_type: TypeLocation,
        block_type: TypeLocation,
        locals: SymbolTableRef,
    ) -> Rc<Self> {
        Rc::new(Self {
            module: parent.module.clone(),
            self_type,
            block_type,
            locals,
            parent: Some(parent.clone()),
            enclosing_method: Some(block_type),
        })
    }

    /// Creates a closure scope: `self` and the enclosing method are
    /// inherited from the parent
    pub fn closure_scope(
        parent: &Rc<TypeScope>,
        block_type: TypeLocation,
        locals: SymbolTableRef,
    ) -> Rc<Self> {
        Rc::new(Self {
            module: parent.module.clone(),
            self_type: parent.self_type,
            block_type,
            locals,
            parent: Some(parent.clone()),
            enclosing_method: parent.enclosing_method,
        })
    }

    /// Creates a lambda scope: `self` is the module type, so lambdas cannot
    /// close over the enclosing `self`, and there is no enclosing method
    pub fn lambda_scope(
        parent: &Rc<TypeScope>,
        module_type: TypeLocation,
        block_type: TypeLocation,
        locals: SymbolTableRef,
    ) -> Rc<Self> {
        Rc::new(Self {
            module: parent.module.clone(),
            self_type: module_type,
            block_type,
            locals,
            parent: Some(parent.clone()),
            enclosing_method: None,
        })
    }

    /// Creates the body scope of an `object`/`trait`/`impl` declaration:
    /// `self` becomes the declared type
    pub fn body_scope(
        parent: &Rc<TypeScope>,
        self_type: TypeLocation,
        locals: SymbolTableRef,
    ) -> Rc<Self> {
        Rc::new(Self {
            module: parent.module.clone(),
            self_type,
            block_type: parent.block_type,
            locals,
            parent: Some(parent.clone()),
            enclosing_method: None,
        })
    }

    /// True at the module's top level
    pub fn module_level(&self) -> bool {
        self.parent.is_none()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::symbol::SymbolTable;

    #[test]
    fn closures_inherit_self_and_method() {
        let module = TypeScope::module_scope(
            "main".to_string(),
            TypeLocation(1),
            TypeLocation(2),
            SymbolTable::new_ref(),
        );

        let method = TypeScope::method_scope(
            &module,
            TypeLocation(3),
            TypeLocation(4),
            SymbolTable::new_ref(),
        );
        assert_eq!(method.enclosing_method, Some(TypeLocation(4)));
        assert_eq!(method.self_type, TypeLocation(3));

        let closure =
            TypeScope::closure_scope(&method, TypeLocation(5), SymbolTable::new_ref());
        assert_eq!(closure.self_type, TypeLocation(3));
        assert_eq!(closure.enclosing_method, Some(TypeLocation(4)));
        assert!(!closure.module_level());
    }

    #[test]
    fn lambdas_reset_self_to_the_module() {
        let module = TypeScope::module_scope(
            "main".to_string(),
            TypeLocation(1),
            TypeLocation(2),
            SymbolTable::new_ref(),
        );

        let method = TypeScope::method_scope(
            &module,
            TypeLocation(3),
            TypeLocation(4),
            SymbolTable::new_ref(),
        );

        let lambda = TypeScope::lambda_scope(
            &method,
            TypeLocation(1),
            TypeLocation(6),
            SymbolTable::new_ref(),
        );
        assert_eq!(lambda.self_type, TypeLocation(1));
        assert_eq!(lambda.enclosing_method, None);
    }
}
