//! Typing of declarations: methods, closures, lambdas, objects, traits,
//! trait implementations and reopenings.

use std::rc::Rc;

use log::debug;

use crate::{
    ast::{
        BlockAst, BlockLiteralKind, DefineArgumentAst, MethodAst, MethodBoundAst, ObjectAst,
        ReopenObjectAst, TraitAst, TraitImplementationAst, TypeParameterAst,
    },
    error::CompileError,
    scope::TypeScope,
    symbol::SymbolTable,
    types::{
        BlockArgument, BlockKind, BlockType, ObjectType, TypeKind, TypeLocation, TypeParameters,
    },
};

use super::DefineType;

impl<'a> DefineType<'a> {
    /// Declares a method: builds its block type and attaches it to the
    /// enclosing self type. The body is type-checked later, once the whole
    /// enclosing body has been walked.
    pub(crate) fn on_method(
        &mut self,
        method: &MethodAst,
        scope: &Rc<TypeScope>,
    ) -> TypeLocation {
        let self_type = scope.self_type;
        let mut block = BlockType::new(BlockKind::Method, method.name.clone(), self_type);

        block.type_parameters =
            self.declare_type_parameters(&method.type_parameters, scope);
        self.declare_method_bounds(&mut block, &method.method_bounds, scope);

        for argument in method.arguments.iter() {
            let declared = self.determine_argument_type(argument, None, scope);
            block.arguments.push(declared);
        }

        block.throw_type = method
            .throw_annotation
            .as_ref()
            .map(|annotation| self.resolve_type_name(annotation, scope));
        block.infer_throw_type = false;

        block.return_type = match method.return_annotation.as_ref() {
            Some(annotation) => self.resolve_type_name(annotation, scope),
            None => self.state.types.builtins().nil,
        };

        let location = self.state.types.alloc(TypeKind::Block(block));

        self.attach_method(method, location, scope);
        self.state.set_block_type(method.index, location);
        location
    }

    fn attach_method(&mut self, method: &MethodAst, location: TypeLocation, scope: &Rc<TypeScope>) {
        let self_type = scope.self_type;

        match self.state.types.get(self_type) {
            TypeKind::Object(_) => {
                if method.body.is_none() {
                    self.state
                        .record(CompileError::required_method_outside_trait(&method.span));
                    return;
                }

                let defined = self
                    .state
                    .types
                    .object_mut(self_type)
                    .expect("matched as an object above")
                    .attributes
                    .define(method.name.clone(), location, false, Some(method.span.clone()));

                if let Err(error) = defined {
                    self.state.record(error);
                    return;
                }

                // Module methods are also module globals.
                if scope.module_level() {
                    let globals = self
                        .state
                        .module(&self.module)
                        .map(|module| module.globals.clone());

                    if let Some(globals) = globals {
                        let defined = globals.borrow_mut().define(
                            method.name.clone(),
                            location,
                            false,
                            Some(method.span.clone()),
                        );

                        if let Err(error) = defined {
                            self.state.record(error);
                        }
                    }
                }
            }
            TypeKind::Trait(_) => {
                let trait_type = self
                    .state
                    .types
                    .trait_type_mut(self_type)
                    .expect("matched as a trait above");

                let into = if method.body.is_some() {
                    &mut trait_type.default_methods
                } else {
                    &mut trait_type.required_methods
                };

                if let Err(error) =
                    into.define(method.name.clone(), location, false, Some(method.span.clone()))
                {
                    self.state.record(error);
                }
            }
            _ => {
                let name = self.state.types.name_of(self_type);
                self.state
                    .record(CompileError::not_an_object(name, &method.span));
            }
        }
    }

    /// Type-checks a deferred method body
    pub(crate) fn check_method_body(
        &mut self,
        method: &MethodAst,
        location: TypeLocation,
        outer: &Rc<TypeScope>,
    ) {
        let Some(body) = method.body.as_ref() else { return };

        let locals = self
            .state
            .body_locals(body.index)
            .unwrap_or_else(SymbolTable::new_ref);

        let arguments = self
            .state
            .types
            .block(location)
            .map(|block| block.arguments.clone())
            .unwrap_or_default();

        for (argument, node) in arguments.iter().zip(method.arguments.iter()) {
            let defined = locals.borrow_mut().define(
                argument.name.clone(),
                argument.value_type,
                false,
                Some(node.span.clone()),
            );

            match defined {
                // Arguments are bound by the calling convention, so they do
                // not participate in unused-local warnings.
                Ok(symbol) => symbol.reference(),
                Err(error) => self.state.record(error),
            }
        }

        debug!("checking body of method {}", method.name);

        let scope = TypeScope::method_scope(outer, outer.self_type, location, locals.clone());
        self.on_body(body, &scope);
        self.warn_unused_locals(&locals);
    }

    /// Types a closure or lambda literal, inferring unannotated argument
    /// types from the expected block type when one is known
    pub(crate) fn on_block_literal(
        &mut self,
        block_node: &BlockAst,
        scope: &Rc<TypeScope>,
        expected: Option<TypeLocation>,
    ) -> TypeLocation {
        let expected_block = expected
            .and_then(|location| self.state.types.block(location))
            .map(|block| block.clone());

        // An unannotated closure passed where a lambda is expected becomes
        // a lambda.
        let kind = match (block_node.kind, expected_block.as_ref().map(|block| block.kind)) {
            (BlockLiteralKind::Lambda, _) => BlockKind::Lambda,
            (BlockLiteralKind::Closure, Some(BlockKind::Lambda)) => BlockKind::Lambda,
            (BlockLiteralKind::Closure, _) => BlockKind::Closure,
        };

        let module_type = self.module_type();
        let (self_type, name) = match kind {
            BlockKind::Lambda => (module_type, "<lambda>"),
            _ => (scope.self_type, "<closure>"),
        };

        let mut block = BlockType::new(kind, name.to_string(), self_type);

        for (position, argument) in block_node.arguments.iter().enumerate() {
            let expected_argument = expected_block
                .as_ref()
                .and_then(|expected| expected.arguments.get(position))
                .map(|argument| argument.value_type);

            let declared = self.determine_argument_type(argument, expected_argument, scope);
            block.arguments.push(declared);
        }

        block.throw_type = block_node
            .throw_annotation
            .as_ref()
            .map(|annotation| self.resolve_type_name(annotation, scope));
        block.infer_throw_type = block.throw_type.is_none();

        let declared_return = block_node
            .return_annotation
            .as_ref()
            .map(|annotation| self.resolve_type_name(annotation, scope));
        block.infer_return_type = declared_return.is_none();
        block.return_type = declared_return.unwrap_or(TypeLocation::UNDEFINED);

        let location = self.state.types.alloc(TypeKind::Block(block));
        self.state.set_block_type(block_node.index, location);

        let locals = self
            .state
            .body_locals(block_node.body.index)
            .unwrap_or_else(SymbolTable::new_ref);

        let arguments = self
            .state
            .types
            .block(location)
            .map(|block| block.arguments.clone())
            .unwrap_or_default();

        for (argument, node) in arguments.iter().zip(block_node.arguments.iter()) {
            let defined = locals.borrow_mut().define(
                argument.name.clone(),
                argument.value_type,
                false,
                Some(node.span.clone()),
            );

            match defined {
                Ok(symbol) => symbol.reference(),
                Err(error) => self.state.record(error),
            }
        }

        let block_scope = match kind {
            BlockKind::Lambda => {
                TypeScope::lambda_scope(scope, module_type, location, locals.clone())
            }
            _ => TypeScope::closure_scope(scope, location, locals.clone()),
        };

        let body_type = self.on_body(&block_node.body, &block_scope);

        let declared = self
            .state
            .types
            .block(location)
            .map(|block| (block.infer_return_type, block.return_type));

        match declared {
            Some((true, _)) => {
                if let Some(block) = self.state.types.block_mut(location) {
                    block.return_type = body_type;
                }
            }
            Some((false, return_type)) => {
                if !self.state.types.type_compatible(body_type, return_type) {
                    self.type_mismatch(return_type, body_type, &block_node.span);
                }
            }
            None => {}
        }

        self.warn_unused_locals(&locals);
        location
    }

    /// Determines the declared type of one argument.
    ///
    /// Annotation and default must agree; the annotation wins. With only a
    /// default, its type is used. With neither, the caller-provided
    /// expectation applies (closure argument inference); without one the
    /// argument type is simply missing. A rest argument's annotation names
    /// the element type, the argument itself collects into an array of it.
    pub(crate) fn determine_argument_type(
        &mut self,
        argument: &DefineArgumentAst,
        expected: Option<TypeLocation>,
        scope: &Rc<TypeScope>,
    ) -> BlockArgument {
        let annotated = argument
            .annotation
            .as_ref()
            .map(|annotation| self.resolve_type_name(annotation, scope));

        let value_type = match (annotated, argument.default.as_deref()) {
            (Some(annotated), Some(default)) => {
                let default_type = self.on_expression(default, scope, Some(annotated));

                // Rest defaults build arrays, compared against the
                // collected type below.
                if !argument.rest && !self.state.types.type_compatible(default_type, annotated) {
                    self.type_mismatch(annotated, default_type, default.span());
                }

                annotated
            }
            (Some(annotated), None) => annotated,
            (None, Some(default)) => self.on_expression(default, scope, None),
            (None, None) => match expected {
                Some(expected) => expected,
                None => {
                    self.state
                        .record(CompileError::argument_type_missing(&argument.span));
                    self.state.types.builtins().error
                }
            },
        };

        if argument.rest {
            let collected = self.state.types.new_array_of_type(value_type);
            BlockArgument::rest(argument.name.clone(), collected)
        } else if argument.default.is_some() {
            BlockArgument::with_default(argument.name.clone(), value_type)
        } else {
            BlockArgument::new(argument.name.clone(), value_type)
        }
    }

    fn declare_type_parameters(
        &mut self,
        declared: &[TypeParameterAst],
        scope: &Rc<TypeScope>,
    ) -> TypeParameters {
        let mut parameters = TypeParameters::new();

        for parameter in declared.iter() {
            let mut record = crate::types::TypeParameterType::new(parameter.name.clone());

            for requirement in parameter.required_traits.iter() {
                let location = self.resolve_type_name(requirement, scope);

                match self.state.types.trait_type(location) {
                    Some(trait_type) => {
                        let name = trait_type.name.clone();
                        record.require_trait(name, location);
                    }
                    None if self.state.types.is_error(location) => {}
                    None => {
                        let name = self.state.types.name_of(location);
                        self.state.record(
                            CompileError::invalid_type_parameter_requirement(
                                name,
                                requirement.span(),
                            ),
                        );
                    }
                }
            }

            let location = self.state.types.alloc(TypeKind::TypeParameter(record));
            parameters.define(parameter.name.clone(), location);
        }

        parameters
    }

    fn declare_method_bounds(
        &mut self,
        block: &mut BlockType,
        bounds: &[MethodBoundAst],
        scope: &Rc<TypeScope>,
    ) {
        for bound in bounds.iter() {
            let mut required = Vec::new();

            for requirement in bound.required_traits.iter() {
                let location = self.resolve_type_name(requirement, scope);

                if self.state.types.trait_type(location).is_some() {
                    required.push(location);
                } else if !self.state.types.is_error(location) {
                    let name = self.state.types.name_of(location);
                    self.state
                        .record(CompileError::invalid_type_parameter_requirement(
                            name,
                            requirement.span(),
                        ));
                }
            }

            block.method_bounds.insert(bound.parameter.clone(), required);
        }
    }

    /// Types an `object` declaration body with the declared type as `self`
    pub(crate) fn on_object(&mut self, object: &ObjectAst, scope: &Rc<TypeScope>) -> TypeLocation {
        let location = match self.state.try_node_type(object.index) {
            // Module-level declarations were created by DefineTypeSignatures.
            Some(location) if !self.state.types.is_error(location) => location,
            _ => {
                // A nested object becomes a constant of the enclosing type.
                let prototype = self.state.types.builtins().object;
                let record = ObjectType::new(object.name.clone(), Some(prototype));
                let location = self.state.types.alloc(TypeKind::Object(record));

                let defined = self.state.types.object_mut(scope.self_type).map(|parent| {
                    parent.attributes.define(
                        object.name.clone(),
                        location,
                        false,
                        Some(object.span.clone()),
                    )
                });

                if let Some(Err(error)) = defined {
                    self.state.record(error);
                }

                location
            }
        };

        self.fill_type_parameter_requirements(location, &object.type_parameters, scope);
        self.check_declaration_body(&object.body, location, scope);
        location
    }

    /// Types a `trait` declaration body: resolves required traits, then
    /// processes required and default methods with the trait as `self`
    pub(crate) fn on_trait(&mut self, trait_node: &TraitAst, scope: &Rc<TypeScope>) -> TypeLocation {
        let location = match self.state.try_node_type(trait_node.index) {
            Some(location) if !self.state.types.is_error(location) => location,
            _ => return self.state.types.builtins().error,
        };

        for requirement in trait_node.required_traits.iter() {
            let required = self.resolve_type_name(requirement, scope);

            match self.state.types.trait_type(required) {
                Some(trait_type) => {
                    let name = trait_type.name.clone();

                    if let Some(this) = self.state.types.trait_type_mut(location) {
                        this.require_trait(name, required);
                    }
                }
                None if self.state.types.is_error(required) => {}
                None => {
                    let name = self.state.types.name_of(required);
                    self.state
                        .record(CompileError::not_a_trait(name, requirement.span()));
                }
            }
        }

        self.fill_type_parameter_requirements(location, &trait_node.type_parameters, scope);
        self.check_declaration_body(&trait_node.body, location, scope);
        location
    }

    /// Validates an `impl Trait for Type` and types its body.
    ///
    /// Required traits must already be implemented and required methods
    /// must end up implemented with compatible signatures; on failure the
    /// tentative implementation is retracted.
    pub(crate) fn on_trait_implementation(
        &mut self,
        implementation: &TraitImplementationAst,
        scope: &Rc<TypeScope>,
    ) -> TypeLocation {
        let Some((object_location, trait_location)) =
            self.state.implementation_target(implementation.index)
        else {
            // Resolution failed earlier; the diagnostic is already recorded.
            return self.state.types.builtins().error;
        };

        let trait_name = self
            .state
            .types
            .trait_type(trait_location)
            .map(|trait_type| trait_type.name.clone())
            .unwrap_or_default();
        let object_name = self
            .state
            .types
            .object(object_location)
            .map(|object| object.name.clone())
            .unwrap_or_default();

        // Required traits first: they must hold before method bodies are
        // even considered.
        let required_traits = self
            .state
            .types
            .trait_type(trait_location)
            .map(|trait_type| {
                trait_type
                    .required_traits
                    .keys()
                    .cloned()
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        let mut failed = false;

        for required in required_traits {
            if !self
                .state
                .types
                .object_implements_trait(object_location, &required)
            {
                self.state.record(CompileError::unimplemented_trait(
                    required,
                    object_name.clone(),
                    &implementation.span,
                ));
                failed = true;
            }
        }

        self.check_declaration_body(&implementation.body, object_location, scope);

        // Required methods must now exist on the object with compatible
        // signatures.
        let required_methods = self
            .state
            .types
            .trait_type(trait_location)
            .map(|trait_type| {
                trait_type
                    .required_methods
                    .symbols()
                    .map(|symbol| (symbol.name.clone(), symbol.value_type))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        for (name, required_type) in required_methods {
            let found = self
                .state
                .types
                .lookup_method(object_location, &name)
                .map(|symbol| symbol.value_type);

            let compatible = match found {
                Some(found) => self.state.types.type_compatible(found, required_type),
                None => false,
            };

            if !compatible {
                self.state.record(CompileError::unimplemented_method(
                    name,
                    trait_name.clone(),
                    object_name.clone(),
                    &implementation.span,
                ));
                failed = true;
            }
        }

        if failed {
            debug!("retracting implementation of {trait_name} for {object_name}");

            if let Some(object) = self.state.types.object_mut(object_location) {
                object.remove_trait_implementation(&trait_name);
            }

            if let Some(trait_type) = self.state.types.trait_type_mut(trait_location) {
                trait_type.remove_implementer(&object_name);
            }

            return self.state.types.builtins().nil;
        }

        // Default methods are copied onto the implementer; an existing
        // incompatible method is a conflict.
        let conflicts = self
            .state
            .types
            .copy_default_methods(trait_location, object_location);

        for method in conflicts {
            self.state.record(CompileError::incompatible_default_method(
                method,
                trait_name.clone(),
                object_name.clone(),
                &implementation.span,
            ));
        }

        self.state.types.builtins().nil
    }

    /// Types an `impl Type` reopening body over the existing object
    pub(crate) fn on_reopen_object(
        &mut self,
        reopen: &ReopenObjectAst,
        scope: &Rc<TypeScope>,
    ) -> TypeLocation {
        let crate::ast::TypeNameAst::Named(named) = &reopen.name else {
            let name = self.state.types.name_of(scope.self_type);
            self.state
                .record(CompileError::not_an_object(name, reopen.name.span()));
            return self.state.types.builtins().error;
        };

        let Some(location) =
            super::resolve_constant_path(self.state, &self.module, &named.segments)
        else {
            let known = self.state.known_type_names();
            self.state.record(CompileError::type_not_found(
                known.iter().map(|known| known.as_str()),
                named.qualified_name(),
                &named.span,
            ));
            return self.state.types.builtins().error;
        };

        if self.state.types.object(location).is_none() {
            self.state.record(CompileError::not_an_object(
                named.qualified_name(),
                &named.span,
            ));
            return self.state.types.builtins().error;
        }

        self.check_declaration_body(&reopen.body, location, scope);
        location
    }

    fn fill_type_parameter_requirements(
        &mut self,
        location: TypeLocation,
        declared: &[TypeParameterAst],
        scope: &Rc<TypeScope>,
    ) {
        for parameter in declared.iter() {
            let parameter_location = match self.state.types.get(location) {
                TypeKind::Object(object) => object.type_parameters.get(&parameter.name),
                TypeKind::Trait(trait_type) => trait_type.type_parameters.get(&parameter.name),
                _ => None,
            };

            let Some(parameter_location) = parameter_location else { continue };

            for requirement in parameter.required_traits.iter() {
                let required = self.resolve_type_name(requirement, scope);

                match self.state.types.trait_type(required) {
                    Some(trait_type) => {
                        let name = trait_type.name.clone();

                        if let Some(TypeKind::TypeParameter(record)) =
                            self.state.types.get_mut(parameter_location)
                        {
                            record.require_trait(name, required);
                        }
                    }
                    None if self.state.types.is_error(required) => {}
                    None => {
                        let name = self.state.types.name_of(required);
                        self.state.record(
                            CompileError::invalid_type_parameter_requirement(
                                name,
                                requirement.span(),
                            ),
                        );
                    }
                }
            }
        }
    }

    fn check_declaration_body(
        &mut self,
        body: &crate::ast::BodyAst,
        self_type: TypeLocation,
        scope: &Rc<TypeScope>,
    ) {
        let locals = self
            .state
            .body_locals(body.index)
            .unwrap_or_else(SymbolTable::new_ref);

        let body_scope = TypeScope::body_scope(scope, self_type, locals);
        self.on_body(body, &body_scope);
    }
}
