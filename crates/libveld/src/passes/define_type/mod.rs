//! Type inference and checking.
//!
//! The visitor walks the typed-but-undecorated AST and computes a type for
//! every expression, recording it in the compiler state's side tables. It
//! never throws: a node whose type cannot be determined gets the `Error`
//! sentinel and a diagnostic, and checking continues.
//!
//! Method bodies are deferred to the end of the enclosing body's
//! processing, so methods can reference types and methods declared after
//! them without a separate pre-declaration phase (hoisting already moved
//! declarations first, deferral covers the bodies themselves).

mod declarations;
mod matching;
mod sends;

use std::rc::Rc;

use log::debug;

use crate::{
    ast::{BodyAst, ExpressionAst, MethodAst, TypeNameAst},
    error::CompileError,
    module::QualifiedName,
    scope::TypeScope,
    state::{ConstantTarget, IdentifierTarget, State, VariableTarget},
    symbol::{SymbolTable, SymbolTableRef},
    types::{BlockKind, BlockType, TypeKind, TypeLocation},
};

/// The raw instructions the standard library and desugared constructors may
/// invoke, with their result types handled in `on_raw_instruction`
pub static RAW_INSTRUCTIONS: &[&str] = &[
    "set_object",
    "panic",
    "exit",
    "process_suspend_current",
    "process_terminate_current",
];

pub fn run(state: &mut State, name: &QualifiedName, body: &BodyAst) {
    let Some(module) = state.module(name) else { return };
    let module_type = module.module_type;

    let locals = state
        .body_locals(body.index)
        .unwrap_or_else(SymbolTable::new_ref);

    let mut block = BlockType::new(BlockKind::Method, name.to_dotted(), module_type);
    block.return_type = state.types.builtins().any;
    let block_location = state.types.alloc(TypeKind::Block(block));
    state.set_block_type(body.index, block_location);

    let scope = TypeScope::module_scope(
        name.to_dotted(),
        module_type,
        block_location,
        locals.clone(),
    );

    let mut pass = DefineType {
        state,
        module: name.clone(),
    };

    pass.on_body(body, &scope);
    pass.warn_unused_locals(&locals);
}

/// Resolves a dotted constant path starting from a module's globals,
/// falling back to the built-in prototypes for single names
pub(crate) fn resolve_constant_path(
    state: &State,
    module: &QualifiedName,
    segments: &[String],
) -> Option<TypeLocation> {
    let (first, rest) = segments.split_first()?;

    let mut current = match state
        .module(module)
        .and_then(|module| module.globals.borrow().lookup(first))
    {
        Some(symbol) => symbol.value_type,
        None => builtin_by_name(state, first)?,
    };

    for segment in rest {
        let attribute = state
            .types
            .object(current)
            .and_then(|object| object.attributes.lookup(segment))?;

        current = attribute.value_type;
    }

    Some(current)
}

/// The built-in type a reserved constant name refers to
pub(crate) fn builtin_by_name(state: &State, name: &str) -> Option<TypeLocation> {
    let builtins = state.types.builtins();

    match name {
        "Object" => Some(builtins.object),
        "Array" => Some(builtins.array),
        "Block" => Some(builtins.block),
        "String" => Some(builtins.string),
        "Integer" => Some(builtins.integer),
        "Float" => Some(builtins.float),
        "Boolean" => Some(builtins.boolean),
        "True" => Some(builtins.true_type),
        "False" => Some(builtins.false_type),
        "Nil" => Some(builtins.nil),
        "ByteArray" => Some(builtins.byte_array),
        "Module" => Some(builtins.module),
        "Any" => Some(builtins.any),
        "Void" => Some(builtins.void),
        "Never" => Some(builtins.never),
        _ => None,
    }
}

pub(crate) struct DefineType<'a> {
    pub(crate) state: &'a mut State,
    pub(crate) module: QualifiedName,
}

impl<'a> DefineType<'a> {
    /// Types every expression of a body, deferring method bodies to the
    /// end, and returns the type of the last expression
    pub(crate) fn on_body(&mut self, body: &BodyAst, scope: &Rc<TypeScope>) -> TypeLocation {
        let mut deferred: Vec<(&MethodAst, TypeLocation)> = Vec::new();
        let mut last = self.state.types.builtins().nil;

        for expression in body.expressions.iter() {
            last = match expression {
                ExpressionAst::Method(method) => {
                    let location = self.on_method(method, scope);

                    if method.body.is_some() {
                        deferred.push((method, location));
                    }

                    location
                }
                other => self.on_expression(other, scope, None),
            };
        }

        for (method, location) in deferred {
            self.check_method_body(method, location, scope);
        }

        last
    }

    pub(crate) fn on_expression(
        &mut self,
        expression: &ExpressionAst,
        scope: &Rc<TypeScope>,
        expected: Option<TypeLocation>,
    ) -> TypeLocation {
        let location = match expression {
            ExpressionAst::Int(_) => self.state.types.builtins().integer,
            ExpressionAst::Float(_) => self.state.types.builtins().float,
            ExpressionAst::Str(_) => self.state.types.builtins().string,
            ExpressionAst::Identifier(node) => self.on_identifier(node, scope),
            ExpressionAst::Constant(node) => self.on_constant(node, scope),
            ExpressionAst::Attribute(node) => self.on_attribute(node, scope),
            ExpressionAst::SelfObject(_) => self.state.types.new_instance(scope.self_type),
            ExpressionAst::DefineVariable(node) => self.on_define_variable(node, scope),
            ExpressionAst::Reassign(node) => self.on_reassign(node, scope),
            ExpressionAst::Send(node) => self.on_send(node, scope),
            ExpressionAst::Block(node) => self.on_block_literal(node, scope, expected),
            ExpressionAst::Method(node) => self.on_method(node, scope),
            ExpressionAst::Return(node) => self.on_return(node, scope),
            ExpressionAst::Throw(node) => self.on_throw(node, scope),
            ExpressionAst::Try(node) => self.on_try(node, scope),
            ExpressionAst::Object(node) => self.on_object(node, scope),
            ExpressionAst::Trait(node) => self.on_trait(node, scope),
            ExpressionAst::TraitImplementation(node) => {
                self.on_trait_implementation(node, scope)
            }
            ExpressionAst::ReopenObject(node) => self.on_reopen_object(node, scope),
            ExpressionAst::Import(_) | ExpressionAst::CompilerOption(_) => {
                // Collected by earlier passes; nothing remains to type.
                self.state.types.builtins().nil
            }
            ExpressionAst::TypeCast(node) => self.on_type_cast(node, scope),
            ExpressionAst::RawInstruction(node) => self.on_raw_instruction(node, scope),
            ExpressionAst::Match(node) => self.on_match(node, scope),
        };

        self.state.set_node_type(expression.index(), location);
        location
    }

    fn on_identifier(
        &mut self,
        node: &crate::ast::IdentifierAst,
        scope: &Rc<TypeScope>,
    ) -> TypeLocation {
        // Locals shadow methods, methods shadow globals.
        let local = scope.locals.borrow().lookup_with_parent(&node.name);

        if let Some((depth, symbol)) = local {
            symbol.reference();
            let value_type = symbol.value_type;

            self.state
                .set_identifier_target(node.index, IdentifierTarget::Local { depth, symbol });
            return value_type;
        }

        if self.state.types.responds_to_message(scope.self_type, &node.name) {
            let method = self
                .state
                .types
                .lookup_method(scope.self_type, &node.name)
                .expect("responds_to_message implies a method")
                .value_type;

            self.state
                .set_identifier_target(node.index, IdentifierTarget::SelfMethod { method });

            return self.implicit_call(node.index, &node.name, method, scope.self_type, &node.span);
        }

        let module_type = self.module_type();

        if self.state.types.responds_to_message(module_type, &node.name) {
            let symbol = self.module_global(&node.name);

            if let Some(symbol) = symbol {
                symbol.reference();
                let method = symbol.value_type;

                self.state.set_identifier_target(
                    node.index,
                    IdentifierTarget::ModuleMethod { symbol },
                );

                return self.implicit_call(node.index, &node.name, method, module_type, &node.span);
            }
        }

        if let Some(symbol) = self.module_global(&node.name) {
            symbol.reference();
            let value_type = symbol.value_type;

            // A global holding a block is an implicit call; anything else is
            // a plain read.
            if self.state.types.block(value_type).is_some() {
                self.state.set_identifier_target(
                    node.index,
                    IdentifierTarget::ModuleMethod { symbol },
                );
                return self.implicit_call(
                    node.index,
                    &node.name,
                    value_type,
                    module_type,
                    &node.span,
                );
            }

            self.state
                .set_identifier_target(node.index, IdentifierTarget::Global { symbol });
            return value_type;
        }

        self.state
            .record(CompileError::undefined_local(node.name.clone(), &node.span));
        self.state.types.builtins().error
    }

    /// Types a zero-argument implicit call of a method found through an
    /// identifier, recording its resolved throw type on the node
    fn implicit_call(
        &mut self,
        index: crate::ast::AstIndex,
        name: &str,
        method: TypeLocation,
        receiver: TypeLocation,
        span: &crate::span::Span,
    ) -> TypeLocation {
        let Some(block) = self.state.types.block(method).map(|block| block.clone()) else {
            return method;
        };

        if block.required_arguments() > 0 {
            let (minimum, maximum) = block.argument_count_range();
            self.state
                .record(CompileError::argument_count(0, minimum, maximum, span));
        }

        if let Some(throw_type) = block.throw_type {
            let resolved = self
                .state
                .types
                .with_type_parameter_instances_from(throw_type, &[receiver, method]);
            self.state.set_throw_type(index, resolved);
        }

        debug!("implicit call of {name}");

        let mut result = block.return_type;
        result = self
            .state
            .types
            .with_type_parameter_instances_from(result, &[receiver, method]);
        self.state.types.resolve_self(result, receiver)
    }

    fn on_constant(
        &mut self,
        node: &crate::ast::ConstantAst,
        scope: &Rc<TypeScope>,
    ) -> TypeLocation {
        // The enclosing self type's attribute chain wins over globals.
        let attribute = self
            .state
            .types
            .object(scope.self_type)
            .and_then(|object| object.attributes.lookup(&node.name));

        if let Some(symbol) = attribute {
            symbol.reference();
            let value_type = symbol.value_type;

            self.state.set_constant_target(
                node.index,
                ConstantTarget::SelfAttribute { name: node.name.clone() },
            );
            return value_type;
        }

        if let Some(symbol) = self.module_global(&node.name) {
            symbol.reference();
            let value_type = symbol.value_type;

            self.state
                .set_constant_target(node.index, ConstantTarget::Global { symbol });
            return value_type;
        }

        if let Some(location) = builtin_by_name(self.state, &node.name) {
            self.state.set_constant_target(
                node.index,
                ConstantTarget::SelfAttribute { name: node.name.clone() },
            );
            return location;
        }

        self.state
            .record(CompileError::undefined_constant(node.name.clone(), &node.span));
        self.state.types.builtins().error
    }

    fn on_attribute(
        &mut self,
        node: &crate::ast::AttributeAst,
        scope: &Rc<TypeScope>,
    ) -> TypeLocation {
        match self.state.types.lookup_method(scope.self_type, &node.name) {
            Some(symbol) => {
                symbol.reference();
                symbol.value_type
            }
            None => {
                self.state.record(CompileError::undefined_attribute(
                    node.name.clone(),
                    &node.span,
                ));
                self.state.types.builtins().error
            }
        }
    }

    fn on_define_variable(
        &mut self,
        node: &crate::ast::DefineVariableAst,
        scope: &Rc<TypeScope>,
    ) -> TypeLocation {
        use crate::ast::DefineTarget;

        let annotated = node
            .annotation
            .as_ref()
            .map(|annotation| self.resolve_type_name(annotation, scope));

        let value_type = self.on_expression(&node.value, scope, annotated);

        let bound_type = match annotated {
            Some(expected) => {
                if !self.state.types.type_compatible(value_type, expected) {
                    self.type_mismatch(expected, value_type, node.value.span());
                }
                expected
            }
            None => value_type,
        };

        match &node.target {
            DefineTarget::Local { name, mutable } => {
                let defined = scope.locals.borrow_mut().define(
                    name.clone(),
                    bound_type,
                    *mutable,
                    Some(node.span.clone()),
                );

                match defined {
                    Ok(symbol) => self.state.set_variable_target(
                        node.index,
                        VariableTarget::Local { depth: 0, symbol },
                    ),
                    Err(error) => self.state.record(error),
                }
            }
            DefineTarget::Attribute { name } => {
                let defined = self
                    .state
                    .types
                    .object_mut(scope.self_type)
                    .map(|object| {
                        object.attributes.define(
                            name.clone(),
                            bound_type,
                            true,
                            Some(node.span.clone()),
                        )
                    });

                match defined {
                    Some(Ok(_)) | None => self.state.set_variable_target(
                        node.index,
                        VariableTarget::Attribute { name: name.clone() },
                    ),
                    Some(Err(error)) => self.state.record(error),
                }
            }
            DefineTarget::Constant { name } => {
                if crate::types::TypeDb::reserved_constant(name) {
                    self.state.record(CompileError::redefine_reserved_constant(
                        name.clone(),
                        &node.span,
                    ));
                    return bound_type;
                }

                let defined = self
                    .state
                    .types
                    .object_mut(scope.self_type)
                    .map(|object| {
                        object.attributes.define(
                            name.clone(),
                            bound_type,
                            false,
                            Some(node.span.clone()),
                        )
                    });

                if let Some(Err(error)) = defined {
                    self.state.record(error);
                    return bound_type;
                }

                // At module scope constants are also module globals.
                let global = if scope.module_level() {
                    let globals = self
                        .state
                        .module(&self.module)
                        .map(|module| module.globals.clone());

                    globals.and_then(|globals| {
                        match globals.borrow_mut().define(
                            name.clone(),
                            bound_type,
                            false,
                            Some(node.span.clone()),
                        ) {
                            Ok(symbol) => Some(symbol),
                            Err(error) => {
                                self.state.record(error);
                                None
                            }
                        }
                    })
                } else {
                    None
                };

                self.state.set_variable_target(
                    node.index,
                    VariableTarget::Constant { name: name.clone(), global },
                );
            }
        }

        bound_type
    }

    fn on_reassign(
        &mut self,
        node: &crate::ast::ReassignAst,
        scope: &Rc<TypeScope>,
    ) -> TypeLocation {
        use crate::ast::ReassignTarget;

        let value_type = self.on_expression(&node.value, scope, None);

        match &node.target {
            ReassignTarget::Local { name } => {
                let found = scope.locals.borrow().lookup_with_parent(name);

                match found {
                    Some((depth, symbol)) => {
                        symbol.reference();

                        if !symbol.mutable {
                            self.state.record(CompileError::reassign_immutable(
                                name.clone(),
                                &node.span,
                            ));
                        }

                        if !self.state.types.type_compatible(value_type, symbol.value_type) {
                            self.type_mismatch(symbol.value_type, value_type, node.value.span());
                        }

                        self.state.set_variable_target(
                            node.index,
                            VariableTarget::Local { depth, symbol },
                        );
                    }
                    None => {
                        self.state.record(CompileError::reassign_undefined(
                            name.clone(),
                            &node.span,
                        ));
                    }
                }
            }
            ReassignTarget::Attribute { name } => {
                let found = self
                    .state
                    .types
                    .object(scope.self_type)
                    .and_then(|object| object.attributes.lookup(name));

                match found {
                    Some(symbol) => {
                        symbol.reference();

                        if !self.state.types.type_compatible(value_type, symbol.value_type) {
                            self.type_mismatch(symbol.value_type, value_type, node.value.span());
                        }

                        self.state.set_variable_target(
                            node.index,
                            VariableTarget::Attribute { name: name.clone() },
                        );
                    }
                    None => {
                        self.state.record(CompileError::reassign_undefined(
                            name.clone(),
                            &node.span,
                        ));
                    }
                }
            }
        }

        value_type
    }

    fn on_return(
        &mut self,
        node: &crate::ast::ReturnAst,
        scope: &Rc<TypeScope>,
    ) -> TypeLocation {
        let Some(method) = scope.enclosing_method else {
            self.state
                .record(CompileError::return_outside_method(&node.span));
            return self.state.types.builtins().never;
        };

        let value_type = match node.value.as_deref() {
            Some(value) => self.on_expression(value, scope, None),
            None => self.state.types.builtins().nil,
        };

        let declared = self
            .state
            .types
            .block(method)
            .map(|block| block.return_type)
            .unwrap_or(TypeLocation::UNDEFINED);
        let resolved = self.state.types.resolve_self(declared, scope.self_type);

        // An implicit trailing return in a method defaulting to Nil simply
        // discards its value.
        let discards = node.implicit && resolved == self.state.types.builtins().nil;

        if !discards && !self.state.types.type_compatible(value_type, resolved) {
            self.type_mismatch(resolved, value_type, &node.span);
        }

        self.state.types.builtins().never
    }

    fn on_throw(&mut self, node: &crate::ast::ThrowAst, scope: &Rc<TypeScope>) -> TypeLocation {
        let value_type = self.on_expression(&node.value, scope, None);
        let block_location = scope.block_type;

        let (throw_type, inferable) = match self.state.types.block(block_location) {
            Some(block) => (block.throw_type, block.infer_throw_type),
            None => (None, false),
        };

        match throw_type {
            Some(declared) => {
                if !self.state.types.type_compatible(value_type, declared) {
                    self.type_mismatch(declared, value_type, node.value.span());
                }
            }
            None if inferable => {
                if let Some(block) = self.state.types.block_mut(block_location) {
                    block.throw_type = Some(value_type);
                }
            }
            None => {
                // Reported by ValidateThrow with full context.
            }
        }

        self.state.types.builtins().never
    }

    fn on_try(&mut self, node: &crate::ast::TryAst, scope: &Rc<TypeScope>) -> TypeLocation {
        let expression_type = self.on_expression(&node.expression, scope, None);
        let caught = self.state.throw_type(node.expression.index());

        let Some(else_body) = node.else_body.as_ref() else {
            // Without an else the throw type propagates to the enclosing
            // block when that block may still infer one.
            if let Some(caught) = caught {
                if let Some(block) = self.state.types.block_mut(scope.block_type) {
                    if block.infer_throw_type && block.throw_type.is_none() {
                        block.throw_type = Some(caught);
                    }
                }
            }

            return expression_type;
        };

        // The handler gets a dedicated block type so its throw/return
        // context is its own.
        let mut else_block = BlockType::new(BlockKind::Closure, "<else>".to_string(), scope.self_type);
        else_block.return_type = expression_type;
        let else_location = self.state.types.alloc(TypeKind::Block(else_block));
        self.state.set_block_type(else_body.index, else_location);

        let locals = self
            .state
            .body_locals(else_body.index)
            .unwrap_or_else(|| scope.locals.clone());

        if let Some(argument) = node.else_argument.as_ref() {
            let argument_type = caught.unwrap_or(self.state.types.builtins().error);
            let defined = locals.borrow_mut().define(
                argument.name.clone(),
                argument_type,
                false,
                Some(argument.span.clone()),
            );

            match defined {
                Ok(symbol) => symbol.reference(),
                Err(error) => self.state.record(error),
            }
        }

        let else_scope = Rc::new(TypeScope {
            module: scope.module.clone(),
            self_type: scope.self_type,
            block_type: else_location,
            locals,
            parent: Some(scope.clone()),
            enclosing_method: scope.enclosing_method,
        });

        let else_type = self.on_body(else_body, &else_scope);

        if let Some(block) = self.state.types.block_mut(else_location) {
            block.return_type = else_type;
        }

        if self.state.types.type_compatible(else_type, expression_type) {
            expression_type
        } else if else_type == self.state.types.builtins().nil {
            // `try x else nil` widens the result to an optional.
            self.state.types.wrap_optional(expression_type)
        } else {
            self.type_mismatch(expression_type, else_type, &else_body.span);
            expression_type
        }
    }

    fn on_type_cast(
        &mut self,
        node: &crate::ast::TypeCastAst,
        scope: &Rc<TypeScope>,
    ) -> TypeLocation {
        let value_type = self.on_expression(&node.value, scope, None);
        let target = self.resolve_type_name(&node.target, scope);

        let supported = self.state.types.type_compatible(value_type, target)
            || self.state.types.type_compatible(target, value_type);

        if !supported {
            let from = self.state.types.name_of(value_type);
            let to = self.state.types.name_of(target);

            self.state
                .record(CompileError::invalid_cast(from, to, &node.span));
            return self.state.types.builtins().error;
        }

        target
    }

    fn on_raw_instruction(
        &mut self,
        node: &crate::ast::RawInstructionAst,
        scope: &Rc<TypeScope>,
    ) -> TypeLocation {
        for argument in node.arguments.iter() {
            self.on_expression(argument, scope, None);
        }

        if !RAW_INSTRUCTIONS.contains(&node.name.as_str()) {
            self.state.record(CompileError::unknown_raw_instruction(
                node.name.clone(),
                &node.span,
            ));
            return self.state.types.builtins().error;
        }

        match node.name.as_str() {
            "set_object" => self.state.types.new_instance(scope.self_type),
            "process_suspend_current" => self.state.types.builtins().nil,
            _ => self.state.types.builtins().never,
        }
    }

    /// Resolves a type annotation to a type location
    pub(crate) fn resolve_type_name(
        &mut self,
        name: &TypeNameAst,
        scope: &Rc<TypeScope>,
    ) -> TypeLocation {
        match name {
            TypeNameAst::SelfType(node) => {
                let location = self.state.types.builtins().self_type;

                if node.optional {
                    self.state.types.wrap_optional(location)
                } else {
                    location
                }
            }
            TypeNameAst::Block(node) => {
                let kind = match node.kind {
                    crate::ast::BlockLiteralKind::Closure => BlockKind::Closure,
                    crate::ast::BlockLiteralKind::Lambda => BlockKind::Lambda,
                };

                let mut block = BlockType::new(kind, "<block>".to_string(), scope.self_type);

                for (position, argument) in node.arguments.iter().enumerate() {
                    let value_type = self.resolve_type_name(argument, scope);
                    block.arguments.push(crate::types::BlockArgument::new(
                        format!("arg{position}"),
                        value_type,
                    ));
                }

                block.return_type = match node.return_type.as_deref() {
                    Some(annotation) => self.resolve_type_name(annotation, scope),
                    None => self.state.types.builtins().nil,
                };

                block.throw_type = node
                    .throw_type
                    .as_deref()
                    .map(|annotation| self.resolve_type_name(annotation, scope));

                let location = self.state.types.alloc(TypeKind::Block(block));

                if node.optional {
                    self.state.types.wrap_optional(location)
                } else {
                    location
                }
            }
            TypeNameAst::Named(node) => {
                let base = self.resolve_named_base(node, scope);

                if self.state.types.is_error(base) {
                    return base;
                }

                let mut arguments = Vec::new();

                for argument in node.type_arguments.iter() {
                    arguments.push(self.resolve_type_name(argument, scope));
                }

                let instantiated = match self
                    .state
                    .types
                    .new_instance_with_type_arguments(base, &arguments)
                {
                    Ok(location) => location,
                    Err(expected) => {
                        self.state.record(CompileError::too_many_type_arguments(
                            arguments.len(),
                            expected,
                            &node.span,
                        ));
                        base
                    }
                };

                if node.optional {
                    self.state.types.wrap_optional(instantiated)
                } else {
                    instantiated
                }
            }
        }
    }

    fn resolve_named_base(
        &mut self,
        node: &crate::ast::NamedTypeAst,
        scope: &Rc<TypeScope>,
    ) -> TypeLocation {
        // A single segment may name a type parameter of the enclosing
        // block, method or self type.
        if let [single] = node.segments.as_slice() {
            if let Some(found) = self.lookup_type_parameter(single, scope) {
                return found;
            }
        }

        if let Some(found) = resolve_constant_path(self.state, &self.module, &node.segments) {
            return found;
        }

        let known = self.state.known_type_names();
        self.state.record(CompileError::type_not_found(
            known.iter().map(|known| known.as_str()),
            node.qualified_name(),
            &node.span,
        ));
        self.state.types.builtins().error
    }

    fn lookup_type_parameter(&self, name: &str, scope: &Rc<TypeScope>) -> Option<TypeLocation> {
        if let Some(block) = self.state.types.block(scope.block_type) {
            if let Some(found) = block.type_parameters.get(name) {
                return Some(found);
            }
        }

        if let Some(method) = scope.enclosing_method {
            if let Some(block) = self.state.types.block(method) {
                if let Some(found) = block.type_parameters.get(name) {
                    return Some(found);
                }
            }
        }

        match self.state.types.get(scope.self_type) {
            TypeKind::Object(object) => object.type_parameters.get(name),
            TypeKind::Trait(trait_type) => trait_type.type_parameters.get(name),
            _ => None,
        }
    }

    pub(crate) fn module_type(&self) -> TypeLocation {
        self.state
            .module(&self.module)
            .map(|module| module.module_type)
            .unwrap_or(TypeLocation::UNDEFINED)
    }

    fn module_global(&self, name: &str) -> Option<std::rc::Rc<crate::symbol::Symbol>> {
        self.state
            .module(&self.module)
            .and_then(|module| module.globals.borrow().lookup(name))
    }

    pub(crate) fn type_mismatch(
        &mut self,
        expected: TypeLocation,
        found: TypeLocation,
        span: &crate::span::Span,
    ) {
        // Error types already produced a diagnostic; stay silent.
        if self.state.types.is_error(expected) || self.state.types.is_error(found) {
            return;
        }

        let expected_name = self.state.types.name_of(expected);
        let found_name = self.state.types.name_of(found);

        self.state
            .record(CompileError::type_mismatch(expected_name, found_name, span));
    }

    pub(crate) fn warn_unused_locals(&mut self, locals: &SymbolTableRef) {
        let unused = locals
            .borrow()
            .unused_symbols()
            .filter_map(|symbol| {
                symbol
                    .span
                    .as_ref()
                    .map(|span| (symbol.name.clone(), span.clone()))
            })
            .collect::<Vec<_>>();

        for (name, span) in unused {
            self.state.record(CompileError::unused_local(name, &span));
        }
    }
}
