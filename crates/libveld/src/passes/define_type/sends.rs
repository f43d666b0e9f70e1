//! Typing of message sends.
//!
//! The receiver type is the explicit receiver's type, `self`'s type if it
//! responds, or the module type if that responds; otherwise the message is
//! undefined. Sends through an optional receiver are possibly undefined:
//! the method is looked up on the wrapped type, the result widens to an
//! optional, and lowering emits a guarded dispatch.
//!
//! Closures passed as arguments are typed against the expected closure's
//! parameter types (with the caller's type-parameter bindings applied),
//! which is what makes `fn (x) { x + 1 }` work without annotations.

use std::rc::Rc;

use log::debug;

use crate::{
    ast::SendAst,
    error::CompileError,
    scope::TypeScope,
    types::{TypeLocation, TypeParameterInstances},
};

use super::DefineType;

impl<'a> DefineType<'a> {
    pub(crate) fn on_send(&mut self, send: &SendAst, scope: &Rc<TypeScope>) -> TypeLocation {
        let receiver_type = match send.receiver.as_deref() {
            Some(receiver) => self.on_expression(receiver, scope, None),
            None => {
                if self.state.types.responds_to_message(scope.self_type, &send.name) {
                    scope.self_type
                } else {
                    let module_type = self.module_type();

                    if self.state.types.responds_to_message(module_type, &send.name) {
                        module_type
                    } else {
                        let receiver_name = self.state.types.name_of(scope.self_type);
                        self.state.record(CompileError::undefined_method(
                            send.name.clone(),
                            receiver_name,
                            &send.span,
                        ));
                        return self.state.types.builtins().error;
                    }
                }
            }
        };

        self.state.set_receiver_type(send.index, receiver_type);

        if self.state.types.is_error(receiver_type) {
            self.type_arguments_only(send, scope);
            return self.state.types.builtins().error;
        }

        if self.state.types.get(receiver_type).is_any() {
            // Dynamic receiver: anything goes, dispatch is guarded.
            self.state.mark_possibly_undefined(send.index);
            self.type_arguments_only(send, scope);
            return self.state.types.builtins().any;
        }

        // Calling a block directly.
        if self.state.types.block(receiver_type).is_some() && send.name == "call" {
            return self.on_block_call(send, receiver_type, scope);
        }

        // `Array.new` builds an array instance.
        if send.name == "new" && self.is_array_prototype(receiver_type) {
            return self.on_array_new(send, scope);
        }

        let optional_receiver = self.state.types.optional_inner(receiver_type);
        let underlying = optional_receiver.unwrap_or(receiver_type);

        if optional_receiver.is_some()
            && self.state.types.message_possibly_undefined(receiver_type, &send.name)
        {
            self.state.mark_possibly_undefined(send.index);
        }

        let Some(symbol) = self.state.types.lookup_method(underlying, &send.name) else {
            let receiver_name = self.state.types.name_of(receiver_type);
            self.state.record(CompileError::undefined_method(
                send.name.clone(),
                receiver_name,
                &send.span,
            ));
            self.type_arguments_only(send, scope);
            return self.state.types.builtins().error;
        };

        let method = symbol.value_type;

        if self.state.types.block(method).is_none() {
            let receiver_name = self.state.types.name_of(receiver_type);
            self.state.record(CompileError::undefined_method(
                send.name.clone(),
                receiver_name,
                &send.span,
            ));
            return self.state.types.builtins().error;
        }

        // Method bounds fail before dispatch when the concrete receiver
        // does not meet them.
        if let Err(violation) = self.state.types.check_method_bounds(underlying, method) {
            self.state.record(CompileError::method_bounds_not_met(
                send.name.clone(),
                violation.trait_name,
                violation.type_name,
                &send.span,
            ));
        }

        // Explicit type arguments instantiate the method.
        let mut type_arguments = Vec::new();

        for annotation in send.type_arguments.iter() {
            type_arguments.push(self.resolve_type_name(annotation, scope));
        }

        let declared_parameters = self
            .state
            .types
            .block(method)
            .map(|block| block.type_parameters.len())
            .unwrap_or(0);

        if type_arguments.len() > declared_parameters {
            self.state.record(CompileError::too_many_type_arguments(
                type_arguments.len(),
                declared_parameters,
                &send.span,
            ));
            type_arguments.truncate(declared_parameters);
        }

        let method_instance = self.state.types.new_instance_for_send(method, &type_arguments);
        self.state.set_send_method(send.index, method_instance);

        let block = self
            .state
            .types
            .block(method_instance)
            .expect("methods are blocks")
            .clone();

        debug!("typing send of {} with {} arguments", send.name, send.arguments.len());

        if !block.valid_argument_count(send.arguments.len()) {
            let (minimum, maximum) = block.argument_count_range();
            self.state.record(CompileError::argument_count(
                send.arguments.len(),
                minimum,
                maximum,
                &send.span,
            ));
        }

        let sources = [underlying, method_instance];
        let mut bindings = TypeParameterInstances::new();
        let mut position = 0;

        for argument in send.arguments.iter() {
            let expected = match argument.keyword.as_deref() {
                Some(keyword) => match block.keyword_argument_type(keyword) {
                    Some(expected) => Some((expected, false)),
                    None => {
                        self.state.record(CompileError::undefined_keyword_argument(
                            keyword.to_string(),
                            &argument.span,
                        ));
                        None
                    }
                },
                None => block.argument_type_at(position),
            };

            // Resolve the expectation with the receiver's bindings and what
            // previous arguments already taught us, so closure inference
            // sees concrete parameter types.
            let resolved = expected.map(|(expected, rest)| {
                let expected = if rest {
                    self.state.types.array_element_type(expected)
                } else {
                    expected
                };

                let expected = self
                    .state
                    .types
                    .with_type_parameter_instances_from(expected, &sources);
                let expected = self.state.types.resolve_type_parameters(expected, &bindings);
                self.state.types.resolve_self(expected, underlying)
            });

            let given = self.on_expression(&argument.value, scope, resolved);

            if let Some(expected) = resolved {
                self.state.types.initialize_as(expected, given, &mut bindings);
                let final_expected = self.state.types.resolve_type_parameters(expected, &bindings);

                if !self.state.types.type_compatible(given, final_expected) {
                    self.type_mismatch(final_expected, given, argument.value.span());
                }
            }

            if argument.keyword.is_none() {
                position += 1;
            }
        }

        // The return type, remapped through the receiver's and the send's
        // type-parameter bindings.
        let mut result = block.return_type;
        result = self
            .state
            .types
            .with_type_parameter_instances_from(result, &sources);
        result = self.state.types.resolve_type_parameters(result, &bindings);
        result = self.state.types.resolve_self(result, underlying);

        if optional_receiver.is_some() {
            result = self.state.types.wrap_optional(result);
        }

        if let Some(throw_type) = block.throw_type {
            let mut resolved = throw_type;
            resolved = self
                .state
                .types
                .with_type_parameter_instances_from(resolved, &sources);
            resolved = self.state.types.resolve_type_parameters(resolved, &bindings);
            resolved = self.state.types.resolve_self(resolved, underlying);
            self.state.set_throw_type(send.index, resolved);
        }

        result
    }

    /// Types `block.call(...)` against the block's own signature
    fn on_block_call(
        &mut self,
        send: &SendAst,
        block_location: TypeLocation,
        scope: &Rc<TypeScope>,
    ) -> TypeLocation {
        let block = self
            .state
            .types
            .block(block_location)
            .expect("the receiver was checked to be a block")
            .clone();

        if !block.valid_argument_count(send.arguments.len()) {
            let (minimum, maximum) = block.argument_count_range();
            self.state.record(CompileError::argument_count(
                send.arguments.len(),
                minimum,
                maximum,
                &send.span,
            ));
        }

        for (position, argument) in send.arguments.iter().enumerate() {
            let expected = block
                .argument_type_at(position)
                .map(|(expected, rest)| {
                    if rest {
                        self.state.types.array_element_type(expected)
                    } else {
                        expected
                    }
                });

            let given = self.on_expression(&argument.value, scope, expected);

            if let Some(expected) = expected {
                if !self.state.types.type_compatible(given, expected) {
                    self.type_mismatch(expected, given, argument.value.span());
                }
            }
        }

        if let Some(throw_type) = block.throw_type {
            self.state.set_throw_type(send.index, throw_type);
        }

        block.return_type
    }

    /// Types `Array.new(...)`: the element type comes from an explicit type
    /// argument or the first value, and every value must agree with it
    fn on_array_new(&mut self, send: &SendAst, scope: &Rc<TypeScope>) -> TypeLocation {
        let explicit = send
            .type_arguments
            .first()
            .map(|annotation| self.resolve_type_name(annotation, scope));

        let mut element: Option<TypeLocation> = explicit;

        for argument in send.arguments.iter() {
            let given = self.on_expression(&argument.value, scope, element);

            match element {
                Some(expected) => {
                    if !self.state.types.type_compatible(given, expected) {
                        self.type_mismatch(expected, given, argument.value.span());
                    }
                }
                None => element = Some(given),
            }
        }

        match element {
            Some(element) => self.state.types.new_array_of_type(element),
            None => {
                let array = self.state.types.builtins().array;
                self.state.types.new_instance(array)
            }
        }
    }

    /// Types the arguments of a send whose method could not be resolved, so
    /// nested expressions still get types and diagnostics
    fn type_arguments_only(&mut self, send: &SendAst, scope: &Rc<TypeScope>) {
        for argument in send.arguments.iter() {
            self.on_expression(&argument.value, scope, None);
        }
    }

    fn is_array_prototype(&self, location: TypeLocation) -> bool {
        self.state
            .types
            .object(location)
            .map(|object| object.name == "Array" && object.type_parameter_instances.is_empty())
            .unwrap_or(false)
    }
}
