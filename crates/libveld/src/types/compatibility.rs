//! Type compatibility, method lookup and generic instantiation.
//!
//! These operations all live on [`TypeDb`] because they need to chase
//! [`TypeLocation`] references through the arena. The rules follow the
//! language semantics:
//!
//! - `Error` absorbs: it is compatible with everything in both directions,
//!   so a single failed type computation cannot cascade.
//! - `Never` is compatible with anything, letting `throw` and `return`
//!   compose inside conditional expressions.
//! - `T` does not implicitly widen to `?T`; only `Nil` and optionals
//!   themselves are accepted where an optional is expected.
//! - Objects are compared nominally, by name plus bound type-parameter
//!   instances, with the prototype chain acting as a subtype ladder.
//! - Traits are satisfied by implementation, by requirement, or by a type
//!   parameter listing them.

use std::rc::Rc;

use log::debug;

use crate::symbol::Symbol;

use super::{
    BlockKind, BlockType, TypeDb, TypeKind, TypeLocation, TypeParameterInstances,
};

/// A violated method bound: the trait that is required and the concrete
/// type that fails to implement it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundViolation {
    pub trait_name: String,
    pub type_name: String,
}

impl TypeDb {
    /// Looks up a method (an attribute holding a block) on a type.
    ///
    /// Objects search their own attributes, then the prototype chain, then
    /// the default and required methods of implemented traits. Traits search
    /// their required and default methods and then their required traits.
    /// Type parameters search their required traits. Optionals delegate to
    /// the wrapped type; such messages are possibly undefined and lower to a
    /// guarded dispatch.
    pub fn lookup_method(&self, receiver: TypeLocation, name: &str) -> Option<Rc<Symbol>> {
        match self.get(receiver) {
            TypeKind::Object(object) => {
                if let Some(symbol) = object.attributes.lookup(name) {
                    return Some(symbol);
                }

                let mut prototype = object.prototype;

                while let Some(location) = prototype {
                    let Some(parent) = self.object(location) else { break };

                    if let Some(symbol) = parent.attributes.lookup(name) {
                        return Some(symbol);
                    }

                    prototype = parent.prototype;
                }

                object
                    .implemented_traits
                    .values()
                    .find_map(|location| self.lookup_method(*location, name))
            }
            TypeKind::Trait(trait_type) => trait_type
                .default_methods
                .lookup(name)
                .or_else(|| trait_type.required_methods.lookup(name))
                .or_else(|| {
                    trait_type
                        .required_traits
                        .values()
                        .find_map(|location| self.lookup_method(*location, name))
                }),
            TypeKind::TypeParameter(parameter) => parameter
                .required_traits
                .values()
                .find_map(|location| self.lookup_method(*location, name)),
            TypeKind::Optional(inner) => self.lookup_method(*inner, name),
            TypeKind::Block(_) => self
                .object(self.builtins().block)
                .and_then(|block_object| block_object.attributes.lookup(name)),
            _ => None,
        }
    }

    /// True if the type (or anything it inherits from) answers the message
    pub fn responds_to_message(&self, receiver: TypeLocation, name: &str) -> bool {
        self.lookup_method(receiver, name).is_some()
    }

    /// True if sending `name` to the receiver may find no method at
    /// runtime, requiring a guarded dispatch through `unknown_message`
    pub fn message_possibly_undefined(&self, receiver: TypeLocation, name: &str) -> bool {
        match self.get(receiver) {
            TypeKind::Optional(inner) => self.responds_to_message(*inner, name),
            TypeKind::Any => true,
            _ => false,
        }
    }

    /// Structural / nominal compatibility of `ours` with the expected type
    /// `theirs`
    pub fn type_compatible(&self, ours: TypeLocation, theirs: TypeLocation) -> bool {
        if ours == theirs {
            return true;
        }

        let our_kind = self.get(ours);
        let their_kind = self.get(theirs);

        if matches!(our_kind, TypeKind::Error) || matches!(their_kind, TypeKind::Error) {
            return true;
        }

        if matches!(our_kind, TypeKind::Never) {
            return true;
        }

        if matches!(our_kind, TypeKind::Any) || matches!(their_kind, TypeKind::Any) {
            return true;
        }

        if matches!(their_kind, TypeKind::Void) {
            return true;
        }

        match (our_kind, their_kind) {
            (TypeKind::SelfType, TypeKind::SelfType) => true,
            (TypeKind::Optional(our_inner), TypeKind::Optional(their_inner)) => {
                self.type_compatible(*our_inner, *their_inner)
            }
            (TypeKind::Object(object), TypeKind::Optional(_)) if object.name == "Nil" => true,
            (_, TypeKind::Optional(_)) => false,
            (TypeKind::Optional(_), _) => false,
            (_, TypeKind::Trait(their_trait)) => self.satisfies_trait(ours, &their_trait.name),
            (_, TypeKind::TypeParameter(parameter)) => parameter
                .required_traits
                .keys()
                .all(|name| self.satisfies_trait(ours, name)),
            (TypeKind::TypeParameter(parameter), _) => {
                // An unbound parameter only matches another mention of
                // itself, handled by the identity check above, or a trait,
                // handled earlier.
                parameter
                    .required_traits
                    .values()
                    .any(|location| self.type_compatible(*location, theirs))
            }
            (TypeKind::Object(ours_object), TypeKind::Object(their_object)) => {
                if ours_object.name == their_object.name {
                    return their_object.type_parameter_instances.iter().all(
                        |(name, their_instance)| {
                            // An unbound expectation accepts any binding.
                            if self.get(their_instance).is_type_parameter() {
                                return true;
                            }

                            match ours_object.type_parameter_instances.get(name) {
                                Some(our_instance) => {
                                    self.type_compatible(our_instance, their_instance)
                                }
                                None => true,
                            }
                        },
                    );
                }

                self.prototype_chain_includes(ours, &their_object.name)
            }
            (TypeKind::Block(ours_block), TypeKind::Block(their_block)) => {
                self.blocks_compatible(ours_block, their_block)
            }
            _ => false,
        }
    }

    fn blocks_compatible(&self, ours: &BlockType, theirs: &BlockType) -> bool {
        if ours.arguments.len() != theirs.arguments.len() {
            return false;
        }

        let arguments_compatible = ours
            .arguments
            .iter()
            .zip(theirs.arguments.iter())
            .all(|(our_argument, their_argument)| {
                self.type_compatible(our_argument.value_type, their_argument.value_type)
            });

        if !arguments_compatible {
            return false;
        }

        if !self.type_compatible(ours.return_type, theirs.return_type) {
            return false;
        }

        match (ours.throw_type, theirs.throw_type) {
            (None, _) => true,
            (Some(our_throw), Some(their_throw)) => self.type_compatible(our_throw, their_throw),
            (Some(_), None) => false,
        }
    }

    /// True if the type satisfies a trait requirement with the given name
    pub fn satisfies_trait(&self, location: TypeLocation, trait_name: &str) -> bool {
        match self.get(location) {
            TypeKind::Object(_) => self.object_implements_trait(location, trait_name),
            TypeKind::Trait(trait_type) => {
                trait_type.name == trait_name
                    || trait_type.required_traits.contains_key(trait_name)
            }
            TypeKind::TypeParameter(parameter) => {
                parameter.required_traits.contains_key(trait_name)
            }
            TypeKind::Optional(inner) => self.satisfies_trait(*inner, trait_name),
            TypeKind::Error | TypeKind::Never | TypeKind::Any => true,
            _ => false,
        }
    }

    /// True if the object, or an object on its prototype chain, implements a
    /// trait with the given name
    pub fn object_implements_trait(&self, location: TypeLocation, trait_name: &str) -> bool {
        let mut current = Some(location);

        while let Some(object_location) = current {
            let Some(object) = self.object(object_location) else { return false };

            if object.implements_trait(trait_name) {
                return true;
            }

            current = object.prototype;
        }

        false
    }

    fn prototype_chain_includes(&self, location: TypeLocation, name: &str) -> bool {
        let mut current = self.object(location).and_then(|object| object.prototype);

        while let Some(prototype_location) = current {
            let Some(prototype) = self.object(prototype_location) else { return false };

            if prototype.name == name {
                return true;
            }

            current = prototype.prototype;
        }

        false
    }

    /// Produces an uninstantiated-parameter instance of a type: every type
    /// parameter is bound to itself. Types without parameters are returned
    /// unchanged.
    pub fn new_instance(&mut self, location: TypeLocation) -> TypeLocation {
        match self.get(location) {
            TypeKind::Object(object)
                if !object.type_parameters.is_empty()
                    && object.type_parameter_instances.is_empty() =>
            {
                let mut copy = object.clone();

                for (name, parameter) in copy.type_parameters.clone().iter() {
                    copy.type_parameter_instances.bind(name.clone(), parameter);
                }

                self.alloc(TypeKind::Object(copy))
            }
            TypeKind::Trait(trait_type)
                if !trait_type.type_parameters.is_empty()
                    && trait_type.type_parameter_instances.is_empty() =>
            {
                let mut copy = trait_type.clone();

                for (name, parameter) in copy.type_parameters.clone().iter() {
                    copy.type_parameter_instances.bind(name.clone(), parameter);
                }

                self.alloc(TypeKind::Trait(copy))
            }
            _ => location,
        }
    }

    /// Instantiates a type with explicit type arguments, bound positionally.
    ///
    /// Returns `Err(declared_count)` when more arguments are supplied than
    /// the type declares parameters.
    pub fn new_instance_with_type_arguments(
        &mut self,
        location: TypeLocation,
        arguments: &[TypeLocation],
    ) -> Result<TypeLocation, usize> {
        let parameters = match self.get(location) {
            TypeKind::Object(object) => object.type_parameters.clone(),
            TypeKind::Trait(trait_type) => trait_type.type_parameters.clone(),
            _ => return Ok(location),
        };

        if arguments.len() > parameters.len() {
            return Err(parameters.len());
        }

        if arguments.is_empty() {
            return Ok(self.new_instance(location));
        }

        let mut instances = TypeParameterInstances::new();

        for (index, (name, parameter)) in parameters.iter().enumerate() {
            let value = arguments.get(index).copied().unwrap_or(parameter);
            instances.bind(name.clone(), value);
        }

        let instance = match self.get(location) {
            TypeKind::Object(object) => {
                let mut copy = object.clone();
                copy.type_parameter_instances = instances;
                TypeKind::Object(copy)
            }
            TypeKind::Trait(trait_type) => {
                let mut copy = trait_type.clone();
                copy.type_parameter_instances = instances;
                TypeKind::Trait(copy)
            }
            _ => unreachable!("only objects and traits reach this point"),
        };

        Ok(self.alloc(instance))
    }

    /// Clones a method's type for a send, binding caller-supplied type
    /// arguments to the method's type parameters.
    ///
    /// With no type parameters and no arguments this is the identity.
    pub fn new_instance_for_send(
        &mut self,
        method: TypeLocation,
        arguments: &[TypeLocation],
    ) -> TypeLocation {
        let Some(block) = self.block(method) else { return method };

        if block.type_parameters.is_empty() && arguments.is_empty() {
            return method;
        }

        let mut copy = block.clone();

        for (index, (name, parameter)) in copy.type_parameters.clone().iter().enumerate() {
            let value = arguments.get(index).copied().unwrap_or(parameter);
            copy.type_parameter_instances.bind(name.clone(), value);
        }

        self.alloc(TypeKind::Block(copy))
    }

    /// Substitutes bound type-parameter instances into a type expression,
    /// returning the original location when nothing changed
    pub fn resolve_type_parameters(
        &mut self,
        location: TypeLocation,
        instances: &TypeParameterInstances,
    ) -> TypeLocation {
        if instances.is_empty() {
            return location;
        }

        self.substitute(location, instances, None)
    }

    /// Replaces `Self` in a type expression with an instance of the given
    /// self type
    pub fn resolve_self(&mut self, location: TypeLocation, self_type: TypeLocation) -> TypeLocation {
        self.substitute(location, &TypeParameterInstances::new(), Some(self_type))
    }

    fn substitute(
        &mut self,
        location: TypeLocation,
        instances: &TypeParameterInstances,
        self_type: Option<TypeLocation>,
    ) -> TypeLocation {
        match self.get(location).clone() {
            TypeKind::SelfType => match self_type {
                Some(concrete) => self.new_instance(concrete),
                None => location,
            },
            TypeKind::TypeParameter(parameter) => {
                match instances.get(&parameter.name) {
                    Some(bound) if bound != location => bound,
                    _ => location,
                }
            }
            TypeKind::Optional(inner) => {
                let resolved = self.substitute(inner, instances, self_type);

                if resolved == inner {
                    location
                } else {
                    self.wrap_optional(resolved)
                }
            }
            TypeKind::Block(block) => {
                let mut copy = block;
                let mut changed = false;

                for argument in copy.arguments.iter_mut() {
                    let resolved = self.substitute(argument.value_type, instances, self_type);
                    if resolved != argument.value_type {
                        argument.value_type = resolved;
                        changed = true;
                    }
                }

                let resolved_return = self.substitute(copy.return_type, instances, self_type);
                if resolved_return != copy.return_type {
                    copy.return_type = resolved_return;
                    changed = true;
                }

                if let Some(throw_type) = copy.throw_type {
                    let resolved_throw = self.substitute(throw_type, instances, self_type);
                    if resolved_throw != throw_type {
                        copy.throw_type = Some(resolved_throw);
                        changed = true;
                    }
                }

                if changed {
                    self.alloc(TypeKind::Block(copy))
                } else {
                    location
                }
            }
            TypeKind::Object(object) => {
                let mut copy = object;
                let mut changed = false;

                let bindings = copy
                    .type_parameter_instances
                    .iter()
                    .map(|(name, value)| (name.clone(), value))
                    .collect::<Vec<_>>();

                for (name, value) in bindings {
                    let resolved = self.substitute(value, instances, self_type);
                    if resolved != value {
                        copy.type_parameter_instances.bind(name, resolved);
                        changed = true;
                    }
                }

                if changed {
                    self.alloc(TypeKind::Object(copy))
                } else {
                    location
                }
            }
            _ => location,
        }
    }

    /// Binds type parameters mentioned in an expected type according to the
    /// actual argument type, recording the bindings in `instances`
    pub fn initialize_as(
        &mut self,
        expected: TypeLocation,
        given: TypeLocation,
        instances: &mut TypeParameterInstances,
    ) {
        match (self.get(expected).clone(), self.get(given).clone()) {
            (TypeKind::TypeParameter(parameter), _) => {
                if instances.get(&parameter.name).map(|bound| self.get(bound).is_type_parameter()).unwrap_or(true) {
                    debug!("binding type parameter {} from argument", parameter.name);
                    instances.bind(parameter.name, given);
                }
            }
            (TypeKind::Optional(expected_inner), TypeKind::Optional(given_inner)) => {
                self.initialize_as(expected_inner, given_inner, instances);
            }
            (TypeKind::Optional(expected_inner), _) => {
                self.initialize_as(expected_inner, given, instances);
            }
            (TypeKind::Block(expected_block), TypeKind::Block(given_block)) => {
                for (expected_argument, given_argument) in expected_block
                    .arguments
                    .iter()
                    .zip(given_block.arguments.iter())
                {
                    self.initialize_as(
                        expected_argument.value_type,
                        given_argument.value_type,
                        instances,
                    );
                }

                self.initialize_as(expected_block.return_type, given_block.return_type, instances);
            }
            (TypeKind::Object(expected_object), TypeKind::Object(given_object))
                if expected_object.name == given_object.name =>
            {
                for (name, expected_instance) in expected_object.type_parameter_instances.iter() {
                    if let Some(given_instance) = given_object.type_parameter_instances.get(name) {
                        self.initialize_as(expected_instance, given_instance, instances);
                    }
                }
            }
            _ => {}
        }
    }

    /// Produces a copy of a type with the type-parameter bindings of the
    /// given sources merged in. Sources without bindings contribute nothing.
    pub fn with_type_parameter_instances_from(
        &mut self,
        location: TypeLocation,
        sources: &[TypeLocation],
    ) -> TypeLocation {
        let mut merged = TypeParameterInstances::new();

        for source in sources {
            match self.get(*source) {
                TypeKind::Object(object) => merged.merge(&object.type_parameter_instances),
                TypeKind::Trait(trait_type) => merged.merge(&trait_type.type_parameter_instances),
                TypeKind::Block(block) => merged.merge(&block.type_parameter_instances),
                _ => {}
            }
        }

        if merged.is_empty() {
            return location;
        }

        self.substitute(location, &merged, None)
    }

    /// Verifies the bounds of a method against a concrete receiver type.
    ///
    /// Bounds name a type parameter of the receiver and list extra traits
    /// its bound instance must implement before the method may be called.
    pub fn check_method_bounds(
        &self,
        receiver: TypeLocation,
        method: TypeLocation,
    ) -> Result<(), BoundViolation> {
        let Some(block) = self.block(method) else { return Ok(()) };

        if block.method_bounds.is_empty() {
            return Ok(());
        }

        let Some(receiver_object) = self.object(receiver) else { return Ok(()) };

        for (parameter_name, required) in block.method_bounds.iter() {
            let Some(bound_instance) =
                receiver_object.type_parameter_instances.get(parameter_name)
            else {
                continue;
            };

            // An unbound parameter cannot be checked before instantiation.
            if self.get(bound_instance).is_type_parameter() {
                continue;
            }

            for trait_location in required {
                let trait_name = match self.get(*trait_location) {
                    TypeKind::Trait(trait_type) => trait_type.name.clone(),
                    _ => continue,
                };

                if !self.satisfies_trait(bound_instance, &trait_name) {
                    return Err(BoundViolation {
                        trait_name,
                        type_name: self.name_of(bound_instance),
                    });
                }
            }
        }

        Ok(())
    }

    /// Copies a trait's default methods onto an implementing object.
    ///
    /// Returns the names of default methods the object already defines with
    /// an incompatible signature.
    pub fn copy_default_methods(
        &mut self,
        trait_location: TypeLocation,
        object_location: TypeLocation,
    ) -> Vec<String> {
        let Some(trait_type) = self.trait_type(trait_location) else { return Vec::new() };

        let defaults = trait_type
            .default_methods
            .symbols()
            .map(|symbol| (symbol.name.clone(), symbol.value_type))
            .collect::<Vec<_>>();

        let mut conflicts = Vec::new();

        for (name, method_type) in defaults {
            let existing = self
                .object(object_location)
                .and_then(|object| object.attributes.lookup(&name));

            match existing {
                Some(symbol) => {
                    if !self.type_compatible(symbol.value_type, method_type) {
                        conflicts.push(name);
                    }
                }
                None => {
                    if let Some(object) = self.object_mut(object_location) {
                        // Copying cannot clash: the lookup above was empty.
                        object
                            .attributes
                            .define(name, method_type, false, None)
                            .ok();
                    }
                }
            }
        }

        conflicts
    }
}
