//! Trait implementation marking.
//!
//! Records every module-level `impl Trait for Type` on the type database
//! without validating method bodies: the object lists the trait as
//! implemented and the trait lists the object as an implementer. The
//! validation (required traits present, required methods compatible)
//! happens in `DefineType`, which retracts the marking when it fails.
//!
//! Registering before validation is what allows mutually recursive types
//! to reference each other's trait implementations.

use log::debug;

use crate::{
    ast::{BodyAst, ExpressionAst, TraitImplementationAst, TypeNameAst},
    error::CompileError,
    module::QualifiedName,
    state::State,
};

use super::define_type::resolve_constant_path;

pub fn run(state: &mut State, name: &QualifiedName, body: &BodyAst) {
    for expression in body.expressions.iter() {
        if let ExpressionAst::TraitImplementation(implementation) = expression {
            on_implementation(state, name, implementation);
        }
    }
}

fn on_implementation(
    state: &mut State,
    module_name: &QualifiedName,
    implementation: &TraitImplementationAst,
) {
    let Some((trait_name, trait_location)) =
        resolve_named(state, module_name, &implementation.trait_name)
    else {
        return;
    };

    let Some((object_name, object_location)) =
        resolve_named(state, module_name, &implementation.object_name)
    else {
        return;
    };

    if state.types.trait_type(trait_location).is_none() {
        state.record(CompileError::not_a_trait(
            trait_name,
            implementation.trait_name.span(),
        ));
        return;
    }

    if state.types.object(object_location).is_none() {
        state.record(CompileError::not_an_object(
            object_name,
            implementation.object_name.span(),
        ));
        return;
    }

    debug!("marking {object_name} as implementing {trait_name}");

    state
        .types
        .object_mut(object_location)
        .expect("checked to be an object above")
        .implement_trait(trait_name.clone(), trait_location);

    state
        .types
        .trait_type_mut(trait_location)
        .expect("checked to be a trait above")
        .add_implementer(object_name);

    state.set_implementation_target(implementation.index, object_location, trait_location);
}

fn resolve_named(
    state: &mut State,
    module_name: &QualifiedName,
    name: &TypeNameAst,
) -> Option<(String, crate::types::TypeLocation)> {
    let TypeNameAst::Named(named) = name else {
        let known = state.known_type_names();
        state.record(CompileError::type_not_found(
            known.iter().map(|known| known.as_str()),
            "Self".to_string(),
            name.span(),
        ));
        return None;
    };

    let qualified = named.qualified_name();

    match resolve_constant_path(state, module_name, &named.segments) {
        Some(location) => Some((qualified, location)),
        None => {
            let known = state.known_type_names();
            state.record(CompileError::type_not_found(
                known.iter().map(|known| known.as_str()),
                qualified,
                &named.span,
            ));
            None
        }
    }
}
