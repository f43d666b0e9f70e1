//! Type signature definition.
//!
//! Creates the nominal types for every module-level `object` and `trait`
//! declaration, registers them as module globals and as attributes of the
//! module type, and declares their type parameters. Requirement lists and
//! bodies are filled in later by `DefineType`; this pass only claims the
//! names so forward references resolve.
//!
//! Redeclaring a trait is allowed only while it is still empty (no methods,
//! no implementers): that redeclaration extends the trait. Anything else is
//! a redefinition error.

use log::debug;

use crate::{
    ast::{BodyAst, ExpressionAst, ObjectAst, TraitAst, TypeParameterAst},
    error::CompileError,
    module::QualifiedName,
    state::State,
    types::{ObjectType, TraitType, TypeDb, TypeKind, TypeLocation, TypeParameterType},
};

pub fn run(state: &mut State, name: &QualifiedName, body: &BodyAst) {
    for expression in body.expressions.iter() {
        match expression {
            ExpressionAst::Object(object) => on_object(state, name, object),
            ExpressionAst::Trait(trait_node) => on_trait(state, name, trait_node),
            _ => {}
        }
    }
}

fn on_object(state: &mut State, module_name: &QualifiedName, object: &ObjectAst) {
    if TypeDb::reserved_constant(&object.name) {
        state.record(CompileError::redefine_reserved_constant(
            object.name.clone(),
            &object.span,
        ));
        return;
    }

    debug!("defining object type {} in {}", object.name, module_name);

    let prototype = state.types.builtins().object;
    let mut record = ObjectType::new(object.name.clone(), Some(prototype));
    define_type_parameters(state, &mut record.type_parameters, &object.type_parameters);

    let location = state.types.alloc(TypeKind::Object(record));
    state.set_node_type(object.index, location);
    register(state, module_name, &object.name, location, &object.span);
}

fn on_trait(state: &mut State, module_name: &QualifiedName, trait_node: &TraitAst) {
    if TypeDb::reserved_constant(&trait_node.name) {
        state.record(CompileError::redefine_reserved_constant(
            trait_node.name.clone(),
            &trait_node.span,
        ));
        return;
    }

    // A second declaration of an empty trait extends it in place.
    let existing = state
        .module(module_name)
        .and_then(|module| module.globals.borrow().lookup(&trait_node.name));

    if let Some(symbol) = existing {
        match state.types.trait_type(symbol.value_type) {
            Some(found) if found.is_empty() => {
                debug!("extending empty trait {}", trait_node.name);
                state.set_node_type(trait_node.index, symbol.value_type);
            }
            Some(_) => {
                state.record(CompileError::extend_non_empty_trait(
                    trait_node.name.clone(),
                    &trait_node.span,
                ));
            }
            None => {
                let old = symbol.span.as_ref().map(|span| span.to_range()).unwrap_or(0..0);
                state.record(CompileError::already_defined(old, &trait_node.span));
            }
        }
        return;
    }

    debug!("defining trait type {} in {}", trait_node.name, module_name);

    let mut record = TraitType::new(trait_node.name.clone());
    define_type_parameters(state, &mut record.type_parameters, &trait_node.type_parameters);

    let location = state.types.alloc(TypeKind::Trait(record));
    state.set_node_type(trait_node.index, location);
    register(state, module_name, &trait_node.name, location, &trait_node.span);
}

fn define_type_parameters(
    state: &mut State,
    into: &mut crate::types::TypeParameters,
    declared: &[TypeParameterAst],
) {
    for parameter in declared.iter() {
        // Requirements are resolved by DefineType once every trait exists.
        let record = TypeParameterType::new(parameter.name.clone());
        let location = state.types.alloc(TypeKind::TypeParameter(record));
        into.define(parameter.name.clone(), location);
    }
}

fn register(
    state: &mut State,
    module_name: &QualifiedName,
    name: &str,
    location: TypeLocation,
    span: &crate::span::Span,
) {
    let Some(module) = state.module(module_name) else { return };
    let module_type = module.module_type;
    let globals = module.globals.clone();

    let defined = globals
        .borrow_mut()
        .define(name.to_string(), location, false, Some(span.clone()));

    match defined {
        Ok(_) => {
            if let Some(module_object) = state.types.object_mut(module_type) {
                module_object
                    .attributes
                    .define(name.to_string(), location, false, Some(span.clone()))
                    .ok();
            }
        }
        Err(error) => state.record(error),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{config::Config, file::SourceFile, module::Module, span::Span};

    fn setup() -> (State, QualifiedName) {
        let mut state = State::new(Config::default());
        let name = QualifiedName::from_dotted("main");
        let file = SourceFile::new(vec!["main".into()], "".to_string());

        let mut module = Module::new(name.clone(), file);
        module.module_type = state
            .types
            .alloc(TypeKind::Object(ObjectType::new("main".to_string(), None)));
        state.add_module(module);

        (state, name)
    }

    fn span() -> Span {
        Span::synthesized(SourceFile::new(vec!["main".into()], "".to_string()))
    }

    fn object(state: &mut State, name: &str) -> ExpressionAst {
        ExpressionAst::Object(Box::new(ObjectAst {
            index: state.ast_ids.next(),
            span: span(),
            name: name.to_string(),
            type_parameters: Vec::new(),
            body: BodyAst::new(state.ast_ids.next(), span(), Vec::new()),
        }))
    }

    fn trait_node(state: &mut State, name: &str) -> ExpressionAst {
        ExpressionAst::Trait(Box::new(TraitAst {
            index: state.ast_ids.next(),
            span: span(),
            name: name.to_string(),
            type_parameters: Vec::new(),
            required_traits: Vec::new(),
            body: BodyAst::new(state.ast_ids.next(), span(), Vec::new()),
        }))
    }

    #[test]
    fn objects_become_globals_and_module_attributes() {
        let (mut state, name) = setup();
        let node = object(&mut state, "Point");
        let body = BodyAst::new(state.ast_ids.next(), span(), vec![node]);

        run(&mut state, &name, &body);

        let module = state.module(&name).unwrap();
        let symbol = module.globals.borrow().lookup("Point").unwrap();
        assert_eq!(state.types.name_of(symbol.value_type), "Point");

        let module_object = state.types.object(module.module_type).unwrap();
        assert!(module_object.attributes.lookup("Point").is_some());
    }

    #[test]
    fn redeclaring_an_empty_trait_extends_it() {
        let (mut state, name) = setup();
        let first = trait_node(&mut state, "ToString");
        let first_index = first.index();
        let second = trait_node(&mut state, "ToString");
        let second_index = second.index();
        let body = BodyAst::new(state.ast_ids.next(), span(), vec![first, second]);

        run(&mut state, &name, &body);

        assert!(state.diagnostics.is_empty());
        assert_eq!(state.node_type(first_index), state.node_type(second_index));
    }

    #[test]
    fn redeclaring_a_non_empty_trait_is_an_error() {
        let (mut state, name) = setup();
        let first = trait_node(&mut state, "ToString");
        let first_index = first.index();
        let body = BodyAst::new(state.ast_ids.next(), span(), vec![first]);

        run(&mut state, &name, &body);

        // Give the trait a required method, making it non-empty.
        let location = state.node_type(first_index);
        let block = state.types.alloc(TypeKind::Block(crate::types::BlockType::new(
            crate::types::BlockKind::Method,
            "to_string".to_string(),
            location,
        )));
        state
            .types
            .trait_type_mut(location)
            .unwrap()
            .required_methods
            .define("to_string".to_string(), block, false, None)
            .unwrap();

        let again = trait_node(&mut state, "ToString");
        let body = BodyAst::new(state.ast_ids.next(), span(), vec![again]);

        run(&mut state, &name, &body);

        assert!(state
            .diagnostics
            .iter()
            .any(|error| error.is_extend_non_empty_trait()));
    }

    #[test]
    fn reserved_constants_cannot_be_redefined() {
        let (mut state, name) = setup();
        let node = object(&mut state, "Integer");
        let body = BodyAst::new(state.ast_ids.next(), span(), vec![node]);

        run(&mut state, &name, &body);

        assert!(state
            .diagnostics
            .iter()
            .any(|error| error.is_redefine_reserved_constant()));
    }
}
