//! Object desugaring: `init` to `new`.
//!
//! Every `object` that does not define `new` itself gets one synthesized:
//! allocate an instance through the low-level `set_object` instruction with
//! `self` (the prototype) as the receiver, run `init` on it when one is
//! defined, and return the instance. The arguments of `init` are mirrored
//! onto `new`, so construction sites keep the constructor's signature.
//!
//! Synthesized subtrees are re-indexed node by node: pass decorations are
//! keyed by node index, so a cloned default value must never share indexes
//! with the original.

use crate::{
    ast::{
        AstIds, BodyAst, DefineArgumentAst, DefineTarget, DefineVariableAst, ExpressionAst,
        IdentifierAst, MatchArmAst, MethodAst, ObjectAst, PatternAst, RawInstructionAst,
        SelfTypeAst, SendArgumentAst, SendAst, TypeNameAst,
    },
    span::Span,
    state::State,
};

/// The low-level allocation instruction emitted by synthesized constructors
pub static SET_OBJECT_INSTRUCTION: &str = "set_object";

pub fn run(state: &mut State, body: &mut BodyAst) {
    let ids = state.ast_ids.clone();

    for expression in body.expressions.iter_mut() {
        on_expression(&ids, expression);
    }
}

fn on_expression(ids: &AstIds, expression: &mut ExpressionAst) {
    match expression {
        ExpressionAst::Object(object) => on_object(ids, object),
        ExpressionAst::Trait(trait_node) => {
            for expression in trait_node.body.expressions.iter_mut() {
                on_expression(ids, expression);
            }
        }
        _ => {}
    }
}

fn on_object(ids: &AstIds, object: &mut ObjectAst) {
    // Nested objects are desugared too.
    for expression in object.body.expressions.iter_mut() {
        on_expression(ids, expression);
    }

    if find_method(&object.body, "new").is_some() {
        return;
    }

    let new_method = match find_method(&object.body, "init") {
        Some(init) => new_from_init(ids, object, init),
        None => default_new(ids, object),
    };

    object.body.expressions.push(ExpressionAst::Method(Box::new(new_method)));
}

fn find_method<'a>(body: &'a BodyAst, name: &str) -> Option<&'a MethodAst> {
    body.expressions.iter().find_map(|expression| match expression {
        ExpressionAst::Method(method) if method.name == name => Some(method.as_ref()),
        _ => None,
    })
}

/// `fn new(<init arguments>) -> Self { let instance = set_object(self);
/// instance.init(...); instance }`
fn new_from_init(ids: &AstIds, object: &ObjectAst, init: &MethodAst) -> MethodAst {
    let span = object.span.clone();
    let arguments = init
        .arguments
        .iter()
        .map(|argument| reindex_argument(ids, argument))
        .collect::<Vec<_>>();

    let init_call = ExpressionAst::Send(Box::new(SendAst {
        index: ids.next(),
        span: span.clone(),
        receiver: Some(Box::new(identifier(ids, &span, "instance"))),
        name: "init".to_string(),
        type_arguments: Vec::new(),
        arguments: arguments
            .iter()
            .map(|argument| SendArgumentAst {
                index: ids.next(),
                span: span.clone(),
                keyword: None,
                value: identifier(ids, &span, &argument.name),
            })
            .collect(),
    }));

    let body = vec![
        define_instance(ids, &span),
        init_call,
        identifier(ids, &span, "instance"),
    ];

    new_method(ids, &span, arguments, body)
}

/// `fn new -> Self { set_object(self) }`
fn default_new(ids: &AstIds, object: &ObjectAst) -> MethodAst {
    let span = object.span.clone();
    let body = vec![allocation(ids, &span)];

    new_method(ids, &span, Vec::new(), body)
}

fn new_method(
    ids: &AstIds,
    span: &Span,
    arguments: Vec<DefineArgumentAst>,
    body: Vec<ExpressionAst>,
) -> MethodAst {
    MethodAst {
        index: ids.next(),
        span: span.clone(),
        name: "new".to_string(),
        type_parameters: Vec::new(),
        arguments,
        return_annotation: Some(TypeNameAst::SelfType(SelfTypeAst {
            index: ids.next(),
            span: span.clone(),
            optional: false,
        })),
        throw_annotation: None,
        method_bounds: Vec::new(),
        body: Some(BodyAst::new(ids.next(), span.clone(), body)),
    }
}

fn define_instance(ids: &AstIds, span: &Span) -> ExpressionAst {
    ExpressionAst::DefineVariable(Box::new(DefineVariableAst {
        index: ids.next(),
        span: span.clone(),
        target: DefineTarget::Local {
            name: "instance".to_string(),
            mutable: false,
        },
        annotation: None,
        value: Box::new(allocation(ids, span)),
    }))
}

fn allocation(ids: &AstIds, span: &Span) -> ExpressionAst {
    ExpressionAst::RawInstruction(Box::new(RawInstructionAst {
        index: ids.next(),
        span: span.clone(),
        name: SET_OBJECT_INSTRUCTION.to_string(),
        arguments: vec![ExpressionAst::SelfObject(crate::ast::SelfAst {
            index: ids.next(),
            span: span.clone(),
        })],
    }))
}

fn identifier(ids: &AstIds, span: &Span, name: &str) -> ExpressionAst {
    ExpressionAst::Identifier(IdentifierAst {
        index: ids.next(),
        span: span.clone(),
        name: name.to_string(),
    })
}

fn reindex_argument(ids: &AstIds, argument: &DefineArgumentAst) -> DefineArgumentAst {
    DefineArgumentAst {
        index: ids.next(),
        span: argument.span.clone(),
        name: argument.name.clone(),
        annotation: argument.annotation.clone(),
        default: argument
            .default
            .as_deref()
            .map(|default| Box::new(reindex_expression(ids, default))),
        rest: argument.rest,
    }
}

/// Deep-clones an expression with fresh node indexes.
fn reindex_expression(ids: &AstIds, expression: &ExpressionAst) -> ExpressionAst {
    let mut copy = expression.clone();
    reindex_in_place(ids, &mut copy);
    copy
}

fn reindex_body(ids: &AstIds, body: &mut BodyAst) {
    body.index = ids.next();

    for expression in body.expressions.iter_mut() {
        reindex_in_place(ids, expression);
    }
}

fn reindex_pattern(ids: &AstIds, pattern: &mut PatternAst) {
    match pattern {
        PatternAst::Int { index, .. }
        | PatternAst::Float { index, .. }
        | PatternAst::Str { index, .. }
        | PatternAst::Binding { index, .. }
        | PatternAst::Wildcard { index, .. }
        | PatternAst::Constant { index, .. } => *index = ids.next(),
        PatternAst::Variant { index, fields, .. } | PatternAst::Tuple { index, fields, .. } => {
            *index = ids.next();

            for field in fields.iter_mut() {
                reindex_pattern(ids, field);
            }
        }
        PatternAst::ClassShape { index, fields, .. } => {
            *index = ids.next();

            for (_, field) in fields.iter_mut() {
                reindex_pattern(ids, field);
            }
        }
    }
}

fn reindex_in_place(ids: &AstIds, expression: &mut ExpressionAst) {
    match expression {
        ExpressionAst::Int(node) => node.index = ids.next(),
        ExpressionAst::Float(node) => node.index = ids.next(),
        ExpressionAst::Str(node) => node.index = ids.next(),
        ExpressionAst::Identifier(node) => node.index = ids.next(),
        ExpressionAst::Constant(node) => node.index = ids.next(),
        ExpressionAst::Attribute(node) => node.index = ids.next(),
        ExpressionAst::SelfObject(node) => node.index = ids.next(),
        ExpressionAst::DefineVariable(node) => {
            node.index = ids.next();
            reindex_in_place(ids, &mut node.value);
        }
        ExpressionAst::Reassign(node) => {
            node.index = ids.next();
            reindex_in_place(ids, &mut node.value);
        }
        ExpressionAst::Send(node) => {
            node.index = ids.next();

            if let Some(receiver) = node.receiver.as_deref_mut() {
                reindex_in_place(ids, receiver);
            }

            for argument in node.arguments.iter_mut() {
                argument.index = ids.next();
                reindex_in_place(ids, &mut argument.value);
            }
        }
        ExpressionAst::Block(node) => {
            node.index = ids.next();

            for argument in node.arguments.iter_mut() {
                *argument = reindex_argument(ids, argument);
            }

            reindex_body(ids, &mut node.body);
        }
        ExpressionAst::Method(node) => {
            node.index = ids.next();

            for argument in node.arguments.iter_mut() {
                *argument = reindex_argument(ids, argument);
            }

            if let Some(body) = node.body.as_mut() {
                reindex_body(ids, body);
            }
        }
        ExpressionAst::Return(node) => {
            node.index = ids.next();

            if let Some(value) = node.value.as_deref_mut() {
                reindex_in_place(ids, value);
            }
        }
        ExpressionAst::Throw(node) => {
            node.index = ids.next();
            reindex_in_place(ids, &mut node.value);
        }
        ExpressionAst::Try(node) => {
            node.index = ids.next();
            reindex_in_place(ids, &mut node.expression);

            if let Some(argument) = node.else_argument.as_mut() {
                argument.index = ids.next();
            }

            if let Some(else_body) = node.else_body.as_mut() {
                reindex_body(ids, else_body);
            }
        }
        ExpressionAst::Object(node) => {
            node.index = ids.next();
            reindex_body(ids, &mut node.body);
        }
        ExpressionAst::Trait(node) => {
            node.index = ids.next();
            reindex_body(ids, &mut node.body);
        }
        ExpressionAst::TraitImplementation(node) => {
            node.index = ids.next();
            reindex_body(ids, &mut node.body);
        }
        ExpressionAst::ReopenObject(node) => {
            node.index = ids.next();
            reindex_body(ids, &mut node.body);
        }
        ExpressionAst::Import(node) => node.index = ids.next(),
        ExpressionAst::TypeCast(node) => {
            node.index = ids.next();
            reindex_in_place(ids, &mut node.value);
        }
        ExpressionAst::RawInstruction(node) => {
            node.index = ids.next();

            for argument in node.arguments.iter_mut() {
                reindex_in_place(ids, argument);
            }
        }
        ExpressionAst::CompilerOption(node) => node.index = ids.next(),
        ExpressionAst::Match(node) => {
            node.index = ids.next();
            reindex_in_place(ids, &mut node.scrutinee);

            for MatchArmAst { index, patterns, guard, body, .. } in node.arms.iter_mut() {
                *index = ids.next();

                for pattern in patterns.iter_mut() {
                    reindex_pattern(ids, pattern);
                }

                if let Some(guard) = guard.as_deref_mut() {
                    reindex_in_place(ids, guard);
                }

                reindex_body(ids, body);
            }

            if let Some(else_body) = node.else_body.as_mut() {
                reindex_body(ids, else_body);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{config::Config, file::SourceFile};

    fn span() -> Span {
        Span::synthesized(SourceFile::new(vec!["test".into()], "".to_string()))
    }

    fn object_with_init(state: &mut State) -> ObjectAst {
        let ids = state.ast_ids.clone();

        let init = MethodAst {
            index: ids.next(),
            span: span(),
            name: "init".to_string(),
            type_parameters: Vec::new(),
            arguments: vec![DefineArgumentAst {
                index: ids.next(),
                span: span(),
                name: "x".to_string(),
                annotation: None,
                default: Some(Box::new(ExpressionAst::Int(crate::ast::IntLiteralAst {
                    index: ids.next(),
                    span: span(),
                    value: 0,
                }))),
                rest: false,
            }],
            return_annotation: None,
            throw_annotation: None,
            method_bounds: Vec::new(),
            body: Some(BodyAst::new(ids.next(), span(), Vec::new())),
        };

        ObjectAst {
            index: ids.next(),
            span: span(),
            name: "Point".to_string(),
            type_parameters: Vec::new(),
            body: BodyAst::new(ids.next(), span(), vec![ExpressionAst::Method(Box::new(init))]),
        }
    }

    #[test]
    fn init_produces_a_matching_new() {
        let mut state = State::new(Config::default());
        let object = object_with_init(&mut state);

        let mut body = BodyAst::new(
            state.ast_ids.next(),
            span(),
            vec![ExpressionAst::Object(Box::new(object))],
        );

        run(&mut state, &mut body);

        let ExpressionAst::Object(object) = &body.expressions[0] else { panic!() };
        let new = find_method(&object.body, "new").expect("a new method is synthesized");

        assert_eq!(new.arguments.len(), 1);
        assert_eq!(new.arguments[0].name, "x");
        assert!(new.arguments[0].default.is_some());

        // Cloned defaults must not share node indexes with init's.
        let init = find_method(&object.body, "init").unwrap();
        assert_ne!(new.arguments[0].index, init.arguments[0].index);

        // The body allocates, initializes and yields the instance.
        let new_body = new.body.as_ref().unwrap();
        assert_eq!(new_body.expressions.len(), 3);
        assert!(new_body.expressions[0].is_define_variable());
        assert!(new_body.expressions[1].is_send());
        assert!(new_body.expressions[2].is_identifier());
    }

    #[test]
    fn objects_without_init_get_a_default_new() {
        let mut state = State::new(Config::default());
        let ids = state.ast_ids.clone();

        let object = ObjectAst {
            index: ids.next(),
            span: span(),
            name: "Empty".to_string(),
            type_parameters: Vec::new(),
            body: BodyAst::new(ids.next(), span(), Vec::new()),
        };

        let mut body = BodyAst::new(
            ids.next(),
            span(),
            vec![ExpressionAst::Object(Box::new(object))],
        );

        run(&mut state, &mut body);

        let ExpressionAst::Object(object) = &body.expressions[0] else { panic!() };
        let new = find_method(&object.body, "new").unwrap();

        assert!(new.arguments.is_empty());
        assert_eq!(new.body.as_ref().unwrap().expressions.len(), 1);
    }

    #[test]
    fn an_existing_new_is_left_alone() {
        let mut state = State::new(Config::default());
        let ids = state.ast_ids.clone();

        let existing = MethodAst {
            index: ids.next(),
            span: span(),
            name: "new".to_string(),
            type_parameters: Vec::new(),
            arguments: Vec::new(),
            return_annotation: None,
            throw_annotation: None,
            method_bounds: Vec::new(),
            body: Some(BodyAst::new(ids.next(), span(), Vec::new())),
        };

        let object = ObjectAst {
            index: ids.next(),
            span: span(),
            name: "Custom".to_string(),
            type_parameters: Vec::new(),
            body: BodyAst::new(
                ids.next(),
                span(),
                vec![ExpressionAst::Method(Box::new(existing))],
            ),
        };

        let mut body = BodyAst::new(
            ids.next(),
            span(),
            vec![ExpressionAst::Object(Box::new(object))],
        );

        run(&mut state, &mut body);

        let ExpressionAst::Object(object) = &body.expressions[0] else { panic!() };
        assert_eq!(object.body.expressions.len(), 1);
    }
}
