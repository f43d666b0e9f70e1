//! Default values for rest arguments.
//!
//! A rest argument not supplied by the caller collects into an empty
//! array, so every rest argument without a default gets `Array.new` as
//! one. Lowering turns that call into a `SetArray` with no values.

use crate::{
    ast::{AstIds, BodyAst, ConstantAst, DefineArgumentAst, ExpressionAst, SendAst},
    state::State,
};

pub fn run(state: &mut State, body: &mut BodyAst) {
    let ids = state.ast_ids.clone();

    for expression in body.expressions.iter_mut() {
        on_expression(&ids, expression);
    }
}

fn on_expression(ids: &AstIds, expression: &mut ExpressionAst) {
    match expression {
        ExpressionAst::Method(method) => {
            on_arguments(ids, &mut method.arguments);

            if let Some(body) = method.body.as_mut() {
                for expression in body.expressions.iter_mut() {
                    on_expression(ids, expression);
                }
            }
        }
        ExpressionAst::Block(block) => {
            on_arguments(ids, &mut block.arguments);

            for expression in block.body.expressions.iter_mut() {
                on_expression(ids, expression);
            }
        }
        ExpressionAst::Object(object) => {
            for expression in object.body.expressions.iter_mut() {
                on_expression(ids, expression);
            }
        }
        ExpressionAst::Trait(trait_node) => {
            for expression in trait_node.body.expressions.iter_mut() {
                on_expression(ids, expression);
            }
        }
        ExpressionAst::TraitImplementation(implementation) => {
            for expression in implementation.body.expressions.iter_mut() {
                on_expression(ids, expression);
            }
        }
        ExpressionAst::ReopenObject(reopen) => {
            for expression in reopen.body.expressions.iter_mut() {
                on_expression(ids, expression);
            }
        }
        _ => {}
    }
}

fn on_arguments(ids: &AstIds, arguments: &mut [DefineArgumentAst]) {
    for argument in arguments.iter_mut() {
        if argument.rest && argument.default.is_none() {
            argument.default = Some(Box::new(ExpressionAst::Send(Box::new(SendAst {
                index: ids.next(),
                span: argument.span.clone(),
                receiver: Some(Box::new(ExpressionAst::Constant(ConstantAst {
                    index: ids.next(),
                    span: argument.span.clone(),
                    name: "Array".to_string(),
                }))),
                name: "new".to_string(),
                type_arguments: Vec::new(),
                arguments: Vec::new(),
            }))));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ast::MethodAst, config::Config, file::SourceFile, span::Span};

    fn span() -> Span {
        Span::synthesized(SourceFile::new(vec!["test".into()], "".to_string()))
    }

    #[test]
    fn rest_arguments_default_to_array_new() {
        let mut state = State::new(Config::default());
        let ids = state.ast_ids.clone();

        let method = MethodAst {
            index: ids.next(),
            span: span(),
            name: "f".to_string(),
            type_parameters: Vec::new(),
            arguments: vec![DefineArgumentAst {
                index: ids.next(),
                span: span(),
                name: "xs".to_string(),
                annotation: None,
                default: None,
                rest: true,
            }],
            return_annotation: None,
            throw_annotation: None,
            method_bounds: Vec::new(),
            body: Some(BodyAst::new(ids.next(), span(), Vec::new())),
        };

        let mut body = BodyAst::new(
            ids.next(),
            span(),
            vec![ExpressionAst::Method(Box::new(method))],
        );

        run(&mut state, &mut body);

        let ExpressionAst::Method(method) = &body.expressions[0] else { panic!() };
        let default = method.arguments[0].default.as_deref().unwrap();
        let ExpressionAst::Send(send) = default else { panic!("expected Array.new") };

        assert_eq!(send.name, "new");
        assert!(matches!(
            send.receiver.as_deref(),
            Some(ExpressionAst::Constant(constant)) if constant.name == "Array"
        ));
    }
}
