//! Method desugaring: default return types and trailing returns.
//!
//! Methods without an explicit return type are given `Nil`. When the last
//! body expression is neither a `return` nor a self tail call, it is
//! wrapped in an implicit `return` (an empty body gets a bare one), so
//! lowering only ever sees explicitly terminated method bodies. A
//! self tail call is left alone for the tail-call elimination pass to
//! rewrite.

use crate::{
    ast::{
        AstIds, BodyAst, ExpressionAst, MethodAst, NamedTypeAst, ReturnAst, TypeNameAst,
    },
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
        ExpressionAst::Method(method) => on_method(ids, method),
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

fn on_method(ids: &AstIds, method: &mut MethodAst) {
    if method.return_annotation.is_none() {
        method.return_annotation = Some(TypeNameAst::Named(NamedTypeAst {
            index: ids.next(),
            span: method.span.clone(),
            segments: vec!["Nil".to_string()],
            type_arguments: Vec::new(),
            optional: false,
        }));
    }

    let Some(body) = method.body.as_mut() else { return };

    let wrap = match body.last_expression() {
        None => true,
        Some(ExpressionAst::Return(_)) => false,
        Some(last) => !last.is_self_tail_call(&method.name),
    };

    if !wrap {
        return;
    }

    let value = body.expressions.pop();
    let span = value
        .as_ref()
        .map(|expression| expression.span().clone())
        .unwrap_or_else(|| body.span.clone());

    body.expressions.push(ExpressionAst::Return(Box::new(ReturnAst {
        index: ids.next(),
        span,
        value: value.map(Box::new),
        implicit: true,
    })));
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        ast::{IntLiteralAst, SendAst},
        config::Config,
        file::SourceFile,
        span::Span,
    };

    fn span() -> Span {
        Span::synthesized(SourceFile::new(vec!["test".into()], "".to_string()))
    }

    fn method(state: &mut State, name: &str, body: Vec<ExpressionAst>) -> ExpressionAst {
        let ids = state.ast_ids.clone();

        ExpressionAst::Method(Box::new(MethodAst {
            index: ids.next(),
            span: span(),
            name: name.to_string(),
            type_parameters: Vec::new(),
            arguments: Vec::new(),
            return_annotation: None,
            throw_annotation: None,
            method_bounds: Vec::new(),
            body: Some(BodyAst::new(ids.next(), span(), body)),
        }))
    }

    #[test]
    fn the_default_return_type_is_nil() {
        let mut state = State::new(Config::default());
        let node = method(&mut state, "test", Vec::new());
        let mut body = BodyAst::new(state.ast_ids.next(), span(), vec![node]);

        run(&mut state, &mut body);

        let ExpressionAst::Method(method) = &body.expressions[0] else { panic!() };
        let Some(TypeNameAst::Named(named)) = &method.return_annotation else {
            panic!("expected a named return annotation")
        };
        assert_eq!(named.qualified_name(), "Nil");
    }

    #[test]
    fn the_last_expression_is_wrapped_in_a_return() {
        let mut state = State::new(Config::default());
        let literal = ExpressionAst::Int(IntLiteralAst {
            index: state.ast_ids.next(),
            span: span(),
            value: 42,
        });
        let node = method(&mut state, "answer", vec![literal]);
        let mut body = BodyAst::new(state.ast_ids.next(), span(), vec![node]);

        run(&mut state, &mut body);

        let ExpressionAst::Method(method) = &body.expressions[0] else { panic!() };
        let method_body = method.body.as_ref().unwrap();
        let ExpressionAst::Return(last) = method_body.last_expression().unwrap() else {
            panic!("expected an implicit return")
        };

        assert!(last.implicit);
        assert!(last.value.as_ref().unwrap().is_int());
    }

    #[test]
    fn self_tail_calls_are_not_wrapped() {
        let mut state = State::new(Config::default());
        let call = ExpressionAst::Send(Box::new(SendAst {
            index: state.ast_ids.next(),
            span: span(),
            receiver: None,
            name: "spin".to_string(),
            type_arguments: Vec::new(),
            arguments: Vec::new(),
        }));
        let node = method(&mut state, "spin", vec![call]);
        let mut body = BodyAst::new(state.ast_ids.next(), span(), vec![node]);

        run(&mut state, &mut body);

        let ExpressionAst::Method(method) = &body.expressions[0] else { panic!() };
        assert!(method.body.as_ref().unwrap().last_expression().unwrap().is_send());
    }

    #[test]
    fn empty_bodies_get_a_bare_return() {
        let mut state = State::new(Config::default());
        let node = method(&mut state, "noop", Vec::new());
        let mut body = BodyAst::new(state.ast_ids.next(), span(), vec![node]);

        run(&mut state, &mut body);

        let ExpressionAst::Method(method) = &body.expressions[0] else { panic!() };
        let ExpressionAst::Return(last) =
            method.body.as_ref().unwrap().last_expression().unwrap()
        else {
            panic!("expected a bare return")
        };
        assert!(last.value.is_none());
    }
}
