//! Declaration hoisting.
//!
//! Moves type declarations (objects, traits, implementations, reopenings)
//! to the top of each body, followed by methods, followed by everything
//! else, so forward references resolve without a separate pre-declaration
//! phase. The sort is stable, which makes running the pass twice equal to
//! running it once.

use crate::ast::{BodyAst, ExpressionAst};

pub fn run(body: &mut BodyAst) {
    hoist(body);
}

fn hoist(body: &mut BodyAst) {
    body.expressions.sort_by_key(group);

    for expression in body.expressions.iter_mut() {
        match expression {
            ExpressionAst::Object(object) => hoist(&mut object.body),
            ExpressionAst::Trait(trait_node) => hoist(&mut trait_node.body),
            ExpressionAst::TraitImplementation(implementation) => hoist(&mut implementation.body),
            ExpressionAst::ReopenObject(reopen) => hoist(&mut reopen.body),
            _ => {}
        }
    }
}

fn group(expression: &ExpressionAst) -> u8 {
    if expression.is_type_declaration() {
        0
    } else if expression.is_method() {
        1
    } else {
        2
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        ast::{AstIds, IntLiteralAst, MethodAst, ObjectAst},
        file::SourceFile,
        span::Span,
    };

    fn span() -> Span {
        Span::synthesized(SourceFile::new(vec!["test".into()], "".to_string()))
    }

    fn sample_body(ids: &AstIds) -> BodyAst {
        BodyAst::new(
            ids.next(),
            span(),
            vec![
                ExpressionAst::Int(IntLiteralAst { index: ids.next(), span: span(), value: 1 }),
                ExpressionAst::Method(Box::new(MethodAst {
                    index: ids.next(),
                    span: span(),
                    name: "helper".to_string(),
                    type_parameters: Vec::new(),
                    arguments: Vec::new(),
                    return_annotation: None,
                    throw_annotation: None,
                    method_bounds: Vec::new(),
                    body: Some(BodyAst::new(ids.next(), span(), Vec::new())),
                })),
                ExpressionAst::Object(Box::new(ObjectAst {
                    index: ids.next(),
                    span: span(),
                    name: "Point".to_string(),
                    type_parameters: Vec::new(),
                    body: BodyAst::new(ids.next(), span(), Vec::new()),
                })),
            ],
        )
    }

    fn shape(body: &BodyAst) -> Vec<&'static str> {
        body.expressions
            .iter()
            .map(|expression| match expression {
                ExpressionAst::Object(_) => "object",
                ExpressionAst::Method(_) => "method",
                _ => "other",
            })
            .collect()
    }

    #[test]
    fn types_come_first_then_methods() {
        let ids = AstIds::new();
        let mut body = sample_body(&ids);

        run(&mut body);

        assert_eq!(shape(&body), vec!["object", "method", "other"]);
    }

    #[test]
    fn hoisting_twice_equals_hoisting_once() {
        let ids = AstIds::new();
        let mut once = sample_body(&ids);
        run(&mut once);

        let mut twice_shape = shape(&once);
        run(&mut once);

        assert_eq!(shape(&once), twice_shape.drain(..).collect::<Vec<_>>());
    }
}
