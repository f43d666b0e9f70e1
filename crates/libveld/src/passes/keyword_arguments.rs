//! Keyword argument optimization.
//!
//! A call passing keyword arguments in the same order the method declares
//! them is rewritten into plain positional passing, so lowering emits no
//! reordering at all. Out-of-order keywords are left alone; the TIR
//! generator places those by declared index instead.

use crate::{
    ast::{BodyAst, ExpressionAst, SendAst},
    state::State,
};

pub fn run(state: &mut State, body: &mut BodyAst) {
    for expression in body.expressions.iter_mut() {
        on_expression(state, expression);
    }
}

fn on_expression(state: &State, expression: &mut ExpressionAst) {
    match expression {
        ExpressionAst::Send(send) => {
            if let Some(receiver) = send.receiver.as_deref_mut() {
                on_expression(state, receiver);
            }

            for argument in send.arguments.iter_mut() {
                on_expression(state, &mut argument.value);
            }

            optimize(state, send);
        }
        ExpressionAst::Method(node) => {
            if let Some(body) = node.body.as_mut() {
                for expression in body.expressions.iter_mut() {
                    on_expression(state, expression);
                }
            }
        }
        ExpressionAst::Block(node) => {
            for expression in node.body.expressions.iter_mut() {
                on_expression(state, expression);
            }
        }
        ExpressionAst::Object(node) => {
            for expression in node.body.expressions.iter_mut() {
                on_expression(state, expression);
            }
        }
        ExpressionAst::Trait(node) => {
            for expression in node.body.expressions.iter_mut() {
                on_expression(state, expression);
            }
        }
        ExpressionAst::TraitImplementation(node) => {
            for expression in node.body.expressions.iter_mut() {
                on_expression(state, expression);
            }
        }
        ExpressionAst::ReopenObject(node) => {
            for expression in node.body.expressions.iter_mut() {
                on_expression(state, expression);
            }
        }
        ExpressionAst::DefineVariable(node) => on_expression(state, &mut node.value),
        ExpressionAst::Reassign(node) => on_expression(state, &mut node.value),
        ExpressionAst::Return(node) => {
            if let Some(value) = node.value.as_deref_mut() {
                on_expression(state, value);
            }
        }
        ExpressionAst::Throw(node) => on_expression(state, &mut node.value),
        ExpressionAst::Try(node) => {
            on_expression(state, &mut node.expression);

            if let Some(else_body) = node.else_body.as_mut() {
                for expression in else_body.expressions.iter_mut() {
                    on_expression(state, expression);
                }
            }
        }
        ExpressionAst::TypeCast(node) => on_expression(state, &mut node.value),
        ExpressionAst::RawInstruction(node) => {
            for argument in node.arguments.iter_mut() {
                on_expression(state, argument);
            }
        }
        ExpressionAst::Match(node) => {
            on_expression(state, &mut node.scrutinee);

            for arm in node.arms.iter_mut() {
                if let Some(guard) = arm.guard.as_deref_mut() {
                    on_expression(state, guard);
                }

                for expression in arm.body.expressions.iter_mut() {
                    on_expression(state, expression);
                }
            }

            if let Some(else_body) = node.else_body.as_mut() {
                for expression in else_body.expressions.iter_mut() {
                    on_expression(state, expression);
                }
            }
        }
        _ => {}
    }
}

fn optimize(state: &State, send: &mut SendAst) {
    if send.arguments.iter().all(|argument| argument.keyword.is_none()) {
        return;
    }

    let Some(method) = state.send_method(send.index) else { return };
    let Some(block) = state.types.block(method) else { return };

    let prefix = send
        .arguments
        .iter()
        .take_while(|argument| argument.keyword.is_none())
        .count();

    let ordered = send.arguments[prefix..].iter().enumerate().all(|(offset, argument)| {
        match argument.keyword.as_deref() {
            Some(keyword) => block.keyword_argument_index(keyword) == Some(prefix + offset),
            None => false,
        }
    });

    if ordered {
        for argument in send.arguments.iter_mut() {
            argument.keyword = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::SendArgumentAst,
        config::Config,
        file::SourceFile,
        span::Span,
        types::{BlockArgument, BlockKind, BlockType, TypeKind, TypeLocation},
    };

    fn span() -> Span {
        Span::synthesized(SourceFile::new(vec!["test".into()], "".to_string()))
    }

    fn send_with_keywords(state: &mut State, keywords: &[Option<&str>]) -> SendAst {
        let arguments = keywords
            .iter()
            .map(|keyword| SendArgumentAst {
                index: state.ast_ids.next(),
                span: span(),
                keyword: keyword.map(|keyword| keyword.to_string()),
                value: ExpressionAst::Int(crate::ast::IntLiteralAst {
                    index: state.ast_ids.next(),
                    span: span(),
                    value: 0,
                }),
            })
            .collect();

        SendAst {
            index: state.ast_ids.next(),
            span: span(),
            receiver: None,
            name: "configure".to_string(),
            type_arguments: Vec::new(),
            arguments,
        }
    }

    fn method_with_arguments(state: &mut State, names: &[&str]) -> TypeLocation {
        let mut block =
            BlockType::new(BlockKind::Method, "configure".to_string(), TypeLocation(0));

        for name in names {
            block
                .arguments
                .push(BlockArgument::new(name.to_string(), TypeLocation(0)));
        }

        state.types.alloc(TypeKind::Block(block))
    }

    #[test]
    fn matching_order_strips_keywords() {
        let mut state = State::new(Config::default());
        let method = method_with_arguments(&mut state, &["a", "b", "c"]);
        let mut send = send_with_keywords(&mut state, &[None, Some("b"), Some("c")]);

        state.set_send_method(send.index, method);
        optimize(&state, &mut send);

        assert!(send.arguments.iter().all(|argument| argument.keyword.is_none()));
    }

    #[test]
    fn reordered_keywords_are_kept() {
        let mut state = State::new(Config::default());
        let method = method_with_arguments(&mut state, &["a", "b", "c"]);
        let mut send = send_with_keywords(&mut state, &[None, Some("c"), Some("b")]);

        state.set_send_method(send.index, method);
        optimize(&state, &mut send);

        assert!(send.arguments.iter().any(|argument| argument.keyword.is_some()));
    }
}
