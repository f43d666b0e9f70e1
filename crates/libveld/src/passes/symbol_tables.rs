//! Symbol table setup.
//!
//! Allocates the locals table of every code-producing construct with the
//! parent linkage the capture model relies on:
//!
//! - the module body is the root table
//! - method and declaration bodies start fresh tables (methods cannot read
//!   module or object locals)
//! - closures and lambdas chain to the enclosing table, so a lookup depth
//!   greater than zero marks a capture
//! - a try-else body with a bound argument chains to the enclosing table;
//!   without one it shares the enclosing table outright
//! - match arm bodies chain to the enclosing table

use crate::{
    ast::{BodyAst, ExpressionAst},
    state::State,
    symbol::{SymbolTable, SymbolTableRef},
};

pub fn run(state: &mut State, body: &BodyAst) {
    let root = SymbolTable::new_ref();
    state.set_body_locals(body.index, root.clone());

    for expression in body.expressions.iter() {
        on_expression(state, expression, &root);
    }
}

fn on_body(state: &mut State, body: &BodyAst, locals: SymbolTableRef) {
    state.set_body_locals(body.index, locals.clone());

    for expression in body.expressions.iter() {
        on_expression(state, expression, &locals);
    }
}

fn fresh_body(state: &mut State, body: &BodyAst) {
    on_body(state, body, SymbolTable::new_ref());
}

fn on_expression(state: &mut State, expression: &ExpressionAst, enclosing: &SymbolTableRef) {
    match expression {
        ExpressionAst::Method(method) => {
            for argument in method.arguments.iter() {
                if let Some(default) = argument.default.as_deref() {
                    on_expression(state, default, enclosing);
                }
            }

            if let Some(body) = method.body.as_ref() {
                fresh_body(state, body);
            }
        }
        ExpressionAst::Block(block) => {
            let locals = SymbolTable::with_parent(enclosing.clone());

            for argument in block.arguments.iter() {
                if let Some(default) = argument.default.as_deref() {
                    on_expression(state, default, &locals);
                }
            }

            on_body(state, &block.body, locals);
        }
        ExpressionAst::Object(object) => fresh_body(state, &object.body),
        ExpressionAst::Trait(trait_node) => fresh_body(state, &trait_node.body),
        ExpressionAst::TraitImplementation(implementation) => {
            fresh_body(state, &implementation.body)
        }
        ExpressionAst::ReopenObject(reopen) => fresh_body(state, &reopen.body),
        ExpressionAst::Try(try_node) => {
            on_expression(state, &try_node.expression, enclosing);

            if let Some(else_body) = try_node.else_body.as_ref() {
                let locals = if try_node.else_argument.is_some() {
                    SymbolTable::with_parent(enclosing.clone())
                } else {
                    enclosing.clone()
                };

                on_body(state, else_body, locals);
            }
        }
        ExpressionAst::Match(match_node) => {
            on_expression(state, &match_node.scrutinee, enclosing);

            for arm in match_node.arms.iter() {
                let locals = SymbolTable::with_parent(enclosing.clone());

                if let Some(guard) = arm.guard.as_deref() {
                    // Guards lower as their own code objects sharing the
                    // arm's locals.
                    state.set_body_locals(guard.index(), locals.clone());
                    on_expression(state, guard, &locals);
                }

                on_body(state, &arm.body, locals);
            }

            if let Some(else_body) = match_node.else_body.as_ref() {
                let locals = SymbolTable::with_parent(enclosing.clone());
                on_body(state, else_body, locals);
            }
        }
        ExpressionAst::DefineVariable(define) => on_expression(state, &define.value, enclosing),
        ExpressionAst::Reassign(reassign) => on_expression(state, &reassign.value, enclosing),
        ExpressionAst::Send(send) => {
            if let Some(receiver) = send.receiver.as_deref() {
                on_expression(state, receiver, enclosing);
            }

            for argument in send.arguments.iter() {
                on_expression(state, &argument.value, enclosing);
            }
        }
        ExpressionAst::Return(node) => {
            if let Some(value) = node.value.as_deref() {
                on_expression(state, value, enclosing);
            }
        }
        ExpressionAst::Throw(node) => on_expression(state, &node.value, enclosing),
        ExpressionAst::TypeCast(cast) => on_expression(state, &cast.value, enclosing),
        ExpressionAst::RawInstruction(raw) => {
            for argument in raw.arguments.iter() {
                on_expression(state, argument, enclosing);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::{
        ast::{BlockAst, BlockLiteralKind, MethodAst},
        config::Config,
        file::SourceFile,
        span::Span,
        types::TypeLocation,
    };

    fn span() -> Span {
        Span::synthesized(SourceFile::new(vec!["test".into()], "".to_string()))
    }

    #[test]
    fn closures_chain_to_the_enclosing_table() {
        let mut state = State::new(Config::default());

        let closure_body = BodyAst::new(state.ast_ids.next(), span(), Vec::new());
        let closure_index = closure_body.index;

        let body = BodyAst::new(
            state.ast_ids.next(),
            span(),
            vec![ExpressionAst::Block(Box::new(BlockAst {
                index: state.ast_ids.next(),
                span: span(),
                kind: BlockLiteralKind::Closure,
                arguments: Vec::new(),
                return_annotation: None,
                throw_annotation: None,
                body: closure_body,
            }))],
        );

        run(&mut state, &body);

        let root = state.body_locals(body.index).unwrap();
        root.borrow_mut()
            .define("captured".to_string(), TypeLocation(1), false, None)
            .unwrap();

        let closure_locals = state.body_locals(closure_index).unwrap();
        let closure_locals = closure_locals.borrow();
        let (depth, symbol) = closure_locals.lookup_with_parent("captured").unwrap();

        assert_eq!(depth, 1);
        assert_eq!(symbol.name, "captured");
    }

    #[test]
    fn methods_start_fresh_tables() {
        let mut state = State::new(Config::default());

        let method_body = BodyAst::new(state.ast_ids.next(), span(), Vec::new());
        let method_index = method_body.index;

        let body = BodyAst::new(
            state.ast_ids.next(),
            span(),
            vec![ExpressionAst::Method(Box::new(MethodAst {
                index: state.ast_ids.next(),
                span: span(),
                name: "test".to_string(),
                type_parameters: Vec::new(),
                arguments: Vec::new(),
                return_annotation: None,
                throw_annotation: None,
                method_bounds: Vec::new(),
                body: Some(method_body),
            }))],
        );

        run(&mut state, &body);

        let root = state.body_locals(body.index).unwrap();
        root.borrow_mut()
            .define("module_local".to_string(), TypeLocation(1), false, None)
            .unwrap();

        let method_locals = state.body_locals(method_index).unwrap();
        assert!(method_locals
            .borrow()
            .lookup_with_parent("module_local")
            .is_none());
        assert!(!Rc::ptr_eq(&root, &method_locals));
    }

    #[test]
    fn else_bodies_without_arguments_share_the_enclosing_table() {
        let mut state = State::new(Config::default());

        let else_body = BodyAst::new(state.ast_ids.next(), span(), Vec::new());
        let else_index = else_body.index;

        let body = BodyAst::new(
            state.ast_ids.next(),
            span(),
            vec![ExpressionAst::Try(Box::new(crate::ast::TryAst {
                index: state.ast_ids.next(),
                span: span(),
                expression: Box::new(ExpressionAst::Int(crate::ast::IntLiteralAst {
                    index: state.ast_ids.next(),
                    span: span(),
                    value: 1,
                })),
                else_argument: None,
                else_body: Some(else_body),
            }))],
        );

        run(&mut state, &body);

        let root = state.body_locals(body.index).unwrap();
        let else_locals = state.body_locals(else_index).unwrap();
        assert!(Rc::ptr_eq(&root, &else_locals));
    }
}
