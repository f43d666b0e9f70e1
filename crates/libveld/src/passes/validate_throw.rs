//! Throw and try discipline.
//!
//! Enforced per block, walking the block-nesting stack:
//!
//! - calling something whose type declares a throw type requires a
//!   surrounding `try`
//! - `throw` needs an enclosing block that declares (or inferred) a throw
//!   type; at module top level it is always an error
//! - a thrown value must be compatible with every enclosing block's
//!   declared throw type up to the nearest `try`; climbing stops at the
//!   first mismatch
//! - a block explicitly declared to throw must throw on some path
//! - a `try` at module top level must have an else handler; a `try` over
//!   an expression that cannot throw is merely redundant (a warning)

use crate::{
    ast::{BodyAst, ExpressionAst},
    error::CompileError,
    module::QualifiedName,
    span::Span,
    state::State,
    types::TypeLocation,
};

struct BlockFrame {
    declared_throw: Option<TypeLocation>,
    /// True when the throw type was written by the programmer rather than
    /// inferred, which is what obligates a throw on some path
    explicit: bool,
    throws: bool,
    span: Span,
}

pub fn run(state: &mut State, _name: &QualifiedName, body: &BodyAst) {
    let mut pass = ValidateThrow {
        state,
        frames: vec![BlockFrame {
            declared_throw: None,
            explicit: false,
            throws: false,
            span: body.span.clone(),
        }],
        try_depth: 0,
    };

    pass.on_body(body);
}

struct ValidateThrow<'a> {
    state: &'a mut State,
    frames: Vec<BlockFrame>,
    try_depth: usize,
}

impl<'a> ValidateThrow<'a> {
    fn at_module_level(&self) -> bool {
        self.frames.len() == 1
    }

    fn on_body(&mut self, body: &BodyAst) {
        for expression in body.expressions.iter() {
            self.on_expression(expression);
        }
    }

    fn on_expression(&mut self, expression: &ExpressionAst) {
        match expression {
            ExpressionAst::Send(send) => {
                if let Some(receiver) = send.receiver.as_deref() {
                    self.on_expression(receiver);
                }

                for argument in send.arguments.iter() {
                    self.on_expression(&argument.value);
                }

                self.check_throwing_call(send.index, &send.name, &send.span);
            }
            ExpressionAst::Identifier(node) => {
                self.check_throwing_call(node.index, &node.name, &node.span);
            }
            ExpressionAst::Try(node) => self.on_try(node),
            ExpressionAst::Throw(node) => self.on_throw(node),
            ExpressionAst::Block(node) => {
                self.push_frame(node.index, node.span.clone());
                self.on_body(&node.body);
                self.pop_frame();
            }
            ExpressionAst::Method(node) => {
                if let Some(body) = node.body.as_ref() {
                    self.push_frame(node.index, node.span.clone());
                    self.on_body(body);
                    self.pop_frame();
                }
            }
            ExpressionAst::Object(node) => self.on_body(&node.body),
            ExpressionAst::Trait(node) => self.on_body(&node.body),
            ExpressionAst::TraitImplementation(node) => self.on_body(&node.body),
            ExpressionAst::ReopenObject(node) => self.on_body(&node.body),
            ExpressionAst::DefineVariable(node) => self.on_expression(&node.value),
            ExpressionAst::Reassign(node) => self.on_expression(&node.value),
            ExpressionAst::Return(node) => {
                if let Some(value) = node.value.as_deref() {
                    self.on_expression(value);
                }
            }
            ExpressionAst::TypeCast(node) => self.on_expression(&node.value),
            ExpressionAst::RawInstruction(node) => {
                for argument in node.arguments.iter() {
                    self.on_expression(argument);
                }
            }
            ExpressionAst::Match(node) => {
                self.on_expression(&node.scrutinee);

                for arm in node.arms.iter() {
                    if let Some(guard) = arm.guard.as_deref() {
                        self.on_expression(guard);
                    }

                    self.on_body(&arm.body);
                }

                if let Some(else_body) = node.else_body.as_ref() {
                    self.on_body(else_body);
                }
            }
            _ => {}
        }
    }

    fn push_frame(&mut self, index: crate::ast::AstIndex, span: Span) {
        let (declared_throw, explicit) = self
            .state
            .block_type(index)
            .and_then(|location| self.state.types.block(location))
            .map(|block| (block.throw_type, !block.infer_throw_type))
            .unwrap_or((None, false));

        self.frames.push(BlockFrame {
            declared_throw,
            explicit,
            throws: false,
            span,
        });
    }

    fn pop_frame(&mut self) {
        let frame = self.frames.pop().expect("push and pop are balanced");

        // Declared to throw, but no throw on any path.
        if frame.explicit && !frame.throws {
            if let Some(declared) = frame.declared_throw {
                let declared_name = self.state.types.name_of(declared);
                self.state
                    .record(CompileError::missing_throw(declared_name, &frame.span));
            }
        }
    }

    fn check_throwing_call(&mut self, index: crate::ast::AstIndex, name: &str, span: &Span) {
        if self.state.throw_type(index).is_some() && self.try_depth == 0 {
            self.state
                .record(CompileError::missing_try(name.to_string(), span));
        }
    }

    fn on_try(&mut self, node: &crate::ast::TryAst) {
        if self.at_module_level() && node.empty_else() {
            self.state
                .record(CompileError::top_level_try_missing_else(&node.span));
        }

        self.try_depth += 1;
        self.on_expression(&node.expression);
        self.try_depth -= 1;

        let caught = self.state.throw_type(node.expression.index());

        if caught.is_none() {
            self.state.record(CompileError::redundant_try(&node.span));
        }

        if let Some(caught) = caught {
            if !node.has_else() {
                // Without a handler the throw propagates to the enclosing
                // block, which must be able to declare it.
                let frame = self.frames.last_mut().expect("at least the module frame");
                frame.throws = true;

                if let Some(declared) = frame.declared_throw {
                    if !self.state.types.type_compatible(caught, declared) {
                        let expected = self.state.types.name_of(declared);
                        let found = self.state.types.name_of(caught);
                        self.state.record(CompileError::type_mismatch(
                            expected,
                            found,
                            &node.span,
                        ));
                    }
                }
            }
        }

        if let Some(else_body) = node.else_body.as_ref() {
            self.on_body(else_body);
        }
    }

    fn on_throw(&mut self, node: &crate::ast::ThrowAst) {
        self.on_expression(&node.value);

        if self.at_module_level() {
            self.state
                .record(CompileError::throw_at_top_level(&node.span));
            return;
        }

        // A throw inside a try is caught locally; nothing propagates.
        if self.try_depth > 0 {
            return;
        }

        let thrown = self.state.node_type(node.value.index());

        // Climb the block stack, recording the thrown type in each block,
        // stopping at the first declared mismatch.
        let mut reported = false;

        for frame in self.frames.iter_mut().skip(1).rev() {
            frame.throws = true;

            match frame.declared_throw {
                Some(declared) => {
                    if !self.state.types.type_compatible(thrown, declared) {
                        let expected = self.state.types.name_of(declared);
                        let found = self.state.types.name_of(thrown);
                        self.state.record(CompileError::type_mismatch(
                            expected,
                            found,
                            &node.span,
                        ));
                    }

                    reported = true;
                    break;
                }
                None => continue,
            }
        }

        if !reported {
            // No enclosing block declares or inferred a throw type.
            self.state
                .record(CompileError::throw_without_throw_defined(&node.span));
        }
    }
}
