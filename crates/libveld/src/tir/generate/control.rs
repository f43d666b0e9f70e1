//! Lowering of control flow: return, throw, try/else, match and raw
//! instructions.

use crate::{
    ast::{MatchArmAst, MatchAst, PatternAst, RawInstructionAst, ReturnAst, ThrowAst, TryAst},
    tir::{BlockLocation, CatchEntry, CodeObject, Instruction, Register},
    types::{BlockKind, TypeLocation},
};

use super::Lower;

impl<'a> Lower<'a> {
    pub(crate) fn on_return(&mut self, code: &mut CodeObject, node: &ReturnAst) -> Register {
        let value = match node.value.as_deref() {
            Some(value) => self.on_expression(code, value),
            None => self.nil_register(code, &node.span),
        };

        let method = self
            .state
            .types
            .block(code.block_type)
            .map(|block| block.kind == BlockKind::Method)
            .unwrap_or(false);

        code.push(Instruction::Return {
            method,
            register: Some(value),
            span: node.span.clone(),
        });

        value
    }

    pub(crate) fn on_throw(&mut self, code: &mut CodeObject, node: &ThrowAst) -> Register {
        let value = self.on_expression(code, &node.value);

        code.push(Instruction::Throw {
            register: value,
            span: node.span.clone(),
        });

        value
    }

    /// Lowers `try`/else into three connected regions plus a catch entry.
    ///
    /// The try region runs the expression, copies the value into the shared
    /// result register and skips the handler. The handler either runs
    /// inline (no bound argument) or as a dedicated code object called with
    /// the catch register. A `CatchEntry` covering the try region and
    /// naming the handler is appended to the enclosing code object.
    pub(crate) fn on_try(&mut self, code: &mut CodeObject, node: &TryAst) -> Register {
        let span = node.span.clone();
        let result = code.new_register(self.state.node_type(node.index));

        // The register the runtime deposits a thrown value into.
        let catch = code.new_register(
            self.state
                .throw_type(node.expression.index())
                .unwrap_or(self.state.types.builtins().any),
        );

        let try_start = code.add_connected_block("try");
        let value = self.on_expression(code, &node.expression);

        code.push(Instruction::CopyRegister {
            register: result,
            source: value,
            span: span.clone(),
        });
        code.push(Instruction::SkipNextBlock { span: span.clone() });

        let try_stop = code.current_block();
        let else_block = code.add_connected_block("try_else");

        match node.else_body.as_ref() {
            Some(else_body) if node.else_argument.is_some() => {
                // A handler with a bound argument runs as its own code
                // object, called with the caught value.
                let block_location = self
                    .state
                    .block_type(else_body.index)
                    .unwrap_or(TypeLocation::UNDEFINED);
                let self_type = self
                    .state
                    .types
                    .block(block_location)
                    .map(|block| block.self_type)
                    .unwrap_or(TypeLocation::UNDEFINED);

                let file = code.file.clone();
                let mut child =
                    self.lower_block_code("<else>", block_location, &[], else_body, &file, self_type);

                if let Some(argument) = node.else_argument.as_ref() {
                    child.arguments = vec![argument.name.clone()];
                    child.required_arguments = 1;
                }

                let child_index = code.add_code_object(child);
                let receiver = self.self_register(code, &span);
                let handler = code.new_register(self.state.types.builtins().block);

                code.push(Instruction::SetBlock {
                    register: handler,
                    code_object: child_index,
                    receiver: Some(receiver),
                    span: span.clone(),
                });

                let handled = code.new_register(self.state.node_type(node.index));

                code.push(Instruction::RunBlock {
                    register: handled,
                    block: handler,
                    arguments: vec![catch],
                    span: span.clone(),
                });
                code.push(Instruction::CopyRegister {
                    register: result,
                    source: handled,
                    span: span.clone(),
                });
            }
            Some(else_body) => {
                // Without a bound argument the handler shares the enclosing
                // frame and runs inline.
                let handled = self.lower_body(code, else_body);

                code.push(Instruction::CopyRegister {
                    register: result,
                    source: handled,
                    span: span.clone(),
                });
            }
            None => {
                let handled = self.nil_register(code, &span);

                code.push(Instruction::CopyRegister {
                    register: result,
                    source: handled,
                    span: span.clone(),
                });
            }
        }

        let else_end = code.current_block();
        let tail = code.add_connected_block("try_end");

        // Inline handlers may have grown extra blocks, in which case a
        // skip of exactly one block no longer lands on the tail; patch the
        // skip into an explicit jump.
        if else_end != else_block {
            if let Some(block) = code.block_mut(try_stop) {
                if let Some(Instruction::SkipNextBlock { span }) = block.instructions.last() {
                    let span = span.clone();
                    block.instructions.pop();
                    block.push(Instruction::Goto { block: tail, span });
                }
            }
        }

        code.catch_table.push(CatchEntry {
            start: try_start,
            stop: try_stop,
            jump_to: else_block,
        });

        result
    }

    pub(crate) fn on_raw_instruction(
        &mut self,
        code: &mut CodeObject,
        node: &RawInstructionAst,
    ) -> Register {
        let arguments = node
            .arguments
            .iter()
            .map(|argument| self.on_expression(code, argument))
            .collect::<Vec<_>>();

        let span = node.span.clone();

        match node.name.as_str() {
            "set_object" => {
                let register = code.new_register(self.state.node_type(node.index));

                code.push(Instruction::SetObject {
                    register,
                    prototype: arguments.first().copied(),
                    span,
                });
                register
            }
            "panic" => {
                let message = match arguments.first() {
                    Some(register) => *register,
                    None => self.string_literal(code, "panic", &span),
                };

                code.push(Instruction::Panic { message, span: span.clone() });
                self.nil_register(code, &span)
            }
            "exit" => {
                let status = match arguments.first() {
                    Some(register) => *register,
                    None => self.nil_register(code, &span),
                };

                code.push(Instruction::Exit { status, span: span.clone() });
                self.nil_register(code, &span)
            }
            "process_suspend_current" => {
                let timeout = match arguments.first() {
                    Some(register) => *register,
                    None => self.nil_register(code, &span),
                };

                code.push(Instruction::ProcessSuspendCurrent { timeout, span: span.clone() });
                self.nil_register(code, &span)
            }
            "process_terminate_current" => {
                code.push(Instruction::ProcessTerminateCurrent { span: span.clone() });
                self.nil_register(code, &span)
            }
            _ => self.nil_register(code, &span),
        }
    }

    /// Lowers a match into a chain of test blocks.
    ///
    /// Arm bodies (and guards) run as child code objects taking the
    /// pattern's bindings as arguments, so bindings stay scoped to the arm.
    /// Pattern tests emit equality sends and attribute reads in the
    /// enclosing frame; every successful path copies into one shared
    /// result register and jumps to the common end block.
    pub(crate) fn on_match(&mut self, code: &mut CodeObject, node: &MatchAst) -> Register {
        let span = node.span.clone();
        let scrutinee = self.on_expression(code, &node.scrutinee);
        let result = code.new_register(self.state.node_type(node.index));

        // Created first so every arm can jump to it; laid out early, which
        // the code generator handles by emitting explicit jumps.
        let entry = code.current_block();
        let end_block = code.add_block("match_end");
        code.use_block(entry);

        for arm in node.arms.iter() {
            self.lower_match_arm(code, arm, scrutinee, result, end_block);
        }

        // The fall-through arm: the else body, or nil.
        let handled = match node.else_body.as_ref() {
            Some(else_body) => {
                let block_location = self
                    .state
                    .block_type(else_body.index)
                    .unwrap_or(TypeLocation::UNDEFINED);
                self.run_arm_body(code, "match_else", block_location, else_body, &[], &span)
            }
            None => self.nil_register(code, &span),
        };

        code.push(Instruction::CopyRegister {
            register: result,
            source: handled,
            span: span.clone(),
        });

        let last = code.current_block();
        if let Some(block) = code.block_mut(last) {
            block.next = Some(end_block);
        }

        code.use_block(end_block);
        result
    }

    fn lower_match_arm(
        &mut self,
        code: &mut CodeObject,
        arm: &MatchArmAst,
        scrutinee: Register,
        result: Register,
        end_block: BlockLocation,
    ) {
        let span = arm.span.clone();
        let block_location = self
            .state
            .block_type(arm.body.index)
            .unwrap_or(TypeLocation::UNDEFINED);

        // The block the next arm (or the else body) starts in.
        let entry = code.current_block();
        let next_test = code.add_block("match_test");
        code.use_block(entry);

        let last = arm.patterns.len().saturating_sub(1);

        for (position, pattern) in arm.patterns.iter().enumerate() {
            // A failed alternative of an OR pattern tries the next one;
            // only the last falls through to the next arm.
            let fail_target = if position == last {
                next_test
            } else {
                let current = code.current_block();
                let alternative = code.add_block("match_or");
                code.use_block(current);
                alternative
            };

            let mut bindings = Vec::new();
            self.lower_pattern_test(code, pattern, scrutinee, &mut bindings, fail_target);

            // The guard runs with the same bindings as the body; a false
            // guard behaves like a failed pattern.
            if let Some(guard) = arm.guard.as_deref() {
                let guard_body = crate::ast::BodyAst::new(
                    guard.index(),
                    guard.span().clone(),
                    vec![guard.clone()],
                );
                let passed = self.run_arm_body(
                    code,
                    "match_guard",
                    block_location,
                    &guard_body,
                    &bindings,
                    &span,
                );

                let current = code.current_block();
                let continue_block = code.add_block("match_guarded");
                code.use_block(current);
                code.push(Instruction::GotoIfTrue {
                    block: continue_block,
                    register: passed,
                    span: span.clone(),
                });
                code.push(Instruction::Goto {
                    block: fail_target,
                    span: span.clone(),
                });
                code.use_block(continue_block);
            }

            let handled =
                self.run_arm_body(code, "match_arm", block_location, &arm.body, &bindings, &span);

            code.push(Instruction::CopyRegister {
                register: result,
                source: handled,
                span: span.clone(),
            });
            code.push(Instruction::Goto {
                block: end_block,
                span: span.clone(),
            });

            if position != last {
                code.use_block(fail_target);
            }
        }

        code.use_block(next_test);
    }

    /// Emits the tests for one pattern. Conditions short-circuit to
    /// `next_test`; binding registers accumulate in pattern order.
    fn lower_pattern_test(
        &mut self,
        code: &mut CodeObject,
        pattern: &PatternAst,
        value: Register,
        bindings: &mut Vec<Register>,
        next_test: BlockLocation,
    ) {
        match pattern {
            PatternAst::Int { value: literal, span, .. } => {
                let expected = code.new_register(self.state.types.builtins().integer);

                code.push(Instruction::SetLiteral {
                    register: expected,
                    literal: crate::tir::Literal::Integer(*literal),
                    span: span.clone(),
                });
                self.equality_test(code, value, expected, next_test, span);
            }
            PatternAst::Float { value: literal, span, .. } => {
                let expected = code.new_register(self.state.types.builtins().float);

                code.push(Instruction::SetLiteral {
                    register: expected,
                    literal: crate::tir::Literal::Float(*literal),
                    span: span.clone(),
                });
                self.equality_test(code, value, expected, next_test, span);
            }
            PatternAst::Str { value: literal, span, .. } => {
                let expected = self.string_literal(code, literal, span);
                self.equality_test(code, value, expected, next_test, span);
            }
            PatternAst::Binding { .. } => bindings.push(value),
            PatternAst::Wildcard { .. } => {}
            PatternAst::Constant { name, span, .. } => {
                let receiver = self.self_register(code, span);
                let name_register = self.string_literal(code, name, span);
                let expected = code.new_register(self.state.types.builtins().any);

                code.push(Instruction::GetAttribute {
                    register: expected,
                    receiver,
                    name: name_register,
                    span: span.clone(),
                });
                self.equality_test(code, value, expected, next_test, span);
            }
            PatternAst::Variant { name, fields, span, .. } => {
                // The case name is stored in the value's `name` attribute;
                // fields are read by position.
                let tag_name = self.string_literal(code, "name", span);
                let tag = code.new_register(self.state.types.builtins().string);

                code.push(Instruction::GetAttribute {
                    register: tag,
                    receiver: value,
                    name: tag_name,
                    span: span.clone(),
                });

                let expected = self.string_literal(code, name, span);
                self.equality_test(code, tag, expected, next_test, span);

                for (position, field) in fields.iter().enumerate() {
                    let field_value =
                        self.read_positional_field(code, value, position, field.span());
                    self.lower_pattern_test(code, field, field_value, bindings, next_test);
                }
            }
            PatternAst::ClassShape { fields, span, .. } => {
                for (attribute, field) in fields.iter() {
                    let name_register = self.string_literal(code, attribute, span);
                    let field_value = code.new_register(self.state.types.builtins().any);

                    code.push(Instruction::GetAttribute {
                        register: field_value,
                        receiver: value,
                        name: name_register,
                        span: span.clone(),
                    });
                    self.lower_pattern_test(code, field, field_value, bindings, next_test);
                }
            }
            PatternAst::Tuple { fields, .. } => {
                for (position, field) in fields.iter().enumerate() {
                    let field_value =
                        self.read_positional_field(code, value, position, field.span());
                    self.lower_pattern_test(code, field, field_value, bindings, next_test);
                }
            }
        }
    }

    fn read_positional_field(
        &mut self,
        code: &mut CodeObject,
        value: Register,
        position: usize,
        span: &crate::span::Span,
    ) -> Register {
        let name_register = self.string_literal(code, &position.to_string(), span);
        let register = code.new_register(self.state.types.builtins().any);

        code.push(Instruction::GetAttribute {
            register,
            receiver: value,
            name: name_register,
            span: span.clone(),
        });
        register
    }

    /// Emits `left == right`, continuing on success and jumping to
    /// `next_test` on failure
    fn equality_test(
        &mut self,
        code: &mut CodeObject,
        left: Register,
        right: Register,
        next_test: BlockLocation,
        span: &crate::span::Span,
    ) {
        let name_register = self.string_literal(code, "==", span);
        let method = code.new_register(self.state.types.builtins().block);

        code.push(Instruction::GetAttribute {
            register: method,
            receiver: left,
            name: name_register,
            span: span.clone(),
        });

        let condition = code.new_register(self.state.types.builtins().boolean);

        code.push(Instruction::RunBlockWithReceiver {
            register: condition,
            block: method,
            receiver: left,
            arguments: vec![right],
            span: span.clone(),
        });

        let current = code.current_block();
        let matched = code.add_block("match_cond");
        code.use_block(current);

        code.push(Instruction::GotoIfTrue {
            block: matched,
            register: condition,
            span: span.clone(),
        });
        code.push(Instruction::Goto {
            block: next_test,
            span: span.clone(),
        });
        code.use_block(matched);
    }

    /// Materializes a body as a child code object taking the given binding
    /// registers as arguments, runs it and returns its result register
    fn run_arm_body(
        &mut self,
        code: &mut CodeObject,
        name: &str,
        block_location: TypeLocation,
        body: &crate::ast::BodyAst,
        bindings: &[Register],
        span: &crate::span::Span,
    ) -> Register {
        let self_type = self
            .state
            .types
            .block(block_location)
            .map(|block| block.self_type)
            .unwrap_or(TypeLocation::UNDEFINED);

        let file = code.file.clone();
        let mut child = self.lower_block_code(name, block_location, &[], body, &file, self_type);

        // Bindings arrive positionally; the arm's locals were defined in
        // the same order during type checking.
        child.arguments = child
            .locals
            .borrow()
            .symbols()
            .take(bindings.len())
            .map(|symbol| symbol.name.clone())
            .collect();
        child.required_arguments = bindings.len();

        let child_index = code.add_code_object(child);
        let receiver = self.self_register(code, span);
        let block = code.new_register(self.state.types.builtins().block);

        code.push(Instruction::SetBlock {
            register: block,
            code_object: child_index,
            receiver: Some(receiver),
            span: span.clone(),
        });

        let register = code.new_register(self.state.types.builtins().any);

        code.push(Instruction::RunBlock {
            register,
            block,
            arguments: bindings.to_vec(),
            span: span.clone(),
        });
        register
    }
}
