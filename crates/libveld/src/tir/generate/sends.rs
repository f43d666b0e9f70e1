//! Lowering of message sends.
//!
//! Three shapes:
//!
//! 1. `Array.new(...)` becomes a `SetArray`.
//! 2. Calling a block's `call` becomes a direct `RunBlock`.
//! 3. Everything else looks the message up as an attribute of the receiver
//!    and calls it with the receiver rebound. When the message is possibly
//!    undefined (optional or dynamic receivers), the dispatch is guarded:
//!    a missing block routes to `unknown_message` with the message name and
//!    an array of the original arguments.

use crate::{
    ast::SendAst,
    tir::{CodeObject, Instruction, Register},
};

use super::Lower;

/// The fallback message invoked when a guarded dispatch finds no method
pub static UNKNOWN_MESSAGE: &str = "unknown_message";

impl<'a> Lower<'a> {
    pub(crate) fn on_send(&mut self, code: &mut CodeObject, node: &SendAst) -> Register {
        let result_type = self.state.node_type(node.index);
        let receiver_type = self
            .state
            .receiver_type(node.index)
            .unwrap_or(self.state.types.builtins().any);

        // Array.new builds the array inline.
        if node.name == "new" && self.is_array_constant(node) {
            let values = node
                .arguments
                .iter()
                .map(|argument| self.on_expression(code, &argument.value))
                .collect::<Vec<_>>();

            let register = code.new_register(result_type);

            code.push(Instruction::SetArray {
                register,
                values,
                span: node.span.clone(),
            });
            return register;
        }

        let receiver = match node.receiver.as_deref() {
            Some(expression) => self.on_expression(code, expression),
            None => {
                // An implicit send resolving to a module method goes
                // through the global directly.
                let module_type = self
                    .state
                    .module(&self.module)
                    .map(|module| module.module_type);

                if Some(receiver_type) == module_type {
                    let global = self
                        .state
                        .module(&self.module)
                        .and_then(|module| module.globals.borrow().lookup(&node.name));

                    if let Some(global) = global {
                        let block = code.new_register(global.value_type);

                        code.push(Instruction::GetGlobal {
                            register: block,
                            symbol: global.index,
                            span: node.span.clone(),
                        });

                        let arguments = self.argument_registers(code, node);
                        let register = code.new_register(result_type);

                        code.push(Instruction::RunBlock {
                            register,
                            block,
                            arguments,
                            span: node.span.clone(),
                        });
                        return register;
                    }
                }

                self.self_register(code, &node.span)
            }
        };

        // Calling a block value directly.
        if self.state.types.block(receiver_type).is_some() && node.name == "call" {
            let arguments = self.argument_registers(code, node);
            let register = code.new_register(result_type);

            code.push(Instruction::RunBlock {
                register,
                block: receiver,
                arguments,
                span: node.span.clone(),
            });
            return register;
        }

        let arguments = self.argument_registers(code, node);
        let name_register = self.string_literal(code, &node.name, &node.span);
        let block = code.new_register(self.state.types.builtins().block);

        code.push(Instruction::GetAttribute {
            register: block,
            receiver,
            name: name_register,
            span: node.span.clone(),
        });

        let register = code.new_register(result_type);

        if self.state.possibly_undefined(node.index) {
            self.guarded_dispatch(code, node, receiver, block, register, arguments);
        } else {
            code.push(Instruction::RunBlockWithReceiver {
                register,
                block,
                receiver,
                arguments,
                span: node.span.clone(),
            });
        }

        register
    }

    /// Emits the guarded form of a dispatch: when the looked-up block is
    /// present it is called normally, otherwise `unknown_message` receives
    /// the message name and the packed arguments. Both branches write the
    /// same result register.
    fn guarded_dispatch(
        &mut self,
        code: &mut CodeObject,
        node: &SendAst,
        receiver: Register,
        block: Register,
        result: Register,
        arguments: Vec<Register>,
    ) {
        let span = node.span.clone();
        let before = code.current_block();
        let unknown_block = code.add_block("send_unknown");
        let call_block = code.add_block("send_call");
        let after_block = code.add_block("send_after");

        if let Some(found) = code.block_mut(before) {
            found.next = Some(unknown_block);
        }

        code.use_block(before);
        code.push(Instruction::GotoIfTrue {
            block: call_block,
            register: block,
            span: span.clone(),
        });

        code.use_block(unknown_block);
        let unknown_name = self.string_literal(code, UNKNOWN_MESSAGE, &span);
        let unknown = code.new_register(self.state.types.builtins().block);

        code.push(Instruction::GetAttribute {
            register: unknown,
            receiver,
            name: unknown_name,
            span: span.clone(),
        });

        let message_name = self.string_literal(code, &node.name, &span);
        let packed_type = {
            let string = self.state.types.builtins().string;
            self.state.types.new_array_of_type(string)
        };
        let packed = code.new_register(packed_type);

        code.push(Instruction::SetArray {
            register: packed,
            values: arguments.clone(),
            span: span.clone(),
        });
        code.push(Instruction::RunBlockWithReceiver {
            register: result,
            block: unknown,
            receiver,
            arguments: vec![message_name, packed],
            span: span.clone(),
        });
        code.push(Instruction::Goto {
            block: after_block,
            span: span.clone(),
        });

        code.use_block(call_block);
        code.push(Instruction::RunBlockWithReceiver {
            register: result,
            block,
            receiver,
            arguments,
            span,
        });

        if let Some(found) = code.block_mut(call_block) {
            found.next = Some(after_block);
        }

        code.use_block(after_block);
    }

    /// Evaluates the arguments in written order and returns them by
    /// declared position. Keyword arguments that survived the ordering
    /// optimization are placed by their declared index; skipped optional
    /// slots before a filled one are padded with nil.
    pub(crate) fn argument_registers(
        &mut self,
        code: &mut CodeObject,
        node: &SendAst,
    ) -> Vec<Register> {
        let method = self
            .state
            .send_method(node.index)
            .and_then(|method| self.state.types.block(method))
            .map(|block| block.clone());

        let mut placed: Vec<Option<Register>> = Vec::new();
        let mut position = 0;

        for argument in node.arguments.iter() {
            let register = self.on_expression(code, &argument.value);

            let index = match argument.keyword.as_deref() {
                Some(keyword) => method
                    .as_ref()
                    .and_then(|block| block.keyword_argument_index(keyword))
                    .unwrap_or(position),
                None => position,
            };

            if placed.len() <= index {
                placed.resize(index + 1, None);
            }

            placed[index] = Some(register);

            if argument.keyword.is_none() {
                position += 1;
            }
        }

        placed
            .into_iter()
            .map(|slot| match slot {
                Some(register) => register,
                None => self.nil_register(code, &node.span),
            })
            .collect()
    }

    fn is_array_constant(&self, node: &SendAst) -> bool {
        self.state
            .receiver_type(node.index)
            .and_then(|receiver| self.state.types.object(receiver))
            .map(|object| object.name == "Array" && object.type_parameter_instances.is_empty())
            .unwrap_or(false)
    }
}
