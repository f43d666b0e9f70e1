//! Lowering of declarations: methods, block literals, objects, traits,
//! trait implementations and reopenings.

use crate::{
    ast::{
        BlockAst, MethodAst, ObjectAst, ReopenObjectAst, TraitAst, TraitImplementationAst,
        TypeNameAst,
    },
    tir::{CodeObject, Instruction, Register},
    types::{BlockKind, TypeLocation},
};

use super::Lower;

impl<'a> Lower<'a> {
    /// Defines a method: builds its code object, materializes it as a
    /// block and attaches it to `self` (and the module globals at module
    /// scope)
    pub(crate) fn on_method(&mut self, code: &mut CodeObject, node: &MethodAst) -> Register {
        let Some(block_location) = self.state.block_type(node.index) else {
            return self.nil_register(code, &node.span);
        };

        // Required trait methods have no body and produce no code.
        let Some(body) = node.body.as_ref() else {
            return self.nil_register(code, &node.span);
        };

        let self_type = self
            .state
            .types
            .block(block_location)
            .map(|block| block.self_type)
            .unwrap_or(TypeLocation::UNDEFINED);

        let file = code.file.clone();
        let child = self.lower_block_code(
            &node.name,
            block_location,
            &node.arguments,
            body,
            &file,
            self_type,
        );
        let child_index = code.add_code_object(child);

        let block = code.new_register(block_location);

        code.push(Instruction::SetBlock {
            register: block,
            code_object: child_index,
            receiver: None,
            span: node.span.clone(),
        });

        let receiver = self.self_register(code, &node.span);
        let name = self.string_literal(code, &node.name, &node.span);

        code.push(Instruction::SetAttribute {
            receiver,
            name,
            value: block,
            span: node.span.clone(),
        });

        self.set_matching_global(code, &node.name, block_location, block, &node.span);
        block
    }

    /// Materializes a closure or lambda literal
    pub(crate) fn on_block_literal(
        &mut self,
        code: &mut CodeObject,
        node: &BlockAst,
    ) -> Register {
        let Some(block_location) = self.state.block_type(node.index) else {
            return self.nil_register(code, &node.span);
        };

        let (kind, self_type) = self
            .state
            .types
            .block(block_location)
            .map(|block| (block.kind, block.self_type))
            .unwrap_or((BlockKind::Closure, TypeLocation::UNDEFINED));

        let name = match kind {
            BlockKind::Lambda => "<lambda>",
            _ => "<closure>",
        };

        let file = code.file.clone();
        let child = self.lower_block_code(
            name,
            block_location,
            &node.arguments,
            &node.body,
            &file,
            self_type,
        );
        let child_index = code.add_code_object(child);

        // A closure binds the enclosing receiver; a lambda runs with the
        // module as its receiver.
        let receiver = match kind {
            BlockKind::Lambda => None,
            _ => Some(self.self_register(code, &node.span)),
        };

        let register = code.new_register(block_location);

        code.push(Instruction::SetBlock {
            register,
            code_object: child_index,
            receiver,
            span: node.span.clone(),
        });
        register
    }

    /// Allocates an object prototype, stores it as a constant and runs the
    /// declaration body with the object as receiver
    pub(crate) fn on_object(&mut self, code: &mut CodeObject, node: &ObjectAst) -> Register {
        let object_type = self.state.node_type(node.index);
        let object = code.new_register(object_type);

        code.push(Instruction::SetObject {
            register: object,
            prototype: None,
            span: node.span.clone(),
        });

        self.store_constant(code, &node.name, object, object_type, &node.span);
        self.run_declaration_body(code, &node.name, &node.body, object, object_type, &node.span);
        object
    }

    /// Traits are objects at runtime; the declaration lowers the same way
    pub(crate) fn on_trait(&mut self, code: &mut CodeObject, node: &TraitAst) -> Register {
        let trait_type = self.state.node_type(node.index);
        let object = code.new_register(trait_type);

        code.push(Instruction::SetObject {
            register: object,
            prototype: None,
            span: node.span.clone(),
        });

        self.store_constant(code, &node.name, object, trait_type, &node.span);
        self.run_declaration_body(code, &node.name, &node.body, object, trait_type, &node.span);
        object
    }

    /// Copies the trait's blocks onto the object and runs the impl body
    /// over it
    pub(crate) fn on_trait_implementation(
        &mut self,
        code: &mut CodeObject,
        node: &TraitImplementationAst,
    ) -> Register {
        let Some((object_type, trait_type)) = self.state.implementation_target(node.index) else {
            return self.nil_register(code, &node.span);
        };

        let object = self.lower_constant_reference(code, &node.object_name, object_type);
        let trait_register = self.lower_constant_reference(code, &node.trait_name, trait_type);

        code.push(Instruction::CopyBlocks {
            to: object,
            from: trait_register,
            span: node.span.clone(),
        });

        let name = self
            .state
            .types
            .object(object_type)
            .map(|found| found.name.clone())
            .unwrap_or_default();

        self.run_declaration_body(code, &name, &node.body, object, object_type, &node.span);
        self.nil_register(code, &node.span)
    }

    /// Runs a reopening body over the existing object
    pub(crate) fn on_reopen_object(
        &mut self,
        code: &mut CodeObject,
        node: &ReopenObjectAst,
    ) -> Register {
        let object_type = self.state.node_type(node.index);

        if self.state.types.is_error(object_type) {
            return self.nil_register(code, &node.span);
        }

        let object = self.lower_constant_reference(code, &node.name, object_type);
        let name = self
            .state
            .types
            .object(object_type)
            .map(|found| found.name.clone())
            .unwrap_or_default();

        self.run_declaration_body(code, &name, &node.body, object, object_type, &node.span);
        object
    }

    /// Stores a freshly created type object as an attribute of `self`,
    /// plus a module global when one was registered for it
    fn store_constant(
        &mut self,
        code: &mut CodeObject,
        name: &str,
        value: Register,
        value_type: TypeLocation,
        span: &crate::span::Span,
    ) {
        let receiver = self.self_register(code, span);
        let name_register = self.string_literal(code, name, span);

        code.push(Instruction::SetAttribute {
            receiver,
            name: name_register,
            value,
            span: span.clone(),
        });

        self.set_matching_global(code, name, value_type, value, span);
    }

    /// Emits a SetGlobal when the module registered a global of this name
    /// with exactly this type (which is how module-scope declarations are
    /// distinguished from nested ones)
    fn set_matching_global(
        &mut self,
        code: &mut CodeObject,
        name: &str,
        value_type: TypeLocation,
        value: Register,
        span: &crate::span::Span,
    ) {
        let global = self
            .state
            .module(&self.module)
            .and_then(|module| module.globals.borrow().lookup(name))
            .filter(|symbol| symbol.value_type == value_type);

        if let Some(global) = global {
            code.push(Instruction::SetGlobal {
                symbol: global.index,
                value,
                span: span.clone(),
            });
        }
    }

    /// Materializes a declaration body as a block and runs it with the
    /// declared object as receiver
    fn run_declaration_body(
        &mut self,
        code: &mut CodeObject,
        name: &str,
        body: &crate::ast::BodyAst,
        receiver: Register,
        self_type: TypeLocation,
        span: &crate::span::Span,
    ) {
        let file = code.file.clone();
        let child = self.lower_block_code(name, self_type, &[], body, &file, self_type);
        let child_index = code.add_code_object(child);

        let block = code.new_register(self.state.types.builtins().block);

        code.push(Instruction::SetBlock {
            register: block,
            code_object: child_index,
            receiver: Some(receiver),
            span: span.clone(),
        });

        let result = code.new_register(self.state.types.builtins().nil);

        code.push(Instruction::RunBlockWithReceiver {
            register: result,
            block,
            receiver,
            arguments: Vec::new(),
            span: span.clone(),
        });
    }

    /// Loads a constant named by a type annotation: the first segment comes
    /// from the module globals or a self attribute, the rest are attribute
    /// reads
    pub(crate) fn lower_constant_reference(
        &mut self,
        code: &mut CodeObject,
        name: &TypeNameAst,
        value_type: TypeLocation,
    ) -> Register {
        let TypeNameAst::Named(named) = name else {
            return self.nil_register(code, name.span());
        };

        let span = named.span.clone();
        let (first, rest) = match named.segments.split_first() {
            Some(parts) => parts,
            None => return self.nil_register(code, &span),
        };

        let global = self
            .state
            .module(&self.module)
            .and_then(|module| module.globals.borrow().lookup(first));

        let mut current = match global {
            Some(symbol) => {
                let register = code.new_register(symbol.value_type);

                code.push(Instruction::GetGlobal {
                    register,
                    symbol: symbol.index,
                    span: span.clone(),
                });
                register
            }
            None => {
                let receiver = self.self_register(code, &span);
                let name_register = self.string_literal(code, first, &span);
                let register = code.new_register(self.state.types.builtins().any);

                code.push(Instruction::GetAttribute {
                    register,
                    receiver,
                    name: name_register,
                    span: span.clone(),
                });
                register
            }
        };

        for (position, segment) in rest.iter().enumerate() {
            let name_register = self.string_literal(code, segment, &span);
            let result_type = if position + 1 == rest.len() {
                value_type
            } else {
                self.state.types.builtins().any
            };
            let register = code.new_register(result_type);

            code.push(Instruction::GetAttribute {
                register,
                receiver: current,
                name: name_register,
                span: span.clone(),
            });
            current = register;
        }

        current
    }
}
