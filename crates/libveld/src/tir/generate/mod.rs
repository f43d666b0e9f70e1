//! Lowering of the typed AST into TIR.
//!
//! Every expression produces exactly one result register. The generator
//! reads the decorations recorded by the semantic passes (node types,
//! identifier and constant targets, receiver types, possibly-undefined
//! marks) and never re-resolves names itself.
//!
//! Per module body the generator emits an `imports` block (loading each
//! import and exposing its symbols as globals), a `define_module` block
//! (binding the module object to the `self` local) and then the body
//! proper. Closure captures surface here: a lookup that crossed scopes at
//! resolution time becomes `GetParentLocal`/`SetParentLocal` and flips the
//! code object's `captures` flag.

mod control;
mod declarations;
mod sends;

use log::debug;

use crate::{
    ast::{BodyAst, DefineArgumentAst, ExpressionAst},
    file::SourceFile,
    module::QualifiedName,
    state::{ConstantTarget, IdentifierTarget, State, VariableTarget},
    symbol::SymbolTable,
    tir::{CodeObject, Instruction, Literal, Register},
    types::{BlockKind, TypeLocation},
};

/// Lowers a module body to its code object.
///
/// Call only when no errors were recorded; the generator assumes every
/// decoration it reads is present.
pub fn run(state: &mut State, name: &QualifiedName, body: &BodyAst) -> Option<CodeObject> {
    let module = state.module(name)?;
    let file = module.file.clone();
    let module_type = module.module_type;
    let imports = module.imports.clone();
    let define_module = module.define_module();
    let globals = module.globals.clone();

    let block_location = state.block_type(body.index)?;
    let locals = state
        .body_locals(body.index)
        .unwrap_or_else(SymbolTable::new_ref);

    let mut code = CodeObject::new(
        name.to_dotted(),
        file.clone(),
        1,
        block_location,
        locals,
    );

    let mut lower = Lower {
        state,
        module: name.clone(),
    };

    let self_symbol = lower.define_self(&mut code, module_type);
    let span = crate::span::Span::synthesized(file);

    // Block one: load the imported modules and expose their symbols.
    code.add_block("imports");

    for import in imports.iter() {
        let path_literal = lower.string_literal(&mut code, &import.qualified_path(), &span);
        let module_register = code.new_register(lower.state.types.builtins().module);

        code.push(Instruction::LoadModule {
            register: module_register,
            path: path_literal,
            span: span.clone(),
        });

        let source_globals = lower
            .state
            .modules
            .get(&import.qualified_path())
            .map(|source| source.globals.clone());

        for symbol in import.symbols.iter() {
            match &symbol.kind {
                crate::ast::ImportSymbolKind::Symbol { name: exported, alias } => {
                    let binding = alias.clone().unwrap_or_else(|| exported.clone());
                    let Some(global) = globals.borrow().lookup(&binding) else { continue };

                    let name_register = lower.string_literal(&mut code, exported, &span);
                    let value = code.new_register(global.value_type);

                    code.push(Instruction::GetAttribute {
                        register: value,
                        receiver: module_register,
                        name: name_register,
                        span: span.clone(),
                    });
                    code.push(Instruction::SetGlobal {
                        symbol: global.index,
                        value,
                        span: span.clone(),
                    });
                }
                crate::ast::ImportSymbolKind::SelfModule { alias } => {
                    let binding = alias
                        .clone()
                        .unwrap_or_else(|| import.module_name().to_string());
                    let Some(global) = globals.borrow().lookup(&binding) else { continue };

                    code.push(Instruction::SetGlobal {
                        symbol: global.index,
                        value: module_register,
                        span: span.clone(),
                    });
                }
                crate::ast::ImportSymbolKind::Glob => {
                    // Glob expansion is known at compile time: every global
                    // the source module defined is mirrored over.
                    let exported = source_globals
                        .as_ref()
                        .map(|source| {
                            source
                                .borrow()
                                .symbols()
                                .map(|symbol| (symbol.name.clone(), symbol.value_type))
                                .collect::<Vec<_>>()
                        })
                        .unwrap_or_default();

                    for (exported_name, value_type) in exported {
                        let Some(global) = globals.borrow().lookup(&exported_name) else {
                            continue;
                        };

                        let name_register =
                            lower.string_literal(&mut code, &exported_name, &span);
                        let value = code.new_register(value_type);

                        code.push(Instruction::GetAttribute {
                            register: value,
                            receiver: module_register,
                            name: name_register,
                            span: span.clone(),
                        });
                        code.push(Instruction::SetGlobal {
                            symbol: global.index,
                            value,
                            span: span.clone(),
                        });
                    }
                }
            }
        }
    }

    // Block two: bind the module object to the self local.
    code.add_connected_block("define_module");

    let module_register = code.new_register(module_type);

    if define_module {
        code.push(Instruction::SetObject {
            register: module_register,
            prototype: None,
            span: span.clone(),
        });
    } else {
        code.push(Instruction::GetNil {
            register: module_register,
            span: span.clone(),
        });
    }

    code.push(Instruction::SetLocal {
        symbol: self_symbol,
        value: module_register,
        span: span.clone(),
    });

    // The body proper.
    code.add_connected_block("body");

    let last = lower.lower_body(&mut code, body);

    let current = code.current_block();
    if !code.block(current).map(|block| block.terminated()).unwrap_or(true) {
        code.push(Instruction::Return {
            method: true,
            register: Some(last),
            span,
        });
    }

    debug!("lowered module {name} to {} blocks", code.blocks.len());
    Some(code)
}

pub(crate) struct Lower<'a> {
    pub(crate) state: &'a mut State,
    pub(crate) module: QualifiedName,
}

impl<'a> Lower<'a> {
    /// Defines the `self` local of a code object, returning its index
    pub(crate) fn define_self(&mut self, code: &mut CodeObject, self_type: TypeLocation) -> usize {
        let existing = code.locals.borrow().lookup("self");

        if let Some(symbol) = existing {
            return symbol.index;
        }

        code.locals
            .borrow_mut()
            .define("self".to_string(), self_type, false, None)
            .map(|symbol| symbol.index)
            .expect("self is never defined twice")
    }

    fn self_symbol(&self, code: &CodeObject) -> (usize, TypeLocation) {
        code.locals
            .borrow()
            .lookup("self")
            .map(|symbol| (symbol.index, symbol.value_type))
            .unwrap_or((0, self.state.types.builtins().any))
    }

    /// Loads the `self` local into a register
    pub(crate) fn self_register(
        &mut self,
        code: &mut CodeObject,
        span: &crate::span::Span,
    ) -> Register {
        let (symbol, value_type) = self.self_symbol(code);
        let register = code.new_register(value_type);

        code.push(Instruction::GetLocal {
            register,
            symbol,
            span: span.clone(),
        });
        register
    }

    /// Interns a string value into a register
    pub(crate) fn string_literal(
        &mut self,
        code: &mut CodeObject,
        value: &str,
        span: &crate::span::Span,
    ) -> Register {
        let register = code.new_register(self.state.types.builtins().string);

        code.push(Instruction::SetLiteral {
            register,
            literal: Literal::Str(value.to_string()),
            span: span.clone(),
        });
        register
    }

    pub(crate) fn nil_register(
        &mut self,
        code: &mut CodeObject,
        span: &crate::span::Span,
    ) -> Register {
        let register = code.new_register(self.state.types.builtins().nil);

        code.push(Instruction::GetNil {
            register,
            span: span.clone(),
        });
        register
    }

    /// Lowers every expression of a body, returning the last result (or
    /// nil for an empty body)
    pub(crate) fn lower_body(&mut self, code: &mut CodeObject, body: &BodyAst) -> Register {
        let mut last = None;

        for expression in body.expressions.iter() {
            last = Some(self.on_expression(code, expression));
        }

        match last {
            Some(register) => register,
            None => self.nil_register(code, &body.span),
        }
    }

    pub(crate) fn on_expression(
        &mut self,
        code: &mut CodeObject,
        expression: &ExpressionAst,
    ) -> Register {
        match expression {
            ExpressionAst::Int(node) => {
                let register = code.new_register(self.state.types.builtins().integer);

                code.push(Instruction::SetLiteral {
                    register,
                    literal: Literal::Integer(node.value),
                    span: node.span.clone(),
                });
                register
            }
            ExpressionAst::Float(node) => {
                let register = code.new_register(self.state.types.builtins().float);

                code.push(Instruction::SetLiteral {
                    register,
                    literal: Literal::Float(node.value),
                    span: node.span.clone(),
                });
                register
            }
            ExpressionAst::Str(node) => self.string_literal(code, &node.value, &node.span),
            ExpressionAst::Identifier(node) => self.on_identifier(code, node),
            ExpressionAst::Constant(node) => self.on_constant(code, node),
            ExpressionAst::Attribute(node) => {
                let receiver = self.self_register(code, &node.span);
                let name = self.string_literal(code, &node.name, &node.span);
                let register = code.new_register(self.state.node_type(node.index));

                code.push(Instruction::GetAttribute {
                    register,
                    receiver,
                    name,
                    span: node.span.clone(),
                });
                register
            }
            ExpressionAst::SelfObject(node) => self.self_register(code, &node.span),
            ExpressionAst::DefineVariable(node) => self.on_define_variable(code, node),
            ExpressionAst::Reassign(node) => self.on_reassign(code, node),
            ExpressionAst::Send(node) => self.on_send(code, node),
            ExpressionAst::Block(node) => self.on_block_literal(code, node),
            ExpressionAst::Method(node) => self.on_method(code, node),
            ExpressionAst::Return(node) => self.on_return(code, node),
            ExpressionAst::Throw(node) => self.on_throw(code, node),
            ExpressionAst::Try(node) => self.on_try(code, node),
            ExpressionAst::Object(node) => self.on_object(code, node),
            ExpressionAst::Trait(node) => self.on_trait(code, node),
            ExpressionAst::TraitImplementation(node) => {
                self.on_trait_implementation(code, node)
            }
            ExpressionAst::ReopenObject(node) => self.on_reopen_object(code, node),
            ExpressionAst::TypeCast(node) => {
                let source = self.on_expression(code, &node.value);
                let register = code.new_register(self.state.node_type(node.index));

                code.push(Instruction::CopyRegister {
                    register,
                    source,
                    span: node.span.clone(),
                });
                register
            }
            ExpressionAst::RawInstruction(node) => self.on_raw_instruction(code, node),
            ExpressionAst::Match(node) => self.on_match(code, node),
            ExpressionAst::Import(node) => self.nil_register(code, &node.span),
            ExpressionAst::CompilerOption(node) => self.nil_register(code, &node.span),
        }
    }

    fn on_identifier(
        &mut self,
        code: &mut CodeObject,
        node: &crate::ast::IdentifierAst,
    ) -> Register {
        let target = self.state.identifier_target(node.index).cloned();

        match target {
            Some(IdentifierTarget::Local { depth: 0, symbol }) => {
                let register = code.new_register(symbol.value_type);

                code.push(Instruction::GetLocal {
                    register,
                    symbol: symbol.index,
                    span: node.span.clone(),
                });
                register
            }
            Some(IdentifierTarget::Local { depth, symbol }) => {
                self.mark_captures(code);
                let register = code.new_register(symbol.value_type);

                code.push(Instruction::GetParentLocal {
                    register,
                    depth,
                    symbol: symbol.index,
                    span: node.span.clone(),
                });
                register
            }
            Some(IdentifierTarget::SelfMethod { .. }) => {
                let receiver = self.self_register(code, &node.span);
                self.call_without_arguments(code, receiver, &node.name, node.index, &node.span)
            }
            Some(IdentifierTarget::ModuleMethod { symbol }) => {
                let block = code.new_register(symbol.value_type);

                code.push(Instruction::GetGlobal {
                    register: block,
                    symbol: symbol.index,
                    span: node.span.clone(),
                });

                let register = code.new_register(self.state.node_type(node.index));

                code.push(Instruction::RunBlock {
                    register,
                    block,
                    arguments: Vec::new(),
                    span: node.span.clone(),
                });
                register
            }
            Some(IdentifierTarget::Global { symbol }) => {
                let register = code.new_register(symbol.value_type);

                code.push(Instruction::GetGlobal {
                    register,
                    symbol: symbol.index,
                    span: node.span.clone(),
                });
                register
            }
            None => self.nil_register(code, &node.span),
        }
    }

    fn on_constant(&mut self, code: &mut CodeObject, node: &crate::ast::ConstantAst) -> Register {
        let target = self.state.constant_target(node.index).cloned();

        match target {
            Some(ConstantTarget::SelfAttribute { name }) => {
                let receiver = self.self_register(code, &node.span);
                let name_register = self.string_literal(code, &name, &node.span);
                let register = code.new_register(self.state.node_type(node.index));

                code.push(Instruction::GetAttribute {
                    register,
                    receiver,
                    name: name_register,
                    span: node.span.clone(),
                });
                register
            }
            Some(ConstantTarget::Global { symbol }) => {
                let register = code.new_register(symbol.value_type);

                code.push(Instruction::GetGlobal {
                    register,
                    symbol: symbol.index,
                    span: node.span.clone(),
                });
                register
            }
            None => self.nil_register(code, &node.span),
        }
    }

    fn on_define_variable(
        &mut self,
        code: &mut CodeObject,
        node: &crate::ast::DefineVariableAst,
    ) -> Register {
        let value = self.on_expression(code, &node.value);
        let target = self.state.variable_target(node.index).cloned();

        match target {
            Some(VariableTarget::Local { symbol, .. }) => {
                code.push(Instruction::SetLocal {
                    symbol: symbol.index,
                    value,
                    span: node.span.clone(),
                });
            }
            Some(VariableTarget::Attribute { name }) => {
                let receiver = self.self_register(code, &node.span);
                let name_register = self.string_literal(code, &name, &node.span);

                code.push(Instruction::SetAttribute {
                    receiver,
                    name: name_register,
                    value,
                    span: node.span.clone(),
                });
            }
            Some(VariableTarget::Constant { name, global }) => {
                let receiver = self.self_register(code, &node.span);
                let name_register = self.string_literal(code, &name, &node.span);

                code.push(Instruction::SetAttribute {
                    receiver,
                    name: name_register,
                    value,
                    span: node.span.clone(),
                });

                if let Some(global) = global {
                    code.push(Instruction::SetGlobal {
                        symbol: global.index,
                        value,
                        span: node.span.clone(),
                    });
                }
            }
            None => {}
        }

        value
    }

    fn on_reassign(&mut self, code: &mut CodeObject, node: &crate::ast::ReassignAst) -> Register {
        let value = self.on_expression(code, &node.value);
        let target = self.state.variable_target(node.index).cloned();

        match target {
            Some(VariableTarget::Local { depth: 0, symbol }) => {
                code.push(Instruction::SetLocal {
                    symbol: symbol.index,
                    value,
                    span: node.span.clone(),
                });
            }
            Some(VariableTarget::Local { depth, symbol }) => {
                self.mark_captures(code);

                code.push(Instruction::SetParentLocal {
                    symbol: symbol.index,
                    depth,
                    value,
                    span: node.span.clone(),
                });
            }
            Some(VariableTarget::Attribute { name })
            | Some(VariableTarget::Constant { name, .. }) => {
                let receiver = self.self_register(code, &node.span);
                let name_register = self.string_literal(code, &name, &node.span);

                code.push(Instruction::SetAttribute {
                    receiver,
                    name: name_register,
                    value,
                    span: node.span.clone(),
                });
            }
            None => {}
        }

        value
    }

    /// Looks up a zero-argument method on a receiver and calls it
    pub(crate) fn call_without_arguments(
        &mut self,
        code: &mut CodeObject,
        receiver: Register,
        name: &str,
        index: crate::ast::AstIndex,
        span: &crate::span::Span,
    ) -> Register {
        let name_register = self.string_literal(code, name, span);
        let block = code.new_register(self.state.types.builtins().block);

        code.push(Instruction::GetAttribute {
            register: block,
            receiver,
            name: name_register,
            span: span.clone(),
        });

        let register = code.new_register(self.state.node_type(index));

        code.push(Instruction::RunBlockWithReceiver {
            register,
            block,
            receiver,
            arguments: Vec::new(),
            span: span.clone(),
        });
        register
    }

    /// Marks the current code object (and its block type) as capturing
    pub(crate) fn mark_captures(&mut self, code: &mut CodeObject) {
        code.captures = true;

        if let Some(block) = self.state.types.block_mut(code.block_type) {
            block.captures = true;
        }
    }

    /// Builds the code object of a method, closure or handler body,
    /// including the argument-default guard blocks
    pub(crate) fn lower_block_code(
        &mut self,
        name: &str,
        block_location: TypeLocation,
        argument_nodes: &[DefineArgumentAst],
        body: &BodyAst,
        file: &SourceFile,
        self_type: TypeLocation,
    ) -> CodeObject {
        let locals = self
            .state
            .body_locals(body.index)
            .unwrap_or_else(SymbolTable::new_ref);

        let mut code = CodeObject::new(
            name.to_string(),
            file.clone(),
            body.span.line(),
            block_location,
            locals,
        );

        if let Some(block) = self.state.types.block(block_location) {
            code.arguments = block
                .arguments
                .iter()
                .map(|argument| argument.name.clone())
                .collect();
            code.required_arguments = block.required_arguments();
            code.rest_argument = block.rest_argument();
        }

        self.define_self(&mut code, self_type);
        code.add_block("entry");

        // Optional parameters get a guard block each: when the caller did
        // not supply the argument, its default is evaluated and stored.
        let optional = argument_nodes
            .iter()
            .filter(|argument| argument.default.is_some())
            .collect::<Vec<_>>();

        if !optional.is_empty() {
            let mut guards = Vec::new();

            for node in optional.iter() {
                let label = format!("{}_default", node.name);
                guards.push((code.add_connected_block(&label), *node));
            }

            let body_block = code.add_connected_block("body");

            for (position, (guard, node)) in guards.iter().enumerate() {
                let target = guards
                    .get(position + 1)
                    .map(|(block, _)| *block)
                    .unwrap_or(body_block);

                code.use_block(*guard);

                let symbol = code
                    .locals
                    .borrow()
                    .lookup(&node.name)
                    .map(|symbol| symbol.index)
                    .unwrap_or(0);

                let exists = code.new_register(self.state.types.builtins().boolean);

                code.push(Instruction::LocalExists {
                    register: exists,
                    symbol,
                    span: node.span.clone(),
                });
                code.push(Instruction::GotoIfTrue {
                    block: target,
                    register: exists,
                    span: node.span.clone(),
                });

                let default = node
                    .default
                    .as_deref()
                    .expect("only arguments with defaults are collected");
                let value = self.on_expression(&mut code, default);

                code.push(Instruction::SetLocal {
                    symbol,
                    value,
                    span: node.span.clone(),
                });

                // Default evaluation may have moved the current block; keep
                // the fall-through pointed at the next guard.
                let current = code.current_block();
                if let Some(block) = code.block_mut(current) {
                    block.next = Some(target);
                }
            }

            code.use_block(body_block);
        }

        let last = self.lower_body(&mut code, body);

        let current = code.current_block();
        let terminated = code
            .block(current)
            .map(|block| block.terminated())
            .unwrap_or(true);

        if !terminated {
            let method = self
                .state
                .types
                .block(block_location)
                .map(|block| block.kind == BlockKind::Method)
                .unwrap_or(false);

            code.push(Instruction::Return {
                method,
                register: Some(last),
                span: body.span.clone(),
            });
        }

        code
    }
}
