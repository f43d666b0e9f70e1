//! Tail call elimination.
//!
//! A method whose terminal basic block ends in `[call, Return]` where the
//! call dispatches the method's own name on `self` is rewritten to restart
//! the current code object via `TailCall` instead of growing the call
//! stack. The proof that the call targets the current code object is read
//! off the block itself: the called block register must come from a
//! `GetAttribute` of the method's name on the `self` local.

use super::{CodeObject, Instruction, Literal, Register};

pub fn run(code: &mut CodeObject) {
    for child in code.code_objects.iter_mut() {
        run(child);
    }

    let Some(self_symbol) = code
        .locals
        .borrow()
        .lookup("self")
        .map(|symbol| symbol.index)
    else {
        return;
    };

    let name = code.name.clone();

    for block in code.blocks.iter_mut() {
        if block.len() < 2 {
            continue;
        }

        if !matches!(block.last_instruction(), Some(Instruction::Return { .. })) {
            continue;
        }

        let penultimate = block.len() - 2;

        let rewrite = match &block.instructions[penultimate] {
            Instruction::RunBlockWithReceiver {
                block: called,
                receiver,
                arguments,
                span,
                ..
            } if calls_current_code(
                &block.instructions[..penultimate],
                *called,
                *receiver,
                self_symbol,
                &name,
            ) =>
            {
                Some(Instruction::TailCall {
                    arguments: arguments.clone(),
                    span: span.clone(),
                })
            }
            _ => None,
        };

        if let Some(instruction) = rewrite {
            block.instructions[penultimate] = instruction;
        }
    }
}

/// True when the called block was looked up as the current method's name
/// on the `self` local within the same basic block
fn calls_current_code(
    instructions: &[Instruction],
    called: Register,
    receiver: Register,
    self_symbol: usize,
    name: &str,
) -> bool {
    let attribute = instructions.iter().rev().find_map(|instruction| match instruction {
        Instruction::GetAttribute {
            register,
            receiver,
            name,
            ..
        } if *register == called => Some((*receiver, *name)),
        _ => None,
    });

    let Some((attribute_receiver, name_register)) = attribute else { return false };

    if attribute_receiver != receiver {
        return false;
    }

    let name_matches = instructions.iter().rev().any(|instruction| match instruction {
        Instruction::SetLiteral {
            register,
            literal: Literal::Str(value),
            ..
        } => *register == name_register && value == name,
        _ => false,
    });

    if !name_matches {
        return false;
    }

    instructions.iter().rev().any(|instruction| match instruction {
        Instruction::GetLocal { register, symbol, .. } => {
            *register == attribute_receiver && *symbol == self_symbol
        }
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        file::SourceFile, span::Span, symbol::SymbolTable, tir::InstructionKind,
        types::TypeLocation,
    };

    fn span() -> Span {
        Span::synthesized(SourceFile::new(vec!["test".into()], "".to_string()))
    }

    fn recursive_method(name: &str, called_name: &str) -> CodeObject {
        let locals = SymbolTable::new_ref();
        locals
            .borrow_mut()
            .define("self".to_string(), TypeLocation(0), false, None)
            .unwrap();

        let mut code = CodeObject::new(
            name.to_string(),
            SourceFile::new(vec!["test".into()], "".to_string()),
            1,
            TypeLocation(0),
            locals,
        );

        code.add_block("entry");

        let receiver = code.new_register(TypeLocation(0));
        code.push(Instruction::GetLocal { register: receiver, symbol: 0, span: span() });

        let method_name = code.new_register(TypeLocation(1));
        code.push(Instruction::SetLiteral {
            register: method_name,
            literal: Literal::Str(called_name.to_string()),
            span: span(),
        });

        let block = code.new_register(TypeLocation(2));
        code.push(Instruction::GetAttribute {
            register: block,
            receiver,
            name: method_name,
            span: span(),
        });

        let result = code.new_register(TypeLocation(3));
        code.push(Instruction::RunBlockWithReceiver {
            register: result,
            block,
            receiver,
            arguments: Vec::new(),
            span: span(),
        });
        code.push(Instruction::Return {
            method: true,
            register: Some(result),
            span: span(),
        });

        code
    }

    fn kinds(code: &CodeObject) -> Vec<InstructionKind> {
        code.blocks[0]
            .instructions
            .iter()
            .map(InstructionKind::from)
            .collect()
    }

    #[test]
    fn a_self_recursive_terminal_call_becomes_a_tail_call() {
        let mut code = recursive_method("spin", "spin");

        run(&mut code);

        assert_eq!(
            kinds(&code),
            vec![
                InstructionKind::GetLocal,
                InstructionKind::SetLiteral,
                InstructionKind::GetAttribute,
                InstructionKind::TailCall,
                InstructionKind::Return,
            ]
        );
    }

    #[test]
    fn calls_to_other_methods_are_left_alone() {
        let mut code = recursive_method("spin", "other");

        run(&mut code);

        assert!(kinds(&code).contains(&InstructionKind::RunBlockWithReceiver));
    }
}
