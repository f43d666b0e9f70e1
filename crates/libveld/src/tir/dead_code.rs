//! Unreachable-code detection.
//!
//! Walks the control-flow graph of every code object from its entry block,
//! following fall-through edges, jumps and catch-table handlers. A
//! non-empty block nothing reaches produces an unreachable-code warning at
//! its first instruction; empty blocks are structural leftovers and stay
//! silent. Warnings never abort compilation.

use crate::{error::CompileError, state::State};

use super::{BlockLocation, CodeObject, Instruction};

pub fn run(state: &mut State, code: &CodeObject) {
    for child in code.code_objects.iter() {
        run(state, child);
    }

    if code.blocks.is_empty() {
        return;
    }

    let mut reachable = vec![false; code.blocks.len()];
    let mut stack = vec![BlockLocation(0)];

    for entry in code.catch_table.entries.iter() {
        stack.push(entry.jump_to);
    }

    while let Some(location) = stack.pop() {
        let Some(block) = code.block(location) else { continue };

        if reachable[location.0] {
            continue;
        }

        reachable[location.0] = true;

        if let Some(next) = block.next {
            stack.push(next);
        }

        for instruction in block.instructions.iter() {
            match instruction {
                Instruction::Goto { block, .. } => stack.push(*block),
                Instruction::GotoIfTrue { block, .. } => stack.push(*block),
                Instruction::SkipNextBlock { .. } => {
                    stack.push(BlockLocation(location.0 + 2));
                }
                _ => {}
            }
        }
    }

    for (position, block) in code.blocks.iter().enumerate() {
        if reachable[position] || block.is_empty() {
            continue;
        }

        let span = block.instructions[0].span().clone();
        state.record(CompileError::unreachable_code(&span));
    }
}
