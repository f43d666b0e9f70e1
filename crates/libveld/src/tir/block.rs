//! Basic blocks.

use super::instruction::Instruction;

/// Identifier of a basic block within one code object
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BlockLocation(pub usize);

impl BlockLocation {
    pub const UNDEFINED: Self = BlockLocation(usize::MAX);
}

impl From<usize> for BlockLocation {
    fn from(location: usize) -> Self {
        BlockLocation(location)
    }
}

/// A maximal straight-line instruction sequence.
///
/// `next` is the fall-through edge used when the block does not end in a
/// terminator. `instruction_offset` and `instruction_end` are indexes into
/// the flattened instruction stream; they stay zero until code generation
/// lays the blocks out.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub name: String,
    pub instructions: Vec<Instruction>,
    pub next: Option<BlockLocation>,
    /// Start index in the flattened instruction stream
    pub instruction_offset: usize,
    /// End index (exclusive) in the flattened instruction stream
    pub instruction_end: usize,
}

impl BasicBlock {
    pub fn new(name: String) -> Self {
        Self {
            name,
            instructions: Vec::new(),
            next: None,
            instruction_offset: 0,
            instruction_end: 0,
        }
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// The last instruction, if any
    pub fn last_instruction(&self) -> Option<&Instruction> {
        self.instructions.last()
    }

    /// True if the block ends in an instruction that never falls through
    pub fn terminated(&self) -> bool {
        self.last_instruction()
            .map(|instruction| instruction.terminator())
            .unwrap_or(false)
    }
}
