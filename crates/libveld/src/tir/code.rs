//! Code objects: one compiled unit of executable code.

use crate::{
    file::SourceFile,
    symbol::SymbolTableRef,
    types::TypeLocation,
};

use super::{
    block::{BasicBlock, BlockLocation},
    catch_table::CatchTable,
    instruction::Instruction,
    register::{Register, RegisterAllocator},
};

/// One compiled unit: a method, closure, lambda or module body.
///
/// Holds the locals table, the register allocator, the basic blocks in
/// insertion order, nested code objects, the catch table and the metadata
/// the code generator serializes (argument names and counts, rest flag,
/// captures flag).
#[derive(Debug)]
pub struct CodeObject {
    pub name: String,
    pub file: SourceFile,
    pub line: usize,
    /// The block type this code object implements
    pub block_type: TypeLocation,
    pub locals: SymbolTableRef,
    pub registers: RegisterAllocator,
    pub blocks: Vec<BasicBlock>,
    /// Nested code objects, referenced by `SetBlock` instructions
    pub code_objects: Vec<CodeObject>,
    pub catch_table: CatchTable,
    /// Argument names in declaration order
    pub arguments: Vec<String>,
    pub required_arguments: usize,
    pub rest_argument: bool,
    /// True when this block reads or writes locals of an enclosing scope
    pub captures: bool,
    current_block: BlockLocation,
}

impl CodeObject {
    pub fn new(
        name: String,
        file: SourceFile,
        line: usize,
        block_type: TypeLocation,
        locals: SymbolTableRef,
    ) -> Self {
        Self {
            name,
            file,
            line,
            block_type,
            locals,
            registers: RegisterAllocator::new(),
            blocks: Vec::new(),
            code_objects: Vec::new(),
            catch_table: CatchTable::new(),
            arguments: Vec::new(),
            required_arguments: 0,
            rest_argument: false,
            captures: false,
            current_block: BlockLocation::UNDEFINED,
        }
    }

    /// Appends a new, unconnected basic block and makes it current
    pub fn add_block(&mut self, name: &str) -> BlockLocation {
        let location = BlockLocation(self.blocks.len());

        self.blocks.push(BasicBlock::new(name.to_string()));
        self.current_block = location;
        location
    }

    /// Appends a new basic block connected to the current one through the
    /// fall-through edge, and makes it current
    pub fn add_connected_block(&mut self, name: &str) -> BlockLocation {
        let previous = self.current_block;
        let location = self.add_block(name);

        if let Some(block) = self.block_mut(previous) {
            block.next = Some(location);
        }

        location
    }

    pub fn block(&self, location: BlockLocation) -> Option<&BasicBlock> {
        self.blocks.get(location.0)
    }

    pub fn block_mut(&mut self, location: BlockLocation) -> Option<&mut BasicBlock> {
        self.blocks.get_mut(location.0)
    }

    /// The block new instructions are pushed onto
    pub fn current_block(&self) -> BlockLocation {
        self.current_block
    }

    /// Redirects instruction pushes to the given block
    pub fn use_block(&mut self, location: BlockLocation) {
        self.current_block = location;
    }

    /// Pushes an instruction onto the current block
    pub fn push(&mut self, instruction: Instruction) {
        let current = self.current_block;

        self.blocks
            .get_mut(current.0)
            .expect("instructions are only pushed after a block was added")
            .push(instruction);
    }

    /// Allocates a fresh register of the given type
    pub fn new_register(&mut self, value_type: TypeLocation) -> Register {
        self.registers.allocate(value_type)
    }

    /// Stores a nested code object, returning its child index
    pub fn add_code_object(&mut self, code: CodeObject) -> usize {
        self.code_objects.push(code);
        self.code_objects.len() - 1
    }

    /// The entry block, if any block was added
    pub fn entry_block(&self) -> Option<BlockLocation> {
        if self.blocks.is_empty() {
            None
        } else {
            Some(BlockLocation(0))
        }
    }

    /// The total number of instructions across all blocks
    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(|block| block.len()).sum()
    }

    /// The number of locals defined in this code object
    pub fn local_count(&self) -> usize {
        self.locals.borrow().len()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{span::Span, symbol::SymbolTable};

    fn code() -> CodeObject {
        CodeObject::new(
            "test".to_string(),
            SourceFile::new(vec!["test".into()], "".to_string()),
            1,
            TypeLocation(0),
            SymbolTable::new_ref(),
        )
    }

    #[test]
    fn connected_blocks_link_through_fall_through() {
        let mut code = code();

        let first = code.add_block("entry");
        let second = code.add_connected_block("body");

        assert_eq!(code.block(first).unwrap().next, Some(second));
        assert_eq!(code.block(second).unwrap().next, None);
        assert_eq!(code.current_block(), second);
    }

    #[test]
    fn instructions_go_to_the_current_block() {
        let mut code = code();
        let span = Span::synthesized(code.file.clone());

        let first = code.add_block("entry");
        let second = code.add_block("body");

        let register = code.new_register(TypeLocation(1));
        code.push(Instruction::GetNil { register, span: span.clone() });

        code.use_block(first);
        let register = code.new_register(TypeLocation(1));
        code.push(Instruction::GetNil { register, span });

        assert_eq!(code.block(first).unwrap().len(), 1);
        assert_eq!(code.block(second).unwrap().len(), 1);
        assert_eq!(code.instruction_count(), 2);
        assert_eq!(code.registers.count(), 2);
    }
}
