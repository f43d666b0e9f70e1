//! Code generation: flattening TIR into serializable `CompiledCode`.
//!
//! Basic blocks are laid out in insertion order. As each block is laid out
//! its `instruction_offset` and `instruction_end` are recorded, jump
//! targets and catch-table entries are rewritten from block references to
//! 32-bit instruction offsets, and string/integer/float literals are
//! interned into a per-module [`Literals`] table. A block whose
//! fall-through successor is not the next block in layout gets an explicit
//! `Goto` appended.
//!
//! The bytecode serializer consumes the [`CompiledModule`] produced here;
//! writing the file is outside the compiler core.

use indexmap::IndexMap;

use crate::{
    module::Module,
    tir::{CodeObject, Instruction, Literal},
};

/// The literal index width above which `SetLiteralWide` is required
const LITERAL_WIDE_LIMIT: usize = 1 << 16;

/// Operand value standing in for an absent optional operand
pub const NO_OPERAND: u32 = u32::MAX;

/// Serialized opcode identifiers, one per instruction form
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    SetLiteral,
    SetLiteralWide,
    GetNil,
    GetLocal,
    SetLocal,
    GetParentLocal,
    SetParentLocal,
    LocalExists,
    GetGlobal,
    SetGlobal,
    GetAttribute,
    SetAttribute,
    SetObject,
    SetArray,
    SetBlock,
    LoadModule,
    RunBlock,
    RunBlockWithReceiver,
    TailCall,
    Return,
    Throw,
    Goto,
    GotoIfTrue,
    SkipNextBlock,
    CopyRegister,
    CopyBlocks,
    Panic,
    Exit,
    ProcessSuspendCurrent,
    ProcessTerminateCurrent,
}

/// A deduplicated literal value
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledLiteral {
    Integer(i64),
    Float(f64),
    Str(String),
}

/// Interning key; floats intern by bit pattern
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LiteralKey {
    Integer(i64),
    Float(u64),
    Str(String),
}

/// Per-module table of interned literals
#[derive(Debug, Default)]
pub struct Literals {
    values: Vec<CompiledLiteral>,
    indexes: IndexMap<LiteralKey, usize>,
}

impl Literals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a literal, returning its stable index
    pub fn intern(&mut self, literal: &Literal) -> usize {
        let (key, value) = match literal {
            Literal::Integer(value) => {
                (LiteralKey::Integer(*value), CompiledLiteral::Integer(*value))
            }
            Literal::Float(value) => {
                (LiteralKey::Float(value.to_bits()), CompiledLiteral::Float(*value))
            }
            Literal::Str(value) => {
                (LiteralKey::Str(value.clone()), CompiledLiteral::Str(value.clone()))
            }
        };

        if let Some(index) = self.indexes.get(&key) {
            return *index;
        }

        self.values.push(value);
        let index = self.values.len() - 1;
        self.indexes.insert(key, index);
        index
    }

    /// Interns a string, returning its stable index
    pub fn intern_str(&mut self, value: &str) -> usize {
        self.intern(&Literal::Str(value.to_string()))
    }

    pub fn get(&self, index: usize) -> Option<&CompiledLiteral> {
        self.values.get(index)
    }

    pub fn values(&self) -> &[CompiledLiteral] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One serialized instruction: an opcode and its operands
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledInstruction {
    pub opcode: Opcode,
    pub operands: Vec<u32>,
    pub line: u16,
}

/// A catch-table entry rewritten to instruction offsets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledCatchEntry {
    pub start: u32,
    pub stop: u32,
    pub jump_to: u32,
}

/// One serializable code object
#[derive(Debug)]
pub struct CompiledCode {
    /// Literal index of the code object's name
    pub name: usize,
    /// Literal index of the source file path
    pub file: usize,
    pub line: u16,
    /// Literal indices of the argument names
    pub arguments: Vec<usize>,
    pub required_arguments: usize,
    pub rest_argument: bool,
    pub locals: usize,
    pub registers: usize,
    pub captures: bool,
    pub instructions: Vec<CompiledInstruction>,
    pub code_objects: Vec<CompiledCode>,
    pub catch_table: Vec<CompiledCatchEntry>,
}

/// A fully generated module: its literal table and root code object
#[derive(Debug)]
pub struct CompiledModule {
    pub literals: Literals,
    pub body: CompiledCode,
}

/// Generates the serializable form of a compiled module.
///
/// Returns `None` when the module was never lowered (compilation stopped
/// on errors).
pub fn generate_module(module: &mut Module) -> Option<CompiledModule> {
    let mut literals = Literals::new();
    let mut body = module.body.take()?;
    let compiled = generate_code(&mut literals, &mut body);
    module.body = Some(body);

    Some(CompiledModule { literals, body: compiled })
}

fn generate_code(literals: &mut Literals, code: &mut CodeObject) -> CompiledCode {
    // First pass: compute every block's offsets. A block needing an
    // explicit jump to its fall-through successor grows by one.
    let block_count = code.blocks.len();
    let mut needs_jump = vec![false; block_count];
    let mut offset = 0;

    for (position, block) in code.blocks.iter_mut().enumerate() {
        let jump = match block.next {
            Some(next) => next.0 != position + 1 && !block.terminated(),
            None => false,
        };

        needs_jump[position] = jump;
        block.instruction_offset = offset;
        offset += block.len() + usize::from(jump);
        block.instruction_end = offset;
    }

    // Second pass: emit, resolving block references to offsets.
    let mut instructions = Vec::with_capacity(offset);

    for position in 0..block_count {
        let block_offsets = |target: crate::tir::BlockLocation| {
            code.blocks
                .get(target.0)
                .map(|block| block.instruction_offset as u32)
                .unwrap_or(0)
        };

        for instruction in code.blocks[position].instructions.iter() {
            instructions.push(encode(literals, instruction, position, &code.blocks));
        }

        if needs_jump[position] {
            let target = code.blocks[position]
                .next
                .expect("only blocks with a successor need a jump");
            let line = code.blocks[position]
                .instructions
                .last()
                .map(|instruction| instruction.span().line() as u16)
                .unwrap_or(code.line as u16);

            instructions.push(CompiledInstruction {
                opcode: Opcode::Goto,
                operands: vec![block_offsets(target)],
                line,
            });
        }
    }

    let catch_table = code
        .catch_table
        .entries
        .iter()
        .map(|entry| {
            let start = code
                .blocks
                .get(entry.start.0)
                .map(|block| block.instruction_offset)
                .unwrap_or(0) as u32;
            let stop = code
                .blocks
                .get(entry.stop.0)
                .map(|block| block.instruction_end)
                .unwrap_or(0) as u32;
            let jump_to = code
                .blocks
                .get(entry.jump_to.0)
                .map(|block| block.instruction_offset)
                .unwrap_or(0) as u32;

            CompiledCatchEntry { start, stop, jump_to }
        })
        .collect();

    let name = literals.intern_str(&code.name);
    let file = literals.intern_str(&code.file.display_path());
    let arguments = code
        .arguments
        .iter()
        .map(|argument| literals.intern_str(argument))
        .collect();

    let code_objects = code
        .code_objects
        .iter_mut()
        .map(|child| generate_code(literals, child))
        .collect();

    CompiledCode {
        name,
        file,
        line: code.line as u16,
        arguments,
        required_arguments: code.required_arguments,
        rest_argument: code.rest_argument,
        locals: code.local_count(),
        registers: code.registers.count(),
        captures: code.captures,
        instructions,
        code_objects,
        catch_table,
    }
}

fn encode(
    literals: &mut Literals,
    instruction: &Instruction,
    position: usize,
    blocks: &[crate::tir::BasicBlock],
) -> CompiledInstruction {
    let line = instruction.span().line() as u16;
    let offset_of = |target: crate::tir::BlockLocation| {
        blocks
            .get(target.0)
            .map(|block| block.instruction_offset as u32)
            .unwrap_or(0)
    };

    let (opcode, operands) = match instruction {
        Instruction::SetLiteral { register, literal, .. } => {
            let index = literals.intern(literal);
            let opcode = if index >= LITERAL_WIDE_LIMIT {
                Opcode::SetLiteralWide
            } else {
                Opcode::SetLiteral
            };

            (opcode, vec![register.index as u32, index as u32])
        }
        Instruction::GetNil { register, .. } => (Opcode::GetNil, vec![register.index as u32]),
        Instruction::GetLocal { register, symbol, .. } => {
            (Opcode::GetLocal, vec![register.index as u32, *symbol as u32])
        }
        Instruction::SetLocal { symbol, value, .. } => {
            (Opcode::SetLocal, vec![*symbol as u32, value.index as u32])
        }
        Instruction::GetParentLocal { register, depth, symbol, .. } => (
            Opcode::GetParentLocal,
            vec![register.index as u32, *depth as u32, *symbol as u32],
        ),
        Instruction::SetParentLocal { symbol, depth, value, .. } => (
            Opcode::SetParentLocal,
            vec![*symbol as u32, *depth as u32, value.index as u32],
        ),
        Instruction::LocalExists { register, symbol, .. } => {
            (Opcode::LocalExists, vec![register.index as u32, *symbol as u32])
        }
        Instruction::GetGlobal { register, symbol, .. } => {
            (Opcode::GetGlobal, vec![register.index as u32, *symbol as u32])
        }
        Instruction::SetGlobal { symbol, value, .. } => {
            (Opcode::SetGlobal, vec![*symbol as u32, value.index as u32])
        }
        Instruction::GetAttribute { register, receiver, name, .. } => (
            Opcode::GetAttribute,
            vec![register.index as u32, receiver.index as u32, name.index as u32],
        ),
        Instruction::SetAttribute { receiver, name, value, .. } => (
            Opcode::SetAttribute,
            vec![receiver.index as u32, name.index as u32, value.index as u32],
        ),
        Instruction::SetObject { register, prototype, .. } => (
            Opcode::SetObject,
            vec![
                register.index as u32,
                prototype.map(|register| register.index as u32).unwrap_or(NO_OPERAND),
            ],
        ),
        Instruction::SetArray { register, values, .. } => {
            let mut operands = vec![register.index as u32, values.len() as u32];
            operands.extend(values.iter().map(|value| value.index as u32));
            (Opcode::SetArray, operands)
        }
        Instruction::SetBlock { register, code_object, receiver, .. } => (
            Opcode::SetBlock,
            vec![
                register.index as u32,
                *code_object as u32,
                receiver.map(|register| register.index as u32).unwrap_or(NO_OPERAND),
            ],
        ),
        Instruction::LoadModule { register, path, .. } => {
            (Opcode::LoadModule, vec![register.index as u32, path.index as u32])
        }
        Instruction::RunBlock { register, block, arguments, .. } => {
            let mut operands = vec![
                register.index as u32,
                block.index as u32,
                arguments.len() as u32,
            ];
            operands.extend(arguments.iter().map(|argument| argument.index as u32));
            (Opcode::RunBlock, operands)
        }
        Instruction::RunBlockWithReceiver { register, block, receiver, arguments, .. } => {
            let mut operands = vec![
                register.index as u32,
                block.index as u32,
                receiver.index as u32,
                arguments.len() as u32,
            ];
            operands.extend(arguments.iter().map(|argument| argument.index as u32));
            (Opcode::RunBlockWithReceiver, operands)
        }
        Instruction::TailCall { arguments, .. } => {
            let mut operands = vec![arguments.len() as u32];
            operands.extend(arguments.iter().map(|argument| argument.index as u32));
            (Opcode::TailCall, operands)
        }
        Instruction::Return { method, register, .. } => (
            Opcode::Return,
            vec![
                u32::from(*method),
                register.map(|register| register.index as u32).unwrap_or(NO_OPERAND),
            ],
        ),
        Instruction::Throw { register, .. } => (Opcode::Throw, vec![register.index as u32]),
        Instruction::Goto { block, .. } => (Opcode::Goto, vec![offset_of(*block)]),
        Instruction::GotoIfTrue { block, register, .. } => {
            (Opcode::GotoIfTrue, vec![offset_of(*block), register.index as u32])
        }
        Instruction::SkipNextBlock { .. } => {
            // A skip jumps past the lexically next block; the target is
            // resolved here so the runtime sees a plain offset.
            let target = blocks
                .get(position + 2)
                .map(|block| block.instruction_offset as u32)
                .unwrap_or_else(|| {
                    blocks
                        .get(position + 1)
                        .map(|block| block.instruction_end as u32)
                        .unwrap_or(0)
                });

            (Opcode::SkipNextBlock, vec![target])
        }
        Instruction::CopyRegister { register, source, .. } => {
            (Opcode::CopyRegister, vec![register.index as u32, source.index as u32])
        }
        Instruction::CopyBlocks { to, from, .. } => {
            (Opcode::CopyBlocks, vec![to.index as u32, from.index as u32])
        }
        Instruction::Panic { message, .. } => (Opcode::Panic, vec![message.index as u32]),
        Instruction::Exit { status, .. } => (Opcode::Exit, vec![status.index as u32]),
        Instruction::ProcessSuspendCurrent { timeout, .. } => {
            (Opcode::ProcessSuspendCurrent, vec![timeout.index as u32])
        }
        Instruction::ProcessTerminateCurrent { .. } => {
            (Opcode::ProcessTerminateCurrent, Vec::new())
        }
    };

    CompiledInstruction { opcode, operands, line }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        file::SourceFile,
        module::QualifiedName,
        span::Span,
        symbol::SymbolTable,
        tir::{BlockLocation, CatchEntry, Register},
        types::TypeLocation,
    };

    fn span() -> Span {
        Span::synthesized(SourceFile::new(vec!["test".into()], "".to_string()))
    }

    fn register(index: usize) -> Register {
        Register { index, value_type: TypeLocation(0) }
    }

    fn empty_code() -> CodeObject {
        CodeObject::new(
            "test".to_string(),
            SourceFile::new(vec!["test".into()], "".to_string()),
            1,
            TypeLocation(0),
            SymbolTable::new_ref(),
        )
    }

    #[test]
    fn literals_are_deduplicated() {
        let mut literals = Literals::new();

        let first = literals.intern(&Literal::Str("answer".to_string()));
        let second = literals.intern(&Literal::Str("answer".to_string()));
        let third = literals.intern(&Literal::Integer(42));

        assert_eq!(first, second);
        assert_ne!(first, third);
        assert_eq!(literals.len(), 2);
    }

    #[test]
    fn block_offsets_are_computed_in_layout_order() {
        let mut code = empty_code();

        code.add_block("entry");
        code.push(Instruction::GetNil { register: register(0), span: span() });
        code.push(Instruction::GetNil { register: register(1), span: span() });

        code.add_connected_block("body");
        code.push(Instruction::Return {
            method: true,
            register: Some(register(1)),
            span: span(),
        });

        let mut literals = Literals::new();
        let compiled = generate_code(&mut literals, &mut code);

        assert_eq!(code.blocks[0].instruction_offset, 0);
        assert_eq!(code.blocks[0].instruction_end, 2);
        assert_eq!(code.blocks[1].instruction_offset, 2);
        assert_eq!(code.blocks[1].instruction_end, 3);
        assert_eq!(compiled.instructions.len(), 3);
    }

    #[test]
    fn catch_entries_are_rewritten_to_offsets() {
        let mut code = empty_code();

        code.add_block("try");
        code.push(Instruction::GetNil { register: register(0), span: span() });
        code.push(Instruction::SkipNextBlock { span: span() });

        code.add_connected_block("try_else");
        code.push(Instruction::GetNil { register: register(1), span: span() });

        code.add_connected_block("try_end");
        code.push(Instruction::Return {
            method: true,
            register: Some(register(1)),
            span: span(),
        });

        code.catch_table.push(CatchEntry {
            start: BlockLocation(0),
            stop: BlockLocation(0),
            jump_to: BlockLocation(1),
        });

        let mut literals = Literals::new();
        let compiled = generate_code(&mut literals, &mut code);

        let entry = &compiled.catch_table[0];
        assert_eq!((entry.start, entry.stop, entry.jump_to), (0, 2, 2));
        assert!(entry.start <= entry.stop && entry.stop <= entry.jump_to);

        // The skip resolves to the block past the handler.
        let skip = compiled
            .instructions
            .iter()
            .find(|instruction| instruction.opcode == Opcode::SkipNextBlock)
            .unwrap();
        assert_eq!(skip.operands, vec![3]);
    }

    #[test]
    fn non_adjacent_fall_through_gets_an_explicit_goto() {
        let mut code = empty_code();

        code.add_block("entry");
        code.push(Instruction::GetNil { register: register(0), span: span() });

        code.add_block("middle");
        code.push(Instruction::GetNil { register: register(1), span: span() });

        code.add_block("end");
        code.push(Instruction::Return {
            method: true,
            register: Some(register(1)),
            span: span(),
        });

        // entry falls through to end, skipping middle.
        code.block_mut(BlockLocation(0)).unwrap().next = Some(BlockLocation(2));

        let mut literals = Literals::new();
        let compiled = generate_code(&mut literals, &mut code);

        assert_eq!(compiled.instructions[1].opcode, Opcode::Goto);
        assert_eq!(
            compiled.instructions[1].operands,
            vec![code.blocks[2].instruction_offset as u32]
        );
    }

    #[test]
    fn literal_indexes_past_the_16_bit_limit_use_the_wide_opcode() {
        let mut code = empty_code();

        code.add_block("entry");
        code.push(Instruction::SetLiteral {
            register: register(0),
            literal: Literal::Str("narrow".to_string()),
            span: span(),
        });
        code.push(Instruction::SetLiteral {
            register: register(1),
            literal: Literal::Str("wide".to_string()),
            span: span(),
        });

        let mut literals = Literals::new();

        // Fill the table up to the 16-bit boundary before encoding.
        literals.intern(&Literal::Str("narrow".to_string()));
        for value in 0..(LITERAL_WIDE_LIMIT as i64 - 1) {
            literals.intern(&Literal::Integer(value));
        }
        assert_eq!(literals.len(), LITERAL_WIDE_LIMIT);

        let compiled = generate_code(&mut literals, &mut code);

        assert_eq!(compiled.instructions[0].opcode, Opcode::SetLiteral);
        assert_eq!(compiled.instructions[1].opcode, Opcode::SetLiteralWide);
        assert_eq!(compiled.instructions[1].operands[1], LITERAL_WIDE_LIMIT as u32);
    }

    #[test]
    fn generate_module_requires_a_lowered_body() {
        let mut module = crate::module::Module::new(
            QualifiedName::from_dotted("main"),
            SourceFile::new(vec!["main".into()], "".to_string()),
        );

        assert!(generate_module(&mut module).is_none());

        module.body = Some(empty_code());
        assert!(generate_module(&mut module).is_some());
    }
}
