//! The TIR instruction model.
//!
//! Instructions are tagged variants carrying typed registers, symbol
//! indexes, inline literals, block targets and a source location. The code
//! generator maps each variant onto a serialized opcode with a fixed operand
//! count.

use strum_macros::{EnumDiscriminants, EnumIs};

use crate::span::Span;

use super::{block::BlockLocation, register::Register};

/// An inline literal operand, interned per-module during code generation
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    Str(String),
}

/// A single TIR instruction
#[derive(Debug, Clone, EnumIs, EnumDiscriminants)]
#[strum_discriminants(vis(pub), name(InstructionKind))]
pub enum Instruction {
    /// Loads an interned literal into a register
    SetLiteral {
        register: Register,
        literal: Literal,
        span: Span,
    },

    /// Loads the nil singleton into a register
    GetNil { register: Register, span: Span },

    /// Reads a local of the current scope
    GetLocal {
        register: Register,
        symbol: usize,
        span: Span,
    },

    /// Writes a local of the current scope
    SetLocal {
        symbol: usize,
        value: Register,
        span: Span,
    },

    /// Reads a local `depth` scopes up; marks the block as capturing
    GetParentLocal {
        register: Register,
        depth: usize,
        symbol: usize,
        span: Span,
    },

    /// Writes a local `depth` scopes up; marks the block as capturing
    SetParentLocal {
        symbol: usize,
        depth: usize,
        value: Register,
        span: Span,
    },

    /// Loads whether a local has been assigned, used by argument defaults
    LocalExists {
        register: Register,
        symbol: usize,
        span: Span,
    },

    /// Reads a module global
    GetGlobal {
        register: Register,
        symbol: usize,
        span: Span,
    },

    /// Writes a module global
    SetGlobal {
        symbol: usize,
        value: Register,
        span: Span,
    },

    /// Reads an attribute of a receiver; the name is a string register
    GetAttribute {
        register: Register,
        receiver: Register,
        name: Register,
        span: Span,
    },

    /// Writes an attribute of a receiver
    SetAttribute {
        receiver: Register,
        name: Register,
        value: Register,
        span: Span,
    },

    /// Allocates a new object, optionally with an explicit prototype
    SetObject {
        register: Register,
        prototype: Option<Register>,
        span: Span,
    },

    /// Builds an array from the given value registers
    SetArray {
        register: Register,
        values: Vec<Register>,
        span: Span,
    },

    /// Materializes a block (child code object), optionally binding a
    /// receiver
    SetBlock {
        register: Register,
        code_object: usize,
        receiver: Option<Register>,
        span: Span,
    },

    /// Loads and executes a module by its path literal register
    LoadModule {
        register: Register,
        path: Register,
        span: Span,
    },

    /// Calls a block without rebinding its receiver
    RunBlock {
        register: Register,
        block: Register,
        arguments: Vec<Register>,
        span: Span,
    },

    /// Calls a block with an explicit receiver
    RunBlockWithReceiver {
        register: Register,
        block: Register,
        receiver: Register,
        arguments: Vec<Register>,
        span: Span,
    },

    /// Restarts the current code object with new arguments
    TailCall { arguments: Vec<Register>, span: Span },

    /// Returns from the current block; `method` distinguishes method
    /// returns from closure returns
    Return {
        method: bool,
        register: Option<Register>,
        span: Span,
    },

    /// Throws a value, dispatched through the catch tables
    Throw { register: Register, span: Span },

    /// Unconditional jump
    Goto { block: BlockLocation, span: Span },

    /// Jump when the register holds a truthy value
    GotoIfTrue {
        block: BlockLocation,
        register: Register,
        span: Span,
    },

    /// Jumps past the next basic block; resolved to an offset during code
    /// generation
    SkipNextBlock { span: Span },

    /// Copies one register into another, used to merge branch results
    CopyRegister {
        register: Register,
        source: Register,
        span: Span,
    },

    /// Copies every block attribute of one object onto another, used to
    /// bind trait implementations
    CopyBlocks {
        to: Register,
        from: Register,
        span: Span,
    },

    /// Aborts the program with a message
    Panic { message: Register, span: Span },

    /// Terminates the program with a status code
    Exit { status: Register, span: Span },

    /// Suspends the current process
    ProcessSuspendCurrent { timeout: Register, span: Span },

    /// Terminates the current process
    ProcessTerminateCurrent { span: Span },
}

impl Instruction {
    /// The source location of this instruction
    pub fn span(&self) -> &Span {
        match self {
            Instruction::SetLiteral { span, .. }
            | Instruction::GetNil { span, .. }
            | Instruction::GetLocal { span, .. }
            | Instruction::SetLocal { span, .. }
            | Instruction::GetParentLocal { span, .. }
            | Instruction::SetParentLocal { span, .. }
            | Instruction::LocalExists { span, .. }
            | Instruction::GetGlobal { span, .. }
            | Instruction::SetGlobal { span, .. }
            | Instruction::GetAttribute { span, .. }
            | Instruction::SetAttribute { span, .. }
            | Instruction::SetObject { span, .. }
            | Instruction::SetArray { span, .. }
            | Instruction::SetBlock { span, .. }
            | Instruction::LoadModule { span, .. }
            | Instruction::RunBlock { span, .. }
            | Instruction::RunBlockWithReceiver { span, .. }
            | Instruction::TailCall { span, .. }
            | Instruction::Return { span, .. }
            | Instruction::Throw { span, .. }
            | Instruction::Goto { span, .. }
            | Instruction::GotoIfTrue { span, .. }
            | Instruction::SkipNextBlock { span, .. }
            | Instruction::CopyRegister { span, .. }
            | Instruction::CopyBlocks { span, .. }
            | Instruction::Panic { span, .. }
            | Instruction::Exit { span, .. }
            | Instruction::ProcessSuspendCurrent { span, .. }
            | Instruction::ProcessTerminateCurrent { span, .. } => span,
        }
    }

    /// The register this instruction writes its result into, if any
    pub fn result(&self) -> Option<Register> {
        match self {
            Instruction::SetLiteral { register, .. }
            | Instruction::GetNil { register, .. }
            | Instruction::GetLocal { register, .. }
            | Instruction::GetParentLocal { register, .. }
            | Instruction::LocalExists { register, .. }
            | Instruction::GetGlobal { register, .. }
            | Instruction::GetAttribute { register, .. }
            | Instruction::SetObject { register, .. }
            | Instruction::SetArray { register, .. }
            | Instruction::SetBlock { register, .. }
            | Instruction::LoadModule { register, .. }
            | Instruction::RunBlock { register, .. }
            | Instruction::RunBlockWithReceiver { register, .. }
            | Instruction::CopyRegister { register, .. } => Some(*register),
            _ => None,
        }
    }

    /// True if control never falls through past this instruction
    pub fn terminator(&self) -> bool {
        matches!(
            self,
            Instruction::Return { .. }
                | Instruction::Throw { .. }
                | Instruction::Goto { .. }
                | Instruction::SkipNextBlock { .. }
                | Instruction::TailCall { .. }
                | Instruction::Panic { .. }
                | Instruction::Exit { .. }
                | Instruction::ProcessTerminateCurrent { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{file::SourceFile, types::TypeLocation};

    fn span() -> Span {
        Span::synthesized(SourceFile::new(vec!["test".into()], "".to_string()))
    }

    fn register(index: usize) -> Register {
        Register { index, value_type: TypeLocation(0) }
    }

    #[test]
    fn terminators() {
        assert!(Instruction::Throw { register: register(0), span: span() }.terminator());
        assert!(Instruction::Goto { block: BlockLocation(1), span: span() }.terminator());
        assert!(!Instruction::GetNil { register: register(0), span: span() }.terminator());
        assert!(!Instruction::GotoIfTrue {
            block: BlockLocation(1),
            register: register(0),
            span: span()
        }
        .terminator());
    }

    #[test]
    fn results() {
        let get = Instruction::GetLocal { register: register(3), symbol: 0, span: span() };
        assert_eq!(get.result().unwrap().index, 3);

        let set = Instruction::SetLocal { symbol: 0, value: register(3), span: span() };
        assert!(set.result().is_none());
    }
}
