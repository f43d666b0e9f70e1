//! Veld Language Compiler Library
//!
//! This is the core library for the Veld programming language compiler:
//! the front-end and mid-end turning parsed source into a typed,
//! register-based intermediate representation a bytecode serializer can
//! consume.
//!
//! # Overview
//!
//! Compilation is a sequence of passes per module:
//!
//! 1. **Acquisition**: resolve the module path, parse, register the
//!    module and mint its nominal type
//! 2. **Structural**: implicit imports, import collection, pragmas,
//!    symbol tables, hoisting, desugaring (`init` to `new`, default
//!    return types, rest-argument defaults)
//! 3. **Semantic**: type signatures, import types, trait
//!    implementations, full type inference and checking, throw
//!    validation, keyword-argument optimization
//! 4. **Lowering**: TIR generation, tail-call elimination, dead-code
//!    warnings, code generation
//!
//! The [`Compiler`] drives the pipeline; imports trigger recursive module
//! compilation through a shared [`State`] holding the type database, the
//! module registry and the diagnostics accumulator.
//!
//! # Architecture
//!
//! - [`ast`]: the tree shape produced by the (external) parser
//! - [`types`]: the arena-based type system
//! - [`passes`]: the structural and semantic passes
//! - [`tir`]: basic blocks, registers, instructions and catch tables
//! - [`codegen`]: flattening TIR into serializable `CompiledCode`
//! - [`error`] / [`diagnostics`]: rich diagnostics with source locations
//!
//! # Usage
//!
//! ```ignore
//! use libveld::{compiler::Compiler, config::Config, module::QualifiedName,
//!     source::{MemorySources, PrebuiltParser}, state::State};
//!
//! let state = State::new(Config::default());
//! let mut compiler = Compiler::new(
//!     state,
//!     Box::new(MemorySources::new()),
//!     Box::new(PrebuiltParser::new()),
//! );
//!
//! let ok = compiler.compile_main(&QualifiedName::from_dotted("main"));
//! let compiled = compiler.generate_all();
//! ```
//!
//! # Error Handling
//!
//! Errors never abort a pass: they accumulate on the
//! [`Diagnostics`](diagnostics::Diagnostics) collector and the affected
//! nodes absorb into the `Error` sentinel type. Lowering is skipped once
//! any error exists; warnings are reported but harmless.

pub mod ast;
pub mod codegen;
pub mod compiler;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod file;
pub mod module;
pub mod passes;
pub mod scope;
pub mod source;
pub mod span;
pub mod state;
pub mod symbol;
pub mod tir;
pub mod types;

#[cfg(test)]
mod tests;

pub use compiler::Compiler;
pub use state::State;
