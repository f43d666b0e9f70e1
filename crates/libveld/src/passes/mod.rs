//! The pass pipeline.
//!
//! Each pass is a module with a `run` entry point taking the compiler state
//! and the module's body. The driver calls them in a fixed order; there is
//! deliberately no per-pass trait, just free functions dispatching over the
//! AST with exhaustive matches, so a missing node kind fails at compile
//! time instead of at runtime.
//!
//! The stages, in pipeline order:
//!
//! 1. Structural: [`implicit_imports`], [`collect_imports`],
//!    [`configure_module`], [`symbol_tables`], [`hoisting`],
//!    [`desugar_object`], [`desugar_method`], [`rest_arguments`]
//! 2. Semantic: [`define_signatures`], [`import_types`],
//!    [`implement_traits`], [`define_type`], [`validate_throw`],
//!    [`keyword_arguments`]
//!
//! Lowering lives under [`crate::tir::generate`] and code generation under
//! [`crate::codegen`]; the driver skips both once the diagnostics collector
//! holds errors.

pub mod collect_imports;
pub mod configure_module;
pub mod define_signatures;
pub mod define_type;
pub mod desugar_method;
pub mod desugar_object;
pub mod hoisting;
pub mod implement_traits;
pub mod implicit_imports;
pub mod import_types;
pub mod keyword_arguments;
pub mod rest_arguments;
pub mod symbol_tables;
pub mod validate_throw;
