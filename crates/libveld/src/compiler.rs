//! The per-module compilation driver.
//!
//! [`Compiler`] owns the session [`State`] and drives every module through
//! the fixed pass pipeline. Imports schedule further module compilations
//! recursively; registering a module before its body is typed is what
//! keeps mutually recursive imports from looping, and the registry check
//! guarantees at-most-once compilation per qualified name.
//!
//! Diagnostics accumulate across modules in the order they are
//! encountered. Once any error is recorded, lowering and code generation
//! are skipped; warnings never abort.

use log::debug;

use crate::{
    codegen::{self, CompiledModule},
    error::CompileError,
    file::SourceFile,
    module::{Module, QualifiedName},
    passes,
    source::{Parser, SourceProvider},
    span::Span,
    state::State,
    tir,
    types::{ObjectType, TypeKind},
};

/// Drives modules through the pass pipeline
pub struct Compiler {
    pub state: State,
    sources: Box<dyn SourceProvider>,
    parser: Box<dyn Parser>,
}

impl Compiler {
    pub fn new(state: State, sources: Box<dyn SourceProvider>, parser: Box<dyn Parser>) -> Self {
        Self {
            state,
            sources,
            parser,
        }
    }

    /// Compiles the root module and everything it transitively imports.
    ///
    /// Returns `true` when no errors were recorded.
    pub fn compile_main(&mut self, name: &QualifiedName) -> bool {
        self.compile_module(name);
        !self.state.has_errors()
    }

    /// Compiles one module, unless it is already registered
    pub fn compile_module(&mut self, name: &QualifiedName) {
        self.compile_module_at(name, None);
    }

    fn compile_module_at(&mut self, name: &QualifiedName, import_span: Option<Span>) {
        // At-most-once per qualified name.
        if self.state.module_exists(name) {
            return;
        }

        debug!("compiling module {name}");

        // PathToSource: resolve the qualified name through the search
        // paths.
        let Some(file) = self.sources.load(&self.state.config, name) else {
            let span = import_span.unwrap_or_else(|| {
                Span::synthesized(SourceFile::new(name.segments().to_vec(), String::new()))
            });

            self.state
                .record(CompileError::module_not_found(name.to_dotted(), &span));
            return;
        };

        // SourceToAst: a parse failure ends this module's pipeline.
        let mut body = match self.parser.parse(&self.state.ast_ids, &file) {
            Ok(body) => body,
            Err(error) => {
                self.state.record(error);
                return;
            }
        };

        // TrackModule: register before typing so cycles terminate.
        let mut module = Module::new(name.clone(), file);

        // DefineModuleType: every module is a nominal object whose
        // prototype is the Module builtin.
        let prototype = self.state.types.builtins().module;
        module.module_type = self.state.types.alloc(TypeKind::Object(ObjectType::new(
            name.to_dotted(),
            Some(prototype),
        )));

        self.state.add_module(module);

        // Structural stage.
        passes::implicit_imports::insert(&mut self.state, name, &mut body);
        passes::collect_imports::run(&mut self.state, name, &mut body);

        // CompileImportedModules: recurse into anything not yet known.
        let imports = self
            .state
            .module(name)
            .map(|module| {
                module
                    .imports
                    .iter()
                    .map(|import| {
                        (QualifiedName::from_dotted(&import.qualified_path()), import.span.clone())
                    })
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        for (import, span) in imports {
            self.compile_module_at(&import, Some(span));
        }

        passes::implicit_imports::add_symbols(&mut self.state, name);
        passes::configure_module::run(&mut self.state, name, &mut body);
        passes::symbol_tables::run(&mut self.state, &body);
        passes::hoisting::run(&mut body);
        passes::desugar_object::run(&mut self.state, &mut body);
        passes::desugar_method::run(&mut self.state, &mut body);
        passes::rest_arguments::run(&mut self.state, &mut body);

        // Desugaring synthesized new bodies and defaults; refresh the
        // locals tables so those nodes have them too.
        passes::symbol_tables::run(&mut self.state, &body);

        // Semantic stage.
        passes::define_signatures::run(&mut self.state, name, &body);
        passes::import_types::run(&mut self.state, name);
        passes::implement_traits::run(&mut self.state, name, &body);
        passes::define_type::run(&mut self.state, name, &body);
        passes::validate_throw::run(&mut self.state, name, &body);
        passes::keyword_arguments::run(&mut self.state, &mut body);

        // Lowering is pointless once errors exist.
        if self.state.has_errors() {
            debug!("skipping lowering of {name}: errors were recorded");
            return;
        }

        let Some(mut code) = tir::generate::run(&mut self.state, name, &body) else {
            return;
        };

        tir::tail_call::run(&mut code);
        tir::dead_code::run(&mut self.state, &code);

        if let Some(module) = self.state.module_mut(name) {
            module.body = Some(code);
        }
    }

    /// Generates the serializable form of a compiled module
    pub fn generate(&mut self, name: &QualifiedName) -> Option<CompiledModule> {
        let module = self.state.module_mut(name)?;
        codegen::generate_module(module)
    }

    /// Generates every module that lowered successfully, in registration
    /// order
    pub fn generate_all(&mut self) -> Vec<(QualifiedName, CompiledModule)> {
        let names = self
            .state
            .modules
            .values()
            .map(|module| module.name.clone())
            .collect::<Vec<_>>();

        names
            .into_iter()
            .filter_map(|name| self.generate(&name).map(|compiled| (name, compiled)))
            .collect()
    }
}
