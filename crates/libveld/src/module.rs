//! Modules and qualified names.
//!
//! A [`Module`] represents one source file. It is registered in the compiler
//! state before its body is fully typed, so mutually recursive imports see a
//! partial module rather than recursing forever. The module owns its import
//! list, its globals table and, after lowering, its body
//! [`CodeObject`](crate::tir::CodeObject).

use std::path::{Path, PathBuf};

use crate::{
    ast::ImportAst,
    config::ModuleConfig,
    file::{SourceFile, VELD_LANG_EXT},
    span::Span,
    symbol::{SymbolTable, SymbolTableRef},
    tir::CodeObject,
    types::TypeLocation,
};

/// The qualified name of the implicit bootstrap module
pub static BOOTSTRAP_MODULE: &str = "std.bootstrap";
/// The qualified name of the implicit prelude module
pub static PRELUDE_MODULE: &str = "std.prelude";

/// An ordered sequence of identifier segments uniquely naming a module
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    segments: Vec<String>,
}

impl QualifiedName {
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }

    /// Parses a dotted name such as `std.string`
    pub fn from_dotted(name: &str) -> Self {
        Self {
            segments: name.split('.').map(|segment| segment.to_string()).collect(),
        }
    }

    /// Derives a qualified name from a source file path relative to a search
    /// directory, stripping the Veld extension
    pub fn from_relative_path(path: &Path) -> Self {
        let segments = path
            .with_extension("")
            .components()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect();

        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// The final segment, the module's short name
    pub fn name(&self) -> &str {
        self.segments
            .last()
            .map(|segment| segment.as_str())
            .unwrap_or("")
    }

    /// The dotted form, used as the registry key
    pub fn to_dotted(&self) -> String {
        self.segments.join(".")
    }

    /// The relative source path this name maps to
    pub fn to_source_path(&self) -> PathBuf {
        let mut path = PathBuf::from_iter(self.segments.iter());
        path.set_extension(VELD_LANG_EXT);
        path
    }
}

impl std::fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_dotted())
    }
}

/// A module: one source file and everything compiled out of it
#[derive(Debug)]
pub struct Module {
    /// The module's qualified name
    pub name: QualifiedName,
    /// The source file the module was parsed from
    pub file: SourceFile,
    /// Location of the module as a whole, used for module-level diagnostics
    pub span: Span,
    /// The module's nominal type in the type database
    pub module_type: TypeLocation,
    /// The imports collected out of the module body
    pub imports: Vec<ImportAst>,
    /// The module's globals: imported symbols, top-level constants, objects,
    /// traits and module methods
    pub globals: SymbolTableRef,
    /// The lowered module body, filled in by TIR generation
    pub body: Option<CodeObject>,
    /// Per-module compiler options
    pub config: ModuleConfig,
}

impl Module {
    pub fn new(name: QualifiedName, file: SourceFile) -> Self {
        let span = Span::synthesized(file.clone());

        Self {
            name,
            file,
            span,
            module_type: TypeLocation::UNDEFINED,
            imports: Vec::new(),
            globals: SymbolTable::new_ref(),
            body: None,
            config: ModuleConfig::new(),
        }
    }

    /// Whether the module registers itself in the runtime registry
    pub fn define_module(&self) -> bool {
        self.config.define_module()
    }

    /// Whether the implicit bootstrap import applies.
    ///
    /// The bootstrap module itself never imports bootstrap.
    pub fn import_bootstrap(&self) -> bool {
        self.name.to_dotted() != BOOTSTRAP_MODULE && self.config.import_bootstrap()
    }

    /// Whether the implicit prelude import applies.
    ///
    /// Neither the bootstrap module nor the prelude import the prelude.
    pub fn import_prelude(&self) -> bool {
        let dotted = self.name.to_dotted();

        dotted != BOOTSTRAP_MODULE && dotted != PRELUDE_MODULE && self.config.import_prelude()
    }

    /// The path of the bytecode file for this module, rooted at the target
    /// directory. The extension is chosen by the serializer.
    pub fn bytecode_path(&self, target: &Path, extension: &str) -> PathBuf {
        let mut path = target.join(PathBuf::from_iter(self.name.segments().iter()));
        path.set_extension(extension);
        path
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn module(name: &str) -> Module {
        Module::new(
            QualifiedName::from_dotted(name),
            SourceFile::new(vec!["test".into()], "".to_string()),
        )
    }

    #[test]
    fn qualified_names_round_trip_through_paths() {
        let name = QualifiedName::from_dotted("std.string");
        assert_eq!(name.to_source_path(), PathBuf::from("std/string.veld"));

        let back = QualifiedName::from_relative_path(Path::new("std/string.veld"));
        assert_eq!(back, name);
        assert_eq!(back.name(), "string");
    }

    #[test]
    fn bootstrap_and_prelude_skip_their_own_imports() {
        assert!(!module(BOOTSTRAP_MODULE).import_bootstrap());
        assert!(!module(BOOTSTRAP_MODULE).import_prelude());
        assert!(module(PRELUDE_MODULE).import_bootstrap());
        assert!(!module(PRELUDE_MODULE).import_prelude());
        assert!(module("main").import_bootstrap());
        assert!(module("main").import_prelude());
    }

    #[test]
    fn bytecode_paths_are_rooted_at_the_target() {
        let module = module("std.string");
        assert_eq!(
            module.bytecode_path(Path::new("build"), "veldb"),
            PathBuf::from("build/std/string.veldb")
        );
    }
}
