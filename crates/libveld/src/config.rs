//! Compiler and per-module configuration.
//!
//! [`Config`] carries the session-wide settings handed in by the driver:
//! source search paths, the bytecode target directory and linking hints.
//! [`ModuleConfig`] holds the per-module compiler options that pragmas can
//! toggle, such as opting out of the implicit bootstrap and prelude imports.

use std::path::PathBuf;

use indexmap::IndexMap;

/// Module option controlling the implicit `std.bootstrap` import
pub static OPTION_IMPORT_BOOTSTRAP: &str = "import_bootstrap";
/// Module option controlling the implicit `std.prelude` import
pub static OPTION_IMPORT_PRELUDE: &str = "import_prelude";
/// Module option controlling whether the module object is registered at runtime
pub static OPTION_DEFINE_MODULE: &str = "define_module";

/// Session-wide compiler configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directories searched when resolving a qualified name to a source file
    pub source_directories: Vec<PathBuf>,
    /// Directory the per-module bytecode files are written under
    pub target_directory: PathBuf,
    /// Optional target triple hint, forwarded to the serializer
    pub target: Option<String>,
    /// Prefer static linking of runtime modules
    pub static_linking: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_directories: vec![PathBuf::from(".")],
            target_directory: PathBuf::from("build"),
            target: None,
            static_linking: false,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory to the module search path
    pub fn add_source_directory(&mut self, directory: PathBuf) {
        self.source_directories.push(directory);
    }
}

/// Per-module compiler options, set through pragmas
#[derive(Debug, Clone, Default)]
pub struct ModuleConfig {
    options: IndexMap<String, bool>,
}

impl ModuleConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an option; returns `false` for unknown option names
    pub fn set(&mut self, name: &str, value: bool) -> bool {
        if name == OPTION_IMPORT_BOOTSTRAP
            || name == OPTION_IMPORT_PRELUDE
            || name == OPTION_DEFINE_MODULE
        {
            self.options.insert(name.to_string(), value);
            true
        } else {
            false
        }
    }

    fn get(&self, name: &str) -> bool {
        self.options.get(name).copied().unwrap_or(true)
    }

    /// Whether the implicit `std.bootstrap` import is inserted
    pub fn import_bootstrap(&self) -> bool {
        self.get(OPTION_IMPORT_BOOTSTRAP)
    }

    /// Whether the implicit `std.prelude` import is inserted
    pub fn import_prelude(&self) -> bool {
        self.get(OPTION_IMPORT_PRELUDE)
    }

    /// Whether the module registers itself in the runtime module registry
    pub fn define_module(&self) -> bool {
        self.get(OPTION_DEFINE_MODULE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn module_options_default_to_true() {
        let config = ModuleConfig::new();
        assert!(config.import_bootstrap());
        assert!(config.import_prelude());
        assert!(config.define_module());
    }

    #[test]
    fn known_options_can_be_disabled() {
        let mut config = ModuleConfig::new();
        assert!(config.set(OPTION_IMPORT_PRELUDE, false));
        assert!(!config.import_prelude());
        assert!(config.import_bootstrap());
    }

    #[test]
    fn unknown_options_are_rejected() {
        let mut config = ModuleConfig::new();
        assert!(!config.set("optimize_harder", true));
    }
}
