//! Veld Language Compiler Executable
//!
//! Thin driver around `libveld`: reads source files from the configured
//! search directories, runs the compilation pipeline for the requested
//! root module, prints any diagnostics and exits non-zero when errors
//! were recorded (warnings do not affect the exit status).
//!
//! The surface parser plugs in through `libveld`'s `Parser` trait; this
//! binary wires in the prebuilt-AST stub, which is enough to exercise the
//! module, import and code generation machinery end to end.

use std::{path::PathBuf, process::exit};

use libveld::{
    compiler::Compiler,
    config::Config,
    diagnostics::{CodeSpanReportGenerator, ReportGenerator},
    file::{SourceFile, VELD_LANG_EXT},
    module::QualifiedName,
    source::{PrebuiltParser, SourceProvider},
    state::State,
};
use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelPadding, TermLogger, TerminalMode,
    ThreadLogMode,
};

/// Source loading backed by the configured search directories
struct FileSystemSources;

impl SourceProvider for FileSystemSources {
    fn load(&mut self, config: &Config, name: &QualifiedName) -> Option<SourceFile> {
        for directory in config.source_directories.iter() {
            let path = directory.join(name.to_source_path());

            if let Ok(code) = std::fs::read_to_string(&path) {
                return Some(SourceFile::new(name.segments().to_vec(), code));
            }
        }

        None
    }
}

fn main() {
    let log_config = ConfigBuilder::new()
        .set_location_level(LevelFilter::Error)
        .set_thread_mode(ThreadLogMode::Both)
        .set_level_padding(LevelPadding::Off)
        .set_thread_level(LevelFilter::Off)
        .build();
    CombinedLogger::init(vec![TermLogger::new(
        LevelFilter::Error,
        log_config,
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )])
    .unwrap();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} module [source-directory ...]", args[0]);
        exit(1);
    }

    let mut config = Config::default();

    for directory in &args[2..] {
        config.add_source_directory(PathBuf::from(directory));
    }

    // The root module may be given as a path or a dotted name.
    let root = args[1]
        .strip_suffix(&format!(".{VELD_LANG_EXT}"))
        .unwrap_or(&args[1])
        .replace('/', ".");
    let root = QualifiedName::from_dotted(&root);

    let state = State::new(config);
    let mut compiler = Compiler::new(
        state,
        Box::new(FileSystemSources),
        Box::new(PrebuiltParser::new()),
    );

    let ok = compiler.compile_main(&root);

    if !compiler.state.diagnostics.is_empty() {
        CodeSpanReportGenerator::generate(&compiler.state.diagnostics);
    }

    if !ok {
        exit(1);
    }

    let compiled = compiler.generate_all();
    println!("compiled {} module(s)", compiled.len());
}
