//! Implicit bootstrap and prelude imports.
//!
//! `insert` prepends `import std.bootstrap.*` and `import std.prelude.*`
//! unless the module opts out through its config pragmas (the bootstrap and
//! prelude modules themselves always opt out). `add_symbols` expands
//! `import a.b` without a symbol list into an import of the module itself;
//! running it twice equals running it once.

use log::debug;

use crate::{
    ast::{BodyAst, ExpressionAst, ImportAst, ImportSymbolAst, ImportSymbolKind},
    module::{QualifiedName, BOOTSTRAP_MODULE, PRELUDE_MODULE},
    span::Span,
    state::State,
};

/// Prepends the implicit imports to the module body.
///
/// Option pragmas are applied to the module config first, since the
/// opt-outs must be known before `ConfigureModule` runs later in the
/// pipeline.
pub fn insert(state: &mut State, name: &QualifiedName, body: &mut BodyAst) {
    apply_pragmas(state, name, body);

    let Some(module) = state.module(name) else { return };
    let file = module.file.clone();
    let import_bootstrap = module.import_bootstrap();
    let import_prelude = module.import_prelude();
    let mut prepended = Vec::new();

    if import_bootstrap && !imports_module(body, BOOTSTRAP_MODULE) {
        debug!("inserting bootstrap import into {name}");
        prepended.push(glob_import(state, BOOTSTRAP_MODULE, &file));
    }

    if import_prelude && !imports_module(body, PRELUDE_MODULE) {
        debug!("inserting prelude import into {name}");
        prepended.push(glob_import(state, PRELUDE_MODULE, &file));
    }

    if !prepended.is_empty() {
        prepended.append(&mut body.expressions);
        body.expressions = prepended;
    }
}

/// Expands imports without a symbol list into imports of the module itself
pub fn add_symbols(state: &mut State, name: &QualifiedName) {
    let ids = state.ast_ids.clone();
    let Some(module) = state.module_mut(name) else { return };

    for import in module.imports.iter_mut() {
        if import.has_symbols() {
            continue;
        }

        import.symbols.push(ImportSymbolAst {
            index: ids.next(),
            span: import.span.clone(),
            kind: ImportSymbolKind::SelfModule { alias: None },
        });
    }
}

fn apply_pragmas(state: &mut State, name: &QualifiedName, body: &BodyAst) {
    let options = body
        .expressions
        .iter()
        .filter_map(|expression| match expression {
            ExpressionAst::CompilerOption(option) => Some((option.key.clone(), option.value)),
            _ => None,
        })
        .collect::<Vec<_>>();

    if let Some(module) = state.module_mut(name) {
        for (key, value) in options {
            // Unknown keys are reported by ConfigureModule.
            module.config.set(&key, value);
        }
    }
}

fn imports_module(body: &BodyAst, path: &str) -> bool {
    body.expressions.iter().any(|expression| match expression {
        ExpressionAst::Import(import) => import.qualified_path() == path,
        _ => false,
    })
}

fn glob_import(state: &State, path: &str, file: &crate::file::SourceFile) -> ExpressionAst {
    let span = Span::synthesized(file.clone());

    ExpressionAst::Import(Box::new(ImportAst {
        index: state.ast_ids.next(),
        span: span.clone(),
        path: path.split('.').map(|segment| segment.to_string()).collect(),
        symbols: vec![ImportSymbolAst {
            index: state.ast_ids.next(),
            span,
            kind: ImportSymbolKind::Glob,
        }],
    }))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{config::Config, file::SourceFile, module::Module};

    fn setup(name: &str) -> (State, QualifiedName, BodyAst) {
        let mut state = State::new(Config::default());
        let qualified = QualifiedName::from_dotted(name);
        let file = SourceFile::new(
            qualified.segments().to_vec(),
            "".to_string(),
        );

        state.add_module(Module::new(qualified.clone(), file.clone()));

        let body = BodyAst::new(
            state.ast_ids.next(),
            Span::synthesized(file),
            Vec::new(),
        );

        (state, qualified, body)
    }

    fn imported_paths(body: &BodyAst) -> Vec<String> {
        body.expressions
            .iter()
            .filter_map(|expression| match expression {
                ExpressionAst::Import(import) => Some(import.qualified_path()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn ordinary_modules_get_bootstrap_and_prelude() {
        let (mut state, name, mut body) = setup("main");

        insert(&mut state, &name, &mut body);

        assert_eq!(
            imported_paths(&body),
            vec![BOOTSTRAP_MODULE.to_string(), PRELUDE_MODULE.to_string()]
        );
    }

    #[test]
    fn the_bootstrap_module_imports_nothing() {
        let (mut state, name, mut body) = setup(BOOTSTRAP_MODULE);

        insert(&mut state, &name, &mut body);

        assert!(body.expressions.is_empty());
    }

    #[test]
    fn the_prelude_module_imports_only_bootstrap() {
        let (mut state, name, mut body) = setup(PRELUDE_MODULE);

        insert(&mut state, &name, &mut body);

        assert_eq!(imported_paths(&body), vec![BOOTSTRAP_MODULE.to_string()]);
    }

    #[test]
    fn inserting_twice_adds_nothing_new() {
        let (mut state, name, mut body) = setup("main");

        insert(&mut state, &name, &mut body);
        insert(&mut state, &name, &mut body);

        assert_eq!(imported_paths(&body).len(), 2);
    }

    #[test]
    fn add_symbols_is_idempotent() {
        let (mut state, name, _) = setup("main");
        let span = Span::synthesized(SourceFile::new(vec!["main".into()], "".to_string()));

        let index = state.ast_ids.next();
        state.module_mut(&name).unwrap().imports.push(ImportAst {
            index,
            span,
            path: vec!["foo".to_string()],
            symbols: Vec::new(),
        });

        add_symbols(&mut state, &name);
        add_symbols(&mut state, &name);

        let module = state.module(&name).unwrap();
        assert_eq!(module.imports[0].symbols.len(), 1);
        assert!(module.imports[0].symbols[0].kind.is_self_module());
    }
}
