//! Import type binding.
//!
//! For every resolved import, binds the imported symbols' types as globals
//! of the importing module. Self imports bind the source module's type
//! under the module's short name (or alias); glob imports bind every global
//! the source module has defined so far, silently skipping names the
//! importer already binds.
//!
//! A module participating in an import cycle may be only partially defined
//! at this point; symbols it has not defined yet are reported as unknown.

use log::debug;

use crate::{
    ast::ImportSymbolKind,
    error::CompileError,
    module::QualifiedName,
    span::Span,
    state::State,
    types::TypeLocation,
};

struct Binding {
    name: String,
    value_type: TypeLocation,
    span: Span,
}

pub fn run(state: &mut State, name: &QualifiedName) {
    let Some(module) = state.module(name) else { return };
    let imports = module.imports.clone();
    let globals = module.globals.clone();

    for import in imports {
        let source_name = import.qualified_path();

        let Some(source) = state.modules.get(&source_name) else {
            // A missing module was reported when it failed to compile.
            continue;
        };

        let source_type = source.module_type;
        let source_globals = source.globals.clone();
        let mut bindings = Vec::new();

        for symbol in import.symbols.iter() {
            match &symbol.kind {
                ImportSymbolKind::Symbol { name: exported, alias } => {
                    let found = source_globals.borrow().lookup(exported);

                    match found {
                        Some(found) => bindings.push(Binding {
                            name: alias.clone().unwrap_or_else(|| exported.clone()),
                            value_type: found.value_type,
                            span: symbol.span.clone(),
                        }),
                        None => state.record(CompileError::unknown_import_symbol(
                            exported.clone(),
                            source_name.clone(),
                            &symbol.span,
                        )),
                    }
                }
                ImportSymbolKind::SelfModule { alias } => bindings.push(Binding {
                    name: alias
                        .clone()
                        .unwrap_or_else(|| import.module_name().to_string()),
                    value_type: source_type,
                    span: symbol.span.clone(),
                }),
                ImportSymbolKind::Glob => {
                    let exported = source_globals.borrow();

                    for found in exported.symbols() {
                        if globals.borrow().defines(&found.name) {
                            continue;
                        }

                        bindings.push(Binding {
                            name: found.name.clone(),
                            value_type: found.value_type,
                            span: symbol.span.clone(),
                        });
                    }
                }
            }
        }

        debug!("binding {} imported symbols from {}", bindings.len(), source_name);

        for binding in bindings {
            let existing_span = globals
                .borrow()
                .lookup(&binding.name)
                .and_then(|existing| existing.span.clone());

            if let Some(existing) = existing_span {
                state.record(CompileError::duplicate_import_symbol(
                    binding.name,
                    existing.to_range(),
                    &binding.span,
                ));
                continue;
            }

            globals
                .borrow_mut()
                .define(binding.name, binding.value_type, false, Some(binding.span))
                .ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        ast::{ImportAst, ImportSymbolAst},
        config::Config,
        file::SourceFile,
        module::Module,
        types::{ObjectType, TypeKind},
    };

    fn module(state: &mut State, name: &str) -> QualifiedName {
        let qualified = QualifiedName::from_dotted(name);
        let file = SourceFile::new(qualified.segments().to_vec(), "".to_string());

        let mut module = Module::new(qualified.clone(), file);
        module.module_type = state
            .types
            .alloc(TypeKind::Object(ObjectType::new(name.to_string(), None)));
        state.add_module(module);

        qualified
    }

    fn span() -> Span {
        Span::new(0..6, SourceFile::new(vec!["main".into()], "import".to_string()))
    }

    fn import(state: &mut State, main: &QualifiedName, path: &str, kind: ImportSymbolKind) {
        let symbols = vec![ImportSymbolAst {
            index: state.ast_ids.next(),
            span: span(),
            kind,
        }];

        let node = ImportAst {
            index: state.ast_ids.next(),
            span: span(),
            path: path.split('.').map(|segment| segment.to_string()).collect(),
            symbols,
        };

        state.module_mut(main).unwrap().imports.push(node);
    }

    #[test]
    fn named_symbols_bind_with_their_source_type() {
        let mut state = State::new(Config::default());
        let main = module(&mut state, "main");
        let foo = module(&mut state, "foo");
        let integer = state.types.builtins().integer;

        state
            .module(&foo)
            .unwrap()
            .globals
            .borrow_mut()
            .define("answer".to_string(), integer, false, Some(span()))
            .unwrap();

        import(
            &mut state,
            &main,
            "foo",
            ImportSymbolKind::Symbol { name: "answer".to_string(), alias: None },
        );
        run(&mut state, &main);

        let bound = state
            .module(&main)
            .unwrap()
            .globals
            .borrow()
            .lookup("answer")
            .unwrap();
        assert_eq!(bound.value_type, integer);
        assert!(state.diagnostics.is_empty());
    }

    #[test]
    fn unknown_symbols_are_reported() {
        let mut state = State::new(Config::default());
        let main = module(&mut state, "main");
        module(&mut state, "foo");

        import(
            &mut state,
            &main,
            "foo",
            ImportSymbolKind::Symbol { name: "missing".to_string(), alias: None },
        );
        run(&mut state, &main);

        assert!(state
            .diagnostics
            .iter()
            .any(|error| error.is_unknown_import_symbol()));
    }

    #[test]
    fn duplicate_imports_are_reported() {
        let mut state = State::new(Config::default());
        let main = module(&mut state, "main");
        let foo = module(&mut state, "foo");
        let integer = state.types.builtins().integer;

        state
            .module(&foo)
            .unwrap()
            .globals
            .borrow_mut()
            .define("answer".to_string(), integer, false, Some(span()))
            .unwrap();

        for _ in 0..2 {
            import(
                &mut state,
                &main,
                "foo",
                ImportSymbolKind::Symbol { name: "answer".to_string(), alias: None },
            );
        }
        run(&mut state, &main);

        assert!(state
            .diagnostics
            .iter()
            .any(|error| error.is_duplicate_import_symbol()));
    }

    #[test]
    fn self_imports_bind_the_module_type() {
        let mut state = State::new(Config::default());
        let main = module(&mut state, "main");
        let foo = module(&mut state, "std.foo");
        let foo_type = state.module(&foo).unwrap().module_type;

        import(&mut state, &main, "std.foo", ImportSymbolKind::SelfModule { alias: None });
        run(&mut state, &main);

        let bound = state
            .module(&main)
            .unwrap()
            .globals
            .borrow()
            .lookup("foo")
            .unwrap();
        assert_eq!(bound.value_type, foo_type);
    }

    #[test]
    fn glob_imports_bind_everything_defined_so_far() {
        let mut state = State::new(Config::default());
        let main = module(&mut state, "main");
        let foo = module(&mut state, "foo");
        let integer = state.types.builtins().integer;
        let string = state.types.builtins().string;

        {
            let globals = state.module(&foo).unwrap().globals.clone();
            let mut globals = globals.borrow_mut();
            globals.define("a".to_string(), integer, false, Some(span())).unwrap();
            globals.define("b".to_string(), string, false, Some(span())).unwrap();
        }

        import(&mut state, &main, "foo", ImportSymbolKind::Glob);
        run(&mut state, &main);

        let globals = state.module(&main).unwrap().globals.clone();
        let globals = globals.borrow();
        assert_eq!(globals.lookup("a").unwrap().value_type, integer);
        assert_eq!(globals.lookup("b").unwrap().value_type, string);
    }
}
