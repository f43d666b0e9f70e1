//! Import collection.
//!
//! Removes `Import` nodes from the module body and records them on the
//! module, so later passes see a body of plain expressions and the driver
//! can schedule the imported modules for compilation.

use crate::{
    ast::{BodyAst, ExpressionAst},
    module::QualifiedName,
    state::State,
};

pub fn run(state: &mut State, name: &QualifiedName, body: &mut BodyAst) {
    let mut imports = Vec::new();
    let mut rest = Vec::with_capacity(body.expressions.len());

    for expression in body.expressions.drain(..) {
        match expression {
            ExpressionAst::Import(import) => imports.push(*import),
            other => rest.push(other),
        }
    }

    body.expressions = rest;

    if let Some(module) = state.module_mut(name) {
        module.imports.append(&mut imports);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        ast::{ImportAst, IntLiteralAst},
        config::Config,
        file::SourceFile,
        module::Module,
        span::Span,
    };

    #[test]
    fn imports_move_from_the_body_to_the_module() {
        let mut state = State::new(Config::default());
        let name = QualifiedName::from_dotted("main");
        let file = SourceFile::new(vec!["main".into()], "".to_string());
        let span = Span::synthesized(file.clone());

        state.add_module(Module::new(name.clone(), file));

        let mut body = BodyAst::new(
            state.ast_ids.next(),
            span.clone(),
            vec![
                ExpressionAst::Import(Box::new(ImportAst {
                    index: state.ast_ids.next(),
                    span: span.clone(),
                    path: vec!["foo".to_string()],
                    symbols: Vec::new(),
                })),
                ExpressionAst::Int(IntLiteralAst {
                    index: state.ast_ids.next(),
                    span: span.clone(),
                    value: 1,
                }),
            ],
        );

        run(&mut state, &name, &mut body);

        assert_eq!(body.expressions.len(), 1);
        assert!(body.expressions[0].is_int());

        let module = state.module(&name).unwrap();
        assert_eq!(module.imports.len(), 1);
        assert_eq!(module.imports[0].qualified_path(), "foo");
    }
}
