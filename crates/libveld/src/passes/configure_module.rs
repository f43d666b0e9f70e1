//! Compiler-option pragmas.
//!
//! Removes `CompilerOption` nodes from the body and applies them to the
//! module config. Unknown option names are diagnostics; the known ones were
//! already applied by `InsertImplicitImports`, which needs the opt-outs
//! before this pass runs, so re-applying here is harmless.

use crate::{
    ast::{BodyAst, ExpressionAst},
    error::CompileError,
    module::QualifiedName,
    state::State,
};

pub fn run(state: &mut State, name: &QualifiedName, body: &mut BodyAst) {
    let mut options = Vec::new();
    let mut rest = Vec::with_capacity(body.expressions.len());

    for expression in body.expressions.drain(..) {
        match expression {
            ExpressionAst::CompilerOption(option) => options.push(*option),
            other => rest.push(other),
        }
    }

    body.expressions = rest;

    for option in options {
        let known = state
            .module_mut(name)
            .map(|module| module.config.set(&option.key, option.value))
            .unwrap_or(false);

        if !known {
            state.record(CompileError::unknown_compiler_option(
                option.key.clone(),
                &option.span,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::CompilerOptionAst, config::Config, file::SourceFile, module::Module, span::Span,
    };

    fn body_with_option(state: &mut State, key: &str) -> BodyAst {
        let file = SourceFile::new(vec!["main".into()], "".to_string());
        let span = Span::synthesized(file);

        BodyAst::new(
            state.ast_ids.next(),
            span.clone(),
            vec![ExpressionAst::CompilerOption(Box::new(CompilerOptionAst {
                index: state.ast_ids.next(),
                span,
                key: key.to_string(),
                value: false,
            }))],
        )
    }

    #[test]
    fn known_options_are_applied() {
        let mut state = State::new(Config::default());
        let name = QualifiedName::from_dotted("main");
        state.add_module(Module::new(
            name.clone(),
            SourceFile::new(vec!["main".into()], "".to_string()),
        ));

        let mut body = body_with_option(&mut state, "import_prelude");
        run(&mut state, &name, &mut body);

        assert!(body.expressions.is_empty());
        assert!(!state.module(&name).unwrap().import_prelude());
        assert!(state.diagnostics.is_empty());
    }

    #[test]
    fn unknown_options_are_reported() {
        let mut state = State::new(Config::default());
        let name = QualifiedName::from_dotted("main");
        state.add_module(Module::new(
            name.clone(),
            SourceFile::new(vec!["main".into()], "".to_string()),
        ));

        let mut body = body_with_option(&mut state, "optimize_harder");
        run(&mut state, &name, &mut body);

        assert!(state.diagnostics.iter().next().unwrap().is_unknown_compiler_option());
    }
}
