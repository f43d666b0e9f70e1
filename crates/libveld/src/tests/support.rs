//! Test support: an AST builder and a compiler harness.
//!
//! The parser is an external collaborator, so tests construct module
//! bodies directly. `AstBuilder` shares the node-id allocator with the
//! compiler state, and `TestCompiler` wires the in-memory source and
//! parser stubs together.

use crate::{
    ast::*,
    compiler::Compiler,
    config::Config,
    file::SourceFile,
    module::QualifiedName,
    source::{MemorySources, PrebuiltParser},
    span::Span,
    state::State,
};

/// Builds AST nodes for one module
pub struct AstBuilder {
    ids: AstIds,
    file: SourceFile,
}

impl AstBuilder {
    pub fn new(ids: AstIds, module: &str) -> Self {
        let segments = module
            .split('.')
            .map(|segment| segment.to_string())
            .collect::<Vec<_>>();

        Self {
            ids,
            file: SourceFile::new(segments, format!("<test module {module}>")),
        }
    }

    pub fn span(&self) -> Span {
        Span::synthesized(self.file.clone())
    }

    pub fn body(&self, expressions: Vec<ExpressionAst>) -> BodyAst {
        BodyAst::new(self.ids.next(), self.span(), expressions)
    }

    pub fn int(&self, value: i64) -> ExpressionAst {
        ExpressionAst::Int(IntLiteralAst { index: self.ids.next(), span: self.span(), value })
    }

    pub fn string(&self, value: &str) -> ExpressionAst {
        ExpressionAst::Str(StringLiteralAst {
            index: self.ids.next(),
            span: self.span(),
            value: value.to_string(),
        })
    }

    pub fn ident(&self, name: &str) -> ExpressionAst {
        ExpressionAst::Identifier(IdentifierAst {
            index: self.ids.next(),
            span: self.span(),
            name: name.to_string(),
        })
    }

    pub fn constant(&self, name: &str) -> ExpressionAst {
        ExpressionAst::Constant(ConstantAst {
            index: self.ids.next(),
            span: self.span(),
            name: name.to_string(),
        })
    }

    pub fn let_local(&self, name: &str, value: ExpressionAst) -> ExpressionAst {
        ExpressionAst::DefineVariable(Box::new(DefineVariableAst {
            index: self.ids.next(),
            span: self.span(),
            target: DefineTarget::Local { name: name.to_string(), mutable: false },
            annotation: None,
            value: Box::new(value),
        }))
    }

    pub fn send(
        &self,
        receiver: Option<ExpressionAst>,
        name: &str,
        arguments: Vec<ExpressionAst>,
    ) -> ExpressionAst {
        ExpressionAst::Send(Box::new(SendAst {
            index: self.ids.next(),
            span: self.span(),
            receiver: receiver.map(Box::new),
            name: name.to_string(),
            type_arguments: Vec::new(),
            arguments: arguments
                .into_iter()
                .map(|value| SendArgumentAst {
                    index: self.ids.next(),
                    span: self.span(),
                    keyword: None,
                    value,
                })
                .collect(),
        }))
    }

    pub fn named_type(&self, name: &str) -> TypeNameAst {
        TypeNameAst::Named(NamedTypeAst {
            index: self.ids.next(),
            span: self.span(),
            segments: name.split('.').map(|segment| segment.to_string()).collect(),
            type_arguments: Vec::new(),
            optional: false,
        })
    }

    pub fn closure_type(&self, arguments: Vec<TypeNameAst>, returns: TypeNameAst) -> TypeNameAst {
        TypeNameAst::Block(BlockTypeAst {
            index: self.ids.next(),
            span: self.span(),
            kind: BlockLiteralKind::Closure,
            arguments,
            return_type: Some(Box::new(returns)),
            throw_type: None,
            optional: false,
        })
    }

    pub fn argument(&self, name: &str, annotation: Option<TypeNameAst>) -> DefineArgumentAst {
        DefineArgumentAst {
            index: self.ids.next(),
            span: self.span(),
            name: name.to_string(),
            annotation,
            default: None,
            rest: false,
        }
    }

    pub fn rest_argument(&self, name: &str, annotation: Option<TypeNameAst>) -> DefineArgumentAst {
        DefineArgumentAst {
            index: self.ids.next(),
            span: self.span(),
            name: name.to_string(),
            annotation,
            default: None,
            rest: true,
        }
    }

    pub fn method(
        &self,
        name: &str,
        arguments: Vec<DefineArgumentAst>,
        returns: Option<TypeNameAst>,
        throws: Option<TypeNameAst>,
        body: Vec<ExpressionAst>,
    ) -> ExpressionAst {
        ExpressionAst::Method(Box::new(MethodAst {
            index: self.ids.next(),
            span: self.span(),
            name: name.to_string(),
            type_parameters: Vec::new(),
            arguments,
            return_annotation: returns,
            throw_annotation: throws,
            method_bounds: Vec::new(),
            body: Some(self.body(body)),
        }))
    }

    pub fn required_method(
        &self,
        name: &str,
        arguments: Vec<DefineArgumentAst>,
        returns: Option<TypeNameAst>,
    ) -> ExpressionAst {
        ExpressionAst::Method(Box::new(MethodAst {
            index: self.ids.next(),
            span: self.span(),
            name: name.to_string(),
            type_parameters: Vec::new(),
            arguments,
            return_annotation: returns,
            throw_annotation: None,
            method_bounds: Vec::new(),
            body: None,
        }))
    }

    pub fn closure(
        &self,
        arguments: Vec<DefineArgumentAst>,
        body: Vec<ExpressionAst>,
    ) -> ExpressionAst {
        ExpressionAst::Block(Box::new(BlockAst {
            index: self.ids.next(),
            span: self.span(),
            kind: BlockLiteralKind::Closure,
            arguments,
            return_annotation: None,
            throw_annotation: None,
            body: self.body(body),
        }))
    }

    pub fn object(&self, name: &str, body: Vec<ExpressionAst>) -> ExpressionAst {
        ExpressionAst::Object(Box::new(ObjectAst {
            index: self.ids.next(),
            span: self.span(),
            name: name.to_string(),
            type_parameters: Vec::new(),
            body: self.body(body),
        }))
    }

    pub fn trait_declaration(&self, name: &str, body: Vec<ExpressionAst>) -> ExpressionAst {
        ExpressionAst::Trait(Box::new(TraitAst {
            index: self.ids.next(),
            span: self.span(),
            name: name.to_string(),
            type_parameters: Vec::new(),
            required_traits: Vec::new(),
            body: self.body(body),
        }))
    }

    pub fn implement(
        &self,
        trait_name: &str,
        object_name: &str,
        body: Vec<ExpressionAst>,
    ) -> ExpressionAst {
        ExpressionAst::TraitImplementation(Box::new(TraitImplementationAst {
            index: self.ids.next(),
            span: self.span(),
            trait_name: self.named_type(trait_name),
            object_name: self.named_type(object_name),
            body: self.body(body),
        }))
    }

    pub fn reopen(&self, name: &str, body: Vec<ExpressionAst>) -> ExpressionAst {
        ExpressionAst::ReopenObject(Box::new(ReopenObjectAst {
            index: self.ids.next(),
            span: self.span(),
            name: self.named_type(name),
            body: self.body(body),
        }))
    }

    pub fn import(&self, path: &str, symbols: &[&str]) -> ExpressionAst {
        ExpressionAst::Import(Box::new(ImportAst {
            index: self.ids.next(),
            span: self.span(),
            path: path.split('.').map(|segment| segment.to_string()).collect(),
            symbols: symbols
                .iter()
                .map(|name| ImportSymbolAst {
                    index: self.ids.next(),
                    span: self.span(),
                    kind: ImportSymbolKind::Symbol { name: name.to_string(), alias: None },
                })
                .collect(),
        }))
    }

    pub fn throw(&self, value: ExpressionAst) -> ExpressionAst {
        ExpressionAst::Throw(Box::new(ThrowAst {
            index: self.ids.next(),
            span: self.span(),
            value: Box::new(value),
        }))
    }

    pub fn try_else(
        &self,
        expression: ExpressionAst,
        argument: Option<&str>,
        else_body: Vec<ExpressionAst>,
    ) -> ExpressionAst {
        ExpressionAst::Try(Box::new(TryAst {
            index: self.ids.next(),
            span: self.span(),
            expression: Box::new(expression),
            else_argument: argument.map(|name| TryElseArgumentAst {
                index: self.ids.next(),
                span: self.span(),
                name: name.to_string(),
            }),
            else_body: Some(self.body(else_body)),
        }))
    }

    pub fn bare_try(&self, expression: ExpressionAst) -> ExpressionAst {
        ExpressionAst::Try(Box::new(TryAst {
            index: self.ids.next(),
            span: self.span(),
            expression: Box::new(expression),
            else_argument: None,
            else_body: None,
        }))
    }

    /// A minimal `+` on Integer, standing in for the bootstrap arithmetic
    pub fn integer_plus(&self) -> ExpressionAst {
        self.reopen(
            "Integer",
            vec![self.method(
                "+",
                vec![self.argument("other", Some(self.named_type("Integer")))],
                Some(self.named_type("Integer")),
                None,
                vec![self.ident("other")],
            )],
        )
    }

    /// A minimal `length` on Array, standing in for the bootstrap one
    pub fn array_length(&self) -> ExpressionAst {
        self.reopen(
            "Array",
            vec![self.method(
                "length",
                Vec::new(),
                Some(self.named_type("Integer")),
                None,
                vec![self.int(0)],
            )],
        )
    }
}

/// Wires the in-memory stubs to a compiler instance
pub struct TestCompiler {
    ids: AstIds,
    sources: MemorySources,
    parser: PrebuiltParser,
}

impl TestCompiler {
    pub fn new() -> Self {
        let mut sources = MemorySources::new();

        // The implicit imports must resolve; their bodies stay empty.
        sources.add("std.bootstrap", "");
        sources.add("std.prelude", "");

        Self {
            ids: AstIds::new(),
            sources,
            parser: PrebuiltParser::new(),
        }
    }

    /// A builder sharing this compiler's node-id allocator
    pub fn builder(&self, module: &str) -> AstBuilder {
        AstBuilder::new(self.ids.clone(), module)
    }

    /// Registers a module's body
    pub fn add(&mut self, module: &str, body: BodyAst) {
        self.sources.add(module, &format!("<test module {module}>"));
        self.parser.add(module, body);
    }

    /// Compiles the root module and returns the compiler for inspection
    pub fn compile(self, root: &str) -> Compiler {
        let state = State::with_ast_ids(Config::default(), self.ids);
        let mut compiler = Compiler::new(state, Box::new(self.sources), Box::new(self.parser));

        compiler.compile_main(&QualifiedName::from_dotted(root));
        compiler
    }
}

/// The lowered body of a compiled module
pub fn module_body<'a>(
    compiler: &'a Compiler,
    name: &str,
) -> Option<&'a crate::tir::CodeObject> {
    compiler
        .state
        .module(&QualifiedName::from_dotted(name))?
        .body
        .as_ref()
}

/// All diagnostics rendered to their messages, for assertions
pub fn messages(compiler: &Compiler) -> Vec<String> {
    compiler
        .state
        .diagnostics
        .iter()
        .map(|error| error.to_string())
        .collect()
}
