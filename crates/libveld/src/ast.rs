//! Abstract Syntax Tree definitions for the Veld language.
//!
//! The tree shape is produced by the (external) parser, rewritten by the
//! structural passes (import collection, hoisting, desugaring) and frozen
//! afterwards. Semantic passes never mutate nodes: resolved types, symbols
//! and depths live in side tables on the compiler state, keyed by each
//! node's [`AstIndex`].
//!
//! Naming follows the convention of one `*Ast` struct per construct, with
//! [`ExpressionAst`] as the sum of everything that can appear in a body.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use strum_macros::EnumIs;

use crate::span::Span;

/// Unique identifier of an AST node within one compilation session
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AstIndex(pub usize);

/// Allocator handing out unique [`AstIndex`] values.
///
/// The parser and the desugaring passes share one allocator per session so
/// synthesized nodes can never collide with parsed ones.
#[derive(Debug, Clone, Default)]
pub struct AstIds(Arc<AtomicUsize>);

impl AstIds {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self) -> AstIndex {
        AstIndex(self.0.fetch_add(1, Ordering::SeqCst))
    }
}

/// A sequence of expressions: a module body, method body, closure body or
/// the body of an `object`/`trait`/`impl` declaration
#[derive(Debug, Clone)]
pub struct BodyAst {
    pub index: AstIndex,
    pub span: Span,
    pub expressions: Vec<ExpressionAst>,
}

impl BodyAst {
    pub fn new(index: AstIndex, span: Span, expressions: Vec<ExpressionAst>) -> Self {
        Self {
            index,
            span,
            expressions,
        }
    }

    /// The last expression of the body, if any
    pub fn last_expression(&self) -> Option<&ExpressionAst> {
        self.expressions.last()
    }
}

/// An integer literal
#[derive(Debug, Clone)]
pub struct IntLiteralAst {
    pub index: AstIndex,
    pub span: Span,
    pub value: i64,
}

/// A float literal
#[derive(Debug, Clone)]
pub struct FloatLiteralAst {
    pub index: AstIndex,
    pub span: Span,
    pub value: f64,
}

/// A string literal
#[derive(Debug, Clone)]
pub struct StringLiteralAst {
    pub index: AstIndex,
    pub span: Span,
    pub value: String,
}

/// A reference to a local, a self method or a module method
#[derive(Debug, Clone)]
pub struct IdentifierAst {
    pub index: AstIndex,
    pub span: Span,
    pub name: String,
}

/// A reference to a constant (capitalized name)
#[derive(Debug, Clone)]
pub struct ConstantAst {
    pub index: AstIndex,
    pub span: Span,
    pub name: String,
}

/// A read of an attribute of `self` (`@name`)
#[derive(Debug, Clone)]
pub struct AttributeAst {
    pub index: AstIndex,
    pub span: Span,
    pub name: String,
}

/// The `self` expression
#[derive(Debug, Clone)]
pub struct SelfAst {
    pub index: AstIndex,
    pub span: Span,
}

/// What a `let` binds to
#[derive(Debug, Clone, EnumIs)]
pub enum DefineTarget {
    /// A local variable, optionally mutable
    Local { name: String, mutable: bool },
    /// An attribute of `self` (`@name`)
    Attribute { name: String },
    /// A constant (capitalized name)
    Constant { name: String },
}

impl DefineTarget {
    pub fn name(&self) -> &str {
        match self {
            DefineTarget::Local { name, .. } => name,
            DefineTarget::Attribute { name } => name,
            DefineTarget::Constant { name } => name,
        }
    }
}

/// A `let` definition of a local, attribute or constant
#[derive(Debug, Clone)]
pub struct DefineVariableAst {
    pub index: AstIndex,
    pub span: Span,
    pub target: DefineTarget,
    pub annotation: Option<TypeNameAst>,
    pub value: Box<ExpressionAst>,
}

/// What a reassignment writes to
#[derive(Debug, Clone)]
pub enum ReassignTarget {
    Local { name: String },
    Attribute { name: String },
}

impl ReassignTarget {
    pub fn name(&self) -> &str {
        match self {
            ReassignTarget::Local { name } => name,
            ReassignTarget::Attribute { name } => name,
        }
    }
}

/// A reassignment of an existing local or attribute
#[derive(Debug, Clone)]
pub struct ReassignAst {
    pub index: AstIndex,
    pub span: Span,
    pub target: ReassignTarget,
    pub value: Box<ExpressionAst>,
}

/// One declared argument of a method, closure or lambda
#[derive(Debug, Clone)]
pub struct DefineArgumentAst {
    pub index: AstIndex,
    pub span: Span,
    pub name: String,
    pub annotation: Option<TypeNameAst>,
    pub default: Option<Box<ExpressionAst>>,
    pub rest: bool,
}

/// A declared type parameter with its required traits
#[derive(Debug, Clone)]
pub struct TypeParameterAst {
    pub index: AstIndex,
    pub span: Span,
    pub name: String,
    pub required_traits: Vec<TypeNameAst>,
}

/// An additional trait requirement a method places on one of the self
/// type's type parameters
#[derive(Debug, Clone)]
pub struct MethodBoundAst {
    pub index: AstIndex,
    pub span: Span,
    pub parameter: String,
    pub required_traits: Vec<TypeNameAst>,
}

/// A method declaration.
///
/// Required trait methods have no body. The return annotation is optional;
/// desugaring fills in `Nil` when it is absent.
#[derive(Debug, Clone)]
pub struct MethodAst {
    pub index: AstIndex,
    pub span: Span,
    pub name: String,
    pub type_parameters: Vec<TypeParameterAst>,
    pub arguments: Vec<DefineArgumentAst>,
    pub return_annotation: Option<TypeNameAst>,
    pub throw_annotation: Option<TypeNameAst>,
    pub method_bounds: Vec<MethodBoundAst>,
    pub body: Option<BodyAst>,
}

/// What kind of block literal a [`BlockAst`] is
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BlockLiteralKind {
    /// `fn (...) { ... }`: captures the lexical scope, `self` is inherited
    Closure,
    /// `lambda (...) { ... }`: `self` is the module
    Lambda,
}

/// A closure or lambda literal
#[derive(Debug, Clone)]
pub struct BlockAst {
    pub index: AstIndex,
    pub span: Span,
    pub kind: BlockLiteralKind,
    pub arguments: Vec<DefineArgumentAst>,
    pub return_annotation: Option<TypeNameAst>,
    pub throw_annotation: Option<TypeNameAst>,
    pub body: BodyAst,
}

/// One argument at a call site, positional or keyword
#[derive(Debug, Clone)]
pub struct SendArgumentAst {
    pub index: AstIndex,
    pub span: Span,
    pub keyword: Option<String>,
    pub value: ExpressionAst,
}

/// A message send
#[derive(Debug, Clone)]
pub struct SendAst {
    pub index: AstIndex,
    pub span: Span,
    /// The receiver; `None` sends to `self` or the module
    pub receiver: Option<Box<ExpressionAst>>,
    pub name: String,
    pub type_arguments: Vec<TypeNameAst>,
    pub arguments: Vec<SendArgumentAst>,
}

/// A `return`, with an optional value
#[derive(Debug, Clone)]
pub struct ReturnAst {
    pub index: AstIndex,
    pub span: Span,
    pub value: Option<Box<ExpressionAst>>,
    /// True when desugaring appended this node rather than the programmer
    pub implicit: bool,
}

/// A `throw`
#[derive(Debug, Clone)]
pub struct ThrowAst {
    pub index: AstIndex,
    pub span: Span,
    pub value: Box<ExpressionAst>,
}

/// The bound argument of a `try ... else (error) { ... }` handler
#[derive(Debug, Clone)]
pub struct TryElseArgumentAst {
    pub index: AstIndex,
    pub span: Span,
    pub name: String,
}

/// A `try` expression with an optional else handler
#[derive(Debug, Clone)]
pub struct TryAst {
    pub index: AstIndex,
    pub span: Span,
    pub expression: Box<ExpressionAst>,
    pub else_argument: Option<TryElseArgumentAst>,
    pub else_body: Option<BodyAst>,
}

impl TryAst {
    pub fn has_else(&self) -> bool {
        self.else_body.is_some()
    }

    pub fn empty_else(&self) -> bool {
        self.else_body
            .as_ref()
            .map(|body| body.expressions.is_empty())
            .unwrap_or(true)
    }
}

/// An `object` declaration
#[derive(Debug, Clone)]
pub struct ObjectAst {
    pub index: AstIndex,
    pub span: Span,
    pub name: String,
    pub type_parameters: Vec<TypeParameterAst>,
    pub body: BodyAst,
}

/// A `trait` declaration
#[derive(Debug, Clone)]
pub struct TraitAst {
    pub index: AstIndex,
    pub span: Span,
    pub name: String,
    pub type_parameters: Vec<TypeParameterAst>,
    pub required_traits: Vec<TypeNameAst>,
    pub body: BodyAst,
}

/// An `impl Trait for Type` declaration
#[derive(Debug, Clone)]
pub struct TraitImplementationAst {
    pub index: AstIndex,
    pub span: Span,
    pub trait_name: TypeNameAst,
    pub object_name: TypeNameAst,
    pub body: BodyAst,
}

/// An `impl Type` reopening declaration
#[derive(Debug, Clone)]
pub struct ReopenObjectAst {
    pub index: AstIndex,
    pub span: Span,
    pub name: TypeNameAst,
    pub body: BodyAst,
}

/// One symbol listed in an import
#[derive(Debug, Clone, EnumIs)]
pub enum ImportSymbolKind {
    /// `import a.b (x as y)`: a named symbol with an optional alias
    Symbol { name: String, alias: Option<String> },
    /// `import a.b (self)`: the module itself
    SelfModule { alias: Option<String> },
    /// `import a.b.*`: every exported symbol
    Glob,
}

/// A symbol (or glob, or self) requested by an import
#[derive(Debug, Clone)]
pub struct ImportSymbolAst {
    pub index: AstIndex,
    pub span: Span,
    pub kind: ImportSymbolKind,
}

impl ImportSymbolAst {
    /// The name this symbol binds to in the importing module
    pub fn binding_name(&self, module_name: &str) -> Option<String> {
        match &self.kind {
            ImportSymbolKind::Symbol { name, alias } => {
                Some(alias.clone().unwrap_or_else(|| name.clone()))
            }
            ImportSymbolKind::SelfModule { alias } => {
                Some(alias.clone().unwrap_or_else(|| module_name.to_string()))
            }
            ImportSymbolKind::Glob => None,
        }
    }
}

/// An `import` statement
#[derive(Debug, Clone)]
pub struct ImportAst {
    pub index: AstIndex,
    pub span: Span,
    /// The dotted module path being imported
    pub path: Vec<String>,
    pub symbols: Vec<ImportSymbolAst>,
}

impl ImportAst {
    pub fn qualified_path(&self) -> String {
        self.path.join(".")
    }

    /// The last path segment, the default binding name for self imports
    pub fn module_name(&self) -> &str {
        self.path.last().map(|segment| segment.as_str()).unwrap_or("")
    }

    pub fn has_symbols(&self) -> bool {
        !self.symbols.is_empty()
    }
}

/// A type annotation
#[derive(Debug, Clone)]
pub enum TypeNameAst {
    /// A named, possibly generic, possibly optional type (`?List[Int]`)
    Named(NamedTypeAst),
    /// A block type (`fn (Int) -> Int throws Error`)
    Block(BlockTypeAst),
    /// The `Self` type
    SelfType(SelfTypeAst),
}

impl TypeNameAst {
    pub fn span(&self) -> &Span {
        match self {
            TypeNameAst::Named(named) => &named.span,
            TypeNameAst::Block(block) => &block.span,
            TypeNameAst::SelfType(self_type) => &self_type.span,
        }
    }

    pub fn index(&self) -> AstIndex {
        match self {
            TypeNameAst::Named(named) => named.index,
            TypeNameAst::Block(block) => block.index,
            TypeNameAst::SelfType(self_type) => self_type.index,
        }
    }
}

/// A named type annotation, optionally qualified and optionally generic
#[derive(Debug, Clone)]
pub struct NamedTypeAst {
    pub index: AstIndex,
    pub span: Span,
    /// The dotted name segments (`std.string.String`)
    pub segments: Vec<String>,
    pub type_arguments: Vec<TypeNameAst>,
    pub optional: bool,
}

impl NamedTypeAst {
    pub fn qualified_name(&self) -> String {
        self.segments.join(".")
    }
}

/// A block type annotation
#[derive(Debug, Clone)]
pub struct BlockTypeAst {
    pub index: AstIndex,
    pub span: Span,
    pub kind: BlockLiteralKind,
    pub arguments: Vec<TypeNameAst>,
    pub return_type: Option<Box<TypeNameAst>>,
    pub throw_type: Option<Box<TypeNameAst>>,
    pub optional: bool,
}

/// A `Self` type annotation
#[derive(Debug, Clone)]
pub struct SelfTypeAst {
    pub index: AstIndex,
    pub span: Span,
    pub optional: bool,
}

/// A `value as Type` cast
#[derive(Debug, Clone)]
pub struct TypeCastAst {
    pub index: AstIndex,
    pub span: Span,
    pub value: Box<ExpressionAst>,
    pub target: TypeNameAst,
}

/// A low-level instruction invocation, used by the standard library and the
/// `new` synthesized from `init`
#[derive(Debug, Clone)]
pub struct RawInstructionAst {
    pub index: AstIndex,
    pub span: Span,
    pub name: String,
    pub arguments: Vec<ExpressionAst>,
}

/// A compiler-option pragma (`#option(import_prelude, false)`)
#[derive(Debug, Clone)]
pub struct CompilerOptionAst {
    pub index: AstIndex,
    pub span: Span,
    pub key: String,
    pub value: bool,
}

/// One pattern of a match arm
#[derive(Debug, Clone, EnumIs)]
pub enum PatternAst {
    /// An integer literal pattern
    Int { index: AstIndex, span: Span, value: i64 },
    /// A float literal pattern
    Float { index: AstIndex, span: Span, value: f64 },
    /// A string literal pattern
    Str { index: AstIndex, span: Span, value: String },
    /// A binding pattern, introducing a local scoped to the arm body
    Binding { index: AstIndex, span: Span, name: String },
    /// The wildcard pattern
    Wildcard { index: AstIndex, span: Span },
    /// A constant pattern, compared by identity
    Constant { index: AstIndex, span: Span, name: String },
    /// An enum-case pattern with destructured fields
    Variant {
        index: AstIndex,
        span: Span,
        name: String,
        fields: Vec<PatternAst>,
    },
    /// A class-shape pattern reading named attributes
    ClassShape {
        index: AstIndex,
        span: Span,
        fields: Vec<(String, PatternAst)>,
    },
    /// A tuple pattern with positional fields
    Tuple {
        index: AstIndex,
        span: Span,
        fields: Vec<PatternAst>,
    },
}

impl PatternAst {
    pub fn span(&self) -> &Span {
        match self {
            PatternAst::Int { span, .. }
            | PatternAst::Float { span, .. }
            | PatternAst::Str { span, .. }
            | PatternAst::Binding { span, .. }
            | PatternAst::Wildcard { span, .. }
            | PatternAst::Constant { span, .. }
            | PatternAst::Variant { span, .. }
            | PatternAst::ClassShape { span, .. }
            | PatternAst::Tuple { span, .. } => span,
        }
    }

    /// The binding names this pattern introduces, in source order
    pub fn binding_names(&self) -> Vec<&str> {
        match self {
            PatternAst::Binding { name, .. } => vec![name.as_str()],
            PatternAst::Variant { fields, .. } | PatternAst::Tuple { fields, .. } => fields
                .iter()
                .flat_map(|field| field.binding_names())
                .collect(),
            PatternAst::ClassShape { fields, .. } => fields
                .iter()
                .flat_map(|(_, field)| field.binding_names())
                .collect(),
            _ => Vec::new(),
        }
    }
}

/// One arm of a match: OR-patterns, an optional guard and a body
#[derive(Debug, Clone)]
pub struct MatchArmAst {
    pub index: AstIndex,
    pub span: Span,
    pub patterns: Vec<PatternAst>,
    pub guard: Option<Box<ExpressionAst>>,
    pub body: BodyAst,
}

/// A match expression
#[derive(Debug, Clone)]
pub struct MatchAst {
    pub index: AstIndex,
    pub span: Span,
    pub scrutinee: Box<ExpressionAst>,
    pub arms: Vec<MatchArmAst>,
    pub else_body: Option<BodyAst>,
}

/// The sum of every expression that can appear in a body
#[derive(Debug, Clone, EnumIs)]
pub enum ExpressionAst {
    Int(IntLiteralAst),
    Float(FloatLiteralAst),
    Str(StringLiteralAst),
    Identifier(IdentifierAst),
    Constant(ConstantAst),
    Attribute(AttributeAst),
    SelfObject(SelfAst),
    DefineVariable(Box<DefineVariableAst>),
    Reassign(Box<ReassignAst>),
    Send(Box<SendAst>),
    Block(Box<BlockAst>),
    Method(Box<MethodAst>),
    Return(Box<ReturnAst>),
    Throw(Box<ThrowAst>),
    Try(Box<TryAst>),
    Object(Box<ObjectAst>),
    Trait(Box<TraitAst>),
    TraitImplementation(Box<TraitImplementationAst>),
    ReopenObject(Box<ReopenObjectAst>),
    Import(Box<ImportAst>),
    TypeCast(Box<TypeCastAst>),
    RawInstruction(Box<RawInstructionAst>),
    CompilerOption(Box<CompilerOptionAst>),
    Match(Box<MatchAst>),
}

impl ExpressionAst {
    pub fn index(&self) -> AstIndex {
        match self {
            ExpressionAst::Int(node) => node.index,
            ExpressionAst::Float(node) => node.index,
            ExpressionAst::Str(node) => node.index,
            ExpressionAst::Identifier(node) => node.index,
            ExpressionAst::Constant(node) => node.index,
            ExpressionAst::Attribute(node) => node.index,
            ExpressionAst::SelfObject(node) => node.index,
            ExpressionAst::DefineVariable(node) => node.index,
            ExpressionAst::Reassign(node) => node.index,
            ExpressionAst::Send(node) => node.index,
            ExpressionAst::Block(node) => node.index,
            ExpressionAst::Method(node) => node.index,
            ExpressionAst::Return(node) => node.index,
            ExpressionAst::Throw(node) => node.index,
            ExpressionAst::Try(node) => node.index,
            ExpressionAst::Object(node) => node.index,
            ExpressionAst::Trait(node) => node.index,
            ExpressionAst::TraitImplementation(node) => node.index,
            ExpressionAst::ReopenObject(node) => node.index,
            ExpressionAst::Import(node) => node.index,
            ExpressionAst::TypeCast(node) => node.index,
            ExpressionAst::RawInstruction(node) => node.index,
            ExpressionAst::CompilerOption(node) => node.index,
            ExpressionAst::Match(node) => node.index,
        }
    }

    pub fn span(&self) -> &Span {
        match self {
            ExpressionAst::Int(node) => &node.span,
            ExpressionAst::Float(node) => &node.span,
            ExpressionAst::Str(node) => &node.span,
            ExpressionAst::Identifier(node) => &node.span,
            ExpressionAst::Constant(node) => &node.span,
            ExpressionAst::Attribute(node) => &node.span,
            ExpressionAst::SelfObject(node) => &node.span,
            ExpressionAst::DefineVariable(node) => &node.span,
            ExpressionAst::Reassign(node) => &node.span,
            ExpressionAst::Send(node) => &node.span,
            ExpressionAst::Block(node) => &node.span,
            ExpressionAst::Method(node) => &node.span,
            ExpressionAst::Return(node) => &node.span,
            ExpressionAst::Throw(node) => &node.span,
            ExpressionAst::Try(node) => &node.span,
            ExpressionAst::Object(node) => &node.span,
            ExpressionAst::Trait(node) => &node.span,
            ExpressionAst::TraitImplementation(node) => &node.span,
            ExpressionAst::ReopenObject(node) => &node.span,
            ExpressionAst::Import(node) => &node.span,
            ExpressionAst::TypeCast(node) => &node.span,
            ExpressionAst::RawInstruction(node) => &node.span,
            ExpressionAst::CompilerOption(node) => &node.span,
            ExpressionAst::Match(node) => &node.span,
        }
    }

    /// True for declarations the hoisting pass moves to the top of a body:
    /// objects, traits, implementations and reopenings
    pub fn is_type_declaration(&self) -> bool {
        matches!(
            self,
            ExpressionAst::Object(_)
                | ExpressionAst::Trait(_)
                | ExpressionAst::TraitImplementation(_)
                | ExpressionAst::ReopenObject(_)
        )
    }

    /// True if this is a send without an explicit receiver calling the given
    /// method name, the shape of a self tail call
    pub fn is_self_tail_call(&self, method_name: &str) -> bool {
        match self {
            ExpressionAst::Send(send) => {
                send.name == method_name
                    && match send.receiver.as_deref() {
                        None => true,
                        Some(ExpressionAst::SelfObject(_)) => true,
                        _ => false,
                    }
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::file::SourceFile;

    fn span() -> Span {
        Span::synthesized(SourceFile::new(vec!["test".into()], "".to_string()))
    }

    #[test]
    fn ast_ids_are_unique() {
        let ids = AstIds::new();
        let first = ids.next();
        let second = ids.next();
        assert_ne!(first, second);
    }

    #[test]
    fn import_binding_names() {
        let ids = AstIds::new();

        let named = ImportSymbolAst {
            index: ids.next(),
            span: span(),
            kind: ImportSymbolKind::Symbol {
                name: "answer".to_string(),
                alias: None,
            },
        };
        assert_eq!(named.binding_name("foo"), Some("answer".to_string()));

        let aliased = ImportSymbolAst {
            index: ids.next(),
            span: span(),
            kind: ImportSymbolKind::Symbol {
                name: "answer".to_string(),
                alias: Some("result".to_string()),
            },
        };
        assert_eq!(aliased.binding_name("foo"), Some("result".to_string()));

        let self_import = ImportSymbolAst {
            index: ids.next(),
            span: span(),
            kind: ImportSymbolKind::SelfModule { alias: None },
        };
        assert_eq!(self_import.binding_name("foo"), Some("foo".to_string()));

        let glob = ImportSymbolAst {
            index: ids.next(),
            span: span(),
            kind: ImportSymbolKind::Glob,
        };
        assert_eq!(glob.binding_name("foo"), None);
    }

    #[test]
    fn self_tail_call_detection() {
        let ids = AstIds::new();

        let send = ExpressionAst::Send(Box::new(SendAst {
            index: ids.next(),
            span: span(),
            receiver: None,
            name: "loop_forever".to_string(),
            type_arguments: Vec::new(),
            arguments: Vec::new(),
        }));

        assert!(send.is_self_tail_call("loop_forever"));
        assert!(!send.is_self_tail_call("other"));
    }

    #[test]
    fn pattern_binding_names_are_collected_in_order() {
        let ids = AstIds::new();

        let pattern = PatternAst::Variant {
            index: ids.next(),
            span: span(),
            name: "Pair".to_string(),
            fields: vec![
                PatternAst::Binding {
                    index: ids.next(),
                    span: span(),
                    name: "left".to_string(),
                },
                PatternAst::Wildcard { index: ids.next(), span: span() },
                PatternAst::Binding {
                    index: ids.next(),
                    span: span(),
                    name: "right".to_string(),
                },
            ],
        };

        assert_eq!(pattern.binding_names(), vec!["left", "right"]);
    }
}
