//! Compile-error taxonomy for the Veld language compiler.
//!
//! Every diagnostic the compiler can produce is a dedicated struct deriving
//! `thiserror::Error` and `miette::Diagnostic`, grouped into the
//! [`CompileError`] enum. Errors are never thrown across pass boundaries;
//! they are pushed onto the [`Diagnostics`](crate::diagnostics::Diagnostics)
//! accumulator and compilation continues where it can. Nodes whose type could
//! not be determined receive the `Error` sentinel type so that one mistake
//! does not cascade into dozens of reports.
//!
//! Severity is part of the kind: `unused_local`, `unreachable_code` and
//! `redundant_try` are warnings, everything else is an error. The
//! `#[diagnostic(code(...))]` attribute doubles as the machine-readable kind
//! identifier.

use miette::SourceSpan;
use strum_macros::{EnumDiscriminants, EnumIs};

use crate::{file::SourceCode, span::Span};

/// Severity of a diagnostic entry
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// Default help message for type not found errors.
pub static TYPE_NOT_FOUND_HELP: &str =
    "try to import the type, or maybe you need to define it in the current module";

/// Error for when an imported module cannot be located on the search paths.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("module '{module}' not found")]
#[diagnostic(code("veld::error::module_not_found"), help("check the import path and the configured source directories"))]
pub struct ModuleNotFound {
    /// The qualified name that could not be resolved to a file
    pub module: String,

    #[label("no source file found for this module")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error produced when the parser rejects a module's source.
///
/// Parse errors are fatal for the module: the per-module pipeline stops, but
/// compilation of sibling modules continues.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("syntax error")]
#[diagnostic(code("veld::error::syntax_error"))]
pub struct SyntaxError {
    #[label("{message}")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,

    pub message: String,
}

/// Error for when the same symbol is imported twice into one module.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("'{name}' is imported more than once")]
#[diagnostic(code("veld::error::duplicate_import_symbol"), help("remove one of the imports or alias it"))]
pub struct DuplicateImportSymbol {
    pub name: String,

    #[label("already imported here")]
    pub old_position: SourceSpan,

    #[label("but it is imported again here")]
    pub new_position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for importing a symbol the source module does not export.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("module '{module}' does not define '{name}'")]
#[diagnostic(code("veld::error::unknown_import_symbol"), help("check the spelling, or define the symbol in the imported module"))]
pub struct UnknownImportSymbol {
    pub name: String,
    pub module: String,

    #[label("this symbol is not defined by the imported module")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for a reference to a local variable that was never defined.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("undefined local variable '{name}'")]
#[diagnostic(code("veld::error::undefined_local"))]
pub struct UndefinedLocal {
    pub name: String,

    #[label("this local is not defined in any enclosing scope")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for a reference to an attribute the receiver does not define.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("undefined attribute '{name}'")]
#[diagnostic(code("veld::error::undefined_attribute"))]
pub struct UndefinedAttribute {
    pub name: String,

    #[label("the enclosing object does not define this attribute")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for a constant that resolves neither through the enclosing self
/// type's attribute chain nor through the module's globals.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("undefined constant '{name}'")]
#[diagnostic(code("veld::error::undefined_constant"))]
pub struct UndefinedConstant {
    pub name: String,

    #[label("this constant is not defined or imported")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for sending a message no method answers.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("'{receiver}' does not respond to '{name}'")]
#[diagnostic(code("veld::error::undefined_method"))]
pub struct UndefinedMethod {
    pub name: String,
    pub receiver: String,

    #[label("no method with this name")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for when a symbol (local, constant, attribute) is defined twice in
/// the same scope.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("already defined")]
#[diagnostic(code("veld::error::already_defined"), help("change one of the names or remove the definition"))]
pub struct AlreadyDefined {
    #[label("already defined here")]
    pub old_position: SourceSpan,

    #[label("but it is defined again here")]
    pub new_position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for assigning to an immutable local.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("cannot reassign immutable '{name}'")]
#[diagnostic(code("veld::error::reassign_immutable"), help("define the local as mutable"))]
pub struct ReassignImmutable {
    pub name: String,

    #[label("this local is immutable")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for assigning to a local that was never defined.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("cannot reassign undefined '{name}'")]
#[diagnostic(code("veld::error::reassign_undefined"), help("define the local before assigning to it"))]
pub struct ReassignUndefined {
    pub name: String,

    #[label("this local is not defined")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for redefining a constant reserved by the language runtime.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("'{name}' is a reserved constant")]
#[diagnostic(code("veld::error::redefine_reserved_constant"))]
pub struct RedefineReservedConstant {
    pub name: String,

    #[label("this constant is defined by the runtime and cannot be redefined")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for a value whose type is incompatible with what the context
/// expects.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("expected '{expected}', found '{found}'")]
#[diagnostic(code("veld::error::type_mismatch"))]
pub struct TypeMismatch {
    pub expected: String,
    pub found: String,

    #[label("this type is not compatible")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for calling a method with the wrong number of positional arguments.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("{}", argument_count_message(.given, .minimum, .maximum))]
#[diagnostic(code("veld::error::argument_count"))]
pub struct ArgumentCount {
    pub given: usize,
    pub minimum: usize,
    /// `None` when the method takes a rest argument
    pub maximum: Option<usize>,

    #[label("wrong number of arguments")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

fn argument_count_message(given: &usize, minimum: &usize, maximum: &Option<usize>) -> String {
    match maximum {
        Some(maximum) if given > maximum => {
            format!("too many arguments: {given} given, at most {maximum} expected")
        }
        _ => format!("not enough arguments: {given} given, at least {minimum} expected"),
    }
}

/// Error for supplying more type arguments than a method declares type
/// parameters.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("too many type arguments: {given} given, {expected} expected")]
#[diagnostic(code("veld::error::too_many_type_arguments"))]
pub struct TooManyTypeArguments {
    pub given: usize,
    pub expected: usize,

    #[label("too many type arguments")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for a keyword argument the method does not declare.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("undefined keyword argument '{name}'")]
#[diagnostic(code("veld::error::undefined_keyword_argument"))]
pub struct UndefinedKeywordArgument {
    pub name: String,

    #[label("the method does not define this argument")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for a cast between unrelated types.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("cannot cast '{from}' to '{to}'")]
#[diagnostic(code("veld::error::invalid_cast"))]
pub struct InvalidCast {
    pub from: String,
    pub to: String,

    #[label("unsupported cast")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for an `impl` whose trait requires other traits the type has not
/// implemented.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("'{type_name}' does not implement the required trait '{trait_name}'")]
#[diagnostic(code("veld::error::unimplemented_trait"), help("implement the required trait first"))]
pub struct UnimplementedTrait {
    pub trait_name: String,
    pub type_name: String,

    #[label("required trait not implemented")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for an `impl` missing one of the trait's required methods.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("'{type_name}' does not implement '{method}' required by '{trait_name}'")]
#[diagnostic(code("veld::error::unimplemented_method"))]
pub struct UnimplementedMethod {
    pub method: String,
    pub trait_name: String,
    pub type_name: String,

    #[label("required method is missing or has an incompatible signature")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for a type-parameter requirement that does not name a trait.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("'{name}' is not a trait")]
#[diagnostic(code("veld::error::invalid_type_parameter_requirement"))]
pub struct InvalidTypeParameterRequirement {
    pub name: String,

    #[label("type parameter requirements must be traits")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for a trait default method colliding with an incompatible method
/// already defined on the implementing type.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("default method '{method}' of '{trait_name}' conflicts with an existing method on '{type_name}'")]
#[diagnostic(code("veld::error::incompatible_default_method"))]
pub struct IncompatibleDefaultMethod {
    pub method: String,
    pub trait_name: String,
    pub type_name: String,

    #[label("existing method has an incompatible signature")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for an argument with neither an annotation, a default value, nor an
/// expected type from the caller.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("argument type missing")]
#[diagnostic(code("veld::error::argument_type_missing"), help("add a type annotation or a default value"))]
pub struct ArgumentTypeMissing {
    #[label("the type of this argument cannot be determined")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for calling a method whose bounds the concrete self type does not
/// meet.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("the bounds of '{method}' require '{type_name}' to implement '{trait_name}'")]
#[diagnostic(code("veld::error::method_bounds_not_met"))]
pub struct MethodBoundsNotMet {
    pub method: String,
    pub trait_name: String,
    pub type_name: String,

    #[label("method bounds are not met by the receiver")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for a type annotation naming an unknown type.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("'{type_name}' type not found")]
#[diagnostic(code("veld::error::type_not_found"))]
pub struct TypeNotFound {
    pub type_name: String,

    #[label("type is not imported or defined in the current module")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,

    #[help]
    pub advice: String,
}

/// Error for calling a throwing method outside a `try`.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("'{name}' may throw, but the call is not wrapped in a 'try'")]
#[diagnostic(code("veld::error::missing_try"), help("wrap the call in a 'try' expression"))]
pub struct MissingTry {
    pub name: String,

    #[label("this call may throw")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for a `throw` inside a block that declares no throw type.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("cannot throw: the enclosing block does not define a throw type")]
#[diagnostic(code("veld::error::throw_without_throw_defined"), help("add a throws clause to the enclosing method"))]
pub struct ThrowWithoutThrowDefined {
    #[label("throw is not allowed here")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for a `throw` at module top level.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("cannot throw at the top level of a module")]
#[diagnostic(code("veld::error::throw_at_top_level"))]
pub struct ThrowAtTopLevel {
    #[label("throw is not allowed at module scope")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for a block that declares a throw type but never throws.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("this block is declared to throw '{declared}' but never throws")]
#[diagnostic(code("veld::error::missing_throw"), help("remove the throws clause or throw a value"))]
pub struct MissingThrow {
    pub declared: String,

    #[label("declared to throw, but no throw on any path")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for a top-level `try` without an else handler.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("a 'try' at module top level requires an else handler")]
#[diagnostic(code("veld::error::top_level_try_missing_else"))]
pub struct TopLevelTryMissingElse {
    #[label("nothing above this scope can catch the thrown value")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Warning for a `try` over an expression that cannot throw.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("redundant 'try': the expression cannot throw")]
#[diagnostic(code("veld::warning::redundant_try"), severity(Warning))]
pub struct RedundantTry {
    #[label("this expression does not declare a throw type")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for reopening or implementing a trait on something that is not an
/// object.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("'{name}' is not an object")]
#[diagnostic(code("veld::error::not_an_object"))]
pub struct NotAnObject {
    pub name: String,

    #[label("only objects can be reopened or implement traits")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for redeclaring a trait that already has methods or implementers.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("cannot extend '{name}': the trait is not empty")]
#[diagnostic(code("veld::error::extend_non_empty_trait"))]
pub struct ExtendNonEmptyTrait {
    pub name: String,

    #[label("this trait already has required methods or implementations")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for using a non-trait where a trait is required.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("'{name}' is not a trait")]
#[diagnostic(code("veld::error::not_a_trait"))]
pub struct NotATrait {
    pub name: String,

    #[label("a trait is required here")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for a bodiless method declared outside a trait.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("methods without a body may only appear inside traits")]
#[diagnostic(code("veld::error::required_method_outside_trait"))]
pub struct RequiredMethodOutsideTrait {
    #[label("this method has no body")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for a `return` with no enclosing method.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("'return' outside of a method")]
#[diagnostic(code("veld::error::return_outside_method"))]
pub struct ReturnOutsideMethod {
    #[label("there is no enclosing method to return from")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for an unknown compiler-option pragma.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("unknown compiler option '{name}'")]
#[diagnostic(code("veld::error::unknown_compiler_option"))]
pub struct UnknownCompilerOption {
    pub name: String,

    #[label("this option is not recognized")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Error for a raw instruction naming an unknown opcode.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("unknown instruction '{name}'")]
#[diagnostic(code("veld::error::unknown_raw_instruction"))]
pub struct UnknownRawInstruction {
    pub name: String,

    #[label("no opcode with this name")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Warning for a local variable that is never read.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("unused local variable '{name}'")]
#[diagnostic(code("veld::warning::unused_local"), severity(Warning), help("prefix the name with an underscore to silence this warning"))]
pub struct UnusedLocal {
    pub name: String,

    #[label("this local is never used")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// Warning for a basic block no execution path reaches.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic)]
#[error("unreachable code")]
#[diagnostic(code("veld::warning::unreachable_code"), severity(Warning))]
pub struct UnreachableCode {
    #[label("this code is never executed")]
    pub position: SourceSpan,

    #[source_code]
    pub code: SourceCode,
}

/// The sum of every diagnostic the compiler can record.
#[derive(Clone, Debug, thiserror::Error, miette::Diagnostic, EnumDiscriminants, EnumIs)]
#[strum_discriminants(vis(pub), name(CompileErrorKind))]
pub enum CompileError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    ModuleNotFound(Box<ModuleNotFound>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    SyntaxError(Box<SyntaxError>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    DuplicateImportSymbol(Box<DuplicateImportSymbol>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    UnknownImportSymbol(Box<UnknownImportSymbol>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    UndefinedLocal(Box<UndefinedLocal>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    UndefinedAttribute(Box<UndefinedAttribute>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    UndefinedConstant(Box<UndefinedConstant>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    UndefinedMethod(Box<UndefinedMethod>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    AlreadyDefined(Box<AlreadyDefined>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    ReassignImmutable(Box<ReassignImmutable>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    ReassignUndefined(Box<ReassignUndefined>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    RedefineReservedConstant(Box<RedefineReservedConstant>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    TypeMismatch(Box<TypeMismatch>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    ArgumentCount(Box<ArgumentCount>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    TooManyTypeArguments(Box<TooManyTypeArguments>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    UndefinedKeywordArgument(Box<UndefinedKeywordArgument>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    InvalidCast(Box<InvalidCast>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    UnimplementedTrait(Box<UnimplementedTrait>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    UnimplementedMethod(Box<UnimplementedMethod>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    InvalidTypeParameterRequirement(Box<InvalidTypeParameterRequirement>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    IncompatibleDefaultMethod(Box<IncompatibleDefaultMethod>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    ArgumentTypeMissing(Box<ArgumentTypeMissing>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    MethodBoundsNotMet(Box<MethodBoundsNotMet>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    TypeNotFound(Box<TypeNotFound>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    MissingTry(Box<MissingTry>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    ThrowWithoutThrowDefined(Box<ThrowWithoutThrowDefined>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    ThrowAtTopLevel(Box<ThrowAtTopLevel>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    MissingThrow(Box<MissingThrow>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    TopLevelTryMissingElse(Box<TopLevelTryMissingElse>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    RedundantTry(Box<RedundantTry>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    NotAnObject(Box<NotAnObject>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    ExtendNonEmptyTrait(Box<ExtendNonEmptyTrait>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    NotATrait(Box<NotATrait>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    RequiredMethodOutsideTrait(Box<RequiredMethodOutsideTrait>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    ReturnOutsideMethod(Box<ReturnOutsideMethod>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    UnknownCompilerOption(Box<UnknownCompilerOption>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    UnknownRawInstruction(Box<UnknownRawInstruction>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    UnusedLocal(Box<UnusedLocal>),

    #[error(transparent)]
    #[diagnostic(transparent)]
    UnreachableCode(Box<UnreachableCode>),
}

impl CompileError {
    /// The severity of this diagnostic
    pub fn severity(&self) -> Severity {
        match self {
            CompileError::RedundantTry(_)
            | CompileError::UnusedLocal(_)
            | CompileError::UnreachableCode(_) => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// The source payload of this diagnostic, used by the report generator
    pub fn source(&self) -> &SourceCode {
        match self {
            CompileError::ModuleNotFound(inner) => &inner.code,
            CompileError::SyntaxError(inner) => &inner.code,
            CompileError::DuplicateImportSymbol(inner) => &inner.code,
            CompileError::UnknownImportSymbol(inner) => &inner.code,
            CompileError::UndefinedLocal(inner) => &inner.code,
            CompileError::UndefinedAttribute(inner) => &inner.code,
            CompileError::UndefinedConstant(inner) => &inner.code,
            CompileError::UndefinedMethod(inner) => &inner.code,
            CompileError::AlreadyDefined(inner) => &inner.code,
            CompileError::ReassignImmutable(inner) => &inner.code,
            CompileError::ReassignUndefined(inner) => &inner.code,
            CompileError::RedefineReservedConstant(inner) => &inner.code,
            CompileError::TypeMismatch(inner) => &inner.code,
            CompileError::ArgumentCount(inner) => &inner.code,
            CompileError::TooManyTypeArguments(inner) => &inner.code,
            CompileError::UndefinedKeywordArgument(inner) => &inner.code,
            CompileError::InvalidCast(inner) => &inner.code,
            CompileError::UnimplementedTrait(inner) => &inner.code,
            CompileError::UnimplementedMethod(inner) => &inner.code,
            CompileError::InvalidTypeParameterRequirement(inner) => &inner.code,
            CompileError::IncompatibleDefaultMethod(inner) => &inner.code,
            CompileError::ArgumentTypeMissing(inner) => &inner.code,
            CompileError::MethodBoundsNotMet(inner) => &inner.code,
            CompileError::TypeNotFound(inner) => &inner.code,
            CompileError::MissingTry(inner) => &inner.code,
            CompileError::ThrowWithoutThrowDefined(inner) => &inner.code,
            CompileError::ThrowAtTopLevel(inner) => &inner.code,
            CompileError::MissingThrow(inner) => &inner.code,
            CompileError::TopLevelTryMissingElse(inner) => &inner.code,
            CompileError::RedundantTry(inner) => &inner.code,
            CompileError::NotAnObject(inner) => &inner.code,
            CompileError::ExtendNonEmptyTrait(inner) => &inner.code,
            CompileError::NotATrait(inner) => &inner.code,
            CompileError::RequiredMethodOutsideTrait(inner) => &inner.code,
            CompileError::ReturnOutsideMethod(inner) => &inner.code,
            CompileError::UnknownCompilerOption(inner) => &inner.code,
            CompileError::UnknownRawInstruction(inner) => &inner.code,
            CompileError::UnusedLocal(inner) => &inner.code,
            CompileError::UnreachableCode(inner) => &inner.code,
        }
    }

    pub fn module_not_found(module: String, span: &Span) -> Self {
        CompileError::ModuleNotFound(
            ModuleNotFound {
                module,
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn syntax_error(message: String, span: &Span) -> Self {
        CompileError::SyntaxError(
            SyntaxError {
                message,
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn duplicate_import_symbol(
        name: String,
        old_position: std::ops::Range<usize>,
        span: &Span,
    ) -> Self {
        CompileError::DuplicateImportSymbol(
            DuplicateImportSymbol {
                name,
                old_position: old_position.into(),
                new_position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn unknown_import_symbol(name: String, module: String, span: &Span) -> Self {
        CompileError::UnknownImportSymbol(
            UnknownImportSymbol {
                name,
                module,
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn undefined_local(name: String, span: &Span) -> Self {
        CompileError::UndefinedLocal(
            UndefinedLocal {
                name,
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn undefined_attribute(name: String, span: &Span) -> Self {
        CompileError::UndefinedAttribute(
            UndefinedAttribute {
                name,
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn undefined_constant(name: String, span: &Span) -> Self {
        CompileError::UndefinedConstant(
            UndefinedConstant {
                name,
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn undefined_method(name: String, receiver: String, span: &Span) -> Self {
        CompileError::UndefinedMethod(
            UndefinedMethod {
                name,
                receiver,
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn already_defined(old_position: std::ops::Range<usize>, span: &Span) -> Self {
        CompileError::AlreadyDefined(
            AlreadyDefined {
                old_position: old_position.into(),
                new_position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn reassign_immutable(name: String, span: &Span) -> Self {
        CompileError::ReassignImmutable(
            ReassignImmutable {
                name,
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn reassign_undefined(name: String, span: &Span) -> Self {
        CompileError::ReassignUndefined(
            ReassignUndefined {
                name,
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn redefine_reserved_constant(name: String, span: &Span) -> Self {
        CompileError::RedefineReservedConstant(
            RedefineReservedConstant {
                name,
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn type_mismatch(expected: String, found: String, span: &Span) -> Self {
        CompileError::TypeMismatch(
            TypeMismatch {
                expected,
                found,
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn argument_count(
        given: usize,
        minimum: usize,
        maximum: Option<usize>,
        span: &Span,
    ) -> Self {
        CompileError::ArgumentCount(
            ArgumentCount {
                given,
                minimum,
                maximum,
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn too_many_type_arguments(given: usize, expected: usize, span: &Span) -> Self {
        CompileError::TooManyTypeArguments(
            TooManyTypeArguments {
                given,
                expected,
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn undefined_keyword_argument(name: String, span: &Span) -> Self {
        CompileError::UndefinedKeywordArgument(
            UndefinedKeywordArgument {
                name,
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn invalid_cast(from: String, to: String, span: &Span) -> Self {
        CompileError::InvalidCast(
            InvalidCast {
                from,
                to,
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn unimplemented_trait(trait_name: String, type_name: String, span: &Span) -> Self {
        CompileError::UnimplementedTrait(
            UnimplementedTrait {
                trait_name,
                type_name,
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn unimplemented_method(
        method: String,
        trait_name: String,
        type_name: String,
        span: &Span,
    ) -> Self {
        CompileError::UnimplementedMethod(
            UnimplementedMethod {
                method,
                trait_name,
                type_name,
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn invalid_type_parameter_requirement(name: String, span: &Span) -> Self {
        CompileError::InvalidTypeParameterRequirement(
            InvalidTypeParameterRequirement {
                name,
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn incompatible_default_method(
        method: String,
        trait_name: String,
        type_name: String,
        span: &Span,
    ) -> Self {
        CompileError::IncompatibleDefaultMethod(
            IncompatibleDefaultMethod {
                method,
                trait_name,
                type_name,
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn argument_type_missing(span: &Span) -> Self {
        CompileError::ArgumentTypeMissing(
            ArgumentTypeMissing {
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn method_bounds_not_met(
        method: String,
        trait_name: String,
        type_name: String,
        span: &Span,
    ) -> Self {
        CompileError::MethodBoundsNotMet(
            MethodBoundsNotMet {
                method,
                trait_name,
                type_name,
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    /// Builds a `TypeNotFound` error, suggesting similarly named types when
    /// any are known
    pub fn type_not_found<'a>(
        known_types: impl Iterator<Item = &'a str>,
        missing_type_name: String,
        span: &Span,
    ) -> Self {
        let similar_types: Vec<&str> = known_types
            .filter(|known| known.ends_with(missing_type_name.as_str()))
            .collect();

        let advice = if !similar_types.is_empty() {
            let type_list = similar_types
                .iter()
                .map(|item| format!(" - {item}"))
                .collect::<Vec<_>>()
                .join("\n");
            format!("The following types are similar:\n{type_list}")
        } else {
            TYPE_NOT_FOUND_HELP.to_string()
        };

        CompileError::TypeNotFound(
            TypeNotFound {
                type_name: missing_type_name,
                position: span.to_range().into(),
                code: (&span.file).into(),
                advice,
            }
            .into(),
        )
    }

    pub fn missing_try(name: String, span: &Span) -> Self {
        CompileError::MissingTry(
            MissingTry {
                name,
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn throw_without_throw_defined(span: &Span) -> Self {
        CompileError::ThrowWithoutThrowDefined(
            ThrowWithoutThrowDefined {
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn throw_at_top_level(span: &Span) -> Self {
        CompileError::ThrowAtTopLevel(
            ThrowAtTopLevel {
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn missing_throw(declared: String, span: &Span) -> Self {
        CompileError::MissingThrow(
            MissingThrow {
                declared,
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn top_level_try_missing_else(span: &Span) -> Self {
        CompileError::TopLevelTryMissingElse(
            TopLevelTryMissingElse {
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn redundant_try(span: &Span) -> Self {
        CompileError::RedundantTry(
            RedundantTry {
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn not_an_object(name: String, span: &Span) -> Self {
        CompileError::NotAnObject(
            NotAnObject {
                name,
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn extend_non_empty_trait(name: String, span: &Span) -> Self {
        CompileError::ExtendNonEmptyTrait(
            ExtendNonEmptyTrait {
                name,
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn not_a_trait(name: String, span: &Span) -> Self {
        CompileError::NotATrait(
            NotATrait {
                name,
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn required_method_outside_trait(span: &Span) -> Self {
        CompileError::RequiredMethodOutsideTrait(
            RequiredMethodOutsideTrait {
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn return_outside_method(span: &Span) -> Self {
        CompileError::ReturnOutsideMethod(
            ReturnOutsideMethod {
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn unknown_compiler_option(name: String, span: &Span) -> Self {
        CompileError::UnknownCompilerOption(
            UnknownCompilerOption {
                name,
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn unknown_raw_instruction(name: String, span: &Span) -> Self {
        CompileError::UnknownRawInstruction(
            UnknownRawInstruction {
                name,
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn unused_local(name: String, span: &Span) -> Self {
        CompileError::UnusedLocal(
            UnusedLocal {
                name,
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }

    pub fn unreachable_code(span: &Span) -> Self {
        CompileError::UnreachableCode(
            UnreachableCode {
                position: span.to_range().into(),
                code: (&span.file).into(),
            }
            .into(),
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::file::SourceFile;

    fn span() -> Span {
        Span::new(4..8, SourceFile::new(vec!["test".into()], "let unknown = 1".to_string()))
    }

    #[test]
    fn severity_of_warnings() {
        assert_eq!(CompileError::unused_local("a".into(), &span()).severity(), Severity::Warning);
        assert_eq!(CompileError::unreachable_code(&span()).severity(), Severity::Warning);
        assert_eq!(CompileError::redundant_try(&span()).severity(), Severity::Warning);
        assert_eq!(CompileError::undefined_local("a".into(), &span()).severity(), Severity::Error);
    }

    #[test]
    fn argument_count_messages() {
        let too_many = CompileError::argument_count(3, 1, Some(2), &span());
        assert_eq!(too_many.to_string(), "too many arguments: 3 given, at most 2 expected");

        let not_enough = CompileError::argument_count(0, 1, None, &span());
        assert_eq!(not_enough.to_string(), "not enough arguments: 0 given, at least 1 expected");
    }

    #[test]
    fn type_not_found_suggests_similar_types() {
        let known = ["std.string.String", "geometry.Point"];
        let error = CompileError::type_not_found(known.iter().copied(), "Point".to_string(), &span());

        if let CompileError::TypeNotFound(inner) = error {
            assert!(inner.advice.contains("geometry.Point"));
        } else {
            panic!("Expected CompileError::TypeNotFound");
        }
    }

    #[test]
    fn type_not_found_without_suggestions() {
        let error = CompileError::type_not_found([].iter().copied(), "Missing".to_string(), &span());

        if let CompileError::TypeNotFound(inner) = error {
            assert_eq!(inner.advice, TYPE_NOT_FOUND_HELP);
        } else {
            panic!("Expected CompileError::TypeNotFound");
        }
    }
}
