//! The Veld type system.
//!
//! Types live in an arena owned by [`TypeDb`] and are referenced everywhere
//! by [`TypeLocation`], a stable integer id. This sidesteps the ownership
//! knots of a type graph that is both cyclic (objects reference the traits
//! they implement, traits reference their required types) and
//! self-referential (a method may return `Self`): references are ids, never
//! pointers, and all mutation goes through the arena.
//!
//! [`TypeKind`] is the sum of every kind of type:
//!
//! - [`ObjectType`]: nominal objects with a prototype chain, attributes,
//!   type parameters and implemented traits
//! - [`TraitType`]: required methods, required traits and default methods
//! - [`BlockType`]: closures, lambdas and methods
//! - [`TypeParameterType`]: a type parameter bounded by required traits
//! - `Optional(T)`: a wrapper admitting `Nil`
//! - `Any`, `SelfType`, `Void`, `Never`: special singletons
//! - `Error`: the absorbing sentinel assigned to expressions whose type
//!   could not be determined; every operation on it yields `Error` again so
//!   a single mistake produces a single diagnostic
//!
//! Generic instantiation copies the base record and fills its
//! type-parameter instance map, so `Array[Int]` and `Array[Float]` are
//! distinct arena entries sharing one name.

use strum_macros::{EnumDiscriminants, EnumIs};

pub mod block;
pub mod compatibility;
pub mod object;
pub mod parameters;
pub mod traits;

pub use block::{BlockArgument, BlockKind, BlockType};
pub use object::ObjectType;
pub use parameters::{TypeParameterInstances, TypeParameterType, TypeParameters};
pub use traits::TraitType;

/// Unique identifier for a type within the arena
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeLocation(pub usize);

impl TypeLocation {
    /// Sentinel value representing an undefined or unresolved type location
    pub const UNDEFINED: Self = TypeLocation(usize::MAX);
}

impl From<usize> for TypeLocation {
    fn from(location: usize) -> Self {
        TypeLocation(location)
    }
}

/// The sum of every kind of type known to the compiler
#[derive(Debug, Clone, EnumIs, EnumDiscriminants)]
#[strum_discriminants(vis(pub), name(TypeKindDiscriminants))]
pub enum TypeKind {
    /// A nominal object type
    Object(ObjectType),

    /// A trait with requirements and default methods
    Trait(TraitType),

    /// A closure, lambda or method
    Block(BlockType),

    /// A type parameter bounded by traits
    TypeParameter(TypeParameterType),

    /// An optional wrapper around another type
    Optional(TypeLocation),

    /// The dynamic type, compatible with everything
    Any,

    /// The type of `self` in a method signature, resolved at the call site
    SelfType,

    /// The absence of a value
    Void,

    /// The type of expressions that never produce a value (throw, return)
    Never,

    /// Sentinel for failed type computations; absorbs every operation
    Error,
}

/// Arena locations of the built-in prototype types
#[derive(Debug, Clone)]
pub struct Builtins {
    pub object: TypeLocation,
    pub array: TypeLocation,
    pub block: TypeLocation,
    pub string: TypeLocation,
    pub integer: TypeLocation,
    pub float: TypeLocation,
    pub boolean: TypeLocation,
    pub true_type: TypeLocation,
    pub false_type: TypeLocation,
    pub nil: TypeLocation,
    pub byte_array: TypeLocation,
    pub module: TypeLocation,
    pub top_level: TypeLocation,
    pub any: TypeLocation,
    pub self_type: TypeLocation,
    pub void: TypeLocation,
    pub never: TypeLocation,
    pub error: TypeLocation,
}

/// Names of the constants the runtime reserves for the built-in prototypes
pub static RESERVED_CONSTANTS: &[&str] = &[
    "Object",
    "Array",
    "Block",
    "String",
    "Integer",
    "Float",
    "Boolean",
    "True",
    "False",
    "Nil",
    "ByteArray",
    "Module",
    "Self",
];

/// Registry of built-in and user-defined nominal types
#[derive(Debug)]
pub struct TypeDb {
    records: Vec<TypeKind>,
    builtins: Builtins,
}

impl Default for TypeDb {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeDb {
    pub fn new() -> Self {
        let mut db = TypeDb {
            records: Vec::new(),
            builtins: Builtins {
                object: TypeLocation::UNDEFINED,
                array: TypeLocation::UNDEFINED,
                block: TypeLocation::UNDEFINED,
                string: TypeLocation::UNDEFINED,
                integer: TypeLocation::UNDEFINED,
                float: TypeLocation::UNDEFINED,
                boolean: TypeLocation::UNDEFINED,
                true_type: TypeLocation::UNDEFINED,
                false_type: TypeLocation::UNDEFINED,
                nil: TypeLocation::UNDEFINED,
                byte_array: TypeLocation::UNDEFINED,
                module: TypeLocation::UNDEFINED,
                top_level: TypeLocation::UNDEFINED,
                any: TypeLocation::UNDEFINED,
                self_type: TypeLocation::UNDEFINED,
                void: TypeLocation::UNDEFINED,
                never: TypeLocation::UNDEFINED,
                error: TypeLocation::UNDEFINED,
            },
        };

        db.register_builtins();
        db
    }

    fn register_builtins(&mut self) {
        let object = self.alloc(TypeKind::Object(ObjectType::new("Object".to_string(), None)));

        let mut array = ObjectType::new("Array".to_string(), Some(object));
        let array_param = self.alloc(TypeKind::TypeParameter(TypeParameterType::new(
            "T".to_string(),
        )));
        array.type_parameters.define("T".to_string(), array_param);

        self.builtins = Builtins {
            object,
            array: self.alloc(TypeKind::Object(array)),
            block: self.alloc(TypeKind::Object(ObjectType::new("Block".to_string(), Some(object)))),
            string: self.alloc(TypeKind::Object(ObjectType::new("String".to_string(), Some(object)))),
            integer: self.alloc(TypeKind::Object(ObjectType::new("Integer".to_string(), Some(object)))),
            float: self.alloc(TypeKind::Object(ObjectType::new("Float".to_string(), Some(object)))),
            boolean: TypeLocation::UNDEFINED,
            true_type: TypeLocation::UNDEFINED,
            false_type: TypeLocation::UNDEFINED,
            nil: self.alloc(TypeKind::Object(ObjectType::new("Nil".to_string(), Some(object)))),
            byte_array: self.alloc(TypeKind::Object(ObjectType::new("ByteArray".to_string(), Some(object)))),
            module: self.alloc(TypeKind::Object(ObjectType::new("Module".to_string(), Some(object)))),
            top_level: self.alloc(TypeKind::Object(ObjectType::new("TopLevel".to_string(), Some(object)))),
            any: self.alloc(TypeKind::Any),
            self_type: self.alloc(TypeKind::SelfType),
            void: self.alloc(TypeKind::Void),
            never: self.alloc(TypeKind::Never),
            error: self.alloc(TypeKind::Error),
        };

        let boolean =
            self.alloc(TypeKind::Object(ObjectType::new("Boolean".to_string(), Some(object))));
        self.builtins.boolean = boolean;
        self.builtins.true_type =
            self.alloc(TypeKind::Object(ObjectType::new("True".to_string(), Some(boolean))));
        self.builtins.false_type =
            self.alloc(TypeKind::Object(ObjectType::new("False".to_string(), Some(boolean))));
    }

    /// The locations of the built-in prototypes
    pub fn builtins(&self) -> &Builtins {
        &self.builtins
    }

    /// Stores a new type record, returning its location
    pub fn alloc(&mut self, kind: TypeKind) -> TypeLocation {
        self.records.push(kind);
        TypeLocation(self.records.len() - 1)
    }

    /// The record at the given location
    ///
    /// An undefined location resolves to the `Error` sentinel so that broken
    /// references absorb instead of panicking.
    pub fn get(&self, location: TypeLocation) -> &TypeKind {
        self.records.get(location.0).unwrap_or(&TypeKind::Error)
    }

    pub fn get_mut(&mut self, location: TypeLocation) -> Option<&mut TypeKind> {
        self.records.get_mut(location.0)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn object(&self, location: TypeLocation) -> Option<&ObjectType> {
        match self.get(location) {
            TypeKind::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn object_mut(&mut self, location: TypeLocation) -> Option<&mut ObjectType> {
        match self.get_mut(location)? {
            TypeKind::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn trait_type(&self, location: TypeLocation) -> Option<&TraitType> {
        match self.get(location) {
            TypeKind::Trait(trait_type) => Some(trait_type),
            _ => None,
        }
    }

    pub fn trait_type_mut(&mut self, location: TypeLocation) -> Option<&mut TraitType> {
        match self.get_mut(location)? {
            TypeKind::Trait(trait_type) => Some(trait_type),
            _ => None,
        }
    }

    pub fn block(&self, location: TypeLocation) -> Option<&BlockType> {
        match self.get(location) {
            TypeKind::Block(block) => Some(block),
            _ => None,
        }
    }

    pub fn block_mut(&mut self, location: TypeLocation) -> Option<&mut BlockType> {
        match self.get_mut(location)? {
            TypeKind::Block(block) => Some(block),
            _ => None,
        }
    }

    pub fn type_parameter(&self, location: TypeLocation) -> Option<&TypeParameterType> {
        match self.get(location) {
            TypeKind::TypeParameter(parameter) => Some(parameter),
            _ => None,
        }
    }

    /// True if the location resolves to the `Error` sentinel
    pub fn is_error(&self, location: TypeLocation) -> bool {
        matches!(self.get(location), TypeKind::Error)
    }

    /// Wraps a type in `Optional`. Wrapping is idempotent:
    /// `Optional(Optional(T))` collapses to `Optional(T)`.
    pub fn wrap_optional(&mut self, inner: TypeLocation) -> TypeLocation {
        match self.get(inner) {
            TypeKind::Optional(_) => inner,
            TypeKind::Error => self.builtins.error,
            _ => self.alloc(TypeKind::Optional(inner)),
        }
    }

    /// The wrapped type of an optional, if the location is one
    pub fn optional_inner(&self, location: TypeLocation) -> Option<TypeLocation> {
        match self.get(location) {
            TypeKind::Optional(inner) => Some(*inner),
            _ => None,
        }
    }

    /// Creates an `Array[T]` instance with the element type bound
    pub fn new_array_of_type(&mut self, element: TypeLocation) -> TypeLocation {
        let mut array = self
            .object(self.builtins.array)
            .expect("the Array builtin is an object")
            .clone();

        array
            .type_parameter_instances
            .bind("T".to_string(), element);
        self.alloc(TypeKind::Object(array))
    }

    /// The element type of an `Array[T]` instance, falling back to `Any`
    /// when the parameter is unbound
    pub fn array_element_type(&self, array: TypeLocation) -> TypeLocation {
        self.object(array)
            .and_then(|object| object.type_parameter_instances.get("T"))
            .unwrap_or(self.builtins.any)
    }

    /// Human-readable name of a type, used in diagnostics
    pub fn name_of(&self, location: TypeLocation) -> String {
        match self.get(location) {
            TypeKind::Object(object) => {
                if object.type_parameter_instances.is_empty() {
                    object.name.clone()
                } else {
                    let bound = object
                        .type_parameter_instances
                        .iter()
                        .map(|(_, value)| self.name_of(value))
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("{}[{}]", object.name, bound)
                }
            }
            TypeKind::Trait(trait_type) => trait_type.name.clone(),
            TypeKind::Block(block) => {
                let arguments = block
                    .arguments
                    .iter()
                    .map(|argument| self.name_of(argument.value_type))
                    .collect::<Vec<_>>()
                    .join(", ");
                let keyword = match block.kind {
                    BlockKind::Lambda => "lambda",
                    _ => "fn",
                };
                format!("{} ({}) -> {}", keyword, arguments, self.name_of(block.return_type))
            }
            TypeKind::TypeParameter(parameter) => parameter.name.clone(),
            TypeKind::Optional(inner) => format!("?{}", self.name_of(*inner)),
            TypeKind::Any => "Any".to_string(),
            TypeKind::SelfType => "Self".to_string(),
            TypeKind::Void => "Void".to_string(),
            TypeKind::Never => "Never".to_string(),
            TypeKind::Error => "<error>".to_string(),
        }
    }

    /// True if the name is reserved for a runtime-defined constant
    pub fn reserved_constant(name: &str) -> bool {
        RESERVED_CONSTANTS.contains(&name)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn builtins_are_registered() {
        let db = TypeDb::new();
        let builtins = db.builtins().clone();

        assert_eq!(db.name_of(builtins.object), "Object");
        assert_eq!(db.name_of(builtins.integer), "Integer");
        assert_eq!(db.name_of(builtins.never), "Never");

        let true_object = db.object(builtins.true_type).unwrap();
        assert_eq!(true_object.prototype, Some(builtins.boolean));
    }

    #[test]
    fn optional_wrapping_is_idempotent() {
        let mut db = TypeDb::new();
        let integer = db.builtins().integer;

        let optional = db.wrap_optional(integer);
        let twice = db.wrap_optional(optional);

        assert_eq!(optional, twice);
        assert_eq!(db.optional_inner(optional), Some(integer));
    }

    #[test]
    fn array_instances_bind_their_element_type() {
        let mut db = TypeDb::new();
        let integer = db.builtins().integer;

        let array = db.new_array_of_type(integer);
        assert_eq!(db.array_element_type(array), integer);
        assert_eq!(db.name_of(array), "Array[Integer]");
    }

    #[test]
    fn unbound_array_elements_fall_back_to_any() {
        let db = TypeDb::new();
        let array = db.builtins().array;
        assert_eq!(db.array_element_type(array), db.builtins().any);
    }

    #[test]
    fn undefined_locations_absorb_to_error() {
        let db = TypeDb::new();
        assert!(db.is_error(TypeLocation::UNDEFINED));
        assert_eq!(db.name_of(TypeLocation::UNDEFINED), "<error>");
    }

    #[test]
    fn reserved_constants() {
        assert!(TypeDb::reserved_constant("Object"));
        assert!(TypeDb::reserved_constant("Self"));
        assert!(!TypeDb::reserved_constant("Point"));
    }
}
