//! Block types: closures, lambdas and methods.

use indexmap::IndexMap;

use super::{TypeLocation, TypeParameterInstances, TypeParameters};

/// What kind of executable block a [`BlockType`] describes
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BlockKind {
    /// A closure capturing its lexical scope; `self` is the enclosing `self`
    Closure,
    /// A lambda; `self` is the module, so no local `self` capture
    Lambda,
    /// A method attached to an object or trait
    Method,
}

/// One declared argument of a block
#[derive(Debug, Clone)]
pub struct BlockArgument {
    pub name: String,
    pub value_type: TypeLocation,
    /// Whether the argument has a default value, making it optional
    pub has_default: bool,
    /// Whether this is the trailing rest argument
    pub rest: bool,
}

impl BlockArgument {
    pub fn new(name: String, value_type: TypeLocation) -> Self {
        Self {
            name,
            value_type,
            has_default: false,
            rest: false,
        }
    }

    pub fn with_default(name: String, value_type: TypeLocation) -> Self {
        Self {
            name,
            value_type,
            has_default: true,
            rest: false,
        }
    }

    pub fn rest(name: String, value_type: TypeLocation) -> Self {
        Self {
            name,
            value_type,
            has_default: false,
            rest: true,
        }
    }
}

/// The type of a closure, lambda or method
#[derive(Debug, Clone)]
pub struct BlockType {
    pub kind: BlockKind,
    pub name: String,
    pub self_type: TypeLocation,
    pub arguments: Vec<BlockArgument>,
    pub type_parameters: TypeParameters,
    pub type_parameter_instances: TypeParameterInstances,
    pub return_type: TypeLocation,
    pub throw_type: Option<TypeLocation>,
    /// True while the throw type may still be inferred from a `throw`
    pub infer_throw_type: bool,
    /// True while the return type may still be inferred from the body
    pub infer_return_type: bool,
    /// Additional trait requirements on the self type's type parameters,
    /// checked against the concrete receiver at every call site
    pub method_bounds: IndexMap<String, Vec<TypeLocation>>,
    /// Whether the block reads or writes locals of an enclosing scope
    pub captures: bool,
}

impl BlockType {
    pub fn new(kind: BlockKind, name: String, self_type: TypeLocation) -> Self {
        Self {
            kind,
            name,
            self_type,
            arguments: Vec::new(),
            type_parameters: TypeParameters::new(),
            type_parameter_instances: TypeParameterInstances::new(),
            return_type: TypeLocation::UNDEFINED,
            throw_type: None,
            infer_throw_type: false,
            infer_return_type: false,
            method_bounds: IndexMap::new(),
            captures: false,
        }
    }

    /// The number of arguments a caller must supply
    pub fn required_arguments(&self) -> usize {
        self.arguments
            .iter()
            .filter(|argument| !argument.has_default && !argument.rest)
            .count()
    }

    /// True if the block takes a trailing rest argument
    pub fn rest_argument(&self) -> bool {
        self.arguments.iter().any(|argument| argument.rest)
    }

    /// The valid range of positional argument counts: the minimum is the
    /// required count, the maximum is the total count, unbounded with a rest
    /// argument
    pub fn argument_count_range(&self) -> (usize, Option<usize>) {
        let minimum = self.required_arguments();
        let maximum = if self.rest_argument() {
            None
        } else {
            Some(self.arguments.len())
        };

        (minimum, maximum)
    }

    /// True if the given positional argument count is acceptable
    pub fn valid_argument_count(&self, given: usize) -> bool {
        let (minimum, maximum) = self.argument_count_range();
        given >= minimum && maximum.map(|max| given <= max).unwrap_or(true)
    }

    /// The declared type of the positional argument at `index`, together
    /// with whether it is the rest argument. Positions past the declared
    /// list map onto the rest argument when one exists.
    pub fn argument_type_at(&self, index: usize) -> Option<(TypeLocation, bool)> {
        if let Some(argument) = self.arguments.get(index) {
            return Some((argument.value_type, argument.rest));
        }

        self.arguments
            .iter()
            .find(|argument| argument.rest)
            .map(|argument| (argument.value_type, true))
    }

    /// The declared type of the keyword argument with the given name
    pub fn keyword_argument_type(&self, name: &str) -> Option<TypeLocation> {
        self.arguments
            .iter()
            .find(|argument| argument.name == name && !argument.rest)
            .map(|argument| argument.value_type)
    }

    /// The position of the keyword argument with the given name
    pub fn keyword_argument_index(&self, name: &str) -> Option<usize> {
        self.arguments
            .iter()
            .position(|argument| argument.name == name && !argument.rest)
    }

    /// True if calling this block requires a surrounding `try`
    pub fn throws(&self) -> bool {
        self.throw_type.is_some()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn method_with(arguments: Vec<BlockArgument>) -> BlockType {
        let mut block = BlockType::new(BlockKind::Method, "test".to_string(), TypeLocation(0));
        block.arguments = arguments;
        block
    }

    #[test]
    fn argument_count_range_without_defaults() {
        let block = method_with(vec![
            BlockArgument::new("a".to_string(), TypeLocation(1)),
            BlockArgument::new("b".to_string(), TypeLocation(2)),
        ]);

        assert_eq!(block.argument_count_range(), (2, Some(2)));
        assert!(block.valid_argument_count(2));
        assert!(!block.valid_argument_count(1));
        assert!(!block.valid_argument_count(3));
    }

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[case(2, true)]
    #[case(50, true)]
    fn rest_argument_makes_the_maximum_unbounded(#[case] given: usize, #[case] valid: bool) {
        let block = method_with(vec![
            BlockArgument::new("a".to_string(), TypeLocation(1)),
            BlockArgument::rest("rest".to_string(), TypeLocation(2)),
        ]);

        assert_eq!(block.argument_count_range(), (1, None));
        assert_eq!(block.valid_argument_count(given), valid);
    }

    #[test]
    fn trailing_positions_map_onto_the_rest_argument() {
        let block = method_with(vec![
            BlockArgument::new("a".to_string(), TypeLocation(1)),
            BlockArgument::rest("rest".to_string(), TypeLocation(2)),
        ]);

        assert_eq!(block.argument_type_at(0), Some((TypeLocation(1), false)));
        assert_eq!(block.argument_type_at(1), Some((TypeLocation(2), true)));
        assert_eq!(block.argument_type_at(9), Some((TypeLocation(2), true)));
    }

    #[test]
    fn keyword_arguments_resolve_by_name() {
        let block = method_with(vec![
            BlockArgument::new("a".to_string(), TypeLocation(1)),
            BlockArgument::with_default("b".to_string(), TypeLocation(2)),
        ]);

        assert_eq!(block.keyword_argument_type("b"), Some(TypeLocation(2)));
        assert_eq!(block.keyword_argument_index("b"), Some(1));
        assert_eq!(block.keyword_argument_type("missing"), None);
    }

    #[test]
    fn defaults_reduce_the_required_count() {
        let block = method_with(vec![
            BlockArgument::new("a".to_string(), TypeLocation(1)),
            BlockArgument::with_default("b".to_string(), TypeLocation(2)),
        ]);

        assert_eq!(block.argument_count_range(), (1, Some(2)));
    }
}
