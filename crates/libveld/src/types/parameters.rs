//! Type parameters and their instance bindings.
//!
//! A declared type parameter is itself a type record
//! ([`TypeParameterType`]), so an uninstantiated generic can flow through
//! the checker like any other type. Instantiation binds parameter names to
//! concrete type locations in a [`TypeParameterInstances`] map carried by
//! the instantiated copy.

use indexmap::IndexMap;

use super::TypeLocation;

/// A type parameter bounded by required traits
#[derive(Debug, Clone)]
pub struct TypeParameterType {
    pub name: String,
    /// Traits any bound type must implement, keyed by trait name
    pub required_traits: IndexMap<String, TypeLocation>,
    /// Whether values of this parameter may be mutated
    pub mutable: bool,
}

impl TypeParameterType {
    pub fn new(name: String) -> Self {
        Self {
            name,
            required_traits: IndexMap::new(),
            mutable: false,
        }
    }

    pub fn require_trait(&mut self, name: String, location: TypeLocation) {
        self.required_traits.insert(name, location);
    }
}

/// The ordered type parameters declared by a type or method
#[derive(Debug, Clone, Default)]
pub struct TypeParameters {
    parameters: IndexMap<String, TypeLocation>,
}

impl TypeParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, name: String, location: TypeLocation) {
        self.parameters.insert(name, location);
    }

    pub fn get(&self, name: &str) -> Option<TypeLocation> {
        self.parameters.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.parameters.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, TypeLocation)> {
        self.parameters.iter().map(|(name, location)| (name, *location))
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

/// Bindings of type-parameter names to concrete types
#[derive(Debug, Clone, Default)]
pub struct TypeParameterInstances {
    values: IndexMap<String, TypeLocation>,
}

impl TypeParameterInstances {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(&mut self, name: String, value: TypeLocation) {
        self.values.insert(name, value);
    }

    pub fn get(&self, name: &str) -> Option<TypeLocation> {
        self.values.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, TypeLocation)> {
        self.values.iter().map(|(name, location)| (name, *location))
    }

    /// Copies every binding of `other` into this map, overwriting clashes
    pub fn merge(&mut self, other: &TypeParameterInstances) {
        for (name, value) in other.iter() {
            self.values.insert(name.clone(), value);
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn parameters_keep_declaration_order() {
        let mut parameters = TypeParameters::new();
        parameters.define("K".to_string(), TypeLocation(1));
        parameters.define("V".to_string(), TypeLocation(2));

        let names = parameters.names().cloned().collect::<Vec<_>>();
        assert_eq!(names, vec!["K".to_string(), "V".to_string()]);
    }

    #[test]
    fn merge_overwrites_existing_bindings() {
        let mut first = TypeParameterInstances::new();
        first.bind("T".to_string(), TypeLocation(1));

        let mut second = TypeParameterInstances::new();
        second.bind("T".to_string(), TypeLocation(2));
        second.bind("U".to_string(), TypeLocation(3));

        first.merge(&second);

        assert_eq!(first.get("T"), Some(TypeLocation(2)));
        assert_eq!(first.get("U"), Some(TypeLocation(3)));
    }
}
