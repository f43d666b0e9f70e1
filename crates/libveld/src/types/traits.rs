//! Trait types: requirements and default methods.

use indexmap::IndexMap;

use crate::symbol::SymbolTable;

use super::{TypeLocation, TypeParameterInstances, TypeParameters};

/// A trait: a named set of required methods, required traits and default
/// methods.
///
/// A trait is *empty* right after its first declaration. Once it has
/// required methods, default methods or implementers, a later `trait`
/// declaration with the same name is a redefinition error rather than an
/// extension.
#[derive(Debug, Clone)]
pub struct TraitType {
    pub name: String,
    pub type_parameters: TypeParameters,
    pub type_parameter_instances: TypeParameterInstances,
    /// Traits an implementer must already implement, keyed by name
    pub required_traits: IndexMap<String, TypeLocation>,
    /// Methods an implementer must provide
    pub required_methods: SymbolTable,
    /// Methods copied onto every implementer
    pub default_methods: SymbolTable,
    /// Names of the types implementing this trait
    pub implemented_by: Vec<String>,
}

impl TraitType {
    pub fn new(name: String) -> Self {
        Self {
            name,
            type_parameters: TypeParameters::new(),
            type_parameter_instances: TypeParameterInstances::new(),
            required_traits: IndexMap::new(),
            required_methods: SymbolTable::new(),
            default_methods: SymbolTable::new(),
            implemented_by: Vec::new(),
        }
    }

    /// True while the trait has no methods and no implementers, meaning a
    /// redeclaration may still extend it
    pub fn is_empty(&self) -> bool {
        self.required_methods.is_empty()
            && self.default_methods.is_empty()
            && self.implemented_by.is_empty()
    }

    pub fn require_trait(&mut self, name: String, location: TypeLocation) {
        self.required_traits.insert(name, location);
    }

    pub fn add_implementer(&mut self, name: String) {
        self.implemented_by.push(name);
    }

    pub fn remove_implementer(&mut self, name: &str) {
        self.implemented_by.retain(|implementer| implementer != name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TypeLocation as Location;

    #[test]
    fn a_new_trait_is_empty() {
        let trait_type = TraitType::new("ToString".to_string());
        assert!(trait_type.is_empty());
    }

    #[test]
    fn required_methods_make_a_trait_non_empty() {
        let mut trait_type = TraitType::new("ToString".to_string());
        trait_type
            .required_methods
            .define("to_string".to_string(), Location(3), false, None)
            .unwrap();

        assert!(!trait_type.is_empty());
    }

    #[test]
    fn implementers_make_a_trait_non_empty() {
        let mut trait_type = TraitType::new("ToString".to_string());
        trait_type.add_implementer("Point".to_string());
        assert!(!trait_type.is_empty());

        trait_type.remove_implementer("Point");
        assert!(trait_type.is_empty());
    }
}
