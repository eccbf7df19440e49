//! In-memory entity data model: the read-only schema graph that path
//! enumeration walks.
//!
//! A model holds one namespace of entity types (with single inheritance and
//! ordered keys), the navigation sources exposing them (entity sets and
//! singletons), and the operations of the container. Models are either
//! assembled programmatically through the builder constructors or loaded
//! from a camelCase JSON document:
//!
//! ```json
//! {
//!   "namespace": "Sales",
//!   "entityTypes": [
//!     {
//!       "name": "Customer",
//!       "keys": ["Id"],
//!       "navigationProperties": [
//!         { "name": "Orders", "target": "Order", "collection": true, "contained": true }
//!       ]
//!     },
//!     { "name": "Order", "keys": ["Id"] }
//!   ],
//!   "entitySets": [{ "name": "Customers", "entityType": "Customer" }],
//!   "singletons": [{ "name": "Me", "entityType": "Customer" }]
//! }
//! ```

use std::collections::HashSet;
use std::path::Path as FsPath;

use serde::Deserialize;

use crate::error::{LoadError, PathError};

/// A structural (non-navigation) property of an entity type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralProperty {
    pub name: String,
    /// Stream-valued properties produce media entity paths.
    #[serde(default)]
    pub is_stream: bool,
}

impl StructuralProperty {
    /// A plain (non-stream) property.
    pub fn new(name: impl Into<String>) -> Self {
        StructuralProperty {
            name: name.into(),
            is_stream: false,
        }
    }

    /// A stream-valued property.
    pub fn stream(name: impl Into<String>) -> Self {
        StructuralProperty {
            name: name.into(),
            is_stream: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Navigability restriction on a navigation property.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationRestriction {
    /// Non-navigable properties produce no paths at all.
    #[serde(default = "default_true")]
    pub navigable: bool,
    /// Contained collections that are not indexable by key get no key
    /// segment and no recursion below it.
    #[serde(default = "default_true")]
    pub indexable_by_key: bool,
}

impl Default for NavigationRestriction {
    fn default() -> Self {
        NavigationRestriction {
            navigable: true,
            indexable_by_key: true,
        }
    }
}

/// A typed relationship from one entity type to another.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationProperty {
    pub name: String,
    /// Target entity type name.
    pub target: String,
    /// Target multiplicity: many (collection) or one.
    #[serde(default)]
    pub collection: bool,
    /// Containment: the target's lifetime is owned by the source.
    /// Non-contained properties are references.
    #[serde(default)]
    pub contained: bool,
    #[serde(default)]
    pub restriction: Option<NavigationRestriction>,
    /// Derived type names a bound operation may be exposed against through
    /// this property.
    #[serde(default)]
    pub derived_type_constraints: Option<Vec<String>>,
}

impl NavigationProperty {
    /// A contained collection navigation property.
    pub fn contained_many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::build(name, target, true, true)
    }

    /// A contained single-valued navigation property.
    pub fn contained_single(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::build(name, target, false, true)
    }

    /// A referenced (non-contained) collection navigation property.
    pub fn referenced_many(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::build(name, target, true, false)
    }

    /// A referenced single-valued navigation property.
    pub fn referenced_single(name: impl Into<String>, target: impl Into<String>) -> Self {
        Self::build(name, target, false, false)
    }

    fn build(
        name: impl Into<String>,
        target: impl Into<String>,
        collection: bool,
        contained: bool,
    ) -> Self {
        NavigationProperty {
            name: name.into(),
            target: target.into(),
            collection,
            contained,
            restriction: None,
            derived_type_constraints: None,
        }
    }

    /// Attach a navigability restriction.
    pub fn restriction(mut self, restriction: NavigationRestriction) -> Self {
        self.restriction = Some(restriction);
        self
    }

    /// Allow a derived type for bound operation exposure.
    pub fn derived_type_constraint(mut self, type_name: impl Into<String>) -> Self {
        self.derived_type_constraints
            .get_or_insert_with(Vec::new)
            .push(type_name.into());
        self
    }

    pub(crate) fn navigable(&self) -> bool {
        self.restriction.as_ref().map_or(true, |r| r.navigable)
    }

    pub(crate) fn indexable_by_key(&self) -> bool {
        self.restriction
            .as_ref()
            .map_or(true, |r| r.indexable_by_key)
    }
}

/// An entity type: named, keyed, optionally derived from a base type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityType {
    pub name: String,
    #[serde(default)]
    pub base_type: Option<String>,
    /// Declared key property names, order-significant. Derived types
    /// inherit keys from the type that declares them.
    #[serde(default)]
    pub keys: Vec<String>,
    /// Alternate keys, each an ordered list of property names.
    #[serde(default)]
    pub alternate_keys: Vec<Vec<String>>,
    #[serde(default)]
    pub properties: Vec<StructuralProperty>,
    #[serde(default)]
    pub navigation_properties: Vec<NavigationProperty>,
    /// The type carries a default media stream (`$value`).
    #[serde(default)]
    pub has_stream: bool,
}

impl EntityType {
    pub fn new(name: impl Into<String>) -> Self {
        EntityType {
            name: name.into(),
            base_type: None,
            keys: Vec::new(),
            alternate_keys: Vec::new(),
            properties: Vec::new(),
            navigation_properties: Vec::new(),
            has_stream: false,
        }
    }

    /// Add a key property.
    pub fn key(mut self, name: impl Into<String>) -> Self {
        self.keys.push(name.into());
        self
    }

    /// Add an alternate key.
    pub fn alternate_key(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.alternate_keys
            .push(names.into_iter().map(Into::into).collect());
        self
    }

    /// Set the base type.
    pub fn base(mut self, name: impl Into<String>) -> Self {
        self.base_type = Some(name.into());
        self
    }

    /// Add a structural property.
    pub fn property(mut self, property: StructuralProperty) -> Self {
        self.properties.push(property);
        self
    }

    /// Add a navigation property.
    pub fn navigation(mut self, navigation: NavigationProperty) -> Self {
        self.navigation_properties.push(navigation);
        self
    }

    /// Mark the type as carrying a default media stream.
    pub fn with_stream(mut self) -> Self {
        self.has_stream = true;
        self
    }
}

/// An entity set: a navigation source exposing a collection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySet {
    pub name: String,
    pub entity_type: String,
    #[serde(default)]
    pub derived_type_constraints: Option<Vec<String>>,
}

/// A singleton: a navigation source exposing exactly one instance.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Singleton {
    pub name: String,
    pub entity_type: String,
    #[serde(default)]
    pub derived_type_constraints: Option<Vec<String>>,
}

/// Action or function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Action,
    Function,
}

/// Binding signature of a bound operation: the first parameter's type.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationBinding {
    pub entity_type: String,
    /// Bound to `Collection(entity_type)` rather than a single instance.
    #[serde(default)]
    pub collection: bool,
}

/// An action or function, bound or unbound.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub name: String,
    pub kind: OperationKind,
    #[serde(default)]
    pub binding: Option<OperationBinding>,
    /// Non-binding parameter names, rendered for functions.
    #[serde(default)]
    pub parameters: Vec<String>,
    /// Escape-annotated function, eligible for `:/` call syntax.
    #[serde(default)]
    pub escape_function: bool,
}

impl Operation {
    pub fn action(name: impl Into<String>) -> Self {
        Self::build(name, OperationKind::Action)
    }

    pub fn function(name: impl Into<String>) -> Self {
        Self::build(name, OperationKind::Function)
    }

    fn build(name: impl Into<String>, kind: OperationKind) -> Self {
        Operation {
            name: name.into(),
            kind,
            binding: None,
            parameters: Vec::new(),
            escape_function: false,
        }
    }

    /// Bind to a single instance of an entity type.
    pub fn bind_to(mut self, entity_type: impl Into<String>) -> Self {
        self.binding = Some(OperationBinding {
            entity_type: entity_type.into(),
            collection: false,
        });
        self
    }

    /// Bind to a collection of an entity type.
    pub fn bind_to_collection(mut self, entity_type: impl Into<String>) -> Self {
        self.binding = Some(OperationBinding {
            entity_type: entity_type.into(),
            collection: true,
        });
        self
    }

    /// Add a non-binding parameter.
    pub fn parameter(mut self, name: impl Into<String>) -> Self {
        self.parameters.push(name.into());
        self
    }

    /// Mark as an escape function.
    pub fn escape(mut self) -> Self {
        self.escape_function = true;
        self
    }

    pub(crate) fn is_function(&self) -> bool {
        self.kind == OperationKind::Function
    }
}

/// An operation import exposing an unbound operation at the container root.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationImport {
    pub name: String,
    pub operation: String,
}

impl OperationImport {
    pub fn new(name: impl Into<String>, operation: impl Into<String>) -> Self {
        OperationImport {
            name: name.into(),
            operation: operation.into(),
        }
    }
}

/// The schema graph: one namespace of types, sources, and operations.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdmModel {
    pub namespace: String,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub entity_types: Vec<EntityType>,
    #[serde(default)]
    pub entity_sets: Vec<EntitySet>,
    #[serde(default)]
    pub singletons: Vec<Singleton>,
    #[serde(default)]
    pub operations: Vec<Operation>,
    #[serde(default)]
    pub operation_imports: Vec<OperationImport>,
}

impl EdmModel {
    pub fn new(namespace: impl Into<String>) -> Self {
        EdmModel {
            namespace: namespace.into(),
            alias: None,
            entity_types: Vec::new(),
            entity_sets: Vec::new(),
            singletons: Vec::new(),
            operations: Vec::new(),
            operation_imports: Vec::new(),
        }
    }

    /// Set the namespace alias.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Add an entity type.
    pub fn entity_type(mut self, entity_type: EntityType) -> Self {
        self.entity_types.push(entity_type);
        self
    }

    /// Add an entity set.
    pub fn entity_set(mut self, name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        self.entity_sets.push(EntitySet {
            name: name.into(),
            entity_type: entity_type.into(),
            derived_type_constraints: None,
        });
        self
    }

    /// Add an entity set carrying derived-type constraints.
    pub fn entity_set_constrained(
        mut self,
        name: impl Into<String>,
        entity_type: impl Into<String>,
        derived_types: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.entity_sets.push(EntitySet {
            name: name.into(),
            entity_type: entity_type.into(),
            derived_type_constraints: Some(derived_types.into_iter().map(Into::into).collect()),
        });
        self
    }

    /// Add a singleton.
    pub fn singleton(mut self, name: impl Into<String>, entity_type: impl Into<String>) -> Self {
        self.singletons.push(Singleton {
            name: name.into(),
            entity_type: entity_type.into(),
            derived_type_constraints: None,
        });
        self
    }

    /// Add an operation.
    pub fn operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    /// Add an operation import.
    pub fn operation_import(mut self, import: OperationImport) -> Self {
        self.operation_imports.push(import);
        self
    }

    // --- Lookup helpers ---

    /// Find an entity type by plain name.
    pub fn find_entity_type(&self, name: &str) -> Option<&EntityType> {
        self.entity_types.iter().find(|t| t.name == name)
    }

    /// Find an entity type, erroring with the referencing element named.
    pub(crate) fn entity_type_required(
        &self,
        name: &str,
        referenced_by: &str,
    ) -> Result<&EntityType, PathError> {
        self.find_entity_type(name)
            .ok_or_else(|| PathError::UnknownEntityType {
                name: name.to_string(),
                referenced_by: referenced_by.to_string(),
            })
    }

    /// Qualify a plain type or operation name with the namespace.
    pub fn qualify(&self, name: &str) -> String {
        format!("{}.{}", self.namespace, name)
    }

    /// Qualify a name with the alias, if one is declared.
    pub fn qualify_with_alias(&self, name: &str) -> Option<String> {
        self.alias.as_ref().map(|a| format!("{}.{}", a, name))
    }

    /// Strip the namespace from a qualified name.
    pub(crate) fn local_name<'a>(&self, qualified: &'a str) -> &'a str {
        qualified
            .strip_prefix(&self.namespace)
            .and_then(|rest| rest.strip_prefix('.'))
            .unwrap_or(qualified)
    }

    /// The base-type chain of `entity_type`, nearest base first, excluding
    /// the type itself. Errors on an unknown base or a cyclic chain.
    pub fn base_chain(&self, entity_type: &EntityType) -> Result<Vec<&EntityType>, PathError> {
        let mut chain = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        seen.insert(&entity_type.name);

        let mut current = entity_type;
        while let Some(base_name) = &current.base_type {
            if !seen.insert(base_name) {
                return Err(PathError::BaseTypeCycle {
                    name: base_name.clone(),
                });
            }
            let base = self.entity_type_required(
                base_name,
                &format!("entity type '{}'", current.name),
            )?;
            chain.push(base);
            current = base;
        }
        Ok(chain)
    }

    /// Whether `derived` is `base` or transitively derives from it.
    pub fn is_assignable_from(&self, base: &str, derived: &str) -> Result<bool, PathError> {
        if base == derived {
            return Ok(true);
        }
        let derived_type = match self.find_entity_type(derived) {
            Some(t) => t,
            None => return Ok(false),
        };
        Ok(self
            .base_chain(derived_type)?
            .iter()
            .any(|t| t.name == base))
    }

    /// The key properties of `entity_type`, walking the base chain to the
    /// declaring type. Errors when no type in the chain declares keys.
    pub fn key_properties<'a>(
        &'a self,
        entity_type: &'a EntityType,
    ) -> Result<&'a [String], PathError> {
        if !entity_type.keys.is_empty() {
            return Ok(&entity_type.keys);
        }
        for base in self.base_chain(entity_type)? {
            if !base.keys.is_empty() {
                return Ok(&base.keys);
            }
        }
        Err(PathError::MissingKey {
            name: entity_type.name.clone(),
        })
    }
}

/// Load a model from a JSON file.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist, or
/// `LoadError::InvalidJson` if it isn't a valid model document.
pub fn load_model(path: &FsPath) -> Result<EdmModel, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    load_model_str(&content)
}

/// Load a model from a JSON string.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string isn't a valid model
/// document.
pub fn load_model_str(content: &str) -> Result<EdmModel, LoadError> {
    serde_json::from_str(content).map_err(|source| LoadError::InvalidJson { source })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_model() -> EdmModel {
        EdmModel::new("Sales")
            .entity_type(EntityType::new("Party").key("Id"))
            .entity_type(EntityType::new("Customer").base("Party"))
            .entity_type(EntityType::new("Vip").base("Customer"))
    }

    #[test]
    fn qualify_and_local_name() {
        let model = EdmModel::new("Sales").alias("S");
        assert_eq!(model.qualify("Customer"), "Sales.Customer");
        assert_eq!(
            model.qualify_with_alias("Customer").as_deref(),
            Some("S.Customer")
        );
        assert_eq!(model.local_name("Sales.Customer"), "Customer");
        assert_eq!(model.local_name("Customer"), "Customer");
    }

    #[test]
    fn base_chain_walks_to_root() {
        let model = sample_model();
        let vip = model.find_entity_type("Vip").unwrap();
        let chain: Vec<&str> = model
            .base_chain(vip)
            .unwrap()
            .iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(chain, ["Customer", "Party"]);
    }

    #[test]
    fn base_chain_detects_cycle() {
        let model = EdmModel::new("NS")
            .entity_type(EntityType::new("A").base("B"))
            .entity_type(EntityType::new("B").base("A"));
        let a = model.find_entity_type("A").unwrap();
        assert!(matches!(
            model.base_chain(a),
            Err(PathError::BaseTypeCycle { .. })
        ));
    }

    #[test]
    fn assignability() {
        let model = sample_model();
        assert!(model.is_assignable_from("Party", "Vip").unwrap());
        assert!(model.is_assignable_from("Customer", "Customer").unwrap());
        assert!(!model.is_assignable_from("Vip", "Party").unwrap());
    }

    #[test]
    fn key_properties_inherited() {
        let model = sample_model();
        let vip = model.find_entity_type("Vip").unwrap();
        assert_eq!(model.key_properties(vip).unwrap(), ["Id"]);
    }

    #[test]
    fn key_properties_missing() {
        let model = EdmModel::new("NS").entity_type(EntityType::new("Bare"));
        let bare = model.find_entity_type("Bare").unwrap();
        assert!(matches!(
            model.key_properties(bare),
            Err(PathError::MissingKey { .. })
        ));
    }

    #[test]
    fn load_model_from_json() {
        let model = load_model_str(
            r#"{
                "namespace": "Sales",
                "entityTypes": [
                    {
                        "name": "Customer",
                        "keys": ["Id"],
                        "navigationProperties": [
                            { "name": "Orders", "target": "Order", "collection": true, "contained": true }
                        ]
                    },
                    { "name": "Order", "keys": ["Id"] }
                ],
                "entitySets": [{ "name": "Customers", "entityType": "Customer" }],
                "singletons": [{ "name": "Me", "entityType": "Customer" }]
            }"#,
        )
        .unwrap();

        assert_eq!(model.entity_types.len(), 2);
        assert_eq!(model.entity_sets[0].name, "Customers");
        let customer = model.find_entity_type("Customer").unwrap();
        assert!(customer.navigation_properties[0].contained);
        assert!(customer.navigation_properties[0].collection);
    }

    #[test]
    fn load_model_invalid_json() {
        assert!(matches!(
            load_model_str("{ not json }"),
            Err(LoadError::InvalidJson { .. })
        ));
    }

    #[test]
    fn restriction_defaults_are_permissive() {
        let nav = NavigationProperty::contained_many("Orders", "Order");
        assert!(nav.navigable());
        assert!(nav.indexable_by_key());

        let nav = nav.restriction(NavigationRestriction {
            navigable: true,
            indexable_by_key: false,
        });
        assert!(!nav.indexable_by_key());
    }
}
