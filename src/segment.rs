//! Path segments: the closed set of steps a resource path is built from.
//!
//! Every segment answers four questions: its identifier (the fixed or
//! type-derived name used in target paths), the entity type it carries (if
//! any), the schema elements it should be checked for vocabulary
//! annotations against, and the fragment it contributes to a rendered path
//! template. Keeping the set closed means classification and rendering are
//! exhaustive matches, so adding a segment kind is a compile-checked,
//! single-point change.

use std::collections::HashSet;

use crate::error::PathError;
use crate::model::{EdmModel, EntityType, NavigationProperty, Operation};
use crate::settings::Settings;

/// A navigation source step: entity set or singleton at the path root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationSourceSegment {
    pub name: String,
    /// Qualified entity type of the source.
    pub entity_type: String,
    /// Qualified type plus its base chain, nearest base first.
    pub type_chain: Vec<String>,
    /// Entity sets are collections; singletons are not.
    pub collection: bool,
}

/// A key step addressing one instance by primary or alternate key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySegment {
    /// Qualified entity type the key belongs to.
    pub entity_type: String,
    /// Plain type name, used for parameter-name prefixing.
    pub type_name: String,
    /// Key property names, order-significant.
    pub keys: Vec<String>,
    /// Alternate keys are always rendered parenthesized.
    pub alternate: bool,
}

/// A navigation property step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationSegment {
    pub name: String,
    /// Qualified declaring entity type.
    pub declaring_type: String,
    /// Qualified target entity type.
    pub target_type: String,
    /// Target type plus its base chain.
    pub type_chain: Vec<String>,
    pub collection: bool,
    pub contained: bool,
    /// Derived type names allowed for bound operation exposure.
    pub derived_type_constraints: Option<Vec<String>>,
}

/// A type-cast step narrowing to a derived type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeCastSegment {
    /// Namespace-qualified type name.
    pub qualified: String,
    /// Alias-qualified form, when the model declares an alias.
    pub aliased: Option<String>,
    pub type_chain: Vec<String>,
}

/// A bound operation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationSegment {
    pub name: String,
    pub qualified: String,
    /// Functions render a parameter list; actions do not.
    pub function: bool,
    /// Non-binding parameter names.
    pub parameters: Vec<String>,
    /// Escape-annotated function, eligible for `:/` call syntax.
    pub escape: bool,
}

/// An operation import step at the container root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationImportSegment {
    pub name: String,
}

/// A stream-valued structural property step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPropertySegment {
    pub name: String,
    pub entity_type: String,
}

/// The default media stream step (`$value`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamContentSegment {
    pub entity_type: String,
}

/// A complex-valued structural property step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexPropertySegment {
    pub name: String,
    pub entity_type: String,
}

/// One step of a resource path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    NavigationSource(NavigationSourceSegment),
    Key(KeySegment),
    Navigation(NavigationSegment),
    TypeCast(TypeCastSegment),
    Operation(OperationSegment),
    OperationImport(OperationImportSegment),
    Ref,
    Count,
    StreamContent(StreamContentSegment),
    StreamProperty(StreamPropertySegment),
    ComplexProperty(ComplexPropertySegment),
    Metadata,
}

/// Qualified type chain: the type itself, then its bases, nearest first.
fn type_chain(model: &EdmModel, entity_type: &EntityType) -> Result<Vec<String>, PathError> {
    let mut chain = vec![model.qualify(&entity_type.name)];
    for base in model.base_chain(entity_type)? {
        chain.push(model.qualify(&base.name));
    }
    Ok(chain)
}

/// Pick an unused parameter name, suffixing with an integer on collision.
/// The set is case-sensitive and shared across the whole path.
fn unique_name(base: &str, used: &mut HashSet<String>) -> String {
    if used.insert(base.to_string()) {
        return base.to_string();
    }
    let mut index = 1;
    loop {
        let candidate = format!("{}{}", base, index);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        index += 1;
    }
}

impl Segment {
    /// A navigation source step for an entity set (`collection` true) or
    /// singleton.
    pub fn navigation_source(
        model: &EdmModel,
        name: &str,
        entity_type: &EntityType,
        collection: bool,
    ) -> Result<Self, PathError> {
        Ok(Segment::NavigationSource(NavigationSourceSegment {
            name: name.to_string(),
            entity_type: model.qualify(&entity_type.name),
            type_chain: type_chain(model, entity_type)?,
            collection,
        }))
    }

    /// A primary key step for `entity_type`.
    pub fn key(model: &EdmModel, entity_type: &EntityType) -> Result<Self, PathError> {
        Ok(Segment::Key(KeySegment {
            entity_type: model.qualify(&entity_type.name),
            type_name: entity_type.name.clone(),
            keys: model.key_properties(entity_type)?.to_vec(),
            alternate: false,
        }))
    }

    /// An alternate key step for `entity_type`.
    pub fn alternate_key(model: &EdmModel, entity_type: &EntityType, keys: &[String]) -> Self {
        Segment::Key(KeySegment {
            entity_type: model.qualify(&entity_type.name),
            type_name: entity_type.name.clone(),
            keys: keys.to_vec(),
            alternate: true,
        })
    }

    /// A navigation property step from `declaring` to `target`.
    pub fn navigation(
        model: &EdmModel,
        declaring: &EntityType,
        navigation: &NavigationProperty,
        target: &EntityType,
    ) -> Result<Self, PathError> {
        Ok(Segment::Navigation(NavigationSegment {
            name: navigation.name.clone(),
            declaring_type: model.qualify(&declaring.name),
            target_type: model.qualify(&target.name),
            type_chain: type_chain(model, target)?,
            collection: navigation.collection,
            contained: navigation.contained,
            derived_type_constraints: navigation.derived_type_constraints.clone(),
        }))
    }

    /// A type-cast step to `entity_type`.
    pub fn type_cast(model: &EdmModel, entity_type: &EntityType) -> Result<Self, PathError> {
        Ok(Segment::TypeCast(TypeCastSegment {
            qualified: model.qualify(&entity_type.name),
            aliased: model.qualify_with_alias(&entity_type.name),
            type_chain: type_chain(model, entity_type)?,
        }))
    }

    /// A bound operation step.
    pub fn operation(model: &EdmModel, operation: &Operation) -> Self {
        Segment::Operation(OperationSegment {
            name: operation.name.clone(),
            qualified: model.qualify(&operation.name),
            function: operation.is_function(),
            parameters: operation.parameters.clone(),
            escape: operation.escape_function,
        })
    }

    /// An operation import step.
    pub fn operation_import(name: &str) -> Self {
        Segment::OperationImport(OperationImportSegment {
            name: name.to_string(),
        })
    }

    /// A stream property step on `entity_type`.
    pub fn stream_property(model: &EdmModel, entity_type: &EntityType, name: &str) -> Self {
        Segment::StreamProperty(StreamPropertySegment {
            name: name.to_string(),
            entity_type: model.qualify(&entity_type.name),
        })
    }

    /// The `$value` step on `entity_type`.
    pub fn stream_content(model: &EdmModel, entity_type: &EntityType) -> Self {
        Segment::StreamContent(StreamContentSegment {
            entity_type: model.qualify(&entity_type.name),
        })
    }

    /// A complex property step on `entity_type`.
    pub fn complex_property(model: &EdmModel, entity_type: &EntityType, name: &str) -> Self {
        Segment::ComplexProperty(ComplexPropertySegment {
            name: name.to_string(),
            entity_type: model.qualify(&entity_type.name),
        })
    }

    /// The fixed or type-derived name used for target-path strings.
    pub fn identifier(&self) -> String {
        match self {
            Segment::NavigationSource(s) => s.name.clone(),
            Segment::Key(s) => s.keys.join(","),
            Segment::Navigation(s) => s.name.clone(),
            Segment::TypeCast(s) => s.qualified.clone(),
            Segment::Operation(s) => s.qualified.clone(),
            Segment::OperationImport(s) => s.name.clone(),
            Segment::Ref => "$ref".to_string(),
            Segment::Count => "$count".to_string(),
            Segment::StreamContent(_) => "$value".to_string(),
            Segment::StreamProperty(s) => s.name.clone(),
            Segment::ComplexProperty(s) => s.name.clone(),
            Segment::Metadata => "$metadata".to_string(),
        }
    }

    /// The qualified entity type this segment carries, if any.
    pub fn entity_type(&self) -> Option<&str> {
        match self {
            Segment::NavigationSource(s) => Some(&s.entity_type),
            Segment::Key(s) => Some(&s.entity_type),
            Segment::Navigation(s) => Some(&s.target_type),
            Segment::TypeCast(s) => Some(&s.qualified),
            Segment::StreamContent(s) => Some(&s.entity_type),
            Segment::StreamProperty(s) => Some(&s.entity_type),
            Segment::ComplexProperty(s) => Some(&s.entity_type),
            Segment::Operation(_)
            | Segment::OperationImport(_)
            | Segment::Ref
            | Segment::Count
            | Segment::Metadata => None,
        }
    }

    /// The schema elements this segment should be checked for annotations
    /// against. Type-carrying segments include the whole base chain, so
    /// annotations on a base type apply to derived-type paths.
    pub fn annotatables(&self) -> Vec<String> {
        match self {
            Segment::NavigationSource(s) => {
                let mut targets = vec![s.name.clone()];
                targets.extend(s.type_chain.iter().cloned());
                targets
            }
            Segment::Key(s) => vec![s.entity_type.clone()],
            Segment::Navigation(s) => {
                let mut targets = vec![format!("{}/{}", s.declaring_type, s.name)];
                targets.extend(s.type_chain.iter().cloned());
                targets
            }
            Segment::TypeCast(s) => s.type_chain.clone(),
            Segment::Operation(s) => vec![s.qualified.clone()],
            Segment::OperationImport(s) => vec![s.name.clone()],
            Segment::StreamProperty(s) => vec![format!("{}/{}", s.entity_type, s.name)],
            Segment::StreamContent(s) => vec![s.entity_type.clone()],
            Segment::ComplexProperty(s) => vec![format!("{}/{}", s.entity_type, s.name)],
            Segment::Ref | Segment::Count | Segment::Metadata => Vec::new(),
        }
    }

    /// The path parameters this segment introduces: `(source, template)`
    /// name pairs. Template names are allocated through `used`, so threading
    /// one set through a whole path keeps them unique.
    pub fn parameters(
        &self,
        settings: &Settings,
        used: &mut HashSet<String>,
    ) -> Vec<(String, String)> {
        match self {
            Segment::Key(s) => s
                .keys
                .iter()
                .map(|key| {
                    let base = if settings.prefix_entity_type_name_before_key
                        && s.keys.len() == 1
                        && !s.alternate
                    {
                        format!("{}-{}", s.type_name, key)
                    } else {
                        key.clone()
                    };
                    (key.clone(), unique_name(&base, used))
                })
                .collect(),
            Segment::Operation(s) if s.function => s
                .parameters
                .iter()
                .map(|p| (p.clone(), unique_name(p, used)))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// The fragment this segment contributes to a rendered path, without
    /// the separator. Key and Operation segments allocate parameter names
    /// through `used`.
    pub fn render_name(&self, settings: &Settings, used: &mut HashSet<String>) -> String {
        match self {
            Segment::NavigationSource(s) => s.name.clone(),
            Segment::Key(s) => {
                let params = self.parameters(settings, used);
                if s.keys.len() == 1 && !s.alternate {
                    format!("{{{}}}", params[0].1)
                } else {
                    params
                        .iter()
                        .map(|(source, template)| format!("{}={{{}}}", source, template))
                        .collect::<Vec<_>>()
                        .join(",")
                }
            }
            Segment::Navigation(s) => s.name.clone(),
            Segment::TypeCast(s) => {
                if settings.enable_alias_for_type_cast_segments {
                    s.aliased.clone().unwrap_or_else(|| s.qualified.clone())
                } else {
                    s.qualified.clone()
                }
            }
            Segment::Operation(s) => {
                let name = if settings.enable_unqualified_call {
                    &s.name
                } else {
                    &s.qualified
                };
                if s.function {
                    let params = self.parameters(settings, used);
                    let args = params
                        .iter()
                        .map(|(source, template)| format!("{}={{{}}}", source, template))
                        .collect::<Vec<_>>()
                        .join(",");
                    format!("{}({})", name, args)
                } else {
                    name.clone()
                }
            }
            Segment::OperationImport(s) => s.name.clone(),
            Segment::Ref => "$ref".to_string(),
            Segment::Count => "$count".to_string(),
            Segment::StreamContent(_) => "$value".to_string(),
            Segment::StreamProperty(s) => s.name.clone(),
            Segment::ComplexProperty(s) => s.name.clone(),
            Segment::Metadata => "$metadata".to_string(),
        }
    }

    /// Whether this segment renders parenthesized, glued to the previous
    /// fragment with no slash.
    pub(crate) fn parenthesized(&self, settings: &Settings) -> bool {
        match self {
            Segment::Key(s) => !settings.enable_key_as_segment || s.alternate,
            _ => false,
        }
    }

    /// Whether this segment renders with the `:/` escaped-call separator.
    pub(crate) fn escaped_call(&self, settings: &Settings) -> bool {
        match self {
            Segment::Operation(s) => {
                s.function && s.escape && settings.enable_uri_escape_function_call
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EdmModel, EntityType, NavigationProperty, Operation};

    fn model() -> EdmModel {
        EdmModel::new("Sales")
            .alias("S")
            .entity_type(EntityType::new("Party").key("Id"))
            .entity_type(
                EntityType::new("Customer")
                    .base("Party")
                    .navigation(NavigationProperty::contained_many("Orders", "Order")),
            )
            .entity_type(EntityType::new("Order").key("Id"))
    }

    fn render(segment: &Segment, settings: &Settings) -> String {
        let mut used = HashSet::new();
        segment.render_name(settings, &mut used)
    }

    #[test]
    fn identifiers() {
        let model = model();
        let customer = model.find_entity_type("Customer").unwrap();
        let order = model.find_entity_type("Order").unwrap();

        let source = Segment::navigation_source(&model, "Customers", customer, true).unwrap();
        assert_eq!(source.identifier(), "Customers");

        let key = Segment::key(&model, order).unwrap();
        assert_eq!(key.identifier(), "Id");

        assert_eq!(Segment::Ref.identifier(), "$ref");
        assert_eq!(Segment::Count.identifier(), "$count");
        assert_eq!(Segment::Metadata.identifier(), "$metadata");
    }

    #[test]
    fn source_annotatables_include_base_chain() {
        let model = model();
        let customer = model.find_entity_type("Customer").unwrap();
        let source = Segment::navigation_source(&model, "Customers", customer, true).unwrap();
        assert_eq!(
            source.annotatables(),
            ["Customers", "Sales.Customer", "Sales.Party"]
        );
    }

    #[test]
    fn key_renders_braced_parameter() {
        let model = model();
        let order = model.find_entity_type("Order").unwrap();
        let key = Segment::key(&model, order).unwrap();
        assert_eq!(render(&key, &Settings::default()), "{Id}");
    }

    #[test]
    fn key_prefixes_type_name() {
        let model = model();
        let order = model.find_entity_type("Order").unwrap();
        let key = Segment::key(&model, order).unwrap();
        let settings = Settings::new().prefix_type_name_before_key(true);
        assert_eq!(render(&key, &settings), "{Order-Id}");
    }

    #[test]
    fn key_deduplicates_parameter_names() {
        let model = model();
        let order = model.find_entity_type("Order").unwrap();
        let key = Segment::key(&model, order).unwrap();
        let settings = Settings::default();

        let mut used = HashSet::new();
        assert_eq!(key.render_name(&settings, &mut used), "{Id}");
        assert_eq!(key.render_name(&settings, &mut used), "{Id1}");
        assert_eq!(key.render_name(&settings, &mut used), "{Id2}");
    }

    #[test]
    fn composite_key_renders_pairs() {
        let model = EdmModel::new("NS")
            .entity_type(EntityType::new("Line").key("OrderId").key("LineNo"));
        let line = model.find_entity_type("Line").unwrap();
        let key = Segment::key(&model, line).unwrap();
        assert_eq!(
            render(&key, &Settings::default()),
            "OrderId={OrderId},LineNo={LineNo}"
        );
    }

    #[test]
    fn alternate_key_renders_pairs_and_stays_parenthesized() {
        let model = model();
        let order = model.find_entity_type("Order").unwrap();
        let alt = Segment::alternate_key(&model, order, &["Number".to_string()]);
        assert_eq!(render(&alt, &Settings::default()), "Number={Number}");

        // Still parenthesized when keys render as segments.
        let settings = Settings::new().key_as_segment(true);
        assert!(alt.parenthesized(&settings));
        let primary = Segment::key(&model, order).unwrap();
        assert!(!primary.parenthesized(&settings));
    }

    #[test]
    fn type_cast_renders_alias_when_enabled() {
        let model = model();
        let customer = model.find_entity_type("Customer").unwrap();
        let cast = Segment::type_cast(&model, customer).unwrap();
        assert_eq!(render(&cast, &Settings::default()), "Sales.Customer");
        let settings = Settings::new().alias_for_type_casts(true);
        assert_eq!(render(&cast, &settings), "S.Customer");
    }

    #[test]
    fn function_renders_parameters() {
        let model = model();
        let op = Operation::function("Rate")
            .bind_to("Customer")
            .parameter("score");
        let segment = Segment::operation(&model, &op);
        assert_eq!(render(&segment, &Settings::default()), "Sales.Rate(score={score})");
        let settings = Settings::new().unqualified_call(true);
        assert_eq!(render(&segment, &settings), "Rate(score={score})");
    }

    #[test]
    fn action_renders_without_parameter_list() {
        let model = model();
        let op = Operation::action("Reset").bind_to("Customer");
        let segment = Segment::operation(&model, &op);
        assert_eq!(render(&segment, &Settings::default()), "Sales.Reset");
    }

    #[test]
    fn escaped_call_requires_flag_and_setting() {
        let model = model();
        let op = Operation::function("Lookup").bind_to("Customer").escape();
        let segment = Segment::operation(&model, &op);
        assert!(!segment.escaped_call(&Settings::default()));
        let settings = Settings::new().uri_escape_function_call(true);
        assert!(segment.escaped_call(&settings));

        let plain = Segment::operation(&model, &Operation::function("Other").bind_to("Customer"));
        assert!(!plain.escaped_call(&settings));
    }
}
