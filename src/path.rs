//! Resource paths: ordered segment sequences with a derived classification
//! and a canonical name.
//!
//! The enumerator never mutates a shared working path. Each recursive call
//! receives an immutable prefix and derives child paths with [`Path::extended`],
//! taking a snapshot only at acceptance points, so recorded results never
//! alias traversal state and there is no push/pop balance to maintain.

use std::collections::HashSet;

use serde::Serialize;

use crate::segment::Segment;
use crate::settings::Settings;

/// Classification of a path, derived from its segment sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PathKind {
    Metadata,
    Count,
    TypeCast,
    ComplexProperty,
    MediaEntity,
    Ref,
    OperationImport,
    Operation,
    NavigationProperty,
    EntitySet,
    Singleton,
    Entity,
    Unknown,
}

/// One path parameter: the schema property or operation parameter name and
/// the (possibly deduplicated or prefixed) template name it renders as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterMapping {
    /// Index of the segment that introduces the parameter.
    pub segment: usize,
    /// Schema-side name (key property or function parameter).
    pub source: String,
    /// Name used in the rendered path template.
    pub template: String,
}

/// An ordered sequence of segments.
#[derive(Debug, Clone, Default)]
pub struct Path {
    segments: Vec<Segment>,
    kind: std::cell::Cell<Option<PathKind>>,
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.segments == other.segments
    }
}

impl Eq for Path {}

impl Path {
    /// An empty path.
    pub fn new() -> Self {
        Path::default()
    }

    /// A path built from a complete segment sequence.
    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Path {
            segments,
            kind: std::cell::Cell::new(None),
        }
    }

    /// Append a segment, invalidating the cached classification.
    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
        self.kind.set(None);
    }

    /// Remove and return the last segment, invalidating the cached
    /// classification.
    ///
    /// # Panics
    ///
    /// Panics on an empty path: a caller popped more than it pushed, which
    /// is a construction bug, not a recoverable condition.
    pub fn pop(&mut self) -> Segment {
        let Some(segment) = self.segments.pop() else {
            panic!("pop on empty path: more pops than pushes");
        };
        self.kind.set(None);
        segment
    }

    /// A copy of this path with one more segment.
    pub fn extended(&self, segment: Segment) -> Path {
        let mut next = self.clone();
        next.push(segment);
        next
    }

    /// The segment sequence.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The last segment, if any.
    pub fn last(&self) -> Option<&Segment> {
        self.segments.last()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The qualified entity type addressed by the path: the type carried by
    /// the last type-bearing segment.
    pub fn last_entity_type(&self) -> Option<&str> {
        self.segments.iter().rev().find_map(|s| s.entity_type())
    }

    /// Depth consumed so far: the number of navigation segments, plus key
    /// segments when `count_keys` is set.
    pub(crate) fn depth_count(&self, count_keys: bool) -> usize {
        self.segments
            .iter()
            .filter(|s| {
                matches!(s, Segment::Navigation(_))
                    || (count_keys && matches!(s, Segment::Key(_)))
            })
            .count()
    }

    /// The classification of this path. Cached; push/pop invalidate.
    pub fn kind(&self) -> PathKind {
        if let Some(kind) = self.kind.get() {
            return kind;
        }
        let kind = self.classify();
        self.kind.set(Some(kind));
        kind
    }

    // First matching rule wins, in this fixed order.
    fn classify(&self) -> PathKind {
        let Some(last) = self.segments.last() else {
            return PathKind::Unknown;
        };

        if self.segments.len() == 1 && matches!(last, Segment::Metadata) {
            return PathKind::Metadata;
        }
        if matches!(last, Segment::Count) {
            return PathKind::Count;
        }
        if matches!(last, Segment::TypeCast(_)) {
            return PathKind::TypeCast;
        }
        if matches!(last, Segment::ComplexProperty(_)) {
            return PathKind::ComplexProperty;
        }
        if self
            .segments
            .iter()
            .any(|s| matches!(s, Segment::StreamProperty(_) | Segment::StreamContent(_)))
        {
            return PathKind::MediaEntity;
        }
        if self.segments.iter().any(|s| matches!(s, Segment::Ref)) {
            return PathKind::Ref;
        }
        if self
            .segments
            .iter()
            .any(|s| matches!(s, Segment::OperationImport(_)))
        {
            return PathKind::OperationImport;
        }
        if matches!(last, Segment::Operation(_)) {
            return PathKind::Operation;
        }
        if self
            .segments
            .iter()
            .any(|s| matches!(s, Segment::Navigation(_)))
        {
            return PathKind::NavigationProperty;
        }
        if self.segments.len() == 1 {
            if let Segment::NavigationSource(source) = last {
                return if source.collection {
                    PathKind::EntitySet
                } else {
                    PathKind::Singleton
                };
            }
        }
        if self.segments.len() == 2 && matches!(last, Segment::Key(_)) {
            return PathKind::Entity;
        }
        PathKind::Unknown
    }

    /// Render the canonical URL template for this path.
    ///
    /// A fresh used-names set is created per call, so rendering is
    /// idempotent and never mutates the path.
    pub fn canonical_name(&self, settings: &Settings) -> String {
        let mut used: HashSet<String> = HashSet::new();
        let mut out = String::new();

        if let Some(prefix) = &settings.path_prefix {
            let prefix = prefix.trim_matches('/');
            if !prefix.is_empty() {
                out.push('/');
                out.push_str(prefix);
            }
        }

        for segment in &self.segments {
            let fragment = segment.render_name(settings, &mut used);
            if segment.parenthesized(settings) {
                out.push('(');
                out.push_str(&fragment);
                out.push(')');
            } else if segment.escaped_call(settings) {
                out.push_str(":/");
                out.push_str(&fragment);
            } else {
                out.push('/');
                out.push_str(&fragment);
            }
        }
        out
    }

    /// The parameter mapping for this path: for every key and operation
    /// segment, the schema-side name and the template name it renders as,
    /// consistent with `canonical_name` under the same settings.
    pub fn parameter_mappings(&self, settings: &Settings) -> Vec<ParameterMapping> {
        let mut used: HashSet<String> = HashSet::new();
        let mut mappings = Vec::new();
        for (index, segment) in self.segments.iter().enumerate() {
            for (source, template) in segment.parameters(settings, &mut used) {
                mappings.push(ParameterMapping {
                    segment: index,
                    source,
                    template,
                });
            }
        }
        mappings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EdmModel, EntityType, NavigationProperty, Operation};

    fn model() -> EdmModel {
        EdmModel::new("Sales")
            .entity_type(
                EntityType::new("Customer")
                    .key("Id")
                    .navigation(NavigationProperty::contained_many("Orders", "Order")),
            )
            .entity_type(EntityType::new("Order").key("Id"))
    }

    fn customers_path(model: &EdmModel) -> Path {
        let customer = model.find_entity_type("Customer").unwrap();
        let mut path = Path::new();
        path.push(Segment::navigation_source(model, "Customers", customer, true).unwrap());
        path
    }

    #[test]
    fn classify_roots() {
        let model = model();
        let customer = model.find_entity_type("Customer").unwrap();

        let mut path = customers_path(&model);
        assert_eq!(path.kind(), PathKind::EntitySet);

        path.push(Segment::key(&model, customer).unwrap());
        assert_eq!(path.kind(), PathKind::Entity);

        let mut me = Path::new();
        me.push(Segment::navigation_source(&model, "Me", customer, false).unwrap());
        assert_eq!(me.kind(), PathKind::Singleton);
    }

    #[test]
    fn classify_navigation_and_ref() {
        let model = model();
        let customer = model.find_entity_type("Customer").unwrap();
        let order = model.find_entity_type("Order").unwrap();
        let nav = &customer.navigation_properties[0];

        let mut path = customers_path(&model);
        path.push(Segment::key(&model, customer).unwrap());
        path.push(Segment::navigation(&model, customer, nav, order).unwrap());
        assert_eq!(path.kind(), PathKind::NavigationProperty);

        path.push(Segment::key(&model, order).unwrap());
        assert_eq!(path.kind(), PathKind::NavigationProperty);

        path.push(Segment::Ref);
        assert_eq!(path.kind(), PathKind::Ref);
    }

    #[test]
    fn classify_operation_wins_over_navigation() {
        let model = model();
        let customer = model.find_entity_type("Customer").unwrap();
        let order = model.find_entity_type("Order").unwrap();
        let nav = &customer.navigation_properties[0];

        let mut path = customers_path(&model);
        path.push(Segment::key(&model, customer).unwrap());
        path.push(Segment::navigation(&model, customer, nav, order).unwrap());
        path.push(Segment::operation(
            &model,
            &Operation::action("Ship").bind_to("Order"),
        ));
        assert_eq!(path.kind(), PathKind::Operation);
    }

    #[test]
    fn classify_terminal_rules() {
        let model = model();
        let customer = model.find_entity_type("Customer").unwrap();

        let mut path = customers_path(&model);
        path.push(Segment::Count);
        assert_eq!(path.kind(), PathKind::Count);
        path.pop();

        path.push(Segment::type_cast(&model, customer).unwrap());
        assert_eq!(path.kind(), PathKind::TypeCast);
        path.pop();

        path.push(Segment::key(&model, customer).unwrap());
        path.push(Segment::complex_property(&model, customer, "Address"));
        assert_eq!(path.kind(), PathKind::ComplexProperty);
        path.pop();

        path.push(Segment::stream_content(&model, customer));
        assert_eq!(path.kind(), PathKind::MediaEntity);
    }

    #[test]
    fn classify_metadata_and_import() {
        let metadata = Path::from_segments(vec![Segment::Metadata]);
        assert_eq!(metadata.kind(), PathKind::Metadata);

        let import = Path::from_segments(vec![Segment::operation_import("TopSellers")]);
        assert_eq!(import.kind(), PathKind::OperationImport);
    }

    #[test]
    fn kind_cache_invalidated_by_push_and_pop() {
        let model = model();
        let customer = model.find_entity_type("Customer").unwrap();

        let mut path = customers_path(&model);
        assert_eq!(path.kind(), PathKind::EntitySet);
        path.push(Segment::key(&model, customer).unwrap());
        assert_eq!(path.kind(), PathKind::Entity);
        path.pop();
        assert_eq!(path.kind(), PathKind::EntitySet);
    }

    #[test]
    #[should_panic(expected = "pop on empty path")]
    fn pop_on_empty_panics() {
        Path::new().pop();
    }

    #[test]
    fn clone_is_independent() {
        let model = model();
        let customer = model.find_entity_type("Customer").unwrap();

        let mut path = customers_path(&model);
        let snapshot = path.clone();
        path.push(Segment::key(&model, customer).unwrap());

        assert_eq!(snapshot.len(), 1);
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn extended_leaves_prefix_untouched() {
        let model = model();
        let customer = model.find_entity_type("Customer").unwrap();

        let prefix = customers_path(&model);
        let keyed = prefix.extended(Segment::key(&model, customer).unwrap());

        assert_eq!(prefix.len(), 1);
        assert_eq!(prefix.kind(), PathKind::EntitySet);
        assert_eq!(keyed.len(), 2);
        assert_eq!(keyed.kind(), PathKind::Entity);
    }

    #[test]
    fn canonical_name_is_idempotent() {
        let model = model();
        let customer = model.find_entity_type("Customer").unwrap();

        let mut path = customers_path(&model);
        path.push(Segment::key(&model, customer).unwrap());

        let settings = Settings::default();
        let first = path.canonical_name(&settings);
        let second = path.canonical_name(&settings);
        assert_eq!(first, "/Customers({Id})");
        assert_eq!(first, second);
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn canonical_name_key_as_segment() {
        let model = model();
        let customer = model.find_entity_type("Customer").unwrap();

        let mut path = customers_path(&model);
        path.push(Segment::key(&model, customer).unwrap());

        let settings = Settings::new().key_as_segment(true);
        assert_eq!(path.canonical_name(&settings), "/Customers/{Id}");
    }

    #[test]
    fn canonical_name_with_prefix() {
        let model = model();
        let path = customers_path(&model);
        let settings = Settings::new().path_prefix("api/v1");
        assert_eq!(path.canonical_name(&settings), "/api/v1/Customers");
    }

    #[test]
    fn parameter_mappings_match_rendered_names() {
        let model = model();
        let customer = model.find_entity_type("Customer").unwrap();
        let order = model.find_entity_type("Order").unwrap();
        let nav = &customer.navigation_properties[0];

        let mut path = customers_path(&model);
        path.push(Segment::key(&model, customer).unwrap());
        path.push(Segment::navigation(&model, customer, nav, order).unwrap());
        path.push(Segment::key(&model, order).unwrap());

        let settings = Settings::default();
        assert_eq!(
            path.canonical_name(&settings),
            "/Customers({Id})/Orders({Id1})"
        );

        let mappings = path.parameter_mappings(&settings);
        assert_eq!(mappings.len(), 2);
        assert_eq!(mappings[0].segment, 1);
        assert_eq!(mappings[0].source, "Id");
        assert_eq!(mappings[0].template, "Id");
        assert_eq!(mappings[1].segment, 3);
        assert_eq!(mappings[1].source, "Id");
        assert_eq!(mappings[1].template, "Id1");
    }
}
