//! Path enumeration: walks the schema graph and produces the complete,
//! deduplicated set of resource paths.
//!
//! Two ordered phases with a hard barrier between them. Phase 1 discovers
//! structural paths (navigation sources, keys, media streams, navigation
//! properties) and files them in an index keyed by owning entity type.
//! Phase 2 attaches bound operations, querying the index instead of
//! re-walking the graph, so derived-type attachment sees the complete
//! structural picture. The merged result is sorted by canonical name
//! under default settings for deterministic output.

use std::collections::{BTreeSet, HashMap};

use crate::error::PathError;
use crate::model::{EdmModel, EntityType, Operation};
use crate::path::{Path, PathKind};
use crate::segment::Segment;
use crate::settings::Settings;

/// Enumerate every resource path of `model` under `settings`.
///
/// # Errors
///
/// Returns `PathError` when the model references unknown types or
/// operations, declares a cyclic base chain, or exposes a keyless entity
/// type through an entity set. No partial result is produced.
pub fn enumerate_paths(model: &EdmModel, settings: &Settings) -> Result<Vec<Path>, PathError> {
    PathProvider::new(model, settings).paths()
}

/// The enumeration engine and its path index.
///
/// The index holds three buckets: navigation-source-rooted paths and
/// navigation-property-rooted paths, both keyed by the qualified owning
/// entity type, plus a flat list of operation and operation-import paths.
/// Phase 2 reads only the first two buckets, never paths it appended
/// itself, so operations are not re-derived on operation paths.
pub struct PathProvider<'a> {
    model: &'a EdmModel,
    settings: &'a Settings,
    source_paths: HashMap<String, Vec<Path>>,
    navigation_paths: HashMap<String, Vec<Path>>,
    operation_paths: Vec<Path>,
}

impl<'a> PathProvider<'a> {
    pub fn new(model: &'a EdmModel, settings: &'a Settings) -> Self {
        PathProvider {
            model,
            settings,
            source_paths: HashMap::new(),
            navigation_paths: HashMap::new(),
            operation_paths: Vec::new(),
        }
    }

    /// Run both phases and return the merged, sorted path set.
    pub fn paths(mut self) -> Result<Vec<Path>, PathError> {
        // Phase 1: structural paths.
        for set in &self.model.entity_sets {
            self.retrieve_source_paths(&set.name, &set.entity_type, true)?;
        }
        for singleton in &self.model.singletons {
            self.retrieve_source_paths(&singleton.name, &singleton.entity_type, false)?;
        }
        self.append_operation_imports()?;

        // Phase 2 must only start once the index is complete.
        self.attach_bound_operations()?;

        let mut all: Vec<Path> = Vec::new();
        for paths in self.source_paths.into_values() {
            all.extend(paths);
        }
        for paths in self.navigation_paths.into_values() {
            all.extend(paths);
        }
        all.extend(self.operation_paths);

        let default_settings = Settings::default();
        all.sort_by_cached_key(|p| p.canonical_name(&default_settings));
        Ok(all)
    }

    // --- Phase 1 ---

    fn retrieve_source_paths(
        &mut self,
        name: &str,
        type_name: &str,
        collection: bool,
    ) -> Result<(), PathError> {
        let model = self.model;
        let source_kind = if collection { "entity set" } else { "singleton" };
        let entity_type =
            model.entity_type_required(type_name, &format!("{} '{}'", source_kind, name))?;

        let root = Path::from_segments(vec![Segment::navigation_source(
            model,
            name,
            entity_type,
            collection,
        )?]);
        self.append(root.clone());

        if collection {
            let keyed = root.extended(Segment::key(model, entity_type)?);
            self.append(keyed.clone());
            self.retrieve_media_paths(entity_type, &keyed);
            self.retrieve_navigation_paths(entity_type, &keyed)?;

            if self.settings.enable_alternate_key_path {
                for alternate in &entity_type.alternate_keys {
                    self.append(
                        root.extended(Segment::alternate_key(model, entity_type, alternate)),
                    );
                }
            }
        } else {
            self.retrieve_media_paths(entity_type, &root);
            self.retrieve_navigation_paths(entity_type, &root)?;
        }
        Ok(())
    }

    /// Media entity paths for the type addressed by `prefix`: one per
    /// stream-valued structural property, plus `$value` when the type has
    /// a default stream and no property already claims the name "content"
    /// (case-insensitive).
    fn retrieve_media_paths(&mut self, entity_type: &EntityType, prefix: &Path) {
        let model = self.model;
        for property in entity_type.properties.iter().filter(|p| p.is_stream) {
            self.append(prefix.extended(Segment::stream_property(
                model,
                entity_type,
                &property.name,
            )));
        }

        let has_content_property = entity_type
            .properties
            .iter()
            .any(|p| p.name.eq_ignore_ascii_case("content"));
        if entity_type.has_stream && !has_content_property {
            self.append(prefix.extended(Segment::stream_content(model, entity_type)));
        }
    }

    fn retrieve_navigation_paths(
        &mut self,
        entity_type: &EntityType,
        prefix: &Path,
    ) -> Result<(), PathError> {
        if !self.settings.enable_navigation_property_path {
            return Ok(());
        }
        let model = self.model;

        for navigation in &entity_type.navigation_properties {
            if !navigation.navigable() {
                continue;
            }
            if prefix.depth_count(self.settings.count_key_segment_as_depth)
                >= self.settings.navigation_property_depth
            {
                continue;
            }

            let target = model.entity_type_required(
                &navigation.target,
                &format!(
                    "navigation property '{}.{}'",
                    entity_type.name, navigation.name
                ),
            )?;
            let expand = self.should_expand(navigation.contained, target, prefix)?;

            let nav_path =
                prefix.extended(Segment::navigation(model, entity_type, navigation, target)?);
            self.append(nav_path.clone());

            if navigation.collection {
                if !navigation.contained {
                    // Collection reference: a $ref path instead of a key.
                    self.append(nav_path.extended(Segment::Ref));
                } else if navigation.indexable_by_key() {
                    let keyed = nav_path.extended(Segment::key(model, target)?);
                    self.append(keyed.clone());
                    self.retrieve_media_paths(target, &keyed);
                    if expand {
                        self.retrieve_navigation_paths(target, &keyed)?;
                    }
                }
            } else if navigation.contained {
                self.retrieve_media_paths(target, &nav_path);
                if expand {
                    self.retrieve_navigation_paths(target, &nav_path)?;
                }
            }
        }
        Ok(())
    }

    /// Branch-local cycle guard. References never expand. A contained
    /// target does not expand when a navigation segment already on this
    /// branch targets a type the new target is assignable to; the root
    /// source does not count, so a self-containing type expands exactly
    /// one level. Sibling branches are unaffected.
    fn should_expand(
        &self,
        contained: bool,
        target: &EntityType,
        path: &Path,
    ) -> Result<bool, PathError> {
        if !contained {
            return Ok(false);
        }
        for segment in path.segments() {
            if let Segment::Navigation(nav) = segment {
                let existing = self.model.local_name(&nav.target_type);
                if self.model.is_assignable_from(existing, &target.name)? {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    fn append_operation_imports(&mut self) -> Result<(), PathError> {
        if !self.settings.enable_operation_import_path {
            return Ok(());
        }
        for import in &self.model.operation_imports {
            let operation = self
                .model
                .operations
                .iter()
                .find(|o| o.name == import.operation)
                .ok_or_else(|| PathError::UnknownOperation {
                    import: import.name.clone(),
                    operation: import.operation.clone(),
                })?;
            if operation.binding.is_some() {
                return Err(PathError::BoundOperationImport {
                    import: import.name.clone(),
                    operation: import.operation.clone(),
                });
            }
            self.append(Path::from_segments(vec![Segment::operation_import(
                &import.name,
            )]));
        }
        Ok(())
    }

    // --- Phase 2 ---

    fn attach_bound_operations(&mut self) -> Result<(), PathError> {
        if !self.settings.enable_operation_path {
            return Ok(());
        }
        let model = self.model;

        // Binding signature map, built once: (qualified type, collection)
        // to the operations bound with that signature, declaration order.
        let mut bound: HashMap<(String, bool), Vec<&Operation>> = HashMap::new();
        for operation in &model.operations {
            if let Some(binding) = &operation.binding {
                bound
                    .entry((model.qualify(&binding.entity_type), binding.collection))
                    .or_default()
                    .push(operation);
            }
        }
        if bound.is_empty() {
            return Ok(());
        }

        // Entity types with indexed paths, in deterministic order.
        let mut reachable: BTreeSet<String> = BTreeSet::new();
        for key in self.source_paths.keys().chain(self.navigation_paths.keys()) {
            reachable.insert(model.local_name(key).to_string());
        }

        // Every (operation, applicable type) pair: each indexed type picks
        // up operations bound to it or to any of its base types.
        for type_name in &reachable {
            let Some(entity_type) = model.find_entity_type(type_name) else {
                continue;
            };
            let mut chain = vec![entity_type];
            chain.extend(model.base_chain(entity_type)?);
            for candidate in chain {
                for collection in [true, false] {
                    let signature = (model.qualify(&candidate.name), collection);
                    if let Some(operations) = bound.get(&signature) {
                        for operation in operations {
                            self.attach_operation(operation, entity_type, collection)?;
                        }
                    }
                }
            }
        }

        // Binding types without any indexed path of their own still get a
        // chance through base-type sources (phases 3 and 4).
        for operation in &model.operations {
            let Some(binding) = &operation.binding else {
                continue;
            };
            if reachable.contains(&binding.entity_type) {
                continue;
            }
            let entity_type = model.entity_type_required(
                &binding.entity_type,
                &format!("operation '{}'", operation.name),
            )?;
            self.attach_operation(operation, entity_type, binding.collection)?;
        }
        Ok(())
    }

    /// Attach one bound operation to the paths of one applicable entity
    /// type. Four candidate phases in fixed order; the first phase that
    /// yields any path wins and later phases are not tried for this pair.
    fn attach_operation(
        &mut self,
        operation: &Operation,
        entity_type: &EntityType,
        collection_bound: bool,
    ) -> Result<(), PathError> {
        let model = self.model;
        let qualified = model.qualify(&entity_type.name);
        let operation_segment = Segment::operation(model, operation);
        let mut appended: Vec<Path> = Vec::new();

        // 1. Navigation-source paths of this type.
        if let Some(paths) = self.source_paths.get(&qualified) {
            for path in paths {
                let eligible = if collection_bound {
                    path.kind() == PathKind::EntitySet
                } else {
                    !matches!(path.kind(), PathKind::EntitySet | PathKind::MediaEntity)
                };
                if eligible {
                    let mut candidate = path.clone();
                    candidate.push(operation_segment.clone());
                    appended.push(candidate);
                }
            }
        }

        // 2. Navigation-property paths of this type, $ref paths excluded.
        if appended.is_empty() {
            if let Some(paths) = self.navigation_paths.get(&qualified) {
                for path in paths {
                    if path.kind() == PathKind::Ref {
                        continue;
                    }
                    let eligible = match path.last() {
                        Some(Segment::Navigation(nav)) => nav.collection == collection_bound,
                        Some(Segment::Key(_)) => !collection_bound,
                        _ => false,
                    };
                    if eligible {
                        let mut candidate = path.clone();
                        candidate.push(operation_segment.clone());
                        appended.push(candidate);
                    }
                }
            }
        }

        // 3. Fresh paths through base-type navigation sources and a type
        // cast to the binding type.
        if appended.is_empty() {
            let cast = Segment::type_cast(model, entity_type)?;
            for base in model.base_chain(entity_type)? {
                let mut sources: Vec<(&str, bool, Option<&[String]>)> = Vec::new();
                for set in &model.entity_sets {
                    if set.entity_type == base.name {
                        sources.push((&set.name, true, set.derived_type_constraints.as_deref()));
                    }
                }
                for singleton in &model.singletons {
                    if singleton.entity_type == base.name {
                        sources.push((
                            &singleton.name,
                            false,
                            singleton.derived_type_constraints.as_deref(),
                        ));
                    }
                }

                for (source_name, is_set, constraints) in sources {
                    // Collection operations cannot root at a singleton.
                    if collection_bound && !is_set {
                        continue;
                    }
                    if self
                        .settings
                        .require_derived_types_constraint_for_bound_operations
                        && !constraint_allows(constraints, &entity_type.name)
                    {
                        continue;
                    }
                    let mut candidate = Path::new();
                    candidate.push(Segment::navigation_source(model, source_name, base, is_set)?);
                    candidate.push(cast.clone());
                    if !collection_bound && is_set {
                        candidate.push(Segment::key(model, entity_type)?);
                    }
                    candidate.push(operation_segment.clone());
                    appended.push(candidate);
                }
            }
        }

        // 4. As 3, rooted at base-type navigation-property paths; the
        // constraint is read from the navigation property.
        if appended.is_empty() {
            let cast = Segment::type_cast(model, entity_type)?;
            for base in model.base_chain(entity_type)? {
                let base_qualified = model.qualify(&base.name);
                let Some(paths) = self.navigation_paths.get(&base_qualified) else {
                    continue;
                };
                for path in paths {
                    if path.kind() == PathKind::Ref {
                        continue;
                    }
                    let constraints = path
                        .segments()
                        .iter()
                        .rev()
                        .find_map(|s| match s {
                            Segment::Navigation(nav) => {
                                Some(nav.derived_type_constraints.as_deref())
                            }
                            _ => None,
                        })
                        .flatten();
                    if self
                        .settings
                        .require_derived_types_constraint_for_bound_operations
                        && !constraint_allows(constraints, &entity_type.name)
                    {
                        continue;
                    }

                    let collection_position = matches!(
                        path.last(),
                        Some(Segment::Navigation(nav)) if nav.collection
                    );
                    if collection_bound && !collection_position {
                        continue;
                    }
                    let mut candidate = path.clone();
                    candidate.push(cast.clone());
                    if !collection_bound && collection_position {
                        candidate.push(Segment::key(model, entity_type)?);
                    }
                    candidate.push(operation_segment.clone());
                    appended.push(candidate);
                }
            }
        }

        self.operation_paths.extend(appended);
        Ok(())
    }

    // --- Index ---

    /// File a completed path in the bucket its classification belongs to.
    fn append(&mut self, path: Path) {
        let bucket = match path.kind() {
            PathKind::EntitySet
            | PathKind::Entity
            | PathKind::Singleton
            | PathKind::MediaEntity => &mut self.source_paths,
            PathKind::NavigationProperty | PathKind::Ref => &mut self.navigation_paths,
            _ => {
                self.operation_paths.push(path);
                return;
            }
        };
        let key = path
            .last_entity_type()
            .unwrap_or_default()
            .to_string();
        bucket.entry(key).or_default().push(path);
    }
}

fn constraint_allows(constraints: Option<&[String]>, derived: &str) -> bool {
    constraints.map_or(false, |names| names.iter().any(|n| n == derived))
}
