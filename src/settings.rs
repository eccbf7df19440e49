//! Conversion settings controlling enumeration and path naming.

/// Default bound on navigation property recursion.
pub const DEFAULT_NAVIGATION_PROPERTY_DEPTH: usize = 5;

/// Settings for path enumeration and canonical name rendering.
///
/// The defaults produce the conventional parenthesized key style
/// (`/Customers({Id})`) with namespace-qualified operation and type-cast
/// segments.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Emit bound operation paths (phase 2).
    pub enable_operation_path: bool,
    /// Emit operation import paths.
    pub enable_operation_import_path: bool,
    /// Emit navigation property paths (and everything below them).
    pub enable_navigation_property_path: bool,
    /// Maximum navigation property recursion depth.
    pub navigation_property_depth: usize,
    /// Key segments consume depth budget too.
    pub count_key_segment_as_depth: bool,
    /// Render keys as their own segment (`/Customers/{Id}`) instead of
    /// parenthesized (`/Customers({Id})`). Alternate keys are always
    /// parenthesized.
    pub enable_key_as_segment: bool,
    /// Prefix single-key parameter names with the owning entity type name
    /// (`{Customer-Id}`).
    pub prefix_entity_type_name_before_key: bool,
    /// Render bound operations without namespace qualification.
    pub enable_unqualified_call: bool,
    /// Render escape-flagged functions with a `:/` separator.
    pub enable_uri_escape_function_call: bool,
    /// Render the model alias instead of the namespace in type-cast segments.
    pub enable_alias_for_type_cast_segments: bool,
    /// Phase 3/4 operation attachment through a base navigation source or
    /// navigation property requires a matching derived-type constraint.
    pub require_derived_types_constraint_for_bound_operations: bool,
    /// Emit one extra keyed path per alternate key declared on an entity
    /// set's type.
    pub enable_alternate_key_path: bool,
    /// Static string prepended to every rendered path.
    pub path_prefix: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            enable_operation_path: true,
            enable_operation_import_path: true,
            enable_navigation_property_path: true,
            navigation_property_depth: DEFAULT_NAVIGATION_PROPERTY_DEPTH,
            count_key_segment_as_depth: false,
            enable_key_as_segment: false,
            prefix_entity_type_name_before_key: false,
            enable_unqualified_call: false,
            enable_uri_escape_function_call: false,
            enable_alias_for_type_cast_segments: false,
            require_derived_types_constraint_for_bound_operations: false,
            enable_alternate_key_path: false,
            path_prefix: None,
        }
    }
}

impl Settings {
    /// Create settings with the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the navigation property recursion bound.
    pub fn navigation_depth(mut self, depth: usize) -> Self {
        self.navigation_property_depth = depth;
        self
    }

    /// Count key segments against the depth budget.
    pub fn count_key_segment_as_depth(mut self, on: bool) -> Self {
        self.count_key_segment_as_depth = on;
        self
    }

    /// Render keys as their own path segments.
    pub fn key_as_segment(mut self, on: bool) -> Self {
        self.enable_key_as_segment = on;
        self
    }

    /// Prefix single-key parameter names with the entity type name.
    pub fn prefix_type_name_before_key(mut self, on: bool) -> Self {
        self.prefix_entity_type_name_before_key = on;
        self
    }

    /// Render bound operations without namespace qualification.
    pub fn unqualified_call(mut self, on: bool) -> Self {
        self.enable_unqualified_call = on;
        self
    }

    /// Render escape-flagged functions with the `:/` separator.
    pub fn uri_escape_function_call(mut self, on: bool) -> Self {
        self.enable_uri_escape_function_call = on;
        self
    }

    /// Render the model alias in type-cast segments.
    pub fn alias_for_type_casts(mut self, on: bool) -> Self {
        self.enable_alias_for_type_cast_segments = on;
        self
    }

    /// Require derived-type constraints for phase 3/4 operation attachment.
    pub fn require_derived_types_constraint(mut self, on: bool) -> Self {
        self.require_derived_types_constraint_for_bound_operations = on;
        self
    }

    /// Emit alternate-key entity paths.
    pub fn alternate_key_paths(mut self, on: bool) -> Self {
        self.enable_alternate_key_path = on;
        self
    }

    /// Prepend a static prefix to every rendered path.
    pub fn path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = Some(prefix.into());
        self
    }

    /// Disable navigation property paths.
    pub fn without_navigation_paths(mut self) -> Self {
        self.enable_navigation_property_path = false;
        self
    }

    /// Disable bound operation paths.
    pub fn without_operation_paths(mut self) -> Self {
        self.enable_operation_path = false;
        self
    }

    /// Disable operation import paths.
    pub fn without_operation_import_paths(mut self) -> Self {
        self.enable_operation_import_path = false;
        self
    }
}
