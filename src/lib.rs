//! Resource path enumeration for entity data models.
//!
//! `edm-paths` takes a schema graph (entity types with inheritance,
//! navigation properties with containment, bound and unbound operations)
//! and produces the complete, deduplicated set of addressable resource
//! paths, each with a classification and a canonical URL template.
//!
//! # Example
//!
//! ```
//! use edm_paths::{enumerate_paths, EdmModel, EntityType, NavigationProperty, Settings};
//!
//! let model = EdmModel::new("Sales")
//!     .entity_type(
//!         EntityType::new("Customer")
//!             .key("Id")
//!             .navigation(NavigationProperty::contained_many("Orders", "Order")),
//!     )
//!     .entity_type(EntityType::new("Order").key("Id"))
//!     .entity_set("Customers", "Customer")
//!     .singleton("Me", "Customer");
//!
//! let settings = Settings::default();
//! let paths = enumerate_paths(&model, &settings).unwrap();
//! let names: Vec<String> = paths.iter().map(|p| p.canonical_name(&settings)).collect();
//!
//! assert_eq!(
//!     names,
//!     [
//!         "/Customers",
//!         "/Customers({Id})",
//!         "/Customers({Id})/Orders",
//!         "/Customers({Id})/Orders({Id1})",
//!         "/Me",
//!         "/Me/Orders",
//!         "/Me/Orders({Id})",
//!     ]
//! );
//! ```
//!
//! Models can also be loaded from JSON with [`load_model`], and rendering
//! is controlled through [`Settings`] (key-as-segment style, navigation
//! depth, operation switches, and so on).

pub mod error;
pub mod model;
pub mod path;
pub mod provider;
pub mod segment;
pub mod settings;

pub use error::{LoadError, PathError};
pub use model::{
    load_model, load_model_str, EdmModel, EntitySet, EntityType, NavigationProperty,
    NavigationRestriction, Operation, OperationBinding, OperationImport, OperationKind, Singleton,
    StructuralProperty,
};
pub use path::{ParameterMapping, Path, PathKind};
pub use provider::{enumerate_paths, PathProvider};
pub use segment::Segment;
pub use settings::{Settings, DEFAULT_NAVIGATION_PROPERTY_DEPTH};
