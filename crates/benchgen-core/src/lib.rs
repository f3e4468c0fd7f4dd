//! Entity model for benchgen.
//!
//! This crate declares entity types, their attributes and relations, the
//! per-attribute generation rules, and the dependency ordering the dataset
//! generator follows. It has no dependency on the generator itself.

pub mod entity;
pub mod error;
pub mod graph;
pub mod model;
pub mod presets;
pub mod types;
pub mod validation;

pub use entity::{AttributeSpec, Cardinality, EntitySpec, KEY_COLUMN, NAMESPACE_SEPARATOR, RelationSpec};
pub use error::{ModelError, Result};
pub use graph::{RelationGraph, RelationGraphReport, RelationGraphSummary, build_relation_graph_report};
pub use model::{EntityModel, ModelDocument};
pub use presets::{ConceptColumn, ConceptOptions, PRESET_NAMES, concepts, preset, retail};
pub use types::{Distribution, FanOut, ValueDomain};
pub use validation::validate_model;

/// Current contract version for model files.
pub const MODEL_VERSION: &str = "0.1";
