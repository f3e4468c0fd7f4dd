//! Deterministic dataset generator for denormalization benchmarks.
//!
//! Consumes an [`benchgen_core::EntityModel`] and a [`GenerationConfig`] and
//! produces either one table per entity or a wide, denormalized fact table
//! whose width and row multiplication follow the denormalization factor.

pub mod dataset;
pub mod denormalize;
pub mod engine;
pub mod errors;
pub mod foreign;
pub mod generators;
pub mod model;
pub mod output;
pub mod planner;
pub mod seed;

pub use dataset::{
    DenormalizedDataset, GeneratedDataset, NormalizedDataset, Row, Table, TableKind,
};
pub use denormalize::{RelationRef, candidate_relations, select_relations};
pub use engine::{GenerationEngine, GenerationResult, generate};
pub use errors::GenerationError;
pub use generators::GeneratedValue;
pub use model::{EntityReport, GenerationConfig, GenerationReport, TableReport};
pub use output::{write_dataset_csv, write_dataset_json};
