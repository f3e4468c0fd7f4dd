use thiserror::Error;

use benchgen_core::ModelError;

/// Errors emitted by the generation engine and the dataset writers.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("unresolved reference: {entity} references '{target}' before it was generated")]
    UnresolvedReference { entity: String, target: String },
    #[error(
        "empty target: relation {entity}.{relation} references '{target}', which has no rows"
    )]
    EmptyTarget {
        entity: String,
        relation: String,
        target: String,
    },
    #[error("column collision: '{column}' already exists in table '{table}'")]
    ColumnCollision { table: String, column: String },
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl GenerationError {
    /// Stable error kind name used in CLI diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationError::InvalidConfig(_) => "InvalidConfigError",
            GenerationError::UnresolvedReference { .. } => "UnresolvedReferenceError",
            GenerationError::EmptyTarget { .. } => "EmptyTargetError",
            GenerationError::ColumnCollision { .. } => "ColumnCollisionError",
            GenerationError::Model(err) => err.kind(),
            GenerationError::Io(_) => "IoError",
            GenerationError::Json(_) => "JsonError",
            GenerationError::Csv(_) => "CsvError",
        }
    }

    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        GenerationError::InvalidConfig(message.into())
    }
}
