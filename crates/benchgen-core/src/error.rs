use thiserror::Error;

/// Errors raised while declaring or validating an entity model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// An entity with the same name is already registered.
    #[error("duplicate entity: {entity}")]
    DuplicateEntity { entity: String },
    /// A relation points at an entity that is not (yet) registered.
    #[error("unknown reference: {entity}.{relation} -> {target}")]
    UnknownReference {
        entity: String,
        relation: String,
        target: String,
    },
    /// The relation graph contains a cycle; `path` lists it in traversal order.
    #[error("cyclic reference: {}", path.join(" -> "))]
    CyclicReference { path: Vec<String> },
    /// An attribute's value domain contains no values.
    #[error("empty domain: {entity}.{attribute}: {reason}")]
    EmptyDomain {
        entity: String,
        attribute: String,
        reason: String,
    },
    /// A generation rule is malformed (names, rates, distribution parameters).
    #[error("invalid parameter: {path}: {message}")]
    InvalidParameter { path: String, message: String },
}

impl ModelError {
    /// Taxonomy name of the error, stable across releases.
    pub fn kind(&self) -> &'static str {
        match self {
            ModelError::DuplicateEntity { .. } => "DuplicateEntityError",
            ModelError::UnknownReference { .. } => "UnknownReferenceError",
            ModelError::CyclicReference { .. } => "CyclicReferenceError",
            ModelError::EmptyDomain { .. } => "EmptyDomainError",
            ModelError::InvalidParameter { .. } => "InvalidParameterError",
        }
    }

    pub fn invalid(path: impl Into<String>, message: impl Into<String>) -> Self {
        ModelError::InvalidParameter {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Convenience alias for results returned by the model layer.
pub type Result<T> = std::result::Result<T, ModelError>;
