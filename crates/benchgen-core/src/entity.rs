use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::types::{DEFAULT_NULL_RATE, Distribution, FanOut, ValueDomain};

/// Name of the implicit row key column every entity table starts with.
pub const KEY_COLUMN: &str = "key";
/// Separator used by namespaced (inlined) column names.
pub const NAMESPACE_SEPARATOR: char = '.';

/// Generation rule for a single attribute of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AttributeSpec {
    /// Attribute name, unique within its entity.
    pub name: String,
    pub domain: ValueDomain,
    #[serde(default)]
    pub distribution: Distribution,
    #[serde(default)]
    pub nullable: bool,
    /// Probability of NULL when `nullable` (defaults to 0.1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub null_rate: Option<f64>,
    /// Apply the probabilistic string mangler to sampled text values.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub mangle: bool,
}

impl AttributeSpec {
    pub fn new(name: impl Into<String>, domain: ValueDomain) -> Self {
        Self {
            name: name.into(),
            domain,
            distribution: Distribution::Uniform,
            nullable: false,
            null_rate: None,
            mangle: false,
        }
    }

    pub fn with_distribution(mut self, distribution: Distribution) -> Self {
        self.distribution = distribution;
        self
    }

    pub fn nullable(mut self, null_rate: f64) -> Self {
        self.nullable = true;
        self.null_rate = Some(null_rate);
        self
    }

    pub fn mangled(mut self) -> Self {
        self.mangle = true;
        self
    }

    /// Effective NULL probability (zero for non-nullable attributes).
    pub fn effective_null_rate(&self) -> f64 {
        if self.nullable {
            self.null_rate.unwrap_or(DEFAULT_NULL_RATE)
        } else {
            0.0
        }
    }
}

/// How rows of the referencing entity attach to rows of the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Cardinality {
    /// Each referencing row points at exactly one target row; `fan_out`
    /// describes how many referencing rows each target row receives.
    OneToMany { fan_out: FanOut },
    /// Each referencing row links to a set of target rows sized by `density`.
    ManyToMany { density: FanOut },
}

impl Cardinality {
    pub fn is_one_to_many(&self) -> bool {
        matches!(self, Cardinality::OneToMany { .. })
    }

    /// Count distribution attached to the relation.
    pub fn counts(&self) -> &FanOut {
        match self {
            Cardinality::OneToMany { fan_out } => fan_out,
            Cardinality::ManyToMany { density } => density,
        }
    }
}

/// Outbound reference from a dependent entity to a target entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct RelationSpec {
    /// Relation name, unique within the entity. Defaults to the target name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub target: String,
    pub cardinality: Cardinality,
    /// Whether the target's attributes get inlined by denormalization.
    #[serde(default = "default_denormalize")]
    pub denormalize: bool,
}

fn default_denormalize() -> bool {
    true
}

impl RelationSpec {
    pub fn one_to_many(target: impl Into<String>, fan_out: FanOut) -> Self {
        Self {
            name: None,
            target: target.into(),
            cardinality: Cardinality::OneToMany { fan_out },
            denormalize: true,
        }
    }

    pub fn many_to_many(target: impl Into<String>, density: FanOut) -> Self {
        Self {
            name: None,
            target: target.into(),
            cardinality: Cardinality::ManyToMany { density },
            denormalize: true,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Keep the relation as a join even when the dataset is denormalized.
    pub fn kept_normalized(mut self) -> Self {
        self.denormalize = false;
        self
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.target)
    }

    /// Foreign key column carried by referencing rows.
    pub fn key_column(&self) -> String {
        format!("{}_{KEY_COLUMN}", self.name())
    }
}

/// Declared entity type: ordered attributes plus outbound relations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EntitySpec {
    pub name: String,
    #[serde(default)]
    pub attributes: Vec<AttributeSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub relations: Vec<RelationSpec>,
}

impl EntitySpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            relations: Vec::new(),
        }
    }

    pub fn attribute(mut self, attribute: AttributeSpec) -> Self {
        self.attributes.push(attribute);
        self
    }

    pub fn relation(mut self, relation: RelationSpec) -> Self {
        self.relations.push(relation);
        self
    }

    /// Entities without outbound relations are roots.
    pub fn is_root(&self) -> bool {
        self.relations.is_empty()
    }

    /// First one-to-many relation; it drives the entity's row count.
    pub fn primary_relation(&self) -> Option<&RelationSpec> {
        self.relations
            .iter()
            .find(|relation| relation.cardinality.is_one_to_many())
    }

    pub fn relation_named(&self, name: &str) -> Option<&RelationSpec> {
        self.relations.iter().find(|relation| relation.name() == name)
    }

    /// Normalized column layout: key, attributes, one-to-many foreign keys.
    pub fn columns(&self) -> Vec<String> {
        let mut columns = Vec::with_capacity(1 + self.attributes.len() + self.relations.len());
        columns.push(KEY_COLUMN.to_string());
        columns.extend(self.attributes.iter().map(|attr| attr.name.clone()));
        columns.extend(
            self.relations
                .iter()
                .filter(|relation| relation.cardinality.is_one_to_many())
                .map(RelationSpec::key_column),
        );
        columns
    }
}
