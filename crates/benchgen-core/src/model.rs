use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entity::{EntitySpec, RelationSpec};
use crate::error::{ModelError, Result};
use crate::graph::{RelationGraph, RelationGraphReport, build_relation_graph_report};
use crate::validation::validate_model;

/// On-disk shape of an entity model (`model.json` / `model.toml`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ModelDocument {
    /// Entity declarations; relation targets may appear in any order.
    pub entities: Vec<EntitySpec>,
}

/// Registry of entity specs keyed by name, in declaration order.
///
/// Read-only for the duration of a generation run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ModelDocument", into = "ModelDocument")]
pub struct EntityModel {
    entities: Vec<EntitySpec>,
    index: BTreeMap<String, usize>,
}

impl EntityModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity. Relation targets must already be registered, so
    /// models built this way are acyclic by construction.
    pub fn add_entity(&mut self, spec: EntitySpec) -> Result<()> {
        if self.index.contains_key(&spec.name) {
            return Err(ModelError::DuplicateEntity { entity: spec.name });
        }

        if let Some(relation) = spec
            .relations
            .iter()
            .find(|relation| !self.index.contains_key(&relation.target))
        {
            return Err(unknown_reference(&spec, relation));
        }

        self.insert(spec);
        Ok(())
    }

    /// Chainable form of [`EntityModel::add_entity`].
    pub fn with_entity(mut self, spec: EntitySpec) -> Result<Self> {
        self.add_entity(spec)?;
        Ok(self)
    }

    /// Declare a whole set of entities at once. Targets may be declared after
    /// the entities referencing them; cycles are left to [`EntityModel::validate`].
    pub fn from_entities<I>(specs: I) -> Result<Self>
    where
        I: IntoIterator<Item = EntitySpec>,
    {
        let mut model = Self::new();
        for spec in specs {
            if model.index.contains_key(&spec.name) {
                return Err(ModelError::DuplicateEntity { entity: spec.name });
            }
            model.insert(spec);
        }

        for spec in &model.entities {
            if let Some(relation) = spec
                .relations
                .iter()
                .find(|relation| !model.index.contains_key(&relation.target))
            {
                return Err(unknown_reference(spec, relation));
            }
        }

        Ok(model)
    }

    fn insert(&mut self, spec: EntitySpec) {
        self.index.insert(spec.name.clone(), self.entities.len());
        self.entities.push(spec);
    }

    /// Entity names ordered so that every entity follows the entities it
    /// references; ties keep declaration order.
    pub fn topological_order(&self) -> Result<Vec<String>> {
        self.graph()
            .toposort()
            .map_err(|path| ModelError::CyclicReference { path })
    }

    /// Check acyclicity, domains and rule parameters.
    pub fn validate(&self) -> Result<()> {
        validate_model(self)
    }

    /// Fact entity: the last entity in topological order that nothing
    /// references.
    pub fn fact_entity(&self) -> Result<&str> {
        let order = self.topological_order()?;
        order
            .iter()
            .rev()
            .find(|name| self.referrers(name).is_empty())
            .and_then(|name| self.entity(name))
            .map(|entity| entity.name.as_str())
            .ok_or_else(|| ModelError::invalid("model", "model declares no entities"))
    }

    pub fn entity(&self, name: &str) -> Option<&EntitySpec> {
        self.index.get(name).map(|idx| &self.entities[*idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Declaration index of an entity.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    /// Entities in declaration order.
    pub fn entities(&self) -> &[EntitySpec] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// All relations in declaration order (entity order, then relation order).
    pub fn relations(&self) -> impl Iterator<Item = (&EntitySpec, &RelationSpec)> {
        self.entities
            .iter()
            .flat_map(|entity| entity.relations.iter().map(move |relation| (entity, relation)))
    }

    /// Names of the entities that reference `name`, in declaration order.
    pub fn referrers(&self, name: &str) -> Vec<&str> {
        self.entities
            .iter()
            .filter(|entity| {
                entity
                    .relations
                    .iter()
                    .any(|relation| relation.target == name)
            })
            .map(|entity| entity.name.as_str())
            .collect()
    }

    pub fn graph(&self) -> RelationGraph {
        RelationGraph::new(&self.entities)
    }

    pub fn graph_report(&self) -> RelationGraphReport {
        build_relation_graph_report(&self.entities)
    }
}

fn unknown_reference(spec: &EntitySpec, relation: &RelationSpec) -> ModelError {
    ModelError::UnknownReference {
        entity: spec.name.clone(),
        relation: relation.name().to_string(),
        target: relation.target.clone(),
    }
}

impl TryFrom<ModelDocument> for EntityModel {
    type Error = ModelError;

    fn try_from(document: ModelDocument) -> Result<Self> {
        EntityModel::from_entities(document.entities)
    }
}

impl From<EntityModel> for ModelDocument {
    fn from(model: EntityModel) -> Self {
        ModelDocument {
            entities: model.entities,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::AttributeSpec;
    use crate::types::{FanOut, ValueDomain};

    fn customer() -> EntitySpec {
        EntitySpec::new("Customer").attribute(AttributeSpec::new(
            "region",
            ValueDomain::enumerated(["north", "south"]),
        ))
    }

    fn order() -> EntitySpec {
        EntitySpec::new("Order")
            .attribute(AttributeSpec::new(
                "amount",
                ValueDomain::IntRange { min: 1, max: 500 },
            ))
            .relation(RelationSpec::one_to_many(
                "Customer",
                FanOut::Poisson { mean: 5.0 },
            ))
    }

    #[test]
    fn add_entity_rejects_duplicates() {
        let mut model = EntityModel::new();
        model.add_entity(customer()).expect("first insert");
        let err = model.add_entity(customer()).unwrap_err();
        assert_eq!(
            err,
            ModelError::DuplicateEntity {
                entity: "Customer".to_string()
            }
        );
        assert_eq!(err.kind(), "DuplicateEntityError");
    }

    #[test]
    fn add_entity_rejects_forward_references() {
        let mut model = EntityModel::new();
        let err = model.add_entity(order()).unwrap_err();
        assert_eq!(
            err,
            ModelError::UnknownReference {
                entity: "Order".to_string(),
                relation: "Customer".to_string(),
                target: "Customer".to_string(),
            }
        );
        assert!(model.is_empty());
    }

    #[test]
    fn from_entities_accepts_forward_references() {
        let model = EntityModel::from_entities([order(), customer()]).expect("declare");
        assert_eq!(
            model.topological_order().expect("order"),
            vec!["Customer", "Order"]
        );
        assert_eq!(model.fact_entity().expect("fact"), "Order");
        assert_eq!(model.referrers("Customer"), vec!["Order"]);
    }

    #[test]
    fn from_entities_rejects_missing_targets() {
        let err = EntityModel::from_entities([order()]).unwrap_err();
        assert_eq!(err.kind(), "UnknownReferenceError");
    }

    #[test]
    fn cycles_fail_validation() {
        let a = EntitySpec::new("A").relation(RelationSpec::one_to_many(
            "B",
            FanOut::Fixed { count: 1 },
        ));
        let b = EntitySpec::new("B").relation(RelationSpec::one_to_many(
            "A",
            FanOut::Fixed { count: 1 },
        ));

        let model = EntityModel::from_entities([a, b]).expect("declare");
        let err = model.validate().unwrap_err();
        assert_eq!(
            err,
            ModelError::CyclicReference {
                path: vec!["A".to_string(), "B".to_string(), "A".to_string()]
            }
        );
        assert!(model.topological_order().is_err());
    }

    #[test]
    fn fact_entity_prefers_latest_unreferenced() {
        let model = EntityModel::new()
            .with_entity(customer())
            .and_then(|model| model.with_entity(order()))
            .and_then(|model| model.with_entity(EntitySpec::new("Audit")))
            .expect("model");
        assert_eq!(model.fact_entity().expect("fact"), "Audit");
    }
}
