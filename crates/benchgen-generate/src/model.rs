use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use benchgen_core::EntityModel;

use crate::errors::GenerationError;

/// Options for the generation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Rows requested for the fact entity.
    pub row_count: u64,
    /// Fraction of candidate relations to inline, in `[0.0, 1.0]`.
    pub denormalization: f64,
    pub seed: u64,
    /// Row counts for entities whose count is not derived from a relation.
    pub row_overrides: BTreeMap<String, u64>,
    /// Explicit fact entity; defaults to the model's last unreferenced entity.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fact_entity: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            row_count: 1000,
            denormalization: 0.0,
            seed: 42,
            row_overrides: BTreeMap::new(),
            fact_entity: None,
        }
    }
}

impl GenerationConfig {
    pub fn new(row_count: u64, denormalization: f64, seed: u64) -> Self {
        Self {
            row_count,
            denormalization,
            seed,
            ..Self::default()
        }
    }

    pub fn with_override(mut self, entity: impl Into<String>, rows: u64) -> Self {
        self.row_overrides.insert(entity.into(), rows);
        self
    }

    pub fn with_fact_entity(mut self, entity: impl Into<String>) -> Self {
        self.fact_entity = Some(entity.into());
        self
    }

    /// Reject configurations that cannot drive a run against `model`.
    pub fn check(&self, model: &EntityModel) -> Result<(), GenerationError> {
        if self.row_count == 0 {
            return Err(GenerationError::invalid_config("row_count must be > 0"));
        }
        if !self.denormalization.is_finite() || !(0.0..=1.0).contains(&self.denormalization) {
            return Err(GenerationError::invalid_config(format!(
                "denormalization must be within [0.0, 1.0], got {}",
                self.denormalization
            )));
        }

        for (entity, rows) in &self.row_overrides {
            let spec = model.entity(entity).ok_or_else(|| {
                GenerationError::invalid_config(format!("override for unknown entity '{entity}'"))
            })?;
            if *rows == 0 {
                return Err(GenerationError::invalid_config(format!(
                    "override for '{entity}' must be > 0"
                )));
            }
            if let Some(relation) = spec.primary_relation() {
                return Err(GenerationError::invalid_config(format!(
                    "'{entity}' rows are derived from its fan-out over '{}' and cannot be overridden",
                    relation.target
                )));
            }
        }

        if let Some(fact) = &self.fact_entity {
            if !model.contains(fact) {
                return Err(GenerationError::invalid_config(format!(
                    "unknown fact entity '{fact}'"
                )));
            }
        }

        Ok(())
    }

    /// Fact entity for `model`: the configured one or the model default.
    pub fn resolve_fact<'a>(&'a self, model: &'a EntityModel) -> Result<&'a str, GenerationError> {
        match &self.fact_entity {
            Some(fact) => Ok(fact.as_str()),
            None => Ok(model.fact_entity()?),
        }
    }
}

/// Rows produced for one entity during the generation phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityReport {
    pub entity: String,
    pub rows: u64,
    /// Where the row count came from (`override`, `row_count`, `fact_chain`,
    /// `default` or `fan_out:<target>`).
    pub row_source: String,
}

/// Summary of an output table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableReport {
    pub table: String,
    pub kind: String,
    pub columns: usize,
    pub rows: u64,
}

/// Report for a generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub seed: u64,
    pub denormalization: f64,
    pub fact_entity: String,
    pub entities: Vec<EntityReport>,
    /// Inlined relations as `<entity>.<relation>`, in selection order.
    pub inlined_relations: Vec<String>,
    pub tables: Vec<TableReport>,
    /// SHA-256 over the canonical dataset contents.
    pub fingerprint: String,
    pub duration_ms: u64,
}

impl GenerationReport {
    pub fn new(config: &GenerationConfig, fact_entity: &str) -> Self {
        Self {
            seed: config.seed,
            denormalization: config.denormalization,
            fact_entity: fact_entity.to_string(),
            entities: Vec::new(),
            inlined_relations: Vec::new(),
            tables: Vec::new(),
            fingerprint: String::new(),
            duration_ms: 0,
        }
    }

    pub fn record_entity(&mut self, entity: &str, rows: u64, row_source: String) {
        self.entities.push(EntityReport {
            entity: entity.to_string(),
            rows,
            row_source,
        });
    }

    pub fn record_table(&mut self, table: &str, kind: &str, columns: usize, rows: u64) {
        self.tables.push(TableReport {
            table: table.to_string(),
            kind: kind.to_string(),
            columns,
            rows,
        });
    }

    /// Rows generated for `entity` before denormalization.
    pub fn entity_rows(&self, entity: &str) -> Option<u64> {
        self.entities
            .iter()
            .find(|report| report.entity == entity)
            .map(|report| report.rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchgen_core::{EntitySpec, FanOut, RelationSpec};

    fn model() -> EntityModel {
        EntityModel::new()
            .with_entity(EntitySpec::new("Customer"))
            .and_then(|model| {
                model.with_entity(EntitySpec::new("Order").relation(RelationSpec::one_to_many(
                    "Customer",
                    FanOut::Fixed { count: 2 },
                )))
            })
            .expect("model")
    }

    #[test]
    fn default_config_is_valid() {
        assert!(GenerationConfig::default().check(&model()).is_ok());
    }

    #[test]
    fn rejects_out_of_range_factor() {
        for factor in [-0.1, 1.5, f64::NAN] {
            let config = GenerationConfig::new(10, factor, 1);
            let err = config.check(&model()).unwrap_err();
            assert_eq!(err.kind(), "InvalidConfigError");
        }
    }

    #[test]
    fn rejects_zero_rows() {
        let config = GenerationConfig::new(0, 0.0, 1);
        assert!(matches!(
            config.check(&model()),
            Err(GenerationError::InvalidConfig(_))
        ));
    }

    #[test]
    fn rejects_bad_overrides() {
        let unknown = GenerationConfig::default().with_override("Supplier", 3);
        assert!(unknown.check(&model()).is_err());

        let zero = GenerationConfig::default().with_override("Customer", 0);
        assert!(zero.check(&model()).is_err());

        let derived = GenerationConfig::default().with_override("Order", 3);
        let err = derived.check(&model()).unwrap_err();
        assert!(err.to_string().contains("Order"));

        let root = GenerationConfig::default().with_override("Customer", 3);
        assert!(root.check(&model()).is_ok());
    }

    #[test]
    fn resolves_fact_entity() {
        let model = model();
        let config = GenerationConfig::default();
        assert_eq!(config.resolve_fact(&model).expect("fact"), "Order");

        let config = GenerationConfig::default().with_fact_entity("Customer");
        assert_eq!(config.resolve_fact(&model).expect("fact"), "Customer");

        let config = GenerationConfig::default().with_fact_entity("Nope");
        assert!(config.check(&model).is_err());
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: GenerationConfig =
            serde_json::from_str(r#"{"row_count": 50, "row_overrides": {"Customer": 2}}"#)
                .expect("parse config");
        assert_eq!(config.row_count, 50);
        assert_eq!(config.seed, 42);
        assert_eq!(config.row_overrides.get("Customer"), Some(&2));
        assert!(config.fact_entity.is_none());
    }
}
