use std::collections::BTreeMap;

use benchgen_core::EntityModel;

use crate::errors::GenerationError;
use crate::model::GenerationConfig;

/// Rows given to entities that are neither the fact nor on its primary
/// chain, unless overridden: half the fact rows, at least this many.
const MIN_DEFAULT_ROWS: u64 = 10;

/// How an entity's row count is obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum RowSource {
    /// Fixed up front.
    Fixed { rows: u64, origin: RowOrigin },
    /// Sum of fan-out weights sampled per row of the primary relation's
    /// target.
    FanOut { relation: String, target: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOrigin {
    Override,
    /// The fact entity itself.
    RowCount,
    /// Scaled down along the fact's chain of primary relations.
    FactChain,
    Default,
}

impl RowSource {
    pub fn label(&self) -> String {
        match self {
            RowSource::Fixed { origin, .. } => match origin {
                RowOrigin::Override => "override",
                RowOrigin::RowCount => "row_count",
                RowOrigin::FactChain => "fact_chain",
                RowOrigin::Default => "default",
            }
            .to_string(),
            RowSource::FanOut { target, .. } => format!("fan_out:{target}"),
        }
    }
}

/// Planned generation task for an entity.
#[derive(Debug, Clone)]
pub struct GenerationTask {
    pub entity: String,
    pub rows: RowSource,
}

/// Build a deterministic generation plan: one task per entity, in
/// topological order.
pub fn plan_entities(
    model: &EntityModel,
    config: &GenerationConfig,
    fact: &str,
    order: &[String],
) -> Result<Vec<GenerationTask>, GenerationError> {
    let chain = fact_chain_rows(model, config.row_count, fact)?;
    let default_rows = ((config.row_count as f64 / 2.0).round() as u64).max(MIN_DEFAULT_ROWS);

    let mut tasks = Vec::with_capacity(order.len());
    for name in order {
        let entity = model.entity(name).ok_or_else(|| GenerationError::UnresolvedReference {
            entity: fact.to_string(),
            target: name.clone(),
        })?;

        let rows = if let Some(relation) = entity.primary_relation() {
            RowSource::FanOut {
                relation: relation.name().to_string(),
                target: relation.target.clone(),
            }
        } else if let Some(rows) = config.row_overrides.get(name) {
            RowSource::Fixed {
                rows: *rows,
                origin: RowOrigin::Override,
            }
        } else if name == fact {
            RowSource::Fixed {
                rows: config.row_count,
                origin: RowOrigin::RowCount,
            }
        } else if let Some(rows) = chain.get(name.as_str()) {
            RowSource::Fixed {
                rows: *rows,
                origin: RowOrigin::FactChain,
            }
        } else {
            RowSource::Fixed {
                rows: default_rows,
                origin: RowOrigin::Default,
            }
        };

        tasks.push(GenerationTask {
            entity: name.clone(),
            rows,
        });
    }

    if tasks.is_empty() {
        return Err(GenerationError::invalid_config("model declares no entities"));
    }

    Ok(tasks)
}

/// Follow primary relations from the fact and size the entity that ends the
/// chain so that the expected fact row count matches `row_count`.
fn fact_chain_rows<'a>(
    model: &'a EntityModel,
    row_count: u64,
    fact: &str,
) -> Result<BTreeMap<&'a str, u64>, GenerationError> {
    let mut rows = BTreeMap::new();
    let mut mean_product = 1.0;
    let mut current = model
        .entity(fact)
        .ok_or_else(|| GenerationError::invalid_config(format!("unknown fact entity '{fact}'")))?;

    let mut hops = 0;
    while let Some(relation) = current.primary_relation() {
        mean_product *= relation.cardinality.counts().mean();
        current = model
            .entity(&relation.target)
            .ok_or_else(|| GenerationError::UnresolvedReference {
                entity: current.name.clone(),
                target: relation.target.clone(),
            })?;
        hops += 1;
        if hops > model.len() {
            return Err(GenerationError::invalid_config(
                "primary relations of the fact entity form a cycle",
            ));
        }
    }

    if hops > 0 {
        let scaled = if mean_product > 0.0 {
            (row_count as f64 / mean_product).ceil() as u64
        } else {
            1
        };
        rows.insert(current.name.as_str(), scaled.max(1));
    }

    Ok(rows)
}
