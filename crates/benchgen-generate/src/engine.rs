use std::time::Instant;

use tracing::info;

use benchgen_core::{Cardinality, EntityModel, EntitySpec};

use crate::dataset::GeneratedDataset;
use crate::denormalize::denormalize;
use crate::errors::GenerationError;
use crate::foreign::{
    EntityRows, EntityStore, LinkSet, choose_targets, draw_links, expand_parents, fan_out_weights,
    key_column,
};
use crate::generators::{AttributeSampler, GeneratedValue};
use crate::model::{GenerationConfig, GenerationReport};
use crate::planner::{RowSource, plan_entities};
use crate::seed::StreamFactory;

/// Result of a generation run.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    pub dataset: GeneratedDataset,
    pub report: GenerationReport,
}

/// Entry point for generating datasets from an entity model.
#[derive(Debug, Clone)]
pub struct GenerationEngine {
    config: GenerationConfig,
}

impl GenerationEngine {
    pub fn new(config: GenerationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GenerationConfig {
        &self.config
    }

    /// Generate every entity in topological order, then denormalize. The
    /// engine keeps no state between runs; equal models and configs give
    /// identical datasets.
    pub fn run(&self, model: &EntityModel) -> Result<GenerationResult, GenerationError> {
        let start = Instant::now();
        model.validate()?;
        self.config.check(model)?;

        let fact = self.config.resolve_fact(model)?.to_string();
        let order = model.topological_order()?;
        let tasks = plan_entities(model, &self.config, &fact, &order)?;
        let streams = StreamFactory::new(self.config.seed);
        let mut store = EntityStore::new();
        let mut report = GenerationReport::new(&self.config, &fact);

        info!(
            entities = tasks.len(),
            fact = %fact,
            row_count = self.config.row_count,
            denormalization = self.config.denormalization,
            seed = self.config.seed,
            "generation started"
        );

        for task in tasks {
            let entity_start = Instant::now();
            let entity = planned_entity(model, &task.entity)?;

            let rows = generate_entity(entity, &task.rows, &streams, &store)?;
            let row_source = task.rows.label();
            report.record_entity(&task.entity, rows.len() as u64, row_source.clone());

            info!(
                entity = %task.entity,
                rows = rows.len(),
                row_source = %row_source,
                links = rows.links.iter().map(LinkSet::link_count).sum::<usize>(),
                duration_ms = entity_start.elapsed().as_millis() as u64,
                "entity generated"
            );
            store.ingest(rows);
        }

        let dataset = denormalize(model, &store, &order, &fact, self.config.denormalization)?;

        report.inlined_relations = dataset.inlined().to_vec();
        for table in dataset.tables() {
            report.record_table(
                &table.name,
                table.kind.as_str(),
                table.columns.len(),
                table.len() as u64,
            );
        }
        report.fingerprint = dataset.fingerprint();
        report.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            tables = report.tables.len(),
            rows = dataset.total_rows(),
            inlined = report.inlined_relations.len(),
            normalized = dataset.is_normalized(),
            fingerprint = %report.fingerprint,
            duration_ms = report.duration_ms,
            "generation completed"
        );

        Ok(GenerationResult { dataset, report })
    }
}

/// Generate a dataset without keeping the run report.
pub fn generate(
    model: &EntityModel,
    config: &GenerationConfig,
) -> Result<GeneratedDataset, GenerationError> {
    GenerationEngine::new(config.clone())
        .run(model)
        .map(|result| result.dataset)
}

/// Spec of an entity the planner scheduled.
fn planned_entity<'a>(
    model: &'a EntityModel,
    name: &str,
) -> Result<&'a EntitySpec, GenerationError> {
    model
        .entity(name)
        .ok_or_else(|| GenerationError::UnresolvedReference {
            entity: name.to_string(),
            target: name.to_string(),
        })
}

fn generate_entity(
    entity: &EntitySpec,
    row_source: &RowSource,
    streams: &StreamFactory,
    store: &EntityStore,
) -> Result<EntityRows, GenerationError> {
    let name = entity.name.as_str();
    for relation in &entity.relations {
        store.target_rows(name, &relation.target)?;
    }

    let (row_count, parents) = match row_source {
        RowSource::Fixed { rows, .. } => {
            let rows = usize::try_from(*rows).map_err(|_| {
                GenerationError::invalid_config(format!("row count for '{name}' is too large"))
            })?;
            (rows, None)
        }
        RowSource::FanOut { relation, target } => {
            let spec = entity.relation_named(relation).ok_or_else(|| {
                GenerationError::UnresolvedReference {
                    entity: name.to_string(),
                    target: target.clone(),
                }
            })?;
            let targets = store.target_rows(name, target)?;
            let weights = fan_out_weights(
                spec.cardinality.counts(),
                targets,
                &mut streams.fan_out(name, relation),
            );
            let parents = expand_parents(name, relation, &weights)?;
            (parents.len(), Some((relation.as_str(), parents)))
        }
    };

    let mut columns: Vec<Vec<GeneratedValue>> = Vec::with_capacity(1 + entity.attributes.len());
    columns.push((0..row_count).map(GeneratedValue::key).collect());

    for attribute in &entity.attributes {
        let mut rng = streams.attribute(name, &attribute.name);
        let sampler = AttributeSampler::prepare(name, attribute, &mut rng)?;
        columns.push(sampler.sample_column(row_count, &mut rng));
    }

    let mut links = Vec::new();
    for relation in &entity.relations {
        let targets = store.target_rows(name, &relation.target)?;
        match &relation.cardinality {
            Cardinality::OneToMany { fan_out } => {
                if let Some((primary, keys)) = &parents {
                    if *primary == relation.name() {
                        columns.push(key_column(keys));
                        continue;
                    }
                }
                if targets == 0 && row_count > 0 {
                    return Err(GenerationError::EmptyTarget {
                        entity: name.to_string(),
                        relation: relation.name().to_string(),
                        target: relation.target.clone(),
                    });
                }
                let weights =
                    fan_out_weights(fan_out, targets, &mut streams.fan_out(name, relation.name()));
                let picks = choose_targets(
                    &weights,
                    row_count,
                    &mut streams.relation(name, relation.name()),
                );
                columns.push(key_column(&picks));
            }
            Cardinality::ManyToMany { density } => {
                links.push(LinkSet {
                    relation: relation.name().to_string(),
                    target: relation.target.clone(),
                    targets: draw_links(
                        density,
                        row_count,
                        targets,
                        &mut streams.relation(name, relation.name()),
                    ),
                });
            }
        }
    }

    let mut cells: Vec<_> = columns.into_iter().map(Vec::into_iter).collect();
    let rows: Vec<_> = (0..row_count)
        .map(|_| cells.iter_mut().filter_map(Iterator::next).collect::<Vec<_>>())
        .collect();

    Ok(EntityRows {
        entity: name.to_string(),
        columns: entity.columns(),
        rows,
        links,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use benchgen_core::{AttributeSpec, FanOut, RelationSpec, ValueDomain};

    fn model() -> EntityModel {
        EntityModel::new()
            .with_entity(EntitySpec::new("Store").attribute(AttributeSpec::new(
                "city",
                ValueDomain::enumerated(["lisbon", "porto"]),
            )))
            .and_then(|model| {
                model.with_entity(EntitySpec::new("Customer").attribute(AttributeSpec::new(
                    "tier",
                    ValueDomain::enumerated(["a", "b"]),
                )))
            })
            .and_then(|model| {
                model.with_entity(
                    EntitySpec::new("Visit")
                        .relation(RelationSpec::one_to_many(
                            "Customer",
                            FanOut::Uniform { min: 0, max: 3 },
                        ))
                        .relation(RelationSpec::one_to_many(
                            "Store",
                            FanOut::Poisson { mean: 2.0 },
                        )),
                )
            })
            .expect("model")
    }

    #[test]
    fn primary_relation_drives_row_count() {
        let model = model();
        let config = GenerationConfig::new(100, 0.0, 9).with_override("Customer", 12);
        let result = GenerationEngine::new(config).run(&model).expect("run");

        let visits = result.dataset.table("Visit").expect("visits");
        let parents: Vec<i64> = visits
            .column("Customer_key")
            .expect("fk")
            .iter()
            .filter_map(|value| value.as_i64())
            .collect();
        assert!(parents.windows(2).all(|pair| pair[0] <= pair[1]));
        assert!(parents.iter().all(|parent| (0..12).contains(parent)));
        assert_eq!(result.report.entity_rows("Visit"), Some(visits.len() as u64));
        assert_eq!(result.report.entity_rows("Customer"), Some(12));
        assert_eq!(result.report.entity_rows("Store"), Some(50));
    }

    #[test]
    fn secondary_relation_keys_are_in_range() {
        let model = model();
        let config = GenerationConfig::new(40, 0.0, 3).with_override("Store", 4);
        let dataset = generate(&model, &config).expect("run");
        let visits = dataset.table("Visit").expect("visits");
        for value in visits.column("Store_key").expect("fk") {
            let key = value.as_i64().expect("int key");
            assert!((0..4).contains(&key));
        }
    }

    #[test]
    fn empty_secondary_target_fails() {
        let model = EntityModel::new()
            .with_entity(EntitySpec::new("Customer"))
            .and_then(|model| model.with_entity(EntitySpec::new("Region")))
            .and_then(|model| {
                model.with_entity(
                    EntitySpec::new("Order")
                        .relation(RelationSpec::one_to_many(
                            "Customer",
                            FanOut::Fixed { count: 2 },
                        ))
                        .relation(RelationSpec::one_to_many(
                            "Region",
                            FanOut::Fixed { count: 1 },
                        )),
                )
            })
            .and_then(|model| {
                model.with_entity(EntitySpec::new("Shipment").relation(
                    RelationSpec::one_to_many("Region", FanOut::Fixed { count: 0 }),
                ))
            })
            .and_then(|model| {
                model.with_entity(
                    EntitySpec::new("Audit")
                        .relation(RelationSpec::one_to_many(
                            "Order",
                            FanOut::Fixed { count: 1 },
                        ))
                        .relation(RelationSpec::one_to_many(
                            "Shipment",
                            FanOut::Fixed { count: 1 },
                        )),
                )
            })
            .expect("model");

        let err = generate(&model, &GenerationConfig::new(10, 0.0, 1)).unwrap_err();
        assert!(matches!(err, GenerationError::EmptyTarget { ref target, .. } if target == "Shipment"));
        assert_eq!(err.kind(), "EmptyTargetError");
    }

    #[test]
    fn missing_planned_entity_names_itself() {
        let model = model();
        assert!(planned_entity(&model, "Visit").is_ok());

        let err = planned_entity(&model, "Refund").unwrap_err();
        assert!(matches!(
            err,
            GenerationError::UnresolvedReference { ref entity, ref target }
                if entity == "Refund" && target == "Refund"
        ));
    }

    #[test]
    fn oversized_fan_out_fails_validation() {
        let model = EntityModel::new()
            .with_entity(EntitySpec::new("Customer"))
            .and_then(|model| {
                model.with_entity(EntitySpec::new("Order").relation(RelationSpec::one_to_many(
                    "Customer",
                    FanOut::Fixed { count: u64::MAX },
                )))
            })
            .expect("model");

        let config = GenerationConfig::new(10, 0.0, 1).with_override("Customer", 2);
        let err = generate(&model, &config).unwrap_err();
        assert_eq!(err.kind(), "InvalidParameterError");
        assert!(err.to_string().contains("Order.Customer"));
    }

    #[test]
    fn invalid_models_fail_before_generation() {
        let model = EntityModel::new()
            .with_entity(EntitySpec::new("Item").attribute(AttributeSpec::new(
                "qty",
                ValueDomain::IntRange { min: 5, max: 1 },
            )))
            .expect("model");
        let err = generate(&model, &GenerationConfig::default()).unwrap_err();
        assert_eq!(err.kind(), "EmptyDomainError");
    }
}
