//! Denormalization phase: inline a prefix of the candidate relations into
//! wide tables, leaving residual and link tables for the rest.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::info;

use benchgen_core::{Cardinality, EntityModel, KEY_COLUMN, NAMESPACE_SEPARATOR};

use crate::dataset::{DenormalizedDataset, GeneratedDataset, NormalizedDataset, Row, Table, TableKind};
use crate::errors::GenerationError;
use crate::foreign::{EntityRows, EntityStore};
use crate::generators::GeneratedValue;

/// `key` leads every entity table and is never dropped by widening.
const KEY_INDEX: usize = 0;

/// A relation identified by its source entity and relation name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RelationRef {
    pub entity: String,
    pub relation: String,
}

impl RelationRef {
    pub fn label(&self) -> String {
        format!("{}{NAMESPACE_SEPARATOR}{}", self.entity, self.relation)
    }
}

/// Entities reachable from `fact` by following relations, `fact` included.
pub fn reachable_from(model: &EntityModel, fact: &str) -> BTreeSet<String> {
    let mut reachable = BTreeSet::new();
    let mut queue = VecDeque::from([fact.to_string()]);

    while let Some(name) = queue.pop_front() {
        if !reachable.insert(name.clone()) {
            continue;
        }
        if let Some(entity) = model.entity(&name) {
            for relation in &entity.relations {
                if !reachable.contains(&relation.target) {
                    queue.push_back(relation.target.clone());
                }
            }
        }
    }

    reachable
}

/// Relations eligible for inlining, in declaration order: flagged for
/// denormalization and leaving an entity reachable from the fact.
pub fn candidate_relations(model: &EntityModel, fact: &str) -> Vec<RelationRef> {
    let reachable = reachable_from(model, fact);
    model
        .relations()
        .filter(|(entity, relation)| relation.denormalize && reachable.contains(&entity.name))
        .map(|(entity, relation)| RelationRef {
            entity: entity.name.clone(),
            relation: relation.name().to_string(),
        })
        .collect()
}

/// First `round(factor * candidates)` candidates. A larger factor always
/// selects a superset.
pub fn select_relations(model: &EntityModel, fact: &str, factor: f64) -> Vec<RelationRef> {
    let mut candidates = candidate_relations(model, fact);
    let count = (factor.clamp(0.0, 1.0) * candidates.len() as f64).round() as usize;
    candidates.truncate(count);
    candidates
}

/// Build the output dataset from generated entities.
pub fn denormalize(
    model: &EntityModel,
    store: &EntityStore,
    order: &[String],
    fact: &str,
    factor: f64,
) -> Result<GeneratedDataset, GenerationError> {
    let selected = select_relations(model, fact, factor);
    if selected.is_empty() {
        return normalized(model, store, order);
    }

    let selected_set: BTreeSet<RelationRef> = selected.iter().cloned().collect();
    let mut wide = widen(model, store, order, &selected_set)?;

    let reachable = reachable_from(model, fact);
    let still_referenced: BTreeSet<&str> = model
        .relations()
        .filter(|(entity, relation)| !selected_set.contains(&relation_ref(&entity.name, relation.name())))
        .map(|(_, relation)| relation.target.as_str())
        .collect();

    let fact_table = wide
        .remove(fact)
        .ok_or_else(|| unresolved(fact, fact))?
        .into_table(fact, TableKind::Fact);

    let mut residual = Vec::new();
    for name in order {
        if name == fact {
            continue;
        }
        if !reachable.contains(name) || still_referenced.contains(name.as_str()) {
            let table = wide.remove(name).ok_or_else(|| unresolved(fact, name))?;
            residual.push(table.into_table(name, TableKind::Entity));
        }
    }

    let links = link_tables(model, store, order, |link| !selected_set.contains(link))?;

    Ok(GeneratedDataset::Denormalized(DenormalizedDataset {
        fact: fact_table,
        inlined: selected.iter().map(RelationRef::label).collect(),
        residual,
        links,
    }))
}

fn normalized(
    model: &EntityModel,
    store: &EntityStore,
    order: &[String],
) -> Result<GeneratedDataset, GenerationError> {
    let tables = order
        .iter()
        .map(|name| {
            let rows = entity_rows(store, name)?;
            Ok(Table {
                name: name.clone(),
                kind: TableKind::Entity,
                columns: rows.columns.clone(),
                rows: rows.rows.clone(),
            })
        })
        .collect::<Result<Vec<_>, GenerationError>>()?;

    let links = link_tables(model, store, order, |_| true)?;
    Ok(GeneratedDataset::Normalized(NormalizedDataset { tables, links }))
}

/// Junction tables `<Entity>__<relation>` for the many-to-many relations
/// accepted by `keep`.
fn link_tables<F>(
    model: &EntityModel,
    store: &EntityStore,
    order: &[String],
    keep: F,
) -> Result<Vec<Table>, GenerationError>
where
    F: Fn(&RelationRef) -> bool,
{
    let mut tables = Vec::new();

    for name in order {
        let entity = model.entity(name).ok_or_else(|| unresolved(name, name))?;
        for relation in &entity.relations {
            if relation.cardinality.is_one_to_many()
                || !keep(&relation_ref(name, relation.name()))
            {
                continue;
            }

            let links = entity_rows(store, name)?
                .link_set(relation.name())
                .ok_or_else(|| unresolved(name, &relation.target))?;
            let mut table = Table::new(
                format!("{name}__{}", relation.name()),
                TableKind::Link,
                vec![format!("{name}_{KEY_COLUMN}"), relation.key_column()],
            );
            for (row, targets) in links.targets.iter().enumerate() {
                for target in targets {
                    table
                        .rows
                        .push(vec![GeneratedValue::key(row), GeneratedValue::key(*target)]);
                }
            }
            tables.push(table);
        }
    }

    Ok(tables)
}

#[derive(Debug, Clone, PartialEq)]
struct ColumnDef {
    name: String,
    /// Already carries an entity prefix and keeps its name when inlined again.
    namespaced: bool,
}

/// Ordered column list that refuses duplicate names.
#[derive(Debug, Clone, Default)]
struct ColumnSet {
    defs: Vec<ColumnDef>,
    names: BTreeSet<String>,
}

impl ColumnSet {
    fn own(table: &str, columns: &[String]) -> Result<Self, GenerationError> {
        let mut set = Self::default();
        for column in columns {
            set.push(
                table,
                ColumnDef {
                    name: column.clone(),
                    namespaced: false,
                },
            )?;
        }
        Ok(set)
    }

    fn push(&mut self, table: &str, def: ColumnDef) -> Result<(), GenerationError> {
        if !self.names.insert(def.name.clone()) {
            return Err(GenerationError::ColumnCollision {
                table: table.to_string(),
                column: def.name,
            });
        }
        self.defs.push(def);
        Ok(())
    }

    fn remove(&mut self, name: &str) -> Option<usize> {
        let idx = self.defs.iter().position(|def| def.name == name)?;
        self.defs.remove(idx);
        self.names.remove(name);
        Some(idx)
    }

    /// Append the columns of `target` inlined through `relation`: own
    /// columns become `<target>.<column>`, namespaced ones keep their name,
    /// and a clash is qualified as `<relation>.<name>`, repeatedly, until
    /// the name is free.
    fn merge(
        &mut self,
        table: &str,
        relation: &str,
        target: &str,
        other: &ColumnSet,
    ) -> Result<(), GenerationError> {
        for def in &other.defs {
            let base = if def.namespaced {
                def.name.clone()
            } else {
                format!("{target}{NAMESPACE_SEPARATOR}{}", def.name)
            };
            let mut name = base;
            while self.names.contains(&name) {
                name = format!("{relation}{NAMESPACE_SEPARATOR}{name}");
            }
            self.push(
                table,
                ColumnDef {
                    name,
                    namespaced: true,
                },
            )?;
        }
        Ok(())
    }

    fn names(&self) -> Vec<String> {
        self.defs.iter().map(|def| def.name.clone()).collect()
    }
}

/// Entity rows widened with every selected relation, indexed by own key.
#[derive(Debug, Clone)]
struct WideTable {
    columns: ColumnSet,
    rows: Vec<Row>,
    by_key: Vec<Vec<usize>>,
}

impl WideTable {
    fn rows_for(&self, key: usize) -> impl Iterator<Item = &Row> {
        self.by_key
            .get(key)
            .into_iter()
            .flatten()
            .map(|idx| &self.rows[*idx])
    }

    fn into_table(self, name: &str, kind: TableKind) -> Table {
        Table {
            name: name.to_string(),
            kind,
            columns: self.columns.names(),
            rows: self.rows,
        }
    }
}

fn widen(
    model: &EntityModel,
    store: &EntityStore,
    order: &[String],
    selected: &BTreeSet<RelationRef>,
) -> Result<BTreeMap<String, WideTable>, GenerationError> {
    let mut wide: BTreeMap<String, WideTable> = BTreeMap::new();

    for name in order {
        let entity = model.entity(name).ok_or_else(|| unresolved(name, name))?;
        let generated = entity_rows(store, name)?;
        let mut columns = ColumnSet::own(name, &generated.columns)?;
        let mut rows = generated.rows.clone();

        for relation in &entity.relations {
            if !selected.contains(&relation_ref(name, relation.name())) {
                continue;
            }
            let target = wide
                .get(&relation.target)
                .ok_or_else(|| unresolved(name, &relation.target))?;

            rows = match &relation.cardinality {
                Cardinality::OneToMany { .. } => {
                    let fk = columns
                        .remove(&relation.key_column())
                        .ok_or_else(|| unresolved(name, &relation.target))?;
                    columns.merge(name, relation.name(), &relation.target, &target.columns)?;

                    let mut joined = Vec::with_capacity(rows.len());
                    for mut row in rows {
                        let key = row
                            .remove(fk)
                            .as_key()
                            .ok_or_else(|| unresolved(name, &relation.target))?;
                        for target_row in target.rows_for(key) {
                            joined.push(concat(&row, target_row));
                        }
                    }
                    joined
                }
                Cardinality::ManyToMany { .. } => {
                    let links = generated
                        .link_set(relation.name())
                        .ok_or_else(|| unresolved(name, &relation.target))?;
                    columns.merge(name, relation.name(), &relation.target, &target.columns)?;

                    let mut joined = Vec::new();
                    for row in rows {
                        let own = row[KEY_INDEX]
                            .as_key()
                            .ok_or_else(|| unresolved(name, name))?;
                        for key in links.targets.get(own).into_iter().flatten() {
                            for target_row in target.rows_for(*key) {
                                joined.push(concat(&row, target_row));
                            }
                        }
                    }
                    joined
                }
            };

            info!(
                entity = %name,
                relation = %relation.name(),
                target = %relation.target,
                rows = rows.len(),
                columns = columns.defs.len(),
                "relation inlined"
            );
        }

        let mut by_key = vec![Vec::new(); generated.len()];
        for (idx, row) in rows.iter().enumerate() {
            if let Some(slot) = row[KEY_INDEX].as_key().and_then(|key| by_key.get_mut(key)) {
                slot.push(idx);
            }
        }

        wide.insert(
            name.clone(),
            WideTable {
                columns,
                rows,
                by_key,
            },
        );
    }

    Ok(wide)
}

fn concat(left: &[GeneratedValue], right: &[GeneratedValue]) -> Row {
    let mut row = Vec::with_capacity(left.len() + right.len());
    row.extend_from_slice(left);
    row.extend_from_slice(right);
    row
}

fn entity_rows<'a>(store: &'a EntityStore, name: &str) -> Result<&'a EntityRows, GenerationError> {
    store.get(name).ok_or_else(|| unresolved(name, name))
}

fn relation_ref(entity: &str, relation: &str) -> RelationRef {
    RelationRef {
        entity: entity.to_string(),
        relation: relation.to_string(),
    }
}

fn unresolved(entity: &str, target: &str) -> GenerationError {
    GenerationError::UnresolvedReference {
        entity: entity.to_string(),
        target: target.to_string(),
    }
}
