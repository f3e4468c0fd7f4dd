use std::collections::BTreeMap;

use rand::Rng;
use rand::seq::index;

use benchgen_core::FanOut;

use crate::errors::GenerationError;
use crate::generators::GeneratedValue;
use crate::generators::primitives::CountSampler;

/// Per-row link sets of a many-to-many relation: `targets[row]` lists the
/// target keys linked to source row `row`, ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkSet {
    pub relation: String,
    pub target: String,
    pub targets: Vec<Vec<usize>>,
}

impl LinkSet {
    pub fn link_count(&self) -> usize {
        self.targets.iter().map(Vec::len).sum()
    }
}

/// Normalized rows of a generated entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRows {
    pub entity: String,
    /// `key`, attributes, one-to-many foreign keys.
    pub columns: Vec<String>,
    pub rows: Vec<Vec<GeneratedValue>>,
    pub links: Vec<LinkSet>,
}

impl EntityRows {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn link_set(&self, relation: &str) -> Option<&LinkSet> {
        self.links.iter().find(|links| links.relation == relation)
    }
}

/// Entities generated so far, keyed by name.
#[derive(Debug, Default)]
pub struct EntityStore {
    entities: BTreeMap<String, EntityRows>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, rows: EntityRows) {
        self.entities.insert(rows.entity.clone(), rows);
    }

    pub fn get(&self, entity: &str) -> Option<&EntityRows> {
        self.entities.get(entity)
    }

    /// Row count of `target`, which `entity` is about to reference.
    pub fn target_rows(&self, entity: &str, target: &str) -> Result<usize, GenerationError> {
        self.entities
            .get(target)
            .map(EntityRows::len)
            .ok_or_else(|| GenerationError::UnresolvedReference {
                entity: entity.to_string(),
                target: target.to_string(),
            })
    }

    pub fn into_entities(self) -> BTreeMap<String, EntityRows> {
        self.entities
    }
}

/// Sample a fan-out weight per target row.
pub fn fan_out_weights<R: Rng + ?Sized>(fan_out: &FanOut, targets: usize, rng: &mut R) -> Vec<u64> {
    let sampler = CountSampler::new(fan_out);
    (0..targets).map(|_| sampler.sample(rng)).collect()
}

/// Parent key per child row for a primary relation: parent `i` receives
/// `weights[i]` contiguous rows. Fails when the total row count does not fit
/// in memory addressing.
pub fn expand_parents(
    entity: &str,
    relation: &str,
    weights: &[u64],
) -> Result<Vec<usize>, GenerationError> {
    let too_large = || {
        GenerationError::invalid_config(format!(
            "fan-out of relation {entity}.{relation} yields more rows than can be generated"
        ))
    };

    let total = weights
        .iter()
        .try_fold(0_u64, |total, weight| total.checked_add(*weight))
        .ok_or_else(too_large)?;
    let total = usize::try_from(total).map_err(|_| too_large())?;

    let mut parents = Vec::new();
    parents.try_reserve_exact(total).map_err(|_| too_large())?;
    for (parent, weight) in weights.iter().enumerate() {
        let weight = usize::try_from(*weight).map_err(|_| too_large())?;
        parents.extend(std::iter::repeat_n(parent, weight));
    }
    Ok(parents)
}

/// Choose one target per row, proportionally to `weights` (uniformly when
/// every weight is zero).
pub fn choose_targets<R: Rng + ?Sized>(weights: &[u64], rows: usize, rng: &mut R) -> Vec<usize> {
    let mut total = 0_u64;
    let cumulative: Vec<u64> = weights
        .iter()
        .map(|weight| {
            total = total.saturating_add(*weight);
            total
        })
        .collect();

    (0..rows)
        .map(|_| {
            if total == 0 {
                rng.random_range(0..weights.len())
            } else {
                let roll = rng.random_range(0..total);
                cumulative.partition_point(|cumulative| *cumulative <= roll)
            }
        })
        .collect()
}

/// Draw a link set per row: `k` from `density`, clamped to the target row
/// count, then `k` distinct targets uniformly.
pub fn draw_links<R: Rng + ?Sized>(
    density: &FanOut,
    rows: usize,
    targets: usize,
    rng: &mut R,
) -> Vec<Vec<usize>> {
    let sampler = CountSampler::new(density);
    (0..rows)
        .map(|_| {
            let k = usize::try_from(sampler.sample(rng))
                .unwrap_or(usize::MAX)
                .min(targets);
            let mut linked = index::sample(rng, targets, k).into_vec();
            linked.sort_unstable();
            linked
        })
        .collect()
}

/// Foreign key column values for target keys.
pub fn key_column(keys: &[usize]) -> Vec<GeneratedValue> {
    keys.iter().map(|key| GeneratedValue::key(*key)).collect()
}
