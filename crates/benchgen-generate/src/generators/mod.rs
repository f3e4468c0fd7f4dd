//! Attribute value generation: value domains, skew shapes, pools and the
//! string mangler.

use std::collections::BTreeSet;

use rand::Rng;
use rand::seq::index;
use rand_regex::Regex as RandRegex;
use serde::Serialize;

use benchgen_core::types::{GENERATIVE_POOL_SIZE, MAX_ZIPF_SUPPORT, ZIPF_FLOAT_BUCKETS};
use benchgen_core::{AttributeSpec, Distribution, ModelError, ValueDomain};

use crate::errors::GenerationError;
use crate::generators::primitives::{ZipfTable, random_float, random_text};
use crate::generators::transforms::mangle;

pub mod primitives;
pub mod transforms;

/// Draws allowed per requested value when collecting distinct pool values.
const POOL_ATTEMPTS_PER_VALUE: usize = 20;

/// Generated value for a cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum GeneratedValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl GeneratedValue {
    pub fn is_null(&self) -> bool {
        matches!(self, GeneratedValue::Null)
    }

    /// CSV field; NULL is the empty field.
    pub fn to_csv(&self) -> String {
        match self {
            GeneratedValue::Null => String::new(),
            GeneratedValue::Int(value) => value.to_string(),
            GeneratedValue::Float(value) => value.to_string(),
            GeneratedValue::Text(value) => value.clone(),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            GeneratedValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            GeneratedValue::Int(value) => Some(*value as f64),
            GeneratedValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            GeneratedValue::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Row key carried by a key or foreign key cell.
    pub fn as_key(&self) -> Option<usize> {
        self.as_i64().and_then(|value| usize::try_from(value).ok())
    }

    pub fn key(index: usize) -> Self {
        GeneratedValue::Int(index as i64)
    }
}

#[derive(Debug, Clone)]
enum ValueSource {
    Enumerated {
        values: Vec<String>,
        ranks: Option<ZipfTable>,
    },
    Int {
        min: i64,
        max: i64,
        ranks: Option<ZipfTable>,
    },
    Float {
        min: f64,
        max: f64,
        buckets: Option<ZipfTable>,
    },
    Pattern(RandRegex),
    Text {
        min_len: usize,
        max_len: usize,
    },
    /// Pre-drawn values, sampled uniformly or by zipf rank.
    Pool {
        values: Vec<GeneratedValue>,
        ranks: Option<ZipfTable>,
    },
}

impl ValueSource {
    fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> GeneratedValue {
        match self {
            ValueSource::Enumerated { values, ranks } => {
                let idx = match ranks {
                    Some(ranks) => ranks.sample(rng),
                    None => rng.random_range(0..values.len()),
                };
                GeneratedValue::Text(values[idx].clone())
            }
            ValueSource::Int { min, max, ranks } => match ranks {
                Some(ranks) => GeneratedValue::Int(min + ranks.sample(rng) as i64),
                None => GeneratedValue::Int(rng.random_range(*min..=*max)),
            },
            ValueSource::Float { min, max, buckets } => match buckets {
                Some(buckets) => {
                    let width = (max - min) / buckets.len() as f64;
                    let low = min + buckets.sample(rng) as f64 * width;
                    GeneratedValue::Float((low + rng.random::<f64>() * width).min(*max))
                }
                None => GeneratedValue::Float(random_float(*min, *max, rng)),
            },
            ValueSource::Pattern(regex) => GeneratedValue::Text(rng.sample(regex)),
            ValueSource::Text { min_len, max_len } => {
                GeneratedValue::Text(random_text(*min_len, *max_len, rng))
            }
            ValueSource::Pool { values, ranks } => {
                let idx = match ranks {
                    Some(ranks) => ranks.sample(rng),
                    None => rng.random_range(0..values.len()),
                };
                values[idx].clone()
            }
        }
    }
}

/// Sampler for one attribute, with its pools already drawn.
#[derive(Debug, Clone)]
pub struct AttributeSampler {
    null_rate: Option<f64>,
    mangle: bool,
    source: ValueSource,
}

impl AttributeSampler {
    /// Build the sampler for `attribute`. Pools (categorical values, zipf
    /// ranks over generative domains) are drawn from `rng` here, before any
    /// row value.
    pub fn prepare<R: Rng + ?Sized>(
        entity: &str,
        attribute: &AttributeSpec,
        rng: &mut R,
    ) -> Result<Self, GenerationError> {
        let path = format!("{entity}.{}", attribute.name);
        let base = base_source(&path, &attribute.domain)?;

        let source = match &attribute.distribution {
            Distribution::Uniform => base,
            Distribution::Zipf { exponent } => zipf_source(&path, base, *exponent, rng)?,
            Distribution::Categorical { cardinality } => {
                categorical_source(&path, base, *cardinality, rng)?
            }
        };

        Ok(Self {
            null_rate: attribute.nullable.then(|| attribute.effective_null_rate()),
            mangle: attribute.mangle,
            source,
        })
    }

    /// Null draw, value draw, then mangling.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> GeneratedValue {
        if let Some(rate) = self.null_rate {
            if rng.random_bool(rate.clamp(0.0, 1.0)) {
                return GeneratedValue::Null;
            }
        }

        match self.source.draw(rng) {
            GeneratedValue::Text(value) if self.mangle => GeneratedValue::Text(mangle(&value, rng)),
            value => value,
        }
    }

    pub fn sample_column<R: Rng + ?Sized>(&self, rows: usize, rng: &mut R) -> Vec<GeneratedValue> {
        (0..rows).map(|_| self.sample(rng)).collect()
    }

    /// Number of distinct values the sampler draws from, when pooled.
    pub fn pool_size(&self) -> Option<usize> {
        match &self.source {
            ValueSource::Pool { values, .. } => Some(values.len()),
            _ => None,
        }
    }
}

fn base_source(path: &str, domain: &ValueDomain) -> Result<ValueSource, GenerationError> {
    if let Some(reason) = domain.emptiness() {
        return Err(ModelError::invalid(path, reason).into());
    }

    let source = match domain {
        ValueDomain::Enumerated { values } => ValueSource::Enumerated {
            values: values.clone(),
            ranks: None,
        },
        ValueDomain::IntRange { min, max } => ValueSource::Int {
            min: *min,
            max: *max,
            ranks: None,
        },
        ValueDomain::FloatRange { min, max } => {
            if !(max - min).is_finite() {
                return Err(ModelError::invalid(
                    path,
                    format!("float range {min}..={max} is too wide to sample"),
                )
                .into());
            }
            ValueSource::Float {
                min: *min,
                max: *max,
                buckets: None,
            }
        }
        ValueDomain::Pattern {
            pattern,
            max_repeat,
        } => {
            let regex = RandRegex::compile(pattern, *max_repeat).map_err(|err| {
                ModelError::invalid(path, format!("invalid regex pattern '{pattern}': {err}"))
            })?;
            if !regex.is_utf8() {
                return Err(ModelError::invalid(
                    path,
                    format!("regex pattern '{pattern}' may produce non UTF-8 text"),
                )
                .into());
            }
            ValueSource::Pattern(regex)
        }
        ValueDomain::Text { min_len, max_len } => ValueSource::Text {
            min_len: *min_len,
            max_len: *max_len,
        },
    };

    Ok(source)
}

fn zipf_source<R: Rng + ?Sized>(
    path: &str,
    base: ValueSource,
    exponent: f64,
    rng: &mut R,
) -> Result<ValueSource, GenerationError> {
    let source = match base {
        ValueSource::Enumerated { values, .. } => {
            let ranks = ZipfTable::new(values.len(), exponent);
            ValueSource::Enumerated {
                values,
                ranks: Some(ranks),
            }
        }
        ValueSource::Int { min, max, .. } => {
            let size = int_range_size(min, max);
            if size > MAX_ZIPF_SUPPORT as u128 {
                return Err(ModelError::invalid(
                    path,
                    format!("zipf over {size} integers exceeds the supported {MAX_ZIPF_SUPPORT} ranks"),
                )
                .into());
            }
            ValueSource::Int {
                min,
                max,
                ranks: Some(ZipfTable::new(size as usize, exponent)),
            }
        }
        ValueSource::Float { min, max, .. } => ValueSource::Float {
            min,
            max,
            buckets: Some(ZipfTable::new(ZIPF_FLOAT_BUCKETS, exponent)),
        },
        generative @ (ValueSource::Pattern(_) | ValueSource::Text { .. }) => {
            let values = draw_distinct(&generative, GENERATIVE_POOL_SIZE, rng);
            let ranks = ZipfTable::new(values.len(), exponent);
            ValueSource::Pool {
                values,
                ranks: Some(ranks),
            }
        }
        pool @ ValueSource::Pool { .. } => pool,
    };

    Ok(source)
}

fn categorical_source<R: Rng + ?Sized>(
    path: &str,
    base: ValueSource,
    cardinality: usize,
    rng: &mut R,
) -> Result<ValueSource, GenerationError> {
    if cardinality == 0 {
        return Err(ModelError::invalid(path, "categorical cardinality must be > 0").into());
    }
    let too_large = |size: u128| {
        GenerationError::from(ModelError::invalid(
            path,
            format!("categorical cardinality {cardinality} exceeds the {size} values of the domain"),
        ))
    };

    let values = match &base {
        ValueSource::Enumerated { values, .. } => {
            if cardinality > values.len() {
                return Err(too_large(values.len() as u128));
            }
            index::sample(rng, values.len(), cardinality)
                .into_iter()
                .map(|idx| GeneratedValue::Text(values[idx].clone()))
                .collect()
        }
        ValueSource::Int { min, max, .. } => {
            let size = int_range_size(*min, *max);
            if cardinality as u128 > size {
                return Err(too_large(size));
            }
            if size <= 2 * cardinality as u128 {
                index::sample(rng, size as usize, cardinality)
                    .into_iter()
                    .map(|offset| GeneratedValue::Int(min + offset as i64))
                    .collect()
            } else {
                draw_distinct(&base, cardinality, rng)
            }
        }
        _ => {
            let values = draw_distinct(&base, cardinality, rng);
            if values.len() < cardinality {
                return Err(ModelError::invalid(
                    path,
                    format!(
                        "domain produced only {} distinct values, categorical cardinality is {cardinality}",
                        values.len()
                    ),
                )
                .into());
            }
            values
        }
    };

    Ok(ValueSource::Pool {
        values,
        ranks: None,
    })
}

/// Collect up to `target` distinct values, giving up after a bounded number
/// of draws for domains too small to fill the pool.
fn draw_distinct<R: Rng + ?Sized>(
    source: &ValueSource,
    target: usize,
    rng: &mut R,
) -> Vec<GeneratedValue> {
    let mut seen = BTreeSet::new();
    let mut values = Vec::with_capacity(target);
    let attempts = target.saturating_mul(POOL_ATTEMPTS_PER_VALUE);

    for _ in 0..attempts {
        if values.len() == target {
            break;
        }
        let value = source.draw(rng);
        if seen.insert(value.to_csv()) {
            values.push(value);
        }
    }

    values
}

fn int_range_size(min: i64, max: i64) -> u128 {
    (max as i128 - min as i128 + 1) as u128
}
