use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Largest number of ranks a zipf distribution may cover.
pub const MAX_ZIPF_SUPPORT: u64 = 1_000_000;
/// Largest count (fixed, uniform bound or poisson mean) a fan-out may sample.
pub const MAX_FAN_OUT: u64 = 1_000_000;
/// Number of equal-width buckets used to rank float ranges under zipf.
pub const ZIPF_FLOAT_BUCKETS: usize = 1000;
/// Pool size used when zipf ranks values of a generative (string) domain.
pub const GENERATIVE_POOL_SIZE: usize = 1000;
/// Null probability applied to nullable attributes without an explicit rate.
pub const DEFAULT_NULL_RATE: f64 = 0.1;
/// Length of generated text values when no bounds are given.
pub const DEFAULT_TEXT_LEN: usize = 10;
/// Repetition cap for unbounded regex quantifiers.
pub const DEFAULT_MAX_REPEAT: u32 = 32;

/// Set of values an attribute may take.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueDomain {
    /// Finite, ordered set of labels. Order defines zipf ranks.
    Enumerated { values: Vec<String> },
    /// Inclusive integer range.
    IntRange { min: i64, max: i64 },
    /// Inclusive float range.
    FloatRange { min: f64, max: f64 },
    /// Strings generated from a regular expression.
    Pattern {
        pattern: String,
        #[serde(default = "default_max_repeat")]
        max_repeat: u32,
    },
    /// Random alphanumeric strings with a length in `min_len..=max_len`.
    Text {
        #[serde(default = "default_text_len")]
        min_len: usize,
        #[serde(default = "default_text_len")]
        max_len: usize,
    },
}

fn default_max_repeat() -> u32 {
    DEFAULT_MAX_REPEAT
}

fn default_text_len() -> usize {
    DEFAULT_TEXT_LEN
}

impl ValueDomain {
    pub fn enumerated<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ValueDomain::Enumerated {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn pattern(pattern: impl Into<String>) -> Self {
        ValueDomain::Pattern {
            pattern: pattern.into(),
            max_repeat: DEFAULT_MAX_REPEAT,
        }
    }

    pub fn text(len: usize) -> Self {
        ValueDomain::Text {
            min_len: len,
            max_len: len,
        }
    }

    /// Whether sampled values are strings.
    pub fn is_text(&self) -> bool {
        matches!(
            self,
            ValueDomain::Enumerated { .. } | ValueDomain::Pattern { .. } | ValueDomain::Text { .. }
        )
    }

    /// Whether values are produced by a generator rather than picked from a
    /// known set.
    pub fn is_generative(&self) -> bool {
        matches!(self, ValueDomain::Pattern { .. } | ValueDomain::Text { .. })
    }

    /// Number of distinct values for finite domains, `None` otherwise.
    pub fn finite_size(&self) -> Option<u64> {
        match self {
            ValueDomain::Enumerated { values } => Some(values.len() as u64),
            ValueDomain::IntRange { min, max } if min <= max => {
                let span = (*max as i128) - (*min as i128) + 1;
                Some(u64::try_from(span).unwrap_or(u64::MAX))
            }
            ValueDomain::IntRange { .. } => Some(0),
            _ => None,
        }
    }

    /// Reason the domain holds no value, if it is empty.
    pub fn emptiness(&self) -> Option<String> {
        match self {
            ValueDomain::Enumerated { values } if values.is_empty() => {
                Some("enumerated domain has no values".to_string())
            }
            ValueDomain::IntRange { min, max } if min > max => {
                Some(format!("int range {min}..={max} is empty"))
            }
            ValueDomain::FloatRange { min, max } if !(min.is_finite() && max.is_finite()) => {
                Some(format!("float range {min}..={max} is not finite"))
            }
            ValueDomain::FloatRange { min, max } if min > max => {
                Some(format!("float range {min}..={max} is empty"))
            }
            ValueDomain::Pattern { pattern, .. } if pattern.is_empty() => {
                Some("pattern is empty".to_string())
            }
            ValueDomain::Text { min_len, max_len } if min_len > max_len => {
                Some(format!("text length {min_len}..={max_len} is empty"))
            }
            _ => None,
        }
    }
}

/// Shape of the values sampled from a domain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Distribution {
    /// Every value equally likely.
    #[default]
    Uniform,
    /// Rank `k` (1-based) has weight `k^-exponent`.
    Zipf { exponent: f64 },
    /// A fixed pool of `cardinality` distinct values, sampled uniformly.
    Categorical { cardinality: usize },
}

/// Distribution of a per-row count: children per parent row (fan-out) or
/// linked targets per row (join density).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FanOut {
    Fixed { count: u64 },
    Uniform { min: u64, max: u64 },
    Poisson { mean: f64 },
    /// Skewed counts over `1..=max`.
    Zipf { max: u64, exponent: f64 },
}

impl FanOut {
    /// Expected value of the distribution.
    pub fn mean(&self) -> f64 {
        match self {
            FanOut::Fixed { count } => *count as f64,
            FanOut::Uniform { min, max } => (*min as f64 + *max as f64) / 2.0,
            FanOut::Poisson { mean } => *mean,
            FanOut::Zipf { max, exponent } => {
                let mut weighted = 0.0;
                let mut total = 0.0;
                for k in 1..=*max {
                    let weight = (k as f64).powf(-exponent);
                    weighted += k as f64 * weight;
                    total += weight;
                }
                if total > 0.0 { weighted / total } else { 0.0 }
            }
        }
    }

    /// Inclusive lower bound and optional upper bound of sampled counts.
    pub fn support(&self) -> (u64, Option<u64>) {
        match self {
            FanOut::Fixed { count } => (*count, Some(*count)),
            FanOut::Uniform { min, max } => (*min, Some(*max)),
            FanOut::Poisson { .. } => (0, None),
            FanOut::Zipf { max, .. } => (1, Some(*max)),
        }
    }

    /// Reason the parameters are unusable, if any.
    pub fn problem(&self) -> Option<String> {
        match self {
            FanOut::Fixed { count } if *count > MAX_FAN_OUT => Some(format!(
                "fixed count {count} exceeds the supported {MAX_FAN_OUT}"
            )),
            FanOut::Uniform { min, max } if min > max => {
                Some(format!("uniform range {min}..={max} is empty"))
            }
            FanOut::Uniform { max, .. } if *max > MAX_FAN_OUT => Some(format!(
                "uniform max {max} exceeds the supported {MAX_FAN_OUT}"
            )),
            FanOut::Poisson { mean } if !mean.is_finite() || *mean < 0.0 => {
                Some(format!("poisson mean must be finite and >= 0, got {mean}"))
            }
            FanOut::Poisson { mean } if *mean > MAX_FAN_OUT as f64 => Some(format!(
                "poisson mean {mean} exceeds the supported {MAX_FAN_OUT}"
            )),
            FanOut::Zipf { max, .. } if *max == 0 => Some("zipf max must be >= 1".to_string()),
            FanOut::Zipf { max, .. } if *max > MAX_ZIPF_SUPPORT => Some(format!(
                "zipf max {max} exceeds the supported {MAX_ZIPF_SUPPORT} ranks"
            )),
            FanOut::Zipf { exponent, .. } if !exponent.is_finite() || *exponent <= 0.0 => {
                Some(format!("zipf exponent must be > 0, got {exponent}"))
            }
            _ => None,
        }
    }
}
