use rand::Rng;

use benchgen_core::FanOut;

const ALPHANUMERIC: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
/// Poisson draws are split into chunks of this mean so `exp(-mean)` stays
/// representable.
const POISSON_CHUNK: f64 = 500.0;

/// Cumulative zipf weights over ranks `0..len`; rank `k` (0-based) has weight
/// `(k + 1)^-exponent`.
#[derive(Debug, Clone)]
pub struct ZipfTable {
    cumulative: Vec<f64>,
}

impl ZipfTable {
    pub fn new(ranks: usize, exponent: f64) -> Self {
        let mut total = 0.0;
        let cumulative = (1..=ranks)
            .map(|k| {
                total += 1.0 / (k as f64).powf(exponent);
                total
            })
            .collect();
        Self { cumulative }
    }

    pub fn len(&self) -> usize {
        self.cumulative.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cumulative.is_empty()
    }

    /// Draw a 0-based rank. Callers never build empty tables.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        let total = self.cumulative.last().copied().unwrap_or(0.0);
        let roll = rng.random::<f64>() * total;
        let rank = self.cumulative.partition_point(|cumulative| *cumulative <= roll);
        rank.min(self.cumulative.len().saturating_sub(1))
    }
}

/// Prepared sampler for a [`FanOut`] distribution.
#[derive(Debug, Clone)]
pub enum CountSampler {
    Fixed(u64),
    Uniform { min: u64, max: u64 },
    Poisson(f64),
    /// Counts `1..=len` ranked by zipf.
    Zipf(ZipfTable),
}

impl CountSampler {
    pub fn new(fan_out: &FanOut) -> Self {
        match fan_out {
            FanOut::Fixed { count } => CountSampler::Fixed(*count),
            FanOut::Uniform { min, max } => CountSampler::Uniform {
                min: *min,
                max: *max,
            },
            FanOut::Poisson { mean } => CountSampler::Poisson(*mean),
            FanOut::Zipf { max, exponent } => {
                CountSampler::Zipf(ZipfTable::new(*max as usize, *exponent))
            }
        }
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> u64 {
        match self {
            CountSampler::Fixed(count) => *count,
            CountSampler::Uniform { min, max } => rng.random_range(*min..=*max),
            CountSampler::Poisson(mean) => poisson(*mean, rng),
            CountSampler::Zipf(table) => table.sample(rng) as u64 + 1,
        }
    }
}

/// Knuth's multiplication method, summed over chunks of the mean.
pub fn poisson<R: Rng + ?Sized>(mean: f64, rng: &mut R) -> u64 {
    let mut remaining = mean;
    let mut total = 0;
    while remaining > 0.0 {
        let step = remaining.min(POISSON_CHUNK);
        remaining -= step;

        let limit = (-step).exp();
        let mut product = rng.random::<f64>();
        while product > limit {
            total += 1;
            product *= rng.random::<f64>();
        }
    }
    total
}

pub fn random_text<R: Rng + ?Sized>(min_len: usize, max_len: usize, rng: &mut R) -> String {
    let len = if min_len == max_len {
        min_len
    } else {
        rng.random_range(min_len..=max_len)
    };
    (0..len)
        .map(|_| ALPHANUMERIC[rng.random_range(0..ALPHANUMERIC.len())] as char)
        .collect()
}

pub fn random_float<R: Rng + ?Sized>(min: f64, max: f64, rng: &mut R) -> f64 {
    if min == max {
        min
    } else {
        rng.random_range(min..=max)
    }
}
