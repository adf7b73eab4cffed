//! Streaming named-counter statistics.
//!
//! Observations are recorded under a structured key with [`StatAccumulator::add`];
//! queries never fail and return `0.0` when no data is available, so
//! downstream aggregation stays well-defined even for events that never
//! occurred in any trial.

use std::collections::HashMap;
use std::hash::Hash;

/// Running sums for one key.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Sums {
    pub n: u64,
    pub sum: f64,
    pub sum_sq: f64,
}

impl Sums {
    fn add(&mut self, x: f64) {
        self.n += 1;
        self.sum += x;
        self.sum_sq += x * x;
    }

    fn merge(&mut self, other: &Sums) {
        self.n += other.n;
        self.sum += other.sum;
        self.sum_sq += other.sum_sq;
    }
}

/// Accumulates count, sum and sum of squares per key.
///
/// One accumulator is constructed per run (or per trial, then merged); there
/// is no global state.
///
/// # Examples
///
/// ```
/// use vaccine_sim::stats::StatAccumulator;
///
/// let mut acc = StatAccumulator::new();
/// acc.add("length", 2.0);
/// acc.add("length", 4.0);
/// assert_eq!(acc.mean(&"length"), 3.0);
/// assert_eq!(acc.efficiency(&"length", 4), 0.5);
/// assert_eq!(acc.efficiency(&"missing", 0), 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct StatAccumulator<K> {
    sums: HashMap<K, Sums>,
}

impl<K: Eq + Hash> Default for StatAccumulator<K> {
    fn default() -> Self {
        Self {
            sums: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> StatAccumulator<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one observation `x` under `key`.
    pub fn add(&mut self, key: K, x: f64) {
        self.sums.entry(key).or_default().add(x);
    }

    /// Folds another accumulator into this one.
    pub fn merge(&mut self, other: &StatAccumulator<K>) {
        for (key, sums) in &other.sums {
            self.sums.entry(key.clone()).or_default().merge(sums);
        }
    }

    /// Raw sums for `key`, if any observation was recorded.
    pub fn sums(&self, key: &K) -> Option<&Sums> {
        self.sums.get(key)
    }

    /// Number of observations recorded under `key`.
    pub fn count(&self, key: &K) -> u64 {
        self.sums.get(key).map_or(0, |s| s.n)
    }

    /// Poisson error on the count, `sqrt(n)`.
    pub fn count_error(&self, key: &K) -> f64 {
        (self.count(key) as f64).sqrt()
    }

    /// Mean of the observations, `0.0` when there are none.
    pub fn mean(&self, key: &K) -> f64 {
        match self.sums.get(key) {
            Some(s) if s.n > 0 => s.sum / s.n as f64,
            _ => 0.0,
        }
    }

    /// Sample standard deviation, `0.0` with fewer than two observations.
    pub fn stddev(&self, key: &K) -> f64 {
        let Some(s) = self.sums.get(key) else {
            return 0.0;
        };
        if s.n < 2 {
            return 0.0;
        }
        let n = s.n as f64;
        let var = (n * s.sum_sq - s.sum * s.sum) / (n * (n - 1.0));
        var.max(0.0).sqrt()
    }

    /// Fraction of `total` trials in which `key` was observed.
    pub fn efficiency(&self, key: &K, total: u64) -> f64 {
        if total == 0 {
            return 0.0;
        }
        self.count(key) as f64 / total as f64
    }

    /// Error on [`efficiency`](Self::efficiency), see [`binomial_error`].
    pub fn efficiency_error(&self, key: &K, total: u64) -> f64 {
        binomial_error(self.count(key), total)
    }

    /// Iterates over every recorded key.
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.sums.keys()
    }

    pub fn is_empty(&self) -> bool {
        self.sums.is_empty()
    }
}

/// Error on the ratio `n / total` from asymmetric Poisson limits.
///
/// With `e = n / (n + r)`, the error combines `de/dn * dn` and
/// `de/dr * dr`, taking the upper limit for the smaller of `n` and `r`
/// and the lower limit for the larger. Returns `0.0` when `total` is zero.
pub fn binomial_error(n: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let n = n.min(total);
    let r = total - n;
    let (dn, dr) = if 2 * n <= total {
        (poisson_upper(n as f64), poisson_lower(r as f64))
    } else {
        (poisson_lower(n as f64), poisson_upper(r as f64))
    };
    let (n, r, t) = (n as f64, r as f64, total as f64);
    (((r * dn).powi(2) + (n * dr).powi(2)) / t.powi(4)).sqrt()
}

/// One-sigma upper Poisson confidence offset (Gehrels 1986).
pub fn poisson_upper(n: f64) -> f64 {
    (n + 0.75).sqrt() + 1.0
}

/// One-sigma lower Poisson confidence offset (Gehrels 1986).
pub fn poisson_lower(n: f64) -> f64 {
    if n <= 0.0 {
        return 0.0;
    }
    n - n * (1.0 - 1.0 / (9.0 * n) - 1.0 / (3.0 * n.sqrt())).powi(3)
}

/// Linear-interpolated percentile of `values` (`q` in `0.0..=1.0`).
///
/// Returns `0.0` for an empty slice. The slice is sorted in place.
pub fn percentile(values: &mut [f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(f64::total_cmp);
    let rank = q.clamp(0.0, 1.0) * (values.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    values[lo] + (values[hi] - values[lo]) * frac
}
