//! Random draws and numeric helpers shared by both engines.

use rand::Rng;
use rand_distr::{Distribution, Triangular};
use serde::{Deserialize, Serialize};

/// Multiplies a probability of success by `multiplier`, saturating at 1.0.
///
/// Multipliers at or below 1 only ever shrink the value; larger multipliers
/// are clamped so the result stays a probability.
///
/// # Examples
///
/// ```
/// use vaccine_sim::sim::sampling::multiply_pos;
///
/// assert_eq!(multiply_pos(0.5, 0.5), 0.25);
/// assert_eq!(multiply_pos(0.8, 2.0), 1.0);
/// ```
pub fn multiply_pos(pos: f64, multiplier: f64) -> f64 {
    let product = pos * multiplier;
    if multiplier <= 1.0 || product < 1.0 {
        product.max(0.0)
    } else {
        1.0
    }
}

/// Rounds half away from zero for non-negative month values.
pub fn round_months(value: f64) -> i32 {
    (value + 0.5).floor() as i32
}

/// Draws one value from the asymmetric triangle `low ..= high` peaking at `mode`.
///
/// Degenerate triangles (zero width or inconsistent ordering) return `mode`
/// without consuming randomness.
pub fn triangular<R: Rng + ?Sized>(rng: &mut R, low: f64, mode: f64, high: f64) -> f64 {
    if high <= low {
        return mode;
    }
    match Triangular::new(low, high, mode) {
        Ok(dist) => dist.sample(rng),
        Err(_) => mode,
    }
}

/// Mean of the triangle, used by the deterministic cross check.
pub fn triangular_mean(low: f64, mode: f64, high: f64) -> f64 {
    if high <= low {
        mode
    } else {
        (low + mode + high) / 3.0
    }
}

/// Triangular distribution parameters as they appear in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Triangle {
    pub low: f64,
    pub mode: f64,
    pub high: f64,
}

impl Triangle {
    pub const fn new(low: f64, mode: f64, high: f64) -> Self {
        Self { low, mode, high }
    }

    /// A triangle that always yields `value`.
    pub const fn fixed(value: f64) -> Self {
        Self::new(value, value, value)
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        triangular(rng, self.low, self.mode, self.high)
    }

    pub fn is_ordered(&self) -> bool {
        self.low <= self.mode && self.mode <= self.high
    }

    /// Returns a copy with every corner multiplied by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.low * factor, self.mode * factor, self.high * factor)
    }
}
