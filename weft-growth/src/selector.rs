//! Weighted index selection.
//!
//! Turns a vector of non-negative weights into one chosen index by
//! inverse-CDF sampling. The `Selector` trait is the injection point the
//! generator uses, so tests can swap in deterministic choices.

use crate::error::SelectError;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Picks one index out of a weight vector.
pub trait Selector: Send + Sync {
    fn select(&self, weights: &[f64]) -> Result<usize, SelectError>;
}

impl<F> Selector for F
where
    F: Fn(&[f64]) -> Result<usize, SelectError> + Send + Sync,
{
    fn select(&self, weights: &[f64]) -> Result<usize, SelectError> {
        self(weights)
    }
}

/// Draws a value in `[0, sum)` and returns the first index whose
/// cumulative weight exceeds it.
pub fn select_by_probability<R>(weights: &[f64], rng: &mut R) -> Result<usize, SelectError>
where
    R: Rng,
{
    if weights.is_empty() {
        return Err(SelectError::EmptyInput);
    }

    let mut sum = 0.0;
    for (index, &value) in weights.iter().enumerate() {
        if !value.is_finite() || value < 0.0 {
            return Err(SelectError::InvalidWeight { index, value });
        }
        sum += value;
    }

    if sum == 0.0 {
        return Err(SelectError::ZeroMass);
    }

    let draw = rng.random::<f64>() * sum;

    let mut cumulative = 0.0;
    for (index, &value) in weights.iter().enumerate() {
        cumulative += value;
        if draw < cumulative {
            return Ok(index);
        }
    }

    // Rounding can leave the draw at the very top of the range.
    weights
        .iter()
        .rposition(|&value| value > 0.0)
        .ok_or(SelectError::ZeroMass)
}

/// `Selector` backed by a seedable random generator.
pub struct RandomSelector {
    rng: Mutex<StdRng>,
}

impl RandomSelector {
    /// Seeds from the operating system.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Deterministic selector for reproducible graphs.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for RandomSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl Selector for RandomSelector {
    fn select(&self, weights: &[f64]) -> Result<usize, SelectError> {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        select_by_probability(weights, &mut *rng)
    }
}
