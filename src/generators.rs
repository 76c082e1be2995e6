//! Stateful synthetic-metric generators.
//!
//! Every generator is a read-modify-write on a single key of a shared
//! [`GeneratorStore`]. Keys are created lazily on first reference and are
//! seeded to the caller's start value; the first observation of a key never
//! applies a step.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use fnv::FnvHashMap;
use thiserror::Error;

/// Default step added by `increase`, `chance` and `increase_or_reset`.
pub const DEFAULT_STEP: f64 = 1.0;

/// Default seed value for keys seen for the first time.
pub const DEFAULT_START: f64 = 0.0;

/// Default hit probability for `chance`.
pub const DEFAULT_PROBABILITY: f64 = 0.01;

/// Default reset probability for `increase_or_reset`.
pub const DEFAULT_RESET_PROBABILITY: f64 = 0.05;

/// Errors raised by generator calls.
#[derive(Debug, Error, PartialEq)]
pub enum GeneratorError {
    /// Probability outside the open interval (0, 1).
    #[error("probability must be strictly between 0 and 1, got: {0}")]
    InvalidProbability(f64),
    /// Step that would make a counter decrease or stop being a number.
    #[error("step must be a finite non-negative number, got: {0}")]
    InvalidStep(f64),
}

fn check_step(step: f64) -> Result<(), GeneratorError> {
    if step.is_finite() && step >= 0.0 {
        Ok(())
    } else {
        Err(GeneratorError::InvalidStep(step))
    }
}

/// Source of uniform random draws in `[0, 1)`.
///
/// Injected into the store so tests can pin the draw.
pub trait RandomSource: Send + Sync {
    /// Draw a uniform sample in `[0, 1)`.
    fn sample(&self) -> f64;
}

/// Thread-local RNG backed random source.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn sample(&self) -> f64 {
        rand::random::<f64>()
    }
}

/// Random source that always returns the same draw.
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom(pub f64);

impl RandomSource for FixedRandom {
    fn sample(&self) -> f64 {
        self.0
    }
}

/// Process-wide store of running generator values.
///
/// One lock guards the whole map, and random draws are taken while it is held,
/// so concurrent scrapes never lose an update.
pub struct GeneratorStore {
    values: Mutex<FnvHashMap<String, f64>>,
    random: Arc<dyn RandomSource>,
}

impl Default for GeneratorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GeneratorStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratorStore").field("keys", &self.lock().len()).finish()
    }
}

impl GeneratorStore {
    /// Create an empty store drawing from the thread RNG.
    pub fn new() -> Self {
        Self::with_random(Arc::new(ThreadRandom))
    }

    /// Create an empty store with a custom random source.
    ///
    /// # Parameters
    ///
    /// - `random` - Source of uniform draws used by `chance` and `increase_or_reset`
    pub fn with_random(random: Arc<dyn RandomSource>) -> Self {
        Self { values: Mutex::new(FnvHashMap::default()), random }
    }

    fn lock(&self) -> MutexGuard<'_, FnvHashMap<String, f64>> {
        self.values.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current value of `key`, if it has been seen.
    pub fn get(&self, key: &str) -> Option<f64> {
        self.lock().get(key).copied()
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no key has been referenced yet.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Monotonic counter.
    ///
    /// Seeds an unseen key to `start` and returns it; otherwise adds `step`
    /// and returns the new value.
    ///
    /// # Errors
    ///
    /// Returns [`GeneratorError::InvalidStep`] if `step` is negative or not finite.
    pub fn increase(&self, key: &str, step: f64, start: f64) -> Result<f64, GeneratorError> {
        check_step(step)?;
        let mut values = self.lock();
        Ok(increase_locked(&mut values, key, step, start))
    }

    /// Force `key` to zero, creating it if needed.
    pub fn reset(&self, key: &str) -> f64 {
        self.lock().insert(key.to_string(), 0.0);
        0.0
    }

    /// Counter that increments by `step` only when a random draw falls below
    /// `probability`.
    ///
    /// # Errors
    ///
    /// Returns [`GeneratorError::InvalidProbability`] unless `0 < probability < 1`
    /// and [`GeneratorError::InvalidStep`] if `step` is negative or not finite.
    pub fn chance(
        &self,
        key: &str,
        probability: f64,
        step: f64,
        start: f64,
    ) -> Result<f64, GeneratorError> {
        if !(probability > 0.0 && probability < 1.0) {
            return Err(GeneratorError::InvalidProbability(probability));
        }
        check_step(step)?;

        let mut values = self.lock();
        let Some(current) = values.get_mut(key) else {
            values.insert(key.to_string(), start);
            return Ok(start);
        };
        if self.random.sample() < probability {
            *current += step;
        }
        Ok(*current)
    }

    /// Counter that occasionally drops back to zero.
    ///
    /// Seeds an unseen key to `start`. Afterwards, with `reset_probability`
    /// the value is reset to zero, otherwise it behaves like [`increase`](Self::increase).
    ///
    /// # Errors
    ///
    /// Returns [`GeneratorError::InvalidStep`] if `step` is negative or not finite.
    pub fn increase_or_reset(
        &self,
        key: &str,
        step: f64,
        start: f64,
        reset_probability: f64,
    ) -> Result<f64, GeneratorError> {
        check_step(step)?;
        let mut values = self.lock();
        if !values.contains_key(key) {
            values.insert(key.to_string(), start);
            return Ok(start);
        }
        if self.random.sample() < reset_probability {
            values.insert(key.to_string(), 0.0);
            return Ok(0.0);
        }
        Ok(increase_locked(&mut values, key, step, start))
    }
}

fn increase_locked(values: &mut FnvHashMap<String, f64>, key: &str, step: f64, start: f64) -> f64 {
    match values.get_mut(key) {
        Some(current) => {
            *current += step;
            *current
        }
        None => {
            values.insert(key.to_string(), start);
            start
        }
    }
}
