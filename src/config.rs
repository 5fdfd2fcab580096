use std::collections::hash_map::RandomState;
use std::hash::{BuildHasher, Hash};

use crate::error::HashMapError;
use crate::map::HashMap;

pub const DEFAULT_INITIAL_BUCKETS: usize = 64;
pub const DEFAULT_MAX_LOAD_FACTOR: f64 = 0.75;
pub const DEFAULT_INCREASE_RATE: f64 = 2.0;

/// Builder for a [`HashMap`] with non-default bucket count, load factor, growth rate, or hasher.
///
/// ```
/// use scalemap::Config;
///
/// let map = Config::new()
///     .initial_buckets(128)
///     .max_load_factor(0.6)
///     .build::<String, u32>()
///     .unwrap();
/// assert!(map.is_empty());
/// ```
#[derive(Clone, Debug)]
pub struct Config<S = RandomState> {
    initial_buckets: usize,
    max_load_factor: f64,
    increase_rate: f64,
    hasher: S,
}

impl Default for Config<RandomState> {
    fn default() -> Self {
        Config {
            initial_buckets: DEFAULT_INITIAL_BUCKETS,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            increase_rate: DEFAULT_INCREASE_RATE,
            hasher: RandomState::new(),
        }
    }
}

impl Config<RandomState> {
    pub fn new() -> Self {
        Config::default()
    }
}

impl<S> Config<S> {
    pub fn initial_buckets(mut self, initial_buckets: usize) -> Self {
        self.initial_buckets = initial_buckets;
        self
    }

    pub fn max_load_factor(mut self, max_load_factor: f64) -> Self {
        self.max_load_factor = max_load_factor;
        self
    }

    pub fn increase_rate(mut self, increase_rate: f64) -> Self {
        self.increase_rate = increase_rate;
        self
    }

    pub fn hasher<S2>(self, hasher: S2) -> Config<S2> {
        Config {
            initial_buckets: self.initial_buckets,
            max_load_factor: self.max_load_factor,
            increase_rate: self.increase_rate,
            hasher,
        }
    }

    fn validate(&self) -> Result<(), HashMapError> {
        if self.initial_buckets == 0 {
            return Err(HashMapError::InvalidConfig {
                reason: "initial_buckets must be at least 1",
            });
        }
        if !(self.max_load_factor > 0.0 && self.max_load_factor <= 1.0) {
            return Err(HashMapError::InvalidConfig {
                reason: "max_load_factor must be in (0, 1]",
            });
        }
        if self.increase_rate <= 1.0 {
            return Err(HashMapError::InvalidConfig {
                reason: "increase_rate must be greater than 1",
            });
        }
        let grown = self.initial_buckets as f64 * self.increase_rate;
        if !grown.is_finite() || grown > usize::MAX as f64 {
            return Err(HashMapError::CapacityOverflow {
                requested: self.initial_buckets,
            });
        }
        Ok(())
    }

    pub fn build<K, V>(self) -> Result<HashMap<K, V, S>, HashMapError>
    where
        K: Eq + Hash + Clone,
        V: Clone,
        S: BuildHasher + Clone,
    {
        self.validate()?;
        HashMap::from_config(
            self.initial_buckets,
            self.max_load_factor,
            self.increase_rate,
            self.hasher,
        )
    }
}
