//! Tuning knobs for [`Map`](crate::Map).

/// Load factors deciding when a map rebuilds its bucket vector.
///
/// A map grows when storing a new item would bring the average number of
/// items per bucket above the upper load factor, and shrinks when a deletion
/// brings it below the lower one. Rebuilt bucket vectors are sized so that
/// the average lands as close to [`Config::initial_load_factor`] as both
/// bounds allow.
///
/// The only ways to get a `Config` are [`Config::default`] and
/// [`Config::new`], so the factors are always valid.
///
/// ```compile_fail
/// let config = peds::Config {
///     upper_load_factor: 0.0,
///     lower_load_factor: 0.0,
/// };
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    upper_load_factor: f64,
    lower_load_factor: f64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            upper_load_factor: 8.0,
            lower_load_factor: 2.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("load factors must be finite and positive (got upper {upper}, lower {lower})")]
    NotPositive { upper: f64, lower: f64 },
    #[error("upper load factor {upper} must be at least twice the lower load factor {lower}")]
    TooClose { upper: f64, lower: f64 },
}

impl Config {
    /// Checks and builds a configuration.
    ///
    /// Both factors must be finite and positive, and `upper_load_factor` must
    /// be at least twice `lower_load_factor`. With closer factors, some item
    /// counts have no bucket count that satisfies both bounds.
    ///
    /// # Examples
    ///
    /// ```rust
    /// # use peds::{Config, ConfigError};
    /// assert!(Config::new(4.0, 2.0).is_ok());
    /// assert_eq!(
    ///     Config::new(5.0, 4.0),
    ///     Err(ConfigError::TooClose { upper: 5.0, lower: 4.0 })
    /// );
    /// ```
    pub fn new(upper_load_factor: f64, lower_load_factor: f64) -> Result<Self, ConfigError> {
        let (upper, lower) = (upper_load_factor, lower_load_factor);
        if !(upper.is_finite() && lower.is_finite() && upper > 0.0 && lower > 0.0) {
            return Err(ConfigError::NotPositive { upper, lower });
        }
        if upper < 2.0 * lower {
            return Err(ConfigError::TooClose { upper, lower });
        }
        Ok(Config {
            upper_load_factor,
            lower_load_factor,
        })
    }

    pub fn upper_load_factor(&self) -> f64 {
        self.upper_load_factor
    }

    pub fn lower_load_factor(&self) -> f64 {
        self.lower_load_factor
    }

    /// The average bucket size targeted when sizing a fresh bucket vector.
    pub fn initial_load_factor(&self) -> f64 {
        (self.upper_load_factor + self.lower_load_factor) / 2.0
    }

    /// How many buckets to allocate for `item_count` items.
    ///
    /// This is `floor(item_count / initial) + 1`, clamped so that the result
    /// needs neither growing nor shrinking.
    pub(crate) fn bucket_count(&self, item_count: usize) -> usize {
        let n = item_count as f64;
        let target = (n / self.initial_load_factor()) as usize + 1;
        let fewest = ((n / self.upper_load_factor).ceil() as usize).max(1);
        let most = ((n / self.lower_load_factor) as usize).max(1);
        target.clamp(fewest, most.max(fewest))
    }

    pub(crate) fn needs_grow(&self, item_count: usize, bucket_count: usize) -> bool {
        item_count as f64 > bucket_count as f64 * self.upper_load_factor
    }

    pub(crate) fn needs_shrink(&self, item_count: usize, bucket_count: usize) -> bool {
        bucket_count > 1 && (item_count as f64) < bucket_count as f64 * self.lower_load_factor
    }
}
