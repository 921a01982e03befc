//! Session configuration
//!
//! `Options` holds the knobs shared by tickers and the retry loop:
//! - `units`: base tick interval (default 1s).
//! - `jitter`: upper bound of the random delay added to every tick (default 0, exclusive bound).
//! - `attempt_timeout`: per-attempt deadline; zero disables it (default).
//! - `log_errors`: log each distinct expected error the first time it is seen (default off).
//! - `max_interval`: optional cap for the growing (linear/exponential) strategies.
//!
//! Values are validated by [`OptionsBuilder::build`]; options obtained any other way (for
//! instance deserialized with the `serde` feature) can be checked with [`Options::validate`].
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use stubborn::Options;
//!
//! let options = Options::builder()
//!     .units(Duration::from_millis(250))
//!     .jitter(Duration::from_millis(50))
//!     .attempt_timeout(Duration::from_secs(2))
//!     .log_errors(true)
//!     .build()
//!     .unwrap();
//! assert_eq!(options.units(), Duration::from_millis(250));
//! ```

use std::time::Duration;

/// Default base tick interval.
pub const DEFAULT_UNITS: Duration = Duration::from_secs(1);

/// Errors produced while validating configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// The base tick interval must be non-zero.
    #[error("units must be greater than zero")]
    ZeroUnits,
    /// The interval cap must be at least the base interval.
    #[error("max_interval ({max:?}) must be >= units ({units:?})")]
    MaxIntervalBelowUnits { units: Duration, max: Duration },
    /// The session deadline must be non-zero.
    #[error("session timeout must be greater than zero")]
    ZeroTimeout,
}

/// Read-only configuration for one retry session.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Options {
    units: Duration,
    jitter: Duration,
    attempt_timeout: Duration,
    log_errors: bool,
    max_interval: Option<Duration>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            units: DEFAULT_UNITS,
            jitter: Duration::ZERO,
            attempt_timeout: Duration::ZERO,
            log_errors: false,
            max_interval: None,
        }
    }
}

impl Options {
    /// Start a builder seeded with the defaults.
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::new()
    }

    /// Base tick interval.
    pub fn units(&self) -> Duration {
        self.units
    }

    /// Exclusive upper bound of the per-tick jitter.
    pub fn jitter(&self) -> Duration {
        self.jitter
    }

    /// Per-attempt deadline, if any.
    pub fn attempt_timeout(&self) -> Option<Duration> {
        (!self.attempt_timeout.is_zero()).then_some(self.attempt_timeout)
    }

    pub fn log_errors(&self) -> bool {
        self.log_errors
    }

    pub fn max_interval(&self) -> Option<Duration> {
        self.max_interval
    }

    /// Check invariants that the builder enforces.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.units.is_zero() {
            return Err(ConfigError::ZeroUnits);
        }
        if let Some(max) = self.max_interval {
            if max < self.units {
                return Err(ConfigError::MaxIntervalBelowUnits { units: self.units, max });
            }
        }
        Ok(())
    }
}

/// Builder for [`Options`].
#[derive(Debug, Clone, Default)]
pub struct OptionsBuilder {
    options: Options,
}

impl OptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the base tick interval. Must be > 0.
    pub fn units(mut self, units: Duration) -> Self {
        self.options.units = units;
        self
    }

    /// Set the jitter bound; zero disables jitter.
    pub fn jitter(mut self, jitter: Duration) -> Self {
        self.options.jitter = jitter;
        self
    }

    /// Set the per-attempt deadline; zero disables it.
    pub fn attempt_timeout(mut self, timeout: Duration) -> Self {
        self.options.attempt_timeout = timeout;
        self
    }

    /// Log each distinct expected error when it first occurs.
    pub fn log_errors(mut self, enable: bool) -> Self {
        self.options.log_errors = enable;
        self
    }

    /// Cap the interval produced by growing strategies. Must be >= units.
    pub fn max_interval(mut self, max: Duration) -> Self {
        self.options.max_interval = Some(max);
        self
    }

    /// Build the options, validating inputs.
    pub fn build(self) -> Result<Options, ConfigError> {
        self.options.validate()?;
        Ok(self.options)
    }
}
