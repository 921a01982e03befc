//! Base-interval progressions used by tickers.
//!
//! A [`Backoff`] maps the 1-based tick number to the interval that precedes the next attempt,
//! before jitter is added:
//! - constant: `units` every time
//! - linear: `units * n`
//! - exponential: `units * 2^(n-1)`
//!
//! Tick `0` never occurs in a session (the first attempt runs immediately) and yields zero.
//! Growing strategies honour an optional cap and saturate at [`MAX_BACKOFF`] instead of
//! overflowing.
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use stubborn::Backoff;
//!
//! let backoff = Backoff::exponential(Duration::from_millis(100))
//!     .with_max(Duration::from_secs(2))
//!     .unwrap();
//! assert_eq!(backoff.interval(1), Duration::from_millis(100));
//! assert_eq!(backoff.interval(2), Duration::from_millis(200));
//! assert_eq!(backoff.interval(6), Duration::from_secs(2)); // capped
//! ```

use crate::options::{ConfigError, Options};
use std::time::Duration;

/// Maximum interval used when calculations overflow (1 day).
pub const MAX_BACKOFF: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Progression {
    Constant,
    Linear,
    Exponential,
}

/// Interval progression with an optional cap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
    progression: Progression,
    units: Duration,
    max: Option<Duration>,
}

impl Backoff {
    /// Same interval for every tick.
    pub fn constant(units: Duration) -> Self {
        Self { progression: Progression::Constant, units, max: None }
    }

    /// Interval grows by `units` each tick.
    pub fn linear(units: Duration) -> Self {
        Self { progression: Progression::Linear, units, max: None }
    }

    /// Interval doubles each tick.
    pub fn exponential(units: Duration) -> Self {
        Self { progression: Progression::Exponential, units, max: None }
    }

    /// Cap the interval. Rejected when `max` is below the base interval.
    ///
    /// A cap on a constant progression is accepted and has no effect.
    pub fn with_max(mut self, max: Duration) -> Result<Self, ConfigError> {
        if max < self.units {
            return Err(ConfigError::MaxIntervalBelowUnits { units: self.units, max });
        }
        self.max = Some(max);
        Ok(self)
    }

    /// Apply the cap carried by `options`, if any.
    pub(crate) fn capped_by(self, options: &Options) -> Result<Self, ConfigError> {
        match options.max_interval() {
            Some(max) => self.with_max(max),
            None => Ok(self),
        }
    }

    /// Interval preceding the attempt that follows tick `tick` (1-based).
    pub fn interval(&self, tick: usize) -> Duration {
        if tick == 0 {
            return Duration::ZERO;
        }
        let raw = match self.progression {
            Progression::Constant => self.units,
            Progression::Linear => {
                let n = tick.min(u32::MAX as usize) as u32; // clamp to prevent truncation
                self.units.checked_mul(n).unwrap_or(MAX_BACKOFF)
            }
            Progression::Exponential => {
                let exponent = (tick - 1).min(u32::MAX as usize) as u32;
                let multiplier = 2u128.saturating_pow(exponent);
                let nanos = self.units.as_nanos().saturating_mul(multiplier);
                Duration::from_nanos(nanos.min(MAX_BACKOFF.as_nanos()) as u64)
            }
        };
        let capped = self.max.map_or(raw, |m| raw.min(m));
        match self.progression {
            Progression::Constant => capped,
            _ => capped.min(MAX_BACKOFF),
        }
    }
}
