//! Additive jitter to prevent synchronized retry storms
//!
//! A [`Jitter`] adds a uniformly distributed delay in `[0, bound)` to every tick. A zero bound
//! contributes exactly zero, keeping ticks deterministic.
//!
//! Notes:
//! - RNG: the caller supplies the generator; tickers own a `StdRng` so the source is explicit and
//!   can be seeded for reproducible tests.
//! - Precision: sampling is done in nanoseconds; bounds above `u64::MAX` nanoseconds saturate.
//!
//! Example
//! ```rust
//! use rand::{rngs::StdRng, SeedableRng};
//! use std::time::Duration;
//! use stubborn::Jitter;
//!
//! let jitter = Jitter::up_to(Duration::from_millis(50));
//! let mut rng = StdRng::seed_from_u64(7);
//! assert!(jitter.sample(&mut rng) < Duration::from_millis(50));
//! assert_eq!(Jitter::none().sample(&mut rng), Duration::ZERO);
//! ```

use rand::Rng;
use std::time::Duration;

/// Upper-bounded random delay added to each tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Jitter {
    bound: Duration,
}

impl Jitter {
    /// No jitter.
    pub fn none() -> Self {
        Self { bound: Duration::ZERO }
    }

    /// Uniform jitter in `[0, bound)`.
    pub fn up_to(bound: Duration) -> Self {
        Self { bound }
    }

    /// Exclusive upper bound.
    pub fn bound(&self) -> Duration {
        self.bound
    }

    fn as_nanos_saturated(duration: Duration) -> u64 {
        duration.as_nanos().try_into().unwrap_or(u64::MAX)
    }

    /// Draw one jitter value from `rng`.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> Duration {
        let nanos = Self::as_nanos_saturated(self.bound);
        if nanos == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(rng.random_range(0..nanos))
    }

    /// Add one jitter sample to `delay`, saturating on overflow.
    pub fn apply<R: Rng>(&self, delay: Duration, rng: &mut R) -> Duration {
        delay.saturating_add(self.sample(rng))
    }
}
