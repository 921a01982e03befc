//! Delay strategies for the retry loop
//!
//! A [`Ticker`] hands out the interval to wait between attempts and carries a stop signal that
//! ends a waiting session cleanly. The loop never looks past this contract, so any strategy
//! honouring it can be plugged in.
//!
//! [`IntervalTicker`] is the built-in implementation: a [`Backoff`] progression plus additive
//! [`Jitter`], driven by an RNG owned by the ticker.
//!
//! Stopping:
//! - `stop` cancels a [`CancellationToken`]; it never blocks and may be called any number of
//!   times, before, during, or after a session.
//! - A stopped ticker stays stopped; build a new one for the next session.
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use stubborn::{IntervalTicker, Options, Ticker};
//!
//! let options = Options::builder().units(Duration::from_millis(100)).build().unwrap();
//! let mut ticker = IntervalTicker::constant(&options);
//! assert_eq!(ticker.tick(), Duration::from_millis(100));
//! ticker.stop();
//! assert!(ticker.stop_signal().is_cancelled());
//! ```

use crate::backoff::Backoff;
use crate::jitter::Jitter;
use crate::options::{ConfigError, Options};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio_util::sync::CancellationToken;

/// Source of inter-attempt delays and of the cooperative stop signal.
pub trait Ticker: Send + std::fmt::Debug {
    /// Interval to wait before the next attempt.
    fn tick(&mut self) -> Duration;

    /// Token cancelled once [`Ticker::stop`] is called.
    fn stop_signal(&self) -> CancellationToken;

    /// Ask a waiting session to give up without error.
    fn stop(&self) {
        self.stop_signal().cancel();
    }
}

impl<T: Ticker + ?Sized> Ticker for Box<T> {
    fn tick(&mut self) -> Duration {
        (**self).tick()
    }

    fn stop_signal(&self) -> CancellationToken {
        (**self).stop_signal()
    }

    fn stop(&self) {
        (**self).stop()
    }
}

/// Delay progression kinds offered by [`IntervalTicker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// `units` every tick.
    #[default]
    Constant,
    /// `units * n`.
    Linear,
    /// `units * 2^(n-1)`.
    Exponential,
}

pub(crate) fn backoff_for(strategy: Strategy, options: &Options) -> Result<Backoff, ConfigError> {
    match strategy {
        Strategy::Constant => Backoff::constant(options.units()),
        Strategy::Linear => Backoff::linear(options.units()),
        Strategy::Exponential => Backoff::exponential(options.units()),
    }
    .capped_by(options)
}

/// Ticker built from a backoff progression and bounded jitter.
#[derive(Debug)]
pub struct IntervalTicker {
    backoff: Backoff,
    jitter: Jitter,
    rng: StdRng,
    ticks: usize,
    stop: CancellationToken,
}

fn wall_clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default()
}

impl IntervalTicker {
    /// Ticker with an explicit progression and jitter, seeded from the wall clock.
    pub fn new(backoff: Backoff, jitter: Jitter) -> Self {
        Self::with_seed(backoff, jitter, wall_clock_seed())
    }

    /// Ticker whose jitter sequence is reproducible.
    pub fn with_seed(backoff: Backoff, jitter: Jitter, seed: u64) -> Self {
        Self {
            backoff,
            jitter,
            rng: StdRng::seed_from_u64(seed),
            ticks: 0,
            stop: CancellationToken::new(),
        }
    }

    /// `units + jitter` on every tick.
    pub fn constant(options: &Options) -> Self {
        Self::new(Backoff::constant(options.units()), Jitter::up_to(options.jitter()))
    }

    /// `units * n + jitter`, capped by `max_interval`.
    pub fn linear(options: &Options) -> Result<Self, ConfigError> {
        Self::for_strategy(Strategy::Linear, options)
    }

    /// `units * 2^(n-1) + jitter`, capped by `max_interval`.
    pub fn exponential(options: &Options) -> Result<Self, ConfigError> {
        Self::for_strategy(Strategy::Exponential, options)
    }

    /// Build the ticker for `strategy` from `options`.
    pub fn for_strategy(strategy: Strategy, options: &Options) -> Result<Self, ConfigError> {
        let backoff = backoff_for(strategy, options)?;
        Ok(Self::new(backoff, Jitter::up_to(options.jitter())))
    }

    /// Replace the RNG seed, restarting the jitter sequence.
    pub fn seeded(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    /// Number of ticks handed out so far.
    pub fn ticks(&self) -> usize {
        self.ticks
    }
}

impl Ticker for IntervalTicker {
    fn tick(&mut self) -> Duration {
        self.ticks = self.ticks.saturating_add(1);
        let base = self.backoff.interval(self.ticks);
        self.jitter.apply(base, &mut self.rng)
    }

    fn stop_signal(&self) -> CancellationToken {
        self.stop.clone()
    }
}
