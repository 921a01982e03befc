//! Retry session implementation
//!
//! A session re-invokes an async operation until it succeeds, fails fatally, the session
//! deadline elapses, or the ticker is stopped.
//!
//! Semantics:
//! - `Ok(())` from the operation ends the session with `Ok(())`, whatever failed before.
//! - Every failure is appended to the session's [`ErrorSet`] (deduplicated by message).
//! - Only [`Failure::Expected`] continues the session; `Unexpected` and plain (`Unclassified`)
//!   failures end it immediately with the set as the error.
//! - Between attempts the loop waits for the first of: the session deadline (appends
//!   [`Failure::Timeout`] and fails), the ticker's stop signal (returns `Ok(())`), or the next
//!   tick.
//! - Each attempt receives a child of the caller's [`CancellationToken`]. With an attempt
//!   timeout configured, the child is cancelled once the timeout elapses; the loop keeps waiting
//!   for the operation to return, it never preempts it. A plain failure from an attempt that ran
//!   out of time is retried as an expected one.
//!
//! Invariants:
//! - Attempts are strictly sequential.
//! - The deadline is only observed while waiting between attempts.
//!
//! Example
//! ```rust
//! use std::time::Duration;
//! use stubborn::{Failure, Options, Retryer};
//!
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! let options = Options::builder().units(Duration::from_millis(10)).build().unwrap();
//! let retryer = Retryer::constant(Duration::from_millis(50), options).unwrap();
//!
//! let result = retryer.retry(|| async { Err::<(), _>(Failure::expected("busy")) }).await;
//! let errors = result.unwrap_err();
//! assert!(errors.is_timeout());
//! assert_eq!(errors.to_string(), "2 error(s) occurred:\n\tbusy\n\ttimeout");
//! # });
//! ```

use crate::backoff::Backoff;
use crate::error::Failure;
use crate::error_set::ErrorSet;
use crate::jitter::Jitter;
use crate::options::{ConfigError, Options};
use crate::sleeper::{Sleeper, TokioSleeper};
use crate::ticker::{backoff_for, IntervalTicker, Strategy, Ticker};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Retry `operation` until it succeeds, fails fatally, `timeout` elapses, or `ticker` stops.
pub async fn retry<T, Op, Fut>(
    operation: Op,
    timeout: Duration,
    ticker: &mut T,
    options: &Options,
) -> Result<(), ErrorSet>
where
    T: Ticker + ?Sized,
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<(), Failure>>,
{
    let mut operation = operation;
    retry_with_cancel(&CancellationToken::new(), move |_| operation(), timeout, ticker, options)
        .await
}

/// Like [`retry`], handing each attempt a child of `cancel`.
pub async fn retry_with_cancel<T, Op, Fut>(
    cancel: &CancellationToken,
    operation: Op,
    timeout: Duration,
    ticker: &mut T,
    options: &Options,
) -> Result<(), ErrorSet>
where
    T: Ticker + ?Sized,
    Op: FnMut(CancellationToken) -> Fut,
    Fut: Future<Output = Result<(), Failure>>,
{
    run_session(cancel, operation, timeout, ticker, options, &TokioSleeper).await
}

async fn run_session<T, Op, Fut>(
    cancel: &CancellationToken,
    mut operation: Op,
    timeout: Duration,
    ticker: &mut T,
    options: &Options,
    sleeper: &dyn Sleeper,
) -> Result<(), ErrorSet>
where
    T: Ticker + ?Sized,
    Op: FnMut(CancellationToken) -> Fut,
    Fut: Future<Output = Result<(), Failure>>,
{
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);
    let stop = ticker.stop_signal();
    let errors = ErrorSet::new();
    let mut attempt: usize = 0;

    loop {
        attempt += 1;
        let failure =
            match run_attempt(cancel, &mut operation, options.attempt_timeout()).await {
                Ok(()) => {
                    debug!(attempt, "operation succeeded");
                    return Ok(());
                }
                Err(failure) => failure,
            };

        if !failure.is_expected() {
            debug!(attempt, error = %failure, "operation failed with a fatal error");
            errors.append(failure);
            return Err(errors);
        }

        let message = options.log_errors().then(|| failure.to_string());
        let seen = errors.append(failure);
        if let (false, Some(message)) = (seen, message) {
            info!(attempt, error = %message, "retrying error");
        }

        tokio::select! {
            biased;
            _ = &mut deadline => {
                debug!(attempt, ?timeout, "session deadline elapsed");
                errors.append(Failure::Timeout);
                return Err(errors);
            }
            _ = stop.cancelled() => {
                debug!(attempt, "ticker stopped; ending session");
                return Ok(());
            }
            _ = sleeper.sleep(ticker.tick()) => {}
        }
    }
}

async fn run_attempt<Op, Fut>(
    parent: &CancellationToken,
    operation: &mut Op,
    attempt_timeout: Option<Duration>,
) -> Result<(), Failure>
where
    Op: FnMut(CancellationToken) -> Fut,
    Fut: Future<Output = Result<(), Failure>>,
{
    let token = parent.child_token();
    let _release = token.clone().drop_guard();
    let attempt = operation(token.clone());

    let Some(limit) = attempt_timeout else {
        return attempt.await;
    };

    tokio::pin!(attempt);
    match tokio::time::timeout(limit, &mut attempt).await {
        Ok(result) => result,
        Err(_) => {
            debug!(?limit, "attempt timeout elapsed; canceling attempt");
            token.cancel();
            attempt.await.map_err(Failure::promote_unclassified)
        }
    }
}

/// Reusable retry configuration: session timeout, strategy, and options.
///
/// Each call builds a fresh [`IntervalTicker`], so sessions never share RNG or stop state.
#[derive(Debug, Clone)]
pub struct Retryer {
    timeout: Duration,
    strategy: Strategy,
    options: Options,
    backoff: Backoff,
    sleeper: Arc<dyn Sleeper>,
}

impl Retryer {
    /// Build a retryer, validating `timeout` and `options`.
    pub fn new(strategy: Strategy, timeout: Duration, options: Options) -> Result<Self, ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::ZeroTimeout);
        }
        options.validate()?;
        let backoff = backoff_for(strategy, &options)?;
        Ok(Self { timeout, strategy, options, backoff, sleeper: Arc::new(TokioSleeper) })
    }

    /// Constant interval between attempts.
    pub fn constant(timeout: Duration, options: Options) -> Result<Self, ConfigError> {
        Self::new(Strategy::Constant, timeout, options)
    }

    /// Linearly growing interval between attempts.
    pub fn linear(timeout: Duration, options: Options) -> Result<Self, ConfigError> {
        Self::new(Strategy::Linear, timeout, options)
    }

    /// Exponentially growing interval between attempts.
    pub fn exponential(timeout: Duration, options: Options) -> Result<Self, ConfigError> {
        Self::new(Strategy::Exponential, timeout, options)
    }

    /// Provide a custom sleeper for the waits between attempts.
    pub fn with_sleeper<S>(mut self, sleeper: S) -> Self
    where
        S: Sleeper + 'static,
    {
        self.sleeper = Arc::new(sleeper);
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Fresh ticker for one session.
    pub fn ticker(&self) -> IntervalTicker {
        IntervalTicker::new(self.backoff.clone(), Jitter::up_to(self.options.jitter()))
    }

    /// Run a session with a never-cancelled token.
    pub async fn retry<Op, Fut>(&self, operation: Op) -> Result<(), ErrorSet>
    where
        Op: FnMut() -> Fut,
        Fut: Future<Output = Result<(), Failure>>,
    {
        let mut operation = operation;
        self.retry_with_cancel(&CancellationToken::new(), move |_| operation()).await
    }

    /// Run a session whose attempts observe children of `cancel`.
    pub async fn retry_with_cancel<Op, Fut>(
        &self,
        cancel: &CancellationToken,
        operation: Op,
    ) -> Result<(), ErrorSet>
    where
        Op: FnMut(CancellationToken) -> Fut,
        Fut: Future<Output = Result<(), Failure>>,
    {
        let mut ticker = self.ticker();
        run_session(cancel, operation, self.timeout, &mut ticker, &self.options, &*self.sleeper)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Canceled;
    use crate::sleeper::{InstantSleeper, TrackingSleeper};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_options() -> Options {
        Options::builder().units(Duration::from_millis(10)).build().expect("options")
    }

    async fn always_expected() -> Result<(), Failure> {
        Err(Failure::expected("test"))
    }

    async fn always_plain() -> Result<(), Failure> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "test").into())
    }

    async fn always_ok() -> Result<(), Failure> {
        Ok(())
    }

    async fn fail_until(counter: Arc<AtomicUsize>, succeed_on: usize) -> Result<(), Failure> {
        let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt >= succeed_on {
            Ok(())
        } else {
            Err(Failure::expected(format!("attempt {}", attempt)))
        }
    }

    async fn observe_cancel(token: CancellationToken) -> Result<(), Failure> {
        if token.is_cancelled() {
            return Err(Canceled.into());
        }
        Ok(())
    }

    async fn wait_unless_second(
        token: CancellationToken,
        counter: Arc<AtomicUsize>,
    ) -> Result<(), Failure> {
        if counter.fetch_add(1, Ordering::SeqCst) + 1 == 2 {
            return Ok(());
        }
        token.cancelled().await;
        Err(Canceled.into())
    }

    #[tokio::test(start_paused = true)]
    async fn expected_errors_collapse_then_time_out() {
        let options = Options::default();
        let mut ticker = IntervalTicker::constant(&options);

        let err = retry(always_expected, Duration::from_secs(2), &mut ticker, &options)
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "2 error(s) occurred:\n\ttest\n\ttimeout");
        assert!(err.is_timeout());
        assert_eq!(ticker.ticks(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn plain_error_is_fatal() {
        let options = Options::default();
        let mut ticker = IntervalTicker::constant(&options);

        let err =
            retry(always_plain, Duration::from_secs(2), &mut ticker, &options).await.unwrap_err();

        assert_eq!(err.to_string(), "1 error(s) occurred:\n\ttest");
        assert_eq!(ticker.ticks(), 0, "no wait after a fatal error");
    }

    #[tokio::test(start_paused = true)]
    async fn unexpected_error_is_fatal_after_expected_ones() {
        let counter = Arc::new(AtomicUsize::new(0));
        let options = fast_options();
        let mut ticker = IntervalTicker::constant(&options);

        let err = retry(
            || {
                let counter = counter.clone();
                async move {
                    match counter.fetch_add(1, Ordering::SeqCst) {
                        0 | 1 => Err::<(), _>(Failure::expected("transient")),
                        _ => Err(Failure::unexpected("broken")),
                    }
                }
            },
            Duration::from_secs(5),
            &mut ticker,
            &options,
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "2 error(s) occurred:\n\ttransient\n\tbroken");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        assert!(!err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn success_returns_ok() {
        let options = Options::default();
        let mut ticker = IntervalTicker::constant(&options);
        let result = retry(always_ok, Duration::from_secs(2), &mut ticker, &options).await;
        assert!(result.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn success_after_expected_errors_hides_history() {
        let counter = Arc::new(AtomicUsize::new(0));
        let options = fast_options();
        let mut ticker = IntervalTicker::constant(&options);

        let result = retry(
            || fail_until(counter.clone(), 4),
            Duration::from_secs(5),
            &mut ticker,
            &options,
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn canceled_context_ends_session_on_first_attempt() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let options = Options::default();
        let mut ticker = IntervalTicker::constant(&options);

        let err = retry_with_cancel(
            &cancel,
            observe_cancel,
            Duration::from_secs(2),
            &mut ticker,
            &options,
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "1 error(s) occurred:\n\tcontext canceled");
        assert!(err.is(&Canceled));
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_timeout_retries_until_success() {
        let counter = Arc::new(AtomicUsize::new(0));
        let options = Options::builder().attempt_timeout(Duration::from_millis(1)).build().unwrap();
        let mut ticker = IntervalTicker::constant(&options);

        let result = retry_with_cancel(
            &CancellationToken::new(),
            |token| wait_unless_second(token, counter.clone()),
            Duration::from_secs(2),
            &mut ticker,
            &options,
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn explicit_unexpected_is_not_promoted_by_attempt_timeout() {
        let options = Options::builder().attempt_timeout(Duration::from_millis(1)).build().unwrap();
        let mut ticker = IntervalTicker::constant(&options);

        let err = retry_with_cancel(
            &CancellationToken::new(),
            |token: CancellationToken| async move {
                token.cancelled().await;
                Err::<(), _>(Failure::unexpected(Canceled))
            },
            Duration::from_secs(2),
            &mut ticker,
            &options,
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "1 error(s) occurred:\n\tcontext canceled");
    }

    #[tokio::test(start_paused = true)]
    async fn attempt_token_is_released_after_each_attempt() {
        let tokens = Arc::new(std::sync::Mutex::new(Vec::new()));
        let options = fast_options();
        let mut ticker = IntervalTicker::constant(&options);
        let counter = Arc::new(AtomicUsize::new(0));

        let result = retry_with_cancel(
            &CancellationToken::new(),
            |token| {
                tokens.lock().unwrap().push(token);
                fail_until(counter.clone(), 3)
            },
            Duration::from_secs(2),
            &mut ticker,
            &options,
        )
        .await;

        assert!(result.is_ok());
        let tokens = tokens.lock().unwrap();
        assert_eq!(tokens.len(), 3);
        assert!(tokens.iter().all(CancellationToken::is_cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_signal_ends_session_without_error() {
        let options = fast_options();
        let mut ticker = IntervalTicker::constant(&options);
        ticker.stop();

        let counter = Arc::new(AtomicUsize::new(0));
        let result = retry(
            || fail_until(counter.clone(), usize::MAX),
            Duration::from_secs(2),
            &mut ticker,
            &options,
        )
        .await;

        assert!(result.is_ok());
        assert_eq!(counter.load(Ordering::SeqCst), 1, "stop is observed at the first wait");
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_wins_over_stop_when_both_ready() {
        let options = fast_options();
        let mut ticker = IntervalTicker::constant(&options);
        ticker.stop();

        let err = retry(
            || async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Err::<(), _>(Failure::expected("slow"))
            },
            Duration::from_millis(20),
            &mut ticker,
            &options,
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "2 error(s) occurred:\n\tslow\n\ttimeout");
    }

    #[tokio::test]
    async fn retryer_uses_strategy_ticks() {
        let sleeper = TrackingSleeper::new();
        let options = fast_options();
        let retryer = Retryer::exponential(Duration::from_secs(60), options)
            .unwrap()
            .with_sleeper(sleeper.clone());
        let counter = Arc::new(AtomicUsize::new(0));

        let result = retryer.retry(|| fail_until(counter.clone(), 4)).await;

        assert!(result.is_ok());
        assert_eq!(
            sleeper.calls(),
            vec![Duration::from_millis(10), Duration::from_millis(20), Duration::from_millis(40)]
        );
    }

    #[tokio::test]
    async fn retryer_sessions_do_not_share_tickers() {
        let sleeper = TrackingSleeper::new();
        let retryer = Retryer::linear(Duration::from_secs(60), fast_options())
            .unwrap()
            .with_sleeper(sleeper.clone());

        for _ in 0..2 {
            let counter = Arc::new(AtomicUsize::new(0));
            retryer.retry(|| fail_until(counter.clone(), 3)).await.unwrap();
        }

        assert_eq!(
            sleeper.calls(),
            vec![
                Duration::from_millis(10),
                Duration::from_millis(20),
                Duration::from_millis(10),
                Duration::from_millis(20)
            ]
        );
    }

    #[tokio::test]
    async fn retryer_with_cancel_passes_token() {
        let retryer = Retryer::constant(Duration::from_secs(1), fast_options())
            .unwrap()
            .with_sleeper(InstantSleeper);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = retryer.retry_with_cancel(&cancel, observe_cancel).await.unwrap_err();
        assert!(err.is(&Canceled));
    }

    #[test]
    fn retryer_rejects_invalid_config() {
        assert_eq!(
            Retryer::constant(Duration::ZERO, Options::default()).unwrap_err(),
            ConfigError::ZeroTimeout
        );
        let capped = Options::builder()
            .units(Duration::from_millis(10))
            .max_interval(Duration::from_millis(40))
            .build()
            .unwrap();
        let retryer = Retryer::exponential(Duration::from_secs(1), capped).unwrap();
        assert_eq!(retryer.strategy(), Strategy::Exponential);
        assert_eq!(retryer.timeout(), Duration::from_secs(1));
        assert_eq!(retryer.options().max_interval(), Some(Duration::from_millis(40)));
    }
}
