//! Error classification for retried operations
//!
//! Every failed attempt is reported as a [`Failure`], a closed set of variants the retry loop
//! dispatches on:
//! - `Expected`: transient; the session keeps retrying.
//! - `Unexpected`: explicitly fatal; the session ends on first occurrence.
//! - `Unclassified`: a plain error converted with `?`; treated exactly like `Unexpected`.
//! - `Timeout`: appended by the loop itself when the session deadline elapses.
//!
//! Classification is applied to `Result`s, so an `Ok` value always passes through untouched.
//!
//! Example
//! ```rust
//! use stubborn::{Classify, Failure};
//!
//! let ok: Result<u8, Failure> = Ok::<_, std::io::Error>(7).expected();
//! assert_eq!(ok.unwrap(), 7);
//!
//! let err = Err::<(), _>(std::io::Error::new(std::io::ErrorKind::Other, "flaky"))
//!     .expected()
//!     .unwrap_err();
//! assert!(err.is_expected());
//! assert_eq!(err.to_string(), "flaky");
//! ```

use std::error::Error;
use std::fmt;

/// Boxed error used for causes supplied by callers.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Sentinel error recorded when the session deadline elapses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, thiserror::Error)]
#[error("timeout")]
pub struct TimeoutError;

/// Error an operation reports after observing its cancellation token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, thiserror::Error)]
#[error("context canceled")]
pub struct Canceled;

static TIMEOUT: TimeoutError = TimeoutError;

/// Outcome of a failed attempt, tagged with how the retry loop should treat it.
///
/// Not an [`std::error::Error`] itself; any plain error converts into `Unclassified` via `?`.
#[derive(Debug)]
pub enum Failure {
    /// Retry is acceptable.
    Expected(BoxError),
    /// Abort immediately.
    Unexpected(BoxError),
    /// Plain error without a tag; fatal.
    Unclassified(BoxError),
    /// Session deadline exceeded.
    Timeout,
}

impl Failure {
    /// Tag an error as retryable.
    pub fn expected(err: impl Into<BoxError>) -> Self {
        Failure::Expected(err.into())
    }

    /// Tag an error as fatal.
    pub fn unexpected(err: impl Into<BoxError>) -> Self {
        Failure::Unexpected(err.into())
    }

    /// Whether the retry loop may try again after this failure.
    pub fn is_expected(&self) -> bool {
        matches!(self, Failure::Expected(_))
    }

    /// Whether this failure was explicitly tagged as fatal.
    pub fn is_unexpected(&self) -> bool {
        matches!(self, Failure::Unexpected(_))
    }

    /// Whether this is the deadline sentinel, or wraps a [`TimeoutError`].
    pub fn is_timeout(&self) -> bool {
        match self {
            Failure::Timeout => true,
            Failure::Expected(e) | Failure::Unexpected(e) | Failure::Unclassified(e) => {
                is_timeout(e.as_ref())
            }
        }
    }

    /// The wrapped error. For `Timeout` this is a [`TimeoutError`].
    pub fn cause(&self) -> &(dyn Error + 'static) {
        match self {
            Failure::Expected(e) | Failure::Unexpected(e) | Failure::Unclassified(e) => e.as_ref(),
            Failure::Timeout => &TIMEOUT,
        }
    }

    /// Walk the cause chain looking for a value equal to `target`.
    pub fn is<E>(&self, target: &E) -> bool
    where
        E: Error + PartialEq + 'static,
    {
        let mut current = Some(self.cause());
        while let Some(err) = current {
            if err.downcast_ref::<E>() == Some(target) {
                return true;
            }
            current = err.source();
        }
        false
    }

    /// Unwrap into the boxed cause.
    pub fn into_cause(self) -> BoxError {
        match self {
            Failure::Expected(e) | Failure::Unexpected(e) | Failure::Unclassified(e) => e,
            Failure::Timeout => Box::new(TimeoutError),
        }
    }

    /// Re-tag a plain failure as retryable; tagged failures are returned unchanged.
    pub(crate) fn promote_unclassified(self) -> Self {
        match self {
            Failure::Unclassified(e) => Failure::Expected(e),
            other => other,
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Expected(e) | Failure::Unexpected(e) | Failure::Unclassified(e) => {
                write!(f, "{}", e)
            }
            Failure::Timeout => write!(f, "{}", TimeoutError),
        }
    }
}

impl<E> From<E> for Failure
where
    E: Error + Send + Sync + 'static,
{
    fn from(err: E) -> Self {
        Failure::Unclassified(Box::new(err))
    }
}

/// Check whether `err` is the deadline sentinel.
pub fn is_timeout(err: &(dyn Error + 'static)) -> bool {
    err.is::<TimeoutError>()
}

/// Classify the error side of a `Result`.
pub trait Classify<T> {
    /// Mark the error as retryable.
    fn expected(self) -> Result<T, Failure>;
    /// Mark the error as fatal.
    fn unexpected(self) -> Result<T, Failure>;
}

impl<T, E> Classify<T> for Result<T, E>
where
    E: Into<BoxError>,
{
    fn expected(self) -> Result<T, Failure> {
        self.map_err(Failure::expected)
    }

    fn unexpected(self) -> Result<T, Failure> {
        self.map_err(Failure::unexpected)
    }
}
