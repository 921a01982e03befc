//! Deduplicating error aggregation for a retry session
//!
//! Semantics:
//! - Failures are kept in first-seen order.
//! - Two failures are duplicates when their rendered messages are equal; the second is dropped.
//! - The rendered form is a stable contract:
//!   `"<N> error(s) occurred:"` followed by one `"\n\t<message>"` line per failure, or the empty
//!   string when nothing was recorded.
//!
//! Every read and write goes through an internal mutex, so a set can be shared behind an `Arc`.
//!
//! Example
//! ```rust
//! use stubborn::{ErrorSet, Failure};
//!
//! let errors = ErrorSet::new();
//! assert!(!errors.append(Failure::expected("test")));
//! assert!(errors.append(Failure::expected("test")));
//! errors.append(Failure::Timeout);
//! assert_eq!(errors.to_string(), "2 error(s) occurred:\n\ttest\n\ttimeout");
//! ```

use crate::error::Failure;
use std::error::Error;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Ordered set of distinct failures.
#[derive(Default)]
pub struct ErrorSet {
    failures: Mutex<Vec<Failure>>,
}

impl ErrorSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    // Display of a user error may panic while the guard is held; the vector itself is never left
    // half-updated, so a poisoned lock is still safe to read.
    fn lock(&self) -> MutexGuard<'_, Vec<Failure>> {
        self.failures.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add `failure` unless a failure with the same message is already present.
    ///
    /// Returns `true` when the message was already recorded (the set is left unchanged).
    pub fn append(&self, failure: Failure) -> bool {
        let message = failure.to_string();
        let mut failures = self.lock();
        if failures.iter().any(|existing| existing.to_string() == message) {
            return true;
        }
        failures.push(failure);
        false
    }

    /// Number of distinct failures recorded.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Rendered messages in insertion order.
    pub fn messages(&self) -> Vec<String> {
        self.lock().iter().map(ToString::to_string).collect()
    }

    /// True iff exactly one failure is recorded and its cause chain reaches `target`.
    pub fn is<E>(&self, target: &E) -> bool
    where
        E: Error + PartialEq + 'static,
    {
        match self.lock().as_slice() {
            [only] => only.is(target),
            _ => false,
        }
    }

    /// Whether the session ended because its deadline elapsed.
    pub fn is_timeout(&self) -> bool {
        self.lock().last().is_some_and(|f| matches!(f, Failure::Timeout))
    }

    /// Take the recorded failures out of the set.
    pub fn into_failures(self) -> Vec<Failure> {
        self.failures.into_inner().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Display for ErrorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let failures = self.lock();
        if failures.is_empty() {
            return Ok(());
        }
        write!(f, "{} error(s) occurred:", failures.len())?;
        for failure in failures.iter() {
            write!(f, "\n\t{}", failure)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ErrorSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ErrorSet").field("failures", &*self.lock()).finish()
    }
}

impl Error for ErrorSet {}
