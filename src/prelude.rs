//! Convenient re-exports for common Stubborn types.
pub use crate::{
    error::{Canceled, Classify, Failure},
    error_set::ErrorSet,
    options::Options,
    retry::{retry, retry_with_cancel, Retryer},
    ticker::{IntervalTicker, Ticker},
    CancellationToken,
};
