#![forbid(unsafe_code)]
#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::all))]

//! # Stubborn
//!
//! A deadline-bounded retry loop for async Rust. An operation is re-invoked until it succeeds,
//! fails in a way it did not expect, the session deadline elapses, or the ticker is stopped.
//!
//! ## Features
//!
//! - **Classified failures**: only errors tagged [`Failure::Expected`] are retried; unknown
//!   errors are fatal by default
//! - **Error history**: every distinct failure of a session is kept in an [`ErrorSet`]
//! - **Pluggable tickers**: constant, linear, and exponential intervals with bounded jitter
//! - **Cooperative cancellation** through `tokio_util`'s `CancellationToken`, with an optional
//!   per-attempt timeout
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use stubborn::{Classify, Options, Retryer};
//!
//! #[tokio::main]
//! async fn main() {
//!     let options = Options::builder()
//!         .units(Duration::from_millis(100))
//!         .jitter(Duration::from_millis(20))
//!         .log_errors(true)
//!         .build()
//!         .unwrap();
//!     let retryer = Retryer::constant(Duration::from_secs(5), options).unwrap();
//!
//!     let result = retryer
//!         .retry(|| async {
//!             // Your async operation here; transient failures are marked as expected.
//!             Ok::<_, std::io::Error>(()).expected()
//!         })
//!         .await;
//!     assert!(result.is_ok());
//! }
//! ```

pub mod backoff;
pub mod error;
pub mod error_set;
pub mod jitter;
pub mod options;
pub mod prelude;
pub mod retry;
pub mod sleeper;
pub mod ticker;

// Re-exports
pub use backoff::{Backoff, MAX_BACKOFF};
pub use error::{is_timeout, BoxError, Canceled, Classify, Failure, TimeoutError};
pub use error_set::ErrorSet;
pub use jitter::Jitter;
pub use options::{ConfigError, Options, OptionsBuilder};
pub use retry::{retry, retry_with_cancel, Retryer};
pub use sleeper::{InstantSleeper, Sleeper, TokioSleeper, TrackingSleeper};
pub use ticker::{IntervalTicker, Strategy, Ticker};
pub use tokio_util::sync::CancellationToken;
