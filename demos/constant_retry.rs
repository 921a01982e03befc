//! Retry a flaky call at a constant interval until it succeeds or the session times out.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use stubborn::prelude::*;

#[tokio::main]
async fn main() -> Result<(), ErrorSet> {
    let options = Options::builder()
        .units(Duration::from_millis(200))
        .jitter(Duration::from_millis(50))
        .log_errors(true)
        .build()
        .expect("valid options");
    let retryer = Retryer::constant(Duration::from_secs(5), options).expect("valid retryer");

    let attempts = AtomicUsize::new(0);
    retryer
        .retry(|| {
            let attempts = &attempts;
            async move {
                // Replace with your real fallible work
                let n = attempts.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    return Err(Failure::expected(format!("service warming up (attempt {n})")));
                }
                Ok(())
            }
        })
        .await?;

    println!("succeeded after {} attempts", attempts.load(Ordering::SeqCst));
    Ok(())
}
