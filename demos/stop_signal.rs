//! Stop a long-running session from another task.
use std::time::Duration;
use stubborn::prelude::*;

#[tokio::main]
async fn main() -> Result<(), ErrorSet> {
    let options =
        Options::builder().units(Duration::from_millis(100)).build().expect("valid options");
    let mut ticker = IntervalTicker::constant(&options);
    let stop = ticker.stop_signal();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(350)).await;
        println!("shutting down");
        stop.cancel();
    });

    retry(
        || async { Err(Failure::expected("still waiting")) },
        Duration::from_secs(60),
        &mut ticker,
        &options,
    )
    .await?;

    println!("session stopped after {} ticks", ticker.ticks());
    Ok(())
}
