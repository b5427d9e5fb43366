use crate::output::{Output, RelayTracker};
use anyhow::{Context, Result, bail};
use shed_lib::transport::SocketFactory;
use shed_lib::{Poller, Reading};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{Instant, MissedTickBehavior, interval, timeout_at};
use tracing::{debug, info, warn};

/// How long each state request gets before `E` is sent again
const RELAY_RETRY: Duration = Duration::from_millis(500);

/// Poll on every tick and print whatever comes back.
///
/// Runs until `cycles` polls have been sent (plus one interval for the last
/// reply), or forever when `cycles` is `None`.
pub async fn run_monitor(
    poller: &mut Poller,
    readings: &mut UnboundedReceiver<Reading>,
    cycles: Option<u32>,
    output: Output,
) -> Result<()> {
    let mut ticker = interval(poller.config().poll_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut relay = RelayTracker::default();
    let mut polls = 0u32;
    let mut replies = 0u64;

    info!(
        "--- Entering poll loop (every {:?}, sequence {}) ---",
        poller.config().poll_interval(),
        poller.config().sequence
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if cycles.is_some_and(|n| polls >= n) {
                    break;
                }
                // Send errors are not fatal: the next tick tries again
                match poller.poll().await {
                    Ok(command) => debug!("Polled '{}'", char::from(command)),
                    Err(e) => warn!("Poll failed: {}", e),
                }
                polls += 1;
            }
            Some(reading) = readings.recv() => {
                replies += 1;
                let points = relay.filter(&reading);
                output.reading(&reading, &points)?;
            }
        }
    }

    info!("Finished polling: {} poll(s), {} reading(s)", polls, replies);
    if replies == 0 {
        warn!("No replies from {}. Is the controller reachable?", poller.target());
    }
    Ok(())
}

/// Wait for the first reading accepted by `accept`, discarding the others.
pub async fn wait_for<P>(readings: &mut UnboundedReceiver<Reading>, wait: Duration, accept: P) -> Result<Reading>
where
    P: Fn(&Reading) -> bool,
{
    let deadline = Instant::now() + wait;
    loop {
        let reading = timeout_at(deadline, readings.recv())
            .await
            .with_context(|| format!("No matching reply within {:?}", wait))?
            .context("Reading channel closed")?;
        if accept(&reading) {
            return Ok(reading);
        }
        debug!("Skipping unrelated reading '{}'", reading.kind().as_char());
    }
}

/// Request state until the controller reports the relay as `on`.
///
/// The first reply after a switch may still carry the old relay state, so
/// `E` is re-sent every [`RELAY_RETRY`] until `wait` runs out.
pub async fn confirm_relay<F: SocketFactory>(
    poller: &Poller<F>,
    readings: &mut UnboundedReceiver<Reading>,
    on: bool,
    wait: Duration,
) -> Result<Reading> {
    let deadline = Instant::now() + wait;
    loop {
        poller.fetch_state().await.context("Failed to request state")?;
        let attempt_end = (Instant::now() + RELAY_RETRY).min(deadline);
        while let Ok(reading) = timeout_at(attempt_end, readings.recv()).await {
            let reading = reading.context("Reading channel closed")?;
            if matches!(&reading, Reading::Info(info) if info.relay == on) {
                return Ok(reading);
            }
            debug!("Relay not confirmed yet, got '{}'", reading.kind().as_char());
        }
        if Instant::now() >= deadline {
            bail!("Controller did not report relay {} within {:?}", if on { "on" } else { "off" }, wait);
        }
    }
}
