use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tracing::{error, info, warn};

use super::cycle::MonitorCycle;

/// Runs a monitor cycle on every tick until `shutdown_rx` fires.
///
/// The first cycle starts immediately. Cycles never overlap: ticks that come
/// due while a cycle is still running are dropped, and shutdown waits for the
/// running cycle to finish.
pub async fn start_periodic_monitoring(
    cycle: Arc<MonitorCycle>,
    period: Duration,
    mut shutdown_rx: watch::Receiver<()>,
) {
    info!(interval_secs = period.as_secs(), "Device monitor scheduler started.");
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => {
                info!("Shutdown signal received, stopping device monitor scheduler.");
                break;
            }
            _ = ticker.tick() => {}
        }

        let started = Instant::now();
        match cycle.run().await {
            Ok(report) => info!(
                selected = report.selected,
                notified = report.notified,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Monitor cycle completed."
            ),
            Err(e) => error!(error = %e, "Monitor cycle failed."),
        }

        let elapsed = started.elapsed();
        if elapsed > period {
            warn!(
                elapsed_secs = elapsed.as_secs(),
                interval_secs = period.as_secs(),
                "Monitor cycle outlasted the interval; skipping missed ticks."
            );
        }
    }
}
