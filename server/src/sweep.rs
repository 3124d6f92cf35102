//! Background hold-sweep task.

use rifa_core::HoldSweeper;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Spawn the periodic hold-sweep task.
///
/// Failures are logged and the loop keeps running; a broken sweep pass must
/// not take the reclaim path down with it.
pub fn spawn_hold_sweeper(sweeper: Arc<HoldSweeper>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match sweeper.run_once().await {
                Ok(report) => {
                    if report.payments_cancelled > 0 || report.slots_released > 0 {
                        metrics::counter!("rifa.sweep.payments_cancelled")
                            .increment(u64::from(report.payments_cancelled));
                        metrics::counter!("rifa.sweep.slots_released")
                            .increment(u64::from(report.slots_released));
                    }
                }
                Err(sweep_err) => {
                    tracing::error!(error = %sweep_err, "hold sweep pass failed");
                }
            }
        }
    })
}
