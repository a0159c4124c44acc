//! Periodic rate budget reset

use crate::state::SharedState;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Spawns the task that restores the rate budget every `period`
///
/// The first reset happens one full period after startup; the budget starts
/// out full already. Each reset recomputes the limit from the configuration
/// in effect at that moment.
pub fn spawn_budget_reset(shared: Arc<SharedState>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let limit = shared.reset_budget().await;
            tracing::info!("Rate budget reset to {} crawls", limit);
        }
    })
}
