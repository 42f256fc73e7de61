//! Fixed-rate driver for the simulation.
//!
//! The loop only holds a weak reference to the coordinator, so dropping the
//! last strong handle ends it on the next tick.

use crate::coordinator::GameCoordinator;
use log::{info, warn};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

pub fn spawn_game_loop(coordinator: &Arc<GameCoordinator>) -> JoinHandle<()> {
    let tick_duration = coordinator.tick_duration();
    tokio::spawn(run_game_loop(Arc::downgrade(coordinator), tick_duration))
}

/// Calls [`GameCoordinator::tick`] once per `tick_duration` until the
/// coordinator is dropped. A paused match keeps the loop polling.
pub async fn run_game_loop(coordinator: Weak<GameCoordinator>, tick_duration: Duration) {
    let mut interval_timer = interval(tick_duration);
    interval_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!("Game loop started ({:?} per tick)", tick_duration);

    loop {
        interval_timer.tick().await;

        let Some(coordinator) = coordinator.upgrade() else {
            break;
        };

        let started = Instant::now();
        coordinator.tick().await;

        let elapsed = started.elapsed();
        if elapsed > tick_duration {
            warn!(
                "Tick took {:.3}ms, longer than the {:.3}ms budget",
                elapsed.as_secs_f64() * 1000.0,
                tick_duration.as_secs_f64() * 1000.0
            );
        }
    }

    info!("Game loop exited, coordinator dropped");
}
