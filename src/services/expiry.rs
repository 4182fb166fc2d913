//! Background expiry sweep.
//!
//! Reservations are also expired lazily when they are read or acted on;
//! the sweep makes sure stock held by abandoned reservations flows back
//! even when nobody touches them.

use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;

use crate::{clock::Clock, services::reservation_service, store::Store};

/// Run [`reservation_service::expire_due_reservations`] every `every`.
///
/// Failures are logged and the loop keeps going; the next tick retries.
pub fn spawn_expiry_sweeper(
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            match reservation_service::expire_due_reservations(store.as_ref(), clock.now()).await {
                Ok(0) => {}
                Ok(expired) => tracing::info!(expired, "expiry sweep released stock"),
                Err(e) => tracing::warn!(error = %e, "expiry sweep failed"),
            }
        }
    })
}
