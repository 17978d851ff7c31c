//! Background task that periodically expires overdue reservations.
//!
//! Runs in a tokio::spawn loop, checking every 60 seconds (by default)
//! for active reservations past their `expire_at` and releasing their
//! batteries. The sweep has no caller to report to; failures are
//! logged and the next tick retries naturally.

use std::sync::Arc;

use tokio::time::Duration;
use tracing::{info, warn};

use super::reservation_engine::ReservationEngine;
use crate::shared::shutdown::ShutdownSignal;

/// Start the reservation expiry background task.
pub fn start_reservation_expiry_task(
    engine: Arc<ReservationEngine>,
    shutdown: ShutdownSignal,
    check_interval_secs: u64,
) {
    tokio::spawn(async move {
        info!(
            check_interval = check_interval_secs,
            "📅 Reservation expiry task started"
        );

        let mut interval = tokio::time::interval(Duration::from_secs(check_interval_secs));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match engine.auto_expire_sweep().await {
                        Ok(0) => {}
                        Ok(n) => info!(expired = n, "Reservation expiry sweep finished"),
                        Err(e) => warn!(error = %e, "Reservation expiry sweep error"),
                    }
                }
                _ = shutdown.notified().wait() => {
                    info!("📅 Reservation expiry task shutting down");
                    break;
                }
            }
        }

        info!("📅 Reservation expiry task stopped");
    });
}
