//! Background housekeeping
//!
//! Periodically expires overdue `pending` reservations and lapsed payment
//! intents. Both loops stop on the shared shutdown signal.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::payment_intents::PaymentIntentService;
use super::reservation::ReservationService;
use crate::support::shutdown::ShutdownSignal;

/// Intervals and thresholds for the housekeeping loops
#[derive(Debug, Clone)]
pub struct ExpiryConfig {
    /// How often to look for overdue reservations
    pub reservation_check_interval: Duration,
    /// How long a reservation may stay `pending` past its start time
    pub pending_grace: chrono::Duration,
    /// How often to sweep payment intents
    pub intent_sweep_interval: Duration,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            reservation_check_interval: Duration::from_secs(300),
            pending_grace: chrono::Duration::hours(24),
            intent_sweep_interval: Duration::from_secs(60),
        }
    }
}

pub struct ExpiryMonitor {
    reservations: Arc<ReservationService>,
    intents: Arc<PaymentIntentService>,
    config: ExpiryConfig,
}

impl ExpiryMonitor {
    pub fn new(reservations: Arc<ReservationService>, intents: Arc<PaymentIntentService>) -> Self {
        Self {
            reservations,
            intents,
            config: ExpiryConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ExpiryConfig) -> Self {
        self.config = config;
        self
    }

    /// Spawn both loops; the handles finish after `shutdown` fires
    pub fn start(&self, shutdown: ShutdownSignal) -> Vec<JoinHandle<()>> {
        vec![
            self.start_reservation_expiry(shutdown.clone()),
            self.start_intent_sweep(shutdown),
        ]
    }

    fn start_reservation_expiry(&self, shutdown: ShutdownSignal) -> JoinHandle<()> {
        let reservations = self.reservations.clone();
        let period = self.config.reservation_check_interval;
        let grace = self.config.pending_grace;

        tokio::spawn(async move {
            info!(
                interval_secs = period.as_secs(),
                grace_hours = grace.num_hours(),
                "Reservation expiry task started"
            );
            let mut interval = tokio::time::interval(period);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        match reservations.expire_overdue(Utc::now(), grace).await {
                            Ok(0) => debug!("No overdue reservations"),
                            Ok(n) => info!(expired = n, "Overdue reservations expired"),
                            Err(e) => warn!(error = %e, "Reservation expiry check failed"),
                        }
                    }
                    _ = shutdown.wait() => {
                        info!("Reservation expiry task shutting down");
                        break;
                    }
                }
            }
        })
    }

    fn start_intent_sweep(&self, shutdown: ShutdownSignal) -> JoinHandle<()> {
        let intents = self.intents.clone();
        let period = self.config.intent_sweep_interval;

        tokio::spawn(async move {
            info!(interval_secs = period.as_secs(), "Payment intent sweep started");
            let mut interval = tokio::time::interval(period);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = intents.sweep(Utc::now()).await {
                            warn!(error = %e, "Payment intent sweep failed");
                        }
                    }
                    _ = shutdown.wait() => {
                        info!("Payment intent sweep shutting down");
                        break;
                    }
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reservation::ReservationStatus;
    use crate::test_support::TestEnv;

    #[tokio::test]
    async fn first_tick_expires_and_shutdown_stops_loops() {
        let env = TestEnv::new().await;
        let vehicle = env.vehicle().await;
        let mut new = env.new_reservation("cust-1", &vehicle);
        new.start_time = Utc::now() - chrono::Duration::hours(48);
        new.end_time = new.start_time + chrono::Duration::hours(1);
        let overdue = env.services.reservations.create(new).await.unwrap();

        let shutdown = ShutdownSignal::new();
        let handles = ExpiryMonitor::new(
            env.services.reservations.clone(),
            env.services.intents.clone(),
        )
        .with_config(ExpiryConfig {
            reservation_check_interval: Duration::from_millis(20),
            pending_grace: chrono::Duration::hours(1),
            intent_sweep_interval: Duration::from_millis(20),
        })
        .start(shutdown.clone());

        let mut status = ReservationStatus::Pending;
        for _ in 0..50 {
            status = env.services.reservations.get(overdue.id).await.unwrap().status;
            if status == ReservationStatus::Expired {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(status, ReservationStatus::Expired);

        shutdown.trigger();
        for handle in handles {
            tokio::time::timeout(Duration::from_secs(2), handle)
                .await
                .expect("task stops on shutdown")
                .unwrap();
        }
    }
}
