//! Application layer - use cases over the domain repositories

pub mod services;

use std::sync::Arc;

use chrono::Duration;

use crate::config::AppConfig;
use crate::domain::pickup_token::TokenCodec;
use crate::domain::ports::Notifier;
use crate::domain::RepositoryProvider;

pub use services::{
    CancelOutcome, ExpiryConfig, ExpiryMonitor, HandoverOutcome, HandoverRequest, HandoverService,
    IntentConfirmation, IssuedToken, PaymentIntentService, PickupService, ReconcilerService,
    Redemption, RefundOutcome, RefundState, ReservationService, VehicleAvailability, WalletReceipt,
};

/// Every service, wired once at startup and shared by the HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub vehicles: Arc<VehicleAvailability>,
    pub reservations: Arc<ReservationService>,
    pub pickup: Arc<PickupService>,
    pub handovers: Arc<HandoverService>,
    pub ledger: Arc<ReconcilerService>,
    pub intents: Arc<PaymentIntentService>,
}

impl AppServices {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        notifier: Arc<dyn Notifier>,
        config: &AppConfig,
    ) -> Self {
        let ledger = Arc::new(ReconcilerService::new(repos.clone(), notifier.clone()));
        Self {
            vehicles: Arc::new(VehicleAvailability::new(repos.clone())),
            reservations: Arc::new(ReservationService::new(
                repos.clone(),
                notifier.clone(),
                ledger.clone(),
            )),
            pickup: Arc::new(PickupService::new(
                repos.clone(),
                TokenCodec::new(config.pickup.token_secret.clone()),
                Duration::hours(config.pickup.token_validity_hours),
            )),
            handovers: Arc::new(HandoverService::new(
                repos.clone(),
                notifier,
                config.fees.late_fee_per_hour,
                config.fees.late_grace_minutes,
                config.fees.backfill_match_days,
            )),
            intents: Arc::new(PaymentIntentService::new(
                repos,
                Duration::minutes(config.payments.intent_ttl_minutes),
            )),
            ledger,
        }
    }

    /// Housekeeping loops configured from `config`
    pub fn expiry_monitor(&self, config: &AppConfig) -> ExpiryMonitor {
        ExpiryMonitor::new(self.reservations.clone(), self.intents.clone()).with_config(ExpiryConfig {
            reservation_check_interval: std::time::Duration::from_secs(
                config.reservations.expiry_check_interval_secs,
            ),
            pending_grace: Duration::hours(config.reservations.pending_grace_hours),
            intent_sweep_interval: std::time::Duration::from_secs(config.payments.sweep_interval_secs),
        })
    }
}
