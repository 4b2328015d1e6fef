//! Application services

mod expiry_monitor;
mod handover;
mod payment_intents;
mod pickup;
mod reconciler;
mod reservation;
mod vehicle_state;

pub use expiry_monitor::{ExpiryConfig, ExpiryMonitor};
pub use handover::{HandoverOutcome, HandoverRequest, HandoverService};
pub use payment_intents::{IntentConfirmation, PaymentIntentService};
pub use pickup::{IssuedToken, PickupService, Redemption};
pub use reconciler::{ensure_pending_fee_in, ReconcilerService, RefundOutcome, WalletReceipt};
pub use reservation::{CancelOutcome, RefundState, ReservationService};
pub use vehicle_state::{transition, VehicleAvailability};

use tracing::warn;

use crate::domain::ports::{Notification, Notifier};

/// Deliver a notification without letting a failure reach the caller
pub(crate) async fn notify_best_effort(notifier: &dyn Notifier, notification: Notification) {
    let recipient = notification.recipient().to_string();
    if let Err(e) = notifier.notify(notification).await {
        warn!(recipient = %recipient, error = %e, "Notification delivery failed");
    }
}
