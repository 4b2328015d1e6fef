//! Delivery worker that writes every notification to the log
//!
//! Stands in for the mail gateway: the message is what would be sent.

use tracing::{debug, info};

use super::event_bus::EventSubscriber;
use crate::domain::ports::Notification;
use crate::support::ShutdownSignal;

pub async fn run_delivery_log(mut subscriber: EventSubscriber, shutdown: ShutdownSignal) {
    info!("Notification delivery log started");
    loop {
        tokio::select! {
            message = subscriber.recv() => {
                let Some(message) = message else { break };
                match &message.notification {
                    Notification::FeeAssessed { user_id, reservation_id, fee_type, amount, instructions } => {
                        info!(
                            notification_id = %message.id,
                            user_id = %user_id,
                            reservation_id,
                            fee_type = %fee_type,
                            amount,
                            "Fee notice: {}", instructions
                        );
                    }
                    other => {
                        info!(
                            notification_id = %message.id,
                            user_id = %other.recipient(),
                            "Notification: {:?}", other
                        );
                    }
                }
            }
            _ = shutdown.wait() => {
                debug!("Notification delivery log stopping");
                break;
            }
        }
    }
}
