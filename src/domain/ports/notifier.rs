//! Outbound notification capability
//!
//! Delivery is best-effort: callers log failures and never roll back
//! committed state because a notification could not be sent.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Notification {
    ReservationCreated {
        user_id: String,
        reservation_id: i32,
        vehicle_id: i32,
    },
    FeeAssessed {
        user_id: String,
        reservation_id: i32,
        fee_type: String,
        amount: i64,
        instructions: String,
    },
    RefundIssued {
        user_id: String,
        reservation_id: i32,
        amount: i64,
        new_balance: i64,
    },
    /// Cancellation went through but the refund must be settled by hand
    RefundPendingReview {
        user_id: String,
        reservation_id: i32,
        reason: String,
    },
}

impl Notification {
    pub fn recipient(&self) -> &str {
        match self {
            Self::ReservationCreated { user_id, .. }
            | Self::FeeAssessed { user_id, .. }
            | Self::RefundIssued { user_id, .. }
            | Self::RefundPendingReview { user_id, .. } => user_id,
        }
    }
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification channel closed")]
    ChannelClosed,
    #[error("Delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: Notification) -> Result<(), NotifyError>;
}
