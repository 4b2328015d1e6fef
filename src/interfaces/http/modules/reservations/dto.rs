//! Reservation DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::reservation::Reservation;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationRequest {
    /// Defaults to the caller; staff may book for a customer
    #[validate(length(min = 1, max = 128))]
    pub user_id: Option<String>,
    #[validate(range(min = 1))]
    pub vehicle_id: i32,
    #[validate(range(min = 1))]
    pub station_id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateReservationResponse {
    pub reservation_id: i32,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReservationDto {
    pub id: i32,
    pub user_id: String,
    pub vehicle_id: i32,
    pub station_id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: String,
    pub cancel_reason: Option<String>,
    pub cancelled_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Reservation> for ReservationDto {
    fn from(r: Reservation) -> Self {
        Self {
            id: r.id,
            user_id: r.user_id,
            vehicle_id: r.vehicle_id,
            station_id: r.station_id,
            start_time: r.start_time,
            end_time: r.end_time,
            status: r.status.to_string(),
            cancel_reason: r.cancel_reason,
            cancelled_by: r.cancelled_by,
            created_at: r.created_at,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelReservationRequest {
    #[validate(length(max = 500))]
    pub reason: Option<String>,
    /// Honoured for staff only; customers always cancel as themselves
    #[validate(length(min = 1, max = 128))]
    pub cancelled_by: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelReservationResponse {
    pub success: bool,
    pub refund_amount: i64,
    pub new_balance: Option<i64>,
    /// The reservation was already cancelled, completed or expired
    pub already_terminal: bool,
    /// Cancellation stands but the refund awaits manual reconciliation
    pub refund_pending_review: bool,
    pub reservation: ReservationDto,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefundResponse {
    pub refunded: i64,
    pub new_balance: Option<i64>,
}
