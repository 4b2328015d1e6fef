//! Pickup token DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::interfaces::http::modules::reservations::ReservationDto;

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GenerateTokenRequest {
    #[validate(range(min = 1))]
    pub reservation_id: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PickupTokenResponse {
    /// Opaque payload to render as a QR code
    pub payload: String,
    pub rental_id: i32,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RedeemTokenRequest {
    #[validate(length(min = 1, max = 512))]
    pub payload: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RedeemTokenResponse {
    pub success: bool,
    /// The token had been redeemed before; nothing changed this time
    pub replayed: bool,
    pub reservation: ReservationDto,
}
