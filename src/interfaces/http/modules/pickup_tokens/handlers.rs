//! Pickup token HTTP handlers

use axum::extract::State;

use super::dto::*;
use crate::application::AppServices;
use crate::interfaces::http::common::{ok, ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::middleware::CurrentCaller;

#[utoipa::path(
    post,
    path = "/api/v1/pickup-tokens",
    tag = "Pickup",
    request_body = GenerateTokenRequest,
    responses(
        (status = 200, description = "Token issued or refreshed", body = ApiResponse<PickupTokenResponse>),
        (status = 404, description = "Reservation not found"),
        (status = 409, description = "Reservation closed or token already used")
    )
)]
pub async fn generate_token(
    State(services): State<AppServices>,
    CurrentCaller(caller): CurrentCaller,
    ValidatedJson(body): ValidatedJson<GenerateTokenRequest>,
) -> ApiResult<PickupTokenResponse> {
    let reservation = services.reservations.get(body.reservation_id).await?;
    caller.require_self_or_staff(&reservation.user_id)?;

    let issued = services.pickup.generate_token(reservation.id).await?;
    ok(PickupTokenResponse {
        payload: issued.payload,
        rental_id: issued.rental_id,
        expires_at: issued.expires_at,
    })
}

/// Staff scan the customer's code at the vehicle
#[utoipa::path(
    post,
    path = "/api/v1/pickup-tokens/redeem",
    tag = "Pickup",
    request_body = RedeemTokenRequest,
    responses(
        (status = 200, description = "Redeemed (or replayed)", body = ApiResponse<RedeemTokenResponse>),
        (status = 400, description = "Malformed payload"),
        (status = 404, description = "Unknown token"),
        (status = 409, description = "Reservation cancelled or expired"),
        (status = 410, description = "Token expired")
    )
)]
pub async fn redeem_token(
    State(services): State<AppServices>,
    CurrentCaller(caller): CurrentCaller,
    ValidatedJson(body): ValidatedJson<RedeemTokenRequest>,
) -> ApiResult<RedeemTokenResponse> {
    caller.require_staff()?;
    let redemption = services.pickup.redeem_token(&body.payload).await?;
    ok(RedeemTokenResponse {
        success: true,
        replayed: redemption.replayed,
        reservation: redemption.reservation.into(),
    })
}
