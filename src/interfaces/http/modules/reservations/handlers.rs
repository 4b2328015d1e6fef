//! Reservation HTTP handlers

use axum::extract::{Path, State};
use axum::Json;

use super::dto::*;
use crate::application::{AppServices, RefundState};
use crate::domain::reservation::NewReservation;
use crate::interfaces::http::common::{ok, ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::middleware::CurrentCaller;

#[utoipa::path(
    post,
    path = "/api/v1/reservations",
    tag = "Reservations",
    request_body = CreateReservationRequest,
    responses(
        (status = 200, description = "Reservation created", body = ApiResponse<CreateReservationResponse>),
        (status = 400, description = "Invalid time window or station"),
        (status = 404, description = "Vehicle not found"),
        (status = 409, description = "User already has an active reservation or vehicle unavailable")
    )
)]
pub async fn create_reservation(
    State(services): State<AppServices>,
    CurrentCaller(caller): CurrentCaller,
    ValidatedJson(body): ValidatedJson<CreateReservationRequest>,
) -> ApiResult<CreateReservationResponse> {
    let user_id = body.user_id.unwrap_or_else(|| caller.user_id.clone());
    caller.require_self_or_staff(&user_id)?;

    let reservation = services
        .reservations
        .create(NewReservation {
            user_id,
            vehicle_id: body.vehicle_id,
            station_id: body.station_id,
            start_time: body.start_time,
            end_time: body.end_time,
        })
        .await?;

    ok(CreateReservationResponse {
        reservation_id: reservation.id,
        status: reservation.status.to_string(),
    })
}

#[utoipa::path(
    get,
    path = "/api/v1/reservations/{id}",
    tag = "Reservations",
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Reservation", body = ApiResponse<ReservationDto>),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn get_reservation(
    State(services): State<AppServices>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<i32>,
) -> ApiResult<ReservationDto> {
    let reservation = services.reservations.get(id).await?;
    caller.require_self_or_staff(&reservation.user_id)?;
    ok(reservation.into())
}

#[utoipa::path(
    get,
    path = "/api/v1/users/{user_id}/reservations",
    tag = "Reservations",
    params(("user_id" = String, Path, description = "User ID")),
    responses(
        (status = 200, description = "Reservations, newest first", body = ApiResponse<Vec<ReservationDto>>),
        (status = 403, description = "Not your reservations")
    )
)]
pub async fn list_user_reservations(
    State(services): State<AppServices>,
    CurrentCaller(caller): CurrentCaller,
    Path(user_id): Path<String>,
) -> ApiResult<Vec<ReservationDto>> {
    caller.require_self_or_staff(&user_id)?;
    let reservations = services.reservations.list_for_user(&user_id).await?;
    ok(reservations.into_iter().map(Into::into).collect())
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/{id}/cancel",
    tag = "Reservations",
    params(("id" = i32, Path, description = "Reservation ID")),
    request_body = CancelReservationRequest,
    responses(
        (status = 200, description = "Cancelled (refund details inside)", body = ApiResponse<CancelReservationResponse>),
        (status = 404, description = "Reservation not found")
    )
)]
pub async fn cancel_reservation(
    State(services): State<AppServices>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<i32>,
    ValidatedJson(body): ValidatedJson<CancelReservationRequest>,
) -> ApiResult<CancelReservationResponse> {
    let reservation = services.reservations.get(id).await?;
    caller.require_self_or_staff(&reservation.user_id)?;

    let cancelled_by = match body.cancelled_by {
        Some(on_behalf) if caller.is_staff() => on_behalf,
        _ => caller.user_id.clone(),
    };
    let outcome = services
        .reservations
        .cancel(id, body.reason, Some(cancelled_by))
        .await?;

    let (message, pending_review) = match &outcome.refund {
        RefundState::PendingManualReview { reason } => (Some(reason.clone()), true),
        _ if outcome.already_terminal => (Some("Reservation was already closed".to_string()), false),
        _ => (None, false),
    };
    let response = CancelReservationResponse {
        success: true,
        refund_amount: outcome.refund_amount(),
        new_balance: outcome.new_balance(),
        already_terminal: outcome.already_terminal,
        refund_pending_review: pending_review,
        reservation: outcome.reservation.into(),
    };

    Ok(Json(match message {
        Some(message) => ApiResponse::success_with_message(response, message),
        None => ApiResponse::success(response),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/reservations/{id}/refund",
    tag = "Reservations",
    params(("id" = i32, Path, description = "Reservation ID")),
    responses(
        (status = 200, description = "Refund retried", body = ApiResponse<RefundResponse>),
        (status = 403, description = "Staff only"),
        (status = 409, description = "Reservation is not cancelled")
    )
)]
pub async fn retry_refund(
    State(services): State<AppServices>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<i32>,
) -> ApiResult<RefundResponse> {
    caller.require_staff()?;
    let outcome = services.ledger.retry_refund(id).await?;
    ok(RefundResponse {
        refunded: outcome.refunded,
        new_balance: outcome.new_balance,
    })
}
