//! Handover HTTP handlers (staff only)

use axum::extract::{Path, State};

use super::dto::*;
use crate::application::{AppServices, HandoverRequest};
use crate::domain::handover::{Condition, HandoverType};
use crate::domain::vehicle::VehicleStatus;
use crate::domain::DomainResult;
use crate::interfaces::http::common::{ok, ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::middleware::CurrentCaller;

fn to_request(staff_id: String, body: CreateHandoverRequest) -> DomainResult<HandoverRequest> {
    let handover_type: HandoverType = body.handover_type.parse()?;
    let requested_status = body
        .vehicle_status
        .as_deref()
        .map(str::parse::<VehicleStatus>)
        .transpose()?;

    Ok(HandoverRequest {
        reservation_id: body.reservation_id,
        rental_id: body.rental_id,
        vehicle_id: body.vehicle_id,
        handover_type,
        staff_id,
        condition: Condition {
            battery_level: body.battery_level,
            mileage: body.mileage,
            exterior: body.exterior_condition,
            interior: body.interior_condition,
            tires: body.tires_condition,
            notes: body.notes,
        },
        damages: body.damages.into_iter().map(Into::into).collect(),
        image_urls: body.image_urls,
        late_fee: body.late_fee,
        damage_fee: body.damage_fee,
        deposit: body.deposit,
        requested_status,
        clear_damages: body.clear_damages,
        return_station_id: body.return_station_id,
    })
}

#[utoipa::path(
    post,
    path = "/api/v1/handovers",
    tag = "Handovers",
    request_body = CreateHandoverRequest,
    responses(
        (status = 200, description = "Handover recorded", body = ApiResponse<CreateHandoverResponse>),
        (status = 400, description = "Missing reference or unknown type/status"),
        (status = 403, description = "Staff only"),
        (status = 409, description = "Vehicle cannot take the requested status")
    )
)]
pub async fn create_handover(
    State(services): State<AppServices>,
    CurrentCaller(caller): CurrentCaller,
    ValidatedJson(body): ValidatedJson<CreateHandoverRequest>,
) -> ApiResult<CreateHandoverResponse> {
    caller.require_staff()?;
    let request = to_request(caller.user_id, body)?;

    let outcome = services.handovers.record(request).await?;
    ok(CreateHandoverResponse {
        handover_id: outcome.handover.id,
        rental_id: outcome.rental_id,
        vehicle_status: outcome.vehicle_status.map(|s| s.to_string()),
        fees: outcome.handover.fees.into(),
        fees_created: outcome
            .fees_created
            .iter()
            .map(|f| f.as_str().to_string())
            .collect(),
    })
}

#[utoipa::path(
    get,
    path = "/api/v1/handovers/{id}",
    tag = "Handovers",
    params(("id" = i32, Path, description = "Handover ID")),
    responses(
        (status = 200, description = "Handover", body = ApiResponse<HandoverDto>),
        (status = 404, description = "Handover not found")
    )
)]
pub async fn get_handover(
    State(services): State<AppServices>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<i32>,
) -> ApiResult<HandoverDto> {
    caller.require_staff()?;
    ok(services.handovers.get(id).await?.into())
}

#[utoipa::path(
    get,
    path = "/api/v1/rentals/{id}/handovers",
    tag = "Handovers",
    params(("id" = i32, Path, description = "Rental ID")),
    responses((status = 200, description = "Handovers of the rental, oldest first", body = ApiResponse<Vec<HandoverDto>>))
)]
pub async fn list_rental_handovers(
    State(services): State<AppServices>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<i32>,
) -> ApiResult<Vec<HandoverDto>> {
    caller.require_staff()?;
    let handovers = services.handovers.list_for_rental(id).await?;
    ok(handovers.into_iter().map(Into::into).collect())
}
