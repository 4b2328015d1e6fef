//! Vehicle HTTP handlers

use axum::extract::{Path, State};

use super::dto::*;
use crate::application::AppServices;
use crate::domain::vehicle::NewVehicle;
use crate::interfaces::http::common::{ok, ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::middleware::CurrentCaller;

#[utoipa::path(
    post,
    path = "/api/v1/vehicles",
    tag = "Vehicles",
    request_body = RegisterVehicleRequest,
    responses(
        (status = 200, description = "Vehicle registered as available", body = ApiResponse<VehicleDto>),
        (status = 403, description = "Admin only")
    )
)]
pub async fn register_vehicle(
    State(services): State<AppServices>,
    CurrentCaller(caller): CurrentCaller,
    ValidatedJson(body): ValidatedJson<RegisterVehicleRequest>,
) -> ApiResult<VehicleDto> {
    caller.require_admin()?;
    let vehicle = services
        .vehicles
        .register(NewVehicle {
            station_id: body.station_id,
            model: body.model,
            battery_level: body.battery_level,
            mileage: body.mileage,
        })
        .await?;
    ok(vehicle.into())
}

#[utoipa::path(
    get,
    path = "/api/v1/vehicles/{id}",
    tag = "Vehicles",
    params(("id" = i32, Path, description = "Vehicle ID")),
    responses(
        (status = 200, description = "Vehicle", body = ApiResponse<VehicleDto>),
        (status = 404, description = "Vehicle not found")
    )
)]
pub async fn get_vehicle(
    State(services): State<AppServices>,
    CurrentCaller(_caller): CurrentCaller,
    Path(id): Path<i32>,
) -> ApiResult<VehicleDto> {
    ok(services.vehicles.current(id).await?.into())
}

#[utoipa::path(
    get,
    path = "/api/v1/vehicles/{id}/history",
    tag = "Vehicles",
    params(("id" = i32, Path, description = "Vehicle ID")),
    responses((status = 200, description = "Status changes, oldest first", body = ApiResponse<Vec<StatusChangeDto>>))
)]
pub async fn vehicle_history(
    State(services): State<AppServices>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<i32>,
) -> ApiResult<Vec<StatusChangeDto>> {
    caller.require_staff()?;
    let history = services.vehicles.history(id).await?;
    ok(history.into_iter().map(Into::into).collect())
}

#[utoipa::path(
    put,
    path = "/api/v1/vehicles/{id}/status",
    tag = "Vehicles",
    params(("id" = i32, Path, description = "Vehicle ID")),
    request_body = SetVehicleStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<VehicleDto>),
        (status = 400, description = "Unknown status"),
        (status = 409, description = "Transition not allowed from the current status")
    )
)]
pub async fn set_vehicle_status(
    State(services): State<AppServices>,
    CurrentCaller(caller): CurrentCaller,
    Path(id): Path<i32>,
    ValidatedJson(body): ValidatedJson<SetVehicleStatusRequest>,
) -> ApiResult<VehicleDto> {
    caller.require_staff()?;
    let vehicle = services
        .vehicles
        .set_status(id, &body.status, &body.reason, &caller.user_id)
        .await?;
    ok(vehicle.into())
}
