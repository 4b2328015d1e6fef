//! Vehicle DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::vehicle::{Vehicle, VehicleStatusChange};

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterVehicleRequest {
    #[validate(range(min = 1))]
    pub station_id: i32,
    #[validate(length(min = 1, max = 100))]
    pub model: String,
    #[validate(range(min = 0, max = 100))]
    pub battery_level: i32,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub mileage: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetVehicleStatusRequest {
    /// One of `available`, `pending`, `rented`, `awaiting_processing`, `maintenance`
    #[validate(length(min = 1))]
    pub status: String,
    #[validate(length(min = 1, max = 500))]
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDto {
    pub id: i32,
    pub station_id: i32,
    pub model: String,
    pub status: String,
    pub battery_level: i32,
    pub mileage: i64,
    pub condition_notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl From<Vehicle> for VehicleDto {
    fn from(v: Vehicle) -> Self {
        Self {
            id: v.id,
            station_id: v.station_id,
            model: v.model,
            status: v.status.to_string(),
            battery_level: v.battery_level,
            mileage: v.mileage,
            condition_notes: v.condition_notes,
            updated_at: v.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeDto {
    pub from_status: String,
    pub to_status: String,
    pub reason: String,
    pub actor: String,
    pub changed_at: DateTime<Utc>,
}

impl From<VehicleStatusChange> for StatusChangeDto {
    fn from(c: VehicleStatusChange) -> Self {
        Self {
            from_status: c.from_status.to_string(),
            to_status: c.to_status.to_string(),
            reason: c.reason,
            actor: c.actor,
            changed_at: c.changed_at,
        }
    }
}
