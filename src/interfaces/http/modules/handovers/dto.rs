//! Handover DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::domain::handover::{Damage, FeeBreakdown, Handover};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DamageDto {
    #[validate(length(min = 1, max = 100))]
    pub part: String,
    pub description: Option<String>,
    /// Repair cost in minor currency units
    #[validate(range(min = 0))]
    #[serde(default)]
    pub cost: i64,
}

impl From<DamageDto> for Damage {
    fn from(d: DamageDto) -> Self {
        Self {
            part: d.part,
            description: d.description,
            cost: d.cost,
        }
    }
}

impl From<Damage> for DamageDto {
    fn from(d: Damage) -> Self {
        Self {
            part: d.part,
            description: d.description,
            cost: d.cost,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateHandoverRequest {
    pub reservation_id: Option<i32>,
    pub rental_id: Option<i32>,
    /// For a qc handover with no reservation or rental
    pub vehicle_id: Option<i32>,
    /// `pickup`, `return` or `qc`
    #[serde(rename = "type")]
    pub handover_type: String,
    #[validate(range(min = 0, max = 100))]
    pub battery_level: Option<i32>,
    #[validate(range(min = 0))]
    pub mileage: Option<i64>,
    #[validate(length(max = 500))]
    pub exterior_condition: Option<String>,
    #[validate(length(max = 500))]
    pub interior_condition: Option<String>,
    #[validate(length(max = 500))]
    pub tires_condition: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(nested)]
    #[serde(default)]
    pub damages: Vec<DamageDto>,
    /// URLs returned by the image store
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[validate(range(min = 0))]
    pub late_fee: Option<i64>,
    #[validate(range(min = 0))]
    pub damage_fee: Option<i64>,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub deposit: i64,
    /// Status the inspector wants the vehicle in afterwards
    pub vehicle_status: Option<String>,
    #[serde(default)]
    pub clear_damages: bool,
    pub return_station_id: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeesDto {
    pub late_fee: i64,
    pub damage_fee: i64,
    pub total_due: i64,
    pub deposit_refund: i64,
}

impl From<FeeBreakdown> for FeesDto {
    fn from(f: FeeBreakdown) -> Self {
        Self {
            late_fee: f.late_fee,
            damage_fee: f.damage_fee,
            total_due: f.total_due,
            deposit_refund: f.deposit_refund,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateHandoverResponse {
    pub handover_id: i32,
    pub rental_id: Option<i32>,
    pub vehicle_status: Option<String>,
    pub fees: FeesDto,
    /// Fee types that produced a new pending ledger entry
    pub fees_created: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HandoverDto {
    pub id: i32,
    pub rental_id: Option<i32>,
    pub reservation_id: Option<i32>,
    pub vehicle_id: Option<i32>,
    pub staff_id: String,
    #[serde(rename = "type")]
    pub handover_type: String,
    pub battery_level: Option<i32>,
    pub mileage: Option<i64>,
    pub exterior_condition: Option<String>,
    pub interior_condition: Option<String>,
    pub tires_condition: Option<String>,
    pub notes: Option<String>,
    pub damages: Vec<DamageDto>,
    pub image_urls: Vec<String>,
    pub fees: FeesDto,
    pub clear_damages: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Handover> for HandoverDto {
    fn from(h: Handover) -> Self {
        Self {
            id: h.id,
            rental_id: h.rental_id,
            reservation_id: h.reservation_id,
            vehicle_id: h.vehicle_id,
            staff_id: h.staff_id,
            handover_type: h.handover_type.to_string(),
            battery_level: h.condition.battery_level,
            mileage: h.condition.mileage,
            exterior_condition: h.condition.exterior,
            interior_condition: h.condition.interior,
            tires_condition: h.condition.tires,
            notes: h.condition.notes,
            damages: h.damages.into_iter().map(Into::into).collect(),
            image_urls: h.image_urls,
            fees: h.fees.into(),
            clear_damages: h.clear_damages,
            created_at: h.created_at,
        }
    }
}
