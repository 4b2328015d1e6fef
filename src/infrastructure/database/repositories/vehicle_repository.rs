//! SeaORM implementation of VehicleRepository

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};

use super::{db_err, DbConn};
use crate::domain::vehicle::{
    ConditionUpdate, NewVehicle, Vehicle, VehicleRepository, VehicleStatus, VehicleStatusChange,
};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::{vehicle, vehicle_status_change};

pub struct SeaOrmVehicleRepository<C> {
    db: Arc<C>,
}

impl<C: DbConn> SeaOrmVehicleRepository<C> {
    pub fn new(db: Arc<C>) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: vehicle::Model) -> DomainResult<Vehicle> {
    Ok(Vehicle {
        id: m.id,
        station_id: m.station_id,
        model: m.model,
        status: m.status.parse()?,
        battery_level: m.battery_level,
        mileage: m.mileage,
        condition_notes: m.condition_notes,
        updated_at: m.updated_at,
    })
}

fn change_to_domain(m: vehicle_status_change::Model) -> DomainResult<VehicleStatusChange> {
    Ok(VehicleStatusChange {
        vehicle_id: m.vehicle_id,
        from_status: m.from_status.parse()?,
        to_status: m.to_status.parse()?,
        reason: m.reason,
        actor: m.actor,
        changed_at: m.changed_at,
    })
}

// ── VehicleRepository impl ──────────────────────────────────────

#[async_trait]
impl<C: DbConn> VehicleRepository for SeaOrmVehicleRepository<C> {
    async fn insert(&self, v: NewVehicle) -> DomainResult<Vehicle> {
        debug!("Registering vehicle at station {}", v.station_id);
        let now = Utc::now();

        let model = vehicle::ActiveModel {
            station_id: Set(v.station_id),
            model: Set(v.model),
            status: Set(VehicleStatus::Available.as_str().to_string()),
            battery_level: Set(v.battery_level),
            mileage: Set(v.mileage),
            condition_notes: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let saved = model.insert(self.db.as_ref()).await.map_err(db_err)?;
        model_to_domain(saved)
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Vehicle>> {
        vehicle::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn update_status(
        &self,
        id: i32,
        expected: &[VehicleStatus],
        to: VehicleStatus,
    ) -> DomainResult<u64> {
        debug!("Vehicle {} status -> {} (expected {:?})", id, to, expected);

        let mut update = vehicle::Entity::update_many()
            .col_expr(vehicle::Column::Status, Expr::value(to.as_str()))
            .col_expr(vehicle::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(vehicle::Column::Id.eq(id));
        if !expected.is_empty() {
            update = update.filter(
                vehicle::Column::Status.is_in(expected.iter().map(|s| s.as_str())),
            );
        }

        let result = update.exec(self.db.as_ref()).await.map_err(db_err)?;
        Ok(result.rows_affected)
    }

    async fn update_condition(&self, id: i32, c: ConditionUpdate) -> DomainResult<()> {
        if c.is_empty() {
            return Ok(());
        }

        let mut update = vehicle::Entity::update_many()
            .col_expr(vehicle::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(vehicle::Column::Id.eq(id));
        if let Some(level) = c.battery_level {
            update = update.col_expr(vehicle::Column::BatteryLevel, Expr::value(level));
        }
        if let Some(mileage) = c.mileage {
            update = update.col_expr(vehicle::Column::Mileage, Expr::value(mileage));
        }
        if let Some(notes) = c.notes {
            update = update.col_expr(vehicle::Column::ConditionNotes, Expr::value(notes));
        }

        update.exec(self.db.as_ref()).await.map_err(db_err)?;
        Ok(())
    }

    async fn record_status_change(&self, change: VehicleStatusChange) -> DomainResult<()> {
        let model = vehicle_status_change::ActiveModel {
            vehicle_id: Set(change.vehicle_id),
            from_status: Set(change.from_status.as_str().to_string()),
            to_status: Set(change.to_status.as_str().to_string()),
            reason: Set(change.reason),
            actor: Set(change.actor),
            changed_at: Set(change.changed_at),
            ..Default::default()
        };
        model.insert(self.db.as_ref()).await.map_err(db_err)?;
        Ok(())
    }

    async fn status_history(&self, vehicle_id: i32) -> DomainResult<Vec<VehicleStatusChange>> {
        vehicle_status_change::Entity::find()
            .filter(vehicle_status_change::Column::VehicleId.eq(vehicle_id))
            .order_by_asc(vehicle_status_change::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?
            .into_iter()
            .map(change_to_domain)
            .collect()
    }
}
