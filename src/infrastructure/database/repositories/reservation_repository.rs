//! SeaORM implementation of ReservationRepository

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};

use super::{db_err, DbConn};
use crate::domain::reservation::{
    NewReservation, Reservation, ReservationRepository, ReservationStatus,
};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::reservation;

pub struct SeaOrmReservationRepository<C> {
    db: Arc<C>,
}

impl<C: DbConn> SeaOrmReservationRepository<C> {
    pub fn new(db: Arc<C>) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: reservation::Model) -> DomainResult<Reservation> {
    Ok(Reservation {
        id: m.id,
        user_id: m.user_id,
        vehicle_id: m.vehicle_id,
        station_id: m.station_id,
        start_time: m.start_time,
        end_time: m.end_time,
        status: m.status.parse()?,
        cancel_reason: m.cancel_reason,
        cancelled_by: m.cancelled_by,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

fn active_statuses() -> impl Iterator<Item = &'static str> {
    ReservationStatus::ACTIVE.iter().map(|s| s.as_str())
}

// ── ReservationRepository impl ──────────────────────────────────

#[async_trait]
impl<C: DbConn> ReservationRepository for SeaOrmReservationRepository<C> {
    async fn insert(&self, r: NewReservation) -> DomainResult<Reservation> {
        debug!("Inserting reservation: user={}, vehicle={}", r.user_id, r.vehicle_id);
        let now = Utc::now();

        let model = reservation::ActiveModel {
            user_id: Set(r.user_id),
            vehicle_id: Set(r.vehicle_id),
            station_id: Set(r.station_id),
            start_time: Set(r.start_time),
            end_time: Set(r.end_time),
            status: Set(ReservationStatus::Pending.as_str().to_string()),
            cancel_reason: Set(None),
            cancelled_by: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let saved = model.insert(self.db.as_ref()).await.map_err(db_err)?;
        model_to_domain(saved)
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Reservation>> {
        reservation::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_active_for_user(&self, user_id: &str) -> DomainResult<Option<Reservation>> {
        reservation::Entity::find()
            .filter(reservation::Column::UserId.eq(user_id))
            .filter(reservation::Column::Status.is_in(active_statuses()))
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_active_for_vehicle(&self, vehicle_id: i32) -> DomainResult<Option<Reservation>> {
        reservation::Entity::find()
            .filter(reservation::Column::VehicleId.eq(vehicle_id))
            .filter(reservation::Column::Status.is_in(active_statuses()))
            .order_by_desc(reservation::Column::Id)
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_for_user(&self, user_id: &str) -> DomainResult<Vec<Reservation>> {
        reservation::Entity::find()
            .filter(reservation::Column::UserId.eq(user_id))
            .order_by_desc(reservation::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?
            .into_iter()
            .map(model_to_domain)
            .collect()
    }

    async fn update_status(
        &self,
        id: i32,
        expected: &[ReservationStatus],
        to: ReservationStatus,
    ) -> DomainResult<u64> {
        debug!("Reservation {} status -> {} (expected {:?})", id, to, expected);

        let mut update = reservation::Entity::update_many()
            .col_expr(reservation::Column::Status, Expr::value(to.as_str()))
            .col_expr(reservation::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(reservation::Column::Id.eq(id));
        if !expected.is_empty() {
            update = update.filter(
                reservation::Column::Status.is_in(expected.iter().map(|s| s.as_str())),
            );
        }

        let result = update.exec(self.db.as_ref()).await.map_err(db_err)?;
        Ok(result.rows_affected)
    }

    async fn cancel(
        &self,
        id: i32,
        reason: Option<String>,
        cancelled_by: Option<String>,
    ) -> DomainResult<u64> {
        debug!("Cancelling reservation {}", id);

        let result = reservation::Entity::update_many()
            .col_expr(
                reservation::Column::Status,
                Expr::value(ReservationStatus::Cancelled.as_str()),
            )
            .col_expr(reservation::Column::CancelReason, Expr::value(reason))
            .col_expr(reservation::Column::CancelledBy, Expr::value(cancelled_by))
            .col_expr(reservation::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(reservation::Column::Id.eq(id))
            .filter(reservation::Column::Status.is_in(active_statuses()))
            .exec(self.db.as_ref())
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }

    async fn find_overdue_pending(
        &self,
        started_before: DateTime<Utc>,
    ) -> DomainResult<Vec<Reservation>> {
        reservation::Entity::find()
            .filter(reservation::Column::Status.eq(ReservationStatus::Pending.as_str()))
            .filter(reservation::Column::StartTime.lt(started_before))
            .order_by_asc(reservation::Column::StartTime)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?
            .into_iter()
            .map(model_to_domain)
            .collect()
    }
}
