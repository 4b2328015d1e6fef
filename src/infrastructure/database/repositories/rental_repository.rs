//! SeaORM implementation of RentalRepository

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};

use super::{db_err, DbConn};
use crate::domain::rental::{NewRental, Rental, RentalRepository, RentalStatus};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::rental;

pub struct SeaOrmRentalRepository<C> {
    db: Arc<C>,
}

impl<C: DbConn> SeaOrmRentalRepository<C> {
    pub fn new(db: Arc<C>) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: rental::Model) -> DomainResult<Rental> {
    Ok(Rental {
        id: m.id,
        reservation_id: m.reservation_id,
        user_id: m.user_id,
        vehicle_id: m.vehicle_id,
        pickup_station_id: m.pickup_station_id,
        return_station_id: m.return_station_id,
        start_time: m.start_time,
        end_time: m.end_time,
        status: m.status.parse()?,
        created_at: m.created_at,
    })
}

#[async_trait]
impl<C: DbConn> RentalRepository for SeaOrmRentalRepository<C> {
    async fn insert(&self, r: NewRental) -> DomainResult<Rental> {
        debug!(
            "Inserting rental: reservation={:?}, status={}",
            r.reservation_id, r.status
        );
        let now = Utc::now();

        let model = rental::ActiveModel {
            reservation_id: Set(r.reservation_id),
            user_id: Set(r.user_id),
            vehicle_id: Set(r.vehicle_id),
            pickup_station_id: Set(r.pickup_station_id),
            return_station_id: Set(r.return_station_id),
            start_time: Set(r.start_time),
            end_time: Set(r.end_time),
            status: Set(r.status.as_str().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let saved = model.insert(self.db.as_ref()).await.map_err(db_err)?;
        model_to_domain(saved)
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Rental>> {
        rental::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_by_reservation(&self, reservation_id: i32) -> DomainResult<Option<Rental>> {
        rental::Entity::find()
            .filter(rental::Column::ReservationId.eq(reservation_id))
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_open_for_vehicle(&self, vehicle_id: i32) -> DomainResult<Option<Rental>> {
        rental::Entity::find()
            .filter(rental::Column::VehicleId.eq(vehicle_id))
            .filter(rental::Column::Status.ne(RentalStatus::Completed.as_str()))
            .order_by_desc(rental::Column::Id)
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_unlinked_for_user_vehicle(
        &self,
        user_id: &str,
        vehicle_id: i32,
        since: DateTime<Utc>,
    ) -> DomainResult<Vec<Rental>> {
        rental::Entity::find()
            .filter(rental::Column::ReservationId.is_null())
            .filter(rental::Column::UserId.eq(user_id))
            .filter(rental::Column::VehicleId.eq(vehicle_id))
            .filter(rental::Column::StartTime.gte(since))
            .order_by_desc(rental::Column::StartTime)
            .order_by_desc(rental::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?
            .into_iter()
            .map(model_to_domain)
            .collect()
    }

    async fn link_reservation(&self, rental_id: i32, reservation_id: i32) -> DomainResult<u64> {
        debug!("Linking rental {} to reservation {}", rental_id, reservation_id);

        let result = rental::Entity::update_many()
            .col_expr(rental::Column::ReservationId, Expr::value(reservation_id))
            .col_expr(rental::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(rental::Column::Id.eq(rental_id))
            .filter(rental::Column::ReservationId.is_null())
            .exec(self.db.as_ref())
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }

    async fn update_status(
        &self,
        id: i32,
        expected: &[RentalStatus],
        to: RentalStatus,
    ) -> DomainResult<u64> {
        let mut update = rental::Entity::update_many()
            .col_expr(rental::Column::Status, Expr::value(to.as_str()))
            .col_expr(rental::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(rental::Column::Id.eq(id));
        if !expected.is_empty() {
            update =
                update.filter(rental::Column::Status.is_in(expected.iter().map(|s| s.as_str())));
        }

        let result = update.exec(self.db.as_ref()).await.map_err(db_err)?;
        Ok(result.rows_affected)
    }

    async fn complete(
        &self,
        id: i32,
        end_time: DateTime<Utc>,
        return_station_id: Option<i32>,
    ) -> DomainResult<u64> {
        debug!("Completing rental {}", id);

        let mut update = rental::Entity::update_many()
            .col_expr(
                rental::Column::Status,
                Expr::value(RentalStatus::Completed.as_str()),
            )
            .col_expr(rental::Column::EndTime, Expr::value(end_time))
            .col_expr(rental::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(rental::Column::Id.eq(id))
            .filter(rental::Column::Status.ne(RentalStatus::Completed.as_str()));
        if let Some(station) = return_station_id {
            update = update.col_expr(rental::Column::ReturnStationId, Expr::value(station));
        }

        let result = update.exec(self.db.as_ref()).await.map_err(db_err)?;
        Ok(result.rows_affected)
    }
}
