//! Rental repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{NewRental, Rental, RentalStatus};
use crate::domain::DomainResult;

#[async_trait]
pub trait RentalRepository: Send + Sync {
    async fn insert(&self, rental: NewRental) -> DomainResult<Rental>;

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Rental>>;

    async fn find_by_reservation(&self, reservation_id: i32) -> DomainResult<Option<Rental>>;

    /// A rental of this vehicle that has not been completed, if any
    async fn find_open_for_vehicle(&self, vehicle_id: i32) -> DomainResult<Option<Rental>>;

    /// Rentals with no reservation link for this user and vehicle that
    /// started at or after `since`, most recent first
    async fn find_unlinked_for_user_vehicle(
        &self,
        user_id: &str,
        vehicle_id: i32,
        since: DateTime<Utc>,
    ) -> DomainResult<Vec<Rental>>;

    /// Attach a reservation to a rental that has none; returns rows updated
    async fn link_reservation(&self, rental_id: i32, reservation_id: i32) -> DomainResult<u64>;

    async fn update_status(
        &self,
        id: i32,
        expected: &[RentalStatus],
        to: RentalStatus,
    ) -> DomainResult<u64>;

    /// Close a rental: status `completed`, end time and return station set
    async fn complete(
        &self,
        id: i32,
        end_time: DateTime<Utc>,
        return_station_id: Option<i32>,
    ) -> DomainResult<u64>;
}
