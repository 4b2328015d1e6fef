//! Reservation repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{NewReservation, Reservation, ReservationStatus};
use crate::domain::DomainResult;

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Insert a `pending` reservation. A second active reservation for the
    /// same user violates a storage-level unique index and surfaces as
    /// `DomainError::Conflict`.
    async fn insert(&self, reservation: NewReservation) -> DomainResult<Reservation>;

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Reservation>>;

    /// The user's reservation in `pending` or `confirmed`, if any
    async fn find_active_for_user(&self, user_id: &str) -> DomainResult<Option<Reservation>>;

    /// The reservation in `pending` or `confirmed` holding a vehicle, if any
    async fn find_active_for_vehicle(&self, vehicle_id: i32) -> DomainResult<Option<Reservation>>;

    /// All reservations of a user, newest first
    async fn find_for_user(&self, user_id: &str) -> DomainResult<Vec<Reservation>>;

    /// Conditional status write; returns rows updated (0 or 1)
    async fn update_status(
        &self,
        id: i32,
        expected: &[ReservationStatus],
        to: ReservationStatus,
    ) -> DomainResult<u64>;

    /// Mark an active reservation cancelled; returns rows updated (0 or 1)
    async fn cancel(
        &self,
        id: i32,
        reason: Option<String>,
        cancelled_by: Option<String>,
    ) -> DomainResult<u64>;

    /// `pending` reservations whose start time is before `started_before`
    async fn find_overdue_pending(
        &self,
        started_before: DateTime<Utc>,
    ) -> DomainResult<Vec<Reservation>>;
}
