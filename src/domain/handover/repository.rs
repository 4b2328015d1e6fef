//! Handover repository interface

use async_trait::async_trait;

use super::model::{Handover, NewHandover};
use crate::domain::DomainResult;

/// Handovers are append-only; there is no update method by construction.
#[async_trait]
pub trait HandoverRepository: Send + Sync {
    async fn insert(&self, handover: NewHandover) -> DomainResult<Handover>;

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Handover>>;

    /// Handovers of a rental, oldest first
    async fn find_by_rental(&self, rental_id: i32) -> DomainResult<Vec<Handover>>;

    async fn find_by_reservation(&self, reservation_id: i32) -> DomainResult<Vec<Handover>>;
}
