//! Vehicle repository interface

use async_trait::async_trait;

use super::model::{ConditionUpdate, NewVehicle, Vehicle, VehicleStatus, VehicleStatusChange};
use crate::domain::DomainResult;

#[async_trait]
pub trait VehicleRepository: Send + Sync {
    async fn insert(&self, vehicle: NewVehicle) -> DomainResult<Vehicle>;

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Vehicle>>;

    /// Conditional status write. Only rows whose current status is in
    /// `expected` are touched; an empty `expected` matches any status.
    /// Returns the number of rows updated (0 or 1).
    async fn update_status(
        &self,
        id: i32,
        expected: &[VehicleStatus],
        to: VehicleStatus,
    ) -> DomainResult<u64>;

    async fn update_condition(&self, id: i32, update: ConditionUpdate) -> DomainResult<()>;

    async fn record_status_change(&self, change: VehicleStatusChange) -> DomainResult<()>;

    /// Status history, oldest first
    async fn status_history(&self, vehicle_id: i32) -> DomainResult<Vec<VehicleStatusChange>>;
}
