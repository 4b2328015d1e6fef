//! Vehicle availability state
//!
//! Read access plus the guarded status write every other service goes
//! through. Each successful write appends an audit row.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::domain::vehicle::{NewVehicle, Vehicle, VehicleStatus, VehicleStatusChange};
use crate::domain::{DomainError, DomainResult, Repositories, RepositoryProvider};

/// Conditionally move `vehicle_id` to `to`.
///
/// Only applies when the current status is in `expected` (any status when
/// `expected` is empty). Returns `false` when the vehicle was in some other
/// status, which is how callers detect a lost race. Legality against the
/// transition table is the caller's responsibility.
pub async fn transition<R: Repositories + ?Sized>(
    repos: &R,
    vehicle_id: i32,
    expected: &[VehicleStatus],
    to: VehicleStatus,
    reason: &str,
    actor: &str,
) -> DomainResult<bool> {
    let current = repos
        .vehicles()
        .find_by_id(vehicle_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Vehicle", "id", vehicle_id))?;

    if !expected.is_empty() && !expected.contains(&current.status) {
        return Ok(false);
    }
    if current.status == to {
        return Ok(true);
    }

    let updated = repos
        .vehicles()
        .update_status(vehicle_id, &[current.status], to)
        .await?;
    if updated == 0 {
        return Ok(false);
    }

    repos
        .vehicles()
        .record_status_change(VehicleStatusChange {
            vehicle_id,
            from_status: current.status,
            to_status: to,
            reason: reason.to_string(),
            actor: actor.to_string(),
            changed_at: Utc::now(),
        })
        .await?;

    Ok(true)
}

/// `pending` and `rented` belong to the booking flow. Moving a vehicle out
/// of either is a `Conflict` while an active reservation or an open rental
/// still holds it.
pub async fn ensure_not_held<R: Repositories + ?Sized>(
    repos: &R,
    vehicle_id: i32,
    from: VehicleStatus,
    to: VehicleStatus,
) -> DomainResult<()> {
    if from == to || !matches!(from, VehicleStatus::Pending | VehicleStatus::Rented) {
        return Ok(());
    }
    if let Some(reservation) = repos.reservations().find_active_for_vehicle(vehicle_id).await? {
        return Err(DomainError::Conflict(format!(
            "Vehicle {} is held by reservation {}",
            vehicle_id, reservation.id
        )));
    }
    if let Some(rental) = repos.rentals().find_open_for_vehicle(vehicle_id).await? {
        return Err(DomainError::Conflict(format!(
            "Vehicle {} is held by rental {}",
            vehicle_id, rental.id
        )));
    }
    Ok(())
}

pub struct VehicleAvailability {
    repos: Arc<dyn RepositoryProvider>,
}

impl VehicleAvailability {
    pub fn new(repos: Arc<dyn RepositoryProvider>) -> Self {
        Self { repos }
    }

    pub async fn current(&self, vehicle_id: i32) -> DomainResult<Vehicle> {
        self.repos
            .vehicles()
            .find_by_id(vehicle_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Vehicle", "id", vehicle_id))
    }

    pub async fn register(&self, vehicle: NewVehicle) -> DomainResult<Vehicle> {
        if vehicle.model.trim().is_empty() {
            return Err(DomainError::Validation("model is required".into()));
        }
        if !(0..=100).contains(&vehicle.battery_level) {
            return Err(DomainError::Validation(
                "battery_level must be between 0 and 100".into(),
            ));
        }
        if vehicle.mileage < 0 {
            return Err(DomainError::Validation("mileage must not be negative".into()));
        }

        let vehicle = self.repos.vehicles().insert(vehicle).await?;
        info!(vehicle_id = vehicle.id, station_id = vehicle.station_id, "Vehicle registered");
        Ok(vehicle)
    }

    pub async fn history(&self, vehicle_id: i32) -> DomainResult<Vec<VehicleStatusChange>> {
        self.current(vehicle_id).await?;
        self.repos.vehicles().status_history(vehicle_id).await
    }

    /// Manual status change by staff, e.g. sending a vehicle to maintenance.
    /// Unknown status names are rejected, as are moves the transition table
    /// does not allow and moves that would free a vehicle a booking holds.
    pub async fn set_status(
        &self,
        vehicle_id: i32,
        status: &str,
        reason: &str,
        actor: &str,
    ) -> DomainResult<Vehicle> {
        let to: VehicleStatus = status.parse()?;

        let uow = self.repos.begin().await?;
        let vehicle = uow
            .vehicles()
            .find_by_id(vehicle_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Vehicle", "id", vehicle_id))?;

        if !vehicle.status.can_transition_to(to) {
            return Err(DomainError::Conflict(format!(
                "Vehicle {} cannot move from {} to {}",
                vehicle_id, vehicle.status, to
            )));
        }
        ensure_not_held(&*uow, vehicle_id, vehicle.status, to).await?;
        if !transition(&*uow, vehicle_id, &[vehicle.status], to, reason, actor).await? {
            return Err(DomainError::Conflict(format!(
                "Vehicle {} status changed concurrently",
                vehicle_id
            )));
        }
        uow.commit().await?;

        info!(vehicle_id, from = %vehicle.status, to = %to, actor, "Vehicle status set");
        self.current(vehicle_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestEnv;

    #[tokio::test]
    async fn manual_status_change_is_audited() {
        let env = TestEnv::new().await;
        let vehicle = env.vehicle().await;

        let updated = env
            .services
            .vehicles
            .set_status(vehicle.id, "maintenance", "brake check", "staff-1")
            .await
            .unwrap();
        assert_eq!(updated.status, VehicleStatus::Maintenance);

        let history = env.services.vehicles.history(vehicle.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].from_status, VehicleStatus::Available);
        assert_eq!(history[0].to_status, VehicleStatus::Maintenance);
        assert_eq!(history[0].actor, "staff-1");
    }

    #[tokio::test]
    async fn unknown_status_is_validation_error() {
        let env = TestEnv::new().await;
        let vehicle = env.vehicle().await;

        let err = env
            .services
            .vehicles
            .set_status(vehicle.id, "flying", "", "staff-1")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn illegal_transition_is_conflict() {
        let env = TestEnv::new().await;
        let vehicle = env.vehicle().await;

        let err = env
            .services
            .vehicles
            .set_status(vehicle.id, "rented", "", "staff-1")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(
            env.services.vehicles.current(vehicle.id).await.unwrap().status,
            VehicleStatus::Available
        );
    }

    #[tokio::test]
    async fn held_vehicle_cannot_be_freed_by_hand() {
        let env = TestEnv::new().await;
        let reservation = env.reservation("cust-1").await;
        let vehicles = &env.services.vehicles;

        for status in ["available", "maintenance"] {
            let err = vehicles
                .set_status(reservation.vehicle_id, status, "", "staff-1")
                .await
                .unwrap_err();
            assert!(matches!(err, DomainError::Conflict(_)), "{}: {:?}", status, err);
        }
        assert_eq!(
            vehicles.current(reservation.vehicle_id).await.unwrap().status,
            VehicleStatus::Pending
        );
        assert_eq!(env.status_writes(reservation.vehicle_id).await, 1);

        let vehicle = vehicles.current(reservation.vehicle_id).await.unwrap();
        let err = env
            .services
            .reservations
            .create(env.new_reservation("cust-2", &vehicle))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn released_vehicle_can_leave_pending_by_hand() {
        let env = TestEnv::new().await;
        let reservation = env.reservation("cust-1").await;
        env.services
            .reservations
            .cancel(reservation.id, None, Some("cust-1".into()))
            .await
            .unwrap();

        let updated = env
            .services
            .vehicles
            .set_status(reservation.vehicle_id, "maintenance", "tyre change", "staff-1")
            .await
            .unwrap();
        assert_eq!(updated.status, VehicleStatus::Maintenance);
    }

    #[tokio::test]
    async fn register_rejects_bad_battery() {
        let env = TestEnv::new().await;
        let err = env
            .services
            .vehicles
            .register(NewVehicle {
                station_id: 1,
                model: "VF e34".into(),
                battery_level: 140,
                mileage: 0,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn transition_reports_lost_race() {
        let env = TestEnv::new().await;
        let vehicle = env.vehicle().await;

        let moved = transition(
            env.repos.as_ref(),
            vehicle.id,
            &[VehicleStatus::Pending],
            VehicleStatus::Rented,
            "test",
            "system",
        )
        .await
        .unwrap();
        assert!(!moved);
        assert!(env.repos.vehicles().status_history(vehicle.id).await.unwrap().is_empty());
    }
}
