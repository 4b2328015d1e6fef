//! Handover recorder
//!
//! Records pickup/return/qc inspections, resolves (or backfills) the rental
//! they belong to, applies the vehicle status effects and asks the
//! reconciler for pending fee entries.

use std::sync::Arc;

use chrono::{Duration, Utc};
use metrics::counter;
use tracing::{info, warn};

use super::notify_best_effort;
use super::reconciler::ensure_pending_fee_in;
use super::vehicle_state::{ensure_not_held, transition};
use crate::domain::handover::{
    Condition, Damage, FeeBreakdown, FeeInputs, Handover, HandoverType, NewHandover,
};
use crate::domain::ledger::FeeType;
use crate::domain::ports::{Notification, Notifier};
use crate::domain::rental::{NewRental, Rental, RentalStatus};
use crate::domain::reservation::{Reservation, ReservationStatus};
use crate::domain::vehicle::{ConditionUpdate, VehicleStatus};
use crate::domain::{DomainError, DomainResult, RepositoryProvider, UnitOfWork};

#[derive(Debug, Clone)]
pub struct HandoverRequest {
    pub reservation_id: Option<i32>,
    pub rental_id: Option<i32>,
    /// Only needed for a qc handover that names neither rental nor reservation
    pub vehicle_id: Option<i32>,
    pub handover_type: HandoverType,
    pub staff_id: String,
    pub condition: Condition,
    pub damages: Vec<Damage>,
    pub image_urls: Vec<String>,
    pub late_fee: Option<i64>,
    pub damage_fee: Option<i64>,
    pub deposit: i64,
    /// Status the staff member asks for; damage on return overrides it
    pub requested_status: Option<VehicleStatus>,
    pub clear_damages: bool,
    pub return_station_id: Option<i32>,
}

impl HandoverRequest {
    pub fn new(handover_type: HandoverType, staff_id: impl Into<String>) -> Self {
        Self {
            reservation_id: None,
            rental_id: None,
            vehicle_id: None,
            handover_type,
            staff_id: staff_id.into(),
            condition: Condition::default(),
            damages: Vec::new(),
            image_urls: Vec::new(),
            late_fee: None,
            damage_fee: None,
            deposit: 0,
            requested_status: None,
            clear_damages: false,
            return_station_id: None,
        }
    }

    fn validate(&self) -> DomainResult<()> {
        if self.staff_id.trim().is_empty() {
            return Err(DomainError::Validation("staffId is required".to_string()));
        }
        let linked = self.reservation_id.is_some() || self.rental_id.is_some();
        match self.handover_type {
            HandoverType::Qc if !linked && self.vehicle_id.is_none() => Err(DomainError::Validation(
                "qc handover needs a reservationId, rentalId or vehicleId".to_string(),
            )),
            HandoverType::Pickup | HandoverType::Return if !linked => Err(DomainError::Validation(
                "reservationId or rentalId is required".to_string(),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HandoverOutcome {
    pub handover: Handover,
    pub rental_id: Option<i32>,
    /// `None` when the handover left the vehicle status untouched
    pub vehicle_status: Option<VehicleStatus>,
    /// Fee types for which a new pending ledger entry was created
    pub fees_created: Vec<FeeType>,
}

pub struct HandoverService {
    repos: Arc<dyn RepositoryProvider>,
    notifier: Arc<dyn Notifier>,
    late_fee_per_hour: i64,
    grace_minutes: i64,
    backfill_window: Duration,
}

impl HandoverService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        notifier: Arc<dyn Notifier>,
        late_fee_per_hour: i64,
        grace_minutes: i64,
        backfill_days: i64,
    ) -> Self {
        Self {
            repos,
            notifier,
            late_fee_per_hour,
            grace_minutes,
            backfill_window: Duration::days(backfill_days),
        }
    }

    pub async fn record(&self, request: HandoverRequest) -> DomainResult<HandoverOutcome> {
        request.validate()?;
        let now = Utc::now();

        let uow = self.repos.begin().await?;

        let mut reservation = match request.reservation_id {
            Some(id) => Some(
                uow.reservations()
                    .find_by_id(id)
                    .await?
                    .ok_or_else(|| DomainError::not_found("Reservation", "id", id))?,
            ),
            None => None,
        };
        let rental = self
            .resolve_rental(&*uow, &request, &mut reservation)
            .await?;

        let vehicle_id = request
            .vehicle_id
            .or(rental.as_ref().map(|r| r.vehicle_id))
            .or(reservation.as_ref().map(|r| r.vehicle_id))
            .ok_or_else(|| DomainError::Validation("Cannot resolve vehicle".to_string()))?;

        let fees = FeeBreakdown::compute(&FeeInputs {
            handover_type: request.handover_type,
            late_fee: request.late_fee,
            damage_fee: request.damage_fee,
            damages: &request.damages,
            deposit: request.deposit,
            scheduled_end: reservation.as_ref().map(|r| r.end_time),
            returned_at: now,
            late_fee_per_hour: self.late_fee_per_hour,
            grace_minutes: self.grace_minutes,
        })?;

        let handover = uow
            .handovers()
            .insert(NewHandover {
                rental_id: rental.as_ref().map(|r| r.id),
                reservation_id: reservation.as_ref().map(|r| r.id),
                vehicle_id: Some(vehicle_id),
                staff_id: request.staff_id.clone(),
                handover_type: request.handover_type,
                condition: request.condition.clone(),
                damages: request.damages.clone(),
                image_urls: request.image_urls.clone(),
                fees,
                clear_damages: request.clear_damages,
            })
            .await?;

        let vehicle_status = self
            .apply_status_effects(
                &*uow,
                &request,
                &handover,
                vehicle_id,
                rental.as_ref(),
                reservation.as_ref(),
            )
            .await?;

        let update = condition_update(&request.condition);
        if !update.is_empty() {
            uow.vehicles().update_condition(vehicle_id, update).await?;
        }

        let mut fees_created = Vec::new();
        if let Some(reservation) = &reservation {
            for (fee, amount) in [
                (FeeType::LateFee, fees.late_fee),
                (FeeType::DamageFee, fees.damage_fee),
            ] {
                if amount > 0
                    && ensure_pending_fee_in(&*uow, reservation.id, fee, amount)
                        .await?
                        .is_some()
                {
                    fees_created.push(fee);
                }
            }
        }
        uow.commit().await?;

        counter!("handovers_recorded_total", "type" => request.handover_type.as_str()).increment(1);
        info!(
            handover_id = handover.id,
            handover_type = %request.handover_type,
            rental_id = ?handover.rental_id,
            vehicle_id,
            total_due = fees.total_due,
            "Handover recorded"
        );

        if let Some(reservation) = &reservation {
            for fee in &fees_created {
                let amount = match fee {
                    FeeType::LateFee => fees.late_fee,
                    FeeType::DamageFee => fees.damage_fee,
                };
                notify_best_effort(
                    self.notifier.as_ref(),
                    Notification::FeeAssessed {
                        user_id: reservation.user_id.clone(),
                        reservation_id: reservation.id,
                        fee_type: fee.as_str().to_string(),
                        amount,
                        instructions: payment_instructions(reservation.id, *fee),
                    },
                )
                .await;
            }
        }

        Ok(HandoverOutcome {
            rental_id: handover.rental_id,
            handover,
            vehicle_status,
            fees_created,
        })
    }

    pub async fn get(&self, id: i32) -> DomainResult<Handover> {
        self.repos
            .handovers()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Handover", "id", id))
    }

    pub async fn list_for_rental(&self, rental_id: i32) -> DomainResult<Vec<Handover>> {
        self.repos.handovers().find_by_rental(rental_id).await
    }

    /// Direct id, then the reservation's own rental, then a recent unlinked
    /// rental of the same user and vehicle, then a fresh one.
    async fn resolve_rental(
        &self,
        uow: &dyn UnitOfWork,
        request: &HandoverRequest,
        reservation: &mut Option<Reservation>,
    ) -> DomainResult<Option<Rental>> {
        if let Some(rental_id) = request.rental_id {
            let mut rental = uow
                .rentals()
                .find_by_id(rental_id)
                .await?
                .ok_or_else(|| DomainError::not_found("Rental", "id", rental_id))?;

            match (rental.reservation_id, reservation.as_ref()) {
                (Some(linked), Some(r)) if linked != r.id => {
                    return Err(DomainError::Validation(format!(
                        "Rental {} belongs to reservation {}, not {}",
                        rental.id, linked, r.id
                    )));
                }
                (None, Some(r)) => {
                    uow.rentals().link_reservation(rental.id, r.id).await?;
                    rental.reservation_id = Some(r.id);
                }
                (Some(linked), None) => {
                    *reservation = uow.reservations().find_by_id(linked).await?;
                }
                _ => {}
            }
            return Ok(Some(rental));
        }

        let Some(r) = reservation.as_ref() else {
            return Ok(None);
        };

        if let Some(rental) = uow.rentals().find_by_reservation(r.id).await? {
            return Ok(Some(rental));
        }

        let candidates = uow
            .rentals()
            .find_unlinked_for_user_vehicle(&r.user_id, r.vehicle_id, Utc::now() - self.backfill_window)
            .await?;
        if let Some(mut rental) = candidates.first().cloned() {
            if candidates.len() > 1 {
                warn!(
                    reservation_id = r.id,
                    candidates = candidates.len(),
                    chosen = rental.id,
                    "Ambiguous rental match, using most recent"
                );
            }
            if uow.rentals().link_reservation(rental.id, r.id).await? == 0 {
                return Err(DomainError::Conflict(format!(
                    "Rental {} was linked concurrently",
                    rental.id
                )));
            }
            info!(reservation_id = r.id, rental_id = rental.id, "Rental matched by user and vehicle");
            rental.reservation_id = Some(r.id);
            return Ok(Some(rental));
        }

        // a backfilled return rental is closed by the return itself
        let status = match request.handover_type {
            HandoverType::Pickup | HandoverType::Return => RentalStatus::Ongoing,
            HandoverType::Qc => RentalStatus::Completed,
        };
        let rental = uow
            .rentals()
            .insert(NewRental::from_reservation(r, status))
            .await?;
        warn!(
            reservation_id = r.id,
            rental_id = rental.id,
            status = %status,
            "No rental found for handover, backfilled from reservation"
        );
        Ok(Some(rental))
    }

    async fn apply_status_effects(
        &self,
        uow: &dyn UnitOfWork,
        request: &HandoverRequest,
        handover: &Handover,
        vehicle_id: i32,
        rental: Option<&Rental>,
        reservation: Option<&Reservation>,
    ) -> DomainResult<Option<VehicleStatus>> {
        let current = uow
            .vehicles()
            .find_by_id(vehicle_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Vehicle", "id", vehicle_id))?
            .status;
        let reason = format!("{} handover {}", request.handover_type, handover.id);
        let requested = request.requested_status;

        let target = match request.handover_type {
            HandoverType::Pickup => {
                if let Some(rental) = rental {
                    uow.rentals()
                        .update_status(
                            rental.id,
                            &[RentalStatus::Pending, RentalStatus::Ongoing],
                            RentalStatus::Ongoing,
                        )
                        .await?;
                }
                if let Some(r) = reservation {
                    uow.reservations()
                        .update_status(
                            r.id,
                            &[ReservationStatus::Pending, ReservationStatus::Confirmed],
                            ReservationStatus::Confirmed,
                        )
                        .await?;
                }
                if let Some(other) = requested.filter(|s| *s != VehicleStatus::Rented) {
                    return Err(DomainError::Validation(format!(
                        "A pickup leaves the vehicle rented, not {}",
                        other
                    )));
                }
                let target = VehicleStatus::Rented;
                if !current.can_transition_to(target) {
                    return Err(DomainError::Conflict(format!(
                        "Vehicle {} cannot go from {} to {}",
                        vehicle_id, current, target
                    )));
                }
                target
            }
            HandoverType::Return => {
                return self
                    .apply_return(uow, request, handover, vehicle_id, rental, reservation)
                    .await;
            }
            HandoverType::Qc => {
                let maintenance = requested == Some(VehicleStatus::Maintenance);
                let target = if request.clear_damages {
                    if maintenance {
                        VehicleStatus::Maintenance
                    } else {
                        VehicleStatus::Available
                    }
                } else if current == VehicleStatus::AwaitingProcessing {
                    if maintenance {
                        VehicleStatus::Maintenance
                    } else {
                        current
                    }
                } else {
                    requested.unwrap_or(current)
                };
                if !current.can_transition_to(target) {
                    return Err(DomainError::Conflict(format!(
                        "Vehicle {} cannot go from {} to {}",
                        vehicle_id, current, target
                    )));
                }
                ensure_not_held(uow, vehicle_id, current, target).await?;
                target
            }
        };

        let moved = transition(uow, vehicle_id, &[current], target, &reason, &request.staff_id).await?;
        if !moved {
            return Err(DomainError::Conflict(format!(
                "Vehicle {} changed status during handover",
                vehicle_id
            )));
        }
        Ok(Some(target))
    }

    /// Closes the rental and reservation. The vehicle only moves when this
    /// return is what releases it: the booking was still open and the
    /// vehicle is pending or rented. `None` means the status was left alone.
    async fn apply_return(
        &self,
        uow: &dyn UnitOfWork,
        request: &HandoverRequest,
        handover: &Handover,
        vehicle_id: i32,
        rental: Option<&Rental>,
        reservation: Option<&Reservation>,
    ) -> DomainResult<Option<VehicleStatus>> {
        let damaged = handover.fees.damage_fee > 0 || !handover.damages.is_empty();
        let requested = request.requested_status;
        let target = if damaged {
            if let Some(asked) = requested.filter(|s| *s != VehicleStatus::AwaitingProcessing) {
                warn!(
                    vehicle_id,
                    requested = %asked,
                    damage_fee = handover.fees.damage_fee,
                    "Damaged return, forcing awaiting_processing"
                );
            }
            VehicleStatus::AwaitingProcessing
        } else {
            match requested {
                None | Some(VehicleStatus::Available) => VehicleStatus::Available,
                Some(VehicleStatus::Maintenance) => VehicleStatus::Maintenance,
                Some(other) => {
                    return Err(DomainError::Validation(format!(
                        "A return can leave the vehicle available or in maintenance, not {}",
                        other
                    )));
                }
            }
        };

        let rental_open = match rental {
            Some(rental) => {
                uow.rentals()
                    .complete(rental.id, handover.created_at, request.return_station_id)
                    .await?
                    > 0
            }
            None => true,
        };
        let reservation_open = match reservation {
            Some(r) => {
                uow.reservations()
                    .update_status(
                        r.id,
                        &[ReservationStatus::Pending, ReservationStatus::Confirmed],
                        ReservationStatus::Completed,
                    )
                    .await?
                    > 0
            }
            None => true,
        };

        if !(rental_open && reservation_open) {
            info!(
                vehicle_id,
                handover_id = handover.id,
                "Return for a closed booking, vehicle status left unchanged"
            );
            return Ok(None);
        }

        let reason = format!("{} handover {}", request.handover_type, handover.id);
        let held = [VehicleStatus::Rented, VehicleStatus::Pending];
        if !transition(uow, vehicle_id, &held, target, &reason, &request.staff_id).await? {
            warn!(
                vehicle_id,
                handover_id = handover.id,
                "Returned vehicle is not pending or rented, status left unchanged"
            );
            return Ok(None);
        }
        Ok(Some(target))
    }
}

fn condition_update(condition: &Condition) -> ConditionUpdate {
    let notes: Vec<String> = [
        ("exterior", &condition.exterior),
        ("interior", &condition.interior),
        ("tires", &condition.tires),
        ("notes", &condition.notes),
    ]
    .into_iter()
    .filter_map(|(label, value)| value.as_ref().map(|v| format!("{}: {}", label, v)))
    .collect();

    ConditionUpdate {
        battery_level: condition.battery_level,
        mileage: condition.mileage,
        notes: (!notes.is_empty()).then(|| notes.join("; ")),
    }
}

fn payment_instructions(reservation_id: i32, fee: FeeType) -> String {
    format!(
        "A {} was recorded for reservation {}. Pay it from your wallet or by card \
         in the app under Reservations > {} > Payments.",
        fee.as_str().replace('_', " "),
        reservation_id,
        reservation_id
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ledger::{PaymentStatus, TransactionType};
    use crate::test_support::TestEnv;

    fn damaged_return(reservation_id: i32, damage_fee: i64) -> HandoverRequest {
        let mut request = HandoverRequest::new(HandoverType::Return, "staff-1");
        request.reservation_id = Some(reservation_id);
        request.damage_fee = Some(damage_fee);
        request.late_fee = Some(0);
        request
    }

    fn clean_return(reservation_id: i32) -> HandoverRequest {
        let mut request = HandoverRequest::new(HandoverType::Return, "staff-1");
        request.reservation_id = Some(reservation_id);
        request.late_fee = Some(0);
        request
    }

    #[tokio::test]
    async fn non_qc_needs_a_reference() {
        let env = TestEnv::new().await;
        let err = env
            .services
            .handovers
            .record(HandoverRequest::new(HandoverType::Return, "staff-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn duplicate_damage_fee_creates_one_pending_entry() {
        let env = TestEnv::new().await;
        let reservation = env.reservation("cust-1").await;
        let handovers = &env.services.handovers;

        let first = handovers.record(damaged_return(reservation.id, 200_000)).await.unwrap();
        let second = handovers.record(damaged_return(reservation.id, 200_000)).await.unwrap();
        assert_eq!(first.fees_created, vec![FeeType::DamageFee]);
        assert!(second.fees_created.is_empty());
        assert_eq!(first.rental_id, second.rental_id);

        let pending: Vec<_> = env
            .services
            .ledger
            .ledger_for_reservation(reservation.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|e| {
                e.transaction_type == TransactionType::DamageFee && e.status == PaymentStatus::Pending
            })
            .collect();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].amount, 200_000);
        assert_eq!(pending[0].user_id, "cust-1");
    }

    #[tokio::test]
    async fn lifecycle_damaged_return_then_qc_clear() {
        let env = TestEnv::new().await;
        let reservation = env.reservation("cust-1").await;
        let vehicles = &env.services.vehicles;
        assert_eq!(
            vehicles.current(reservation.vehicle_id).await.unwrap().status,
            VehicleStatus::Pending
        );

        let token = env.services.pickup.generate_token(reservation.id).await.unwrap();
        env.services.pickup.redeem_token(&token.payload).await.unwrap();
        assert_eq!(
            vehicles.current(reservation.vehicle_id).await.unwrap().status,
            VehicleStatus::Rented
        );

        let mut request = damaged_return(reservation.id, 50_000);
        request.requested_status = Some(VehicleStatus::Available);
        let returned = env.services.handovers.record(request).await.unwrap();
        assert_eq!(returned.vehicle_status, Some(VehicleStatus::AwaitingProcessing));
        assert_eq!(returned.rental_id, Some(token.rental_id));
        assert_eq!(returned.handover.fees.total_due, 50_000);

        let rental = env.repos.rentals().find_by_id(token.rental_id).await.unwrap().unwrap();
        assert_eq!(rental.status, RentalStatus::Completed);
        assert_eq!(
            env.services.reservations.get(reservation.id).await.unwrap().status,
            ReservationStatus::Completed
        );

        let mut qc = HandoverRequest::new(HandoverType::Qc, "staff-2");
        qc.reservation_id = Some(reservation.id);
        qc.clear_damages = true;
        let cleared = env.services.handovers.record(qc).await.unwrap();
        assert_eq!(cleared.vehicle_status, Some(VehicleStatus::Available));
        assert_eq!(
            vehicles.current(reservation.vehicle_id).await.unwrap().status,
            VehicleStatus::Available
        );
    }

    #[tokio::test]
    async fn repeat_return_does_not_free_a_rebooked_vehicle() {
        let env = TestEnv::new().await;
        let first = env.reservation("cust-1").await;
        let vehicle_id = first.vehicle_id;
        let token = env.services.pickup.generate_token(first.id).await.unwrap();
        env.services.pickup.redeem_token(&token.payload).await.unwrap();

        let returned = env.services.handovers.record(clean_return(first.id)).await.unwrap();
        assert_eq!(returned.vehicle_status, Some(VehicleStatus::Available));

        let vehicle = env.services.vehicles.current(vehicle_id).await.unwrap();
        let second = env
            .services
            .reservations
            .create(env.new_reservation("cust-2", &vehicle))
            .await
            .unwrap();
        let writes = env.status_writes(vehicle_id).await;

        let mut correction = clean_return(first.id);
        correction.requested_status = Some(VehicleStatus::Available);
        let outcome = env.services.handovers.record(correction).await.unwrap();
        assert_eq!(outcome.vehicle_status, None);
        assert_eq!(outcome.rental_id, Some(token.rental_id));

        assert_eq!(
            env.services.vehicles.current(vehicle_id).await.unwrap().status,
            VehicleStatus::Pending
        );
        assert_eq!(env.status_writes(vehicle_id).await, writes);
        assert_eq!(
            env.services.reservations.get(second.id).await.unwrap().status,
            ReservationStatus::Pending
        );

        let vehicle = env.services.vehicles.current(vehicle_id).await.unwrap();
        let err = env
            .services
            .reservations
            .create(env.new_reservation("cust-3", &vehicle))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn clean_return_after_damaged_return_keeps_vehicle_for_qc() {
        let env = TestEnv::new().await;
        let reservation = env.reservation("cust-1").await;
        let token = env.services.pickup.generate_token(reservation.id).await.unwrap();
        env.services.pickup.redeem_token(&token.payload).await.unwrap();

        let damaged = env
            .services
            .handovers
            .record(damaged_return(reservation.id, 30_000))
            .await
            .unwrap();
        assert_eq!(damaged.vehicle_status, Some(VehicleStatus::AwaitingProcessing));

        let mut again = clean_return(reservation.id);
        again.requested_status = Some(VehicleStatus::Available);
        let outcome = env.services.handovers.record(again).await.unwrap();
        assert_eq!(outcome.vehicle_status, None);
        assert_eq!(
            env.services.vehicles.current(reservation.vehicle_id).await.unwrap().status,
            VehicleStatus::AwaitingProcessing
        );
    }

    #[tokio::test]
    async fn clean_return_rejects_booking_statuses() {
        let env = TestEnv::new().await;
        let reservation = env.reservation("cust-1").await;

        for status in [VehicleStatus::Pending, VehicleStatus::Rented] {
            let mut request = clean_return(reservation.id);
            request.requested_status = Some(status);
            let err = env.services.handovers.record(request).await.unwrap_err();
            assert!(matches!(err, DomainError::Validation(_)), "{}: {:?}", status, err);
        }
        assert_eq!(
            env.services.reservations.get(reservation.id).await.unwrap().status,
            ReservationStatus::Pending
        );
        assert_eq!(
            env.services.vehicles.current(reservation.vehicle_id).await.unwrap().status,
            VehicleStatus::Pending
        );
    }

    #[tokio::test]
    async fn pickup_only_rents() {
        let env = TestEnv::new().await;
        let reservation = env.reservation("cust-1").await;

        let mut request = HandoverRequest::new(HandoverType::Pickup, "staff-1");
        request.reservation_id = Some(reservation.id);
        request.requested_status = Some(VehicleStatus::Available);
        let err = env.services.handovers.record(request).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(
            env.services.vehicles.current(reservation.vehicle_id).await.unwrap().status,
            VehicleStatus::Pending
        );
    }

    #[tokio::test]
    async fn qc_cannot_free_a_held_vehicle() {
        let env = TestEnv::new().await;
        let reservation = env.reservation("cust-1").await;

        let mut qc = HandoverRequest::new(HandoverType::Qc, "staff-2");
        qc.vehicle_id = Some(reservation.vehicle_id);
        qc.clear_damages = true;
        let err = env.services.handovers.record(qc).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        assert_eq!(
            env.services.vehicles.current(reservation.vehicle_id).await.unwrap().status,
            VehicleStatus::Pending
        );
    }

    #[tokio::test]
    async fn qc_without_clearing_keeps_vehicle_blocked() {
        let env = TestEnv::new().await;
        let reservation = env.reservation("cust-1").await;
        let token = env.services.pickup.generate_token(reservation.id).await.unwrap();
        env.services.pickup.redeem_token(&token.payload).await.unwrap();
        env.services
            .handovers
            .record(damaged_return(reservation.id, 10_000))
            .await
            .unwrap();

        let mut qc = HandoverRequest::new(HandoverType::Qc, "staff-2");
        qc.vehicle_id = Some(reservation.vehicle_id);
        qc.requested_status = Some(VehicleStatus::Available);
        let outcome = env.services.handovers.record(qc).await.unwrap();
        assert_eq!(outcome.vehicle_status, Some(VehicleStatus::AwaitingProcessing));
        assert!(outcome.rental_id.is_none());
    }

    #[tokio::test]
    async fn return_without_rental_backfills_completed_rental() {
        let env = TestEnv::new().await;
        let reservation = env.reservation("cust-1").await;

        let mut request = HandoverRequest::new(HandoverType::Return, "staff-1");
        request.reservation_id = Some(reservation.id);
        request.late_fee = Some(0);
        let outcome = env.services.handovers.record(request).await.unwrap();

        let rental_id = outcome.rental_id.expect("backfilled rental");
        let rental = env.repos.rentals().find_by_id(rental_id).await.unwrap().unwrap();
        assert_eq!(rental.reservation_id, Some(reservation.id));
        assert_eq!(rental.status, RentalStatus::Completed);
        assert!(outcome.fees_created.is_empty());
        assert_eq!(outcome.vehicle_status, Some(VehicleStatus::Available));
    }

    #[tokio::test]
    async fn unlinked_rental_is_matched_and_linked() {
        let env = TestEnv::new().await;
        let reservation = env.reservation("cust-1").await;
        let legacy = env
            .repos
            .rentals()
            .insert(NewRental {
                reservation_id: None,
                ..NewRental::from_reservation(&reservation, RentalStatus::Ongoing)
            })
            .await
            .unwrap();

        let mut request = HandoverRequest::new(HandoverType::Return, "staff-1");
        request.reservation_id = Some(reservation.id);
        request.late_fee = Some(0);
        let outcome = env.services.handovers.record(request).await.unwrap();

        assert_eq!(outcome.rental_id, Some(legacy.id));
        let rental = env.repos.rentals().find_by_id(legacy.id).await.unwrap().unwrap();
        assert_eq!(rental.reservation_id, Some(reservation.id));
        assert_eq!(env.services.handovers.list_for_rental(legacy.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn late_return_charges_started_hours() {
        let env = TestEnv::new().await;
        let vehicle = env.vehicle().await;
        let mut new = env.new_reservation("cust-1", &vehicle);
        new.start_time = Utc::now() - Duration::hours(5);
        new.end_time = Utc::now() - Duration::hours(2);
        let reservation = env.services.reservations.create(new).await.unwrap();

        let mut request = HandoverRequest::new(HandoverType::Return, "staff-1");
        request.reservation_id = Some(reservation.id);
        let outcome = env.services.handovers.record(request).await.unwrap();

        // two hours late, minus the grace window, rounds up to two hours
        assert_eq!(outcome.handover.fees.late_fee, 2 * TestEnv::LATE_FEE_PER_HOUR);
        assert_eq!(outcome.fees_created, vec![FeeType::LateFee]);
    }

    #[tokio::test]
    async fn handover_condition_reaches_vehicle() {
        let env = TestEnv::new().await;
        let reservation = env.reservation("cust-1").await;

        let mut request = HandoverRequest::new(HandoverType::Pickup, "staff-1");
        request.reservation_id = Some(reservation.id);
        request.condition.battery_level = Some(64);
        request.condition.exterior = Some("scratch on left door".into());
        let outcome = env.services.handovers.record(request).await.unwrap();
        assert_eq!(outcome.vehicle_status, Some(VehicleStatus::Rented));

        let vehicle = env.services.vehicles.current(reservation.vehicle_id).await.unwrap();
        assert_eq!(vehicle.battery_level, 64);
        assert_eq!(
            vehicle.condition_notes.as_deref(),
            Some("exterior: scratch on left door")
        );

        let stored = env.services.handovers.get(outcome.handover.id).await.unwrap();
        assert_eq!(stored.condition.battery_level, Some(64));
    }
}
