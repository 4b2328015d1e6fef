//! Reservation manager
//!
//! Creation holds the vehicle; cancellation releases it and hands off to
//! the reconciler for the wallet refund.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use tracing::{error, info, warn};

use super::notify_best_effort;
use super::reconciler::ReconcilerService;
use super::vehicle_state::transition;
use crate::domain::ports::{Notification, Notifier};
use crate::domain::rental::RentalStatus;
use crate::domain::reservation::{NewReservation, Reservation, ReservationStatus};
use crate::domain::vehicle::VehicleStatus;
use crate::domain::{DomainError, DomainResult, RepositoryProvider};

/// What happened to the money when a reservation was cancelled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefundState {
    /// No successful wallet payments to return
    NotNeeded,
    Refunded { amount: i64, new_balance: i64 },
    /// Cancellation stands; the refund must be reconciled by hand
    PendingManualReview { reason: String },
}

#[derive(Debug, Clone)]
pub struct CancelOutcome {
    pub reservation: Reservation,
    /// The reservation was already terminal; nothing was changed
    pub already_terminal: bool,
    pub refund: RefundState,
}

impl CancelOutcome {
    pub fn refund_amount(&self) -> i64 {
        match self.refund {
            RefundState::Refunded { amount, .. } => amount,
            _ => 0,
        }
    }

    pub fn new_balance(&self) -> Option<i64> {
        match self.refund {
            RefundState::Refunded { new_balance, .. } => Some(new_balance),
            _ => None,
        }
    }
}

pub struct ReservationService {
    repos: Arc<dyn RepositoryProvider>,
    notifier: Arc<dyn Notifier>,
    reconciler: Arc<ReconcilerService>,
}

impl ReservationService {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        notifier: Arc<dyn Notifier>,
        reconciler: Arc<ReconcilerService>,
    ) -> Self {
        Self {
            repos,
            notifier,
            reconciler,
        }
    }

    pub async fn create(&self, new: NewReservation) -> DomainResult<Reservation> {
        new.validate()?;

        let uow = self.repos.begin().await?;

        if let Some(active) = uow.reservations().find_active_for_user(&new.user_id).await? {
            return Err(DomainError::Conflict(format!(
                "User already has active reservation {}",
                active.id
            )));
        }

        let vehicle = uow
            .vehicles()
            .find_by_id(new.vehicle_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Vehicle", "id", new.vehicle_id))?;
        if vehicle.station_id != new.station_id {
            return Err(DomainError::Validation(format!(
                "Vehicle {} is not at station {}",
                vehicle.id, new.station_id
            )));
        }
        if !vehicle.is_available() {
            return Err(DomainError::Conflict(format!(
                "Vehicle {} is {}",
                vehicle.id, vehicle.status
            )));
        }

        // The unique index re-checks the one-active-reservation rule at commit
        let reservation = uow.reservations().insert(new).await?;

        let held = transition(
            &*uow,
            reservation.vehicle_id,
            &[VehicleStatus::Available],
            VehicleStatus::Pending,
            &format!("reservation {} created", reservation.id),
            &reservation.user_id,
        )
        .await?;
        if !held {
            return Err(DomainError::Conflict(format!(
                "Vehicle {} is no longer available",
                reservation.vehicle_id
            )));
        }
        uow.commit().await?;

        counter!("reservations_created_total").increment(1);
        info!(
            reservation_id = reservation.id,
            user_id = %reservation.user_id,
            vehicle_id = reservation.vehicle_id,
            "Reservation created"
        );

        notify_best_effort(
            self.notifier.as_ref(),
            Notification::ReservationCreated {
                user_id: reservation.user_id.clone(),
                reservation_id: reservation.id,
                vehicle_id: reservation.vehicle_id,
            },
        )
        .await;

        Ok(reservation)
    }

    /// Cancel and refund. Cancelling an already terminal reservation is a
    /// successful no-op. A failed refund does not undo the cancellation.
    pub async fn cancel(
        &self,
        reservation_id: i32,
        reason: Option<String>,
        cancelled_by: Option<String>,
    ) -> DomainResult<CancelOutcome> {
        let uow = self.repos.begin().await?;

        let reservation = uow
            .reservations()
            .find_by_id(reservation_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Reservation", "id", reservation_id))?;

        if reservation.status.is_terminal() {
            info!(reservation_id, status = %reservation.status, "Cancel on terminal reservation, no-op");
            return Ok(CancelOutcome {
                reservation,
                already_terminal: true,
                refund: RefundState::NotNeeded,
            });
        }

        let actor = cancelled_by.clone().unwrap_or_else(|| reservation.user_id.clone());
        if uow
            .reservations()
            .cancel(reservation_id, reason, cancelled_by)
            .await?
            == 0
        {
            return Err(DomainError::Conflict(format!(
                "Reservation {} changed concurrently",
                reservation_id
            )));
        }

        let released = transition(
            &*uow,
            reservation.vehicle_id,
            &[VehicleStatus::Pending, VehicleStatus::Rented],
            VehicleStatus::Available,
            &format!("reservation {} cancelled", reservation_id),
            &actor,
        )
        .await?;
        if !released {
            warn!(
                reservation_id,
                vehicle_id = reservation.vehicle_id,
                "Vehicle was not held by the reservation, status left unchanged"
            );
        }

        if let Some(rental) = uow.rentals().find_by_reservation(reservation_id).await? {
            if rental.status != RentalStatus::Completed {
                uow.rentals().complete(rental.id, Utc::now(), None).await?;
            }
        }
        uow.commit().await?;

        info!(reservation_id, actor = %actor, "Reservation cancelled");

        let refund = match self.reconciler.refund_on_cancellation(reservation_id).await {
            Ok(outcome) => match outcome.new_balance {
                Some(new_balance) if outcome.refunded > 0 => RefundState::Refunded {
                    amount: outcome.refunded,
                    new_balance,
                },
                _ => RefundState::NotNeeded,
            },
            Err(e) => {
                error!(reservation_id, error = %e, "Refund after cancellation failed");
                self.reconciler
                    .report_failed_refund(&reservation.user_id, reservation_id, &e)
                    .await;
                RefundState::PendingManualReview {
                    reason: "Refund pending manual reconciliation".to_string(),
                }
            }
        };

        Ok(CancelOutcome {
            reservation: self.get(reservation_id).await?,
            already_terminal: false,
            refund,
        })
    }

    pub async fn get(&self, reservation_id: i32) -> DomainResult<Reservation> {
        self.repos
            .reservations()
            .find_by_id(reservation_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Reservation", "id", reservation_id))
    }

    pub async fn list_for_user(&self, user_id: &str) -> DomainResult<Vec<Reservation>> {
        self.repos.reservations().find_for_user(user_id).await
    }

    /// Expire `pending` reservations whose start plus `grace` is before
    /// `now`, releasing their vehicles. Returns how many were expired.
    pub async fn expire_overdue(&self, now: DateTime<Utc>, grace: Duration) -> DomainResult<usize> {
        let overdue = self
            .repos
            .reservations()
            .find_overdue_pending(now - grace)
            .await?;
        if overdue.is_empty() {
            return Ok(0);
        }

        info!(count = overdue.len(), "Expiring overdue reservations");

        let mut expired = 0;
        for reservation in overdue {
            match self.expire_one(&reservation).await {
                Ok(true) => expired += 1,
                Ok(false) => {}
                Err(e) => warn!(reservation_id = reservation.id, error = %e, "Failed to expire reservation"),
            }
        }
        Ok(expired)
    }

    async fn expire_one(&self, reservation: &Reservation) -> DomainResult<bool> {
        let uow = self.repos.begin().await?;
        let updated = uow
            .reservations()
            .update_status(
                reservation.id,
                &[ReservationStatus::Pending],
                ReservationStatus::Expired,
            )
            .await?;
        if updated == 0 {
            return Ok(false);
        }

        transition(
            &*uow,
            reservation.vehicle_id,
            &[VehicleStatus::Pending],
            VehicleStatus::Available,
            &format!("reservation {} expired", reservation.id),
            "system",
        )
        .await?;
        uow.commit().await?;

        info!(reservation_id = reservation.id, "Reservation expired");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ledger::{MethodType, PaymentStatus};
    use crate::test_support::TestEnv;

    #[tokio::test]
    async fn create_holds_vehicle() {
        let env = TestEnv::new().await;
        let vehicle = env.vehicle().await;

        let reservation = env
            .services
            .reservations
            .create(env.new_reservation("cust-1", &vehicle))
            .await
            .unwrap();

        assert_eq!(reservation.status, ReservationStatus::Pending);
        let vehicle = env.services.vehicles.current(vehicle.id).await.unwrap();
        assert_eq!(vehicle.status, VehicleStatus::Pending);
    }

    #[tokio::test]
    async fn second_active_reservation_is_conflict() {
        let env = TestEnv::new().await;
        let first = env.vehicle().await;
        let second = env.vehicle().await;
        let service = &env.services.reservations;

        service.create(env.new_reservation("cust-1", &first)).await.unwrap();
        let err = service
            .create(env.new_reservation("cust-1", &second))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        // the rejected attempt left the second vehicle alone
        let second = env.services.vehicles.current(second.id).await.unwrap();
        assert_eq!(second.status, VehicleStatus::Available);
    }

    #[tokio::test]
    async fn storage_rejects_a_racing_second_reservation() {
        let env = TestEnv::new().await;
        let first = env.vehicle().await;
        let second = env.vehicle().await;
        env.services
            .reservations
            .create(env.new_reservation("cust-1", &first))
            .await
            .unwrap();

        // skips the service pre-check, as a concurrent create would
        let err = env
            .repos
            .reservations()
            .insert(env.new_reservation("cust-1", &second))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)), "{:?}", err);
        assert_eq!(env.services.reservations.list_for_user("cust-1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn at_most_one_active_reservation_across_create_and_cancel() {
        let env = TestEnv::new().await;
        let service = &env.services.reservations;

        for _ in 0..3 {
            let vehicle = env.vehicle().await;
            let r = service.create(env.new_reservation("cust-1", &vehicle)).await.unwrap();
            let other = env.vehicle().await;
            assert!(service.create(env.new_reservation("cust-1", &other)).await.is_err());
            service.cancel(r.id, None, None).await.unwrap();
        }

        let active = service
            .list_for_user("cust-1")
            .await
            .unwrap()
            .into_iter()
            .filter(|r| r.is_active())
            .count();
        assert!(active <= 1);
    }

    #[tokio::test]
    async fn unavailable_vehicle_is_conflict() {
        let env = TestEnv::new().await;
        let vehicle = env.vehicle().await;
        let service = &env.services.reservations;

        service.create(env.new_reservation("cust-1", &vehicle)).await.unwrap();
        let err = service
            .create(env.new_reservation("cust-2", &vehicle))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn inverted_window_is_validation_error() {
        let env = TestEnv::new().await;
        let vehicle = env.vehicle().await;
        let mut new = env.new_reservation("cust-1", &vehicle);
        new.end_time = new.start_time;

        let err = env.services.reservations.create(new).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn cancel_releases_vehicle_and_is_idempotent() {
        let env = TestEnv::new().await;
        let reservation = env.reservation("cust-1").await;
        let service = &env.services.reservations;

        let outcome = service
            .cancel(reservation.id, Some("plans changed".into()), None)
            .await
            .unwrap();
        assert!(!outcome.already_terminal);
        assert_eq!(outcome.reservation.status, ReservationStatus::Cancelled);
        assert_eq!(outcome.reservation.cancel_reason.as_deref(), Some("plans changed"));
        assert_eq!(outcome.refund, RefundState::NotNeeded);

        let vehicle = env.services.vehicles.current(reservation.vehicle_id).await.unwrap();
        assert_eq!(vehicle.status, VehicleStatus::Available);

        let again = service.cancel(reservation.id, None, None).await.unwrap();
        assert!(again.already_terminal);
        assert_eq!(again.refund_amount(), 0);
    }

    #[tokio::test]
    async fn cancel_missing_is_not_found() {
        let env = TestEnv::new().await;
        let err = env.services.reservations.cancel(999, None, None).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn refund_is_exact_and_credited_to_owner() {
        let env = TestEnv::new().await;
        let reservation = env.reservation("cust-1").await;
        let ledger = &env.services.ledger;

        ledger.top_up("cust-1", 150_000, MethodType::Card).await.unwrap();
        let payment = ledger.pay_with_wallet(reservation.id, 150_000).await.unwrap();
        assert_eq!(payment.new_balance, 0);

        // staff cancels on the customer's behalf
        let outcome = env
            .services
            .reservations
            .cancel(reservation.id, None, Some("staff-7".into()))
            .await
            .unwrap();
        assert_eq!(outcome.refund_amount(), 150_000);
        assert_eq!(outcome.new_balance(), Some(150_000));
        assert_eq!(ledger.get_wallet("cust-1").await.unwrap().balance, 150_000);
        assert_eq!(ledger.get_wallet("staff-7").await.unwrap().balance, 0);

        let paid = env.repos.ledger().find_by_id(&payment.entry.id).await.unwrap().unwrap();
        assert_eq!(paid.status, PaymentStatus::Refunded);

        // retried cancellation and manual retry both find nothing left to refund
        env.services
            .reservations
            .cancel(reservation.id, None, Some("staff-7".into()))
            .await
            .unwrap();
        let retry = ledger.retry_refund(reservation.id).await.unwrap();
        assert_eq!(retry.refunded, 0);
        assert_eq!(ledger.get_wallet("cust-1").await.unwrap().balance, 150_000);
    }

    #[tokio::test]
    async fn failed_refund_degrades_to_manual_review() {
        let env = TestEnv::new().await;
        let reservation = env.reservation("cust-1").await;
        let ledger = &env.services.ledger;
        ledger.top_up("cust-1", 40_000, MethodType::Card).await.unwrap();
        ledger.pay_with_wallet(reservation.id, 40_000).await.unwrap();
        let mut notifications = env.bus.subscribe();

        // break the ledger table so the refund transaction cannot commit
        env.break_payments_table().await;

        let outcome = env
            .services
            .reservations
            .cancel(reservation.id, None, None)
            .await
            .unwrap();
        assert_eq!(outcome.reservation.status, ReservationStatus::Cancelled);
        assert!(matches!(outcome.refund, RefundState::PendingManualReview { .. }));

        let message = notifications.try_recv().expect("review notice");
        assert!(matches!(
            message.notification,
            Notification::RefundPendingReview { reservation_id, .. } if reservation_id == reservation.id
        ));
    }

    #[tokio::test]
    async fn expiry_releases_overdue_pending_only() {
        let env = TestEnv::new().await;
        let vehicle = env.vehicle().await;
        let mut new = env.new_reservation("cust-1", &vehicle);
        new.start_time = Utc::now() - Duration::hours(30);
        new.end_time = new.start_time + Duration::hours(2);
        let overdue = env.services.reservations.create(new).await.unwrap();
        let fresh = env.reservation("cust-2").await;

        let expired = env
            .services
            .reservations
            .expire_overdue(Utc::now(), Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(expired, 1);

        let overdue = env.services.reservations.get(overdue.id).await.unwrap();
        assert_eq!(overdue.status, ReservationStatus::Expired);
        assert_eq!(
            env.services.vehicles.current(vehicle.id).await.unwrap().status,
            VehicleStatus::Available
        );
        assert_eq!(
            env.services.reservations.get(fresh.id).await.unwrap().status,
            ReservationStatus::Pending
        );
    }
}
