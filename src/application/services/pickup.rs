//! Pickup authorization
//!
//! Issues the single-use access token for a reservation and redeems it,
//! moving reservation, rental, token and vehicle together.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use metrics::counter;
use tracing::{debug, info, warn};

use super::vehicle_state::transition;
use crate::domain::pickup_token::{PickupToken, TokenCodec};
use crate::domain::rental::{NewRental, Rental, RentalStatus};
use crate::domain::reservation::{Reservation, ReservationStatus};
use crate::domain::vehicle::VehicleStatus;
use crate::domain::{DomainError, DomainResult, RepositoryProvider};

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub payload: String,
    pub rental_id: i32,
    pub expires_at: DateTime<Utc>,
}

/// Result of a successful redemption
#[derive(Debug, Clone)]
pub struct Redemption {
    pub reservation: Reservation,
    /// The token had already been used; nothing was applied this time
    pub replayed: bool,
}

pub struct PickupService {
    repos: Arc<dyn RepositoryProvider>,
    codec: TokenCodec,
    validity: Duration,
}

impl PickupService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, codec: TokenCodec, validity: Duration) -> Self {
        Self {
            repos,
            codec,
            validity,
        }
    }

    /// Create the rental if needed and issue (or refresh) its token.
    pub async fn generate_token(&self, reservation_id: i32) -> DomainResult<IssuedToken> {
        let uow = self.repos.begin().await?;

        let reservation = uow
            .reservations()
            .find_by_id(reservation_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Reservation", "id", reservation_id))?;
        if reservation.status.is_terminal() {
            return Err(DomainError::Conflict(format!(
                "Reservation {} is {}",
                reservation_id, reservation.status
            )));
        }

        let rental = match uow.rentals().find_by_reservation(reservation_id).await? {
            Some(rental) => rental,
            None => {
                let rental = uow
                    .rentals()
                    .insert(NewRental::from_reservation(&reservation, RentalStatus::Pending))
                    .await?;
                debug!(reservation_id, rental_id = rental.id, "Rental created for pickup");
                rental
            }
        };

        let expires_at = reservation.start_time + self.validity;
        let payload = self.codec.issue(rental.id);

        match uow.pickup_tokens().find_by_rental(rental.id).await? {
            Some(token) if token.is_used() => {
                return Err(DomainError::Conflict(format!(
                    "Pickup token for reservation {} was already used",
                    reservation_id
                )));
            }
            Some(token) => {
                if uow
                    .pickup_tokens()
                    .refresh(token.id, &payload, expires_at)
                    .await?
                    == 0
                {
                    return Err(DomainError::Conflict(format!(
                        "Pickup token for reservation {} was redeemed concurrently",
                        reservation_id
                    )));
                }
                debug!(reservation_id, token_id = token.id, "Pickup token refreshed");
            }
            None => {
                uow.pickup_tokens()
                    .insert(rental.id, &payload, expires_at)
                    .await?;
            }
        }
        uow.commit().await?;

        info!(reservation_id, rental_id = rental.id, %expires_at, "Pickup token issued");

        Ok(IssuedToken {
            payload,
            rental_id: rental.id,
            expires_at,
        })
    }

    pub async fn redeem_token(&self, payload: &str) -> DomainResult<Redemption> {
        self.redeem_token_at(payload, Utc::now()).await
    }

    pub async fn redeem_token_at(
        &self,
        payload: &str,
        now: DateTime<Utc>,
    ) -> DomainResult<Redemption> {
        let payload = payload.trim();
        let parsed = self.codec.parse(payload)?;

        let token = self
            .repos
            .pickup_tokens()
            .find_by_payload(payload)
            .await?
            .ok_or_else(|| DomainError::not_found("PickupToken", "payload", "<redacted>"))?;
        if token.rental_id != parsed.rental_id {
            return Err(DomainError::Validation("Malformed pickup token".to_string()));
        }

        let (rental, reservation) = self.owning_reservation(&token).await?;

        if token.is_expired_at(now) {
            return Err(DomainError::Expired(format!(
                "Pickup token expired at {}",
                token.expires_at
            )));
        }
        if token.is_used() {
            debug!(reservation_id = reservation.id, "Pickup token replayed");
            return Ok(Redemption {
                reservation,
                replayed: true,
            });
        }
        if reservation.status.is_terminal() {
            return Err(DomainError::Conflict(format!(
                "Reservation {} is {}",
                reservation.id, reservation.status
            )));
        }

        self.apply_redemption(&token, &rental, reservation, now).await
    }

    /// Write half of a redemption for a token read as unused. Losing the
    /// `mark_used` race turns it into a replay.
    async fn apply_redemption(
        &self,
        token: &PickupToken,
        rental: &Rental,
        reservation: Reservation,
        now: DateTime<Utc>,
    ) -> DomainResult<Redemption> {
        let uow = self.repos.begin().await?;

        if uow.pickup_tokens().mark_used(token.id, now).await? == 0 {
            // Lost the race; the winner applied every transition
            drop(uow);
            return Ok(Redemption {
                reservation: self.reservation(reservation.id).await?,
                replayed: true,
            });
        }

        let confirmed = uow
            .reservations()
            .update_status(
                reservation.id,
                &[ReservationStatus::Pending, ReservationStatus::Confirmed],
                ReservationStatus::Confirmed,
            )
            .await?;
        if confirmed == 0 {
            return Err(DomainError::Conflict(format!(
                "Reservation {} changed during pickup",
                reservation.id
            )));
        }

        let started = uow
            .rentals()
            .update_status(
                rental.id,
                &[RentalStatus::Pending, RentalStatus::Ongoing],
                RentalStatus::Ongoing,
            )
            .await?;
        if started == 0 {
            return Err(DomainError::Conflict(format!(
                "Rental {} is already completed",
                rental.id
            )));
        }

        let rented = transition(
            &*uow,
            reservation.vehicle_id,
            &[VehicleStatus::Pending],
            VehicleStatus::Rented,
            &format!("pickup for reservation {}", reservation.id),
            &reservation.user_id,
        )
        .await?;
        if !rented {
            warn!(
                reservation_id = reservation.id,
                vehicle_id = reservation.vehicle_id,
                "Vehicle not held for pickup, redemption rolled back"
            );
            return Err(DomainError::Conflict(format!(
                "Vehicle {} is not held for reservation {}",
                reservation.vehicle_id, reservation.id
            )));
        }
        uow.commit().await?;

        counter!("pickup_tokens_redeemed_total").increment(1);
        info!(
            reservation_id = reservation.id,
            rental_id = rental.id,
            vehicle_id = reservation.vehicle_id,
            "Pickup token redeemed"
        );

        Ok(Redemption {
            reservation: self.reservation(reservation.id).await?,
            replayed: false,
        })
    }

    async fn owning_reservation(&self, token: &PickupToken) -> DomainResult<(Rental, Reservation)> {
        let rental = self
            .repos
            .rentals()
            .find_by_id(token.rental_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Rental", "id", token.rental_id))?;
        let reservation_id = rental.reservation_id.ok_or_else(|| {
            DomainError::Conflict(format!("Rental {} has no reservation", rental.id))
        })?;
        let reservation = self.reservation(reservation_id).await?;
        Ok((rental, reservation))
    }

    async fn reservation(&self, id: i32) -> DomainResult<Reservation> {
        self.repos
            .reservations()
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Reservation", "id", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestEnv;

    #[tokio::test]
    async fn redeem_moves_all_four_entities() {
        let env = TestEnv::new().await;
        let reservation = env.reservation("cust-1").await;
        let pickup = &env.services.pickup;

        let issued = pickup.generate_token(reservation.id).await.unwrap();
        assert_eq!(issued.expires_at, reservation.start_time + Duration::hours(24));

        let redemption = pickup.redeem_token(&issued.payload).await.unwrap();
        assert!(!redemption.replayed);
        assert_eq!(redemption.reservation.status, ReservationStatus::Confirmed);

        let rental = env.repos.rentals().find_by_id(issued.rental_id).await.unwrap().unwrap();
        assert_eq!(rental.status, RentalStatus::Ongoing);
        let token = env.repos.pickup_tokens().find_by_rental(rental.id).await.unwrap().unwrap();
        assert!(token.is_used());
        assert!(token.used_at.is_some());
        let vehicle = env.services.vehicles.current(reservation.vehicle_id).await.unwrap();
        assert_eq!(vehicle.status, VehicleStatus::Rented);
    }

    #[tokio::test]
    async fn second_redemption_is_replay_without_side_effects() {
        let env = TestEnv::new().await;
        let reservation = env.reservation("cust-1").await;
        let pickup = &env.services.pickup;
        let issued = pickup.generate_token(reservation.id).await.unwrap();

        pickup.redeem_token(&issued.payload).await.unwrap();
        let writes_after_first = env.status_writes(reservation.vehicle_id).await;

        let replay = pickup.redeem_token(&issued.payload).await.unwrap();
        assert!(replay.replayed);
        assert_eq!(replay.reservation.status, ReservationStatus::Confirmed);
        assert_eq!(env.status_writes(reservation.vehicle_id).await, writes_after_first);
        // created → pending, pickup → rented
        assert_eq!(writes_after_first, 2);
    }

    #[tokio::test]
    async fn losing_the_mark_used_race_is_a_replay() {
        let env = TestEnv::new().await;
        let reservation = env.reservation("cust-1").await;
        let pickup = &env.services.pickup;
        let issued = pickup.generate_token(reservation.id).await.unwrap();

        let stale = env
            .repos
            .pickup_tokens()
            .find_by_payload(&issued.payload)
            .await
            .unwrap()
            .unwrap();
        let (rental, owner) = pickup.owning_reservation(&stale).await.unwrap();
        let tokens = env.repos.pickup_tokens();
        assert_eq!(tokens.mark_used(stale.id, Utc::now()).await.unwrap(), 1);
        let writes = env.status_writes(reservation.vehicle_id).await;

        let redemption = pickup
            .apply_redemption(&stale, &rental, owner, Utc::now())
            .await
            .unwrap();
        assert!(redemption.replayed);
        assert_eq!(redemption.reservation.status, ReservationStatus::Pending);

        assert_eq!(env.status_writes(reservation.vehicle_id).await, writes);
        let rental = env.repos.rentals().find_by_id(rental.id).await.unwrap().unwrap();
        assert_eq!(rental.status, RentalStatus::Pending);
        assert_eq!(
            env.services.vehicles.current(reservation.vehicle_id).await.unwrap().status,
            VehicleStatus::Pending
        );
    }

    #[tokio::test]
    async fn regenerating_refreshes_the_single_token() {
        let env = TestEnv::new().await;
        let reservation = env.reservation("cust-1").await;
        let pickup = &env.services.pickup;

        let first = pickup.generate_token(reservation.id).await.unwrap();
        let second = pickup.generate_token(reservation.id).await.unwrap();
        assert_eq!(first.rental_id, second.rental_id);
        assert_ne!(first.payload, second.payload);

        let err = pickup.redeem_token(&first.payload).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
        pickup.redeem_token(&second.payload).await.unwrap();

        let err = pickup.generate_token(reservation.id).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn expired_token_changes_nothing() {
        let env = TestEnv::new().await;
        let reservation = env.reservation("cust-1").await;
        let pickup = &env.services.pickup;
        let issued = pickup.generate_token(reservation.id).await.unwrap();

        let err = pickup
            .redeem_token_at(&issued.payload, issued.expires_at + Duration::minutes(1))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Expired(_)));

        let reservation = env.services.reservations.get(reservation.id).await.unwrap();
        assert_eq!(reservation.status, ReservationStatus::Pending);
        let rental = env.repos.rentals().find_by_id(issued.rental_id).await.unwrap().unwrap();
        assert_eq!(rental.status, RentalStatus::Pending);
        let vehicle = env.services.vehicles.current(reservation.vehicle_id).await.unwrap();
        assert_eq!(vehicle.status, VehicleStatus::Pending);
    }

    #[tokio::test]
    async fn cancelled_reservation_token_is_conflict() {
        let env = TestEnv::new().await;
        let reservation = env.reservation("cust-1").await;
        let pickup = &env.services.pickup;
        let issued = pickup.generate_token(reservation.id).await.unwrap();

        env.services
            .reservations
            .cancel(reservation.id, None, None)
            .await
            .unwrap();

        let err = pickup.redeem_token(&issued.payload).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
        let vehicle = env.services.vehicles.current(reservation.vehicle_id).await.unwrap();
        assert_eq!(vehicle.status, VehicleStatus::Available);
    }

    #[tokio::test]
    async fn malformed_payload_is_validation_error() {
        let env = TestEnv::new().await;
        let err = env.services.pickup.redeem_token("not-a-token").await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_payload_is_not_found() {
        let env = TestEnv::new().await;
        let forged = TokenCodec::new(TestEnv::TOKEN_SECRET).issue(12345);
        let err = env.services.pickup.redeem_token(&forged).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }
}
