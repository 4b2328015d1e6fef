//! Rental domain entity

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::domain::reservation::Reservation;
use crate::support::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RentalStatus {
    Pending,
    Ongoing,
    Completed,
}

impl RentalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
        }
    }
}

impl FromStr for RentalStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "ongoing" => Ok(Self::Ongoing),
            "completed" => Ok(Self::Completed),
            other => Err(DomainError::Validation(format!(
                "Unknown rental status '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for RentalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Rental {
    pub id: i32,
    /// 1:1 with the reservation once linked; legacy rows may lack it
    pub reservation_id: Option<i32>,
    pub user_id: String,
    pub vehicle_id: i32,
    pub pickup_station_id: i32,
    pub return_station_id: Option<i32>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: RentalStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewRental {
    pub reservation_id: Option<i32>,
    pub user_id: String,
    pub vehicle_id: i32,
    pub pickup_station_id: i32,
    pub return_station_id: Option<i32>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: RentalStatus,
}

impl NewRental {
    /// Rental seeded from a reservation's own fields
    pub fn from_reservation(reservation: &Reservation, status: RentalStatus) -> Self {
        let end_time = match status {
            RentalStatus::Completed => Some(Utc::now()),
            _ => None,
        };
        Self {
            reservation_id: Some(reservation.id),
            user_id: reservation.user_id.clone(),
            vehicle_id: reservation.vehicle_id,
            pickup_station_id: reservation.station_id,
            return_station_id: None,
            start_time: reservation.start_time,
            end_time,
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::reservation::ReservationStatus;
    use chrono::Duration;

    fn reservation() -> Reservation {
        let start = Utc::now();
        Reservation {
            id: 42,
            user_id: "cust-9".into(),
            vehicle_id: 3,
            station_id: 7,
            start_time: start,
            end_time: start + Duration::hours(3),
            status: ReservationStatus::Pending,
            cancel_reason: None,
            cancelled_by: None,
            created_at: start,
            updated_at: start,
        }
    }

    #[test]
    fn seeded_from_reservation_fields() {
        let r = reservation();
        let rental = NewRental::from_reservation(&r, RentalStatus::Pending);
        assert_eq!(rental.reservation_id, Some(42));
        assert_eq!(rental.user_id, "cust-9");
        assert_eq!(rental.vehicle_id, 3);
        assert_eq!(rental.pickup_station_id, 7);
        assert_eq!(rental.start_time, r.start_time);
        assert!(rental.end_time.is_none());
    }

    #[test]
    fn completed_backfill_carries_end_time() {
        let rental = NewRental::from_reservation(&reservation(), RentalStatus::Completed);
        assert!(rental.end_time.is_some());
    }
}
