//! Reservation domain entity

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::support::errors::DomainError;

/// Reservation status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReservationStatus {
    /// Vehicle held, not yet picked up
    Pending,
    /// Pickup token redeemed
    Confirmed,
    /// Cancelled by the customer or staff
    Cancelled,
    /// Vehicle returned
    Completed,
    /// Never picked up within the grace period
    Expired,
}

impl ReservationStatus {
    /// Statuses that count against the one-active-reservation-per-user rule
    pub const ACTIVE: [ReservationStatus; 2] = [Self::Pending, Self::Confirmed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
            Self::Expired => "expired",
        }
    }

    pub fn is_active(&self) -> bool {
        Self::ACTIVE.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

impl FromStr for ReservationStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            "expired" => Ok(Self::Expired),
            other => Err(DomainError::Validation(format!(
                "Unknown reservation status '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vehicle reservation
#[derive(Debug, Clone)]
pub struct Reservation {
    pub id: i32,
    /// Owning customer
    pub user_id: String,
    pub vehicle_id: i32,
    /// Pickup station
    pub station_id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: ReservationStatus,
    pub cancel_reason: Option<String>,
    /// Actor who cancelled (may be staff acting for the customer)
    pub cancelled_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Input for `CreateReservation`
#[derive(Debug, Clone)]
pub struct NewReservation {
    pub user_id: String,
    pub vehicle_id: i32,
    pub station_id: i32,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl NewReservation {
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.user_id.trim().is_empty() {
            return Err(DomainError::Validation("user_id is required".into()));
        }
        if self.end_time <= self.start_time {
            return Err(DomainError::Validation(
                "end_time must be after start_time".into(),
            ));
        }
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn sample(start_offset_h: i64, length_h: i64) -> NewReservation {
        let start = Utc::now() + Duration::hours(start_offset_h);
        NewReservation {
            user_id: "user-1".into(),
            vehicle_id: 1,
            station_id: 10,
            start_time: start,
            end_time: start + Duration::hours(length_h),
        }
    }

    #[test]
    fn valid_window_passes() {
        assert!(sample(1, 4).validate().is_ok());
    }

    #[test]
    fn end_before_or_at_start_is_rejected() {
        assert!(matches!(sample(1, 0).validate(), Err(DomainError::Validation(_))));
        assert!(matches!(sample(1, -2).validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn blank_user_is_rejected() {
        let mut r = sample(1, 2);
        r.user_id = "  ".into();
        assert!(r.validate().is_err());
    }

    #[test]
    fn active_and_terminal_partition_statuses() {
        assert!(ReservationStatus::Pending.is_active());
        assert!(ReservationStatus::Confirmed.is_active());
        for s in [
            ReservationStatus::Cancelled,
            ReservationStatus::Completed,
            ReservationStatus::Expired,
        ] {
            assert!(s.is_terminal());
        }
    }

    #[test]
    fn unknown_status_is_an_error() {
        assert!("Accepted".parse::<ReservationStatus>().is_err());
        assert_eq!(
            "expired".parse::<ReservationStatus>().unwrap(),
            ReservationStatus::Expired
        );
    }
}
