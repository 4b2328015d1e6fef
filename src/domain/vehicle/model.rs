//! Vehicle domain entity and availability state

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::support::errors::DomainError;

/// Vehicle availability status.
///
/// Every status is explained by exactly one cause: no active reservation
/// (`Available`), a held reservation not yet picked up (`Pending`), an
/// active rental (`Rented`), a return with unresolved damage
/// (`AwaitingProcessing`), or manual `Maintenance`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VehicleStatus {
    Available,
    Pending,
    Rented,
    AwaitingProcessing,
    Maintenance,
}

impl VehicleStatus {
    pub const ALL: [VehicleStatus; 5] = [
        Self::Available,
        Self::Pending,
        Self::Rented,
        Self::AwaitingProcessing,
        Self::Maintenance,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Pending => "pending",
            Self::Rented => "rented",
            Self::AwaitingProcessing => "awaiting_processing",
            Self::Maintenance => "maintenance",
        }
    }

    /// Transition table. Callers consult it; the status holder itself only
    /// rejects values outside the closed set.
    pub fn can_transition_to(&self, next: VehicleStatus) -> bool {
        use VehicleStatus::*;
        if *self == next {
            return true;
        }
        matches!(
            (self, next),
            (Available, Pending)
                | (Available, Maintenance)
                | (Pending, Available)
                | (Pending, Rented)
                | (Pending, Maintenance)
                | (Rented, Available)
                | (Rented, AwaitingProcessing)
                | (Rented, Maintenance)
                | (AwaitingProcessing, Available)
                | (AwaitingProcessing, Maintenance)
                | (Maintenance, Available)
        )
    }
}

impl FromStr for VehicleStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::Validation(format!("Unknown vehicle status '{}'", s)))
    }
}

impl fmt::Display for VehicleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Vehicle {
    pub id: i32,
    pub station_id: i32,
    pub model: String,
    pub status: VehicleStatus,
    /// State of charge, percent
    pub battery_level: i32,
    /// Odometer, km
    pub mileage: i64,
    pub condition_notes: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl Vehicle {
    pub fn is_available(&self) -> bool {
        self.status == VehicleStatus::Available
    }
}

/// Fields required to register a vehicle
#[derive(Debug, Clone)]
pub struct NewVehicle {
    pub station_id: i32,
    pub model: String,
    pub battery_level: i32,
    pub mileage: i64,
}

/// Audit row appended on every vehicle status write
#[derive(Debug, Clone)]
pub struct VehicleStatusChange {
    pub vehicle_id: i32,
    pub from_status: VehicleStatus,
    pub to_status: VehicleStatus,
    pub reason: String,
    pub actor: String,
    pub changed_at: DateTime<Utc>,
}

/// Condition readings taken during a handover
#[derive(Debug, Clone, Default)]
pub struct ConditionUpdate {
    pub battery_level: Option<i32>,
    pub mileage: Option<i64>,
    pub notes: Option<String>,
}

impl ConditionUpdate {
    pub fn is_empty(&self) -> bool {
        self.battery_level.is_none() && self.mileage.is_none() && self.notes.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_known_status() {
        for status in VehicleStatus::ALL {
            assert_eq!(status.as_str().parse::<VehicleStatus>().unwrap(), status);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        let err = "parked".parse::<VehicleStatus>().unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert!("AVAILABLE".parse::<VehicleStatus>().is_err());
    }

    #[test]
    fn damaged_return_cannot_skip_processing_from_pending() {
        assert!(!VehicleStatus::Pending.can_transition_to(VehicleStatus::AwaitingProcessing));
        assert!(VehicleStatus::Rented.can_transition_to(VehicleStatus::AwaitingProcessing));
    }

    #[test]
    fn maintenance_only_releases_to_available() {
        assert!(VehicleStatus::Maintenance.can_transition_to(VehicleStatus::Available));
        assert!(!VehicleStatus::Maintenance.can_transition_to(VehicleStatus::Rented));
        assert!(!VehicleStatus::Maintenance.can_transition_to(VehicleStatus::Pending));
    }
}
