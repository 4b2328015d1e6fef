//! Handover inspection records and fee computation

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::support::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoverType {
    Pickup,
    Return,
    /// Post-return quality check that can clear a vehicle for re-availability
    Qc,
}

impl HandoverType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pickup => "pickup",
            Self::Return => "return",
            Self::Qc => "qc",
        }
    }
}

impl FromStr for HandoverType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pickup" => Ok(Self::Pickup),
            "return" => Ok(Self::Return),
            "qc" => Ok(Self::Qc),
            other => Err(DomainError::Validation(format!(
                "Unknown handover type '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for HandoverType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One damaged part noted during inspection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Damage {
    pub part: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Repair cost in minor currency units
    #[serde(default)]
    pub cost: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Condition {
    pub battery_level: Option<i32>,
    pub mileage: Option<i64>,
    pub exterior: Option<String>,
    pub interior: Option<String>,
    pub tires: Option<String>,
    pub notes: Option<String>,
}

/// Fees computed for a handover, all in minor currency units
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeBreakdown {
    pub late_fee: i64,
    pub damage_fee: i64,
    pub total_due: i64,
    pub deposit_refund: i64,
}

/// Inputs to [`FeeBreakdown::compute`]
#[derive(Debug, Clone)]
pub struct FeeInputs<'a> {
    pub handover_type: HandoverType,
    /// Explicit late fee; computed from the schedule when absent
    pub late_fee: Option<i64>,
    /// Explicit damage fee; summed from `damages` when absent
    pub damage_fee: Option<i64>,
    pub damages: &'a [Damage],
    pub deposit: i64,
    pub scheduled_end: Option<DateTime<Utc>>,
    pub returned_at: DateTime<Utc>,
    pub late_fee_per_hour: i64,
    pub grace_minutes: i64,
}

impl FeeBreakdown {
    pub fn compute(inputs: &FeeInputs<'_>) -> Result<Self, DomainError> {
        if inputs.deposit < 0 {
            return Err(DomainError::Validation(
                "deposit must not be negative".to_string(),
            ));
        }
        if let Some(d) = inputs.damages.iter().find(|d| d.cost < 0) {
            return Err(DomainError::Validation(format!(
                "damage cost for '{}' must not be negative",
                d.part
            )));
        }

        let damage_fee = match inputs.damage_fee {
            Some(fee) => fee,
            None => inputs
                .damages
                .iter()
                .try_fold(0i64, |sum, d| sum.checked_add(d.cost))
                .ok_or_else(|| overflow("damage fee"))?,
        };
        let late_fee = match (inputs.late_fee, inputs.handover_type) {
            (Some(fee), _) => fee,
            (None, HandoverType::Return) => inputs
                .scheduled_end
                .map(|end| Self::late_fee_for(end, inputs))
                .transpose()?
                .unwrap_or(0),
            (None, _) => 0,
        };

        if late_fee < 0 || damage_fee < 0 {
            return Err(DomainError::Validation(
                "fees must not be negative".to_string(),
            ));
        }

        let total_due = late_fee
            .checked_add(damage_fee)
            .ok_or_else(|| overflow("total due"))?;
        Ok(Self {
            late_fee,
            damage_fee,
            total_due,
            deposit_refund: (inputs.deposit - total_due).max(0),
        })
    }

    /// Started hours past the grace window, times the hourly rate
    fn late_fee_for(
        scheduled_end: DateTime<Utc>,
        inputs: &FeeInputs<'_>,
    ) -> Result<i64, DomainError> {
        let late_minutes = (inputs.returned_at - scheduled_end)
            .num_minutes()
            .saturating_sub(inputs.grace_minutes);
        if late_minutes <= 0 {
            return Ok(0);
        }
        let hours = late_minutes / 60 + i64::from(late_minutes % 60 != 0);
        hours
            .checked_mul(inputs.late_fee_per_hour)
            .ok_or_else(|| overflow("late fee"))
    }

    pub fn has_charges(&self) -> bool {
        self.total_due > 0
    }
}

fn overflow(what: &str) -> DomainError {
    DomainError::Validation(format!("{} is out of range", what))
}

/// Immutable inspection record; corrections are new handovers
#[derive(Debug, Clone)]
pub struct Handover {
    pub id: i32,
    pub rental_id: Option<i32>,
    pub reservation_id: Option<i32>,
    pub vehicle_id: Option<i32>,
    pub staff_id: String,
    pub handover_type: HandoverType,
    pub condition: Condition,
    pub damages: Vec<Damage>,
    pub image_urls: Vec<String>,
    pub fees: FeeBreakdown,
    pub clear_damages: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewHandover {
    pub rental_id: Option<i32>,
    pub reservation_id: Option<i32>,
    pub vehicle_id: Option<i32>,
    pub staff_id: String,
    pub handover_type: HandoverType,
    pub condition: Condition,
    pub damages: Vec<Damage>,
    pub image_urls: Vec<String>,
    pub fees: FeeBreakdown,
    pub clear_damages: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn inputs<'a>(damages: &'a [Damage], late_by: Duration) -> FeeInputs<'a> {
        let end = Utc::now();
        FeeInputs {
            handover_type: HandoverType::Return,
            late_fee: None,
            damage_fee: None,
            damages,
            deposit: 100_000,
            scheduled_end: Some(end),
            returned_at: end + late_by,
            late_fee_per_hour: 50_000,
            grace_minutes: 15,
        }
    }

    fn damage(part: &str, cost: i64) -> Damage {
        Damage {
            part: part.into(),
            description: None,
            cost,
        }
    }

    #[test]
    fn damage_fee_defaults_to_sum_of_items() {
        let damages = [damage("bumper", 30_000), damage("mirror", 20_000)];
        let fees = FeeBreakdown::compute(&inputs(&damages, Duration::zero())).unwrap();
        assert_eq!(fees.damage_fee, 50_000);
        assert_eq!(fees.late_fee, 0);
        assert_eq!(fees.total_due, 50_000);
        assert_eq!(fees.deposit_refund, 50_000);
    }

    #[test]
    fn within_grace_is_not_late() {
        let fees = FeeBreakdown::compute(&inputs(&[], Duration::minutes(15))).unwrap();
        assert_eq!(fees.late_fee, 0);
    }

    #[test]
    fn late_hours_round_up() {
        // 16 minutes beyond grace counts as one started hour
        let fees = FeeBreakdown::compute(&inputs(&[], Duration::minutes(31))).unwrap();
        assert_eq!(fees.late_fee, 50_000);

        let fees = FeeBreakdown::compute(&inputs(&[], Duration::minutes(15 + 61))).unwrap();
        assert_eq!(fees.late_fee, 100_000);
    }

    #[test]
    fn explicit_fees_win_and_refund_floors_at_zero() {
        let mut i = inputs(&[], Duration::hours(5));
        i.late_fee = Some(0);
        i.damage_fee = Some(200_000);
        let fees = FeeBreakdown::compute(&i).unwrap();
        assert_eq!(fees.late_fee, 0);
        assert_eq!(fees.total_due, 200_000);
        assert_eq!(fees.deposit_refund, 0);
    }

    #[test]
    fn pickup_never_computes_late_fee() {
        let mut i = inputs(&[], Duration::hours(5));
        i.handover_type = HandoverType::Pickup;
        assert_eq!(FeeBreakdown::compute(&i).unwrap().late_fee, 0);
    }

    #[test]
    fn negative_amounts_are_rejected() {
        let mut i = inputs(&[], Duration::zero());
        i.damage_fee = Some(-1);
        assert!(matches!(
            FeeBreakdown::compute(&i),
            Err(DomainError::Validation(_))
        ));

        let damages = [damage("door", -5)];
        assert!(FeeBreakdown::compute(&inputs(&damages, Duration::zero())).is_err());
    }

    #[test]
    fn overflowing_fees_are_rejected() {
        let mut i = inputs(&[], Duration::zero());
        i.late_fee = Some(i64::MAX);
        i.damage_fee = Some(1);
        assert!(matches!(
            FeeBreakdown::compute(&i),
            Err(DomainError::Validation(_))
        ));

        let damages = [damage("battery", i64::MAX), damage("charger", 1)];
        assert!(matches!(
            FeeBreakdown::compute(&inputs(&damages, Duration::zero())),
            Err(DomainError::Validation(_))
        ));

        let mut i = inputs(&[], Duration::hours(3));
        i.late_fee_per_hour = i64::MAX;
        assert!(matches!(
            FeeBreakdown::compute(&i),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn handover_type_is_closed() {
        assert_eq!("qc".parse::<HandoverType>().unwrap(), HandoverType::Qc);
        assert!("inspection".parse::<HandoverType>().is_err());
    }
}
