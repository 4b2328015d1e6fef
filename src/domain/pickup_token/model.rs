//! Pickup access token entity

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::support::errors::DomainError;

/// `Active` → `Used` is the only transition; `Used` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Active,
    Used,
}

impl TokenStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Used => "used",
        }
    }
}

impl FromStr for TokenStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "used" => Ok(Self::Used),
            other => Err(DomainError::Validation(format!(
                "Unknown token status '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for TokenStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-use credential gating the move from reserved to rented.
/// Exactly one per rental.
#[derive(Debug, Clone)]
pub struct PickupToken {
    pub id: i32,
    pub rental_id: i32,
    pub payload: String,
    pub status: TokenStatus,
    pub expires_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl PickupToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn is_used(&self) -> bool {
        self.status == TokenStatus::Used
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token(expires_in: Duration) -> PickupToken {
        let now = Utc::now();
        PickupToken {
            id: 1,
            rental_id: 1,
            payload: "EVR1.x.y".into(),
            status: TokenStatus::Active,
            expires_at: now + expires_in,
            used_at: None,
            created_at: now,
        }
    }

    #[test]
    fn expiry_is_inclusive_of_the_deadline() {
        let t = token(Duration::hours(1));
        assert!(!t.is_expired_at(Utc::now()));
        assert!(t.is_expired_at(t.expires_at));
        assert!(t.is_expired_at(t.expires_at + Duration::seconds(1)));
    }

    #[test]
    fn status_parse_is_closed() {
        assert_eq!("used".parse::<TokenStatus>().unwrap(), TokenStatus::Used);
        assert!("revoked".parse::<TokenStatus>().is_err());
    }
}
