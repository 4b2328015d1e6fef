//! Durable payment intents

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::support::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentStatus {
    Open,
    Confirmed,
    Expired,
}

impl IntentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Confirmed => "confirmed",
            Self::Expired => "expired",
        }
    }
}

impl FromStr for IntentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "confirmed" => Ok(Self::Confirmed),
            "expired" => Ok(Self::Expired),
            other => Err(DomainError::Validation(format!(
                "Unknown intent status '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub id: String,
    pub reservation_id: i32,
    pub user_id: String,
    pub amount: i64,
    pub status: IntentStatus,
    pub expires_at: DateTime<Utc>,
    /// Ledger entry written on confirmation
    pub payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl PaymentIntent {
    /// Open but past its deadline; the sweep may not have caught it yet
    pub fn is_lapsed_at(&self, now: DateTime<Utc>) -> bool {
        self.status == IntentStatus::Expired
            || (self.status == IntentStatus::Open && now >= self.expires_at)
    }
}

#[derive(Debug, Clone)]
pub struct NewPaymentIntent {
    pub reservation_id: i32,
    pub user_id: String,
    pub amount: i64,
    pub expires_at: DateTime<Utc>,
}
