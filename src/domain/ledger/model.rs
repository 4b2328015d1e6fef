//! Ledger entries ("payments") and wallets

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::support::errors::DomainError;

/// Generates the closed-set string enums used by ledger rows
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident, $label:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(DomainError::Validation(format!(
                        concat!("Unknown ", $label, " '{}'"),
                        other
                    ))),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(
    /// `pending → success` happens externally, `success → refunded` in the reconciler
    PaymentStatus, "payment status" {
        Pending => "pending",
        Success => "success",
        Refunded => "refunded",
    }
);

string_enum!(TransactionType, "transaction type" {
    Payment => "payment",
    LateFee => "late_fee",
    DamageFee => "damage_fee",
    Refund => "refund",
});

string_enum!(MethodType, "method type" {
    Wallet => "wallet",
    Card => "card",
    Cash => "cash",
    BankTransfer => "bank_transfer",
});

string_enum!(
    /// The subset of transaction types a handover can assess
    FeeType, "fee type" {
        LateFee => "late_fee",
        DamageFee => "damage_fee",
    }
);

impl From<FeeType> for TransactionType {
    fn from(fee: FeeType) -> Self {
        match fee {
            FeeType::LateFee => TransactionType::LateFee,
            FeeType::DamageFee => TransactionType::DamageFee,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub id: String,
    pub user_id: String,
    /// Null for wallet top-ups
    pub reservation_id: Option<i32>,
    /// Null until an assessed fee is paid
    pub method: Option<MethodType>,
    pub amount: i64,
    pub status: PaymentStatus,
    pub transaction_type: TransactionType,
    pub transaction_ref: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub user_id: String,
    pub reservation_id: Option<i32>,
    pub method: Option<MethodType>,
    pub amount: i64,
    pub status: PaymentStatus,
    pub transaction_type: TransactionType,
    pub note: Option<String>,
}

impl NewLedgerEntry {
    pub fn pending_fee(user_id: &str, reservation_id: i32, fee: FeeType, amount: i64) -> Self {
        Self {
            user_id: user_id.to_string(),
            reservation_id: Some(reservation_id),
            method: None,
            amount,
            status: PaymentStatus::Pending,
            transaction_type: fee.into(),
            note: None,
        }
    }

    pub fn refund(user_id: &str, reservation_id: i32, amount: i64) -> Self {
        Self {
            user_id: user_id.to_string(),
            reservation_id: Some(reservation_id),
            method: Some(MethodType::Wallet),
            amount,
            status: PaymentStatus::Success,
            transaction_type: TransactionType::Refund,
            note: Some("Refund on cancellation".to_string()),
        }
    }
}

/// A user's running balance; only ever moved alongside a ledger entry
#[derive(Debug, Clone)]
pub struct Wallet {
    pub user_id: String,
    pub balance: i64,
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn empty(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            balance: 0,
            updated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_round_trip_their_storage_text() {
        assert_eq!("late_fee".parse::<TransactionType>().unwrap(), TransactionType::LateFee);
        assert_eq!(MethodType::BankTransfer.as_str(), "bank_transfer");
        assert_eq!(PaymentStatus::Refunded.to_string(), "refunded");
    }

    #[test]
    fn unknown_values_are_errors() {
        assert!("chargeback".parse::<TransactionType>().is_err());
        assert!("paypal".parse::<MethodType>().is_err());
        assert!("payment".parse::<FeeType>().is_err());
    }

    #[test]
    fn pending_fee_has_no_method() {
        let e = NewLedgerEntry::pending_fee("u1", 9, FeeType::DamageFee, 200_000);
        assert_eq!(e.transaction_type, TransactionType::DamageFee);
        assert_eq!(e.status, PaymentStatus::Pending);
        assert!(e.method.is_none());
    }
}
