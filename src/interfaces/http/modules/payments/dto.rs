//! Wallet, ledger and payment intent DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::application::{IntentConfirmation, WalletReceipt};
use crate::domain::ledger::{LedgerEntry, Wallet};
use crate::domain::payment_intent::PaymentIntent;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletDto {
    pub user_id: String,
    pub balance: i64,
    pub updated_at: DateTime<Utc>,
}

impl From<Wallet> for WalletDto {
    fn from(w: Wallet) -> Self {
        Self {
            user_id: w.user_id,
            balance: w.balance,
            updated_at: w.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntryDto {
    pub id: String,
    pub user_id: String,
    pub reservation_id: Option<i32>,
    pub method_type: Option<String>,
    pub amount: i64,
    pub status: String,
    pub transaction_type: String,
    pub transaction_ref: String,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<LedgerEntry> for LedgerEntryDto {
    fn from(e: LedgerEntry) -> Self {
        Self {
            id: e.id,
            user_id: e.user_id,
            reservation_id: e.reservation_id,
            method_type: e.method.map(|m| m.to_string()),
            amount: e.amount,
            status: e.status.to_string(),
            transaction_type: e.transaction_type.to_string(),
            transaction_ref: e.transaction_ref,
            note: e.note,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletReceiptDto {
    pub payment: LedgerEntryDto,
    pub new_balance: i64,
}

impl From<WalletReceipt> for WalletReceiptDto {
    fn from(r: WalletReceipt) -> Self {
        Self {
            payment: r.entry.into(),
            new_balance: r.new_balance,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TopUpRequest {
    #[validate(range(min = 1))]
    pub amount: i64,
    /// `card`, `cash` or `bank_transfer`
    pub method_type: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WalletPaymentRequest {
    #[validate(range(min = 1))]
    pub amount: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettlePaymentRequest {
    /// How the pending fee was paid
    pub method_type: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateIntentRequest {
    #[validate(range(min = 1))]
    pub reservation_id: i32,
    #[validate(range(min = 1))]
    pub amount: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentDto {
    pub id: String,
    pub reservation_id: i32,
    pub user_id: String,
    pub amount: i64,
    pub status: String,
    pub expires_at: DateTime<Utc>,
    pub payment_id: Option<String>,
}

impl From<PaymentIntent> for PaymentIntentDto {
    fn from(i: PaymentIntent) -> Self {
        Self {
            id: i.id,
            reservation_id: i.reservation_id,
            user_id: i.user_id,
            amount: i.amount,
            status: i.status.to_string(),
            expires_at: i.expires_at,
            payment_id: i.payment_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IntentConfirmationDto {
    pub intent: PaymentIntentDto,
    pub payment: LedgerEntryDto,
    pub replayed: bool,
}

impl From<IntentConfirmation> for IntentConfirmationDto {
    fn from(c: IntentConfirmation) -> Self {
        Self {
            intent: c.intent.into(),
            payment: c.payment.into(),
            replayed: c.replayed,
        }
    }
}
