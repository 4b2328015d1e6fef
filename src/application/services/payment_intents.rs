//! Durable payment intents
//!
//! An intent reserves the right to confirm one external payment for a
//! reservation until it lapses. Confirmation writes the `success` ledger
//! entry; there is no path that records a payment without an open intent.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::info;

use crate::domain::ledger::{LedgerEntry, MethodType, NewLedgerEntry, PaymentStatus, TransactionType};
use crate::domain::payment_intent::{IntentStatus, NewPaymentIntent, PaymentIntent};
use crate::domain::{DomainError, DomainResult, RepositoryProvider};

#[derive(Debug, Clone)]
pub struct IntentConfirmation {
    pub intent: PaymentIntent,
    pub payment: LedgerEntry,
    /// The intent had been confirmed before; nothing new was written
    pub replayed: bool,
}

pub struct PaymentIntentService {
    repos: Arc<dyn RepositoryProvider>,
    ttl: Duration,
}

impl PaymentIntentService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, ttl: Duration) -> Self {
        Self { repos, ttl }
    }

    pub async fn create(&self, reservation_id: i32, amount: i64) -> DomainResult<PaymentIntent> {
        if amount <= 0 {
            return Err(DomainError::Validation("amount must be positive".to_string()));
        }
        let reservation = self
            .repos
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

        let intent = self
            .repos
            .payment_intents()
            .insert(NewPaymentIntent {
                reservation_id,
                user_id: reservation.user_id,
                amount,
                expires_at: Utc::now() + self.ttl,
            })
            .await?;

        info!(intent_id = %intent.id, reservation_id, amount, "Payment intent created");
        Ok(intent)
    }

    pub async fn confirm(&self, intent_id: &str, method: MethodType) -> DomainResult<IntentConfirmation> {
        self.confirm_at(intent_id, method, Utc::now()).await
    }

    pub async fn confirm_at(
        &self,
        intent_id: &str,
        method: MethodType,
        now: DateTime<Utc>,
    ) -> DomainResult<IntentConfirmation> {
        if method == MethodType::Wallet {
            return Err(DomainError::Validation(
                "Wallet payments do not go through intents".to_string(),
            ));
        }

        let uow = self.repos.begin().await?;

        let intent = uow
            .payment_intents()
            .find_by_id(intent_id)
            .await?
            .ok_or_else(|| DomainError::not_found("PaymentIntent", "id", intent_id))?;

        if intent.status == IntentStatus::Confirmed {
            let payment_id = intent.payment_id.clone().ok_or_else(|| {
                DomainError::Infrastructure(format!("Intent {} confirmed without payment", intent.id))
            })?;
            let payment = uow
                .ledger()
                .find_by_id(&payment_id)
                .await?
                .ok_or_else(|| DomainError::not_found("Payment", "id", &payment_id))?;
            return Ok(IntentConfirmation {
                intent,
                payment,
                replayed: true,
            });
        }
        if intent.is_lapsed_at(now) {
            return Err(DomainError::Expired(format!(
                "Payment intent {} expired at {}",
                intent.id, intent.expires_at
            )));
        }

        let payment = uow
            .ledger()
            .insert(NewLedgerEntry {
                user_id: intent.user_id.clone(),
                reservation_id: Some(intent.reservation_id),
                method: Some(method),
                amount: intent.amount,
                status: PaymentStatus::Success,
                transaction_type: TransactionType::Payment,
                note: Some(format!("Payment intent {}", intent.id)),
            })
            .await?;
        if uow.payment_intents().mark_confirmed(&intent.id, &payment.id).await? == 0 {
            return Err(DomainError::Conflict(format!(
                "Payment intent {} was confirmed concurrently",
                intent.id
            )));
        }
        let intent = uow
            .payment_intents()
            .find_by_id(intent_id)
            .await?
            .ok_or_else(|| DomainError::not_found("PaymentIntent", "id", intent_id))?;
        uow.commit().await?;

        info!(
            intent_id = %intent.id,
            payment_id = %payment.id,
            reservation_id = intent.reservation_id,
            method = %method,
            "Payment intent confirmed"
        );

        Ok(IntentConfirmation {
            intent,
            payment,
            replayed: false,
        })
    }

    /// Expire open intents past their deadline; returns how many
    pub async fn sweep(&self, now: DateTime<Utc>) -> DomainResult<u64> {
        let expired = self.repos.payment_intents().expire_overdue(now).await?;
        if expired > 0 {
            info!(expired, "Expired lapsed payment intents");
        }
        Ok(expired)
    }
}
