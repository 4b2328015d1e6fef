//! Fee & ledger reconciler
//!
//! Pending fee entries from handovers, wallet refunds on cancellation and
//! the wallet payment paths. Every wallet movement is written together with
//! its ledger entry inside one unit of work.

use std::sync::Arc;

use metrics::counter;
use tracing::{info, warn};

use super::notify_best_effort;
use crate::domain::ledger::{
    FeeType, LedgerEntry, MethodType, NewLedgerEntry, PaymentStatus, TransactionType, Wallet,
};
use crate::domain::ports::{Notification, Notifier};
use crate::domain::reservation::ReservationStatus;
use crate::domain::{DomainError, DomainResult, Repositories, RepositoryProvider};

/// Result of a refund attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefundOutcome {
    /// Amount credited back; 0 when there was nothing to refund
    pub refunded: i64,
    /// Wallet balance after the credit, when one happened
    pub new_balance: Option<i64>,
}

impl RefundOutcome {
    fn nothing() -> Self {
        Self {
            refunded: 0,
            new_balance: None,
        }
    }
}

/// A ledger entry together with the wallet balance it left behind
#[derive(Debug, Clone)]
pub struct WalletReceipt {
    pub entry: LedgerEntry,
    pub new_balance: i64,
}

/// Insert one pending fee entry for `(reservation_id, fee)` unless one is
/// already pending. Runs inside the caller's unit of work. Returns the new
/// entry, or `None` when an equivalent pending entry exists.
pub async fn ensure_pending_fee_in<R: Repositories + ?Sized>(
    repos: &R,
    reservation_id: i32,
    fee: FeeType,
    amount: i64,
) -> DomainResult<Option<LedgerEntry>> {
    if amount <= 0 {
        return Err(DomainError::Validation(format!(
            "{} amount must be positive",
            fee
        )));
    }

    let reservation = repos
        .reservations()
        .find_by_id(reservation_id)
        .await?
        .ok_or_else(|| DomainError::not_found("Reservation", "id", reservation_id))?;

    if repos
        .ledger()
        .find_pending_fee(reservation_id, fee.into())
        .await?
        .is_some()
    {
        info!(reservation_id, fee = %fee, "Pending fee already recorded, skipping");
        return Ok(None);
    }

    let entry = NewLedgerEntry::pending_fee(&reservation.user_id, reservation_id, fee, amount);
    let Some(entry) = repos.ledger().insert_pending_fee(entry).await? else {
        // A concurrent request committed the same pending fee first
        info!(reservation_id, fee = %fee, "Pending fee inserted concurrently, skipping");
        return Ok(None);
    };
    counter!("fee_entries_created_total", "fee_type" => fee.as_str()).increment(1);
    info!(
        reservation_id,
        user_id = %reservation.user_id,
        fee = %fee,
        amount,
        "Pending fee recorded"
    );
    Ok(Some(entry))
}

pub struct ReconcilerService {
    repos: Arc<dyn RepositoryProvider>,
    notifier: Arc<dyn Notifier>,
}

impl ReconcilerService {
    pub fn new(repos: Arc<dyn RepositoryProvider>, notifier: Arc<dyn Notifier>) -> Self {
        Self { repos, notifier }
    }

    /// `EnsurePendingFee` in its own unit of work
    pub async fn ensure_pending_fee(
        &self,
        reservation_id: i32,
        fee: FeeType,
        amount: i64,
    ) -> DomainResult<Option<LedgerEntry>> {
        let uow = self.repos.begin().await?;
        let created = ensure_pending_fee_in(&*uow, reservation_id, fee, amount).await?;
        uow.commit().await?;
        Ok(created)
    }

    /// Refund every successful wallet payment of a reservation to its
    /// owning customer. Idempotent: once entries are `refunded` a second
    /// call finds nothing to refund.
    pub async fn refund_on_cancellation(&self, reservation_id: i32) -> DomainResult<RefundOutcome> {
        let uow = self.repos.begin().await?;

        let reservation = uow
            .reservations()
            .find_by_id(reservation_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Reservation", "id", reservation_id))?;

        let refundable = uow.ledger().find_refundable(reservation_id).await?;
        let total: i64 = refundable.iter().map(|e| e.amount).sum();
        if total == 0 {
            return Ok(RefundOutcome::nothing());
        }

        let ids: Vec<String> = refundable.into_iter().map(|e| e.id).collect();
        let flipped = uow.ledger().mark_refunded(&ids).await?;
        if flipped != ids.len() as u64 {
            return Err(DomainError::Conflict(format!(
                "Ledger for reservation {} changed during refund",
                reservation_id
            )));
        }

        uow.ledger()
            .insert(NewLedgerEntry::refund(&reservation.user_id, reservation_id, total))
            .await?;
        let new_balance = uow.wallets().credit(&reservation.user_id, total).await?;
        uow.commit().await?;

        counter!("refunds_total", "outcome" => "refunded").increment(1);
        info!(
            reservation_id,
            user_id = %reservation.user_id,
            amount = total,
            new_balance,
            "Refund credited to wallet"
        );

        notify_best_effort(
            self.notifier.as_ref(),
            Notification::RefundIssued {
                user_id: reservation.user_id.clone(),
                reservation_id,
                amount: total,
                new_balance,
            },
        )
        .await;

        Ok(RefundOutcome {
            refunded: total,
            new_balance: Some(new_balance),
        })
    }

    /// Manual follow-up after a degraded cancellation
    pub async fn retry_refund(&self, reservation_id: i32) -> DomainResult<RefundOutcome> {
        let reservation = self
            .repos
            .reservations()
            .find_by_id(reservation_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Reservation", "id", reservation_id))?;
        if reservation.status != ReservationStatus::Cancelled {
            return Err(DomainError::Conflict(format!(
                "Reservation {} is {}, only cancelled reservations are refunded",
                reservation_id, reservation.status
            )));
        }
        self.refund_on_cancellation(reservation_id).await
    }

    /// Pay for a reservation out of the owner's wallet
    pub async fn pay_with_wallet(&self, reservation_id: i32, amount: i64) -> DomainResult<WalletReceipt> {
        if amount <= 0 {
            return Err(DomainError::Validation("amount must be positive".into()));
        }

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

        let new_balance = uow
            .wallets()
            .debit(&reservation.user_id, amount)
            .await?
            .ok_or_else(|| DomainError::Conflict("Insufficient wallet balance".into()))?;
        let entry = uow
            .ledger()
            .insert(NewLedgerEntry {
                user_id: reservation.user_id.clone(),
                reservation_id: Some(reservation_id),
                method: Some(MethodType::Wallet),
                amount,
                status: PaymentStatus::Success,
                transaction_type: TransactionType::Payment,
                note: None,
            })
            .await?;
        uow.commit().await?;

        info!(reservation_id, user_id = %reservation.user_id, amount, new_balance, "Wallet payment");
        Ok(WalletReceipt { entry, new_balance })
    }

    /// Credit a wallet from an external method (card, cash, transfer)
    pub async fn top_up(
        &self,
        user_id: &str,
        amount: i64,
        method: MethodType,
    ) -> DomainResult<WalletReceipt> {
        if amount <= 0 {
            return Err(DomainError::Validation("amount must be positive".into()));
        }
        if method == MethodType::Wallet {
            return Err(DomainError::Validation(
                "a wallet cannot be topped up from itself".into(),
            ));
        }

        let uow = self.repos.begin().await?;
        let entry = uow
            .ledger()
            .insert(NewLedgerEntry {
                user_id: user_id.to_string(),
                reservation_id: None,
                method: Some(method),
                amount,
                status: PaymentStatus::Success,
                transaction_type: TransactionType::Payment,
                note: Some("Wallet top-up".into()),
            })
            .await?;
        let new_balance = uow.wallets().credit(user_id, amount).await?;
        uow.commit().await?;

        info!(user_id, amount, method = %method, new_balance, "Wallet topped up");
        Ok(WalletReceipt { entry, new_balance })
    }

    /// External `pending → success` for an assessed fee. Paying with the
    /// wallet debits it in the same unit of work.
    pub async fn mark_payment_succeeded(
        &self,
        payment_id: &str,
        method: MethodType,
    ) -> DomainResult<LedgerEntry> {
        let uow = self.repos.begin().await?;
        let entry = uow
            .ledger()
            .find_by_id(payment_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Payment", "id", payment_id))?;

        if uow.ledger().mark_succeeded(payment_id, method).await? == 0 {
            return Err(DomainError::Conflict(format!(
                "Payment {} is {}, not pending",
                payment_id, entry.status
            )));
        }
        if method == MethodType::Wallet
            && uow
                .wallets()
                .debit(&entry.user_id, entry.amount)
                .await?
                .is_none()
        {
            return Err(DomainError::Conflict("Insufficient wallet balance".into()));
        }

        let updated = uow
            .ledger()
            .find_by_id(payment_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Payment", "id", payment_id))?;
        uow.commit().await?;

        info!(payment_id, method = %method, amount = updated.amount, "Payment marked succeeded");
        Ok(updated)
    }

    pub async fn get_wallet(&self, user_id: &str) -> DomainResult<Wallet> {
        Ok(self
            .repos
            .wallets()
            .find(user_id)
            .await?
            .unwrap_or_else(|| Wallet::empty(user_id)))
    }

    pub async fn find_payment(&self, payment_id: &str) -> DomainResult<LedgerEntry> {
        self.repos
            .ledger()
            .find_by_id(payment_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Payment", "id", payment_id))
    }

    pub async fn ledger_for_reservation(&self, reservation_id: i32) -> DomainResult<Vec<LedgerEntry>> {
        if self.repos.reservations().find_by_id(reservation_id).await?.is_none() {
            return Err(DomainError::not_found("Reservation", "id", reservation_id));
        }
        self.repos.ledger().find_by_reservation(reservation_id).await
    }

    /// Flag a refund that could not be completed automatically
    pub(crate) async fn report_failed_refund(&self, user_id: &str, reservation_id: i32, error: &DomainError) {
        counter!("refunds_total", "outcome" => "failed").increment(1);
        warn!(
            reservation_id,
            user_id,
            error = %error,
            "Refund failed, pending manual reconciliation"
        );
        notify_best_effort(
            self.notifier.as_ref(),
            Notification::RefundPendingReview {
                user_id: user_id.to_string(),
                reservation_id,
                reason: error.to_string(),
            },
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestEnv;

    #[tokio::test]
    async fn pending_fee_is_created_once() {
        let env = TestEnv::new().await;
        let reservation = env.reservation("cust-1").await;
        let ledger = &env.services.ledger;

        let first = ledger
            .ensure_pending_fee(reservation.id, FeeType::DamageFee, 200_000)
            .await
            .unwrap();
        assert!(first.is_some());
        let second = ledger
            .ensure_pending_fee(reservation.id, FeeType::DamageFee, 200_000)
            .await
            .unwrap();
        assert!(second.is_none());

        // a different fee type is its own entry
        assert!(ledger
            .ensure_pending_fee(reservation.id, FeeType::LateFee, 50_000)
            .await
            .unwrap()
            .is_some());

        let entries = ledger.ledger_for_reservation(reservation.id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.status == PaymentStatus::Pending));
    }

    #[tokio::test]
    async fn fee_committed_by_another_request_is_not_duplicated() {
        let env = TestEnv::new().await;
        let reservation = env.reservation("cust-1").await;
        let damage =
            NewLedgerEntry::pending_fee("cust-1", reservation.id, FeeType::DamageFee, 200_000);
        env.repos.ledger().insert(damage.clone()).await.unwrap();

        let uow = env.repos.begin().await.unwrap();
        assert!(uow.ledger().insert_pending_fee(damage).await.unwrap().is_none());
        assert!(ensure_pending_fee_in(&*uow, reservation.id, FeeType::DamageFee, 200_000)
            .await
            .unwrap()
            .is_none());
        // the transaction is still usable after the swallowed duplicate
        let late = ensure_pending_fee_in(&*uow, reservation.id, FeeType::LateFee, 25_000)
            .await
            .unwrap();
        assert!(late.is_some());
        uow.commit().await.unwrap();

        let entries = env.services.ledger.ledger_for_reservation(reservation.id).await.unwrap();
        assert_eq!(entries.len(), 2);
        let damage_fees = entries
            .iter()
            .filter(|e| e.transaction_type == TransactionType::DamageFee)
            .count();
        assert_eq!(damage_fees, 1);
    }

    #[tokio::test]
    async fn refund_with_nothing_paid_is_noop() {
        let env = TestEnv::new().await;
        let reservation = env.reservation("cust-1").await;

        let outcome = env
            .services
            .ledger
            .refund_on_cancellation(reservation.id)
            .await
            .unwrap();
        assert_eq!(outcome.refunded, 0);
        assert!(env.repos.wallets().find("cust-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn wallet_payment_requires_funds() {
        let env = TestEnv::new().await;
        let reservation = env.reservation("cust-1").await;
        let ledger = &env.services.ledger;

        let err = ledger.pay_with_wallet(reservation.id, 10_000).await.unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        ledger.top_up("cust-1", 30_000, MethodType::Card).await.unwrap();
        let receipt = ledger.pay_with_wallet(reservation.id, 10_000).await.unwrap();
        assert_eq!(receipt.new_balance, 20_000);
        assert_eq!(receipt.entry.method, Some(MethodType::Wallet));
        assert_eq!(ledger.get_wallet("cust-1").await.unwrap().balance, 20_000);
    }

    #[tokio::test]
    async fn fee_can_be_settled_from_wallet() {
        let env = TestEnv::new().await;
        let reservation = env.reservation("cust-1").await;
        let ledger = &env.services.ledger;

        let fee = ledger
            .ensure_pending_fee(reservation.id, FeeType::LateFee, 5_000)
            .await
            .unwrap()
            .unwrap();
        ledger.top_up("cust-1", 8_000, MethodType::Cash).await.unwrap();

        let paid = ledger
            .mark_payment_succeeded(&fee.id, MethodType::Wallet)
            .await
            .unwrap();
        assert_eq!(paid.status, PaymentStatus::Success);
        assert_eq!(ledger.get_wallet("cust-1").await.unwrap().balance, 3_000);

        let again = ledger
            .mark_payment_succeeded(&fee.id, MethodType::Wallet)
            .await
            .unwrap_err();
        assert!(matches!(again, DomainError::Conflict(_)));
        assert_eq!(ledger.get_wallet("cust-1").await.unwrap().balance, 3_000);
    }

    #[tokio::test]
    async fn top_up_from_wallet_is_rejected() {
        let env = TestEnv::new().await;
        let err = env
            .services
            .ledger
            .top_up("cust-1", 100, MethodType::Wallet)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn missing_wallet_reads_as_empty() {
        let env = TestEnv::new().await;
        let wallet = env.services.ledger.get_wallet("nobody").await.unwrap();
        assert_eq!(wallet.balance, 0);
    }
}
