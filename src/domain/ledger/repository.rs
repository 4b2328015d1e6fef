//! Ledger and wallet repository interfaces

use async_trait::async_trait;

use super::model::{LedgerEntry, MethodType, NewLedgerEntry, TransactionType, Wallet};
use crate::domain::DomainResult;

#[async_trait]
pub trait LedgerRepository: Send + Sync {
    /// Insert with a generated id and unique transaction reference. A second
    /// pending entry for the same (reservation, type) is a `Conflict`.
    async fn insert(&self, entry: NewLedgerEntry) -> DomainResult<LedgerEntry>;

    /// Insert a `pending` fee entry unless one is already pending for the
    /// same (reservation, type). Returns `None` on that duplicate without
    /// failing the statement.
    async fn insert_pending_fee(&self, entry: NewLedgerEntry) -> DomainResult<Option<LedgerEntry>>;

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<LedgerEntry>>;

    async fn find_pending_fee(
        &self,
        reservation_id: i32,
        transaction_type: TransactionType,
    ) -> DomainResult<Option<LedgerEntry>>;

    /// All entries of a reservation, oldest first
    async fn find_by_reservation(&self, reservation_id: i32) -> DomainResult<Vec<LedgerEntry>>;

    /// Successful wallet-funded entries of a reservation, excluding refunds
    async fn find_refundable(&self, reservation_id: i32) -> DomainResult<Vec<LedgerEntry>>;

    /// `success → refunded` for the given ids; returns rows updated
    async fn mark_refunded(&self, ids: &[String]) -> DomainResult<u64>;

    /// `pending → success`; returns rows updated (0 or 1)
    async fn mark_succeeded(&self, id: &str, method: MethodType) -> DomainResult<u64>;
}

#[async_trait]
pub trait WalletRepository: Send + Sync {
    async fn find(&self, user_id: &str) -> DomainResult<Option<Wallet>>;

    /// Relative increment, creating the wallet if needed. Returns the new balance.
    async fn credit(&self, user_id: &str, amount: i64) -> DomainResult<i64>;

    /// Relative decrement guarded by `balance >= amount`. Returns the new
    /// balance, or `None` when funds were insufficient.
    async fn debit(&self, user_id: &str, amount: i64) -> DomainResult<Option<i64>>;
}
