//! SeaORM implementations of LedgerRepository and WalletRepository
//!
//! Wallet balances only move through relative updates
//! (`balance = balance + ?`), never read-modify-write from memory.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;

use super::{db_err, DbConn};
use crate::domain::ledger::{
    LedgerEntry, LedgerRepository, MethodType, NewLedgerEntry, PaymentStatus, TransactionType,
    Wallet, WalletRepository,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::{payment, wallet};

pub struct SeaOrmLedgerRepository<C> {
    db: Arc<C>,
}

impl<C: DbConn> SeaOrmLedgerRepository<C> {
    pub fn new(db: Arc<C>) -> Self {
        Self { db }
    }
}

pub struct SeaOrmWalletRepository<C> {
    db: Arc<C>,
}

impl<C: DbConn> SeaOrmWalletRepository<C> {
    pub fn new(db: Arc<C>) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: payment::Model) -> DomainResult<LedgerEntry> {
    Ok(LedgerEntry {
        id: m.id,
        user_id: m.user_id,
        reservation_id: m.reservation_id,
        method: m.method_type.as_deref().map(str::parse::<MethodType>).transpose()?,
        amount: m.amount,
        status: m.status.parse()?,
        transaction_type: m.transaction_type.parse()?,
        transaction_ref: m.transaction_ref,
        note: m.note,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

fn wallet_to_domain(m: wallet::Model) -> Wallet {
    Wallet {
        user_id: m.user_id,
        balance: m.balance,
        updated_at: m.updated_at,
    }
}

/// Unique, human-quotable transaction reference
fn transaction_ref() -> String {
    format!("EVR-{}", Uuid::new_v4().simple()).to_uppercase()
}

fn new_payment(e: NewLedgerEntry) -> payment::ActiveModel {
    let now = Utc::now();
    payment::ActiveModel {
        id: Set(Uuid::new_v4().to_string()),
        user_id: Set(e.user_id),
        reservation_id: Set(e.reservation_id),
        method_type: Set(e.method.map(|m| m.as_str().to_string())),
        amount: Set(e.amount),
        status: Set(e.status.as_str().to_string()),
        transaction_type: Set(e.transaction_type.as_str().to_string()),
        transaction_ref: Set(transaction_ref()),
        note: Set(e.note),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

// ── LedgerRepository impl ───────────────────────────────────────

#[async_trait]
impl<C: DbConn> LedgerRepository for SeaOrmLedgerRepository<C> {
    async fn insert(&self, e: NewLedgerEntry) -> DomainResult<LedgerEntry> {
        debug!(
            "Ledger entry: user={}, reservation={:?}, type={}, amount={}",
            e.user_id, e.reservation_id, e.transaction_type, e.amount
        );
        let saved = new_payment(e).insert(self.db.as_ref()).await.map_err(db_err)?;
        model_to_domain(saved)
    }

    async fn insert_pending_fee(&self, e: NewLedgerEntry) -> DomainResult<Option<LedgerEntry>> {
        debug!(
            "Pending fee: reservation={:?}, type={}, amount={}",
            e.reservation_id, e.transaction_type, e.amount
        );
        let id = Uuid::new_v4().to_string();
        let mut model = new_payment(e);
        model.id = Set(id.clone());

        // DO NOTHING keeps the surrounding transaction usable on a duplicate
        let inserted = payment::Entity::insert(model)
            .on_conflict(OnConflict::new().do_nothing().to_owned())
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(db_err)?;
        if inserted == 0 {
            return Ok(None);
        }
        self.find_by_id(&id).await
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<LedgerEntry>> {
        payment::Entity::find_by_id(id.to_string())
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_pending_fee(
        &self,
        reservation_id: i32,
        transaction_type: TransactionType,
    ) -> DomainResult<Option<LedgerEntry>> {
        payment::Entity::find()
            .filter(payment::Column::ReservationId.eq(reservation_id))
            .filter(payment::Column::TransactionType.eq(transaction_type.as_str()))
            .filter(payment::Column::Status.eq(PaymentStatus::Pending.as_str()))
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_by_reservation(&self, reservation_id: i32) -> DomainResult<Vec<LedgerEntry>> {
        payment::Entity::find()
            .filter(payment::Column::ReservationId.eq(reservation_id))
            .order_by_asc(payment::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?
            .into_iter()
            .map(model_to_domain)
            .collect()
    }

    async fn find_refundable(&self, reservation_id: i32) -> DomainResult<Vec<LedgerEntry>> {
        payment::Entity::find()
            .filter(payment::Column::ReservationId.eq(reservation_id))
            .filter(payment::Column::MethodType.eq(MethodType::Wallet.as_str()))
            .filter(payment::Column::Status.eq(PaymentStatus::Success.as_str()))
            .filter(payment::Column::TransactionType.ne(TransactionType::Refund.as_str()))
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?
            .into_iter()
            .map(model_to_domain)
            .collect()
    }

    async fn mark_refunded(&self, ids: &[String]) -> DomainResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = payment::Entity::update_many()
            .col_expr(
                payment::Column::Status,
                Expr::value(PaymentStatus::Refunded.as_str()),
            )
            .col_expr(payment::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(payment::Column::Id.is_in(ids.iter().cloned()))
            .filter(payment::Column::Status.eq(PaymentStatus::Success.as_str()))
            .exec(self.db.as_ref())
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }

    async fn mark_succeeded(&self, id: &str, method: MethodType) -> DomainResult<u64> {
        let result = payment::Entity::update_many()
            .col_expr(
                payment::Column::Status,
                Expr::value(PaymentStatus::Success.as_str()),
            )
            .col_expr(payment::Column::MethodType, Expr::value(method.as_str()))
            .col_expr(payment::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(payment::Column::Id.eq(id))
            .filter(payment::Column::Status.eq(PaymentStatus::Pending.as_str()))
            .exec(self.db.as_ref())
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }
}

// ── WalletRepository impl ───────────────────────────────────────

impl<C: DbConn> SeaOrmWalletRepository<C> {
    async fn balance_of(&self, user_id: &str) -> DomainResult<i64> {
        wallet::Entity::find_by_id(user_id.to_string())
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .map(|w| w.balance)
            .ok_or_else(|| DomainError::not_found("Wallet", "user_id", user_id))
    }

    async fn increment(&self, user_id: &str, amount: i64) -> DomainResult<u64> {
        let result = wallet::Entity::update_many()
            .col_expr(
                wallet::Column::Balance,
                Expr::col(wallet::Column::Balance).add(amount),
            )
            .col_expr(wallet::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(wallet::Column::UserId.eq(user_id))
            .exec(self.db.as_ref())
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }
}

#[async_trait]
impl<C: DbConn> WalletRepository for SeaOrmWalletRepository<C> {
    async fn find(&self, user_id: &str) -> DomainResult<Option<Wallet>> {
        Ok(wallet::Entity::find_by_id(user_id.to_string())
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .map(wallet_to_domain))
    }

    async fn credit(&self, user_id: &str, amount: i64) -> DomainResult<i64> {
        debug!("Wallet credit: user={}, amount={}", user_id, amount);

        if self.increment(user_id, amount).await? == 0 {
            let model = wallet::ActiveModel {
                user_id: Set(user_id.to_string()),
                balance: Set(amount),
                updated_at: Set(Utc::now()),
            };
            let inserted = wallet::Entity::insert(model)
                .on_conflict(
                    OnConflict::column(wallet::Column::UserId)
                        .do_nothing()
                        .to_owned(),
                )
                .exec_without_returning(self.db.as_ref())
                .await
                .map_err(db_err)?;
            // Created concurrently; fall back to the relative update
            if inserted == 0 {
                self.increment(user_id, amount).await?;
            }
        }

        self.balance_of(user_id).await
    }

    async fn debit(&self, user_id: &str, amount: i64) -> DomainResult<Option<i64>> {
        debug!("Wallet debit: user={}, amount={}", user_id, amount);

        let result = wallet::Entity::update_many()
            .col_expr(
                wallet::Column::Balance,
                Expr::col(wallet::Column::Balance).sub(amount),
            )
            .col_expr(wallet::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(wallet::Column::UserId.eq(user_id))
            .filter(wallet::Column::Balance.gte(amount))
            .exec(self.db.as_ref())
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.balance_of(user_id).await.map(Some)
    }
}
