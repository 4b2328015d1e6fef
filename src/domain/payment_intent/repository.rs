//! Payment intent repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{NewPaymentIntent, PaymentIntent};
use crate::domain::DomainResult;

#[async_trait]
pub trait PaymentIntentRepository: Send + Sync {
    async fn insert(&self, intent: NewPaymentIntent) -> DomainResult<PaymentIntent>;

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<PaymentIntent>>;

    /// `open → confirmed` linking the ledger entry; returns rows updated
    async fn mark_confirmed(&self, id: &str, payment_id: &str) -> DomainResult<u64>;

    /// Expire every open intent whose deadline is before `now`; returns count
    async fn expire_overdue(&self, now: DateTime<Utc>) -> DomainResult<u64>;
}
