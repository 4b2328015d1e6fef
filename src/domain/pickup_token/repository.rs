//! Pickup token repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::PickupToken;
use crate::domain::DomainResult;

#[async_trait]
pub trait PickupTokenRepository: Send + Sync {
    async fn insert(
        &self,
        rental_id: i32,
        payload: &str,
        expires_at: DateTime<Utc>,
    ) -> DomainResult<PickupToken>;

    async fn find_by_payload(&self, payload: &str) -> DomainResult<Option<PickupToken>>;

    async fn find_by_rental(&self, rental_id: i32) -> DomainResult<Option<PickupToken>>;

    /// Replace payload and expiry of a still-active token; returns rows updated
    async fn refresh(
        &self,
        id: i32,
        payload: &str,
        expires_at: DateTime<Utc>,
    ) -> DomainResult<u64>;

    /// `active` → `used`. Returns 0 when the token was already used, which
    /// is how a losing concurrent redemption finds out.
    async fn mark_used(&self, id: i32, used_at: DateTime<Utc>) -> DomainResult<u64>;
}
