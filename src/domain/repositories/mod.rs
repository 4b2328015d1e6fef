//! Repository access and transaction boundaries
//!
//! - `Repositories`: accessors for every per-aggregate repository
//! - `RepositoryProvider`: pool-backed repositories plus `begin()`
//! - `UnitOfWork`: the same repositories bound to one open transaction
//!
//! ```ignore
//! let uow = provider.begin().await?;
//! uow.pickup_tokens().mark_used(token.id, now).await?;
//! uow.vehicles().update_status(id, &[VehicleStatus::Pending], VehicleStatus::Rented).await?;
//! uow.commit().await?;
//! ```
//!
//! Dropping a unit of work without calling `commit` rolls everything back.

use async_trait::async_trait;

use super::handover::HandoverRepository;
use super::ledger::{LedgerRepository, WalletRepository};
use super::payment_intent::PaymentIntentRepository;
use super::pickup_token::PickupTokenRepository;
use super::rental::RentalRepository;
use super::reservation::ReservationRepository;
use super::vehicle::VehicleRepository;
use crate::support::errors::DomainError;

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

pub trait Repositories: Send + Sync {
    fn vehicles(&self) -> &dyn VehicleRepository;
    fn reservations(&self) -> &dyn ReservationRepository;
    fn rentals(&self) -> &dyn RentalRepository;
    fn pickup_tokens(&self) -> &dyn PickupTokenRepository;
    fn handovers(&self) -> &dyn HandoverRepository;
    fn ledger(&self) -> &dyn LedgerRepository;
    fn wallets(&self) -> &dyn WalletRepository;
    fn payment_intents(&self) -> &dyn PaymentIntentRepository;
}

#[async_trait]
pub trait RepositoryProvider: Repositories {
    /// Open a transaction scope
    async fn begin(&self) -> DomainResult<Box<dyn UnitOfWork>>;
}

#[async_trait]
pub trait UnitOfWork: Repositories {
    async fn commit(self: Box<Self>) -> DomainResult<()>;
}
