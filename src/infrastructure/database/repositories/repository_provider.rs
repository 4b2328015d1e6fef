//! SeaORM implementations of RepositoryProvider and UnitOfWork

use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};

use crate::domain::handover::HandoverRepository;
use crate::domain::ledger::{LedgerRepository, WalletRepository};
use crate::domain::payment_intent::PaymentIntentRepository;
use crate::domain::pickup_token::PickupTokenRepository;
use crate::domain::rental::RentalRepository;
use crate::domain::repositories::{Repositories, RepositoryProvider, UnitOfWork};
use crate::domain::reservation::ReservationRepository;
use crate::domain::vehicle::VehicleRepository;
use crate::domain::{DomainError, DomainResult};

use super::handover_repository::SeaOrmHandoverRepository;
use super::ledger_repository::{SeaOrmLedgerRepository, SeaOrmWalletRepository};
use super::payment_intent_repository::SeaOrmPaymentIntentRepository;
use super::pickup_token_repository::SeaOrmPickupTokenRepository;
use super::rental_repository::SeaOrmRentalRepository;
use super::reservation_repository::SeaOrmReservationRepository;
use super::vehicle_repository::SeaOrmVehicleRepository;
use super::{db_err, DbConn};

/// Every per-aggregate repository bound to one connection `C`, either the
/// pool or an open transaction.
pub struct SeaOrmRepositories<C> {
    vehicles: SeaOrmVehicleRepository<C>,
    reservations: SeaOrmReservationRepository<C>,
    rentals: SeaOrmRentalRepository<C>,
    pickup_tokens: SeaOrmPickupTokenRepository<C>,
    handovers: SeaOrmHandoverRepository<C>,
    ledger: SeaOrmLedgerRepository<C>,
    wallets: SeaOrmWalletRepository<C>,
    payment_intents: SeaOrmPaymentIntentRepository<C>,
}

impl<C: DbConn> SeaOrmRepositories<C> {
    pub fn new(db: Arc<C>) -> Self {
        Self {
            vehicles: SeaOrmVehicleRepository::new(db.clone()),
            reservations: SeaOrmReservationRepository::new(db.clone()),
            rentals: SeaOrmRentalRepository::new(db.clone()),
            pickup_tokens: SeaOrmPickupTokenRepository::new(db.clone()),
            handovers: SeaOrmHandoverRepository::new(db.clone()),
            ledger: SeaOrmLedgerRepository::new(db.clone()),
            wallets: SeaOrmWalletRepository::new(db.clone()),
            payment_intents: SeaOrmPaymentIntentRepository::new(db),
        }
    }
}

impl<C: DbConn> Repositories for SeaOrmRepositories<C> {
    fn vehicles(&self) -> &dyn VehicleRepository {
        &self.vehicles
    }

    fn reservations(&self) -> &dyn ReservationRepository {
        &self.reservations
    }

    fn rentals(&self) -> &dyn RentalRepository {
        &self.rentals
    }

    fn pickup_tokens(&self) -> &dyn PickupTokenRepository {
        &self.pickup_tokens
    }

    fn handovers(&self) -> &dyn HandoverRepository {
        &self.handovers
    }

    fn ledger(&self) -> &dyn LedgerRepository {
        &self.ledger
    }

    fn wallets(&self) -> &dyn WalletRepository {
        &self.wallets
    }

    fn payment_intents(&self) -> &dyn PaymentIntentRepository {
        &self.payment_intents
    }
}

// ── Provider ────────────────────────────────────────────────────

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
/// Multi-entity writes go through [`RepositoryProvider::begin`].
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone());
/// let vehicle = repos.vehicles().find_by_id(7).await?;
/// let uow = repos.begin().await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    db: Arc<DatabaseConnection>,
    repos: SeaOrmRepositories<DatabaseConnection>,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection) -> Self {
        let db = Arc::new(db);
        Self {
            repos: SeaOrmRepositories::new(db.clone()),
            db,
        }
    }
}

impl Repositories for SeaOrmRepositoryProvider {
    fn vehicles(&self) -> &dyn VehicleRepository {
        self.repos.vehicles()
    }

    fn reservations(&self) -> &dyn ReservationRepository {
        self.repos.reservations()
    }

    fn rentals(&self) -> &dyn RentalRepository {
        self.repos.rentals()
    }

    fn pickup_tokens(&self) -> &dyn PickupTokenRepository {
        self.repos.pickup_tokens()
    }

    fn handovers(&self) -> &dyn HandoverRepository {
        self.repos.handovers()
    }

    fn ledger(&self) -> &dyn LedgerRepository {
        self.repos.ledger()
    }

    fn wallets(&self) -> &dyn WalletRepository {
        self.repos.wallets()
    }

    fn payment_intents(&self) -> &dyn PaymentIntentRepository {
        self.repos.payment_intents()
    }
}

#[async_trait]
impl RepositoryProvider for SeaOrmRepositoryProvider {
    async fn begin(&self) -> DomainResult<Box<dyn UnitOfWork>> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let txn = Arc::new(txn);
        Ok(Box::new(SeaOrmUnitOfWork {
            repos: SeaOrmRepositories::new(txn.clone()),
            txn,
        }))
    }
}

// ── Unit of work ────────────────────────────────────────────────

/// Repositories bound to one open transaction. Dropped without
/// [`UnitOfWork::commit`], SeaORM rolls the transaction back.
pub struct SeaOrmUnitOfWork {
    txn: Arc<DatabaseTransaction>,
    repos: SeaOrmRepositories<DatabaseTransaction>,
}

impl Repositories for SeaOrmUnitOfWork {
    fn vehicles(&self) -> &dyn VehicleRepository {
        self.repos.vehicles()
    }

    fn reservations(&self) -> &dyn ReservationRepository {
        self.repos.reservations()
    }

    fn rentals(&self) -> &dyn RentalRepository {
        self.repos.rentals()
    }

    fn pickup_tokens(&self) -> &dyn PickupTokenRepository {
        self.repos.pickup_tokens()
    }

    fn handovers(&self) -> &dyn HandoverRepository {
        self.repos.handovers()
    }

    fn ledger(&self) -> &dyn LedgerRepository {
        self.repos.ledger()
    }

    fn wallets(&self) -> &dyn WalletRepository {
        self.repos.wallets()
    }

    fn payment_intents(&self) -> &dyn PaymentIntentRepository {
        self.repos.payment_intents()
    }
}

#[async_trait]
impl UnitOfWork for SeaOrmUnitOfWork {
    async fn commit(self: Box<Self>) -> DomainResult<()> {
        let SeaOrmUnitOfWork { txn, repos } = *self;
        drop(repos);

        let txn = Arc::try_unwrap(txn).map_err(|_| {
            DomainError::Infrastructure("Transaction still referenced at commit".to_string())
        })?;
        txn.commit().await.map_err(db_err)
    }
}
