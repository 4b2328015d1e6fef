//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories, generic over the connection so the
//! same code runs against the pool or inside a unit of work.

pub mod handover_repository;
pub mod ledger_repository;
pub mod payment_intent_repository;
pub mod pickup_token_repository;
pub mod rental_repository;
pub mod repository_provider;
pub mod reservation_repository;
pub mod vehicle_repository;

pub use repository_provider::{SeaOrmRepositories, SeaOrmRepositoryProvider, SeaOrmUnitOfWork};

use sea_orm::{ConnectionTrait, DbErr};

use crate::domain::DomainError;

/// A SeaORM connection a repository can hold: the pool or a transaction
pub trait DbConn: ConnectionTrait + Send + Sync + 'static {}

impl<T: ConnectionTrait + Send + Sync + 'static> DbConn for T {}

fn db_err(e: DbErr) -> DomainError {
    log::debug!("Database error: {}", e);
    DomainError::from(e)
}
