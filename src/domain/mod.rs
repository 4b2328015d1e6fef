//! Domain layer: typed records, repository traits and ports

pub mod handover;
pub mod ledger;
pub mod payment_intent;
pub mod pickup_token;
pub mod ports;
pub mod rental;
pub mod repositories;
pub mod reservation;
pub mod vehicle;

pub use repositories::{DomainResult, Repositories, RepositoryProvider, UnitOfWork};

pub use crate::support::errors::DomainError;
