//! # EV Rental Core
//!
//! Reservation, pickup, handover and fee-ledger orchestration for an
//! electric-vehicle rental fleet.
//!
//! ## Architecture
//!
//! - **domain**: Typed records, status machines, repository traits and ports
//! - **application**: Use cases over a unit of work (reservations, pickup
//!   tokens, handovers, wallet ledger, payment intents, expiry)
//! - **infrastructure**: SeaORM storage and the notification bus
//! - **interfaces**: REST API with Swagger documentation
//! - **server**: Process lifecycle shared by the CLI

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod support;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::{default_config_path, AppConfig};

pub use infrastructure::{create_event_bus, init_database, DatabaseConfig, SeaOrmRepositoryProvider};

pub use interfaces::http::create_api_router;
