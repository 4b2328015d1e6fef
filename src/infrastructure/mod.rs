//! Infrastructure layer - storage and notification adapters

pub mod database;
pub mod notifications;

pub use database::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};
pub use notifications::{create_event_bus, EventBusNotifier, SharedEventBus};
