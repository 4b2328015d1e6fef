//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_vehicles;
mod m20250301_000002_create_reservations;
mod m20250301_000003_create_rentals;
mod m20250301_000004_create_handovers;
mod m20250301_000005_create_payments;
mod m20250301_000006_create_payment_intents;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_vehicles::Migration),
            Box::new(m20250301_000002_create_reservations::Migration),
            Box::new(m20250301_000003_create_rentals::Migration),
            Box::new(m20250301_000004_create_handovers::Migration),
            Box::new(m20250301_000005_create_payments::Migration),
            Box::new(m20250301_000006_create_payment_intents::Migration),
        ]
    }
}
