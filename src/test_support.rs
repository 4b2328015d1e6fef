//! In-memory fixture shared by service and HTTP tests

use std::sync::Arc;

use chrono::{Duration, Utc};
use sea_orm::{ConnectionTrait, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use crate::application::AppServices;
use crate::config::AppConfig;
use crate::domain::ports::Notifier;
use crate::domain::reservation::{NewReservation, Reservation};
use crate::domain::vehicle::{NewVehicle, Vehicle};
use crate::domain::RepositoryProvider;
use crate::infrastructure::database::migrator::Migrator;
use crate::infrastructure::{
    create_event_bus, init_database, DatabaseConfig, EventBusNotifier, SeaOrmRepositoryProvider,
    SharedEventBus,
};

pub struct TestEnv {
    pub repos: Arc<dyn RepositoryProvider>,
    pub services: AppServices,
    pub bus: SharedEventBus,
    pub db: DatabaseConnection,
}

impl TestEnv {
    pub const STATION_ID: i32 = 7;
    pub const TOKEN_SECRET: &'static str = "test-pickup-secret";
    pub const LATE_FEE_PER_HOUR: i64 = 25_000;

    pub async fn new() -> Self {
        let db = init_database(&DatabaseConfig::in_memory()).await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let mut config = AppConfig::default();
        config.pickup.token_secret = Self::TOKEN_SECRET.to_string();
        config.pickup.token_validity_hours = 24;
        config.fees.late_fee_per_hour = Self::LATE_FEE_PER_HOUR;
        config.fees.late_grace_minutes = 15;
        config.fees.backfill_match_days = 30;
        config.payments.intent_ttl_minutes = 30;

        let repos: Arc<dyn RepositoryProvider> =
            Arc::new(SeaOrmRepositoryProvider::new(db.clone()));
        let bus = create_event_bus();
        let notifier: Arc<dyn Notifier> = Arc::new(EventBusNotifier::new(bus.clone()));
        let services = AppServices::new(repos.clone(), notifier, &config);

        Self {
            repos,
            services,
            bus,
            db,
        }
    }

    /// Register an available vehicle at [`Self::STATION_ID`]
    pub async fn vehicle(&self) -> Vehicle {
        self.services
            .vehicles
            .register(NewVehicle {
                station_id: Self::STATION_ID,
                model: "EQ-3".to_string(),
                battery_level: 90,
                mileage: 12_000,
            })
            .await
            .unwrap()
    }

    /// A three-hour booking starting in an hour
    pub fn new_reservation(&self, user_id: &str, vehicle: &Vehicle) -> NewReservation {
        let start = Utc::now() + Duration::hours(1);
        NewReservation {
            user_id: user_id.to_string(),
            vehicle_id: vehicle.id,
            station_id: vehicle.station_id,
            start_time: start,
            end_time: start + Duration::hours(3),
        }
    }

    /// Fresh vehicle plus a pending reservation on it
    pub async fn reservation(&self, user_id: &str) -> Reservation {
        let vehicle = self.vehicle().await;
        self.services
            .reservations
            .create(self.new_reservation(user_id, &vehicle))
            .await
            .unwrap()
    }

    /// Number of status writes recorded for a vehicle
    pub async fn status_writes(&self, vehicle_id: i32) -> usize {
        self.services.vehicles.history(vehicle_id).await.unwrap().len()
    }

    /// Make every ledger write fail from here on
    pub async fn break_payments_table(&self) {
        self.db.execute_unprepared("DROP TABLE payments").await.unwrap();
    }
}
