//! Create vehicles and vehicle_status_changes tables

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vehicles::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Vehicles::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Vehicles::StationId).integer().not_null())
                    .col(ColumnDef::new(Vehicles::Model).string().not_null())
                    .col(
                        ColumnDef::new(Vehicles::Status)
                            .string()
                            .not_null()
                            .default("available"),
                    )
                    .col(
                        ColumnDef::new(Vehicles::BatteryLevel)
                            .integer()
                            .not_null()
                            .default(100),
                    )
                    .col(
                        ColumnDef::new(Vehicles::Mileage)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Vehicles::ConditionNotes).text())
                    .col(
                        ColumnDef::new(Vehicles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Vehicles::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_vehicles_station_status")
                    .table(Vehicles::Table)
                    .col(Vehicles::StationId)
                    .col(Vehicles::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(VehicleStatusChanges::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VehicleStatusChanges::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(VehicleStatusChanges::VehicleId)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VehicleStatusChanges::FromStatus)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VehicleStatusChanges::ToStatus)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VehicleStatusChanges::Reason)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VehicleStatusChanges::Actor)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(VehicleStatusChanges::ChangedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vehicle_status_changes_vehicle")
                            .from(VehicleStatusChanges::Table, VehicleStatusChanges::VehicleId)
                            .to(Vehicles::Table, Vehicles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_vehicle_status_changes_vehicle")
                    .table(VehicleStatusChanges::Table)
                    .col(VehicleStatusChanges::VehicleId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VehicleStatusChanges::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Vehicles::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Vehicles {
    Table,
    Id,
    StationId,
    Model,
    Status,
    BatteryLevel,
    Mileage,
    ConditionNotes,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub enum VehicleStatusChanges {
    Table,
    Id,
    VehicleId,
    FromStatus,
    ToStatus,
    Reason,
    Actor,
    ChangedAt,
}
