//! Create rentals and pickup_tokens tables

use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_vehicles::Vehicles;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Rentals::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Rentals::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Rentals::ReservationId).integer().unique_key())
                    .col(ColumnDef::new(Rentals::UserId).string().not_null())
                    .col(ColumnDef::new(Rentals::VehicleId).integer().not_null())
                    .col(ColumnDef::new(Rentals::PickupStationId).integer().not_null())
                    .col(ColumnDef::new(Rentals::ReturnStationId).integer())
                    .col(
                        ColumnDef::new(Rentals::StartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Rentals::EndTime).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Rentals::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Rentals::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Rentals::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_rentals_vehicle")
                            .from(Rentals::Table, Rentals::VehicleId)
                            .to(Vehicles::Table, Vehicles::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_rentals_user_vehicle")
                    .table(Rentals::Table)
                    .col(Rentals::UserId)
                    .col(Rentals::VehicleId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PickupTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PickupTokens::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PickupTokens::RentalId)
                            .integer()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(PickupTokens::Payload)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(PickupTokens::Status)
                            .string()
                            .not_null()
                            .default("active"),
                    )
                    .col(
                        ColumnDef::new(PickupTokens::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PickupTokens::UsedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(PickupTokens::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PickupTokens::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_pickup_tokens_rental")
                            .from(PickupTokens::Table, PickupTokens::RentalId)
                            .to(Rentals::Table, Rentals::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PickupTokens::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Rentals::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Rentals {
    Table,
    Id,
    ReservationId,
    UserId,
    VehicleId,
    PickupStationId,
    ReturnStationId,
    StartTime,
    EndTime,
    Status,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
pub enum PickupTokens {
    Table,
    Id,
    RentalId,
    Payload,
    Status,
    ExpiresAt,
    UsedAt,
    CreatedAt,
    UpdatedAt,
}
