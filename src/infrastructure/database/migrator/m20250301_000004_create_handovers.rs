//! Create handovers table

use sea_orm_migration::prelude::*;

use super::m20250301_000003_create_rentals::Rentals;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Handovers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Handovers::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Handovers::RentalId).integer())
                    .col(ColumnDef::new(Handovers::ReservationId).integer())
                    .col(ColumnDef::new(Handovers::VehicleId).integer())
                    .col(ColumnDef::new(Handovers::StaffId).string().not_null())
                    .col(ColumnDef::new(Handovers::HandoverType).string().not_null())
                    .col(ColumnDef::new(Handovers::BatteryLevel).integer())
                    .col(ColumnDef::new(Handovers::Mileage).big_integer())
                    .col(ColumnDef::new(Handovers::Exterior).string())
                    .col(ColumnDef::new(Handovers::Interior).string())
                    .col(ColumnDef::new(Handovers::Tires).string())
                    .col(ColumnDef::new(Handovers::Notes).text())
                    .col(
                        ColumnDef::new(Handovers::Damages)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(Handovers::ImageUrls)
                            .text()
                            .not_null()
                            .default("[]"),
                    )
                    .col(
                        ColumnDef::new(Handovers::LateFee)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Handovers::DamageFee)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Handovers::TotalDue)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Handovers::DepositRefund)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Handovers::ClearDamages)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Handovers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_handovers_rental")
                            .from(Handovers::Table, Handovers::RentalId)
                            .to(Rentals::Table, Rentals::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_handovers_rental")
                    .table(Handovers::Table)
                    .col(Handovers::RentalId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_handovers_reservation")
                    .table(Handovers::Table)
                    .col(Handovers::ReservationId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Handovers::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Handovers {
    Table,
    Id,
    RentalId,
    ReservationId,
    VehicleId,
    StaffId,
    HandoverType,
    BatteryLevel,
    Mileage,
    Exterior,
    Interior,
    Tires,
    Notes,
    Damages,
    ImageUrls,
    LateFee,
    DamageFee,
    TotalDue,
    DepositRefund,
    ClearDamages,
    CreatedAt,
}
