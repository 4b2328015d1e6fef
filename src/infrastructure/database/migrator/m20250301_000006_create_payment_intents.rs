//! Create payment_intents table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PaymentIntents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PaymentIntents::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PaymentIntents::ReservationId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PaymentIntents::UserId).string().not_null())
                    .col(
                        ColumnDef::new(PaymentIntents::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentIntents::Status)
                            .string()
                            .not_null()
                            .default("open"),
                    )
                    .col(
                        ColumnDef::new(PaymentIntents::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(PaymentIntents::PaymentId).string())
                    .col(
                        ColumnDef::new(PaymentIntents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentIntents::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payment_intents_status_expiry")
                    .table(PaymentIntents::Table)
                    .col(PaymentIntents::Status)
                    .col(PaymentIntents::ExpiresAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PaymentIntents::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum PaymentIntents {
    Table,
    Id,
    ReservationId,
    UserId,
    Amount,
    Status,
    ExpiresAt,
    PaymentId,
    CreatedAt,
    UpdatedAt,
}
