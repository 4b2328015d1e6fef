//! Ledger entry ("payment") entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub user_id: String,

    #[sea_orm(nullable)]
    pub reservation_id: Option<i32>,

    /// wallet, card, cash, bank_transfer
    #[sea_orm(nullable)]
    pub method_type: Option<String>,

    pub amount: i64,

    /// Status: pending, success, refunded
    pub status: String,

    /// payment, late_fee, damage_fee, refund
    pub transaction_type: String,

    #[sea_orm(unique)]
    pub transaction_ref: String,

    #[sea_orm(nullable)]
    pub note: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
