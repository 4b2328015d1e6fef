//! Payment intent entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "payment_intents")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub reservation_id: i32,
    pub user_id: String,
    pub amount: i64,

    /// Status: open, confirmed, expired
    pub status: String,

    pub expires_at: DateTimeUtc,

    #[sea_orm(nullable)]
    pub payment_id: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
