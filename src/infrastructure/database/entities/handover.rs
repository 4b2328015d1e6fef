//! Handover entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "handovers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(nullable)]
    pub rental_id: Option<i32>,

    #[sea_orm(nullable)]
    pub reservation_id: Option<i32>,

    #[sea_orm(nullable)]
    pub vehicle_id: Option<i32>,

    pub staff_id: String,

    /// Type: pickup, return, qc
    pub handover_type: String,

    #[sea_orm(nullable)]
    pub battery_level: Option<i32>,
    #[sea_orm(nullable)]
    pub mileage: Option<i64>,
    #[sea_orm(nullable)]
    pub exterior: Option<String>,
    #[sea_orm(nullable)]
    pub interior: Option<String>,
    #[sea_orm(nullable)]
    pub tires: Option<String>,
    #[sea_orm(nullable)]
    pub notes: Option<String>,

    /// JSON array of `{part, description, cost}`
    #[sea_orm(column_type = "Text")]
    pub damages: String,

    /// JSON array of URLs
    #[sea_orm(column_type = "Text")]
    pub image_urls: String,

    pub late_fee: i64,
    pub damage_fee: i64,
    pub total_due: i64,
    pub deposit_refund: i64,
    pub clear_damages: bool,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::rental::Entity",
        from = "Column::RentalId",
        to = "super::rental::Column::Id"
    )]
    Rental,
}

impl Related<super::rental::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rental.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
