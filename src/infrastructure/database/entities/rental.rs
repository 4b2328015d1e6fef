//! Rental entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "rentals")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Unique once set; legacy rentals may have none
    #[sea_orm(nullable)]
    pub reservation_id: Option<i32>,

    pub user_id: String,
    pub vehicle_id: i32,
    pub pickup_station_id: i32,

    #[sea_orm(nullable)]
    pub return_station_id: Option<i32>,

    pub start_time: DateTimeUtc,

    #[sea_orm(nullable)]
    pub end_time: Option<DateTimeUtc>,

    /// Status: pending, ongoing, completed
    pub status: String,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::reservation::Entity",
        from = "Column::ReservationId",
        to = "super::reservation::Column::Id"
    )]
    Reservation,
    #[sea_orm(has_one = "super::pickup_token::Entity")]
    PickupToken,
}

impl Related<super::reservation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reservation.def()
    }
}

impl Related<super::pickup_token::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PickupToken.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
