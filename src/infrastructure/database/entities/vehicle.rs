//! Vehicle entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "vehicles")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub station_id: i32,
    pub model: String,

    /// Status: available, pending, rented, awaiting_processing, maintenance
    pub status: String,

    pub battery_level: i32,
    pub mileage: i64,

    #[sea_orm(nullable)]
    pub condition_notes: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::vehicle_status_change::Entity")]
    StatusChanges,
    #[sea_orm(has_many = "super::reservation::Entity")]
    Reservations,
}

impl Related<super::vehicle_status_change::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StatusChanges.def()
    }
}

impl Related<super::reservation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Reservations.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
