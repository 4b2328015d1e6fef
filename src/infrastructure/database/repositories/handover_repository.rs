//! SeaORM implementation of HandoverRepository

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};

use super::{db_err, DbConn};
use crate::domain::handover::{
    Condition, Damage, FeeBreakdown, Handover, HandoverRepository, NewHandover,
};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::handover;

pub struct SeaOrmHandoverRepository<C> {
    db: Arc<C>,
}

impl<C: DbConn> SeaOrmHandoverRepository<C> {
    pub fn new(db: Arc<C>) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn json_err(e: serde_json::Error) -> DomainError {
    DomainError::Infrastructure(format!("Handover JSON column: {}", e))
}

fn model_to_domain(m: handover::Model) -> DomainResult<Handover> {
    let damages: Vec<Damage> = serde_json::from_str(&m.damages).map_err(json_err)?;
    let image_urls: Vec<String> = serde_json::from_str(&m.image_urls).map_err(json_err)?;

    Ok(Handover {
        id: m.id,
        rental_id: m.rental_id,
        reservation_id: m.reservation_id,
        vehicle_id: m.vehicle_id,
        staff_id: m.staff_id,
        handover_type: m.handover_type.parse()?,
        condition: Condition {
            battery_level: m.battery_level,
            mileage: m.mileage,
            exterior: m.exterior,
            interior: m.interior,
            tires: m.tires,
            notes: m.notes,
        },
        damages,
        image_urls,
        fees: FeeBreakdown {
            late_fee: m.late_fee,
            damage_fee: m.damage_fee,
            total_due: m.total_due,
            deposit_refund: m.deposit_refund,
        },
        clear_damages: m.clear_damages,
        created_at: m.created_at,
    })
}

// ── HandoverRepository impl ─────────────────────────────────────

#[async_trait]
impl<C: DbConn> HandoverRepository for SeaOrmHandoverRepository<C> {
    async fn insert(&self, h: NewHandover) -> DomainResult<Handover> {
        debug!(
            "Recording {} handover: rental={:?}, reservation={:?}",
            h.handover_type, h.rental_id, h.reservation_id
        );

        let model = handover::ActiveModel {
            rental_id: Set(h.rental_id),
            reservation_id: Set(h.reservation_id),
            vehicle_id: Set(h.vehicle_id),
            staff_id: Set(h.staff_id),
            handover_type: Set(h.handover_type.as_str().to_string()),
            battery_level: Set(h.condition.battery_level),
            mileage: Set(h.condition.mileage),
            exterior: Set(h.condition.exterior),
            interior: Set(h.condition.interior),
            tires: Set(h.condition.tires),
            notes: Set(h.condition.notes),
            damages: Set(serde_json::to_string(&h.damages).map_err(json_err)?),
            image_urls: Set(serde_json::to_string(&h.image_urls).map_err(json_err)?),
            late_fee: Set(h.fees.late_fee),
            damage_fee: Set(h.fees.damage_fee),
            total_due: Set(h.fees.total_due),
            deposit_refund: Set(h.fees.deposit_refund),
            clear_damages: Set(h.clear_damages),
            created_at: Set(Utc::now()),
            ..Default::default()
        };
        let saved = model.insert(self.db.as_ref()).await.map_err(db_err)?;
        model_to_domain(saved)
    }

    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Handover>> {
        handover::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_by_rental(&self, rental_id: i32) -> DomainResult<Vec<Handover>> {
        handover::Entity::find()
            .filter(handover::Column::RentalId.eq(rental_id))
            .order_by_asc(handover::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?
            .into_iter()
            .map(model_to_domain)
            .collect()
    }

    async fn find_by_reservation(&self, reservation_id: i32) -> DomainResult<Vec<Handover>> {
        handover::Entity::find()
            .filter(handover::Column::ReservationId.eq(reservation_id))
            .order_by_asc(handover::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(db_err)?
            .into_iter()
            .map(model_to_domain)
            .collect()
    }
}
