//! SeaORM implementation of PaymentIntentRepository

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use super::{db_err, DbConn};
use crate::domain::payment_intent::{
    IntentStatus, NewPaymentIntent, PaymentIntent, PaymentIntentRepository,
};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::payment_intent;

pub struct SeaOrmPaymentIntentRepository<C> {
    db: Arc<C>,
}

impl<C: DbConn> SeaOrmPaymentIntentRepository<C> {
    pub fn new(db: Arc<C>) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: payment_intent::Model) -> DomainResult<PaymentIntent> {
    Ok(PaymentIntent {
        id: m.id,
        reservation_id: m.reservation_id,
        user_id: m.user_id,
        amount: m.amount,
        status: m.status.parse()?,
        expires_at: m.expires_at,
        payment_id: m.payment_id,
        created_at: m.created_at,
    })
}

#[async_trait]
impl<C: DbConn> PaymentIntentRepository for SeaOrmPaymentIntentRepository<C> {
    async fn insert(&self, i: NewPaymentIntent) -> DomainResult<PaymentIntent> {
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();
        debug!("Opening payment intent {} for reservation {}", id, i.reservation_id);

        let model = payment_intent::ActiveModel {
            id: Set(id),
            reservation_id: Set(i.reservation_id),
            user_id: Set(i.user_id),
            amount: Set(i.amount),
            status: Set(IntentStatus::Open.as_str().to_string()),
            expires_at: Set(i.expires_at),
            payment_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let saved = model.insert(self.db.as_ref()).await.map_err(db_err)?;
        model_to_domain(saved)
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<PaymentIntent>> {
        payment_intent::Entity::find_by_id(id.to_string())
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn mark_confirmed(&self, id: &str, payment_id: &str) -> DomainResult<u64> {
        let result = payment_intent::Entity::update_many()
            .col_expr(
                payment_intent::Column::Status,
                Expr::value(IntentStatus::Confirmed.as_str()),
            )
            .col_expr(payment_intent::Column::PaymentId, Expr::value(payment_id))
            .col_expr(payment_intent::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(payment_intent::Column::Id.eq(id))
            .filter(payment_intent::Column::Status.eq(IntentStatus::Open.as_str()))
            .exec(self.db.as_ref())
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }

    async fn expire_overdue(&self, now: DateTime<Utc>) -> DomainResult<u64> {
        let result = payment_intent::Entity::update_many()
            .col_expr(
                payment_intent::Column::Status,
                Expr::value(IntentStatus::Expired.as_str()),
            )
            .col_expr(payment_intent::Column::UpdatedAt, Expr::value(now))
            .filter(payment_intent::Column::Status.eq(IntentStatus::Open.as_str()))
            .filter(payment_intent::Column::ExpiresAt.lt(now))
            .exec(self.db.as_ref())
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }
}
