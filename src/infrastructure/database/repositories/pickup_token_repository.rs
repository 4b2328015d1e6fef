//! SeaORM implementation of PickupTokenRepository

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};

use super::{db_err, DbConn};
use crate::domain::pickup_token::{PickupToken, PickupTokenRepository, TokenStatus};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::pickup_token;

pub struct SeaOrmPickupTokenRepository<C> {
    db: Arc<C>,
}

impl<C: DbConn> SeaOrmPickupTokenRepository<C> {
    pub fn new(db: Arc<C>) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: pickup_token::Model) -> DomainResult<PickupToken> {
    Ok(PickupToken {
        id: m.id,
        rental_id: m.rental_id,
        payload: m.payload,
        status: m.status.parse()?,
        expires_at: m.expires_at,
        used_at: m.used_at,
        created_at: m.created_at,
    })
}

#[async_trait]
impl<C: DbConn> PickupTokenRepository for SeaOrmPickupTokenRepository<C> {
    async fn insert(
        &self,
        rental_id: i32,
        payload: &str,
        expires_at: DateTime<Utc>,
    ) -> DomainResult<PickupToken> {
        debug!("Issuing pickup token for rental {}", rental_id);
        let now = Utc::now();

        let model = pickup_token::ActiveModel {
            rental_id: Set(rental_id),
            payload: Set(payload.to_string()),
            status: Set(TokenStatus::Active.as_str().to_string()),
            expires_at: Set(expires_at),
            used_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };
        let saved = model.insert(self.db.as_ref()).await.map_err(db_err)?;
        model_to_domain(saved)
    }

    async fn find_by_payload(&self, payload: &str) -> DomainResult<Option<PickupToken>> {
        pickup_token::Entity::find()
            .filter(pickup_token::Column::Payload.eq(payload))
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_by_rental(&self, rental_id: i32) -> DomainResult<Option<PickupToken>> {
        pickup_token::Entity::find()
            .filter(pickup_token::Column::RentalId.eq(rental_id))
            .one(self.db.as_ref())
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn refresh(
        &self,
        id: i32,
        payload: &str,
        expires_at: DateTime<Utc>,
    ) -> DomainResult<u64> {
        debug!("Refreshing pickup token {}", id);

        let result = pickup_token::Entity::update_many()
            .col_expr(pickup_token::Column::Payload, Expr::value(payload))
            .col_expr(pickup_token::Column::ExpiresAt, Expr::value(expires_at))
            .col_expr(pickup_token::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(pickup_token::Column::Id.eq(id))
            .filter(pickup_token::Column::Status.eq(TokenStatus::Active.as_str()))
            .exec(self.db.as_ref())
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }

    async fn mark_used(&self, id: i32, used_at: DateTime<Utc>) -> DomainResult<u64> {
        let result = pickup_token::Entity::update_many()
            .col_expr(
                pickup_token::Column::Status,
                Expr::value(TokenStatus::Used.as_str()),
            )
            .col_expr(pickup_token::Column::UsedAt, Expr::value(used_at))
            .col_expr(pickup_token::Column::UpdatedAt, Expr::value(used_at))
            .filter(pickup_token::Column::Id.eq(id))
            .filter(pickup_token::Column::Status.eq(TokenStatus::Active.as_str()))
            .exec(self.db.as_ref())
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }
}
