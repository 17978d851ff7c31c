//! SeaORM implementation of ReservationRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};

use crate::domain::reservation::{
    Reservation, ReservationItem, ReservationRepository, ReservationStatus,
};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::{reservation, reservation_item};
use crate::shared::errors::DomainError;

pub struct SeaOrmReservationRepository {
    db: DatabaseConnection,
}

impl SeaOrmReservationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: reservation::Model) -> Reservation {
    Reservation {
        id: m.id,
        user_id: m.user_id,
        vehicle_id: m.vehicle_id,
        station_id: m.station_id,
        subscription_id: m.subscription_id,
        status: ReservationStatus::from_str(&m.status),
        quantity: m.quantity as u32,
        reserved_at: m.reserved_at,
        expire_at: m.expire_at,
        used_at: m.used_at,
        cancelled_at: m.cancelled_at,
        cancel_reason: m.cancel_reason,
        swap_transaction_id: m.swap_transaction_id,
    }
}

fn item_to_domain(m: reservation_item::Model) -> ReservationItem {
    ReservationItem {
        id: m.id,
        reservation_id: m.reservation_id,
        battery_id: m.battery_id,
    }
}

fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Storage(e.to_string())
}

// ── ReservationRepository impl ──────────────────────────────────

#[async_trait]
impl ReservationRepository for SeaOrmReservationRepository {
    async fn insert_with_items(
        &self,
        r: Reservation,
        battery_ids: &[i64],
    ) -> DomainResult<Reservation> {
        debug!(
            "Saving reservation for vehicle {} with {} items",
            r.vehicle_id,
            battery_ids.len()
        );

        let txn = self.db.begin().await.map_err(db_err)?;

        let model = reservation::ActiveModel {
            id: NotSet,
            user_id: Set(r.user_id),
            vehicle_id: Set(r.vehicle_id),
            station_id: Set(r.station_id),
            subscription_id: Set(r.subscription_id),
            status: Set(r.status.as_str().to_string()),
            quantity: Set(r.quantity as i32),
            reserved_at: Set(r.reserved_at),
            expire_at: Set(r.expire_at),
            used_at: Set(r.used_at),
            cancelled_at: Set(r.cancelled_at),
            cancel_reason: Set(r.cancel_reason.clone()),
            swap_transaction_id: Set(r.swap_transaction_id),
        };
        let stored = model.insert(&txn).await.map_err(db_err)?;

        if !battery_ids.is_empty() {
            let items: Vec<reservation_item::ActiveModel> = battery_ids
                .iter()
                .map(|battery_id| reservation_item::ActiveModel {
                    id: NotSet,
                    reservation_id: Set(stored.id),
                    battery_id: Set(*battery_id),
                })
                .collect();
            reservation_item::Entity::insert_many(items)
                .exec(&txn)
                .await
                .map_err(db_err)?;
        }

        txn.commit().await.map_err(db_err)?;
        Ok(model_to_domain(stored))
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Reservation>> {
        let model = reservation::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_active_for_vehicle(&self, vehicle_id: i64) -> DomainResult<Option<Reservation>> {
        let model = reservation::Entity::find()
            .filter(reservation::Column::VehicleId.eq(vehicle_id))
            .filter(reservation::Column::Status.eq(ReservationStatus::Active.as_str()))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn list_for_user(&self, user_id: i64) -> DomainResult<Vec<Reservation>> {
        let models = reservation::Entity::find()
            .filter(reservation::Column::UserId.eq(user_id))
            .order_by_desc(reservation::Column::ReservedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn find_for_user_in_range(
        &self,
        user_id: i64,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DomainResult<Vec<Reservation>> {
        let models = reservation::Entity::find()
            .filter(reservation::Column::UserId.eq(user_id))
            .filter(reservation::Column::ReservedAt.gte(from))
            .filter(reservation::Column::ReservedAt.lt(to))
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn find_overdue(&self, now: DateTime<Utc>) -> DomainResult<Vec<Reservation>> {
        let models = reservation::Entity::find()
            .filter(reservation::Column::Status.eq(ReservationStatus::Active.as_str()))
            .filter(reservation::Column::ExpireAt.lt(now))
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn finish(
        &self,
        id: i64,
        next: ReservationStatus,
        at: DateTime<Utc>,
        reason: Option<&str>,
    ) -> DomainResult<bool> {
        let mut update = reservation::Entity::update_many()
            .col_expr(reservation::Column::Status, Expr::value(next.as_str()))
            .col_expr(reservation::Column::CancelledAt, Expr::value(Some(at)))
            .filter(reservation::Column::Id.eq(id))
            .filter(reservation::Column::Status.eq(ReservationStatus::Active.as_str()));
        if let Some(reason) = reason {
            update = update.col_expr(
                reservation::Column::CancelReason,
                Expr::value(Some(reason.to_string())),
            );
        }
        let res = update.exec(&self.db).await.map_err(db_err)?;
        Ok(res.rows_affected > 0)
    }

    async fn mark_used(
        &self,
        id: i64,
        swap_transaction_id: i64,
        at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let res = reservation::Entity::update_many()
            .col_expr(
                reservation::Column::Status,
                Expr::value(ReservationStatus::Used.as_str()),
            )
            .col_expr(reservation::Column::UsedAt, Expr::value(Some(at)))
            .col_expr(
                reservation::Column::SwapTransactionId,
                Expr::value(Some(swap_transaction_id)),
            )
            .filter(reservation::Column::Id.eq(id))
            .filter(reservation::Column::Status.eq(ReservationStatus::Active.as_str()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected > 0)
    }

    async fn items_for(&self, reservation_id: i64) -> DomainResult<Vec<ReservationItem>> {
        let models = reservation_item::Entity::find()
            .filter(reservation_item::Column::ReservationId.eq(reservation_id))
            .order_by_asc(reservation_item::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(item_to_domain).collect())
    }

    async fn battery_is_held(&self, battery_id: i64) -> DomainResult<bool> {
        let held = reservation_item::Entity::find()
            .filter(reservation_item::Column::BatteryId.eq(battery_id))
            .inner_join(reservation::Entity)
            .filter(reservation::Column::Status.eq(ReservationStatus::Active.as_str()))
            .count(&self.db)
            .await
            .map_err(db_err)?;
        Ok(held > 0)
    }
}
