//! SeaORM implementation of SwapRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter,
    QueryOrder, Set,
};

use crate::domain::swap::{SwapRepository, SwapStatus, SwapTransaction};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::swap_transaction;
use crate::shared::errors::DomainError;

pub struct SeaOrmSwapRepository {
    db: DatabaseConnection,
}

impl SeaOrmSwapRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: swap_transaction::Model) -> SwapTransaction {
    SwapTransaction {
        id: m.id,
        reference: m.reference,
        user_id: m.user_id,
        vehicle_id: m.vehicle_id,
        station_id: m.station_id,
        old_battery_id: m.old_battery_id,
        new_battery_id: m.new_battery_id,
        reservation_id: m.reservation_id,
        status: SwapStatus::from_str(&m.status),
        start_percent: m.start_percent,
        end_percent: m.end_percent,
        energy_kwh: m.energy_kwh,
        cost: m.cost,
        confirmed_by: m.confirmed_by,
        created_at: m.created_at,
        processed_at: m.processed_at,
    }
}

fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Storage(e.to_string())
}

// ── SwapRepository impl ─────────────────────────────────────────

#[async_trait]
impl SwapRepository for SeaOrmSwapRepository {
    async fn insert(&self, t: SwapTransaction) -> DomainResult<SwapTransaction> {
        debug!("Saving swap transaction: {}", t.reference);

        let model = swap_transaction::ActiveModel {
            id: NotSet,
            reference: Set(t.reference),
            user_id: Set(t.user_id),
            vehicle_id: Set(t.vehicle_id),
            station_id: Set(t.station_id),
            old_battery_id: Set(t.old_battery_id),
            new_battery_id: Set(t.new_battery_id),
            reservation_id: Set(t.reservation_id),
            status: Set(t.status.as_str().to_string()),
            start_percent: Set(t.start_percent),
            end_percent: Set(t.end_percent),
            energy_kwh: Set(t.energy_kwh),
            cost: Set(t.cost),
            confirmed_by: Set(t.confirmed_by),
            created_at: Set(t.created_at),
            processed_at: Set(t.processed_at),
        };
        let stored = model.insert(&self.db).await.map_err(db_err)?;
        Ok(model_to_domain(stored))
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<SwapTransaction>> {
        let model = swap_transaction::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn resolve(
        &self,
        id: i64,
        next: SwapStatus,
        staff_id: i64,
        at: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let res = swap_transaction::Entity::update_many()
            .col_expr(swap_transaction::Column::Status, Expr::value(next.as_str()))
            .col_expr(
                swap_transaction::Column::ConfirmedBy,
                Expr::value(Some(staff_id)),
            )
            .col_expr(swap_transaction::Column::ProcessedAt, Expr::value(Some(at)))
            .filter(swap_transaction::Column::Id.eq(id))
            .filter(
                swap_transaction::Column::Status.eq(SwapStatus::PendingConfirm.as_str()),
            )
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected > 0)
    }

    async fn list_for_vehicle(&self, vehicle_id: i64) -> DomainResult<Vec<SwapTransaction>> {
        let models = swap_transaction::Entity::find()
            .filter(swap_transaction::Column::VehicleId.eq(vehicle_id))
            .order_by_desc(swap_transaction::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }
}
