//! SeaORM implementation of BatteryRepository
//!
//! Status transitions are conditional `UPDATE .. WHERE status = expected`
//! statements; `rows_affected == 0` means the caller lost a race. The
//! confirmed-exchange pair runs inside one database transaction.

use async_trait::async_trait;
use chrono::Utc;
use log::debug;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};

use crate::domain::battery::{Battery, BatteryRepository, BatteryStatus};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::battery;
use crate::shared::errors::DomainError;

pub struct SeaOrmBatteryRepository {
    db: DatabaseConnection,
}

impl SeaOrmBatteryRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: battery::Model) -> Battery {
    Battery {
        id: m.id,
        serial_number: m.serial_number,
        status: BatteryStatus::from_str(&m.status),
        charge_percent: m.charge_percent,
        soh_percent: m.soh_percent,
        cycle_count: m.cycle_count,
        current_capacity_wh: m.current_capacity_wh,
        initial_capacity_wh: m.initial_capacity_wh,
        station_id: m.station_id,
        vehicle_id: m.vehicle_id,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Storage(e.to_string())
}

// ── BatteryRepository impl ──────────────────────────────────────

#[async_trait]
impl BatteryRepository for SeaOrmBatteryRepository {
    async fn insert(&self, b: Battery) -> DomainResult<Battery> {
        debug!("Inserting battery: {}", b.serial_number);

        if battery::Entity::find()
            .filter(battery::Column::SerialNumber.eq(&b.serial_number))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .is_some()
        {
            return Err(DomainError::Conflict(format!(
                "battery serial {} already exists",
                b.serial_number
            )));
        }

        let model = battery::ActiveModel {
            id: NotSet,
            serial_number: Set(b.serial_number),
            status: Set(b.status.as_str().to_string()),
            charge_percent: Set(b.charge_percent),
            soh_percent: Set(b.soh_percent),
            cycle_count: Set(b.cycle_count),
            current_capacity_wh: Set(b.current_capacity_wh),
            initial_capacity_wh: Set(b.initial_capacity_wh),
            station_id: Set(b.station_id),
            vehicle_id: Set(b.vehicle_id),
            created_at: Set(b.created_at),
            updated_at: Set(b.updated_at),
        };
        let stored = model.insert(&self.db).await.map_err(db_err)?;
        Ok(model_to_domain(stored))
    }

    async fn find_by_id(&self, id: i64) -> DomainResult<Option<Battery>> {
        let model = battery::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_by_serial(&self, serial: &str) -> DomainResult<Option<Battery>> {
        let model = battery::Entity::find()
            .filter(battery::Column::SerialNumber.eq(serial))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_at_station(&self, station_id: i64) -> DomainResult<Vec<Battery>> {
        let models = battery::Entity::find()
            .filter(battery::Column::StationId.eq(station_id))
            .order_by_asc(battery::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn update(&self, b: Battery) -> DomainResult<()> {
        debug!("Updating battery: {}", b.serial_number);

        let existing = battery::Entity::find_by_id(b.id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        if existing.is_none() {
            return Err(DomainError::not_found("Battery", "id", b.id));
        }

        let model = battery::ActiveModel {
            id: Set(b.id),
            serial_number: Set(b.serial_number),
            status: Set(b.status.as_str().to_string()),
            charge_percent: Set(b.charge_percent),
            soh_percent: Set(b.soh_percent),
            cycle_count: Set(b.cycle_count),
            current_capacity_wh: Set(b.current_capacity_wh),
            initial_capacity_wh: Set(b.initial_capacity_wh),
            station_id: Set(b.station_id),
            vehicle_id: Set(b.vehicle_id),
            created_at: Set(b.created_at),
            updated_at: Set(Utc::now()),
        };
        model.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn transition_status(
        &self,
        id: i64,
        expected: BatteryStatus,
        next: BatteryStatus,
    ) -> DomainResult<bool> {
        let res = battery::Entity::update_many()
            .col_expr(battery::Column::Status, Expr::value(next.as_str()))
            .col_expr(battery::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(battery::Column::Id.eq(id))
            .filter(battery::Column::Status.eq(expected.as_str()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected > 0)
    }

    async fn transition_to_vehicle(
        &self,
        id: i64,
        expected: BatteryStatus,
        next: BatteryStatus,
        vehicle_id: i64,
    ) -> DomainResult<bool> {
        let res = battery::Entity::update_many()
            .col_expr(battery::Column::Status, Expr::value(next.as_str()))
            .col_expr(battery::Column::VehicleId, Expr::value(Some(vehicle_id)))
            .col_expr(battery::Column::StationId, Expr::value(Option::<i64>::None))
            .col_expr(battery::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(battery::Column::Id.eq(id))
            .filter(battery::Column::Status.eq(expected.as_str()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected > 0)
    }

    async fn transition_to_station(
        &self,
        id: i64,
        expected: BatteryStatus,
        next: BatteryStatus,
        station_id: i64,
    ) -> DomainResult<bool> {
        let res = battery::Entity::update_many()
            .col_expr(battery::Column::Status, Expr::value(next.as_str()))
            .col_expr(battery::Column::StationId, Expr::value(Some(station_id)))
            .col_expr(battery::Column::VehicleId, Expr::value(Option::<i64>::None))
            .col_expr(battery::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(battery::Column::Id.eq(id))
            .filter(battery::Column::Status.eq(expected.as_str()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(res.rows_affected > 0)
    }

    async fn find_first_at_station_with_status(
        &self,
        station_id: i64,
        status: BatteryStatus,
    ) -> DomainResult<Option<Battery>> {
        let model = battery::Entity::find()
            .filter(battery::Column::StationId.eq(station_id))
            .filter(battery::Column::Status.eq(status.as_str()))
            .order_by_asc(battery::Column::Id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn find_on_vehicle(&self, vehicle_id: i64) -> DomainResult<Option<Battery>> {
        let model = battery::Entity::find()
            .filter(battery::Column::VehicleId.eq(vehicle_id))
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    async fn complete_exchange(
        &self,
        old_id: i64,
        old_next: BatteryStatus,
        station_id: i64,
        new_id: i64,
        vehicle_id: i64,
    ) -> DomainResult<bool> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let now = Utc::now();

        let old_res = battery::Entity::update_many()
            .col_expr(battery::Column::Status, Expr::value(old_next.as_str()))
            .col_expr(battery::Column::StationId, Expr::value(Some(station_id)))
            .col_expr(battery::Column::VehicleId, Expr::value(Option::<i64>::None))
            .col_expr(battery::Column::UpdatedAt, Expr::value(now))
            .filter(battery::Column::Id.eq(old_id))
            .filter(battery::Column::Status.eq(BatteryStatus::PendingOut.as_str()))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        if old_res.rows_affected == 0 {
            txn.rollback().await.map_err(db_err)?;
            return Ok(false);
        }

        let new_res = battery::Entity::update_many()
            .col_expr(
                battery::Column::Status,
                Expr::value(BatteryStatus::InUse.as_str()),
            )
            .col_expr(battery::Column::VehicleId, Expr::value(Some(vehicle_id)))
            .col_expr(battery::Column::StationId, Expr::value(Option::<i64>::None))
            .col_expr(battery::Column::UpdatedAt, Expr::value(now))
            .filter(battery::Column::Id.eq(new_id))
            .filter(battery::Column::Status.eq(BatteryStatus::PendingIn.as_str()))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        if new_res.rows_affected == 0 {
            txn.rollback().await.map_err(db_err)?;
            return Ok(false);
        }

        txn.commit().await.map_err(db_err)?;
        Ok(true)
    }

    async fn delete(&self, id: i64) -> DomainResult<()> {
        let res = battery::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        if res.rows_affected == 0 {
            return Err(DomainError::not_found("Battery", "id", id));
        }
        Ok(())
    }
}
