//! SeaORM implementation of BatteryEventRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::domain::history::{BatteryEvent, BatteryEventRepository, BatteryEventType};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::battery_event;
use crate::shared::errors::DomainError;

pub struct SeaOrmBatteryEventRepository {
    db: DatabaseConnection,
}

impl SeaOrmBatteryEventRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: battery_event::Model) -> BatteryEvent {
    BatteryEvent {
        id: m.id,
        battery_id: m.battery_id,
        event_type: BatteryEventType::from_str(&m.event_type),
        old_value: m.old_value,
        new_value: m.new_value,
        station_id: m.station_id,
        vehicle_id: m.vehicle_id,
        actor_user_id: m.actor_user_id,
        notes: m.notes,
        soh_snapshot: m.soh_snapshot,
        created_at: m.created_at,
    }
}

fn db_err(e: sea_orm::DbErr) -> DomainError {
    DomainError::Storage(e.to_string())
}

#[async_trait]
impl BatteryEventRepository for SeaOrmBatteryEventRepository {
    async fn append(&self, e: BatteryEvent) -> DomainResult<BatteryEvent> {
        let model = battery_event::ActiveModel {
            id: NotSet,
            battery_id: Set(e.battery_id),
            event_type: Set(e.event_type.as_str().to_string()),
            old_value: Set(e.old_value),
            new_value: Set(e.new_value),
            station_id: Set(e.station_id),
            vehicle_id: Set(e.vehicle_id),
            actor_user_id: Set(e.actor_user_id),
            notes: Set(e.notes),
            soh_snapshot: Set(e.soh_snapshot),
            created_at: Set(e.created_at),
        };
        let stored = model.insert(&self.db).await.map_err(db_err)?;
        Ok(model_to_domain(stored))
    }

    async fn find_for_battery(&self, battery_id: i64) -> DomainResult<Vec<BatteryEvent>> {
        let models = battery_event::Entity::find()
            .filter(battery_event::Column::BatteryId.eq(battery_id))
            .order_by_asc(battery_event::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn count_swaps(&self, battery_id: i64) -> DomainResult<u64> {
        battery_event::Entity::find()
            .filter(battery_event::Column::BatteryId.eq(battery_id))
            .filter(
                battery_event::Column::EventType.eq(BatteryEventType::Swapped.as_str()),
            )
            .count(&self.db)
            .await
            .map_err(db_err)
    }
}
