//! Swap transaction entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "swap_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(unique)]
    pub reference: Uuid,

    pub user_id: i64,
    pub vehicle_id: i64,
    pub station_id: i64,

    pub old_battery_id: i64,

    #[sea_orm(nullable)]
    pub new_battery_id: Option<i64>,

    #[sea_orm(nullable)]
    pub reservation_id: Option<i64>,

    /// Swap status: PendingConfirm, Completed, Rejected
    pub status: String,

    pub start_percent: f64,
    pub end_percent: f64,
    pub energy_kwh: f64,

    #[sea_orm(column_type = "Decimal(Some((16, 4)))")]
    pub cost: Decimal,

    #[sea_orm(nullable)]
    pub confirmed_by: Option<i64>,

    pub created_at: DateTimeUtc,

    #[sea_orm(nullable)]
    pub processed_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::station::Entity",
        from = "Column::StationId",
        to = "super::station::Column::Id"
    )]
    Station,
}

impl Related<super::station::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Station.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
