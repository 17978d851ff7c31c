//! Battery entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "batteries")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(unique)]
    pub serial_number: String,

    /// Battery status: Available, Reserved, InUse, PendingOut,
    /// PendingIn, Damaged, Maintenance
    pub status: String,

    pub charge_percent: f64,
    pub soh_percent: f64,
    pub cycle_count: f64,
    pub current_capacity_wh: f64,
    pub initial_capacity_wh: f64,

    /// Owning station; null while mounted on a vehicle
    #[sea_orm(nullable)]
    pub station_id: Option<i64>,

    /// Carrying vehicle; null while parked at a station
    #[sea_orm(nullable)]
    pub vehicle_id: Option<i64>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
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
