//! Battery event entity — append-only audit log
//!
//! Deliberately no foreign key to batteries: history must survive a
//! battery's terminal administrative delete.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "battery_events")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    pub battery_id: i64,

    pub event_type: String,

    #[sea_orm(nullable)]
    pub old_value: Option<String>,

    #[sea_orm(nullable)]
    pub new_value: Option<String>,

    #[sea_orm(nullable)]
    pub station_id: Option<i64>,

    #[sea_orm(nullable)]
    pub vehicle_id: Option<i64>,

    #[sea_orm(nullable)]
    pub actor_user_id: Option<i64>,

    #[sea_orm(nullable)]
    pub notes: Option<String>,

    #[sea_orm(nullable)]
    pub soh_snapshot: Option<f64>,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
