//! Create battery_events table
//!
//! Append-only audit log. No foreign key to batteries: events must
//! survive a battery's terminal administrative delete.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BatteryEvents::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BatteryEvents::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(BatteryEvents::BatteryId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(BatteryEvents::EventType).string().not_null())
                    .col(ColumnDef::new(BatteryEvents::OldValue).string())
                    .col(ColumnDef::new(BatteryEvents::NewValue).string())
                    .col(ColumnDef::new(BatteryEvents::StationId).big_integer())
                    .col(ColumnDef::new(BatteryEvents::VehicleId).big_integer())
                    .col(ColumnDef::new(BatteryEvents::ActorUserId).big_integer())
                    .col(ColumnDef::new(BatteryEvents::Notes).string())
                    .col(ColumnDef::new(BatteryEvents::SohSnapshot).double())
                    .col(
                        ColumnDef::new(BatteryEvents::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_battery_events_battery")
                    .table(BatteryEvents::Table)
                    .col(BatteryEvents::BatteryId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_battery_events_type")
                    .table(BatteryEvents::Table)
                    .col(BatteryEvents::BatteryId)
                    .col(BatteryEvents::EventType)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BatteryEvents::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum BatteryEvents {
    Table,
    Id,
    BatteryId,
    EventType,
    OldValue,
    NewValue,
    StationId,
    VehicleId,
    ActorUserId,
    Notes,
    SohSnapshot,
    CreatedAt,
}
