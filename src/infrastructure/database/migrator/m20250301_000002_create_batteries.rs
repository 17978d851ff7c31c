//! Create batteries table
//!
//! One row per physical unit. Exactly one of station_id / vehicle_id is
//! set outside a swap-confirmation transaction.

use sea_orm_migration::prelude::*;

use super::m20250301_000001_create_stations::Stations;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Batteries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Batteries::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Batteries::SerialNumber)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(Batteries::Status)
                            .string()
                            .not_null()
                            .default("Available"),
                    )
                    .col(ColumnDef::new(Batteries::ChargePercent).double().not_null())
                    .col(ColumnDef::new(Batteries::SohPercent).double().not_null())
                    .col(
                        ColumnDef::new(Batteries::CycleCount)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(
                        ColumnDef::new(Batteries::CurrentCapacityWh)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Batteries::InitialCapacityWh)
                            .double()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Batteries::StationId).big_integer())
                    .col(ColumnDef::new(Batteries::VehicleId).big_integer())
                    .col(
                        ColumnDef::new(Batteries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Batteries::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_batteries_station")
                            .from(Batteries::Table, Batteries::StationId)
                            .to(Stations::Table, Stations::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_batteries_station_status")
                    .table(Batteries::Table)
                    .col(Batteries::StationId)
                    .col(Batteries::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_batteries_vehicle")
                    .table(Batteries::Table)
                    .col(Batteries::VehicleId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Batteries::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Batteries {
    Table,
    Id,
    SerialNumber,
    Status,
    ChargePercent,
    SohPercent,
    CycleCount,
    CurrentCapacityWh,
    InitialCapacityWh,
    StationId,
    VehicleId,
    CreatedAt,
    UpdatedAt,
}
