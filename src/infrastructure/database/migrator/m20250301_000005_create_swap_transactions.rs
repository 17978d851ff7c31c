//! Create swap_transactions table

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
                    .table(SwapTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SwapTransactions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SwapTransactions::Reference)
                            .uuid()
                            .not_null()
                            .unique_key(),
                    )
                    .col(
                        ColumnDef::new(SwapTransactions::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SwapTransactions::VehicleId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SwapTransactions::StationId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SwapTransactions::OldBatteryId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SwapTransactions::NewBatteryId).big_integer())
                    .col(ColumnDef::new(SwapTransactions::ReservationId).big_integer())
                    .col(
                        ColumnDef::new(SwapTransactions::Status)
                            .string()
                            .not_null()
                            .default("PendingConfirm"),
                    )
                    .col(
                        ColumnDef::new(SwapTransactions::StartPercent)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SwapTransactions::EndPercent)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SwapTransactions::EnergyKwh)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SwapTransactions::Cost)
                            .decimal_len(16, 4)
                            .not_null(),
                    )
                    .col(ColumnDef::new(SwapTransactions::ConfirmedBy).big_integer())
                    .col(
                        ColumnDef::new(SwapTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SwapTransactions::ProcessedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_swap_transactions_station")
                            .from(SwapTransactions::Table, SwapTransactions::StationId)
                            .to(Stations::Table, Stations::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_swap_transactions_status")
                    .table(SwapTransactions::Table)
                    .col(SwapTransactions::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_swap_transactions_vehicle")
                    .table(SwapTransactions::Table)
                    .col(SwapTransactions::VehicleId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SwapTransactions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum SwapTransactions {
    Table,
    Id,
    Reference,
    UserId,
    VehicleId,
    StationId,
    OldBatteryId,
    NewBatteryId,
    ReservationId,
    Status,
    StartPercent,
    EndPercent,
    EnergyKwh,
    Cost,
    ConfirmedBy,
    CreatedAt,
    ProcessedAt,
}
