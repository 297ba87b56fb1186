use sea_orm_migration::prelude::*;

use crate::m20250301_000001_create_users_table::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Trucks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Trucks::Id).uuid().primary_key().not_null())
                    .col(ColumnDef::new(Trucks::DealerId).uuid().not_null())
                    .col(ColumnDef::new(Trucks::LicensePlate).string().not_null())
                    .col(ColumnDef::new(Trucks::CapacityWeight).double().not_null())
                    .col(ColumnDef::new(Trucks::CapacityVolume).double().not_null())
                    .col(ColumnDef::new(Trucks::CostPerKm).double().not_null())
                    .col(ColumnDef::new(Trucks::FuelEfficiency).double().not_null())
                    .col(
                        ColumnDef::new(Trucks::IsAvailable)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Trucks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Trucks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_trucks_dealer_id")
                            .from(Trucks::Table, Trucks::DealerId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Trucks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Trucks {
    Table,
    Id,
    DealerId,
    LicensePlate,
    CapacityWeight,
    CapacityVolume,
    CostPerKm,
    FuelEfficiency,
    IsAvailable,
    CreatedAt,
    UpdatedAt,
}
