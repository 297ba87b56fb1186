use sea_orm_migration::prelude::*;

use crate::m20250301_000001_create_users_table::Users;
use crate::m20250301_000002_create_trucks_table::Trucks;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Shipments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Shipments::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Shipments::WarehouseId).uuid().not_null())
                    .col(ColumnDef::new(Shipments::Origin).string().not_null())
                    .col(ColumnDef::new(Shipments::Destination).string().not_null())
                    .col(ColumnDef::new(Shipments::TotalWeight).double().not_null())
                    .col(ColumnDef::new(Shipments::TotalVolume).double().not_null())
                    .col(
                        ColumnDef::new(Shipments::Distance)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(Shipments::Status).string().not_null())
                    .col(ColumnDef::new(Shipments::AssignedTruckId).uuid().null())
                    .col(ColumnDef::new(Shipments::EstimatedCost).double().null())
                    .col(ColumnDef::new(Shipments::Co2Saved).double().null())
                    .col(
                        ColumnDef::new(Shipments::DeliveredAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Shipments::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Shipments::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_shipments_warehouse_id")
                            .from(Shipments::Table, Shipments::WarehouseId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_shipments_assigned_truck_id")
                            .from(Shipments::Table, Shipments::AssignedTruckId)
                            .to(Trucks::Table, Trucks::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Shipments::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Shipments {
    Table,
    Id,
    WarehouseId,
    Origin,
    Destination,
    TotalWeight,
    TotalVolume,
    Distance,
    Status,
    AssignedTruckId,
    EstimatedCost,
    #[sea_orm(iden = "co2_saved")]
    Co2Saved,
    DeliveredAt,
    CreatedAt,
    UpdatedAt,
}
