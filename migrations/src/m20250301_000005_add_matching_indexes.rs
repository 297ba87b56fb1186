use sea_orm_migration::prelude::*;

use crate::m20250301_000002_create_trucks_table::Trucks;
use crate::m20250301_000003_create_shipments_table::Shipments;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Matching scans the available fleet on every shipment creation
        manager
            .create_index(
                Index::create()
                    .name("idx_trucks_is_available")
                    .table(Trucks::Table)
                    .col(Trucks::IsAvailable)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_trucks_dealer_id")
                    .table(Trucks::Table)
                    .col(Trucks::DealerId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_shipments_warehouse_status")
                    .table(Shipments::Table)
                    .col(Shipments::WarehouseId)
                    .col(Shipments::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_shipments_assigned_truck_id")
                    .table(Shipments::Table)
                    .col(Shipments::AssignedTruckId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for name in [
            "idx_shipments_assigned_truck_id",
            "idx_shipments_warehouse_status",
            "idx_trucks_dealer_id",
            "idx_trucks_is_available",
        ] {
            manager
                .drop_index(Index::drop().name(name).to_owned())
                .await?;
        }
        Ok(())
    }
}
