//! Shipment lifecycle commands.
//!
//! Truck availability is only ever flipped through [`claim_truck`] and
//! [`release_truck`], each a single conditional update, so two transactions can
//! never both take the same truck.

use crate::{
    entities::{shipment, truck},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use uuid::Uuid;

pub mod advance_shipment_status_command;
pub mod book_truck_command;
pub mod create_shipment_command;

pub use advance_shipment_status_command::{AdvanceOutcome, AdvanceShipmentStatusCommand};
pub use book_truck_command::BookTruckCommand;
pub use create_shipment_command::CreateShipmentCommand;

async fn set_availability<C: ConnectionTrait>(
    db: &C,
    truck_id: Uuid,
    from: bool,
    to: bool,
) -> Result<bool, ServiceError> {
    let result = truck::Entity::update_many()
        .set(truck::ActiveModel {
            is_available: Set(to),
            updated_at: Set(Utc::now()),
            ..Default::default()
        })
        .filter(truck::Column::Id.eq(truck_id))
        .filter(truck::Column::IsAvailable.eq(from))
        .exec(db)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(result.rows_affected == 1)
}

/// Takes the truck out of the pool. Fails with `Conflict` if someone else already has it.
pub(crate) async fn claim_truck<C: ConnectionTrait>(db: &C, truck_id: Uuid) -> Result<(), ServiceError> {
    if set_availability(db, truck_id, true, false).await? {
        Ok(())
    } else {
        Err(ServiceError::Conflict(format!(
            "truck {} is no longer available",
            truck_id
        )))
    }
}

/// Returns the truck to the pool. Fails with `Conflict` if it was not out.
pub(crate) async fn release_truck<C: ConnectionTrait>(db: &C, truck_id: Uuid) -> Result<(), ServiceError> {
    if set_availability(db, truck_id, false, true).await? {
        Ok(())
    } else {
        Err(ServiceError::Conflict(format!(
            "truck {} is not currently assigned",
            truck_id
        )))
    }
}

/// Applies `changes` to the shipment only while it is still in `expected`.
/// Returns false when a concurrent writer moved it first.
pub(crate) async fn advance_if_status<C: ConnectionTrait>(
    db: &C,
    shipment_id: Uuid,
    expected: shipment::ShipmentStatus,
    mut changes: shipment::ActiveModel,
) -> Result<bool, ServiceError> {
    changes.updated_at = Set(Utc::now());
    let result = shipment::Entity::update_many()
        .set(changes)
        .filter(shipment::Column::Id.eq(shipment_id))
        .filter(shipment::Column::Status.eq(expected))
        .exec(db)
        .await
        .map_err(ServiceError::db_error)?;
    Ok(result.rows_affected == 1)
}

pub(crate) async fn find_shipment<C: ConnectionTrait>(
    db: &C,
    shipment_id: Uuid,
) -> Result<shipment::Model, ServiceError> {
    shipment::Entity::find_by_id(shipment_id)
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("shipment {} not found", shipment_id)))
}

pub(crate) async fn find_truck<C: ConnectionTrait>(
    db: &C,
    truck_id: Uuid,
) -> Result<truck::Model, ServiceError> {
    truck::Entity::find_by_id(truck_id)
        .one(db)
        .await
        .map_err(ServiceError::db_error)?
        .ok_or_else(|| ServiceError::NotFound(format!("truck {} not found", truck_id)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        db::{self, DbConfig, DbPool},
        entities::{user, UserRole},
    };
    use assert_matches::assert_matches;
    use sea_orm::ActiveModelTrait;

    async fn pool_with_truck() -> (tempfile::TempDir, DbPool, Uuid) {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig {
            url: format!("sqlite://{}?mode=rwc", dir.path().join("claims.db").display()),
            max_connections: 1,
            ..Default::default()
        };
        let pool = db::establish_connection_with_config(&config).await.unwrap();
        db::run_migrations(&pool).await.unwrap();

        let now = Utc::now();
        let dealer = user::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set("Dealer".into()),
            email: Set("dealer@fleetmatch.test".into()),
            role: Set(UserRole::Dealer),
            created_at: Set(now),
        }
        .insert(&pool)
        .await
        .unwrap();
        let truck = truck::ActiveModel {
            id: Set(Uuid::new_v4()),
            dealer_id: Set(dealer.id),
            license_plate: Set("MH12-AB-1234".into()),
            capacity_weight: Set(1000.0),
            capacity_volume: Set(10.0),
            cost_per_km: Set(8.0),
            fuel_efficiency: Set(truck::DEFAULT_FUEL_EFFICIENCY),
            is_available: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&pool)
        .await
        .unwrap();

        (dir, pool, truck.id)
    }

    #[tokio::test]
    async fn claiming_a_taken_truck_conflicts() {
        let (_dir, pool, truck_id) = pool_with_truck().await;

        claim_truck(&pool, truck_id).await.unwrap();
        assert_matches!(
            claim_truck(&pool, truck_id).await,
            Err(ServiceError::Conflict(_))
        );
        assert!(!find_truck(&pool, truck_id).await.unwrap().is_available);
    }

    #[tokio::test]
    async fn releasing_a_free_truck_conflicts() {
        let (_dir, pool, truck_id) = pool_with_truck().await;

        assert_matches!(
            release_truck(&pool, truck_id).await,
            Err(ServiceError::Conflict(_))
        );

        claim_truck(&pool, truck_id).await.unwrap();
        release_truck(&pool, truck_id).await.unwrap();
        assert_matches!(
            release_truck(&pool, truck_id).await,
            Err(ServiceError::Conflict(_))
        );
        assert!(find_truck(&pool, truck_id).await.unwrap().is_available);
    }

    #[tokio::test]
    async fn unknown_trucks_are_never_claimed() {
        let (_dir, pool, _) = pool_with_truck().await;

        assert_matches!(
            claim_truck(&pool, Uuid::new_v4()).await,
            Err(ServiceError::Conflict(_))
        );
    }
}
