use crate::{
    commands::Command,
    db::{self, DbPool},
    entities::{shipment, user, ShipmentStatus, UserRole},
    errors::ServiceError,
    events::{Event, EventSender},
    services::{
        matching::{available_fleet, rank_candidates, Load},
        shipments::ShipmentWithMatches,
    },
};
use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, EntityTrait};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;
use validator::{Validate, ValidationError};

fn validate_measurements(cmd: &CreateShipmentCommand) -> Result<(), ValidationError> {
    let positive = |v: f64| v.is_finite() && v > 0.0;
    if !positive(cmd.total_weight) {
        return Err(ValidationError::new("total_weight must be greater than 0"));
    }
    if !positive(cmd.total_volume) {
        return Err(ValidationError::new("total_volume must be greater than 0"));
    }
    if !(cmd.distance.is_finite() && cmd.distance >= 0.0) {
        return Err(ValidationError::new("distance must not be negative"));
    }
    Ok(())
}

/// Records a new PENDING shipment for a warehouse and ranks the fleet for it.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_measurements"))]
pub struct CreateShipmentCommand {
    pub warehouse_id: Uuid,
    #[validate(length(min = 1))]
    pub origin: String,
    #[validate(length(min = 1))]
    pub destination: String,
    pub total_weight: f64,
    pub total_volume: f64,
    /// Kilometers, 0 when the caller does not know it yet
    pub distance: f64,
}

#[async_trait]
impl Command for CreateShipmentCommand {
    type Result = ShipmentWithMatches;

    #[instrument(skip(self, db_pool, event_sender), fields(warehouse_id = %self.warehouse_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate()?;

        let warehouse = user::Entity::find_by_id(self.warehouse_id)
            .one(&*db_pool)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("warehouse {} not found", self.warehouse_id))
            })?;
        warehouse.ensure_role(UserRole::Warehouse)?;

        let (txn, started) = db::begin(&db_pool).await?;

        let now = Utc::now();
        let saved = shipment::ActiveModel {
            id: Set(Uuid::new_v4()),
            warehouse_id: Set(self.warehouse_id),
            origin: Set(self.origin.clone()),
            destination: Set(self.destination.clone()),
            total_weight: Set(self.total_weight),
            total_volume: Set(self.total_volume),
            distance: Set(self.distance),
            status: Set(ShipmentStatus::Pending),
            assigned_truck_id: Set(None),
            estimated_cost: Set(None),
            co2_saved: Set(None),
            delivered_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await
        .map_err(|e| {
            error!("Failed to create shipment: {}", e);
            ServiceError::db_error(e)
        })?;

        // ranked before commit so a failed ranking leaves no shipment behind
        let fleet = available_fleet(&txn).await?;
        let matches = rank_candidates(&Load::from(&saved), fleet)?;
        debug!(candidates = matches.len(), "Ranked fleet for new shipment");

        db::commit(txn, started).await?;

        counter!("fleetmatch.shipments.created", 1);
        info!(shipment_id = %saved.id, "Shipment created");
        event_sender
            .publish(Event::ShipmentCreated {
                shipment_id: saved.id,
                warehouse_id: saved.warehouse_id,
            });

        Ok(ShipmentWithMatches {
            shipment_id: saved.id,
            shipment: saved,
            matches,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command() -> CreateShipmentCommand {
        CreateShipmentCommand {
            warehouse_id: Uuid::new_v4(),
            origin: "Pune".into(),
            destination: "Mumbai".into(),
            total_weight: 500.0,
            total_volume: 5.0,
            distance: 150.0,
        }
    }

    #[test]
    fn accepts_a_well_formed_shipment() {
        assert!(command().validate().is_ok());
        let unknown_distance = CreateShipmentCommand {
            distance: 0.0,
            ..command()
        };
        assert!(unknown_distance.validate().is_ok());
    }

    #[test]
    fn rejects_bad_measurements() {
        for cmd in [
            CreateShipmentCommand {
                total_weight: 0.0,
                ..command()
            },
            CreateShipmentCommand {
                total_volume: -1.0,
                ..command()
            },
            CreateShipmentCommand {
                distance: -5.0,
                ..command()
            },
            CreateShipmentCommand {
                origin: String::new(),
                ..command()
            },
        ] {
            assert!(cmd.validate().is_err(), "{:?} should be invalid", cmd);
        }
    }
}
