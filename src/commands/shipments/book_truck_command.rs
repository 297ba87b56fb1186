use super::{advance_if_status, claim_truck, find_shipment, find_truck};
use crate::{
    commands::Command,
    db::{self, DbPool},
    entities::{shipment, ShipmentStatus},
    errors::ServiceError,
    events::{Event, EventSender},
};
use async_trait::async_trait;
use metrics::counter;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

/// Assigns an available truck to a PENDING shipment.
///
/// The shipment moves to ASSIGNED and the truck leaves the pool in the same
/// transaction; if either step loses a race nothing is written. The truck is
/// claimed before anything is read so the transaction holds the write lock
/// from its first statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookTruckCommand {
    pub shipment_id: Uuid,
    pub truck_id: Uuid,
}

#[async_trait]
impl Command for BookTruckCommand {
    type Result = shipment::Model;

    #[instrument(skip(self, db_pool, event_sender), fields(shipment_id = %self.shipment_id, truck_id = %self.truck_id))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let result = self.book(&db_pool).await;

        match &result {
            Ok(_) => {
                counter!("fleetmatch.bookings.succeeded", 1);
                info!("Truck booked");
                event_sender
                    .publish(Event::TruckBooked {
                        shipment_id: self.shipment_id,
                        truck_id: self.truck_id,
                    });
            }
            Err(ServiceError::Conflict(reason)) => {
                counter!("fleetmatch.bookings.conflicts", 1);
                warn!("Booking rejected: {}", reason);
            }
            Err(ServiceError::InvalidTransition(reason)) => {
                warn!("Booking rejected: {}", reason);
            }
            Err(_) => {}
        }

        result
    }
}

impl BookTruckCommand {
    async fn book(&self, db_pool: &DbPool) -> Result<shipment::Model, ServiceError> {
        let (txn, started) = db::begin(db_pool).await?;

        match claim_truck(&txn, self.truck_id).await {
            Ok(()) => {}
            Err(ServiceError::Conflict(reason)) => {
                // a shipment that cannot be booked is reported ahead of a taken truck
                ensure_pending(&find_shipment(&txn, self.shipment_id).await?)?;
                find_truck(&txn, self.truck_id).await?;
                return Err(ServiceError::Conflict(reason));
            }
            Err(e) => return Err(e),
        }

        let changes = shipment::ActiveModel {
            status: Set(ShipmentStatus::Assigned),
            assigned_truck_id: Set(Some(self.truck_id)),
            ..Default::default()
        };
        if !advance_if_status(&txn, self.shipment_id, ShipmentStatus::Pending, changes).await? {
            // txn drops on return, which also gives the truck back
            ensure_pending(&find_shipment(&txn, self.shipment_id).await?)?;
            return Err(ServiceError::InvalidTransition(format!(
                "shipment {} was booked concurrently",
                self.shipment_id
            )));
        }

        let updated = find_shipment(&txn, self.shipment_id).await?;
        db::commit(txn, started).await?;
        Ok(updated)
    }
}

fn ensure_pending(current: &shipment::Model) -> Result<(), ServiceError> {
    if current.status == ShipmentStatus::Pending {
        Ok(())
    } else {
        Err(ServiceError::InvalidTransition(format!(
            "shipment {} is {}, only PENDING shipments can be booked",
            current.id, current.status
        )))
    }
}
