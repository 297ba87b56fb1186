use super::{advance_if_status, find_shipment, find_truck, release_truck};
use crate::{
    commands::Command,
    config::SettlementPolicy,
    db::{self, DbPool},
    entities::{shipment, ShipmentStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    services::settlement::{settle, Settlement},
};
use async_trait::async_trait;
use chrono::Utc;
use metrics::counter;
use sea_orm::{ActiveValue::Set, DatabaseTransaction};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

/// Moves a booked shipment one step along its lifecycle.
///
/// Only ASSIGNED -> IN_TRANSIT and IN_TRANSIT -> DELIVERED are accepted here;
/// PENDING -> ASSIGNED goes through [`super::BookTruckCommand`] because it needs a truck.
/// Delivery settles cost and CO2 and returns the truck to the pool.
/// The status step is a compare-and-set issued before any read, so concurrent
/// callers queue on the write lock and all but one see the new status.
#[derive(Debug, Clone)]
pub struct AdvanceShipmentStatusCommand {
    pub shipment_id: Uuid,
    pub target: ShipmentStatus,
    pub policy: SettlementPolicy,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct AdvanceOutcome {
    pub shipment: shipment::Model,
    /// Present when the shipment was delivered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement: Option<Settlement>,
}

#[async_trait]
impl Command for AdvanceShipmentStatusCommand {
    type Result = AdvanceOutcome;

    #[instrument(skip(self, db_pool, event_sender), fields(shipment_id = %self.shipment_id, target = %self.target))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        let expected = match self.target {
            ShipmentStatus::InTransit => ShipmentStatus::Assigned,
            ShipmentStatus::Delivered => ShipmentStatus::InTransit,
            ShipmentStatus::Pending | ShipmentStatus::Assigned => {
                let current = find_shipment(&*db_pool, self.shipment_id).await?;
                return Err(self.rejection(&current));
            }
        };

        let (txn, started) = db::begin(&db_pool).await?;

        let step = shipment::ActiveModel {
            status: Set(self.target),
            ..Default::default()
        };
        if !advance_if_status(&txn, self.shipment_id, expected, step).await? {
            let current = find_shipment(&txn, self.shipment_id).await?;
            return Err(self.rejection(&current));
        }

        let advanced = find_shipment(&txn, self.shipment_id).await?;
        let outcome = match self.target {
            ShipmentStatus::Delivered => self.settle_delivery(&txn, advanced).await?,
            _ => AdvanceOutcome {
                shipment: advanced,
                settlement: None,
            },
        };

        db::commit(txn, started).await?;
        info!(from = %expected, "Shipment status advanced");

        match &outcome.settlement {
            None => {
                event_sender
                    .publish(Event::ShipmentInTransit(self.shipment_id));
            }
            Some(settlement) => {
                counter!("fleetmatch.shipments.delivered", 1);
                if let Some(truck_id) = outcome.shipment.assigned_truck_id {
                    event_sender
                        .publish(Event::ShipmentDelivered {
                            shipment_id: self.shipment_id,
                            truck_id,
                            estimated_cost: settlement.estimated_cost,
                            co2_saved: settlement.co2_saved,
                        });
                    event_sender.publish(Event::TruckReleased(truck_id));
                }
            }
        }

        Ok(outcome)
    }
}

impl AdvanceShipmentStatusCommand {
    fn rejection(&self, current: &shipment::Model) -> ServiceError {
        warn!(from = %current.status, "Rejected status change");
        let reason = if current.status.can_transition_to(self.target) {
            format!(
                "shipment {} must be booked with a truck to become {}",
                current.id, self.target
            )
        } else if current.status.is_terminal() {
            format!("shipment {} is already {}", current.id, current.status)
        } else {
            format!(
                "shipment {} cannot move from {} to {}",
                current.id, current.status, self.target
            )
        };
        ServiceError::InvalidTransition(reason)
    }

    /// Prices the trip of a shipment just marked DELIVERED and frees its truck.
    async fn settle_delivery(
        &self,
        txn: &DatabaseTransaction,
        delivered: shipment::Model,
    ) -> Result<AdvanceOutcome, ServiceError> {
        let truck_id = delivered.assigned_truck_id.ok_or_else(|| {
            ServiceError::NotFound(format!("shipment {} has no assigned truck", delivered.id))
        })?;
        let truck = find_truck(txn, truck_id).await?;

        let settlement = settle(delivered.distance, &truck, &self.policy)?;

        let figures = shipment::ActiveModel {
            estimated_cost: Set(Some(settlement.estimated_cost)),
            co2_saved: Set(Some(settlement.co2_saved)),
            delivered_at: Set(Some(Utc::now())),
            ..Default::default()
        };
        advance_if_status(txn, delivered.id, ShipmentStatus::Delivered, figures).await?;
        release_truck(txn, truck.id).await?;

        Ok(AdvanceOutcome {
            shipment: find_shipment(txn, delivered.id).await?,
            settlement: Some(settlement),
        })
    }
}
