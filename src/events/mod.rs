use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Hands an event to the processor without waiting.
    ///
    /// Called after a transaction has committed, so a full or closed channel is
    /// logged and counted but never fails or stalls the caller.
    pub fn publish(&self, event: Event) {
        let name = event.name();
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                counter!("fleetmatch.events.dropped", 1, "reason" => "full");
                warn!(event = name, "Event channel full, dropping event");
            }
            Err(TrySendError::Closed(_)) => {
                counter!("fleetmatch.events.dropped", 1, "reason" => "closed");
                warn!(event = name, "Event processor stopped, dropping event");
            }
        }
    }
}

/// Things that happened to shipments, trucks and their users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    ShipmentCreated {
        shipment_id: Uuid,
        warehouse_id: Uuid,
    },
    TruckBooked {
        shipment_id: Uuid,
        truck_id: Uuid,
    },
    ShipmentInTransit(Uuid),
    ShipmentDelivered {
        shipment_id: Uuid,
        truck_id: Uuid,
        estimated_cost: f64,
        co2_saved: f64,
    },
    TruckReleased(Uuid),
    TruckRegistered {
        truck_id: Uuid,
        dealer_id: Uuid,
    },
    MessagePosted {
        message_id: Uuid,
        shipment_id: Uuid,
    },
    UserDeleted(Uuid),
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::ShipmentCreated { .. } => "shipment_created",
            Event::TruckBooked { .. } => "truck_booked",
            Event::ShipmentInTransit(_) => "shipment_in_transit",
            Event::ShipmentDelivered { .. } => "shipment_delivered",
            Event::TruckReleased(_) => "truck_released",
            Event::TruckRegistered { .. } => "truck_registered",
            Event::MessagePosted { .. } => "message_posted",
            Event::UserDeleted(_) => "user_deleted",
        }
    }
}

// Drains the channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        counter!("fleetmatch.events.processed", 1, "event" => event.name());

        match event {
            Event::ShipmentCreated {
                shipment_id,
                warehouse_id,
            } => {
                info!(%shipment_id, %warehouse_id, "Shipment created");
            }
            Event::TruckBooked {
                shipment_id,
                truck_id,
            } => {
                info!(%shipment_id, %truck_id, "Truck booked");
            }
            Event::ShipmentInTransit(shipment_id) => {
                info!(%shipment_id, "Shipment in transit");
            }
            Event::ShipmentDelivered {
                shipment_id,
                truck_id,
                estimated_cost,
                co2_saved,
            } => {
                info!(
                    %shipment_id,
                    %truck_id,
                    estimated_cost,
                    co2_saved,
                    "Shipment delivered"
                );
            }
            Event::TruckReleased(truck_id) => {
                info!(%truck_id, "Truck released back to the pool");
            }
            Event::TruckRegistered {
                truck_id,
                dealer_id,
            } => {
                info!(%truck_id, %dealer_id, "Truck registered");
            }
            Event::MessagePosted {
                message_id,
                shipment_id,
            } => {
                info!(%message_id, %shipment_id, "Message posted");
            }
            Event::UserDeleted(user_id) => {
                info!(%user_id, "User deleted");
            }
        }
    }

    warn!("Event processing loop has ended");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_survives_a_stopped_processor() {
        let (tx, rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        drop(rx);

        sender.publish(Event::TruckReleased(Uuid::new_v4()));
    }

    #[tokio::test]
    async fn publish_drops_instead_of_waiting_on_a_full_channel() {
        let (tx, mut rx) = mpsc::channel(1);
        let sender = EventSender::new(tx);
        let kept = Uuid::new_v4();

        sender.publish(Event::TruckReleased(kept));
        // returns at once even though nobody is draining the channel
        sender.publish(Event::TruckReleased(Uuid::new_v4()));

        assert_eq!(rx.recv().await, Some(Event::TruckReleased(kept)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn events_reach_the_receiver_in_order() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let shipment_id = Uuid::new_v4();

        sender.publish(Event::ShipmentInTransit(shipment_id));
        sender.publish(Event::TruckReleased(shipment_id));

        assert_eq!(rx.recv().await, Some(Event::ShipmentInTransit(shipment_id)));
        assert_eq!(rx.recv().await.map(|e| e.name()), Some("truck_released"));
    }
}
