use crate::{
    commands::{
        shipments::{
            AdvanceOutcome, AdvanceShipmentStatusCommand, BookTruckCommand, CreateShipmentCommand,
        },
        Command,
    },
    config::SettlementPolicy,
    db::DbPool,
    entities::{shipment, truck, ShipmentStatus},
    errors::ServiceError,
    events::EventSender,
    services::matching::RankedCandidate,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

/// A freshly created shipment together with the trucks that could carry it.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ShipmentWithMatches {
    pub shipment_id: Uuid,
    pub shipment: shipment::Model,
    pub matches: Vec<RankedCandidate>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ShipmentWithTruck {
    pub shipment: shipment::Model,
    pub truck: Option<truck::Model>,
}

/// Combined update accepted by the legacy PATCH endpoint.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ShipmentUpdate {
    pub shipment_id: Uuid,
    pub truck_id: Option<Uuid>,
    pub status: Option<ShipmentStatus>,
}

#[derive(Debug, Clone, Default)]
pub struct ShipmentFilter {
    pub warehouse_id: Option<Uuid>,
    pub status: Option<ShipmentStatus>,
}

/// Service for creating shipments and driving them through their lifecycle
#[derive(Clone)]
pub struct ShipmentService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
    policy: SettlementPolicy,
}

impl ShipmentService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        policy: SettlementPolicy,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            policy,
        }
    }

    /// Creates a PENDING shipment and ranks the available fleet for it.
    #[instrument(skip(self))]
    pub async fn create_shipment(
        &self,
        command: CreateShipmentCommand,
    ) -> Result<ShipmentWithMatches, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    #[instrument(skip(self))]
    pub async fn book_truck(
        &self,
        shipment_id: Uuid,
        truck_id: Uuid,
    ) -> Result<shipment::Model, ServiceError> {
        BookTruckCommand {
            shipment_id,
            truck_id,
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await
    }

    #[instrument(skip(self))]
    pub async fn advance_status(
        &self,
        shipment_id: Uuid,
        target: ShipmentStatus,
    ) -> Result<AdvanceOutcome, ServiceError> {
        AdvanceShipmentStatusCommand {
            shipment_id,
            target,
            policy: self.policy.clone(),
        }
        .execute(self.db_pool.clone(), self.event_sender.clone())
        .await
    }

    /// Legacy combined update: a truck without a status books it, a status advances.
    #[instrument(skip(self))]
    pub async fn apply_update(
        &self,
        update: ShipmentUpdate,
    ) -> Result<shipment::Model, ServiceError> {
        match (update.truck_id, update.status) {
            (Some(truck_id), None) | (Some(truck_id), Some(ShipmentStatus::Assigned)) => {
                self.book_truck(update.shipment_id, truck_id).await
            }
            (None, Some(ShipmentStatus::Assigned)) => Err(ServiceError::ValidationError(
                "truck_id is required to assign a shipment".to_string(),
            )),
            (_, Some(status)) => Ok(self.advance_status(update.shipment_id, status).await?.shipment),
            (None, None) => Err(ServiceError::ValidationError(
                "either truck_id or status must be provided".to_string(),
            )),
        }
    }

    #[instrument(skip(self))]
    pub async fn get_shipment(&self, id: Uuid) -> Result<shipment::Model, ServiceError> {
        crate::commands::shipments::find_shipment(&*self.db_pool, id).await
    }

    /// Lists shipments newest first. `page` starts at 1.
    #[instrument(skip(self))]
    pub async fn list_shipments(
        &self,
        filter: ShipmentFilter,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<shipment::Model>, u64), ServiceError> {
        let db = &*self.db_pool;
        let mut query = shipment::Entity::find();
        if let Some(warehouse_id) = filter.warehouse_id {
            query = query.filter(shipment::Column::WarehouseId.eq(warehouse_id));
        }
        if let Some(status) = filter.status {
            query = query.filter(shipment::Column::Status.eq(status));
        }

        let paginator = query
            .order_by_desc(shipment::Column::CreatedAt)
            .paginate(db, limit.max(1));
        let total = paginator.num_items().await.map_err(ServiceError::db_error)?;
        let items = paginator
            .fetch_page(page.saturating_sub(1))
            .await
            .map_err(ServiceError::db_error)?;

        Ok((items, total))
    }

    /// Shipments carried (or delivered) by the dealer's trucks, newest first.
    #[instrument(skip(self))]
    pub async fn dealer_jobs(&self, dealer_id: Uuid) -> Result<Vec<ShipmentWithTruck>, ServiceError> {
        let rows = shipment::Entity::find()
            .find_also_related(truck::Entity)
            .filter(truck::Column::DealerId.eq(dealer_id))
            .filter(shipment::Column::Status.is_in([
                ShipmentStatus::Assigned,
                ShipmentStatus::InTransit,
                ShipmentStatus::Delivered,
            ]))
            .order_by_desc(shipment::Column::CreatedAt)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(rows
            .into_iter()
            .map(|(shipment, truck)| ShipmentWithTruck { shipment, truck })
            .collect())
    }
}
