use crate::{
    db::DbPool,
    entities::{shipment, truck, user, ShipmentStatus, UserRole},
    errors::ServiceError,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ChartPoint {
    /// "Trip 1", "Trip 2", ...
    pub label: String,
    /// Volume utilization of the trip in whole percent
    pub value: i64,
    pub cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct AnalyticsReport {
    pub user_id: Uuid,
    pub role: UserRole,
    pub total_moves: u64,
    pub total_money: f64,
    pub total_co2: f64,
    pub avg_utilization: i64,
    pub chart_data: Vec<ChartPoint>,
}

/// Utilization of one trip in whole percent. A missing truck counts as capacity 1.
fn trip_utilization(shipment: &shipment::Model, truck: Option<&truck::Model>) -> i64 {
    let capacity = truck
        .map(|t| t.capacity_volume)
        .filter(|v| *v > 0.0)
        .unwrap_or(1.0);
    (shipment.total_volume / capacity * 100.0).round() as i64
}

/// Folds delivered trips (oldest first) into a report.
pub fn summarize(
    user_id: Uuid,
    role: UserRole,
    trips: &[(shipment::Model, Option<truck::Model>)],
) -> AnalyticsReport {
    let chart_data: Vec<ChartPoint> = trips
        .iter()
        .enumerate()
        .map(|(i, (shipment, truck))| ChartPoint {
            label: format!("Trip {}", i + 1),
            value: trip_utilization(shipment, truck.as_ref()),
            cost: shipment.estimated_cost,
        })
        .collect();

    let total_moves = trips.len() as u64;
    let total_money = trips
        .iter()
        .map(|(s, _)| s.estimated_cost.unwrap_or(0.0))
        .sum();
    let total_co2 = trips.iter().map(|(s, _)| s.co2_saved.unwrap_or(0.0)).sum();
    let avg_utilization = if chart_data.is_empty() {
        0
    } else {
        let sum: i64 = chart_data.iter().map(|p| p.value).sum();
        (sum as f64 / chart_data.len() as f64).round() as i64
    };

    AnalyticsReport {
        user_id,
        role,
        total_moves,
        total_money,
        total_co2,
        avg_utilization,
        chart_data,
    }
}

#[derive(Clone)]
pub struct AnalyticsService {
    db_pool: Arc<DbPool>,
}

impl AnalyticsService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Delivery figures scoped by the user's role: a warehouse sees its own
    /// shipments, a dealer the shipments its trucks carried, an admin everything.
    #[instrument(skip(self))]
    pub async fn report_for(&self, user_id: Uuid) -> Result<AnalyticsReport, ServiceError> {
        let db = &*self.db_pool;
        let user = user::Entity::find_by_id(user_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("user {} not found", user_id)))?;

        let mut query = shipment::Entity::find()
            .find_also_related(truck::Entity)
            .filter(shipment::Column::Status.eq(ShipmentStatus::Delivered));
        query = match user.role {
            UserRole::Warehouse => query.filter(shipment::Column::WarehouseId.eq(user.id)),
            UserRole::Dealer => query.filter(truck::Column::DealerId.eq(user.id)),
            UserRole::Admin => query,
        };

        let trips = query
            .order_by_asc(shipment::Column::CreatedAt)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        Ok(summarize(user.id, user.role, &trips))
    }
}
