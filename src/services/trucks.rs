use crate::{
    commands::shipments::find_truck,
    db::DbPool,
    entities::{truck, user, UserRole},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

fn ensure_positive(field: &str, value: f64) -> Result<(), ServiceError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ServiceError::ValidationError(format!(
            "{} must be greater than 0",
            field
        )))
    }
}

#[derive(Debug, Clone)]
pub struct NewTruck {
    pub dealer_id: Uuid,
    pub license_plate: String,
    pub capacity_weight: f64,
    pub capacity_volume: f64,
    pub cost_per_km: f64,
    pub fuel_efficiency: Option<f64>,
}

/// Dealer edits. Availability is not editable; it follows bookings.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct TruckChanges {
    pub license_plate: Option<String>,
    pub capacity_weight: Option<f64>,
    pub capacity_volume: Option<f64>,
    pub cost_per_km: Option<f64>,
    pub fuel_efficiency: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct TruckFilter {
    pub dealer_id: Option<Uuid>,
    pub available: Option<bool>,
}

/// Dealer-facing truck registry
#[derive(Clone)]
pub struct TruckService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl TruckService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self), fields(dealer_id = %new.dealer_id))]
    pub async fn register_truck(&self, new: NewTruck) -> Result<truck::Model, ServiceError> {
        let plate = new.license_plate.trim();
        if plate.is_empty() {
            return Err(ServiceError::ValidationError(
                "license_plate must not be empty".to_string(),
            ));
        }
        ensure_positive("capacity_weight", new.capacity_weight)?;
        ensure_positive("capacity_volume", new.capacity_volume)?;
        ensure_positive("cost_per_km", new.cost_per_km)?;
        let fuel_efficiency = new
            .fuel_efficiency
            .unwrap_or(truck::DEFAULT_FUEL_EFFICIENCY);
        ensure_positive("fuel_efficiency", fuel_efficiency)?;

        let db = &*self.db_pool;
        let dealer = user::Entity::find_by_id(new.dealer_id)
            .one(db)
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("dealer {} not found", new.dealer_id)))?;
        dealer.ensure_role(UserRole::Dealer)?;

        let now = Utc::now();
        let saved = truck::ActiveModel {
            id: Set(Uuid::new_v4()),
            dealer_id: Set(dealer.id),
            license_plate: Set(plate.to_string()),
            capacity_weight: Set(new.capacity_weight),
            capacity_volume: Set(new.capacity_volume),
            cost_per_km: Set(new.cost_per_km),
            fuel_efficiency: Set(fuel_efficiency),
            is_available: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await
        .map_err(ServiceError::db_error)?;

        info!(truck_id = %saved.id, "Truck registered");
        self.event_sender
            .publish(Event::TruckRegistered {
                truck_id: saved.id,
                dealer_id: saved.dealer_id,
            });

        Ok(saved)
    }

    #[instrument(skip(self))]
    pub async fn update_truck(
        &self,
        id: Uuid,
        changes: TruckChanges,
    ) -> Result<truck::Model, ServiceError> {
        let db = &*self.db_pool;
        let existing = find_truck(db, id).await?;
        let mut active: truck::ActiveModel = existing.into();

        if let Some(plate) = changes.license_plate {
            let plate = plate.trim().to_string();
            if plate.is_empty() {
                return Err(ServiceError::ValidationError(
                    "license_plate must not be empty".to_string(),
                ));
            }
            active.license_plate = Set(plate);
        }
        if let Some(v) = changes.capacity_weight {
            ensure_positive("capacity_weight", v)?;
            active.capacity_weight = Set(v);
        }
        if let Some(v) = changes.capacity_volume {
            ensure_positive("capacity_volume", v)?;
            active.capacity_volume = Set(v);
        }
        if let Some(v) = changes.cost_per_km {
            ensure_positive("cost_per_km", v)?;
            active.cost_per_km = Set(v);
        }
        if let Some(v) = changes.fuel_efficiency {
            ensure_positive("fuel_efficiency", v)?;
            active.fuel_efficiency = Set(v);
        }

        active.update(db).await.map_err(ServiceError::db_error)
    }

    #[instrument(skip(self))]
    pub async fn get_truck(&self, id: Uuid) -> Result<truck::Model, ServiceError> {
        find_truck(&*self.db_pool, id).await
    }

    #[instrument(skip(self))]
    pub async fn list_trucks(&self, filter: TruckFilter) -> Result<Vec<truck::Model>, ServiceError> {
        let mut query = truck::Entity::find();
        if let Some(dealer_id) = filter.dealer_id {
            query = query.filter(truck::Column::DealerId.eq(dealer_id));
        }
        if let Some(available) = filter.available {
            query = query.filter(truck::Column::IsAvailable.eq(available));
        }
        query
            .order_by_asc(truck::Column::CreatedAt)
            .all(&*self.db_pool)
            .await
            .map_err(ServiceError::db_error)
    }
}
