use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Distance per fuel unit assumed when a dealer registers a truck without one.
pub const DEFAULT_FUEL_EFFICIENCY: f64 = 5.0;

/// A fleet vehicle offered by a dealer.
///
/// `is_available` only changes as a side effect of booking a shipment onto the
/// truck or delivering that shipment; dealer edits never touch it.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, ToSchema)]
#[schema(as = Truck)]
#[sea_orm(table_name = "trucks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub dealer_id: Uuid,
    pub license_plate: String,
    pub capacity_weight: f64,
    pub capacity_volume: f64,
    pub cost_per_km: f64,
    /// Distance travelled per unit of fuel
    pub fuel_efficiency: f64,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::DealerId",
        to = "super::user::Column::Id",
        on_delete = "Restrict"
    )]
    Dealer,
    #[sea_orm(has_many = "super::shipment::Entity")]
    Shipments,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Dealer.def()
    }
}

impl Related<super::shipment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Shipments.def()
    }
}

#[async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C: ConnectionTrait>(self, _db: &C, insert: bool) -> Result<Self, DbErr> {
        let mut active_model = self;
        if !insert {
            active_model.updated_at = Set(Utc::now());
        }
        Ok(active_model)
    }
}

impl Model {
    /// Whether the truck can physically carry the given load.
    pub fn can_carry(&self, weight: f64, volume: f64) -> bool {
        self.capacity_weight >= weight && self.capacity_volume >= volume
    }
}
