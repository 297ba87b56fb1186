use crate::{
    entities::{shipment, truck},
    errors::ServiceError,
};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use std::cmp::Ordering;
use utoipa::ToSchema;
use uuid::Uuid;

/// Distance assumed for ranking when the shipment's distance is unknown, so that
/// scores stay proportional to each truck's per-km cost instead of collapsing to 0.
pub const UNKNOWN_DISTANCE_KM: f64 = 1.0;

/// The part of a shipment the ranking looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Load {
    pub total_weight: f64,
    pub total_volume: f64,
    pub distance: f64,
}

impl From<&shipment::Model> for Load {
    fn from(model: &shipment::Model) -> Self {
        Self {
            total_weight: model.total_weight,
            total_volume: model.total_volume,
            distance: model.distance,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct MatchDetails {
    /// Share of the truck's volume the load takes, e.g. `"50.0%"`
    #[schema(example = "50.0%")]
    pub utilization: String,
    /// Cost rounded to a whole number, e.g. `"800"`
    #[schema(example = "800")]
    pub estimated_cost: String,
    /// Unrounded cost, the sort key
    pub score: f64,
}

/// A feasible truck with its scoring.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct RankedCandidate {
    pub truck_id: Uuid,
    pub truck: truck::Model,
    #[serde(flatten)]
    pub details: MatchDetails,
}

pub fn is_feasible(load: &Load, truck: &truck::Model) -> bool {
    truck.can_carry(load.total_weight, load.total_volume)
}

pub fn effective_distance(distance: f64) -> f64 {
    if distance > 0.0 {
        distance
    } else {
        UNKNOWN_DISTANCE_KM
    }
}

fn format_utilization(load: &Load, truck: &truck::Model) -> String {
    let utilization = load.total_volume / truck.capacity_volume * 100.0;
    format!("{:.1}%", (utilization * 10.0).round() / 10.0)
}

/// Scores a truck already known to be feasible for `load`.
pub fn score(load: &Load, truck: &truck::Model) -> MatchDetails {
    let cost = effective_distance(load.distance) * truck.cost_per_km;
    MatchDetails {
        utilization: format_utilization(load, truck),
        estimated_cost: format!("{:.0}", cost.round()),
        score: cost,
    }
}

/// Filters `fleet` to the available trucks able to carry `load` and orders them
/// cheapest first. Equal costs keep their fleet order.
///
/// An empty result is a valid answer, not an error.
pub fn rank_candidates(
    load: &Load,
    fleet: Vec<truck::Model>,
) -> Result<Vec<RankedCandidate>, ServiceError> {
    if !(load.total_weight > 0.0 && load.total_weight.is_finite()) {
        return Err(ServiceError::ValidationError(
            "total_weight must be a positive number".to_string(),
        ));
    }
    if !(load.total_volume > 0.0 && load.total_volume.is_finite()) {
        return Err(ServiceError::ValidationError(
            "total_volume must be a positive number".to_string(),
        ));
    }

    let mut ranked: Vec<RankedCandidate> = fleet
        .into_iter()
        .filter(|truck| truck.is_available && is_feasible(load, truck))
        .map(|truck| RankedCandidate {
            truck_id: truck.id,
            details: score(load, &truck),
            truck,
        })
        .collect();

    // sort_by is stable
    ranked.sort_by(|a, b| {
        a.details
            .score
            .partial_cmp(&b.details.score)
            .unwrap_or(Ordering::Equal)
    });

    Ok(ranked)
}

/// Loads the available fleet in registration order.
pub async fn available_fleet<C: ConnectionTrait>(db: &C) -> Result<Vec<truck::Model>, ServiceError> {
    truck::Entity::find()
        .filter(truck::Column::IsAvailable.eq(true))
        .order_by_asc(truck::Column::CreatedAt)
        .order_by_asc(truck::Column::Id)
        .all(db)
        .await
        .map_err(ServiceError::db_error)
}
