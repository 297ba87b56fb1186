use crate::{config::SettlementPolicy, entities::truck, errors::ServiceError};
use serde::Serialize;
use utoipa::ToSchema;

/// Cost and emissions figures computed when a shipment is delivered.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Settlement {
    /// Distance the figures were computed over, after the fallback was applied
    pub distance_km: f64,
    pub estimated_cost: f64,
    pub fuel_used: f64,
    pub co2_emitted: f64,
    /// Rounded to two decimal places
    pub co2_saved: f64,
}

/// Distance used for settlement: the recorded distance, or the policy fallback
/// for shipments stored without one.
pub fn settlement_distance(recorded_km: f64, policy: &SettlementPolicy) -> f64 {
    if recorded_km.is_finite() && recorded_km > 0.0 {
        recorded_km
    } else {
        policy.fallback_distance_km
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Computes the delivery settlement of a trip of `recorded_km` on `truck`.
pub fn settle(
    recorded_km: f64,
    truck: &truck::Model,
    policy: &SettlementPolicy,
) -> Result<Settlement, ServiceError> {
    if !(truck.fuel_efficiency.is_finite() && truck.fuel_efficiency > 0.0) {
        return Err(ServiceError::ValidationError(format!(
            "truck {} has no usable fuel efficiency ({})",
            truck.id, truck.fuel_efficiency
        )));
    }

    let distance_km = settlement_distance(recorded_km, policy);
    let estimated_cost = distance_km * truck.cost_per_km;
    let fuel_used = distance_km / truck.fuel_efficiency;
    let co2_emitted = fuel_used * policy.emission_factor_kg_per_fuel_unit;
    let co2_saved = round2(co2_emitted * policy.co2_savings_ratio);

    Ok(Settlement {
        distance_km,
        estimated_cost,
        fuel_used,
        co2_emitted,
        co2_saved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn truck(cost_per_km: f64, fuel_efficiency: f64) -> truck::Model {
        truck::Model {
            id: Uuid::new_v4(),
            dealer_id: Uuid::new_v4(),
            license_plate: "KA-01-1234".into(),
            capacity_weight: 1000.0,
            capacity_volume: 10.0,
            cost_per_km,
            fuel_efficiency,
            is_available: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn settles_reference_trip() {
        let s = settle(500.0, &truck(20.0, 5.0), &SettlementPolicy::default()).unwrap();
        assert!(close(s.estimated_cost, 10_000.0));
        assert!(close(s.fuel_used, 100.0));
        assert!(close(s.co2_emitted, 268.0));
        assert!(close(s.co2_saved, 53.6));
    }

    #[test]
    fn missing_distance_falls_back_to_policy() {
        let policy = SettlementPolicy::default();
        let s = settle(0.0, &truck(20.0, 5.0), &policy).unwrap();
        assert!(close(s.distance_km, 500.0));
        assert!(close(s.estimated_cost, 10_000.0));

        let custom = SettlementPolicy {
            fallback_distance_km: 100.0,
            ..policy
        };
        let s = settle(-3.0, &truck(2.0, 5.0), &custom).unwrap();
        assert!(close(s.estimated_cost, 200.0));
    }

    #[test]
    fn co2_saved_is_rounded_to_cents() {
        // 123 km / 7 = 17.571..; * 2.68 * 0.2 = 9.4182..
        let s = settle(123.0, &truck(1.0, 7.0), &SettlementPolicy::default()).unwrap();
        assert!(close(s.co2_saved, 9.42));
    }

    #[test]
    fn zero_fuel_efficiency_is_rejected() {
        let err = settle(10.0, &truck(1.0, 0.0), &SettlementPolicy::default()).unwrap_err();
        assert!(matches!(err, ServiceError::ValidationError(_)));
    }
}
