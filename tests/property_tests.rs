//! Property-based tests for truck ranking and delivery settlement.

use chrono::Utc;
use fleetmatch_api::config::SettlementPolicy;
use fleetmatch_api::entities::truck;
use fleetmatch_api::services::matching::{is_feasible, rank_candidates, Load};
use fleetmatch_api::services::settlement::settle;
use proptest::prelude::*;
use uuid::Uuid;

fn truck_strategy() -> impl Strategy<Value = truck::Model> {
    (
        1.0f64..5_000.0,
        0.5f64..50.0,
        0.5f64..40.0,
        1.0f64..15.0,
        any::<bool>(),
    )
        .prop_map(
            |(capacity_weight, capacity_volume, cost_per_km, fuel_efficiency, is_available)| {
                truck::Model {
                    id: Uuid::new_v4(),
                    dealer_id: Uuid::new_v4(),
                    license_plate: "PROP-1".to_string(),
                    capacity_weight,
                    capacity_volume,
                    cost_per_km,
                    fuel_efficiency,
                    is_available,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                }
            },
        )
}

fn load_strategy() -> impl Strategy<Value = Load> {
    (1.0f64..4_000.0, 0.5f64..40.0, prop_oneof![Just(0.0), 1.0f64..2_000.0]).prop_map(
        |(total_weight, total_volume, distance)| Load {
            total_weight,
            total_volume,
            distance,
        },
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn ranking_keeps_exactly_the_feasible_available_trucks(
        load in load_strategy(),
        fleet in prop::collection::vec(truck_strategy(), 0..12),
    ) {
        let expected = fleet
            .iter()
            .filter(|t| t.is_available && is_feasible(&load, t))
            .count();
        let ranked = rank_candidates(&load, fleet).expect("valid load");

        prop_assert_eq!(ranked.len(), expected);
        for candidate in &ranked {
            prop_assert!(candidate.truck.is_available);
            prop_assert!(candidate.truck.capacity_weight >= load.total_weight);
            prop_assert!(candidate.truck.capacity_volume >= load.total_volume);
            prop_assert_eq!(candidate.truck_id, candidate.truck.id);
        }
    }

    #[test]
    fn ranked_costs_never_decrease(
        load in load_strategy(),
        fleet in prop::collection::vec(truck_strategy(), 0..12),
    ) {
        let ranked = rank_candidates(&load, fleet).expect("valid load");
        for pair in ranked.windows(2) {
            prop_assert!(pair[0].details.score <= pair[1].details.score);
        }
    }

    #[test]
    fn settlement_scales_with_distance(
        t in truck_strategy(),
        km in 1.0f64..5_000.0,
    ) {
        let policy = SettlementPolicy::default();
        let near = settle(km, &t, &policy).expect("positive efficiency");
        let far = settle(km * 2.0, &t, &policy).expect("positive efficiency");

        prop_assert!(far.estimated_cost > near.estimated_cost);
        prop_assert!(far.co2_saved >= near.co2_saved);
        prop_assert!(near.co2_saved <= near.co2_emitted);
        prop_assert!((near.estimated_cost - km * t.cost_per_km).abs() < 1e-6);
    }
}
