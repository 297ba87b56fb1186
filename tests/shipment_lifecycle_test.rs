mod common;

use axum::http::{Method, StatusCode};
use common::{shipment_id, TestApp};
use serde_json::{json, Value};
use uuid::Uuid;

fn approx(value: &Value, expected: f64) -> bool {
    value
        .as_f64()
        .map(|v| (v - expected).abs() < 1e-6)
        .unwrap_or(false)
}

async fn truck_available(app: &TestApp, truck_id: Uuid) -> bool {
    let (status, body) = app
        .json(Method::GET, &format!("/api/v1/trucks/{truck_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    body["data"]["is_available"]
        .as_bool()
        .expect("is_available flag")
}

#[tokio::test]
async fn full_lifecycle_settles_cost_and_co2() {
    let app = TestApp::new().await;
    let warehouse = app.seed_user("WAREHOUSE").await;
    let dealer = app.seed_user("DEALER").await;
    let truck = app.seed_truck(dealer, 1000.0, 10.0, 20.0).await;

    let created = app.create_shipment(warehouse, 500.0, 5.0, 500.0).await;
    let id = shipment_id(&created);

    let (status, booked) = app.book(id, truck).await;
    assert_eq!(status, StatusCode::OK, "{booked}");
    assert_eq!(booked["data"]["status"], "ASSIGNED");
    assert_eq!(booked["data"]["assigned_truck_id"], json!(truck));
    assert!(!truck_available(&app, truck).await);

    let (status, moving) = app.advance(id, "IN_TRANSIT").await;
    assert_eq!(status, StatusCode::OK, "{moving}");
    assert_eq!(moving["data"]["shipment"]["status"], "IN_TRANSIT");
    assert!(moving["data"].get("settlement").is_none());
    assert!(!truck_available(&app, truck).await);

    let (status, delivered) = app.advance(id, "DELIVERED").await;
    assert_eq!(status, StatusCode::OK, "{delivered}");

    let shipment = &delivered["data"]["shipment"];
    assert_eq!(shipment["status"], "DELIVERED");
    assert!(approx(&shipment["estimated_cost"], 10000.0));
    assert!(approx(&shipment["co2_saved"], 53.6));
    assert!(shipment["delivered_at"].is_string());

    let settlement = &delivered["data"]["settlement"];
    assert!(approx(&settlement["fuel_used"], 100.0));
    assert!(approx(&settlement["co2_emitted"], 268.0));
    assert!(approx(&settlement["distance_km"], 500.0));

    assert!(truck_available(&app, truck).await);
}

#[tokio::test]
async fn delivery_without_distance_uses_fallback() {
    let app = TestApp::new().await;
    let warehouse = app.seed_user("WAREHOUSE").await;
    let dealer = app.seed_user("DEALER").await;
    let truck = app.seed_truck(dealer, 1000.0, 10.0, 2.0).await;

    let created = app.create_shipment(warehouse, 100.0, 1.0, 0.0).await;
    let id = shipment_id(&created);

    app.book(id, truck).await;
    app.advance(id, "IN_TRANSIT").await;
    let (status, delivered) = app.advance(id, "DELIVERED").await;
    assert_eq!(status, StatusCode::OK, "{delivered}");

    let fallback = app.state.config.settlement.fallback_distance_km;
    assert!(approx(
        &delivered["data"]["settlement"]["distance_km"],
        fallback
    ));
    assert!(approx(
        &delivered["data"]["shipment"]["estimated_cost"],
        fallback * 2.0
    ));
}

#[tokio::test]
async fn skipping_a_step_is_rejected() {
    let app = TestApp::new().await;
    let warehouse = app.seed_user("WAREHOUSE").await;
    let dealer = app.seed_user("DEALER").await;
    let truck = app.seed_truck(dealer, 1000.0, 10.0, 2.0).await;

    let id = shipment_id(&app.create_shipment(warehouse, 100.0, 1.0, 10.0).await);

    let (status, _) = app.advance(id, "IN_TRANSIT").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.advance(id, "ASSIGNED").await;
    assert_eq!(status, StatusCode::CONFLICT);

    app.book(id, truck).await;
    let (status, body) = app.advance(id, "DELIVERED").await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let (status, body) = app.advance(id, "PENDING").await;
    assert_eq!(status, StatusCode::CONFLICT, "{body}");

    let (_, fetched) = app
        .json(Method::GET, &format!("/api/v1/shipments/{id}"), None)
        .await;
    assert_eq!(fetched["data"]["status"], "ASSIGNED");
    assert!(!truck_available(&app, truck).await);
}

#[tokio::test]
async fn delivered_shipment_is_terminal() {
    let app = TestApp::new().await;
    let warehouse = app.seed_user("WAREHOUSE").await;
    let dealer = app.seed_user("DEALER").await;
    let truck = app.seed_truck(dealer, 1000.0, 10.0, 2.0).await;

    let id = shipment_id(&app.create_shipment(warehouse, 100.0, 1.0, 10.0).await);
    app.book(id, truck).await;
    app.advance(id, "IN_TRANSIT").await;
    app.advance(id, "DELIVERED").await;

    for target in ["PENDING", "ASSIGNED", "IN_TRANSIT", "DELIVERED"] {
        let (status, _) = app.advance(id, target).await;
        assert_eq!(status, StatusCode::CONFLICT, "{target} after delivery");
    }

    let (status, _) = app.book(id, truck).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(truck_available(&app, truck).await);
}

#[tokio::test]
async fn released_truck_can_be_booked_again() {
    let app = TestApp::new().await;
    let warehouse = app.seed_user("WAREHOUSE").await;
    let dealer = app.seed_user("DEALER").await;
    let truck = app.seed_truck(dealer, 1000.0, 10.0, 2.0).await;

    let first = shipment_id(&app.create_shipment(warehouse, 100.0, 1.0, 10.0).await);
    app.book(first, truck).await;
    app.advance(first, "IN_TRANSIT").await;
    app.advance(first, "DELIVERED").await;

    let second = app.create_shipment(warehouse, 100.0, 1.0, 10.0).await;
    let matches = second["data"]["matches"].as_array().expect("matches array");
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0]["truck_id"], json!(truck));

    let (status, booked) = app.book(shipment_id(&second), truck).await;
    assert_eq!(status, StatusCode::OK, "{booked}");
}

#[tokio::test]
async fn dealer_jobs_and_analytics_follow_deliveries() {
    let app = TestApp::new().await;
    let warehouse = app.seed_user("WAREHOUSE").await;
    let dealer = app.seed_user("DEALER").await;
    let truck = app.seed_truck(dealer, 1000.0, 10.0, 20.0).await;

    let pending = shipment_id(&app.create_shipment(warehouse, 100.0, 2.0, 10.0).await);
    let id = shipment_id(&app.create_shipment(warehouse, 500.0, 5.0, 500.0).await);
    app.book(id, truck).await;
    app.advance(id, "IN_TRANSIT").await;
    app.advance(id, "DELIVERED").await;

    let (status, jobs) = app
        .json(Method::GET, &format!("/api/v1/dealers/{dealer}/jobs"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let jobs = jobs["data"].as_array().expect("jobs array");
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["shipment"]["id"], json!(id));
    assert_eq!(jobs[0]["truck"]["id"], json!(truck));
    assert!(jobs.iter().all(|job| job["shipment"]["id"] != json!(pending)));

    for user in [warehouse, dealer] {
        let (status, report) = app
            .json(Method::GET, &format!("/api/v1/analytics/{user}"), None)
            .await;
        assert_eq!(status, StatusCode::OK, "{report}");
        let report = &report["data"];
        assert_eq!(report["total_moves"], 1);
        assert!(approx(&report["total_money"], 10000.0));
        assert!(approx(&report["total_co2"], 53.6));
        assert_eq!(report["avg_utilization"], 50);
        assert_eq!(report["chart_data"][0]["label"], "Trip 1");
    }
}
