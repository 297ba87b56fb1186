mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::{json, Value};
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn two_cities() -> Value {
    json!({
        "cities": [
            { "name": "Pune", "lat": 18.5204, "lng": 73.8567 },
            { "name": "Mumbai", "lat": 19.0760, "lng": 72.8777 }
        ]
    })
}

async fn app_against(server: &MockServer, failure_threshold: u32) -> TestApp {
    let url = format!("{}/optimize", server.uri());
    TestApp::with_config(move |cfg| {
        cfg.route_optimizer.url = Some(url);
        cfg.route_optimizer.failure_threshold = failure_threshold;
        cfg.route_optimizer.timeout_secs = 5;
    })
    .await
}

#[tokio::test]
async fn optimizer_response_is_passed_through() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/optimize"))
        .and(body_partial_json(json!({ "cities": [{ "name": "Pune" }, { "name": "Mumbai" }] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "optimized_route": [{ "name": "Pune" }, { "name": "Mumbai" }],
            "total_distance_km": 148.6,
            "ai_summary": "Take the expressway."
        })))
        .expect(1)
        .mount(&server)
        .await;

    let app = app_against(&server, 3).await;
    let (status, body) = app
        .json(Method::POST, "/api/v1/routes/optimize", Some(two_cities()))
        .await;

    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["total_distance_km"], json!(148.6));
    assert_eq!(body["data"]["ai_summary"], "Take the expressway.");
    assert_eq!(body["data"]["optimized_route"][1]["name"], "Mumbai");
}

#[tokio::test]
async fn client_errors_keep_the_remote_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/optimize"))
        .respond_with(ResponseTemplate::new(422).set_body_string("bad coordinates"))
        .expect(3)
        .mount(&server)
        .await;

    let app = app_against(&server, 2).await;
    for _ in 0..3 {
        let (status, body) = app
            .json(Method::POST, "/api/v1/routes/optimize", Some(two_cities()))
            .await;
        // rejections of a single request never open the circuit
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{body}");
    }
}

#[tokio::test]
async fn repeated_server_errors_open_the_circuit() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/optimize"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let app = app_against(&server, 2).await;
    for _ in 0..2 {
        let (status, _) = app
            .json(Method::POST, "/api/v1/routes/optimize", Some(two_cities()))
            .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    let (status, body) = app
        .json(Method::POST, "/api/v1/routes/optimize", Some(two_cities()))
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE, "{body}");
}

#[tokio::test]
async fn unreadable_optimizer_body_is_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/optimize"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let app = app_against(&server, 5).await;
    let (status, _) = app
        .json(Method::POST, "/api/v1/routes/optimize", Some(two_cities()))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn fewer_than_two_cities_never_reach_the_optimizer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let app = app_against(&server, 2).await;
    let (status, _) = app
        .json(
            Method::POST,
            "/api/v1/routes/optimize",
            Some(json!({ "cities": [{ "name": "Pune", "lat": 18.5, "lng": 73.8 }] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unconfigured_optimizer_is_an_internal_error() {
    let app = TestApp::new().await;
    let (status, body) = app
        .json(Method::POST, "/api/v1/routes/optimize", Some(two_cities()))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{body}");
}
