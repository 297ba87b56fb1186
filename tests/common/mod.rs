#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use fleetmatch_api::{
    config::AppConfig,
    db,
    events::{self, EventSender},
    handlers::AppServices,
    AppState,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

/// Helper harness for spinning up the application against a throwaway SQLite file.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _db_dir: TempDir,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Builds the app after letting the caller adjust the configuration.
    pub async fn with_config(adjust: impl FnOnce(&mut AppConfig)) -> Self {
        let db_dir = tempfile::tempdir().expect("create temp dir for test database");
        let db_path = db_dir.path().join("fleetmatch_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_path.display()),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.cors_allow_any_origin = true;
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        adjust(&mut cfg);

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(cfg.event_channel_capacity);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db_arc.clone(), Arc::new(event_sender.clone()), &cfg)
            .expect("build services");

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
        };
        let router = fleetmatch_api::build_router(state.clone()).expect("build router");

        Self {
            router,
            state,
            _db_dir: db_dir,
            _event_task: event_task,
        }
    }

    /// Sends a request through the full middleware stack.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };

        self.router
            .clone()
            .oneshot(builder.body(body).expect("build request"))
            .await
            .expect("router is infallible")
    }

    /// Sends a request and decodes the JSON body alongside the status.
    pub async fn json(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let response = self.request(method, uri, body).await;
        let status = response.status();
        let value = read_json(response).await;
        (status, value)
    }

    pub async fn seed_user(&self, role: &str) -> Uuid {
        let email = format!("{}-{}@fleetmatch.test", role.to_lowercase(), Uuid::new_v4());
        let (status, body) = self
            .json(
                Method::POST,
                "/api/v1/users",
                Some(json!({ "name": format!("{} user", role), "email": email, "role": role })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "seed user failed: {body}");
        data_id(&body)
    }

    /// Registers a truck for `dealer_id` with fuel efficiency 5.
    pub async fn seed_truck(
        &self,
        dealer_id: Uuid,
        capacity_weight: f64,
        capacity_volume: f64,
        cost_per_km: f64,
    ) -> Uuid {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/v1/trucks",
                Some(json!({
                    "dealer_id": dealer_id,
                    "license_plate": format!("TRK-{}", &Uuid::new_v4().to_string()[..8]),
                    "capacity_weight": capacity_weight,
                    "capacity_volume": capacity_volume,
                    "cost_per_km": cost_per_km,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "seed truck failed: {body}");
        data_id(&body)
    }

    /// Creates a shipment and returns the full response body.
    pub async fn create_shipment(
        &self,
        warehouse_id: Uuid,
        total_weight: f64,
        total_volume: f64,
        distance: f64,
    ) -> Value {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/v1/shipments",
                Some(json!({
                    "warehouse_id": warehouse_id,
                    "origin": "Pune",
                    "destination": "Mumbai",
                    "total_weight": total_weight,
                    "total_volume": total_volume,
                    "distance": distance,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create shipment failed: {body}");
        body
    }

    pub async fn book(&self, shipment_id: Uuid, truck_id: Uuid) -> (StatusCode, Value) {
        self.json(
            Method::POST,
            &format!("/api/v1/shipments/{shipment_id}/book"),
            Some(json!({ "truck_id": truck_id })),
        )
        .await
    }

    pub async fn advance(&self, shipment_id: Uuid, status: &str) -> (StatusCode, Value) {
        self.json(
            Method::PUT,
            &format!("/api/v1/shipments/{shipment_id}/status"),
            Some(json!({ "status": status })),
        )
        .await
    }
}

pub async fn read_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read response body");
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body is JSON")
    }
}

pub fn data_id(body: &Value) -> Uuid {
    body["data"]["id"]
        .as_str()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_else(|| panic!("response carries no data.id: {body}"))
}

pub fn shipment_id(body: &Value) -> Uuid {
    body["data"]["shipment_id"]
        .as_str()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or_else(|| panic!("response carries no data.shipment_id: {body}"))
}
