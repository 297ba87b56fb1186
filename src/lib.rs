//! FleetMatch API Library
//!
//! Truck matching and shipment lifecycle backend: ranks the available fleet for
//! new shipments, books trucks atomically and settles cost and CO2 on delivery.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod circuit_breaker;
pub mod commands;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod middleware_helpers;
pub mod openapi;
pub mod services;
pub mod tracing;

use axum::{
    extract::State,
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use http::HeaderValue;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
};
use utoipa::ToSchema;

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub event_sender: events::EventSender,
    pub services: handlers::AppServices,
}

impl AppState {
    pub fn shipment_service(&self) -> Arc<services::shipments::ShipmentService> {
        self.services.shipments.clone()
    }

    pub fn truck_service(&self) -> Arc<services::trucks::TruckService> {
        self.services.trucks.clone()
    }

    pub fn user_service(&self) -> Arc<services::users::UserService> {
        self.services.users.clone()
    }

    pub fn admin_service(&self) -> Arc<services::admin::AdminService> {
        self.services.admin.clone()
    }

    pub fn analytics_service(&self) -> Arc<services::analytics::AnalyticsService> {
        self.services.analytics.clone()
    }

    pub fn message_service(&self) -> Arc<services::messages::MessageService> {
        self.services.messages.clone()
    }

    pub fn route_optimizer(&self) -> Arc<services::route_optimizer::RouteOptimizerClient> {
        self.services.route_optimizer.clone()
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub limit: u64,
    pub total_pages: u64,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[tokio::test]
    async fn success_response_includes_request_metadata() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("meta-123"), async {
                ApiResponse::success("ok")
            })
            .await;

        let meta = response.meta.expect("metadata expected");
        assert_eq!(meta.request_id.as_deref(), Some("meta-123"));
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

pub fn api_v1_routes() -> Router<AppState> {
    let shipments = Router::new()
        .route(
            "/shipments",
            post(handlers::shipments::create_shipment)
                .get(handlers::shipments::list_shipments)
                .patch(handlers::shipments::patch_shipment),
        )
        .route("/shipments/:id", get(handlers::shipments::get_shipment))
        .route("/shipments/:id/book", post(handlers::shipments::book_truck))
        .route(
            "/shipments/:id/status",
            put(handlers::shipments::advance_status),
        )
        .route(
            "/shipments/:id/messages",
            get(handlers::messages::list_messages).post(handlers::messages::post_message),
        )
        .route("/dealers/:id/jobs", get(handlers::shipments::dealer_jobs));

    let trucks = Router::new()
        .route(
            "/trucks",
            post(handlers::trucks::register_truck).get(handlers::trucks::list_trucks),
        )
        .route(
            "/trucks/:id",
            get(handlers::trucks::get_truck).put(handlers::trucks::update_truck),
        );

    let users = Router::new()
        .route("/users", post(handlers::users::create_user))
        .route("/users/:id", get(handlers::users::get_user));

    let admin = Router::new()
        .route("/overview", get(handlers::admin::overview))
        .route(
            "/users/:id",
            axum::routing::delete(handlers::admin::delete_user),
        );

    Router::new()
        .merge(shipments)
        .merge(trucks)
        .merge(users)
        .route(
            "/analytics/:user_id",
            get(handlers::analytics::user_analytics),
        )
        .route("/routes/optimize", post(handlers::routes::optimize_route))
        .nest("/admin", admin)
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let status_data = json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "fleetmatch-api",
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let db_status = match db::check_connection(&state.db).await {
        Ok(()) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
            "route_optimizer": if state.config.route_optimizer.url.is_some() { "configured" } else { "disabled" },
        },
        "environment": state.config.environment,
        "timestamp": Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}

/// Builds the CORS layer from configuration.
pub fn cors_layer(cfg: &config::AppConfig) -> anyhow::Result<CorsLayer> {
    let configured_origins: Option<Vec<HeaderValue>> = cfg
        .cors_allowed_origins
        .as_ref()
        .map(|raw| {
            raw.split(',')
                .filter_map(|origin| {
                    let trimmed = origin.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        HeaderValue::from_str(trimmed).ok()
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|origins| !origins.is_empty());

    if let Some(origins) = configured_origins {
        Ok(CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any))
    } else if cfg.should_allow_permissive_cors() {
        ::tracing::info!(
            "Using permissive CORS because explicit origins were not configured ({})",
            if cfg.is_development() {
                "development environment"
            } else {
                "explicit override enabled"
            }
        );
        Ok(CorsLayer::permissive())
    } else {
        anyhow::bail!(
            "Missing CORS configuration: set APP__CORS_ALLOWED_ORIGINS or APP__CORS_ALLOW_ANY_ORIGIN=true"
        )
    }
}

/// Assembles the full HTTP application: status/health, the v1 API, Swagger UI
/// and the shared middleware stack.
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let cors = cors_layer(&state.config)?;
    let timeout = Duration::from_secs(state.config.request_timeout_secs);

    let app = Router::<AppState>::new()
        .route("/", get(|| async { "fleetmatch-api up" }))
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        .nest("/api/v1", api_v1_routes())
        .merge(openapi::swagger_ui())
        // HTTP tracing layer for consistent request/response telemetry
        .layer(crate::tracing::configure_http_tracing())
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(timeout))
        .layer(cors)
        // Ensure every request carries a request id for traceability
        .layer(axum::middleware::from_fn(
            crate::middleware_helpers::request_id::request_id_middleware,
        ))
        .with_state(state);

    Ok(app)
}

pub mod prelude {
    pub use crate::config::{AppConfig, SettlementPolicy};
    pub use crate::entities::{ShipmentStatus, UserRole};
    pub use crate::errors::ServiceError;
    pub use crate::events::{Event, EventSender};
    pub use crate::services::matching::{rank_candidates, Load, RankedCandidate};
    pub use crate::services::settlement::{settle, Settlement};
}
