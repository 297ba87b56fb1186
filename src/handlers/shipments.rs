use crate::{
    commands::shipments::{AdvanceOutcome, CreateShipmentCommand},
    entities::shipment,
    errors::ServiceError,
    handlers::common::{created, page_bounds, parse_optional, parse_status, ApiJson, NumericInput},
    services::shipments::{ShipmentFilter, ShipmentUpdate, ShipmentWithMatches},
    ApiResponse, ApiResult, AppState, PaginatedResponse,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Deserialize, Default, ToSchema, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ShipmentListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub warehouse_id: Option<Uuid>,
    /// PENDING, ASSIGNED, IN_TRANSIT or DELIVERED
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[schema(example = json!({
    "warehouse_id": "2b0f5c8e-4c1a-4d59-9a3e-7f1b7d7f6a01",
    "origin": "Pune",
    "destination": "Mumbai",
    "total_weight": 500,
    "total_volume": "5",
    "distance": 150
}))]
pub struct CreateShipmentRequest {
    pub warehouse_id: Uuid,
    pub origin: String,
    pub destination: String,
    /// Number or numeric string
    pub total_weight: NumericInput,
    /// Number or numeric string
    pub total_volume: NumericInput,
    /// Kilometers; omitted means unknown
    pub distance: Option<NumericInput>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BookTruckRequest {
    pub truck_id: Uuid,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AdvanceStatusRequest {
    /// IN_TRANSIT or DELIVERED
    #[schema(example = "IN_TRANSIT")]
    pub status: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PatchShipmentRequest {
    pub shipment_id: Uuid,
    pub truck_id: Option<Uuid>,
    pub status: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments",
    request_body = CreateShipmentRequest,
    responses(
        (status = 201, description = "Shipment created with ranked truck matches", body = ApiResponse<ShipmentWithMatches>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Warehouse not found", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn create_shipment(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateShipmentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ShipmentWithMatches>>), ServiceError> {
    let command = CreateShipmentCommand {
        warehouse_id: payload.warehouse_id,
        origin: payload.origin,
        destination: payload.destination,
        total_weight: payload.total_weight.parse("total_weight")?,
        total_volume: payload.total_volume.parse("total_volume")?,
        distance: parse_optional(payload.distance.as_ref(), "distance")?.unwrap_or(0.0),
    };

    let result = state.shipment_service().create_shipment(command).await?;
    Ok(created(result))
}

#[utoipa::path(
    get,
    path = "/api/v1/shipments",
    params(ShipmentListQuery),
    responses(
        (status = 200, description = "Shipments listed, newest first", body = ApiResponse<PaginatedResponse<crate::entities::shipment::Model>>),
        (status = 400, description = "Invalid filter", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn list_shipments(
    State(state): State<AppState>,
    Query(query): Query<ShipmentListQuery>,
) -> ApiResult<PaginatedResponse<shipment::Model>> {
    let (page, limit) = page_bounds(query.page, query.limit);
    let filter = ShipmentFilter {
        warehouse_id: query.warehouse_id,
        status: query.status.as_deref().map(parse_status).transpose()?,
    };

    let (items, total) = state
        .shipment_service()
        .list_shipments(filter, page, limit)
        .await?;
    let total_pages = (total + limit - 1) / limit;

    Ok(Json(ApiResponse::success(PaginatedResponse {
        items,
        total,
        page,
        limit,
        total_pages,
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/shipments/:id",
    params(
        ("id" = Uuid, Path, description = "Shipment ID")
    ),
    responses(
        (status = 200, description = "Shipment fetched", body = ApiResponse<crate::entities::shipment::Model>),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn get_shipment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<shipment::Model> {
    let found = state.shipment_service().get_shipment(id).await?;
    Ok(Json(ApiResponse::success(found)))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/:id/book",
    params(
        ("id" = Uuid, Path, description = "Shipment ID")
    ),
    request_body = BookTruckRequest,
    responses(
        (status = 200, description = "Truck booked, shipment ASSIGNED", body = ApiResponse<crate::entities::shipment::Model>),
        (status = 404, description = "Shipment or truck not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Truck unavailable or shipment not PENDING", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn book_truck(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<BookTruckRequest>,
) -> ApiResult<shipment::Model> {
    let booked = state
        .shipment_service()
        .book_truck(id, payload.truck_id)
        .await?;
    Ok(Json(ApiResponse::success(booked)))
}

#[utoipa::path(
    put,
    path = "/api/v1/shipments/:id/status",
    params(
        ("id" = Uuid, Path, description = "Shipment ID")
    ),
    request_body = AdvanceStatusRequest,
    responses(
        (status = 200, description = "Status advanced; settlement included on delivery", body = ApiResponse<AdvanceOutcome>),
        (status = 400, description = "Unknown status", body = crate::errors::ErrorResponse),
        (status = 404, description = "Shipment or truck not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Not the next status", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn advance_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<AdvanceStatusRequest>,
) -> ApiResult<AdvanceOutcome> {
    let target = parse_status(&payload.status)?;
    let outcome = state.shipment_service().advance_status(id, target).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// Combined update kept for older clients: `truck_id` alone books, `status` advances.
#[utoipa::path(
    patch,
    path = "/api/v1/shipments",
    request_body = PatchShipmentRequest,
    responses(
        (status = 200, description = "Shipment updated", body = ApiResponse<crate::entities::shipment::Model>),
        (status = 400, description = "Nothing to update", body = crate::errors::ErrorResponse),
        (status = 409, description = "Conflict or invalid transition", body = crate::errors::ErrorResponse)
    ),
    tag = "shipments"
)]
pub async fn patch_shipment(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<PatchShipmentRequest>,
) -> ApiResult<shipment::Model> {
    let update = ShipmentUpdate {
        shipment_id: payload.shipment_id,
        truck_id: payload.truck_id,
        status: payload.status.as_deref().map(parse_status).transpose()?,
    };
    let updated = state.shipment_service().apply_update(update).await?;
    Ok(Json(ApiResponse::success(updated)))
}

#[utoipa::path(
    get,
    path = "/api/v1/dealers/:id/jobs",
    params(
        ("id" = Uuid, Path, description = "Dealer user ID")
    ),
    responses(
        (status = 200, description = "Shipments on the dealer's trucks", body = ApiResponse<Vec<crate::services::shipments::ShipmentWithTruck>>)
    ),
    tag = "shipments"
)]
pub async fn dealer_jobs(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<crate::services::shipments::ShipmentWithTruck>> {
    let jobs = state.shipment_service().dealer_jobs(id).await?;
    Ok(Json(ApiResponse::success(jobs)))
}
