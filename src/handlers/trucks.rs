use crate::{
    entities::truck,
    errors::ServiceError,
    handlers::common::{created, parse_optional, ApiJson, NumericInput},
    services::trucks::{NewTruck, TruckChanges, TruckFilter},
    ApiResponse, ApiResult, AppState,
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
pub struct TruckListQuery {
    pub dealer_id: Option<Uuid>,
    pub available: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[schema(example = json!({
    "dealer_id": "8d7e6f5a-1b2c-4d3e-9f80-112233445566",
    "license_plate": "MH-12-AB-1234",
    "capacity_weight": 1000,
    "capacity_volume": 10,
    "cost_per_km": 8,
    "fuel_efficiency": 5
}))]
pub struct RegisterTruckRequest {
    pub dealer_id: Uuid,
    pub license_plate: String,
    pub capacity_weight: NumericInput,
    pub capacity_volume: NumericInput,
    pub cost_per_km: NumericInput,
    /// Distance per fuel unit, defaults to 5
    pub fuel_efficiency: Option<NumericInput>,
}

#[derive(Debug, Deserialize, Default, ToSchema)]
pub struct UpdateTruckRequest {
    pub license_plate: Option<String>,
    pub capacity_weight: Option<NumericInput>,
    pub capacity_volume: Option<NumericInput>,
    pub cost_per_km: Option<NumericInput>,
    pub fuel_efficiency: Option<NumericInput>,
}

#[utoipa::path(
    post,
    path = "/api/v1/trucks",
    request_body = RegisterTruckRequest,
    responses(
        (status = 201, description = "Truck registered and available", body = ApiResponse<crate::entities::truck::Model>),
        (status = 400, description = "Invalid request or user is not a dealer", body = crate::errors::ErrorResponse),
        (status = 404, description = "Dealer not found", body = crate::errors::ErrorResponse)
    ),
    tag = "trucks"
)]
pub async fn register_truck(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<RegisterTruckRequest>,
) -> Result<(StatusCode, Json<ApiResponse<truck::Model>>), ServiceError> {
    let new = NewTruck {
        dealer_id: payload.dealer_id,
        license_plate: payload.license_plate,
        capacity_weight: payload.capacity_weight.parse("capacity_weight")?,
        capacity_volume: payload.capacity_volume.parse("capacity_volume")?,
        cost_per_km: payload.cost_per_km.parse("cost_per_km")?,
        fuel_efficiency: parse_optional(payload.fuel_efficiency.as_ref(), "fuel_efficiency")?,
    };
    let saved = state.truck_service().register_truck(new).await?;
    Ok(created(saved))
}

#[utoipa::path(
    get,
    path = "/api/v1/trucks",
    params(TruckListQuery),
    responses(
        (status = 200, description = "Trucks listed", body = ApiResponse<Vec<crate::entities::truck::Model>>)
    ),
    tag = "trucks"
)]
pub async fn list_trucks(
    State(state): State<AppState>,
    Query(query): Query<TruckListQuery>,
) -> ApiResult<Vec<truck::Model>> {
    let trucks = state
        .truck_service()
        .list_trucks(TruckFilter {
            dealer_id: query.dealer_id,
            available: query.available,
        })
        .await?;
    Ok(Json(ApiResponse::success(trucks)))
}

#[utoipa::path(
    get,
    path = "/api/v1/trucks/:id",
    params(
        ("id" = Uuid, Path, description = "Truck ID")
    ),
    responses(
        (status = 200, description = "Truck fetched", body = ApiResponse<crate::entities::truck::Model>),
        (status = 404, description = "Truck not found", body = crate::errors::ErrorResponse)
    ),
    tag = "trucks"
)]
pub async fn get_truck(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<truck::Model> {
    let found = state.truck_service().get_truck(id).await?;
    Ok(Json(ApiResponse::success(found)))
}

#[utoipa::path(
    put,
    path = "/api/v1/trucks/:id",
    params(
        ("id" = Uuid, Path, description = "Truck ID")
    ),
    request_body = UpdateTruckRequest,
    responses(
        (status = 200, description = "Truck updated", body = ApiResponse<crate::entities::truck::Model>),
        (status = 400, description = "Invalid values", body = crate::errors::ErrorResponse),
        (status = 404, description = "Truck not found", body = crate::errors::ErrorResponse)
    ),
    tag = "trucks"
)]
pub async fn update_truck(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<UpdateTruckRequest>,
) -> ApiResult<truck::Model> {
    let changes = TruckChanges {
        license_plate: payload.license_plate,
        capacity_weight: parse_optional(payload.capacity_weight.as_ref(), "capacity_weight")?,
        capacity_volume: parse_optional(payload.capacity_volume.as_ref(), "capacity_volume")?,
        cost_per_km: parse_optional(payload.cost_per_km.as_ref(), "cost_per_km")?,
        fuel_efficiency: parse_optional(payload.fuel_efficiency.as_ref(), "fuel_efficiency")?,
    };
    let updated = state.truck_service().update_truck(id, changes).await?;
    Ok(Json(ApiResponse::success(updated)))
}
