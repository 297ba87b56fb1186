use crate::{
    handlers::common::ApiJson,
    services::route_optimizer::{OptimizeRouteRequest, OptimizedRoute},
    ApiResponse, ApiResult, AppState,
};
use axum::{extract::State, response::Json};

#[utoipa::path(
    post,
    path = "/api/v1/routes/optimize",
    request_body = OptimizeRouteRequest,
    responses(
        (status = 200, description = "Optimized visiting order", body = ApiResponse<OptimizedRoute>),
        (status = 400, description = "Fewer than 2 cities", body = crate::errors::ErrorResponse),
        (status = 502, description = "Optimizer unreachable", body = crate::errors::ErrorResponse),
        (status = 503, description = "Optimizer circuit open", body = crate::errors::ErrorResponse)
    ),
    tag = "routes"
)]
pub async fn optimize_route(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<OptimizeRouteRequest>,
) -> ApiResult<OptimizedRoute> {
    let route = state.route_optimizer().optimize(&payload).await?;
    Ok(Json(ApiResponse::success(route)))
}
