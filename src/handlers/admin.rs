use crate::{services::admin::AdminOverview, ApiResponse, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    response::Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/v1/admin/overview",
    responses(
        (status = 200, description = "System counters, users and recent shipments", body = ApiResponse<AdminOverview>)
    ),
    tag = "admin"
)]
pub async fn overview(State(state): State<AppState>) -> ApiResult<AdminOverview> {
    let overview = state.admin_service().overview().await?;
    Ok(Json(ApiResponse::success(overview)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/admin/users/:id",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User deleted"),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "User still owns records", body = crate::errors::ErrorResponse)
    ),
    tag = "admin"
)]
pub async fn delete_user(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Value> {
    state.admin_service().delete_user(id).await?;
    Ok(Json(ApiResponse::success(json!({ "deleted": id }))))
}
