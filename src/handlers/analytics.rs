use crate::{services::analytics::AnalyticsReport, ApiResponse, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    response::Json,
};
use uuid::Uuid;

#[utoipa::path(
    get,
    path = "/api/v1/analytics/:user_id",
    params(
        ("user_id" = Uuid, Path, description = "User whose deliveries are summarized")
    ),
    responses(
        (status = 200, description = "Delivery analytics for the user's role", body = ApiResponse<AnalyticsReport>),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    tag = "analytics"
)]
pub async fn user_analytics(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> ApiResult<AnalyticsReport> {
    let report = state.analytics_service().report_for(user_id).await?;
    Ok(Json(ApiResponse::success(report)))
}
