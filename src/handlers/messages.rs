use crate::{
    entities::message,
    errors::ServiceError,
    handlers::common::{created, ApiJson},
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Deserialize, ToSchema)]
pub struct PostMessageRequest {
    pub sender_id: Uuid,
    pub content: String,
}

#[utoipa::path(
    get,
    path = "/api/v1/shipments/:id/messages",
    params(
        ("id" = Uuid, Path, description = "Shipment ID")
    ),
    responses(
        (status = 200, description = "Messages, oldest first", body = ApiResponse<Vec<crate::entities::message::Model>>),
        (status = 404, description = "Shipment not found", body = crate::errors::ErrorResponse)
    ),
    tag = "messages"
)]
pub async fn list_messages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<message::Model>> {
    let messages = state.message_service().list_messages(id).await?;
    Ok(Json(ApiResponse::success(messages)))
}

#[utoipa::path(
    post,
    path = "/api/v1/shipments/:id/messages",
    params(
        ("id" = Uuid, Path, description = "Shipment ID")
    ),
    request_body = PostMessageRequest,
    responses(
        (status = 201, description = "Message posted", body = ApiResponse<crate::entities::message::Model>),
        (status = 400, description = "Empty content", body = crate::errors::ErrorResponse),
        (status = 404, description = "Shipment or sender not found", body = crate::errors::ErrorResponse)
    ),
    tag = "messages"
)]
pub async fn post_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(payload): ApiJson<PostMessageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<message::Model>>), ServiceError> {
    let saved = state
        .message_service()
        .post_message(id, payload.sender_id, payload.content)
        .await?;
    Ok(created(saved))
}
