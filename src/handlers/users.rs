use crate::{
    entities::user,
    errors::ServiceError,
    handlers::common::{created, ApiJson},
    services::users::NewUser,
    ApiResponse, ApiResult, AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use uuid::Uuid;

#[utoipa::path(
    post,
    path = "/api/v1/users",
    request_body = NewUser,
    responses(
        (status = 201, description = "User created", body = ApiResponse<crate::entities::user::Model>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NewUser>,
) -> Result<(StatusCode, Json<ApiResponse<user::Model>>), ServiceError> {
    let saved = state.user_service().create_user(payload).await?;
    Ok(created(saved))
}

#[utoipa::path(
    get,
    path = "/api/v1/users/:id",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User fetched", body = ApiResponse<crate::entities::user::Model>),
        (status = 404, description = "User not found", body = crate::errors::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn get_user(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<user::Model> {
    let found = state.user_service().get_user(id).await?;
    Ok(Json(ApiResponse::success(found)))
}
