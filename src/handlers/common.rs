use crate::{entities::ShipmentStatus, errors::ServiceError, ApiResponse};
use async_trait::async_trait;
use axum::{
    extract::{FromRequest, Request},
    http::StatusCode,
    Json,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

pub const DEFAULT_PAGE_LIMIT: u64 = 20;
pub const MAX_PAGE_LIMIT: u64 = 100;

/// Standard created response
pub fn created<T>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

/// JSON body extractor whose rejections (missing fields, wrong types, bad
/// syntax) surface as `ValidationError` in the standard error body.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ServiceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| ServiceError::ValidationError(rejection.body_text()))?;
        Ok(Self(value))
    }
}

/// A number that clients may also send as a numeric string (`500` or `"500"`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(untagged)]
pub enum NumericInput {
    Number(f64),
    Text(String),
}

impl NumericInput {
    pub fn parse(&self, field: &str) -> Result<f64, ServiceError> {
        let value = match self {
            NumericInput::Number(n) => *n,
            NumericInput::Text(s) => s.trim().parse::<f64>().map_err(|_| {
                ServiceError::ValidationError(format!("{} must be a number, got '{}'", field, s))
            })?,
        };
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ServiceError::ValidationError(format!(
                "{} must be a finite number",
                field
            )))
        }
    }
}

/// Parses optional numeric input, keeping `None` when the field was omitted.
pub fn parse_optional(input: Option<&NumericInput>, field: &str) -> Result<Option<f64>, ServiceError> {
    input.map(|n| n.parse(field)).transpose()
}

pub fn parse_status(value: &str) -> Result<ShipmentStatus, ServiceError> {
    ShipmentStatus::from_str(value.trim()).map_err(|_| {
        ServiceError::ValidationError(format!(
            "unknown shipment status '{}', expected one of PENDING, ASSIGNED, IN_TRANSIT, DELIVERED",
            value
        ))
    })
}

/// Normalizes `page`/`limit` query values: pages start at 1, limit is capped.
pub fn page_bounds(page: Option<u64>, limit: Option<u64>) -> (u64, u64) {
    (
        page.unwrap_or(1).max(1),
        limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn numbers_and_numeric_strings_are_accepted() {
        let n: NumericInput = serde_json::from_str("500").unwrap();
        assert_eq!(n.parse("total_weight").unwrap(), 500.0);
        let s: NumericInput = serde_json::from_str("\" 12.5 \"").unwrap();
        assert_eq!(s.parse("total_weight").unwrap(), 12.5);
    }

    #[test]
    fn non_numeric_strings_are_validation_errors() {
        let s: NumericInput = serde_json::from_str("\"heavy\"").unwrap();
        assert_matches!(s.parse("total_weight"), Err(ServiceError::ValidationError(msg)) if msg.contains("total_weight"));
    }

    #[test]
    fn status_names_parse_case_insensitively() {
        assert_eq!(parse_status("in_transit").unwrap(), ShipmentStatus::InTransit);
        assert_matches!(parse_status("SHIPPED"), Err(ServiceError::ValidationError(_)));
    }

    #[test]
    fn page_bounds_are_clamped() {
        assert_eq!(page_bounds(None, None), (1, 20));
        assert_eq!(page_bounds(Some(0), Some(1000)), (1, 100));
        assert_eq!(page_bounds(Some(3), Some(0)), (3, 1));
    }
}
