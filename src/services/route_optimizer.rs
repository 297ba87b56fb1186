use crate::{
    circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError},
    config::RouteOptimizerConfig,
    errors::ServiceError,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct City {
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OptimizeRouteRequest {
    pub cities: Vec<City>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OptimizedRoute {
    /// Stops in visiting order, passed through as the optimizer returns them
    #[schema(value_type = Vec<Object>)]
    pub optimized_route: Vec<serde_json::Value>,
    pub total_distance_km: f64,
    pub ai_summary: String,
}

/// Proxy to the external route optimizer
#[derive(Clone)]
pub struct RouteOptimizerClient {
    client: reqwest::Client,
    url: Option<String>,
    breaker: Arc<CircuitBreaker>,
}

// Outer error: the optimizer is unhealthy and the breaker should count it.
// Inner error: the optimizer rejected this particular request.
type Attempt = Result<Result<OptimizedRoute, ServiceError>, ServiceError>;

impl RouteOptimizerClient {
    pub fn new(config: &RouteOptimizerConfig) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ServiceError::InternalError(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            breaker: Arc::new(CircuitBreaker::new(
                "route_optimizer",
                CircuitBreakerConfig {
                    failure_threshold: config.failure_threshold,
                    timeout: Duration::from_secs(config.reset_timeout_secs),
                    success_threshold: 1,
                },
            )),
        })
    }

    #[instrument(skip(self, request), fields(cities = request.cities.len()))]
    pub async fn optimize(&self, request: &OptimizeRouteRequest) -> Result<OptimizedRoute, ServiceError> {
        if request.cities.len() < 2 {
            return Err(ServiceError::ValidationError(
                "at least 2 cities are required".to_string(),
            ));
        }
        let url = self.url.as_deref().ok_or_else(|| {
            error!("Route optimizer URL is not configured");
            ServiceError::InternalError("route optimizer is not configured".to_string())
        })?;

        let outcome = self.breaker.call(|| self.attempt(url, request)).await;

        match outcome {
            Ok(Ok(route)) => {
                info!(total_distance_km = route.total_distance_km, "Route optimized");
                Ok(route)
            }
            Ok(Err(rejected)) => Err(rejected),
            Err(CircuitBreakerError::CircuitOpen) => {
                warn!("Route optimizer circuit is open");
                Err(ServiceError::CircuitBreakerOpen)
            }
            Err(CircuitBreakerError::ServiceFailure(e)) => {
                counter!("fleetmatch.route_optimizer.failures", 1);
                Err(e)
            }
        }
    }

    async fn attempt(&self, url: &str, request: &OptimizeRouteRequest) -> Attempt {
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                warn!("Route optimizer unreachable: {}", e);
                ServiceError::upstream_unreachable(format!("route optimizer unreachable: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "Route optimizer returned an error");
            let err = ServiceError::UpstreamError {
                status: status.as_u16(),
                message: format!(
                    "route optimizer failed: {}",
                    status.canonical_reason().unwrap_or("unknown status")
                ),
            };
            return if status.is_server_error() {
                Err(err)
            } else {
                Ok(Err(err))
            };
        }

        let route = response.json::<OptimizedRoute>().await.map_err(|e| {
            ServiceError::upstream_unreachable(format!("route optimizer sent an unreadable body: {}", e))
        })?;
        Ok(Ok(route))
    }
}
