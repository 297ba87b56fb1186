use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use validator::{Validate, ValidationError, ValidationErrors};

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";
/// Environment variable older deployments used for the optimizer endpoint.
const LEGACY_OPTIMIZER_URL_ENV: &str = "EXTERNAL_OPTIMIZER_URL";

/// Kilograms of CO2 released per unit of fuel burned.
pub const DEFAULT_EMISSION_FACTOR_KG_PER_FUEL_UNIT: f64 = 2.68;
/// Assumed share of emissions avoided versus a non-optimized baseline route.
pub const DEFAULT_CO2_SAVINGS_RATIO: f64 = 0.2;
/// Distance used at delivery when a shipment carries no usable distance.
pub const DEFAULT_FALLBACK_DISTANCE_KM: f64 = 500.0;

/// Policy constants applied when a shipment is settled on delivery.
///
/// These are business assumptions rather than measured values, so each one can
/// be overridden per deployment (e.g. `APP__SETTLEMENT__CO2_SAVINGS_RATIO=0.25`).
#[derive(Clone, Debug, Deserialize, Validate, PartialEq)]
#[validate(schema(function = "validate_settlement_policy"))]
pub struct SettlementPolicy {
    #[serde(default = "default_emission_factor")]
    pub emission_factor_kg_per_fuel_unit: f64,

    #[serde(default = "default_co2_savings_ratio")]
    pub co2_savings_ratio: f64,

    #[serde(default = "default_fallback_distance_km")]
    pub fallback_distance_km: f64,
}

impl Default for SettlementPolicy {
    fn default() -> Self {
        Self {
            emission_factor_kg_per_fuel_unit: DEFAULT_EMISSION_FACTOR_KG_PER_FUEL_UNIT,
            co2_savings_ratio: DEFAULT_CO2_SAVINGS_RATIO,
            fallback_distance_km: DEFAULT_FALLBACK_DISTANCE_KM,
        }
    }
}

/// External route optimizer settings
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct RouteOptimizerConfig {
    /// Endpoint receiving `POST {cities: [...]}`; the proxy is disabled when unset
    #[serde(default)]
    #[validate(url)]
    pub url: Option<String>,

    #[serde(default = "default_optimizer_timeout_secs")]
    pub timeout_secs: u64,

    /// Consecutive failures before the circuit opens
    #[serde(default = "default_circuit_breaker_failures")]
    pub failure_threshold: u32,

    /// Seconds before an open circuit admits a trial request
    #[serde(default = "default_circuit_breaker_timeout")]
    pub reset_timeout_secs: u64,
}

impl Default for RouteOptimizerConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_optimizer_timeout_secs(),
            failure_threshold: default_circuit_breaker_failures(),
            reset_timeout_secs: default_circuit_breaker_timeout(),
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    #[serde(default = "default_log_level")]
    #[validate(custom = "validate_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// Whether to run database migrations on startup
    #[serde(default)]
    pub auto_migrate: bool,

    /// CORS: comma-separated list of allowed origins (production)
    #[serde(default)]
    pub cors_allowed_origins: Option<String>,

    /// Allow permissive CORS fallback
    #[serde(default)]
    pub cors_allow_any_origin: bool,

    /// DB pool: max connections
    #[serde(default = "default_db_max_connections")]
    pub db_max_connections: u32,

    /// DB pool: min connections
    #[serde(default = "default_db_min_connections")]
    pub db_min_connections: u32,

    /// DB timeouts (seconds)
    #[serde(default = "default_db_connect_timeout_secs")]
    pub db_connect_timeout_secs: u64,
    #[serde(default = "default_db_idle_timeout_secs")]
    pub db_idle_timeout_secs: u64,
    #[serde(default = "default_db_acquire_timeout_secs")]
    pub db_acquire_timeout_secs: u64,

    /// How long a SQLite writer waits for the database lock before giving up
    #[serde(default = "default_db_busy_timeout_secs")]
    pub db_busy_timeout_secs: u64,

    /// Per-request timeout applied by the HTTP stack
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Capacity of the in-process domain event channel
    #[serde(default = "default_event_channel_capacity")]
    #[validate(range(min = 1))]
    pub event_channel_capacity: usize,

    #[serde(default)]
    #[validate]
    pub route_optimizer: RouteOptimizerConfig,

    #[serde(default)]
    #[validate]
    pub settlement: SettlementPolicy,
}

impl AppConfig {
    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Creates a new configuration with defaults for everything else
    pub fn new(database_url: String, host: String, port: u16, environment: String) -> Self {
        Self {
            database_url,
            host,
            port,
            environment,
            log_level: default_log_level(),
            log_json: false,
            auto_migrate: false,
            cors_allowed_origins: None,
            cors_allow_any_origin: false,
            db_max_connections: default_db_max_connections(),
            db_min_connections: default_db_min_connections(),
            db_connect_timeout_secs: default_db_connect_timeout_secs(),
            db_idle_timeout_secs: default_db_idle_timeout_secs(),
            db_acquire_timeout_secs: default_db_acquire_timeout_secs(),
            db_busy_timeout_secs: default_db_busy_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            route_optimizer: RouteOptimizerConfig::default(),
            settlement: SettlementPolicy::default(),
        }
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_deref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    fn validate_additional_constraints(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if !self.should_allow_permissive_cors() && !self.has_cors_allowed_origins() {
            let mut err = ValidationError::new("cors_allowed_origins_required");
            err.message = Some(
                "Set APP__CORS_ALLOWED_ORIGINS for non-development environments or explicitly opt-in via APP__CORS_ALLOW_ANY_ORIGIN=true".into(),
            );
            errors.add("cors_allowed_origins", err);
        }

        if self.db_min_connections > self.db_max_connections {
            let mut err = ValidationError::new("db_min_connections");
            err.message = Some("db_min_connections cannot exceed db_max_connections".into());
            errors.add("db_min_connections", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

/// Default value functions
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_max_connections() -> u32 {
    16
}
fn default_db_min_connections() -> u32 {
    2
}
fn default_db_connect_timeout_secs() -> u64 {
    30
}
fn default_db_idle_timeout_secs() -> u64 {
    600
}
fn default_db_acquire_timeout_secs() -> u64 {
    8
}
fn default_db_busy_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_optimizer_timeout_secs() -> u64 {
    15
}

fn default_circuit_breaker_failures() -> u32 {
    5
}

fn default_circuit_breaker_timeout() -> u64 {
    60
}

fn default_emission_factor() -> f64 {
    DEFAULT_EMISSION_FACTOR_KG_PER_FUEL_UNIT
}

fn default_co2_savings_ratio() -> f64 {
    DEFAULT_CO2_SAVINGS_RATIO
}

fn default_fallback_distance_km() -> f64 {
    DEFAULT_FALLBACK_DISTANCE_KM
}

/// Validates log level values
fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if valid_levels.contains(&level.to_lowercase().as_str()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("log_level");
        err.message = Some("Must be one of: trace, debug, info, warn, error".into());
        Err(err)
    }
}

fn positive_finite(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn validate_settlement_policy(policy: &SettlementPolicy) -> Result<(), ValidationError> {
    if !positive_finite(policy.emission_factor_kg_per_fuel_unit) {
        let mut err = ValidationError::new("emission_factor_kg_per_fuel_unit");
        err.message = Some("emission factor must be a finite number greater than 0".into());
        return Err(err);
    }
    if !positive_finite(policy.fallback_distance_km) {
        let mut err = ValidationError::new("fallback_distance_km");
        err.message = Some("fallback distance must be a finite number greater than 0".into());
        return Err(err);
    }
    let ratio = policy.co2_savings_ratio;
    if !ratio.is_finite() || !(0.0..=1.0).contains(&ratio) {
        let mut err = ValidationError::new("co2_savings_ratio");
        err.message = Some("savings ratio must be a finite number between 0.0 and 1.0".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::fmt;

    let default_directive = format!("fleetmatch_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt().with_env_filter(filter_directive).json().try_init();
    } else {
        let _ = fmt().with_env_filter(filter_directive).try_init();
    }
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Built-in defaults
/// 2. Default config (config/default.toml)
/// 3. Environment-specific config (config/{env}.toml)
/// 4. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, AppConfigError> {
    // Support both RUN_ENV and APP_ENV for selecting config profile
    let run_env = env::var("RUN_ENV")
        .or_else(|_| env::var("APP_ENV"))
        .unwrap_or_else(|_| DEFAULT_ENV.to_string());
    info!("Loading configuration for environment: {}", run_env);

    if !Path::new(CONFIG_DIR).exists() {
        info!(
            "Config directory '{}' not found; relying on built-in defaults and environment variables",
            CONFIG_DIR
        );
    }

    let config = Config::builder()
        .set_default("database_url", "sqlite://fleetmatch.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", 8080)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    let mut app_config: AppConfig = config.try_deserialize()?;

    if app_config.route_optimizer.url.is_none() {
        app_config.route_optimizer.url = env::var(LEGACY_OPTIMIZER_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty());
    }

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}
