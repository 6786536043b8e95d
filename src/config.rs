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
const DEFAULT_TRACKING_PREFIX: &str = "CL";
const DEV_DEFAULT_JWT_SECRET: &str =
    "this_is_a_development_secret_key_that_is_at_least_64_characters_long_for_testing";

/// Per-service line of the rate card.
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct ServiceRateConfig {
    /// Flat base charge for the service level
    #[validate(range(min = 0.0))]
    pub base: f64,

    /// Charge per billable kilogram
    #[validate(range(min = 0.0))]
    pub per_kg: f64,

    /// Transit days promised for the service level
    #[validate(range(min = 1, max = 90))]
    pub days: u32,
}

impl ServiceRateConfig {
    fn new(base: f64, per_kg: f64, days: u32) -> Self {
        Self { base, per_kg, days }
    }
}

/// Pricing configuration consumed by the cost calculator
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct PricingConfig {
    /// Calculator backend: "rates" (in-process rate card) or "remote"
    #[serde(default = "default_pricing_backend")]
    #[validate(custom = "validate_backend")]
    pub backend: String,

    /// Tax rate applied to the pre-tax subtotal (0.08 = 8%)
    #[serde(default = "default_tax_rate")]
    #[validate(custom = "validate_tax_rate")]
    pub tax_rate: f64,

    /// Insurance premium as a fraction of the declared value
    #[serde(default = "default_insurance_rate")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub insurance_rate: f64,

    /// Minimum insurance premium when insurance is requested
    #[serde(default = "default_insurance_minimum")]
    #[validate(range(min = 0.0))]
    pub insurance_minimum: f64,

    /// Flat surcharge for signature-on-delivery
    #[serde(default = "default_signature_surcharge")]
    #[validate(range(min = 0.0))]
    pub signature_surcharge: f64,

    /// Cubic centimetres per volumetric kilogram
    #[serde(default = "default_volumetric_divisor")]
    #[validate(range(min = 1.0))]
    pub volumetric_divisor: f64,

    #[serde(default = "default_standard_rate")]
    #[validate]
    pub standard: ServiceRateConfig,

    #[serde(default = "default_express_rate")]
    #[validate]
    pub express: ServiceRateConfig,

    #[serde(default = "default_overnight_rate")]
    #[validate]
    pub overnight: ServiceRateConfig,

    #[serde(default = "default_international_rate")]
    #[validate]
    pub international: ServiceRateConfig,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            backend: default_pricing_backend(),
            tax_rate: default_tax_rate(),
            insurance_rate: default_insurance_rate(),
            insurance_minimum: default_insurance_minimum(),
            signature_surcharge: default_signature_surcharge(),
            volumetric_divisor: default_volumetric_divisor(),
            standard: default_standard_rate(),
            express: default_express_rate(),
            overnight: default_overnight_rate(),
            international: default_international_rate(),
        }
    }
}

/// Quote settings
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct QuoteConfig {
    /// Days a quote stays valid after creation
    #[serde(default = "default_quote_validity_days")]
    #[validate(range(min = 1, max = 90))]
    pub validity_days: i64,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            validity_days: default_quote_validity_days(),
        }
    }
}

/// Tracking number generation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct TrackingConfig {
    /// Prefix for locally generated tracking numbers
    #[serde(default = "default_tracking_prefix")]
    #[validate(length(min = 1, max = 6))]
    pub prefix: String,

    /// Generator backend: "local" or "remote"
    #[serde(default = "default_tracking_generator")]
    #[validate(custom = "validate_generator")]
    pub generator: String,

    /// Attempts made when a generated number collides with an existing one
    #[serde(default = "default_tracking_max_attempts")]
    #[validate(range(min = 1, max = 10))]
    pub max_attempts: u32,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            prefix: default_tracking_prefix(),
            generator: default_tracking_generator(),
            max_attempts: default_tracking_max_attempts(),
        }
    }
}

/// Shipment lifecycle rules
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct LifecycleConfig {
    /// Reject appends that leave a terminal state or move backward
    #[serde(default = "default_true_bool")]
    pub enforce_transitions: bool,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            enforce_transitions: true,
        }
    }
}

/// Remote procedure endpoint (cost calculation and tracking numbers)
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct RemoteProcedureConfig {
    /// Base URL of the remote procedure host, e.g. `https://db.example.com`
    #[serde(default)]
    pub base_url: Option<String>,

    /// API key sent with every remote call
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_remote_timeout_secs")]
    #[validate(range(min = 1, max = 120))]
    pub timeout_secs: u64,
}

impl Default for RemoteProcedureConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout_secs: default_remote_timeout_secs(),
        }
    }
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// JWT secret shared with the identity provider (minimum 64 characters)
    #[validate(length(min = 64), custom = "validate_jwt_secret")]
    pub jwt_secret: String,

    /// Expected JWT issuer
    #[serde(default = "default_auth_issuer")]
    pub auth_issuer: String,

    /// Expected JWT audience
    #[serde(default = "default_auth_audience")]
    pub auth_audience: String,

    /// Server host address
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    pub environment: String,

    /// Logging level
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

    /// Whole-request timeout (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Domain event channel capacity
    #[serde(default = "default_event_channel_capacity")]
    #[validate(custom = "validate_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Buffered tracking events per live subscriber channel
    #[serde(default = "default_feed_channel_capacity")]
    #[validate(custom = "validate_channel_capacity")]
    pub feed_channel_capacity: usize,

    /// Default page size for paginated API responses
    #[serde(default = "default_api_page_size")]
    pub api_default_page_size: u64,

    /// Maximum page size allowed for paginated API responses
    #[serde(default = "default_api_max_page_size")]
    pub api_max_page_size: u64,

    #[serde(default)]
    #[validate]
    pub pricing: PricingConfig,

    #[serde(default)]
    #[validate]
    pub quotes: QuoteConfig,

    #[serde(default)]
    #[validate]
    pub tracking: TrackingConfig,

    #[serde(default)]
    #[validate]
    pub lifecycle: LifecycleConfig,

    #[serde(default)]
    #[validate]
    pub remote: RemoteProcedureConfig,
}

impl AppConfig {
    /// Creates a new configuration with defaults for every optional section
    pub fn new(
        database_url: String,
        jwt_secret: String,
        host: String,
        port: u16,
        environment: String,
    ) -> Self {
        Self {
            database_url,
            jwt_secret,
            auth_issuer: default_auth_issuer(),
            auth_audience: default_auth_audience(),
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
            request_timeout_secs: default_request_timeout_secs(),
            event_channel_capacity: default_event_channel_capacity(),
            feed_channel_capacity: default_feed_channel_capacity(),
            api_default_page_size: default_api_page_size(),
            api_max_page_size: default_api_max_page_size(),
            pricing: PricingConfig::default(),
            quotes: QuoteConfig::default(),
            tracking: TrackingConfig::default(),
            lifecycle: LifecycleConfig::default(),
            remote: RemoteProcedureConfig::default(),
        }
    }

    /// Gets database URL reference
    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    /// Checks if running in production environment
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    /// Checks if running in development environment
    pub fn is_development(&self) -> bool {
        self.environment.eq_ignore_ascii_case("development")
    }

    /// Returns true if explicit CORS origins are configured
    pub fn has_cors_allowed_origins(&self) -> bool {
        self.cors_allowed_origins
            .as_ref()
            .map(|raw| raw.split(',').any(|origin| !origin.trim().is_empty()))
            .unwrap_or(false)
    }

    /// Whether we should fall back to permissive CORS
    pub fn should_allow_permissive_cors(&self) -> bool {
        self.is_development() || self.cors_allow_any_origin
    }

    /// True when either collaborator is served by the remote procedure host
    pub fn uses_remote_procedures(&self) -> bool {
        self.pricing.backend.eq_ignore_ascii_case("remote")
            || self.tracking.generator.eq_ignore_ascii_case("remote")
    }

    /// Clamps a requested page size to the configured bounds
    pub fn page_size(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.api_default_page_size)
            .clamp(1, self.api_max_page_size.max(1))
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

        if !self.is_development() && self.jwt_secret.trim() == DEV_DEFAULT_JWT_SECRET {
            let mut err = ValidationError::new("jwt_secret_default_dev");
            err.message = Some(
                "The bundled development JWT secret must not be used outside development. Set APP__JWT_SECRET to a unique, secure value."
                    .into(),
            );
            errors.add("jwt_secret", err);
        }

        let has_remote_url = self
            .remote
            .base_url
            .as_deref()
            .map(|url| !url.trim().is_empty())
            .unwrap_or(false);
        if self.uses_remote_procedures() && !has_remote_url {
            let mut err = ValidationError::new("remote_base_url_required");
            err.message = Some(
                "A remote pricing or tracking backend needs APP__REMOTE__BASE_URL".into(),
            );
            errors.add("remote", err);
        }

        if self.api_default_page_size > self.api_max_page_size {
            let mut err = ValidationError::new("api_default_page_size");
            err.message = Some("Default page size cannot exceed the maximum page size".into());
            errors.add("api_default_page_size", err);
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Gets log level reference
    pub fn log_level(&self) -> &str {
        &self.log_level
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("Configuration loading failed: {0}")]
    Load(#[from] ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
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

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_true_bool() -> bool {
    true
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_feed_channel_capacity() -> usize {
    64
}

fn default_api_page_size() -> u64 {
    20
}

fn default_api_max_page_size() -> u64 {
    100
}

fn default_auth_issuer() -> String {
    "cargolink-auth".to_string()
}

fn default_auth_audience() -> String {
    "authenticated".to_string()
}

fn default_pricing_backend() -> String {
    "rates".to_string()
}

fn default_tax_rate() -> f64 {
    0.08 // 8% default tax rate
}

fn default_insurance_rate() -> f64 {
    0.015
}

fn default_insurance_minimum() -> f64 {
    5.0
}

fn default_signature_surcharge() -> f64 {
    3.5
}

fn default_volumetric_divisor() -> f64 {
    5000.0
}

fn default_standard_rate() -> ServiceRateConfig {
    ServiceRateConfig::new(15.0, 2.5, 5)
}

fn default_express_rate() -> ServiceRateConfig {
    ServiceRateConfig::new(25.0, 4.0, 2)
}

fn default_overnight_rate() -> ServiceRateConfig {
    ServiceRateConfig::new(45.0, 6.0, 1)
}

fn default_international_rate() -> ServiceRateConfig {
    ServiceRateConfig::new(60.0, 8.0, 10)
}

fn default_quote_validity_days() -> i64 {
    7
}

fn default_tracking_prefix() -> String {
    DEFAULT_TRACKING_PREFIX.to_string()
}

fn default_tracking_generator() -> String {
    "local".to_string()
}

fn default_tracking_max_attempts() -> u32 {
    3
}

fn default_remote_timeout_secs() -> u64 {
    10
}

fn validate_backend(value: &str) -> Result<(), ValidationError> {
    match value.to_ascii_lowercase().as_str() {
        "rates" | "remote" => Ok(()),
        _ => {
            let mut err = ValidationError::new("backend");
            err.message = Some("Must be one of: rates, remote".into());
            Err(err)
        }
    }
}

fn validate_generator(value: &str) -> Result<(), ValidationError> {
    match value.to_ascii_lowercase().as_str() {
        "local" | "remote" => Ok(()),
        _ => {
            let mut err = ValidationError::new("generator");
            err.message = Some("Must be one of: local, remote".into());
            Err(err)
        }
    }
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

fn validate_jwt_secret(secret: &str) -> Result<(), ValidationError> {
    let trimmed = secret.trim();

    if trimmed.len() < 64 {
        let mut err = ValidationError::new("jwt_secret");
        err.message =
            Some("JWT secret must be at least 64 characters for adequate security".into());
        return Err(err);
    }

    const DISALLOWED: [&str; 3] = [
        "CHANGE_THIS_SECRET_IN_PRODUCTION",
        "your-secret-key",
        "default-secret-key",
    ];
    if DISALLOWED
        .iter()
        .any(|&bad| trimmed.eq_ignore_ascii_case(bad))
    {
        let mut err = ValidationError::new("jwt_secret");
        err.message = Some("JWT secret must be overridden with a secure random value".into());
        return Err(err);
    }

    if let Some(first) = trimmed.chars().next() {
        if trimmed.chars().all(|c| c == first) {
            let mut err = ValidationError::new("jwt_secret");
            err.message = Some("JWT secret cannot be a repeated character sequence".into());
            return Err(err);
        }
    }

    let unique_chars: std::collections::HashSet<char> = trimmed.chars().collect();
    if unique_chars.len() < 10 {
        let mut err = ValidationError::new("jwt_secret");
        err.message =
            Some("JWT secret must have at least 10 unique characters for adequate entropy".into());
        return Err(err);
    }

    Ok(())
}

fn validate_tax_rate(rate: f64) -> Result<(), ValidationError> {
    if !rate.is_finite() || rate < 0.0 || rate > 1.0 {
        let mut err = ValidationError::new("tax_rate");
        err.message = Some("tax_rate must be a finite value between 0.0 and 1.0".into());
        return Err(err);
    }
    Ok(())
}

fn validate_channel_capacity(capacity: usize) -> Result<(), ValidationError> {
    if capacity == 0 {
        let mut err = ValidationError::new("channel_capacity");
        err.message = Some("channel capacity must be greater than 0".into());
        return Err(err);
    }
    Ok(())
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("cargolink_api={},tower_http=debug", level);
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
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

    // jwt_secret has no default; it must come from a file or APP__JWT_SECRET.
    let config = Config::builder()
        .set_default("database_url", "sqlite://cargolink.db?mode=rwc")?
        .set_default("host", "0.0.0.0")?
        .set_default("port", DEFAULT_PORT as i64)?
        .set_default("environment", DEFAULT_ENV)?
        .set_default("log_level", DEFAULT_LOG_LEVEL)?
        .set_default("log_json", false)?
        .add_source(File::with_name(&format!("{}/default", CONFIG_DIR)).required(false))
        .add_source(File::with_name(&format!("{}/{}", CONFIG_DIR, run_env)).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?;

    if config.get_string("jwt_secret").is_err() {
        error!("JWT secret is not configured. Set APP__JWT_SECRET to the identity provider's signing secret (minimum 64 characters).");
        return Err(AppConfigError::Load(ConfigError::NotFound(
            "jwt_secret is required but not configured. Set APP__JWT_SECRET environment variable."
                .into(),
        )));
    }

    let app_config: AppConfig = config.try_deserialize()?;

    app_config.validate().map_err(|e| {
        error!("Configuration validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    app_config.validate_additional_constraints().map_err(|e| {
        error!("Configuration security validation failed: {:?}", e);
        AppConfigError::Validation(e)
    })?;

    info!("Configuration loaded successfully");
    Ok(app_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> AppConfig {
        AppConfig::new(
            "sqlite://cargolink.db?mode=memory".into(),
            "k3Jf9sQx2LmN8vBp4TzR7wYc1HdG6aEu0oIiPlMnKjHgFdSaQwErTyUiOpZxCvBnMq".into(),
            "127.0.0.1".into(),
            8080,
            "production".into(),
        )
    }

    #[test]
    fn defaults_pass_field_validation() {
        let cfg = base_config();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.quotes.validity_days, 7);
        assert_eq!(cfg.tracking.max_attempts, 3);
        assert!(cfg.lifecycle.enforce_transitions);
    }

    #[test]
    fn non_dev_requires_cors_origins() {
        let cfg = base_config();
        assert!(cfg.validate_additional_constraints().is_err());
    }

    #[test]
    fn non_dev_with_origins_passes() {
        let mut cfg = base_config();
        cfg.cors_allowed_origins = Some("https://cargolink.example".into());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn remote_backend_requires_base_url() {
        let mut cfg = base_config();
        cfg.environment = "development".into();
        cfg.pricing.backend = "remote".into();
        let errors = cfg.validate_additional_constraints().unwrap_err();
        assert!(errors.errors().contains_key("remote"));

        cfg.remote.base_url = Some("https://rpc.cargolink.example".into());
        assert!(cfg.validate_additional_constraints().is_ok());
    }

    #[test]
    fn unknown_backend_is_rejected() {
        let mut cfg = base_config();
        cfg.pricing.backend = "spreadsheet".into();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn tax_rate_out_of_range_is_rejected() {
        let mut cfg = base_config();
        cfg.pricing.tax_rate = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn weak_jwt_secret_is_rejected() {
        assert!(validate_jwt_secret(&"a".repeat(80)).is_err());
        assert!(validate_jwt_secret("short").is_err());
    }

    #[test]
    fn page_size_is_clamped() {
        let cfg = base_config();
        assert_eq!(cfg.page_size(None), 20);
        assert_eq!(cfg.page_size(Some(0)), 1);
        assert_eq!(cfg.page_size(Some(1_000)), 100);
    }
}
