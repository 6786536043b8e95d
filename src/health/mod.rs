/*!
 * # Health Check Module
 *
 * - `/health` - cached up/down status
 * - `/health/ready` - re-checks the database before answering
 * - `/health/live` - process liveness and uptime
 * - `/health/details` - per-component status
 * - `/health/version` - build information
 */

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::RwLock;
use tracing::{debug, error, warn};

use crate::events::TrackingFeed;

const CHECK_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Up,
    Down,
    Degraded,
}

impl HealthStatus {
    fn status_code(self) -> StatusCode {
        match self {
            HealthStatus::Up | HealthStatus::Degraded => StatusCode::OK,
            HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthDetail {
    pub status: HealthStatus,
    pub message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct HealthInfo {
    pub status: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub details: HashMap<String, HealthDetail>,
}

#[derive(Clone)]
pub struct HealthState {
    db_pool: Arc<DatabaseConnection>,
    feed: Arc<TrackingFeed>,
    pricing_backend: &'static str,
    cache: Arc<RwLock<HealthInfo>>,
    start_time: SystemTime,
}

impl HealthState {
    pub fn new(
        db_pool: Arc<DatabaseConnection>,
        feed: Arc<TrackingFeed>,
        pricing_backend: &'static str,
    ) -> Self {
        Self {
            db_pool,
            feed,
            pricing_backend,
            cache: Arc::new(RwLock::new(HealthInfo {
                status: HealthStatus::Up,
                version: env!("CARGO_PKG_VERSION").to_string(),
                timestamp: Utc::now(),
                uptime_seconds: 0,
                details: HashMap::new(),
            })),
            start_time: SystemTime::now(),
        }
    }

    pub fn pricing_backend(&self) -> &'static str {
        self.pricing_backend
    }

    pub fn uptime(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.start_time)
            .unwrap_or(Duration::from_secs(0))
            .as_secs()
    }

    /// Re-runs every component check and refreshes the cache
    pub async fn refresh(&self) {
        let now = Utc::now();
        let database = match self.db_pool.ping().await {
            Ok(()) => HealthDetail {
                status: HealthStatus::Up,
                message: None,
                timestamp: now,
            },
            Err(e) => {
                error!("Database health check failed: {}", e);
                HealthDetail {
                    status: HealthStatus::Down,
                    message: Some("database unreachable".to_string()),
                    timestamp: now,
                }
            }
        };

        let tracking_feed = HealthDetail {
            status: HealthStatus::Up,
            message: Some(format!("{} live channels", self.feed.active_channels())),
            timestamp: now,
        };

        let pricing = HealthDetail {
            status: HealthStatus::Up,
            message: Some(format!("backend: {}", self.pricing_backend)),
            timestamp: now,
        };

        let mut health = self.cache.write().await;
        health.timestamp = now;
        health.uptime_seconds = self.uptime();
        health.details.insert("database".to_string(), database);
        health.details.insert("tracking_feed".to_string(), tracking_feed);
        health.details.insert("pricing".to_string(), pricing);
        health.status = overall_status(health.details.values().map(|d| d.status));
    }

    async fn snapshot(&self) -> HealthInfo {
        self.cache.read().await.clone()
    }
}

/// Down if anything is down, degraded if anything is degraded
pub fn overall_status(statuses: impl IntoIterator<Item = HealthStatus>) -> HealthStatus {
    statuses
        .into_iter()
        .fold(HealthStatus::Up, |acc, status| match (acc, status) {
            (HealthStatus::Down, _) | (_, HealthStatus::Down) => HealthStatus::Down,
            (HealthStatus::Degraded, _) | (_, HealthStatus::Degraded) => HealthStatus::Degraded,
            _ => HealthStatus::Up,
        })
}

pub async fn version_info() -> impl IntoResponse {
    Json(json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "commit": option_env!("GIT_HASH").unwrap_or("unknown"),
    }))
}

pub async fn health_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let health = state.snapshot().await;
    (
        health.status.status_code(),
        Json(json!({
            "status": health.status,
            "version": health.version,
            "timestamp": health.timestamp,
        })),
    )
}

pub async fn readiness_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    state.refresh().await;
    let health = state.snapshot().await;
    (
        health.status.status_code(),
        Json(json!({
            "ready": health.status == HealthStatus::Up,
            "timestamp": health.timestamp,
        })),
    )
}

pub async fn liveness_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "alive": true,
            "uptime_seconds": state.uptime(),
            "timestamp": Utc::now(),
        })),
    )
}

pub async fn detailed_health(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    state.refresh().await;
    let health = state.snapshot().await;
    (health.status.status_code(), Json(health))
}

/// Periodic background refresh of the cached status
pub async fn run_health_checker(state: Arc<HealthState>) {
    debug!("Starting periodic health checker");
    let mut interval = tokio::time::interval(CHECK_INTERVAL);

    loop {
        interval.tick().await;
        state.refresh().await;

        let health = state.snapshot().await;
        if health.status != HealthStatus::Up {
            for (name, detail) in &health.details {
                if detail.status != HealthStatus::Up {
                    warn!("Component {name} is not healthy: {:?}", detail.status);
                }
            }
        }
    }
}

/// Health routes; the caller decides whether to spawn [`run_health_checker`]
pub fn health_routes(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/live", get(liveness_check))
        .route("/details", get(detailed_health))
        .route("/version", get(version_info))
        .with_state(state)
}
