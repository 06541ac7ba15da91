//! Health Check Handlers
//!
//! # Endpoints
//! - `GET /health` - process is up
//! - `GET /health/live` - liveness probe
//! - `GET /health/ready` - readiness: backend round trips plus room log status

use std::time::{Duration, Instant};

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::Serialize;

use crate::infrastructure::database;
use crate::startup::AppState;

static SERVER_START: Lazy<Instant> = Lazy::new(Instant::now);
static SERVER_START_TIME: Lazy<DateTime<Utc>> = Lazy::new(Utc::now);

/// Pin the uptime origin. Called once during startup.
pub fn init_server_start() {
    Lazy::force(&SERVER_START);
    Lazy::force(&SERVER_START_TIME);
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// One backend's probe result. `required` backends make the service
/// unready when they fail; optional ones only degrade it.
#[derive(Debug, Serialize)]
pub struct BackendHealth {
    pub status: HealthStatus,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl BackendHealth {
    fn not_configured() -> Self {
        Self {
            status: HealthStatus::Healthy,
            required: false,
            latency_ms: None,
            message: Some("not configured".into()),
        }
    }

    fn probed(required: bool, result: Result<Duration, String>, slow: Duration) -> Self {
        match result {
            Ok(latency) => Self {
                status: if latency < slow {
                    HealthStatus::Healthy
                } else {
                    HealthStatus::Degraded
                },
                required,
                latency_ms: Some(latency.as_millis() as u64),
                message: None,
            },
            Err(message) => Self {
                status: HealthStatus::Unhealthy,
                required,
                latency_ms: None,
                message: Some(message),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RoomsHealth {
    pub loaded: usize,
    pub active: usize,
    /// Sequence numbers consumed without a confirmed message, all rooms
    pub sequence_gaps: usize,
}

#[derive(Debug, Serialize)]
pub struct HealthChecks {
    pub database: BackendHealth,
    pub redis: BackendHealth,
    pub rooms: RoomsHealth,
}

#[derive(Debug, Serialize)]
pub struct ReadinessResponse {
    pub status: HealthStatus,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub started_at: String,
    pub checks: HealthChecks,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

pub async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse { status: "alive" })
}

/// 200 while every required backend answers, 503 otherwise.
pub async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    let database = match &state.db {
        Some(pool) => BackendHealth::probed(
            true,
            database::ping(pool)
                .await
                .map_err(|e| format!("Database connection failed: {}", e)),
            Duration::from_millis(100),
        ),
        None => BackendHealth::not_configured(),
    };

    let redis = match &state.redis {
        Some(conn) => {
            let required = state.settings.storage.sequence == crate::config::SequenceBackend::Redis;
            BackendHealth::probed(
                required,
                ping_redis(conn.clone())
                    .await
                    .map_err(|e| format!("Redis connection failed: {}", e)),
                Duration::from_millis(50),
            )
        }
        None => BackendHealth::not_configured(),
    };

    let rooms = room_status(&state);
    let status = overall_status(&[&database, &redis]);

    let response = ReadinessResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: SERVER_START.elapsed().as_secs(),
        started_at: SERVER_START_TIME.to_rfc3339(),
        checks: HealthChecks {
            database,
            redis,
            rooms,
        },
    };

    let code = match status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (code, Json(response))
}

async fn ping_redis(mut conn: redis::aio::ConnectionManager) -> Result<Duration, redis::RedisError> {
    let start = Instant::now();
    redis::cmd("PING").query_async::<String>(&mut conn).await?;
    Ok(start.elapsed())
}

fn room_status(state: &AppState) -> RoomsHealth {
    let rooms = state.directory.list();
    RoomsHealth {
        loaded: rooms.len(),
        active: rooms
            .iter()
            .filter(|r| r.state() == crate::application::services::RoomState::Active)
            .count(),
        sequence_gaps: rooms.iter().map(|r| r.failed_sequences().len()).sum(),
    }
}

fn overall_status(backends: &[&BackendHealth]) -> HealthStatus {
    let mut overall = HealthStatus::Healthy;
    for backend in backends {
        match backend.status {
            HealthStatus::Unhealthy if backend.required => return HealthStatus::Unhealthy,
            HealthStatus::Unhealthy | HealthStatus::Degraded => overall = HealthStatus::Degraded,
            HealthStatus::Healthy => {}
        }
    }
    overall
}
