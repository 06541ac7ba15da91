//! Database Module
//!
//! PostgreSQL pool, schema migrations and a round-trip probe.

use std::time::{Duration, Instant};

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, instrument};

use crate::config::DatabaseSettings;

/// Create the pool for the room log tables.
#[instrument(skip(settings), fields(max = settings.max_connections))]
pub async fn create_pool(settings: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout))
        .connect(settings.connection_url())
        .await?;
    info!("PostgreSQL pool ready");
    Ok(pool)
}

/// Apply `migrations/` (messages, room_sequences, rooms, users).
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

/// Round-trip a trivial query; returns the latency.
pub async fn ping(pool: &PgPool) -> Result<Duration, sqlx::Error> {
    let start = Instant::now();
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(start.elapsed())
}
