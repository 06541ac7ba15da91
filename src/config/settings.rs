//! Application settings and configuration structures.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Root configuration structure containing all application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Server configuration (host, port)
    pub server: ServerSettings,

    /// Database configuration (PostgreSQL)
    pub database: DatabaseSettings,

    /// Redis configuration
    pub redis: RedisSettings,

    /// Which backends hold messages, metadata and counters
    pub storage: StorageSettings,

    /// Room defaults
    pub room: RoomSettings,

    /// Store call deadline and retry policy
    pub store: StoreSettings,

    /// CORS configuration
    pub cors: CorsSettings,

    /// Current environment (development, staging, production)
    pub environment: String,
}

/// Server binding configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// Host address to bind to (e.g., "0.0.0.0")
    pub host: String,

    /// Port number to listen on
    pub port: u16,
}

/// PostgreSQL database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// Database connection URL
    #[serde(default)]
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections to maintain
    pub min_connections: u32,

    /// Connection acquire timeout in seconds
    pub acquire_timeout: u64,
}

/// Redis configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RedisSettings {
    /// Redis connection URL
    pub url: String,

    /// Connect to Redis at all (publisher and optional sequence counter)
    pub enabled: bool,
}

/// Storage backend for messages, rooms and users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Postgres,
    Memory,
}

/// Backend holding the per-room sequence counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceBackend {
    /// Same backend as the message store
    Postgres,
    /// Redis `INCR`
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    pub backend: StorageBackend,
    pub sequence: SequenceBackend,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoomSettings {
    /// Entries kept in each room's in-memory window
    pub cache_capacity: usize,

    /// Public room created at startup when missing
    pub default_room: String,

    /// Owner alias of the default room
    pub default_owner: String,
}

/// Deadline and retry policy for every storage call.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    pub timeout_ms: u64,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CorsSettings {
    /// List of allowed origins
    pub allowed_origins: Vec<String>,
}

impl Settings {
    /// Load configuration from files and environment variables.
    ///
    /// The loading order is:
    /// 1. Built-in defaults
    /// 2. config/default.toml (base configuration)
    /// 3. config/{RUN_ENV}.toml (environment-specific overrides)
    /// 4. Environment variables (highest priority)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if configuration cannot be loaded or parsed,
    /// or if the loaded values are inconsistent (see [`Settings::validate`]).
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".into());

        let settings: Self = Self::defaults(&environment)?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // APP__STORE__TIMEOUT_MS=2000 -> store.timeout_ms = 2000
            .add_source(
                Environment::default()
                    .prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("server.host", std::env::var("SERVER_HOST").ok())?
            .set_override_option("server.port", std::env::var("SERVER_PORT").ok())?
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .set_override_option("redis.url", std::env::var("REDIS_URL").ok())?
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Settings for tests and local runs: in-memory storage, no Redis.
    pub fn in_memory() -> Result<Self, ConfigError> {
        let settings: Self = Self::defaults("test")?
            .set_override("storage.backend", "memory")?
            .set_override("redis.enabled", false)?
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    fn defaults(
        environment: &str,
    ) -> Result<config::builder::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("environment", environment)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("database.url", "")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout", 30)?
            .set_default("redis.url", "redis://127.0.0.1:6379")?
            .set_default("redis.enabled", false)?
            .set_default("storage.backend", "postgres")?
            .set_default("storage.sequence", "postgres")?
            .set_default("room.cache_capacity", 256)?
            .set_default("room.default_room", "general")?
            .set_default("room.default_owner", "admin")?
            .set_default("store.timeout_ms", 5000)?
            .set_default("store.max_attempts", 3)?
            .set_default("store.initial_backoff_ms", 50)?
            .set_default("store.max_backoff_ms", 2000)?
            .set_default("cors.allowed_origins", vec!["http://localhost:3000"])
    }

    /// Reject combinations the service cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.room.cache_capacity == 0 {
            return Err(ConfigError::Message(
                "room.cache_capacity must be at least 1".into(),
            ));
        }
        if self.store.max_attempts == 0 {
            return Err(ConfigError::Message(
                "store.max_attempts must be at least 1".into(),
            ));
        }
        if self.storage.backend == StorageBackend::Postgres && self.database.url.is_empty() {
            return Err(ConfigError::Message(
                "database.url (or DATABASE_URL) is required for the postgres backend".into(),
            ));
        }
        if self.storage.sequence == SequenceBackend::Redis && !self.redis.enabled {
            return Err(ConfigError::Message(
                "storage.sequence = \"redis\" requires redis.enabled".into(),
            ));
        }
        Ok(())
    }

    /// Get the full server address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl DatabaseSettings {
    /// Get the connection URL.
    pub fn connection_url(&self) -> &str {
        &self.url
    }
}
