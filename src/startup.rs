//! Application Startup
//!
//! Backend selection, state construction and server initialization.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use redis::aio::ConnectionManager;
use sqlx::PgPool;
use tokio::net::TcpListener;

use crate::application::services::{RoomBackends, RoomDirectory, UserDirectory};
use crate::config::{SequenceBackend, Settings, StorageBackend};
use crate::domain::{MessagePublisher, SequenceAllocator};
use crate::infrastructure::broker::{NoopPublisher, RedisPublisher};
use crate::infrastructure::cache::{self, RedisSequenceAllocator};
use crate::infrastructure::database;
use crate::infrastructure::memory::InMemoryDocumentStore;
use crate::infrastructure::repositories::{
    PgMessageStore, PgRoomRepository, PgSequenceAllocator, PgUserRepository,
};
use crate::presentation::http::{handlers, routes};
use crate::presentation::middleware::{cors, logging};
use crate::shared::retry::StorePolicy;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<RoomDirectory>,
    pub users: UserDirectory,
    pub db: Option<PgPool>,
    pub redis: Option<ConnectionManager>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// State over a single in-memory document store, without Redis.
    pub fn in_memory(settings: Settings, store: Arc<InMemoryDocumentStore>) -> Self {
        let policy = StorePolicy::from_settings(&settings.store);
        let backends = RoomBackends::new(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(NoopPublisher),
        )
        .with_policy(policy.clone())
        .with_cache_capacity(settings.room.cache_capacity);

        Self::assemble(settings, backends, UserDirectory::new(store, policy), None, None)
    }

    /// Connect the configured backends.
    pub async fn connect(settings: Settings) -> Result<Self> {
        let redis = if settings.redis.enabled {
            Some(
                cache::create_redis_client(&settings.redis)
                    .await
                    .context("connecting to Redis")?,
            )
        } else {
            None
        };

        let publisher: Arc<dyn MessagePublisher> = match &redis {
            Some(conn) => Arc::new(RedisPublisher::new(conn.clone())),
            None => Arc::new(NoopPublisher),
        };

        let redis_allocator: Option<Arc<dyn SequenceAllocator>> =
            match (settings.storage.sequence, &redis) {
                (SequenceBackend::Redis, Some(conn)) => {
                    Some(Arc::new(RedisSequenceAllocator::new(conn.clone())))
                }
                (SequenceBackend::Redis, None) => {
                    anyhow::bail!("storage.sequence = \"redis\" requires redis.enabled")
                }
                (SequenceBackend::Postgres, _) => None,
            };

        let policy = StorePolicy::from_settings(&settings.store);

        match settings.storage.backend {
            StorageBackend::Postgres => {
                let pool = database::create_pool(&settings.database)
                    .await
                    .context("creating database pool")?;
                tracing::info!("Database connection pool created");
                database::run_migrations(&pool)
                    .await
                    .context("running migrations")?;
                tracing::info!("Database migrations applied");

                let allocator = redis_allocator
                    .unwrap_or_else(|| Arc::new(PgSequenceAllocator::new(pool.clone())) as Arc<dyn SequenceAllocator>);
                let backends = RoomBackends::new(
                    allocator,
                    Arc::new(PgMessageStore::new(pool.clone())),
                    Arc::new(PgRoomRepository::new(pool.clone())),
                    publisher,
                )
                .with_policy(policy.clone())
                .with_cache_capacity(settings.room.cache_capacity);
                let users = UserDirectory::new(Arc::new(PgUserRepository::new(pool.clone())), policy);

                Ok(Self::assemble(settings, backends, users, Some(pool), redis))
            }
            StorageBackend::Memory => {
                tracing::warn!("Using in-memory storage; data is lost on restart");
                let store = Arc::new(InMemoryDocumentStore::new());
                let allocator = redis_allocator.unwrap_or_else(|| store.clone() as Arc<dyn SequenceAllocator>);
                let backends = RoomBackends::new(allocator, store.clone(), store.clone(), publisher)
                    .with_policy(policy.clone())
                    .with_cache_capacity(settings.room.cache_capacity);
                let users = UserDirectory::new(store, policy);

                Ok(Self::assemble(settings, backends, users, None, redis))
            }
        }
    }

    fn assemble(
        settings: Settings,
        backends: RoomBackends,
        users: UserDirectory,
        db: Option<PgPool>,
        redis: Option<ConnectionManager>,
    ) -> Self {
        let directory = RoomDirectory::new(backends)
            .with_default_room(&settings.room.default_room, &settings.room.default_owner);

        Self {
            directory: Arc::new(directory),
            users,
            db,
            redis,
            settings: Arc::new(settings),
        }
    }

    /// Restore durable rooms and make sure the default room exists.
    pub async fn prepare_rooms(&self) -> Result<()> {
        self.directory
            .load_all()
            .await
            .context("restoring rooms")?;
        if self
            .directory
            .ensure_default_rooms()
            .await
            .context("creating default room")?
        {
            tracing::info!(room = %self.settings.room.default_room, "Default room created");
        }
        Ok(())
    }
}

/// Build the router with its middleware stack.
pub fn build_router(state: AppState) -> Router {
    let cors = cors::create_cors_layer(&state.settings.cors);
    routes::create_router(state)
        .layer(logging::create_trace_layer())
        .layer(cors)
}

/// Application instance
pub struct Application {
    listener: TcpListener,
    router: Router,
}

impl Application {
    /// Build the application from settings
    pub async fn build(settings: Settings) -> Result<Self> {
        handlers::health::init_server_start();

        let addr = settings.server_addr();
        let state = AppState::connect(settings).await?;
        state.prepare_rooms().await?;

        let router = build_router(state);

        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("binding {}", addr))?;
        tracing::info!("Listening on {}", addr);

        Ok(Self { listener, router })
    }

    /// Run the server until stopped
    pub async fn run_until_stopped(self) -> Result<()> {
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }

    /// Get the bound address
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
