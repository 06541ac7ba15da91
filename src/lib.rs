//! # Room Log
//!
//! A multi-room chat service built around a durable, per-room message log:
//! - Gap-free-by-intent sequence numbers per room (PostgreSQL or Redis counter)
//! - Append-only message storage (PostgreSQL or an in-memory document store)
//! - A bounded in-memory window of the newest messages of every room
//! - RESTful HTTP API over rooms, aliases and messages
//!
//! ## Architecture
//!
//! - **Domain Layer**: messages, rooms, aliases and the storage traits
//! - **Application Layer**: `ChatRoom`, `RoomDirectory`, DTOs
//! - **Infrastructure Layer**: PostgreSQL, Redis and in-memory backends
//! - **Presentation Layer**: HTTP handlers
//!
//! ## Module Structure
//!
//! ```text
//! room_log/
//! +-- config/         Configuration management
//! +-- domain/         Entities and storage traits
//! +-- application/    Rooms, directories and DTOs
//! +-- infrastructure/ Database, cache, broker and in-memory backends
//! +-- presentation/   HTTP routes and middleware
//! +-- shared/         Errors, retry policy, validation
//! ```

// Configuration module
pub mod config;

// Domain layer
pub mod domain;

// Application layer
pub mod application;

// Infrastructure layer - External implementations
pub mod infrastructure;

// Presentation layer - HTTP handlers
pub mod presentation;

// Shared utilities
pub mod shared;

// Application startup and state management
pub mod startup;

// Telemetry and observability
pub mod telemetry;
