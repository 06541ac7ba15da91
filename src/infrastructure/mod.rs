//! Infrastructure Layer
//!
//! Contains implementations of the domain storage traits:
//! - Database repositories (PostgreSQL)
//! - Room caches and Redis-backed counters
//! - Broker publishers (Redis pub/sub)
//! - In-memory backends for tests and local runs
//! - Prometheus metrics

pub mod broker;
pub mod cache;
pub mod database;
pub mod memory;
pub mod metrics;
pub mod repositories;
