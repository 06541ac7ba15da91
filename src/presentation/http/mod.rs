//! HTTP API
//!
//! Routes under `/api/v1` plus health and metrics endpoints.

pub mod handlers;
pub mod routes;

pub use routes::create_router;
