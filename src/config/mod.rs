//! # Configuration Module
//!
//! This module handles application configuration loading and management.
//! Configuration can be loaded from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{environment}.toml)
//! - .env files (via dotenvy)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use room_log::config::Settings;
//!
//! let settings = Settings::load()?;
//! println!("Rooms keep {} entries in memory", settings.room.cache_capacity);
//! ```

mod settings;

pub use settings::*;
