//! Repository Implementations
//!
//! PostgreSQL implementations of domain repository traits.
//!
//! ## Available Repositories
//!
//! - **PgMessageStore** - Append-only per-room message log
//! - **PgSequenceAllocator** - Per-room sequence counters (upsert increment)
//! - **PgRoomRepository** - Room metadata with member arrays
//! - **PgUserRepository** - Alias registration
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use sqlx::PgPool;
//! use room_log::infrastructure::repositories::{PgMessageStore, PgSequenceAllocator};
//!
//! async fn setup(pool: PgPool) {
//!     let store = PgMessageStore::new(pool.clone());
//!     let allocator = PgSequenceAllocator::new(pool);
//! }
//! ```

pub mod message_repository;
pub mod room_repository;
pub mod sequence_repository;
pub mod user_repository;

pub use message_repository::PgMessageStore;
pub use room_repository::PgRoomRepository;
pub use sequence_repository::PgSequenceAllocator;
pub use user_repository::PgUserRepository;
