//! Room log behavior against the in-memory backends

mod chat_room_tests;
mod concurrency_tests;
mod directory_tests;
