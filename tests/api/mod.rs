//! REST API endpoint tests

mod health_tests;
mod room_tests;
mod user_tests;
