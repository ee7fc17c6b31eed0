// Declare all modules
pub mod admin;
pub mod auth;
pub mod cascade;
pub mod config;
pub mod content;
pub mod courses;
pub mod error;
pub mod ownership;
pub mod platform;
pub mod store;
pub mod users;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

// No re-exports here as they're handled in lib.rs
