// Library entry point for wishlist-server
// Exposes modules for testing

pub mod achievements;
pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod models;
pub mod policies;
pub mod store;
