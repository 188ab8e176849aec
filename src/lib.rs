//! Photobook - photo galleries behind cookie sessions
//!
//! The library exposes the identity chain (peppered password hashing,
//! HMAC-hashed remember tokens, per-request user resolution), the validated
//! services for users, galleries, OAuth credentials and images, their
//! storage backends, and the axum router that wires them together.

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod store;

pub use config::Config;
pub use error::Error;
pub use models::Services;
