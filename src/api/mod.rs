//! HTTP surface over the services

pub mod routes;
pub mod server;

pub use server::*;
