//! HTTP API module
//!
//! Axum-based surface over the game engine: routing, handlers, DTOs,
//! error mapping, middleware and the server harness.

pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod monitoring;
pub mod routes;
pub mod server;

pub use server::ApiServer;
