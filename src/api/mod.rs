//! API Module
//!
//! HTTP handlers and routing. The service underneath is transport-agnostic;
//! this layer only maps requests onto it and errors onto status codes.
//!
//! # Endpoints
//! - `GET /torrent/*path` - Generate (or serve a cached) `.torrent`
//! - `GET /stats` - Get cache statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
