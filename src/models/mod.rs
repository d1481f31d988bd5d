//! Response models for the JSON endpoints

pub mod responses;

pub use responses::{HealthResponse, StatsResponse};
