//! Error types for torrent generation
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::bencode::BencodeError;
use crate::torrent::TorrentError;

// == Error Enum ==
/// Unified error type for a torrent request.
///
/// Every variant is terminal for the request that raised it; nothing here is
/// retried and no variant leaves a partial entry in the cache.
#[derive(Error, Debug)]
pub enum Error {
    /// Input bytes violate the BEncode grammar
    #[error("malformed encoding: {0}")]
    Malformed(#[from] BencodeError),

    /// Requested path escapes the served root
    #[error("forbidden path: {0}")]
    Security(String),

    /// No file matched the request
    #[error("not found: {0}")]
    NotFound(String),

    /// Torrent could not be built
    #[error("build failed: {0}")]
    Build(#[from] TorrentError),

    /// Filesystem error outside the builder
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Metadata store refused the record
    #[error("metadata store error: {0}")]
    Registry(String),

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::Security(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Malformed(_)
            | Error::Build(_)
            | Error::Io(_)
            | Error::Registry(_)
            | Error::Config(_)
            | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the crate.
pub type Result<T> = std::result::Result<T, Error>;
