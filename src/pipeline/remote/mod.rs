pub mod types;
pub mod client;

pub use types::*;
pub use client::*;

use thiserror::Error;

use crate::config::ConfigError;

/// Failures talking to the hosted vision/text model.
/// All of them are recoverable at the image level.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteServiceError {
    #[error("Remote service is not configured: {0}")]
    NotConfigured(#[from] ConfigError),

    #[error("Cannot reach remote service at {0}")]
    Connection(String),

    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    #[error("Remote service returned an error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}
