//! Error types for the biometric boundary.

use serde::{Deserialize, Serialize};

/// Result type alias for biometric operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while talking to the platform biometric service.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type", content = "message")]
pub enum Error {
    /// Biometric hardware is missing or unusable on this device.
    #[error("Biometric authentication not available: {0}")]
    NotAvailable(String),

    /// Platform-specific internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}
