//! Error types for port detection

use thiserror::Error;

/// Errors that can occur during detection
#[derive(Debug, Error)]
pub enum DetectError {
    /// Failed to enumerate serial ports
    #[error("failed to enumerate ports: {0}")]
    EnumerationFailed(String),

    /// Failed to read a USB ID catalog
    #[error("failed to read USB ID catalog: {0}")]
    Catalog(#[from] std::io::Error),
}
