//! Error types for port watching

use baud_detect::DetectError;
use thiserror::Error;

/// Errors that end a watch session
#[derive(Debug, Error)]
pub enum WatchError {
    /// The initial enumeration failed, so there is nothing to compare against
    #[error("failed to get initial serial port list: {0}")]
    SeedFailed(#[source] DetectError),

    /// Enumeration failed partway through a session
    #[error("serial port enumeration failed during watch: {0}")]
    Enumeration(#[source] DetectError),

    /// The watcher has already run
    #[error("watch session already started")]
    AlreadyStarted,
}

impl WatchError {
    /// Check if this error came from the enumeration source
    pub fn is_enumeration(&self) -> bool {
        matches!(self, WatchError::SeedFailed(_) | WatchError::Enumeration(_))
    }
}
