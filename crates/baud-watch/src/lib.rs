//! Serial Port Watch Library
//!
//! This crate monitors the set of serial ports over time and reports ports
//! appearing and disappearing. It provides:
//!
//! - **diff**: value-based comparison of two port snapshots
//! - **watcher**: the polling loop with expiry and cooperative cancellation
//! - **events**: the ordered event stream a session emits
//!
//! # Example
//!
//! ```rust,ignore
//! use baud_detect::PortScanner;
//! use baud_watch::{cancellation, PortWatcher, WatchConfig, WatchEvent};
//! use tokio::sync::mpsc;
//!
//! let (event_tx, mut event_rx) = mpsc::channel(256);
//! let (cancel_handle, cancel_token) = cancellation();
//!
//! let mut watcher = PortWatcher::new(PortScanner::new(), WatchConfig::from_secs(30));
//! let session = watcher.run(event_tx, cancel_token);
//!
//! // Receive events while the session runs; call cancel_handle.cancel() to stop early
//! ```

pub mod diff;
pub mod error;
pub mod events;
pub mod watcher;

pub use diff::{diff, PresenceDiff};
pub use error::WatchError;
pub use events::{TransitionEvent, TransitionKind, WatchEvent};
pub use watcher::{
    cancellation, CancelHandle, CancelToken, PortWatcher, WatchConfig, WatchOutcome, WatchState,
    DEFAULT_POLL_INTERVAL,
};
