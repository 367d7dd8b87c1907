//! Serial Port Detection Library
//!
//! This crate provides serial port enumeration and USB vendor/product name
//! resolution from a `usb.ids` catalog.
//!
//! # Example
//!
//! ```rust,no_run
//! use baud_detect::PortScanner;
//!
//! let scanner = PortScanner::new();
//! let snapshot = scanner.snapshot().unwrap();
//!
//! for port in snapshot.sorted() {
//!     println!("Found port: {} ({})", port.name, port.product_name);
//! }
//! ```

pub mod error;
pub mod scanner;
pub mod usb_ids;

pub use error::DetectError;
pub use scanner::{
    PortEnumerator, PortRecord, PortScan, PortScanner, RawPortDescriptor, ScannerConfig,
    Snapshot, SystemEnumerator,
};
pub use usb_ids::{IdentityDatabase, UNRESOLVED};
