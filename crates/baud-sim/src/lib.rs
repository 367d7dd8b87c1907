//! Serial Port Simulation Library
//!
//! This crate provides an enumeration source for exercising port scanning
//! and watching without physical hardware. It includes:
//!
//! - **VirtualPort**: Builds raw port descriptors for USB and native ports
//! - **ScriptedEnumerator**: Replays a scripted sequence of port lists and failures
//!
//! # Example
//!
//! ```rust
//! use baud_sim::{ScriptedEnumerator, VirtualPort};
//! use baud_detect::PortEnumerator;
//!
//! let enumerator = ScriptedEnumerator::new();
//! enumerator.push_ports(vec![VirtualPort::usb("/dev/ttyUSB0", 0x0403, 0x6001).build()]);
//! enumerator.push_ports(vec![]);
//!
//! assert_eq!(enumerator.list_detailed_ports().unwrap().len(), 1);
//! assert!(enumerator.list_detailed_ports().unwrap().is_empty());
//! ```

pub mod enumerator;
pub mod port;

pub use enumerator::{ScriptStep, ScriptedEnumerator};
pub use port::VirtualPort;
