//! Serial port scanner
//!
//! This module enumerates serial ports and enriches each one with a
//! resolved USB device name, producing a [`Snapshot`] of the ports visible
//! at one moment.

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serialport::{available_ports, SerialPortType};
use tracing::{debug, info};

use crate::error::DetectError;
use crate::usb_ids::{normalize_id, IdentityDatabase, UNRESOLVED};

/// A port as reported by the enumeration source, before name resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct RawPortDescriptor {
    /// Port name (e.g., /dev/ttyUSB0, COM3)
    pub name: String,
    /// Whether the port is backed by a USB device
    pub is_usb: bool,
    /// USB Vendor ID as hex (empty if not USB)
    pub vendor_id: String,
    /// USB Product ID as hex (empty if not USB)
    pub product_id: String,
    /// USB serial number (empty if unavailable)
    pub serial_number: String,
}

impl RawPortDescriptor {
    /// Create from serialport crate's port info
    fn from_serialport(name: String, port_type: &SerialPortType) -> Self {
        match port_type {
            SerialPortType::UsbPort(usb) => Self {
                name,
                is_usb: true,
                vendor_id: format!("{:04x}", usb.vid),
                product_id: format!("{:04x}", usb.pid),
                serial_number: usb.serial_number.clone().unwrap_or_default(),
            },
            _ => Self {
                name,
                ..Default::default()
            },
        }
    }
}

/// Source of raw port descriptors
///
/// Implementations must return in bounded time; the watch loop calls this
/// once per tick and does not guard against hangs.
pub trait PortEnumerator {
    /// List every serial port currently visible to the host
    fn list_detailed_ports(&self) -> Result<Vec<RawPortDescriptor>, DetectError>;
}

/// Enumerates the host's serial ports through the `serialport` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemEnumerator;

impl PortEnumerator for SystemEnumerator {
    fn list_detailed_ports(&self) -> Result<Vec<RawPortDescriptor>, DetectError> {
        let ports = available_ports().map_err(|e| DetectError::EnumerationFailed(e.to_string()))?;
        Ok(ports
            .into_iter()
            .map(|p| RawPortDescriptor::from_serialport(p.port_name, &p.port_type))
            .collect())
    }
}

/// A serial port at a point in time, with its resolved device name
///
/// Equality covers every field: a port that comes back under the same name
/// with a different serial number is a different record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PortRecord {
    /// Port name (e.g., /dev/ttyUSB0, COM3)
    pub name: String,
    /// Whether the port is backed by a USB device
    pub is_usb: bool,
    /// Normalized USB Vendor ID (empty if not USB)
    pub vendor_id: String,
    /// Normalized USB Product ID (empty if not USB)
    pub product_id: String,
    /// USB serial number (empty if unavailable)
    pub serial_number: String,
    /// Resolved device name, or [`UNRESOLVED`]
    pub product_name: String,
}

impl PortRecord {
    /// Enrich a raw descriptor with its resolved name
    pub fn resolve(raw: RawPortDescriptor, db: &IdentityDatabase) -> Self {
        let product_name = db.resolve(&raw.vendor_id, &raw.product_id);
        Self {
            name: raw.name,
            is_usb: raw.is_usb,
            vendor_id: normalize_id(&raw.vendor_id),
            product_id: normalize_id(&raw.product_id),
            serial_number: raw.serial_number,
            product_name,
        }
    }

    /// Whether the device name was found in the database
    pub fn is_resolved(&self) -> bool {
        self.product_name != UNRESOLVED
    }
}

/// The set of ports observed at one poll
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    ports: HashSet<PortRecord>,
}

impl Snapshot {
    /// An empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ports
    pub fn len(&self) -> usize {
        self.ports.len()
    }

    /// Whether no ports were observed
    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }

    /// Whether this exact record was observed
    pub fn contains(&self, record: &PortRecord) -> bool {
        self.ports.contains(record)
    }

    /// Iterate in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = &PortRecord> {
        self.ports.iter()
    }

    /// Records sorted by name, for stable display
    pub fn sorted(&self) -> Vec<&PortRecord> {
        let mut ports: Vec<_> = self.ports.iter().collect();
        ports.sort();
        ports
    }

    /// Only the USB-backed records
    pub fn usb_only(&self) -> Snapshot {
        self.ports.iter().filter(|p| p.is_usb).cloned().collect()
    }

    /// Records in `self` that are absent from `other`
    pub fn difference<'a>(&'a self, other: &'a Snapshot) -> impl Iterator<Item = &'a PortRecord> {
        self.ports.difference(&other.ports)
    }
}

impl FromIterator<PortRecord> for Snapshot {
    fn from_iter<I: IntoIterator<Item = PortRecord>>(iter: I) -> Self {
        Self {
            ports: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Snapshot {
    type Item = PortRecord;
    type IntoIter = std::collections::hash_set::IntoIter<PortRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.ports.into_iter()
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a PortRecord;
    type IntoIter = std::collections::hash_set::Iter<'a, PortRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.ports.iter()
    }
}

/// Result of a successful scan
///
/// "No ports" is a normal outcome and is distinct from a failed enumeration,
/// which is reported as an error instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortScan {
    /// Enumeration succeeded and found nothing
    NoPorts,
    /// Enumeration found at least one port
    Found(Snapshot),
}

impl PortScan {
    /// Collapse into a snapshot; `NoPorts` becomes an empty snapshot
    pub fn into_snapshot(self) -> Snapshot {
        match self {
            PortScan::NoPorts => Snapshot::new(),
            PortScan::Found(snapshot) => snapshot,
        }
    }
}

/// Serial port scanner configuration
#[derive(Debug, Clone, Default)]
pub struct ScannerConfig {
    /// Skip ports whose name contains any of these patterns
    pub skip_patterns: Vec<String>,
}

/// Serial port scanner
///
/// Combines an enumeration source with a shared, read-only
/// [`IdentityDatabase`].
pub struct PortScanner<E = SystemEnumerator> {
    enumerator: E,
    db: Arc<IdentityDatabase>,
    config: ScannerConfig,
}

impl PortScanner<SystemEnumerator> {
    /// Create a scanner over the host's ports using the bundled catalog
    pub fn new() -> Self {
        Self::with_enumerator(SystemEnumerator, IdentityDatabase::bundled())
    }
}

impl Default for PortScanner<SystemEnumerator> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: PortEnumerator> PortScanner<E> {
    /// Create a scanner with a custom enumeration source and database
    pub fn with_enumerator(enumerator: E, db: Arc<IdentityDatabase>) -> Self {
        Self {
            enumerator,
            db,
            config: ScannerConfig::default(),
        }
    }

    /// Replace the scanner configuration
    pub fn with_config(mut self, config: ScannerConfig) -> Self {
        self.config = config;
        self
    }

    /// The identity database used for name resolution
    pub fn database(&self) -> &IdentityDatabase {
        &self.db
    }

    /// Enumerate and resolve all visible ports
    pub fn scan(&self) -> Result<PortScan, DetectError> {
        let raw = self.enumerator.list_detailed_ports()?;

        let snapshot: Snapshot = raw
            .into_iter()
            .filter(|p| !self.should_skip_port(&p.name))
            .map(|p| PortRecord::resolve(p, &self.db))
            .collect();

        if snapshot.is_empty() {
            debug!("No serial ports found");
            return Ok(PortScan::NoPorts);
        }

        debug!("Found {} serial port(s)", snapshot.len());
        for port in snapshot.sorted() {
            debug!("  {} - {}", port.name, port.product_name);
        }

        Ok(PortScan::Found(snapshot))
    }

    /// Enumerate and resolve all visible ports as a snapshot
    pub fn snapshot(&self) -> Result<Snapshot, DetectError> {
        self.scan().map(PortScan::into_snapshot)
    }

    /// Names of all visible ports, sorted
    pub fn port_names(&self) -> Result<Vec<String>, DetectError> {
        info!("Enumerating serial ports...");
        let mut names: Vec<_> = self
            .enumerator
            .list_detailed_ports()?
            .into_iter()
            .map(|p| p.name)
            .filter(|name| !self.should_skip_port(name))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    /// Check if a port should be skipped
    fn should_skip_port(&self, name: &str) -> bool {
        self.config
            .skip_patterns
            .iter()
            .any(|pattern| name.contains(pattern.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serialport::UsbPortInfo;

    struct FixedEnumerator(Result<Vec<RawPortDescriptor>, String>);

    impl PortEnumerator for FixedEnumerator {
        fn list_detailed_ports(&self) -> Result<Vec<RawPortDescriptor>, DetectError> {
            self.0.clone().map_err(DetectError::EnumerationFailed)
        }
    }

    fn usb(name: &str, vid: &str, pid: &str, serial: &str) -> RawPortDescriptor {
        RawPortDescriptor {
            name: name.to_string(),
            is_usb: true,
            vendor_id: vid.to_string(),
            product_id: pid.to_string(),
            serial_number: serial.to_string(),
        }
    }

    fn native(name: &str) -> RawPortDescriptor {
        RawPortDescriptor {
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn test_db() -> Arc<IdentityDatabase> {
        Arc::new(IdentityDatabase::parse(
            "0403  FTDI\n\t6001  FT232R\n10c4  Silicon Labs\n",
        ))
    }

    #[test]
    fn test_raw_descriptor_from_usb() {
        let usb_info = SerialPortType::UsbPort(UsbPortInfo {
            vid: 0x0403,
            pid: 0x6001,
            serial_number: Some("12345".to_string()),
            manufacturer: Some("FTDI".to_string()),
            product: Some("FT232R".to_string()),
        });

        let info = RawPortDescriptor::from_serialport("/dev/ttyUSB0".to_string(), &usb_info);

        assert!(info.is_usb);
        assert_eq!(info.vendor_id, "0403");
        assert_eq!(info.product_id, "6001");
        assert_eq!(info.serial_number, "12345");
    }

    #[test]
    fn test_raw_descriptor_from_native() {
        let info = RawPortDescriptor::from_serialport("/dev/ttyS0".to_string(), &SerialPortType::Unknown);

        assert!(!info.is_usb);
        assert!(info.vendor_id.is_empty());
        assert!(info.serial_number.is_empty());
    }

    #[test]
    fn test_scan_resolves_names() {
        let scanner = PortScanner::with_enumerator(
            FixedEnumerator(Ok(vec![
                usb("/dev/ttyUSB0", "0403", "6001", "A1"),
                usb("/dev/ttyUSB1", "10C4", "EA60", ""),
                native("/dev/ttyS0"),
            ])),
            test_db(),
        );

        let snapshot = scanner.snapshot().unwrap();
        let names: Vec<_> = snapshot
            .sorted()
            .into_iter()
            .map(|p| (p.name.as_str(), p.product_name.as_str()))
            .collect();

        assert_eq!(
            names,
            vec![
                ("/dev/ttyS0", "-"),
                ("/dev/ttyUSB0", "FTDI FT232R"),
                ("/dev/ttyUSB1", "Silicon Labs"),
            ]
        );
    }

    #[test]
    fn test_scan_empty_is_not_an_error() {
        let scanner = PortScanner::with_enumerator(FixedEnumerator(Ok(vec![])), test_db());

        assert_eq!(scanner.scan().unwrap(), PortScan::NoPorts);
        assert!(scanner.snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_scan_failure_is_surfaced() {
        let scanner = PortScanner::with_enumerator(
            FixedEnumerator(Err("permission denied".to_string())),
            test_db(),
        );

        let err = scanner.scan().unwrap_err();
        assert!(matches!(err, DetectError::EnumerationFailed(ref msg) if msg == "permission denied"));
    }

    #[test]
    fn test_duplicate_records_collapse() {
        let scanner = PortScanner::with_enumerator(
            FixedEnumerator(Ok(vec![
                usb("/dev/ttyUSB0", "0403", "6001", "A1"),
                usb("/dev/ttyUSB0", "0403", "6001", "A1"),
            ])),
            test_db(),
        );

        assert_eq!(scanner.snapshot().unwrap().len(), 1);
    }

    #[test]
    fn test_skip_patterns() {
        let scanner = PortScanner::with_enumerator(
            FixedEnumerator(Ok(vec![
                usb("/dev/ttyUSB0", "0403", "6001", "A1"),
                native("/dev/cu.Bluetooth-Incoming-Port"),
            ])),
            test_db(),
        )
        .with_config(ScannerConfig {
            skip_patterns: vec!["Bluetooth".to_string()],
        });

        let snapshot = scanner.snapshot().unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(
            scanner.port_names().unwrap(),
            vec!["/dev/ttyUSB0".to_string()]
        );
    }

    #[test]
    fn test_record_equality_covers_serial() {
        let db = test_db();
        let a = PortRecord::resolve(usb("/dev/ttyUSB0", "0403", "6001", "111"), &db);
        let b = PortRecord::resolve(usb("/dev/ttyUSB0", "0403", "6001", "222"), &db);

        assert_ne!(a, b);
        assert!(a.is_resolved());
    }

    #[test]
    fn test_usb_only_filter() {
        let db = test_db();
        let snapshot: Snapshot = vec![
            PortRecord::resolve(usb("/dev/ttyUSB0", "0403", "6001", ""), &db),
            PortRecord::resolve(native("/dev/ttyS0"), &db),
        ]
        .into_iter()
        .collect();

        let usb_ports = snapshot.usb_only();
        assert_eq!(usb_ports.len(), 1);
        assert!(usb_ports.iter().all(|p| p.is_usb));
    }

    #[test]
    fn test_record_serializes_to_json() {
        let record = PortRecord::resolve(usb("/dev/ttyUSB0", "0403", "6001", "A1"), &test_db());
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(json["name"], "/dev/ttyUSB0");
        assert_eq!(json["product_name"], "FTDI FT232R");
    }
}
