//! USB Vendor/Product ID database
//!
//! This module parses catalogs in the `usb.ids` format published by the
//! USB ID repository and resolves vendor/product ID pairs to display names.
//!
//! The format expresses its hierarchy through leading tabs:
//!
//! ```text
//! 0403  Future Technology Devices International, Ltd
//! <TAB>6001  FT232 Serial (UART) IC
//! <TAB><TAB>00  interface-level entry (ignored)
//! ```
//!
//! The full USB ID repository ships with the crate through `usb-ids` and is
//! loaded into a database once, on first use.
//! A database never changes after it has been built, so a single instance can
//! be shared between any number of scanners.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::error::DetectError;

/// Display string for ports whose vendor cannot be resolved
pub const UNRESOLVED: &str = "-";

/// Read buffer capacity; the upstream catalog contains some very long lines
const CATALOG_LINE_CAPACITY: usize = 1024 * 1024;

/// Normalize a vendor or product ID for lookup
///
/// Trims whitespace, strips an optional `0x` prefix and lower-cases the rest.
///
/// ```
/// use baud_detect::usb_ids::normalize_id;
///
/// assert_eq!(normalize_id("0x10C4"), "10c4");
/// assert_eq!(normalize_id("EA60"), "ea60");
/// assert_eq!(normalize_id(""), "");
/// ```
pub fn normalize_id(id: &str) -> String {
    let id = id.trim();
    let id = id
        .strip_prefix("0x")
        .or_else(|| id.strip_prefix("0X"))
        .unwrap_or(id);
    id.to_ascii_lowercase()
}

fn collapse_whitespace(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn product_key(vendor_id: &str, product_id: &str) -> String {
    format!("{}:{}", vendor_id, product_id)
}

/// Vendor and product name tables built from a `usb.ids` catalog
#[derive(Debug, Clone, Default)]
pub struct IdentityDatabase {
    /// Normalized vendor ID -> vendor name
    vendors: HashMap<String, String>,
    /// `"<vendor>:<product>"` (both normalized) -> product name
    products: HashMap<String, String>,
}

/// Parser state carried from one catalog line to the next
#[derive(Default)]
struct CatalogParser {
    db: IdentityDatabase,
    current_vendor: Option<String>,
    skipped: usize,
}

impl CatalogParser {
    fn ingest(&mut self, line: &str) {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.is_empty() || line.starts_with('#') {
            return;
        }

        let tabs = line.bytes().take_while(|b| *b == b'\t').count();

        let mut fields = line.split_whitespace();
        let (Some(id), Some(first)) = (fields.next(), fields.next()) else {
            self.skipped += 1;
            return;
        };
        let name = std::iter::once(first)
            .chain(fields)
            .collect::<Vec<_>>()
            .join(" ");
        let id = normalize_id(id);

        match tabs {
            0 => {
                self.db.vendors.insert(id.clone(), name);
                self.current_vendor = Some(id);
            }
            1 => match &self.current_vendor {
                Some(vendor) => {
                    self.db.products.insert(product_key(vendor, &id), name);
                }
                None => self.skipped += 1,
            },
            // interface and protocol entries are finer grained than we resolve
            _ => {}
        }
    }

    fn finish(self) -> IdentityDatabase {
        debug!(
            "Parsed USB ID catalog: {} vendors, {} products, {} lines skipped",
            self.db.vendors.len(),
            self.db.products.len(),
            self.skipped
        );
        self.db
    }
}

impl IdentityDatabase {
    /// Parse a catalog held in memory
    ///
    /// Malformed lines are skipped; this never fails; the worst case is an
    /// empty database.
    pub fn parse(text: &str) -> Self {
        let mut parser = CatalogParser::default();
        for line in text.lines() {
            parser.ingest(line);
        }
        parser.finish()
    }

    /// Parse a catalog from a reader
    ///
    /// Lines that are not valid UTF-8 are skipped like any other malformed
    /// line. Only genuine I/O failures are reported.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DetectError> {
        let mut reader = BufReader::with_capacity(CATALOG_LINE_CAPACITY, reader);
        let mut parser = CatalogParser::default();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }
            match std::str::from_utf8(&buf) {
                Ok(line) => parser.ingest(line),
                Err(_) => parser.skipped += 1,
            }
        }

        Ok(parser.finish())
    }

    /// Parse a catalog file from disk
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DetectError> {
        let file = File::open(path.as_ref())?;
        Self::from_reader(file)
    }

    /// The USB ID repository compiled into this crate, built on first use
    ///
    /// Every call returns the same shared instance.
    pub fn bundled() -> Arc<IdentityDatabase> {
        static BUNDLED: OnceLock<Arc<IdentityDatabase>> = OnceLock::new();
        BUNDLED
            .get_or_init(|| Arc::new(IdentityDatabase::from_repository()))
            .clone()
    }

    fn from_repository() -> Self {
        let mut db = IdentityDatabase::default();
        for vendor in ::usb_ids::Vendors::iter() {
            let vid = format!("{:04x}", vendor.id());
            for device in vendor.devices() {
                let pid = format!("{:04x}", device.id());
                db.products
                    .insert(product_key(&vid, &pid), collapse_whitespace(device.name()));
            }
            db.vendors.insert(vid, collapse_whitespace(vendor.name()));
        }

        debug!(
            "Loaded USB ID repository: {} vendors, {} products",
            db.vendors.len(),
            db.products.len()
        );
        db
    }

    /// Look up a vendor name
    pub fn vendor_name(&self, vendor_id: &str) -> Option<&str> {
        self.vendors.get(&normalize_id(vendor_id)).map(String::as_str)
    }

    /// Look up a product name under a vendor
    pub fn product_name(&self, vendor_id: &str, product_id: &str) -> Option<&str> {
        let key = product_key(&normalize_id(vendor_id), &normalize_id(product_id));
        self.products.get(&key).map(String::as_str)
    }

    /// Number of vendors in the database
    pub fn vendor_count(&self) -> usize {
        self.vendors.len()
    }

    /// Number of products in the database
    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    /// Resolve a vendor/product ID pair to a display name
    ///
    /// Returns `"<vendor> <product>"` when both are known, the vendor name
    /// alone when only the vendor is known, and [`UNRESOLVED`] otherwise.
    ///
    /// ```
    /// use baud_detect::IdentityDatabase;
    ///
    /// let db = IdentityDatabase::parse("1234  Acme Corp\n\t0001  Widget\n");
    /// assert_eq!(db.resolve("0x1234", "0x0001"), "Acme Corp Widget");
    /// assert_eq!(db.resolve("1234", "0002"), "Acme Corp");
    /// assert_eq!(db.resolve("", "0001"), "-");
    /// ```
    pub fn resolve(&self, vendor_id: &str, product_id: &str) -> String {
        let vid = normalize_id(vendor_id);
        if vid.is_empty() {
            return UNRESOLVED.to_string();
        }

        let Some(vendor) = self.vendors.get(&vid) else {
            return UNRESOLVED.to_string();
        };

        match self.products.get(&product_key(&vid, &normalize_id(product_id))) {
            Some(product) => format!("{} {}", vendor, product),
            None => vendor.clone(),
        }
    }
}
