//! Virtual port descriptors

use baud_detect::RawPortDescriptor;

/// Builder for a simulated port descriptor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualPort {
    /// Port name (e.g., /dev/ttyUSB0, COM3)
    pub name: String,
    /// USB Vendor/Product ID, if this is a USB port
    pub usb_ids: Option<(u16, u16)>,
    /// USB serial number
    pub serial_number: String,
}

impl VirtualPort {
    /// A USB-backed port with the given vendor and product IDs
    pub fn usb(name: impl Into<String>, vid: u16, pid: u16) -> Self {
        Self {
            name: name.into(),
            usb_ids: Some((vid, pid)),
            serial_number: String::new(),
        }
    }

    /// A native (non-USB) port
    pub fn native(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            usb_ids: None,
            serial_number: String::new(),
        }
    }

    /// Set the USB serial number
    pub fn serial(mut self, serial: impl Into<String>) -> Self {
        self.serial_number = serial.into();
        self
    }

    /// Produce the descriptor an enumeration source would report
    pub fn build(&self) -> RawPortDescriptor {
        match self.usb_ids {
            Some((vid, pid)) => RawPortDescriptor {
                name: self.name.clone(),
                is_usb: true,
                vendor_id: format!("{:04x}", vid),
                product_id: format!("{:04x}", pid),
                serial_number: self.serial_number.clone(),
            },
            None => RawPortDescriptor {
                name: self.name.clone(),
                serial_number: self.serial_number.clone(),
                ..Default::default()
            },
        }
    }
}

impl From<VirtualPort> for RawPortDescriptor {
    fn from(port: VirtualPort) -> Self {
        port.build()
    }
}
