//! Common types used throughout Hornet

use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;

/// 16-bit 802.15.4 short address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShortAddress(pub u16);

impl ShortAddress {
    /// Broadcast short address (0xffff)
    pub const fn broadcast() -> Self {
        Self(0xffff)
    }

    /// Little-endian wire representation
    pub fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }

    /// Decode from the little-endian wire representation
    pub fn from_le_bytes(bytes: [u8; 2]) -> Self {
        Self(u16::from_le_bytes(bytes))
    }
}

impl fmt::Display for ShortAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

/// 64-bit IEEE extended (EUI-64) address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExtendedAddress(pub u64);

impl ExtendedAddress {
    /// Little-endian wire representation
    pub fn to_le_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }

    /// Decode from the little-endian wire representation
    pub fn from_le_bytes(bytes: [u8; 8]) -> Self {
        Self(u64::from_le_bytes(bytes))
    }
}

impl fmt::Display for ExtendedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0.to_be_bytes();
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]
        )
    }
}

impl FromStr for ExtendedAddress {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 8 {
            return Err(crate::Error::invalid_frame("Invalid extended address format"));
        }
        let mut value: u64 = 0;
        for part in parts {
            let byte = u8::from_str_radix(part, 16)
                .map_err(|_| crate::Error::invalid_frame("Invalid extended address hex"))?;
            value = (value << 8) | u64::from(byte);
        }
        Ok(ExtendedAddress(value))
    }
}

/// 16-bit Personal Area Network identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PanId(pub u16);

impl PanId {
    /// Broadcast PAN id (0xffff)
    pub const fn broadcast() -> Self {
        Self(0xffff)
    }

    /// Little-endian wire representation
    pub fn to_le_bytes(self) -> [u8; 2] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for PanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04x}", self.0)
    }
}

/// Identity of a discovered radio adapter
///
/// Returned by device discovery and consumed by the dispatcher. Immutable
/// value type; the handle string is whatever the enumeration layer uses to
/// reopen the device (a /dev path, a USB bus address, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Opaque handle used to open the device
    pub handle: String,
    /// Human-readable product string
    pub product: String,
    /// Serial number, or empty when the device does not report one
    pub serial: String,
}

impl DeviceDescriptor {
    /// Create a new device descriptor
    pub fn new<H, P, S>(handle: H, product: P, serial: S) -> Self
    where
        H: Into<String>,
        P: Into<String>,
        S: Into<String>,
    {
        Self {
            handle: handle.into(),
            product: product.into(),
            serial: serial.into(),
        }
    }
}

impl fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.serial.is_empty() {
            write!(f, "{} ({})", self.handle, self.product)
        } else {
            write!(f, "{} ({}, serial {})", self.handle, self.product, self.serial)
        }
    }
}

/// One captured frame together with its radio metadata
///
/// A single explicit struct; the receive path never hands out loosely-typed
/// records.
#[derive(Debug, Clone)]
pub struct ReceiveRecord {
    /// Raw frame bytes as they came off the air, FCS included when the
    /// hardware delivers it
    pub bytes: Vec<u8>,
    /// Whether the frame check sequence validated
    pub valid_crc: bool,
    /// Raw RSSI value, when the hardware reports one
    pub rssi: Option<u8>,
    /// Link quality indicator, when the hardware reports one
    pub lqi: Option<u8>,
    /// Capture timestamp
    pub timestamp: SystemTime,
    /// Channel the frame was captured on
    pub channel: u8,
    /// Channel page (0 = 2.4 GHz)
    pub page: u8,
}

/// Jamming strategy selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JamMethod {
    /// Continuous carrier / frame flood on the current channel
    Constant,
    /// Reactive jamming triggered by observed preambles
    Reflexive,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_address_display() {
        assert_eq!(format!("{}", ShortAddress(0x1a2b)), "0x1a2b");
        assert_eq!(format!("{}", ShortAddress::broadcast()), "0xffff");
    }

    #[test]
    fn extended_address_roundtrip() {
        let addr = ExtendedAddress(0x0011223344556677);
        let bytes = addr.to_le_bytes();
        assert_eq!(bytes[0], 0x77);
        assert_eq!(ExtendedAddress::from_le_bytes(bytes), addr);
    }

    #[test]
    fn extended_address_from_str() {
        let addr: ExtendedAddress = "00:11:22:33:44:55:66:77".parse().unwrap();
        assert_eq!(addr, ExtendedAddress(0x0011223344556677));
        assert!("00:11:22".parse::<ExtendedAddress>().is_err());
        assert!("zz:11:22:33:44:55:66:77".parse::<ExtendedAddress>().is_err());
    }

    #[test]
    fn descriptor_display() {
        let with_serial = DeviceDescriptor::new("/dev/ttyUSB0", "River Loop ApiMote", "AM0042");
        assert_eq!(
            format!("{}", with_serial),
            "/dev/ttyUSB0 (River Loop ApiMote, serial AM0042)"
        );
        let without = DeviceDescriptor::new("/dev/ttyUSB1", "GoodFET", "");
        assert_eq!(format!("{}", without), "/dev/ttyUSB1 (GoodFET)");
    }
}
