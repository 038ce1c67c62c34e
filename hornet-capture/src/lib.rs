//! Capture file formats for Hornet
//!
//! The boundary formats the framework reads and writes at its edges:
//!
//! - [`pcap`] - classic libpcap containers with the 802.15.4 datalinks
//! - [`ppi`] - per-packet radio metadata (frequency, signal, GPS fix)
//! - [`daintree`] - the Daintree SNA text capture format
//!
//! All three are plain streaming codecs over [`std::io`] traits; device
//! handling lives in `hornet-core` and never leaks in here.

pub mod daintree;
pub mod pcap;
pub mod ppi;

// Re-export commonly used types
pub use daintree::{DaintreeDumper, DaintreeReader, DaintreeRecord};
pub use pcap::{
    PcapDumper, PcapReader, PcapRecord, DLT_IEEE802_15_4_NOFCS, DLT_IEEE802_15_4_WITHFCS, DLT_PPI,
};
pub use ppi::{Geolocation, PpiHeader};
