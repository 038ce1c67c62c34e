//! The backend contract every radio adapter implements
//!
//! Hornet speaks to very different hardware (GoodFET-era motes, CC2531
//! dongles, sub-GHz SoCs, SDR bridges) through one small trait. A backend
//! only moves bytes and flips radio state; capability checks, channel
//! validation, and the session state machine all live in
//! [`RadioSession`](crate::session::RadioSession), so a backend can stay a
//! thin wrapper around its wire protocol.

use crate::types::{JamMethod, ReceiveRecord};
use crate::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Session mode, as seen by callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Open, radio quiet
    Idle,
    /// Receive path enabled
    Sniffing,
    /// Transmit (inject or jam) in progress
    Injecting,
}

/// Hardware operations a bound radio backend provides
///
/// All methods are invoked with the capability checks already done; a
/// backend may assume the session layer never asks for something the
/// capability set it reported at probe time rules out. Methods return
/// [`Error::Device`](crate::Error::Device) for hardware-level failures.
#[async_trait]
pub trait RadioBackend: Send {
    /// Backend family name (e.g. "apimote", "cc2531")
    fn name(&self) -> &'static str;

    /// Whether the hardware computes the trailing FCS during transmit
    ///
    /// When true, the session appends a 2-byte placeholder the radio
    /// overwrites; when false, the session appends a computed CRC.
    fn appends_fcs(&self) -> bool {
        true
    }

    /// Tune the radio to a channel on a page (page 0 = 2.4 GHz)
    async fn set_channel(&mut self, channel: u8, page: u8) -> Result<()>;

    /// Enable the receive path
    async fn sniffer_on(&mut self) -> Result<()>;

    /// Disable the receive path
    async fn sniffer_off(&mut self) -> Result<()>;

    /// Transmit one frame, FCS trailer already attached
    async fn inject(&mut self, frame: &[u8]) -> Result<()>;

    /// Wait up to `timeout` for one frame
    ///
    /// `None` means the timeout elapsed with nothing captured; it is not an
    /// error. Backends fill in whatever radio metadata their hardware
    /// reports and set `valid_crc` from the hardware flag or a software
    /// check of the trailer.
    async fn recv(&mut self, timeout: Duration) -> Result<Option<ReceiveRecord>>;

    /// Start jamming with the given method
    async fn jammer_on(&mut self, method: JamMethod) -> Result<()>;

    /// Stop jamming
    async fn jammer_off(&mut self) -> Result<()>;

    /// Release the device
    async fn close(&mut self) -> Result<()>;
}
