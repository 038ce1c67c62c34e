//! Frame codecs and the security transform for Hornet
//!
//! Pure, stateless dissection and assembly of the protocol layers an
//! 802.15.4 / ZigBee analysis tool touches, plus the CCM* transform that
//! unlocks ZigBee application payloads:
//!
//! - [`mac`] - 802.15.4 MAC frame dissection and the inject-path builder
//! - [`nwk`] - ZigBee network-layer dissection
//! - [`aps`] - ZigBee application support sub-layer dissection
//! - [`security`] - frame-level CCM* encrypt/decrypt and nonce derivation
//! - [`ccm`] - the underlying AES-CCM* core
//!
//! Nothing in this crate does I/O or holds state; every function can be
//! driven from any number of threads at once, which is what lets the codec
//! and crypto be exercised exhaustively in isolation.

pub mod aps;
pub mod ccm;
pub mod mac;
pub mod nwk;
pub mod security;

// Re-export commonly used types
pub use aps::{ApsFields, ApsFrameControl, ApsFrameType, DeliveryMode};
pub use mac::{
    AddressingMode, BeaconFields, FrameControl, FrameType, MacFields, MacFrameBuilder,
};
pub use nwk::{NwkFields, NwkFrameControl, NwkFrameType};
pub use security::{SecurityHeader, SecurityLevel};
