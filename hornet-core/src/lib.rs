//! Hornet Core Library
//!
//! This crate provides the fundamental traits, types, and error handling
//! for the Hornet 802.15.4 / ZigBee security research framework: the
//! capability model every backend reports against, the driver contract the
//! heterogeneous radio adapters implement, the session state machine that
//! enforces it, and the frame check sequence shared by the receive and
//! inject paths.

pub mod capability;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod fcs;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use capability::{frequency, Capability, CapabilitySet};
pub use dispatch::{BackendFactory, Dispatcher, DiscoveryConfig, ProbedBackend};
pub use driver::{Mode, RadioBackend};
pub use error::{Error, Result};
pub use session::{RadioSession, MAX_FRAME_SIZE, MAX_INJECT_SIZE};
pub use types::{
    DeviceDescriptor, ExtendedAddress, JamMethod, PanId, ReceiveRecord, ShortAddress,
};
