//! Backend discovery and binding
//!
//! Device enumeration hands the dispatcher a [`DeviceDescriptor`]; the
//! dispatcher walks its registered backend factories in a fixed order and
//! binds the first one whose probe handshake is acknowledged. Everything a
//! probe needs to know beyond the descriptor travels in an explicit
//! [`DiscoveryConfig`] — there is no process-wide discovery state.

use crate::capability::CapabilitySet;
use crate::driver::RadioBackend;
use crate::session::RadioSession;
use crate::types::DeviceDescriptor;
use crate::{Error, Result};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Configuration for device discovery and probing
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// Device handles discovery must never touch (e.g. the serial port a
    /// GPS receiver is attached to)
    pub exclude_handles: Vec<String>,
    /// Upper bound on probe handshake attempts before a factory gives up
    /// with [`Error::HandshakeTimeout`]
    pub handshake_retries: u32,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            exclude_handles: Vec::new(),
            handshake_retries: 3,
        }
    }
}

/// A backend that acknowledged a probe, with the capabilities it reported
pub struct ProbedBackend {
    /// The bound backend, already through its open handshake
    pub backend: Box<dyn RadioBackend>,
    /// Feature flags the firmware reported; fixed for the session lifetime
    pub capabilities: CapabilitySet,
}

/// Factory for one backend family
///
/// `probe` answers `Ok(None)` when the device is simply not this family's
/// hardware, letting the dispatcher continue down its list. An error means
/// the device *was* claimed but could not be brought up —
/// [`Error::HandshakeTimeout`] when the byte exchange did not converge
/// within `config.handshake_retries` attempts — and aborts the probe walk.
#[async_trait]
pub trait BackendFactory: Send + Sync {
    /// Backend family name (e.g. "apimote", "cc2531")
    fn name(&self) -> &'static str;

    /// Try to claim and open the device
    async fn probe(
        &self,
        device: &DeviceDescriptor,
        config: &DiscoveryConfig,
    ) -> Result<Option<ProbedBackend>>;
}

/// Ordered registry of backend factories
#[derive(Default)]
pub struct Dispatcher {
    factories: Vec<Arc<dyn BackendFactory>>,
}

impl Dispatcher {
    /// Create an empty dispatcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a factory to the probe order
    pub fn register(&mut self, factory: Arc<dyn BackendFactory>) {
        debug!(backend = factory.name(), "Registered backend factory");
        self.factories.push(factory);
    }

    /// Names of the registered factories, in probe order
    pub fn backends(&self) -> Vec<&'static str> {
        self.factories.iter().map(|f| f.name()).collect()
    }

    /// Probe `device` against every registered factory, in order, and bind
    /// the first acknowledger into a [`RadioSession`].
    pub async fn open(
        &self,
        device: &DeviceDescriptor,
        config: &DiscoveryConfig,
    ) -> Result<RadioSession> {
        if config.exclude_handles.contains(&device.handle) {
            warn!(device = %device, "Device is excluded by configuration");
            return Err(Error::device(format!(
                "Device '{}' is excluded by configuration",
                device.handle
            )));
        }

        for factory in &self.factories {
            debug!(backend = factory.name(), device = %device, "Probing");
            if let Some(probed) = factory.probe(device, config).await? {
                info!(backend = factory.name(), device = %device, "Probe acknowledged");
                return Ok(RadioSession::new(
                    probed.backend,
                    device.clone(),
                    probed.capabilities,
                ));
            }
        }

        Err(Error::UnsupportedDevice(device.handle.clone()))
    }
}
