//! Radio session state machine
//!
//! A [`RadioSession`] owns one open device and enforces the driver
//! contract: `Closed → Idle → {Sniffing, Injecting} → Idle → Closed`.
//! Every mutating call evaluates the capability set *before* any hardware
//! side effect, so a backend never sees a request its probe-time report
//! ruled out. Sessions are single-owner; one in-flight operation per
//! physical device, with separate devices running on separate tasks.

use crate::capability::{Capability, CapabilitySet};
use crate::driver::{Mode, RadioBackend};
use crate::fcs;
use crate::types::{DeviceDescriptor, JamMethod, ReceiveRecord};
use crate::{Error, Result};
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

/// Air MTU of an 802.15.4 frame
pub const MAX_FRAME_SIZE: usize = 127;

/// Largest frame accepted for injection (air MTU minus the FCS trailer)
pub const MAX_INJECT_SIZE: usize = MAX_FRAME_SIZE - fcs::FCS_LEN;

/// One open radio device
pub struct RadioSession {
    /// Session id (UUID v7 for time-ordered tracking)
    id: Uuid,
    descriptor: DeviceDescriptor,
    capabilities: CapabilitySet,
    channel: Option<u8>,
    page: u8,
    mode: Mode,
    /// `None` once the session has been closed
    backend: Option<Box<dyn RadioBackend>>,
}

impl std::fmt::Debug for RadioSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RadioSession")
            .field("id", &self.id)
            .field("descriptor", &self.descriptor)
            .field("capabilities", &self.capabilities)
            .field("channel", &self.channel)
            .field("page", &self.page)
            .field("mode", &self.mode)
            .field("backend", &self.backend.as_ref().map(|b| b.name()))
            .finish()
    }
}

impl RadioSession {
    /// Bind a probed backend into an idle session
    ///
    /// The capability set is whatever the backend reported during its
    /// open handshake; it is never mutated again for the life of the
    /// session.
    pub fn new(
        backend: Box<dyn RadioBackend>,
        descriptor: DeviceDescriptor,
        capabilities: CapabilitySet,
    ) -> Self {
        let id = Uuid::now_v7();
        info!(session = %id, device = %descriptor, backend = backend.name(), "Opened radio session");
        Self {
            id,
            descriptor,
            capabilities,
            channel: None,
            page: 0,
            mode: Mode::Idle,
            backend: Some(backend),
        }
    }

    /// Session identifier
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Identity of the device this session owns
    pub fn descriptor(&self) -> &DeviceDescriptor {
        &self.descriptor
    }

    /// The capability set reported at open time (read-only)
    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    /// Channel the radio is tuned to, once one has been set
    pub fn channel(&self) -> Option<u8> {
        self.channel
    }

    /// Current channel page (0 = 2.4 GHz)
    pub fn page(&self) -> u8 {
        self.page
    }

    /// Current mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Whether the session has been closed
    pub fn is_closed(&self) -> bool {
        self.backend.is_none()
    }

    fn backend_mut(&mut self) -> Result<&mut dyn RadioBackend> {
        match self.backend.as_deref_mut() {
            Some(backend) => Ok(backend),
            None => Err(Error::SessionClosed),
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.backend.is_some() {
            Ok(())
        } else {
            Err(Error::SessionClosed)
        }
    }

    /// Tune the radio to `channel` on `page`
    pub async fn set_channel(&mut self, channel: u8, page: u8) -> Result<()> {
        self.ensure_open()?;
        self.capabilities.require(Capability::SetChannel)?;
        if !self.capabilities.is_valid_channel(channel, page) {
            return Err(Error::InvalidChannel { channel, page });
        }
        self.backend_mut()?.set_channel(channel, page).await?;
        self.channel = Some(channel);
        self.page = page;
        debug!(session = %self.id, channel, page, "Channel set");
        Ok(())
    }

    /// Enable the receive path, optionally retuning first
    ///
    /// Idempotent when already sniffing. `page` falls back to the current
    /// page when only a channel is given.
    pub async fn sniffer_on(&mut self, channel: Option<u8>, page: Option<u8>) -> Result<()> {
        self.ensure_open()?;
        self.capabilities.require(Capability::Sniff)?;
        if let Some(channel) = channel {
            let page = page.unwrap_or(self.page);
            self.set_channel(channel, page).await?;
        }
        if self.mode == Mode::Sniffing {
            return Ok(());
        }
        self.backend_mut()?.sniffer_on().await?;
        self.mode = Mode::Sniffing;
        debug!(session = %self.id, "Sniffer on");
        Ok(())
    }

    /// Disable the receive path
    ///
    /// Safe to call in any open mode; a no-op unless currently sniffing.
    pub async fn sniffer_off(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.mode != Mode::Sniffing {
            return Ok(());
        }
        self.backend_mut()?.sniffer_off().await?;
        self.mode = Mode::Idle;
        debug!(session = %self.id, "Sniffer off");
        Ok(())
    }

    /// Transmit `count` copies of `frame` with `delay` between them
    ///
    /// The frame arrives *without* its FCS trailer; the session appends a
    /// placeholder for hardware that computes the checksum itself, or the
    /// real CRC otherwise. Size limits are enforced before any hardware
    /// I/O happens.
    pub async fn inject(
        &mut self,
        frame: &[u8],
        channel: Option<u8>,
        count: usize,
        delay: Duration,
    ) -> Result<()> {
        self.ensure_open()?;
        self.capabilities.require(Capability::Inject)?;
        if frame.is_empty() {
            return Err(Error::invalid_frame("Refusing to inject an empty frame"));
        }
        if frame.len() > MAX_INJECT_SIZE {
            return Err(Error::InvalidFrame(format!(
                "Frame of {} bytes exceeds the {} byte injection limit",
                frame.len(),
                MAX_INJECT_SIZE
            )));
        }
        if let Some(channel) = channel {
            self.set_channel(channel, self.page).await?;
        }

        let wire = if self.backend_mut()?.appends_fcs() {
            let mut wire = Vec::with_capacity(frame.len() + fcs::FCS_LEN);
            wire.extend_from_slice(frame);
            wire.extend_from_slice(&[0x00, 0x00]);
            wire
        } else {
            fcs::append_fcs(frame)
        };

        let previous = self.mode;
        self.mode = Mode::Injecting;
        for sent in 0..count {
            if sent > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if let Err(e) = self.backend_mut()?.inject(&wire).await {
                self.mode = previous;
                return Err(e);
            }
        }
        self.mode = previous;
        debug!(session = %self.id, count, len = frame.len(), "Injected frames");
        Ok(())
    }

    /// Wait up to `timeout` for the next captured frame
    ///
    /// Implicitly enables the sniffer when the session is not already in
    /// [`Mode::Sniffing`]. A timeout is `Ok(None)`, not an error.
    pub async fn pnext(&mut self, timeout: Duration) -> Result<Option<ReceiveRecord>> {
        self.ensure_open()?;
        if self.mode != Mode::Sniffing {
            self.sniffer_on(None, None).await?;
        }
        self.backend_mut()?.recv(timeout).await
    }

    /// Start jamming, optionally retuning first
    pub async fn jammer_on(&mut self, channel: Option<u8>, method: JamMethod) -> Result<()> {
        self.ensure_open()?;
        let required = match method {
            JamMethod::Constant => Capability::PhyJam,
            JamMethod::Reflexive => Capability::PhyJamReflexive,
        };
        self.capabilities.require(required)?;
        if let Some(channel) = channel {
            self.set_channel(channel, self.page).await?;
        }
        self.backend_mut()?.jammer_on(method).await?;
        self.mode = Mode::Injecting;
        info!(session = %self.id, ?method, "Jammer on");
        Ok(())
    }

    /// Stop jamming
    pub async fn jammer_off(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.backend_mut()?.jammer_off().await?;
        self.mode = Mode::Idle;
        info!(session = %self.id, "Jammer off");
        Ok(())
    }

    /// Release the device
    ///
    /// Idempotent: closing an already-closed session is a no-op. Any other
    /// call on a closed session fails with [`Error::SessionClosed`].
    pub async fn close(&mut self) -> Result<()> {
        let Some(mut backend) = self.backend.take() else {
            return Ok(());
        };
        if self.mode == Mode::Sniffing {
            // Best effort; the device is going away either way.
            let _ = backend.sniffer_off().await;
        }
        backend.close().await?;
        self.mode = Mode::Idle;
        info!(session = %self.id, "Closed radio session");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::SystemTime;

    /// Call log shared between a mock backend and the test body
    #[derive(Default)]
    struct MockState {
        set_channel_calls: Vec<(u8, u8)>,
        sniffer_on_calls: usize,
        sniffer_off_calls: usize,
        injected: Vec<Vec<u8>>,
        jam_calls: Vec<JamMethod>,
        closed: bool,
        rx_queue: Vec<ReceiveRecord>,
    }

    /// Scripted backend that records every hardware call
    struct MockBackend {
        hw_fcs: bool,
        state: Arc<Mutex<MockState>>,
    }

    impl MockBackend {
        fn new(hw_fcs: bool) -> (Self, Arc<Mutex<MockState>>) {
            let state = Arc::new(Mutex::new(MockState::default()));
            (
                Self {
                    hw_fcs,
                    state: state.clone(),
                },
                state,
            )
        }
    }

    fn record(bytes: &[u8]) -> ReceiveRecord {
        ReceiveRecord {
            bytes: bytes.to_vec(),
            valid_crc: true,
            rssi: Some(40),
            lqi: Some(108),
            timestamp: SystemTime::now(),
            channel: 11,
            page: 0,
        }
    }

    #[async_trait]
    impl RadioBackend for MockBackend {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn appends_fcs(&self) -> bool {
            self.hw_fcs
        }

        async fn set_channel(&mut self, channel: u8, page: u8) -> Result<()> {
            self.state.lock().unwrap().set_channel_calls.push((channel, page));
            Ok(())
        }

        async fn sniffer_on(&mut self) -> Result<()> {
            self.state.lock().unwrap().sniffer_on_calls += 1;
            Ok(())
        }

        async fn sniffer_off(&mut self) -> Result<()> {
            self.state.lock().unwrap().sniffer_off_calls += 1;
            Ok(())
        }

        async fn inject(&mut self, frame: &[u8]) -> Result<()> {
            self.state.lock().unwrap().injected.push(frame.to_vec());
            Ok(())
        }

        async fn recv(&mut self, _timeout: Duration) -> Result<Option<ReceiveRecord>> {
            let mut state = self.state.lock().unwrap();
            Ok(if state.rx_queue.is_empty() {
                None
            } else {
                Some(state.rx_queue.remove(0))
            })
        }

        async fn jammer_on(&mut self, method: JamMethod) -> Result<()> {
            self.state.lock().unwrap().jam_calls.push(method);
            Ok(())
        }

        async fn jammer_off(&mut self) -> Result<()> {
            Ok(())
        }

        async fn close(&mut self) -> Result<()> {
            self.state.lock().unwrap().closed = true;
            Ok(())
        }
    }

    fn full_caps() -> CapabilitySet {
        let mut caps = CapabilitySet::new();
        for cap in Capability::ALL {
            caps.set(cap, true);
        }
        caps
    }

    fn descriptor() -> DeviceDescriptor {
        DeviceDescriptor::new("mock0", "Mock Radio", "")
    }

    fn session(hw_fcs: bool, caps: CapabilitySet) -> (RadioSession, Arc<Mutex<MockState>>) {
        let (backend, state) = MockBackend::new(hw_fcs);
        (
            RadioSession::new(Box::new(backend), descriptor(), caps),
            state,
        )
    }

    #[tokio::test]
    async fn pnext_enables_sniffer_first() {
        let (mut session, state) = session(true, full_caps());
        assert_eq!(session.mode(), Mode::Idle);
        let rec = session.pnext(Duration::from_millis(10)).await.unwrap();
        assert!(rec.is_none());
        assert_eq!(session.mode(), Mode::Sniffing);
        assert_eq!(state.lock().unwrap().sniffer_on_calls, 1);
    }

    #[tokio::test]
    async fn pnext_returns_queued_frame() {
        let (mut session, state) = session(true, full_caps());
        state
            .lock()
            .unwrap()
            .rx_queue
            .push(record(&[0x61, 0x88, 0x01, 0x34, 0x12, 0xff, 0xff, 0x01, 0x00, 0xaa]));
        let rec = session.pnext(Duration::from_millis(10)).await.unwrap().unwrap();
        assert!(rec.valid_crc);
        assert_eq!(rec.channel, 11);
    }

    #[tokio::test]
    async fn sniffer_on_is_idempotent() {
        let (mut session, state) = session(true, full_caps());
        session.sniffer_on(None, None).await.unwrap();
        session.sniffer_on(None, None).await.unwrap();
        assert_eq!(state.lock().unwrap().sniffer_on_calls, 1);
        session.sniffer_off().await.unwrap();
        assert_eq!(session.mode(), Mode::Idle);
        // Off while idle is a no-op, not an error, and does not reach hardware
        session.sniffer_off().await.unwrap();
        assert_eq!(state.lock().unwrap().sniffer_off_calls, 1);
    }

    #[tokio::test]
    async fn inject_rejects_bad_sizes_before_hardware() {
        let (mut session, state) = session(true, full_caps());

        let err = session
            .inject(&[], None, 1, Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFrame(_)));

        let err = session
            .inject(&[0u8; 126], None, 1, Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidFrame(_)));

        assert!(state.lock().unwrap().injected.is_empty());

        session
            .inject(&[0u8; MAX_INJECT_SIZE], None, 1, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(state.lock().unwrap().injected.len(), 1);
    }

    #[tokio::test]
    async fn inject_appends_placeholder_for_hw_fcs() {
        let (mut session, state) = session(true, full_caps());
        let frame = [0x01u8; 20];
        session.inject(&frame, None, 1, Duration::ZERO).await.unwrap();
        let sent = state.lock().unwrap().injected[0].clone();
        assert_eq!(sent.len(), 22);
        assert_eq!(&sent[20..], &[0x00, 0x00]);
    }

    #[tokio::test]
    async fn inject_appends_computed_fcs_when_hw_does_not() {
        let (mut session, state) = session(false, full_caps());
        let frame = [0x01u8; 20];
        session.inject(&frame, None, 1, Duration::ZERO).await.unwrap();
        let sent = state.lock().unwrap().injected[0].clone();
        assert_eq!(sent.len(), 22);
        assert_eq!(&sent[20..], &[0xa7, 0xf7]);
    }

    #[tokio::test]
    async fn inject_sends_count_copies() {
        let (mut session, state) = session(true, full_caps());
        session
            .inject(&[0x03, 0x08, 0x01], None, 3, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(state.lock().unwrap().injected.len(), 3);
        assert_eq!(session.mode(), Mode::Idle);
    }

    #[tokio::test]
    async fn capability_gating_blocks_operations() {
        let mut caps = CapabilitySet::new();
        caps.set(Capability::Sniff, true);
        // No Inject, no SetChannel, no band flags
        let (mut session, state) = session(true, caps);

        let err = session
            .inject(&[0x01], None, 1, Duration::ZERO)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingCapability(Capability::Inject)));

        let err = session.set_channel(11, 0).await.unwrap_err();
        assert!(matches!(
            err,
            Error::MissingCapability(Capability::SetChannel)
        ));

        let err = session
            .jammer_on(None, JamMethod::Constant)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingCapability(Capability::PhyJam)));

        // None of the refused operations reached the backend
        let state = state.lock().unwrap();
        assert!(state.injected.is_empty());
        assert!(state.set_channel_calls.is_empty());
        assert!(state.jam_calls.is_empty());
    }

    #[tokio::test]
    async fn set_channel_validates_against_bands() {
        let (mut session, _state) = session(true, full_caps());
        session.set_channel(15, 0).await.unwrap();
        assert_eq!(session.channel(), Some(15));

        let err = session.set_channel(27, 0).await.unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidChannel {
                channel: 27,
                page: 0
            }
        ));
        // Failed retune leaves the previous channel in place
        assert_eq!(session.channel(), Some(15));
    }

    #[tokio::test]
    async fn closed_session_rejects_everything_but_close() {
        let (mut session, state) = session(true, full_caps());
        session.close().await.unwrap();
        assert!(session.is_closed());
        assert!(state.lock().unwrap().closed);

        assert!(matches!(
            session.pnext(Duration::ZERO).await.unwrap_err(),
            Error::SessionClosed
        ));
        assert!(matches!(
            session.sniffer_on(None, None).await.unwrap_err(),
            Error::SessionClosed
        ));
        assert!(matches!(
            session.sniffer_off().await.unwrap_err(),
            Error::SessionClosed
        ));
        assert!(matches!(
            session
                .inject(&[0x01], None, 1, Duration::ZERO)
                .await
                .unwrap_err(),
            Error::SessionClosed
        ));
        assert!(matches!(
            session.set_channel(11, 0).await.unwrap_err(),
            Error::SessionClosed
        ));
        assert!(matches!(
            session.jammer_off().await.unwrap_err(),
            Error::SessionClosed
        ));

        // Repeat close stays fine
        session.close().await.unwrap();
    }

    #[tokio::test]
    async fn jammer_lifecycle() {
        let (mut session, state) = session(true, full_caps());
        session
            .jammer_on(Some(20), JamMethod::Constant)
            .await
            .unwrap();
        assert_eq!(session.mode(), Mode::Injecting);
        assert_eq!(session.channel(), Some(20));
        assert_eq!(state.lock().unwrap().jam_calls, vec![JamMethod::Constant]);
        session.jammer_off().await.unwrap();
        assert_eq!(session.mode(), Mode::Idle);
    }
}
