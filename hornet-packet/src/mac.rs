//! 802.15.4 MAC frame dissection and assembly
//!
//! The MAC header has no fixed layout: six independent frame-control bits
//! decide which of the addressing fields exist and how wide they are, and
//! beacon frames swap the destination fields for a beacon block. Dissection
//! therefore works as a decision table over the FCF rather than a fixed
//! struct, and every field comes back as a (possibly empty) byte range of
//! the original frame, in wire order.

use bytes::{BufMut, Bytes, BytesMut};
use hornet_core::{Error, Result, MAX_INJECT_SIZE};
use std::fmt;

/// Smallest frame the codec will dissect: FCF, sequence number, and both
/// short-form address blocks
pub const MIN_FRAME_SIZE: usize = 9;

/// MAC frame types (3-bit FCF field)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameType {
    Beacon,
    Data,
    Ack,
    Command,
    Reserved(u8),
}

impl FrameType {
    /// Decode from the low FCF bits
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => Self::Beacon,
            1 => Self::Data,
            2 => Self::Ack,
            3 => Self::Command,
            other => Self::Reserved(other),
        }
    }

    /// Encode into the low FCF bits
    pub fn to_bits(self) -> u8 {
        match self {
            Self::Beacon => 0,
            Self::Data => 1,
            Self::Ack => 2,
            Self::Command => 3,
            Self::Reserved(v) => v & 0x07,
        }
    }
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Beacon => write!(f, "Beacon"),
            Self::Data => write!(f, "Data"),
            Self::Ack => write!(f, "Ack"),
            Self::Command => write!(f, "Command"),
            Self::Reserved(v) => write!(f, "Reserved({})", v),
        }
    }
}

/// MAC addressing modes (2-bit FCF fields)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressingMode {
    /// No address present
    None,
    /// Reserved mode; no address bytes
    Reserved,
    /// 16-bit short address
    Short,
    /// 64-bit extended address
    Extended,
}

impl AddressingMode {
    /// Decode from a 2-bit FCF field
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::None,
            1 => Self::Reserved,
            2 => Self::Short,
            _ => Self::Extended,
        }
    }

    /// Encode into a 2-bit FCF field
    pub fn to_bits(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Reserved => 1,
            Self::Short => 2,
            Self::Extended => 3,
        }
    }

    /// Number of address bytes this mode occupies
    pub fn len(self) -> usize {
        match self {
            Self::None | Self::Reserved => 0,
            Self::Short => 2,
            Self::Extended => 8,
        }
    }

    /// Whether the mode carries no address bytes
    pub fn is_empty(self) -> bool {
        self.len() == 0
    }
}

/// Decoded 16-bit frame control field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameControl {
    pub frame_type: FrameType,
    /// Payload carries an auxiliary security header
    pub security: bool,
    pub frame_pending: bool,
    pub ack_request: bool,
    /// Source PAN id is compressed away (same as destination PAN)
    pub intra_pan: bool,
    pub dst_mode: AddressingMode,
    /// Frame version bits
    pub version: u8,
    pub src_mode: AddressingMode,
}

impl FrameControl {
    /// Decode from the 16-bit little-endian FCF value
    pub fn from_bits(bits: u16) -> Self {
        Self {
            frame_type: FrameType::from_bits(bits as u8),
            security: bits & 0x0008 != 0,
            frame_pending: bits & 0x0010 != 0,
            ack_request: bits & 0x0020 != 0,
            intra_pan: bits & 0x0040 != 0,
            dst_mode: AddressingMode::from_bits((bits >> 10) as u8),
            version: ((bits >> 12) & 0x03) as u8,
            src_mode: AddressingMode::from_bits((bits >> 14) as u8),
        }
    }

    /// Decode from the first two bytes of a frame
    pub fn from_bytes(bytes: [u8; 2]) -> Self {
        Self::from_bits(u16::from_le_bytes(bytes))
    }

    /// Encode back into the 16-bit FCF value
    pub fn to_bits(self) -> u16 {
        let mut bits = u16::from(self.frame_type.to_bits());
        if self.security {
            bits |= 0x0008;
        }
        if self.frame_pending {
            bits |= 0x0010;
        }
        if self.ack_request {
            bits |= 0x0020;
        }
        if self.intra_pan {
            bits |= 0x0040;
        }
        bits |= u16::from(self.dst_mode.to_bits()) << 10;
        bits |= u16::from(self.version & 0x03) << 12;
        bits |= u16::from(self.src_mode.to_bits()) << 14;
        bits
    }

    /// Little-endian wire representation
    pub fn to_bytes(self) -> [u8; 2] {
        self.to_bits().to_le_bytes()
    }
}

/// Header length implied by the frame control bits alone.
///
/// The base layout charges FCF, sequence number, destination PAN and both
/// short-form addresses (9 bytes); each extended-addressing side adds 6
/// bytes over the short form, and the source PAN id adds 2 more when
/// intra-PAN compression is off. Frames shorter than [`MIN_FRAME_SIZE`]
/// cannot carry the base layout and fail with [`Error::TooShort`].
pub fn hdrlen(frame: &[u8]) -> Result<usize> {
    if frame.len() < MIN_FRAME_SIZE {
        return Err(Error::TooShort { len: frame.len() });
    }
    let fcf = FrameControl::from_bytes([frame[0], frame[1]]);
    let mut len = MIN_FRAME_SIZE;
    if fcf.dst_mode == AddressingMode::Extended {
        len += 6;
    }
    if fcf.src_mode == AddressingMode::Extended {
        len += 6;
    }
    if !fcf.intra_pan {
        len += 2;
    }
    Ok(len)
}

/// Payload length implied by the frame control bits alone.
///
/// Always satisfies `hdrlen(f) + payloadlen(f) == f.len()` for frames the
/// codec accepts.
pub fn payloadlen(frame: &[u8]) -> Result<usize> {
    let hdr = hdrlen(frame)?;
    if frame.len() < hdr {
        return Err(Error::TooShort { len: frame.len() });
    }
    Ok(frame.len() - hdr)
}

/// Beacon block of a dissected beacon frame
///
/// Fields past the end of a short beacon are empty rather than an error;
/// sniffed beacons are routinely truncated by lossy radios.
#[derive(Debug, Clone, Default)]
pub struct BeaconFields {
    /// Superframe specification (2 bytes)
    pub superframe: Bytes,
    /// Guaranteed time slot fields (1 byte)
    pub gts: Bytes,
    /// Pending address count (1 byte)
    pub pending_addresses: Bytes,
    /// ZigBee protocol id (1 byte)
    pub protocol_id: Bytes,
    /// Stack profile / protocol version (1 byte)
    pub stack_profile: Bytes,
    /// Router / end-device capability info (1 byte)
    pub capability_info: Bytes,
    /// Extended PAN identifier (8 bytes)
    pub extended_pan_id: Bytes,
    /// TX offset (3 bytes)
    pub tx_offset: Bytes,
    /// Network update identifier (1 byte)
    pub update_id: Bytes,
}

/// A MAC frame split into its constituent byte ranges, in wire order
///
/// The shape never varies: a field that does not exist for the frame's FCF
/// is an empty range, so callers can destructure without re-checking the
/// control bits.
#[derive(Debug, Clone)]
pub struct MacFields {
    /// Frame control field (2 bytes)
    pub fcf: Bytes,
    /// Sequence number (1 byte)
    pub seq: Bytes,
    /// Destination PAN id (2 bytes, empty for beacons)
    pub dst_pan: Bytes,
    /// Destination address (2 or 8 bytes per the FCF)
    pub dst_addr: Bytes,
    /// Source PAN id (2 bytes, empty under intra-PAN compression)
    pub src_pan: Bytes,
    /// Source address (2 or 8 bytes per the FCF)
    pub src_addr: Bytes,
    /// Beacon block, present only for beacon frames
    pub beacon: Option<BeaconFields>,
    /// MAC payload (for beacons: anything past the beacon block)
    pub payload: Bytes,
}

impl MacFields {
    /// Decoded frame control bits
    pub fn frame_control(&self) -> FrameControl {
        FrameControl::from_bytes([self.fcf[0], self.fcf[1]])
    }
}

/// Walks `data` from `offset`, returning the next `len` bytes as a range.
fn take(data: &Bytes, offset: &mut usize, len: usize) -> Result<Bytes> {
    if *offset + len > data.len() {
        return Err(Error::TooShort { len: data.len() });
    }
    let range = data.slice(*offset..*offset + len);
    *offset += len;
    Ok(range)
}

/// Like [`take`], but a frame that has already run out (or runs out here)
/// yields an empty range and stays out — a half-present field must not
/// bleed into the fields after it.
fn take_soft(data: &Bytes, offset: &mut usize, len: usize, exhausted: &mut bool) -> Bytes {
    if *exhausted || *offset + len > data.len() {
        *exhausted = true;
        return Bytes::new();
    }
    let range = data.slice(*offset..*offset + len);
    *offset += len;
    range
}

/// Dissect a MAC frame into its constituent byte ranges.
///
/// Fields are never reordered; each is a view into the original bytes.
/// Beacon frames carry source addressing and the beacon block instead of
/// the destination fields. Fails with [`Error::TooShort`] when the frame
/// cannot hold the header its own FCF describes.
pub fn chop(frame: &[u8]) -> Result<MacFields> {
    if frame.len() < MIN_FRAME_SIZE {
        return Err(Error::TooShort { len: frame.len() });
    }
    let data = Bytes::copy_from_slice(frame);
    let fcf = FrameControl::from_bytes([frame[0], frame[1]]);
    let mut offset = 0;

    let fcf_bytes = take(&data, &mut offset, 2)?;
    let seq = take(&data, &mut offset, 1)?;

    if fcf.frame_type == FrameType::Beacon {
        let src_pan = take(&data, &mut offset, 2)?;
        let src_addr = take(&data, &mut offset, fcf.src_mode.len())?;
        let mut exhausted = false;
        let beacon = BeaconFields {
            superframe: take_soft(&data, &mut offset, 2, &mut exhausted),
            gts: take_soft(&data, &mut offset, 1, &mut exhausted),
            pending_addresses: take_soft(&data, &mut offset, 1, &mut exhausted),
            protocol_id: take_soft(&data, &mut offset, 1, &mut exhausted),
            stack_profile: take_soft(&data, &mut offset, 1, &mut exhausted),
            capability_info: take_soft(&data, &mut offset, 1, &mut exhausted),
            extended_pan_id: take_soft(&data, &mut offset, 8, &mut exhausted),
            tx_offset: take_soft(&data, &mut offset, 3, &mut exhausted),
            update_id: take_soft(&data, &mut offset, 1, &mut exhausted),
        };
        let payload = data.slice(offset..);
        return Ok(MacFields {
            fcf: fcf_bytes,
            seq,
            dst_pan: Bytes::new(),
            dst_addr: Bytes::new(),
            src_pan,
            src_addr,
            beacon: Some(beacon),
            payload,
        });
    }

    let dst_pan = take(&data, &mut offset, 2)?;
    let dst_addr = take(&data, &mut offset, fcf.dst_mode.len())?;
    let src_pan = if fcf.intra_pan {
        Bytes::new()
    } else {
        take(&data, &mut offset, 2)?
    };
    let src_addr = take(&data, &mut offset, fcf.src_mode.len())?;
    let payload = data.slice(offset..);

    Ok(MacFields {
        fcf: fcf_bytes,
        seq,
        dst_pan,
        dst_addr,
        src_pan,
        src_addr,
        beacon: None,
        payload,
    })
}

/// Fluent builder for data frames on the inject path
///
/// Addressing modes follow from which addresses are supplied; the result
/// comes back without an FCS trailer, ready for
/// [`RadioSession::inject`](hornet_core::RadioSession::inject).
#[derive(Debug, Clone, Default)]
pub struct MacFrameBuilder {
    frame_type: Option<FrameType>,
    security: bool,
    ack_request: bool,
    intra_pan: bool,
    seq: u8,
    dst_pan: Option<u16>,
    dst_addr: Option<AddressBytes>,
    src_pan: Option<u16>,
    src_addr: Option<AddressBytes>,
    payload: Vec<u8>,
}

#[derive(Debug, Clone, Copy)]
enum AddressBytes {
    Short(u16),
    Extended(u64),
}

impl AddressBytes {
    fn mode(self) -> AddressingMode {
        match self {
            Self::Short(_) => AddressingMode::Short,
            Self::Extended(_) => AddressingMode::Extended,
        }
    }

    fn put(self, buf: &mut BytesMut) {
        match self {
            Self::Short(v) => buf.put_u16_le(v),
            Self::Extended(v) => buf.put_u64_le(v),
        }
    }
}

impl MacFrameBuilder {
    /// Start a new builder (data frame, intra-PAN, by default)
    pub fn new() -> Self {
        Self {
            intra_pan: true,
            ..Default::default()
        }
    }

    /// Override the frame type (defaults to data)
    pub fn frame_type(mut self, frame_type: FrameType) -> Self {
        self.frame_type = Some(frame_type);
        self
    }

    /// Set the FCF security bit
    pub fn security(mut self, security: bool) -> Self {
        self.security = security;
        self
    }

    /// Request an acknowledgment
    pub fn ack_request(mut self, ack: bool) -> Self {
        self.ack_request = ack;
        self
    }

    /// Control intra-PAN source-PAN compression
    pub fn intra_pan(mut self, intra_pan: bool) -> Self {
        self.intra_pan = intra_pan;
        self
    }

    /// Sequence number
    pub fn seq(mut self, seq: u8) -> Self {
        self.seq = seq;
        self
    }

    /// Destination PAN id
    pub fn dst_pan(mut self, pan: u16) -> Self {
        self.dst_pan = Some(pan);
        self
    }

    /// 16-bit destination address
    pub fn dst_short(mut self, addr: u16) -> Self {
        self.dst_addr = Some(AddressBytes::Short(addr));
        self
    }

    /// 64-bit destination address
    pub fn dst_extended(mut self, addr: u64) -> Self {
        self.dst_addr = Some(AddressBytes::Extended(addr));
        self
    }

    /// Source PAN id (ignored under intra-PAN compression)
    pub fn src_pan(mut self, pan: u16) -> Self {
        self.src_pan = Some(pan);
        self
    }

    /// 16-bit source address
    pub fn src_short(mut self, addr: u16) -> Self {
        self.src_addr = Some(AddressBytes::Short(addr));
        self
    }

    /// 64-bit source address
    pub fn src_extended(mut self, addr: u64) -> Self {
        self.src_addr = Some(AddressBytes::Extended(addr));
        self
    }

    /// MAC payload bytes
    pub fn payload(mut self, payload: &[u8]) -> Self {
        self.payload = payload.to_vec();
        self
    }

    /// Assemble the frame (without FCS)
    pub fn build(self) -> Result<Vec<u8>> {
        let fcf = FrameControl {
            frame_type: self.frame_type.unwrap_or(FrameType::Data),
            security: self.security,
            frame_pending: false,
            ack_request: self.ack_request,
            intra_pan: self.intra_pan,
            dst_mode: self
                .dst_addr
                .map(AddressBytes::mode)
                .unwrap_or(AddressingMode::None),
            version: 0,
            src_mode: self
                .src_addr
                .map(AddressBytes::mode)
                .unwrap_or(AddressingMode::None),
        };

        let mut buf = BytesMut::with_capacity(MIN_FRAME_SIZE + 12 + self.payload.len());
        buf.put_u16_le(fcf.to_bits());
        buf.put_u8(self.seq);
        if let Some(dst) = self.dst_addr {
            buf.put_u16_le(self.dst_pan.unwrap_or(0xffff));
            dst.put(&mut buf);
        }
        if let Some(src) = self.src_addr {
            if !self.intra_pan {
                buf.put_u16_le(self.src_pan.unwrap_or(0xffff));
            }
            src.put(&mut buf);
        }
        buf.put_slice(&self.payload);

        if buf.len() > MAX_INJECT_SIZE {
            return Err(Error::InvalidFrame(format!(
                "Built frame of {} bytes exceeds the {} byte air limit",
                buf.len(),
                MAX_INJECT_SIZE
            )));
        }
        Ok(buf.to_vec())
    }
}
