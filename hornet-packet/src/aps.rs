//! ZigBee application support sub-layer frame dissection
//!
//! The APS header is keyed off a single frame-control byte: the frame type
//! picks data/command/ack handling and the two delivery-mode bits pick
//! which addressing fields exist. Indirect delivery is a legacy of older
//! stack revisions; it is dissected with its historical layout (no
//! destination endpoint) rather than rejected, since deployed firmware
//! still emits it.

use bytes::Bytes;
use hornet_core::{Error, Result};

/// APS frame types (2-bit field)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApsFrameType {
    Data,
    Command,
    Ack,
    Reserved(u8),
}

impl ApsFrameType {
    /// Decode from the low frame-control bits
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::Data,
            1 => Self::Command,
            2 => Self::Ack,
            other => Self::Reserved(other),
        }
    }
}

/// APS delivery modes (frame-control bits 2-3)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    Unicast,
    /// Legacy indirect addressing: no destination endpoint on the wire
    Indirect,
    Broadcast,
    Group,
}

impl DeliveryMode {
    /// Decode from frame-control bits 2-3
    pub fn from_bits(bits: u8) -> Self {
        match (bits >> 2) & 0x03 {
            0 => Self::Unicast,
            1 => Self::Indirect,
            2 => Self::Broadcast,
            _ => Self::Group,
        }
    }
}

/// Decoded APS frame control byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApsFrameControl {
    pub frame_type: ApsFrameType,
    pub delivery_mode: DeliveryMode,
    /// APS-layer security applied
    pub security: bool,
    pub ack_request: bool,
    /// Extended (fragmentation) header present
    pub extended_header: bool,
}

impl ApsFrameControl {
    /// Decode from the frame-control byte
    pub fn from_bits(bits: u8) -> Self {
        Self {
            frame_type: ApsFrameType::from_bits(bits),
            delivery_mode: DeliveryMode::from_bits(bits),
            security: bits & 0x20 != 0,
            ack_request: bits & 0x40 != 0,
            extended_header: bits & 0x80 != 0,
        }
    }
}

/// An APS frame split into byte ranges, in wire order
///
/// Addressing fields not present for the frame's type and delivery mode
/// are empty ranges; the shape never varies.
#[derive(Debug, Clone)]
pub struct ApsFields {
    /// Frame control (1 byte)
    pub frame_control: Bytes,
    /// Destination endpoint (1 byte for unicast/broadcast data and acks)
    pub dst_endpoint: Bytes,
    /// Group address (2 bytes for group delivery)
    pub group_address: Bytes,
    /// Cluster identifier (2 bytes)
    pub cluster: Bytes,
    /// Profile identifier (2 bytes)
    pub profile: Bytes,
    /// Source endpoint (1 byte)
    pub src_endpoint: Bytes,
    /// APS counter (1 byte)
    pub counter: Bytes,
    /// Extended frame control (1 byte when the extended header is present)
    pub ext_control: Bytes,
    /// Fragmentation block number (1 byte when the extended header is present)
    pub block_number: Bytes,
    /// APS payload
    pub payload: Bytes,
}

impl ApsFields {
    /// Decoded frame control bits
    pub fn frame_control_bits(&self) -> ApsFrameControl {
        ApsFrameControl::from_bits(self.frame_control[0])
    }
}

fn take(data: &Bytes, offset: &mut usize, len: usize) -> Result<Bytes> {
    if *offset + len > data.len() {
        return Err(Error::TooShort { len: data.len() });
    }
    let range = data.slice(*offset..*offset + len);
    *offset += len;
    Ok(range)
}

/// Dissect an APS frame (a NWK payload) into its byte ranges.
pub fn chop(data: &[u8]) -> Result<ApsFields> {
    if data.is_empty() {
        return Err(Error::TooShort { len: 0 });
    }
    let fcf = ApsFrameControl::from_bits(data[0]);
    let data = Bytes::copy_from_slice(data);
    let mut offset = 0;

    let frame_control = take(&data, &mut offset, 1)?;

    let mut dst_endpoint = Bytes::new();
    let mut group_address = Bytes::new();
    let mut cluster = Bytes::new();
    let mut profile = Bytes::new();
    let mut src_endpoint = Bytes::new();

    // Commands (and reserved types) carry no addressing fields; data and
    // acknowledgment frames address per their delivery mode.
    if matches!(fcf.frame_type, ApsFrameType::Data | ApsFrameType::Ack) {
        match fcf.delivery_mode {
            DeliveryMode::Unicast | DeliveryMode::Broadcast => {
                dst_endpoint = take(&data, &mut offset, 1)?;
            }
            DeliveryMode::Indirect => {}
            DeliveryMode::Group => {
                group_address = take(&data, &mut offset, 2)?;
            }
        }
        cluster = take(&data, &mut offset, 2)?;
        profile = take(&data, &mut offset, 2)?;
        src_endpoint = take(&data, &mut offset, 1)?;
    }

    let counter = take(&data, &mut offset, 1)?;

    let (ext_control, block_number) = if fcf.extended_header {
        (take(&data, &mut offset, 1)?, take(&data, &mut offset, 1)?)
    } else {
        (Bytes::new(), Bytes::new())
    };

    let payload = data.slice(offset..);
    Ok(ApsFields {
        frame_control,
        dst_endpoint,
        group_address,
        cluster,
        profile,
        src_endpoint,
        counter,
        ext_control,
        block_number,
        payload,
    })
}

/// APS header length for a frame, walking the same decision table as
/// [`chop`].
pub fn hdrlen(data: &[u8]) -> Result<usize> {
    let fields = chop(data)?;
    Ok(data.len() - fields.payload.len())
}

/// APS payload length for a frame.
pub fn payloadlen(data: &[u8]) -> Result<usize> {
    Ok(chop(data)?.payload.len())
}
