//! ZigBee network-layer frame dissection
//!
//! Operates on the MAC payload one layer up the stack. The fixed part is
//! eight bytes (frame control, destination, source, radius, sequence); the
//! extended addresses, multicast control, and source-route subframe are
//! gated by frame-control bits and appear in that wire order. When the
//! multicast and source-route bits combine, both fields are parsed, in
//! order — the ambiguity some stacks leave here is resolved explicitly and
//! covered by tests.

use bytes::Bytes;
use hornet_core::{Error, Result};

/// Fixed NWK header bytes before any optional field
pub const MIN_HEADER_SIZE: usize = 8;

/// NWK frame types (2-bit field)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NwkFrameType {
    Data,
    Command,
    Reserved(u8),
}

impl NwkFrameType {
    /// Decode from the low frame-control bits
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Self::Data,
            1 => Self::Command,
            other => Self::Reserved(other),
        }
    }
}

/// Decoded 16-bit NWK frame control field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NwkFrameControl {
    pub frame_type: NwkFrameType,
    /// Protocol version bits
    pub protocol_version: u8,
    /// Route discovery bits
    pub discover_route: u8,
    /// Multicast control byte present
    pub multicast: bool,
    /// NWK-layer security applied
    pub security: bool,
    /// Source-route subframe present
    pub source_route: bool,
    /// Extended destination address present
    pub dst_ieee: bool,
    /// Extended source address present
    pub src_ieee: bool,
}

impl NwkFrameControl {
    /// Decode from the 16-bit little-endian value
    pub fn from_bits(bits: u16) -> Self {
        Self {
            frame_type: NwkFrameType::from_bits(bits as u8),
            protocol_version: ((bits >> 2) & 0x0f) as u8,
            discover_route: ((bits >> 6) & 0x03) as u8,
            multicast: bits & 0x0100 != 0,
            security: bits & 0x0200 != 0,
            source_route: bits & 0x0400 != 0,
            dst_ieee: bits & 0x0800 != 0,
            src_ieee: bits & 0x1000 != 0,
        }
    }

    /// Decode from the first two bytes of a NWK frame
    pub fn from_bytes(bytes: [u8; 2]) -> Self {
        Self::from_bits(u16::from_le_bytes(bytes))
    }
}

/// A NWK frame split into byte ranges, in wire order
///
/// Optional fields not present for the frame's control bits are empty
/// ranges; the shape never varies.
#[derive(Debug, Clone)]
pub struct NwkFields {
    /// Frame control (2 bytes)
    pub frame_control: Bytes,
    /// 16-bit destination address (2 bytes)
    pub destination: Bytes,
    /// 16-bit source address (2 bytes)
    pub source: Bytes,
    /// Radius (1 byte)
    pub radius: Bytes,
    /// Sequence number (1 byte)
    pub sequence: Bytes,
    /// 64-bit destination address (8 bytes when present)
    pub ext_destination: Bytes,
    /// 64-bit source address (8 bytes when present)
    pub ext_source: Bytes,
    /// Multicast control (1 byte when present)
    pub multicast_control: Bytes,
    /// Source-route relay count (1 byte when present)
    pub relay_count: Bytes,
    /// Source-route relay index (1 byte when present)
    pub relay_index: Bytes,
    /// Source-route relay list (2 bytes per relay)
    pub relay_list: Bytes,
    /// NWK payload
    pub payload: Bytes,
}

impl NwkFields {
    /// Decoded frame control bits
    pub fn frame_control_bits(&self) -> NwkFrameControl {
        NwkFrameControl::from_bytes([self.frame_control[0], self.frame_control[1]])
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

/// Dissect a NWK frame (a MAC payload) into its byte ranges.
pub fn chop(data: &[u8]) -> Result<NwkFields> {
    if data.len() < MIN_HEADER_SIZE {
        return Err(Error::TooShort { len: data.len() });
    }
    let fcf = NwkFrameControl::from_bytes([data[0], data[1]]);
    let data = Bytes::copy_from_slice(data);
    let mut offset = 0;

    let frame_control = take(&data, &mut offset, 2)?;
    let destination = take(&data, &mut offset, 2)?;
    let source = take(&data, &mut offset, 2)?;
    let radius = take(&data, &mut offset, 1)?;
    let sequence = take(&data, &mut offset, 1)?;

    let ext_destination = if fcf.dst_ieee {
        take(&data, &mut offset, 8)?
    } else {
        Bytes::new()
    };
    let ext_source = if fcf.src_ieee {
        take(&data, &mut offset, 8)?
    } else {
        Bytes::new()
    };
    let multicast_control = if fcf.multicast {
        take(&data, &mut offset, 1)?
    } else {
        Bytes::new()
    };

    let (relay_count, relay_index, relay_list) = if fcf.source_route {
        let count = take(&data, &mut offset, 1)?;
        let index = take(&data, &mut offset, 1)?;
        let list = take(&data, &mut offset, usize::from(count[0]) * 2)?;
        (count, index, list)
    } else {
        (Bytes::new(), Bytes::new(), Bytes::new())
    };

    let payload = data.slice(offset..);
    Ok(NwkFields {
        frame_control,
        destination,
        source,
        radius,
        sequence,
        ext_destination,
        ext_source,
        multicast_control,
        relay_count,
        relay_index,
        relay_list,
        payload,
    })
}

/// NWK header length for a frame, walking the same decision table as
/// [`chop`].
pub fn hdrlen(data: &[u8]) -> Result<usize> {
    let fields = chop(data)?;
    Ok(data.len() - fields.payload.len())
}

/// NWK payload length for a frame.
pub fn payloadlen(data: &[u8]) -> Result<usize> {
    Ok(chop(data)?.payload.len())
}
