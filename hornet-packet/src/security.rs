//! ZigBee frame security transform
//!
//! When the MAC frame-control security bit is set, the payload starts with
//! a 14-byte auxiliary header — control byte, 4-byte frame counter, key
//! sequence number, 8-byte source address — followed by the ciphertext and
//! a trailing encrypted 8-byte MIC. The transform binds the MAC header and
//! the first six auxiliary bytes into the authenticated data, and builds
//! the CCM* nonce from the auxiliary fields byte-reversed. Only the
//! ENC-MIC-64 level is implemented; it is the one deployed ZigBee
//! application payloads use.

use crate::ccm;
use crate::mac;
use hornet_core::{Error, ExtendedAddress, Result};

/// Offset of the ciphertext past the auxiliary security header
pub const AUX_HEADER_LEN: usize = 14;

/// Bytes of the auxiliary header bound into the authenticated data
/// (control, frame counter, key sequence number)
pub const PREAMBLE_LEN: usize = 6;

/// MIC length of the one implemented security level
pub const MIC_LEN: usize = 8;

/// The eight 802.15.4 security levels (control-byte bits 0-2)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityLevel {
    None,
    Mic32,
    Mic64,
    Mic128,
    Enc,
    EncMic32,
    EncMic64,
    EncMic128,
}

impl SecurityLevel {
    /// Decode from the low three control-byte bits
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => Self::None,
            1 => Self::Mic32,
            2 => Self::Mic64,
            3 => Self::Mic128,
            4 => Self::Enc,
            5 => Self::EncMic32,
            6 => Self::EncMic64,
            _ => Self::EncMic128,
        }
    }

    /// Encode into the low three control-byte bits
    pub fn to_bits(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Mic32 => 1,
            Self::Mic64 => 2,
            Self::Mic128 => 3,
            Self::Enc => 4,
            Self::EncMic32 => 5,
            Self::EncMic64 => 6,
            Self::EncMic128 => 7,
        }
    }

    /// Length of the integrity code this level carries
    pub fn mic_len(self) -> usize {
        match self {
            Self::None | Self::Enc => 0,
            Self::Mic32 | Self::EncMic32 => 4,
            Self::Mic64 | Self::EncMic64 => 8,
            Self::Mic128 | Self::EncMic128 => 16,
        }
    }

    /// Whether the payload is encrypted (not just authenticated)
    pub fn encrypted(self) -> bool {
        matches!(
            self,
            Self::Enc | Self::EncMic32 | Self::EncMic64 | Self::EncMic128
        )
    }
}

/// Parsed auxiliary security header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecurityHeader {
    /// Raw control byte (level in bits 0-2, key identifier above)
    pub control: u8,
    /// Security level decoded from the control byte
    pub level: SecurityLevel,
    /// Outgoing frame counter
    pub frame_counter: u32,
    /// Key sequence number
    pub key_seq: u8,
    /// Source address the nonce is derived from
    pub source: ExtendedAddress,
}

impl SecurityHeader {
    /// Parse the auxiliary header from the head of a secured MAC payload.
    ///
    /// The payload must also leave room for at least one body byte past
    /// the header, mirroring what the radio hands us for the shortest
    /// real secured frame.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        if payload.len() < AUX_HEADER_LEN + 1 {
            return Err(Error::BadPayloadLength { len: payload.len() });
        }
        let control = payload[0];
        let mut counter = [0u8; 4];
        counter.copy_from_slice(&payload[1..5]);
        let mut source = [0u8; 8];
        source.copy_from_slice(&payload[6..14]);
        Ok(Self {
            control,
            level: SecurityLevel::from_bits(control),
            frame_counter: u32::from_le_bytes(counter),
            key_seq: payload[5],
            source: ExtendedAddress::from_le_bytes(source),
        })
    }

    /// Wire representation of the auxiliary header
    pub fn to_bytes(&self) -> [u8; AUX_HEADER_LEN] {
        let mut out = [0u8; AUX_HEADER_LEN];
        out[0] = self.control;
        out[1..5].copy_from_slice(&self.frame_counter.to_le_bytes());
        out[5] = self.key_seq;
        out[6..14].copy_from_slice(&self.source.to_le_bytes());
        out
    }
}

/// CCM* nonce for a secured frame: reversed source address, reversed frame
/// counter, control byte.
///
/// Returns `Ok(None)` when the frame-control security bit is clear; the
/// frame simply has no nonce. Fails with [`Error::TooShort`] when the
/// frame cannot be dissected at all.
pub fn nonce(frame: &[u8]) -> Result<Option<[u8; ccm::NONCE_LEN]>> {
    let hdr = mac::hdrlen(frame)?;
    let fcf = mac::FrameControl::from_bytes([frame[0], frame[1]]);
    if !fcf.security {
        return Ok(None);
    }
    if frame.len() < hdr {
        return Err(Error::TooShort { len: frame.len() });
    }
    let payload = &frame[hdr..];
    if payload.len() < AUX_HEADER_LEN + 1 {
        return Err(Error::BadPayloadLength { len: payload.len() });
    }
    Ok(Some(nonce_from_parts(payload)))
}

/// Assemble the nonce from a secured payload's auxiliary fields
fn nonce_from_parts(payload: &[u8]) -> [u8; ccm::NONCE_LEN] {
    let mut nonce = [0u8; ccm::NONCE_LEN];
    for (i, b) in payload[6..14].iter().rev().enumerate() {
        nonce[i] = *b;
    }
    for (i, b) in payload[1..5].iter().rev().enumerate() {
        nonce[8 + i] = *b;
    }
    nonce[12] = payload[0];
    nonce
}

/// Header and payload views a security operation works on
struct SecuredParts<'a> {
    header: &'a [u8],
    payload: &'a [u8],
}

fn secured_parts<'a>(frame: &'a [u8], key: &[u8]) -> Result<SecuredParts<'a>> {
    if key.len() != ccm::KEY_LEN {
        return Err(Error::BadKeyLength(key.len()));
    }
    let hdr = mac::hdrlen(frame)?;
    if frame.len() < hdr {
        return Err(Error::TooShort { len: frame.len() });
    }
    let fcf = mac::FrameControl::from_bytes([frame[0], frame[1]]);
    if !fcf.security {
        return Err(Error::UnsupportedSecurityLevel(
            SecurityLevel::None.to_bits(),
        ));
    }
    let payload = &frame[hdr..];
    if payload.len() < AUX_HEADER_LEN + 1 {
        return Err(Error::BadPayloadLength { len: payload.len() });
    }
    let level = SecurityLevel::from_bits(payload[0]);
    if level != SecurityLevel::EncMic64 {
        return Err(Error::UnsupportedSecurityLevel(level.to_bits()));
    }
    Ok(SecuredParts {
        header: &frame[..hdr],
        payload,
    })
}

/// Authenticated data: the MAC header followed by the security preamble
fn adata(parts: &SecuredParts<'_>) -> Vec<u8> {
    let mut a = Vec::with_capacity(parts.header.len() + PREAMBLE_LEN);
    a.extend_from_slice(parts.header);
    a.extend_from_slice(&parts.payload[..PREAMBLE_LEN]);
    a
}

/// Decrypt a secured frame's application payload.
///
/// `frame` is the complete MAC frame with its FCS already stripped. The
/// plaintext is released only when the MIC verifies; a mismatch is
/// [`Error::AuthenticationFailure`], distinct from any parse error.
pub fn decrypt(frame: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    let parts = secured_parts(frame, key)?;
    let body = &parts.payload[AUX_HEADER_LEN..];
    if body.len() < MIC_LEN {
        return Err(Error::BadPayloadLength {
            len: parts.payload.len(),
        });
    }
    let (ciphertext, mic) = body.split_at(body.len() - MIC_LEN);
    let nonce = nonce_from_parts(parts.payload);
    ccm::decrypt(key, &nonce, &adata(&parts), ciphertext, mic)
}

/// Encrypt `plaintext` in the context of a secured frame.
///
/// `frame` supplies the MAC header and auxiliary security header the nonce
/// and authenticated data are derived from; its existing body bytes are
/// ignored. Returns `ciphertext ‖ MIC`, ready to splice back in after the
/// auxiliary header.
pub fn encrypt(frame: &[u8], plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    let parts = secured_parts(frame, key)?;
    let nonce = nonce_from_parts(parts.payload);
    let (mut ciphertext, mic) = ccm::encrypt(key, &nonce, &adata(&parts), plaintext, MIC_LEN)?;
    ciphertext.extend_from_slice(&mic);
    Ok(ciphertext)
}

/// Encrypt `plaintext` and reassemble the whole frame around it.
pub fn apply_encryption(frame: &[u8], plaintext: &[u8], key: &[u8]) -> Result<Vec<u8>> {
    let body = encrypt(frame, plaintext, key)?;
    let hdr = mac::hdrlen(frame)?;
    let mut out = Vec::with_capacity(hdr + AUX_HEADER_LEN + body.len());
    out.extend_from_slice(&frame[..hdr]);
    out.extend_from_slice(&frame[hdr..hdr + AUX_HEADER_LEN]);
    out.extend_from_slice(&body);
    Ok(out)
}
