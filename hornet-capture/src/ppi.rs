//! Per-packet information radio metadata
//!
//! When a capture uses [`DLT_PPI`](crate::pcap::DLT_PPI), each frame is
//! prefixed with a small header carrying radio metadata the bare 802.15.4
//! datalink cannot express: the channel frequency the sniffer was tuned
//! to, the antenna signal level, and optionally a GPS fix. The layout is a
//! packet header (version, flags, total length, encapsulated datalink)
//! followed by type-length-value fields; unknown field types are skipped
//! on read so captures from richer writers stay loadable.

use bytes::{BufMut, BytesMut};
use hornet_core::{Error, Result};

/// PPI header version we read and write
pub const PPI_VERSION: u8 = 0;
/// Fixed packet-header length
pub const PPI_HEADER_LEN: usize = 8;

/// Radio field: channel frequency (kHz, 4 bytes) + antenna signal (dBm, 1 byte)
pub const PPI_FIELD_RADIO: u16 = 2;
/// Geolocation field: latitude, longitude (1e-7 degree fixed point), altitude (mm)
pub const PPI_FIELD_GPS: u16 = 30002;

const RADIO_FIELD_LEN: usize = 5;
const GPS_FIELD_LEN: usize = 12;

/// A GPS fix attached to a capture record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geolocation {
    /// Latitude in 1e-7 degrees
    pub lat_e7: i32,
    /// Longitude in 1e-7 degrees
    pub lon_e7: i32,
    /// Altitude in millimetres
    pub alt_mm: i32,
}

impl Geolocation {
    /// Build from floating-point degrees and metres
    pub fn from_degrees(lat: f64, lon: f64, alt_m: f64) -> Self {
        Self {
            lat_e7: (lat * 1e7) as i32,
            lon_e7: (lon * 1e7) as i32,
            alt_mm: (alt_m * 1000.0) as i32,
        }
    }
}

/// Radio metadata prepended to one captured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PpiHeader {
    /// Channel center frequency in kHz
    pub freq_khz: u32,
    /// Antenna signal in dBm
    pub signal_dbm: i8,
    /// GPS fix, when the capture host had one
    pub geo: Option<Geolocation>,
}

impl PpiHeader {
    /// Encode the header, recording `dlt` as the encapsulated datalink
    pub fn encode(&self, dlt: u32) -> Vec<u8> {
        let mut fields = BytesMut::new();
        fields.put_u16_le(PPI_FIELD_RADIO);
        fields.put_u16_le(RADIO_FIELD_LEN as u16);
        fields.put_u32_le(self.freq_khz);
        fields.put_i8(self.signal_dbm);
        if let Some(geo) = self.geo {
            fields.put_u16_le(PPI_FIELD_GPS);
            fields.put_u16_le(GPS_FIELD_LEN as u16);
            fields.put_i32_le(geo.lat_e7);
            fields.put_i32_le(geo.lon_e7);
            fields.put_i32_le(geo.alt_mm);
        }

        let total = PPI_HEADER_LEN + fields.len();
        let mut out = BytesMut::with_capacity(total);
        out.put_u8(PPI_VERSION);
        out.put_u8(0); // flags
        out.put_u16_le(total as u16);
        out.put_u32_le(dlt);
        out.put_slice(&fields);
        out.to_vec()
    }

    /// Prepend this header to a frame
    pub fn prepend(&self, dlt: u32, frame: &[u8]) -> Vec<u8> {
        let mut out = self.encode(dlt);
        out.extend_from_slice(frame);
        out
    }

    /// Decode a PPI-prefixed record, returning the header, the
    /// encapsulated datalink, and the frame bytes that follow.
    pub fn decode(data: &[u8]) -> Result<(PpiHeader, u32, &[u8])> {
        if data.len() < PPI_HEADER_LEN {
            return Err(Error::capture("Truncated PPI packet header"));
        }
        if data[0] != PPI_VERSION {
            return Err(Error::Capture(format!("Unknown PPI version {}", data[0])));
        }
        let total = usize::from(u16::from_le_bytes([data[2], data[3]]));
        if total < PPI_HEADER_LEN || total > data.len() {
            return Err(Error::capture("PPI length field out of range"));
        }
        let dlt = u32::from_le_bytes([data[4], data[5], data[6], data[7]]);

        let mut header = PpiHeader {
            freq_khz: 0,
            signal_dbm: 0,
            geo: None,
        };
        let mut offset = PPI_HEADER_LEN;
        while offset + 4 <= total {
            let field_type = u16::from_le_bytes([data[offset], data[offset + 1]]);
            let field_len = usize::from(u16::from_le_bytes([data[offset + 2], data[offset + 3]]));
            offset += 4;
            if offset + field_len > total {
                return Err(Error::capture("PPI field overruns its header"));
            }
            let field = &data[offset..offset + field_len];
            match field_type {
                PPI_FIELD_RADIO if field_len == RADIO_FIELD_LEN => {
                    header.freq_khz = u32::from_le_bytes([field[0], field[1], field[2], field[3]]);
                    header.signal_dbm = field[4] as i8;
                }
                PPI_FIELD_GPS if field_len == GPS_FIELD_LEN => {
                    header.geo = Some(Geolocation {
                        lat_e7: i32::from_le_bytes([field[0], field[1], field[2], field[3]]),
                        lon_e7: i32::from_le_bytes([field[4], field[5], field[6], field[7]]),
                        alt_mm: i32::from_le_bytes([field[8], field[9], field[10], field[11]]),
                    });
                }
                // Unknown or oddly-sized fields are skipped, not fatal
                _ => {}
            }
            offset += field_len;
        }

        Ok((header, dlt, &data[total..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcap::DLT_IEEE802_15_4_WITHFCS;

    #[test]
    fn round_trip_without_gps() {
        let header = PpiHeader {
            freq_khz: 2_405_000,
            signal_dbm: -72,
            geo: None,
        };
        let record = header.prepend(DLT_IEEE802_15_4_WITHFCS, &[0x61, 0x88, 0x42]);
        let (decoded, dlt, frame) = PpiHeader::decode(&record).unwrap();
        assert_eq!(decoded, header);
        assert_eq!(dlt, DLT_IEEE802_15_4_WITHFCS);
        assert_eq!(frame, &[0x61, 0x88, 0x42]);
    }

    #[test]
    fn round_trip_with_gps() {
        let header = PpiHeader {
            freq_khz: 868_650,
            signal_dbm: -51,
            geo: Some(Geolocation::from_degrees(52.379189, 4.899431, 12.5)),
        };
        let record = header.prepend(DLT_IEEE802_15_4_WITHFCS, &[0xaa]);
        let (decoded, _, frame) = PpiHeader::decode(&record).unwrap();
        assert_eq!(decoded.geo.unwrap().lat_e7, 523_791_890);
        assert_eq!(decoded.geo.unwrap().lon_e7, 48_994_310);
        assert_eq!(decoded.geo.unwrap().alt_mm, 12_500);
        assert_eq!(frame, &[0xaa]);
    }

    #[test]
    fn unknown_fields_are_skipped() {
        let header = PpiHeader {
            freq_khz: 2_480_000,
            signal_dbm: -60,
            geo: None,
        };
        let mut record = header.encode(DLT_IEEE802_15_4_WITHFCS);
        // Splice in an unknown 3-byte field and fix up the total length
        record.extend_from_slice(&0x7fffu16.to_le_bytes());
        record.extend_from_slice(&3u16.to_le_bytes());
        record.extend_from_slice(&[0x01, 0x02, 0x03]);
        let total = record.len() as u16;
        record[2..4].copy_from_slice(&total.to_le_bytes());
        record.push(0x42); // the frame

        let (decoded, _, frame) = PpiHeader::decode(&record).unwrap();
        assert_eq!(decoded.freq_khz, 2_480_000);
        assert_eq!(frame, &[0x42]);
    }

    #[test]
    fn truncated_header_is_an_error() {
        assert!(matches!(
            PpiHeader::decode(&[0x00, 0x00, 0x08]),
            Err(Error::Capture(_))
        ));
    }

    #[test]
    fn overrunning_length_is_an_error() {
        let header = PpiHeader {
            freq_khz: 1,
            signal_dbm: 0,
            geo: None,
        };
        let mut record = header.encode(DLT_IEEE802_15_4_WITHFCS);
        record[2..4].copy_from_slice(&0xffffu16.to_le_bytes());
        assert!(matches!(
            PpiHeader::decode(&record),
            Err(Error::Capture(_))
        ));
    }
}
