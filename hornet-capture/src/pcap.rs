//! pcap capture file reading and writing
//!
//! The classic libpcap container: a fixed global header followed by
//! per-record headers and frame bytes, everything in the byte order the
//! writing host used. We always write little-endian; the reader accepts
//! either order by sniffing the magic.

use bytes::{BufMut, BytesMut};
use hornet_core::{Error, Result};
use std::io::{Read, Write};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

/// pcap magic, native byte order
pub const PCAP_MAGIC: u32 = 0xa1b2_c3d4;
/// pcap magic as seen when the writer's byte order differs from ours
pub const PCAP_MAGIC_SWAPPED: u32 = 0xd4c3_b2a1;
/// Format version written to the global header
pub const PCAP_VERSION_MAJOR: u16 = 2;
pub const PCAP_VERSION_MINOR: u16 = 4;
/// Snapshot length written to the global header
pub const DEFAULT_SNAPLEN: u32 = 65535;

/// 802.15.4 frames with the FCS trailer present
pub const DLT_IEEE802_15_4_WITHFCS: u32 = 195;
/// 802.15.4 frames with the FCS already stripped
pub const DLT_IEEE802_15_4_NOFCS: u32 = 230;
/// Per-packet-information header prepended to each frame
pub const DLT_PPI: u32 = 192;

/// One record read back from a capture
#[derive(Debug, Clone)]
pub struct PcapRecord {
    /// Capture timestamp
    pub timestamp: SystemTime,
    /// Captured bytes (`incl_len` of them)
    pub bytes: Vec<u8>,
    /// Original on-air length, which may exceed `bytes.len()` for
    /// truncated captures
    pub orig_len: u32,
}

/// Streaming pcap writer
pub struct PcapDumper<W: Write> {
    writer: W,
    records: u64,
}

impl<W: Write> PcapDumper<W> {
    /// Create a dumper and emit the global header for `datalink`
    pub fn new(mut writer: W, datalink: u32) -> Result<Self> {
        let mut header = BytesMut::with_capacity(24);
        header.put_u32_le(PCAP_MAGIC);
        header.put_u16_le(PCAP_VERSION_MAJOR);
        header.put_u16_le(PCAP_VERSION_MINOR);
        header.put_u32_le(0); // thiszone
        header.put_u32_le(0); // sigfigs
        header.put_u32_le(DEFAULT_SNAPLEN);
        header.put_u32_le(datalink);
        writer.write_all(&header)?;
        Ok(Self { writer, records: 0 })
    }

    /// Append one frame with its capture timestamp
    pub fn dump(&mut self, timestamp: SystemTime, frame: &[u8]) -> Result<()> {
        let since_epoch = timestamp
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        let mut record = BytesMut::with_capacity(16 + frame.len());
        record.put_u32_le(since_epoch.as_secs() as u32);
        record.put_u32_le(since_epoch.subsec_micros());
        record.put_u32_le(frame.len() as u32);
        record.put_u32_le(frame.len() as u32);
        record.put_slice(frame);
        self.writer.write_all(&record)?;
        self.records += 1;
        Ok(())
    }

    /// Flush the underlying writer
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    /// Number of records written so far
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Flush and hand back the underlying writer
    pub fn into_inner(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Streaming pcap reader
#[derive(Debug)]
pub struct PcapReader<R: Read> {
    reader: R,
    swapped: bool,
    datalink: u32,
}

impl<R: Read> PcapReader<R> {
    /// Open a capture and validate its global header
    pub fn new(mut reader: R) -> Result<Self> {
        let mut header = [0u8; 24];
        reader
            .read_exact(&mut header)
            .map_err(|_| Error::capture("Truncated pcap global header"))?;

        let magic = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let swapped = match magic {
            PCAP_MAGIC => false,
            PCAP_MAGIC_SWAPPED => true,
            other => {
                return Err(Error::Capture(format!(
                    "Bad pcap magic 0x{:08x}",
                    other
                )))
            }
        };

        let datalink = read_u32(&header[20..24], swapped);
        debug!(swapped, datalink, "Opened pcap stream");
        Ok(Self {
            reader,
            swapped,
            datalink,
        })
    }

    /// Datalink value from the global header
    pub fn datalink(&self) -> u32 {
        self.datalink
    }

    /// Read the next record; `None` at a clean end of stream
    pub fn next_record(&mut self) -> Result<Option<PcapRecord>> {
        // A clean end of stream lands exactly on a record boundary; a torn
        // header is a damaged capture.
        let mut header = [0u8; 16];
        let mut filled = 0;
        while filled < header.len() {
            let n = self.reader.read(&mut header[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        if filled < header.len() {
            return Err(Error::capture("Truncated pcap record header"));
        }

        let ts_sec = read_u32(&header[0..4], self.swapped);
        let ts_usec = read_u32(&header[4..8], self.swapped);
        let incl_len = read_u32(&header[8..12], self.swapped);
        let orig_len = read_u32(&header[12..16], self.swapped);

        if incl_len > DEFAULT_SNAPLEN {
            return Err(Error::Capture(format!(
                "Record claims {} bytes, over the snap length",
                incl_len
            )));
        }

        let mut bytes = vec![0u8; incl_len as usize];
        self.reader
            .read_exact(&mut bytes)
            .map_err(|_| Error::capture("Truncated pcap record"))?;

        let timestamp = UNIX_EPOCH
            + Duration::from_secs(u64::from(ts_sec))
            + Duration::from_micros(u64::from(ts_usec));
        Ok(Some(PcapRecord {
            timestamp,
            bytes,
            orig_len,
        }))
    }
}

fn read_u32(bytes: &[u8], swapped: bool) -> u32 {
    let arr = [bytes[0], bytes[1], bytes[2], bytes[3]];
    if swapped {
        u32::from_be_bytes(arr)
    } else {
        u32::from_le_bytes(arr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn write_then_read_round_trip() {
        let mut dumper = PcapDumper::new(Vec::new(), DLT_IEEE802_15_4_WITHFCS).unwrap();
        let ts = UNIX_EPOCH + Duration::new(1_700_000_000, 123_456_000);
        dumper.dump(ts, &[0x61, 0x88, 0x42]).unwrap();
        dumper.dump(ts + Duration::from_millis(5), &[0x02, 0x00]).unwrap();
        assert_eq!(dumper.records(), 2);
        let buffer = dumper.into_inner().unwrap();

        let mut reader = PcapReader::new(Cursor::new(buffer)).unwrap();
        assert_eq!(reader.datalink(), DLT_IEEE802_15_4_WITHFCS);

        let first = reader.next_record().unwrap().unwrap();
        assert_eq!(first.bytes, vec![0x61, 0x88, 0x42]);
        assert_eq!(first.orig_len, 3);
        assert_eq!(first.timestamp, ts);

        let second = reader.next_record().unwrap().unwrap();
        assert_eq!(second.bytes, vec![0x02, 0x00]);

        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn global_header_layout() {
        let dumper = PcapDumper::new(Vec::new(), DLT_PPI).unwrap();
        let buffer = dumper.into_inner().unwrap();
        assert_eq!(buffer.len(), 24);
        assert_eq!(&buffer[0..4], &0xa1b2_c3d4u32.to_le_bytes());
        assert_eq!(&buffer[4..6], &2u16.to_le_bytes());
        assert_eq!(&buffer[6..8], &4u16.to_le_bytes());
        assert_eq!(&buffer[16..20], &65535u32.to_le_bytes());
        assert_eq!(&buffer[20..24], &192u32.to_le_bytes());
    }

    #[test]
    fn bad_magic_is_rejected() {
        let err = PcapReader::new(Cursor::new(vec![0xffu8; 24])).unwrap_err();
        assert!(matches!(err, Error::Capture(_)));
    }

    #[test]
    fn byte_swapped_capture_is_readable() {
        // Hand-build a big-endian capture: swapped magic from our side
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&PCAP_MAGIC.to_be_bytes());
        buffer.extend_from_slice(&2u16.to_be_bytes());
        buffer.extend_from_slice(&4u16.to_be_bytes());
        buffer.extend_from_slice(&0u32.to_be_bytes());
        buffer.extend_from_slice(&0u32.to_be_bytes());
        buffer.extend_from_slice(&65535u32.to_be_bytes());
        buffer.extend_from_slice(&DLT_IEEE802_15_4_NOFCS.to_be_bytes());
        buffer.extend_from_slice(&100u32.to_be_bytes()); // ts_sec
        buffer.extend_from_slice(&0u32.to_be_bytes()); // ts_usec
        buffer.extend_from_slice(&1u32.to_be_bytes()); // incl_len
        buffer.extend_from_slice(&1u32.to_be_bytes()); // orig_len
        buffer.push(0xab);

        let mut reader = PcapReader::new(Cursor::new(buffer)).unwrap();
        assert_eq!(reader.datalink(), DLT_IEEE802_15_4_NOFCS);
        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.bytes, vec![0xab]);
    }

    #[test]
    fn torn_record_header_is_an_error() {
        let mut dumper = PcapDumper::new(Vec::new(), DLT_IEEE802_15_4_WITHFCS).unwrap();
        dumper.dump(UNIX_EPOCH, &[0x01]).unwrap();
        let mut buffer = dumper.into_inner().unwrap();
        buffer.truncate(24 + 7); // global header plus half a record header

        let mut reader = PcapReader::new(Cursor::new(buffer)).unwrap();
        assert!(matches!(
            reader.next_record().unwrap_err(),
            Error::Capture(_)
        ));
    }

    #[test]
    fn truncated_record_is_an_error() {
        let mut dumper = PcapDumper::new(Vec::new(), DLT_IEEE802_15_4_WITHFCS).unwrap();
        dumper.dump(UNIX_EPOCH, &[0x01, 0x02, 0x03, 0x04]).unwrap();
        let mut buffer = dumper.into_inner().unwrap();
        buffer.truncate(buffer.len() - 2);

        let mut reader = PcapReader::new(Cursor::new(buffer)).unwrap();
        assert!(matches!(
            reader.next_record().unwrap_err(),
            Error::Capture(_)
        ));
    }
}
