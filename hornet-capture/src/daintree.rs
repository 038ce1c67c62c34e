//! Daintree SNA text capture format
//!
//! The Sensor Network Analyzer stores captures as CRLF-terminated text: a
//! `#Format=4` marker, one dated comment line, then one
//! whitespace-separated record per frame with the frame bytes in hex. The
//! trailing columns past the channel are fixed filler the SNA UI expects.

use chrono::Utc;
use hornet_core::{Error, Result};
use std::io::{BufRead, Write};
use tracing::debug;

/// Format marker on the first line
pub const FORMAT_LINE: &str = "#Format=4\r\n";

/// One record parsed from an SNA capture
#[derive(Debug, Clone, PartialEq)]
pub struct DaintreeRecord {
    /// 1-based record sequence number
    pub seq: u32,
    /// Capture timestamp, seconds
    pub timestamp: f64,
    /// Raw frame bytes
    pub bytes: Vec<u8>,
    /// Link quality indicator
    pub lqi: u8,
    /// Raw RSSI value
    pub rssi: u8,
    /// Capture channel
    pub channel: u8,
}

/// Streaming SNA writer
pub struct DaintreeDumper<W: Write> {
    writer: W,
    seq: u32,
}

impl<W: Write> DaintreeDumper<W> {
    /// Create a dumper and emit the two header lines
    pub fn new(mut writer: W) -> Result<Self> {
        writer.write_all(FORMAT_LINE.as_bytes())?;
        let date = Utc::now().format("%Y%m%d");
        let comment = format!("# SNA v3.0.0.7 SUS:{} ACT:000000\r\n", date);
        writer.write_all(comment.as_bytes())?;
        Ok(Self { writer, seq: 0 })
    }

    /// Append one frame
    pub fn dump(
        &mut self,
        timestamp: f64,
        frame: &[u8],
        lqi: u8,
        rssi: u8,
        channel: u8,
    ) -> Result<()> {
        self.seq += 1;
        let line = format!(
            "{} {:.6} {} {} {} 1 {} {} {} 0 1 32767\r\n",
            self.seq,
            timestamp,
            frame.len(),
            hex::encode(frame),
            lqi,
            rssi,
            channel,
            self.seq,
        );
        self.writer.write_all(line.as_bytes())?;
        Ok(())
    }

    /// Flush and hand back the underlying writer
    pub fn into_inner(mut self) -> Result<W> {
        self.writer.flush()?;
        Ok(self.writer)
    }
}

/// Streaming SNA reader
pub struct DaintreeReader<R: BufRead> {
    reader: R,
    line: u64,
}

impl<R: BufRead> DaintreeReader<R> {
    /// Wrap a buffered reader positioned at the start of a capture
    pub fn new(reader: R) -> Self {
        Self { reader, line: 0 }
    }

    /// Read the next record; `None` at end of file
    ///
    /// Comment lines (`#`-prefixed, including the two header lines) and
    /// blank lines are skipped.
    pub fn next_record(&mut self) -> Result<Option<DaintreeRecord>> {
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            debug!(line = self.line, "Parsing SNA record");
            return self.parse(line).map(Some);
        }
    }

    fn parse(&self, line: &str) -> Result<DaintreeRecord> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 8 {
            return Err(Error::Capture(format!(
                "SNA record on line {} has {} fields (expected at least 8)",
                self.line,
                fields.len()
            )));
        }

        let seq = self.field(fields[0], "sequence")?;
        let timestamp: f64 = fields[1]
            .parse()
            .map_err(|_| self.bad_field("timestamp"))?;
        let len: usize = self.field(fields[2], "length")?;
        let bytes = hex::decode(fields[3]).map_err(|_| self.bad_field("frame hex"))?;
        if bytes.len() != len {
            return Err(Error::Capture(format!(
                "SNA record on line {} claims {} bytes but carries {}",
                self.line,
                len,
                bytes.len()
            )));
        }
        let lqi = self.field(fields[4], "lqi")?;
        let rssi = self.field(fields[6], "rssi")?;
        let channel = self.field(fields[7], "channel")?;

        Ok(DaintreeRecord {
            seq,
            timestamp,
            bytes,
            lqi,
            rssi,
            channel,
        })
    }

    fn field<T: std::str::FromStr>(&self, raw: &str, name: &str) -> Result<T> {
        raw.parse().map_err(|_| self.bad_field(name))
    }

    fn bad_field(&self, name: &str) -> Error {
        Error::Capture(format!("Bad {} in SNA record on line {}", name, self.line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn write_then_read_round_trip() {
        let mut dumper = DaintreeDumper::new(Vec::new()).unwrap();
        dumper
            .dump(1700000000.25, &[0x61, 0x88, 0x42, 0xaa], 108, 40, 15)
            .unwrap();
        dumper.dump(1700000000.5, &[0x02, 0x00], 90, 38, 15).unwrap();
        let buffer = dumper.into_inner().unwrap();

        let text = String::from_utf8(buffer.clone()).unwrap();
        assert!(text.starts_with("#Format=4\r\n"));
        assert!(text.lines().nth(1).unwrap().starts_with("# SNA v3.0.0.7 SUS:"));

        let mut reader = DaintreeReader::new(Cursor::new(buffer));
        let first = reader.next_record().unwrap().unwrap();
        assert_eq!(first.seq, 1);
        assert_eq!(first.bytes, vec![0x61, 0x88, 0x42, 0xaa]);
        assert_eq!(first.lqi, 108);
        assert_eq!(first.rssi, 40);
        assert_eq!(first.channel, 15);
        assert!((first.timestamp - 1700000000.25).abs() < 1e-6);

        let second = reader.next_record().unwrap().unwrap();
        assert_eq!(second.seq, 2);
        assert!(reader.next_record().unwrap().is_none());
    }

    #[test]
    fn record_line_layout() {
        let mut dumper = DaintreeDumper::new(Vec::new()).unwrap();
        dumper.dump(12.5, &[0xde, 0xad], 200, 30, 11).unwrap();
        let text = String::from_utf8(dumper.into_inner().unwrap()).unwrap();
        let record = text.lines().nth(2).unwrap();
        assert_eq!(record, "1 12.500000 2 dead 200 1 30 11 1 0 1 32767");
    }

    #[test]
    fn malformed_hex_is_an_error() {
        let capture = "#Format=4\r\n# SNA\r\n1 0.0 2 zzzz 1 1 1 11 1 0 1 32767\r\n";
        let mut reader = DaintreeReader::new(Cursor::new(capture.as_bytes()));
        assert!(matches!(
            reader.next_record().unwrap_err(),
            Error::Capture(_)
        ));
    }

    #[test]
    fn length_mismatch_is_an_error() {
        let capture = "#Format=4\r\n1 0.0 3 dead 1 1 1 11 1 0 1 32767\r\n";
        let mut reader = DaintreeReader::new(Cursor::new(capture.as_bytes()));
        assert!(matches!(
            reader.next_record().unwrap_err(),
            Error::Capture(_)
        ));
    }

    #[test]
    fn short_line_is_an_error() {
        let capture = "#Format=4\r\n1 0.0 2 dead\r\n";
        let mut reader = DaintreeReader::new(Cursor::new(capture.as_bytes()));
        assert!(matches!(
            reader.next_record().unwrap_err(),
            Error::Capture(_)
        ));
    }
}
