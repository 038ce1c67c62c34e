//! Subcommand implementations

use crate::args::Commands;
use hornet_capture::daintree::{DaintreeDumper, DaintreeReader};
use hornet_capture::pcap::{
    PcapDumper, PcapReader, DLT_IEEE802_15_4_WITHFCS, DLT_PPI,
};
use hornet_capture::ppi::PpiHeader;
use hornet_core::{
    frequency, Dispatcher, DiscoveryConfig, Error, JamMethod, RadioSession, ReceiveRecord, Result,
};
use hornet_packet::{mac, security};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom};
use std::path::Path;
use std::time::{Duration, UNIX_EPOCH};
use tracing::{info, warn};

/// Poll granularity for the sniff loop
const POLL_TIMEOUT: Duration = Duration::from_millis(100);

/// Execute one parsed subcommand against a dispatcher
pub async fn run(dispatcher: &Dispatcher, config: &DiscoveryConfig, command: Commands) -> Result<()> {
    match command {
        Commands::Sniff {
            device,
            channel,
            page,
            count,
            pcap,
            daintree,
            ppi,
        } => {
            let mut session = open_device(dispatcher, config, &device).await?;
            let result = sniff(
                &mut session,
                channel,
                page,
                count,
                pcap.as_deref(),
                daintree.as_deref(),
                ppi,
            )
            .await;
            session.close().await?;
            result
        }
        Commands::Inject {
            device,
            channel,
            frame,
            count,
            delay_ms,
        } => {
            let frame = decode_hex(&frame, "frame")?;
            let mut session = open_device(dispatcher, config, &device).await?;
            let result = session
                .inject(&frame, channel, count, Duration::from_millis(delay_ms))
                .await;
            session.close().await?;
            result?;
            info!(count, "Injection complete");
            Ok(())
        }
        Commands::Jam {
            device,
            channel,
            reflexive,
            duration_secs,
        } => {
            let method = if reflexive {
                JamMethod::Reflexive
            } else {
                JamMethod::Constant
            };
            let mut session = open_device(dispatcher, config, &device).await?;
            let result = async {
                session.jammer_on(channel, method).await?;
                info!(duration_secs, ?method, "Jammer running");
                tokio::time::sleep(Duration::from_secs(duration_secs)).await;
                session.jammer_off().await
            }
            .await;
            session.close().await?;
            result
        }
        Commands::Convert { input, output } => convert(&input, &output),
        Commands::Decode { frame, key } => {
            let frame = decode_hex(&frame, "frame")?;
            let key = key.map(|k| decode_hex(&k, "key")).transpose()?;
            decode(&frame, key.as_deref())
        }
    }
}

async fn open_device(
    dispatcher: &Dispatcher,
    config: &DiscoveryConfig,
    handle: &str,
) -> Result<RadioSession> {
    let device = hornet_core::DeviceDescriptor::new(handle, "", "");
    dispatcher.open(&device, config).await
}

async fn sniff(
    session: &mut RadioSession,
    channel: u8,
    page: u8,
    count: u64,
    pcap_path: Option<&Path>,
    daintree_path: Option<&Path>,
    ppi: bool,
) -> Result<()> {
    let datalink = if ppi { DLT_PPI } else { DLT_IEEE802_15_4_WITHFCS };
    let mut pcap = pcap_path
        .map(|path| PcapDumper::new(BufWriter::new(File::create(path)?), datalink))
        .transpose()?;
    let mut daintree = daintree_path
        .map(|path| DaintreeDumper::new(BufWriter::new(File::create(path)?)))
        .transpose()?;

    session.sniffer_on(Some(channel), Some(page)).await?;
    info!(channel, page, "Sniffer running");

    let mut captured = 0u64;
    while count == 0 || captured < count {
        let Some(record) = session.pnext(POLL_TIMEOUT).await? else {
            continue;
        };
        captured += 1;
        print_record(captured, &record);

        if let Some(pcap) = pcap.as_mut() {
            if ppi {
                let header = PpiHeader {
                    freq_khz: frequency(record.channel, record.page),
                    signal_dbm: record.rssi.map(|r| r as i8).unwrap_or(0),
                    geo: None,
                };
                let bytes = header.prepend(DLT_IEEE802_15_4_WITHFCS, &record.bytes);
                pcap.dump(record.timestamp, &bytes)?;
            } else {
                pcap.dump(record.timestamp, &record.bytes)?;
            }
        }
        if let Some(daintree) = daintree.as_mut() {
            let seconds = record
                .timestamp
                .duration_since(UNIX_EPOCH)
                .unwrap_or(Duration::ZERO)
                .as_secs_f64();
            daintree.dump(
                seconds,
                &record.bytes,
                record.lqi.unwrap_or(0),
                record.rssi.unwrap_or(0),
                record.channel,
            )?;
        }
    }

    if let Some(pcap) = pcap {
        pcap.into_inner()?;
    }
    if let Some(daintree) = daintree {
        daintree.into_inner()?;
    }
    info!(captured, "Sniffer finished");
    Ok(())
}

fn print_record(seq: u64, record: &ReceiveRecord) {
    let crc = if record.valid_crc { "ok" } else { "BAD" };
    println!(
        "{:6}  ch {:2}  crc {}  {}",
        seq,
        record.channel,
        crc,
        hex::encode(&record.bytes)
    );
}

fn convert(input: &Path, output: &Path) -> Result<()> {
    let mut file = File::open(input)?;
    let mut magic = [0u8; 4];
    let read = file.read(&mut magic)?;
    file.seek(SeekFrom::Start(0))?;

    // SNA captures open with the "#For" of the format marker
    if read == 4 && &magic == b"#For" {
        daintree_to_pcap(file, output)
    } else {
        pcap_to_daintree(file, output)
    }
}

fn daintree_to_pcap(input: File, output: &Path) -> Result<()> {
    let mut reader = DaintreeReader::new(BufReader::new(input));
    let mut dumper = PcapDumper::new(
        BufWriter::new(File::create(output)?),
        DLT_IEEE802_15_4_WITHFCS,
    )?;
    while let Some(record) = reader.next_record()? {
        let timestamp = UNIX_EPOCH + Duration::from_secs_f64(record.timestamp.max(0.0));
        dumper.dump(timestamp, &record.bytes)?;
    }
    info!(records = dumper.records(), "Converted SNA capture to pcap");
    dumper.into_inner()?;
    Ok(())
}

fn pcap_to_daintree(input: File, output: &Path) -> Result<()> {
    let mut reader = PcapReader::new(BufReader::new(input))?;
    let ppi = reader.datalink() == DLT_PPI;
    let mut dumper = DaintreeDumper::new(BufWriter::new(File::create(output)?))?;
    let mut records = 0u64;
    while let Some(record) = reader.next_record()? {
        let seconds = record
            .timestamp
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO)
            .as_secs_f64();
        if ppi {
            let (header, _, frame) = PpiHeader::decode(&record.bytes)?;
            let rssi = header.signal_dbm.unsigned_abs();
            dumper.dump(seconds, frame, 0, rssi, 0)?;
        } else {
            dumper.dump(seconds, &record.bytes, 0, 0, 0)?;
        }
        records += 1;
    }
    info!(records, "Converted pcap capture to SNA");
    dumper.into_inner()?;
    Ok(())
}

fn decode(frame: &[u8], key: Option<&[u8]>) -> Result<()> {
    let fields = mac::chop(frame)?;
    let fcf = fields.frame_control();
    println!("frame type : {}", fcf.frame_type);
    println!("security   : {}", fcf.security);
    println!("seq        : {}", fields.seq[0]);
    print_field("dst pan", &fields.dst_pan);
    print_field("dst addr", &fields.dst_addr);
    print_field("src pan", &fields.src_pan);
    print_field("src addr", &fields.src_addr);
    if let Some(beacon) = &fields.beacon {
        print_field("superframe", &beacon.superframe);
        print_field("ext pan id", &beacon.extended_pan_id);
    }
    println!("payload    : {}", hex::encode(&fields.payload));

    if fcf.security {
        match key {
            Some(key) => {
                let plaintext = security::decrypt(frame, key)?;
                println!("plaintext  : {}", hex::encode(plaintext));
            }
            None => warn!("Frame is secured; pass --key to decrypt"),
        }
    }
    Ok(())
}

fn print_field(name: &str, bytes: &[u8]) {
    if !bytes.is_empty() {
        println!("{:<11}: {}", name, hex::encode(bytes));
    }
}

fn decode_hex(raw: &str, name: &str) -> Result<Vec<u8>> {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    hex::decode(cleaned.trim_start_matches("0x"))
        .map_err(|_| Error::invalid_frame(format!("Invalid hex in {}", name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_decoding_accepts_prefixes_and_spaces() {
        assert_eq!(decode_hex("0x0102", "frame").unwrap(), vec![0x01, 0x02]);
        assert_eq!(decode_hex("01 02 0a", "frame").unwrap(), vec![0x01, 0x02, 0x0a]);
        assert!(decode_hex("zz", "frame").is_err());
    }

    #[test]
    fn decode_prints_unsecured_frame() {
        let frame = mac::MacFrameBuilder::new()
            .seq(7)
            .dst_pan(0x1234)
            .dst_short(0xffff)
            .src_short(0x0001)
            .payload(&[0x01, 0x02])
            .build()
            .unwrap();
        decode(&frame, None).unwrap();
    }
}
