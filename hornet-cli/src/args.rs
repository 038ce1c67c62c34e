//! CLI argument parsing
//!
//! Command-line interface for sniffing, injection, capture conversion, and
//! offline frame decoding.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "hornet")]
#[command(version, about = "802.15.4 / ZigBee security research tool", long_about = None)]
pub struct Cli {
    /// Verbose output (-v, -vv, -vvv for increasing verbosity)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Serial ports / device handles discovery must skip (e.g. a GPS)
    #[arg(long, value_name = "HANDLE", global = true)]
    pub exclude: Vec<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Capture frames from a device into pcap and/or Daintree SNA sinks
    Sniff {
        /// Device handle to open (e.g. /dev/ttyUSB0)
        #[arg(short, long)]
        device: String,

        /// Channel to tune to
        #[arg(short, long, default_value = "11")]
        channel: u8,

        /// Channel page (0 = 2.4 GHz, 28-31 = sub-GHz bands)
        #[arg(short, long, default_value = "0")]
        page: u8,

        /// Stop after this many frames (0 = run until interrupted)
        #[arg(short = 'n', long, default_value = "0")]
        count: u64,

        /// Write a pcap capture to this path
        #[arg(short = 'w', long, value_name = "FILE")]
        pcap: Option<PathBuf>,

        /// Write a Daintree SNA capture to this path
        #[arg(short = 'W', long, value_name = "FILE")]
        daintree: Option<PathBuf>,

        /// Prepend PPI radio metadata headers to pcap records
        #[arg(long)]
        ppi: bool,
    },

    /// Inject a frame, optionally repeated
    Inject {
        /// Device handle to open
        #[arg(short, long)]
        device: String,

        /// Channel to transmit on
        #[arg(short, long)]
        channel: Option<u8>,

        /// Frame bytes as hex, without the FCS trailer
        #[arg(short, long, value_name = "HEX")]
        frame: String,

        /// Number of copies to transmit
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,

        /// Delay between copies in milliseconds
        #[arg(long, default_value = "0")]
        delay_ms: u64,
    },

    /// Jam a channel for a fixed duration
    Jam {
        /// Device handle to open
        #[arg(short, long)]
        device: String,

        /// Channel to jam
        #[arg(short, long)]
        channel: Option<u8>,

        /// Use reactive (preamble-triggered) jamming
        #[arg(long)]
        reflexive: bool,

        /// Seconds to keep the jammer running
        #[arg(short = 't', long, default_value = "10")]
        duration_secs: u64,
    },

    /// Convert a capture between pcap and Daintree SNA formats
    ///
    /// The input format is sniffed from the file contents and the output
    /// is written in the other format.
    Convert {
        /// Input capture file
        input: PathBuf,

        /// Output capture file
        output: PathBuf,
    },

    /// Dissect a frame given as hex and print its fields
    Decode {
        /// Frame bytes as hex
        #[arg(value_name = "HEX")]
        frame: String,

        /// 16-byte network key as hex, to decrypt a secured payload
        #[arg(short, long, value_name = "HEX")]
        key: Option<String>,
    },
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
