//! Argument parsing for running from the command line

use clap::{Parser, Subcommand};
use frame_slurper::{
    peaks::MIN_HEIGHT_FRACTION, SAMPLES, SAMPLE_RATE, UDP_PORT, UDP_RECV_BUFFER,
};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,
    /// Samples per frame
    #[clap(short = 'n', long, default_value_t = SAMPLES, global = true)]
    #[clap(value_parser = parse_samples)]
    pub samples: usize,
    /// Sensor sample rate in Hz
    #[clap(short = 'r', long, default_value_t = SAMPLE_RATE, global = true)]
    pub sample_rate: f32,
    /// Peaks must reach this fraction of the loudest bin
    #[clap(long, default_value_t = MIN_HEIGHT_FRACTION, global = true)]
    pub min_height: f32,
    /// Minimum separation between peaks in bins [default: 20 on serial, 1 on UDP]
    #[clap(long, global = true)]
    pub min_distance: Option<usize>,
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Request a fixed number of integer samples over serial and print them
    Counted {
        /// Serial device, e.g. /dev/ttyUSB0 or COM8
        #[clap(short, long)]
        port: String,
        #[clap(short, long, default_value_t = 115_200)]
        baud: u32,
        /// Number of samples to request
        #[clap(short, long)]
        count: usize,
        /// Time between samples in device units
        #[clap(long, default_value_t = 5.0)]
        step: f32,
        /// Give up on a silent device after this many milliseconds
        #[clap(long, default_value_t = 1000)]
        timeout_ms: u64,
    },
    /// Stream marker-delimited float frames from a serial device
    Serial {
        /// Serial device, e.g. /dev/cu.usbserial-01D18279
        #[clap(short, long)]
        port: String,
        #[clap(short, long, default_value_t = 921_600)]
        baud: u32,
        /// Read timeout, a frame interrupted for longer than this is dropped
        #[clap(long, default_value_t = 1000)]
        timeout_ms: u64,
    },
    /// Reassemble float frames from UDP datagrams
    Udp {
        /// Port to listen on (all interfaces)
        #[clap(short, long, default_value_t = UDP_PORT)]
        #[clap(value_parser = clap::value_parser!(u16).range(1..))]
        port: u16,
        /// Kernel receive buffer in bytes
        #[clap(long, default_value_t = UDP_RECV_BUFFER)]
        recv_buffer: usize,
    },
}

fn parse_samples(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("a frame needs at least one sample".to_owned()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// Match verbosity filter with tracing subscriber log levels
pub fn convert_filter(filter: log::LevelFilter) -> tracing_subscriber::filter::LevelFilter {
    match filter {
        log::LevelFilter::Off => tracing_subscriber::filter::LevelFilter::OFF,
        log::LevelFilter::Error => tracing_subscriber::filter::LevelFilter::ERROR,
        log::LevelFilter::Warn => tracing_subscriber::filter::LevelFilter::WARN,
        log::LevelFilter::Info => tracing_subscriber::filter::LevelFilter::INFO,
        log::LevelFilter::Debug => tracing_subscriber::filter::LevelFilter::DEBUG,
        log::LevelFilter::Trace => tracing_subscriber::filter::LevelFilter::TRACE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_samples_rejected() {
        assert!(Args::try_parse_from(["frame_slurper", "udp", "-n", "0"]).is_err());
        assert!(Args::try_parse_from(["frame_slurper", "-n", "0", "udp"]).is_err());
    }

    #[test]
    fn test_sample_count_parsed() {
        let args = Args::try_parse_from(["frame_slurper", "udp", "-n", "256"]).unwrap();
        assert_eq!(args.samples, 256);
        let args = Args::try_parse_from(["frame_slurper", "udp"]).unwrap();
        assert_eq!(args.samples, SAMPLES);
    }
}
