mod args;

use std::io::{self, Write};
use std::time::Duration;

use anyhow::Context;
use args::{convert_filter, Args, Command};
use clap::Parser;
use frame_slurper::{
    capture::{acquire_counted, DatagramAssembler, MarkerSync},
    exfil::LogSink,
    peaks::{PeakConfig, SERIAL_MIN_BIN_DISTANCE},
    pipeline,
    transport::{open_serial, open_udp},
    PipelineConfig, Stop,
};
use tracing::{debug, info};

// How long a UDP read may block before we look at the stop flag again
const UDP_POLL: Duration = Duration::from_millis(500);

/// Flip the returned flag on ctrl-c so the capture loop can wind down and close the port
fn install_stop() -> anyhow::Result<Stop> {
    let stop = Stop::new();
    let handler = stop.clone();
    ctrlc::set_handler(move || handler.trigger()).context("Failed to set the ctrl-c handler")?;
    Ok(stop)
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(convert_filter(args.verbose.log_level_filter()))
        .init();

    let pipeline_config = |default_distance: usize| PipelineConfig {
        samples: args.samples,
        sample_rate: args.sample_rate,
        peaks: PeakConfig {
            min_height_fraction: args.min_height,
            min_bin_distance: args.min_distance.unwrap_or(default_distance),
        },
    };

    match args.command {
        Command::Counted {
            ref port,
            baud,
            count,
            step,
            timeout_ms,
        } => {
            let mut serial = open_serial(port, baud, Duration::from_millis(timeout_ms))?;
            let capture = acquire_counted(&mut serial, count)
                .context("Counted acquisition failed")?
                .trimmed();
            info!(
                samples = capture.samples.len(),
                elapsed = capture.elapsed,
                "Counted acquisition complete"
            );
            let stdout = io::stdout();
            let mut out = stdout.lock();
            for (t, v) in capture.time_axis(step).iter().zip(&capture.samples) {
                writeln!(out, "{}\t{}", t, v)?;
            }
        }
        Command::Serial {
            ref port,
            baud,
            timeout_ms,
        } => {
            let config = pipeline_config(SERIAL_MIN_BIN_DISTANCE);
            let serial = open_serial(port, baud, Duration::from_millis(timeout_ms))?;
            let stop = install_stop()?;
            let mut source = MarkerSync::new(serial, config.frame_bytes(), stop);
            let mut sink = LogSink::new(config.sample_rate);
            let frames = pipeline::run(&mut source, &mut sink, &config)?;
            info!(frames, "Stopped");
        }
        Command::Udp { port, recv_buffer } => {
            let config = pipeline_config(PeakConfig::udp().min_bin_distance);
            let socket = open_udp(port, recv_buffer, UDP_POLL)?;
            let stop = install_stop()?;
            let mut source = DatagramAssembler::new(socket, config.frame_bytes(), stop);
            let mut sink = LogSink::new(config.sample_rate);
            let frames = pipeline::run(&mut source, &mut sink, &config)?;
            info!(frames, "Stopped");
        }
    }
    debug!("Transport closed");
    Ok(())
}
