//! The listen loop: scanner events in, formatted lines out.
//!
//! The scanner and both output streams are injected, so the loop runs in
//! tests against a fake scanner and in-memory buffers.

use crate::advertisement::AdvertisementEvent;
use crate::beacon::BeaconKind;
use crate::decoder::decode_advertisement_with_errors;
use crate::output::{OutputFormat, OutputFormatter, Sighting};
use crate::scanner::{Backend, ScanError};
use crate::throttle::Throttle;
use clap::Parser;
use std::future::Future;
use std::io;
use std::io::Write;
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;

/// Listen for iBeacon and Eddystone advertisements and print them.
#[derive(Parser, Debug, Clone)]
#[command(author, about, version)]
pub struct Options {
    /// Output format.
    #[arg(long, default_value_t, value_enum)]
    pub format: OutputFormat,

    /// The name of the measurement in InfluxDB line protocol.
    #[arg(long, default_value = "beacon")]
    pub influxdb_measurement: String,

    /// Only print advertisements that decode to an iBeacon or Eddystone frame
    #[arg(long)]
    pub beacons_only: bool,

    /// Verbose output, print frame decode errors and debug logs
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Throttle events per device to at most one per interval.
    /// Accepts duration with suffix: 3s, 1m, 500ms, 2h.
    /// Without suffix, value is interpreted as seconds.
    #[arg(long, value_parser = crate::throttle::parse_duration)]
    pub throttle: Option<Duration>,

    /// Bluetooth scanner backend to use
    #[arg(long, default_value_t, value_enum)]
    pub backend: Backend,
}

/// Errors returned by the core run loop.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

type ScanFuture<'a> =
    Pin<Box<dyn Future<Output = Result<mpsc::Receiver<AdvertisementEvent>, ScanError>> + Send + 'a>>;

/// Scanner abstraction to enable deterministic unit tests without Bluetooth hardware.
pub trait Scanner: Send + Sync {
    fn start_scan(&self, backend: Backend) -> ScanFuture<'_>;
}

/// Real scanner implementation that delegates to the compiled-in backends.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealScanner;

impl Scanner for RealScanner {
    fn start_scan(&self, backend: Backend) -> ScanFuture<'_> {
        Box::pin(async move { crate::scanner::start_scan(backend).await })
    }
}

/// Run the core processing loop, writing formatted output to `out` and verbose errors to `err`.
///
/// - Each event is decoded, filtered by `--beacons-only`, throttled per device,
///   formatted and written to `out` as one line.
/// - Frame decode errors are written to `err` only when `options.verbose` is true.
/// - A formatter header, if any, is written once before the first line.
pub async fn run_with_io(
    options: Options,
    scanner: &dyn Scanner,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<(), RunError> {
    let formatter: Box<dyn OutputFormatter> = options.format.formatter(&options.influxdb_measurement);
    let mut header = formatter.header();

    // Create throttle if interval is specified
    let mut throttle = options.throttle.map(Throttle::new);

    let mut events = scanner.start_scan(options.backend).await?;

    while let Some(event) = events.recv().await {
        let decoded = decode_advertisement_with_errors(&event.advertisement);

        if options.verbose {
            for decode_err in &decoded.errors {
                writeln!(err, "{}: {decode_err}", event.address)?;
            }
        }

        if options.beacons_only && decoded.record.kind() == BeaconKind::Unknown {
            continue;
        }

        let should_emit = throttle
            .as_mut()
            .is_none_or(|t: &mut Throttle| t.should_emit(event.address));
        if !should_emit {
            continue;
        }

        if let Some(header) = header.take() {
            writeln!(out, "{header}")?;
        }
        let line = formatter.format(&Sighting::new(&event, &decoded.record));
        writeln!(out, "{line}")?;
    }

    log::debug!("advertisement stream closed");
    Ok(())
}
