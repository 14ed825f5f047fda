//! `beacon-listener` library.
//!
//! The decoder ([`decode_advertisement`]) turns the manufacturer and service
//! data of one BLE advertisement into a [`BeaconRecord`] describing an
//! iBeacon or Eddystone frame. It is pure and never fails.
//!
//! [`app::run_with_io`] wires a scanner backend, the decoder and an output
//! format together; `src/main.rs` only adds argument parsing, logging setup
//! and exit codes.

pub mod ad;
pub mod address;
pub mod advertisement;
pub mod app;
pub mod beacon;
pub mod decoder;
pub mod output;
pub mod scanner;
pub mod throttle;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types at the crate root
pub use address::DeviceAddress;
pub use advertisement::{AdvertisementEvent, RawAdvertisement};
pub use beacon::{Beacon, BeaconKind, BeaconRecord, EddystoneFrame, IBeacon, Telemetry};
pub use decoder::{DecodeError, decode_advertisement, decode_advertisement_with_errors};
pub use output::csv::CsvFormatter;
pub use output::influxdb::InfluxDbFormatter;
pub use output::json::JsonFormatter;
pub use output::{OutputFormat, OutputFormatter, Sighting};
pub use scanner::{Backend, ScanError};
pub use throttle::{Throttle, parse_duration};
