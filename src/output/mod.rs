//! Output formatters for decoded advertisements.
//!
//! Every event becomes one line. Formatters only render; filtering and
//! throttling happen in [`crate::app`].

pub mod csv;
pub mod influxdb;
pub mod json;

use crate::advertisement::AdvertisementEvent;
use crate::beacon::BeaconRecord;
use std::borrow::Cow;

/// One advertisement event together with its decoded record.
#[derive(Debug, Clone, Copy)]
pub struct Sighting<'a> {
    pub event: &'a AdvertisementEvent,
    pub record: &'a BeaconRecord,
}

impl<'a> Sighting<'a> {
    pub fn new(event: &'a AdvertisementEvent, record: &'a BeaconRecord) -> Self {
        Self { event, record }
    }

    /// Advertised local name, or the device address when there is none
    /// or it is empty.
    pub fn display_name(&self) -> Cow<'a, str> {
        match &self.event.name {
            Some(name) if !name.is_empty() => Cow::Borrowed(name.as_str()),
            _ => Cow::Owned(self.event.address.to_string()),
        }
    }
}

/// Converts sightings into output lines.
pub trait OutputFormatter: Send + Sync {
    /// Line written once before the first sighting.
    fn header(&self) -> Option<String> {
        None
    }

    /// Format one sighting, without the trailing newline.
    fn format(&self, sighting: &Sighting<'_>) -> String;
}

/// Output formats selectable on the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// InfluxDB line protocol
    #[default]
    Influxdb,
    /// Comma-separated values with a header row
    Csv,
    /// One JSON object per line
    Json,
}

impl OutputFormat {
    /// Build the formatter for this format.
    ///
    /// `measurement_name` is only used by the InfluxDB formatter.
    pub fn formatter(self, measurement_name: &str) -> Box<dyn OutputFormatter> {
        match self {
            OutputFormat::Influxdb => {
                Box::new(influxdb::InfluxDbFormatter::new(measurement_name.to_string()))
            }
            OutputFormat::Csv => Box::new(csv::CsvFormatter),
            OutputFormat::Json => Box::new(json::JsonFormatter),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decode_advertisement;
    use crate::test_utils::{TEST_ADDRESS, ibeacon_event};

    #[test]
    fn display_name_falls_back_to_address() {
        let mut event = ibeacon_event(TEST_ADDRESS);
        let record = decode_advertisement(&event.advertisement);
        assert_eq!(
            Sighting::new(&event, &record).display_name(),
            "AA:BB:CC:DD:EE:FF"
        );

        event.name = Some("Lobby".to_string());
        assert_eq!(Sighting::new(&event, &record).display_name(), "Lobby");

        event.name = Some(String::new());
        assert_eq!(
            Sighting::new(&event, &record).display_name(),
            "AA:BB:CC:DD:EE:FF"
        );
    }

    #[test]
    fn only_csv_has_a_header() {
        assert!(OutputFormat::Influxdb.formatter("beacon").header().is_none());
        assert!(OutputFormat::Json.formatter("beacon").header().is_none());
        assert!(OutputFormat::Csv.formatter("beacon").header().is_some());
    }
}
