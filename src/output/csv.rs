//! CSV output formatter.

use crate::output::{OutputFormatter, Sighting};
use chrono::{DateTime, Local};

pub const COLUMNS: [&str; 13] = [
    "timestamp",
    "device_address",
    "device_name",
    "rssi",
    "beacon_type",
    "company_id",
    "uuid",
    "major",
    "minor",
    "tx_power",
    "service_uuids",
    "frame_type",
    "raw_data",
];

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Quote a field when it contains a separator, quote or line break.
fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// One row per sighting, local-time timestamps, empty cells for absent values.
pub struct CsvFormatter;

impl OutputFormatter for CsvFormatter {
    fn header(&self) -> Option<String> {
        Some(COLUMNS.join(","))
    }

    fn format(&self, sighting: &Sighting<'_>) -> String {
        let event = sighting.event;
        let flat = sighting.record.flat();
        let timestamp = DateTime::<Local>::from(event.timestamp).format(TIMESTAMP_FORMAT);

        let row = [
            timestamp.to_string(),
            event.address.to_string(),
            event.name.clone().unwrap_or_else(|| "Unknown".to_string()),
            opt(event.rssi),
            flat.kind.to_string(),
            opt(flat.company_id),
            opt(flat.uuid),
            opt(flat.major),
            opt(flat.minor),
            opt(flat.tx_power),
            event.advertisement.service_uuids.join(","),
            opt(flat.frame_type),
            opt(flat.raw_hex),
        ];

        row.iter()
            .map(|field| escape_field(field))
            .collect::<Vec<_>>()
            .join(",")
    }
}
