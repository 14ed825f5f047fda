//! JSON lines output formatter.

use crate::address::DeviceAddress;
use crate::beacon::BeaconRecord;
use crate::output::{OutputFormatter, Sighting};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

fn is_empty(uuids: &&[String]) -> bool {
    uuids.is_empty()
}

#[derive(Serialize)]
struct JsonLine<'a> {
    timestamp: String,
    address: DeviceAddress,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rssi: Option<i16>,
    #[serde(skip_serializing_if = "is_empty")]
    service_uuids: &'a [String],
    #[serde(flatten)]
    record: &'a BeaconRecord,
}

/// One flat JSON object per sighting; absent fields are omitted.
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format(&self, sighting: &Sighting<'_>) -> String {
        let event = sighting.event;
        let line = JsonLine {
            timestamp: DateTime::<Utc>::from(event.timestamp)
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            address: event.address,
            name: event.name.as_deref(),
            rssi: event.rssi,
            service_uuids: &event.advertisement.service_uuids,
            record: sighting.record,
        };

        serde_json::to_string(&line)
            .unwrap_or_else(|e| format!("{{\"error\":{:?}}}", e.to_string()))
    }
}
