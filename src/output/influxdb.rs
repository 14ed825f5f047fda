//! InfluxDB line protocol output formatter.

use crate::output::{OutputFormatter, Sighting};
use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

/// Field values for InfluxDB line protocol
#[derive(Debug, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
    String(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldValue::Float(num) => write!(f, "{num}"),
            FieldValue::Integer(num) => write!(f, "{num}i"),
            FieldValue::String(s) => {
                write!(f, "\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
            }
        }
    }
}

/// Escape commas, equals signs and spaces in tag keys and values.
///
/// Line protocol has no escape for line breaks, so they become escaped spaces.
fn escape_tag(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            ',' | '=' | ' ' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\n' | '\r' => escaped.push_str("\\ "),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Data point in InfluxDB line protocol
#[derive(Debug)]
pub struct DataPoint {
    pub measurement: String,
    pub tag_set: BTreeMap<String, String>,
    pub field_set: BTreeMap<String, FieldValue>,
    pub timestamp: Option<SystemTime>,
}

fn fmt_tags(data_point: &DataPoint, fmt: &mut fmt::Formatter) -> fmt::Result {
    for (key, value) in data_point.tag_set.iter() {
        write!(fmt, ",{}={}", escape_tag(key), escape_tag(value))?;
    }
    Ok(())
}

fn fmt_fields(data_point: &DataPoint, fmt: &mut fmt::Formatter) -> fmt::Result {
    let mut first = true;
    for (key, value) in data_point.field_set.iter() {
        if first {
            first = false;
        } else {
            write!(fmt, ",")?;
        }
        write!(fmt, "{}={}", escape_tag(key), value)?;
    }
    Ok(())
}

fn fmt_timestamp(data_point: &DataPoint, fmt: &mut fmt::Formatter) -> fmt::Result {
    if let Some(nanos) = data_point
        .timestamp
        .and_then(|time| time.duration_since(SystemTime::UNIX_EPOCH).ok())
        .map(|since_epoch| since_epoch.as_nanos())
    {
        write!(fmt, " {nanos}")?;
    }
    Ok(())
}

impl fmt::Display for DataPoint {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", escape_tag(&self.measurement))?;
        fmt_tags(self, fmt)?;
        write!(fmt, " ")?;
        fmt_fields(self, fmt)?;
        fmt_timestamp(self, fmt)
    }
}

/// InfluxDB line protocol formatter.
///
/// Identifiers (address, kind, UUIDs, frame type) become tags, readings
/// become fields. Absent values are left out of the line.
pub struct InfluxDbFormatter {
    /// The measurement name in InfluxDB
    measurement_name: String,
}

impl InfluxDbFormatter {
    pub fn new(measurement_name: String) -> Self {
        Self { measurement_name }
    }

    fn tag_set(&self, sighting: &Sighting<'_>) -> BTreeMap<String, String> {
        let flat = sighting.record.flat();
        let mut tags = BTreeMap::new();

        tags.insert("mac".to_string(), sighting.event.address.to_string());
        tags.insert("name".to_string(), sighting.display_name().into_owned());
        tags.insert("kind".to_string(), flat.kind.to_string());

        macro_rules! add {
            ($name:literal, $val:expr) => {
                if let Some(v) = $val {
                    tags.insert($name.into(), v.to_string());
                }
            };
        }

        add!("company_id", flat.company_id);
        add!("frame_type", flat.frame_type);
        add!("uuid", flat.uuid);
        add!("namespace", flat.namespace);
        add!("instance", flat.instance);

        tags
    }

    fn field_set(&self, sighting: &Sighting<'_>) -> BTreeMap<String, FieldValue> {
        let flat = sighting.record.flat();
        let mut fields = BTreeMap::new();

        macro_rules! add {
            ($name:literal, $variant:ident, $val:expr) => {
                if let Some(v) = $val {
                    fields.insert($name.into(), FieldValue::$variant(v.into()));
                }
            };
        }

        add!("rssi", Integer, sighting.event.rssi);
        add!("major", Integer, flat.major);
        add!("minor", Integer, flat.minor);
        add!("tx_power", Integer, flat.tx_power);
        add!("url_scheme", Integer, flat.url_scheme);
        add!("encoded_url", String, flat.encoded_url);
        add!("version", Integer, flat.version);
        add!("battery_voltage", Integer, flat.battery_voltage_mv);
        add!("temperature", Float, flat.temperature_c);
        add!("advertising_pdu_count", Integer, flat.advertising_pdu_count);
        add!("seconds_since_boot", Integer, flat.seconds_since_boot);
        add!("raw", String, flat.raw_hex);

        // a line needs at least one field
        if fields.is_empty() {
            fields.insert("raw".into(), FieldValue::String(String::new()));
        }

        fields
    }

    fn to_data_point(&self, sighting: &Sighting<'_>) -> DataPoint {
        DataPoint {
            measurement: self.measurement_name.clone(),
            tag_set: self.tag_set(sighting),
            field_set: self.field_set(sighting),
            timestamp: Some(sighting.event.timestamp),
        }
    }
}

impl OutputFormatter for InfluxDbFormatter {
    fn format(&self, sighting: &Sighting<'_>) -> String {
        self.to_data_point(sighting).to_string()
    }
}
