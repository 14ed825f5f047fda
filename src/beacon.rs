//! Decoded beacon record types.

use serde::{Serialize, Serializer};
use std::fmt;

/// Which beacon format a record was decoded as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BeaconKind {
    Unknown,
    #[serde(rename = "iBeacon")]
    IBeacon,
    Eddystone,
}

impl fmt::Display for BeaconKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BeaconKind::Unknown => "Unknown",
            BeaconKind::IBeacon => "iBeacon",
            BeaconKind::Eddystone => "Eddystone",
        })
    }
}

/// Apple iBeacon identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IBeacon {
    /// Proximity UUID, lowercase 8-4-4-4-12 form
    pub uuid: String,
    pub major: u16,
    pub minor: u16,
    /// Calibrated power at 1 m in dBm
    pub tx_power: i8,
}

/// Eddystone TLM (telemetry) frame contents.
#[derive(Debug, Clone, PartialEq)]
pub struct Telemetry {
    pub version: u8,
    /// Battery voltage in millivolts
    pub battery_voltage_mv: u16,
    /// Beacon temperature in Celsius
    pub temperature_c: f64,
    /// Advertising PDUs sent since power-up
    pub advertising_pdu_count: u32,
    /// Time since power-up in 0.1 s units
    pub seconds_since_boot: u32,
}

/// One decoded Eddystone frame.
#[derive(Debug, Clone, PartialEq)]
pub enum EddystoneFrame {
    Uid {
        /// Calibrated power at 0 m in dBm
        tx_power: i8,
        /// 10-byte namespace, lowercase hex
        namespace: String,
        /// 6-byte instance, lowercase hex
        instance: String,
    },
    Url {
        tx_power: i8,
        /// Index into [`URL_SCHEME_PREFIXES`]
        url_scheme: u8,
        /// Compressed URL body, lowercase hex
        encoded_url: String,
    },
    Tlm(Telemetry),
    /// A frame type this decoder has no layout for.
    Other { frame_type: u8 },
}

/// URL scheme prefixes of the Eddystone-URL frame, indexed by the scheme byte.
pub const URL_SCHEME_PREFIXES: [&str; 4] = ["http://www.", "https://www.", "http://", "https://"];

impl EddystoneFrame {
    /// `UID`, `URL`, `TLM`, or the hex discriminator (`0x30`, `0x5`) of an unknown frame.
    pub fn frame_type(&self) -> String {
        match self {
            EddystoneFrame::Uid { .. } => "UID".to_string(),
            EddystoneFrame::Url { .. } => "URL".to_string(),
            EddystoneFrame::Tlm(_) => "TLM".to_string(),
            EddystoneFrame::Other { frame_type } => format!("{frame_type:#x}"),
        }
    }

    pub fn tx_power(&self) -> Option<i8> {
        match self {
            EddystoneFrame::Uid { tx_power, .. } | EddystoneFrame::Url { tx_power, .. } => {
                Some(*tx_power)
            }
            _ => None,
        }
    }

    /// Scheme prefix of a URL frame, `None` for other frames or reserved scheme bytes.
    pub fn url_scheme_prefix(&self) -> Option<&'static str> {
        match self {
            EddystoneFrame::Url { url_scheme, .. } => {
                URL_SCHEME_PREFIXES.get(usize::from(*url_scheme)).copied()
            }
            _ => None,
        }
    }
}

/// The structured part of a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Beacon {
    IBeacon(IBeacon),
    Eddystone(EddystoneFrame),
}

/// Normalized result of decoding one advertisement.
///
/// `beacon` is only ever set from a frame that decoded completely. A short
/// or malformed frame does not touch it; only its bytes land in `raw_hex`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BeaconRecord {
    /// Company identifier of the last manufacturer-data entry
    pub company_id: Option<u16>,
    pub beacon: Option<Beacon>,
    /// Lowercase hex of the buffer this record was last built from
    pub raw_hex: Option<String>,
}

impl BeaconRecord {
    pub fn kind(&self) -> BeaconKind {
        match self.beacon {
            None => BeaconKind::Unknown,
            Some(Beacon::IBeacon(_)) => BeaconKind::IBeacon,
            Some(Beacon::Eddystone(_)) => BeaconKind::Eddystone,
        }
    }

    /// Company identifier as `0x004C`.
    pub fn company_id_hex(&self) -> Option<String> {
        self.company_id.map(|id| format!("0x{id:04X}"))
    }

    pub fn ibeacon(&self) -> Option<&IBeacon> {
        match &self.beacon {
            Some(Beacon::IBeacon(ibeacon)) => Some(ibeacon),
            _ => None,
        }
    }

    pub fn eddystone(&self) -> Option<&EddystoneFrame> {
        match &self.beacon {
            Some(Beacon::Eddystone(frame)) => Some(frame),
            _ => None,
        }
    }

    /// Flatten into optional columns, the shape every output format works from.
    pub fn flat(&self) -> FlatRecord<'_> {
        let mut flat = FlatRecord {
            kind: self.kind(),
            company_id: self.company_id_hex(),
            raw_hex: self.raw_hex.as_deref(),
            ..FlatRecord::default()
        };

        match &self.beacon {
            None => {}
            Some(Beacon::IBeacon(ibeacon)) => {
                flat.uuid = Some(ibeacon.uuid.as_str());
                flat.major = Some(ibeacon.major);
                flat.minor = Some(ibeacon.minor);
                flat.tx_power = Some(ibeacon.tx_power);
            }
            Some(Beacon::Eddystone(frame)) => {
                flat.frame_type = Some(frame.frame_type());
                flat.tx_power = frame.tx_power();
                match frame {
                    EddystoneFrame::Uid {
                        namespace,
                        instance,
                        ..
                    } => {
                        flat.namespace = Some(namespace.as_str());
                        flat.instance = Some(instance.as_str());
                    }
                    EddystoneFrame::Url {
                        url_scheme,
                        encoded_url,
                        ..
                    } => {
                        flat.url_scheme = Some(*url_scheme);
                        flat.encoded_url = Some(encoded_url.as_str());
                    }
                    EddystoneFrame::Tlm(tlm) => {
                        flat.version = Some(tlm.version);
                        flat.battery_voltage_mv = Some(tlm.battery_voltage_mv);
                        flat.temperature_c = Some(tlm.temperature_c);
                        flat.advertising_pdu_count = Some(tlm.advertising_pdu_count);
                        flat.seconds_since_boot = Some(tlm.seconds_since_boot);
                    }
                    EddystoneFrame::Other { .. } => {}
                }
            }
        }

        flat
    }
}

impl Serialize for BeaconRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.flat().serialize(serializer)
    }
}

/// Borrowed, column-per-field view of a [`BeaconRecord`].
///
/// Fields that do not apply are `None`, never zero.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatRecord<'a> {
    pub kind: BeaconKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uuid: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub major: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minor: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_power: Option<i8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url_scheme: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoded_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub battery_voltage_mv: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature_c: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advertising_pdu_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds_since_boot: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_hex: Option<&'a str>,
}

impl Default for FlatRecord<'_> {
    fn default() -> Self {
        Self {
            kind: BeaconKind::Unknown,
            company_id: None,
            uuid: None,
            major: None,
            minor: None,
            tx_power: None,
            frame_type: None,
            namespace: None,
            instance: None,
            url_scheme: None,
            encoded_url: None,
            version: None,
            battery_voltage_mv: None,
            temperature_c: None,
            advertising_pdu_count: None,
            seconds_since_boot: None,
            raw_hex: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uid_record() -> BeaconRecord {
        BeaconRecord {
            company_id: None,
            beacon: Some(Beacon::Eddystone(EddystoneFrame::Uid {
                tx_power: -20,
                namespace: "00112233445566778899".to_string(),
                instance: "aabbccddeeff".to_string(),
            })),
            raw_hex: Some("00ec00112233445566778899aabbccddeeff".to_string()),
        }
    }

    #[test]
    fn empty_record_is_unknown() {
        let record = BeaconRecord::default();
        assert_eq!(record.kind(), BeaconKind::Unknown);
        assert!(record.ibeacon().is_none());
        assert!(record.eddystone().is_none());
        assert_eq!(record.flat(), FlatRecord::default());
    }

    #[test]
    fn company_id_is_four_uppercase_hex_digits() {
        let record = BeaconRecord {
            company_id: Some(0x004C),
            ..BeaconRecord::default()
        };
        assert_eq!(record.company_id_hex().as_deref(), Some("0x004C"));

        let record = BeaconRecord {
            company_id: Some(0xabc),
            ..BeaconRecord::default()
        };
        assert_eq!(record.company_id_hex().as_deref(), Some("0x0ABC"));
    }

    #[test]
    fn frame_type_names() {
        assert_eq!(uid_record().eddystone().unwrap().frame_type(), "UID");
        assert_eq!(
            EddystoneFrame::Other { frame_type: 0x30 }.frame_type(),
            "0x30"
        );
        assert_eq!(EddystoneFrame::Other { frame_type: 5 }.frame_type(), "0x5");
    }

    #[test]
    fn url_scheme_prefix_lookup() {
        let frame = |url_scheme| EddystoneFrame::Url {
            tx_power: 0,
            url_scheme,
            encoded_url: String::new(),
        };
        assert_eq!(frame(0).url_scheme_prefix(), Some("http://www."));
        assert_eq!(frame(3).url_scheme_prefix(), Some("https://"));
        assert_eq!(frame(4).url_scheme_prefix(), None);
    }

    #[test]
    fn flat_view_of_uid_frame() {
        let record = uid_record();
        let flat = record.flat();
        assert_eq!(flat.kind, BeaconKind::Eddystone);
        assert_eq!(flat.frame_type.as_deref(), Some("UID"));
        assert_eq!(flat.tx_power, Some(-20));
        assert_eq!(flat.namespace, Some("00112233445566778899"));
        assert_eq!(flat.instance, Some("aabbccddeeff"));
        assert_eq!(flat.uuid, None);
        assert_eq!(flat.major, None);
    }

    #[test]
    fn serializes_flat_without_absent_fields() {
        let record = BeaconRecord {
            company_id: Some(0x004C),
            beacon: Some(Beacon::IBeacon(IBeacon {
                uuid: "e2c56db5-dffb-48d2-b060-d0f5a71096e0".to_string(),
                major: 1,
                minor: 0,
                tx_power: -59,
            })),
            raw_hex: Some("0215".to_string()),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "iBeacon");
        assert_eq!(json["company_id"], "0x004C");
        assert_eq!(json["major"], 1);
        // zero is a value, not an absence
        assert_eq!(json["minor"], 0);
        assert_eq!(json["tx_power"], -59);
        assert!(json.get("frame_type").is_none());
        assert!(json.get("namespace").is_none());
    }
}
