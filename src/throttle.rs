//! Per-device rate limiting of output lines.
//!
//! Beacons advertise several times per second. The throttle lets through at
//! most one event per device per interval so the output stays readable.

use crate::address::DeviceAddress;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Allows at most one event per `interval` for each device address.
///
/// The first event of a device always passes. Blocked events do not restart
/// the interval.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last_emitted: HashMap<DeviceAddress, Instant>,
}

impl Throttle {
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use beacon_listener::throttle::Throttle;
    ///
    /// let throttle = Throttle::new(Duration::from_secs(3));
    /// ```
    pub fn new(interval: Duration) -> Self {
        Throttle {
            interval,
            last_emitted: HashMap::new(),
        }
    }

    /// Returns `true` and restarts the device's interval when the event should be emitted.
    pub fn should_emit(&mut self, address: DeviceAddress) -> bool {
        self.should_emit_at(address, Instant::now())
    }

    fn should_emit_at(&mut self, address: DeviceAddress, now: Instant) -> bool {
        match self.last_emitted.get(&address) {
            Some(last) if now.saturating_duration_since(*last) < self.interval => false,
            _ => {
                self.last_emitted.insert(address, now);
                true
            }
        }
    }
}

const DURATION_UNITS: [(&str, u64); 4] = [("ms", 1), ("h", 3_600_000), ("m", 60_000), ("s", 1_000)];

/// Parse a duration such as `3s`, `1m`, `500ms` or `2h`.
///
/// A bare number is read as seconds.
///
/// # Examples
/// ```
/// use beacon_listener::throttle::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("3s").unwrap(), Duration::from_secs(3));
/// assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
/// assert_eq!(parse_duration("10").unwrap(), Duration::from_secs(10));
/// ```
pub fn parse_duration(src: &str) -> Result<Duration, String> {
    let src = src.trim();
    if src.is_empty() {
        return Err("empty duration string".to_string());
    }

    // "ms" must be tried before "m" and "s"
    let (number, millis_per_unit) = DURATION_UNITS
        .iter()
        .find_map(|(suffix, millis)| src.strip_suffix(suffix).map(|n| (n, *millis)))
        .unwrap_or((src, 1_000));

    let value: u64 = number
        .trim()
        .parse()
        .map_err(|_| format!("invalid duration: {src}"))?;

    value
        .checked_mul(millis_per_unit)
        .map(Duration::from_millis)
        .ok_or_else(|| format!("duration out of range: {src}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TEST_ADDRESS;

    const OTHER_ADDRESS: DeviceAddress = DeviceAddress([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);

    #[test]
    fn first_event_allowed_then_blocked() {
        let mut throttle = Throttle::new(Duration::from_secs(1));
        assert!(throttle.should_emit(TEST_ADDRESS));
        assert!(!throttle.should_emit(TEST_ADDRESS));
    }

    #[test]
    fn devices_are_independent() {
        let mut throttle = Throttle::new(Duration::from_secs(1));
        assert!(throttle.should_emit(TEST_ADDRESS));
        assert!(throttle.should_emit(OTHER_ADDRESS));
        assert!(!throttle.should_emit(TEST_ADDRESS));
        assert!(!throttle.should_emit(OTHER_ADDRESS));
    }

    #[test]
    fn zero_interval_never_blocks() {
        let mut throttle = Throttle::new(Duration::ZERO);
        assert!(throttle.should_emit(TEST_ADDRESS));
        assert!(throttle.should_emit(TEST_ADDRESS));
    }

    #[test]
    fn allowed_again_after_interval() {
        let mut throttle = Throttle::new(Duration::from_millis(30));
        let start = Instant::now();

        assert!(throttle.should_emit_at(TEST_ADDRESS, start));
        assert!(!throttle.should_emit_at(TEST_ADDRESS, start + Duration::from_millis(29)));
        assert!(throttle.should_emit_at(TEST_ADDRESS, start + Duration::from_millis(30)));
    }

    #[test]
    fn blocked_event_does_not_restart_interval() {
        let mut throttle = Throttle::new(Duration::from_millis(30));
        let start = Instant::now();

        assert!(throttle.should_emit_at(TEST_ADDRESS, start));
        assert!(!throttle.should_emit_at(TEST_ADDRESS, start + Duration::from_millis(10)));
        assert!(!throttle.should_emit_at(TEST_ADDRESS, start + Duration::from_millis(20)));
        assert!(throttle.should_emit_at(TEST_ADDRESS, start + Duration::from_millis(35)));
        assert!(!throttle.should_emit_at(TEST_ADDRESS, start + Duration::from_millis(40)));
    }

    #[test]
    fn many_devices() {
        let mut throttle = Throttle::new(Duration::from_secs(1));
        let addresses: Vec<DeviceAddress> = (0..=255u8)
            .map(|i| DeviceAddress([0xAA, 0xBB, 0xCC, 0xDD, 0xEE, i]))
            .collect();

        assert!(addresses.iter().all(|a| throttle.should_emit(*a)));
        assert!(addresses.iter().all(|a| !throttle.should_emit(*a)));
    }

    #[test]
    fn parse_duration_suffixes() {
        assert_eq!(parse_duration("3s").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("0s").unwrap(), Duration::ZERO);
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
        assert_eq!(parse_duration("10").unwrap(), Duration::from_secs(10));
    }

    #[test]
    fn parse_duration_with_whitespace() {
        assert_eq!(parse_duration(" 3s ").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("3 s").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_invalid() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("-1s").is_err());
        assert!(parse_duration("1.5s").is_err());
        assert!(parse_duration("99999999999999999h").is_err());
    }
}
