//! Raw HCI socket backend.
//!
//! Scans without the BlueZ daemon by talking to the controller directly.
//! Requires CAP_NET_RAW and CAP_NET_ADMIN capabilities or root privileges.

use super::{EVENT_CHANNEL_BUFFER_SIZE, ScanError};
use crate::address::DeviceAddress;
use crate::advertisement::AdvertisementEvent;
use libc::{
    AF_BLUETOOTH, SOCK_CLOEXEC, SOCK_NONBLOCK, SOCK_RAW, c_int, c_void, sockaddr, socklen_t,
};
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::time::SystemTime;
use tokio::io::unix::AsyncFd;
use tokio::sync::mpsc;

const BTPROTO_HCI: c_int = 1;
const SOL_HCI: c_int = 0;
const HCI_FILTER: c_int = 2;
const HCI_CHANNEL_RAW: u16 = 0;

/// Controller index, `hci0`.
const HCI_DEV: u16 = 0;

const HCI_COMMAND_PKT: u8 = 0x01;
const HCI_EVENT_PKT: u8 = 0x04;
const EVT_LE_META_EVENT: u8 = 0x3E;
const EVT_LE_ADVERTISING_REPORT: u8 = 0x02;

const OGF_LE_CTL: u16 = 0x08;
const OCF_LE_SET_SCAN_PARAMETERS: u16 = 0x000B;
const OCF_LE_SET_SCAN_ENABLE: u16 = 0x000C;

const LE_SCAN_PASSIVE: u8 = 0x00;
const LE_PUBLIC_ADDRESS: u8 = 0x00;
const FILTER_POLICY_ACCEPT_ALL: u8 = 0x00;

// 10 ms in 0.625 ms units
const SCAN_INTERVAL: u16 = 0x0010;
const SCAN_WINDOW: u16 = 0x0010;

// Packet type, event code, parameter length, subevent, report count
const LE_REPORT_HEADER_LEN: usize = 5;

// Event type, address type, address, data length
const REPORT_PREFIX_LEN: usize = 9;

// Largest HCI event: 3 header bytes + 255 parameter bytes
const HCI_MAX_EVENT_SIZE: usize = 258;

/// `struct sockaddr_hci`
#[repr(C)]
struct SockaddrHci {
    hci_family: u16,
    hci_dev: u16,
    hci_channel: u16,
}

/// `struct hci_filter`: which packet types and events the kernel passes up.
#[repr(C)]
#[derive(Debug, Default)]
struct HciFilter {
    type_mask: u32,
    event_mask: [u32; 2],
    opcode: u16,
}

impl HciFilter {
    fn with_packet_type(mut self, ptype: u8) -> Self {
        self.type_mask |= 1 << u32::from(ptype);
        self
    }

    fn with_event(mut self, event: u8) -> Self {
        let bit = usize::from(event);
        self.event_mask[bit / 32] |= 1 << (bit % 32);
        self
    }
}

/// Encode a command packet: type, little-endian opcode, parameter length, parameters.
fn hci_command_packet(ogf: u16, ocf: u16, params: &[u8]) -> Vec<u8> {
    let opcode = (ogf << 10) | ocf;
    let mut packet = Vec::with_capacity(4 + params.len());
    packet.push(HCI_COMMAND_PKT);
    packet.extend_from_slice(&opcode.to_le_bytes());
    packet.push(params.len() as u8);
    packet.extend_from_slice(params);
    packet
}

/// LE Set Scan Parameters in wire order.
fn scan_parameters() -> [u8; 7] {
    let [interval_lo, interval_hi] = SCAN_INTERVAL.to_le_bytes();
    let [window_lo, window_hi] = SCAN_WINDOW.to_le_bytes();
    [
        LE_SCAN_PASSIVE,
        interval_lo,
        interval_hi,
        window_lo,
        window_hi,
        LE_PUBLIC_ADDRESS,
        FILTER_POLICY_ACCEPT_ALL,
    ]
}

fn check(ret: isize, action: &str) -> Result<usize, ScanError> {
    if ret < 0 {
        return Err(ScanError::Bluetooth(format!(
            "Failed to {action}: {}",
            io::Error::last_os_error()
        )));
    }
    Ok(ret as usize)
}

/// A non-blocking raw HCI socket bound to one controller.
struct HciSocket(OwnedFd);

impl HciSocket {
    fn open(dev_id: u16) -> Result<Self, ScanError> {
        // libc directly: nix has no BTPROTO_HCI. AsyncFd needs SOCK_NONBLOCK.
        let fd = unsafe {
            libc::socket(
                AF_BLUETOOTH,
                SOCK_RAW | SOCK_CLOEXEC | SOCK_NONBLOCK,
                BTPROTO_HCI,
            )
        };
        check(fd as isize, "create HCI socket")?;
        let socket = HciSocket(unsafe { OwnedFd::from_raw_fd(fd) });

        let addr = SockaddrHci {
            hci_family: AF_BLUETOOTH as u16,
            hci_dev: dev_id,
            hci_channel: HCI_CHANNEL_RAW,
        };
        let ret = unsafe {
            libc::bind(
                socket.as_raw_fd(),
                &addr as *const SockaddrHci as *const sockaddr,
                mem::size_of::<SockaddrHci>() as socklen_t,
            )
        };
        check(ret as isize, "bind HCI socket")?;

        Ok(socket)
    }

    fn set_filter(&self, filter: &HciFilter) -> Result<(), ScanError> {
        let ret = unsafe {
            libc::setsockopt(
                self.as_raw_fd(),
                SOL_HCI,
                HCI_FILTER,
                filter as *const HciFilter as *const c_void,
                mem::size_of::<HciFilter>() as socklen_t,
            )
        };
        check(ret as isize, "set HCI filter").map(drop)
    }

    fn send_command(&self, ogf: u16, ocf: u16, params: &[u8]) -> Result<(), ScanError> {
        let packet = hci_command_packet(ogf, ocf, params);
        let ret = unsafe {
            libc::write(
                self.as_raw_fd(),
                packet.as_ptr() as *const c_void,
                packet.len(),
            )
        };
        check(ret, "send HCI command").map(drop)
    }

    /// Passive LE scan with duplicate filtering off, so every advertisement
    /// is reported.
    fn enable_le_scan(&self) -> Result<(), ScanError> {
        self.send_command(OGF_LE_CTL, OCF_LE_SET_SCAN_PARAMETERS, &scan_parameters())?;
        // enable, filter_dup off
        self.send_command(OGF_LE_CTL, OCF_LE_SET_SCAN_ENABLE, &[0x01, 0x00])
    }

    fn read(&self, buf: &mut [u8]) -> io::Result<usize> {
        let ret = unsafe { libc::read(self.as_raw_fd(), buf.as_mut_ptr() as *mut c_void, buf.len()) };
        if ret < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(ret as usize)
    }
}

impl AsRawFd for HciSocket {
    fn as_raw_fd(&self) -> RawFd {
        self.0.as_raw_fd()
    }
}

/// Split an LE advertising report event into one event per report.
///
/// `packet` is a whole HCI event packet including the packet type byte.
/// Each report is `event_type | addr_type | addr[6] | len | data[len] | rssi`,
/// with the address in little-endian order. A report that runs past the end
/// of the packet ends parsing; reports before it are kept.
fn parse_advertising_reports(packet: &[u8]) -> Vec<AdvertisementEvent> {
    let mut events = Vec::new();

    if packet.len() < LE_REPORT_HEADER_LEN
        || packet[0] != HCI_EVENT_PKT
        || packet[1] != EVT_LE_META_EVENT
        || packet[3] != EVT_LE_ADVERTISING_REPORT
    {
        return events;
    }

    let num_reports = usize::from(packet[4]);
    let timestamp = SystemTime::now();
    let mut rest = &packet[LE_REPORT_HEADER_LEN..];

    for _ in 0..num_reports {
        if rest.len() < REPORT_PREFIX_LEN {
            break;
        }
        let mut addr = [0u8; 6];
        addr.copy_from_slice(&rest[2..8]);
        let data_len = usize::from(rest[8]);

        // data followed by one RSSI byte
        let Some(data) = rest.get(REPORT_PREFIX_LEN..REPORT_PREFIX_LEN + data_len) else {
            break;
        };
        let Some(&rssi) = rest.get(REPORT_PREFIX_LEN + data_len) else {
            break;
        };

        let parsed = crate::ad::parse(data);
        events.push(AdvertisementEvent {
            address: DeviceAddress::from_le_bytes(addr),
            name: parsed.local_name,
            rssi: Some(i16::from(rssi as i8)),
            timestamp,
            advertisement: parsed.advertisement,
        });

        rest = &rest[REPORT_PREFIX_LEN + data_len + 1..];
    }

    events
}

/// Start scanning for advertisements using raw HCI sockets on `hci0`.
///
/// Reports with no manufacturer data, service data or service UUIDs are
/// dropped here; they cannot carry a beacon frame.
pub async fn start_scan() -> Result<mpsc::Receiver<AdvertisementEvent>, ScanError> {
    let events = HciSocket::open(HCI_DEV)?;
    events.set_filter(
        &HciFilter::default()
            .with_packet_type(HCI_EVENT_PKT)
            .with_event(EVT_LE_META_EVENT),
    )?;

    // Commands go through a second socket so the event filter stays as is
    let commands = HciSocket::open(HCI_DEV)?;
    commands.enable_le_scan()?;
    log::info!("passive LE scan enabled on hci{HCI_DEV}");

    let async_fd = AsyncFd::new(events)
        .map_err(|e| ScanError::Bluetooth(format!("Failed to create async fd: {}", e)))?;

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_BUFFER_SIZE);

    tokio::spawn(async move {
        let _commands = commands;
        let mut buf = [0u8; HCI_MAX_EVENT_SIZE];

        'outer: loop {
            let mut guard = match async_fd.readable().await {
                Ok(guard) => guard,
                Err(e) => {
                    log::warn!("HCI socket no longer readable: {e}");
                    break;
                }
            };

            // Drain all available packets before waiting again
            loop {
                let n = match guard.try_io(|inner| inner.get_ref().read(&mut buf)) {
                    Ok(Ok(n)) if n > 0 => n,
                    Ok(Ok(_)) => break,
                    Ok(Err(e)) => {
                        log::debug!("HCI read failed: {e}");
                        break;
                    }
                    Err(_would_block) => break,
                };

                for event in parse_advertising_reports(&buf[..n]) {
                    if event.advertisement.is_empty() {
                        continue;
                    }
                    if tx.send(event).await.is_err() {
                        break 'outer;
                    }
                }
            }
        }

        log::info!("HCI scan ended");
    });

    Ok(rx)
}
