//! BlueZ D-Bus backend.
//!
//! This backend uses the `bluer` crate to communicate with the BlueZ daemon
//! via D-Bus. It requires the `bluetoothd` daemon to be running.

use super::{EVENT_CHANNEL_BUFFER_SIZE, ScanError};
use crate::advertisement::{AdvertisementEvent, RawAdvertisement};
use bluer::{Adapter, AdapterEvent, Address, DiscoveryFilter, DiscoveryTransport, Session};
use futures::StreamExt;
use std::collections::BTreeMap;
use std::time::SystemTime;
use tokio::sync::mpsc;

impl From<bluer::Error> for ScanError {
    fn from(err: bluer::Error) -> Self {
        ScanError::Bluetooth(err.to_string())
    }
}

/// Start an LE discovery session on the default adapter.
///
/// BlueZ reports a device again whenever one of its properties changes, so
/// a beacon shows up once per new advertisement content or RSSI update.
pub async fn start_scan() -> Result<mpsc::Receiver<AdvertisementEvent>, ScanError> {
    let session = Session::new().await?;
    let adapter = session.default_adapter().await?;
    adapter.set_powered(true).await?;
    adapter
        .set_discovery_filter(DiscoveryFilter {
            transport: DiscoveryTransport::Le,
            duplicate_data: true,
            ..Default::default()
        })
        .await?;

    log::info!("discovering on adapter {}", adapter.name());
    let mut events = Box::pin(adapter.discover_devices_with_changes().await?);

    let (tx, rx) = mpsc::channel(EVENT_CHANNEL_BUFFER_SIZE);

    // Spawn a task that owns all Bluetooth state and runs the event loop
    tokio::spawn(async move {
        let _session = session;

        while let Some(event) = events.next().await {
            let AdapterEvent::DeviceAdded(address) = event else {
                continue;
            };

            match read_advertisement(&adapter, address).await {
                Ok(advertisement) => {
                    if tx.send(advertisement).await.is_err() {
                        break;
                    }
                }
                Err(e) => log::debug!("{address}: {e}"),
            }
        }

        log::info!("BlueZ discovery ended");
    });

    Ok(rx)
}

/// Read the advertisement-related properties BlueZ holds for a device.
///
/// BlueZ hands out maps; entries are sorted by key so the decoder sees a
/// stable order.
async fn read_advertisement(
    adapter: &Adapter,
    address: Address,
) -> Result<AdvertisementEvent, ScanError> {
    let device = adapter.device(address)?;

    let manufacturer_data: BTreeMap<u16, Vec<u8>> = device
        .manufacturer_data()
        .await?
        .unwrap_or_default()
        .into_iter()
        .collect();

    let mut service_data: Vec<(String, Vec<u8>)> = device
        .service_data()
        .await?
        .unwrap_or_default()
        .into_iter()
        .map(|(uuid, data)| (uuid.to_string(), data))
        .collect();
    service_data.sort();

    let mut service_uuids: Vec<String> = device
        .uuids()
        .await?
        .unwrap_or_default()
        .into_iter()
        .map(|uuid| uuid.to_string())
        .collect();
    service_uuids.sort();

    Ok(AdvertisementEvent {
        address: address.into(),
        name: device.name().await?,
        rssi: device.rssi().await?,
        timestamp: SystemTime::now(),
        advertisement: RawAdvertisement {
            manufacturer_data: manufacturer_data.into_iter().collect(),
            service_data,
            service_uuids,
        },
    })
}
