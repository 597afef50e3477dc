use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, PoisonError},
};

use futures::{stream, StreamExt};
use route_tracker_lib::{
    device::{DeviceId, DeviceInfo, Role},
    position_sample::PositionSample,
    relay_event::RelayEvent,
};
use tokio::sync::broadcast::{self, error::RecvError};

use super::{Relay, RelayError, RelaySubscription};

const CHANNEL_CAPACITY: usize = 256;

/// In-process relay. Events travel encoded, the same way they would over a socket,
/// on a broadcast channel shared by every subscriber.
#[derive(Clone)]
pub struct LocalRelay {
    // Channel used to send events to all subscribers.
    tx: broadcast::Sender<Arc<[u8]>>,
    devices: Arc<Mutex<BTreeMap<DeviceId, Role>>>,
}

impl Default for LocalRelay {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalRelay {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            devices: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    pub fn devices(&self) -> Vec<DeviceInfo> {
        self.devices.lock().unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(device_id, role)| DeviceInfo { device_id: device_id.clone(), role: *role })
            .collect()
    }

    fn send(&self, event: &RelayEvent) -> Result<(), RelayError> {
        let bytes = event.to_bytes().map_err(|err| RelayError::Publish(err.to_string()))?;
        // Nobody listening is fine
        let _ = self.tx.send(bytes.into());
        Ok(())
    }
}

impl Relay for LocalRelay {
    fn announce(&self, device: DeviceInfo) -> Result<(), RelayError> {
        tracing::info!("Device {} announced as {}", device.device_id, device.role);
        self.devices.lock().unwrap_or_else(PoisonError::into_inner).insert(device.device_id, device.role);
        self.send(&RelayEvent::DeviceList(self.devices()))
    }

    fn withdraw(&self, device_id: &DeviceId) -> Result<(), RelayError> {
        let removed = self.devices.lock().unwrap_or_else(PoisonError::into_inner).remove(device_id).is_some();
        if removed {
            tracing::info!("Device {} left", device_id);
            self.send(&RelayEvent::DeviceList(self.devices()))?;
        }
        Ok(())
    }

    fn publish(&self, sample: &PositionSample) -> Result<(), RelayError> {
        if sample.device_id.is_none() {
            return Err(RelayError::Publish("sample has no device id".into()));
        }
        self.send(&RelayEvent::LocationUpdate(sample.clone()))
    }

    fn subscribe(&self, device: Option<DeviceId>) -> RelaySubscription {
        // Subscribe first so a change made between the two is not lost
        let rx = self.tx.subscribe();
        let current = RelayEvent::DeviceList(self.devices());

        let updates = stream::unfold((rx, device), |(mut rx, device)| async move {
            loop {
                let bytes = match rx.recv().await {
                    Ok(bytes) => bytes,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Relay subscriber lagged, skipped {} events", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => return None,
                };

                let event = match RelayEvent::try_from(&bytes[..]) {
                    Ok(event) => event,
                    Err(err) => {
                        tracing::error!("Dropping relay event: {}", err);
                        continue;
                    }
                };

                let wanted = match (&event, &device) {
                    (RelayEvent::LocationUpdate(sample), Some(device)) => sample.device_id.as_ref() == Some(device),
                    _ => true,
                };

                if wanted {
                    return Some((event, (rx, device)));
                }
            }
        });

        RelaySubscription::new(stream::once(async move { current }).chain(updates).boxed())
    }
}
