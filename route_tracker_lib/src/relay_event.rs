use serde::{Deserialize, Serialize};

use crate::{device::DeviceInfo, position_sample::PositionSample};

/// Events carried by the real-time relay between tracker and display devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RelayEvent {
    /// Every device currently announced on the relay.
    DeviceList(Vec<DeviceInfo>),
    LocationUpdate(PositionSample),
}

impl RelayEvent {
    pub fn to_bytes(&self) -> Result<Vec<u8>, &'static str> {
        bincode::serialize(self).map_err(|_| "Failed to serialize RelayEvent")
    }
}

impl TryFrom<&[u8]> for RelayEvent {
    type Error = &'static str;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        bincode::deserialize(value).map_err(|_| "Failed to deserialize RelayEvent")
    }
}
