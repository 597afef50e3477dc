use chrono::{DateTime, Utc};
use geo_types::Coord;

use crate::{device::DeviceId, route::Waypoint};

/// A timestamped fix, either interpolated along a route or passed through from a
/// positioning source. Speed is in m/s, accuracy in metres and heading in degrees
/// clockwise from north.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct PositionSample {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    pub accuracy: Option<f64>,
    pub speed: Option<f64>,
    pub heading: Option<f64>,
    pub device_id: Option<DeviceId>,
}

impl PositionSample {
    pub fn new(position: Waypoint, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude: position.latitude,
            longitude: position.longitude,
            timestamp,
            accuracy: None,
            speed: None,
            heading: None,
            device_id: None,
        }
    }

    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = Some(heading);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    pub fn with_device(mut self, device_id: DeviceId) -> Self {
        self.device_id = Some(device_id);
        self
    }

    pub fn position(&self) -> Waypoint {
        Waypoint::new(self.latitude, self.longitude)
    }

    pub fn coord(&self) -> Coord {
        self.position().into()
    }
}

#[cfg(feature = "serde")]
impl TryFrom<&[u8]> for PositionSample {
    type Error = &'static str;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        bincode::deserialize_from(value).map_err(|_| "Failed to deserialize PositionSample")
    }
}
