use std::{
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use futures::{stream::BoxStream, Stream, StreamExt};
use route_tracker_lib::{
    device::{DeviceId, DeviceInfo},
    position_sample::PositionSample,
    relay_event::RelayEvent,
};
use thiserror::Error;

use crate::config::LOCAL_RELAY;

mod local;

pub use local::LocalRelay;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RelayError {
    #[error("Could not connect to the relay at {0}")]
    Unreachable(String),
    #[error("Failed to publish to the relay: {0}")]
    Publish(String),
}

/// Publish/subscribe channel between tracker and display devices.
pub trait Relay: Send + Sync {
    /// Makes a device known to everyone, replacing its previous role if it had one.
    fn announce(&self, device: DeviceInfo) -> Result<(), RelayError>;

    fn withdraw(&self, device_id: &DeviceId) -> Result<(), RelayError>;

    /// The sample must carry the publishing device's id.
    fn publish(&self, sample: &PositionSample) -> Result<(), RelayError>;

    /// Location updates from `device`, or from every device when `None`. Device
    /// lists are always delivered, starting with the current one.
    fn subscribe(&self, device: Option<DeviceId>) -> RelaySubscription;
}

pub struct RelaySubscription {
    events: BoxStream<'static, RelayEvent>,
}

impl RelaySubscription {
    pub fn new(events: BoxStream<'static, RelayEvent>) -> Self {
        Self { events }
    }

    pub async fn next_event(&mut self) -> Option<RelayEvent> {
        self.events.next().await
    }
}

impl Stream for RelaySubscription {
    type Item = RelayEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.events.poll_next_unpin(cx)
    }
}

/// Only the in-process relay exists. Any other endpoint is reported as unreachable,
/// there is no reconnect.
pub fn connect(endpoint: &str) -> Result<Arc<dyn Relay>, RelayError> {
    let endpoint = endpoint.trim();
    if endpoint.is_empty() || endpoint == LOCAL_RELAY {
        tracing::info!("Using in-process relay");
        return Ok(Arc::new(LocalRelay::new()));
    }

    tracing::warn!("Relay endpoint {} is not reachable", endpoint);
    Err(RelayError::Unreachable(endpoint.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_local_endpoint_connects() {
        assert!(connect("local").is_ok());
        assert!(connect("  ").is_ok());
        assert_eq!(
            connect("wss://placeholder.invalid").err(),
            Some(RelayError::Unreachable("wss://placeholder.invalid".into()))
        );
    }
}
