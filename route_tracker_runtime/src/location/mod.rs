use std::{
    pin::Pin,
    task::{Context, Poll},
    time::Duration,
};

use futures::Stream;
use route_tracker_lib::position_sample::PositionSample;
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};

mod replay;
mod unavailable;

pub use replay::ReplaySource;
pub use unavailable::UnavailableSource;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LocationError {
    #[error("Location is not supported on this device")]
    Unsupported,
    #[error("Permission to read the location was denied")]
    PermissionDenied,
    #[error("Timed out waiting for a location fix")]
    Timeout,
    #[error("Location unavailable: {0}")]
    Unavailable(String),
}

pub type LocationResult = Result<PositionSample, LocationError>;

/// A device positioning sensor.
#[async_trait::async_trait]
pub trait LocationSource: Send + Sync {
    /// One fix, failing with `LocationError::Timeout` if none arrives in time.
    async fn current_position(&self, timeout: Duration) -> LocationResult;

    /// Subscribes to every new fix or failure. Dropping the watch ends the subscription.
    fn watch(&self) -> LocationWatch;
}

/// Stream of fixes from a `LocationSource`. The producing task is aborted when the
/// watch is dropped.
pub struct LocationWatch {
    receiver: mpsc::Receiver<LocationResult>,
    producer: Option<JoinHandle<()>>,
}

impl LocationWatch {
    pub fn new(receiver: mpsc::Receiver<LocationResult>, producer: Option<JoinHandle<()>>) -> Self {
        Self { receiver, producer }
    }

    /// Yields `None` once the source has nothing more to say.
    pub async fn next_fix(&mut self) -> Option<LocationResult> {
        self.receiver.recv().await
    }
}

impl Stream for LocationWatch {
    type Item = LocationResult;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for LocationWatch {
    fn drop(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}
