use std::time::Duration;

use tokio::sync::mpsc;

use super::{LocationError, LocationResult, LocationSource, LocationWatch};

/// Stands in when the device has no usable positioning sensor. Every request fails
/// with the same error.
#[derive(Debug, Clone)]
pub struct UnavailableSource {
    error: LocationError,
}

impl UnavailableSource {
    pub fn new(error: LocationError) -> Self {
        Self { error }
    }

    pub fn unsupported() -> Self {
        Self::new(LocationError::Unsupported)
    }
}

#[async_trait::async_trait]
impl LocationSource for UnavailableSource {
    async fn current_position(&self, _timeout: Duration) -> LocationResult {
        Err(self.error.clone())
    }

    fn watch(&self) -> LocationWatch {
        let (tx, rx) = mpsc::channel(1);
        // Capacity is 1 and the channel is fresh, so this cannot fail
        let _ = tx.try_send(Err(self.error.clone()));
        LocationWatch::new(rx, None)
    }
}
