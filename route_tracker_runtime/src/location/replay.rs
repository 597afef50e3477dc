use std::{
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use chrono::Utc;
use route_tracker_lib::{geo_util::initial_bearing, position_sample::PositionSample};
use tokio::sync::mpsc;

use super::{LocationError, LocationResult, LocationSource, LocationWatch};
use crate::gpx_util::{self, GpxError};

/// Plays back a recorded track as if it came from a sensor, one fix per interval,
/// starting over when the end is reached. Fixes are stamped with the current time.
#[derive(Clone)]
pub struct ReplaySource {
    track: Arc<Vec<PositionSample>>,
    interval: Duration,
    cursor: Arc<AtomicUsize>,
}

impl ReplaySource {
    pub fn new(track: Vec<PositionSample>, interval: Duration) -> Self {
        Self {
            track: Arc::new(track),
            interval,
            cursor: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn from_gpx(path: impl AsRef<Path>, interval: Duration) -> Result<Self, GpxError> {
        Ok(Self::new(gpx_util::read_track(path)?, interval))
    }

    fn next_fix(&self) -> LocationResult {
        if self.track.is_empty() {
            return Err(LocationError::Unavailable("The recorded track is empty".into()));
        }

        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.track.len();
        let mut sample = self.track[index].clone();
        sample.timestamp = Utc::now();

        if sample.heading.is_none() && index > 0 {
            let previous = &self.track[index - 1];
            if previous.position() != sample.position() {
                sample.heading = Some(initial_bearing(previous.position().as_pair(), sample.position().as_pair()));
            }
        }

        Ok(sample)
    }
}

#[async_trait::async_trait]
impl LocationSource for ReplaySource {
    async fn current_position(&self, timeout: Duration) -> LocationResult {
        // A fix takes one interval to come in
        match tokio::time::timeout(timeout, tokio::time::sleep(self.interval)).await {
            Ok(()) => self.next_fix(),
            Err(_) => Err(LocationError::Timeout),
        }
    }

    fn watch(&self) -> LocationWatch {
        let (tx, rx) = mpsc::channel(16);
        let source = self.clone();

        let producer = tokio::spawn(async move {
            let mut interval = tokio::time::interval(source.interval);
            interval.reset();
            loop {
                interval.tick().await;
                let fix = source.next_fix();
                let failed = fix.is_err();
                if tx.send(fix).await.is_err() || failed {
                    break;
                }
            }
            tracing::debug!("Replay watch ended");
        });

        LocationWatch::new(rx, Some(producer))
    }
}
