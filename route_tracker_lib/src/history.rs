use std::collections::VecDeque;

use crate::{position_sample::PositionSample, route::Waypoint};

/// Time ordered samples of one session. With a capacity, the oldest samples are
/// evicted first.
#[derive(Debug, Clone, Default)]
pub struct SampleHistory {
    samples: VecDeque<PositionSample>,
    capacity: Option<usize>,
}

impl SampleHistory {
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn bounded(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.min(1024)),
            capacity: Some(capacity.max(1)),
        }
    }

    /// Adds a sample at its place in time. Samples are stored as received, a late
    /// one is inserted before the newer ones instead of being appended.
    pub fn push(&mut self, sample: PositionSample) {
        let index = self.samples.partition_point(|stored| stored.timestamp <= sample.timestamp);
        self.samples.insert(index, sample);

        if let Some(capacity) = self.capacity {
            while self.samples.len() > capacity {
                self.samples.pop_front();
            }
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn last(&self) -> Option<&PositionSample> {
        self.samples.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PositionSample> {
        self.samples.iter()
    }

    /// The path travelled so far, oldest first.
    pub fn path(&self) -> Vec<Waypoint> {
        self.samples.iter().map(PositionSample::position).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::device::DeviceId;

    fn sample_at(seconds: i64) -> PositionSample {
        let timestamp = Utc.timestamp_opt(1_700_000_000, 0).unwrap() + Duration::seconds(seconds);
        PositionSample::new(Waypoint::new(56.0, 10.0 + seconds as f64 * 0.001), timestamp)
    }

    #[test]
    fn bounded_evicts_oldest() {
        let mut history = SampleHistory::bounded(200);
        for i in 0..250 {
            history.push(sample_at(i));
        }
        assert_eq!(history.len(), 200);
        assert_eq!(history.iter().next().unwrap().timestamp, sample_at(50).timestamp);
        assert_eq!(history.last().unwrap().timestamp, sample_at(249).timestamp);
    }

    #[test]
    fn late_samples_keep_their_timestamp() {
        let mut history = SampleHistory::unbounded();
        history.push(sample_at(10));
        history.push(sample_at(5));
        history.push(sample_at(12));

        let stamps: Vec<_> = history.iter().map(|s| s.timestamp).collect();
        assert_eq!(stamps, vec![sample_at(5).timestamp, sample_at(10).timestamp, sample_at(12).timestamp]);
        assert_eq!(history.last(), Some(&sample_at(12)));
    }

    #[test]
    fn late_sample_from_another_device_is_unchanged() {
        let mut history = SampleHistory::bounded(200);
        let first = sample_at(10).with_device(DeviceId::new("t1"));
        let second = sample_at(4).with_device(DeviceId::new("t2"));
        history.push(first.clone());
        history.push(second.clone());

        let stored: Vec<_> = history.iter().cloned().collect();
        assert_eq!(stored, vec![second, first]);
    }

    #[test]
    fn full_history_drops_the_oldest_sample() {
        let mut history = SampleHistory::bounded(2);
        history.push(sample_at(10));
        history.push(sample_at(20));
        history.push(sample_at(15));
        history.push(sample_at(1));

        let stamps: Vec<_> = history.iter().map(|s| s.timestamp).collect();
        assert_eq!(stamps, vec![sample_at(15).timestamp, sample_at(20).timestamp]);
    }

    #[test]
    fn path_follows_samples() {
        let mut history = SampleHistory::unbounded();
        history.push(sample_at(0));
        history.push(sample_at(1));
        assert_eq!(history.path(), vec![sample_at(0).position(), sample_at(1).position()]);

        history.clear();
        assert!(history.is_empty());
    }
}
