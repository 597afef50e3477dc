use std::time::Duration;

use tokio::time::{interval, Interval, MissedTickBehavior};

/// Repeating tick source that can be armed and disarmed. While disarmed `tick`
/// never completes, so a cancelled ticker cannot fire again.
#[derive(Debug, Default)]
pub struct Ticker {
    interval: Option<Interval>,
}

impl Ticker {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)arms the ticker. The first tick fires one period from now.
    pub fn arm(&mut self, period: Duration) {
        let mut interval = interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval.reset();
        self.interval = Some(interval);
    }

    /// Idempotent.
    pub fn cancel(&mut self) {
        self.interval = None;
    }

    pub fn is_armed(&self) -> bool {
        self.interval.is_some()
    }

    /// Cancel safe, so it can sit in a `select!` branch.
    pub async fn tick(&mut self) {
        match &mut self.interval {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending().await,
        }
    }
}
