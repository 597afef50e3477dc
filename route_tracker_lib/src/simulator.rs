use chrono::{DateTime, Utc};

use crate::{
    history::SampleHistory, position_sample::PositionSample, progress::Progress, route::{Route, Waypoint},
};

pub const DEFAULT_INCREMENT: f64 = 0.001;
/// 40 km/h
pub const DEFAULT_NOMINAL_SPEED: f64 = 11.11;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatorSettings {
    /// Progress added per tick.
    pub increment: f64,
    /// Speed reported on every simulated sample, m/s.
    pub nominal_speed: f64,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            increment: DEFAULT_INCREMENT,
            nominal_speed: DEFAULT_NOMINAL_SPEED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimulatorState {
    #[default]
    Idle,
    Running,
}

/// Drives a position along a fixed route. Purely arithmetic: the caller supplies
/// the clock and decides when to tick.
#[derive(Debug, Clone)]
pub struct RouteSimulator {
    route: Route,
    settings: SimulatorSettings,
    state: SimulatorState,
    progress: Progress,
    history: SampleHistory,
    epoch: u64,
}

impl RouteSimulator {
    pub fn new(route: Route, settings: SimulatorSettings) -> Self {
        Self {
            route,
            settings,
            state: SimulatorState::Idle,
            progress: Progress::START,
            history: SampleHistory::unbounded(),
            epoch: 0,
        }
    }

    /// Begins a new session, restarting if one is already running. Progress and
    /// history are reset. Returns the epoch identifying the new session.
    pub fn start(&mut self) -> u64 {
        self.progress = Progress::START;
        self.history.clear();
        self.state = SimulatorState::Running;
        self.epoch += 1;
        self.epoch
    }

    /// Idempotent. Progress and history keep their last values until the next start.
    pub fn stop(&mut self) {
        self.state = SimulatorState::Idle;
    }

    /// Advances one step and records the sample at the new progress. Does nothing
    /// while idle.
    ///
    /// A finished session is still running: every tick appends the final waypoint
    /// again, so the history keeps growing until `stop` is called.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<PositionSample> {
        if self.state != SimulatorState::Running {
            return None;
        }

        self.progress = self.progress.advance(self.settings.increment);

        let sample = PositionSample::new(self.route.position_at(self.progress), now)
            .with_heading(self.route.heading_at(self.progress))
            .with_speed(self.settings.nominal_speed);

        self.history.push(sample.clone());
        Some(sample)
    }

    /// Same as `tick`, but ignored unless `epoch` belongs to the current session.
    pub fn tick_for(&mut self, epoch: u64, now: DateTime<Utc>) -> Option<PositionSample> {
        if epoch != self.epoch {
            return None;
        }
        self.tick(now)
    }

    pub fn state(&self) -> SimulatorState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == SimulatorState::Running
    }

    pub fn progress(&self) -> Progress {
        self.progress
    }

    pub fn history(&self) -> &SampleHistory {
        &self.history
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn settings(&self) -> SimulatorSettings {
        self.settings
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn current_position(&self) -> Waypoint {
        self.route.position_at(self.progress)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn karimnagar_hyderabad() -> Route {
        Route::new(vec![Waypoint::new(18.4386, 79.1288), Waypoint::new(17.3850, 78.4867)]).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn frame(i: i64) -> DateTime<Utc> {
        t0() + Duration::milliseconds(16 * i)
    }

    #[test]
    fn idle_tick_is_noop() {
        let mut sim = RouteSimulator::new(karimnagar_hyderabad(), SimulatorSettings::default());
        assert_eq!(sim.tick(t0()), None);
        assert_eq!(sim.progress(), Progress::START);
        assert!(sim.history().is_empty());
    }

    #[test]
    fn start_resets_progress_and_history() {
        let mut sim = RouteSimulator::new(karimnagar_hyderabad(), SimulatorSettings::default());
        sim.start();
        for i in 0..10 {
            sim.tick(frame(i));
        }
        assert_eq!(sim.history().len(), 10);

        sim.start();
        assert_eq!(sim.progress(), Progress::START);
        assert!(sim.history().is_empty());
        assert!(sim.is_running());
    }

    #[test]
    fn history_grows_by_one_per_tick_in_order() {
        let mut sim = RouteSimulator::new(karimnagar_hyderabad(), SimulatorSettings::default());
        sim.start();

        let mut last_progress = sim.progress();
        for i in 0..1500 {
            let sample = sim.tick(frame(i)).unwrap();
            assert_eq!(sim.history().len(), i as usize + 1);
            assert!(sim.progress() >= last_progress);
            assert!(sim.progress().value() <= 1.);
            assert_eq!(sample.speed, Some(DEFAULT_NOMINAL_SPEED));
            last_progress = sim.progress();
        }

        let stamps: Vec<_> = sim.history().iter().map(|s| s.timestamp).collect();
        assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn reaches_exactly_one_and_stays_there() {
        let mut sim = RouteSimulator::new(karimnagar_hyderabad(), SimulatorSettings::default());
        sim.start();
        // A few extra ticks to absorb float accumulation
        for i in 0..1010 {
            sim.tick(frame(i));
        }
        assert_eq!(sim.progress(), Progress::COMPLETE);
        assert_eq!(sim.current_position(), Waypoint::new(17.3850, 78.4867));

        for i in 1010..1100 {
            sim.tick(frame(i));
            assert_eq!(sim.progress().value(), 1.);
        }
    }

    #[test]
    fn finished_session_keeps_appending() {
        let settings = SimulatorSettings { increment: 0.5, ..SimulatorSettings::default() };
        let mut sim = RouteSimulator::new(karimnagar_hyderabad(), settings);
        sim.start();
        for i in 0..5 {
            sim.tick(frame(i));
        }

        assert!(sim.progress().is_complete());
        assert!(sim.is_running());
        assert_eq!(sim.history().len(), 5);
        assert!(sim.history().iter().skip(1).all(|s| s.position() == Waypoint::new(17.3850, 78.4867)));
    }

    #[test]
    fn heading_is_segment_bearing() {
        let route = karimnagar_hyderabad();
        let expected = route.segment_bearing(0);
        let mut sim = RouteSimulator::new(route, SimulatorSettings::default());
        sim.start();
        for i in 0..999 {
            let sample = sim.tick(frame(i)).unwrap();
            assert_eq!(sample.heading, Some(expected));
        }
    }

    #[test]
    fn stop_keeps_state_and_ignores_ticks() {
        let mut sim = RouteSimulator::new(karimnagar_hyderabad(), SimulatorSettings::default());
        sim.start();
        for i in 0..5 {
            sim.tick(frame(i));
        }
        let progress = sim.progress();

        sim.stop();
        sim.stop();
        assert_eq!(sim.state(), SimulatorState::Idle);
        assert_eq!(sim.tick(frame(6)), None);
        assert_eq!(sim.progress(), progress);
        assert_eq!(sim.history().len(), 5);
    }

    #[test]
    fn stop_then_start_after_completion() {
        let mut sim = RouteSimulator::new(karimnagar_hyderabad(), SimulatorSettings { increment: 0.25, ..Default::default() });
        sim.start();
        for i in 0..8 {
            sim.tick(frame(i));
        }
        assert!(sim.progress().is_complete());

        sim.stop();
        sim.start();
        assert_eq!(sim.progress(), Progress::START);
        assert_eq!(sim.history().len(), 0);
    }

    #[test]
    fn stale_epoch_cannot_tick() {
        let mut sim = RouteSimulator::new(karimnagar_hyderabad(), SimulatorSettings::default());
        let old = sim.start();
        let current = sim.start();
        assert_ne!(old, current);

        assert_eq!(sim.tick_for(old, frame(0)), None);
        assert!(sim.history().is_empty());
        assert!(sim.tick_for(current, frame(0)).is_some());
    }
}
