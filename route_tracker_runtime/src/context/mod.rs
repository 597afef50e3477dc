use std::{ops::ControlFlow, sync::Arc, time::Duration};

use chrono::Utc;
use route_tracker_lib::{
    device::{DeviceId, DeviceInfo, Role},
    history::SampleHistory,
    position_sample::PositionSample,
    progress::Progress,
    relay_event::RelayEvent,
    route::Route,
    simulator::RouteSimulator,
};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    config::{Configuration, TrackingMode},
    location::{LocationResult, LocationSource, LocationWatch},
    relay::{Relay, RelaySubscription},
    renderer::{MapError, MapRenderer},
    ticker::Ticker,
};

mod handle;
mod notice;

use handle::Command;
pub use handle::{ContextClosed, TrackerHandle};
use notice::NoticeSender;
pub use notice::{Notice, NoticeLevel, NoticeReceiver};

/// The collaborators a context works with. They are owned by the context from
/// spawn until shutdown.
pub struct Dependencies {
    pub route: Route,
    pub location: Arc<dyn LocationSource>,
    /// `None` when no relay could be reached. Tracking still works locally.
    pub relay: Option<Arc<dyn Relay>>,
    /// `None` runs without a map.
    pub renderer: Option<Box<dyn MapRenderer>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running(TrackingMode),
}

#[derive(Debug, Clone)]
pub struct ContextSnapshot {
    pub device_id: DeviceId,
    pub role: Role,
    /// Mode the next session starts in.
    pub mode: TrackingMode,
    pub session: SessionState,
    /// Route progress of the latest playback session.
    pub progress: Progress,
    /// Samples of the latest session in the tracker role, received samples in the display role.
    pub history_len: usize,
    pub last_sample: Option<PositionSample>,
    pub devices: Vec<DeviceInfo>,
    pub following: Option<DeviceId>,
    pub map_loaded: bool,
}

/// Owns everything one tracking page holds: the simulator, the live location
/// watch, the relay subscription and the map. It runs as a single task, so every
/// state change happens in order on that task.
pub struct TrackerContext {
    device_id: DeviceId,
    role: Role,
    mode: TrackingMode,
    session: SessionState,
    last_session_mode: TrackingMode,
    following: Option<DeviceId>,
    devices: Vec<DeviceInfo>,

    simulator: RouteSimulator,
    session_epoch: u64,
    ticker: Ticker,
    tick_interval: Duration,

    location: Arc<dyn LocationSource>,
    location_timeout: Duration,
    live_watch: Option<LocationWatch>,
    live_history: SampleHistory,
    locate_tx: mpsc::UnboundedSender<LocationResult>,
    locate_rx: mpsc::UnboundedReceiver<LocationResult>,
    locate_task: Option<JoinHandle<()>>,

    relay: Option<Arc<dyn Relay>>,
    subscription: Option<RelaySubscription>,
    display_history: SampleHistory,

    renderer: Option<Box<dyn MapRenderer>>,
    zoom: f64,

    commands: mpsc::Receiver<Command>,
    notices: NoticeSender,
}

impl TrackerContext {
    pub fn spawn(config: &Configuration, dependencies: Dependencies) -> (TrackerHandle, NoticeReceiver) {
        let (tx, rx) = mpsc::channel(32);
        let (notices, notice_rx) = NoticeSender::channel();

        let context = Self::new(config, dependencies, rx, notices);
        tokio::spawn(context.run());

        (TrackerHandle::new(tx), notice_rx)
    }

    fn new(config: &Configuration, dependencies: Dependencies, commands: mpsc::Receiver<Command>, notices: NoticeSender) -> Self {
        let (locate_tx, locate_rx) = mpsc::unbounded_channel();

        Self {
            device_id: config.device_id.clone().unwrap_or_else(DeviceId::random),
            role: config.role,
            mode: config.mode,
            session: SessionState::Idle,
            last_session_mode: config.mode,
            following: None,
            devices: Vec::new(),

            simulator: RouteSimulator::new(dependencies.route, config.simulator_settings()),
            session_epoch: 0,
            ticker: Ticker::new(),
            tick_interval: config.tick_interval,

            location: dependencies.location,
            location_timeout: config.location_timeout,
            live_watch: None,
            live_history: SampleHistory::unbounded(),
            locate_tx,
            locate_rx,
            locate_task: None,

            relay: dependencies.relay,
            subscription: None,
            display_history: SampleHistory::bounded(config.display_history_limit),

            renderer: dependencies.renderer,
            zoom: config.map_zoom,

            commands,
            notices,
        }
    }

    async fn run(mut self) {
        self.mount();

        let shutdown_ack = loop {
            tokio::select! {
                command = self.commands.recv() => {
                    if let ControlFlow::Break(ack) = self.handle_command(command) {
                        break ack;
                    }
                }
                _ = self.ticker.tick() => self.on_tick(),
                fix = next_fix(&mut self.live_watch) => self.on_fix(fix),
                Some(located) = self.locate_rx.recv() => self.on_located(located),
                event = next_event(&mut self.subscription) => self.on_relay_event(event),
            }
        };

        self.unmount();

        if let Some(ack) = shutdown_ack {
            let _ = ack.send(());
        }
    }

    fn mount(&mut self) {
        tracing::info!("Tracker context {} starting as {}", self.device_id, self.role);

        let loaded = match self.renderer.as_mut().map(|renderer| renderer.load()) {
            Some(Ok(())) => true,
            Some(Err(err)) => {
                self.notices.send(Notice::error(err.to_string()));
                false
            }
            None => false,
        };

        if loaded {
            let center = self.simulator.route().first();
            let zoom = self.zoom;
            self.draw(move |map| map.set_view(center, zoom));
        } else {
            self.renderer = None;
        }

        self.announce();
        if self.role == Role::Display {
            self.subscribe();
        }
    }

    fn unmount(&mut self) {
        self.end_session();
        self.subscription = None;

        if let Some(task) = self.locate_task.take() {
            task.abort();
        }

        if let Some(relay) = &self.relay {
            if let Err(err) = relay.withdraw(&self.device_id) {
                tracing::warn!("Failed to leave the relay: {}", err);
            }
        }

        tracing::info!("Tracker context {} shut down", self.device_id);
    }

    fn handle_command(&mut self, command: Option<Command>) -> ControlFlow<Option<oneshot::Sender<()>>> {
        let Some(command) = command else {
            // Every handle is gone
            return ControlFlow::Break(None);
        };

        match command {
            Command::Start => self.start_session(),
            Command::Stop => self.stop_session(),
            Command::Locate => self.locate(),
            Command::SwitchRole(role) => self.switch_role(role),
            Command::SetMode(mode) => self.set_mode(mode),
            Command::Follow(device) => self.follow(device),
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Command::History(reply) => {
                let _ = reply.send(self.active_history().iter().cloned().collect());
            }
            Command::Shutdown(ack) => return ControlFlow::Break(Some(ack)),
        }

        ControlFlow::Continue(())
    }

    fn start_session(&mut self) {
        if self.role != Role::Tracker {
            self.notices.send(Notice::warning("Switch to the tracker role to start a session"));
            return;
        }

        self.end_session();

        match self.mode {
            TrackingMode::Playback => {
                self.session_epoch = self.simulator.start();
                self.ticker.arm(self.tick_interval);

                let route = self.simulator.route().clone();
                let zoom = self.zoom;
                self.draw(move |map| {
                    map.set_view(route.first(), zoom)?;
                    map.set_path(route.waypoints())
                });
            }
            TrackingMode::Live => {
                self.live_history.clear();
                self.live_watch = Some(self.location.watch());
            }
        }

        self.session = SessionState::Running(self.mode);
        self.last_session_mode = self.mode;
        self.notices.send(Notice::info(format!("Session started ({})", self.mode)));
    }

    fn stop_session(&mut self) {
        if self.session == SessionState::Idle {
            return;
        }
        self.end_session();
        self.notices.send(Notice::info("Session stopped"));
    }

    /// Cancels whatever drives the current session. Progress and history stay.
    fn end_session(&mut self) {
        self.ticker.cancel();
        self.simulator.stop();
        self.live_watch = None;
        self.session = SessionState::Idle;
    }

    fn set_mode(&mut self, mode: TrackingMode) {
        if mode == self.mode {
            return;
        }
        self.mode = mode;

        if self.session != SessionState::Idle {
            self.notices.send(Notice::info(format!("Mode set to {mode}, used from the next session")));
        } else {
            self.notices.send(Notice::info(format!("Mode set to {mode}")));
        }
    }

    fn switch_role(&mut self, role: Role) {
        if role != self.role {
            match role {
                Role::Display => {
                    if self.session != SessionState::Idle {
                        self.end_session();
                        self.notices.send(Notice::info("Session stopped"));
                    }
                    self.role = role;
                    self.subscribe();
                }
                Role::Tracker => {
                    self.subscription = None;
                    self.role = role;
                }
            }
            self.notices.send(Notice::info(format!("Switched to the {role} role")));
        }

        // Switching always re-announces, even to the same role
        self.announce();
    }

    fn follow(&mut self, device: Option<DeviceId>) {
        self.following = device;
        if self.role == Role::Display {
            self.subscribe();
        }
    }

    fn subscribe(&mut self) {
        self.display_history.clear();

        let Some(relay) = &self.relay else {
            self.subscription = None;
            self.notices.send(Notice::warning("No relay is connected, there is nothing to display"));
            return;
        };

        self.subscription = Some(relay.subscribe(self.following.clone()));
    }

    fn announce(&self) {
        let Some(relay) = &self.relay else {
            return;
        };

        let device = DeviceInfo {
            device_id: self.device_id.clone(),
            role: self.role,
        };
        if let Err(err) = relay.announce(device) {
            self.notices.send(Notice::error(err.to_string()));
        }
    }

    fn locate(&mut self) {
        if self.locate_task.as_ref().is_some_and(|task| !task.is_finished()) {
            self.notices.send(Notice::info("Already waiting for a position"));
            return;
        }

        let location = self.location.clone();
        let timeout = self.location_timeout;
        let tx = self.locate_tx.clone();

        self.locate_task = Some(tokio::spawn(async move {
            let _ = tx.send(location.current_position(timeout).await);
        }));
    }

    fn on_located(&mut self, located: LocationResult) {
        match located {
            Ok(sample) => {
                self.notices.send(Notice::info(format!("Current position {:.5}, {:.5}", sample.latitude, sample.longitude)));

                let position = sample.position();
                let heading = sample.heading.unwrap_or(0.);
                let zoom = self.zoom;
                self.draw(move |map| {
                    map.set_view(position, zoom)?;
                    map.set_marker(position, heading)
                });

                if self.role == Role::Tracker {
                    self.publish(&sample.with_device(self.device_id.clone()));
                }
            }
            Err(err) => self.notices.send(Notice::error(err.to_string())),
        }
    }

    fn on_tick(&mut self) {
        let Some(sample) = self.simulator.tick_for(self.session_epoch, Utc::now()) else {
            return;
        };

        let sample = sample.with_device(self.device_id.clone());
        self.publish(&sample);

        let position = sample.position();
        let heading = sample.heading.unwrap_or(0.);
        self.draw(move |map| map.set_marker(position, heading));
    }

    fn on_fix(&mut self, fix: Option<LocationResult>) {
        match fix {
            Some(Ok(sample)) => {
                if self.session != SessionState::Running(TrackingMode::Live) {
                    return;
                }

                let sample = sample.with_device(self.device_id.clone());
                self.live_history.push(sample.clone());
                self.publish(&sample);

                let position = sample.position();
                let heading = sample.heading.unwrap_or(0.);
                let path = self.live_history.path();
                self.draw(move |map| {
                    map.set_marker(position, heading)?;
                    map.set_path(&path)
                });
            }
            // The session keeps running, the sensor may recover
            Some(Err(err)) => self.notices.send(Notice::error(err.to_string())),
            None => {
                self.live_watch = None;
                self.notices.send(Notice::warning("Location updates have stopped"));
            }
        }
    }

    fn on_relay_event(&mut self, event: Option<RelayEvent>) {
        match event {
            Some(RelayEvent::DeviceList(devices)) => {
                tracing::debug!("{} devices on the relay", devices.len());
                self.devices = devices;
            }
            Some(RelayEvent::LocationUpdate(sample)) => {
                if sample.device_id.as_ref() == Some(&self.device_id) {
                    return;
                }

                let position = sample.position();
                let heading = sample.heading.unwrap_or(0.);
                self.display_history.push(sample);

                let path = self.display_history.path();
                self.draw(move |map| {
                    map.set_marker(position, heading)?;
                    map.set_path(&path)
                });
            }
            None => {
                self.subscription = None;
                self.notices.send(Notice::error("Lost the connection to the relay"));
            }
        }
    }

    fn publish(&self, sample: &PositionSample) {
        let Some(relay) = &self.relay else {
            return;
        };
        if let Err(err) = relay.publish(sample) {
            self.notices.send(Notice::error(err.to_string()));
        }
    }

    /// Applies an update to the map. A map that fails to draw is dropped, the
    /// rest of the context carries on without it.
    fn draw(&mut self, update: impl FnOnce(&mut dyn MapRenderer) -> Result<(), MapError>) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };

        if let Err(err) = update(&mut **renderer) {
            self.notices.send(Notice::error(format!("{err}. The map is no longer updated")));
            self.renderer = None;
        }
    }

    fn active_history(&self) -> &SampleHistory {
        match (self.role, self.last_session_mode) {
            (Role::Display, _) => &self.display_history,
            (Role::Tracker, TrackingMode::Playback) => self.simulator.history(),
            (Role::Tracker, TrackingMode::Live) => &self.live_history,
        }
    }

    fn snapshot(&self) -> ContextSnapshot {
        let history = self.active_history();

        ContextSnapshot {
            device_id: self.device_id.clone(),
            role: self.role,
            mode: self.mode,
            session: self.session,
            progress: self.simulator.progress(),
            history_len: history.len(),
            last_sample: history.last().cloned(),
            devices: self.devices.clone(),
            following: self.following.clone(),
            map_loaded: self.renderer.is_some(),
        }
    }
}

async fn next_fix(watch: &mut Option<LocationWatch>) -> Option<LocationResult> {
    match watch {
        Some(watch) => watch.next_fix().await,
        None => std::future::pending().await,
    }
}

async fn next_event(subscription: &mut Option<RelaySubscription>) -> Option<RelayEvent> {
    match subscription {
        Some(subscription) => subscription.next_event().await,
        None => std::future::pending().await,
    }
}
