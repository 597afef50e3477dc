use route_tracker_lib::{
    device::{DeviceId, Role},
    position_sample::PositionSample,
};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use super::ContextSnapshot;
use crate::config::TrackingMode;

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("The tracker context has shut down")]
pub struct ContextClosed;

pub(crate) enum Command {
    Start,
    Stop,
    Locate,
    SwitchRole(Role),
    SetMode(TrackingMode),
    Follow(Option<DeviceId>),
    Snapshot(oneshot::Sender<ContextSnapshot>),
    History(oneshot::Sender<Vec<PositionSample>>),
    Shutdown(oneshot::Sender<()>),
}

/// Controls a running `TrackerContext`. Commands are handled in the order they are
/// sent. The context shuts down once every handle is dropped.
#[derive(Clone)]
pub struct TrackerHandle {
    commands: mpsc::Sender<Command>,
}

impl TrackerHandle {
    pub(crate) fn new(commands: mpsc::Sender<Command>) -> Self {
        Self { commands }
    }

    async fn send(&self, command: Command) -> Result<(), ContextClosed> {
        self.commands.send(command).await.map_err(|_| ContextClosed)
    }

    pub async fn start(&self) -> Result<(), ContextClosed> {
        self.send(Command::Start).await
    }

    pub async fn stop(&self) -> Result<(), ContextClosed> {
        self.send(Command::Stop).await
    }

    /// Fetches one position. The result arrives as a notice and on the map.
    pub async fn locate(&self) -> Result<(), ContextClosed> {
        self.send(Command::Locate).await
    }

    pub async fn switch_role(&self, role: Role) -> Result<(), ContextClosed> {
        self.send(Command::SwitchRole(role)).await
    }

    pub async fn set_mode(&self, mode: TrackingMode) -> Result<(), ContextClosed> {
        self.send(Command::SetMode(mode)).await
    }

    pub async fn follow(&self, device: Option<DeviceId>) -> Result<(), ContextClosed> {
        self.send(Command::Follow(device)).await
    }

    pub async fn snapshot(&self) -> Result<ContextSnapshot, ContextClosed> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Snapshot(tx)).await?;
        rx.await.map_err(|_| ContextClosed)
    }

    /// Samples behind the snapshot's history, oldest first, as they were recorded.
    pub async fn history(&self) -> Result<Vec<PositionSample>, ContextClosed> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::History(tx)).await?;
        rx.await.map_err(|_| ContextClosed)
    }

    /// Resolves once the context has released everything it holds.
    pub async fn shutdown(&self) -> Result<(), ContextClosed> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Shutdown(tx)).await?;
        rx.await.map_err(|_| ContextClosed)
    }
}
