use std::{fmt::Write, str::FromStr};

use route_tracker_lib::{
    device::{DeviceId, Role},
    position_sample::PositionSample,
};
use route_tracker_runtime::{ContextSnapshot, SessionState, TrackingMode};

pub const HELP: &str = "\
Commands:
  start                  start a session in the current mode
  stop                   stop the running session
  locate                 fetch the current position once
  role tracker|display   switch role
  mode live|playback     mode used by the next session
  follow <device>|all    which trackers the display shows
  status                 show the tracker state
  history                list the recorded samples
  help                   show this text
  quit                   shut down";

/// One line typed at the console.
#[derive(Debug, Clone, PartialEq)]
pub enum Control {
    Start,
    Stop,
    Locate,
    Role(Role),
    Mode(TrackingMode),
    Follow(Option<DeviceId>),
    Status,
    History,
    Help,
    Quit,
}

impl FromStr for Control {
    type Err = String;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            return Err("Empty command".into());
        };
        let command = command.to_ascii_lowercase();
        let argument = words.next();
        if words.next().is_some() {
            return Err(format!("Too many arguments for '{command}'"));
        }

        let control = match (command.as_str(), argument) {
            ("start", None) => Control::Start,
            ("stop", None) => Control::Stop,
            ("locate", None) => Control::Locate,
            ("status", None) => Control::Status,
            ("history", None) => Control::History,
            ("help", None) => Control::Help,
            ("quit", None) => Control::Quit,
            ("role", Some(role)) => Control::Role(role.parse()?),
            ("mode", Some(mode)) => Control::Mode(mode.parse()?),
            ("follow", Some(device)) if device.eq_ignore_ascii_case("all") => Control::Follow(None),
            ("follow", Some(device)) => Control::Follow(Some(DeviceId::new(device))),
            ("role" | "mode" | "follow", None) => return Err(format!("'{command}' needs an argument")),
            ("start" | "stop" | "locate" | "status" | "history" | "help" | "quit", Some(_)) => {
                return Err(format!("'{command}' takes no argument"));
            }
            _ => return Err(format!("Unknown command '{command}', type help for a list")),
        };

        Ok(control)
    }
}

pub fn describe(snapshot: &ContextSnapshot) -> String {
    let mut out = String::new();

    let session = match snapshot.session {
        SessionState::Idle => "idle".to_string(),
        SessionState::Running(mode) => format!("running ({mode})"),
    };

    let _ = writeln!(out, "device    {} ({})", snapshot.device_id, snapshot.role);
    let _ = writeln!(out, "session   {session}, next one in {} mode", snapshot.mode);
    let _ = writeln!(out, "progress  {:.1}%", snapshot.progress.value() * 100.);
    let _ = writeln!(out, "samples   {}", snapshot.history_len);

    if let Some(sample) = &snapshot.last_sample {
        let heading = sample.heading.map_or("-".to_string(), |h| format!("{h:.1}"));
        let _ = writeln!(out, "last      {:.5}, {:.5} heading {heading}", sample.latitude, sample.longitude);
    }

    if snapshot.role == Role::Display {
        let following = snapshot.following.as_ref().map_or("all".to_string(), DeviceId::to_string);
        let _ = writeln!(out, "following {following}");

        let devices: Vec<String> = snapshot.devices.iter()
            .map(|device| format!("{} ({})", device.device_id, device.role))
            .collect();
        let _ = writeln!(out, "devices   {}", devices.join(", "));
    }

    let _ = write!(out, "map       {}", if snapshot.map_loaded { "loaded" } else { "not shown" });
    out
}

/// One line per sample, oldest first.
pub fn describe_history(samples: &[PositionSample]) -> String {
    if samples.is_empty() {
        return "No samples recorded".to_string();
    }

    samples.iter()
        .map(|sample| {
            let device = sample.device_id.as_ref().map_or("-".to_string(), DeviceId::to_string);
            format!(
                "{}  {:.5}, {:.5}  {device}",
                sample.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
                sample.latitude,
                sample.longitude
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
