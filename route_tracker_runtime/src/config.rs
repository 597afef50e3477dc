use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use route_tracker_lib::{
    device::{DeviceId, Role},
    route::{Route, RouteError, Waypoint},
    simulator::{SimulatorSettings, DEFAULT_INCREMENT, DEFAULT_NOMINAL_SPEED},
};
use thiserror::Error;

use crate::{gpx_util::{self, GpxError}, DEFAULT_ROUTE};

pub const DEFAULT_TILE_URL: &str = "https://api.maptiler.com/maps/basic-v2/256/{z}/{x}/{y}.png?key={key}";
pub const LOCAL_RELAY: &str = "local";

/// Where tracker samples come from: the route simulator or the location source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackingMode {
    #[default]
    Playback,
    Live,
}

impl fmt::Display for TrackingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackingMode::Playback => f.write_str("playback"),
            TrackingMode::Live => f.write_str("live"),
        }
    }
}

impl FromStr for TrackingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "playback" | "simulated" => Ok(TrackingMode::Playback),
            "live" => Ok(TrackingMode::Live),
            other => Err(format!("Unknown mode '{other}', expected live or playback")),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration {path:?}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("Line {line} is not a key = value pair")]
    Malformed { line: usize },
    #[error("Invalid value '{value}' for {key}: {reason}")]
    InvalidValue { key: String, value: String, reason: String },
    #[error("Invalid route: {0}")]
    Route(#[from] RouteError),
    #[error(transparent)]
    Gpx(#[from] GpxError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Configuration {
    pub device_id: Option<DeviceId>,
    pub role: Role,
    pub mode: TrackingMode,

    pub map_api_key: Option<String>,
    pub map_tile_url: String,
    pub map_zoom: f64,

    pub relay_endpoint: String,

    pub tick_interval: Duration,
    pub progress_increment: f64,
    pub nominal_speed: f64,
    pub display_history_limit: usize,

    pub location_timeout: Duration,
    pub live_interval: Duration,
    pub live_gpx: Option<PathBuf>,

    pub route_gpx: Option<PathBuf>,
    pub waypoints: Vec<Waypoint>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            device_id: None,
            role: Role::Tracker,
            mode: TrackingMode::Playback,
            map_api_key: None,
            map_tile_url: DEFAULT_TILE_URL.to_string(),
            map_zoom: 8.,
            relay_endpoint: LOCAL_RELAY.to_string(),
            tick_interval: Duration::from_millis(16),
            progress_increment: DEFAULT_INCREMENT,
            nominal_speed: DEFAULT_NOMINAL_SPEED,
            display_history_limit: 200,
            location_timeout: Duration::from_millis(10_000),
            live_interval: Duration::from_millis(1_000),
            live_gpx: None,
            route_gpx: None,
            waypoints: Vec::new(),
        }
    }
}

impl Configuration {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for (number, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                return Err(ConfigError::Malformed { line: number + 1 });
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "device_id" => config.device_id = Some(DeviceId::new(value)),
                "role" => config.role = parse_with(key, value, Role::from_str)?,
                "mode" => config.mode = parse_with(key, value, TrackingMode::from_str)?,
                "map_api_key" => config.map_api_key = (!value.is_empty()).then(|| value.to_string()),
                "map_tile_url" => config.map_tile_url = value.to_string(),
                "map_zoom" => config.map_zoom = parse_number(key, value)?,
                "relay_endpoint" => config.relay_endpoint = value.to_string(),
                "tick_interval_ms" => config.tick_interval = parse_millis(key, value)?,
                "progress_increment" => config.progress_increment = parse_number(key, value)?,
                "nominal_speed" => config.nominal_speed = parse_number(key, value)?,
                "display_history_limit" => config.display_history_limit = parse_number(key, value)?,
                "location_timeout_ms" => config.location_timeout = parse_millis(key, value)?,
                "live_interval_ms" => config.live_interval = parse_millis(key, value)?,
                "live_gpx" => config.live_gpx = Some(PathBuf::from(value)),
                "route_gpx" => config.route_gpx = Some(PathBuf::from(value)),
                "waypoint" => config.waypoints.push(parse_waypoint(key, value)?),
                _ => {
                    tracing::warn!("Unknown config key: {}", key);
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// Checked by `parse`. Call it again after overriding fields.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device_id.as_ref().is_some_and(|id| id.as_str().is_empty()) {
            return Err(invalid("device_id", "", "must not be empty"));
        }
        if !(self.map_zoom.is_finite() && self.map_zoom >= 0.) {
            return Err(invalid("map_zoom", self.map_zoom, "must be a number of at least 0"));
        }
        if !(self.progress_increment > 0. && self.progress_increment <= 1.) {
            return Err(invalid("progress_increment", self.progress_increment, "must be in (0, 1]"));
        }
        if !(self.nominal_speed >= 0.) {
            return Err(invalid("nominal_speed", self.nominal_speed, "must not be negative"));
        }
        if self.display_history_limit == 0 {
            return Err(invalid("display_history_limit", 0, "must be at least 1"));
        }
        if self.tick_interval.is_zero() {
            return Err(invalid("tick_interval_ms", 0, "must be at least 1"));
        }
        if self.live_interval.is_zero() {
            return Err(invalid("live_interval_ms", 0, "must be at least 1"));
        }
        Ok(())
    }

    /// The configured route: a GPX file wins over inline waypoints, and the
    /// built in route is used when neither is given.
    pub fn route(&self) -> Result<Route, ConfigError> {
        if let Some(path) = &self.route_gpx {
            return Ok(gpx_util::read_route(path)?);
        }

        if self.waypoints.is_empty() {
            let waypoints = DEFAULT_ROUTE.iter().map(|&(lat, lon)| Waypoint::new(lat, lon)).collect();
            return Ok(Route::new(waypoints)?);
        }

        Ok(Route::new(self.waypoints.clone())?)
    }

    pub fn simulator_settings(&self) -> SimulatorSettings {
        SimulatorSettings {
            increment: self.progress_increment,
            nominal_speed: self.nominal_speed,
        }
    }

    /// Tile URL with the API key filled in, if there is a key.
    pub fn tile_url(&self) -> Option<String> {
        self.map_api_key.as_ref().map(|key| self.map_tile_url.replace("{key}", key))
    }
}

fn invalid(key: &str, value: impl ToString, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_with<T>(key: &str, value: &str, parse: impl Fn(&str) -> Result<T, String>) -> Result<T, ConfigError> {
    parse(value).map_err(|reason| invalid(key, value, &reason))
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: ToString,
{
    value.parse::<T>().map_err(|err| invalid(key, value, &err.to_string()))
}

fn parse_millis(key: &str, value: &str) -> Result<Duration, ConfigError> {
    parse_number::<u64>(key, value).map(Duration::from_millis)
}

fn parse_waypoint(key: &str, value: &str) -> Result<Waypoint, ConfigError> {
    let Some((lat, lon)) = value.split_once(',') else {
        return Err(invalid(key, value, "expected 'latitude, longitude'"));
    };
    Ok(Waypoint::new(parse_number(key, lat.trim())?, parse_number(key, lon.trim())?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_empty() {
        let config = Configuration::parse("").unwrap();
        assert_eq!(config, Configuration::default());
        assert_eq!(config.route().unwrap().waypoints().len(), DEFAULT_ROUTE.len());
        assert_eq!(config.tile_url(), None);
    }

    #[test]
    fn parses_all_keys() {
        let text = "
            # Tracker on the Karimnagar road
            device_id = phone-1
            role = display
            mode = live
            map_api_key = secret
            map_zoom = 12.5
            relay_endpoint = wss://relay.invalid/socket
            tick_interval_ms = 33
            progress_increment = 0.002
            nominal_speed = 5
            display_history_limit = 50
            location_timeout_ms = 2500
            live_interval_ms = 200
            live_gpx = tracks/ride.gpx
            waypoint = 18.4386, 79.1288
            waypoint = 17.3850, 78.4867
        ";
        let config = Configuration::parse(text).unwrap();

        assert_eq!(config.device_id, Some(DeviceId::new("phone-1")));
        assert_eq!(config.role, Role::Display);
        assert_eq!(config.mode, TrackingMode::Live);
        assert_eq!(config.map_zoom, 12.5);
        assert_eq!(config.relay_endpoint, "wss://relay.invalid/socket");
        assert_eq!(config.tick_interval, Duration::from_millis(33));
        assert_eq!(config.progress_increment, 0.002);
        assert_eq!(config.nominal_speed, 5.);
        assert_eq!(config.display_history_limit, 50);
        assert_eq!(config.location_timeout, Duration::from_millis(2500));
        assert_eq!(config.live_interval, Duration::from_millis(200));
        assert_eq!(config.live_gpx, Some(PathBuf::from("tracks/ride.gpx")));
        assert_eq!(config.waypoints.len(), 2);
        assert_eq!(
            config.tile_url().unwrap(),
            "https://api.maptiler.com/maps/basic-v2/256/{z}/{x}/{y}.png?key=secret"
        );

        let route = config.route().unwrap();
        assert_eq!(route.first(), Waypoint::new(18.4386, 79.1288));
        assert_eq!(route.segment_count(), 1);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        assert!(Configuration::parse("favourite_colour = green").is_ok());
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(Configuration::parse("just some words"), Err(ConfigError::Malformed { line: 1 })));
        assert!(matches!(Configuration::parse("role = spectator"), Err(ConfigError::InvalidValue { .. })));
        assert!(matches!(Configuration::parse("tick_interval_ms = soon"), Err(ConfigError::InvalidValue { .. })));
        assert!(matches!(Configuration::parse("progress_increment = 0"), Err(ConfigError::InvalidValue { .. })));
        assert!(matches!(Configuration::parse("display_history_limit = 0"), Err(ConfigError::InvalidValue { .. })));
        assert!(matches!(Configuration::parse("waypoint = 18.4"), Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn rejects_empty_device_id_and_bad_zoom() {
        for text in ["device_id =", "device_id = ", "map_zoom = NaN", "map_zoom = inf", "map_zoom = -1"] {
            match Configuration::parse(text) {
                Err(ConfigError::InvalidValue { key, .. }) => assert_eq!(key, text.split('=').next().unwrap().trim()),
                other => panic!("{text:?} gave {other:?}"),
            }
        }
        assert_eq!(Configuration::parse("map_zoom = 0").unwrap().map_zoom, 0.);

        let config = Configuration {
            device_id: Some(DeviceId::new("")),
            ..Configuration::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn single_waypoint_is_not_a_route() {
        let config = Configuration::parse("waypoint = 18.4386, 79.1288").unwrap();
        assert!(matches!(config.route(), Err(ConfigError::Route(RouteError::TooFewWaypoints(1)))));
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Configuration::load("/definitely/not/here.conf").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracker.conf");
        std::fs::write(&path, "mode = live\n").unwrap();
        assert_eq!(Configuration::load(&path).unwrap().mode, TrackingMode::Live);
    }
}
