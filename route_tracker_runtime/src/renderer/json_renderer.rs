use std::io::Write;

use route_tracker_lib::route::Waypoint;
use serde::Serialize;

use super::{MapError, MapRenderer};

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum MapUpdate<'a> {
    Load { tile_url: &'a str },
    View { lat: f64, lon: f64, zoom: f64 },
    Marker { lat: f64, lon: f64, rotation: f64 },
    Path { points: Vec<[f64; 2]> },
}

/// Writes each map update as one JSON line, for an external map widget to consume.
pub struct JsonRenderer<W: Write + Send> {
    out: W,
    tile_url: Option<String>,
}

impl<W: Write + Send> JsonRenderer<W> {
    pub fn new(out: W, tile_url: Option<String>) -> Self {
        Self { out, tile_url }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn emit(&mut self, update: &MapUpdate<'_>) -> Result<(), MapError> {
        serde_json::to_writer(&mut self.out, update).map_err(|err| MapError::Draw(err.to_string()))?;
        writeln!(self.out).map_err(|err| MapError::Draw(err.to_string()))
    }
}

impl<W: Write + Send> MapRenderer for JsonRenderer<W> {
    fn load(&mut self) -> Result<(), MapError> {
        let Some(tile_url) = self.tile_url.clone() else {
            return Err(MapError::MissingApiKey);
        };
        self.emit(&MapUpdate::Load { tile_url: &tile_url })
            .map_err(|err| MapError::Load(err.to_string()))
    }

    fn set_view(&mut self, center: Waypoint, zoom: f64) -> Result<(), MapError> {
        self.emit(&MapUpdate::View { lat: center.latitude, lon: center.longitude, zoom })
    }

    fn set_marker(&mut self, position: Waypoint, rotation: f64) -> Result<(), MapError> {
        self.emit(&MapUpdate::Marker { lat: position.latitude, lon: position.longitude, rotation })
    }

    fn set_path(&mut self, path: &[Waypoint]) -> Result<(), MapError> {
        let points = path.iter().map(|p| [p.latitude, p.longitude]).collect();
        self.emit(&MapUpdate::Path { points })
    }
}
