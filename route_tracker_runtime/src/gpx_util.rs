use std::{
    io::BufReader,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use route_tracker_lib::{
    position_sample::PositionSample,
    route::{Route, RouteError, Waypoint},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GpxError {
    #[error("Failed to open GPX file {path:?}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("Failed to parse GPX file {path:?}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("GPX file {0:?} contains no points")]
    Empty(PathBuf),
    #[error("GPX file does not describe a usable route: {0}")]
    Route(#[from] RouteError),
}

fn open(path: &Path) -> Result<gpx::Gpx, GpxError> {
    let file = std::fs::File::open(path).map_err(|source| GpxError::Io { path: path.to_path_buf(), source })?;
    let reader = BufReader::new(file);
    gpx::read(reader).map_err(|err| GpxError::Parse { path: path.to_path_buf(), message: err.to_string() })
}

fn to_waypoint(point: &gpx::Waypoint) -> Waypoint {
    let point = point.point();
    Waypoint::new(point.y(), point.x())
}

/// Reads a route from the file's `<rte>` elements, falling back to its track points.
/// Repeated consecutive points are collapsed, as recorded tracks often stand still.
pub fn read_route(path: impl AsRef<Path>) -> Result<Route, GpxError> {
    let path = path.as_ref();
    let gpx = open(path)?;

    let mut waypoints: Vec<Waypoint> = gpx.routes.iter().flat_map(|route| route.points.iter().map(to_waypoint)).collect();

    if waypoints.is_empty() {
        waypoints = gpx.tracks.iter()
            .flat_map(|track| track.segments.iter())
            .flat_map(|segment| segment.points.iter().map(to_waypoint))
            .collect();
    }

    if waypoints.is_empty() {
        return Err(GpxError::Empty(path.to_path_buf()));
    }

    waypoints.dedup();
    tracing::debug!("Read route with {} waypoints from {:?}", waypoints.len(), path);

    Ok(Route::new(waypoints)?)
}

/// Reads every track point as a sample. Points without a time get the unix epoch.
pub fn read_track(path: impl AsRef<Path>) -> Result<Vec<PositionSample>, GpxError> {
    let path = path.as_ref();
    let gpx = open(path)?;

    let mut samples = Vec::new();
    for track in &gpx.tracks {
        for segment in &track.segments {
            for point in &segment.points {
                let timestamp = point.time.as_ref()
                    .and_then(|time| time.format().ok())
                    .and_then(|time| time.parse::<DateTime<Utc>>().ok())
                    .unwrap_or(DateTime::UNIX_EPOCH);

                let mut sample = PositionSample::new(to_waypoint(point), timestamp);
                sample.speed = point.speed;
                samples.push(sample);
            }
        }
    }

    if samples.is_empty() {
        return Err(GpxError::Empty(path.to_path_buf()));
    }

    tracing::debug!("Read {} track points from {:?}", samples.len(), path);
    Ok(samples)
}
