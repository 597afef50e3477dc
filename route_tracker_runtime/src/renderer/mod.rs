use route_tracker_lib::route::Waypoint;
use thiserror::Error;

mod json_renderer;
mod tracing_renderer;

pub use json_renderer::JsonRenderer;
pub use tracing_renderer::TracingRenderer;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("No map API key is configured, the map cannot be loaded")]
    MissingApiKey,
    #[error("The map failed to load: {0}")]
    Load(String),
    #[error("Failed to draw on the map: {0}")]
    Draw(String),
}

/// An opaque map widget. Nothing is ever read back from it.
pub trait MapRenderer: Send {
    /// Called once before anything is drawn. A failure means the map is not shown at all.
    fn load(&mut self) -> Result<(), MapError>;

    fn set_view(&mut self, center: Waypoint, zoom: f64) -> Result<(), MapError>;

    /// Marker position, rotated by `rotation` degrees clockwise from north.
    fn set_marker(&mut self, position: Waypoint, rotation: f64) -> Result<(), MapError>;

    fn set_path(&mut self, path: &[Waypoint]) -> Result<(), MapError>;
}
