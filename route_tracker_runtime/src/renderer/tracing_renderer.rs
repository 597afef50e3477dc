use route_tracker_lib::route::Waypoint;

use super::{MapError, MapRenderer};
use crate::config::Configuration;

/// Logs map updates instead of drawing them. Still insists on an API key so a
/// misconfigured deployment is noticed.
pub struct TracingRenderer {
    tile_url: Option<String>,
    loaded: bool,
}

impl TracingRenderer {
    pub fn new(config: &Configuration) -> Self {
        Self {
            tile_url: config.tile_url(),
            loaded: false,
        }
    }

    fn ensure_loaded(&self) -> Result<(), MapError> {
        if self.loaded {
            Ok(())
        } else {
            Err(MapError::Draw("map is not loaded".into()))
        }
    }
}

impl MapRenderer for TracingRenderer {
    fn load(&mut self) -> Result<(), MapError> {
        let Some(url) = &self.tile_url else {
            return Err(MapError::MissingApiKey);
        };
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(MapError::Load(format!("tile URL must be http(s): {url}")));
        }

        tracing::info!("Map loaded with tiles from {}", url.split('?').next().unwrap_or(url));
        self.loaded = true;
        Ok(())
    }

    fn set_view(&mut self, center: Waypoint, zoom: f64) -> Result<(), MapError> {
        self.ensure_loaded()?;
        tracing::debug!("View at {:.5}, {:.5} zoom {}", center.latitude, center.longitude, zoom);
        Ok(())
    }

    fn set_marker(&mut self, position: Waypoint, rotation: f64) -> Result<(), MapError> {
        self.ensure_loaded()?;
        tracing::trace!("Marker at {:.5}, {:.5} heading {:.1}", position.latitude, position.longitude, rotation);
        Ok(())
    }

    fn set_path(&mut self, path: &[Waypoint]) -> Result<(), MapError> {
        self.ensure_loaded()?;
        tracing::trace!("Path with {} points", path.len());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_api_key() {
        let mut renderer = TracingRenderer::new(&Configuration::default());
        assert!(matches!(renderer.load(), Err(MapError::MissingApiKey)));
        assert!(renderer.set_view(Waypoint::new(0., 0.), 3.).is_err());
    }

    #[test]
    fn loads_with_key() {
        let config = Configuration {
            map_api_key: Some("k".into()),
            ..Default::default()
        };
        let mut renderer = TracingRenderer::new(&config);
        renderer.load().unwrap();
        renderer.set_marker(Waypoint::new(56.17, 10.19), 45.).unwrap();
    }

    #[test]
    fn rejects_non_http_tiles() {
        let config = Configuration {
            map_api_key: Some("k".into()),
            map_tile_url: "ftp://tiles/{key}".into(),
            ..Default::default()
        };
        assert!(matches!(TracingRenderer::new(&config).load(), Err(MapError::Load(_))));
    }
}
