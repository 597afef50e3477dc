use geo_types::Coord;
use thiserror::Error;

use crate::{
    geo_util::{haversine_distance, initial_bearing, lerp},
    progress::Progress,
};

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Waypoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl Waypoint {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn as_pair(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }

    fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90. ..=90.).contains(&self.latitude)
            && (-180. ..=180.).contains(&self.longitude)
    }
}

impl From<Waypoint> for Coord {
    fn from(waypoint: Waypoint) -> Self {
        Coord { x: waypoint.longitude, y: waypoint.latitude }
    }
}

impl From<Coord> for Waypoint {
    fn from(coord: Coord) -> Self {
        Waypoint::new(coord.y, coord.x)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum RouteError {
    #[error("A route needs at least two waypoints, got {0}")]
    TooFewWaypoints(usize),
    #[error("Waypoint {index} repeats the waypoint before it")]
    DuplicateWaypoint { index: usize },
    #[error("Waypoint {index} is not a valid coordinate")]
    InvalidCoordinate { index: usize },
}

/// Where a progress value lands on a route: which segment, and how far along it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentPosition {
    pub index: usize,
    pub t: f64,
}

/// Ordered, immutable polyline of at least two distinct consecutive waypoints.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    waypoints: Vec<Waypoint>,
}

impl Route {
    pub fn new(waypoints: Vec<Waypoint>) -> Result<Self, RouteError> {
        if waypoints.len() < 2 {
            return Err(RouteError::TooFewWaypoints(waypoints.len()));
        }

        for (index, waypoint) in waypoints.iter().enumerate() {
            if !waypoint.is_valid() {
                return Err(RouteError::InvalidCoordinate { index });
            }
            if index > 0 && waypoints[index - 1] == *waypoint {
                return Err(RouteError::DuplicateWaypoint { index });
            }
        }

        Ok(Self { waypoints })
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn first(&self) -> Waypoint {
        self.waypoints[0]
    }

    pub fn last(&self) -> Waypoint {
        self.waypoints[self.waypoints.len() - 1]
    }

    pub fn segment_count(&self) -> usize {
        self.waypoints.len() - 1
    }

    /// Maps progress onto a segment. Every segment gets an equal share of progress,
    /// regardless of its real length.
    pub fn resolve(&self, progress: Progress) -> SegmentPosition {
        let segments = self.segment_count();
        let last_index = segments - 1;
        let p = progress.value();

        if progress.is_complete() {
            return SegmentPosition { index: last_index, t: 1. };
        }

        let share = 1. / segments as f64;
        let index = ((p / share).floor() as usize).min(last_index);
        let t = ((p - index as f64 * share) / share).clamp(0., 1.);

        SegmentPosition { index, t }
    }

    /// Linear interpolation of latitude and longitude independently. This is a planar
    /// approximation, not a great circle path.
    pub fn position_at(&self, progress: Progress) -> Waypoint {
        let SegmentPosition { index, t } = self.resolve(progress);
        let from = self.waypoints[index];
        let to = self.waypoints[index + 1];

        Waypoint::new(
            lerp(from.latitude, to.latitude, t),
            lerp(from.longitude, to.longitude, t),
        )
    }

    /// Great circle bearing of the segment containing `progress`. Constant within a
    /// segment, so it only changes at segment boundaries.
    pub fn heading_at(&self, progress: Progress) -> f64 {
        let index = self.resolve(progress).index;
        self.segment_bearing(index)
    }

    pub fn segment_bearing(&self, index: usize) -> f64 {
        initial_bearing(self.waypoints[index].as_pair(), self.waypoints[index + 1].as_pair())
    }

    pub fn length_km(&self) -> f64 {
        self.waypoints
            .windows(2)
            .map(|pair| haversine_distance(pair[0].as_pair(), pair[1].as_pair()))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KARIMNAGAR: Waypoint = Waypoint::new(18.4386, 79.1288);
    const HYDERABAD: Waypoint = Waypoint::new(17.3850, 78.4867);

    fn three_segments() -> Route {
        Route::new(vec![
            Waypoint::new(0., 0.),
            Waypoint::new(0., 1.),
            Waypoint::new(1., 1.),
            Waypoint::new(1., 0.),
        ])
        .unwrap()
    }

    #[test]
    fn rejects_bad_routes() {
        assert_eq!(Route::new(vec![]), Err(RouteError::TooFewWaypoints(0)));
        assert_eq!(Route::new(vec![KARIMNAGAR]), Err(RouteError::TooFewWaypoints(1)));
        assert_eq!(
            Route::new(vec![KARIMNAGAR, HYDERABAD, HYDERABAD]),
            Err(RouteError::DuplicateWaypoint { index: 2 })
        );
        assert_eq!(
            Route::new(vec![KARIMNAGAR, Waypoint::new(95., 0.)]),
            Err(RouteError::InvalidCoordinate { index: 1 })
        );
        assert_eq!(
            Route::new(vec![Waypoint::new(f64::NAN, 0.), HYDERABAD]),
            Err(RouteError::InvalidCoordinate { index: 0 })
        );
    }

    #[test]
    fn segment_index_always_in_range() {
        for n in 2..12 {
            let waypoints = (0..n).map(|i| Waypoint::new(i as f64 * 0.1, 0.)).collect();
            let route = Route::new(waypoints).unwrap();
            for step in 0..=1000 {
                let resolved = route.resolve(Progress::new(step as f64 / 1000.));
                assert!(resolved.index <= n - 2, "n={n} step={step} index={}", resolved.index);
                assert!((0. ..=1.).contains(&resolved.t));
            }
        }
    }

    #[test]
    fn complete_progress_maps_to_end_of_last_segment() {
        let route = three_segments();
        assert_eq!(route.resolve(Progress::COMPLETE), SegmentPosition { index: 2, t: 1. });
    }

    #[test]
    fn segment_boundaries() {
        let route = three_segments();
        let resolved = route.resolve(Progress::new(0.5));
        assert_eq!(resolved.index, 1);
        assert!((resolved.t - 0.5).abs() < 1e-9);

        let resolved = route.resolve(Progress::new(0.7));
        assert_eq!(resolved.index, 2);
        assert!((resolved.t - 0.1).abs() < 1e-9);
    }

    #[test]
    fn endpoints_are_exact() {
        let route = three_segments();
        assert_eq!(route.position_at(Progress::START), route.first());
        assert_eq!(route.position_at(Progress::COMPLETE), route.last());

        let route = Route::new(vec![KARIMNAGAR, HYDERABAD]).unwrap();
        assert_eq!(route.position_at(Progress::START), KARIMNAGAR);
        assert_eq!(route.position_at(Progress::COMPLETE), HYDERABAD);
    }

    #[test]
    fn midpoint_of_single_segment() {
        let route = Route::new(vec![KARIMNAGAR, HYDERABAD]).unwrap();
        let mid = route.position_at(Progress::new(0.5));
        assert!((mid.latitude - 17.9118).abs() < 1e-9);
        assert!((mid.longitude - 78.80775).abs() < 1e-9);
    }

    #[test]
    fn heading_constant_within_segment() {
        let route = Route::new(vec![KARIMNAGAR, HYDERABAD]).unwrap();
        let expected = initial_bearing(KARIMNAGAR.as_pair(), HYDERABAD.as_pair());
        for step in 1..100 {
            assert_eq!(route.heading_at(Progress::new(step as f64 / 100.)), expected);
        }
    }

    #[test]
    fn heading_changes_at_boundaries() {
        let route = three_segments();
        assert!((route.heading_at(Progress::new(0.1)) - 90.).abs() < 1e-6);
        assert!((route.heading_at(Progress::new(0.5)) - 0.).abs() < 1e-6);
        assert!((route.heading_at(Progress::new(0.9)) - 270.).abs() < 0.05);
    }

    #[test]
    fn coord_conversion_swaps_axes() {
        let coord: Coord = KARIMNAGAR.into();
        assert_eq!(coord.x, 79.1288);
        assert_eq!(coord.y, 18.4386);
        assert_eq!(Waypoint::from(coord), KARIMNAGAR);
    }
}
