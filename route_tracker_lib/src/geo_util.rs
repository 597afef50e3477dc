/// Mean earth radius in km, same value the haversine distance has always used.
pub const EARTH_RADIUS_KM: f64 = 6372.8;

/// Great circle distance in km between two (latitude, longitude) pairs in degrees.
pub fn haversine_distance(p1: (f64, f64), p2: (f64, f64)) -> f64 {
    let d_lat = (p2.0 - p1.0).to_radians();
    let d_lon = (p2.1 - p1.1).to_radians();
    let lat1 = p1.0.to_radians();
    let lat2 = p2.0.to_radians();

    let a = f64::sin(d_lat / 2.).powi(2)
        + f64::cos(lat1) * f64::cos(lat2) * f64::sin(d_lon / 2.).powi(2);
    let c = 2. * f64::asin(f64::sqrt(a));

    EARTH_RADIUS_KM * c
}

/// Initial great circle bearing from `p1` towards `p2`, in degrees clockwise from north, in [0, 360).
pub fn initial_bearing(p1: (f64, f64), p2: (f64, f64)) -> f64 {
    let lat1 = p1.0.to_radians();
    let lat2 = p2.0.to_radians();
    let d_lon = (p2.1 - p1.1).to_radians();

    let y = f64::sin(d_lon) * f64::cos(lat2);
    let x = f64::cos(lat1) * f64::sin(lat2) - f64::sin(lat1) * f64::cos(lat2) * f64::cos(d_lon);

    normalize_heading(y.atan2(x).to_degrees())
}

/// Wraps any angle in degrees into [0, 360).
pub fn normalize_heading(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if wrapped >= 360. { 0. } else { wrapped }
}

/// Planar interpolation. Exact at both ends: t = 0 gives `a`, t = 1 gives `b`.
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a * (1. - t) + b * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearing_cardinal_directions() {
        assert!((initial_bearing((0., 0.), (1., 0.)) - 0.).abs() < 1e-9);
        assert!((initial_bearing((0., 0.), (0., 1.)) - 90.).abs() < 1e-9);
        assert!((initial_bearing((1., 0.), (0., 0.)) - 180.).abs() < 1e-9);
        assert!((initial_bearing((0., 1.), (0., 0.)) - 270.).abs() < 1e-9);
    }

    #[test]
    fn bearing_karimnagar_to_hyderabad() {
        // Heading south-south-west
        let bearing = initial_bearing((18.4386, 79.1288), (17.3850, 78.4867));
        assert!(bearing > 200. && bearing < 220., "bearing was {bearing}");
    }

    #[test]
    fn normalize_wraps() {
        assert_eq!(normalize_heading(-90.), 270.);
        assert_eq!(normalize_heading(360.), 0.);
        assert_eq!(normalize_heading(725.), 5.);
    }

    #[test]
    fn lerp_endpoints_exact() {
        assert_eq!(lerp(18.4386, 17.3850, 0.), 18.4386);
        assert_eq!(lerp(18.4386, 17.3850, 1.), 17.3850);
    }

    #[test]
    fn haversine_one_degree_latitude() {
        let d = haversine_distance((0., 0.), (1., 0.));
        assert!((d - 111.2).abs() < 0.1, "distance was {d}");
    }
}
