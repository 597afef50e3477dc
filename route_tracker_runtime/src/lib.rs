pub mod config;
pub mod context;
pub mod gpx_util;
pub mod location;
pub mod relay;
pub mod renderer;
pub mod ticker;

pub use config::*;
pub use context::*;

/// Karimnagar to Hyderabad, used when no route is configured.
pub const DEFAULT_ROUTE: [(f64, f64); 4] = [
    (18.4386, 79.1288),
    (18.1018, 78.8520),
    (17.8516, 78.6828),
    (17.3850, 78.4867),
];
