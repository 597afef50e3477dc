pub mod device;
pub mod geo_util;
pub mod history;
pub mod position_sample;
pub mod progress;
pub mod route;
pub mod simulator;

#[cfg(feature = "serde")]
pub mod relay_event;
