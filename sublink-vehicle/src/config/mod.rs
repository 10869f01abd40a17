//! Vehicle configuration

mod loader;
mod schema;

pub use loader::ConfigLoader;
pub use schema::{GeneralConfig, PacingConfig, PortConfig, VehicleConfig, VideoConfig};
