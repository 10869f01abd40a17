//! Station configuration

mod loader;
mod schema;

pub use loader::ConfigLoader;
pub use schema::{
    BatchModeSetting, CommandSection, GeneralConfig, LinkConfig, NegotiationConfig,
    StationConfig, VehicleConfig,
};
