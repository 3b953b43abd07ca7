pub mod config;
pub mod error;
pub mod types;

pub use config::{config, set_config, ControllerConfig};
pub use error::{ControlError, Result};
pub use types::{EntityId, TeamId, Tick, TilePos, Vec2};
