//! Scheduling: stepping controllers and driving the sandbox

pub mod driver;
pub mod tick;

pub use driver::CommandSim;
pub use tick::{run_controller_tick, ControlledUnit, TickReport, UnitUpdate};
