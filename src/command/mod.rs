//! Command vocabulary and per-unit command state
//!
//! Commands, stances and waypoints are plain data; `CommandState` is the
//! mutable record the controller reads and writes each tick.

pub mod kinds;
pub mod queue;
pub mod state;

pub use kinds::{CommandKind, Stance};
pub use queue::{CommandQueue, Rejected, Waypoint};
pub use state::{
    CommandState, EnqueueOutcome, FinishOutcome, GroupLink, TargetState, UnreachableSet,
};
