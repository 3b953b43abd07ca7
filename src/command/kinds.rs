//! Command and stance vocabularies
//!
//! A command is the high-level intent a unit follows; a stance modifies how it
//! engages while following it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::error::ControlError;

/// High-level behavioral intent selecting a sub-controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CommandKind {
    /// Move to positions / attack targets with the default behavior
    #[default]
    Move,
    /// Hover over obstacles to the commanded position
    Boost,
    /// Harvest ore (controller supplied by the host)
    Mine,
    /// Follow and help a friendly builder (controller supplied by the host)
    Assist,
    /// Pick up friendly units under the carrier
    LoadUnits,
    /// Pick up blocks or block payloads under the carrier
    LoadBlocks,
    /// Drop whatever is being carried
    UnloadPayload,
}

impl CommandKind {
    pub const ALL: [CommandKind; 7] = [
        CommandKind::Move,
        CommandKind::Boost,
        CommandKind::Mine,
        CommandKind::Assist,
        CommandKind::LoadUnits,
        CommandKind::LoadBlocks,
        CommandKind::UnloadPayload,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            CommandKind::Move => "move",
            CommandKind::Boost => "boost",
            CommandKind::Mine => "mine",
            CommandKind::Assist => "assist",
            CommandKind::LoadUnits => "load-units",
            CommandKind::LoadBlocks => "load-blocks",
            CommandKind::UnloadPayload => "unload-payload",
        }
    }

    /// Commands whose default behavior issues payload requests
    pub fn is_payload(&self) -> bool {
        matches!(
            self,
            CommandKind::LoadUnits | CommandKind::LoadBlocks | CommandKind::UnloadPayload
        )
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CommandKind {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommandKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| ControlError::UnknownCommand(s.to_string()))
    }
}

/// Firing/engagement policy, independent of the movement command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Stance {
    /// Fire at anything in range
    #[default]
    Shoot,
    /// Never fire
    HoldFire,
    /// Loop through queued points, stopping to fight nearby targets
    Patrol,
    /// Promote the ambient target to an explicit attack order when idle
    PursueTarget,
    /// Charge straight at targets, ignoring terrain cost
    Ram,
    /// Transient UI stance; never valid while the controller runs
    Stop,
}

impl Stance {
    pub fn allows_fire(&self) -> bool {
        !matches!(self, Stance::HoldFire)
    }

    /// Ram ignores pathing costs and never stops short of a target
    pub fn ignores_terrain(&self) -> bool {
        matches!(self, Stance::Ram)
    }
}
