//! Read-only views of externally owned simulation objects
//!
//! The controller never holds these across ticks; it re-reads them through
//! `WorldQuery` every time it dereferences an `EntityId`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::command::CommandKind;
use crate::core::types::{EntityId, TeamId, TilePos, Vec2};

/// Elevation at or below which a unit touches the ground
pub const GROUNDED_ELEVATION: f32 = 0.001;
/// Elevation at or above which a unit counts as flying
pub const FLYING_ELEVATION: f32 = 0.09;

/// Which cost field a unit type paths with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PathCost {
    #[default]
    Ground,
    /// Legged units cross walls and never aim for building edges
    Legs,
    Naval,
}

/// Static per-type stats the controller consults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitType {
    pub name: String,
    /// Weapon range of the type
    pub range: f32,
    /// Supported commands; assignment outside this set is ignored
    pub commands: Vec<CommandKind>,
    pub default_command: Option<CommandKind>,
    /// Keep auto-targeting even while moving to a position
    pub auto_find_target: bool,
    /// Strafe around attack targets instead of approaching directly
    pub circle_target: bool,
    pub naval: bool,
    pub target_air: bool,
    pub target_ground: bool,
    pub path_cost: PathCost,
}

impl UnitType {
    /// Plain ground attacker supporting only `Move`
    pub fn ground(name: impl Into<String>, range: f32) -> Self {
        Self {
            name: name.into(),
            range,
            commands: vec![CommandKind::Move],
            default_command: None,
            auto_find_target: false,
            circle_target: false,
            naval: false,
            target_air: true,
            target_ground: true,
            path_cost: PathCost::Ground,
        }
    }

    pub fn supports(&self, command: CommandKind) -> bool {
        self.commands.contains(&command)
    }
}

/// Cargo hold of a payload-carrying unit
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PayloadBay {
    pub capacity: f32,
    pub used: f32,
}

impl PayloadBay {
    pub fn has_payload(&self) -> bool {
        self.used > 0.0
    }

    pub fn can_fit(&self, size: f32) -> bool {
        self.used + size <= self.capacity
    }
}

/// The controlled unit as seen at the start of a tick
#[derive(Debug, Clone)]
pub struct UnitSnapshot {
    pub id: EntityId,
    pub team: TeamId,
    pub position: Vec2,
    pub elevation: f32,
    pub hit_size: f32,
    /// Current movement speed
    pub speed: f32,
    /// Current maximum weapon range (may differ from the type's range)
    pub range: f32,
    pub unit_type: Arc<UnitType>,
    pub payload: Option<PayloadBay>,
}

impl UnitSnapshot {
    pub fn is_grounded(&self) -> bool {
        self.elevation <= GROUNDED_ELEVATION
    }

    pub fn is_flying(&self) -> bool {
        self.elevation >= FLYING_ELEVATION
    }

    pub fn within(&self, point: Vec2, range: f32) -> bool {
        self.position.within(&point, range)
    }
}

/// What kind of entity a weak reference resolves to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum EntityKind {
    Unit { elevation: f32, targetable: bool },
    Building { tile: TilePos, solid: bool },
}

/// A live entity resolved from an `EntityId`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityView {
    pub id: EntityId,
    pub team: TeamId,
    pub position: Vec2,
    pub hit_size: Option<f32>,
    pub kind: EntityKind,
}

impl EntityView {
    /// Tile identity when this is a building
    pub fn building_tile(&self) -> Option<TilePos> {
        match self.kind {
            EntityKind::Building { tile, .. } => Some(tile),
            EntityKind::Unit { .. } => None,
        }
    }

    pub fn is_solid_building(&self) -> bool {
        matches!(self.kind, EntityKind::Building { solid: true, .. })
    }

    pub fn is_grounded(&self) -> bool {
        match self.kind {
            EntityKind::Unit { elevation, .. } => elevation <= GROUNDED_ELEVATION,
            EntityKind::Building { .. } => true,
        }
    }

    pub fn is_flying(&self) -> bool {
        match self.kind {
            EntityKind::Unit { elevation, .. } => elevation >= FLYING_ELEVATION,
            EntityKind::Building { .. } => false,
        }
    }

    /// Can an attacker with this air/ground profile hit this entity?
    ///
    /// Buildings always qualify.
    pub fn matches_profile(&self, air: bool, ground: bool) -> bool {
        match self.kind {
            EntityKind::Unit { .. } => (self.is_grounded() && ground) || (self.is_flying() && air),
            EntityKind::Building { .. } => true,
        }
    }

    pub fn targetable(&self) -> bool {
        match self.kind {
            EntityKind::Unit { targetable, .. } => targetable,
            EntityKind::Building { .. } => true,
        }
    }

    pub fn half_size(&self) -> f32 {
        self.hit_size.map_or(0.0, |size| size / 2.0)
    }
}

/// Building under a point, with what the payload commands need to know
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BuildingView {
    pub id: EntityId,
    pub team: TeamId,
    pub tile: TilePos,
    /// Payload footprint of the whole building
    pub size: f32,
    /// Hidden blocks can never be picked up whole
    pub hidden: bool,
    pub pickupable: bool,
    /// Footprint of the payload the building is holding, if any
    pub held_payload: Option<f32>,
}

/// Per-team AI settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TeamRules {
    /// Team driven by the built-in AI rather than a player
    pub ai: bool,
    /// Squad/fleet level RTS AI is enabled for the team
    pub rts_ai: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_view(elevation: f32) -> EntityView {
        EntityView {
            id: EntityId::new(1, 0),
            team: TeamId(2),
            position: Vec2::ZERO,
            hit_size: Some(8.0),
            kind: EntityKind::Unit { elevation, targetable: true },
        }
    }

    #[test]
    fn test_profile_matching() {
        assert!(unit_view(0.0).matches_profile(false, true));
        assert!(!unit_view(0.0).matches_profile(true, false));
        assert!(unit_view(1.0).matches_profile(true, false));
        // Hovering units are neither grounded nor flying
        assert!(!unit_view(0.05).matches_profile(true, true));
    }

    #[test]
    fn test_payload_bay_fit() {
        let bay = PayloadBay { capacity: 10.0, used: 6.0 };
        assert!(bay.has_payload());
        assert!(bay.can_fit(4.0));
        assert!(!bay.can_fit(4.5));
    }
}
