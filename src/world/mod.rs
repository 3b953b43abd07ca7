//! Collaborator interfaces the controller consumes
//!
//! The controller owns none of the world. Entity lookups, pathfinding, target
//! search and the remote-call bus are reached through these traits, so any
//! host simulation (or the bundled sandbox) can drive it. All query traits are
//! `Sync`: the scheduler may step many controllers against one world in parallel.

pub mod sandbox;
#[cfg(test)]
pub(crate) mod testing;
pub mod view;

use serde::{Deserialize, Serialize};

use crate::controller::intents::RemoteCall;
use crate::core::types::{EntityId, TeamId, TilePos, Vec2};

pub use sandbox::SandboxWorld;
pub use view::{
    BuildingView, EntityKind, EntityView, PathCost, PayloadBay, TeamRules, UnitSnapshot, UnitType,
};

/// Token identifying one path request; a new one invalidates cached path state for the old
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PathRequestId(pub u64);

/// Answer of a single path step query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathStep {
    /// Where to steer next; equals the goal on the final segment
    pub next: Vec2,
    /// False when the goal cannot be reached at all
    pub found: bool,
    /// False while the path for this request is still being prepared
    pub ready: bool,
}

impl PathStep {
    pub fn to(next: Vec2) -> Self {
        Self { next, found: true, ready: true }
    }

    pub fn not_found(at: Vec2) -> Self {
        Self { next: at, found: false, ready: true }
    }
}

/// Entity and tile lookups
pub trait WorldQuery: Sync {
    /// Resolve a weak reference; `None` once the entity is dead or removed
    fn entity(&self, id: EntityId) -> Option<EntityView>;

    fn is_valid(&self, id: EntityId) -> bool {
        self.entity(id).is_some()
    }

    fn building_at(&self, pos: Vec2) -> Option<BuildingView>;

    /// Closest solid tile of a building's footprint as seen from `from`
    fn closest_edge(&self, building: EntityId, from: Vec2) -> Option<Vec2>;

    fn team_rules(&self, team: TeamId) -> TeamRules;

    fn can_interact(&self, a: TeamId, b: TeamId) -> bool {
        a == b
    }

    /// Closest friendly unit the carrier may load, within `radius`
    fn closest_pickup_unit(&self, carrier: &UnitSnapshot, radius: f32) -> Option<EntityId>;

    /// Side effects are only issued by the authoritative simulation
    fn is_authority(&self) -> bool {
        true
    }
}

/// Path lookups keyed by request id; must answer without blocking
pub trait PathService: Sync {
    fn next_request_id(&self) -> PathRequestId;

    fn step(&self, unit: &UnitSnapshot, request: PathRequestId, goal: Vec2) -> PathStep;

    fn is_impassable(&self, unit: &UnitSnapshot, tile: TilePos) -> bool;
}

/// Capability-aware nearest enemy search
pub trait TargetSearch: Sync {
    fn find_nearest_hostile(
        &self,
        team: TeamId,
        pos: Vec2,
        range: f32,
        air: bool,
        ground: bool,
    ) -> Option<EntityId>;
}

/// Fire-and-forget replication of side effects
pub trait CallBus {
    fn send(&mut self, call: RemoteCall);
}

impl CallBus for Vec<RemoteCall> {
    fn send(&mut self, call: RemoteCall) {
        self.push(call);
    }
}
