//! Self-contained tile world implementing every collaborator trait
//!
//! Used by the `command_sandbox` binary, the integration tests and the bench.
//! Paths are computed with A* over a square tile grid and cached per unit
//! until the unit's path request changes, it strays off the path, or the map
//! changes.

use std::cmp::{Ordering as CmpOrdering, Reverse};
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use ahash::AHashMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::controller::intents::{Intent, RemoteCall, UnitIntents};
use crate::core::types::{EntityId, TeamId, TilePos, Vec2};
use crate::world::view::{
    BuildingView, EntityKind, EntityView, PathCost, PayloadBay, TeamRules, UnitSnapshot, UnitType,
    FLYING_ELEVATION,
};
use crate::world::{CallBus, PathRequestId, PathService, PathStep, TargetSearch, WorldQuery};

/// Terrain of one tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Terrain {
    #[default]
    Floor,
    Wall,
    DeepWater,
}

impl Terrain {
    /// Can a unit with this path cost stand on the tile?
    pub fn passable(self, cost: PathCost) -> bool {
        match cost {
            PathCost::Ground => self == Terrain::Floor,
            PathCost::Legs => true,
            PathCost::Naval => self == Terrain::DeepWater,
        }
    }
}

/// A unit living in the sandbox
#[derive(Debug, Clone)]
pub struct SandboxUnit {
    pub team: TeamId,
    pub position: Vec2,
    /// Resting elevation; boosting lifts the unit above it
    pub elevation: f32,
    pub hit_size: f32,
    pub speed: f32,
    pub unit_type: Arc<UnitType>,
    pub payload: Option<PayloadBay>,
    pub targetable: bool,
    boosting: bool,
}

impl SandboxUnit {
    pub fn new(team: TeamId, position: Vec2, unit_type: Arc<UnitType>) -> Self {
        Self {
            team,
            position,
            elevation: 0.0,
            hit_size: 8.0,
            speed: 1.0,
            unit_type,
            payload: None,
            targetable: true,
            boosting: false,
        }
    }

    pub fn with_elevation(mut self, elevation: f32) -> Self {
        self.elevation = elevation;
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_hit_size(mut self, hit_size: f32) -> Self {
        self.hit_size = hit_size;
        self
    }

    pub fn with_payload(mut self, capacity: f32) -> Self {
        self.payload = Some(PayloadBay { capacity, used: 0.0 });
        self
    }

    fn current_elevation(&self) -> f32 {
        if self.boosting {
            self.elevation.max(FLYING_ELEVATION)
        } else {
            self.elevation
        }
    }
}

/// A one-tile building living in the sandbox
#[derive(Debug, Clone)]
pub struct SandboxBuilding {
    pub team: TeamId,
    pub tile: TilePos,
    pub solid: bool,
    /// Payload footprint when picked up whole
    pub size: f32,
    pub hidden: bool,
    pub pickupable: bool,
    pub held_payload: Option<f32>,
}

impl SandboxBuilding {
    pub fn new(team: TeamId, tile: TilePos) -> Self {
        Self {
            team,
            tile,
            solid: true,
            size: 4.0,
            hidden: false,
            pickupable: true,
            held_payload: None,
        }
    }
}

#[derive(Debug, Clone)]
enum Body {
    Unit(SandboxUnit),
    Building(SandboxBuilding),
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    body: Option<Body>,
}

/// Node in the A* open set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PathNode {
    tile: TilePos,
    f_cost: Reverse<OrderedFloat<f32>>,
}

impl Ord for PathNode {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.f_cost
            .cmp(&other.f_cost)
            .then_with(|| self.tile.cmp(&other.tile))
    }
}

impl PartialOrd for PathNode {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

/// Largest map the sandbox accepts
pub const MAX_SANDBOX_TILES: usize = 1 << 24;

/// A* result for one unit's current path request
#[derive(Debug, Clone)]
struct CachedPath {
    request: PathRequestId,
    goal: TilePos,
    tiles: Vec<TilePos>,
}

impl CachedPath {
    /// Tile after `from`, when `from` lies on this path
    fn next_after(&self, from: TilePos) -> Option<Option<TilePos>> {
        let at = self.tiles.iter().position(|tile| *tile == from)?;
        Some(self.tiles.get(at + 1).copied())
    }
}

#[derive(Debug)]
pub struct SandboxWorld {
    width: i32,
    height: i32,
    tile_size: f32,
    tiles: Vec<Terrain>,
    slots: Vec<Slot>,
    free: Vec<u32>,
    buildings_by_tile: AHashMap<TilePos, EntityId>,
    teams: AHashMap<TeamId, TeamRules>,
    authority: bool,
    next_request: AtomicU64,
    paths: Mutex<AHashMap<EntityId, CachedPath>>,
    searches: AtomicU64,
    calls: Vec<RemoteCall>,
}

impl SandboxWorld {
    pub fn new(width: i32, height: i32, tile_size: f32) -> Self {
        let area = width.max(0) as usize * height.max(0) as usize;
        Self {
            width,
            height,
            tile_size,
            tiles: vec![Terrain::Floor; area],
            slots: Vec::new(),
            free: Vec::new(),
            buildings_by_tile: AHashMap::new(),
            teams: AHashMap::new(),
            authority: true,
            next_request: AtomicU64::new(0),
            paths: Mutex::new(AHashMap::new()),
            searches: AtomicU64::new(0),
            calls: Vec::new(),
        }
    }

    /// Tile count of a `width` x `height` map, `None` when negative or too large
    pub fn tile_count(width: i32, height: i32) -> Option<usize> {
        let width = usize::try_from(width).ok()?;
        let height = usize::try_from(height).ok()?;
        width
            .checked_mul(height)
            .filter(|count| *count <= MAX_SANDBOX_TILES)
    }

    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    fn tile_index(&self, tile: TilePos) -> Option<usize> {
        if tile.x < 0 || tile.y < 0 || tile.x >= self.width || tile.y >= self.height {
            return None;
        }
        Some(tile.y as usize * self.width as usize + tile.x as usize)
    }

    pub fn terrain(&self, tile: TilePos) -> Option<Terrain> {
        self.tile_index(tile).map(|i| self.tiles[i])
    }

    pub fn set_terrain(&mut self, tile: TilePos, terrain: Terrain) {
        if let Some(i) = self.tile_index(tile) {
            self.tiles[i] = terrain;
            self.forget_paths();
        }
    }

    pub fn set_team_rules(&mut self, team: TeamId, rules: TeamRules) {
        self.teams.insert(team, rules);
    }

    pub fn set_authority(&mut self, authority: bool) {
        self.authority = authority;
    }

    // === ENTITIES ===

    fn allocate(&mut self, body: Body) -> EntityId {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.body = Some(body);
            return EntityId::new(index, slot.generation);
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot { generation: 0, body: Some(body) });
        EntityId::new(index, 0)
    }

    fn body(&self, id: EntityId) -> Option<&Body> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.body.as_ref())
    }

    fn body_mut(&mut self, id: EntityId) -> Option<&mut Body> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.body.as_mut())
    }

    pub fn spawn_unit(&mut self, unit: SandboxUnit) -> EntityId {
        self.allocate(Body::Unit(unit))
    }

    pub fn spawn_building(&mut self, building: SandboxBuilding) -> EntityId {
        let tile = building.tile;
        let id = self.allocate(Body::Building(building));
        self.buildings_by_tile.insert(tile, id);
        self.forget_paths();
        id
    }

    /// Remove an entity; its id never resolves again
    pub fn despawn(&mut self, id: EntityId) -> bool {
        let Some(slot) = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
        else {
            return false;
        };
        let Some(body) = slot.body.take() else {
            return false;
        };
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        match body {
            Body::Building(building) => {
                self.buildings_by_tile.remove(&building.tile);
                self.forget_paths();
            }
            Body::Unit(_) => {
                self.cached_paths().remove(&id);
            }
        }
        true
    }

    pub fn unit(&self, id: EntityId) -> Option<&SandboxUnit> {
        match self.body(id)? {
            Body::Unit(unit) => Some(unit),
            Body::Building(_) => None,
        }
    }

    pub fn unit_mut(&mut self, id: EntityId) -> Option<&mut SandboxUnit> {
        match self.body_mut(id)? {
            Body::Unit(unit) => Some(unit),
            Body::Building(_) => None,
        }
    }

    pub fn unit_ids(&self) -> Vec<EntityId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| matches!(slot.body, Some(Body::Unit(_))))
            .map(|(index, slot)| EntityId::new(index as u32, slot.generation))
            .collect()
    }

    /// The unit as its controller sees it this tick
    pub fn snapshot(&self, id: EntityId) -> Option<UnitSnapshot> {
        let unit = self.unit(id)?;
        Some(UnitSnapshot {
            id,
            team: unit.team,
            position: unit.position,
            elevation: unit.current_elevation(),
            hit_size: unit.hit_size,
            speed: unit.speed,
            range: unit.unit_type.range,
            unit_type: Arc::clone(&unit.unit_type),
            payload: unit.payload,
        })
    }

    // === INTENTS ===

    /// Apply a controller's intents: steer, boost and run replicated calls
    ///
    /// `speed` is the distance covered this tick, typically the preferred speed.
    pub fn apply(&mut self, id: EntityId, intents: &UnitIntents, speed: f32) {
        for intent in intents.iter() {
            match *intent {
                Intent::MoveTo { target, stop_distance, .. } => {
                    self.step_towards(id, target, stop_distance, speed);
                }
                Intent::CircleTarget { target, radius } => {
                    if let Some(pos) = self.entity(target).map(|view| view.position) {
                        self.step_towards(id, pos, radius, speed);
                    }
                }
                Intent::SetBoosting(boosting) => {
                    if let Some(unit) = self.unit_mut(id) {
                        unit.boosting = boosting;
                    }
                }
                Intent::Call(call) => self.execute(call),
                Intent::LookAt(_)
                | Intent::FaceTarget(_)
                | Intent::ClearWeaponTargets
                | Intent::ClearMining
                | Intent::ClearBuilding => {}
            }
        }
    }

    fn step_towards(&mut self, id: EntityId, target: Vec2, stop_distance: f32, speed: f32) {
        let Some(unit) = self.unit_mut(id) else {
            return;
        };
        let delta = target - unit.position;
        let remaining = delta.length() - stop_distance;
        if remaining <= 0.0 {
            return;
        }
        unit.position = unit.position + delta.normalize() * remaining.min(speed);
    }

    fn execute(&mut self, call: RemoteCall) {
        self.calls.send(call);
        match call {
            RemoteCall::PayloadDropped { unit, .. } => {
                if let Some(bay) = self.unit_mut(unit).and_then(|u| u.payload.as_mut()) {
                    bay.used = 0.0;
                }
            }
            RemoteCall::PickedUnitPayload { unit, target } => {
                let Some(size) = self.unit(target).map(|t| t.hit_size) else {
                    return;
                };
                self.despawn(target);
                if let Some(bay) = self.unit_mut(unit).and_then(|u| u.payload.as_mut()) {
                    bay.used += size;
                }
            }
            RemoteCall::PickedBuildPayload { unit, building, whole } => {
                let size = match self.body_mut(building) {
                    Some(Body::Building(b)) if whole => Some(b.size),
                    Some(Body::Building(b)) => b.held_payload.take(),
                    _ => None,
                };
                let Some(size) = size else {
                    return;
                };
                if whole {
                    self.despawn(building);
                }
                if let Some(bay) = self.unit_mut(unit).and_then(|u| u.payload.as_mut()) {
                    bay.used += size;
                }
            }
        }
    }

    /// Every replicated call executed so far
    pub fn calls(&self) -> &[RemoteCall] {
        &self.calls
    }

    // === PATHFINDING ===

    /// Number of A* searches run so far
    pub fn path_searches(&self) -> u64 {
        self.searches.load(Ordering::Relaxed)
    }

    fn cached_paths(&mut self) -> &mut AHashMap<EntityId, CachedPath> {
        self.paths.get_mut().unwrap_or_else(PoisonError::into_inner)
    }

    /// Walkability changed: every cached path is suspect
    fn forget_paths(&mut self) {
        self.cached_paths().clear();
    }

    fn tile_of(&self, pos: Vec2) -> TilePos {
        TilePos::from_world(pos, self.tile_size)
    }

    fn walkable(&self, tile: TilePos, cost: PathCost, goal: TilePos) -> bool {
        let Some(terrain) = self.terrain(tile) else {
            return false;
        };
        if !terrain.passable(cost) {
            return false;
        }
        // Solid buildings block ground units unless they are the destination
        if cost != PathCost::Legs && tile != goal {
            if let Some(Body::Building(building)) =
                self.buildings_by_tile.get(&tile).and_then(|id| self.body(*id))
            {
                return !building.solid;
            }
        }
        true
    }

    /// A* over 4-connected tiles; the path includes both endpoints
    fn find_path(&self, start: TilePos, goal: TilePos, cost: PathCost) -> Option<Vec<TilePos>> {
        if start == goal {
            return Some(vec![start]);
        }
        if !self.walkable(goal, cost, goal) {
            return None;
        }
        self.searches.fetch_add(1, Ordering::Relaxed);

        let heuristic = |tile: TilePos| ((tile.x - goal.x).abs() + (tile.y - goal.y).abs()) as f32;

        let mut open_set = BinaryHeap::new();
        let mut came_from: AHashMap<TilePos, TilePos> = AHashMap::new();
        let mut g_scores: AHashMap<TilePos, f32> = AHashMap::new();

        g_scores.insert(start, 0.0);
        open_set.push(PathNode {
            tile: start,
            f_cost: Reverse(OrderedFloat(heuristic(start))),
        });

        while let Some(current) = open_set.pop() {
            if current.tile == goal {
                return Some(reconstruct_path(&came_from, goal));
            }

            let current_g = g_scores.get(&current.tile).copied().unwrap_or(f32::INFINITY);

            for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                let neighbor = TilePos::new(current.tile.x + dx, current.tile.y + dy);
                if !self.walkable(neighbor, cost, goal) {
                    continue;
                }

                let tentative_g = current_g + 1.0;
                let neighbor_g = g_scores.get(&neighbor).copied().unwrap_or(f32::INFINITY);
                if tentative_g < neighbor_g {
                    came_from.insert(neighbor, current.tile);
                    g_scores.insert(neighbor, tentative_g);
                    open_set.push(PathNode {
                        tile: neighbor,
                        f_cost: Reverse(OrderedFloat(tentative_g + heuristic(neighbor))),
                    });
                }
            }
        }

        None
    }
}

fn reconstruct_path(came_from: &AHashMap<TilePos, TilePos>, mut current: TilePos) -> Vec<TilePos> {
    let mut path = vec![current];
    while let Some(&prev) = came_from.get(&current) {
        path.push(prev);
        current = prev;
    }
    path.reverse();
    path
}

fn entity_view(id: EntityId, body: &Body, tile_size: f32) -> EntityView {
    match body {
        Body::Unit(unit) => EntityView {
            id,
            team: unit.team,
            position: unit.position,
            hit_size: Some(unit.hit_size),
            kind: EntityKind::Unit {
                elevation: unit.current_elevation(),
                targetable: unit.targetable,
            },
        },
        Body::Building(building) => EntityView {
            id,
            team: building.team,
            position: building.tile.center(tile_size),
            hit_size: Some(tile_size),
            kind: EntityKind::Building {
                tile: building.tile,
                solid: building.solid,
            },
        },
    }
}

impl WorldQuery for SandboxWorld {
    fn entity(&self, id: EntityId) -> Option<EntityView> {
        self.body(id).map(|body| entity_view(id, body, self.tile_size))
    }

    fn building_at(&self, pos: Vec2) -> Option<BuildingView> {
        let id = *self.buildings_by_tile.get(&self.tile_of(pos))?;
        match self.body(id)? {
            Body::Building(building) => Some(BuildingView {
                id,
                team: building.team,
                tile: building.tile,
                size: building.size,
                hidden: building.hidden,
                pickupable: building.pickupable,
                held_payload: building.held_payload,
            }),
            Body::Unit(_) => None,
        }
    }

    fn closest_edge(&self, building: EntityId, from: Vec2) -> Option<Vec2> {
        let Body::Building(building) = self.body(building)? else {
            return None;
        };
        let center = building.tile.center(self.tile_size);
        let half = self.tile_size / 2.0;
        Some(Vec2::new(
            from.x.clamp(center.x - half, center.x + half),
            from.y.clamp(center.y - half, center.y + half),
        ))
    }

    fn team_rules(&self, team: TeamId) -> TeamRules {
        self.teams.get(&team).copied().unwrap_or_default()
    }

    fn closest_pickup_unit(&self, carrier: &UnitSnapshot, radius: f32) -> Option<EntityId> {
        let bay = carrier.payload?;
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| match &slot.body {
                Some(Body::Unit(unit)) => Some((EntityId::new(index as u32, slot.generation), unit)),
                _ => None,
            })
            .filter(|(id, unit)| {
                *id != carrier.id
                    && unit.team == carrier.team
                    && unit.current_elevation() <= carrier.elevation
                    && bay.can_fit(unit.hit_size)
                    && carrier.within(unit.position, radius + unit.hit_size / 2.0)
            })
            .min_by_key(|(_, unit)| OrderedFloat(carrier.position.distance(&unit.position)))
            .map(|(id, _)| id)
    }

    fn is_authority(&self) -> bool {
        self.authority
    }
}

impl PathService for SandboxWorld {
    fn next_request_id(&self) -> PathRequestId {
        PathRequestId(self.next_request.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn step(&self, unit: &UnitSnapshot, request: PathRequestId, goal: Vec2) -> PathStep {
        let start = self.tile_of(unit.position);
        let goal_tile = self.tile_of(goal);

        let cached = self
            .paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&unit.id)
            .filter(|cached| cached.request == request && cached.goal == goal_tile)
            .and_then(|cached| cached.next_after(start));

        let next = match cached {
            Some(next) => next,
            None => {
                // Search outside the lock; other units keep stepping meanwhile
                let Some(tiles) = self.find_path(start, goal_tile, unit.unit_type.path_cost) else {
                    self.paths
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .remove(&unit.id);
                    return PathStep::not_found(unit.position);
                };
                let next = tiles.get(1).copied();
                self.paths
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .insert(unit.id, CachedPath { request, goal: goal_tile, tiles });
                next
            }
        };

        match next {
            Some(next) if next != goal_tile => PathStep::to(next.center(self.tile_size)),
            _ => PathStep::to(goal),
        }
    }

    fn is_impassable(&self, unit: &UnitSnapshot, tile: TilePos) -> bool {
        self.terrain(tile)
            .map_or(true, |terrain| !terrain.passable(unit.unit_type.path_cost))
    }
}

impl TargetSearch for SandboxWorld {
    fn find_nearest_hostile(
        &self,
        team: TeamId,
        pos: Vec2,
        range: f32,
        air: bool,
        ground: bool,
    ) -> Option<EntityId> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                let body = slot.body.as_ref()?;
                let id = EntityId::new(index as u32, slot.generation);
                Some(entity_view(id, body, self.tile_size))
            })
            .filter(|view| {
                view.team != team
                    && view.targetable()
                    && view.matches_profile(air, ground)
                    && pos.within(&view.position, range + view.half_size())
            })
            .min_by_key(|view| OrderedFloat(pos.distance(&view.position)))
            .map(|view| view.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ground_type() -> Arc<UnitType> {
        Arc::new(UnitType::ground("dagger", 60.0))
    }

    #[test]
    fn test_path_around_wall() {
        let mut world = SandboxWorld::new(10, 10, 8.0);
        for y in 0..9 {
            world.set_terrain(TilePos::new(3, y), Terrain::Wall);
        }

        let path = world
            .find_path(TilePos::new(0, 0), TilePos::new(6, 0), PathCost::Ground)
            .unwrap();

        assert_eq!(path.first(), Some(&TilePos::new(0, 0)));
        assert_eq!(path.last(), Some(&TilePos::new(6, 0)));
        assert!(path.iter().all(|tile| tile.x != 3 || tile.y == 9));
    }

    #[test]
    fn test_no_path_into_enclosed_tile() {
        let mut world = SandboxWorld::new(10, 10, 8.0);
        let goal = TilePos::new(5, 5);
        for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
            world.set_terrain(TilePos::new(goal.x + dx, goal.y + dy), Terrain::Wall);
        }

        assert!(world.find_path(TilePos::new(0, 0), goal, PathCost::Ground).is_none());
        assert!(world.find_path(TilePos::new(0, 0), goal, PathCost::Legs).is_some());
    }

    #[test]
    fn test_step_returns_goal_on_last_segment() {
        let mut world = SandboxWorld::new(10, 10, 8.0);
        let id = world.spawn_unit(SandboxUnit::new(TeamId(1), Vec2::new(0.0, 0.0), ground_type()));
        let unit = world.snapshot(id).unwrap();

        let goal = Vec2::new(9.0, 1.0);
        let step = world.step(&unit, PathRequestId(1), goal);
        assert!(step.found);
        assert_eq!(step.next, goal);

        let far = world.step(&unit, PathRequestId(1), Vec2::new(40.0, 0.0));
        assert_eq!(far.next, Vec2::new(8.0, 0.0));
    }

    #[test]
    fn test_step_reuses_path_until_request_changes() {
        let mut world = SandboxWorld::new(20, 10, 8.0);
        for y in 0..9 {
            world.set_terrain(TilePos::new(5, y), Terrain::Wall);
        }
        let id = world.spawn_unit(SandboxUnit::new(TeamId(1), Vec2::ZERO, ground_type()));
        let goal = TilePos::new(10, 1).center(8.0);

        let first = world.step(&world.snapshot(id).unwrap(), PathRequestId(1), goal);
        assert_eq!(world.path_searches(), 1);

        // Walking along the cached path costs nothing
        world.unit_mut(id).unwrap().position = first.next;
        let second = world.step(&world.snapshot(id).unwrap(), PathRequestId(1), goal);
        assert_eq!(world.path_searches(), 1);
        assert_ne!(second.next, first.next);

        // A new request id means a fresh search
        world.step(&world.snapshot(id).unwrap(), PathRequestId(2), goal);
        assert_eq!(world.path_searches(), 2);

        // Straying off the path forces a search too
        world.unit_mut(id).unwrap().position = TilePos::new(12, 5).center(8.0);
        world.step(&world.snapshot(id).unwrap(), PathRequestId(2), goal);
        assert_eq!(world.path_searches(), 3);
    }

    #[test]
    fn test_map_changes_drop_cached_paths() {
        let mut world = SandboxWorld::new(20, 4, 8.0);
        let id = world.spawn_unit(SandboxUnit::new(TeamId(1), Vec2::ZERO, ground_type()));
        let goal = TilePos::new(10, 0).center(8.0);

        let step = world.step(&world.snapshot(id).unwrap(), PathRequestId(1), goal);
        assert_eq!(step.next, TilePos::new(1, 0).center(8.0));

        // Wall off the straight route; the same request must route around it
        world.set_terrain(TilePos::new(1, 0), Terrain::Wall);
        let step = world.step(&world.snapshot(id).unwrap(), PathRequestId(1), goal);
        assert_eq!(step.next, TilePos::new(0, 1).center(8.0));
        assert_eq!(world.path_searches(), 2);
    }

    #[test]
    fn test_tile_count_rejects_oversized_maps() {
        assert_eq!(SandboxWorld::tile_count(48, 32), Some(1536));
        assert_eq!(SandboxWorld::tile_count(-1, 32), None);
        assert_eq!(SandboxWorld::tile_count(70_000, 70_000), None);
        assert_eq!(SandboxWorld::tile_count(i32::MAX, i32::MAX), None);
    }

    #[test]
    fn test_despawn_invalidates_id() {
        let mut world = SandboxWorld::new(4, 4, 8.0);
        let id = world.spawn_unit(SandboxUnit::new(TeamId(1), Vec2::ZERO, ground_type()));
        assert!(world.despawn(id));

        let reused = world.spawn_unit(SandboxUnit::new(TeamId(1), Vec2::ZERO, ground_type()));
        assert!(world.entity(id).is_none());
        assert!(world.entity(reused).is_some());
    }

    #[test]
    fn test_nearest_hostile_ignores_allies_and_untargetable() {
        let mut world = SandboxWorld::new(20, 20, 8.0);
        world.spawn_unit(SandboxUnit::new(TeamId(1), Vec2::new(5.0, 0.0), ground_type()));
        let mut hidden = SandboxUnit::new(TeamId(2), Vec2::new(10.0, 0.0), ground_type());
        hidden.targetable = false;
        world.spawn_unit(hidden);
        let enemy = world.spawn_unit(SandboxUnit::new(TeamId(2), Vec2::new(30.0, 0.0), ground_type()));

        let found = world.find_nearest_hostile(TeamId(1), Vec2::ZERO, 60.0, true, true);
        assert_eq!(found, Some(enemy));
    }

    #[test]
    fn test_closest_edge_clamps_to_footprint() {
        let mut world = SandboxWorld::new(20, 20, 8.0);
        let building = world.spawn_building(SandboxBuilding::new(TeamId(2), TilePos::new(10, 10)));

        let edge = world.closest_edge(building, Vec2::new(0.0, 80.0)).unwrap();
        assert_eq!(edge, Vec2::new(76.0, 80.0));
    }

    #[test]
    fn test_apply_moves_and_respects_stop_distance() {
        let mut world = SandboxWorld::new(20, 20, 8.0);
        let id = world.spawn_unit(SandboxUnit::new(TeamId(1), Vec2::ZERO, ground_type()));
        let mut intents = UnitIntents::new();
        intents.push(Intent::MoveTo {
            target: Vec2::new(10.0, 0.0),
            stop_distance: 8.0,
            smoothing: 100.0,
            arrive: true,
        });

        world.apply(id, &intents, 5.0);
        assert_eq!(world.unit(id).unwrap().position, Vec2::new(2.0, 0.0));
    }
}
