//! Sandbox driver: a world, its controllers and the command surface
//!
//! Stands in for the host game. Issues commands, runs controller ticks and
//! applies the resulting intents back onto the sandbox world.

use crate::command::{CommandKind, Stance, Waypoint};
use crate::controller::{
    CommandRegistry, DamageEvent, FormationMember, GroupArena, GroupHandle, TickContext,
    UnitController, UnitGroup, UnitIntents,
};
use crate::core::config::ControllerConfig;
use crate::core::types::{EntityId, Tick, Vec2};
use crate::simulation::tick::{run_controller_tick, ControlledUnit, TickReport};
use crate::world::sandbox::{SandboxUnit, SandboxWorld};

#[derive(Debug)]
pub struct CommandSim {
    pub world: SandboxWorld,
    pub groups: GroupArena,
    pub registry: CommandRegistry,
    pub config: ControllerConfig,
    roster: Vec<ControlledUnit>,
    tick: Tick,
}

impl CommandSim {
    pub fn new(world: SandboxWorld, config: ControllerConfig) -> Self {
        Self {
            world,
            groups: GroupArena::new(),
            registry: CommandRegistry::with_defaults(),
            config,
            roster: Vec::new(),
            tick: 0,
        }
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    /// Spawn a unit and give it a controller
    pub fn spawn(&mut self, unit: SandboxUnit) -> EntityId {
        let id = self.world.spawn_unit(unit);
        self.roster.push(ControlledUnit {
            id,
            controller: UnitController::new(&self.config),
        });
        id
    }

    pub fn controller(&self, id: EntityId) -> Option<&UnitController> {
        self.roster
            .iter()
            .find(|entry| entry.id == id)
            .map(|entry| &entry.controller)
    }

    pub fn controller_mut(&mut self, id: EntityId) -> Option<&mut UnitController> {
        self.roster
            .iter_mut()
            .find(|entry| entry.id == id)
            .map(|entry| &mut entry.controller)
    }

    pub fn controlled(&self) -> usize {
        self.roster.len()
    }

    // === COMMANDS ===

    pub fn assign(&mut self, id: EntityId, command: CommandKind) -> bool {
        let Some(unit) = self.world.snapshot(id) else {
            return false;
        };
        let Some(entry) = self.roster.iter_mut().find(|entry| entry.id == id) else {
            return false;
        };
        let mut out = UnitIntents::new();
        let assigned = entry
            .controller
            .assign_command(&self.registry, &unit.unit_type, command, &mut out);
        self.world.apply(id, &out, 0.0);
        assigned
    }

    pub fn set_stance(&mut self, id: EntityId, stance: Stance) {
        if let Some(controller) = self.controller_mut(id) {
            controller.set_stance(stance);
        }
    }

    pub fn command_position(&mut self, id: EntityId, pos: Vec2) {
        if let Some(entry) = self.roster.iter_mut().find(|entry| entry.id == id) {
            entry.controller.command_position(&self.world, pos);
        }
    }

    pub fn command_target(&mut self, id: EntityId, target: EntityId) {
        if let Some(entry) = self.roster.iter_mut().find(|entry| entry.id == id) {
            entry.controller.command_target(&self.world, target);
        }
    }

    pub fn enqueue(&mut self, id: EntityId, waypoint: impl Into<Waypoint>) {
        if let Some(entry) = self.roster.iter_mut().find(|entry| entry.id == id) {
            entry.controller.enqueue(&self.world, waypoint);
        }
    }

    /// Send `units` to `target` as one formation
    pub fn command_group(&mut self, units: &[EntityId], target: Vec2, spacing: f32) -> Option<GroupHandle> {
        let members: Vec<FormationMember> = units
            .iter()
            .filter_map(|id| self.world.snapshot(*id))
            .map(|unit| FormationMember {
                id: unit.id,
                hit_size: unit.hit_size,
                speed: unit.speed,
            })
            .collect();
        if members.is_empty() {
            return None;
        }

        let handle = self.groups.insert(UnitGroup::form(&members, spacing));
        let mut replaced = Vec::new();
        for (id, link) in self.groups.links(handle) {
            if let Some(entry) = self.roster.iter_mut().find(|entry| entry.id == id) {
                replaced.extend(entry.controller.join_group(link));
                entry.controller.command_position(&self.world, target);
            }
        }
        tracing::debug!(group = ?handle, members = members.len(), "group formed");
        self.release_orphaned_groups(replaced);
        Some(handle)
    }

    /// Free groups that no controller links to any more
    fn release_orphaned_groups(&mut self, handles: impl IntoIterator<Item = GroupHandle>) {
        for handle in handles {
            let linked = self
                .roster
                .iter()
                .any(|entry| entry.controller.group().is_some_and(|link| link.handle == handle));
            if !linked && self.groups.remove(handle).is_some() {
                tracing::debug!(group = ?handle, "group released");
            }
        }
    }

    /// Deliver a damage event to the hit unit's controller
    pub fn hit(&mut self, id: EntityId, source: Option<EntityId>) -> bool {
        let Some(unit) = self.world.snapshot(id) else {
            return false;
        };
        let ctx = TickContext {
            tick: self.tick,
            config: &self.config,
            world: &self.world,
            paths: &self.world,
            targets: &self.world,
            groups: &self.groups,
            commands: &self.registry,
        };
        match self.roster.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => entry.controller.on_hit(&ctx, &unit, &DamageEvent { source }),
            None => false,
        }
    }

    // === TICK ===

    /// Run all controllers, apply their intents, advance the clock
    pub fn step(&mut self) -> TickReport {
        let report = {
            let world = &self.world;
            let ctx = TickContext {
                tick: self.tick,
                config: &self.config,
                world,
                paths: world,
                targets: world,
                groups: &self.groups,
                commands: &self.registry,
            };
            run_controller_tick(&ctx, &mut self.roster, |id| world.snapshot(id))
        };

        let mut released: Vec<GroupHandle> = Vec::new();
        for update in &report.updates {
            self.world.apply(update.id, &update.intents, update.speed);
            released.extend(update.released_group);
        }

        if !report.missing.is_empty() {
            // Dead members still hold links; their groups may be orphaned now
            released.extend(
                self.roster
                    .iter()
                    .filter(|entry| report.missing.contains(&entry.id))
                    .filter_map(|entry| entry.controller.group())
                    .map(|link| link.handle),
            );
            self.roster.retain(|entry| !report.missing.contains(&entry.id));
        }
        self.release_orphaned_groups(released);

        self.tick += 1;
        report
    }

    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.step();
        }
    }
}
