//! Per-unit command controller
//!
//! `UnitController` turns a unit's command state into one steering/targeting
//! decision per tick. The tick runs in a fixed order:
//!
//! 1. Coerce impossible stances, promote pursued targets, prune dead waypoints
//! 2. Pick the default command and swap the sub-controller when it changed
//! 3. Either tick the delegate, or run the default behavior: payload requests,
//!    naval fallback, targeting, target tracking, path segment, completion
//!
//! Nothing here blocks or errors; all failures become state transitions.

pub mod delegate;
pub mod formation;
pub mod intents;
mod path_segment;
mod payload;
pub mod targeting;
pub mod timer;

use std::fmt;

use crate::command::{
    CommandKind, CommandQueue, CommandState, EnqueueOutcome, FinishOutcome, GroupLink, Stance,
    UnreachableSet, Waypoint,
};
use crate::core::config::ControllerConfig;
use crate::core::types::{EntityId, Tick, Vec2};
use crate::world::{PathRequestId, PathService, TargetSearch, UnitSnapshot, UnitType, WorldQuery};

pub use delegate::{
    BoostController, CommandBinding, CommandRegistry, ControllerFactory, GroundFallback,
    SubController,
};
pub use formation::{FormationMember, GroupArena, GroupHandle, UnitGroup};
pub use intents::{Intent, RemoteCall, UnitIntents};
pub use targeting::{DamageEvent, TargetingCoordinator};
pub use timer::{IntervalTimer, TimerSlot};

/// Everything a controller may read during one tick
#[derive(Clone, Copy)]
pub struct TickContext<'a> {
    pub tick: Tick,
    pub config: &'a ControllerConfig,
    pub world: &'a dyn WorldQuery,
    pub paths: &'a dyn PathService,
    pub targets: &'a dyn TargetSearch,
    pub groups: &'a GroupArena,
    pub commands: &'a CommandRegistry,
}

pub struct UnitController {
    state: CommandState,
    targeting: TargetingCoordinator,
    /// Behavior supplied by the active command, if it has one
    delegate: Option<Box<dyn SubController>>,
    /// Command seen on the previous tick; a change re-creates the delegate
    last_command: Option<CommandKind>,
    /// Lazily created naval fallback
    fallback: Option<Box<dyn SubController>>,
    /// Group this unit left since the owner last asked
    released_group: Option<GroupHandle>,
}

impl UnitController {
    pub fn new(config: &ControllerConfig) -> Self {
        Self {
            state: CommandState::new(config.max_queue_size),
            targeting: TargetingCoordinator::new(),
            delegate: None,
            last_command: None,
            fallback: None,
            released_group: None,
        }
    }

    // === COMMAND API ===

    /// Switch to `command` if the unit type supports it
    ///
    /// Clears in-progress mining and building; applies the command's default
    /// stance when the registry defines one. Unsupported commands are ignored.
    pub fn assign_command(
        &mut self,
        registry: &CommandRegistry,
        unit_type: &UnitType,
        command: CommandKind,
        out: &mut UnitIntents,
    ) -> bool {
        if !unit_type.supports(command) {
            tracing::trace!(%command, unit_type = %unit_type.name, "unsupported command ignored");
            return false;
        }

        out.push(Intent::ClearMining);
        out.push(Intent::ClearBuilding);
        self.state.command = Some(command);
        if let Some(stance) = registry.default_stance(command) {
            self.state.stance = stance;
        }
        tracing::debug!(%command, "command assigned");
        true
    }

    /// Move to a point; forwarded to the active delegate
    pub fn command_position(&mut self, paths: &dyn PathService, pos: Vec2) {
        self.command_position_with(paths, pos, false);
    }

    pub fn command_position_with(
        &mut self,
        paths: &dyn PathService,
        pos: Vec2,
        stop_when_in_range: bool,
    ) {
        self.state.command_position_with(paths, pos, stop_when_in_range);
        if let Some(delegate) = self.delegate.as_mut() {
            delegate.on_command_position(pos);
        }
    }

    /// Attack or follow an entity; forwarded to the active delegate
    pub fn command_target(&mut self, paths: &dyn PathService, target: EntityId) {
        self.command_target_with(paths, target, false);
    }

    pub fn command_target_with(
        &mut self,
        paths: &dyn PathService,
        target: EntityId,
        stop_at_target: bool,
    ) {
        self.state.command_target_with(paths, target, stop_at_target);
        if let Some(delegate) = self.delegate.as_mut() {
            delegate.on_command_target(target);
        }
    }

    /// Queue a waypoint, or activate it right away when nothing is active
    ///
    /// Full queues and duplicates drop the request silently.
    pub fn enqueue(&mut self, paths: &dyn PathService, location: impl Into<Waypoint>) {
        if let EnqueueOutcome::Activated(waypoint) = self.state.enqueue(paths, location.into()) {
            self.forward(waypoint);
        }
    }

    pub fn clear_commands(&mut self) {
        self.state.clear_commands();
    }

    pub fn set_stance(&mut self, stance: Stance) {
        self.state.stance = stance;
    }

    /// Link to a group; returns the handle of a different group this replaced
    pub fn join_group(&mut self, link: GroupLink) -> Option<GroupHandle> {
        self.state
            .group
            .replace(link)
            .map(|previous| previous.handle)
            .filter(|handle| *handle != link.handle)
    }

    /// Hand the group released by the last finished path to its owner, once
    pub fn take_released_group(&mut self) -> Option<GroupHandle> {
        self.released_group.take()
    }

    fn finish_path(&mut self, paths: &dyn PathService) {
        if let FinishOutcome::LeftGroup(handle) = self.state.finish_path(paths) {
            self.released_group = Some(handle);
        }
    }

    fn forward(&mut self, waypoint: Waypoint) {
        if let Some(delegate) = self.delegate.as_mut() {
            match waypoint {
                Waypoint::Point(pos) => delegate.on_command_position(pos),
                Waypoint::Entity(target) => delegate.on_command_target(target),
            }
        }
    }

    // === QUERIES ===

    pub fn has_active_command(&self) -> bool {
        self.state.has_command()
    }

    /// Active command, `Move` when none was assigned yet
    pub fn current_command(&self) -> CommandKind {
        self.state.command.unwrap_or(CommandKind::Move)
    }

    pub fn stance(&self) -> Stance {
        self.state.stance
    }

    pub fn should_engage_weapons(&self) -> bool {
        self.state.stance.allows_fire()
    }

    /// Logic processors may only steer units without an active command
    pub fn is_logic_controllable(&self) -> bool {
        !self.has_active_command()
    }

    /// The controller keeps its state when the unit changes hands
    pub fn keeps_state(&self) -> bool {
        true
    }

    /// Is the ambient target inside weapon range (plus margin)?
    pub fn is_attacking(&self, world: &dyn WorldQuery, unit: &UnitSnapshot, config: &ControllerConfig) -> bool {
        self.targeting
            .target()
            .and_then(|id| world.entity(id))
            .is_some_and(|view| unit.within(view.position, unit.range + config.attacking_margin))
    }

    /// Group-aware speed cap
    pub fn preferred_speed(&self, groups: &GroupArena, unit: &UnitSnapshot) -> f32 {
        groups.preferred_speed(self.state.group, unit.speed)
    }

    /// Rate-limited retarget predicate; consumes the retarget timer
    pub fn retarget(&mut self, now: Tick, config: &ControllerConfig) -> bool {
        let explicit = self.state.targets.attack_target.is_some();
        self.targeting.retarget(explicit, now, config)
    }

    /// Counter-attack rule; returns true when the source became the attack target
    pub fn on_hit(&mut self, ctx: &TickContext<'_>, unit: &UnitSnapshot, event: &DamageEvent) -> bool {
        self.targeting.on_hit(ctx, &mut self.state, unit, event)
    }

    pub fn target(&self) -> Option<EntityId> {
        self.targeting.target()
    }

    pub fn attack_target(&self) -> Option<EntityId> {
        self.state.targets.attack_target
    }

    pub fn target_pos(&self) -> Option<Vec2> {
        self.state.targets.target_pos
    }

    pub fn last_target_pos(&self) -> Option<Vec2> {
        self.state.targets.last_target_pos
    }

    /// Mark the current destination as the last one shown to the player
    pub fn setup_last_pos(&mut self) {
        self.state.targets.last_target_pos = self.state.targets.target_pos;
    }

    pub fn path_request(&self) -> Option<PathRequestId> {
        self.state.targets.path_request
    }

    pub fn queue(&self) -> &CommandQueue {
        &self.state.queue
    }

    pub fn unreachable(&self) -> &UnreachableSet {
        &self.state.unreachable
    }

    pub fn group(&self) -> Option<GroupLink> {
        self.state.group
    }

    pub fn has_delegate(&self) -> bool {
        self.delegate.is_some()
    }

    pub fn state(&self) -> &CommandState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut CommandState {
        &mut self.state
    }

    // === TICK ===

    /// Run one tick and return what the unit should do
    pub fn update(&mut self, ctx: &TickContext<'_>, unit: &UnitSnapshot) -> UnitIntents {
        let mut out = UnitIntents::new();
        self.update_into(ctx, unit, &mut out);
        out
    }

    pub fn update_into(&mut self, ctx: &TickContext<'_>, unit: &UnitSnapshot, out: &mut UnitIntents) {
        if self.state.stance == Stance::Stop {
            tracing::debug!(unit = ?unit.id, "stop stance at runtime, reverting to shoot");
            self.state.stance = Stance::Shoot;
        }

        if self.state.stance == Stance::PursueTarget && self.state.is_idle() {
            if let Some(target) = self.targeting.target() {
                self.state.command_target_with(ctx.paths, target, false);
            }
        }

        if !self.state.queue.is_empty() {
            let removed = self.state.queue.prune(|id| ctx.world.is_valid(id));
            if removed > 0 {
                tracing::trace!(unit = ?unit.id, removed, "pruned invalid waypoints");
            }
        }

        if self.state.command.is_none() {
            let unit_type = &unit.unit_type;
            self.state.command = unit_type
                .default_command
                .or_else(|| unit_type.commands.first().copied());
        }

        let current = self.state.command;
        if self.last_command != current {
            self.last_command = current;
            self.delegate = current.and_then(|kind| ctx.commands.create(kind, unit));
            tracing::debug!(
                unit = ?unit.id,
                command = ?current,
                delegated = self.delegate.is_some(),
                "command changed"
            );
        }

        if let Some(delegate) = self.delegate.as_mut() {
            if delegate.unit() != Some(unit.id) {
                delegate.bind(unit.id);
            }
            delegate.tick(ctx, unit, out);
        } else {
            self.default_behavior(ctx, unit, out);
            out.push(Intent::SetBoosting(false));
        }
    }
}

impl fmt::Debug for UnitController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitController")
            .field("state", &self.state)
            .field("targeting", &self.targeting)
            .field("delegated", &self.delegate.is_some())
            .field("last_command", &self.last_command)
            .field("released_group", &self.released_group)
            .finish()
    }
}
