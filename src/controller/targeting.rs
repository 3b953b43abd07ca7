//! Ambient target selection and counter-attacks
//!
//! The ambient target is what the weapons aim at; the attack target is what
//! the unit was ordered to go after. Near the attack target the two coincide.

use crate::command::CommandState;
use crate::controller::timer::{IntervalTimer, TimerSlot};
use crate::controller::TickContext;
use crate::core::config::ControllerConfig;
use crate::core::types::{EntityId, TeamId, Tick, Vec2};
use crate::world::{UnitSnapshot, WorldQuery};

/// Damage notification delivered to the controller of the hit unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageEvent {
    /// Entity credited with the hit, if known
    pub source: Option<EntityId>,
}

/// True when `target` can no longer be aimed at by `team`
pub fn invalid_target(world: &dyn WorldQuery, team: TeamId, target: EntityId) -> bool {
    match world.entity(target) {
        None => true,
        Some(view) => view.team == team || !view.targetable(),
    }
}

#[derive(Debug, Clone, Default)]
pub struct TargetingCoordinator {
    target: Option<EntityId>,
    timer: IntervalTimer,
}

impl TargetingCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(&self) -> Option<EntityId> {
        self.target
    }

    pub fn set_target(&mut self, target: Option<EntityId>) {
        self.target = target;
    }

    /// Retarget every 10 ticks while chasing an explicit target, every 20 otherwise
    pub fn retarget(&mut self, explicit: bool, now: Tick, config: &ControllerConfig) -> bool {
        let interval = if explicit {
            config.retarget_explicit_ticks
        } else {
            config.retarget_ambient_ticks
        };
        self.timer.get(TimerSlot::Retarget, interval, now)
    }

    /// Is the attack target close enough to shoot at directly?
    pub fn near_attack_target(
        world: &dyn WorldQuery,
        attack_target: Option<EntityId>,
        pos: Vec2,
        range: f32,
        config: &ControllerConfig,
    ) -> bool {
        attack_target
            .and_then(|id| world.entity(id))
            .is_some_and(|view| {
                pos.within(&view.position, range + config.near_target_buffer + view.half_size())
            })
    }

    /// Prefer the attack target when in reach, otherwise the nearest hostile
    pub fn find_target(
        ctx: &TickContext<'_>,
        attack_target: Option<EntityId>,
        unit: &UnitSnapshot,
        range: f32,
    ) -> Option<EntityId> {
        if Self::near_attack_target(ctx.world, attack_target, unit.position, range, ctx.config) {
            return attack_target;
        }

        ctx.targets.find_nearest_hostile(
            unit.team,
            unit.position,
            range,
            unit.unit_type.target_air,
            unit.unit_type.target_ground,
        )
    }

    /// Refresh the ambient target on the retarget cadence and drop it once invalid
    pub fn update_targeting(&mut self, ctx: &TickContext<'_>, state: &CommandState, unit: &UnitSnapshot) {
        let attack_target = state.targets.attack_target;
        if self.retarget(attack_target.is_some(), ctx.tick, ctx.config) {
            self.target = Self::find_target(ctx, attack_target, unit, unit.range);
        }

        if let Some(target) = self.target {
            if invalid_target(ctx.world, unit.team, target) {
                self.target = None;
            }
        }
    }

    /// Turn on an AI-team unit's attacker, at most once per cooldown
    pub fn on_hit(
        &mut self,
        ctx: &TickContext<'_>,
        state: &mut CommandState,
        unit: &UnitSnapshot,
        event: &DamageEvent,
    ) -> bool {
        let Some(source) = event.source else {
            return false;
        };
        if !ctx.world.team_rules(unit.team).ai || state.targets.attack_target.is_some() {
            return false;
        }
        let Some(view) = ctx.world.entity(source) else {
            return false;
        };
        if view.team == unit.team
            || !view.matches_profile(unit.unit_type.target_air, unit.unit_type.target_ground)
        {
            return false;
        }
        if !self.timer.get(
            TimerSlot::CounterAttack,
            ctx.config.counter_attack_cooldown_ticks,
            ctx.tick,
        ) {
            return false;
        }

        tracing::debug!(unit = ?unit.id, ?source, "counter-attacking");
        state.command_target_with(ctx.paths, source, true);
        true
    }
}
