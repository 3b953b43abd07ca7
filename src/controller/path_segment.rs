//! Default command behavior: track the target, follow the path, finish
//!
//! Runs whenever the active command has no delegate of its own.

use crate::command::Stance;
use crate::controller::delegate::{GroundFallback, SubController};
use crate::controller::intents::{Intent, UnitIntents};
use crate::controller::payload::request_payload_calls;
use crate::controller::targeting::{invalid_target, TargetingCoordinator};
use crate::controller::{TickContext, UnitController};
use crate::core::types::{TilePos, Vec2};
use crate::world::{PathCost, UnitSnapshot};

impl UnitController {
    pub(super) fn default_behavior(
        &mut self,
        ctx: &TickContext<'_>,
        unit: &UnitSnapshot,
        out: &mut UnitIntents,
    ) {
        request_payload_calls(ctx, &self.state, unit, out);

        // Naval AI fleets keep the old ground behavior for auto-targeting
        let rules = ctx.world.team_rules(unit.team);
        if rules.ai && rules.rts_ai && unit.unit_type.naval {
            let fallback = self
                .fallback
                .get_or_insert_with(|| Box::new(GroundFallback::new()));
            if fallback.unit() != Some(unit.id) {
                fallback.bind(unit.id);
            }
            fallback.tick(ctx, unit, out);
            return;
        }

        let attack_target = self.state.targets.attack_target;
        if self.state.targets.target_pos.is_none()
            || TargetingCoordinator::near_attack_target(
                ctx.world,
                attack_target,
                unit.position,
                unit.range,
                ctx.config,
            )
            || unit.unit_type.auto_find_target
        {
            self.targeting.update_targeting(ctx, &self.state, unit);
        } else if attack_target.is_none() {
            // Walking to a point: don't get distracted
            self.targeting.set_target(None);
            out.push(Intent::ClearWeaponTargets);
        }

        if let Some(target) = self.state.targets.attack_target {
            if invalid_target(ctx.world, unit.team, target) {
                tracing::debug!(unit = ?unit.id, ?target, "attack target lost");
                self.state.targets.attack_target = None;
                self.state.targets.target_pos = None;
            }
        }

        if self.state.is_idle() {
            self.finish_path(ctx.paths);
        }

        self.track_attack_target(ctx, unit);

        match self.state.targets.target_pos {
            Some(target_pos) => self.follow_segment(ctx, unit, target_pos, out),
            None => {
                if let Some(target) = self.targeting.target() {
                    out.push(Intent::FaceTarget(Some(target)));
                }
            }
        }
    }

    /// Move the destination onto the attack target (or the near edge of a solid building)
    fn track_attack_target(&mut self, ctx: &TickContext<'_>, unit: &UnitSnapshot) {
        let Some(target) = self.state.targets.attack_target else {
            return;
        };
        let Some(view) = ctx.world.entity(target) else {
            self.state.targets.attack_target = None;
            self.state.targets.target_pos = None;
            return;
        };

        let mut pos = view.position;
        if unit.is_grounded()
            && view.is_solid_building()
            && unit.unit_type.path_cost != PathCost::Legs
            && self.state.stance != Stance::Ram
        {
            if let Some(edge) = ctx.world.closest_edge(target, unit.position) {
                pos = edge;
            }
        }

        self.state.targets.target_pos = Some(pos);
        self.state.targets.last_target_pos = Some(pos);
    }

    fn follow_segment(
        &mut self,
        ctx: &TickContext<'_>,
        unit: &UnitSnapshot,
        target_pos: Vec2,
        out: &mut UnitIntents,
    ) {
        let config = ctx.config;
        let unit_type = &unit.unit_type;
        let stance = self.state.stance;

        let movement_goal = target_pos + ctx.groups.formation_offset(self.state.group);
        let mut is_final = self.state.queue.is_empty();
        let mut moving = true;

        // Patrolling units hold position while something is in reach
        if stance == Stance::Patrol {
            let in_reach = self
                .targeting
                .target()
                .and_then(|id| ctx.world.entity(id))
                .is_some_and(|view| {
                    unit.within(view.position, unit_type.range - config.patrol_standoff_margin)
                });
            if in_reach {
                moving = false;
            }
        }

        let next_step = if unit.is_grounded() && !stance.ignores_terrain() {
            let request = self.state.targets.path_request.unwrap_or_default();
            let step = ctx.paths.step(unit, request, movement_goal);
            moving &= step.ready;
            is_final &= step.found && movement_goal.within(&step.next, config.final_point_epsilon);

            let goal_tile = TilePos::from_world(movement_goal, config.tile_size);
            let next_tile = TilePos::from_world(step.next, config.tile_size);
            if !step.found
                || ctx.paths.is_impassable(unit, goal_tile)
                || ctx.paths.is_impassable(unit, next_tile)
            {
                self.on_path_failure(ctx, unit);
                return;
            }
            step.next
        } else {
            movement_goal
        };

        let engage_range = unit_type.range - config.engage_margin;
        let attack_view = self
            .state
            .targets
            .attack_target
            .and_then(|id| ctx.world.entity(id));

        if moving {
            match attack_view {
                Some(view) if unit_type.circle_target => {
                    self.targeting.set_target(Some(view.id));
                    out.push(Intent::CircleTarget {
                        target: view.id,
                        radius: config.circle_radius,
                    });
                }
                _ => {
                    let engaging = attack_view.is_some() && stance != Stance::Ram;
                    let in_range = attack_view
                        .is_some_and(|view| unit.within(view.position, engage_range));
                    let stop_distance = if engaging && (in_range || !unit.is_grounded()) {
                        engage_range
                    } else {
                        0.0
                    };
                    let smoothing = if unit.is_flying() {
                        config.flying_smoothing
                    } else {
                        config.ground_smoothing
                    };
                    out.push(Intent::MoveTo {
                        target: next_step,
                        stop_distance,
                        smoothing,
                        arrive: is_final,
                    });
                }
            }
        }

        if self.state.targets.stop_at_target {
            if let Some(view) = attack_view {
                if unit.within(view.position, engage_range - 1.0) {
                    tracing::debug!(unit = ?unit.id, target = ?view.id, "reached attack target");
                    self.state.targets.attack_target = None;
                }
            }
        }

        if unit.is_flying() {
            out.push(Intent::LookAt(movement_goal));
        } else {
            out.push(Intent::FaceTarget(self.targeting.target()));
        }

        let arrival = config.arrival_radius.max(unit.hit_size / 2.0);
        if self.state.targets.attack_target.is_none() && unit.within(movement_goal, arrival) {
            self.finish_path(ctx.paths);
        }

        if self.state.targets.stop_when_in_range
            && self.state.targets.target_pos.is_some()
            && unit.within(movement_goal, engage_range * config.stop_in_range_fraction)
        {
            self.finish_path(ctx.paths);
            self.state.targets.stop_when_in_range = false;
        }
    }

    /// Remember unreachable buildings and move on to the next waypoint
    fn on_path_failure(&mut self, ctx: &TickContext<'_>, unit: &UnitSnapshot) {
        if let Some(tile) = self
            .state
            .targets
            .attack_target
            .and_then(|id| ctx.world.entity(id))
            .and_then(|view| view.building_tile())
        {
            if self.state.unreachable.insert(tile) {
                tracing::debug!(unit = ?unit.id, ?tile, "building marked unreachable");
            }
        }

        tracing::trace!(unit = ?unit.id, "no path, abandoning segment");
        self.state.targets.attack_target = None;
        self.finish_path(ctx.paths);
    }
}
