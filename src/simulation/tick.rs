//! Controller tick - steps every controlled unit once
//!
//! Controllers only read the world during a tick, so they run independently:
//! serially for small rosters, on the rayon pool above the configured
//! threshold. Intents are applied by the caller afterwards.

use rayon::prelude::*;
use serde::Serialize;

use crate::controller::{GroupHandle, TickContext, UnitController, UnitIntents};
use crate::core::types::{EntityId, Tick};
use crate::world::UnitSnapshot;

/// A unit and the controller driving it
#[derive(Debug)]
pub struct ControlledUnit {
    pub id: EntityId,
    pub controller: UnitController,
}

/// One controller's output for this tick
#[derive(Debug, Clone, Serialize)]
pub struct UnitUpdate {
    pub id: EntityId,
    pub intents: UnitIntents,
    /// Group-aware speed cap to move with
    pub speed: f32,
    /// Group the unit left this tick; the owner frees it once nobody links to it
    pub released_group: Option<GroupHandle>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TickReport {
    pub tick: Tick,
    /// Updates in roster order
    pub updates: Vec<UnitUpdate>,
    /// Roster entries whose unit no longer exists
    pub missing: Vec<EntityId>,
}

/// Run every controller in `roster` against the same world view
pub fn run_controller_tick<F>(
    ctx: &TickContext<'_>,
    roster: &mut [ControlledUnit],
    snapshot: F,
) -> TickReport
where
    F: Fn(EntityId) -> Option<UnitSnapshot> + Sync,
{
    let step = |entry: &mut ControlledUnit| -> Result<UnitUpdate, EntityId> {
        let unit = snapshot(entry.id).ok_or(entry.id)?;
        let intents = entry.controller.update(ctx, &unit);
        Ok(UnitUpdate {
            id: entry.id,
            intents,
            speed: entry.controller.preferred_speed(ctx.groups, &unit),
            released_group: entry.controller.take_released_group(),
        })
    };

    let results: Vec<Result<UnitUpdate, EntityId>> = if roster.len() >= ctx.config.parallel_threshold {
        // PARALLEL: controllers share nothing mutable
        roster.par_iter_mut().map(step).collect()
    } else {
        roster.iter_mut().map(step).collect()
    };

    let mut report = TickReport {
        tick: ctx.tick,
        ..TickReport::default()
    };
    for result in results {
        match result {
            Ok(update) => report.updates.push(update),
            Err(id) => report.missing.push(id),
        }
    }

    tracing::debug!(
        tick = ctx.tick,
        updated = report.updates.len(),
        missing = report.missing.len(),
        "controller tick"
    );
    report
}
