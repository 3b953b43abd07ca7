//! Payload commands: drop, load units, load blocks
//!
//! Only the authoritative simulation issues these; clients see them through
//! the replicated calls.

use crate::command::{CommandKind, CommandState};
use crate::controller::intents::{RemoteCall, UnitIntents};
use crate::controller::TickContext;
use crate::world::UnitSnapshot;

pub(crate) fn request_payload_calls(
    ctx: &TickContext<'_>,
    state: &CommandState,
    unit: &UnitSnapshot,
    out: &mut UnitIntents,
) {
    if !ctx.world.is_authority() || !state.command.is_some_and(|kind| kind.is_payload()) {
        return;
    }
    let Some(bay) = unit.payload else {
        return;
    };

    match state.command {
        Some(CommandKind::UnloadPayload) if bay.has_payload() => {
            out.call(RemoteCall::PayloadDropped {
                unit: unit.id,
                at: unit.position,
            });
        }
        Some(CommandKind::LoadUnits) => {
            if let Some(target) = ctx.world.closest_pickup_unit(unit, unit.hit_size * 2.0) {
                out.call(RemoteCall::PickedUnitPayload { unit: unit.id, target });
            }
        }
        Some(CommandKind::LoadBlocks) => {
            let at_target = state
                .targets
                .target_pos
                .map_or(true, |pos| unit.within(pos, ctx.config.load_blocks_radius));
            if !at_target {
                return;
            }

            let Some(building) = ctx.world.building_at(unit.position) else {
                return;
            };
            if !ctx.world.can_interact(unit.team, building.team) {
                return;
            }

            // A held payload wins over the building itself
            if building.held_payload.is_some_and(|size| bay.can_fit(size)) {
                out.call(RemoteCall::PickedBuildPayload {
                    unit: unit.id,
                    building: building.id,
                    whole: false,
                });
            } else if !building.hidden && building.pickupable && bay.can_fit(building.size) {
                out.call(RemoteCall::PickedBuildPayload {
                    unit: unit.id,
                    building: building.id,
                    whole: true,
                });
            }
        }
        _ => {}
    }
}
