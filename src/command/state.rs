//! Per-unit command state
//!
//! Everything the controller remembers between ticks lives here: the active
//! command and stance, the queue, the tracked targets, the unreachable memo and
//! the group link. The state machine edges that only touch this record
//! (assignment, queue activation, finish-path) are implemented here as well.

use serde::{Deserialize, Serialize};

use crate::command::kinds::{CommandKind, Stance};
use crate::command::queue::{CommandQueue, Rejected, Waypoint};
use crate::controller::formation::GroupHandle;
use crate::core::types::{EntityId, TilePos, Vec2};
use crate::world::{PathRequestId, PathService};

/// Tracked destination and attack target
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetState {
    pub attack_target: Option<EntityId>,
    pub target_pos: Option<Vec2>,
    pub last_target_pos: Option<Vec2>,
    /// Token keyed into the path service; replaced on every new assignment
    pub path_request: Option<PathRequestId>,
    /// Drop the attack target once it is inside the engage range
    pub stop_at_target: bool,
    /// Finish the path once the goal is inside 90% of the engage range
    pub stop_when_in_range: bool,
}

/// Buildings this unit failed to path to
///
/// Append-only and duplicate-free. A plain vector: membership checks are rare
/// compared to the size of the set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnreachableSet {
    buildings: Vec<TilePos>,
}

impl UnreachableSet {
    /// Record a building; returns false when it was already known
    pub fn insert(&mut self, building: TilePos) -> bool {
        if self.buildings.contains(&building) {
            return false;
        }
        self.buildings.push(building);
        true
    }

    pub fn contains(&self, building: TilePos) -> bool {
        self.buildings.contains(&building)
    }

    pub fn len(&self) -> usize {
        self.buildings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buildings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TilePos> {
        self.buildings.iter()
    }
}

/// Non-owning membership in a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupLink {
    pub handle: GroupHandle,
    pub index: usize,
}

/// What an enqueue request did
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnqueueOutcome {
    /// Nothing was active, so the waypoint became the current order
    Activated(Waypoint),
    Queued,
    Dropped(Rejected),
}

/// Result of the finish-path transition
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FinishOutcome {
    /// The next queued waypoint is now active
    Advanced(Waypoint),
    /// Queue empty; the unit released its group link
    LeftGroup(GroupHandle),
    /// Queue empty and no group to release
    Idle,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandState {
    pub command: Option<CommandKind>,
    pub stance: Stance,
    pub queue: CommandQueue,
    pub targets: TargetState,
    pub unreachable: UnreachableSet,
    pub group: Option<GroupLink>,
}

impl CommandState {
    pub fn new(max_queue_size: usize) -> Self {
        Self {
            command: None,
            stance: Stance::default(),
            queue: CommandQueue::new(max_queue_size),
            targets: TargetState::default(),
            unreachable: UnreachableSet::default(),
            group: None,
        }
    }

    /// True while a destination is being tracked
    pub fn has_command(&self) -> bool {
        self.targets.target_pos.is_some()
    }

    /// True when neither a destination nor an attack target is set
    pub fn is_idle(&self) -> bool {
        self.targets.target_pos.is_none() && self.targets.attack_target.is_none()
    }

    pub fn command_position_with(
        &mut self,
        paths: &dyn PathService,
        pos: Vec2,
        stop_when_in_range: bool,
    ) {
        let targets = &mut self.targets;
        targets.target_pos = Some(pos);
        targets.last_target_pos = Some(pos);
        targets.attack_target = None;
        targets.path_request = Some(paths.next_request_id());
        targets.stop_when_in_range = stop_when_in_range;
    }

    pub fn command_target_with(
        &mut self,
        paths: &dyn PathService,
        target: EntityId,
        stop_at_target: bool,
    ) {
        let targets = &mut self.targets;
        targets.attack_target = Some(target);
        targets.stop_at_target = stop_at_target;
        targets.path_request = Some(paths.next_request_id());
    }

    /// Make a waypoint the current order; entity targets keep the current `stop_at_target`
    pub fn activate(&mut self, paths: &dyn PathService, waypoint: Waypoint) {
        match waypoint {
            Waypoint::Entity(target) => {
                let stop_at_target = self.targets.stop_at_target;
                self.command_target_with(paths, target, stop_at_target);
            }
            Waypoint::Point(pos) => self.command_position_with(paths, pos, false),
        }
    }

    /// Activate immediately when idle, otherwise append to the queue
    pub fn enqueue(&mut self, paths: &dyn PathService, waypoint: Waypoint) -> EnqueueOutcome {
        if self.is_idle() {
            self.activate(paths, waypoint);
            return EnqueueOutcome::Activated(waypoint);
        }

        match self.queue.push(waypoint) {
            Ok(()) => EnqueueOutcome::Queued,
            Err(reason) => {
                tracing::trace!(?waypoint, ?reason, "waypoint dropped");
                EnqueueOutcome::Dropped(reason)
            }
        }
    }

    /// Clear the destination and advance to the next queued waypoint
    ///
    /// In patrol stance the finished point goes back to the tail so the route
    /// loops. With nothing queued the group link is released.
    pub fn finish_path(&mut self, paths: &dyn PathService) -> FinishOutcome {
        let prev = self.targets.target_pos.take();

        if let Some(next) = self.queue.pop_front() {
            self.activate(paths, next);

            if let (Some(prev), Stance::Patrol) = (prev, self.stance) {
                self.queue.requeue(Waypoint::Point(prev));
            }

            tracing::debug!(?next, remaining = self.queue.len(), "advanced to next waypoint");
            return FinishOutcome::Advanced(next);
        }

        match self.group.take() {
            Some(link) => {
                tracing::debug!(group = ?link.handle, "path finished, leaving group");
                FinishOutcome::LeftGroup(link.handle)
            }
            None => FinishOutcome::Idle,
        }
    }

    /// Empty the queue and drop all tracked targets
    pub fn clear_commands(&mut self) {
        self.queue.clear();
        self.targets.target_pos = None;
        self.targets.attack_target = None;
    }
}
