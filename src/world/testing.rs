use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::types::{TilePos, Vec2};
use crate::world::{PathRequestId, PathService, PathStep, UnitSnapshot};

/// Path service that only hands out ids and walks straight to the goal
#[derive(Debug, Default)]
pub struct CountingPaths {
    issued: AtomicU64,
}

impl PathService for CountingPaths {
    fn next_request_id(&self) -> PathRequestId {
        PathRequestId(self.issued.fetch_add(1, Ordering::Relaxed) + 1)
    }

    fn step(&self, _unit: &UnitSnapshot, _request: PathRequestId, goal: Vec2) -> PathStep {
        PathStep::to(goal)
    }

    fn is_impassable(&self, _unit: &UnitSnapshot, _tile: TilePos) -> bool {
        false
    }
}
