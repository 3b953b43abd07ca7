//! Controller output
//!
//! A tick never mutates the unit directly. It returns the steering, facing and
//! side-effect requests the host applies afterwards.

use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, Vec2};

/// Payload side effects replicated through the call bus
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RemoteCall {
    PayloadDropped { unit: EntityId, at: Vec2 },
    PickedUnitPayload { unit: EntityId, target: EntityId },
    /// `whole` picks up the building itself rather than the payload it holds
    PickedBuildPayload { unit: EntityId, building: EntityId, whole: bool },
}

/// One request for the host to apply this tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Intent {
    MoveTo {
        target: Vec2,
        /// Stop this far short of the target
        stop_distance: f32,
        smoothing: f32,
        /// Decelerate into the target instead of passing through
        arrive: bool,
    },
    CircleTarget { target: EntityId, radius: f32 },
    LookAt(Vec2),
    /// Face the ambient target, or the movement direction without one
    FaceTarget(Option<EntityId>),
    SetBoosting(bool),
    /// Forget weapon mount targets that the controller is allowed to steer
    ClearWeaponTargets,
    ClearMining,
    ClearBuilding,
    Call(RemoteCall),
}

/// Everything a controller asked for during one tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnitIntents {
    pub intents: Vec<Intent>,
}

impl UnitIntents {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, intent: Intent) {
        self.intents.push(intent);
    }

    pub fn call(&mut self, call: RemoteCall) {
        self.intents.push(Intent::Call(call));
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Intent> {
        self.intents.iter()
    }

    /// The last steering request, if any
    pub fn steering(&self) -> Option<&Intent> {
        self.intents
            .iter()
            .rev()
            .find(|intent| matches!(intent, Intent::MoveTo { .. } | Intent::CircleTarget { .. }))
    }

    pub fn calls(&self) -> impl Iterator<Item = &RemoteCall> {
        self.intents.iter().filter_map(|intent| match intent {
            Intent::Call(call) => Some(call),
            _ => None,
        })
    }

    pub fn clear(&mut self) {
        self.intents.clear();
    }
}
