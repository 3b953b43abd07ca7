//! Sub-controller delegation
//!
//! A command may swap the default behavior for an entirely different
//! controller. The registry maps each `CommandKind` to an optional factory and
//! default stance; the outer controller instantiates a delegate whenever the
//! active command changes and forwards every assignment to it.

use std::fmt;
use std::sync::Arc;

use ahash::AHashMap;

use crate::command::{CommandKind, Stance};
use crate::controller::intents::{Intent, UnitIntents};
use crate::controller::timer::{IntervalTimer, TimerSlot};
use crate::controller::TickContext;
use crate::core::types::{EntityId, Vec2};
use crate::world::UnitSnapshot;

/// Behavior that can stand in for the default command behavior
pub trait SubController: Send {
    /// Unit this controller is currently bound to
    fn unit(&self) -> Option<EntityId>;

    fn bind(&mut self, unit: EntityId);

    fn tick(&mut self, ctx: &TickContext<'_>, unit: &UnitSnapshot, out: &mut UnitIntents);

    fn on_command_position(&mut self, _pos: Vec2) {}

    fn on_command_target(&mut self, _target: EntityId) {}
}

pub type ControllerFactory = Arc<dyn Fn(&UnitSnapshot) -> Box<dyn SubController> + Send + Sync>;

/// What a command brings with it besides its tag
#[derive(Clone, Default)]
pub struct CommandBinding {
    pub factory: Option<ControllerFactory>,
    pub default_stance: Option<Stance>,
}

impl CommandBinding {
    pub fn with_factory<F>(factory: F) -> Self
    where
        F: Fn(&UnitSnapshot) -> Box<dyn SubController> + Send + Sync + 'static,
    {
        Self {
            factory: Some(Arc::new(factory)),
            default_stance: None,
        }
    }

    pub fn with_default_stance(mut self, stance: Stance) -> Self {
        self.default_stance = Some(stance);
        self
    }
}

/// Command → behavior lookup shared by all controllers
#[derive(Clone, Default)]
pub struct CommandRegistry {
    bindings: AHashMap<CommandKind, CommandBinding>,
}

impl CommandRegistry {
    /// Registry with no delegates; every command uses the default behavior
    pub fn empty() -> Self {
        Self::default()
    }

    /// Built-in delegates: `Boost` hovers to its destination
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(
            CommandKind::Boost,
            CommandBinding::with_factory(|_| Box::new(BoostController::new()) as Box<dyn SubController>),
        );
        registry
    }

    pub fn register(&mut self, kind: CommandKind, binding: CommandBinding) {
        self.bindings.insert(kind, binding);
    }

    pub fn create(&self, kind: CommandKind, unit: &UnitSnapshot) -> Option<Box<dyn SubController>> {
        let factory = self.bindings.get(&kind)?.factory.as_ref()?;
        Some(factory(unit))
    }

    pub fn default_stance(&self, kind: CommandKind) -> Option<Stance> {
        self.bindings.get(&kind)?.default_stance
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.bindings.keys().map(|k| k.name()).collect();
        kinds.sort_unstable();
        f.debug_struct("CommandRegistry").field("bindings", &kinds).finish()
    }
}

/// Dumb ground AI used where the command controller has no answer (naval auto-targeting)
///
/// Chases the nearest hostile inside its sight range and faces it.
#[derive(Debug, Default)]
pub struct GroundFallback {
    unit: Option<EntityId>,
    target: Option<EntityId>,
    timer: IntervalTimer,
}

impl GroundFallback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn target(&self) -> Option<EntityId> {
        self.target
    }
}

impl SubController for GroundFallback {
    fn unit(&self) -> Option<EntityId> {
        self.unit
    }

    fn bind(&mut self, unit: EntityId) {
        self.unit = Some(unit);
        self.target = None;
    }

    fn tick(&mut self, ctx: &TickContext<'_>, unit: &UnitSnapshot, out: &mut UnitIntents) {
        let config = ctx.config;
        if self
            .timer
            .get(TimerSlot::Fallback, config.retarget_ambient_ticks, ctx.tick)
        {
            self.target = ctx.targets.find_nearest_hostile(
                unit.team,
                unit.position,
                config.fallback_sight_range,
                unit.unit_type.target_air,
                unit.unit_type.target_ground,
            );
        }

        let view = self
            .target
            .and_then(|id| ctx.world.entity(id))
            .filter(|view| view.team != unit.team && view.targetable());

        match view {
            Some(view) => {
                out.push(Intent::MoveTo {
                    target: view.position,
                    stop_distance: unit.range * 0.8,
                    smoothing: config.ground_smoothing,
                    arrive: true,
                });
                out.push(Intent::FaceTarget(Some(view.id)));
            }
            None => {
                self.target = None;
                out.push(Intent::FaceTarget(None));
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BoostGoal {
    Point(Vec2),
    Entity(EntityId),
}

/// Hovers over obstacles straight to the commanded destination
#[derive(Debug, Default)]
pub struct BoostController {
    unit: Option<EntityId>,
    goal: Option<BoostGoal>,
}

impl BoostController {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SubController for BoostController {
    fn unit(&self) -> Option<EntityId> {
        self.unit
    }

    fn bind(&mut self, unit: EntityId) {
        self.unit = Some(unit);
    }

    fn tick(&mut self, ctx: &TickContext<'_>, unit: &UnitSnapshot, out: &mut UnitIntents) {
        out.push(Intent::SetBoosting(true));

        let goal = match self.goal {
            Some(BoostGoal::Point(pos)) => Some(pos),
            Some(BoostGoal::Entity(id)) => ctx.world.entity(id).map(|view| view.position),
            None => None,
        };

        let Some(goal) = goal else {
            self.goal = None;
            return;
        };

        if unit.within(goal, ctx.config.arrival_radius.max(unit.hit_size / 2.0)) {
            self.goal = None;
            return;
        }

        out.push(Intent::MoveTo {
            target: goal,
            stop_distance: 0.0,
            smoothing: ctx.config.flying_smoothing,
            arrive: true,
        });
        out.push(Intent::LookAt(goal));
    }

    fn on_command_position(&mut self, pos: Vec2) {
        self.goal = Some(BoostGoal::Point(pos));
    }

    fn on_command_target(&mut self, target: EntityId) {
        self.goal = Some(BoostGoal::Entity(target));
    }
}
