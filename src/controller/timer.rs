//! Per-unit interval timers

use serde::{Deserialize, Serialize};

use crate::core::types::Tick;

/// Independent cadences a controller keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSlot {
    Retarget = 0,
    CounterAttack = 1,
    Fallback = 2,
}

const SLOTS: usize = 3;

/// Rate limiter keyed by slot
///
/// `get` fires on the first call and then at most once per `interval` ticks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalTimer {
    last_fired: [Option<Tick>; SLOTS],
}

impl IntervalTimer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&mut self, slot: TimerSlot, interval: Tick, now: Tick) -> bool {
        let last = &mut self.last_fired[slot as usize];
        match *last {
            Some(at) if now.saturating_sub(at) < interval => false,
            _ => {
                *last = Some(now);
                true
            }
        }
    }
}
