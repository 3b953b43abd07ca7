//! Bounded FIFO of pending waypoints
//!
//! Insertion order is execution order. The queue never holds two equal
//! waypoints through `push`; overflow and duplicates are dropped.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::core::types::{EntityId, Vec2};

/// A queued destination: a point in space or a weak reference to an entity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Waypoint {
    Point(Vec2),
    Entity(EntityId),
}

impl Waypoint {
    pub fn entity(&self) -> Option<EntityId> {
        match self {
            Waypoint::Entity(id) => Some(*id),
            Waypoint::Point(_) => None,
        }
    }
}

impl From<Vec2> for Waypoint {
    fn from(point: Vec2) -> Self {
        Waypoint::Point(point)
    }
}

impl From<EntityId> for Waypoint {
    fn from(id: EntityId) -> Self {
        Waypoint::Entity(id)
    }
}

/// Why a push did not append
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
    Full,
    Duplicate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandQueue {
    items: VecDeque<Waypoint>,
    capacity: usize,
}

impl CommandQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity.min(8)),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn contains(&self, waypoint: &Waypoint) -> bool {
        self.items.contains(waypoint)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Waypoint> {
        self.items.iter()
    }

    /// Append unless full or already queued
    pub fn push(&mut self, waypoint: Waypoint) -> Result<(), Rejected> {
        if self.items.len() >= self.capacity {
            return Err(Rejected::Full);
        }
        if self.items.contains(&waypoint) {
            return Err(Rejected::Duplicate);
        }
        self.items.push_back(waypoint);
        Ok(())
    }

    /// Re-append a finished patrol point; only the capacity is enforced
    pub fn requeue(&mut self, waypoint: Waypoint) {
        if self.items.len() < self.capacity {
            self.items.push_back(waypoint);
        }
    }

    pub fn pop_front(&mut self) -> Option<Waypoint> {
        self.items.pop_front()
    }

    /// Drop entity waypoints whose entity no longer validates; returns how many were removed
    pub fn prune(&mut self, mut is_valid: impl FnMut(EntityId) -> bool) -> usize {
        let before = self.items.len();
        self.items
            .retain(|waypoint| waypoint.entity().map_or(true, &mut is_valid));
        before - self.items.len()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_rejects_duplicates() {
        let mut queue = CommandQueue::new(4);
        let point = Waypoint::Point(Vec2::new(1.0, 2.0));
        assert!(queue.push(point).is_ok());
        assert_eq!(queue.push(point), Err(Rejected::Duplicate));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_push_respects_capacity() {
        let mut queue = CommandQueue::new(2);
        queue.push(Vec2::new(0.0, 0.0).into()).unwrap();
        queue.push(Vec2::new(1.0, 0.0).into()).unwrap();
        assert_eq!(queue.push(Vec2::new(2.0, 0.0).into()), Err(Rejected::Full));
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = CommandQueue::new(8);
        let a = Waypoint::Point(Vec2::new(1.0, 0.0));
        let b = Waypoint::Entity(EntityId::new(4, 0));
        queue.push(a).unwrap();
        queue.push(b).unwrap();
        assert_eq!(queue.pop_front(), Some(a));
        assert_eq!(queue.pop_front(), Some(b));
        assert_eq!(queue.pop_front(), None);
    }

    #[test]
    fn test_prune_only_touches_entities() {
        let mut queue = CommandQueue::new(8);
        let dead = EntityId::new(1, 0);
        let alive = EntityId::new(2, 0);
        queue.push(Waypoint::Entity(dead)).unwrap();
        queue.push(Waypoint::Point(Vec2::new(5.0, 5.0))).unwrap();
        queue.push(Waypoint::Entity(alive)).unwrap();

        let removed = queue.prune(|id| id == alive);

        assert_eq!(removed, 1);
        assert_eq!(queue.len(), 2);
        assert!(!queue.contains(&Waypoint::Entity(dead)));
    }
}
