//! Group formation offsets
//!
//! Units commanded together share a `UnitGroup` owned by the issuing system
//! through a `GroupArena`. Each member keeps only a handle and its slot index,
//! reads its offset from the group, and drops its link when its path ends.

use serde::{Deserialize, Serialize};

use crate::command::GroupLink;
use crate::core::types::{EntityId, Vec2};

/// Generational handle into a `GroupArena`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupHandle {
    index: u32,
    generation: u32,
}

impl GroupHandle {
    pub fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }
}

/// Member of a formation request: id, hit size and speed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormationMember {
    pub id: EntityId,
    pub hit_size: f32,
    pub speed: f32,
}

/// Cohort of units moving to one point as a loose formation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitGroup {
    pub units: Vec<EntityId>,
    /// Flattened per-member offsets: `[x0, y0, x1, y1, ...]`
    pub positions: Vec<f32>,
    /// Speed of the slowest member
    pub min_speed: f32,
    pub valid: bool,
}

impl UnitGroup {
    /// Lay members out on a square grid centered on the target point
    ///
    /// Cells are sized by the largest member times `spacing`; slots fill row by
    /// row in member order.
    pub fn form(members: &[FormationMember], spacing: f32) -> Self {
        if members.is_empty() {
            return Self {
                units: Vec::new(),
                positions: Vec::new(),
                min_speed: 0.0,
                valid: false,
            };
        }

        let count = members.len();
        let columns = (count as f32).sqrt().ceil() as usize;
        let rows = count.div_ceil(columns);
        let cell = members
            .iter()
            .map(|m| m.hit_size)
            .fold(0.0_f32, f32::max)
            * spacing;

        // Center the grid on the origin
        let half_width = (columns - 1) as f32 * cell / 2.0;
        let half_height = (rows - 1) as f32 * cell / 2.0;

        let mut positions = Vec::with_capacity(count * 2);
        for i in 0..count {
            let column = i % columns;
            let row = i / columns;
            positions.push(column as f32 * cell - half_width);
            positions.push(row as f32 * cell - half_height);
        }

        let min_speed = members
            .iter()
            .map(|m| m.speed)
            .fold(f32::INFINITY, f32::min);

        Self {
            units: members.iter().map(|m| m.id).collect(),
            positions,
            min_speed,
            valid: true,
        }
    }

    /// Offset for a member slot, if the group is valid and the slot exists
    pub fn offset(&self, index: usize) -> Option<Vec2> {
        if !self.valid || index >= self.units.len() {
            return None;
        }
        let x = *self.positions.get(index * 2)?;
        let y = *self.positions.get(index * 2 + 1)?;
        Some(Vec2::new(x, y))
    }
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    group: Option<UnitGroup>,
}

/// Owner of all live groups
///
/// Only the issuing system mutates groups; controllers read them during a tick.
#[derive(Debug, Clone, Default)]
pub struct GroupArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl GroupArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, group: UnitGroup) -> GroupHandle {
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.group = Some(group);
            return GroupHandle::new(index, slot.generation);
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot { generation: 0, group: Some(group) });
        GroupHandle::new(index, 0)
    }

    pub fn get(&self, handle: GroupHandle) -> Option<&UnitGroup> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.group.as_ref())
    }

    pub fn get_mut(&mut self, handle: GroupHandle) -> Option<&mut UnitGroup> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.group.as_mut())
    }

    /// Remove a group; outstanding handles stop resolving
    pub fn remove(&mut self, handle: GroupHandle) -> Option<UnitGroup> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let group = slot.group.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        Some(group)
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.group.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Links to hand each member's controller, in slot order
    pub fn links(&self, handle: GroupHandle) -> Vec<(EntityId, GroupLink)> {
        self.get(handle)
            .map(|group| {
                group
                    .units
                    .iter()
                    .enumerate()
                    .map(|(index, id)| (*id, GroupLink { handle, index }))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Offset to add to the target point for a linked member
    pub fn formation_offset(&self, link: Option<GroupLink>) -> Vec2 {
        link.and_then(|link| self.get(link.handle)?.offset(link.index))
            .unwrap_or(Vec2::ZERO)
    }

    /// Speed cap for a member: the slowest member's speed while linked
    pub fn preferred_speed(&self, link: Option<GroupLink>, own_speed: f32) -> f32 {
        match link.and_then(|link| self.get(link.handle)) {
            Some(group) => group.min_speed.min(own_speed),
            None => own_speed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(index: u32, speed: f32) -> FormationMember {
        FormationMember {
            id: EntityId::new(index, 0),
            hit_size: 8.0,
            speed,
        }
    }

    #[test]
    fn test_form_centers_grid() {
        let members: Vec<_> = (0..4).map(|i| member(i, 1.0)).collect();
        let group = UnitGroup::form(&members, 1.5);

        // 2x2 grid, cell 12
        assert_eq!(group.offset(0), Some(Vec2::new(-6.0, -6.0)));
        assert_eq!(group.offset(1), Some(Vec2::new(6.0, -6.0)));
        assert_eq!(group.offset(2), Some(Vec2::new(-6.0, 6.0)));
        assert_eq!(group.offset(3), Some(Vec2::new(6.0, 6.0)));
        assert_eq!(group.offset(4), None);
    }

    #[test]
    fn test_form_tracks_slowest_member() {
        let group = UnitGroup::form(&[member(0, 0.8), member(1, 0.5), member(2, 1.2)], 1.0);
        assert_eq!(group.min_speed, 0.5);
    }

    #[test]
    fn test_invalid_group_has_no_offset() {
        let mut group = UnitGroup::form(&[member(0, 1.0), member(1, 1.0)], 1.0);
        group.valid = false;
        assert_eq!(group.offset(0), None);
    }

    #[test]
    fn test_arena_handles_go_stale() {
        let mut arena = GroupArena::new();
        let handle = arena.insert(UnitGroup::form(&[member(0, 1.0)], 1.0));
        assert!(arena.get(handle).is_some());

        arena.remove(handle);
        let reused = arena.insert(UnitGroup::form(&[member(1, 1.0)], 1.0));

        assert!(arena.get(handle).is_none());
        assert!(arena.get(reused).is_some());
        assert_ne!(handle, reused);
    }

    #[test]
    fn test_preferred_speed_capped_by_group() {
        let mut arena = GroupArena::new();
        let handle = arena.insert(UnitGroup::form(&[member(0, 0.4), member(1, 1.0)], 1.0));
        let link = GroupLink { handle, index: 1 };

        assert_eq!(arena.preferred_speed(Some(link), 1.0), 0.4);
        assert_eq!(arena.preferred_speed(None, 1.0), 1.0);
    }

    #[test]
    fn test_links_follow_member_order() {
        let mut arena = GroupArena::new();
        let handle = arena.insert(UnitGroup::form(&[member(7, 1.0), member(3, 1.0)], 1.0));
        let links = arena.links(handle);
        assert_eq!(links[0].0, EntityId::new(7, 0));
        assert_eq!(links[1].1.index, 1);
    }
}
