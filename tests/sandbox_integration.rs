//! End-to-end runs on the sandbox tile world

use std::sync::Arc;

use unit_command::command::{CommandKind, Stance};
use unit_command::controller::RemoteCall;
use unit_command::core::types::{EntityId, TeamId, TilePos, Vec2};
use unit_command::core::ControllerConfig;
use unit_command::simulation::CommandSim;
use unit_command::world::sandbox::{SandboxBuilding, SandboxUnit, SandboxWorld, Terrain};
use unit_command::world::{UnitType, WorldQuery};

const PLAYER: TeamId = TeamId(1);
const ENEMY: TeamId = TeamId(2);

fn dagger() -> Arc<UnitType> {
    let mut unit_type = UnitType::ground("dagger", 60.0);
    unit_type.commands = vec![CommandKind::Move, CommandKind::Boost, CommandKind::LoadBlocks];
    Arc::new(unit_type)
}

fn open_sim(width: i32, height: i32) -> CommandSim {
    CommandSim::new(SandboxWorld::new(width, height, 8.0), ControllerConfig::default())
}

fn spawn_at(sim: &mut CommandSim, tile: TilePos) -> EntityId {
    sim.spawn(SandboxUnit::new(PLAYER, tile.center(8.0), dagger()))
}

fn position(sim: &CommandSim, id: EntityId) -> Vec2 {
    sim.world.unit(id).unwrap().position
}

#[test]
fn test_walks_around_wall_and_completes() {
    let mut sim = open_sim(20, 10);
    for y in 0..9 {
        sim.world.set_terrain(TilePos::new(5, y), Terrain::Wall);
    }
    let unit = spawn_at(&mut sim, TilePos::new(1, 1));
    let goal = TilePos::new(10, 1).center(8.0);

    sim.command_position(unit, goal);
    sim.run(500);

    let controller = sim.controller(unit).unwrap();
    assert!(!controller.has_active_command());
    assert!(position(&sim, unit).distance(&goal) <= 5.0 + 1e-3);
}

#[test]
fn test_attacks_building_and_forgets_it_when_destroyed() {
    let mut sim = open_sim(30, 6);
    let unit = spawn_at(&mut sim, TilePos::new(1, 1));
    let building = sim
        .world
        .spawn_building(SandboxBuilding::new(ENEMY, TilePos::new(20, 1)));

    sim.command_target(unit, building);
    sim.run(300);

    let building_pos = TilePos::new(20, 1).center(8.0);
    assert!(position(&sim, unit).distance(&building_pos) <= 60.0);
    assert_eq!(sim.controller(unit).unwrap().attack_target(), Some(building));

    sim.world.despawn(building);
    sim.step();

    let controller = sim.controller(unit).unwrap();
    assert_eq!(controller.attack_target(), None);
    assert_eq!(controller.target_pos(), None);
}

#[test]
fn test_enclosed_building_marked_unreachable_once() {
    let mut sim = open_sim(20, 6);
    let target = TilePos::new(10, 2);
    for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
        sim.world
            .set_terrain(TilePos::new(target.x + dx, target.y + dy), Terrain::Wall);
    }
    let unit = spawn_at(&mut sim, TilePos::new(1, 2));
    let building = sim.world.spawn_building(SandboxBuilding::new(ENEMY, target));

    sim.command_target(unit, building);
    sim.step();
    sim.command_target(unit, building);
    sim.step();

    let controller = sim.controller(unit).unwrap();
    assert_eq!(controller.unreachable().len(), 1);
    assert!(controller.unreachable().contains(target));
    assert_eq!(controller.attack_target(), None);
}

#[test]
fn test_group_arrives_in_formation() {
    let mut sim = open_sim(40, 20);
    let units: Vec<_> = (0..4)
        .map(|i| spawn_at(&mut sim, TilePos::new(2 + i % 2, 2 + i / 2)))
        .collect();
    let goal = TilePos::new(25, 10).center(8.0);

    let handle = sim.command_group(&units, goal, 1.5).unwrap();
    assert_eq!(sim.groups.get(handle).unwrap().units.len(), 4);
    sim.run(600);

    for &unit in &units {
        let controller = sim.controller(unit).unwrap();
        assert!(!controller.has_active_command());
        assert_eq!(controller.group(), None);
        assert!(position(&sim, unit).distance(&goal) <= 20.0);
    }

    // Formation slots keep units apart
    let first = position(&sim, units[0]);
    let last = position(&sim, units[3]);
    assert!(first.distance(&last) > 6.0);

    // Last member out frees the group
    assert!(sim.groups.is_empty());
}

#[test]
fn test_successive_marches_free_their_groups() {
    let mut sim = open_sim(40, 20);
    let units: Vec<_> = (0..4)
        .map(|i| spawn_at(&mut sim, TilePos::new(2 + i % 2, 2 + i / 2)))
        .collect();

    for goal in [TilePos::new(25, 10), TilePos::new(8, 10), TilePos::new(25, 4)] {
        sim.command_group(&units, goal.center(8.0), 1.5).unwrap();
        assert_eq!(sim.groups.len(), 1);
        sim.run(600);
    }

    for &unit in &units {
        assert_eq!(sim.controller(unit).unwrap().group(), None);
    }
    assert!(sim.groups.is_empty());
}

#[test]
fn test_regrouping_mid_march_frees_the_old_group() {
    let mut sim = open_sim(40, 20);
    let units: Vec<_> = (0..3)
        .map(|i| spawn_at(&mut sim, TilePos::new(2, 2 + i)))
        .collect();

    let first = sim.command_group(&units, TilePos::new(30, 10).center(8.0), 1.5).unwrap();
    sim.run(5);
    let second = sim.command_group(&units, TilePos::new(30, 4).center(8.0), 1.5).unwrap();

    assert!(sim.groups.get(first).is_none());
    assert!(sim.groups.get(second).is_some());
    assert_eq!(sim.groups.len(), 1);
}

#[test]
fn test_group_freed_when_its_members_die() {
    let mut sim = open_sim(40, 20);
    let a = spawn_at(&mut sim, TilePos::new(2, 2));
    let b = spawn_at(&mut sim, TilePos::new(2, 3));
    let handle = sim.command_group(&[a, b], TilePos::new(30, 10).center(8.0), 1.5).unwrap();

    sim.world.despawn(a);
    sim.step();
    assert!(sim.groups.get(handle).is_some());

    sim.world.despawn(b);
    sim.step();
    assert!(sim.groups.is_empty());
}

#[test]
fn test_patrol_keeps_route_alive() {
    let mut sim = open_sim(30, 6);
    let unit = spawn_at(&mut sim, TilePos::new(2, 2));
    sim.set_stance(unit, Stance::Patrol);
    sim.enqueue(unit, TilePos::new(4, 2).center(8.0));
    sim.enqueue(unit, TilePos::new(10, 2).center(8.0));

    for _ in 0..400 {
        sim.step();
        let controller = sim.controller(unit).unwrap();
        assert!(controller.has_active_command());
        assert_eq!(controller.queue().len(), 1);
    }
}

#[test]
fn test_boost_hovers_over_walls() {
    let mut sim = open_sim(30, 6);
    for y in 0..6 {
        sim.world.set_terrain(TilePos::new(10, y), Terrain::Wall);
    }
    let unit = spawn_at(&mut sim, TilePos::new(2, 2));
    let goal = TilePos::new(20, 2).center(8.0);

    assert!(sim.assign(unit, CommandKind::Boost));
    sim.step();
    sim.command_position(unit, goal);
    sim.run(200);

    assert!(sim.controller(unit).unwrap().has_delegate());
    assert!(position(&sim, unit).distance(&goal) <= 5.0 + 1e-3);
}

#[test]
fn test_load_blocks_picks_up_building() {
    let mut sim = open_sim(10, 10);
    let tile = TilePos::new(3, 3);
    let unit = sim.spawn(SandboxUnit::new(PLAYER, tile.center(8.0), dagger()).with_payload(16.0));
    let crate_block = sim.world.spawn_building(SandboxBuilding::new(PLAYER, tile));

    assert!(sim.assign(unit, CommandKind::LoadBlocks));
    sim.step();

    assert_eq!(
        sim.world.calls(),
        &[RemoteCall::PickedBuildPayload { unit, building: crate_block, whole: true }]
    );
    assert!(!sim.world.is_valid(crate_block));
    assert_eq!(sim.world.unit(unit).unwrap().payload.unwrap().used, 4.0);
}

#[test]
fn test_parallel_tick_matches_serial_outcome() {
    let run = |parallel_threshold: usize| {
        let config = ControllerConfig {
            parallel_threshold,
            ..ControllerConfig::default()
        };
        let mut sim = CommandSim::new(SandboxWorld::new(40, 20, 8.0), config);
        let units: Vec<_> = (0..16)
            .map(|i| spawn_at(&mut sim, TilePos::new(1 + i % 4, 1 + i / 4)))
            .collect();
        for (i, &unit) in units.iter().enumerate() {
            sim.command_position(unit, TilePos::new(30, 1 + i as i32).center(8.0));
        }
        sim.run(300);
        units
            .iter()
            .map(|&unit| position(&sim, unit))
            .collect::<Vec<_>>()
    };

    assert_eq!(run(1000), run(4));
}

#[test]
fn test_dead_units_leave_the_roster() {
    let mut sim = open_sim(10, 10);
    let unit = spawn_at(&mut sim, TilePos::new(1, 1));
    let other = spawn_at(&mut sim, TilePos::new(2, 1));

    sim.world.despawn(unit);
    let report = sim.step();

    assert_eq!(report.missing, vec![unit]);
    assert_eq!(report.updates.len(), 1);
    assert_eq!(report.updates[0].id, other);
    assert_eq!(sim.controlled(), 1);
}
