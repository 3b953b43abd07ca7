//! Command Sandbox
//!
//! Runs a seeded skirmish on a small tile map and prints a JSON (or text)
//! summary of where every controlled unit ended up.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;

use unit_command::command::{CommandKind, Stance, Waypoint};
use unit_command::core::types::{EntityId, TeamId, TilePos, Vec2};
use unit_command::core::{config, set_config, ControlError, ControllerConfig, Result};
use unit_command::simulation::CommandSim;
use unit_command::world::sandbox::{
    SandboxBuilding, SandboxUnit, SandboxWorld, Terrain, MAX_SANDBOX_TILES,
};
use unit_command::world::{TeamRules, UnitType, WorldQuery};

/// Command Sandbox - drive unit command controllers on a generated map
#[derive(Parser, Debug)]
#[command(name = "command_sandbox")]
#[command(about = "Run a seeded command-controller skirmish and print a summary")]
struct Args {
    /// Map width in tiles
    #[arg(long, default_value_t = 48)]
    width: i32,

    /// Map height in tiles
    #[arg(long, default_value_t = 32)]
    height: i32,

    /// Number of units in the commanded squad, scout included
    #[arg(long, default_value_t = 9)]
    units: usize,

    /// Number of enemy buildings
    #[arg(long, default_value_t = 4)]
    targets: usize,

    /// Ticks to simulate
    #[arg(long, default_value_t = 900)]
    ticks: u64,

    /// Random seed for deterministic runs
    #[arg(long)]
    seed: Option<u64>,

    /// Controller config (TOML); defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Command given to the scout (move, boost, mine, ...)
    #[arg(long, default_value = "boost")]
    scout_command: String,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,
}

#[derive(Serialize)]
struct UnitSummary {
    id: EntityId,
    position: Vec2,
    command: CommandKind,
    stance: Stance,
    has_command: bool,
    queued: usize,
    unreachable: usize,
}

#[derive(Serialize)]
struct SandboxResult {
    seed: u64,
    ticks: u64,
    enemy_buildings_left: usize,
    remote_calls: usize,
    units: Vec<UnitSummary>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "unit_command=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    if args.width < 8 || args.height < 4 {
        return Err(ControlError::InvalidScenario(format!(
            "map {}x{} is too small (minimum 8x4)",
            args.width, args.height
        )));
    }
    if SandboxWorld::tile_count(args.width, args.height).is_none() {
        return Err(ControlError::InvalidScenario(format!(
            "map {}x{} exceeds {} tiles",
            args.width, args.height, MAX_SANDBOX_TILES
        )));
    }
    if args.units == 0 {
        return Err(ControlError::InvalidScenario("squad needs at least one unit".into()));
    }
    let scout_command: CommandKind = args.scout_command.parse()?;

    if let Some(path) = &args.config {
        if set_config(ControllerConfig::load(path)?).is_err() {
            tracing::warn!("controller config already set, ignoring {}", path.display());
        }
    }
    let config = config().clone();

    let seed = args.seed.unwrap_or_else(rand::random);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    tracing::info!(seed, width = args.width, height = args.height, "building sandbox");

    let (mut sim, squad, enemies) = build_scenario(&args, config, &mut rng);

    // The scout gets its own command and heads for the far corner
    let scout = squad[0];
    let far_corner = TilePos::new(args.width - 2, 1).center(sim.world.tile_size());
    if !sim.assign(scout, scout_command) {
        tracing::warn!(command = %scout_command, "scout cannot take this command");
    }
    sim.step();
    sim.command_position(scout, far_corner);
    let squad = &squad[1..];

    // Half the squad marches as a formation, the rest patrols and raids
    let (marchers, raiders) = squad.split_at(squad.len() / 2);
    let rally = Vec2::new(args.width as f32 * 0.5, args.height as f32 * 0.5) * sim.world.tile_size();
    sim.command_group(marchers, rally, 1.5);

    for (i, &unit) in raiders.iter().enumerate() {
        if i % 2 == 0 {
            sim.set_stance(unit, Stance::Patrol);
            sim.enqueue(unit, Waypoint::Point(rally));
            sim.enqueue(unit, Waypoint::Point(Vec2::new(8.0, 8.0)));
        } else {
            for &target in &enemies {
                sim.enqueue(unit, Waypoint::Entity(target));
            }
        }
    }

    for tick in 0..args.ticks {
        sim.step();
        if tick % 300 == 0 {
            tracing::info!(tick, "simulating");
        }
    }

    let units = std::iter::once(&scout)
        .chain(squad)
        .filter_map(|&id| {
            let unit = sim.world.unit(id)?;
            let controller = sim.controller(id)?;
            Some(UnitSummary {
                id,
                position: unit.position,
                command: controller.current_command(),
                stance: controller.stance(),
                has_command: controller.has_active_command(),
                queued: controller.queue().len(),
                unreachable: controller.unreachable().len(),
            })
        })
        .collect();

    let result = SandboxResult {
        seed,
        ticks: args.ticks,
        enemy_buildings_left: enemies.iter().filter(|id| sim.world.is_valid(**id)).count(),
        remote_calls: sim.world.calls().len(),
        units,
    };

    if args.format == "json" {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("seed {} after {} ticks", result.seed, result.ticks);
        for unit in &result.units {
            println!(
                "  {:?} at ({:.1}, {:.1}) {:?}/{:?} active={} queued={} unreachable={}",
                unit.id,
                unit.position.x,
                unit.position.y,
                unit.command,
                unit.stance,
                unit.has_command,
                unit.queued,
                unit.unreachable
            );
        }
    }

    Ok(())
}

/// Map with a broken wall down the middle, a lake, a squad on the left and
/// enemy buildings on the right
fn build_scenario(
    args: &Args,
    config: ControllerConfig,
    rng: &mut ChaCha8Rng,
) -> (CommandSim, Vec<EntityId>, Vec<EntityId>) {
    let tile_size = config.tile_size;
    let mut world = SandboxWorld::new(args.width, args.height, tile_size);

    let wall_x = args.width / 2;
    let gap = rng.gen_range(1..args.height.max(3) - 1);
    for y in 0..args.height {
        if (y - gap).abs() > 1 {
            world.set_terrain(TilePos::new(wall_x, y), Terrain::Wall);
        }
    }
    for y in 0..args.height / 4 {
        for x in 0..args.width / 6 {
            world.set_terrain(TilePos::new(x, args.height - 1 - y), Terrain::DeepWater);
        }
    }

    world.set_team_rules(TeamId(2), TeamRules { ai: true, rts_ai: false });

    let mut dagger = UnitType::ground("dagger", 60.0);
    dagger.commands = vec![CommandKind::Move, CommandKind::Boost, CommandKind::LoadBlocks];
    let dagger = Arc::new(dagger);

    let mut sim = CommandSim::new(world, config);
    let squad = (0..args.units)
        .map(|_| {
            let tile = TilePos::new(rng.gen_range(1..wall_x.max(2)), rng.gen_range(0..args.height.max(1)));
            let unit = SandboxUnit::new(TeamId(1), tile.center(tile_size), Arc::clone(&dagger))
                .with_speed(rng.gen_range(0.6..1.2))
                .with_payload(16.0);
            sim.spawn(unit)
        })
        .collect();

    let enemies = (0..args.targets)
        .map(|_| {
            let tile = TilePos::new(
                rng.gen_range(wall_x + 2..args.width.max(wall_x + 3)),
                rng.gen_range(0..args.height.max(1)),
            );
            sim.world.spawn_building(SandboxBuilding::new(TeamId(2), tile))
        })
        .collect();

    (sim, squad, enemies)
}
