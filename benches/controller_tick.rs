use criterion::*;
use std::hint::black_box;
use std::sync::Arc;

use unit_command::command::CommandKind;
use unit_command::core::types::{TeamId, TilePos};
use unit_command::core::ControllerConfig;
use unit_command::simulation::CommandSim;
use unit_command::world::sandbox::{SandboxUnit, SandboxWorld};
use unit_command::world::UnitType;

fn make_sim(units: i32, parallel_threshold: usize) -> CommandSim {
    let config = ControllerConfig {
        parallel_threshold,
        ..ControllerConfig::default()
    };
    let mut sim = CommandSim::new(SandboxWorld::new(128, 128, 8.0), config);

    let mut dagger = UnitType::ground("dagger", 60.0);
    dagger.commands = vec![CommandKind::Move];
    let dagger = Arc::new(dagger);

    for i in 0..units {
        let start = TilePos::new(i % 32, i / 32);
        let id = sim.spawn(SandboxUnit::new(TeamId(1), start.center(8.0), Arc::clone(&dagger)));
        sim.command_position(id, TilePos::new(120 - i % 32, 120 - i / 32).center(8.0));
    }
    sim
}

fn tick_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("controller_tick");

    for units in [64, 512] {
        group.bench_function(format!("serial_{units}"), |b| {
            b.iter_batched(
                || make_sim(units, usize::MAX),
                |mut sim| black_box(sim.step()),
                BatchSize::LargeInput,
            )
        });

        group.bench_function(format!("parallel_{units}"), |b| {
            b.iter_batched(
                || make_sim(units, 0),
                |mut sim| black_box(sim.step()),
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, tick_benchmark);
criterion_main!(benches);
