//! Tick throughput at increasing herd sizes

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use duneherd_core::environment::{Environment, Oasis, TileMap};
use duneherd_core::prelude::*;
use duneherd_core::systems::{spawn_animal, spawn_wolf};

fn build_sim(sheep: usize, cows: usize, wolves: usize) -> Simulation {
    let mut map = TileMap::new(64.0, 100, 100, "rock");
    for i in 0..20 {
        map.add_tile("grass", i, 10);
        map.add_tile("water", i, 20);
        map.add_tile("sand", i, 30);
    }
    let env = Environment::new(Oasis::default(), map);
    let mut sim = Simulation::with_seed(env, 1);

    for i in 0..sheep {
        spawn_animal::<Sheep>(&mut sim.world, i as f32 * 25.0, 0.0);
    }
    for i in 0..cows {
        spawn_animal::<Cow>(&mut sim.world, i as f32 * 25.0, 200.0);
    }
    for i in 0..wolves {
        spawn_wolf(&mut sim.world, i as f32 * 50.0, 800.0);
    }
    sim
}

fn bench_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tick");
    for herd in [10usize, 50, 200] {
        group.bench_with_input(BenchmarkId::from_parameter(herd), &herd, |b, &herd| {
            let mut sim = build_sim(herd, herd / 2, 3);
            b.iter(|| sim.update(1.0 / 60.0));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_tick);
criterion_main!(benches);
