//! DuneHerd Headless Simulation Harness
//!
//! Validates the simulation core end to end - no rendering, no input,
//! just the engine ticking against scripted scenarios.
//!
//! Usage:
//!   cargo run -p duneherd-simtest
//!   cargo run -p duneherd-simtest -- --verbose

use duneherd_core::environment::{Environment, Grassland, Oasis, TileMap, Trough};
use duneherd_core::events::{DeathCause, HarvestProduct, SimEvent};
use duneherd_core::prelude::*;
use duneherd_core::systems::{spawn_animal, spawn_wolf};

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== DuneHerd Simulation Harness ===\n");

    let mut results = Vec::new();

    // 1. Needs and starvation
    results.extend(validate_starvation(verbose));

    // 2. Watering and grazing loop
    results.extend(validate_foraging(verbose));

    // 3. Trough contention
    results.extend(validate_trough(verbose));

    // 4. Predation state machine
    results.extend(validate_predation(verbose));

    // 5. Fire deterrence
    results.extend(validate_fire(verbose));

    // 6. Harvest channels
    results.extend(validate_harvest(verbose));

    // 7. Day cycle
    results.extend(validate_day_cycle(verbose));

    // 8. Save/load
    results.extend(validate_persistence(verbose));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── Scenario plumbing ───────────────────────────────────────────────────

/// Barren desert: no water, no grass, nothing in perception range
fn barren_sim(seed: u64) -> Simulation {
    let oasis = Oasis {
        x: 50_000.0,
        y: 50_000.0,
        radius: 100.0,
    };
    let env = Environment::new(oasis, TileMap::new(64.0, 0, 0, "rock"));
    let mut sim = Simulation::with_seed(env, seed);
    sim.trough = Trough::at(50_000.0, -50_000.0);
    // Keep the player out of follow range unless a scenario wants them
    sim.player.x = 50_000.0;
    sim.player.y = -50_000.0;
    sim
}

// ── 1. Needs & Starvation ───────────────────────────────────────────────

fn validate_starvation(_verbose: bool) -> Vec<TestResult> {
    println!("--- Needs & Starvation ---");
    let mut results = Vec::new();

    // Hunger 95 + 0.5/s: exactly 100 after ten one-second ticks (still
    // alive), strictly above after eleven.
    let mut sim = barren_sim(1);
    let sheep = spawn_animal::<Sheep>(&mut sim.world, 0.0, 0.0);
    sim.world.get::<&mut Needs>(sheep).unwrap().hunger = 95.0;

    let mut died_at = None;
    for tick in 1..=12 {
        let events = sim.update(1.0);
        if events
            .iter()
            .any(|e| matches!(e, SimEvent::AnimalDied { .. }))
        {
            died_at = Some(tick);
            break;
        }
    }
    results.push(TestResult {
        name: "starvation_death_on_tick_11".into(),
        passed: died_at == Some(11),
        detail: format!("died on tick {:?} (expected 11)", died_at),
    });

    // Thirst is blamed before hunger when both cross together
    let mut sim = barren_sim(2);
    let sheep = spawn_animal::<Sheep>(&mut sim.world, 0.0, 0.0);
    {
        let mut needs = sim.world.get::<&mut Needs>(sheep).unwrap();
        needs.thirst = 105.0;
        needs.hunger = 105.0;
    }
    let events = sim.update(1.0);
    let thirst_blamed = events.iter().any(|e| {
        matches!(
            e,
            SimEvent::AnimalDied {
                cause: DeathCause::Thirst,
                ..
            }
        )
    });
    results.push(TestResult {
        name: "starvation_thirst_wins_tie".into(),
        passed: thirst_blamed,
        detail: "both meters over threshold → thirst reported".into(),
    });

    // Needs saturate instead of growing without bound
    let mut needs = Needs {
        thirst: 119.9,
        hunger: 119.9,
    };
    needs.decay(100.0);
    results.push(TestResult {
        name: "starvation_needs_saturate".into(),
        passed: needs.thirst == 120.0 && needs.hunger == 120.0,
        detail: format!("meters clamp at {}/{}", needs.thirst, needs.hunger),
    });

    results
}

// ── 2. Watering & Grazing ───────────────────────────────────────────────

fn validate_foraging(_verbose: bool) -> Vec<TestResult> {
    println!("--- Watering & Grazing ---");
    let mut results = Vec::new();

    // Drinking in the oasis
    let mut sim = barren_sim(4);
    sim.env.oasis = Oasis {
        x: 0.0,
        y: 0.0,
        radius: 100.0,
    };
    let sheep = spawn_animal::<Sheep>(&mut sim.world, 0.0, 0.0);
    sim.world.get::<&mut Needs>(sheep).unwrap().thirst = 50.0;
    sim.update(1.0);
    let thirst = sim.world.get::<&Needs>(sheep).unwrap().thirst;
    results.push(TestResult {
        name: "foraging_oasis_drinking".into(),
        passed: (thirst - 20.5).abs() < 0.01,
        detail: format!("thirst 50 → {:.1} after one second", thirst),
    });

    // A thirsty animal walks toward visible water
    let mut sim = barren_sim(5);
    sim.env.oasis = Oasis {
        x: 300.0,
        y: 0.0,
        radius: 50.0,
    };
    let sheep = spawn_animal::<Sheep>(&mut sim.world, 0.0, 0.0);
    sim.world.get::<&mut Needs>(sheep).unwrap().thirst = 80.0;
    sim.update(1.0);
    let x = sim.world.get::<&Position>(sheep).unwrap().0.x;
    results.push(TestResult {
        name: "foraging_water_seek".into(),
        passed: x > 30.0,
        detail: format!("moved to x={:.1} toward water", x),
    });

    // Grazing a patch feeds the animal and depletes the patch
    let mut sim = barren_sim(6);
    sim.env.grasslands.push(Grassland::new(0.0, 0.0, 1.0));
    let sheep = spawn_animal::<Sheep>(&mut sim.world, 0.0, 0.0);
    sim.world.get::<&mut Needs>(sheep).unwrap().hunger = 60.0;
    sim.update(1.0);
    let hunger = sim.world.get::<&Needs>(sheep).unwrap().hunger;
    let amount = sim.env.grasslands[0].amount;
    results.push(TestResult {
        name: "foraging_patch_grazing".into(),
        passed: hunger < 60.0 && amount < 500.0,
        detail: format!("hunger → {:.1}, patch → {:.1}", hunger, amount),
    });

    // A depleted patch relocates into the day-1 distance band
    let mut sim = barren_sim(7);
    sim.player.x = 0.0;
    sim.player.y = 0.0;
    let mut patch = Grassland::new(100.0, 0.0, 1.0);
    patch.consume(10_000.0);
    sim.env.grasslands.push(patch);
    let mut respawned = false;
    for _ in 0..5 {
        if sim.update(1.0).contains(&SimEvent::GrassRespawned) {
            respawned = true;
        }
    }
    let patch = &sim.env.grasslands[0];
    let dist = (patch.x * patch.x + patch.y * patch.y).sqrt();
    results.push(TestResult {
        name: "foraging_patch_respawn_band".into(),
        passed: respawned && (500.0..=1000.0).contains(&dist),
        detail: format!("relocated {:.0} units out (want 500-1000)", dist),
    });

    results
}

// ── 3. Trough Contention ────────────────────────────────────────────────

fn validate_trough(_verbose: bool) -> Vec<TestResult> {
    println!("--- Trough Contention ---");
    let mut results = Vec::new();

    // Three thirsty animals, two slots: exactly two reservations
    let mut sim = barren_sim(8);
    sim.trough = Trough::at(0.0, 0.0);
    sim.trough.is_transformed = true;
    sim.trough.max_users = 2;
    let mut herd = Vec::new();
    for i in 0..3 {
        let e = spawn_animal::<Sheep>(&mut sim.world, i as f32 * 10.0, 0.0);
        sim.world.get::<&mut Needs>(e).unwrap().thirst = 60.0;
        herd.push(e);
    }
    sim.update(1.0);
    let holders = herd
        .iter()
        .filter(|e| sim.world.get::<&AnimalState>(**e).unwrap().uses_trough)
        .count();
    results.push(TestResult {
        name: "trough_two_of_three_reserve".into(),
        passed: holders == 2 && sim.trough.current_users == 2,
        detail: format!("{} holders, {} slots taken", holders, sim.trough.current_users),
    });

    // Feeding animals accelerate the drain: the second tick runs at
    // rate 1 + 2/15 with both slots held
    sim.update(1.0);
    let drained = 30.0 - sim.trough.timer;
    results.push(TestResult {
        name: "trough_drain_accelerates".into(),
        passed: drained > 2.05,
        detail: format!("{:.2}s drained in 2s with users feeding", drained),
    });

    // Expiry replaces the trough and clears reservations
    let mut sim = barren_sim(9);
    sim.trough = Trough::at(0.0, 0.0);
    sim.trough.is_transformed = true;
    sim.trough.timer = 0.5;
    let events = sim.update(1.0);
    results.push(TestResult {
        name: "trough_expiry_replaces".into(),
        passed: events.contains(&SimEvent::TroughExpired)
            && !sim.trough.is_transformed
            && sim.trough.current_users == 0,
        detail: "expired trough swapped for an inactive replacement".into(),
    });

    results
}

// ── 4. Predation ────────────────────────────────────────────────────────

fn validate_predation(verbose: bool) -> Vec<TestResult> {
    println!("--- Predation ---");
    let mut results = Vec::new();

    // A lone wolf hunts an isolated sheep: five bites, a carcass, and
    // eventually a picked-clean removal.
    let mut sim = barren_sim(10);
    let sheep = spawn_animal::<Sheep>(&mut sim.world, 300.0, 0.0);
    spawn_wolf(&mut sim.world, 0.0, 0.0);

    let mut hits = 0;
    let mut killed = false;
    let mut consumed = false;
    let mut ticks = 0;
    for _ in 0..8000 {
        ticks += 1;
        for event in sim.update(0.1) {
            match event {
                SimEvent::WolfHitAnimal { .. } => hits += 1,
                SimEvent::WolfKilledAnimal { .. } => killed = true,
                SimEvent::CarcassConsumed => consumed = true,
                _ => {}
            }
        }
        if consumed {
            break;
        }
    }
    if verbose {
        println!("  hunt resolved in {} ticks ({} non-lethal hits)", ticks, hits);
    }
    results.push(TestResult {
        name: "predation_five_bite_kill".into(),
        passed: hits == 4 && killed,
        detail: format!("{} hits then kill={}", hits, killed),
    });
    results.push(TestResult {
        name: "predation_carcass_consumed".into(),
        passed: consumed && !sim.world.contains(sheep),
        detail: "downed sheep gnawed to nothing and removed".into(),
    });

    // Guarded targets are only shadowed
    let mut sim = barren_sim(11);
    spawn_animal::<Sheep>(&mut sim.world, 300.0, 0.0);
    spawn_animal::<Sheep>(&mut sim.world, 350.0, 0.0);
    let wolf = spawn_wolf(&mut sim.world, -200.0, 0.0);
    let mut bit = false;
    for _ in 0..100 {
        let events = sim.update(0.1);
        if events
            .iter()
            .any(|e| matches!(e, SimEvent::WolfHitAnimal { .. }))
        {
            bit = true;
        }
    }
    let state = sim.world.get::<&Wolf>(wolf).unwrap().state;
    results.push(TestResult {
        name: "predation_guarded_targets_shadowed".into(),
        passed: !bit && state == WolfState::Follow,
        detail: format!("no bites, wolf state {:?}", state),
    });

    // Three wolves form a pack and ignore the isolation rule; a mere
    // pair does not and keeps shadowing.
    let mut sim = barren_sim(12);
    spawn_animal::<Sheep>(&mut sim.world, 300.0, 0.0);
    spawn_animal::<Sheep>(&mut sim.world, 350.0, 0.0);
    let a = spawn_wolf(&mut sim.world, -200.0, 0.0);
    let b = spawn_wolf(&mut sim.world, -200.0, 80.0);
    let c = spawn_wolf(&mut sim.world, -200.0, -80.0);
    sim.update(0.1);
    let sa = sim.world.get::<&Wolf>(a).unwrap().state;
    let sb = sim.world.get::<&Wolf>(b).unwrap().state;
    let sc = sim.world.get::<&Wolf>(c).unwrap().state;
    results.push(TestResult {
        name: "predation_pack_attacks_guarded".into(),
        passed: sa == WolfState::Attack && sb == WolfState::Attack && sc == WolfState::Attack,
        detail: format!("pack states {:?}/{:?}/{:?}", sa, sb, sc),
    });

    let mut sim = barren_sim(15);
    spawn_animal::<Sheep>(&mut sim.world, 300.0, 0.0);
    spawn_animal::<Sheep>(&mut sim.world, 350.0, 0.0);
    let a = spawn_wolf(&mut sim.world, -200.0, 0.0);
    let b = spawn_wolf(&mut sim.world, -200.0, 80.0);
    sim.update(0.1);
    let sa = sim.world.get::<&Wolf>(a).unwrap().state;
    let sb = sim.world.get::<&Wolf>(b).unwrap().state;
    results.push(TestResult {
        name: "predation_pair_keeps_shadowing".into(),
        passed: sa == WolfState::Follow && sb == WolfState::Follow,
        detail: format!("pair states {:?}/{:?}", sa, sb),
    });

    // A cow kill removes the cow outright - no carcass
    let mut sim = barren_sim(13);
    let cow = spawn_animal::<Cow>(&mut sim.world, 10.0, 0.0);
    sim.world.get::<&mut WolfHits>(cow).unwrap().0 = 4;
    spawn_wolf(&mut sim.world, 0.0, 0.0);
    let events = sim.update(0.1);
    let cow_killed = events.iter().any(|e| {
        matches!(
            e,
            SimEvent::WolfKilledAnimal {
                species: SpeciesKind::Cow
            }
        )
    });
    results.push(TestResult {
        name: "predation_cow_killed_outright".into(),
        passed: cow_killed && !sim.world.contains(cow),
        detail: "fifth bite removed the cow with no carcass".into(),
    });

    // Striking a wolf twice slays it and its replacement arrives
    let mut sim = barren_sim(14);
    sim.player.x = 0.0;
    sim.player.y = 0.0;
    let wolf = spawn_wolf(&mut sim.world, 50.0, 0.0);
    sim.strike_wolf(wolf);
    let survived = sim.world.get::<&Wolf>(wolf).map(|w| w.health).unwrap_or(0);
    let slain = sim.strike_wolf(wolf) == Some(SimEvent::WolfSlain);
    let mut respawned = false;
    for _ in 0..7 {
        if sim.update(1.0).contains(&SimEvent::WolfRespawned) {
            respawned = true;
        }
    }
    results.push(TestResult {
        name: "predation_strike_and_respawn".into(),
        passed: survived == 1 && slain && respawned && sim.wolf_count() == 1,
        detail: format!(
            "health after first strike {}, slain={}, respawned={}",
            survived, slain, respawned
        ),
    });

    results
}

// ── 5. Fire Deterrence ──────────────────────────────────────────────────

fn validate_fire(_verbose: bool) -> Vec<TestResult> {
    println!("--- Fire Deterrence ---");
    let mut results = Vec::new();

    // A fire dropped next to a hunting wolf forces a flee on the next tick
    let mut sim = barren_sim(15);
    spawn_animal::<Sheep>(&mut sim.world, 300.0, 0.0);
    let wolf = spawn_wolf(&mut sim.world, 0.0, 0.0);
    sim.update(0.1);
    let wolf_x = sim.world.get::<&Position>(wolf).unwrap().0.x;
    sim.light_fire(wolf_x + 50.0, 0.0);
    let before = sim.world.get::<&Position>(wolf).unwrap().0;
    sim.update(0.1);
    let state = sim.world.get::<&Wolf>(wolf).unwrap().state;
    let after = sim.world.get::<&Position>(wolf).unwrap().0;
    results.push(TestResult {
        name: "fire_forces_flee_next_tick".into(),
        passed: state == WolfState::Flee && after.x < before.x,
        detail: format!("state {:?}, x {:.1} → {:.1}", state, before.x, after.x),
    });

    // Fires burn out after their lifetime
    let mut sim = barren_sim(16);
    sim.light_fire(0.0, 0.0);
    let mut burned_out = false;
    for _ in 0..125 {
        if sim.update(1.0).contains(&SimEvent::FireBurnedOut) {
            burned_out = true;
        }
    }
    results.push(TestResult {
        name: "fire_burns_out".into(),
        passed: burned_out && sim.fires.is_empty(),
        detail: "fire removed after 120s with event".into(),
    });

    results
}

// ── 6. Harvest Channels ─────────────────────────────────────────────────

fn validate_harvest(_verbose: bool) -> Vec<TestResult> {
    println!("--- Harvest Channels ---");
    let mut results = Vec::new();

    // Shear a grown sheep standing next to the player
    let mut sim = barren_sim(17);
    sim.player.x = 0.0;
    sim.player.y = 0.0;
    let sheep = spawn_animal::<Sheep>(&mut sim.world, 5.0, 0.0);
    sim.world.get::<&mut Sheep>(sheep).unwrap().wool_growth = 100.0;
    let started = sim.start_shearing(sheep);
    let mut completed = false;
    for _ in 0..6 {
        if sim.update(1.0).contains(&SimEvent::HarvestComplete {
            product: HarvestProduct::Wool,
        }) {
            completed = true;
        }
    }
    results.push(TestResult {
        name: "harvest_shear_completes".into(),
        passed: started && completed && sim.inventory.wool == 1,
        detail: format!("wool inventory {}", sim.inventory.wool),
    });

    // An immature animal cannot be harvested
    let mut sim = barren_sim(18);
    let cow = spawn_animal::<Cow>(&mut sim.world, 5.0, 0.0);
    sim.world.get::<&mut Cow>(cow).unwrap().milk_production = 40.0;
    results.push(TestResult {
        name: "harvest_requires_full_growth".into(),
        passed: !sim.start_milking(cow),
        detail: "milking refused below full production".into(),
    });

    // Drifting away cancels and unfreezes the target
    let mut sim = barren_sim(19);
    sim.player.x = 0.0;
    sim.player.y = 0.0;
    let sheep = spawn_animal::<Sheep>(&mut sim.world, 5.0, 0.0);
    sim.world.get::<&mut Sheep>(sheep).unwrap().wool_growth = 100.0;
    sim.start_shearing(sheep);
    sim.update(1.0); // reach and start channeling
    sim.player.x = 100.0;
    let events = sim.update(1.0);
    let frozen = sim.world.get::<&AnimalState>(sheep).unwrap().harvested;
    results.push(TestResult {
        name: "harvest_drift_cancels_and_unfreezes".into(),
        passed: events.contains(&SimEvent::HarvestCancelled) && !frozen,
        detail: format!("cancelled, target frozen={}", frozen),
    });

    results
}

// ── 7. Day Cycle ────────────────────────────────────────────────────────

fn validate_day_cycle(_verbose: bool) -> Vec<TestResult> {
    println!("--- Day Cycle ---");
    let mut results = Vec::new();

    // 0.02 progress per second, rollover at 10: day 2 after 500s
    let mut sim = barren_sim(20);
    let mut new_day = None;
    for tick in 1..=520 {
        if sim
            .update(1.0)
            .iter()
            .any(|e| matches!(e, SimEvent::NewDay { .. }))
        {
            new_day = Some(tick);
            break;
        }
    }
    // Allow a tick of float drift in the progress accumulator
    results.push(TestResult {
        name: "day_rolls_over_at_500s".into(),
        passed: matches!(new_day, Some(t) if (499..=501).contains(&t)) && sim.day() == 2,
        detail: format!("day 2 began on tick {:?}", new_day),
    });

    results
}

// ── 8. Save/Load ────────────────────────────────────────────────────────

fn validate_persistence(_verbose: bool) -> Vec<TestResult> {
    println!("--- Save/Load ---");
    let mut results = Vec::new();

    let mut sim = barren_sim(21);
    spawn_animal::<Sheep>(&mut sim.world, 0.0, 0.0);
    spawn_animal::<Sheep>(&mut sim.world, 20.0, 0.0);
    spawn_animal::<Cow>(&mut sim.world, 40.0, 0.0);
    spawn_wolf(&mut sim.world, 600.0, 0.0);
    sim.light_fire(100.0, 100.0);
    for _ in 0..10 {
        sim.update(0.1);
    }

    let mut buffer = Vec::new();
    let saved = sim.save_to(&mut buffer).is_ok();

    let mut loaded = barren_sim(22);
    let restored = loaded.load_from(&buffer[..]).is_ok();

    let counts_match = loaded.sheep_count() == sim.sheep_count()
        && loaded.cow_count() == sim.cow_count()
        && loaded.wolf_count() == sim.wolf_count()
        && loaded.fires.len() == 1;
    results.push(TestResult {
        name: "persistence_roundtrip".into(),
        passed: saved && restored && counts_match,
        detail: format!(
            "{} sheep, {} cows, {} wolves restored ({} bytes)",
            loaded.sheep_count(),
            loaded.cow_count(),
            loaded.wolf_count(),
            buffer.len()
        ),
    });

    // The restored simulation keeps ticking
    let mut ticked = true;
    for _ in 0..10 {
        loaded.update(0.1);
        ticked = ticked && loaded.sim_time() > 0.0;
    }
    results.push(TestResult {
        name: "persistence_resumes".into(),
        passed: ticked,
        detail: "restored world advanced 10 ticks".into(),
    });

    results
}
