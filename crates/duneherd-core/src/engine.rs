//! Simulation engine - owns the world and runs the tick loop.
//!
//! `Simulation::update` advances everything in a fixed order: day
//! cycle, trough, environment, fires, harvest, herd (sheep then cows),
//! wolves, then the wolf respawn queue. Systems report what happened
//! through [`SimEvent`]s so the presentation layer never has to diff
//! world state.

use std::io::{Read, Write};

use hecs::{Entity, World};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::components::{
    AnimalState, Cow, LifeState, Position, Sheep, SpeciesKind, Vec2, Wolf, WolfHits,
    CARCASS_TERMINAL_STAGE,
};
use crate::environment::trough::TROUGH_LIFETIME;
use crate::environment::{Environment, Fire, Trough};
use crate::events::{AnimalEvent, HarvestProduct, SimEvent};
use crate::persistence::{self, SaveError};
use crate::player::Player;
use crate::systems::{
    begin_harvest, cancel_harvest, grazing_system, harvest_system, predation_system, spawn_animal,
    spawn_wolf, HarvestKind, HarvestSession, HarvestTick, PredationAction,
};

/// Day progress gained per simulated second
const DAY_RATE: f32 = 0.02;
/// Day progress at which the day rolls over
const DAY_LENGTH: f32 = 10.0;
/// Seconds between a wolf's death and its replacement spawning
pub const WOLF_RESPAWN_DELAY: f32 = 5.0;
/// Layer wolves respawn on
const WOLF_SPAWN_LAYER: &str = "sand";
/// Fallback respawn spread around the player when the map has no
/// usable spawn tile
const WOLF_SPAWN_SPREAD: f32 = 2000.0;
/// New animals appear this close to the player
const ANIMAL_SPAWN_JITTER: f32 = 100.0;
/// Flee duration after surviving a player strike
const STRIKE_FLEE_SECS: f32 = 2.0;

/// Harvested goods the player has collected
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Inventory {
    pub wool: u32,
    pub milk: u32,
}

/// The simulation core: ECS world plus the singleton collaborators
pub struct Simulation {
    pub world: World,
    pub env: Environment,
    pub player: Player,
    pub trough: Trough,
    pub fires: Vec<Fire>,
    pub inventory: Inventory,
    pub(crate) harvest: Option<HarvestSession>,
    pub(crate) wolf_respawn_queue: Vec<f32>,
    pub(crate) sim_time: f64,
    pub(crate) day: u32,
    pub(crate) day_progress: f32,
    rng: StdRng,
}

impl Simulation {
    pub fn new(env: Environment) -> Self {
        Self::with_rng(env, StdRng::from_entropy())
    }

    /// Deterministic construction for tests and replays
    pub fn with_seed(env: Environment, seed: u64) -> Self {
        Self::with_rng(env, StdRng::seed_from_u64(seed))
    }

    fn with_rng(env: Environment, mut rng: StdRng) -> Self {
        let trough = Trough::new(1.0, &mut rng);
        Self {
            world: World::new(),
            env,
            player: Player::default(),
            trough,
            fires: Vec::new(),
            inventory: Inventory::default(),
            harvest: None,
            wolf_respawn_queue: Vec::new(),
            sim_time: 0.0,
            day: 1,
            day_progress: 0.0,
            rng,
        }
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn harvest_session(&self) -> Option<&HarvestSession> {
        self.harvest.as_ref()
    }

    /// Advance the simulation by `dt` seconds
    pub fn update(&mut self, dt: f32) -> Vec<SimEvent> {
        let mut events = Vec::new();
        self.sim_time += f64::from(dt);

        self.day_progress += dt * DAY_RATE;
        if self.day_progress >= DAY_LENGTH {
            self.day_progress = 0.0;
            self.day += 1;
            log::info!("day {} begins", self.day);
            events.push(SimEvent::NewDay { day: self.day });
        }

        self.trough.update(dt);
        if self.trough.is_expired {
            // Replacements land farther out as the days pass
            let range = 1.0 + self.day.saturating_sub(1) as f32;
            self.trough = Trough::new(range, &mut self.rng);
            events.push(SimEvent::TroughExpired);
        }

        let world_tick =
            self.env
                .update(dt, self.player.x, self.player.y, self.day, &mut self.rng);
        if world_tick.respawned {
            events.push(SimEvent::GrassRespawned);
        }

        for fire in &mut self.fires {
            fire.update(dt);
        }
        let fires_before = self.fires.len();
        self.fires.retain(|fire| !fire.is_burned_out());
        for _ in self.fires.len()..fires_before {
            events.push(SimEvent::FireBurnedOut);
        }

        match harvest_system(&mut self.world, &self.player, &mut self.harvest, dt) {
            Some(HarvestTick::Complete(product)) => {
                match product {
                    HarvestProduct::Wool => self.inventory.wool += 1,
                    HarvestProduct::Milk => self.inventory.milk += 1,
                }
                events.push(SimEvent::HarvestComplete { product });
            }
            Some(HarvestTick::Cancelled) => events.push(SimEvent::HarvestCancelled),
            None => {}
        }

        let mut deaths = grazing_system::<Sheep>(
            &mut self.world,
            &mut self.env,
            &mut self.trough,
            &self.player,
            dt,
            &mut self.rng,
        );
        deaths.extend(grazing_system::<Cow>(
            &mut self.world,
            &mut self.env,
            &mut self.trough,
            &self.player,
            dt,
            &mut self.rng,
        ));
        for (entity, event) in deaths {
            let AnimalEvent::Died { cause } = event;
            let species = self.species_of(entity);
            let _ = self.world.despawn(entity);
            log::debug!("{species:?} died of {cause}");
            events.push(SimEvent::AnimalDied { species, cause });
        }

        let actions = predation_system(
            &mut self.world,
            &self.env,
            &self.fires,
            &self.player,
            dt,
            &mut self.rng,
        );
        self.apply_predation(actions, &mut events);

        for timer in &mut self.wolf_respawn_queue {
            *timer -= dt;
        }
        let mut due = 0;
        self.wolf_respawn_queue.retain(|timer| {
            if *timer <= 0.0 {
                due += 1;
                false
            } else {
                true
            }
        });
        for _ in 0..due {
            self.spawn_wolf();
            log::debug!("wolf respawned");
            events.push(SimEvent::WolfRespawned);
        }

        events
    }

    fn species_of(&self, entity: Entity) -> SpeciesKind {
        if self.world.satisfies::<&Sheep>(entity).unwrap_or(false) {
            SpeciesKind::Sheep
        } else {
            SpeciesKind::Cow
        }
    }

    /// Apply bite and gnaw actions. Kills release the victim's trough
    /// slot; a downed sheep becomes a carcass while a cow is removed
    /// outright.
    fn apply_predation(&mut self, actions: Vec<PredationAction>, events: &mut Vec<SimEvent>) {
        for action in actions {
            match action {
                PredationAction::Bite { target } => {
                    // A second wolf may have downed the target already
                    // this tick
                    let alive = self
                        .world
                        .get::<&LifeState>(target)
                        .map(|life| *life == LifeState::Alive)
                        .unwrap_or(false);
                    if !alive {
                        continue;
                    }
                    let lethal = match self.world.get::<&mut WolfHits>(target) {
                        Ok(mut hits) => {
                            hits.0 += 1;
                            hits.is_lethal()
                        }
                        Err(_) => continue,
                    };
                    let species = self.species_of(target);
                    if lethal {
                        if let Ok(mut state) = self.world.get::<&mut AnimalState>(target) {
                            if state.uses_trough {
                                self.trough.release_slot();
                                state.uses_trough = false;
                            }
                        }
                        if species == SpeciesKind::Sheep {
                            if let Ok(mut life) = self.world.get::<&mut LifeState>(target) {
                                *life = LifeState::Dying { stage: 0.0 };
                            }
                        } else {
                            let _ = self.world.despawn(target);
                        }
                        log::debug!("wolf brought down a {species:?}");
                        events.push(SimEvent::WolfKilledAnimal { species });
                    } else {
                        events.push(SimEvent::WolfHitAnimal { species });
                    }
                }
                PredationAction::Gnaw { target, amount } => {
                    let finished = match self.world.get::<&mut LifeState>(target) {
                        Ok(mut life) => {
                            if let LifeState::Dying { stage } = &mut *life {
                                *stage += amount;
                                *stage >= CARCASS_TERMINAL_STAGE
                            } else {
                                false
                            }
                        }
                        Err(_) => false,
                    };
                    if finished {
                        let _ = self.world.despawn(target);
                        events.push(SimEvent::CarcassConsumed);
                    }
                }
            }
        }
    }

    /// Spawn a sheep near the player
    pub fn spawn_sheep(&mut self) -> Entity {
        let (x, y) = self.animal_spawn_point();
        spawn_animal::<Sheep>(&mut self.world, x, y)
    }

    /// Spawn a cow near the player
    pub fn spawn_cow(&mut self) -> Entity {
        let (x, y) = self.animal_spawn_point();
        spawn_animal::<Cow>(&mut self.world, x, y)
    }

    fn animal_spawn_point(&mut self) -> (f32, f32) {
        (
            self.player.x + (self.rng.gen::<f32>() - 0.5) * ANIMAL_SPAWN_JITTER,
            self.player.y + (self.rng.gen::<f32>() - 0.5) * ANIMAL_SPAWN_JITTER,
        )
    }

    /// Spawn a wolf on the spawn layer, or at a random offset around
    /// the player when the map has no usable tile
    pub fn spawn_wolf(&mut self) -> Entity {
        let collision = self.env.tile_map.collision_layer().to_string();
        let pos = match self.env.tile_map.random_safe_position_in_layer(
            WOLF_SPAWN_LAYER,
            &collision,
            &mut self.rng,
        ) {
            Some(pos) => pos,
            None => Vec2::new(
                self.player.x + (self.rng.gen::<f32>() - 0.5) * WOLF_SPAWN_SPREAD,
                self.player.y + (self.rng.gen::<f32>() - 0.5) * WOLF_SPAWN_SPREAD,
            ),
        };
        spawn_wolf(&mut self.world, pos.x, pos.y)
    }

    /// Activate the trough. Returns false when it is already active.
    pub fn purchase_trough(&mut self) -> bool {
        if self.trough.is_transformed {
            return false;
        }
        self.trough.is_transformed = true;
        self.trough.timer = TROUGH_LIFETIME;
        true
    }

    /// Light a deterrent fire at a world position
    pub fn light_fire(&mut self, x: f32, y: f32) {
        self.fires.push(Fire::new(x, y));
    }

    /// Strike a wolf within the player's action range. A surviving wolf
    /// flees; a slain one is removed and queued for respawn.
    pub fn strike_wolf(&mut self, target: Entity) -> Option<SimEvent> {
        let wolf_pos = match self.world.get::<&Position>(target) {
            Ok(pos) => pos.0,
            Err(_) => return None,
        };
        if wolf_pos.distance(&self.player.pos()) > self.player.action_range {
            return None;
        }
        let slain = match self.world.get::<&mut Wolf>(target) {
            Ok(mut wolf) => {
                wolf.health -= 1;
                if wolf.health > 0 {
                    wolf.flee(self.player.pos(), STRIKE_FLEE_SECS);
                    false
                } else {
                    true
                }
            }
            Err(_) => return None,
        };
        if slain {
            let _ = self.world.despawn(target);
            self.wolf_respawn_queue.push(WOLF_RESPAWN_DELAY);
            log::debug!("wolf slain");
            Some(SimEvent::WolfSlain)
        } else {
            None
        }
    }

    /// Begin shearing a fully-grown sheep
    pub fn start_shearing(&mut self, target: Entity) -> bool {
        begin_harvest::<Sheep>(&mut self.world, &mut self.harvest, target, HarvestKind::Shear)
    }

    /// Begin milking a fully-grown cow
    pub fn start_milking(&mut self, target: Entity) -> bool {
        begin_harvest::<Cow>(&mut self.world, &mut self.harvest, target, HarvestKind::Milk)
    }

    /// Cancel any in-flight harvest, unfreezing its target
    pub fn cancel_harvest(&mut self) -> bool {
        cancel_harvest(&mut self.world, &mut self.harvest)
    }

    pub fn sheep_count(&self) -> usize {
        self.world.query::<&Sheep>().iter().count()
    }

    pub fn cow_count(&self) -> usize {
        self.world.query::<&Cow>().iter().count()
    }

    pub fn wolf_count(&self) -> usize {
        self.world.query::<&Wolf>().iter().count()
    }

    /// Write a versioned snapshot of the simulation
    pub fn save_to<W: Write>(&self, writer: W) -> Result<(), SaveError> {
        persistence::save_simulation(writer, self)
    }

    /// Restore a snapshot, replacing all dynamic state. The tile layer
    /// geometry is map data and is kept as-is.
    pub fn load_from<R: Read>(&mut self, reader: R) -> Result<(), SaveError> {
        persistence::load_simulation(reader, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Facing, Needs, GROWTH_MAX};
    use crate::environment::{Oasis, TileMap};
    use crate::events::DeathCause;

    fn empty_env() -> Environment {
        let oasis = Oasis {
            x: 10_000.0,
            y: 10_000.0,
            radius: 100.0,
        };
        Environment::new(oasis, TileMap::new(64.0, 0, 0, "rock"))
    }

    fn sim() -> Simulation {
        let mut sim = Simulation::with_seed(empty_env(), 42);
        // Keep the default trough out of the way
        sim.trough = Trough::at(10_000.0, -10_000.0);
        sim
    }

    #[test]
    fn test_day_rollover() {
        let mut sim = sim();
        sim.day_progress = 9.99;
        let events = sim.update(1.0);
        assert!(events.contains(&SimEvent::NewDay { day: 2 }));
        assert_eq!(sim.day(), 2);
    }

    #[test]
    fn test_expired_trough_is_replaced() {
        let mut sim = sim();
        sim.day = 3;
        sim.trough.is_transformed = true;
        sim.trough.timer = 0.1;

        let events = sim.update(1.0);

        assert!(events.contains(&SimEvent::TroughExpired));
        assert!(!sim.trough.is_transformed);
        assert!(!sim.trough.is_expired);
        // Day 3: replacement range multiplier is 1 + 2
        assert_eq!(sim.trough.range_multiplier, 3.0);
    }

    #[test]
    fn test_need_death_reports_species_and_cause() {
        let mut sim = sim();
        let cow = spawn_animal::<Cow>(&mut sim.world, 500.0, 500.0);
        sim.world.get::<&mut Needs>(cow).unwrap().thirst = 110.0;

        let events = sim.update(1.0);

        assert!(events.contains(&SimEvent::AnimalDied {
            species: SpeciesKind::Cow,
            cause: DeathCause::Thirst
        }));
        assert!(!sim.world.contains(cow));
    }

    #[test]
    fn test_lethal_bite_downs_sheep_but_removes_cow() {
        let mut sim = sim();
        let sheep = spawn_animal::<Sheep>(&mut sim.world, 0.0, 0.0);
        sim.world.get::<&mut WolfHits>(sheep).unwrap().0 = 4;
        let cow = spawn_animal::<Cow>(&mut sim.world, 50.0, 0.0);
        sim.world.get::<&mut WolfHits>(cow).unwrap().0 = 4;

        let mut events = Vec::new();
        sim.apply_predation(
            vec![
                PredationAction::Bite { target: sheep },
                PredationAction::Bite { target: cow },
            ],
            &mut events,
        );

        assert_eq!(
            events,
            vec![
                SimEvent::WolfKilledAnimal {
                    species: SpeciesKind::Sheep
                },
                SimEvent::WolfKilledAnimal {
                    species: SpeciesKind::Cow
                },
            ]
        );
        assert!(sim.world.get::<&LifeState>(sheep).unwrap().is_carcass());
        assert!(!sim.world.contains(cow));
    }

    #[test]
    fn test_bite_on_downed_target_is_dropped() {
        let mut sim = sim();
        let sheep = spawn_animal::<Sheep>(&mut sim.world, 0.0, 0.0);
        *sim.world.get::<&mut LifeState>(sheep).unwrap() = LifeState::Dying { stage: 0.0 };

        let mut events = Vec::new();
        sim.apply_predation(vec![PredationAction::Bite { target: sheep }], &mut events);

        assert!(events.is_empty());
        assert_eq!(sim.world.get::<&WolfHits>(sheep).unwrap().0, 0);
    }

    #[test]
    fn test_gnaw_to_terminal_removes_carcass() {
        let mut sim = sim();
        let sheep = spawn_animal::<Sheep>(&mut sim.world, 0.0, 0.0);
        *sim.world.get::<&mut LifeState>(sheep).unwrap() = LifeState::Dying {
            stage: CARCASS_TERMINAL_STAGE - 0.05,
        };

        let mut events = Vec::new();
        sim.apply_predation(
            vec![PredationAction::Gnaw {
                target: sheep,
                amount: 0.1,
            }],
            &mut events,
        );

        assert_eq!(events, vec![SimEvent::CarcassConsumed]);
        assert!(!sim.world.contains(sheep));
    }

    #[test]
    fn test_strike_wolf_twice_slays_and_queues_respawn() {
        let mut sim = sim();
        let wolf = spawn_wolf(&mut sim.world, 50.0, 0.0);

        assert_eq!(sim.strike_wolf(wolf), None);
        {
            let w = sim.world.get::<&Wolf>(wolf).unwrap();
            assert_eq!(w.health, 1);
            assert_eq!(w.state, crate::components::WolfState::Flee);
        }

        assert_eq!(sim.strike_wolf(wolf), Some(SimEvent::WolfSlain));
        assert_eq!(sim.wolf_count(), 0);
        assert_eq!(sim.wolf_respawn_queue.len(), 1);

        // The replacement arrives after the delay
        let mut respawned = false;
        for _ in 0..7 {
            if sim.update(1.0).contains(&SimEvent::WolfRespawned) {
                respawned = true;
            }
        }
        assert!(respawned);
        assert_eq!(sim.wolf_count(), 1);
    }

    #[test]
    fn test_strike_out_of_range_is_ignored() {
        let mut sim = sim();
        let wolf = spawn_wolf(&mut sim.world, 500.0, 0.0);
        assert_eq!(sim.strike_wolf(wolf), None);
        assert_eq!(sim.world.get::<&Wolf>(wolf).unwrap().health, 2);
    }

    #[test]
    fn test_fire_burns_out_with_event() {
        let mut sim = sim();
        sim.light_fire(0.0, 0.0);

        let mut burned_out = false;
        for _ in 0..125 {
            if sim.update(1.0).contains(&SimEvent::FireBurnedOut) {
                burned_out = true;
            }
        }
        assert!(burned_out);
        assert!(sim.fires.is_empty());
    }

    #[test]
    fn test_shearing_end_to_end() {
        let mut sim = sim();
        let sheep = spawn_animal::<Sheep>(&mut sim.world, 5.0, 0.0);
        sim.world.get::<&mut Sheep>(sheep).unwrap().wool_growth = GROWTH_MAX;

        assert!(sim.start_shearing(sheep));
        // No double sessions
        assert!(!sim.start_shearing(sheep));

        let mut completed = false;
        for _ in 0..6 {
            let events = sim.update(1.0);
            if events.contains(&SimEvent::HarvestComplete {
                product: HarvestProduct::Wool,
            }) {
                completed = true;
            }
        }
        assert!(completed);
        assert_eq!(sim.inventory.wool, 1);
        assert!(sim.harvest_session().is_none());
    }

    #[test]
    fn test_purchase_trough_once() {
        let mut sim = sim();
        assert!(sim.purchase_trough());
        assert!(!sim.purchase_trough());
        assert!(sim.trough.is_usable());
    }

    #[test]
    fn test_spawned_wolf_has_bundle() {
        let mut sim = sim();
        let wolf = sim.spawn_wolf();
        assert!(sim.world.satisfies::<&Wolf>(wolf).unwrap());
        assert!(sim.world.satisfies::<&Position>(wolf).unwrap());
        assert!(sim.world.satisfies::<&Facing>(wolf).unwrap());
    }
}
