//! Grazing system - per-tick behavior for herd animals.
//!
//! One pass per species, statically dispatched over [`Species`], so the
//! sheep and cow passes compile to separate loops with no enum matching
//! in the hot path. The tick order per animal is fixed: growth, need
//! decay, death check, resource contact, consumption, trough
//! reservation, movement selection, separation, facing, collision.

use hecs::{Entity, World};
use rand::Rng;

use crate::components::{
    AnimalState, FacingState, LifeState, Needs, Position, Species, Vec2, Wander, WolfHits,
};
use crate::environment::trough::TROUGH_USE_RADIUS;
use crate::environment::{Environment, Trough};
use crate::events::AnimalEvent;
use crate::player::Player;

/// Layer name for drinkable water tiles
pub const WATER_LAYER: &str = "water";
/// Layer name for edible grass tiles
pub const GRASS_LAYER: &str = "grass";

/// How far an animal can notice water or food
pub const PERCEPTION_RADIUS: f32 = 400.0;
/// Thirst reduction per second while drinking
pub const WATER_DRINK_RATE: f32 = 30.0;
/// Hunger reduction per second while grazing
pub const GRASS_EAT_RATE: f32 = 25.0;
/// Thirst reduction per second at a trough
pub const TROUGH_DRINK_RATE: f32 = 40.0;
/// Hunger reduction per second at a trough
pub const TROUGH_EAT_RATE: f32 = 35.0;
/// Units requested from a grassland patch per second of grazing
pub const PATCH_GRAZE_RATE: f32 = 8.0;
/// Seconds a grazed tile keeps feeding before it hides
pub const GRASS_TILE_CONSUME_SECS: f32 = 60.0;

/// Need level that sends an animal looking for the resource directly
pub const SEEK_THRESHOLD: f32 = 70.0;
/// Need level that makes a usable trough attractive
pub const TROUGH_SEEK_THRESHOLD: f32 = 50.0;
/// Animals inside this range follow the player
pub const FOLLOW_RADIUS: f32 = 150.0;
/// Inside this range the animal stops closing and mills around
pub const CROWD_RADIUS: f32 = 50.0;
/// Siblings inside this range push each other apart
pub const SEPARATION_RADIUS: f32 = 20.0;
const SEPARATION_PUSH: f32 = 2.0;

const BASE_SPEED: f32 = 40.0;
const RESOURCE_SEEK_SPEED: f32 = 60.0;
const TROUGH_SEEK_SPEED: f32 = 70.0;
const TROUGH_CREEP_SPEED: f32 = 20.0;
const IDLE_FOLLOW_SPEED: f32 = 20.0;
/// Follow speed as a fraction of the player's own speed
const FOLLOW_SPEED_FACTOR: f32 = 0.9;

const WANDER_FACTOR: f32 = 0.2;
const CROWD_WANDER_FACTOR: f32 = 0.5;
const WANDER_REROLL_CHANCE: f32 = 0.01;
const CROWD_REROLL_CHANCE: f32 = 0.02;
const BLOCKED_REROLL_CHANCE: f32 = 0.1;

/// Spawn a herd animal with the full grazing component bundle
pub fn spawn_animal<S: Species + Default>(world: &mut World, x: f32, y: f32) -> Entity {
    world.spawn((
        S::default(),
        Position::new(x, y),
        Needs::default(),
        AnimalState::default(),
        FacingState::default(),
        Wander::default(),
        LifeState::Alive,
        WolfHits::default(),
    ))
}

/// Nearest visible water source within perception range: the oasis or a
/// water tile, whichever is closer
fn nearest_water(pos: Vec2, env: &Environment) -> Option<Vec2> {
    let mut best: Option<(f32, Vec2)> = None;

    let oasis_dist = pos.distance(&env.oasis.center());
    if oasis_dist < PERCEPTION_RADIUS {
        best = Some((oasis_dist, env.oasis.center()));
    }
    if let Some(tile) = env.tile_map.nearest_tile_in_layer(pos, WATER_LAYER) {
        let dist = pos.distance(&tile);
        if dist < PERCEPTION_RADIUS && best.map_or(true, |(d, _)| dist < d) {
            best = Some((dist, tile));
        }
    }
    best.map(|(_, target)| target)
}

/// Nearest visible food source within perception range: a grass tile or
/// a live grassland patch
fn nearest_food(pos: Vec2, env: &Environment) -> Option<Vec2> {
    let mut best: Option<(f32, Vec2)> = None;

    if let Some(tile) = env.tile_map.nearest_tile_in_layer(pos, GRASS_LAYER) {
        let dist = pos.distance(&tile);
        if dist < PERCEPTION_RADIUS {
            best = Some((dist, tile));
        }
    }
    for patch in &env.grasslands {
        if patch.is_expired {
            continue;
        }
        let center = Vec2::new(patch.x, patch.y);
        let dist = pos.distance(&center);
        if dist < PERCEPTION_RADIUS && best.map_or(true, |(d, _)| dist < d) {
            best = Some((dist, center));
        }
    }
    best.map(|(_, target)| target)
}

/// Run one tick of grazing behavior for every animal of species `S`.
///
/// Returns the animals that died of need exhaustion this tick; the
/// caller despawns them. Any trough reservation a dead animal held has
/// already been released.
pub fn grazing_system<S: Species + Default>(
    world: &mut World,
    env: &mut Environment,
    trough: &mut Trough,
    player: &Player,
    dt: f32,
    rng: &mut impl Rng,
) -> Vec<(Entity, AnimalEvent)> {
    // Sibling positions snapshotted up front so separation sees a
    // consistent view while positions are being rewritten
    let siblings: Vec<(Entity, Vec2)> = world
        .query::<(&S, &Position, &LifeState)>()
        .iter()
        .filter(|(_, (_, _, life))| !life.is_dying())
        .map(|(entity, (_, pos, _))| (entity, pos.0))
        .collect();

    let mut deaths = Vec::new();

    for (entity, (species, needs, pos, state, facing, wander, life)) in world.query_mut::<(
        &mut S,
        &mut Needs,
        &mut Position,
        &mut AnimalState,
        &mut FacingState,
        &mut Wander,
        &LifeState,
    )>() {
        // Carcasses do not behave; predation owns them now
        if life.is_dying() {
            continue;
        }

        species.grow(dt);
        needs.decay(dt);
        state.is_eating = false;

        if let Some(cause) = needs.death_cause() {
            if state.uses_trough {
                trough.release_slot();
                state.uses_trough = false;
            }
            deaths.push((entity, AnimalEvent::Died { cause }));
            continue;
        }

        let p = pos.0;

        // Resource contact
        let in_oasis = env.oasis.contains(p);
        let in_water_tile = env.tile_map.is_position_in_layer(p, WATER_LAYER);
        let in_grass_tile = env.tile_map.is_position_in_layer(p, GRASS_LAYER);

        let mut patch_index = None;
        for (i, patch) in env.grasslands.iter().enumerate() {
            if patch.check_bounds(p.x, p.y) {
                patch_index = Some(i);
                break;
            }
        }

        let trough_pos = Vec2::new(trough.x, trough.y);
        let trough_dist = p.distance(&trough_pos);
        let at_trough = trough.is_usable() && trough_dist < TROUGH_USE_RADIUS;

        // Consumption
        if in_oasis || in_water_tile {
            needs.drink(WATER_DRINK_RATE * dt);
            state.is_eating = true;
        }
        if in_grass_tile {
            needs.eat(GRASS_EAT_RATE * dt);
            state.is_eating = true;
            if let Some(tile) = env.tile_map.tile_at(p, GRASS_LAYER) {
                env.tile_map
                    .start_consuming(GRASS_LAYER, tile.x, tile.y, GRASS_TILE_CONSUME_SECS);
            }
        }
        if let Some(i) = patch_index {
            let granted = env.grasslands[i].consume(PATCH_GRAZE_RATE * dt);
            if granted > 0.0 {
                needs.eat(GRASS_EAT_RATE * dt);
                state.is_eating = true;
            }
        }
        let in_patch = patch_index.is_some();

        if at_trough && state.uses_trough {
            needs.drink(TROUGH_DRINK_RATE * dt);
            needs.eat(TROUGH_EAT_RATE * dt);
            state.is_eating = true;
        }

        // Reservation protocol: claim on arrival, release when done or
        // when wandering out of range. Expiry clears slots on the
        // trough side; the local flag follows here.
        if at_trough {
            if !state.uses_trough {
                state.uses_trough = trough.reserve_slot();
            } else if needs.satisfied() {
                trough.release_slot();
                state.uses_trough = false;
            }
        } else if state.uses_trough {
            if trough.is_usable() {
                trough.release_slot();
            }
            state.uses_trough = false;
        }

        // Movement selection, first matching rule wins
        let mut move_vec = Vec2::ZERO;
        let mut speed = BASE_SPEED;
        let player_dist = p.distance(&player.pos());

        let needs_trough = needs.thirst > TROUGH_SEEK_THRESHOLD || needs.hunger > TROUGH_SEEK_THRESHOLD;
        let trough_has_room = trough.current_users < trough.max_users || state.uses_trough;

        if state.harvested {
            speed = 0.0;
        } else if state.uses_trough && at_trough {
            // Nudge toward the center so crowds pack in tightly
            move_vec = Vec2::from_angle(p.angle_to(&trough_pos)) * WANDER_FACTOR;
            speed = TROUGH_CREEP_SPEED;
        } else if trough.is_usable() && needs_trough && !at_trough && trough_has_room {
            move_vec = Vec2::from_angle(p.angle_to(&trough_pos));
            speed = TROUGH_SEEK_SPEED;
        } else if needs.thirst > SEEK_THRESHOLD && !(in_oasis || in_water_tile) {
            if let Some(target) = nearest_water(p, env) {
                move_vec = Vec2::from_angle(p.angle_to(&target));
                speed = RESOURCE_SEEK_SPEED;
            }
        } else if needs.hunger > SEEK_THRESHOLD && !(in_grass_tile || in_patch) {
            if let Some(target) = nearest_food(p, env) {
                move_vec = Vec2::from_angle(p.angle_to(&target));
                speed = RESOURCE_SEEK_SPEED;
            }
        } else if player_dist < FOLLOW_RADIUS {
            if player_dist > CROWD_RADIUS {
                move_vec = Vec2::from_angle(p.angle_to(&player.pos()));
                speed = if player.is_moving {
                    player.speed * FOLLOW_SPEED_FACTOR
                } else {
                    IDLE_FOLLOW_SPEED
                };
            } else {
                if rng.gen::<f32>() < CROWD_REROLL_CHANCE {
                    wander.angle = rng.gen::<f32>() * std::f32::consts::TAU;
                }
                move_vec = Vec2::from_angle(wander.angle) * CROWD_WANDER_FACTOR;
            }
        } else {
            if rng.gen::<f32>() < WANDER_REROLL_CHANCE {
                wander.angle = rng.gen::<f32>() * std::f32::consts::TAU;
            }
            move_vec = Vec2::from_angle(wander.angle) * WANDER_FACTOR;
        }

        // Separation: push away from crowding siblings
        for (other, other_pos) in &siblings {
            if *other == entity {
                continue;
            }
            if p.distance(other_pos) < SEPARATION_RADIUS {
                move_vec += Vec2::from_angle(other_pos.angle_to(&p)) * SEPARATION_PUSH;
            }
        }

        facing.update(move_vec.x, move_vec.y, dt);

        let next = p + move_vec * (speed * dt);
        if env.tile_map.is_collision(next) {
            // Walked into terrain; sometimes pick a fresh heading
            if rng.gen::<f32>() < BLOCKED_REROLL_CHANCE {
                wander.angle = rng.gen::<f32>() * std::f32::consts::TAU;
            }
        } else {
            pos.0 = next;
        }

        state.is_moving = move_vec.x.abs() > 0.1 || move_vec.y.abs() > 0.1;
    }

    deaths
}
