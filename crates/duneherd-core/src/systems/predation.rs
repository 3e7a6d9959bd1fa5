//! Predation system - the wolf behavior state machine.
//!
//! Wolves run in three phases: snapshot prey and wolf positions,
//! decide each wolf's next state and movement against the snapshot,
//! then write the results back. Bites and carcass consumption are
//! returned as actions instead of being applied in place, because a
//! bite can remove an entity (a cow kill) and the engine also has to
//! release any trough slot the victim held.

use hecs::{Entity, World};
use rand::Rng;

use crate::components::{
    Cow, Facing, LifeState, Position, Sheep, SpeciesKind, Vec2, Wolf, WolfHits, WolfState,
    CARCASS_TERMINAL_STAGE, WOLF_HIT_THRESHOLD,
};
use crate::environment::{Environment, Fire};
use crate::player::Player;

/// A target is isolated when no other living animal is this close to it
pub const ISOLATION_RADIUS: f32 = 400.0;
/// Wolves within this range of each other hunt as a pack
pub const PACK_RADIUS: f32 = 300.0;
/// Other wolves needed in range to form a pack; a pair is not a pack
pub const PACK_MIN_OTHERS: usize = 2;

/// Any live fire inside this radius repels an approaching wolf
pub const FIRE_REPEL_RADIUS: f32 = 400.0;
/// Inside this radius the fire overrides even an ongoing flee
pub const FIRE_FORCE_RADIUS: f32 = 250.0;
const FIRE_FLEE_SECS: f32 = 1.0;
/// A lone wolf runs from the player at this range; packs stand
pub const PLAYER_FLEE_RADIUS: f32 = 250.0;
const PLAYER_FLEE_SECS: f32 = 2.0;

/// Range at which a wolf abandons hunting for a free carcass
pub const CARCASS_SEEK_RADIUS: f32 = 500.0;
/// Bite / gnaw contact distance
pub const CONTACT_RADIUS: f32 = 30.0;
/// Seconds between bites
pub const ATTACK_COOLDOWN: f32 = 0.8;
/// Carcass decay stages advanced per second of gnawing
pub const CARCASS_DECAY_RATE: f32 = CARCASS_TERMINAL_STAGE / 50.0;

/// Shadowing band: approach above, back off below, orbit between
pub const FOLLOW_APPROACH_DIST: f32 = 400.0;
pub const FOLLOW_RETREAT_DIST: f32 = 300.0;

const FLEE_SPEED: f32 = 150.0;
const ATTACK_SPEED: f32 = 80.0;
const FOLLOW_SPEED: f32 = 30.0;
const ORBIT_SPEED: f32 = 20.0;

const WOLF_SEPARATION_RADIUS: f32 = 40.0;
const SEPARATION_PUSH: f32 = 2.0;
const ORBIT_REROLL_CHANCE: f32 = 0.05;

/// Steering offsets tried in order when the direct path is blocked
const AVOIDANCE_ANGLES: [f32; 7] = [
    0.0,
    std::f32::consts::FRAC_PI_4,
    -std::f32::consts::FRAC_PI_4,
    std::f32::consts::FRAC_PI_2,
    -std::f32::consts::FRAC_PI_2,
    3.0 * std::f32::consts::FRAC_PI_4,
    -3.0 * std::f32::consts::FRAC_PI_4,
];

/// World mutation requested by a wolf, applied by the engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PredationAction {
    /// A bite landed on a living animal
    Bite { target: Entity },
    /// Advance a carcass's decay stage
    Gnaw { target: Entity, amount: f32 },
}

/// Spawn a wolf with its component bundle
pub fn spawn_wolf(world: &mut World, x: f32, y: f32) -> Entity {
    world.spawn((Wolf::new(), Position::new(x, y), Facing::default()))
}

#[derive(Debug, Clone, Copy)]
struct PreySnap {
    entity: Entity,
    pos: Vec2,
    kind: SpeciesKind,
    life: LifeState,
    hits: u8,
}

fn snapshot_prey(world: &World) -> Vec<PreySnap> {
    let mut prey = Vec::new();
    for (entity, (_, pos, life, hits)) in world
        .query::<(&Sheep, &Position, &LifeState, &WolfHits)>()
        .iter()
    {
        prey.push(PreySnap {
            entity,
            pos: pos.0,
            kind: SpeciesKind::Sheep,
            life: *life,
            hits: hits.0,
        });
    }
    for (entity, (_, pos, life, hits)) in world
        .query::<(&Cow, &Position, &LifeState, &WolfHits)>()
        .iter()
    {
        prey.push(PreySnap {
            entity,
            pos: pos.0,
            kind: SpeciesKind::Cow,
            life: *life,
            hits: hits.0,
        });
    }
    prey
}

/// First unblocked step along `dir`, steering around terrain by trying
/// widening angular offsets. Returns the start position when every
/// candidate collides.
fn step_with_avoidance(
    start: Vec2,
    dir: Vec2,
    distance: f32,
    env: &Environment,
) -> Vec2 {
    for offset in AVOIDANCE_ANGLES {
        let candidate = start + dir.rotated(offset) * distance;
        if !env.tile_map.is_collision(candidate) {
            return candidate;
        }
    }
    start
}

fn facing_from_move(current: Facing, move_vec: Vec2) -> Facing {
    if move_vec.x.abs() < 0.001 && move_vec.y.abs() < 0.001 {
        return current;
    }
    if move_vec.x.abs() > move_vec.y.abs() {
        if move_vec.x > 0.0 {
            Facing::Right
        } else {
            Facing::Left
        }
    } else if move_vec.y > 0.0 {
        Facing::Down
    } else {
        Facing::Up
    }
}

/// Run one tick of the wolf state machine for every wolf.
///
/// Returns bite and gnaw actions for the engine to apply; positions,
/// states, and facings are written back here.
pub fn predation_system(
    world: &mut World,
    env: &Environment,
    fires: &[Fire],
    player: &Player,
    dt: f32,
    rng: &mut impl Rng,
) -> Vec<PredationAction> {
    let prey = snapshot_prey(world);
    let wolves: Vec<(Entity, Wolf, Vec2, Facing)> = world
        .query::<(&Wolf, &Position, &Facing)>()
        .iter()
        .map(|(entity, (wolf, pos, facing))| (entity, wolf.clone(), pos.0, *facing))
        .collect();

    let mut actions = Vec::new();
    let mut updates = Vec::with_capacity(wolves.len());

    for (entity, wolf, pos, facing) in &wolves {
        let mut w = wolf.clone();
        let pos = *pos;
        w.attack_cooldown = (w.attack_cooldown - dt).max(0.0);

        // Deterrents come first and can override any state
        let nearest_fire = fires
            .iter()
            .filter(|f| !f.is_burned_out())
            .map(|f| {
                let fp = Vec2::new(f.x, f.y);
                (fp, pos.distance(&fp))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1));
        if let Some((fire_pos, fire_dist)) = nearest_fire {
            if fire_dist < FIRE_FORCE_RADIUS {
                w.flee(fire_pos, FIRE_FLEE_SECS);
            } else if fire_dist < FIRE_REPEL_RADIUS && w.state != WolfState::Flee {
                w.flee(fire_pos, FIRE_FLEE_SECS);
            }
        }

        let packmates = wolves
            .iter()
            .filter(|(other, _, other_pos, _)| {
                *other != *entity && pos.distance(other_pos) < PACK_RADIUS
            })
            .count();
        let in_pack = packmates >= PACK_MIN_OTHERS;

        let player_dist = pos.distance(&player.pos());
        if w.state != WolfState::Flee && !in_pack && player_dist < PLAYER_FLEE_RADIUS {
            w.flee(player.pos(), PLAYER_FLEE_SECS);
        }

        let mut move_vec = Vec2::ZERO;
        let mut speed = 0.0;

        match w.state {
            WolfState::Flee => {
                w.flee_timer -= dt;
                if w.flee_timer <= 0.0 {
                    w.state = WolfState::Follow;
                } else {
                    move_vec = Vec2::from_angle(w.flee_from.angle_to(&pos));
                    speed = FLEE_SPEED;
                }
            }
            WolfState::Eating => {
                let carcass = w
                    .target
                    .and_then(|t| prey.iter().find(|s| s.entity == t))
                    .filter(|s| s.life.is_carcass());
                match carcass {
                    Some(snap) => {
                        let dist = pos.distance(&snap.pos);
                        if dist > CONTACT_RADIUS {
                            move_vec = Vec2::from_angle(pos.angle_to(&snap.pos));
                            speed = ATTACK_SPEED;
                        } else {
                            actions.push(PredationAction::Gnaw {
                                target: snap.entity,
                                amount: CARCASS_DECAY_RATE * dt,
                            });
                        }
                    }
                    None => {
                        w.state = WolfState::Follow;
                        w.target = None;
                    }
                }
            }
            WolfState::Follow | WolfState::Attack => {
                let free_carcass = prey
                    .iter()
                    .filter(|s| s.life.is_carcass())
                    .map(|s| (s, pos.distance(&s.pos)))
                    .filter(|(_, d)| *d < CARCASS_SEEK_RADIUS)
                    .min_by(|a, b| a.1.total_cmp(&b.1));
                let nearest_living = prey
                    .iter()
                    .filter(|s| s.life == LifeState::Alive)
                    .map(|s| (s, pos.distance(&s.pos)))
                    .min_by(|a, b| a.1.total_cmp(&b.1));

                if let Some((snap, dist)) = free_carcass {
                    // A free meal beats hunting
                    w.state = WolfState::Eating;
                    w.target = Some(snap.entity);
                    if dist > CONTACT_RADIUS {
                        move_vec = Vec2::from_angle(pos.angle_to(&snap.pos));
                        speed = ATTACK_SPEED;
                    } else {
                        actions.push(PredationAction::Gnaw {
                            target: snap.entity,
                            amount: CARCASS_DECAY_RATE * dt,
                        });
                    }
                } else if let Some((snap, dist)) = nearest_living {
                    let guarded = prey.iter().any(|other| {
                        other.entity != snap.entity
                            && other.life == LifeState::Alive
                            && other.pos.distance(&snap.pos) < ISOLATION_RADIUS
                    });

                    if !guarded || in_pack {
                        w.state = WolfState::Attack;
                        w.target = Some(snap.entity);
                        move_vec = Vec2::from_angle(pos.angle_to(&snap.pos));
                        speed = ATTACK_SPEED;

                        if dist < CONTACT_RADIUS && w.attack_cooldown <= 0.0 {
                            actions.push(PredationAction::Bite {
                                target: snap.entity,
                            });
                            w.attack_cooldown = ATTACK_COOLDOWN;
                            if snap.hits + 1 >= WOLF_HIT_THRESHOLD {
                                if snap.kind == SpeciesKind::Sheep {
                                    // The kill becomes this wolf's meal
                                    w.state = WolfState::Eating;
                                } else {
                                    w.state = WolfState::Follow;
                                    w.target = None;
                                }
                            }
                        }
                    } else {
                        w.state = WolfState::Follow;
                        w.target = None;
                        if dist > FOLLOW_APPROACH_DIST {
                            move_vec = Vec2::from_angle(pos.angle_to(&snap.pos));
                            speed = FOLLOW_SPEED;
                        } else if dist < FOLLOW_RETREAT_DIST {
                            move_vec = Vec2::from_angle(snap.pos.angle_to(&pos));
                            speed = FOLLOW_SPEED;
                        } else {
                            // Circle the herd at the comfortable range
                            if rng.gen::<f32>() < ORBIT_REROLL_CHANCE {
                                w.wander_angle = (rng.gen::<f32>() - 0.5) * 2.0;
                            }
                            let tangent =
                                pos.angle_to(&snap.pos) + std::f32::consts::FRAC_PI_2;
                            move_vec = Vec2::from_angle(tangent + w.wander_angle);
                            speed = ORBIT_SPEED;
                        }
                    }
                } else {
                    // Nothing to hunt; drift
                    w.state = WolfState::Follow;
                    w.target = None;
                    if rng.gen::<f32>() < ORBIT_REROLL_CHANCE {
                        w.wander_angle = rng.gen::<f32>() * std::f32::consts::TAU;
                    }
                    move_vec = Vec2::from_angle(w.wander_angle);
                    speed = ORBIT_SPEED;
                }
            }
        }

        // Wolves repel each other the same way the herd does
        for (other, _, other_pos, _) in &wolves {
            if *other == *entity {
                continue;
            }
            if pos.distance(other_pos) < WOLF_SEPARATION_RADIUS {
                move_vec += Vec2::from_angle(other_pos.angle_to(&pos)) * SEPARATION_PUSH;
                if speed == 0.0 {
                    speed = ORBIT_SPEED;
                }
            }
        }

        let new_pos = if speed > 0.0 && move_vec != Vec2::ZERO {
            step_with_avoidance(pos, move_vec, speed * dt, env)
        } else {
            pos
        };
        let new_facing = facing_from_move(*facing, new_pos - pos);

        updates.push((*entity, w, new_pos, new_facing));
    }

    for (entity, w, new_pos, new_facing) in updates {
        if let Ok(mut wolf) = world.get::<&mut Wolf>(entity) {
            *wolf = w;
        }
        if let Ok(mut pos) = world.get::<&mut Position>(entity) {
            pos.0 = new_pos;
        }
        if let Ok(mut facing) = world.get::<&mut Facing>(entity) {
            *facing = new_facing;
        }
    }

    actions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{Oasis, TileMap};
    use crate::systems::grazing::spawn_animal;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn empty_env() -> Environment {
        let oasis = Oasis {
            x: 10_000.0,
            y: 10_000.0,
            radius: 100.0,
        };
        Environment::new(oasis, TileMap::new(64.0, 0, 0, "rock"))
    }

    fn far_player() -> Player {
        Player {
            x: 10_000.0,
            y: 10_000.0,
            ..Player::default()
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(11)
    }

    #[test]
    fn test_wolf_attacks_isolated_target() {
        let mut world = World::new();
        let env = empty_env();
        let player = far_player();
        let mut rng = rng();

        spawn_animal::<Sheep>(&mut world, 100.0, 0.0);
        let wolf = spawn_wolf(&mut world, 0.0, 0.0);

        let mut bit = false;
        for _ in 0..50 {
            let actions = predation_system(&mut world, &env, &[], &player, 0.1, &mut rng);
            if actions
                .iter()
                .any(|a| matches!(a, PredationAction::Bite { .. }))
            {
                bit = true;
                break;
            }
        }
        assert!(bit, "wolf never closed on an isolated sheep");
        assert_eq!(world.get::<&Wolf>(wolf).unwrap().state, WolfState::Attack);
    }

    #[test]
    fn test_wolf_only_follows_guarded_targets() {
        let mut world = World::new();
        let env = empty_env();
        let player = far_player();
        let mut rng = rng();

        // Two sheep within each other's isolation radius
        spawn_animal::<Sheep>(&mut world, 200.0, 0.0);
        spawn_animal::<Sheep>(&mut world, 250.0, 0.0);
        let wolf = spawn_wolf(&mut world, -300.0, 0.0);

        for _ in 0..30 {
            let actions = predation_system(&mut world, &env, &[], &player, 0.1, &mut rng);
            assert!(actions.is_empty(), "guarded sheep must not be bitten");
        }
        assert_eq!(world.get::<&Wolf>(wolf).unwrap().state, WolfState::Follow);
    }

    #[test]
    fn test_pack_overrides_isolation() {
        let mut world = World::new();
        let env = empty_env();
        let player = far_player();
        let mut rng = rng();

        spawn_animal::<Sheep>(&mut world, 200.0, 0.0);
        spawn_animal::<Sheep>(&mut world, 250.0, 0.0);
        let a = spawn_wolf(&mut world, -300.0, 0.0);
        let b = spawn_wolf(&mut world, -300.0, 100.0);
        let c = spawn_wolf(&mut world, -300.0, -100.0);

        predation_system(&mut world, &env, &[], &player, 0.1, &mut rng);

        assert_eq!(world.get::<&Wolf>(a).unwrap().state, WolfState::Attack);
        assert_eq!(world.get::<&Wolf>(b).unwrap().state, WolfState::Attack);
        assert_eq!(world.get::<&Wolf>(c).unwrap().state, WolfState::Attack);
    }

    #[test]
    fn test_wolf_pair_is_not_a_pack() {
        let mut world = World::new();
        let env = empty_env();
        let player = far_player();
        let mut rng = rng();

        // Mutually guarding sheep; only a real pack may attack them
        spawn_animal::<Sheep>(&mut world, 200.0, 0.0);
        spawn_animal::<Sheep>(&mut world, 250.0, 0.0);
        let a = spawn_wolf(&mut world, -300.0, 0.0);
        let b = spawn_wolf(&mut world, -300.0, 100.0);

        let actions = predation_system(&mut world, &env, &[], &player, 0.1, &mut rng);

        assert!(actions.is_empty());
        assert_eq!(world.get::<&Wolf>(a).unwrap().state, WolfState::Follow);
        assert_eq!(world.get::<&Wolf>(b).unwrap().state, WolfState::Follow);
    }

    #[test]
    fn test_fire_forces_flee() {
        let mut world = World::new();
        let env = empty_env();
        let player = far_player();
        let mut rng = rng();

        spawn_animal::<Sheep>(&mut world, 100.0, 0.0);
        let wolf = spawn_wolf(&mut world, 0.0, 0.0);
        let fire = Fire::new(50.0, 0.0);

        predation_system(&mut world, &env, &[fire], &player, 0.1, &mut rng);

        let w = world.get::<&Wolf>(wolf).unwrap();
        assert_eq!(w.state, WolfState::Flee);
        assert!(w.target.is_none());
        // Fled directly away from the fire
        let pos = world.get::<&Position>(wolf).unwrap().0;
        assert!(pos.x < 0.0, "expected retreat from fire, got {pos:?}");
    }

    #[test]
    fn test_lone_wolf_flees_player_but_pack_stands() {
        let mut world = World::new();
        let env = empty_env();
        let player = Player::default(); // at the origin
        let mut rng = rng();

        let lone = spawn_wolf(&mut world, 100.0, 0.0);
        predation_system(&mut world, &env, &[], &player, 0.1, &mut rng);
        assert_eq!(world.get::<&Wolf>(lone).unwrap().state, WolfState::Flee);

        let mut world = World::new();
        spawn_animal::<Sheep>(&mut world, 150.0, 0.0);
        let a = spawn_wolf(&mut world, 100.0, 0.0);
        let b = spawn_wolf(&mut world, 100.0, 50.0);
        let c = spawn_wolf(&mut world, 100.0, -50.0);
        predation_system(&mut world, &env, &[], &player, 0.1, &mut rng);
        assert_ne!(world.get::<&Wolf>(a).unwrap().state, WolfState::Flee);
        assert_ne!(world.get::<&Wolf>(b).unwrap().state, WolfState::Flee);
        assert_ne!(world.get::<&Wolf>(c).unwrap().state, WolfState::Flee);
    }

    #[test]
    fn test_flee_expires_back_to_follow() {
        let mut world = World::new();
        let env = empty_env();
        let player = far_player();
        let mut rng = rng();

        let wolf = spawn_wolf(&mut world, 0.0, 0.0);
        world
            .get::<&mut Wolf>(wolf)
            .unwrap()
            .flee(Vec2::new(50.0, 0.0), 1.0);

        predation_system(&mut world, &env, &[], &player, 1.5, &mut rng);
        assert_eq!(world.get::<&Wolf>(wolf).unwrap().state, WolfState::Follow);
    }

    #[test]
    fn test_wolf_gnaws_adjacent_carcass() {
        let mut world = World::new();
        let env = empty_env();
        let player = far_player();
        let mut rng = rng();

        let sheep = spawn_animal::<Sheep>(&mut world, 10.0, 0.0);
        *world.get::<&mut LifeState>(sheep).unwrap() = LifeState::Dying { stage: 1.0 };
        let wolf = spawn_wolf(&mut world, 0.0, 0.0);

        let actions = predation_system(&mut world, &env, &[], &player, 1.0, &mut rng);

        assert_eq!(
            actions,
            vec![PredationAction::Gnaw {
                target: sheep,
                amount: CARCASS_DECAY_RATE
            }]
        );
        assert_eq!(world.get::<&Wolf>(wolf).unwrap().state, WolfState::Eating);
    }

    #[test]
    fn test_eating_wolf_moves_on_when_carcass_is_gone() {
        let mut world = World::new();
        let env = empty_env();
        let player = far_player();
        let mut rng = rng();

        let sheep = spawn_animal::<Sheep>(&mut world, 10.0, 0.0);
        *world.get::<&mut LifeState>(sheep).unwrap() = LifeState::Dying {
            stage: CARCASS_TERMINAL_STAGE,
        };
        let wolf = spawn_wolf(&mut world, 0.0, 0.0);
        {
            let mut w = world.get::<&mut Wolf>(wolf).unwrap();
            w.state = WolfState::Eating;
            w.target = Some(sheep);
        }

        let actions = predation_system(&mut world, &env, &[], &player, 1.0, &mut rng);

        assert!(actions.is_empty());
        assert_eq!(world.get::<&Wolf>(wolf).unwrap().state, WolfState::Follow);
        assert!(world.get::<&Wolf>(wolf).unwrap().target.is_none());
    }

    #[test]
    fn test_wolves_separate() {
        let mut world = World::new();
        let env = empty_env();
        let player = far_player();
        let mut rng = rng();

        let a = spawn_wolf(&mut world, 0.0, 0.0);
        let b = spawn_wolf(&mut world, 10.0, 0.0);

        predation_system(&mut world, &env, &[], &player, 1.0, &mut rng);

        let pa = world.get::<&Position>(a).unwrap().0;
        let pb = world.get::<&Position>(b).unwrap().0;
        assert!(pb.x - pa.x > 10.0, "expected push apart: {pa:?} vs {pb:?}");
    }

    #[test]
    fn test_bites_are_gated_by_cooldown() {
        let mut world = World::new();
        let env = empty_env();
        let player = far_player();
        let mut rng = rng();

        // Already in contact; the only thing limiting bites is the timer
        spawn_animal::<Sheep>(&mut world, 10.0, 0.0);
        spawn_wolf(&mut world, 0.0, 0.0);

        let dt = 0.1;
        let mut bite_ticks = Vec::new();
        for tick in 0..40 {
            let actions = predation_system(&mut world, &env, &[], &player, dt, &mut rng);
            if actions
                .iter()
                .any(|a| matches!(a, PredationAction::Bite { .. }))
            {
                bite_ticks.push(tick);
            }
        }

        assert!(bite_ticks.len() >= 3, "expected repeated bites in contact");
        for pair in bite_ticks.windows(2) {
            let gap = (pair[1] - pair[0]) as f32 * dt;
            assert!(
                gap >= ATTACK_COOLDOWN - 1e-3,
                "bites {}s apart, cooldown is {}s",
                gap,
                ATTACK_COOLDOWN
            );
        }
    }

    #[test]
    fn test_fifth_bite_turns_sheep_hunt_into_a_meal() {
        let mut world = World::new();
        let env = empty_env();
        let player = far_player();
        let mut rng = rng();

        let sheep = spawn_animal::<Sheep>(&mut world, 10.0, 0.0);
        world.get::<&mut WolfHits>(sheep).unwrap().0 = WOLF_HIT_THRESHOLD - 1;
        let wolf = spawn_wolf(&mut world, 0.0, 0.0);

        let actions = predation_system(&mut world, &env, &[], &player, 0.1, &mut rng);

        assert_eq!(actions, vec![PredationAction::Bite { target: sheep }]);
        let w = world.get::<&Wolf>(wolf).unwrap();
        assert_eq!(w.state, WolfState::Eating);
        assert_eq!(w.target, Some(sheep));
    }
}
